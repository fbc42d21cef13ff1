use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("word {index} is not a 16 digit hex value: {word:?}")]
    InvalidWord { index: usize, word: String },
    #[error("field needs {needed} token slots but only {got} were given")]
    NotEnoughWords { needed: usize, got: usize },
    #[error("token {token} at cell {index} is out of range")]
    InvalidToken { index: usize, token: u8 },
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection closed during handshake")]
    Closed,
    #[error("handshake timed out")]
    Timeout,
    #[error("no valid hello response after {attempts} attempts")]
    ProtocolViolation { attempts: usize },
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("room is shutting down")]
    ShuttingDown,
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
