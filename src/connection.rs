use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
pub struct ConnectionReader {
    inbound: mpsc::Receiver<String>,
}

impl ConnectionReader {
    pub async fn read(&mut self) -> Option<String> {
        self.inbound.recv().await
    }
}

#[derive(Clone, Debug)]
pub struct ConnectionWriter {
    outbound: mpsc::Sender<String>,
}

impl ConnectionWriter {
    pub fn write(&self, message: String) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("outbound queue full, message dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

#[derive(Debug)]
pub struct Connection {
    pub reader: ConnectionReader,
    pub writer: ConnectionWriter,
}

#[derive(Debug)]
pub struct ConnectionPeer {
    pub inbound: mpsc::Sender<String>,
    pub outbound: mpsc::Receiver<String>,
}

pub fn connection_pair(capacity: usize) -> (Connection, ConnectionPeer) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    (
        Connection {
            reader: ConnectionReader { inbound: inbound_rx },
            writer: ConnectionWriter {
                outbound: outbound_tx,
            },
        },
        ConnectionPeer {
            inbound: inbound_tx,
            outbound: outbound_rx,
        },
    )
}
