use crate::piece::{Piece, MASK_SIZE};
use crate::types::PieceSlotPayload;

pub(super) fn spawn_x(width: usize) -> i32 {
    width as i32 / 2 - MASK_SIZE as i32 / 2
}

pub(super) fn piece_slot_payload(piece: Option<&'static Piece>) -> PieceSlotPayload {
    PieceSlotPayload {
        token: piece.map(Piece::token),
    }
}
