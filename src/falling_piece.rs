use crate::constants::{get_fall_interval_ms, BASE_FALL_SPEED};
use crate::piece::Piece;
use crate::types::FallingPiecePayload;

#[derive(Clone, Debug)]
pub struct FallingPiece {
    piece: Option<&'static Piece>,
    rotation: i32,
    x: i32,
    y: i32,
    speed: i64,
    fall_timer_ms: i64,
    locked: bool,
    rotation_locked: bool,
    dirty: bool,
}

impl Default for FallingPiece {
    fn default() -> Self {
        Self {
            piece: None,
            rotation: 0,
            x: 0,
            y: 0,
            speed: BASE_FALL_SPEED,
            fall_timer_ms: get_fall_interval_ms(BASE_FALL_SPEED),
            locked: false,
            rotation_locked: false,
            dirty: true,
        }
    }
}

impl FallingPiece {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn piece(&self) -> Option<&'static Piece> {
        self.piece
    }

    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_rotation_locked(&self) -> bool {
        self.rotation_locked
    }

    pub fn spawn(&mut self, piece: &'static Piece, x: i32, y: i32) {
        self.piece = Some(piece);
        self.rotation = 0;
        self.x = x;
        self.y = y;
        self.locked = false;
        self.reset_timer();
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.piece = None;
        self.locked = false;
        self.dirty = true;
    }

    pub fn set_pose(&mut self, rotation: i32, x: i32, y: i32) -> bool {
        if self.locked {
            return false;
        }
        let rotation = match self.piece {
            Some(piece) => piece.clamp_rotation(rotation) as i32,
            None => return false,
        };
        if rotation != self.rotation || x != self.x || y != self.y {
            self.rotation = rotation;
            self.x = x;
            self.y = y;
            self.dirty = true;
        }
        true
    }

    pub fn advance_timer(&mut self, dt_ms: i64) -> bool {
        if self.piece.is_none() || self.locked {
            return false;
        }
        self.fall_timer_ms -= dt_ms;
        self.fall_timer_ms <= 0
    }

    pub fn reset_timer(&mut self) {
        self.fall_timer_ms = get_fall_interval_ms(self.speed);
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn set_rotation_locked(&mut self, locked: bool) {
        if self.rotation_locked != locked {
            self.rotation_locked = locked;
            self.dirty = true;
        }
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn to_payload(&self) -> FallingPiecePayload {
        FallingPiecePayload {
            token: self.piece.map(Piece::token),
            rotation: self.rotation as usize,
            x: self.x,
            y: self.y,
            rotation_locked: self.rotation_locked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{I, T};

    #[test]
    fn gravity_is_due_after_interval() {
        let mut falling = FallingPiece::new();
        assert!(!falling.advance_timer(5_000));

        falling.spawn(&T, 3, 0);
        assert!(!falling.advance_timer(990));
        assert!(falling.advance_timer(10));
        falling.reset_timer();
        assert!(!falling.advance_timer(10));
    }

    #[test]
    fn locked_piece_cannot_move() {
        let mut falling = FallingPiece::new();
        falling.spawn(&I, 3, 0);
        assert!(falling.set_pose(1, 4, 2));
        assert_eq!((falling.rotation(), falling.x(), falling.y()), (1, 4, 2));

        falling.lock();
        assert!(!falling.set_pose(0, 0, 0));
        assert_eq!((falling.rotation(), falling.x(), falling.y()), (1, 4, 2));
        assert!(!falling.advance_timer(10_000));
    }

    #[test]
    fn rotation_is_stored_clamped() {
        let mut falling = FallingPiece::new();
        falling.spawn(&I, 0, 0);
        assert!(falling.set_pose(3, 0, 0));
        assert_eq!(falling.rotation(), 1);
        assert_eq!(falling.to_payload().rotation, 1);
    }

    #[test]
    fn dirty_flag_is_cleared_by_take() {
        let mut falling = FallingPiece::new();
        falling.spawn(&T, 3, 0);
        assert!(falling.take_dirty());
        assert!(!falling.take_dirty());
        assert!(falling.set_pose(0, 3, 0));
        assert!(!falling.take_dirty());
        falling.set_rotation_locked(true);
        assert!(falling.take_dirty());
        assert!(falling.to_payload().rotation_locked);
    }
}
