use super::*;
use crate::types::Command;

impl GameEngine {
    pub fn command(&mut self, command: Command) -> StepOutcome {
        if self.over {
            return StepOutcome::default();
        }
        match command {
            Command::Left => {
                self.try_move(0, -1, 0);
            }
            Command::Right => {
                self.try_move(0, 1, 0);
            }
            Command::Down => {
                self.try_move(0, 0, 1);
            }
            Command::Rotate => {
                if !self.falling.is_rotation_locked() {
                    self.try_move(1, 0, 0);
                }
            }
            Command::HardDrop => return self.hard_drop(),
            Command::Hold => return self.hold(),
            Command::UseItem => {}
        }
        StepOutcome::default()
    }

    pub(super) fn try_move(&mut self, dr: i32, dx: i32, dy: i32) -> bool {
        let Some(piece) = self.falling.piece() else {
            return false;
        };
        if self.falling.is_locked() {
            return false;
        }
        let rotation = self.falling.rotation() + dr;
        let x = self.falling.x() + dx;
        let y = self.falling.y() + dy;
        if !self.field.can_put_piece(piece, rotation, x, y) {
            return false;
        }
        self.falling.set_pose(rotation, x, y)
    }

    fn hard_drop(&mut self) -> StepOutcome {
        if self.falling.piece().is_none() {
            return StepOutcome::default();
        }
        while self.try_move(0, 0, 1) {}
        self.lock_falling_piece()
    }

    fn hold(&mut self) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let Some(current) = self.falling.piece() else {
            return outcome;
        };
        if self.hold_locked || self.falling.is_locked() {
            return outcome;
        }
        self.hold_locked = true;
        self.held_dirty = true;

        let spawned = match self.held_piece.replace(current) {
            Some(held) => self.spawn_piece(held),
            None => self.spawn_next(),
        };
        if !spawned {
            outcome.game_over = self.end();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::GameEngine;
    use crate::field::Field;
    use crate::piece::{I, O};
    use crate::types::Command;

    fn engine_with(piece: &'static crate::piece::Piece) -> GameEngine {
        let mut engine = GameEngine::new(10, 20);
        engine.start(1);
        engine.set_override_piece(Some(piece));
        engine.command(Command::Hold);
        engine
    }

    #[test]
    fn moves_stop_at_walls() {
        let mut engine = engine_with(&O);
        for _ in 0..20 {
            engine.command(Command::Left);
        }
        // O occupies mask columns 1 and 2.
        assert_eq!(engine.falling().x(), -1);
        for _ in 0..20 {
            engine.command(Command::Right);
        }
        assert_eq!(engine.falling().x(), 7);
    }

    #[test]
    fn soft_drop_never_locks() {
        let mut engine = engine_with(&O);
        for _ in 0..40 {
            engine.command(Command::Down);
        }
        assert_eq!(engine.falling().y(), 17);
        assert!(!engine.falling().is_locked());
        assert!(engine.field().cells().iter().all(|token| *token == 0));
    }

    #[test]
    fn rotation_respects_lock() {
        let mut engine = engine_with(&I);
        engine.command(Command::Down);
        engine.command(Command::Rotate);
        assert_eq!(engine.falling().rotation(), 1);

        engine.set_rotation_locked(true);
        engine.command(Command::Rotate);
        assert_eq!(engine.falling().rotation(), 1);

        engine.set_rotation_locked(false);
        engine.command(Command::Rotate);
        assert_eq!(engine.falling().rotation(), 0);
    }

    #[test]
    fn blocked_rotation_is_ignored() {
        let mut engine = engine_with(&I);
        // Flat I does not fit against the right wall.
        engine.command(Command::Rotate);
        assert_eq!(engine.falling().rotation(), 1);
        for _ in 0..10 {
            engine.command(Command::Right);
        }
        let x = engine.falling().x();
        engine.command(Command::Rotate);
        assert_eq!(engine.falling().rotation(), 1);
        assert_eq!(engine.falling().x(), x);
    }

    #[test]
    fn unknown_commands_are_ignored() {
        assert_eq!(Command::parse("?"), None);
        let mut engine = engine_with(&O);
        let before = (engine.falling().x(), engine.falling().y());
        engine.command(Command::UseItem);
        assert_eq!((engine.falling().x(), engine.falling().y()), before);
    }

    #[test]
    fn hold_into_a_blocked_spawn_ends_the_game() {
        let mut engine = GameEngine::new(10, 20);
        engine.start(1);
        let mut blocked = Field::new(10, 20);
        for y in 0..4 {
            for x in 0..10 {
                blocked.set(x, y, 1);
            }
        }
        engine.load_field(&blocked.encode64()).expect("field loads");

        let outcome = engine.command(Command::Hold);
        assert!(outcome.game_over);
        assert!(engine.is_over());
        assert!(!engine.command(Command::Hold).game_over);
    }
}
