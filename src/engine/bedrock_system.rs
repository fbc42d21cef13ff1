use super::*;

impl GameEngine {
    /// Entry point for bedrock sent by an opponent. Overflow ends the game.
    /// A falling piece the new rows run into is lifted clear, or locked where
    /// it is when no lift up to `amount` rows frees it.
    pub fn receive_bedrock(&mut self, amount: usize) -> StepOutcome {
        if self.over || amount == 0 {
            return StepOutcome::default();
        }
        if self.field.increase_bedrock(amount) {
            return StepOutcome {
                game_over: self.end(),
                ..StepOutcome::default()
            };
        }
        self.settle_falling_piece(amount)
    }

    pub(super) fn settle_falling_piece(&mut self, max_lift: usize) -> StepOutcome {
        let Some(piece) = self.falling.piece() else {
            return StepOutcome::default();
        };
        let (rotation, x, y) = (self.falling.rotation(), self.falling.x(), self.falling.y());
        if self.falling.is_locked() || self.field.can_put_piece(piece, rotation, x, y) {
            return StepOutcome::default();
        }

        let lift =
            (1..=max_lift as i32).find(|k| self.field.can_put_piece(piece, rotation, x, y - k));
        match lift {
            Some(k) => {
                self.falling.set_pose(rotation, x, y - k);
                StepOutcome::default()
            }
            None => self.lock_falling_piece(),
        }
    }
}
