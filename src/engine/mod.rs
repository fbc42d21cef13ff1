use crate::bag::PieceGenerator;
use crate::error::CodecError;
use crate::event::{EventPayload, EventType};
use crate::falling_piece::FallingPiece;
use crate::field::{Field, LineClear};
use crate::piece::Piece;
use crate::rng::Rng;
use crate::score::Score;
use crate::types::{ItemKind, ItemPayload};

mod bedrock_system;
mod command_system;
mod utils;

use self::utils::{piece_slot_payload, spawn_x};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub cleared_lines: usize,
    pub produced_bedrock: usize,
    pub game_over: bool,
}

impl StepOutcome {
    pub fn merge(&mut self, other: StepOutcome) {
        self.cleared_lines += other.cleared_lines;
        self.produced_bedrock += other.produced_bedrock;
        self.game_over |= other.game_over;
    }
}

#[derive(Clone, Debug)]
pub struct GameEngine {
    field: Field,
    falling: FallingPiece,
    next_piece: Option<&'static Piece>,
    next_dirty: bool,
    held_piece: Option<&'static Piece>,
    held_dirty: bool,
    hold_locked: bool,
    override_piece: Option<&'static Piece>,
    score: Score,
    generator: PieceGenerator,
    rng: Rng,
    item: Option<ItemKind>,
    item_dirty: bool,
    over: bool,
}

impl GameEngine {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            field: Field::new(width, height),
            falling: FallingPiece::new(),
            next_piece: None,
            next_dirty: false,
            held_piece: None,
            held_dirty: false,
            hold_locked: false,
            override_piece: None,
            score: Score::new(),
            generator: PieceGenerator::new(0),
            rng: Rng::new(0),
            item: None,
            item_dirty: false,
            over: true,
        }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn falling(&self) -> &FallingPiece {
        &self.falling
    }

    pub fn next_piece(&self) -> Option<&'static Piece> {
        self.next_piece
    }

    pub fn held_piece(&self) -> Option<&'static Piece> {
        self.held_piece
    }

    pub fn is_hold_locked(&self) -> bool {
        self.hold_locked
    }

    pub fn score(&self) -> &Score {
        &self.score
    }

    pub fn item(&self) -> Option<ItemKind> {
        self.item
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn start(&mut self, seed: i64) -> StepOutcome {
        self.field.reset();
        self.score.reset();
        self.generator = PieceGenerator::new(seed);
        self.rng = Rng::from_seed(seed);
        self.falling = FallingPiece::new();
        self.next_piece = Some(self.generator.next_piece());
        self.held_piece = None;
        self.hold_locked = false;
        self.override_piece = None;
        self.item = None;
        self.next_dirty = true;
        self.held_dirty = true;
        self.item_dirty = true;
        self.over = false;

        let mut outcome = StepOutcome::default();
        if !self.spawn_next() {
            outcome.game_over = self.end();
        }
        outcome
    }

    pub fn step(&mut self, dt_ms: i64) -> StepOutcome {
        if self.over || !self.falling.advance_timer(dt_ms) {
            return StepOutcome::default();
        }
        if self.try_move(0, 0, 1) {
            self.falling.reset_timer();
            return StepOutcome::default();
        }
        self.lock_falling_piece()
    }

    pub fn force_over(&mut self) {
        self.end();
    }

    fn end(&mut self) -> bool {
        if self.over {
            return false;
        }
        self.over = true;
        self.falling.lock();
        true
    }

    fn lock_falling_piece(&mut self) -> StepOutcome {
        let Some(piece) = self.falling.piece() else {
            return StepOutcome::default();
        };
        self.falling.lock();
        self.field.put_piece(
            piece,
            self.falling.rotation(),
            self.falling.x(),
            self.falling.y(),
        );

        let LineClear {
            lines,
            produced_bedrock,
        } = self.field.resolve_line_clears();
        self.score.add_lines(lines);
        self.hold_locked = false;

        let mut outcome = StepOutcome {
            cleared_lines: lines,
            produced_bedrock,
            game_over: false,
        };
        if !self.spawn_next() {
            outcome.game_over = self.end();
        }
        outcome
    }

    fn spawn_next(&mut self) -> bool {
        let piece = match self.override_piece {
            Some(piece) => piece,
            None => {
                let piece = self
                    .next_piece
                    .take()
                    .unwrap_or_else(|| self.generator.next_piece());
                self.next_piece = Some(self.generator.next_piece());
                self.next_dirty = true;
                piece
            }
        };
        self.spawn_piece(piece)
    }

    fn spawn_piece(&mut self, piece: &'static Piece) -> bool {
        let x = spawn_x(self.field.width());
        self.falling.spawn(piece, x, 0);
        self.field.can_put_piece(piece, 0, x, 0)
    }

    pub fn set_override_piece(&mut self, piece: Option<&'static Piece>) {
        self.override_piece = piece;
    }

    pub fn set_rotation_locked(&mut self, locked: bool) {
        self.falling.set_rotation_locked(locked);
    }

    pub fn grant_item(&mut self, item: ItemKind) -> bool {
        if self.over || self.item.is_some() {
            return false;
        }
        self.item = Some(item);
        self.item_dirty = true;
        true
    }

    pub fn take_item(&mut self) -> Option<ItemKind> {
        let item = self.item.take();
        if item.is_some() {
            self.item_dirty = true;
        }
        item
    }

    pub fn shuffle_field(&mut self) -> StepOutcome {
        if self.over {
            return StepOutcome::default();
        }
        self.field.shuffle_rows(&mut self.rng);
        self.settle_falling_piece(self.field.height())
    }

    pub fn load_field<S: AsRef<str>>(&mut self, words: &[S]) -> Result<(), CodecError> {
        self.field.decode64(words)
    }

    pub fn drain_updates(&mut self) -> Vec<(EventType, EventPayload)> {
        let mut updates = Vec::new();
        if self.field.take_dirty() {
            updates.push((
                EventType::FieldUpdate,
                EventPayload::Field(self.field.to_payload()),
            ));
        }
        if self.falling.take_dirty() {
            updates.push((
                EventType::FallingPieceUpdate,
                EventPayload::FallingPiece(self.falling.to_payload()),
            ));
        }
        if std::mem::take(&mut self.next_dirty) {
            updates.push((
                EventType::NextPieceUpdate,
                EventPayload::PieceSlot(piece_slot_payload(self.next_piece)),
            ));
        }
        if std::mem::take(&mut self.held_dirty) {
            updates.push((
                EventType::HoldingPieceUpdate,
                EventPayload::PieceSlot(piece_slot_payload(self.held_piece)),
            ));
        }
        if self.score.take_dirty() {
            updates.push((
                EventType::ScoreUpdate,
                EventPayload::Score(self.score.to_payload()),
            ));
        }
        if std::mem::take(&mut self.item_dirty) {
            updates.push((
                EventType::ItemUpdate,
                EventPayload::Item(ItemPayload { item: self.item }),
            ));
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{PieceKind, I, O, TOKEN_BEDROCK, TOKEN_EMPTY};
    use crate::types::Command;

    fn started(seed: i64) -> GameEngine {
        let mut engine = GameEngine::new(10, 20);
        let outcome = engine.start(seed);
        assert!(!outcome.game_over);
        engine
    }

    fn filled_cells(engine: &GameEngine) -> usize {
        engine
            .field()
            .cells()
            .iter()
            .filter(|token| **token != TOKEN_EMPTY)
            .count()
    }

    #[test]
    fn new_engine_starts_over() {
        let mut engine = GameEngine::new(10, 20);
        assert!(engine.is_over());
        assert_eq!(engine.step(10_000), StepOutcome::default());
        assert_eq!(engine.command(Command::HardDrop), StepOutcome::default());
    }

    #[test]
    fn start_spawns_at_top_center() {
        let engine = started(1);
        assert!(!engine.is_over());
        let falling = engine.falling();
        assert!(falling.piece().is_some());
        assert_eq!((falling.x(), falling.y(), falling.rotation()), (3, 0, 0));
        assert!(engine.next_piece().is_some());
        assert!(engine.held_piece().is_none());
    }

    #[test]
    fn same_seed_same_piece_order() {
        let mut a = started(99);
        let mut b = started(99);
        for _ in 0..20 {
            assert_eq!(
                a.falling().piece().map(|p| p.kind),
                b.falling().piece().map(|p| p.kind)
            );
            a.command(Command::HardDrop);
            b.command(Command::HardDrop);
        }
    }

    #[test]
    fn gravity_moves_one_row_per_interval() {
        let mut engine = started(2);
        let y = engine.falling().y();
        engine.step(500);
        assert_eq!(engine.falling().y(), y);
        engine.step(500);
        assert_eq!(engine.falling().y(), y + 1);
    }

    #[test]
    fn hard_drop_locks_and_spawns_next() {
        let mut engine = started(3);
        let piece = engine.falling().piece().expect("falling piece");
        let next = engine.next_piece().expect("next piece");

        let outcome = engine.command(Command::HardDrop);
        assert_eq!(outcome.cleared_lines, 0);
        assert!(!outcome.game_over);
        assert_eq!(filled_cells(&engine), 4);

        let bottom_row = &engine.field().cells()[190..200];
        assert!(bottom_row.iter().any(|token| *token == piece.token()));
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(next.kind));
        assert_eq!(engine.falling().y(), 0);
    }

    #[test]
    fn gravity_locks_resting_piece() {
        let mut engine = started(4);
        let mut locked = false;
        for _ in 0..30 {
            engine.step(1_000);
            if filled_cells(&engine) == 4 {
                locked = true;
                break;
            }
        }
        assert!(locked);
    }

    #[test]
    fn hold_swaps_and_locks_until_next_lock() {
        let mut engine = started(5);
        let first = engine.falling().piece().expect("piece").kind;
        let second = engine.next_piece().expect("next").kind;

        engine.command(Command::Hold);
        assert_eq!(engine.held_piece().map(|p| p.kind), Some(first));
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(second));
        assert!(engine.is_hold_locked());

        engine.command(Command::Hold);
        assert_eq!(engine.held_piece().map(|p| p.kind), Some(first));
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(second));

        engine.command(Command::HardDrop);
        assert!(!engine.is_hold_locked());
        let third = engine.falling().piece().expect("piece").kind;

        engine.command(Command::Hold);
        assert_eq!(engine.held_piece().map(|p| p.kind), Some(third));
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(first));
        assert_eq!(engine.falling().y(), 0);
    }

    fn narrow_with_i_pieces(seed: i64) -> GameEngine {
        let mut engine = GameEngine::new(4, 6);
        engine.start(seed);
        engine.set_override_piece(Some(&I));
        engine.command(Command::Hold);
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(PieceKind::I));
        engine
    }

    #[test]
    fn surplus_clear_produces_bedrock() {
        let mut engine = narrow_with_i_pieces(6);
        let outcome = engine.command(Command::HardDrop);
        assert_eq!(
            outcome,
            StepOutcome {
                cleared_lines: 1,
                produced_bedrock: 1,
                game_over: false
            }
        );
        assert_eq!(engine.score().score(), 60);
        assert_eq!(filled_cells(&engine), 0);
    }

    #[test]
    fn clear_pays_down_own_bedrock_first() {
        let mut engine = narrow_with_i_pieces(7);
        engine
            .load_field(&["0000000000000000", "0000000088888888"])
            .expect("valid field");
        assert_eq!(engine.field().current_bedrock(), 2);

        let outcome = engine.command(Command::HardDrop);
        assert_eq!(outcome.cleared_lines, 1);
        assert_eq!(outcome.produced_bedrock, 0);
        assert_eq!(engine.field().current_bedrock(), 1);
        assert_eq!(filled_cells(&engine), 4);
    }

    #[test]
    fn blocked_spawn_ends_game() {
        let mut engine = GameEngine::new(10, 20);
        engine.start(8);
        for _ in 0..200 {
            if engine.command(Command::HardDrop).game_over {
                break;
            }
        }
        assert!(engine.is_over());
        assert_eq!(engine.command(Command::HardDrop), StepOutcome::default());
        assert!(engine.falling().is_locked());
    }

    #[test]
    fn drain_updates_coalesces_changes() {
        let mut engine = started(9);
        let first: Vec<EventType> = engine.drain_updates().into_iter().map(|(t, _)| t).collect();
        assert!(first.contains(&EventType::FieldUpdate));
        assert!(first.contains(&EventType::FallingPieceUpdate));
        assert!(first.contains(&EventType::NextPieceUpdate));
        assert!(first.contains(&EventType::ScoreUpdate));
        assert!(engine.drain_updates().is_empty());

        engine.command(Command::Left);
        engine.command(Command::Right);
        engine.command(Command::Left);
        let moved: Vec<EventType> = engine.drain_updates().into_iter().map(|(t, _)| t).collect();
        assert_eq!(moved, vec![EventType::FallingPieceUpdate]);
    }

    #[test]
    fn items_are_granted_once_and_taken() {
        let mut engine = started(10);
        engine.drain_updates();
        assert!(engine.grant_item(ItemKind::Tornado));
        assert!(!engine.grant_item(ItemKind::LockRotation));
        assert_eq!(engine.take_item(), Some(ItemKind::Tornado));
        assert_eq!(engine.take_item(), None);
        let updates = engine.drain_updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0],
            (EventType::ItemUpdate, EventPayload::Item(ItemPayload { item: None }))
        );
    }

    #[test]
    fn override_piece_replaces_spawns() {
        let mut engine = started(11);
        engine.set_override_piece(Some(&O));
        for _ in 0..3 {
            engine.command(Command::HardDrop);
            assert_eq!(engine.falling().piece().map(|p| p.kind), Some(PieceKind::O));
        }
        engine.set_override_piece(None);
        let next = engine.next_piece().expect("next").kind;
        engine.command(Command::HardDrop);
        assert_eq!(engine.falling().piece().map(|p| p.kind), Some(next));
    }

    #[test]
    fn load_field_recomputes_bedrock() {
        let mut engine = GameEngine::new(3, 4);
        engine.start(12);
        engine.load_field(&["0000000000888888"]).expect("valid field");
        assert_eq!(engine.field().current_bedrock(), 2);
        assert_eq!(engine.field().get(0, 3), TOKEN_BEDROCK);
        assert!(engine.load_field(&["zz"]).is_err());
        assert_eq!(engine.field().current_bedrock(), 2);
    }
}
