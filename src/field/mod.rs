use crate::error::CodecError;
use crate::piece::{Piece, Token, TOKEN_BEDROCK, TOKEN_EMPTY};
use crate::rng::Rng;
use crate::types::FieldPayload;

mod codec;

pub use self::codec::{decode_words, encode_words, BITS_PER_TOKEN, TOKENS_PER_WORD};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineClear {
    pub lines: usize,
    pub produced_bedrock: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    width: usize,
    height: usize,
    cells: Vec<Token>,
    current_bedrock: usize,
    dirty: bool,
}

impl Field {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![TOKEN_EMPTY; width * height],
            current_bedrock: 0,
            dirty: true,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn current_bedrock(&self) -> usize {
        self.current_bedrock
    }

    pub fn cells(&self) -> &[Token] {
        &self.cells
    }

    pub fn reset(&mut self) {
        self.cells.fill(TOKEN_EMPTY);
        self.current_bedrock = 0;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> Token {
        self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, token: Token) {
        let index = self.index(x, y);
        self.cells[index] = token;
        self.dirty = true;
    }

    pub fn can_put_piece(&self, piece: &Piece, rotation: i32, x: i32, y: i32) -> bool {
        piece.cells(rotation).all(|(dx, dy)| {
            let (tx, ty) = (x + dx, y + dy);
            self.in_bounds(tx, ty) && self.get(tx as usize, ty as usize) == TOKEN_EMPTY
        })
    }

    /// Writes the piece's cells. Cells outside the grid or already taken are
    /// skipped, which only matters for a force-locked piece.
    pub fn put_piece(&mut self, piece: &Piece, rotation: i32, x: i32, y: i32) {
        let token = piece.token();
        for (dx, dy) in piece.cells(rotation) {
            let (tx, ty) = (x + dx, y + dy);
            if !self.in_bounds(tx, ty) {
                continue;
            }
            let index = self.index(tx as usize, ty as usize);
            if self.cells[index] == TOKEN_EMPTY {
                self.cells[index] = token;
            }
        }
        self.dirty = true;
    }

    fn row(&self, y: usize) -> &[Token] {
        &self.cells[y * self.width..(y + 1) * self.width]
    }

    fn is_row_clearable(&self, y: usize) -> bool {
        self.row(y)
            .iter()
            .all(|token| *token != TOKEN_EMPTY && *token != TOKEN_BEDROCK)
    }

    pub fn clear_lines(&mut self) -> usize {
        let full: Vec<usize> = (0..self.height)
            .filter(|y| self.is_row_clearable(*y))
            .collect();
        if full.is_empty() {
            return 0;
        }

        let mut kept = vec![TOKEN_EMPTY; full.len() * self.width];
        for y in (0..self.height).filter(|y| !full.contains(y)) {
            kept.extend_from_slice(self.row(y));
        }
        self.cells = kept;
        self.dirty = true;
        full.len()
    }

    pub fn decrease_bedrock(&mut self, delta: usize) -> usize {
        let removed = delta.min(self.current_bedrock);
        if removed > 0 {
            let keep = (self.height - removed) * self.width;
            let mut shifted = vec![TOKEN_EMPTY; removed * self.width];
            shifted.extend_from_slice(&self.cells[..keep]);
            self.cells = shifted;
            self.current_bedrock -= removed;
            self.dirty = true;
        }
        delta - removed
    }

    /// Pushes everything up by `delta` rows and fills the bottom with bedrock.
    /// Returns true when the raise overflowed: either a non-empty cell was
    /// pushed off the top, or there was no room above the existing bedrock.
    pub fn increase_bedrock(&mut self, delta: usize) -> bool {
        if delta == 0 {
            return false;
        }

        let shift = delta.min(self.height);
        let mut overflow = delta > self.height - self.current_bedrock;
        overflow |= self.cells[..shift * self.width]
            .iter()
            .any(|token| *token != TOKEN_EMPTY);

        let mut raised = self.cells[shift * self.width..].to_vec();
        raised.resize(self.cells.len(), TOKEN_BEDROCK);
        self.cells = raised;
        self.current_bedrock = (self.current_bedrock + delta).min(self.height);
        self.dirty = true;
        overflow
    }

    pub fn resolve_line_clears(&mut self) -> LineClear {
        let lines = self.clear_lines();
        let produced_bedrock = self.decrease_bedrock(lines);
        LineClear {
            lines,
            produced_bedrock,
        }
    }

    pub fn shuffle_rows(&mut self, rng: &mut Rng) {
        let width = self.width;
        let open_rows = self.height - self.current_bedrock;
        for row in self.cells[..open_rows * width].chunks_mut(width) {
            rng.shuffle(row);
        }
        self.dirty = true;
    }

    pub fn encode64(&self) -> Vec<String> {
        encode_words(&self.cells)
    }

    pub fn decode64<S: AsRef<str>>(&mut self, words: &[S]) -> Result<(), CodecError> {
        let cells = decode_words(words, self.cells.len())?;
        let trailing_bedrock = cells
            .iter()
            .rev()
            .take_while(|token| **token == TOKEN_BEDROCK)
            .count();
        self.current_bedrock = trailing_bedrock.div_ceil(self.width.max(1));
        self.cells = cells;
        self.dirty = true;
        Ok(())
    }

    pub fn to_payload(&self) -> FieldPayload {
        FieldPayload {
            width: self.width,
            height: self.height,
            bedrock: self.current_bedrock,
            data: self.encode64(),
        }
    }
}
