use crate::constants::get_line_clear_score;
use crate::types::ScorePayload;

#[derive(Clone, Debug, Default)]
pub struct Score {
    score: u64,
    lines: u64,
    dirty: bool,
}

impl Score {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn add_lines(&mut self, lines: usize) -> u64 {
        if lines == 0 {
            return 0;
        }
        let gained = get_line_clear_score(lines);
        self.score += gained;
        self.lines += lines as u64;
        self.dirty = true;
        gained
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.lines = 0;
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn to_payload(&self) -> ScorePayload {
        ScorePayload {
            score: self.score,
            lines: self.lines,
        }
    }
}
