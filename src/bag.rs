use crate::piece::{Piece, ALL};
use crate::rng::Rng;

#[derive(Clone, Debug)]
pub struct Bag<T: Clone> {
    rng: Rng,
    fill: Vec<T>,
    elements: Vec<T>,
}

impl<T: Clone> Bag<T> {
    pub fn new(seed: i64, fill: Vec<T>) -> Self {
        Self {
            rng: Rng::from_seed(seed),
            fill,
            elements: Vec::new(),
        }
    }

    pub fn next_element(&mut self) -> Option<T> {
        if self.elements.is_empty() {
            self.elements = self.fill.clone();
            self.rng.shuffle(&mut self.elements);
        }
        self.elements.pop()
    }

    pub fn remaining(&self) -> usize {
        self.elements.len()
    }
}

#[derive(Clone, Debug)]
pub struct PieceGenerator {
    bag: Bag<&'static Piece>,
}

impl PieceGenerator {
    pub fn new(seed: i64) -> Self {
        Self {
            bag: Bag::new(seed, ALL.to_vec()),
        }
    }

    pub fn next_piece(&mut self) -> &'static Piece {
        // The fill is never empty.
        self.bag.next_element().unwrap_or(ALL[0])
    }
}
