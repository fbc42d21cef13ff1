use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct IdSequence {
    prefix: &'static str,
    next: AtomicU64,
}

impl IdSequence {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }

    pub fn next_raw(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_id(&self) -> String {
        let seq = self.next_raw();
        format!("{}_{seq}", self.prefix)
    }
}
