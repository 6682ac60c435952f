//! Id generation strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::base62::encode_fixed;
use crate::{IdGenerator, RecordId};

/// Spreads consecutive counter values across the id space.
const SCRAMBLE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Numeric ids continue after the largest existing one; a collection holding
/// any text id gets fixed-width base62 text ids instead. An empty collection
/// starts at `1`.
#[derive(Debug)]
pub struct NextIdGenerator {
    text_width: usize,
    counter: AtomicU64,
}

impl NextIdGenerator {
    pub fn new(text_width: usize, seed: u64) -> Self {
        Self {
            text_width,
            counter: AtomicU64::new(seed),
        }
    }

    fn next_text(&self) -> RecordId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        RecordId::Text(encode_fixed(n.wrapping_mul(SCRAMBLE), self.text_width))
    }
}

impl IdGenerator for NextIdGenerator {
    fn next_id(&self, existing: &[RecordId]) -> RecordId {
        let mut max = 0u64;
        for id in existing {
            match id.as_number() {
                Some(n) => max = max.max(n),
                None => return self.next_text(),
            }
        }
        match max.checked_add(1) {
            Some(next) => RecordId::Number(next),
            None => self.next_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection_starts_at_one() {
        let g = NextIdGenerator::new(7, 0);
        assert_eq!(g.next_id(&[]), RecordId::Number(1));
    }

    #[test]
    fn numeric_ids_continue_after_max() {
        let g = NextIdGenerator::new(7, 0);
        let existing = [RecordId::Number(3), RecordId::Number(98443197), RecordId::Number(5)];
        assert_eq!(g.next_id(&existing), RecordId::Number(98443198));
    }

    #[test]
    fn text_ids_when_collection_has_text() {
        let g = NextIdGenerator::new(7, 1);
        let existing = [RecordId::Number(3), RecordId::Text("a8f2".into())];
        let a = g.next_id(&existing);
        let b = g.next_id(&existing);
        match (&a, &b) {
            (RecordId::Text(x), RecordId::Text(y)) => {
                assert_eq!(x.len(), 7);
                assert_ne!(x, y);
            }
            _ => panic!("expected text ids"),
        }
    }
}
