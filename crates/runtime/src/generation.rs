use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use foundation::ids::Generation;

/// Shared, monotonically increasing generation counter.
///
/// The owner hands clones to whoever starts new attempts; every clone sees the
/// same value. The counter never goes backwards.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    value: Arc<AtomicU64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Generation {
        Generation(self.value.load(Ordering::Acquire))
    }

    /// Starts a new generation and returns it.
    pub fn advance(&self) -> Generation {
        Generation(self.value.fetch_add(1, Ordering::AcqRel) + 1)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationCounter;
    use foundation::ids::Generation;

    #[test]
    fn clones_share_one_sequence() {
        let a = GenerationCounter::new();
        let b = a.clone();
        assert_eq!(a.current(), Generation::ZERO);
        assert_eq!(b.advance(), Generation(1));
        assert_eq!(a.advance(), Generation(2));
        assert!(b.is_current(Generation(2)));
        assert!(!b.is_current(Generation(1)));
    }
}
