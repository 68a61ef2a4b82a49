//! Signals: the directed edges of the dataflow graph.

use super::types::BlockId;

/// A block output wired to any number of block inputs.
///
/// Every assignment of a value is appended to the signal's history, which is
/// what `plot` reads after a simulation run.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Block that writes this signal
    pub owner: BlockId,
    /// Set once the owner has been computed in the current step
    pub ready: bool,
    value: f64,
    history: Vec<f64>,
}

impl Signal {
    /// Create a new signal owned by `owner` with value zero.
    pub fn new(owner: BlockId) -> Self {
        Self {
            owner,
            ready: false,
            value: 0.0,
            history: Vec::new(),
        }
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Assign a new value and record it.
    pub fn set(&mut self, value: f64) {
        self.value = value;
        self.history.push(value);
    }

    /// Replace the value without recording it and forget the history.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
        self.history.clear();
    }

    /// Forget the history, keeping the current value.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Every value assigned since the last reset.
    pub fn history(&self) -> &[f64] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_records_assignments() {
        let mut s = Signal::new(BlockId(0));
        s.set(1.0);
        s.set(2.5);
        assert_eq!(s.value(), 2.5);
        assert_eq!(s.history(), &[1.0, 2.5]);

        s.reset(0.0);
        assert_eq!(s.value(), 0.0);
        assert!(s.history().is_empty());
    }
}
