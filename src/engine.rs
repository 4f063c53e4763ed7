//! The counting-engine seam.
//!
//! An engine owns the algorithmic state of one counting session. The reducer
//! and the cycle generator only drive it through [`CountingEngine`]; any type
//! honouring the contract below can be plugged in.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::matrix::{Matrix, MatrixParams};

/// One closed rainflow cycle, from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub start: f64,
    pub end: f64,
}

impl Cycle {
    pub fn new(start: f64, end: f64) -> Self {
        Cycle { start, end }
    }

    /// Half the range, `|end - start| / 2`.
    pub fn amplitude(&self) -> f64 {
        (self.end - self.start).abs() / 2.0
    }

    pub fn range(&self) -> f64 {
        (self.end - self.start).abs()
    }

    pub fn mean(&self) -> f64 {
        (self.end + self.start) / 2.0
    }
}

impl From<Cycle> for (f64, f64) {
    fn from(c: Cycle) -> Self {
        (c.start, c.end)
    }
}

impl From<(f64, f64)> for Cycle {
    fn from((start, end): (f64, f64)) -> Self {
        Cycle { start, end }
    }
}

/// How a session reports closed cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineMode {
    /// Closed cycles are kept individually until popped.
    Passthrough,
    /// Closed cycles are folded into a fixed-size amplitude/mean matrix.
    Matrix(MatrixParams),
}

/// A stateful rainflow counting session.
///
/// Contract:
/// - `end_history` is called at most once, and `count` never after it.
/// - `pop_cycles` hands over every cycle closed since the previous pop.
/// - `cycle_list_size` is the number of cycles a `pop_cycles` would return.
/// - `matrix` is only `Some` for sessions created in [`EngineMode::Matrix`].
///
/// Dropping the session destroys it.
pub trait CountingEngine {
    fn init(mode: EngineMode) -> Result<Self, EngineError>
    where
        Self: Sized;

    fn count(&mut self, samples: &[f64]) -> Result<(), EngineError>;

    fn end_history(&mut self) -> Result<(), EngineError>;

    fn pop_cycles(&mut self) -> Result<Vec<Cycle>, EngineError>;

    fn cycle_list_size(&self) -> usize;

    fn matrix(&self) -> Option<&Matrix>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cycle_measures() {
        let c = Cycle::new(-2.0, 6.0);
        assert_relative_eq!(c.amplitude(), 4.0);
        assert_relative_eq!(c.range(), 8.0);
        assert_relative_eq!(c.mean(), 2.0);
        assert_eq!(<(f64, f64)>::from(c), (-2.0, 6.0));
    }
}
