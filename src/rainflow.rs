//! In-process streaming rainflow engine (four-point method).
//!
//! Samples are reduced to reversals on a stack. Whenever the top four
//! reversals `s1 s2 s3 s4` satisfy `|s2 - s3| <= |s1 - s2|` and
//! `|s2 - s3| <= |s3 - s4|`, the inner pair closes a cycle `(s2, s3)` and is
//! removed. Ending the history turns the remaining reversals into half cycles.
//!
//! The topmost reversal is provisional: a sample continuing the same
//! direction moves it instead of adding a new one. Since moving it only
//! widens `|s3 - s4|`, a pair that closes once stays closed.

use tracing::trace;

use crate::engine::{CountingEngine, Cycle, EngineMode};
use crate::error::EngineError;
use crate::matrix::{Matrix, MatrixParams};

#[derive(Debug)]
enum Sink {
    Passthrough(Vec<Cycle>),
    Matrix { params: MatrixParams, matrix: Matrix },
}

#[derive(Debug)]
pub struct Rainflow {
    reversals: Vec<f64>,
    sink: Sink,
    history_over: bool,
}

impl Rainflow {
    pub fn passthrough() -> Self {
        Rainflow {
            reversals: Vec::new(),
            sink: Sink::Passthrough(Vec::new()),
            history_over: false,
        }
    }

    fn push(&mut self, x: f64) {
        let n = self.reversals.len();
        match n {
            0 => self.reversals.push(x),
            1 => {
                if x != self.reversals[0] {
                    self.reversals.push(x);
                }
            }
            _ => {
                let a = self.reversals[n - 2];
                let b = self.reversals[n - 1];
                if x == b {
                    return;
                }
                if (b - a) * (x - b) > 0.0 {
                    self.reversals[n - 1] = x;
                } else {
                    self.reversals.push(x);
                }
                self.close_cycles();
            }
        }
    }

    fn close_cycles(&mut self) {
        while self.reversals.len() >= 4 {
            let n = self.reversals.len();
            let (s1, s2, s3, s4) = (
                self.reversals[n - 4],
                self.reversals[n - 3],
                self.reversals[n - 2],
                self.reversals[n - 1],
            );
            let inner = (s2 - s3).abs();
            if inner > (s1 - s2).abs() || inner > (s3 - s4).abs() {
                break;
            }
            self.reversals.drain(n - 3..n - 1);
            self.emit(Cycle::new(s2, s3));
        }
    }

    fn emit(&mut self, cycle: Cycle) {
        match &mut self.sink {
            Sink::Passthrough(cycles) => cycles.push(cycle),
            Sink::Matrix { params, matrix } => matrix.add(&cycle, params),
        }
    }
}

impl CountingEngine for Rainflow {
    fn init(mode: EngineMode) -> Result<Self, EngineError> {
        let sink = match mode {
            EngineMode::Passthrough => Sink::Passthrough(Vec::new()),
            EngineMode::Matrix(params) => {
                if params.amp_bin_count == 0 || params.mean_bin_count == 0 {
                    return Err(EngineError::Init("matrix needs at least one bin per axis".into()));
                }
                Sink::Matrix {
                    params,
                    matrix: Matrix::zeroed(params.amp_bin_count, params.mean_bin_count)?,
                }
            }
        };
        Ok(Rainflow {
            reversals: Vec::new(),
            sink,
            history_over: false,
        })
    }

    fn count(&mut self, samples: &[f64]) -> Result<(), EngineError> {
        if self.history_over {
            return Err(EngineError::HistoryClosed);
        }
        // reject the whole slice up front so a failed call changes nothing
        if let Some(&bad) = samples.iter().find(|x| !x.is_finite()) {
            return Err(EngineError::NonFiniteSample(bad));
        }
        for &x in samples {
            self.push(x);
        }
        Ok(())
    }

    fn end_history(&mut self) -> Result<(), EngineError> {
        if self.history_over {
            return Err(EngineError::HistoryClosed);
        }
        self.history_over = true;
        let residue = std::mem::take(&mut self.reversals);
        trace!(half_cycles = residue.len().saturating_sub(1), "flushing residue");
        for pair in residue.windows(2) {
            self.emit(Cycle::new(pair[0], pair[1]));
        }
        Ok(())
    }

    fn pop_cycles(&mut self) -> Result<Vec<Cycle>, EngineError> {
        match &mut self.sink {
            Sink::Passthrough(cycles) => Ok(std::mem::take(cycles)),
            Sink::Matrix { .. } => Ok(Vec::new()),
        }
    }

    fn cycle_list_size(&self) -> usize {
        match &self.sink {
            Sink::Passthrough(cycles) => cycles.len(),
            Sink::Matrix { .. } => 0,
        }
    }

    fn matrix(&self) -> Option<&Matrix> {
        match &self.sink {
            Sink::Matrix { matrix, .. } => Some(matrix),
            Sink::Passthrough(_) => None,
        }
    }
}

/// Counts a whole in-memory history at once and returns the mean and range
/// of every cycle, in the order they were closed.
pub fn rainflow(stress: &[f64]) -> Result<(Vec<f64>, Vec<f64>), EngineError> {
    let cycles = count_all(stress)?;
    let means = cycles.iter().map(Cycle::mean).collect();
    let ranges = cycles.iter().map(Cycle::range).collect();
    Ok((means, ranges))
}

/// All cycles of `stress`, including the half cycles of the residue.
pub fn count_all(stress: &[f64]) -> Result<Vec<Cycle>, EngineError> {
    let mut engine = Rainflow::passthrough();
    engine.count(stress)?;
    engine.end_history()?;
    engine.pop_cycles()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pairs(cycles: &[Cycle]) -> Vec<(f64, f64)> {
        cycles.iter().map(|&c| <(f64, f64)>::from(c)).collect()
    }

    #[test]
    fn triangle_wave() {
        let cycles = count_all(&[0.0, 1.0, 0.0, 1.0, 0.0]).unwrap();
        assert_eq!(pairs(&cycles), vec![(1.0, 0.0), (0.0, 1.0), (1.0, 0.0)]);
    }

    #[test]
    fn test_rainflow_case_1() {
        let series = vec![-2.0, 1.0, -3.0, 5.0, -1.0, 3.0, -4.0, 4.0, -2.0];
        let (mean, range) = rainflow(&series).unwrap();

        let expected_mean = vec![1.0, -0.5, -1.0, 1.0, 0.5, 0.0, 1.0];
        let expected_range = vec![4.0, 3.0, 4.0, 8.0, 9.0, 8.0, 6.0];

        assert_eq!(mean.len(), expected_mean.len());
        assert_eq!(range.len(), expected_range.len());
        for (m, &expected_m) in mean.iter().zip(expected_mean.iter()) {
            assert_relative_eq!(m, &expected_m, epsilon = 1e-6);
        }
        for (r, &expected_r) in range.iter().zip(expected_range.iter()) {
            assert_relative_eq!(r, &expected_r, epsilon = 1e-6);
        }
    }

    #[test]
    fn flat_and_monotone_runs_collapse() {
        let cycles = count_all(&[1.0, 1.0, 2.0, 3.0, 3.0, 4.0, 0.0, 0.0]).unwrap();
        assert_eq!(pairs(&cycles), vec![(1.0, 4.0), (4.0, 0.0)]);
        assert!(count_all(&[5.0, 5.0, 5.0]).unwrap().is_empty());
        assert!(count_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn cycles_close_while_counting() {
        let mut engine = Rainflow::passthrough();
        engine.count(&[0.0, 4.0, 1.0, 2.0]).unwrap();
        assert_eq!(engine.cycle_list_size(), 0);
        // falling below 1.0 closes (1, 2)
        engine.count(&[-1.0]).unwrap();
        assert_eq!(engine.cycle_list_size(), 1);
        assert_eq!(pairs(&engine.pop_cycles().unwrap()), vec![(1.0, 2.0)]);
        assert_eq!(engine.cycle_list_size(), 0);
        assert!(engine.pop_cycles().unwrap().is_empty());
    }

    #[test]
    fn non_finite_sample_is_rejected_without_side_effects() {
        let mut engine = Rainflow::passthrough();
        engine.count(&[0.0, 2.0]).unwrap();
        let err = engine.count(&[1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, EngineError::NonFiniteSample(v) if v.is_nan()));
        engine.end_history().unwrap();
        assert_eq!(pairs(&engine.pop_cycles().unwrap()), vec![(0.0, 2.0)]);
    }

    #[test]
    fn history_closes_once() {
        let mut engine = Rainflow::passthrough();
        engine.end_history().unwrap();
        assert_eq!(engine.end_history(), Err(EngineError::HistoryClosed));
        assert_eq!(engine.count(&[1.0]), Err(EngineError::HistoryClosed));
    }

    #[test]
    fn matrix_mode_folds_cycles() {
        let params = MatrixParams {
            amp_bin_count: 2,
            mean_bin_count: 2,
            mean_min: 0.0,
            amp_min: 0.0,
            mean_bin_size: 0.5,
            amp_bin_size: 0.5,
        };
        let mut engine = Rainflow::init(EngineMode::Matrix(params)).unwrap();
        assert_eq!(engine.matrix().map(Matrix::total), Some(0));
        engine.count(&[0.0, 1.0, 0.0, 1.0, 0.0]).unwrap();
        engine.end_history().unwrap();
        assert_eq!(engine.cycle_list_size(), 0);
        assert!(engine.pop_cycles().unwrap().is_empty());
        // three cycles of amplitude 0.5 and mean 0.5
        let matrix = engine.matrix().unwrap();
        assert_eq!(matrix.to_rows(), vec![vec![0, 0], vec![0, 3]]);
    }

    #[test]
    fn passthrough_has_no_matrix() {
        let engine = Rainflow::init(EngineMode::Passthrough).unwrap();
        assert!(engine.matrix().is_none());
    }
}
