//! Rainflow matrix: cycle counts binned by amplitude and mean.

use serde::{Deserialize, Serialize};

use crate::engine::Cycle;
use crate::error::{EngineError, RflowError};

/// Shape and binning of a rainflow matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixParams {
    /// Number of amplitude bins (matrix rows).
    pub amp_bin_count: usize,
    /// Number of mean value bins (matrix columns).
    pub mean_bin_count: usize,
    /// Lower edge of the first mean bin.
    pub mean_min: f64,
    /// Lower edge of the first amplitude bin.
    pub amp_min: f64,
    pub mean_bin_size: f64,
    pub amp_bin_size: f64,
}

impl MatrixParams {
    /// Checks that both bin counts are positive and that the matrix they
    /// describe can be addressed.
    ///
    /// Bin sizes are left alone; a non-positive size sends every cycle into
    /// an edge bin rather than failing.
    ///
    /// # Examples
    ///
    /// ```
    /// use rflow::matrix::MatrixParams;
    ///
    /// let params = MatrixParams {
    ///     amp_bin_count: 4,
    ///     mean_bin_count: 2,
    ///     mean_min: -1.0,
    ///     amp_min: 0.0,
    ///     mean_bin_size: 1.0,
    ///     amp_bin_size: 0.5,
    /// };
    /// assert!(params.validate().is_ok());
    ///
    /// let no_rows = MatrixParams { amp_bin_count: 0, ..params };
    /// assert!(no_rows.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), RflowError> {
        if self.mean_bin_count == 0 {
            return Err(RflowError::config("mean_bin_count must be positive"));
        }
        if self.amp_bin_count == 0 {
            return Err(RflowError::config("amp_bin_count must be positive"));
        }
        if cell_count(self.amp_bin_count, self.mean_bin_count).is_none() {
            return Err(RflowError::Config(format!(
                "{} x {} bins is too large a matrix",
                self.amp_bin_count, self.mean_bin_count
            )));
        }
        Ok(())
    }
}

/// Grid of cycle counts, one row per amplitude bin and one column per mean bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix {
    amp_bin_count: usize,
    mean_bin_count: usize,
    bins: Vec<u64>,
}

impl Matrix {
    /// An all-zero matrix of the given shape.
    ///
    /// Fails when the cell count overflows or the bins cannot be allocated.
    pub fn zeroed(amp_bin_count: usize, mean_bin_count: usize) -> Result<Self, EngineError> {
        let cells = cell_count(amp_bin_count, mean_bin_count).ok_or_else(|| {
            EngineError::Init(format!("{amp_bin_count} x {mean_bin_count} bins overflow"))
        })?;
        let mut bins = Vec::new();
        bins.try_reserve_exact(cells)
            .map_err(|e| EngineError::Init(format!("cannot allocate {cells} bins: {e}")))?;
        bins.resize(cells, 0);
        Ok(Matrix {
            amp_bin_count,
            mean_bin_count,
            bins,
        })
    }

    pub fn amp_bin_count(&self) -> usize {
        self.amp_bin_count
    }

    pub fn mean_bin_count(&self) -> usize {
        self.mean_bin_count
    }

    pub fn get(&self, amp_bin: usize, mean_bin: usize) -> Option<u64> {
        if amp_bin >= self.amp_bin_count || mean_bin >= self.mean_bin_count {
            return None;
        }
        self.bins.get(amp_bin * self.mean_bin_count + mean_bin).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u64]> + '_ {
        // chunks() panics on zero, and a zero-width matrix has no cells anyway
        self.bins.chunks(self.mean_bin_count.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.rows().map(<[u64]>::to_vec).collect()
    }

    /// Total number of cycles counted.
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Counts `cycle` in its amplitude/mean bin.
    ///
    /// Values outside the binned range land in the nearest edge bin so that
    /// every cycle is counted exactly once.
    pub fn add(&mut self, cycle: &Cycle, params: &MatrixParams) {
        if self.bins.is_empty() {
            return;
        }
        let row = bin_index(cycle.amplitude(), params.amp_min, params.amp_bin_size, self.amp_bin_count);
        let col = bin_index(cycle.mean(), params.mean_min, params.mean_bin_size, self.mean_bin_count);
        self.bins[row * self.mean_bin_count + col] += 1;
    }
}

/// Cells needed for the matrix, or `None` if that many `u64`s are not
/// addressable.
fn cell_count(amp_bin_count: usize, mean_bin_count: usize) -> Option<usize> {
    amp_bin_count
        .checked_mul(mean_bin_count)
        .filter(|&cells| cells <= isize::MAX as usize / std::mem::size_of::<u64>())
}

fn bin_index(value: f64, min: f64, size: f64, count: usize) -> usize {
    let idx = ((value - min) / size).floor();
    // NaN and negatives go to the first bin
    if !(idx > 0.0) {
        return 0;
    }
    (idx as usize).min(count - 1)
}
