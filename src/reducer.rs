//! Eager reduction of a whole history into a rainflow matrix.

use tracing::debug;

use crate::engine::{CountingEngine, EngineMode};
use crate::error::{EngineError, RflowError};
use crate::matrix::{Matrix, MatrixParams};
use crate::rainflow::Rainflow;
use crate::sample::{Feed, IntoSample, SampleFeeder};
use crate::SAMPLES_PER_PULL;

/// Computes the rainflow matrix of `data` with the bundled [`Rainflow`] engine.
///
/// # Arguments
///
/// * `data` - any iterable of values convertible to samples.
/// * `params` - matrix shape and binning.
///
/// # Errors
///
/// Zero bin counts, and shapes too large to allocate, are rejected before
/// `data` is iterated. Otherwise the
/// first conversion, engine or producer failure aborts the reduction and no
/// matrix is returned.
///
/// # Examples
///
/// ```
/// use rflow::matrix::MatrixParams;
/// use rflow::reducer::compute_matrix;
///
/// let params = MatrixParams {
///     amp_bin_count: 2,
///     mean_bin_count: 1,
///     mean_min: 0.0,
///     amp_min: 0.0,
///     mean_bin_size: 1.0,
///     amp_bin_size: 0.5,
/// };
/// let matrix = compute_matrix([0.0, 1.0, 0.0, 1.0, 0.0], &params).unwrap();
/// assert_eq!(matrix.to_rows(), vec![vec![0], vec![3]]);
/// ```
pub fn compute_matrix<I>(data: I, params: &MatrixParams) -> Result<Matrix, RflowError>
where
    I: IntoIterator,
    I::Item: IntoSample,
{
    compute_matrix_with::<Rainflow, I>(data, params)
}

/// Same as [`compute_matrix`] but counts with engine `E`.
pub fn compute_matrix_with<E, I>(data: I, params: &MatrixParams) -> Result<Matrix, RflowError>
where
    E: CountingEngine,
    I: IntoIterator,
    I::Item: IntoSample,
{
    params.validate()?;

    let mut engine = E::init(EngineMode::Matrix(*params))?;
    if engine.matrix().is_none() {
        return Err(EngineError::MissingMatrix.into());
    }
    debug!(
        amp_bins = params.amp_bin_count,
        mean_bins = params.mean_bin_count,
        "matrix session started"
    );

    let mut feeder = SampleFeeder::new(data.into_iter());
    while feeder.feed(&mut engine, SAMPLES_PER_PULL)? == Feed::Full {}
    engine.end_history()?;

    let matrix = engine.matrix().cloned().ok_or(EngineError::MissingMatrix)?;
    debug!(samples = feeder.consumed(), cycles = matrix.total(), "matrix complete");
    Ok(matrix)
}
