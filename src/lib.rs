// src/lib.rs
//! Streaming rainflow cycle counting.
//!
//! Two entry points share the [`engine::CountingEngine`] seam:
//! [`reducer::compute_matrix`] folds a whole history into a rainflow matrix,
//! and [`cycle_gen::CycleGen`] yields closed cycles lazily while pulling the
//! history in batches.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

pub mod cycle_gen;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod rainflow;
pub mod reducer;
pub mod sample;

#[cfg(feature = "cli")]
pub mod app_logic;
#[cfg(feature = "cli")]
pub mod config;
#[cfg(feature = "cli")]
pub mod timeseries;

pub use cycle_gen::{cycle_gen, CycleGen, GenState};
pub use engine::{CountingEngine, Cycle, EngineMode};
pub use error::{RflowError, Result};
pub use matrix::{Matrix, MatrixParams};
pub use rainflow::Rainflow;
pub use reducer::{compute_matrix, compute_matrix_with};
pub use sample::IntoSample;

/// Number of samples pulled from the producer per batch.
pub const SAMPLES_PER_PULL: usize = 1024;

// When the "wasm" feature is enabled, expose the counting to JavaScript.
// Cycles come back flattened as [start0, end0, start1, end1, ...].
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn run_rainflow(stress: &[f64]) -> std::result::Result<Vec<f64>, JsValue> {
    let cycles = rainflow::count_all(stress).map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(cycles.into_iter().flat_map(|c| [c.start, c.end]).collect())
}
