//! Lazy generator of rainflow cycles over a sample producer.
//!
//! [`CycleGen`] pulls samples in batches of [`SAMPLES_PER_PULL`], counts
//! them with a passthrough engine session and hands out the closed cycles one
//! by one. Only one drained batch of cycles is held at a time.
//!
//! After an error the generator is poisoned: the failing call returns the
//! error once and every later call returns `None`.

use std::iter::FusedIterator;

use tracing::{debug, trace, warn};

use crate::engine::{CountingEngine, Cycle, EngineMode};
use crate::error::RflowError;
use crate::rainflow::Rainflow;
use crate::sample::{Feed, IntoSample, SampleFeeder};
use crate::SAMPLES_PER_PULL;

/// Where the generator stands between two calls to `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenState {
    /// No undelivered cycles; more samples may still arrive.
    Filling,
    /// Undelivered cycles are buffered.
    Draining,
    /// History ended and everything was delivered, or an error occurred.
    Done,
}

pub struct CycleGen<I, E = Rainflow> {
    engine: E,
    feeder: SampleFeeder<I>,
    buffer: Vec<Cycle>,
    cursor: usize,
    history_over: bool,
    /// Failure seen while feeding, raised once the cycles closed before it
    /// have been delivered.
    deferred: Option<RflowError>,
    poisoned: bool,
}

/// Starts a cycle generator over `data` with the bundled [`Rainflow`] engine.
///
/// ```
/// let cycles: Vec<(f64, f64)> = rflow::cycle_gen([0.0, 1.0, 0.0, 1.0, 0.0])
///     .unwrap()
///     .map(|c| c.map(|c| (c.start, c.end)))
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(cycles, vec![(1.0, 0.0), (0.0, 1.0), (1.0, 0.0)]);
/// ```
pub fn cycle_gen<D>(data: D) -> Result<CycleGen<D::IntoIter>, RflowError>
where
    D: IntoIterator,
    D::Item: IntoSample,
{
    CycleGen::new(data.into_iter())
}

impl<I, E> CycleGen<I, E>
where
    I: Iterator,
    I::Item: IntoSample,
    E: CountingEngine,
{
    /// Opens a passthrough session of engine `E` over `input`.
    ///
    /// Nothing is pulled from `input` until the first call to `next`.
    pub fn new(input: I) -> Result<Self, RflowError> {
        let engine = E::init(EngineMode::Passthrough)?;
        debug!("cycle generator session started");
        Ok(CycleGen {
            engine,
            feeder: SampleFeeder::new(input),
            buffer: Vec::new(),
            cursor: 0,
            history_over: false,
            deferred: None,
            poisoned: false,
        })
    }

    pub fn state(&self) -> GenState {
        if self.cursor < self.buffer.len() {
            GenState::Draining
        } else if self.poisoned || (self.history_over && self.deferred.is_none()) {
            GenState::Done
        } else {
            GenState::Filling
        }
    }

    /// Number of producer items consumed so far.
    pub fn samples_consumed(&self) -> usize {
        self.feeder.consumed()
    }

    fn advance(&mut self) -> Result<Option<Cycle>, RflowError> {
        loop {
            if let Some(&cycle) = self.buffer.get(self.cursor) {
                self.cursor += 1;
                return Ok(Some(cycle));
            }
            if let Some(e) = self.deferred.take() {
                return Err(e);
            }
            if self.history_over {
                return Ok(None);
            }
            if self.fill()? == 0 {
                return Ok(None);
            }
            self.buffer = self.engine.pop_cycles()?;
            self.cursor = 0;
            trace!(cycles = self.buffer.len(), "drained engine");
        }
    }

    /// Feeds batches until the engine holds cycles or the history ends.
    /// Returns the number of cycles waiting in the engine.
    ///
    /// A failure while cycles are already waiting is deferred until they
    /// have been delivered.
    fn fill(&mut self) -> Result<usize, RflowError> {
        loop {
            if let Err(e) = self.feed_batch() {
                let pending = self.engine.cycle_list_size();
                if pending == 0 {
                    return Err(e);
                }
                self.deferred = Some(e);
                return Ok(pending);
            }
            let pending = self.engine.cycle_list_size();
            if pending > 0 || self.history_over {
                return Ok(pending);
            }
        }
    }

    fn feed_batch(&mut self) -> Result<(), RflowError> {
        if self.feeder.feed(&mut self.engine, SAMPLES_PER_PULL)? == Feed::Exhausted {
            // set first: a failed end_history is never retried
            self.history_over = true;
            self.engine.end_history()?;
            debug!(samples = self.feeder.consumed(), "history closed");
        }
        Ok(())
    }

    fn poison(&mut self) {
        self.poisoned = true;
        self.buffer = Vec::new();
        self.cursor = 0;
        self.deferred = None;
    }
}

impl<I, E> Iterator for CycleGen<I, E>
where
    I: Iterator,
    I::Item: IntoSample,
    E: CountingEngine,
{
    type Item = Result<Cycle, RflowError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned {
            return None;
        }
        match self.advance() {
            Ok(cycle) => cycle.map(Ok),
            Err(e) => {
                warn!(samples = self.feeder.consumed(), error = %e, "cycle generator failed");
                self.poison();
                Some(Err(e))
            }
        }
    }
}

impl<I, E> FusedIterator for CycleGen<I, E>
where
    I: Iterator,
    I::Item: IntoSample,
    E: CountingEngine,
{
}
