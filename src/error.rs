//! Error types shared by the reducer, the cycle generator and the engines.

use thiserror::Error;

/// Boxed error raised by an input producer, kept as-is for the caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, RflowError>;

#[derive(Error, Debug)]
pub enum RflowError {
    /// Invalid parameters, reported before any engine session exists.
    #[error("configuration error: {0}")]
    Config(String),

    /// An input element could not be read as a sample.
    #[error("element {index} is not a valid sample: {source}")]
    Conversion {
        index: usize,
        #[source]
        source: ConversionError,
    },

    #[error("low level error in counting engine: {0}")]
    Engine(#[from] EngineError),

    /// The input sequence itself failed while being pulled.
    #[error(transparent)]
    Producer(BoxError),
}

impl RflowError {
    pub fn config(message: impl Into<String>) -> Self {
        RflowError::Config(message.into())
    }
}

/// Failure to coerce a value into an `f64` sample.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert {value} to a float ({reason})")]
pub struct ConversionError {
    pub value: String,
    pub reason: String,
}

impl ConversionError {
    pub fn new(value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConversionError {
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("sample {0} is not finite")]
    NonFiniteSample(f64),

    #[error("history already ended")]
    HistoryClosed,

    #[error("session has no matrix")]
    MissingMatrix,

    #[error("failed to initialise session: {0}")]
    Init(String),
}
