//! Turning producer items into samples and feeding them to an engine.

use serde_json::Value;
use tracing::{trace, warn};

use crate::engine::CountingEngine;
use crate::error::{BoxError, ConversionError, RflowError};

/// Why an input item did not yield a sample.
#[derive(Debug)]
pub enum SampleError {
    Conversion(ConversionError),
    /// The item was an error reported by the producer.
    Producer(BoxError),
}

impl From<ConversionError> for SampleError {
    fn from(e: ConversionError) -> Self {
        SampleError::Conversion(e)
    }
}

/// Anything that can be read as a floating-point sample.
pub trait IntoSample {
    fn into_sample(self) -> Result<f64, SampleError>;
}

impl IntoSample for f64 {
    #[inline]
    fn into_sample(self) -> Result<f64, SampleError> {
        Ok(self)
    }
}

macro_rules! lossless_sample {
    ($($t:ty),*) => {
        $(impl IntoSample for $t {
            #[inline]
            fn into_sample(self) -> Result<f64, SampleError> {
                Ok(f64::from(self))
            }
        })*
    };
}

lossless_sample!(f32, i8, i16, i32, u8, u16, u32);

macro_rules! wide_sample {
    ($($t:ty),*) => {
        $(impl IntoSample for $t {
            #[inline]
            fn into_sample(self) -> Result<f64, SampleError> {
                Ok(self as f64)
            }
        })*
    };
}

// 64-bit integers round to the nearest double, same as a host float() call
wide_sample!(i64, u64, isize, usize);

impl<T: IntoSample + Copy> IntoSample for &T {
    fn into_sample(self) -> Result<f64, SampleError> {
        (*self).into_sample()
    }
}

impl IntoSample for &str {
    fn into_sample(self) -> Result<f64, SampleError> {
        self.trim()
            .parse::<f64>()
            .map_err(|e| ConversionError::new(format!("{self:?}"), e.to_string()).into())
    }
}

impl IntoSample for String {
    fn into_sample(self) -> Result<f64, SampleError> {
        self.as_str().into_sample()
    }
}

impl IntoSample for Value {
    fn into_sample(self) -> Result<f64, SampleError> {
        match self {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| ConversionError::new(n.to_string(), "out of range").into()),
            Value::String(s) => s.as_str().into_sample(),
            other => Err(ConversionError::new(other.to_string(), "not a number").into()),
        }
    }
}

impl<T, E> IntoSample for Result<T, E>
where
    T: IntoSample,
    E: Into<BoxError>,
{
    fn into_sample(self) -> Result<f64, SampleError> {
        match self {
            Ok(v) => v.into_sample(),
            Err(e) => Err(SampleError::Producer(e.into())),
        }
    }
}

/// Outcome of one pull of samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Feed {
    /// The requested number of samples was fed.
    Full,
    /// The producer ran dry; the batch may be short or empty.
    Exhausted,
}

/// Pulls items from a producer one at a time and counts them.
pub(crate) struct SampleFeeder<I> {
    input: I,
    consumed: usize,
}

impl<I> SampleFeeder<I>
where
    I: Iterator,
    I::Item: IntoSample,
{
    pub(crate) fn new(input: I) -> Self {
        SampleFeeder { input, consumed: 0 }
    }

    /// Number of items taken from the producer so far.
    pub(crate) fn consumed(&self) -> usize {
        self.consumed
    }

    /// Feeds up to `limit` samples to `engine`, one `count` call per sample.
    ///
    /// Does not end the history; that is left to the caller on
    /// [`Feed::Exhausted`].
    pub(crate) fn feed<E: CountingEngine>(
        &mut self,
        engine: &mut E,
        limit: usize,
    ) -> Result<Feed, RflowError> {
        for _ in 0..limit {
            let Some(item) = self.input.next() else {
                trace!(consumed = self.consumed, "producer exhausted");
                return Ok(Feed::Exhausted);
            };
            let index = self.consumed;
            self.consumed += 1;

            let sample = item.into_sample().map_err(|e| match e {
                SampleError::Conversion(source) => {
                    warn!(index, %source, "dropping history on bad sample");
                    RflowError::Conversion { index, source }
                }
                SampleError::Producer(e) => RflowError::Producer(e),
            })?;
            engine.count(std::slice::from_ref(&sample))?;
        }
        Ok(Feed::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineMode;
    use crate::rainflow::Rainflow;
    use serde_json::json;

    fn sample<T: IntoSample>(v: T) -> Option<f64> {
        v.into_sample().ok()
    }

    #[test]
    fn numeric_values_convert() {
        assert_eq!(sample(1.5f64), Some(1.5));
        assert_eq!(sample(2.5f32), Some(2.5));
        assert_eq!(sample(-3i32), Some(-3.0));
        assert_eq!(sample(7u64), Some(7.0));
        assert_eq!(sample(&4i16), Some(4.0));
        assert_eq!(sample(" 1e3 "), Some(1000.0));
        assert_eq!(sample(String::from("-0.25")), Some(-0.25));
    }

    #[test]
    fn json_values_convert() {
        assert_eq!(sample(json!(3)), Some(3.0));
        assert_eq!(sample(json!(-1.25)), Some(-1.25));
        assert_eq!(sample(json!("12")), Some(12.0));
        assert!(matches!(json!(null).into_sample(), Err(SampleError::Conversion(_))));
        assert!(matches!(json!([1]).into_sample(), Err(SampleError::Conversion(_))));
        assert!(matches!(json!("abc").into_sample(), Err(SampleError::Conversion(_))));
    }

    #[test]
    fn producer_errors_are_not_conversions() {
        let item: Result<f64, std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        match item.into_sample() {
            Err(SampleError::Producer(e)) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn feed_stops_at_limit_and_on_exhaustion() {
        let mut engine = Rainflow::init(EngineMode::Passthrough).unwrap();
        let mut feeder = SampleFeeder::new([0.0, 1.0, 0.0, 1.0, 0.0].into_iter());
        assert_eq!(feeder.feed(&mut engine, 3).unwrap(), Feed::Full);
        assert_eq!(feeder.consumed(), 3);
        assert_eq!(feeder.feed(&mut engine, 3).unwrap(), Feed::Exhausted);
        assert_eq!(feeder.consumed(), 5);
        assert_eq!(feeder.feed(&mut engine, 3).unwrap(), Feed::Exhausted);
    }

    #[test]
    fn feed_reports_index_of_bad_element() {
        let mut engine = Rainflow::init(EngineMode::Passthrough).unwrap();
        let mut feeder = SampleFeeder::new(vec!["1", "2", "x", "4"].into_iter());
        let err = feeder.feed(&mut engine, 10).unwrap_err();
        assert!(matches!(err, RflowError::Conversion { index: 2, .. }));
        assert_eq!(feeder.consumed(), 3);
    }

    #[test]
    fn feed_surfaces_engine_failures() {
        let mut engine = Rainflow::init(EngineMode::Passthrough).unwrap();
        let mut feeder = SampleFeeder::new([1.0, f64::INFINITY].into_iter());
        let err = feeder.feed(&mut engine, 10).unwrap_err();
        assert!(matches!(err, RflowError::Engine(_)));
    }
}
