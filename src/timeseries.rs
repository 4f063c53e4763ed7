//! Load histories stored on disk, read lazily as sample producers.
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::ValidationError;
use crate::error::BoxError;

/// A lazily read load history. Items are raw values; turning them into
/// samples is left to the counting side.
pub type History = Box<dyn Iterator<Item = Result<Value, BoxError>> + Send>;

#[derive(Debug, Deserialize)]
pub struct TimeSeries {
    /// Directory the load case files are relative to.
    pub path: String,
    pub loadcases: Vec<LoadCase>,
}

/// On-disk layout of a load history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    /// Delimited text, one sample per record taken from a fixed column.
    Csv,
    /// A stream of JSON values; arrays are flattened.
    Json,
    /// One sample per non-blank line.
    Lines,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParseConfig {
    /// Leading records (or lines) to skip.
    #[serde(default)]
    pub header: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_delimiter() -> String {
    ",".to_owned()
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            header: 0,
            delimiter: default_delimiter(),
        }
    }
}

impl ParseConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.delimiter.len() != 1 {
            return Err(ValidationError::new(&format!(
                "delimiter must be a single byte, got {:?}",
                self.delimiter
            )));
        }
        Ok(())
    }

    fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

#[derive(Debug, Deserialize)]
pub struct LoadCase {
    pub file: String,
    pub format: Format,
    /// Zero-based CSV column holding the samples.
    #[serde(default)]
    pub column: usize,
    #[serde(default)]
    pub parse_config: ParseConfig,
}

impl LoadCase {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.file.trim().is_empty() {
            return Err(ValidationError::new("file must not be empty"));
        }
        self.parse_config.validate()
    }

    /// File stem used to name this load case's outputs.
    pub fn name(&self) -> String {
        Path::new(self.file.trim())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.trim().to_owned())
    }

    pub fn open(&self, base: &Path) -> anyhow::Result<History> {
        read_history(
            &base.join(self.file.trim()),
            self.format,
            self.column,
            &self.parse_config,
        )
    }
}

impl TimeSeries {
    /// Validates the load case list and checks that every file exists.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.path.trim().is_empty() {
            return Err(ValidationError::new("path must not be empty"));
        }
        if self.loadcases.is_empty() {
            return Err(ValidationError::new("loadcases must not be empty"));
        }
        for lc in &self.loadcases {
            lc.validate()?;
            let full_path = self.loadcase_path(lc);
            if !full_path.exists() {
                return Err(ValidationError::new(&format!(
                    "loadcase file does not exist: {}",
                    full_path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn loadcase_path(&self, lc: &LoadCase) -> PathBuf {
        Path::new(self.path.trim()).join(lc.file.trim())
    }
}

/// Opens `path` and returns its values lazily.
///
/// Read failures part way through the file show up as `Err` items rather
/// than ending the history early.
pub fn read_history(
    path: &Path,
    format: Format,
    column: usize,
    parse: &ParseConfig,
) -> anyhow::Result<History> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    let history: History = match format {
        Format::Csv => {
            let reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .trim(csv::Trim::All)
                .delimiter(parse.delimiter_byte())
                .from_reader(file);
            Box::new(reader.into_records().skip(parse.header).map(move |rec| -> Result<Value, BoxError> {
                let rec = rec?;
                let line = rec.position().map_or(0, |p| p.line());
                rec.get(column)
                    .map(|field| Value::String(field.to_owned()))
                    .ok_or_else(|| format!("line {line} has no column {column}").into())
            }))
        }
        Format::Lines => Box::new(
            BufReader::new(file)
                .lines()
                .skip(parse.header)
                .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
                .map(|line| line.map(Value::String).map_err(BoxError::from)),
        ),
        Format::Json => {
            let stream = serde_json::Deserializer::from_reader(BufReader::new(file)).into_iter::<Value>();
            Box::new(stream.flat_map(|item| -> History {
                match item {
                    Ok(Value::Array(values)) => Box::new(values.into_iter().map(Ok)),
                    Ok(value) => Box::new(std::iter::once(Ok(value))),
                    Err(e) => Box::new(std::iter::once(Err(BoxError::from(e)))),
                }
            }))
        }
    };
    Ok(history)
}
