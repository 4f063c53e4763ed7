//! A module for the main application logic: run every load case of a
//! configuration and write one report per load case.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::{load_config, Config, Mode};
use crate::cycle_gen::cycle_gen;
use crate::matrix::{Matrix, MatrixParams};
use crate::reducer::compute_matrix;
use crate::sample::IntoSample;
use crate::timeseries::LoadCase;

/// Outcome of one load case.
#[derive(Debug, Clone, Serialize)]
pub struct LoadCaseReport {
    pub name: String,
    /// Number of cycles counted.
    pub cycles: u64,
    pub output: PathBuf,
}

/// JSON layout of a written matrix.
#[derive(Debug, Serialize)]
pub struct MatrixReport<'a> {
    pub params: &'a MatrixParams,
    pub total: u64,
    /// One row per amplitude bin, one column per mean bin.
    pub rows: Vec<Vec<u64>>,
}

impl<'a> MatrixReport<'a> {
    pub fn new(params: &'a MatrixParams, matrix: &Matrix) -> Self {
        MatrixReport {
            params,
            total: matrix.total(),
            rows: matrix.to_rows(),
        }
    }
}

/// Loads, validates and runs the configuration at `config_path`.
pub fn run(config_path: &str) -> Result<Vec<LoadCaseReport>> {
    info!(config = config_path, "running");
    let conf = load_config(config_path)?;
    conf.validate()
        .with_context(|| format!("invalid configuration {config_path}"))?;
    run_config(&conf)
}

/// Runs every load case of an already validated configuration.
///
/// Load cases are independent and run in parallel, each with its own
/// counting session.
pub fn run_config(conf: &Config) -> Result<Vec<LoadCaseReport>> {
    let out_dir = Path::new(conf.solution.output.trim());
    fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create output directory {}", out_dir.display()))?;
    let base = Path::new(conf.timeseries.path.trim());

    conf.timeseries
        .loadcases
        .par_iter()
        .map(|lc| {
            run_loadcase(conf, lc, base, out_dir)
                .with_context(|| format!("load case {} failed", lc.file))
        })
        .collect()
}

fn run_loadcase(conf: &Config, lc: &LoadCase, base: &Path, out_dir: &Path) -> Result<LoadCaseReport> {
    let name = lc.name();
    let history = lc.open(base)?;

    let (cycles, output) = match conf.solution.mode {
        Mode::Cycles => {
            let output = out_dir.join(format!("{name}.cycles.csv"));
            let file = File::create(&output)
                .with_context(|| format!("cannot create {}", output.display()))?;
            (write_cycles(history, BufWriter::new(file))?, output)
        }
        Mode::Matrix => {
            let params = conf.matrix.as_ref().context("matrix parameters missing")?;
            let matrix = compute_matrix(history, params)?;
            let output = out_dir.join(format!("{name}.matrix.json"));
            let file = File::create(&output)
                .with_context(|| format!("cannot create {}", output.display()))?;
            write_matrix(params, &matrix, BufWriter::new(file))?;
            (matrix.total(), output)
        }
    };

    info!(loadcase = %name, cycles, output = %output.display(), "load case done");
    Ok(LoadCaseReport { name, cycles, output })
}

/// Streams the cycles of `data` to `writer` as CSV with a `start,end`
/// header and returns how many were written.
///
/// Rows already written stay written if counting fails part way.
pub fn write_cycles<D, W>(data: D, writer: W) -> Result<u64>
where
    D: IntoIterator,
    D::Item: IntoSample,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut written = 0;
    for cycle in cycle_gen(data)? {
        wtr.serialize(cycle?)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// Writes `matrix` as pretty JSON.
pub fn write_matrix<W: Write>(params: &MatrixParams, matrix: &Matrix, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &MatrixReport::new(params, matrix))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_cycles_as_csv() {
        let mut out = Vec::new();
        let n = write_cycles([0.0, 1.0, 0.0, 1.0, 0.0], &mut out).unwrap();
        assert_eq!(n, 3);
        assert_eq!(String::from_utf8(out).unwrap(), "start,end\n1.0,0.0\n0.0,1.0\n1.0,0.0\n");
    }

    #[test]
    fn conversion_error_stops_the_stream() {
        let mut out = Vec::new();
        let err = write_cycles(vec!["1", "-1", "nope"], &mut out).unwrap_err();
        assert!(err.to_string().contains("element 2"));
    }

    #[test]
    fn writes_matrix_json() {
        let params = MatrixParams {
            amp_bin_count: 2,
            mean_bin_count: 1,
            mean_min: 0.0,
            amp_min: 0.0,
            mean_bin_size: 1.0,
            amp_bin_size: 0.5,
        };
        let matrix = compute_matrix([0.0, 1.0, 0.0, 1.0, 0.0], &params).unwrap();
        let mut out = Vec::new();
        write_matrix(&params, &matrix, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["rows"], serde_json::json!([[0], [3]]));
        assert_eq!(json["params"]["amp_bin_count"], 2);
    }
}
