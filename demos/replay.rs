//! Replays a recorded flight through the apogee pipeline.
//!
//! ```text
//! cargo run --example replay -- <telemetry.csv> [config.json] [--rc <cutoff-hz>]
//! ```
//!
//! Set `RUST_LOG=apogee_estimator=debug` to trace every processed sample.

use std::error::Error;
use std::fs::File;

use apogee_estimator::rc_filter::{average_sample_time, FilterBank, RcCoefficients};
use apogee_estimator::{
    AccelerometerReading, ApogeePipeline, FlightSample, FlightTrack, PipelineConfig,
};
use csv::ReaderBuilder;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// One row of the telemetry log.
#[derive(Debug, Clone, Deserialize)]
struct TelemetryRow {
    /// The sample time, in seconds.
    time: f64,
    pressure: f64,
    acc_x: f64,
    acc_y: f64,
    acc_z: f64,
    /// The total acceleration; derived from the axes when absent.
    #[serde(default)]
    acc_tot: Option<f64>,
    #[serde(default)]
    velocity: Option<f64>,
}

impl From<TelemetryRow> for FlightSample<f64> {
    fn from(row: TelemetryRow) -> Self {
        let reading = AccelerometerReading::new(row.acc_x, row.acc_y, row.acc_z);
        let mut sample = FlightSample::from_axes(row.time, row.pressure, &reading);
        if let Some(total) = row.acc_tot {
            sample.acceleration = total;
        }
        sample.velocity = row.velocity;
        sample
    }
}

struct Arguments {
    telemetry: String,
    config: Option<String>,
    rc_cutoff: Option<f64>,
}

fn parse_arguments() -> Result<Arguments, Box<dyn Error>> {
    let mut telemetry = None;
    let mut config = None;
    let mut rc_cutoff = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--rc" {
            let value = args.next().ok_or("--rc requires a cutoff frequency")?;
            rc_cutoff = Some(value.parse()?);
        } else if telemetry.is_none() {
            telemetry = Some(arg);
        } else {
            config = Some(arg);
        }
    }

    Ok(Arguments {
        telemetry: telemetry.ok_or("usage: replay <telemetry.csv> [config.json] [--rc <cutoff-hz>]")?,
        config,
        rc_cutoff,
    })
}

/// Reads the telemetry log, dropping rows that fail to parse, are not finite or do not advance time.
fn read_rows(path: &str) -> Result<Vec<TelemetryRow>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows: Vec<TelemetryRow> = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<TelemetryRow>() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                warn!(%err, "dropping unparsable row");
                dropped += 1;
                continue;
            }
        };

        let finite = [row.time, row.pressure, row.acc_x, row.acc_y, row.acc_z]
            .iter()
            .chain(row.acc_tot.iter())
            .chain(row.velocity.iter())
            .all(|v| v.is_finite());
        let advances = rows.last().map_or(true, |last| row.time > last.time);
        if !finite || !advances {
            dropped += 1;
            continue;
        }
        rows.push(row);
    }

    info!(kept = rows.len(), dropped, "telemetry loaded");
    Ok(rows)
}

fn read_config(path: Option<&str>) -> Result<PipelineConfig<f64>, Box<dyn Error>> {
    match path {
        Some(path) => Ok(serde_json::from_reader(File::open(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

/// Filter bank channels, one per smoothed column.
const PRESSURE: usize = 0;
const ACC_X: usize = 1;
const ACC_Y: usize = 2;
const ACC_Z: usize = 3;
const ACC_TOT: usize = 4;

/// Smooths pressure, the three acceleration axes and the total acceleration with a
/// first-order RC filter. Rows without a total keep deriving it from the smoothed axes.
fn prefilter(rows: &mut [TelemetryRow], cutoff_hz: f64) -> Result<(), Box<dyn Error>> {
    let times: Vec<f64> = rows.iter().map(|r| r.time).collect();
    let coefficients = RcCoefficients::new(cutoff_hz, average_sample_time(&times)?)?;
    let mut bank = FilterBank::new(coefficients, 5);

    for row in rows.iter_mut() {
        row.pressure = bank.update(PRESSURE, row.pressure);
        row.acc_x = bank.update(ACC_X, row.acc_x);
        row.acc_y = bank.update(ACC_Y, row.acc_y);
        row.acc_z = bank.update(ACC_Z, row.acc_z);
        row.acc_tot = row.acc_tot.map(|total| bank.update(ACC_TOT, total));
    }
    Ok(())
}

fn print_track(track: &FlightTrack<f64>) {
    println!("time,raw,filtered");
    for ((time, filtered), raw) in track.filtered_pairs().zip(track.raw.iter()) {
        println!("{time:.4},{raw:.6},{filtered:.6}");
    }

    if track.events.is_empty() {
        println!("# no apogee detected");
    }
    for event in &track.events {
        println!("# apogee at t = {:.4} s, value = {:.6}", event.time, event.value);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let arguments = parse_arguments()?;
    let config = read_config(arguments.config.as_deref())?;
    let mut rows = read_rows(&arguments.telemetry)?;

    if let Some(cutoff_hz) = arguments.rc_cutoff {
        prefilter(&mut rows, cutoff_hz)?;
    }

    let samples = rows.into_iter().map(FlightSample::from);
    let track = ApogeePipeline::run(config, samples)?;
    print_track(&track);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(time: f64, acc_tot: Option<f64>) -> TelemetryRow {
        TelemetryRow {
            time,
            pressure: 1000.0,
            acc_x: 1.0,
            acc_y: 2.0,
            acc_z: 9.0,
            acc_tot,
            velocity: None,
        }
    }

    #[test]
    fn test_prefilter_smooths_all_channels() {
        let mut rows = vec![row(0.0, Some(9.3)), row(0.1, Some(9.3)), row(0.2, None)];
        prefilter(&mut rows, 1.0).unwrap();

        let coefficients = RcCoefficients::new(1.0_f64, 0.1).unwrap();
        let first = &rows[0];
        assert!((first.pressure - coefficients.input * 1000.0).abs() < 1e-9);
        assert!((first.acc_x - coefficients.input * 1.0).abs() < 1e-12);
        assert!((first.acc_y - coefficients.input * 2.0).abs() < 1e-12);
        assert!((first.acc_z - coefficients.input * 9.0).abs() < 1e-12);
        assert!((first.acc_tot.unwrap() - coefficients.input * 9.3).abs() < 1e-12);

        // Without a recorded total the sample derives it from the smoothed axes.
        let last = &rows[2];
        assert_eq!(last.acc_tot, None);
        let expected = (last.acc_x.powi(2) + last.acc_y.powi(2) + last.acc_z.powi(2)).sqrt();
        let sample = FlightSample::from(last.clone());
        assert!((sample.acceleration - expected).abs() < 1e-12);
    }
}
