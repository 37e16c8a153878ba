//! Bar and tick ingest for the runner.
//!
//! All file I/O lives here. Loaders are lenient about field contents and
//! strict about structure: a non-numeric price or volume becomes NaN and
//! a warning, a missing column is an immediate error. Canonicalization
//! guarantees the strictly-increasing timestamp contract the engine
//! expects, reporting what it had to fix in a warnings vector.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use siglab_core::domain::Bar;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("failed to write '{path}': {reason}")]
    Write { path: String, reason: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },
}

/// A single trade print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

/// Bars plus everything the loader had to gloss over.
#[derive(Debug)]
pub struct LoadedBars {
    pub bars: Vec<Bar>,
    pub warnings: Vec<String>,
}

/// Ticks plus everything the loader had to gloss over.
#[derive(Debug)]
pub struct LoadedTicks {
    pub ticks: Vec<Tick>,
    pub warnings: Vec<String>,
}

const BAR_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];
const TICK_COLUMNS: [&str; 3] = ["timestamp", "price", "size"];

/// Load a bar CSV with columns timestamp (ms since epoch), open, high,
/// low, close, volume. Column order is free; extra columns are ignored.
///
/// Rows whose timestamp cannot be read are dropped and counted. The
/// output is canonicalized: sorted by timestamp with exact duplicates
/// dropped (first occurrence wins).
pub fn load_bar_csv(path: &Path) -> Result<LoadedBars, LoadError> {
    let mut reader = open_csv(path)?;
    let indices = column_indices(&mut reader, path, &BAR_COLUMNS)?;

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut bad_timestamps = 0usize;
    let mut bad_fields = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| read_error(path, &e))?;
        let Some(timestamp) = parse_timestamp(record.get(indices[0])) else {
            bad_timestamps += 1;
            continue;
        };
        rows.push(Bar {
            timestamp,
            open: lenient_f64(record.get(indices[1]), &mut bad_fields),
            high: lenient_f64(record.get(indices[2]), &mut bad_fields),
            low: lenient_f64(record.get(indices[3]), &mut bad_fields),
            close: lenient_f64(record.get(indices[4]), &mut bad_fields),
            volume: lenient_f64(record.get(indices[5]), &mut bad_fields),
        });
    }

    if bad_timestamps > 0 {
        warnings.push(format!("dropped {bad_timestamps} rows with unreadable timestamps"));
    }
    if bad_fields > 0 {
        warnings.push(format!("read {bad_fields} non-numeric fields as NaN"));
    }

    let (bars, mut canon_warnings) = canonicalize(rows);
    warnings.append(&mut canon_warnings);
    Ok(LoadedBars { bars, warnings })
}

/// Load a tick CSV with columns timestamp (ms since epoch), price, size.
///
/// Ticks with an unreadable timestamp or non-finite price are dropped
/// and counted; a non-numeric size becomes NaN and contributes no volume
/// during aggregation.
pub fn load_tick_csv(path: &Path) -> Result<LoadedTicks, LoadError> {
    let mut reader = open_csv(path)?;
    let indices = column_indices(&mut reader, path, &TICK_COLUMNS)?;

    let mut ticks = Vec::new();
    let mut warnings = Vec::new();
    let mut dropped = 0usize;
    let mut bad_fields = 0usize;

    for record in reader.records() {
        let record = record.map_err(|e| read_error(path, &e))?;
        let Some(timestamp) = parse_timestamp(record.get(indices[0])) else {
            dropped += 1;
            continue;
        };
        let price = lenient_f64(record.get(indices[1]), &mut bad_fields);
        if !price.is_finite() {
            dropped += 1;
            continue;
        }
        let size = lenient_f64(record.get(indices[2]), &mut bad_fields);
        ticks.push(Tick { timestamp, price, size });
    }

    if dropped > 0 {
        warnings.push(format!("dropped {dropped} unusable ticks"));
    }
    if bad_fields > 0 {
        warnings.push(format!("read {bad_fields} non-numeric fields as NaN"));
    }
    Ok(LoadedTicks { ticks, warnings })
}

/// Write bars as CSV in the column layout `load_bar_csv` reads, so a
/// cleaned series feeds straight back into a run.
///
/// Floats are written in shortest round-trip form; loading the file
/// back reproduces the input exactly.
pub fn write_bar_csv(path: &Path, bars: &[Bar]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| write_error(path, &e))?;
    writer.write_record(BAR_COLUMNS).map_err(|e| write_error(path, &e))?;
    for bar in bars {
        writer
            .write_record([
                bar.timestamp.timestamp_millis().to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(|e| write_error(path, &e))?;
    }
    writer.flush().map_err(|e| write_error(path, &e))
}

/// Sort bars by timestamp and drop exact-timestamp duplicates, keeping
/// the first occurrence. The result satisfies the strictly-increasing
/// contract by construction.
pub fn canonicalize(mut bars: Vec<Bar>) -> (Vec<Bar>, Vec<String>) {
    let mut warnings = Vec::new();
    let was_ordered = bars.windows(2).all(|w| w[0].timestamp <= w[1].timestamp);
    let before = bars.len();

    // Stable sort, so the first of two equal timestamps stays first.
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);

    if !was_ordered {
        warnings.push("reordered rows that were not in timestamp order".to_string());
    }
    let dropped = before - bars.len();
    if dropped > 0 {
        warnings.push(format!("dropped {dropped} duplicate-timestamp rows"));
    }
    (bars, warnings)
}

/// Aggregate a tick stream into fixed-interval OHLCV bars.
///
/// Each bar covers `[k*interval, (k+1)*interval)` and is stamped with the
/// interval start. Open is the first trade, close the last, volume the
/// summed sizes. Intervals without trades emit no bar. Non-finite prices
/// are skipped; non-finite sizes count as zero volume.
pub fn aggregate_ticks(ticks: &[Tick], interval: Duration) -> Vec<Bar> {
    let interval_ms = interval.num_milliseconds().max(1);
    let mut ordered: Vec<&Tick> = ticks.iter().filter(|t| t.price.is_finite()).collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut bars = Vec::new();
    let mut current: Option<(i64, Bar)> = None;

    for tick in ordered {
        let bucket = tick.timestamp.timestamp_millis().div_euclid(interval_ms) * interval_ms;
        let size = if tick.size.is_finite() { tick.size } else { 0.0 };

        match &mut current {
            Some((open_bucket, bar)) if *open_bucket == bucket => {
                bar.high = bar.high.max(tick.price);
                bar.low = bar.low.min(tick.price);
                bar.close = tick.price;
                bar.volume += size;
            }
            _ => {
                if let Some((_, done)) = current.take() {
                    bars.push(done);
                }
                let Some(timestamp) = Utc.timestamp_millis_opt(bucket).single() else {
                    continue;
                };
                current = Some((
                    bucket,
                    Bar {
                        timestamp,
                        open: tick.price,
                        high: tick.price,
                        low: tick.price,
                        close: tick.price,
                        volume: size,
                    },
                ));
            }
        }
    }
    if let Some((_, done)) = current {
        bars.push(done);
    }
    bars
}

/// Deterministic random-walk minute bars for demos and benches.
///
/// The walk is seeded by a BLAKE3 hash of the symbol, so the same symbol
/// always produces the same series and different symbols diverge.
pub fn generate_synthetic_bars(symbol: &str, count: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    let mut bars = Vec::with_capacity(count);
    let mut price = 100.0_f64;

    for i in 0..count {
        let bar_return: f64 = rng.gen_range(-0.002..0.002);
        let open = price;
        let close = price * (1.0 + bar_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.001));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.001));
        let volume = rng.gen_range(500.0..5_000.0);

        bars.push(Bar {
            timestamp: start + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }
    bars
}

/// Deterministic BLAKE3 hash over the canonical bar bytes, for run
/// manifests and provenance checks.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ─── CSV plumbing ────────────────────────────────────────────────────

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::Reader::from_path(path).map_err(|e| read_error(path, &e))
}

fn read_error(path: &Path, error: &dyn std::fmt::Display) -> LoadError {
    LoadError::Read { path: path.display().to_string(), reason: error.to_string() }
}

fn write_error(path: &Path, error: &dyn std::fmt::Display) -> LoadError {
    LoadError::Write { path: path.display().to_string(), reason: error.to_string() }
}

/// Resolve the position of each required column from the header row.
fn column_indices<const N: usize>(
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
    columns: &[&'static str; N],
) -> Result<[usize; N], LoadError> {
    let headers = reader.headers().map_err(|e| read_error(path, &e))?;
    let mut indices = [0usize; N];
    for (slot, column) in indices.iter_mut().zip(columns) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
            .ok_or(LoadError::MissingColumn { column })?;
    }
    Ok(indices)
}

fn parse_timestamp(field: Option<&str>) -> Option<DateTime<Utc>> {
    field
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

fn lenient_f64(field: Option<&str>, bad: &mut usize) -> f64 {
    match field.map(str::trim) {
        Some(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
            *bad += 1;
            f64::NAN
        }),
        _ => {
            *bad += 1;
            f64::NAN
        }
    }
}
