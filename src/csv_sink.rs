use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::DownloadError;
use crate::model::candle::Candle;
use crate::pipeline::Dataset;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// How `open_time` is rendered in the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// `YYYY-MM-DD HH:MM:SS` in UTC.
    #[default]
    Datetime,
    /// Raw epoch milliseconds.
    Millis,
}

/// `BTC-USDT_15m_2021-07-01_2021-08-01.csv` style name for `dataset`.
pub fn default_file_name(dataset: &Dataset) -> String {
    let fmt = |d: Option<NaiveDate>| {
        d.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    };
    format!(
        "{}_{}_{}_{}.csv",
        dataset.symbol().replace('/', "-"),
        dataset.interval(),
        fmt(dataset.real_start()),
        fmt(dataset.real_end())
    )
}

fn render_open_time(candle: &Candle, time_format: TimeFormat) -> String {
    match time_format {
        TimeFormat::Millis => candle.open_time.to_string(),
        TimeFormat::Datetime => candle
            .open_datetime()
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| candle.open_time.to_string()),
    }
}

fn record(candle: &Candle, time_format: TimeFormat) -> Vec<String> {
    let mut out = vec![
        render_open_time(candle, time_format),
        candle.open.to_string(),
        candle.high.to_string(),
        candle.low.to_string(),
        candle.close.to_string(),
        candle.volume.to_string(),
    ];
    if let Some(ext) = &candle.extended {
        out.push(ext.quote_volume.to_string());
        out.push(ext.trade_count.to_string());
        out.push(ext.taker_buy_base_volume.to_string());
        out.push(ext.taker_buy_quote_volume.to_string());
    }
    out
}

/// Writes the header and one row per candle to `writer`.
pub fn write_dataset<W: Write>(
    writer: W,
    dataset: &Dataset,
    time_format: TimeFormat,
) -> Result<(), DownloadError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(dataset.columns())?;
    for candle in dataset.candles() {
        csv.write_record(record(candle, time_format))?;
    }
    csv.flush()?;
    Ok(())
}

/// Saves `dataset` to `save_to`, or to its default file name under `output_dir`.
/// Returns the path written.
pub fn save_dataset(
    dataset: &Dataset,
    save_to: Option<&Path>,
    output_dir: &Path,
    time_format: TimeFormat,
) -> Result<PathBuf, DownloadError> {
    let path = match save_to {
        Some(p) => p.to_path_buf(),
        None => output_dir.join(default_file_name(dataset)),
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    write_atomically(&path, |file| write_dataset(file, dataset, time_format))?;
    tracing::info!(path = %path.display(), rows = dataset.len(), "Saved klines");
    Ok(path)
}

/// Sibling file the dataset is staged in before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Runs `write` against a staging file and renames it onto `path` once the
/// write and sync succeed. On failure the staging file is removed and `path`
/// is left untouched.
fn write_atomically<F>(path: &Path, write: F) -> Result<(), DownloadError>
where
    F: FnOnce(&mut File) -> Result<(), DownloadError>,
{
    let staging = staging_path(path);
    let result = File::create(&staging)
        .map_err(DownloadError::from)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        })
        .and_then(|()| std::fs::rename(&staging, path).map_err(DownloadError::from));

    if let Err(err) = result {
        if let Err(cleanup) = std::fs::remove_file(&staging) {
            tracing::debug!(path = %staging.display(), error = %cleanup, "Staging file not removed");
        }
        return Err(err);
    }
    Ok(())
}
