use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::fetch::HistoricalDataResponse;

use super::time::format_bar_time;

#[derive(Serialize)]
struct CsvBarRow<'a> {
    symbol: &'a str,
    time: String,
    t: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Write a merged series as CSV, one row per bar.
pub fn write_history_csv<W: Write>(writer: W, series: &HistoricalDataResponse) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for bar in &series.data {
        csv_writer.serialize(CsvBarRow {
            symbol: &series.symbol,
            time: format_bar_time(bar.t),
            t: bar.t,
            open: bar.o,
            high: bar.h,
            low: bar.l,
            close: bar.c,
            volume: bar.v,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_history_json<W: Write>(writer: W, series: &HistoricalDataResponse) -> Result<()> {
    serde_json::to_writer_pretty(writer, series)?;
    Ok(())
}
