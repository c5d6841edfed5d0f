//! CSV readers for the pace and overlap tables, and the summary writer.
//!
//! Header names are matched case-insensitively after trimming, so
//! `" Event ,Runner_ID"` is accepted. Missing columns and non-numeric cells
//! are fatal and reported before any analysis runs.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::{CongestionError, OverlapSegment, PaceTable, Result, Runner, SummaryRecord};

const PACE_TABLE: &str = "pace";
const OVERLAP_TABLE: &str = "overlaps";

const PACE_COLUMNS: [&str; 4] = ["event", "runner_id", "pace", "distance"];
const OVERLAP_COLUMNS: [&str; 4] = ["event", "start", "end", "overlapswith"];

/// Header row of the summary CSV, in `SummaryRecord` field order.
pub const SUMMARY_HEADERS: [&str; 21] = [
    "prev_event",
    "curr_event",
    "segment",
    "description",
    "segment_start",
    "segment_end",
    "intensity",
    "intensity_per_km",
    "distinct_pairs",
    "peak_congestion",
    "peak_congestion_ratio",
    "total_prev",
    "total_curr",
    "start_prev",
    "start_curr",
    "time_window",
    "step",
    "first_overlap_time",
    "first_overlap_km",
    "first_overlap_prev_runner",
    "first_overlap_curr_runner",
];

/// Column positions resolved from a header row.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        Self {
            headers: headers.iter().map(|h| h.trim().to_lowercase()).collect(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Positions of every required column, or a schema error naming the gaps.
    fn require<const N: usize>(&self, table: &'static str, names: [&str; N]) -> Result<[usize; N]> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| self.position(n).is_none())
            .map(|n| n.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CongestionError::MissingColumns {
                table,
                missing,
                found: self.headers.clone(),
            });
        }
        let mut out = [0usize; N];
        for (slot, name) in out.iter_mut().zip(names) {
            *slot = self.position(name).unwrap_or_default();
        }
        Ok(out)
    }
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or("").trim()
}

fn number(
    record: &StringRecord,
    idx: usize,
    table: &'static str,
    column: &str,
) -> Result<f64> {
    let raw = field(record, idx);
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CongestionError::InvalidNumber {
            table,
            line: record.position().map(|p| p.line()).unwrap_or(0),
            column: column.to_string(),
            value: raw.to_string(),
        })
}

/// A pace in minutes per km; zero or negative paces cannot be modelled.
fn positive_pace(record: &StringRecord, idx: usize) -> Result<f64> {
    let pace = number(record, idx, PACE_TABLE, "pace")?;
    if pace > 0.0 {
        return Ok(pace);
    }
    Err(CongestionError::InvalidNumber {
        table: PACE_TABLE,
        line: record.position().map(|p| p.line()).unwrap_or(0),
        column: "pace".to_string(),
        value: field(record, idx).to_string(),
    })
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

/// Read a pace table (`event, runner_id, pace, distance`).
pub fn read_pace_table<R: Read>(input: R) -> Result<PaceTable> {
    let mut rdr = reader(input);
    let columns = Columns::from_headers(rdr.headers()?);
    let [event, runner_id, pace, distance] = columns.require(PACE_TABLE, PACE_COLUMNS)?;

    let mut runners = Vec::new();
    for record in rdr.records() {
        let record = record?;
        runners.push(Runner::new(
            field(&record, event),
            field(&record, runner_id),
            positive_pace(&record, pace)?,
            number(&record, distance, PACE_TABLE, "distance")?,
        ));
    }
    Ok(PaceTable::new(runners))
}

/// Read an overlap table (`event, start, end, overlapswith[, description]`).
pub fn read_overlap_segments<R: Read>(input: R) -> Result<Vec<OverlapSegment>> {
    let mut rdr = reader(input);
    let columns = Columns::from_headers(rdr.headers()?);
    let [event, start, end, overlaps_with] = columns.require(OVERLAP_TABLE, OVERLAP_COLUMNS)?;
    let description = columns.position("description");

    let mut segments = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut segment = OverlapSegment::new(
            field(&record, event),
            field(&record, overlaps_with),
            number(&record, start, OVERLAP_TABLE, "start")?,
            number(&record, end, OVERLAP_TABLE, "end")?,
        );
        if let Some(idx) = description {
            segment.description = field(&record, idx).to_string();
        }
        segments.push(segment);
    }
    Ok(segments)
}

pub fn read_pace_csv(path: impl AsRef<Path>) -> Result<PaceTable> {
    read_pace_table(File::open(path)?)
}

pub fn read_overlaps_csv(path: impl AsRef<Path>) -> Result<Vec<OverlapSegment>> {
    read_overlap_segments(File::open(path)?)
}

/// Write ranked summary records as CSV with a single header row.
///
/// The header is written even when there are no records.
pub fn write_summary_csv<W: Write>(output: W, records: &[SummaryRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(output);
    if records.is_empty() {
        wtr.write_record(SUMMARY_HEADERS)?;
    }
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_summary_csv_path(path: impl AsRef<Path>, records: &[SummaryRecord]) -> Result<()> {
    write_summary_csv(File::create(path)?, records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_normalized() {
        let csv = " Event ,RUNNER_ID, Pace ,distance\n10K,1,5.5,10\n";
        let table = read_pace_table(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.runners()[0].runner_id, "1");
    }

    #[test]
    fn missing_columns_are_listed() {
        let err = read_pace_table("event,pace\nA,5\n".as_bytes()).unwrap_err();
        match err {
            CongestionError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["runner_id", "distance"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
