//! Sensor sample feed for the numeric path.
//!
//! Rows carry a feed-format timestamp followed by up to three channel
//! readings (smoker, food A, food B). An empty cell means that channel has
//! no reading in this row.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::listing::{FEED_TIMESTAMP_FORMAT, SensorSample};
use crate::source::csv::split_record;
use crate::utils::error::ValidationError;

/// Queue of each sensor channel, in column order.
pub const SAMPLE_QUEUES: [&str; 3] = ["01-smoker", "02-food-A", "03-food-B"];

/// The readings of one row, each paired with its channel queue.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub line: u64,
    pub readings: Vec<(&'static str, SensorSample)>,
}

pub struct SampleSource<R> {
    lines: Lines<R>,
    line: u64,
    done: bool,
}

impl SampleSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::from_reader(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> SampleSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for SampleSource<R> {
    type Item = Result<SampleRow, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let raw = match self.lines.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(ValidationError::Unreadable {
                        line: self.line + 1,
                        reason: e.to_string(),
                    }));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };
            self.line += 1;

            if self.line == 1 || raw.trim().is_empty() {
                continue;
            }
            return Some(parse_sample_row(self.line, &raw));
        }
        None
    }
}

pub fn parse_sample_row(line: u64, raw: &str) -> Result<SampleRow, ValidationError> {
    let fields = split_record(raw);
    let time_text = fields[0].trim();
    if time_text.is_empty() {
        return Err(ValidationError::EmptyField {
            line,
            field: "time",
        });
    }
    let timestamp = NaiveDateTime::parse_from_str(time_text, FEED_TIMESTAMP_FORMAT)
        .map_err(|_| ValidationError::InvalidField {
            line,
            field: "time",
            value: time_text.to_string(),
        })?
        .and_utc()
        .timestamp() as f64;

    let mut readings = Vec::new();
    for (queue, cell) in SAMPLE_QUEUES.iter().zip(fields.iter().skip(1)) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let reading: f32 = cell.parse().map_err(|_| ValidationError::InvalidField {
            line,
            field: "reading",
            value: cell.to_string(),
        })?;
        readings.push((*queue, SensorSample { timestamp, reading }));
    }
    Ok(SampleRow { line, readings })
}
