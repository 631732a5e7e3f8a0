use std::{fmt, fs::File, path::Path};

use anyhow::{Context, bail};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};
use physioband_types::{Sample, TIMESTAMP_FORMAT, Vector3};

use crate::HEADER;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordSummary {
    pub rows: usize,
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

impl fmt::Display for RecordSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Record is valid:")?;
        write!(f, "  rows:  {}", self.rows)?;
        if let (Some(first), Some(last)) = (self.first, self.last) {
            writeln!(f)?;
            writeln!(f, "  first: {}", first.format(TIMESTAMP_FORMAT))?;
            write!(f, "  last:  {}", last.format(TIMESTAMP_FORMAT))?;
        }
        Ok(())
    }
}

/// Reads every row of a delta record, checking the header and each field.
pub fn read_record<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Sample>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Unable to open record `{}`", path.display()))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut records = reader.records();
    let Some(header) = records.next() else {
        bail!("`{}` is empty, expected a header", path.display());
    };

    let header = header?;
    if header.iter().ne(HEADER) {
        bail!("Unexpected header: {:?}", header.iter().collect::<Vec<_>>());
    }

    let mut samples = Vec::new();
    for (index, record) in records.enumerate() {
        let line = index + 2;
        let record = record.with_context(|| format!("Unreadable row at line {}", line))?;
        let sample = parse_row(&record).with_context(|| format!("Invalid row at line {}", line))?;
        samples.push(sample);
    }

    Ok(samples)
}

fn parse_row(record: &StringRecord) -> anyhow::Result<Sample> {
    if record.len() != HEADER.len() {
        bail!("expected {} fields, found {}", HEADER.len(), record.len());
    }

    let time = NaiveDateTime::parse_from_str(&record[0], TIMESTAMP_FORMAT)
        .with_context(|| format!("bad timestamp {:?}", &record[0]))?;

    let mut deltas = [0_f64; 6];
    for (slot, (name, value)) in deltas
        .iter_mut()
        .zip(HEADER.iter().skip(1).zip(record.iter().skip(1)))
    {
        *slot = value
            .parse()
            .with_context(|| format!("bad {} value {:?}", name, value))?;
    }

    let [ax, ay, az, gx, gy, gz] = deltas;
    Ok(Sample {
        time,
        d_acc: Vector3::new(ax, ay, az),
        d_gyro: Vector3::new(gx, gy, gz),
    })
}

/// Checks a record against the layout the dashboard relies on.
pub fn validate<P: AsRef<Path>>(path: P) -> anyhow::Result<RecordSummary> {
    let samples = read_record(path)?;
    Ok(RecordSummary {
        rows: samples.len(),
        first: samples.first().map(|s| s.time),
        last: samples.last().map(|s| s.time),
    })
}
