use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::Context;
use csv::{Terminator, Writer, WriterBuilder};
use physioband_types::Sample;

pub const HEADER: [&str; 7] = ["timestamp", "d_aX", "d_aY", "d_aZ", "d_gX", "d_gY", "d_gZ"];

/// Append-only CSV of per-sample deltas, read live by the dashboard.
///
/// Every write is flushed and synced before returning, so the file on disk
/// is always a header followed by whole rows.
pub struct DeltaRecord {
    path: PathBuf,
    writer: Writer<File>,
    rows: u64,
}

impl DeltaRecord {
    /// Creates or truncates the record and writes the header.
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create `{}`", parent.display()))?;
        }

        let file = File::create(path)
            .with_context(|| format!("Unable to create record `{}`", path.display()))?;

        let writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        let mut record = Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        };

        record.writer.write_record(HEADER)?;
        record.commit()?;

        info!("Writing deltas to {}", path.display());
        Ok(record)
    }

    pub fn append(&mut self, sample: &Sample) -> anyhow::Result<()> {
        let mut row = Vec::with_capacity(HEADER.len());
        row.push(sample.timestamp());
        row.extend(sample.deltas().iter().map(|v| format!("{:.2}", v)));

        self.writer.write_record(&row)?;
        self.commit()?;
        self.rows += 1;
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Unable to flush `{}`", self.path.display()))?;
        self.writer
            .get_ref()
            .sync_data()
            .with_context(|| format!("Unable to sync `{}`", self.path.display()))?;
        Ok(())
    }

    /// Flushes and releases the file handle.
    pub fn close(mut self) -> anyhow::Result<()> {
        self.commit()?;
        debug!("Closed {} after {} rows", self.path.display(), self.rows);
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use physioband_types::Vector3;
    use tempfile::TempDir;

    use super::*;

    fn sample(second: u32, d_ax: f64) -> Sample {
        Sample {
            time: NaiveDate::from_ymd_opt(2025, 6, 1)
                .unwrap()
                .and_hms_opt(12, 0, second)
                .unwrap(),
            d_acc: Vector3::new(d_ax, 0.0, -0.25),
            d_gyro: Vector3::new(0.0, 1.5, 0.0),
        }
    }

    #[test]
    fn header_is_written_on_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live_data.csv");
        let record = DeltaRecord::create(&path).unwrap();
        assert_eq!(record.rows(), 0);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "timestamp,d_aX,d_aY,d_aZ,d_gX,d_gY,d_gZ\n");
    }

    #[test]
    fn rows_are_visible_after_each_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live_data.csv");
        let mut record = DeltaRecord::create(&path).unwrap();

        record.append(&sample(1, 9.81)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().nth(1),
            Some("2025-06-01 12:00:01,9.81,0.00,-0.25,0.00,1.50,0.00")
        );

        record.append(&sample(2, 0.0)).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(record.rows(), 2);
        record.close().unwrap();
    }

    #[test]
    fn existing_record_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("live_data.csv");
        fs::write(&path, "stale\nrows\nfrom\nlast\nsession\n").unwrap();

        DeltaRecord::create(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
    }

    #[test]
    fn missing_parent_directories_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("nested").join("live_data.csv");
        let record = DeltaRecord::create(&path).unwrap();
        assert_eq!(record.path(), path.as_path());
        assert!(path.exists());
    }
}
