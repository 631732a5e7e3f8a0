use std::{fmt, io::ErrorKind, path::PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDateTime, Timelike as _};
use physioband_algos::{Calibration, DeltaCalculator, SensorScale, convert_sample};
use physioband_codec::{FieldMap, LineFramer, constants::DEFAULT_MAX_LINE_BYTES, parse_packet};
use physioband_record::{DeltaRecord, RawCapture};
use physioband_types::{ReferenceFrame, Sample};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::watch,
};

/// Largest read handed to the framer at once.
pub const CHUNK_SIZE: usize = 1024;

/// Pulls byte chunks of non-zero length from any async source.
pub struct ChunkReader<R> {
    inner: R,
    buf: [u8; CHUNK_SIZE],
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: [0; CHUNK_SIZE],
        }
    }

    /// Next chunk, or `None` once the source is closed.
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<&[u8]>> {
        loop {
            match self.inner.read(&mut self.buf).await {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(&self.buf[..n])),
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
    }
}

/// Resolves once `true` is published on the shutdown channel.
///
/// If every sender is gone no shutdown can arrive, so this never resolves.
pub async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub record_path: PathBuf,
    pub scale: SensorScale,
    pub max_line: usize,
    /// Print every delta to stdout as it is recorded.
    pub live_trace: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            record_path: PathBuf::from("data/live_data.csv"),
            scale: SensorScale::default(),
            max_line: DEFAULT_MAX_LINE_BYTES,
            live_trace: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub bytes: u64,
    pub lines: u64,
    pub malformed: u64,
    pub incomplete: u64,
    pub conversion_errors: u64,
    pub discarded_before_reference: u64,
    pub rows: u64,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session summary:")?;
        writeln!(f, "  bytes received:    {}", self.bytes)?;
        writeln!(f, "  lines:             {}", self.lines)?;
        writeln!(f, "  before reference:  {}", self.discarded_before_reference)?;
        writeln!(f, "  malformed:         {}", self.malformed)?;
        writeln!(f, "  incomplete:        {}", self.incomplete)?;
        writeln!(f, "  conversion errors: {}", self.conversion_errors)?;
        write!(f, "  rows recorded:     {}", self.rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Interrupted,
}

/// One ingestion run: frames the byte stream, captures the reference from
/// the first complete packet and records a delta for every packet after it.
pub struct IngestSession {
    config: IngestConfig,
    framer: LineFramer,
    calibration: Calibration,
    record: Option<DeltaRecord>,
    capture: Option<RawCapture>,
    report: IngestReport,
}

impl IngestSession {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            framer: LineFramer::with_max_line(config.max_line),
            config,
            calibration: Calibration::new(),
            record: None,
            capture: None,
            report: IngestReport::default(),
        }
    }

    pub fn with_capture(self, capture: RawCapture) -> Self {
        Self {
            capture: Some(capture),
            ..self
        }
    }

    pub fn report(&self) -> IngestReport {
        self.report
    }

    pub fn reference(&self) -> Option<&ReferenceFrame> {
        self.calibration.reference()
    }

    /// Runs until `reader` is exhausted, shutdown is signalled or a fatal
    /// error occurs. The record and capture are closed on every path.
    pub async fn run<R>(
        &mut self,
        reader: R,
        shutdown: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<StopReason>
    where
        R: AsyncRead + Unpin,
    {
        if !self.calibration.is_calibrated() {
            info!("Waiting for first packet as reference...");
        }

        let mut reader = ChunkReader::new(reader);
        let result = self.pump(&mut reader, shutdown).await;
        let closed = self.close();
        let reason = result?;
        closed?;
        Ok(reason)
    }

    async fn pump<R>(
        &mut self,
        reader: &mut ChunkReader<R>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> anyhow::Result<StopReason>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            tokio::select! {
                biased;
                _ = cancelled(shutdown) => return Ok(StopReason::Interrupted),
                chunk = reader.next_chunk() => match chunk.context("Connection lost")? {
                    Some(chunk) => self.handle_chunk(chunk)?,
                    None => return Ok(StopReason::EndOfStream),
                },
            }
        }
    }

    /// Feeds one received chunk through framing, parsing and recording.
    pub fn handle_chunk(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        self.report.bytes += chunk.len() as u64;
        if let Some(capture) = self.capture.as_mut() {
            capture.append(chunk)?;
        }

        self.framer
            .push(chunk)
            .context("Dropping connection to misbehaving sender")?;

        while let Some(line) = self.framer.next_line() {
            self.handle_line(&line)?;
        }

        Ok(())
    }

    /// Handles one framed line. Returns the recorded sample, if any.
    ///
    /// Only I/O failures on the record are errors; bad packets are logged
    /// and skipped.
    pub fn handle_line(&mut self, line: &str) -> anyhow::Result<Option<Sample>> {
        self.report.lines += 1;

        let fields = match parse_packet(line) {
            Ok(fields) => fields,
            Err(error) => {
                warn!("{}", error);
                self.report.malformed += 1;
                return Ok(None);
            }
        };

        let reference = match self.calibration {
            Calibration::AwaitingReference => {
                self.await_reference(&fields)?;
                return Ok(None);
            }
            Calibration::Calibrated(frame) => frame,
        };

        if !fields.is_complete() {
            trace!("Incomplete packet, missing {:?}", fields.missing());
            self.report.incomplete += 1;
            return Ok(None);
        }

        let reading = match convert_sample(&fields, &self.config.scale) {
            Ok(reading) => reading,
            Err(error) => {
                warn!("Data conversion error: {}", error);
                self.report.conversion_errors += 1;
                return Ok(None);
            }
        };

        let sample = DeltaCalculator::calculate(now(), &reading, &reference);
        if self.config.live_trace {
            println!("{}", sample);
        }

        if let Some(record) = self.record.as_mut() {
            record.append(&sample)?;
            self.report.rows += 1;
        }

        Ok(Some(sample))
    }

    fn await_reference(&mut self, fields: &FieldMap) -> anyhow::Result<()> {
        let frame = match self.calibration.offer(fields, &self.config.scale) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!("Not a reference candidate, missing {:?}", fields.missing());
                self.report.discarded_before_reference += 1;
                return Ok(());
            }
            Err(error) => {
                warn!("Data conversion error: {}", error);
                self.report.conversion_errors += 1;
                self.report.discarded_before_reference += 1;
                return Ok(());
            }
        };

        info!(
            "Reference values set: acc={} m/s², gyro={} °/s",
            frame.acc(),
            frame.gyro()
        );
        debug!(
            "{} lines discarded before the reference",
            self.report.discarded_before_reference
        );

        self.record = Some(DeltaRecord::create(&self.config.record_path)?);
        info!("Streaming real-time differences...");
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if self.framer.pending() > 0 {
            debug!("Discarding {} bytes of unterminated data", self.framer.pending());
        }

        if let Some(capture) = self.capture.take() {
            debug!("Captured {} bytes", capture.bytes());
        }

        match self.record.take() {
            Some(record) => record.close(),
            None => Ok(()),
        }
    }
}

fn now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
