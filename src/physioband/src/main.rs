#[macro_use]
extern crate log;

use std::{io, path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use physioband::{
    Connector, ConnectorConfig, IngestConfig, IngestSession, RetryPolicy, StopReason, cancelled,
};
use physioband_algos::SensorScale;
use physioband_codec::constants::DEFAULT_MAX_LINE_BYTES;
use physioband_record::RawCapture;
use tokio::sync::watch;

#[derive(Parser)]
#[command(version, about = "Streams PhysioBand IMU telemetry into a calibrated delta record")]
pub struct PhysioBandCli {
    /// Device address
    #[arg(env = "PHYSIOBAND_HOST", long, default_value = ConnectorConfig::DEFAULT_HOST)]
    pub host: String,
    #[arg(env = "PHYSIOBAND_PORT", long, default_value_t = ConnectorConfig::DEFAULT_PORT)]
    pub port: u16,
    /// Delta record read by the dashboard, truncated on every run
    #[arg(env = "PHYSIOBAND_OUTPUT", long, short, default_value = "data/live_data.csv")]
    pub output: PathBuf,
    /// Also write every received byte to this file
    #[arg(env = "PHYSIOBAND_CAPTURE", long)]
    pub capture: Option<PathBuf>,
    /// Extra attempts for the initial connection
    #[arg(env = "PHYSIOBAND_CONNECT_RETRIES", long, default_value_t = 0)]
    pub connect_retries: u32,
    #[arg(env = "PHYSIOBAND_RETRY_DELAY_MS", long, default_value_t = 1000)]
    pub retry_delay_ms: u64,
    #[arg(env = "PHYSIOBAND_CONNECT_TIMEOUT_SECS", long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
    /// Longest accepted packet, in bytes
    #[arg(env = "PHYSIOBAND_MAX_LINE_BYTES", long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    pub max_line_bytes: usize,
    /// Accelerometer LSB per g
    #[arg(env = "PHYSIOBAND_ACC_SENSITIVITY", long, default_value_t = SensorScale::ACC_SENSITIVITY)]
    pub acc_sensitivity: f64,
    /// Gyroscope LSB per °/s
    #[arg(
        env = "PHYSIOBAND_GYRO_SENSITIVITY",
        long,
        default_value_t = SensorScale::GYRO_SENSITIVITY
    )]
    pub gyro_sensitivity: f64,
    #[arg(env = "PHYSIOBAND_GRAVITY", long, default_value_t = SensorScale::GRAVITY)]
    pub gravity: f64,
    /// Do not print deltas to stdout
    #[arg(env = "PHYSIOBAND_QUIET", long, short)]
    pub quiet: bool,
    #[clap(subcommand)]
    pub subcommand: Option<PhysioBandCommand>,
}

#[derive(Subcommand)]
pub enum PhysioBandCommand {
    ///
    /// Connect to the device and record deltas until interrupted (default)
    ///
    Stream,
    ///
    /// Run a raw capture through calibration and recording again
    ///
    Replay { capture: PathBuf },
    ///
    /// Check a delta record against the layout the dashboard reads
    ///
    Validate { path: Option<PathBuf> },
    ///
    /// Print shell completions
    ///
    Completions { shell: Shell },
}

impl PhysioBandCli {
    fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            host: self.host.clone(),
            port: self.port,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            retry: RetryPolicy {
                retries: self.connect_retries,
                delay: Duration::from_millis(self.retry_delay_ms),
            },
        }
    }

    fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            record_path: self.output.clone(),
            scale: SensorScale {
                acc_sensitivity: self.acc_sensitivity,
                gravity: self.gravity,
                gyro_sensitivity: self.gyro_sensitivity,
            },
            max_line: self.max_line_bytes,
            live_trace: !self.quiet,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cli = PhysioBandCli::parse();
    if cli.acc_sensitivity == 0.0 || cli.gyro_sensitivity == 0.0 {
        bail!("Sensitivities must be non-zero");
    }

    match cli.subcommand.take().unwrap_or(PhysioBandCommand::Stream) {
        PhysioBandCommand::Stream => stream_command(&cli).await,
        PhysioBandCommand::Replay { capture } => replay_command(&cli, capture).await,
        PhysioBandCommand::Validate { path } => {
            let path = path.unwrap_or_else(|| cli.output.clone());
            let summary = physioband_record::validate(&path)
                .with_context(|| format!("`{}` is not a valid record", path.display()))?;
            println!("{}", summary);
            Ok(())
        }
        PhysioBandCommand::Completions { shell } => {
            let mut command = PhysioBandCli::command();
            let name = command.get_name().to_owned();
            clap_complete::generate(shell, &mut command, name, &mut io::stdout());
            Ok(())
        }
    }
}

fn shutdown_signal() -> anyhow::Result<watch::Receiver<bool>> {
    let (tx, rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = tx.send(true);
    })?;
    Ok(rx)
}

async fn stream_command(cli: &PhysioBandCli) -> anyhow::Result<()> {
    let mut shutdown = shutdown_signal()?;
    stream(cli, &mut shutdown).await
}

async fn stream(cli: &PhysioBandCli, shutdown: &mut watch::Receiver<bool>) -> anyhow::Result<()> {
    let mut session = IngestSession::new(cli.ingest_config());
    if let Some(path) = cli.capture.as_ref() {
        session = session.with_capture(RawCapture::create(path)?);
    }

    let config = cli.connector_config();
    let mut connector = tokio::select! {
        connector = Connector::connect(&config) => connector?,
        _ = cancelled(shutdown) => {
            info!("Stopped by user.");
            return Ok(());
        }
    };

    let result = session.run(connector.stream(), shutdown).await;
    connector.shutdown().await;
    info!("{}", session.report());

    match result? {
        StopReason::Interrupted => {
            info!("Stopped by user.");
            Ok(())
        }
        StopReason::EndOfStream => bail!("Device closed the connection"),
    }
}

async fn replay_command(cli: &PhysioBandCli, capture: PathBuf) -> anyhow::Result<()> {
    let mut shutdown = shutdown_signal()?;
    let file = tokio::fs::File::open(&capture)
        .await
        .with_context(|| format!("Unable to open capture `{}`", capture.display()))?;
    let len = file.metadata().await?.len();

    let progress = ProgressBar::new(len);
    progress.set_style(
        ProgressStyle::with_template(
            "{prefix:>8} [{wide_bar:.cyan/dim}] {bytes}/{total_bytes} ({eta} remaining)",
        )?
        .progress_chars("=>-"),
    );
    progress.set_prefix("replay");

    let mut config = cli.ingest_config();
    config.live_trace = false;
    let mut session = IngestSession::new(config);

    let reason = session
        .run(progress.wrap_async_read(file), &mut shutdown)
        .await;
    progress.finish();

    reason?;
    println!("{}", session.report());
    Ok(())
}
