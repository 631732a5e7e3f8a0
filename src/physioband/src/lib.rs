#[macro_use]
extern crate log;

mod connector;
pub use connector::{Connector, ConnectorConfig, RetryPolicy};

mod ingest;
pub use ingest::{ChunkReader, IngestConfig, IngestReport, IngestSession, StopReason, cancelled};
