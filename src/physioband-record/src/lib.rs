#[macro_use]
extern crate log;

mod writer;
pub use writer::{DeltaRecord, HEADER};

mod reader;
pub use reader::{RecordSummary, read_record, validate};

mod capture;
pub use capture::RawCapture;
