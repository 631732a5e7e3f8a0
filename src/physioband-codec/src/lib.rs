#[macro_use]
extern crate log;

mod error;
pub use error::CodecError;

pub mod constants;

mod framer;
pub use framer::LineFramer;

mod packet;
pub use packet::{FieldMap, parse_packet};
