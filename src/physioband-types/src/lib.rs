#[macro_use]
extern crate serde;

mod vector;
pub use vector::Vector3;

mod frame;
pub use frame::{Reading, ReferenceFrame};

mod sample;
pub use sample::{Sample, TIMESTAMP_FORMAT};
