pub mod units;
pub use units::{ConversionError, NumberKind, SensorScale, convert_reference, convert_sample};

pub(crate) mod calibration;
pub use calibration::Calibration;

pub(crate) mod delta;
pub use delta::DeltaCalculator;
