use chrono::NaiveDateTime;
use physioband_types::{Reading, ReferenceFrame, Sample};

pub struct DeltaCalculator;

impl DeltaCalculator {
    /// Offsets `reading` from the reference, rounded to two decimals.
    pub fn calculate(
        time: NaiveDateTime,
        reading: &Reading,
        reference: &ReferenceFrame,
    ) -> Sample {
        Sample {
            time,
            d_acc: (reading.acc - reference.acc()).round2(),
            d_gyro: (reading.gyro - reference.gyro()).round2(),
        }
    }
}
