use physioband_codec::FieldMap;
use physioband_types::ReferenceFrame;

use crate::{ConversionError, SensorScale, convert_reference};

/// Baseline capture for one session.
///
/// Starts in `AwaitingReference` and moves to `Calibrated` on the first
/// complete, convertible packet. `Calibrated` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Calibration {
    #[default]
    AwaitingReference,
    Calibrated(ReferenceFrame),
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers a parsed packet as the reference.
    ///
    /// Returns the captured frame only on the transition. Incomplete packets
    /// and every packet after calibration yield `Ok(None)`.
    pub fn offer(
        &mut self,
        fields: &FieldMap,
        scale: &SensorScale,
    ) -> Result<Option<ReferenceFrame>, ConversionError> {
        if self.is_calibrated() || !fields.is_complete() {
            return Ok(None);
        }

        let frame = ReferenceFrame::new(convert_reference(fields, scale)?);
        *self = Self::Calibrated(frame);
        Ok(Some(frame))
    }

    pub fn reference(&self) -> Option<&ReferenceFrame> {
        match self {
            Self::AwaitingReference => None,
            Self::Calibrated(frame) => Some(frame),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self, Self::Calibrated(_))
    }
}
