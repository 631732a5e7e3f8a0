use crate::Vector3;

/// One reading converted to physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Acceleration in m/s².
    pub acc: Vector3,
    /// Angular rate in °/s.
    pub gyro: Vector3,
}

/// Zero point captured from the first complete reading of a session.
///
/// Fields are private: once captured, the baseline never changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFrame {
    acc: Vector3,
    gyro: Vector3,
}

impl ReferenceFrame {
    pub fn new(reading: Reading) -> Self {
        Self {
            acc: reading.acc,
            gyro: reading.gyro,
        }
    }

    pub fn acc(&self) -> Vector3 {
        self.acc
    }

    pub fn gyro(&self) -> Vector3 {
        self.gyro
    }
}
