use std::fmt;

use chrono::NaiveDateTime;

use crate::Vector3;

/// Timestamp layout of the persisted record, local wall clock.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset of one reading from the session's reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: NaiveDateTime,
    /// Δacceleration in m/s².
    pub d_acc: Vector3,
    /// Δangular rate in °/s.
    pub d_gyro: Vector3,
}

impl Sample {
    pub fn timestamp(&self) -> String {
        self.time.format(TIMESTAMP_FORMAT).to_string()
    }

    /// `d_aX, d_aY, d_aZ, d_gX, d_gY, d_gZ` in record column order.
    pub fn deltas(&self) -> [f64; 6] {
        let [ax, ay, az] = self.d_acc.to_array();
        let [gx, gy, gz] = self.d_gyro.to_array();
        [ax, ay, az, gx, gy, gz]
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dA={} m/s² | dG={} °/s", self.d_acc, self.d_gyro)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn sample() -> Sample {
        Sample {
            time: NaiveDate::from_ymd_opt(2025, 3, 14)
                .unwrap()
                .and_hms_opt(9, 26, 53)
                .unwrap(),
            d_acc: Vector3::new(9.81, 0.0, -0.5),
            d_gyro: Vector3::new(0.0, 1.25, 0.0),
        }
    }

    #[test]
    fn live_trace_format() {
        assert_eq!(
            sample().to_string(),
            "dA=(9.81, 0.00, -0.50) m/s² | dG=(0.00, 1.25, 0.00) °/s"
        );
    }

    #[test]
    fn timestamp_has_second_resolution() {
        assert_eq!(sample().timestamp(), "2025-03-14 09:26:53");
    }

    #[test]
    fn deltas_follow_column_order() {
        assert_eq!(sample().deltas(), [9.81, 0.0, -0.5, 0.0, 1.25, 0.0]);
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains("\"d_acc\""));
        assert!(json.contains("2025-03-14T09:26:53"));
    }
}
