use std::{fmt, ops::Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Rounds each component to two decimal places, ties to even.
    ///
    /// Negative zero is folded into zero so it never prints as `-0.00`.
    pub fn round2(self) -> Self {
        Self {
            x: round2(self.x),
            y: round2(self.y),
            z: round2(self.z),
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0 + 0.0
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtracts_componentwise() {
        let v = Vector3::new(3.0, 2.0, 1.0) - Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(v, Vector3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn round2_keeps_two_decimals() {
        let v = Vector3::new(9.814_999, -0.126, 1.0 / 3.0).round2();
        assert_eq!(v, Vector3::new(9.81, -0.13, 0.33));
    }

    #[test]
    fn round2_ties_go_to_even() {
        let v = Vector3::new(0.125, -0.125, 0.375).round2();
        assert_eq!(v, Vector3::new(0.12, -0.12, 0.38));
    }

    #[test]
    fn round2_folds_negative_zero() {
        let v = Vector3::new(-0.001, -0.0, 0.004).round2();
        assert_eq!(v.to_string(), "(0.00, 0.00, 0.00)");
        assert!(v.x.is_sign_positive());
    }

    #[test]
    fn display_uses_fixed_two_decimals() {
        assert_eq!(Vector3::new(9.81, 0.0, -1.5).to_string(), "(9.81, 0.00, -1.50)");
    }
}
