/// Separates `key=value` tokens inside a packet.
pub const FIELD_DELIMITER: char = '|';

/// Separates a field code from its value.
pub const KEY_VALUE_SEPARATOR: char = '=';

pub const LINE_TERMINATOR: u8 = b'\n';

/// Upper bound on buffered bytes that have not seen a newline yet.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

pub const ACC_X: &str = "aX";
pub const ACC_Y: &str = "aY";
pub const ACC_Z: &str = "aZ";
pub const GYRO_X: &str = "gX";
pub const GYRO_Y: &str = "gY";
pub const GYRO_Z: &str = "gZ";

/// Field codes a packet must carry to be usable.
pub const REQUIRED_KEYS: [&str; 6] = [ACC_X, ACC_Y, ACC_Z, GYRO_X, GYRO_Y, GYRO_Z];
