use core::fmt;

/// Fixed-point sensor reading: `val1 + val2 / 1_000_000`.
///
/// `val2` carries the fractional part in millionths and has the same sign as `val1`
/// (or either sign when `val1` is zero).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct SensorValue {
    pub val1: i32,
    pub val2: i32,
}

impl SensorValue {
    pub const fn new(val1: i32, val2: i32) -> Self {
        Self { val1, val2 }
    }

    /// Whole value with no fractional part.
    pub const fn integer(val1: i32) -> Self {
        Self { val1, val2: 0 }
    }

    /// Build from a milli-unit integer, e.g. millivolts.
    pub fn from_milli(milli: i32) -> Self {
        Self {
            val1: milli / 1000,
            val2: (milli % 1000) * 1000,
        }
    }

    /// Convert to milli-units without floating point.
    ///
    /// Sub-milli precision is truncated toward zero; results outside `i32` saturate.
    pub fn to_milli(&self) -> i32 {
        let milli = i64::from(self.val1) * 1000 + i64::from(self.val2) / 1000;
        milli.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.val1 < 0 || (self.val1 == 0 && self.val2 < 0);
        let sign = if negative { "-" } else { "" };
        write!(
            f,
            "{sign}{}.{:06}",
            self.val1.unsigned_abs(),
            self.val2.unsigned_abs()
        )
    }
}

/// Quantities a power monitor can report.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SensorChannel {
    /// Bus voltage in volts.
    Voltage,
    /// Shunt current in amperes.
    Current,
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SensorChannel::Voltage => "voltage",
            SensorChannel::Current => "current",
        };
        f.write_str(s)
    }
}

/// Writable device attributes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SensorAttribute {
    /// 1-based physical channel selector; 0 means no selection.
    SelectedChannel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_milli_truncates_fraction() {
        assert_eq!(SensorValue::new(12, 0).to_milli(), 12_000);
        assert_eq!(SensorValue::new(0, 500_000).to_milli(), 500);
        assert_eq!(SensorValue::new(1, 234_999).to_milli(), 1_234);
        assert_eq!(SensorValue::new(-1, -500_000).to_milli(), -1_500);
    }

    #[test]
    fn test_to_milli_saturates() {
        assert_eq!(SensorValue::new(i32::MAX, 0).to_milli(), i32::MAX);
        assert_eq!(SensorValue::new(i32::MIN, 0).to_milli(), i32::MIN);
    }

    #[test]
    fn test_from_milli() {
        assert_eq!(SensorValue::from_milli(12_345), SensorValue::new(12, 345_000));
        assert_eq!(SensorValue::from_milli(-250), SensorValue::new(0, -250_000));
        assert_eq!(SensorValue::from_milli(-250).to_milli(), -250);
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorValue::new(3, 300_000).to_string(), "3.300000");
        assert_eq!(SensorValue::new(0, -5).to_string(), "-0.000005");
    }
}
