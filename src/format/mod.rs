//! Numeric formatting for G-code words
//!
//! Every number that reaches the output goes through a `NumberFormat`, and
//! every "has this changed?" decision is made at the resolution of the
//! format that would print it.

use serde::{Deserialize, Serialize};

/// Measurement unit of the program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[serde(alias = "metric")]
    Mm,
    #[serde(alias = "imperial", alias = "in")]
    Inch,
}

impl Unit {
    /// Decimals used for linear axes
    pub fn xyz_decimals(self) -> u32 {
        match self {
            Unit::Mm => 3,
            Unit::Inch => 4,
        }
    }
}

/// Fixed-decimal number format
#[derive(Debug, Clone, PartialEq)]
pub struct NumberFormat {
    pub decimals: u32,
    pub force_decimal: bool,
    pub prefix: &'static str,
    pub scale: f64,
}

impl NumberFormat {
    pub const fn new(decimals: u32, force_decimal: bool) -> Self {
        Self {
            decimals,
            force_decimal,
            prefix: "",
            scale: 1.0,
        }
    }

    pub const fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = prefix;
        self
    }

    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// G codes: one decimal, trimmed (`G17`, `G48.1`)
    pub const fn g() -> Self {
        Self::new(1, false).with_prefix("G")
    }

    /// M codes
    pub const fn m() -> Self {
        Self::new(0, false).with_prefix("M")
    }

    /// Linear axes for the given unit
    pub fn xyz(unit: Unit) -> Self {
        Self::new(unit.xyz_decimals(), true)
    }

    /// Rotary axes; values are radians, printed in degrees
    pub fn abc() -> Self {
        Self::new(3, true).with_scale(180.0 / std::f64::consts::PI)
    }

    pub const fn feed() -> Self {
        Self::new(1, true)
    }

    pub const fn integer() -> Self {
        Self::new(0, false)
    }

    /// Dwell seconds (controller range 0.1-999.9)
    pub const fn seconds() -> Self {
        Self::new(1, true)
    }

    /// Taper angles; radians in, degrees out
    pub fn taper() -> Self {
        Self::new(1, false).with_scale(180.0 / std::f64::consts::PI)
    }

    fn quantize(&self, value: f64) -> i64 {
        let factor = 10f64.powi(self.decimals as i32);
        (value * self.scale * factor).round() as i64
    }

    /// The value after scaling and rounding to this format's resolution
    pub fn resulting_value(&self, value: f64) -> f64 {
        self.quantize(value) as f64 / 10f64.powi(self.decimals as i32)
    }

    /// True when `a` and `b` would not print the same text
    pub fn are_different(&self, a: f64, b: f64) -> bool {
        self.quantize(a) != self.quantize(b)
    }

    /// Format without the prefix
    pub fn format_number(&self, value: f64) -> String {
        let rounded = self.resulting_value(value);
        // -0.000 prints as 0.000
        let rounded = if rounded == 0.0 { 0.0 } else { rounded };
        let mut text = format!("{:.*}", self.decimals as usize, rounded);

        if self.force_decimal {
            if self.decimals == 0 {
                text.push('.');
            }
        } else if text.contains('.') {
            let trimmed = text.trim_end_matches('0').trim_end_matches('.');
            text = trimmed.to_string();
        }
        text
    }

    pub fn format(&self, value: f64) -> String {
        format!("{}{}", self.prefix, self.format_number(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_decimals_are_padded() {
        let xyz = NumberFormat::xyz(Unit::Mm);
        assert_eq!(xyz.format(10.0), "10.000");
        assert_eq!(xyz.format(-5.0), "-5.000");
        assert_eq!(NumberFormat::feed().format(500.0), "500.0");
    }

    #[test]
    fn test_inch_uses_four_decimals() {
        assert_eq!(NumberFormat::xyz(Unit::Inch).format(0.5), "0.5000");
    }

    #[test]
    fn test_zero_decimal_forced_point() {
        let f = NumberFormat::new(0, true);
        assert_eq!(f.format(0.0), "0.");
        assert_eq!(f.format(12.4), "12.");
    }

    #[test]
    fn test_g_codes_are_trimmed() {
        let g = NumberFormat::g();
        assert_eq!(g.format(17.0), "G17");
        assert_eq!(g.format(0.0), "G0");
        assert_eq!(g.format(48.1), "G48.1");
        assert_eq!(NumberFormat::m().format(2.0), "M2");
    }

    #[test]
    fn test_negative_zero_is_unsigned() {
        assert_eq!(NumberFormat::xyz(Unit::Mm).format(-0.0001), "0.000");
    }

    #[test]
    fn test_resolution_comparison() {
        let xyz = NumberFormat::xyz(Unit::Mm);
        assert!(!xyz.are_different(1.0, 1.0004));
        assert!(!xyz.are_different(2.5, 2.5002));
        assert!(xyz.are_different(1.0, 1.001));
    }

    #[test]
    fn test_angles_scale_to_degrees() {
        let abc = NumberFormat::abc().with_prefix("B");
        assert_eq!(abc.format(std::f64::consts::FRAC_PI_2), "B90.000");
        assert!(!NumberFormat::abc().are_different(0.0, 1e-7));
    }
}
