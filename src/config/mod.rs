//! Post configuration
//!
//! Every user-facing option of the post plus the machine description. All
//! fields have Thermwood defaults, so a JSON file only needs the overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uom::si::f64::Length;
use uom::si::length::{inch, millimeter};

use crate::block::SequenceMode;
use crate::coolant::{default_table, CoolantDefinition};
use crate::format::Unit;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{name} is out of range: {value} (valid: {min}..={max})")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineKind {
    ThreeAxis,
    /// Rotary B/C head
    HeadBc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub kind: MachineKind,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    /// Z of the safe retract plane
    pub retract_plane: f64,
    pub home_x: Option<f64>,
    pub home_y: Option<f64>,
    /// Degrees
    pub b_range: (f64, f64),
    /// Degrees
    pub c_range: (f64, f64),
    pub c_cyclic: bool,
    /// Rotation centre to tool tip, inches
    pub pivot_distance: f64,
    /// Prefer the machine angles closest to the current ones
    pub closest_abc: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            kind: MachineKind::ThreeAxis,
            vendor: Some("Thermwood".to_string()),
            model: None,
            description: Some("Generic 3-axis router".to_string()),
            retract_plane: 0.0,
            home_x: None,
            home_y: None,
            b_range: (-135.001, 135.001),
            c_range: (-360.001, 360.001),
            c_cyclic: false,
            // 2.5in is assumed for the tool length
            pivot_distance: 10.291 + 2.5,
            closest_abc: false,
        }
    }
}

/// Work shift values written in the header (`SET XSHIFT=...`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            x: 2.0,
            y: 6.0,
            z: 0.0,
        }
    }
}

/// Fixed program trailer of the control
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterConfig {
    pub end_macro: String,
    pub end_code: u32,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            end_macro: "M98PENDTIME.SUBL1".to_string(),
            end_code: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub write_machine: bool,
    pub write_tools: bool,
    pub sequence_numbers: SequenceMode,
    pub sequence_number_start: u32,
    pub sequence_number_increment: u32,
    pub optional_stop: bool,
    pub separate_words_with_space: bool,
    pub allow_3d_arcs: bool,
    pub use_cycles: bool,
    pub write_version: bool,
    /// G8xx acceleration macro
    pub acceleration: i64,
    /// G9 tangency factor
    pub tangency: i64,
    pub number_of_tool_slots: u32,
    /// Write multiple coolant codes in one block
    pub single_line_coolant: bool,
    pub coolants: Option<Vec<CoolantDefinition>>,
    /// Chordal tolerance for linearized arcs, millimeters
    pub tolerance: f64,
    /// Gap above the previous peck when rapiding back in, millimeters
    pub peck_reentry: f64,
    pub machine: MachineConfig,
    pub shift: ShiftConfig,
    pub footer: FooterConfig,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            write_machine: true,
            write_tools: true,
            sequence_numbers: SequenceMode::Off,
            sequence_number_start: 10,
            sequence_number_increment: 1,
            optional_stop: true,
            separate_words_with_space: true,
            allow_3d_arcs: false,
            use_cycles: true,
            write_version: false,
            acceleration: 5,
            tangency: 1,
            number_of_tool_slots: 999,
            single_line_coolant: false,
            coolants: Some(default_table()),
            tolerance: 0.002,
            peck_reentry: 1.0,
            machine: MachineConfig::default(),
            shift: ShiftConfig::default(),
            footer: FooterConfig::default(),
        }
    }
}

impl PostConfig {
    /// Load a config from a JSON file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PostConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("acceleration", self.acceleration, 0, 9)?;
        check_range("tangency", self.tangency, 1, 40)?;
        Ok(())
    }

    /// Pivot distance in program units
    pub fn pivot_distance(&self, unit: Unit) -> f64 {
        to_unit(Length::new::<inch>(self.machine.pivot_distance), unit)
    }

    /// Arc linearization tolerance in program units
    pub fn tolerance(&self, unit: Unit) -> f64 {
        to_unit(Length::new::<millimeter>(self.tolerance), unit)
    }

    pub fn peck_reentry(&self, unit: Unit) -> f64 {
        to_unit(Length::new::<millimeter>(self.peck_reentry), unit)
    }
}

fn to_unit(length: Length, unit: Unit) -> f64 {
    match unit {
        Unit::Mm => length.get::<millimeter>(),
        Unit::Inch => length.get::<inch>(),
    }
}

fn check_range(name: &'static str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PostConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sequence_numbers, SequenceMode::Off);
        assert_eq!(config.sequence_number_start, 10);
        assert!(config.use_cycles);
        assert!(!config.allow_3d_arcs);
    }

    #[test]
    fn test_partial_json() {
        let config = PostConfig::from_json(
            r#"{
                "sequence_numbers": "tool-change-only",
                "sequence_number_increment": 5,
                "machine": { "kind": "head-bc", "c_cyclic": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.sequence_numbers, SequenceMode::ToolChangeOnly);
        assert_eq!(config.sequence_number_increment, 5);
        assert_eq!(config.machine.kind, MachineKind::HeadBc);
        assert!(config.machine.c_cyclic);
        assert_eq!(config.footer.end_code, 2);
    }

    #[test]
    fn test_out_of_range_is_rejected() {
        let err = PostConfig::from_json(r#"{ "tangency": 41 }"#).unwrap_err();
        assert_eq!(err.to_string(), "tangency is out of range: 41 (valid: 1..=40)");
        assert!(PostConfig::from_json(r#"{ "acceleration": -1 }"#).is_err());

        let err = PostConfig::from_json(r#"{ "acceleration": 10 }"#).unwrap_err();
        assert_eq!(err.to_string(), "acceleration is out of range: 10 (valid: 0..=9)");
        assert!(PostConfig::from_json(r#"{ "acceleration": 9 }"#).is_ok());
    }

    #[test]
    fn test_pivot_distance_conversion() {
        let config = PostConfig::default();
        let inches = config.pivot_distance(Unit::Inch);
        assert!((inches - 12.791).abs() < 1e-9);
        let mm = config.pivot_distance(Unit::Mm);
        assert!((mm - 12.791 * 25.4).abs() < 1e-9);
    }
}
