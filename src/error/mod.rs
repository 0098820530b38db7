//! Translation diagnostics
//!
//! `PostError` aborts the current event (and, depending on the driver's
//! policy, the section or the run). `Warning` is noted and processing
//! continues.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostError {
    #[error("orientation not supported")]
    UnsupportedOrientation,

    #[error("tool orientation is not supported on a 3-axis machine")]
    ToolOrientationNotSupported,

    #[error("machine angles not supported:{angles}")]
    AnglesNotSupported { angles: String },

    #[error("work plane is not supported:{angles}")]
    WorkPlaneNotSupported { angles: String },

    #[error("radius compensation mode cannot be changed at {motion}")]
    RadiusCompensation { motion: &'static str },

    #[error("5-axis simultaneous move in a section that is not optimized for the machine")]
    FiveAxisNotOptimized,

    #[error("using multiple work offsets is not possible if the initial work offset is 0")]
    MultipleWorkOffsets,

    #[error("spindle speed out of range: {rpm} RPM")]
    SpindleSpeedTooLow { rpm: f64 },

    #[error("coolants have not been defined")]
    MissingCoolantTable,

    #[error("bad axis specified for retract: {axis}")]
    BadRetractAxis { axis: char },

    #[error("cannot retract the same axis twice in one line: {axis}")]
    DuplicateRetractAxis { axis: char },

    #[error("no axis specified for retract")]
    NoRetractAxis,

    #[error("cycle point outside of a canned cycle")]
    NoActiveCycle,

    #[error("configuration error: {0}")]
    Config(String),
}

impl PostError {
    /// Errors tied to a single section; the run can move on to the next one.
    pub fn is_section_local(&self) -> bool {
        !matches!(
            self,
            PostError::MultipleWorkOffsets | PostError::MissingCoolantTable | PostError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PostError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Warning {
    #[error("spindle speed exceeds maximum value: {rpm} RPM")]
    SpindleSpeedHigh { rpm: f64 },

    #[error("tool number {number} exceeds maximum value {slots}")]
    ToolNumberExceedsSlots { number: u32, slots: u32 },

    #[error("the diameter offset {offset} exceeds the maximum value {slots}")]
    DiameterOffsetExceedsSlots { offset: u32, slots: u32 },

    #[error("dwelling time is out of range: {seconds}s (clamped to {clamped}s)")]
    DwellOutOfRange { seconds: f64, clamped: f64 },

    #[error("unsupported coolant: {mode}")]
    UnsupportedCoolant { mode: String },

    #[error("unsupported command: {command}")]
    UnsupportedCommand { command: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PostError::RadiusCompensation {
            motion: "rapid traversal",
        };
        assert_eq!(
            err.to_string(),
            "radius compensation mode cannot be changed at rapid traversal"
        );

        let warning = Warning::ToolNumberExceedsSlots {
            number: 1200,
            slots: 999,
        };
        assert_eq!(warning.to_string(), "tool number 1200 exceeds maximum value 999");
    }

    #[test]
    fn test_section_local_classification() {
        assert!(PostError::UnsupportedOrientation.is_section_local());
        assert!(!PostError::MissingCoolantTable.is_section_local());
    }
}
