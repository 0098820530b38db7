//! Axis and word output tracking
//!
//! Each output remembers what it last wrote so an unchanged value costs
//! nothing. X/Y/Z also carry an additive offset used for pivot
//! compensation.

use crate::format::{NumberFormat, Unit};

/// A formatted word with a cache of the last emitted value
#[derive(Debug, Clone)]
pub struct AxisOutput {
    format: NumberFormat,
    pub offset: f64,
    last: Option<f64>,
    force: bool,
    enabled: bool,
}

impl AxisOutput {
    pub fn new(format: NumberFormat) -> Self {
        Self {
            format,
            offset: 0.0,
            last: None,
            force: false,
            enabled: true,
        }
    }

    /// An output that emits on every call
    pub fn forced(format: NumberFormat) -> Self {
        Self {
            force: true,
            ..Self::new(format)
        }
    }

    /// Offset is applied before formatting and before comparison.
    pub fn format(&mut self, value: f64) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let value = value + self.offset;
        if !self.force {
            if let Some(last) = self.last {
                if !self.format.are_different(last, value) {
                    return None;
                }
            }
        }
        self.last = Some(value);
        Some(self.format.format(value))
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Last emitted value, offset included
    pub fn current(&self) -> Option<f64> {
        self.last
    }
}

/// Word that is only written when it differs from a reference value
/// (arc centre offsets against 0).
#[derive(Debug, Clone)]
pub struct ReferenceOutput {
    format: NumberFormat,
}

impl ReferenceOutput {
    pub fn new(format: NumberFormat) -> Self {
        Self { format }
    }

    pub fn format(&self, value: f64, reference: f64) -> Option<String> {
        if self.format.are_different(value, reference) {
            Some(self.format.format(value))
        } else {
            None
        }
    }
}

/// Every tracked word of the program plus the retract flag the Z output
/// maintains.
#[derive(Debug, Clone)]
pub struct Outputs {
    pub x: AxisOutput,
    pub y: AxisOutput,
    z: AxisOutput,
    pub a: AxisOutput,
    pub b: AxisOutput,
    pub c: AxisOutput,
    pub feed: AxisOutput,
    pub spindle: AxisOutput,
    pub i: ReferenceOutput,
    pub j: ReferenceOutput,
    pub k: ReferenceOutput,
    retracted: bool,
}

impl Outputs {
    pub fn new(unit: Unit) -> Self {
        let xyz = NumberFormat::xyz(unit);
        Self {
            x: AxisOutput::new(xyz.clone().with_prefix("X")),
            y: AxisOutput::new(xyz.clone().with_prefix("Y")),
            z: AxisOutput::new(xyz.clone().with_prefix("Z")),
            a: AxisOutput::new(NumberFormat::abc().with_prefix("A")),
            b: AxisOutput::new(NumberFormat::abc().with_prefix("B")),
            c: AxisOutput::new(NumberFormat::abc().with_prefix("C")),
            feed: AxisOutput::new(NumberFormat::feed().with_prefix("F")),
            spindle: AxisOutput::forced(NumberFormat::integer().with_prefix("S")),
            i: ReferenceOutput::new(xyz.clone().with_prefix("I")),
            j: ReferenceOutput::new(xyz.clone().with_prefix("J")),
            k: ReferenceOutput::new(xyz.with_prefix("K")),
            retracted: false,
        }
    }

    /// Z output; any emitted Z means the tool left the retract plane.
    pub fn z(&mut self, value: f64) -> Option<String> {
        let word = self.z.format(value);
        if word.is_some() {
            self.retracted = false;
        }
        word
    }

    pub fn reset_z(&mut self) {
        self.z.reset();
    }

    pub fn is_retracted(&self) -> bool {
        self.retracted
    }

    pub fn set_retracted(&mut self, retracted: bool) {
        self.retracted = retracted;
    }

    pub fn set_offsets(&mut self, x: f64, y: f64, z: f64) {
        self.x.offset = x;
        self.y.offset = y;
        self.z.offset = z;
    }

    pub fn clear_offsets(&mut self) {
        self.set_offsets(0.0, 0.0, 0.0);
    }

    pub fn force_xyz(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }

    pub fn force_abc(&mut self) {
        self.a.reset();
        self.b.reset();
        self.c.reset();
    }

    /// Force X, Y, Z, A, B, C and F on their next output.
    pub fn force_any(&mut self) {
        self.force_xyz();
        self.force_abc();
        self.feed.reset();
    }
}
