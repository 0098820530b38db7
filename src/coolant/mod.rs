//! Coolant state machine
//!
//! Maps a requested coolant mode onto the M codes of the machine. Some
//! relays must be released before another one is energized, so switching
//! between two active modes writes the outgoing off code first.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PostError, Result, Warning};
use crate::format::NumberFormat;
use crate::model::CoolantMode;

/// A code entry: an M number, a list of M numbers, or literal text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoolantCodes {
    Single(u32),
    Multiple(Vec<u32>),
    Text(String),
}

impl CoolantCodes {
    pub fn words(&self) -> Vec<String> {
        let m = NumberFormat::m();
        match self {
            CoolantCodes::Single(code) => vec![m.format(*code as f64)],
            CoolantCodes::Multiple(codes) => codes.iter().map(|c| m.format(*c as f64)).collect(),
            CoolantCodes::Text(text) => vec![text.clone()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolantDefinition {
    #[serde(rename = "id")]
    pub mode: CoolantMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<CoolantCodes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub off: Option<CoolantCodes>,
}

impl CoolantDefinition {
    pub fn new(mode: CoolantMode, on: Option<u32>, off: Option<u32>) -> Self {
        Self {
            mode,
            on: on.map(CoolantCodes::Single),
            off: off.map(CoolantCodes::Single),
        }
    }
}

/// Thermwood defaults: flood M8, mist M7, off M9, everything else unmapped
pub fn default_table() -> Vec<CoolantDefinition> {
    vec![
        CoolantDefinition::new(CoolantMode::Flood, Some(8), None),
        CoolantDefinition::new(CoolantMode::Mist, Some(7), None),
        CoolantDefinition::new(CoolantMode::ThroughTool, None, None),
        CoolantDefinition::new(CoolantMode::Air, None, None),
        CoolantDefinition::new(CoolantMode::AirThroughTool, None, None),
        CoolantDefinition::new(CoolantMode::Suction, None, None),
        CoolantDefinition::new(CoolantMode::FloodMist, None, None),
        CoolantDefinition::new(CoolantMode::FloodThroughTool, None, None),
        CoolantDefinition::new(CoolantMode::Off, None, Some(9)),
    ]
}

/// Code written when a requested mode has no on code
pub const DEFAULT_OFF_CODE: u32 = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum CoolantOutput {
    /// Requested mode is already active
    Suppressed,
    Codes(Vec<String>),
    /// No code for the requested mode; the substitute is written instead
    Unsupported { warning: Warning, substitute: String },
}

#[derive(Debug, Clone)]
pub struct CoolantState {
    current: CoolantMode,
    pending_off: Option<CoolantCodes>,
    force: bool,
}

impl Default for CoolantState {
    fn default() -> Self {
        Self::new()
    }
}

impl CoolantState {
    pub fn new() -> Self {
        Self {
            current: CoolantMode::Off,
            pending_off: None,
            force: false,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> CoolantMode {
        self.current
    }

    /// Re-issue the active mode on the next request (after M0/M1).
    pub fn force(&mut self) {
        self.force = true;
    }

    pub fn resolve(
        &mut self,
        requested: CoolantMode,
        tool_is_probe: bool,
        table: Option<&[CoolantDefinition]>,
    ) -> Result<CoolantOutput> {
        let table = table.ok_or(PostError::MissingCoolantTable)?;
        // no coolant while probing
        let requested = if tool_is_probe {
            CoolantMode::Off
        } else {
            requested
        };

        if requested == self.current && (!self.force || requested == CoolantMode::Off) {
            return Ok(CoolantOutput::Suppressed);
        }

        let mut words = Vec::new();
        if requested != CoolantMode::Off && self.current != CoolantMode::Off && !self.force {
            if let Some(off) = &self.pending_off {
                words.extend(off.words());
            }
        }
        self.force = false;

        let entry = table.iter().find(|d| d.mode == requested);
        let on = entry.and_then(|d| d.on.clone());
        let off = entry.and_then(|d| d.off.clone()).or_else(|| {
            table
                .iter()
                .find(|d| d.mode == CoolantMode::Off)
                .and_then(|d| d.off.clone())
        });

        let codes = if requested == CoolantMode::Off {
            self.pending_off.clone().or(off)
        } else {
            self.pending_off = off;
            on
        };

        match codes {
            Some(codes) => {
                words.extend(codes.words());
                self.current = requested;
                Ok(CoolantOutput::Codes(words))
            }
            None => {
                let warning = Warning::UnsupportedCoolant {
                    mode: requested.name().to_string(),
                };
                warn!("{}", warning);
                Ok(CoolantOutput::Unsupported {
                    warning,
                    substitute: NumberFormat::m().format(DEFAULT_OFF_CODE as f64),
                })
            }
        }
    }
}
