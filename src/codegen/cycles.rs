//! Canned cycles
//!
//! Each cycle kind either maps onto a native G8x block or is expanded into
//! plain rapid/feed/dwell moves. Cycle planes and points are in the section
//! frame.

use super::Translator;
use crate::block::{word, Word};
use crate::error::{PostError, Result};
use crate::format::{NumberFormat, Unit};
use crate::modal::ModalGroupId;
use crate::model::{Command, Cycle, CycleKind, Section, Tool, ToolType, Vec3};

#[derive(Debug, Clone)]
pub(super) struct CycleState {
    cycle: Cycle,
    first_point: bool,
    expanded: bool,
}

/// Native cycle block for one point
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NativeCycle {
    pub code: f64,
    /// Words between the common X/Y/Z and the feed
    pub operands: Vec<String>,
    pub feed: f64,
    /// Words written after the feed
    pub trailing: Vec<String>,
}

impl NativeCycle {
    fn new(code: f64, feed: f64) -> Self {
        Self {
            code,
            operands: Vec::new(),
            feed,
            trailing: Vec::new(),
        }
    }

    fn operand(mut self, text: String) -> Self {
        self.operands.push(text);
        self
    }
}

impl Cycle {
    /// The native block for this cycle, or `None` when it must be expanded
    pub(crate) fn native(&self, tool: &Tool, spindle_speed: f64, bottom: f64, unit: Unit) -> Option<NativeCycle> {
        let xyz = NumberFormat::xyz(unit);
        let seconds = NumberFormat::seconds();
        let feed_format = NumberFormat::feed();
        let dwell = self.kind.dwell();
        let p = if dwell > 0.0 { dwell.clamp(0.001, 99999.999) } else { 0.0 };
        let feed = self.feedrate;
        let tapping_feed = if feed == 0.0 {
            tool.tapping_feedrate(spindle_speed)
        } else {
            feed
        };
        let same_feeds =
            feed_format.resulting_value(self.feedrate) == feed_format.resulting_value(self.retract_feedrate);

        match &self.kind {
            CycleKind::Drilling => Some(NativeCycle::new(81.0, feed)),
            CycleKind::CounterBoring { .. } if p > 0.0 => {
                Some(NativeCycle::new(82.0, feed).operand(format!("P{}", seconds.format(p))))
            }
            CycleKind::CounterBoring { .. } => Some(NativeCycle::new(81.0, feed)),
            CycleKind::ChipBreaking { .. } | CycleKind::FineBoring { .. } => None,
            CycleKind::DeepDrilling { .. } if p > 0.0 => None,
            CycleKind::DeepDrilling {
                incremental_depth, ..
            } => Some(NativeCycle::new(83.0, feed).operand(format!("Q{}", xyz.format(*incremental_depth)))),
            CycleKind::Tapping => {
                let code = if tool.tool_type == ToolType::TapLeftHand {
                    74.0
                } else {
                    84.0
                };
                Some(NativeCycle::new(code, tapping_feed))
            }
            CycleKind::LeftTapping => Some(NativeCycle::new(74.0, tapping_feed)),
            CycleKind::RightTapping => Some(NativeCycle::new(84.0, tapping_feed)),
            CycleKind::BackBoring { .. } if p > 0.0 => None,
            CycleKind::BackBoring {
                shift,
                back_bore_distance,
                ..
            } => Some(
                NativeCycle::new(87.0, feed)
                    .operand(format!("I{}", xyz.format(*shift)))
                    .operand(format!("J{}", xyz.format(0.0)))
                    .operand(format!("K{}", xyz.format(bottom - back_bore_distance))),
            ),
            CycleKind::Reaming { .. } if !same_feeds => None,
            CycleKind::Reaming { .. } => Some(NativeCycle::new(85.0, feed)),
            CycleKind::StopBoring { .. } => {
                let mut native = NativeCycle::new(86.0, feed);
                native.trailing.push(format!("P{}", seconds.format(p)));
                Some(native)
            }
            CycleKind::Boring { .. } if !same_feeds => None,
            CycleKind::Boring { .. } if p > 0.0 => {
                Some(NativeCycle::new(89.0, feed).operand(format!("P{}", seconds.format(p))))
            }
            CycleKind::Boring { .. } => Some(NativeCycle::new(85.0, feed)),
        }
    }
}

impl Translator {
    pub(super) fn on_cycle(&mut self, cycle: &Cycle) {
        if self.config.use_cycles {
            let plane = self.modals.plane(17.0);
            self.out.write_block(&[plane]);
        }
        self.cycle = Some(CycleState {
            cycle: cycle.clone(),
            first_point: true,
            expanded: false,
        });
    }

    pub(super) fn on_cycle_point(&mut self, section: &Section, point: Vec3) -> Result<()> {
        let (cycle, first_point, expanded) = match &self.cycle {
            Some(state) => (state.cycle.clone(), state.first_point, state.expanded),
            None => return Err(PostError::NoActiveCycle),
        };
        if let Some(state) = self.cycle.as_mut() {
            state.first_point = false;
        }

        if !self.config.use_cycles || !section.is_z_oriented() {
            return self.expand_cycle_point(&cycle, section, point);
        }

        let xyz = NumberFormat::xyz(self.unit);
        let requires_retract = xyz.are_different(cycle.retract, cycle.clearance);
        if first_point || requires_retract {
            let clearance = self.workplane.frame_position(Vec3::new(0.0, 0.0, cycle.clearance)).z;
            self.on_rapid(Vec3::new(self.position.x, self.position.y, clearance))?;

            let bottom = self.workplane.frame_position(point).z;
            match cycle.native(&section.tool, section.spindle_speed, bottom, self.unit) {
                Some(native) => self.write_native_cycle(&native, point, clearance),
                None => self.expand_cycle_point(&cycle, section, point)?,
            }
            let expanded = self.cycle.as_ref().map_or(false, |s| s.expanded);
            if requires_retract && !expanded {
                let cancel = self.modals.cycle(80.0);
                self.out.write_block(&[cancel]);
                self.modals.reset(ModalGroupId::Motion);
            }
        } else if expanded {
            self.expand_cycle_point(&cycle, section, point)?;
        } else {
            let target = self.workplane.frame_position(point);
            let mut x = self.outputs.x.format(target.x);
            let y = self.outputs.y.format(target.y);
            if x.is_none() && y.is_none() {
                // at least one axis is required
                self.outputs.x.reset();
                x = self.outputs.x.format(target.x);
            }
            self.out.write_block(&[x, y]);
            self.position = Vec3::new(target.x, target.y, self.position.z);
        }
        Ok(())
    }

    pub(super) fn on_cycle_end(&mut self) {
        if let Some(state) = self.cycle.take() {
            if !state.expanded {
                let cancel = self.modals.cycle(80.0);
                self.out.write_block(&[cancel]);
                self.outputs.reset_z();
            }
        }
    }

    fn write_native_cycle(&mut self, native: &NativeCycle, point: Vec3, clearance: f64) {
        let target = self.workplane.frame_position(point);
        let xyz = NumberFormat::xyz(self.unit);
        self.outputs.force_xyz();

        let mut block: Vec<Word> = vec![
            self.modals.abs_inc(90.0),
            self.modals.cycle(native.code),
            self.outputs.x.format(target.x),
            self.outputs.y.format(target.y),
            // bottom is not tracked; the tool returns to the initial plane
            word(format!("Z{}", xyz.format(target.z))),
        ];
        block.extend(native.operands.iter().cloned().map(Some));
        block.push(self.outputs.feed.format(native.feed));
        block.extend(native.trailing.iter().cloned().map(Some));
        self.out.write_block(&block);
        self.position = Vec3::new(target.x, target.y, clearance);
    }

    fn rapid_local(&mut self, local: Vec3) -> Result<()> {
        let target = self.workplane.frame_position(local);
        self.on_rapid(target)
    }

    fn linear_local(&mut self, local: Vec3, feed: f64) -> Result<()> {
        let target = self.workplane.frame_position(local);
        self.on_linear(target, feed, true)
    }

    /// Write the cycle as explicit moves
    fn expand_cycle_point(&mut self, cycle: &Cycle, section: &Section, point: Vec3) -> Result<()> {
        let at = |z: f64| Vec3::new(point.x, point.y, z);
        let shifted = |shift: f64, z: f64| Vec3::new(point.x + shift, point.y, z);
        let bottom = point.z;
        let feed = cycle.feedrate;
        let dwell = cycle.kind.dwell();

        self.rapid_local(at(cycle.clearance))?;
        self.rapid_local(at(cycle.retract))?;

        match &cycle.kind {
            CycleKind::Drilling | CycleKind::CounterBoring { .. } => {
                self.linear_local(at(bottom), feed)?;
                self.dwell_if(dwell);
            }
            CycleKind::ChipBreaking {
                incremental_depth,
                chip_break_distance,
                ..
            } => {
                for depth in peck_depths(cycle.stock.min(cycle.retract), bottom, *incremental_depth) {
                    self.linear_local(at(depth), feed)?;
                    if depth > bottom {
                        self.rapid_local(at(depth + chip_break_distance))?;
                    }
                }
                self.dwell_if(dwell);
            }
            CycleKind::DeepDrilling {
                incremental_depth, ..
            } => {
                let reentry = self.config.peck_reentry(self.unit);
                for depth in peck_depths(cycle.stock.min(cycle.retract), bottom, *incremental_depth) {
                    self.linear_local(at(depth), feed)?;
                    if depth > bottom {
                        self.rapid_local(at(cycle.retract))?;
                        self.rapid_local(at(depth + reentry))?;
                    }
                }
                self.dwell_if(dwell);
            }
            CycleKind::Tapping | CycleKind::LeftTapping | CycleKind::RightTapping => {
                let left = match cycle.kind {
                    CycleKind::LeftTapping => true,
                    CycleKind::RightTapping => false,
                    _ => section.tool.tool_type == ToolType::TapLeftHand,
                };
                let feed = if feed == 0.0 {
                    section.tool.tapping_feedrate(section.spindle_speed)
                } else {
                    feed
                };
                self.linear_local(at(bottom), feed)?;
                let reverse = if left {
                    Command::SpindleClockwise
                } else {
                    Command::SpindleCounterClockwise
                };
                self.on_command(&reverse)?;
                self.linear_local(at(cycle.retract), feed)?;
                self.on_command(&Command::StartSpindle)?;
            }
            CycleKind::FineBoring { shift, .. } => {
                self.linear_local(at(bottom), feed)?;
                self.dwell_if(dwell);
                self.on_command(&Command::StopSpindle)?;
                self.rapid_local(shifted(*shift, bottom))?;
                self.rapid_local(shifted(*shift, cycle.retract))?;
                self.rapid_local(at(cycle.retract))?;
                self.on_command(&Command::StartSpindle)?;
            }
            CycleKind::BackBoring {
                shift,
                back_bore_distance,
                ..
            } => {
                let start = bottom - back_bore_distance;
                self.on_command(&Command::StopSpindle)?;
                self.rapid_local(shifted(*shift, cycle.retract))?;
                self.rapid_local(shifted(*shift, start))?;
                self.rapid_local(at(start))?;
                self.on_command(&Command::StartSpindle)?;
                self.linear_local(at(bottom), feed)?;
                self.dwell_if(dwell);
                self.on_command(&Command::StopSpindle)?;
                self.rapid_local(shifted(*shift, bottom))?;
                self.rapid_local(shifted(*shift, cycle.retract))?;
                self.rapid_local(at(cycle.retract))?;
                self.on_command(&Command::StartSpindle)?;
            }
            CycleKind::Reaming { .. } | CycleKind::Boring { .. } => {
                self.linear_local(at(bottom), feed)?;
                self.dwell_if(dwell);
                self.linear_local(at(cycle.retract), cycle.retract_feedrate)?;
            }
            CycleKind::StopBoring { .. } => {
                self.linear_local(at(bottom), feed)?;
                self.dwell_if(dwell);
                self.on_command(&Command::StopSpindle)?;
                self.rapid_local(at(cycle.retract))?;
                self.on_command(&Command::StartSpindle)?;
            }
        }

        self.rapid_local(at(cycle.clearance))?;
        if let Some(state) = self.cycle.as_mut() {
            state.expanded = true;
        }
        Ok(())
    }

    fn dwell_if(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.on_dwell(seconds);
        }
    }
}

/// Peck levels from `top` down to `bottom`, the last one exactly at `bottom`
fn peck_depths(top: f64, bottom: f64, increment: f64) -> Vec<f64> {
    if increment <= 0.0 || top <= bottom {
        return vec![bottom];
    }
    let mut depths = Vec::new();
    let mut depth = top;
    while depth > bottom {
        depth = (depth - increment).max(bottom);
        depths.push(depth);
    }
    depths
}
