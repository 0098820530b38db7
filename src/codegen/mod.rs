//! G-code generator
//! Walks a cutter-location program section by section and writes the
//! Thermwood program: header, per-section setup, motion and the fixed footer.

mod cycles;
mod motion;

use cgmath::InnerSpace;
use tracing::{debug, error, info, warn};

use crate::block::{format_comment, word, GCodeOutput, Word};
use crate::config::PostConfig;
use crate::coolant::{CoolantOutput, CoolantState};
use crate::error::{PostError, Result, Warning};
use crate::format::{NumberFormat, Unit};
use crate::kinematics::{self, Kinematics};
use crate::modal::{ModalGroupId, Modals};
use crate::model::{
    is_same_direction, Command, CoolantMode, Event, Program, RadiusCompensation, Section, Tool,
    Vec3,
};
use crate::output::Outputs;
use crate::validator;
use crate::workplane::WorkPlaneResolver;

use cycles::CycleState;

/// What to do when a section fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop at the first fatal error
    #[default]
    Halt,
    /// Log the error, drop the rest of the section and carry on
    SkipSection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSection {
    pub index: usize,
    pub error: PostError,
}

/// Result of a run
#[derive(Debug)]
pub struct Translation {
    pub output: GCodeOutput,
    pub warnings: Vec<Warning>,
    pub skipped: Vec<SkippedSection>,
}

impl Translation {
    pub fn gcode(&self) -> String {
        self.output.to_string()
    }
}

/// Translate a whole program with the given configuration
pub fn translate(program: &Program, config: &PostConfig, policy: ErrorPolicy) -> Result<Translation> {
    let mut translator = Translator::new(config.clone(), program.unit, policy);
    translator.run(program)?;
    Ok(translator.finish())
}

pub struct Translator {
    config: PostConfig,
    unit: Unit,
    policy: ErrorPolicy,
    kinematics: Box<dyn Kinematics>,
    out: GCodeOutput,
    modals: Modals,
    outputs: Outputs,
    coolant: CoolantState,
    workplane: WorkPlaneResolver,
    warnings: Vec<Warning>,
    skipped: Vec<SkippedSection>,
    tool: Option<Tool>,
    current_work_offset: Option<u32>,
    force_spindle_speed: bool,
    pending_compensation: Option<RadiusCompensation>,
    /// Rotation centre to tool tip, program units
    head_offset: f64,
    /// Last commanded position, output frame without pivot offsets
    position: Vec3,
    cycle: Option<CycleState>,
    /// Machine state is unknown after a skipped section
    recovering: bool,
}

impl Translator {
    pub fn new(config: PostConfig, unit: Unit, policy: ErrorPolicy) -> Self {
        let kinematics = kinematics::from_config(&config.machine);
        Self::with_kinematics(config, unit, policy, kinematics)
    }

    /// Translator for a machine described by its own kinematics
    pub fn with_kinematics(
        config: PostConfig,
        unit: Unit,
        policy: ErrorPolicy,
        kinematics: Box<dyn Kinematics>,
    ) -> Self {
        let mut outputs = Outputs::new(unit);
        if !kinematics.is_machine_coordinate(0) {
            outputs.a.disable();
        }
        if !kinematics.is_machine_coordinate(1) {
            outputs.b.disable();
        }
        if !kinematics.is_machine_coordinate(2) {
            outputs.c.disable();
        }

        let out = GCodeOutput::new()
            .with_sequence(
                config.sequence_numbers,
                config.sequence_number_start,
                config.sequence_number_increment,
            )
            .with_separator(config.separate_words_with_space);
        let workplane = WorkPlaneResolver::new(config.machine.closest_abc);
        let head_offset = config.pivot_distance(unit);

        Self {
            config,
            unit,
            policy,
            kinematics,
            out,
            modals: Modals::new(),
            outputs,
            coolant: CoolantState::new(),
            workplane,
            warnings: Vec::new(),
            skipped: Vec::new(),
            tool: None,
            current_work_offset: None,
            force_spindle_speed: false,
            pending_compensation: None,
            head_offset,
            position: Vec3::new(0.0, 0.0, 0.0),
            cycle: None,
            recovering: false,
        }
    }

    pub fn run(&mut self, program: &Program) -> Result<()> {
        self.config
            .validate()
            .map_err(|e| PostError::Config(e.to_string()))?;
        if validator::has_ambiguous_work_offsets(program) {
            return Err(PostError::MultipleWorkOffsets);
        }

        info!(sections = program.sections.len(), "translating program");
        self.write_header(program);

        for index in 0..program.sections.len() {
            match self.translate_section(program, index) {
                Ok(()) => {}
                Err(err) if self.policy == ErrorPolicy::SkipSection && err.is_section_local() => {
                    error!(section = index, "{}", err);
                    self.skipped.push(SkippedSection { index, error: err });
                    self.recover();
                }
                Err(err) => return Err(err),
            }
        }

        self.write_footer();
        Ok(())
    }

    pub fn finish(self) -> Translation {
        Translation {
            output: self.out,
            warnings: self.warnings,
            skipped: self.skipped,
        }
    }

    fn translate_section(&mut self, program: &Program, index: usize) -> Result<()> {
        let section = &program.sections[index];
        debug!(section = index, tool = section.tool.number, "section start");
        self.on_section(program, index)?;
        for (i, event) in section.events.iter().enumerate() {
            self.on_event(section, event, section.events.get(i + 1))?;
        }
        self.on_section_end(program, index)
    }

    /// Forget everything the skipped section may have left behind
    fn recover(&mut self) {
        self.recovering = true;
        self.cycle = None;
        self.pending_compensation = None;
        self.current_work_offset = None;
        self.force_spindle_speed = true;
        self.workplane.force();
        self.modals.reset(ModalGroupId::Motion);
        self.outputs.clear_offsets();
        self.outputs.force_any();
    }

    fn warn(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn write_header(&mut self, program: &Program) {
        if let Some(name) = &program.name {
            self.out.write_comment(name);
        }
        if let Some(comment) = &program.comment {
            self.out.write_comment(comment);
        }
        if self.config.write_version {
            self.out
                .write_comment(&format!("post version: {}", env!("CARGO_PKG_VERSION")));
        }

        let machine = &self.config.machine;
        let details = [
            ("vendor", &machine.vendor),
            ("model", &machine.model),
            ("description", &machine.description),
        ];
        if self.config.write_machine && details.iter().any(|(_, v)| v.is_some()) {
            let mut lines = vec!["Machine".to_string()];
            for (label, value) in details {
                if let Some(value) = value {
                    lines.push(format!("  {}: {}", label, value));
                }
            }
            for line in lines {
                self.out.write_comment(&line);
            }
        }

        if self.config.write_tools {
            let xyz = NumberFormat::xyz(self.unit);
            for tool in &program.tools {
                let mut text = format!(
                    "T{}  D={} CR={}",
                    tool.number,
                    xyz.format(tool.diameter),
                    xyz.format(tool.corner_radius)
                );
                if tool.taper_angle > 0.0 && tool.taper_angle < std::f64::consts::PI {
                    text.push_str(&format!(" TAPER={}deg", NumberFormat::taper().format(tool.taper_angle)));
                }
                if let Some(z_min) = program.tool_z_min(tool.number) {
                    text.push_str(&format!(" - ZMIN={}", xyz.format(z_min)));
                }
                text.push_str(&format!(" - {}", tool.tool_type.display_name()));
                self.out.write_comment(&text);
            }
            self.out.write_line("");
        }

        let g = NumberFormat::g();
        let words = [self.modals.abs_inc(90.0), self.modals.feed_mode(94.0), word(g.format(40.0))];
        self.out.write_block(&words);
        self.out.write_block(&[word(g.format(990.0))]);
        self.out.write_block(&[word(NumberFormat::m().format(48.0))]);
        self.out.write_block(&[word(g.format(96.0))]);
        let plane = self.modals.plane(17.0);
        self.out.write_block(&[plane]);
        let units = match self.unit {
            Unit::Inch => self.modals.units(70.0),
            Unit::Mm => self.modals.units(71.0),
        };
        self.out.write_block(&[units]);

        self.out.write_block(&[
            word(g.format((800 + self.config.acceleration) as f64)),
            word(format_comment("Acceleration Macro")),
        ]);
        self.out.write_block(&[
            word(g.format(9.0)),
            word(format!("F{}", self.config.tangency)),
            word(format_comment("Tangency Factor")),
        ]);
        let shift = &self.config.shift;
        for (axis, value) in [("X", shift.x), ("Y", shift.y), ("Z", shift.z)] {
            self.out.write_block(&[word(format!("SET {}SHIFT={:.2}", axis, value))]);
        }
        self.out.write_block(&[word(g.format(901.0))]);
    }

    fn write_footer(&mut self) {
        let g = NumberFormat::g();
        let m = NumberFormat::m();
        self.out.write_line("");
        self.out.write_block(&[word(m.format(5.0))]);
        self.out.write_block(&[word(g.format(990.0))]);
        self.out
            .write_block(&[word(g.format(90.0)), word(g.format(0.0)), word("Z0")]);
        self.out.write_block(&[word("X0."), word("Y0.")]);
        let end_macro = self.config.footer.end_macro.clone();
        self.out.write_line(&end_macro);
        self.out
            .write_block(&[word(m.format(self.config.footer.end_code as f64))]);
    }

    fn is_new_work_plane(&self, previous: &Section, section: &Section) -> bool {
        !is_same_direction(previous.final_tool_axis, section.initial_tool_axis)
            || (section.optimized
                && previous.optimized
                && (previous.final_tool_axis_abc() - section.initial_tool_axis_abc()).magnitude()
                    > 1e-4)
            || (!self.kinematics.is_multi_axis() && section.multi_axis)
            || previous.multi_axis != section.multi_axis
    }

    fn on_section(&mut self, program: &Program, index: usize) -> Result<()> {
        let section = &program.sections[index];
        let previous = index.checked_sub(1).map(|i| &program.sections[i]);
        let tool = &section.tool;
        self.tool = Some(tool.clone());

        let first = previous.is_none();
        let insert_tool_call = self.recovering
            || section.force_tool_change
            || previous.map_or(true, |p| p.tool.number != tool.number);
        let new_work_offset = previous.map_or(true, |p| p.work_offset != section.work_offset);
        let new_work_plane = previous.map_or(true, |p| self.is_new_work_plane(p, section));
        self.recovering = false;
        self.outputs.set_retracted(false);

        let mut force_tool_call = false;
        if insert_tool_call || new_work_offset || new_work_plane {
            if insert_tool_call {
                self.on_command(&Command::StopSpindle)?;
            }
            self.write_retract(&['Z'])?;
            force_tool_call = true;
        }

        self.out.write_line("");
        if let Some(comment) = &section.comment {
            self.out.write_comment(comment);
        }

        if insert_tool_call || force_tool_call {
            if insert_tool_call {
                self.workplane.force();
                self.set_coolant(CoolantMode::Off)?;
                self.on_command(&Command::StopSpindle)?;
                if !first && self.config.optional_stop {
                    self.on_command(&Command::OptionalStop)?;
                }
                if tool.number > self.config.number_of_tool_slots {
                    self.warn(Warning::ToolNumberExceedsSlots {
                        number: tool.number,
                        slots: self.config.number_of_tool_slots,
                    });
                }
            }
            self.out
                .write_tool_block(&[word(format!("T{}", NumberFormat::integer().format(tool.number as f64)))]);
            if let Some(comment) = &tool.comment {
                self.out.write_comment(comment);
            }
        }

        let rpm = NumberFormat::integer();
        let speed_changed = match self.outputs.spindle.current() {
            Some(current) => rpm.are_different(section.spindle_speed, current),
            None => true,
        };
        let spindle_changed = !tool.is_probe()
            && (insert_tool_call
                || self.force_spindle_speed
                || first
                || speed_changed
                || previous.map_or(false, |p| p.tool.clockwise != tool.clockwise));
        if force_tool_call || spindle_changed {
            self.force_spindle_speed = false;
            if section.spindle_speed < 1.0 {
                return Err(PostError::SpindleSpeedTooLow {
                    rpm: section.spindle_speed,
                });
            }
            if section.spindle_speed > 99999.0 {
                self.warn(Warning::SpindleSpeedHigh {
                    rpm: section.spindle_speed,
                });
            }
            let s = self.outputs.spindle.format(section.spindle_speed);
            let direction = NumberFormat::m().format(if tool.clockwise { 3.0 } else { 4.0 });
            self.out.write_block(&[s, word(direction)]);
        }

        if self.outputs.is_retracted() {
            self.current_work_offset = None;
        }
        if self.current_work_offset != Some(section.work_offset) {
            self.out.write_block(&work_offset_words(section.work_offset));
            self.current_work_offset = Some(section.work_offset);
        }

        self.outputs.force_xyz();

        let abc = if self.kinematics.is_multi_axis() {
            if section.multi_axis {
                self.workplane.force();
                self.workplane.cancel_transformation();
                section.initial_tool_axis_abc()
            } else {
                self.workplane
                    .machine_abc(self.kinematics.as_ref(), &section.work_plane)?
            }
        } else {
            if !is_same_direction(section.work_plane.forward, Vec3::unit_z()) {
                return Err(PostError::ToolOrientationNotSupported);
            }
            self.workplane.set_frame(section.work_plane);
            Vec3::new(0.0, 0.0, 0.0)
        };

        // coolant goes on once the section is set up
        self.set_coolant(tool.coolant)?;

        let displacement = self.pivot_displacement(section.initial_tool_axis);
        self.outputs
            .set_offsets(displacement.x, displacement.y, displacement.z);
        self.outputs.force_any();

        let initial = self.workplane.frame_position(section.initial_position);
        let retracted = self.outputs.is_retracted();
        if !retracted && !insert_tool_call && self.position.z < initial.z {
            let motion = self.modals.motion(0.0);
            let z = self.outputs.z(initial.z);
            self.out.write_block(&[motion, z]);
        }

        let abc_words = if self.workplane.needs_move(abc) {
            self.workplane.commit(abc);
            Some(self.abc_words(abc))
        } else {
            None
        };
        let rotary_move = self.kinematics.is_multi_axis() && abc_words.is_some();

        if insert_tool_call || retracted {
            self.modals.reset(ModalGroupId::Motion);
            if rotary_move {
                self.on_command(&Command::UnlockMultiAxis)?;
                let mut words = vec![self.modals.abs_inc(90.0), self.modals.motion(0.0)];
                words.extend(abc_words.unwrap_or_default());
                self.out.write_block(&words);
                self.on_command(&Command::LockMultiAxis)?;
            }
            let plane = self.modals.plane(17.0);
            self.out.write_block(&[plane]);

            if self.kinematics.is_head_configuration() {
                let words = [
                    self.modals.abs_inc(90.0),
                    self.modals.motion(0.0),
                    self.outputs.x.format(initial.x),
                    self.outputs.y.format(initial.y),
                    self.outputs.z(initial.z),
                ];
                self.out.write_block(&words);
            } else {
                let words = [
                    self.modals.abs_inc(90.0),
                    self.modals.motion(0.0),
                    self.outputs.x.format(initial.x),
                    self.outputs.y.format(initial.y),
                ];
                self.out.write_block(&words);
                let words = [self.modals.motion(0.0), self.outputs.z(initial.z)];
                self.out.write_block(&words);
            }
        } else {
            if rotary_move {
                self.on_command(&Command::UnlockMultiAxis)?;
            }
            let mut words = vec![
                self.modals.abs_inc(90.0),
                self.modals.motion(0.0),
                self.outputs.x.format(initial.x),
                self.outputs.y.format(initial.y),
            ];
            if rotary_move {
                words.extend(abc_words.unwrap_or_default());
            }
            self.out.write_block(&words);
            if rotary_move {
                self.on_command(&Command::LockMultiAxis)?;
            }
        }
        self.position = initial;

        // wait for the spindle to reach speed
        self.out.write_block(&[word(NumberFormat::m().format(31.0))]);

        if section.multi_axis {
            self.outputs.clear_offsets();
        }
        Ok(())
    }

    fn on_section_end(&mut self, program: &Program, index: usize) -> Result<()> {
        let section = &program.sections[index];
        let plane = self.modals.plane(17.0);
        self.out.write_block(&[plane]);
        if self.kinematics.is_multi_axis() && self.kinematics.has_cyclic_c() {
            // unwind C
            self.out
                .write_block(&[word(format!("{}C", NumberFormat::g().format(25.0)))]);
        }
        self.outputs.clear_offsets();

        if let Some(next) = program.sections.get(index + 1) {
            if next.tool.coolant != section.tool.coolant {
                self.set_coolant(CoolantMode::Off)?;
            }
        }
        if section.multi_axis && section.optimized {
            self.workplane.set_machine_abc(section.final_tool_axis_abc());
        }
        self.outputs.force_any();
        Ok(())
    }

    fn on_event(&mut self, section: &Section, event: &Event, next: Option<&Event>) -> Result<()> {
        let next_is_motion = next.map_or(false, Event::is_motion);
        match event {
            Event::Rapid(target) => {
                let target = self.workplane.frame_position(*target);
                self.on_rapid(target)
            }
            Event::Linear { target, feed } => {
                let target = self.workplane.frame_position(*target);
                self.on_linear(target, *feed, next_is_motion)
            }
            Event::Rapid5D { target, abc } => {
                let target = self.workplane.frame_position(*target);
                self.on_rapid_5d(section, target, *abc)
            }
            Event::Linear5D { target, abc, feed } => {
                let target = self.workplane.frame_position(*target);
                self.on_linear_5d(section, target, *abc, *feed, next_is_motion)
            }
            Event::Circular(arc) => self.on_circular(arc),
            Event::Dwell(seconds) => {
                self.on_dwell(*seconds);
                Ok(())
            }
            Event::SpindleSpeed(rpm) => {
                let s = self.outputs.spindle.format(*rpm);
                self.out.write_block(&[s]);
                Ok(())
            }
            Event::RadiusCompensation(mode) => {
                self.pending_compensation = Some(*mode);
                Ok(())
            }
            Event::Command(command) => self.on_command(command),
            Event::Comment(text) => {
                self.out.write_comment(text);
                Ok(())
            }
            Event::CycleBegin(cycle) => {
                self.on_cycle(cycle);
                Ok(())
            }
            Event::CyclePoint(point) => self.on_cycle_point(section, *point),
            Event::CycleEnd => {
                self.on_cycle_end();
                Ok(())
            }
        }
    }

    fn on_command(&mut self, command: &Command) -> Result<()> {
        let m = NumberFormat::m();
        match command {
            Command::Stop | Command::OptionalStop => {
                let code = if *command == Command::Stop { 0.0 } else { 1.0 };
                self.out.write_block(&[word(m.format(code))]);
                self.force_spindle_speed = true;
                self.coolant.force();
            }
            Command::SpindleClockwise => self.out.write_block(&[word(m.format(3.0))]),
            Command::SpindleCounterClockwise => self.out.write_block(&[word(m.format(4.0))]),
            Command::StopSpindle => self.out.write_block(&[word(m.format(5.0))]),
            Command::StartSpindle => {
                let clockwise = self.tool.as_ref().map_or(true, |t| t.clockwise);
                let direction = if clockwise {
                    Command::SpindleClockwise
                } else {
                    Command::SpindleCounterClockwise
                };
                return self.on_command(&direction);
            }
            // coolant is driven by the tool, the rest has no code on this control
            Command::CoolantOn
            | Command::CoolantOff
            | Command::LockMultiAxis
            | Command::UnlockMultiAxis
            | Command::BreakControl
            | Command::ToolMeasure => {}
            Command::Other(name) => self.warn(Warning::UnsupportedCommand {
                command: name.clone(),
            }),
        }
        Ok(())
    }

    fn set_coolant(&mut self, mode: CoolantMode) -> Result<()> {
        let is_probe = self.tool.as_ref().map_or(false, Tool::is_probe);
        let output = self
            .coolant
            .resolve(mode, is_probe, self.config.coolants.as_deref())?;
        match output {
            CoolantOutput::Suppressed => {}
            CoolantOutput::Codes(codes) => {
                if self.config.single_line_coolant {
                    let line = codes.join(self.out.separator);
                    self.out.write_block(&[word(line)]);
                } else {
                    for code in codes {
                        self.out.write_block(&[word(code)]);
                    }
                }
            }
            CoolantOutput::Unsupported { warning, substitute } => {
                self.warnings.push(warning);
                self.out.write_block(&[word(substitute)]);
            }
        }
        Ok(())
    }

    fn on_dwell(&mut self, seconds: f64) {
        let clamped = seconds.clamp(0.1, 999.9);
        if clamped != seconds {
            self.warn(Warning::DwellOutOfRange { seconds, clamped });
        }
        self.out.write_block(&[
            word(NumberFormat::g().format(4.0)),
            word(format!("F{}", NumberFormat::seconds().format(clamped))),
        ]);
    }

    /// Move the given axes to their safe positions
    fn write_retract(&mut self, axes: &[char]) -> Result<()> {
        if axes.is_empty() {
            return Err(PostError::NoRetractAxis);
        }
        let xyz = NumberFormat::xyz(self.unit);
        let mut words = Vec::new();
        let mut retract_z = false;
        for axis in axes {
            if axes.iter().filter(|a| *a == axis).count() > 1 {
                return Err(PostError::DuplicateRetractAxis { axis: *axis });
            }
            match axis {
                'X' => words.push(word(format!(
                    "X{}",
                    xyz.format(self.kinematics.home_position_x().unwrap_or(0.0))
                ))),
                'Y' => words.push(word(format!(
                    "Y{}",
                    xyz.format(self.kinematics.home_position_y().unwrap_or(0.0))
                ))),
                'Z' => {
                    words.push(word(format!("Z{}", xyz.format(self.kinematics.retract_plane()))));
                    retract_z = true;
                }
                other => return Err(PostError::BadRetractAxis { axis: *other }),
            }
        }

        self.modals.reset(ModalGroupId::Motion);
        let mut block = vec![self.modals.abs_inc(90.0), self.modals.motion(0.0)];
        block.extend(words);
        self.out.write_block(&block);
        if retract_z {
            self.outputs.set_retracted(true);
            self.workplane.force();
        }
        self.outputs.reset_z();
        Ok(())
    }

    fn abc_words(&self, abc: Vec3) -> Vec<Word> {
        let format = NumberFormat::abc();
        ["A", "B", "C"]
            .iter()
            .zip([abc.x, abc.y, abc.z])
            .enumerate()
            .filter(|(coordinate, _)| self.kinematics.is_machine_coordinate(*coordinate))
            .map(|(_, (letter, value))| word(format!("{}{}", letter, format.format(value))))
            .collect()
    }

    /// Tool tip to pivot displacement for a tool axis
    fn pivot_displacement(&self, tool_axis: Vec3) -> Vec3 {
        tool_axis * self.head_offset - Vec3::new(0.0, 0.0, self.head_offset)
    }
}

/// G54 for offsets 0 and 1, G55-G59 for 2-6, extended offsets beyond
pub fn work_offset_words(offset: u32) -> Vec<Word> {
    let g = NumberFormat::g();
    match offset {
        0 | 1 => vec![word(g.format(54.0))],
        2..=6 => vec![word(g.format(53.0 + offset as f64))],
        n => vec![word(g.format(54.1)), word(format!("P{}", n - 6))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MachineKind;
    use crate::model::{Tool, ToolType};
    use pretty_assertions::assert_eq;

    pub(super) fn tool(number: u32) -> Tool {
        Tool {
            diameter: 6.35,
            ..Tool::new(number)
        }
    }

    pub(super) fn section(tool: Tool, events: Vec<Event>) -> Section {
        Section {
            spindle_speed: 18000.0,
            events,
            ..Section::new(tool)
        }
    }

    pub(super) fn program(sections: Vec<Section>) -> Program {
        let mut program = Program::new(Unit::Mm);
        let mut tools: Vec<Tool> = Vec::new();
        for section in &sections {
            if !tools.iter().any(|t| t.number == section.tool.number) {
                tools.push(section.tool.clone());
            }
        }
        program.tools = tools;
        program.sections = sections;
        program
    }

    pub(super) fn run(program: &Program, config: &PostConfig) -> Translation {
        translate(program, config, ErrorPolicy::Halt).unwrap()
    }

    /// Lines between the spindle-ready code and the footer
    pub(super) fn body(translation: &Translation) -> Vec<String> {
        let lines = &translation.output.lines;
        let start = lines.iter().position(|l| l == "M31").map_or(0, |i| i + 1);
        let end = lines.iter().rposition(|l| l == "G990").unwrap_or(lines.len());
        lines[start..end].to_vec()
    }

    #[test]
    fn test_single_linear_move_end_to_end() {
        let mut section = section(
            tool(1),
            vec![Event::Linear {
                target: Vec3::new(10.0, 0.0, -5.0),
                feed: 500.0,
            }],
        );
        section.z_range = Some((-5.0, 0.0));
        let mut program = program(vec![section]);
        program.name = Some("1001".to_string());

        let translation = run(&program, &PostConfig::default());
        let expected = [
            "(1001)",
            "(Machine)",
            "(  vendor: Thermwood)",
            "(  description: Generic 3-axis router)",
            "(T1  D=6.350 CR=0.000 - ZMIN=-5.000 - flat end mill)",
            "",
            "G90 G94 G40",
            "G990",
            "M48",
            "G96",
            "G17",
            "G71",
            "G805 (Acceleration Macro)",
            "G9 F1 (Tangency Factor)",
            "SET XSHIFT=2.00",
            "SET YSHIFT=6.00",
            "SET ZSHIFT=0.00",
            "G901",
            "M5",
            "G0 Z0.000",
            "",
            "M5",
            "T1",
            "S18000 M3",
            "G54",
            "G0 X0.000 Y0.000",
            "Z0.000",
            "M31",
            "G1 X10.000 Z-5.000 F500.0",
            "",
            "M5",
            "G990",
            "G90 G0 Z0",
            "X0. Y0.",
            "M98PENDTIME.SUBL1",
            "M2",
        ];
        assert_eq!(translation.output.lines, expected);
        assert!(translation.warnings.is_empty());

        let y_words = translation
            .output
            .lines
            .iter()
            .filter(|l| l.contains("Y0.000"))
            .count();
        assert_eq!(y_words, 1);
    }

    #[test]
    fn test_header_options() {
        let config = PostConfig {
            write_machine: false,
            write_tools: false,
            acceleration: 9,
            tangency: 40,
            ..PostConfig::default()
        };
        let mut program = program(vec![]);
        program.unit = Unit::Inch;
        let translation = run(&program, &config);
        let lines = &translation.output.lines;
        assert_eq!(lines[0], "G90 G94 G40");
        assert!(lines.contains(&"G70".to_string()));
        assert!(lines.contains(&"G809 (Acceleration Macro)".to_string()));
        assert!(lines.contains(&"G9 F40 (Tangency Factor)".to_string()));
    }

    #[test]
    fn test_out_of_range_tangency_is_fatal() {
        let config = PostConfig {
            tangency: 0,
            ..PostConfig::default()
        };
        let err = translate(&program(vec![]), &config, ErrorPolicy::Halt).unwrap_err();
        assert!(matches!(err, PostError::Config(_)));
    }

    #[test]
    fn test_sequence_numbers_in_output() {
        let config = PostConfig {
            sequence_numbers: crate::block::SequenceMode::On,
            sequence_number_start: 10,
            sequence_number_increment: 5,
            write_machine: false,
            write_tools: false,
            ..PostConfig::default()
        };
        let translation = run(&program(vec![]), &config);
        let lines = &translation.output.lines;
        assert_eq!(lines[0], "N10 G90 G94 G40");
        assert_eq!(lines[1], "N15 G990");
        assert_eq!(lines[2], "N20 M48");
    }

    #[test]
    fn test_tool_change_between_sections() {
        let first = section(
            tool(1),
            vec![Event::Linear {
                target: Vec3::new(5.0, 5.0, -1.0),
                feed: 800.0,
            }],
        );
        let mut second_tool = tool(2);
        second_tool.coolant = CoolantMode::Flood;
        second_tool.clockwise = false;
        second_tool.comment = Some("6mm compression".to_string());
        let mut second = section(
            second_tool,
            vec![Event::Linear {
                target: Vec3::new(1.0, 1.0, -2.0),
                feed: 800.0,
            }],
        );
        second.initial_position = Vec3::new(1.0, 1.0, 5.0);
        second.comment = Some("Pocket (rough)".to_string());

        let translation = run(&program(vec![first, second]), &PostConfig::default());
        let lines = &translation.output.lines;
        let t2 = lines.iter().position(|l| l == "T2").unwrap();
        assert_eq!(
            lines[t2 - 6..t2 + 8].to_vec(),
            vec![
                "M5",
                "G0 Z0.000",
                "",
                "(Pocket rough)",
                "M5",
                "M1",
                "T2",
                "(6mm compression)",
                "S18000 M4",
                "G54",
                "M8",
                "G0 X1.000 Y1.000",
                "Z5.000",
                "M31",
            ]
        );
    }

    #[test]
    fn test_same_tool_same_setup_skips_tool_call() {
        let first = section(tool(1), vec![Event::Rapid(Vec3::new(0.0, 0.0, 2.0))]);
        let mut second = section(tool(1), vec![Event::Rapid(Vec3::new(3.0, 0.0, 8.0))]);
        second.initial_position = Vec3::new(3.0, 0.0, 8.0);
        let translation = run(&program(vec![first, second]), &PostConfig::default());
        let lines = &translation.output.lines;
        assert_eq!(lines.iter().filter(|l| l.starts_with('T')).count(), 1);
        // continuing motion: lift to the new initial Z, then move across
        let m31 = lines.iter().rposition(|l| l == "M31").unwrap();
        assert_eq!(lines[m31 - 2], "Z8.000");
        assert_eq!(lines[m31 - 1], "X3.000 Y0.000");
    }

    #[test]
    fn test_work_offset_words() {
        let text = |offset| {
            work_offset_words(offset)
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
        };
        assert_eq!(text(0), "G54");
        assert_eq!(text(1), "G54");
        assert_eq!(text(2), "G55");
        assert_eq!(text(6), "G59");
        assert_eq!(text(7), "G54.1 P1");
    }

    #[test]
    fn test_work_offset_change_retracts() {
        let mut first = section(tool(1), vec![]);
        first.work_offset = 1;
        let mut second = section(tool(1), vec![]);
        second.work_offset = 2;
        let translation = run(&program(vec![first, second]), &PostConfig::default());
        let lines = &translation.output.lines;
        let g55 = lines.iter().position(|l| l == "G55").unwrap();
        assert!(lines[..g55].iter().rev().any(|l| l == "G0 Z0.000"));
        // a forced tool call re-issues the tool and speed
        assert_eq!(lines[g55 - 2], "T1");
        assert_eq!(lines[g55 - 1], "S18000 M3");
    }

    #[test]
    fn test_ambiguous_work_offsets_rejected_before_output() {
        let mut first = section(tool(1), vec![]);
        first.work_offset = 0;
        let mut second = section(tool(1), vec![]);
        second.work_offset = 3;
        let err = translate(&program(vec![first, second]), &PostConfig::default(), ErrorPolicy::Halt)
            .unwrap_err();
        assert_eq!(err, PostError::MultipleWorkOffsets);
    }

    #[test]
    fn test_spindle_speed_limits() {
        let mut slow = section(tool(1), vec![]);
        slow.spindle_speed = 0.5;
        let err = translate(&program(vec![slow]), &PostConfig::default(), ErrorPolicy::Halt)
            .unwrap_err();
        assert_eq!(err, PostError::SpindleSpeedTooLow { rpm: 0.5 });

        let mut fast = section(tool(1), vec![]);
        fast.spindle_speed = 120000.0;
        let translation = run(&program(vec![fast]), &PostConfig::default());
        assert_eq!(
            translation.warnings,
            vec![Warning::SpindleSpeedHigh { rpm: 120000.0 }]
        );
        assert!(translation.output.lines.contains(&"S120000 M3".to_string()));
    }

    #[test]
    fn test_tool_number_beyond_slots_warns() {
        let config = PostConfig {
            number_of_tool_slots: 24,
            ..PostConfig::default()
        };
        let translation = run(&program(vec![section(tool(30), vec![])]), &config);
        assert_eq!(
            translation.warnings,
            vec![Warning::ToolNumberExceedsSlots { number: 30, slots: 24 }]
        );
        assert!(translation.output.lines.contains(&"T30".to_string()));
    }

    #[test]
    fn test_probe_never_changes_spindle() {
        let mut probe = tool(5);
        probe.tool_type = ToolType::Probe;
        probe.coolant = CoolantMode::Flood;
        let translation = run(&program(vec![section(probe, vec![])]), &PostConfig::default());
        let lines = &translation.output.lines;
        // the forced tool call still writes the speed, but no coolant
        assert!(!lines.contains(&"M8".to_string()));
    }

    #[test]
    fn test_tilted_plane_on_three_axis_is_fatal() {
        let mut tilted = section(tool(1), vec![]);
        tilted.work_plane.forward = Vec3::unit_x();
        let err = translate(&program(vec![tilted]), &PostConfig::default(), ErrorPolicy::Halt)
            .unwrap_err();
        assert_eq!(err, PostError::ToolOrientationNotSupported);
    }

    #[test]
    fn test_skip_section_policy_continues() {
        let mut tilted = section(tool(1), vec![]);
        tilted.work_plane.forward = Vec3::unit_x();
        let good = section(
            tool(2),
            vec![Event::Linear {
                target: Vec3::new(1.0, 2.0, -1.0),
                feed: 300.0,
            }],
        );
        let translation = translate(
            &program(vec![tilted, good]),
            &PostConfig::default(),
            ErrorPolicy::SkipSection,
        )
        .unwrap();
        assert_eq!(
            translation.skipped,
            vec![SkippedSection {
                index: 0,
                error: PostError::ToolOrientationNotSupported
            }]
        );
        let lines = &translation.output.lines;
        assert!(lines.contains(&"T2".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("M2"));
    }

    #[test]
    fn test_commands() {
        let events = vec![
            Event::Command(Command::Stop),
            Event::Command(Command::CoolantOn),
            Event::Command(Command::StartSpindle),
            Event::Command(Command::Other("power-off".to_string())),
        ];
        let translation = run(&program(vec![section(tool(1), events)]), &PostConfig::default());
        assert_eq!(body(&translation)[..2].to_vec(), vec!["M0", "M3"]);
        assert_eq!(
            translation.warnings,
            vec![Warning::UnsupportedCommand {
                command: "power-off".to_string()
            }]
        );
    }

    #[test]
    fn test_dwell_is_clamped() {
        let events = vec![Event::Dwell(0.05), Event::Dwell(2.0), Event::Dwell(1500.0)];
        let translation = run(&program(vec![section(tool(1), events)]), &PostConfig::default());
        assert_eq!(
            body(&translation)[..3].to_vec(),
            vec!["G4 F0.1", "G4 F2.0", "G4 F999.9"]
        );
        assert_eq!(translation.warnings.len(), 2);
    }

    #[test]
    fn test_retract_axis_errors() {
        let mut translator = Translator::new(PostConfig::default(), Unit::Mm, ErrorPolicy::Halt);
        assert_eq!(translator.write_retract(&[]), Err(PostError::NoRetractAxis));
        assert_eq!(
            translator.write_retract(&['Z', 'Z']),
            Err(PostError::DuplicateRetractAxis { axis: 'Z' })
        );
        assert_eq!(
            translator.write_retract(&['B']),
            Err(PostError::BadRetractAxis { axis: 'B' })
        );
        assert!(translator.out.lines.is_empty());

        translator.write_retract(&['X', 'Y']).unwrap();
        assert_eq!(translator.out.lines, vec!["G90 G0 X0.000 Y0.000"]);
        assert!(!translator.outputs.is_retracted());
    }

    #[test]
    fn test_unsupported_coolant_writes_off_code() {
        let mut air = tool(1);
        air.coolant = CoolantMode::Air;
        let translation = run(&program(vec![section(air, vec![])]), &PostConfig::default());
        assert_eq!(
            translation.warnings,
            vec![Warning::UnsupportedCoolant {
                mode: "air".to_string()
            }]
        );
        let lines = &translation.output.lines;
        let g54 = lines.iter().position(|l| l == "G54").unwrap();
        assert_eq!(lines[g54 + 1], "M9");
    }

    #[test]
    fn test_missing_coolant_table_is_fatal() {
        let config = PostConfig {
            coolants: None,
            ..PostConfig::default()
        };
        let err = translate(&program(vec![section(tool(1), vec![])]), &config, ErrorPolicy::SkipSection)
            .unwrap_err();
        assert_eq!(err, PostError::MissingCoolantTable);
    }

    #[test]
    fn test_version_stamp() {
        let config = PostConfig {
            write_version: true,
            ..PostConfig::default()
        };
        let translation = run(&program(vec![]), &config);
        let stamp = format!("(post version: {})", env!("CARGO_PKG_VERSION"));
        assert_eq!(translation.output.lines[0], stamp);

        let plain = run(&program(vec![]), &PostConfig::default());
        assert!(!plain.output.lines.iter().any(|l| l.starts_with("(post version")));
    }

    fn flood_mist_lines(single_line_coolant: bool) -> Vec<String> {
        let mut table = crate::coolant::default_table();
        for entry in table.iter_mut() {
            if entry.mode == CoolantMode::FloodMist {
                entry.on = Some(crate::coolant::CoolantCodes::Multiple(vec![8, 7]));
            }
        }
        let config = PostConfig {
            coolants: Some(table),
            single_line_coolant,
            ..PostConfig::default()
        };
        let mut both = tool(1);
        both.coolant = CoolantMode::FloodMist;
        let translation = run(&program(vec![section(both, vec![])]), &config);
        let lines = translation.output.lines;
        let g54 = lines.iter().position(|l| l == "G54").unwrap();
        lines[g54 + 1..g54 + 3].to_vec()
    }

    #[test]
    fn test_coolant_codes_on_one_line() {
        assert_eq!(flood_mist_lines(true)[0], "M8 M7");
        assert_eq!(flood_mist_lines(false), vec!["M8", "M7"]);
    }

    fn rotary_blocks(closest_abc: bool) -> Vec<String> {
        let mut config = PostConfig::default();
        config.machine.kind = MachineKind::HeadBc;
        config.machine.closest_abc = closest_abc;

        let parked = Vec3::new(0.0, std::f64::consts::FRAC_PI_4, std::f64::consts::PI);
        let mut simultaneous = section(tool(1), vec![]);
        simultaneous.multi_axis = true;
        simultaneous.optimized = true;
        simultaneous.initial_abc = Some(parked);
        simultaneous.final_abc = Some(parked);

        let mut tilted = section(tool(1), vec![]);
        tilted.work_plane.forward = Vec3::new(1.0, 0.0, 1.0).normalize();

        let translation = run(&program(vec![simultaneous, tilted]), &config);
        translation
            .output
            .lines
            .into_iter()
            .filter(|l| l.starts_with("G0 B"))
            .collect()
    }

    #[test]
    fn test_closest_angles_continue_from_previous_section() {
        assert_eq!(
            rotary_blocks(true),
            vec!["G0 B45.000 C180.000", "G0 B45.000 C180.000"]
        );
        assert_eq!(
            rotary_blocks(false),
            vec!["G0 B45.000 C180.000", "G0 B-45.000 C0.000"]
        );
    }

    /// Head B/C geometry mounted as a table
    struct TableBc(kinematics::HeadBcMachine);

    impl Kinematics for TableBc {
        fn is_machine_coordinate(&self, coordinate: usize) -> bool {
            self.0.is_machine_coordinate(coordinate)
        }

        fn is_head_configuration(&self) -> bool {
            false
        }

        fn abc_for_direction(&self, direction: Vec3) -> Vec3 {
            self.0.abc_for_direction(direction)
        }

        fn preferred_abc(&self, abc: Vec3) -> Vec3 {
            self.0.preferred_abc(abc)
        }

        fn remap_to_abc(&self, abc: Vec3, current: Vec3) -> Vec3 {
            self.0.remap_to_abc(abc, current)
        }

        fn remap_abc(&self, abc: Vec3) -> std::result::Result<Vec3, kinematics::AngleRangeError> {
            self.0.remap_abc(abc)
        }

        fn direction(&self, abc: Vec3) -> Vec3 {
            self.0.direction(abc)
        }

        fn is_abc_supported(&self, abc: Vec3) -> bool {
            self.0.is_abc_supported(abc)
        }

        fn retract_plane(&self) -> f64 {
            self.0.retract_plane()
        }

        fn home_position_x(&self) -> Option<f64> {
            self.0.home_position_x()
        }

        fn home_position_y(&self) -> Option<f64> {
            self.0.home_position_y()
        }
    }

    #[test]
    fn test_table_machine_rotates_before_positioning() {
        let mut config = PostConfig::default();
        config.machine.kind = MachineKind::HeadBc;
        let table = TableBc(kinematics::HeadBcMachine::new(&config.machine));

        let mut tilted = section(tool(1), vec![]);
        tilted.work_plane.forward = Vec3::new(1.0, 0.0, 1.0).normalize();

        let mut translator = Translator::with_kinematics(config, Unit::Mm, ErrorPolicy::Halt, Box::new(table));
        translator.run(&program(vec![tilted])).unwrap();
        let lines = translator.finish().output.lines;
        let m31 = lines.iter().position(|l| l == "M31").unwrap();
        assert_eq!(
            lines[m31 - 3..m31].to_vec(),
            vec!["G0 B-45.000 C0.000", "X0.000 Y0.000", "Z0.000"]
        );
    }

    #[test]
    fn test_head_machine_positions_in_one_block() {
        let mut config = PostConfig::default();
        config.machine.kind = MachineKind::HeadBc;
        config.machine.c_cyclic = true;
        let translation = run(&program(vec![section(tool(1), vec![])]), &config);
        let lines = &translation.output.lines;
        let m31 = lines.iter().position(|l| l == "M31").unwrap();
        assert_eq!(lines[m31 - 2], "G0 B0.000 C0.000");
        assert_eq!(lines[m31 - 1], "X0.000 Y0.000 Z0.000");
        assert!(lines.contains(&"G25C".to_string()));
    }
}
