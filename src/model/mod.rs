//! Cutter-location program model
//! What the planner hands the post: tools, sections and the ordered events
//! inside each section. Read-only to the translator.

use cgmath::{InnerSpace, Vector3};
use serde::{Deserialize, Serialize};

use crate::format::Unit;

pub type Vec3 = Vector3<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub unit: Unit,
    pub tools: Vec<Tool>,
    pub sections: Vec<Section>,
}

impl Program {
    pub fn new(unit: Unit) -> Self {
        Self {
            name: None,
            comment: None,
            unit,
            tools: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Lowest Z reached by each tool across all sections, in tool order
    pub fn tool_z_min(&self, number: u32) -> Option<f64> {
        self.sections
            .iter()
            .filter(|s| s.tool.number == number)
            .filter_map(|s| s.z_range.map(|(min, _)| min))
            .reduce(f64::min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoolantMode {
    Off,
    Flood,
    Mist,
    ThroughTool,
    Air,
    AirThroughTool,
    Suction,
    FloodMist,
    FloodThroughTool,
}

impl CoolantMode {
    pub const ALL: [CoolantMode; 9] = [
        CoolantMode::Off,
        CoolantMode::Flood,
        CoolantMode::Mist,
        CoolantMode::ThroughTool,
        CoolantMode::Air,
        CoolantMode::AirThroughTool,
        CoolantMode::Suction,
        CoolantMode::FloodMist,
        CoolantMode::FloodThroughTool,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CoolantMode::Off => "off",
            CoolantMode::Flood => "flood",
            CoolantMode::Mist => "mist",
            CoolantMode::ThroughTool => "through-tool",
            CoolantMode::Air => "air",
            CoolantMode::AirThroughTool => "air-through-tool",
            CoolantMode::Suction => "suction",
            CoolantMode::FloodMist => "flood-mist",
            CoolantMode::FloodThroughTool => "flood-through-tool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolType {
    FlatEndMill,
    BallEndMill,
    BullNoseEndMill,
    ChamferMill,
    FaceMill,
    SlotMill,
    Drill,
    SpotDrill,
    CenterDrill,
    CounterBore,
    CounterSink,
    Reamer,
    BoringBar,
    TapRightHand,
    TapLeftHand,
    Probe,
}

impl ToolType {
    pub const ALL: [ToolType; 16] = [
        ToolType::FlatEndMill,
        ToolType::BallEndMill,
        ToolType::BullNoseEndMill,
        ToolType::ChamferMill,
        ToolType::FaceMill,
        ToolType::SlotMill,
        ToolType::Drill,
        ToolType::SpotDrill,
        ToolType::CenterDrill,
        ToolType::CounterBore,
        ToolType::CounterSink,
        ToolType::Reamer,
        ToolType::BoringBar,
        ToolType::TapRightHand,
        ToolType::TapLeftHand,
        ToolType::Probe,
    ];

    /// Identifier used in CL files
    pub fn id(self) -> &'static str {
        match self {
            ToolType::FlatEndMill => "flat-end-mill",
            ToolType::BallEndMill => "ball-end-mill",
            ToolType::BullNoseEndMill => "bull-nose-end-mill",
            ToolType::ChamferMill => "chamfer-mill",
            ToolType::FaceMill => "face-mill",
            ToolType::SlotMill => "slot-mill",
            ToolType::Drill => "drill",
            ToolType::SpotDrill => "spot-drill",
            ToolType::CenterDrill => "center-drill",
            ToolType::CounterBore => "counter-bore",
            ToolType::CounterSink => "counter-sink",
            ToolType::Reamer => "reamer",
            ToolType::BoringBar => "boring-bar",
            ToolType::TapRightHand => "tap-right-hand",
            ToolType::TapLeftHand => "tap-left-hand",
            ToolType::Probe => "probe",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Human readable name for the tool list
    pub fn display_name(self) -> &'static str {
        match self {
            ToolType::FlatEndMill => "flat end mill",
            ToolType::BallEndMill => "ball end mill",
            ToolType::BullNoseEndMill => "bullnose end mill",
            ToolType::ChamferMill => "chamfer mill",
            ToolType::FaceMill => "face mill",
            ToolType::SlotMill => "slot mill",
            ToolType::Drill => "drill",
            ToolType::SpotDrill => "spot drill",
            ToolType::CenterDrill => "center drill",
            ToolType::CounterBore => "counterbore",
            ToolType::CounterSink => "countersink",
            ToolType::Reamer => "reamer",
            ToolType::BoringBar => "boring bar",
            ToolType::TapRightHand => "right tap",
            ToolType::TapLeftHand => "left tap",
            ToolType::Probe => "probe",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    pub number: u32,
    pub tool_type: ToolType,
    pub diameter: f64,
    pub corner_radius: f64,
    /// Radians
    pub taper_angle: f64,
    pub clockwise: bool,
    pub coolant: CoolantMode,
    pub diameter_offset: u32,
    /// Thread pitch, used for tapping without a programmed feed
    pub pitch: Option<f64>,
    pub comment: Option<String>,
}

impl Tool {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            tool_type: ToolType::FlatEndMill,
            diameter: 0.0,
            corner_radius: 0.0,
            taper_angle: 0.0,
            clockwise: true,
            coolant: CoolantMode::Off,
            diameter_offset: number,
            pitch: None,
            comment: None,
        }
    }

    pub fn is_probe(&self) -> bool {
        self.tool_type == ToolType::Probe
    }

    pub fn tapping_feedrate(&self, spindle_speed: f64) -> f64 {
        self.pitch.unwrap_or(0.0) * spindle_speed
    }
}

/// Section coordinate frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkPlane {
    pub origin: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Default for WorkPlane {
    fn default() -> Self {
        Self::identity()
    }
}

impl WorkPlane {
    pub fn identity() -> Self {
        Self {
            origin: Vec3::new(0.0, 0.0, 0.0),
            right: Vec3::unit_x(),
            up: Vec3::unit_y(),
            forward: Vec3::unit_z(),
        }
    }

    /// Map a position given in this frame to the global frame
    pub fn to_global(&self, local: Vec3) -> Vec3 {
        self.origin + self.to_global_direction(local)
    }

    /// Rotate a direction into the global frame (origin ignored)
    pub fn to_global_direction(&self, local: Vec3) -> Vec3 {
        self.right * local.x + self.up * local.y + self.forward * local.z
    }
}

/// Angular tolerance for direction comparisons (radians)
pub const DIRECTION_TOLERANCE: f64 = 1e-4;

pub fn is_same_direction(a: Vec3, b: Vec3) -> bool {
    let (ma, mb) = (a.magnitude(), b.magnitude());
    if ma == 0.0 || mb == 0.0 {
        return ma == mb;
    }
    let cos = (a.dot(b) / (ma * mb)).clamp(-1.0, 1.0);
    cos.acos() < DIRECTION_TOLERANCE
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub comment: Option<String>,
    pub tool: Tool,
    pub work_offset: u32,
    pub work_plane: WorkPlane,
    pub initial_tool_axis: Vec3,
    pub final_tool_axis: Vec3,
    /// Machine angles (radians) of kinematics-optimized multi-axis sections
    pub initial_abc: Option<Vec3>,
    pub final_abc: Option<Vec3>,
    pub multi_axis: bool,
    pub optimized: bool,
    pub force_tool_change: bool,
    pub spindle_speed: f64,
    pub z_range: Option<(f64, f64)>,
    pub initial_position: Vec3,
    pub events: Vec<Event>,
}

impl Section {
    pub fn new(tool: Tool) -> Self {
        Self {
            comment: None,
            tool,
            work_offset: 0,
            work_plane: WorkPlane::identity(),
            initial_tool_axis: Vec3::unit_z(),
            final_tool_axis: Vec3::unit_z(),
            initial_abc: None,
            final_abc: None,
            multi_axis: false,
            optimized: false,
            force_tool_change: false,
            spindle_speed: 0.0,
            z_range: None,
            initial_position: Vec3::new(0.0, 0.0, 0.0),
            events: Vec::new(),
        }
    }

    /// Tool axis along +Z in the section frame
    pub fn is_z_oriented(&self) -> bool {
        !self.multi_axis && is_same_direction(self.work_plane.forward, Vec3::unit_z())
    }

    /// Initial machine angles for an optimized multi-axis section
    pub fn initial_tool_axis_abc(&self) -> Vec3 {
        self.initial_abc.unwrap_or(Vec3::new(0.0, 0.0, 0.0))
    }

    pub fn final_tool_axis_abc(&self) -> Vec3 {
        self.final_abc.unwrap_or(Vec3::new(0.0, 0.0, 0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiusCompensation {
    Off,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Stop,
    OptionalStop,
    SpindleClockwise,
    SpindleCounterClockwise,
    StopSpindle,
    StartSpindle,
    CoolantOn,
    CoolantOff,
    LockMultiAxis,
    UnlockMultiAxis,
    BreakControl,
    ToolMeasure,
    Other(String),
}

impl Command {
    pub fn from_name(name: &str) -> Self {
        match name {
            "stop" => Command::Stop,
            "optional-stop" => Command::OptionalStop,
            "spindle-cw" => Command::SpindleClockwise,
            "spindle-ccw" => Command::SpindleCounterClockwise,
            "spindle-stop" => Command::StopSpindle,
            "spindle-start" => Command::StartSpindle,
            "coolant-on" => Command::CoolantOn,
            "coolant-off" => Command::CoolantOff,
            "lock" => Command::LockMultiAxis,
            "unlock" => Command::UnlockMultiAxis,
            "break-control" => Command::BreakControl,
            "tool-measure" => Command::ToolMeasure,
            other => Command::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub clockwise: bool,
    pub center: Vec3,
    pub end: Vec3,
    /// Normal of the arc plane
    pub normal: Vec3,
    /// Radians; derived from the geometry when absent
    pub sweep: Option<f64>,
    pub feed: f64,
}

/// Canned cycle kinds and the operands each one needs
#[derive(Debug, Clone, PartialEq)]
pub enum CycleKind {
    Drilling,
    CounterBoring { dwell: f64 },
    ChipBreaking { incremental_depth: f64, chip_break_distance: f64, dwell: f64 },
    DeepDrilling { incremental_depth: f64, dwell: f64 },
    Tapping,
    LeftTapping,
    RightTapping,
    FineBoring { shift: f64, dwell: f64 },
    BackBoring { shift: f64, back_bore_distance: f64, dwell: f64 },
    Reaming { dwell: f64 },
    StopBoring { dwell: f64 },
    Boring { dwell: f64 },
}

impl CycleKind {
    pub fn name(&self) -> &'static str {
        match self {
            CycleKind::Drilling => "drilling",
            CycleKind::CounterBoring { .. } => "counter-boring",
            CycleKind::ChipBreaking { .. } => "chip-breaking",
            CycleKind::DeepDrilling { .. } => "deep-drilling",
            CycleKind::Tapping => "tapping",
            CycleKind::LeftTapping => "left-tapping",
            CycleKind::RightTapping => "right-tapping",
            CycleKind::FineBoring { .. } => "fine-boring",
            CycleKind::BackBoring { .. } => "back-boring",
            CycleKind::Reaming { .. } => "reaming",
            CycleKind::StopBoring { .. } => "stop-boring",
            CycleKind::Boring { .. } => "boring",
        }
    }

    pub fn dwell(&self) -> f64 {
        match self {
            CycleKind::CounterBoring { dwell }
            | CycleKind::ChipBreaking { dwell, .. }
            | CycleKind::DeepDrilling { dwell, .. }
            | CycleKind::FineBoring { dwell, .. }
            | CycleKind::BackBoring { dwell, .. }
            | CycleKind::Reaming { dwell }
            | CycleKind::StopBoring { dwell }
            | CycleKind::Boring { dwell } => *dwell,
            CycleKind::Drilling
            | CycleKind::Tapping
            | CycleKind::LeftTapping
            | CycleKind::RightTapping => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub kind: CycleKind,
    pub clearance: f64,
    pub retract: f64,
    pub stock: f64,
    pub feedrate: f64,
    pub retract_feedrate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Rapid(Vec3),
    Linear { target: Vec3, feed: f64 },
    /// Position plus machine angles (radians)
    Rapid5D { target: Vec3, abc: Vec3 },
    Linear5D { target: Vec3, abc: Vec3, feed: f64 },
    Circular(Arc),
    Dwell(f64),
    SpindleSpeed(f64),
    RadiusCompensation(RadiusCompensation),
    Command(Command),
    Comment(String),
    CycleBegin(Cycle),
    CyclePoint(Vec3),
    CycleEnd,
}

impl Event {
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Event::Rapid(_)
                | Event::Linear { .. }
                | Event::Rapid5D { .. }
                | Event::Linear5D { .. }
                | Event::Circular(_)
                | Event::CyclePoint(_)
        )
    }
}
