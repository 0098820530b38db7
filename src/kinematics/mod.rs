//! Machine kinematics
//!
//! The post only asks the machine questions: which coordinates are real
//! axes, which angles produce a tool direction, and whether those angles fit
//! the travel limits.

use cgmath::{Deg, InnerSpace, Matrix3, Rad};
use std::f64::consts::{PI, TAU};

use crate::config::{MachineConfig, MachineKind};
use crate::model::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct AngleRangeError {
    pub abc: Vec3,
}

pub trait Kinematics {
    /// Coordinate 0, 1, 2 for A, B, C
    fn is_machine_coordinate(&self, coordinate: usize) -> bool;

    fn is_multi_axis(&self) -> bool {
        (0..3).any(|c| self.is_machine_coordinate(c))
    }

    /// Rotary axes carried by the head rather than a table
    fn is_head_configuration(&self) -> bool;

    /// Candidate angles (radians) for a tool direction
    fn abc_for_direction(&self, direction: Vec3) -> Vec3;

    /// Canonical choice among equivalent solutions
    fn preferred_abc(&self, abc: Vec3) -> Vec3;

    /// Equivalent solution closest to `current`
    fn remap_to_abc(&self, abc: Vec3, current: Vec3) -> Vec3;

    /// Fit the angles into the axis ranges
    fn remap_abc(&self, abc: Vec3) -> Result<Vec3, AngleRangeError>;

    /// Tool direction produced by the angles
    fn direction(&self, abc: Vec3) -> Vec3;

    fn is_abc_supported(&self, abc: Vec3) -> bool;

    fn retract_plane(&self) -> f64;

    fn home_position_x(&self) -> Option<f64>;

    fn home_position_y(&self) -> Option<f64>;

    /// C axis without travel limits
    fn has_cyclic_c(&self) -> bool {
        false
    }
}

pub fn from_config(config: &MachineConfig) -> Box<dyn Kinematics> {
    match config.kind {
        MachineKind::ThreeAxis => Box::new(ThreeAxisMachine::new(config)),
        MachineKind::HeadBc => Box::new(HeadBcMachine::new(config)),
    }
}

/// Plain XYZ router
#[derive(Debug, Clone)]
pub struct ThreeAxisMachine {
    retract_plane: f64,
    home_x: Option<f64>,
    home_y: Option<f64>,
}

impl ThreeAxisMachine {
    pub fn new(config: &MachineConfig) -> Self {
        Self {
            retract_plane: config.retract_plane,
            home_x: config.home_x,
            home_y: config.home_y,
        }
    }
}

impl Kinematics for ThreeAxisMachine {
    fn is_machine_coordinate(&self, _coordinate: usize) -> bool {
        false
    }

    fn is_head_configuration(&self) -> bool {
        false
    }

    fn abc_for_direction(&self, _direction: Vec3) -> Vec3 {
        Vec3::new(0.0, 0.0, 0.0)
    }

    fn preferred_abc(&self, abc: Vec3) -> Vec3 {
        abc
    }

    fn remap_to_abc(&self, abc: Vec3, _current: Vec3) -> Vec3 {
        abc
    }

    fn remap_abc(&self, abc: Vec3) -> Result<Vec3, AngleRangeError> {
        Ok(abc)
    }

    fn direction(&self, _abc: Vec3) -> Vec3 {
        Vec3::unit_z()
    }

    fn is_abc_supported(&self, abc: Vec3) -> bool {
        abc == Vec3::new(0.0, 0.0, 0.0)
    }

    fn retract_plane(&self) -> f64 {
        self.retract_plane
    }

    fn home_position_x(&self) -> Option<f64> {
        self.home_x
    }

    fn home_position_y(&self) -> Option<f64> {
        self.home_y
    }
}

/// Router with a B axis about -Y carried by a C axis about -Z
#[derive(Debug, Clone)]
pub struct HeadBcMachine {
    b_range: (f64, f64),
    c_range: (f64, f64),
    c_cyclic: bool,
    retract_plane: f64,
    home_x: Option<f64>,
    home_y: Option<f64>,
}

impl HeadBcMachine {
    pub fn new(config: &MachineConfig) -> Self {
        let rad = |deg: f64| Rad::from(Deg(deg)).0;
        Self {
            b_range: (rad(config.b_range.0), rad(config.b_range.1)),
            c_range: (rad(config.c_range.0), rad(config.c_range.1)),
            c_cyclic: config.c_cyclic,
            retract_plane: config.retract_plane,
            home_x: config.home_x,
            home_y: config.home_y,
        }
    }

    fn in_range(value: f64, range: (f64, f64)) -> bool {
        value >= range.0 && value <= range.1
    }

    /// Shift `c` by whole turns into the C range, nearest to `target`
    fn fit_c(&self, c: f64, target: f64) -> Option<f64> {
        let turns = ((target - c) / TAU).round();
        let candidates = [c + turns * TAU, c + (turns - 1.0) * TAU, c + (turns + 1.0) * TAU];
        candidates
            .into_iter()
            .filter(|v| self.c_cyclic || Self::in_range(*v, self.c_range))
            .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
    }

    /// Both solutions of the head for the same direction
    fn solutions(&self, abc: Vec3) -> [Vec3; 2] {
        [
            abc,
            Vec3::new(abc.x, -abc.y, normalize_angle(abc.z + PI)),
        ]
    }
}

/// Wrap into (-PI, PI]
fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

impl Kinematics for HeadBcMachine {
    fn is_machine_coordinate(&self, coordinate: usize) -> bool {
        coordinate == 1 || coordinate == 2
    }

    fn is_head_configuration(&self) -> bool {
        true
    }

    fn abc_for_direction(&self, direction: Vec3) -> Vec3 {
        let d = direction.normalize();
        let b = d.z.clamp(-1.0, 1.0).acos();
        // C is undefined with the tool straight down the spindle
        let c = if b.sin().abs() < 1e-9 {
            0.0
        } else {
            d.y.atan2(-d.x)
        };
        Vec3::new(0.0, b, c)
    }

    fn preferred_abc(&self, abc: Vec3) -> Vec3 {
        let [first, second] = self.solutions(abc);
        if second.y.abs() < first.y.abs() || (second.y == -first.y && second.z.abs() < first.z.abs()) {
            second
        } else {
            first
        }
    }

    fn remap_to_abc(&self, abc: Vec3, current: Vec3) -> Vec3 {
        self.solutions(abc)
            .into_iter()
            .filter_map(|s| self.fit_c(s.z, current.z).map(|c| Vec3::new(s.x, s.y, c)))
            .min_by(|a, b| {
                let da = (a - current).magnitude();
                let db = (b - current).magnitude();
                da.total_cmp(&db)
            })
            .unwrap_or(abc)
    }

    fn remap_abc(&self, abc: Vec3) -> Result<Vec3, AngleRangeError> {
        for solution in self.solutions(abc) {
            if !Self::in_range(solution.y, self.b_range) {
                continue;
            }
            if let Some(c) = self.fit_c(solution.z, solution.z) {
                return Ok(Vec3::new(0.0, solution.y, c));
            }
        }
        Err(AngleRangeError { abc })
    }

    fn direction(&self, abc: Vec3) -> Vec3 {
        let b = Matrix3::from_axis_angle(-Vec3::unit_y(), Rad(abc.y));
        let c = Matrix3::from_axis_angle(-Vec3::unit_z(), Rad(abc.z));
        c * b * Vec3::unit_z()
    }

    fn is_abc_supported(&self, abc: Vec3) -> bool {
        abc.x == 0.0
            && Self::in_range(abc.y, self.b_range)
            && (self.c_cyclic || Self::in_range(abc.z, self.c_range))
    }

    fn retract_plane(&self) -> f64 {
        self.retract_plane
    }

    fn home_position_x(&self) -> Option<f64> {
        self.home_x
    }

    fn home_position_y(&self) -> Option<f64> {
        self.home_y
    }

    fn has_cyclic_c(&self) -> bool {
        self.c_cyclic
    }
}
