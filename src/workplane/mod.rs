//! Work-plane and orientation resolver
//!
//! Turns a section's tool direction into machine angles through the
//! kinematics, remembers the orientation the machine is parked in, and owns
//! the frame that section positions are mapped through.

use tracing::debug;

use crate::error::{PostError, Result};
use crate::format::NumberFormat;
use crate::kinematics::Kinematics;
use crate::model::{is_same_direction, Vec3, WorkPlane};

#[derive(Debug, Clone)]
pub struct WorkPlaneResolver {
    /// Orientation last written to the machine; `None` when unknown
    current: Option<Vec3>,
    /// Last machine angles chosen, used for continuity
    machine_abc: Option<Vec3>,
    closest_abc: bool,
    frame: WorkPlane,
}

impl WorkPlaneResolver {
    pub fn new(closest_abc: bool) -> Self {
        Self {
            current: None,
            machine_abc: None,
            closest_abc,
            frame: WorkPlane::identity(),
        }
    }

    /// Forget the parked orientation (tool change, retract)
    pub fn force(&mut self) {
        self.current = None;
    }

    /// True when moving to `abc` needs a rotary move
    pub fn needs_move(&self, abc: Vec3) -> bool {
        let format = NumberFormat::abc();
        match self.current {
            None => true,
            Some(current) => {
                format.are_different(abc.x, current.x)
                    || format.are_different(abc.y, current.y)
                    || format.are_different(abc.z, current.z)
            }
        }
    }

    pub fn commit(&mut self, abc: Vec3) {
        debug!(?abc, "orientation committed");
        self.current = Some(abc);
    }

    /// Seed continuity from the final angles of a previous section
    pub fn set_machine_abc(&mut self, abc: Vec3) {
        self.machine_abc = Some(abc);
    }

    pub fn set_frame(&mut self, frame: WorkPlane) {
        self.frame = frame;
    }

    /// Positions pass through unchanged (simultaneous multi-axis)
    pub fn cancel_transformation(&mut self) {
        self.frame = WorkPlane::identity();
    }

    pub fn frame_position(&self, local: Vec3) -> Vec3 {
        self.frame.to_global(local)
    }

    pub fn frame_direction(&self, local: Vec3) -> Vec3 {
        self.frame.to_global_direction(local)
    }

    /// Resolve the machine angles for a work plane and adopt its frame
    pub fn machine_abc(&mut self, kinematics: &dyn Kinematics, plane: &WorkPlane) -> Result<Vec3> {
        let mut abc = kinematics.abc_for_direction(plane.forward);
        abc = match (self.closest_abc, self.machine_abc) {
            (true, Some(current)) => kinematics.remap_to_abc(abc, current),
            _ => kinematics.preferred_abc(abc),
        };

        let abc = kinematics
            .remap_abc(abc)
            .map_err(|e| PostError::AnglesNotSupported {
                angles: describe_angles(kinematics, e.abc),
            })?;
        self.machine_abc = Some(abc);

        if !is_same_direction(kinematics.direction(abc), plane.forward) {
            return Err(PostError::UnsupportedOrientation);
        }
        if !kinematics.is_abc_supported(abc) {
            return Err(PostError::WorkPlaneNotSupported {
                angles: describe_angles(kinematics, abc),
            });
        }

        self.frame = *plane;
        Ok(abc)
    }
}

/// " B45.000 C90.000" for the rotary axes the machine has
pub fn describe_angles(kinematics: &dyn Kinematics, abc: Vec3) -> String {
    let format = NumberFormat::abc();
    ["A", "B", "C"]
        .iter()
        .zip([abc.x, abc.y, abc.z])
        .enumerate()
        .filter(|(coordinate, _)| kinematics.is_machine_coordinate(*coordinate))
        .map(|(_, (letter, value))| format!(" {}{}", letter, format.format(value)))
        .collect()
}
