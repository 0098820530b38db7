//! Motion events
//!
//! Positions arrive here already mapped into the output frame.

use cgmath::{InnerSpace, Matrix3, Rad};
use std::f64::consts::TAU;

use super::Translator;
use crate::block::word;
use crate::error::{PostError, Result, Warning};
use crate::format::NumberFormat;
use crate::model::{is_same_direction, Arc, RadiusCompensation, Section, Vec3};

/// Native arc planes of the control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArcPlane {
    /// G17
    Xy,
    /// G18
    Zx,
    /// G19
    Yz,
}

impl ArcPlane {
    fn from_normal(normal: Vec3) -> Option<(Self, bool)> {
        [
            (ArcPlane::Xy, Vec3::unit_z()),
            (ArcPlane::Zx, Vec3::unit_y()),
            (ArcPlane::Yz, Vec3::unit_x()),
        ]
        .into_iter()
        .find_map(|(plane, axis)| {
            if is_same_direction(normal, axis) {
                Some((plane, false))
            } else if is_same_direction(normal, -axis) {
                Some((plane, true))
            } else {
                None
            }
        })
    }

    fn code(self) -> f64 {
        match self {
            ArcPlane::Xy => 17.0,
            ArcPlane::Zx => 18.0,
            ArcPlane::Yz => 19.0,
        }
    }
}

/// Arc resolved in the output frame
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArcPath {
    pub start: Vec3,
    pub center: Vec3,
    pub end: Vec3,
    /// Unit normal; travel is counterclockwise about it
    pub normal: Vec3,
    /// Radians, always positive
    pub sweep: f64,
}

impl ArcPath {
    pub fn new(start: Vec3, center: Vec3, end: Vec3, normal: Vec3, clockwise: bool, sweep: Option<f64>) -> Self {
        let normal = normal.normalize();
        // fold the direction into the normal
        let normal = if clockwise { -normal } else { normal };
        let sweep = sweep.map(f64::abs).unwrap_or_else(|| {
            let u = start - center;
            let v = end - center;
            let angle = normal.dot(u.cross(v)).atan2(u.dot(v)).rem_euclid(TAU);
            if angle < 1e-9 {
                TAU
            } else {
                angle
            }
        });
        Self {
            start,
            center,
            end,
            normal,
            sweep,
        }
    }

    pub fn radius(&self) -> f64 {
        let r = self.start - self.center;
        (r - self.normal * self.normal.dot(r)).magnitude()
    }

    pub fn is_full_circle(&self) -> bool {
        self.sweep >= TAU - 1e-9
    }

    /// Travel along the normal between start and end
    pub fn rise(&self) -> f64 {
        self.normal.dot(self.end - self.start)
    }

    /// Point at fraction `t` of the sweep
    pub fn point_at(&self, t: f64) -> Vec3 {
        if t >= 1.0 {
            return self.end;
        }
        let rotation = Matrix3::from_axis_angle(self.normal, Rad(self.sweep * t));
        self.center + rotation * (self.start - self.center) + self.normal * (self.rise() * t)
    }

    /// Chord count keeping the sagitta within `tolerance`
    pub fn segments(&self, tolerance: f64) -> usize {
        let radius = self.radius();
        if radius <= tolerance || tolerance <= 0.0 {
            return 1;
        }
        let step = 2.0 * (1.0 - tolerance / radius).acos();
        ((self.sweep / step).ceil() as usize).max(1)
    }
}

impl Translator {
    pub(super) fn on_rapid(&mut self, target: Vec3) -> Result<()> {
        let x = self.outputs.x.format(target.x);
        let y = self.outputs.y.format(target.y);
        let z = self.outputs.z(target.z);
        if x.is_some() || y.is_some() || z.is_some() {
            if self.pending_compensation.is_some() {
                return Err(PostError::RadiusCompensation {
                    motion: "rapid traversal",
                });
            }
            let motion = self.modals.motion(0.0);
            self.out.write_block(&[motion, x, y, z]);
            self.outputs.feed.reset();
        }
        self.position = target;
        Ok(())
    }

    pub(super) fn on_linear(&mut self, target: Vec3, feed: f64, next_is_motion: bool) -> Result<()> {
        if self.pending_compensation.is_some() {
            // land exactly on the compensated start point
            self.outputs.x.reset();
            self.outputs.y.reset();
        }
        let x = self.outputs.x.format(target.x);
        let y = self.outputs.y.format(target.y);
        let z = self.outputs.z(target.z);
        let f = self.outputs.feed.format(feed);

        if x.is_some() || y.is_some() || z.is_some() {
            if let Some(mode) = self.pending_compensation.take() {
                let offset = self.tool.as_ref().map_or(0, |t| t.diameter_offset);
                let slots = self.config.number_of_tool_slots;
                if offset > slots {
                    self.warn(Warning::DiameterOffsetExceedsSlots { offset, slots });
                }
                let plane = self.modals.plane(17.0);
                self.out.write_block(&[plane]);
                let code = match mode {
                    RadiusCompensation::Left => 41.0,
                    RadiusCompensation::Right => 42.0,
                    RadiusCompensation::Off => 40.0,
                };
                let motion = self.modals.motion(1.0);
                self.out
                    .write_block(&[motion, word(NumberFormat::g().format(code)), x, y, z, f]);
            } else {
                let motion = self.modals.motion(1.0);
                self.out.write_block(&[motion, x, y, z, f]);
            }
        } else if f.is_some() {
            self.write_feed_only(f, next_is_motion);
        }
        self.position = target;
        Ok(())
    }

    /// A feed change without motion waits for the next move when there is one
    fn write_feed_only(&mut self, f: Option<String>, next_is_motion: bool) {
        if next_is_motion {
            self.outputs.feed.reset();
        } else {
            let motion = self.modals.motion(1.0);
            self.out.write_block(&[motion, f]);
        }
    }

    fn check_five_axis(&self, section: &Section, motion: &'static str) -> Result<()> {
        if !section.optimized {
            return Err(PostError::FiveAxisNotOptimized);
        }
        if self.pending_compensation.is_some() {
            return Err(PostError::RadiusCompensation { motion });
        }
        Ok(())
    }

    /// Tip position corrected for the pivot at the target orientation
    fn five_axis_words(&mut self, target: Vec3, abc: Vec3) -> [Option<String>; 6] {
        let displacement = self.pivot_displacement(self.kinematics.direction(abc));
        let tip = target + displacement;
        [
            self.outputs.x.format(tip.x),
            self.outputs.y.format(tip.y),
            self.outputs.z(tip.z),
            self.outputs.a.format(abc.x),
            self.outputs.b.format(abc.y),
            self.outputs.c.format(abc.z),
        ]
    }

    pub(super) fn on_rapid_5d(&mut self, section: &Section, target: Vec3, abc: Vec3) -> Result<()> {
        self.check_five_axis(section, "rapid traversal")?;
        let [x, y, z, a, b, c] = self.five_axis_words(target, abc);
        let motion = self.modals.motion(0.0);
        self.out.write_block(&[motion, x, y, z, a, b, c]);
        self.outputs.feed.reset();
        self.position = target;
        Ok(())
    }

    pub(super) fn on_linear_5d(
        &mut self,
        section: &Section,
        target: Vec3,
        abc: Vec3,
        feed: f64,
        next_is_motion: bool,
    ) -> Result<()> {
        self.check_five_axis(section, "5-axis move")?;
        let words = self.five_axis_words(target, abc);
        let f = self.outputs.feed.format(feed);
        if words.iter().any(Option::is_some) {
            let motion = self.modals.motion(1.0);
            let mut block = vec![motion];
            block.extend(words);
            block.push(f);
            self.out.write_block(&block);
        } else if f.is_some() {
            self.write_feed_only(f, next_is_motion);
        }
        self.position = target;
        Ok(())
    }

    pub(super) fn on_circular(&mut self, arc: &Arc) -> Result<()> {
        if self.pending_compensation.is_some() {
            return Err(PostError::RadiusCompensation {
                motion: "circular move",
            });
        }

        let path = ArcPath::new(
            self.position,
            self.workplane.frame_position(arc.center),
            self.workplane.frame_position(arc.end),
            self.workplane.frame_direction(arc.normal),
            arc.clockwise,
            arc.sweep,
        );
        let xyz = NumberFormat::xyz(self.unit);
        let helical = xyz.are_different(path.rise(), 0.0);

        let Some((plane, flipped)) = ArcPlane::from_normal(path.normal) else {
            if path.is_full_circle() || !self.config.allow_3d_arcs {
                return self.linearize(&path, arc.feed);
            }
            return self.write_3d_arc(&path, arc.clockwise, arc.feed);
        };
        if path.is_full_circle() && helical {
            return self.linearize(&path, arc.feed);
        }

        // path.normal is counterclockwise; against the plane axis that is G2
        let code = if flipped { 2.0 } else { 3.0 };
        let (start, center, end) = (path.start, path.center, path.end);
        let plane_word = self.modals.plane(plane.code());
        let motion = self.modals.motion(code);
        let i = self.outputs.i.format(center.x - start.x, 0.0);
        let j = self.outputs.j.format(center.y - start.y, 0.0);
        let k = self.outputs.k.format(center.z - start.z, 0.0);

        let words = if path.is_full_circle() {
            match plane {
                ArcPlane::Xy => vec![plane_word, motion, self.outputs.x.format(end.x), i, j],
                ArcPlane::Zx => vec![plane_word, motion, self.outputs.z(end.z), i, k],
                ArcPlane::Yz => vec![plane_word, motion, self.outputs.y.format(end.y), j, k],
            }
        } else {
            let x = self.outputs.x.format(end.x);
            let y = self.outputs.y.format(end.y);
            let z = self.outputs.z(end.z);
            match plane {
                ArcPlane::Xy => vec![plane_word, motion, x, y, z, i, j],
                ArcPlane::Zx => vec![plane_word, motion, x, y, z, i, k],
                ArcPlane::Yz => vec![plane_word, motion, x, y, z, j, k],
            }
        };
        let f = self.outputs.feed.format(arc.feed);
        let mut block = words;
        block.push(f);
        self.out.write_block(&block);
        self.position = end;
        Ok(())
    }

    /// G72/G73 through the arc mid-point
    fn write_3d_arc(&mut self, path: &ArcPath, clockwise: bool, feed: f64) -> Result<()> {
        let xyz = NumberFormat::xyz(self.unit);
        let mid = path.point_at(0.5);
        let code = if clockwise { 72.0 } else { 73.0 };
        self.outputs.force_xyz();
        let words = [
            self.modals.abs_inc(90.0),
            self.modals.motion(code),
            self.outputs.x.format(path.end.x),
            self.outputs.y.format(path.end.y),
            self.outputs.z(path.end.z),
            word(format!("I{}", xyz.format(mid.x))),
            word(format!("J{}", xyz.format(mid.y))),
            word(format!("K{}", xyz.format(mid.z))),
            self.outputs.feed.format(feed),
        ];
        self.out.write_block(&words);
        self.position = path.end;
        Ok(())
    }

    /// Approximate the arc with linear moves within the chord tolerance
    fn linearize(&mut self, path: &ArcPath, feed: f64) -> Result<()> {
        let segments = path.segments(self.config.tolerance(self.unit));
        for n in 1..=segments {
            let point = path.point_at(n as f64 / segments as f64);
            self.on_linear(point, feed, true)?;
        }
        Ok(())
    }
}
