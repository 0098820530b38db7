//! Modal group tracking
//!
//! A modal code stays active on the controller until changed, so each group
//! only re-emits its word when the value actually changes.

use crate::format::NumberFormat;

/// One controller modal group
#[derive(Debug, Clone)]
pub struct ModalGroup {
    format: NumberFormat,
    current: Option<f64>,
    force: bool,
}

impl ModalGroup {
    pub fn new(format: NumberFormat) -> Self {
        Self {
            format,
            current: None,
            force: false,
        }
    }

    /// A group that emits on every call
    pub fn forced(format: NumberFormat) -> Self {
        Self {
            force: true,
            ..Self::new(format)
        }
    }

    /// Returns the word for `code`, or `None` if it is already active.
    pub fn format(&mut self, code: f64) -> Option<String> {
        if !self.force {
            if let Some(current) = self.current {
                if !self.format.are_different(current, code) {
                    return None;
                }
            }
        }
        self.current = Some(code);
        Some(self.format.format(code))
    }

    /// Forget the active value; the next `format` always emits.
    pub fn reset(&mut self) {
        self.current = None;
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<f64> {
        self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalGroupId {
    /// Group 1: G0-G3, G72/G73
    Motion,
    /// Group 2: G17-G19
    Plane,
    /// Group 3: G90/G91
    AbsInc,
    /// Group 5: G93/G94
    FeedMode,
    /// Group 6: G70/G71
    Units,
    /// Group 9: G80-G89
    Cycle,
}

/// All modal groups of the controller
#[derive(Debug, Clone)]
pub struct Modals {
    motion: ModalGroup,
    plane: ModalGroup,
    abs_inc: ModalGroup,
    feed_mode: ModalGroup,
    units: ModalGroup,
    cycle: ModalGroup,
}

impl Default for Modals {
    fn default() -> Self {
        Self::new()
    }
}

impl Modals {
    pub fn new() -> Self {
        Self {
            motion: ModalGroup::new(NumberFormat::g()),
            plane: ModalGroup::new(NumberFormat::g()),
            abs_inc: ModalGroup::new(NumberFormat::g()),
            feed_mode: ModalGroup::new(NumberFormat::g()),
            units: ModalGroup::new(NumberFormat::g()),
            cycle: ModalGroup::forced(NumberFormat::g()),
        }
    }

    fn group_mut(&mut self, id: ModalGroupId) -> &mut ModalGroup {
        match id {
            ModalGroupId::Motion => &mut self.motion,
            ModalGroupId::Plane => &mut self.plane,
            ModalGroupId::AbsInc => &mut self.abs_inc,
            ModalGroupId::FeedMode => &mut self.feed_mode,
            ModalGroupId::Units => &mut self.units,
            ModalGroupId::Cycle => &mut self.cycle,
        }
    }

    /// Format a code in its group and run the group's on-change effect.
    pub fn format(&mut self, id: ModalGroupId, code: f64) -> Option<String> {
        let word = self.group_mut(id).format(code);
        if word.is_some() {
            self.on_change(id);
        }
        word
    }

    fn on_change(&mut self, id: ModalGroupId) {
        // a plane switch invalidates the motion mode on this control
        if id == ModalGroupId::Plane {
            self.motion.reset();
        }
    }

    pub fn reset(&mut self, id: ModalGroupId) {
        self.group_mut(id).reset();
    }

    pub fn motion(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::Motion, code)
    }

    pub fn plane(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::Plane, code)
    }

    pub fn abs_inc(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::AbsInc, code)
    }

    pub fn feed_mode(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::FeedMode, code)
    }

    pub fn units(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::Units, code)
    }

    pub fn cycle(&mut self, code: f64) -> Option<String> {
        self.format(ModalGroupId::Cycle, code)
    }
}
