use thiserror::Error;

use crate::model::{CycleKind, Event, Program, Section, ToolType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("using multiple work offsets is not possible if the initial work offset is 0")]
    AmbiguousWorkOffsets,

    #[error("section {section}: tool {tool} is not in the tool list")]
    UnknownTool { section: usize, tool: u32 },

    #[error("tool {tool} has invalid diameter {diameter}")]
    ToolDiameter { tool: u32, diameter: f64 },

    #[error("section {section}: feed rate must be positive, got {feed}")]
    FeedRate { section: usize, feed: f64 },

    #[error("section {section}: cycle point outside of a cycle")]
    CyclePointOutsideCycle { section: usize },

    #[error("section {section}: cycle is never closed")]
    UnterminatedCycle { section: usize },

    #[error("section {section}: tapping without a feed needs a tool pitch")]
    TappingFeed { section: usize },

    #[error("section {section}: retract plane {retract} is above clearance plane {clearance}")]
    CyclePlanes {
        section: usize,
        retract: f64,
        clearance: f64,
    },
}

/// First section on offset 0 with any later section on a numbered offset
pub fn has_ambiguous_work_offsets(program: &Program) -> bool {
    match program.sections.split_first() {
        Some((first, rest)) => first.work_offset == 0 && rest.iter().any(|s| s.work_offset > 0),
        None => false,
    }
}

/// Pre-flight checks on a parsed program; every problem is reported.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_program(&self, program: &Program) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if has_ambiguous_work_offsets(program) {
            errors.push(ValidationError::AmbiguousWorkOffsets);
        }
        for tool in &program.tools {
            if tool.diameter < 0.0 || (tool.diameter == 0.0 && tool.tool_type != ToolType::Probe) {
                errors.push(ValidationError::ToolDiameter {
                    tool: tool.number,
                    diameter: tool.diameter,
                });
            }
        }
        for (index, section) in program.sections.iter().enumerate() {
            if !program.tools.iter().any(|t| t.number == section.tool.number) {
                errors.push(ValidationError::UnknownTool {
                    section: index,
                    tool: section.tool.number,
                });
            }
            self.validate_section(index, section, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_section(&self, index: usize, section: &Section, errors: &mut Vec<ValidationError>) {
        let mut in_cycle = false;
        for event in &section.events {
            let feed = match event {
                Event::Linear { feed, .. } | Event::Linear5D { feed, .. } => Some(*feed),
                Event::Circular(arc) => Some(arc.feed),
                _ => None,
            };
            if let Some(feed) = feed {
                if feed <= 0.0 {
                    errors.push(ValidationError::FeedRate {
                        section: index,
                        feed,
                    });
                }
            }

            match event {
                Event::CycleBegin(cycle) => {
                    in_cycle = true;
                    if cycle.retract > cycle.clearance {
                        errors.push(ValidationError::CyclePlanes {
                            section: index,
                            retract: cycle.retract,
                            clearance: cycle.clearance,
                        });
                    }
                    let tapping = matches!(
                        cycle.kind,
                        CycleKind::Tapping | CycleKind::LeftTapping | CycleKind::RightTapping
                    );
                    if tapping && cycle.feedrate == 0.0 && section.tool.pitch.is_none() {
                        errors.push(ValidationError::TappingFeed { section: index });
                    } else if !tapping && cycle.feedrate <= 0.0 {
                        errors.push(ValidationError::FeedRate {
                            section: index,
                            feed: cycle.feedrate,
                        });
                    }
                }
                Event::CyclePoint(_) if !in_cycle => {
                    errors.push(ValidationError::CyclePointOutsideCycle { section: index });
                }
                Event::CycleEnd => in_cycle = false,
                _ => {}
            }
        }
        if in_cycle {
            errors.push(ValidationError::UnterminatedCycle { section: index });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Unit;
    use crate::model::{Cycle, Tool, Vec3};

    fn program_with(sections: Vec<Section>) -> Program {
        let mut program = Program::new(Unit::Mm);
        program.tools = vec![Tool {
            diameter: 6.0,
            ..Tool::new(1)
        }];
        program.sections = sections;
        program
    }

    fn drilling(feedrate: f64) -> Cycle {
        Cycle {
            kind: CycleKind::Drilling,
            clearance: 5.0,
            retract: 2.0,
            stock: 0.0,
            feedrate,
            retract_feedrate: feedrate,
        }
    }

    #[test]
    fn test_work_offset_ambiguity() {
        let mut first = Section::new(Tool::new(1));
        let mut second = Section::new(Tool::new(1));
        second.work_offset = 2;
        assert!(has_ambiguous_work_offsets(&program_with(vec![first.clone(), second.clone()])));

        first.work_offset = 1;
        assert!(!has_ambiguous_work_offsets(&program_with(vec![first, second])));
        assert!(!has_ambiguous_work_offsets(&program_with(vec![])));
    }

    #[test]
    fn test_valid_program() {
        let mut section = Section::new(Tool::new(1));
        section.events = vec![
            Event::Linear {
                target: Vec3::new(1.0, 0.0, 0.0),
                feed: 100.0,
            },
            Event::CycleBegin(drilling(200.0)),
            Event::CyclePoint(Vec3::new(0.0, 0.0, -3.0)),
            Event::CycleEnd,
        ];
        assert_eq!(Validator::new().validate_program(&program_with(vec![section])), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut section = Section::new(Tool::new(7));
        section.events = vec![
            Event::Linear {
                target: Vec3::new(1.0, 0.0, 0.0),
                feed: 0.0,
            },
            Event::CyclePoint(Vec3::new(0.0, 0.0, -3.0)),
            Event::CycleBegin(drilling(200.0)),
        ];
        let errors = Validator::new()
            .validate_program(&program_with(vec![section]))
            .unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::UnknownTool { section: 0, tool: 7 },
                ValidationError::FeedRate { section: 0, feed: 0.0 },
                ValidationError::CyclePointOutsideCycle { section: 0 },
                ValidationError::UnterminatedCycle { section: 0 },
            ]
        );
    }

    #[test]
    fn test_tapping_needs_feed_or_pitch() {
        let mut section = Section::new(Tool::new(1));
        let mut tapping = drilling(0.0);
        tapping.kind = CycleKind::Tapping;
        section.events = vec![Event::CycleBegin(tapping), Event::CycleEnd];
        let errors = Validator::new()
            .validate_program(&program_with(vec![section.clone()]))
            .unwrap_err();
        assert_eq!(errors, vec![ValidationError::TappingFeed { section: 0 }]);

        section.tool.pitch = Some(1.25);
        assert!(Validator::new().validate_program(&program_with(vec![section])).is_ok());
    }

    #[test]
    fn test_message() {
        let err = ValidationError::CyclePlanes {
            section: 2,
            retract: 8.0,
            clearance: 5.0,
        };
        assert_eq!(
            err.to_string(),
            "section 2: retract plane 8 is above clearance plane 5"
        );
    }
}
