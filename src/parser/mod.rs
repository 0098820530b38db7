//! Recursive descent parser for CL files
//! Converts tokens into the program model

use cgmath::{Deg, InnerSpace, Rad};
use logos::Span;
use thiserror::Error;

use crate::format::Unit;
use crate::lexer::{self, LexerError, Token};
use crate::model::{
    Arc, Command, CoolantMode, Cycle, CycleKind, Event, Program, RadiusCompensation, Section, Tool,
    ToolType, Vec3,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexerError),

    #[error("unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("unexpected end of statement, expected {expected}")]
    UnexpectedEnd { expected: String, span: Span },

    #[error("unknown {kind}: {name}")]
    UnknownName {
        kind: &'static str,
        name: String,
        span: Span,
    },

    #[error("tool {number} is used before it is defined")]
    UndefinedTool { number: u32, span: Span },

    #[error("{statement} is only allowed inside a section")]
    OutsideSection { statement: String, span: Span },

    #[error("section is never closed with 'end'")]
    UnclosedSection { span: Span },

    #[error("{what} must be a non-negative integer, got {value}")]
    InvalidInteger {
        what: &'static str,
        value: f64,
        span: Span,
    },
}

impl ParseError {
    /// Source range the error points at
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex(e) => e.span.clone(),
            ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEnd { span, .. }
            | ParseError::UnknownName { span, .. }
            | ParseError::UndefinedTool { span, .. }
            | ParseError::OutsideSection { span, .. }
            | ParseError::UnclosedSection { span }
            | ParseError::InvalidInteger { span, .. } => span.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Lex and parse a CL file
pub fn parse(source: &str) -> Result<Program> {
    let tokens = lexer::lex(source)?;
    Parser::new(source, tokens).parse()
}

fn degrees(value: f64) -> f64 {
    Rad::from(Deg(value)).0
}

/// Optional cycle operands
#[derive(Debug, Default)]
struct CycleOperands {
    dwell: f64,
    peck: f64,
    chip_break: f64,
    shift: f64,
    back_bore: f64,
}

fn cycle_kind(name: &str, ops: &CycleOperands) -> Option<CycleKind> {
    let dwell = ops.dwell;
    Some(match name {
        "drilling" => CycleKind::Drilling,
        "counter-boring" => CycleKind::CounterBoring { dwell },
        "chip-breaking" => CycleKind::ChipBreaking {
            incremental_depth: ops.peck,
            chip_break_distance: ops.chip_break,
            dwell,
        },
        "deep-drilling" => CycleKind::DeepDrilling {
            incremental_depth: ops.peck,
            dwell,
        },
        "tapping" => CycleKind::Tapping,
        "left-tapping" => CycleKind::LeftTapping,
        "right-tapping" => CycleKind::RightTapping,
        "fine-boring" => CycleKind::FineBoring {
            shift: ops.shift,
            dwell,
        },
        "back-boring" => CycleKind::BackBoring {
            shift: ops.shift,
            back_bore_distance: ops.back_bore,
            dwell,
        },
        "reaming" => CycleKind::Reaming { dwell },
        "stop-boring" => CycleKind::StopBoring { dwell },
        "boring" => CycleKind::Boring { dwell },
        _ => return None,
    })
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<(Token, Span)>) -> Self {
        Self {
            source,
            tokens,
            position: 0,
        }
    }

    /// Parse the full program
    pub fn parse(&mut self) -> Result<Program> {
        let mut program = Program::new(Unit::Mm);
        let mut section: Option<(Section, Span)> = None;

        loop {
            self.skip_newlines();
            let Some(token) = self.peek().cloned() else {
                break;
            };
            let span = self.span();

            match (&token, section.is_some()) {
                (Token::Program, false) => {
                    self.advance();
                    program.name = Some(self.expect_string()?);
                }
                (Token::Comment, false) => {
                    self.advance();
                    program.comment = Some(self.expect_string()?);
                }
                (Token::Units, false) => {
                    self.advance();
                    program.unit = match self.peek() {
                        Some(Token::Mm) => Unit::Mm,
                        Some(Token::Inch) => Unit::Inch,
                        _ => return Err(self.unexpected("'mm' or 'inch'")),
                    };
                    self.advance();
                }
                (Token::Tool, false) => {
                    let tool = self.parse_tool()?;
                    program.tools.retain(|t| t.number != tool.number);
                    program.tools.push(tool);
                }
                (Token::Section, false) => {
                    let opened = self.parse_section_header(&program.tools)?;
                    section = Some((opened, span));
                }
                (Token::End, true) => {
                    self.advance();
                    if let Some((done, _)) = section.take() {
                        program.sections.push(done);
                    }
                }
                (_, true) => {
                    if let Some((current, _)) = section.as_mut() {
                        self.parse_section_statement(current)?;
                    }
                }
                (Token::Identifier(_) | Token::Number(_) | Token::String(_), false) => {
                    return Err(self.unexpected("a statement"));
                }
                (_, false) => {
                    return Err(ParseError::OutsideSection {
                        statement: self.text(&span).to_string(),
                        span,
                    });
                }
            }
            self.end_statement()?;
        }

        if let Some((_, span)) = section {
            return Err(ParseError::UnclosedSection { span });
        }
        Ok(program)
    }

    fn parse_tool(&mut self) -> Result<Tool> {
        self.consume(Token::Tool)?;
        let number = self.expect_integer("tool number")?;
        let mut tool = Tool::new(number);

        loop {
            match self.peek() {
                Some(Token::Type) => {
                    self.advance();
                    let span = self.span();
                    let name = self.expect_name()?;
                    tool.tool_type = ToolType::from_id(&name).ok_or(ParseError::UnknownName {
                        kind: "tool type",
                        name,
                        span,
                    })?;
                }
                Some(Token::Diameter) => {
                    self.advance();
                    tool.diameter = self.expect_number()?;
                }
                Some(Token::Corner) => {
                    self.advance();
                    tool.corner_radius = self.expect_number()?;
                }
                Some(Token::Taper) => {
                    self.advance();
                    tool.taper_angle = degrees(self.expect_number()?);
                }
                Some(Token::CW) => {
                    self.advance();
                    tool.clockwise = true;
                }
                Some(Token::CCW) => {
                    self.advance();
                    tool.clockwise = false;
                }
                Some(Token::Coolant) => {
                    self.advance();
                    tool.coolant = self.expect_coolant()?;
                }
                Some(Token::Offset) => {
                    self.advance();
                    tool.diameter_offset = self.expect_integer("diameter offset")?;
                }
                Some(Token::Pitch) => {
                    self.advance();
                    tool.pitch = Some(self.expect_number()?);
                }
                Some(Token::Comment) => {
                    self.advance();
                    tool.comment = Some(self.expect_string()?);
                }
                _ => break,
            }
        }
        Ok(tool)
    }

    fn parse_section_header(&mut self, tools: &[Tool]) -> Result<Section> {
        self.consume(Token::Section)?;
        let mut comment = None;
        if self.peek() == Some(&Token::Comment) {
            self.advance();
            comment = Some(self.expect_string()?);
        }

        self.consume(Token::Tool)?;
        let span = self.span();
        let number = self.expect_integer("tool number")?;
        let tool = tools
            .iter()
            .find(|t| t.number == number)
            .cloned()
            .ok_or(ParseError::UndefinedTool { number, span })?;

        let mut section = Section::new(tool);
        section.comment = comment;
        loop {
            match self.peek() {
                Some(Token::Offset) => {
                    self.advance();
                    section.work_offset = self.expect_integer("work offset")?;
                }
                Some(Token::RPM) => {
                    self.advance();
                    section.spindle_speed = self.expect_number()?;
                }
                Some(Token::MultiAxis) => {
                    self.advance();
                    section.multi_axis = true;
                }
                Some(Token::Optimized) => {
                    self.advance();
                    section.optimized = true;
                }
                Some(Token::ForceToolChange) => {
                    self.advance();
                    section.force_tool_change = true;
                }
                _ => break,
            }
        }
        Ok(section)
    }

    fn parse_section_statement(&mut self, section: &mut Section) -> Result<()> {
        let Some(token) = self.advance().cloned() else {
            return Err(self.unexpected("a section statement"));
        };
        match token {
            Token::Plane => self.parse_plane(section)?,
            Token::Axis => {
                section.initial_tool_axis = self.expect_vector()?;
                section.final_tool_axis = section.initial_tool_axis;
                if self.peek() == Some(&Token::To) {
                    self.advance();
                    section.final_tool_axis = self.expect_vector()?;
                }
            }
            Token::Abc => {
                let abc = self.expect_angles()?;
                section.initial_abc = Some(abc);
                section.final_abc = Some(abc);
                if self.peek() == Some(&Token::To) {
                    self.advance();
                    section.final_abc = Some(self.expect_angles()?);
                }
            }
            Token::ZRange => {
                let min = self.expect_number()?;
                let max = self.expect_number()?;
                section.z_range = Some((min, max));
            }
            Token::Start => section.initial_position = self.expect_vector()?,
            Token::Rapid => {
                let target = self.expect_vector()?;
                section.events.push(Event::Rapid(target));
            }
            Token::Linear => {
                let target = self.expect_vector()?;
                let feed = self.expect_feed()?;
                section.events.push(Event::Linear { target, feed });
            }
            Token::Rapid5 => {
                let target = self.expect_vector()?;
                let abc = self.expect_angles()?;
                section.events.push(Event::Rapid5D { target, abc });
            }
            Token::Linear5 => {
                let target = self.expect_vector()?;
                let abc = self.expect_angles()?;
                let feed = self.expect_feed()?;
                section.events.push(Event::Linear5D { target, abc, feed });
            }
            Token::Arc => section.events.push(Event::Circular(self.parse_arc()?)),
            Token::Dwell => {
                let seconds = self.expect_number()?;
                section.events.push(Event::Dwell(seconds));
            }
            Token::Spindle => {
                let rpm = self.expect_number()?;
                section.events.push(Event::SpindleSpeed(rpm));
            }
            Token::Comp => {
                let mode = match self.peek() {
                    Some(Token::Left) => RadiusCompensation::Left,
                    Some(Token::Right) => RadiusCompensation::Right,
                    Some(Token::Off) => RadiusCompensation::Off,
                    _ => return Err(self.unexpected("'left', 'right' or 'off'")),
                };
                self.advance();
                section.events.push(Event::RadiusCompensation(mode));
            }
            Token::Note => {
                let text = self.expect_string()?;
                section.events.push(Event::Comment(text));
            }
            Token::Command => {
                let name = self.expect_name()?;
                section.events.push(Event::Command(Command::from_name(&name)));
            }
            Token::Cycle => section.events.push(Event::CycleBegin(self.parse_cycle()?)),
            Token::Point => {
                let point = self.expect_vector()?;
                section.events.push(Event::CyclePoint(point));
            }
            Token::EndCycle => section.events.push(Event::CycleEnd),
            _ => {
                self.position -= 1;
                return Err(self.unexpected("a section statement"));
            }
        }
        Ok(())
    }

    fn parse_plane(&mut self, section: &mut Section) -> Result<()> {
        let plane = &mut section.work_plane;
        loop {
            match self.peek() {
                Some(Token::Origin) => {
                    self.advance();
                    plane.origin = self.expect_vector()?;
                }
                Some(Token::X) => {
                    self.advance();
                    plane.right = self.expect_vector()?.normalize();
                }
                Some(Token::Y) => {
                    self.advance();
                    plane.up = self.expect_vector()?.normalize();
                }
                Some(Token::Z) => {
                    self.advance();
                    plane.forward = self.expect_vector()?.normalize();
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_arc(&mut self) -> Result<Arc> {
        let clockwise = match self.peek() {
            Some(Token::CW) => true,
            Some(Token::CCW) => false,
            _ => return Err(self.unexpected("'cw' or 'ccw'")),
        };
        self.advance();
        self.consume(Token::Center)?;
        let center = self.expect_vector()?;
        self.consume(Token::To)?;
        let end = self.expect_vector()?;

        let mut normal = Vec3::unit_z();
        let mut sweep = None;
        loop {
            match self.peek() {
                Some(Token::Normal) => {
                    self.advance();
                    normal = self.expect_vector()?.normalize();
                }
                Some(Token::Sweep) => {
                    self.advance();
                    sweep = Some(degrees(self.expect_number()?));
                }
                _ => break,
            }
        }
        let feed = self.expect_feed()?;
        Ok(Arc {
            clockwise,
            center,
            end,
            normal,
            sweep,
            feed,
        })
    }

    fn parse_cycle(&mut self) -> Result<Cycle> {
        let span = self.span();
        let name = self.expect_name()?;
        self.consume(Token::Clearance)?;
        let clearance = self.expect_number()?;
        self.consume(Token::Retract)?;
        let retract = self.expect_number()?;

        let mut stock = None;
        let mut feedrate = None;
        let mut retract_feedrate = None;
        let mut ops = CycleOperands::default();
        loop {
            match self.peek() {
                Some(Token::Stock) => {
                    self.advance();
                    stock = Some(self.expect_number()?);
                }
                Some(Token::Feed) => {
                    self.advance();
                    feedrate = Some(self.expect_number()?);
                }
                Some(Token::RetractFeed) => {
                    self.advance();
                    retract_feedrate = Some(self.expect_number()?);
                }
                Some(Token::Dwell) => {
                    self.advance();
                    ops.dwell = self.expect_number()?;
                }
                Some(Token::Peck) => {
                    self.advance();
                    ops.peck = self.expect_number()?;
                }
                Some(Token::ChipBreak) => {
                    self.advance();
                    ops.chip_break = self.expect_number()?;
                }
                Some(Token::Shift) => {
                    self.advance();
                    ops.shift = self.expect_number()?;
                }
                Some(Token::BackBore) => {
                    self.advance();
                    ops.back_bore = self.expect_number()?;
                }
                _ => break,
            }
        }

        let Some(feedrate) = feedrate else {
            return Err(self.unexpected("'feed'"));
        };
        let kind = cycle_kind(&name, &ops).ok_or(ParseError::UnknownName {
            kind: "cycle",
            name,
            span,
        })?;
        Ok(Cycle {
            kind,
            clearance,
            retract,
            stock: stock.unwrap_or(retract),
            feedrate,
            retract_feedrate: retract_feedrate.unwrap_or(feedrate),
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        if self.position < self.tokens.len() {
            self.position += 1;
            self.tokens.get(self.position - 1).map(|(t, _)| t)
        } else {
            None
        }
    }

    /// Span of the current token, or an empty span at the end of input
    fn span(&self) -> Span {
        match self.tokens.get(self.position) {
            Some((_, span)) => span.clone(),
            None => self.source.len()..self.source.len(),
        }
    }

    fn text(&self, span: &Span) -> &'a str {
        let source: &'a str = self.source;
        &source[span.clone()]
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let span = self.span();
        match self.peek() {
            Some(Token::Newline) | None => ParseError::UnexpectedEnd {
                expected: expected.to_string(),
                span,
            },
            Some(_) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: format!("'{}'", self.text(&span)),
                span,
            },
        }
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        if self.peek() == Some(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", expected).to_lowercase()))
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("number")),
        }
    }

    fn expect_integer(&mut self, what: &'static str) -> Result<u32> {
        let span = self.span();
        let value = self.expect_number()?;
        if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ParseError::InvalidInteger { what, value, span });
        }
        Ok(value as u32)
    }

    fn expect_vector(&mut self) -> Result<Vec3> {
        let x = self.expect_number()?;
        let y = self.expect_number()?;
        let z = self.expect_number()?;
        Ok(Vec3::new(x, y, z))
    }

    /// Three angles in degrees, returned in radians
    fn expect_angles(&mut self) -> Result<Vec3> {
        let a = self.expect_vector()?;
        Ok(Vec3::new(degrees(a.x), degrees(a.y), degrees(a.z)))
    }

    fn expect_feed(&mut self) -> Result<f64> {
        self.consume(Token::Feed)?;
        self.expect_number()
    }

    fn expect_string(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::String(s)) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            _ => Err(self.unexpected("quoted string")),
        }
    }

    /// A bare name; keywords are accepted as names too
    fn expect_name(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Identifier(s)) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            Some(Token::Number(_) | Token::String(_) | Token::Newline) | None => Err(self.unexpected("name")),
            Some(_) => {
                let span = self.span();
                self.advance();
                Ok(self.text(&span).to_string())
            }
        }
    }

    fn expect_coolant(&mut self) -> Result<CoolantMode> {
        let span = self.span();
        let name = self.expect_name()?;
        CoolantMode::from_name(&name).ok_or(ParseError::UnknownName {
            kind: "coolant",
            name,
            span,
        })
    }

    fn end_statement(&mut self) -> Result<()> {
        match self.peek() {
            Some(Token::Newline) | None => Ok(()),
            Some(_) => Err(self.unexpected("end of line")),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const DRILL_AND_PROFILE: &str = r#"
program "1001"
comment "door panel"
units mm

tool 1 type flat-end-mill dia 6.35 coolant flood comment "1/4 compression"
tool 2 type drill dia 5 ccw

section comment "Profile" tool 1 rpm 18000 offset 1
  zrange -5 10
  start 0 0 10
  rapid 0 0 5
  comp left
  linear 10 0 -5 feed 500      ; plunge and cut
  arc ccw center 10 10 -5 to 0 10 -5 feed 500
  command spindle-stop
end

section tool 2 rpm 12000
  cycle deep-drilling clearance 5 retract 2 feed 200 peck 2
  point 10 10 -8
  point 20 10 -8
  end-cycle
end
"#;

    #[test]
    fn test_parse_program() {
        let program = parse(DRILL_AND_PROFILE).unwrap();
        assert_eq!(program.name.as_deref(), Some("1001"));
        assert_eq!(program.comment.as_deref(), Some("door panel"));
        assert_eq!(program.unit, Unit::Mm);
        assert_eq!(program.tools.len(), 2);
        assert_eq!(program.tools[0].coolant, CoolantMode::Flood);
        assert_eq!(program.tools[0].comment.as_deref(), Some("1/4 compression"));
        assert!(!program.tools[1].clockwise);

        let profile = &program.sections[0];
        assert_eq!(profile.comment.as_deref(), Some("Profile"));
        assert_eq!(profile.work_offset, 1);
        assert_eq!(profile.spindle_speed, 18000.0);
        assert_eq!(profile.z_range, Some((-5.0, 10.0)));
        assert_eq!(profile.initial_position, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(
            profile.events,
            vec![
                Event::Rapid(Vec3::new(0.0, 0.0, 5.0)),
                Event::RadiusCompensation(RadiusCompensation::Left),
                Event::Linear {
                    target: Vec3::new(10.0, 0.0, -5.0),
                    feed: 500.0
                },
                Event::Circular(Arc {
                    clockwise: false,
                    center: Vec3::new(10.0, 10.0, -5.0),
                    end: Vec3::new(0.0, 10.0, -5.0),
                    normal: Vec3::unit_z(),
                    sweep: None,
                    feed: 500.0,
                }),
                Event::Command(Command::StopSpindle),
            ]
        );

        let drill = &program.sections[1];
        assert_eq!(drill.tool.tool_type, ToolType::Drill);
        match &drill.events[0] {
            Event::CycleBegin(cycle) => {
                assert_eq!(
                    cycle.kind,
                    CycleKind::DeepDrilling {
                        incremental_depth: 2.0,
                        dwell: 0.0
                    }
                );
                assert_eq!(cycle.stock, 2.0);
                assert_eq!(cycle.retract_feedrate, 200.0);
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
        assert_eq!(drill.events.len(), 4);
        assert_eq!(drill.events[3], Event::CycleEnd);
    }

    #[test]
    fn test_angles_are_degrees() {
        let source = "tool 1 dia 6\nsection tool 1 rpm 1000 multiaxis optimized\n  abc 0 90 0 to 0 45 0\n  rapid5 1 2 3 0 90 0\nend\n";
        let program = parse(source).unwrap();
        let section = &program.sections[0];
        assert!(section.multi_axis && section.optimized);
        let abc = section.initial_abc.unwrap();
        assert!((abc.y - FRAC_PI_2).abs() < 1e-12);
        assert!((section.final_abc.unwrap().y - FRAC_PI_2 / 2.0).abs() < 1e-12);
        match section.events[0] {
            Event::Rapid5D { abc, .. } => assert!((abc.y - FRAC_PI_2).abs() < 1e-12),
            ref other => panic!("expected rapid5, got {:?}", other),
        }
    }

    #[test]
    fn test_plane_statement() {
        let source = "tool 1 dia 6\nsection tool 1 rpm 1000\n  plane origin 5 0 0 x 0 2 0 y -1 0 0 z 0 0 1\nend";
        let program = parse(source).unwrap();
        let plane = program.sections[0].work_plane;
        assert_eq!(plane.origin, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(plane.right, Vec3::unit_y());
        assert_eq!(plane.up, -Vec3::unit_x());
    }

    #[test]
    fn test_undefined_tool() {
        let source = "section tool 4 rpm 1000\nend";
        let err = parse(source).unwrap_err();
        assert_eq!(err, ParseError::UndefinedTool { number: 4, span: 13..14 });
    }

    #[test]
    fn test_unknown_names() {
        let err = parse("tool 1 type spoon").unwrap_err();
        assert!(matches!(err, ParseError::UnknownName { kind: "tool type", .. }));

        let err = parse("tool 1 dia 6\nsection tool 1\n cycle drill clearance 5 retract 2 feed 100\nend").unwrap_err();
        match err {
            ParseError::UnknownName { kind, name, span } => {
                assert_eq!(kind, "cycle");
                assert_eq!(name, "drill");
                assert_eq!(span, 35..40);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_motion_outside_section() {
        let err = parse("rapid 1 2 3").unwrap_err();
        assert_eq!(
            err,
            ParseError::OutsideSection {
                statement: "rapid".to_string(),
                span: 0..5
            }
        );
    }

    #[test]
    fn test_unclosed_section() {
        let err = parse("tool 1 dia 6\nsection tool 1\nrapid 0 0 1\n").unwrap_err();
        assert_eq!(err, ParseError::UnclosedSection { span: 13..20 });
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        let err = parse("units mm inch").unwrap_err();
        assert_eq!(err.span(), 9..13);
        assert_eq!(
            err.to_string(),
            "unexpected token: expected end of line, got 'inch'"
        );
    }

    #[test]
    fn test_missing_operand() {
        let err = parse("tool 1 dia 6\nsection tool 1\nlinear 1 2 feed 3\nend").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }), "{:?}", err);
    }
}
