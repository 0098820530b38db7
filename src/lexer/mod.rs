use logos::{Logos, Span};
use thiserror::Error;

/// Tokens of the cutter-location (CL) file
/// One statement per line; keywords are lowercase.

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")] // Skip whitespace
#[logos(error = LexerError)]
pub enum Token {
    // Literals
    #[regex(r"-?(\d+\.?\d*|\.\d+)", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r#""[^"\n]*""#, |lex| lex.slice()[1..lex.slice().len()-1].to_string())]
    String(String),

    /// Names: tool types, coolant modes, cycle kinds, commands
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*(-[a-zA-Z0-9_]+)*", |lex| lex.slice().to_string(), priority = 1)]
    Identifier(String),

    // Keywords - Program structure
    #[token("program")]
    Program,

    #[token("comment")]
    Comment,

    #[token("units")]
    Units,

    #[token("mm")]
    Mm,

    #[token("inch")]
    Inch,

    // Keywords - Tools
    #[token("tool")]
    Tool,

    #[token("type")]
    Type,

    #[token("dia")]
    #[token("diameter")]
    Diameter,

    #[token("corner")]
    Corner,

    #[token("taper")]
    Taper,

    #[token("cw")]
    CW,

    #[token("ccw")]
    CCW,

    #[token("coolant")]
    Coolant,

    #[token("offset")]
    Offset,

    #[token("pitch")]
    Pitch,

    // Keywords - Sections
    #[token("section")]
    Section,

    #[token("rpm")]
    RPM,

    #[token("multiaxis")]
    MultiAxis,

    #[token("optimized")]
    Optimized,

    #[token("force-tool-change")]
    ForceToolChange,

    #[token("plane")]
    Plane,

    #[token("origin")]
    Origin,

    #[token("axis")]
    Axis,

    #[token("abc")]
    Abc,

    #[token("to")]
    To,

    #[token("zrange")]
    ZRange,

    #[token("start")]
    Start,

    #[token("end")]
    End,

    // Keywords - Motion
    #[token("rapid")]
    Rapid,

    #[token("linear")]
    Linear,

    #[token("rapid5")]
    Rapid5,

    #[token("linear5")]
    Linear5,

    #[token("arc")]
    Arc,

    #[token("center")]
    Center,

    #[token("normal")]
    Normal,

    #[token("sweep")]
    Sweep,

    #[token("feed")]
    #[token("feedrate")]
    Feed,

    #[token("dwell")]
    Dwell,

    #[token("spindle")]
    Spindle,

    #[token("comp")]
    Comp,

    #[token("left")]
    Left,

    #[token("right")]
    Right,

    #[token("off")]
    Off,

    #[token("note")]
    Note,

    #[token("command")]
    Command,

    // Keywords - Cycles
    #[token("cycle")]
    Cycle,

    #[token("clearance")]
    Clearance,

    #[token("retract")]
    Retract,

    #[token("stock")]
    Stock,

    #[token("retract-feed")]
    RetractFeed,

    #[token("peck")]
    Peck,

    #[token("chipbreak")]
    ChipBreak,

    #[token("shift")]
    Shift,

    #[token("backbore")]
    BackBore,

    #[token("point")]
    Point,

    #[token("end-cycle")]
    EndCycle,

    #[token("x")]
    X,

    #[token("y")]
    Y,

    #[token("z")]
    Z,

    // Newlines for statement separation
    #[token("\n")]
    Newline,

    // Comments
    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    LineComment,
}

#[derive(Error, Debug, Clone, PartialEq, Default)]
#[error("unrecognized input")]
pub struct LexerError {
    pub span: Span,
}

/// Lex the input string into tokens; stops at the first unrecognized input
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, LexerError> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, span)),
            Err(_) => Err(LexerError { span }),
        })
        .collect()
}
