mod block;
mod codegen;
mod config;
mod coolant;
mod error;
mod format;
mod kinematics;
mod lexer;
mod modal;
mod model;
mod output;
mod parser;
mod validator;
mod workplane;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ariadne::{Label, Report, ReportKind, Source};
use tracing::info;

use codegen::ErrorPolicy;
use config::PostConfig;

#[derive(Debug)]
enum Error {
    Io(std::io::Error),
    Parse(parser::ParseError),
    Validation(Vec<validator::ValidationError>),
    Config(config::ConfigError),
    Post(error::PostError),
    Usage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{}", e),
            Error::Parse(e) => write!(f, "{}", e),
            Error::Validation(errors) => write!(f, "{} validation error(s)", errors.len()),
            Error::Config(e) => write!(f, "{}", e),
            Error::Post(e) => write!(f, "{}", e),
            Error::Usage(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<parser::ParseError> for Error {
    fn from(e: parser::ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<error::PostError> for Error {
    fn from(e: error::PostError) -> Self {
        Error::Post(e)
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    policy: ErrorPolicy,
}

fn parse_args(args: &[String]) -> Result<Args, Error> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut policy = ErrorPolicy::Halt;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter
                    .next()
                    .ok_or_else(|| Error::Usage("--config needs a file".to_string()))?;
                config = Some(PathBuf::from(path));
            }
            "--keep-going" => policy = ErrorPolicy::SkipSection,
            flag if flag.starts_with("--") => {
                return Err(Error::Usage(format!("unknown option: {}", flag)));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut positional = positional.into_iter();
    let input = positional
        .next()
        .ok_or_else(|| Error::Usage("missing input file".to_string()))?;
    let output = positional
        .next()
        .unwrap_or_else(|| input.with_extension("cnc"));
    if let Some(extra) = positional.next() {
        return Err(Error::Usage(format!("unexpected argument: {}", extra.display())));
    }

    Ok(Args {
        input,
        output,
        config,
        policy,
    })
}

fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn report_parse_error(path: &Path, source: &str, err: &parser::ParseError) {
    let span = err.span();
    let _ = Report::build(ReportKind::Error, (), span.start)
        .with_message(format!("failed to parse {}", path.display()))
        .with_label(Label::new(span).with_message(err.to_string()))
        .finish()
        .eprint(Source::from(source));
}

/// Parse, validate and translate a CL source
fn post(source: &str, config: &PostConfig, policy: ErrorPolicy) -> Result<codegen::Translation, Error> {
    let program = parser::parse(source)?;

    let validator = validator::Validator::new();
    validator
        .validate_program(&program)
        .map_err(Error::Validation)?;

    Ok(codegen::translate(&program, config, policy)?)
}

fn run(args: &Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => PostConfig::from_file(&path.to_string_lossy())?,
        None => PostConfig::default(),
    };
    let source = fs::read_to_string(&args.input)?;

    let translation = match post(&source, &config, args.policy) {
        Err(Error::Parse(err)) => {
            report_parse_error(&args.input, &source, &err);
            return Err(Error::Parse(err));
        }
        Err(Error::Validation(errors)) => {
            eprintln!("Validation errors:");
            for err in &errors {
                eprintln!("  - {}", err);
            }
            return Err(Error::Validation(errors));
        }
        other => other?,
    };

    for warning in &translation.warnings {
        eprintln!("warning: {}", warning);
    }
    for skipped in &translation.skipped {
        eprintln!("skipped section {}: {}", skipped.index, skipped.error);
    }

    fs::write(&args.output, translation.gcode())?;
    info!(output = %args.output.display(), "program written");
    println!("Generated: {}", args.output.display());
    Ok(())
}

fn main() {
    init_logging();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!();
            eprintln!("Usage: routerpost <input.cl> [output.cnc] [--config post.json] [--keep-going]");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&args) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_args() {
        let args = parse_args(&strings(&["part.cl", "--keep-going", "--config", "post.json"])).unwrap();
        assert_eq!(
            args,
            Args {
                input: PathBuf::from("part.cl"),
                output: PathBuf::from("part.cnc"),
                config: Some(PathBuf::from("post.json")),
                policy: ErrorPolicy::SkipSection,
            }
        );

        let args = parse_args(&strings(&["part.cl", "out.nc"])).unwrap();
        assert_eq!(args.output, PathBuf::from("out.nc"));
        assert_eq!(args.policy, ErrorPolicy::Halt);

        assert!(matches!(parse_args(&[]), Err(Error::Usage(_))));
        assert!(matches!(parse_args(&strings(&["a.cl", "--config"])), Err(Error::Usage(_))));
        assert!(matches!(parse_args(&strings(&["a.cl", "--fast"])), Err(Error::Usage(_))));
    }

    #[test]
    fn test_drill_program() {
        let source = r#"
program "2001"
units mm

tool 3 type drill dia 5

section tool 3 rpm 6000 offset 1
  start 10 10 20
  rapid 10 10 5
  cycle drilling clearance 5 retract 2 feed 300
  point 10 10 -4
  point 20 10 -4
  end-cycle
end
"#;

        let translation = post(source, &PostConfig::default(), ErrorPolicy::Halt).expect("post failed");
        let gcode = translation.gcode();
        assert!(gcode.contains("(2001)"), "{}", gcode);
        assert!(gcode.contains("G71"));
        assert!(gcode.contains("G81 X10.000 Y10.000 Z-4.000 F300.0"));
        assert!(gcode.contains("G80"));
        assert!(translation.warnings.is_empty());
    }

    #[test]
    fn test_imperial_profile() {
        let source = r#"
units inch
tool 1 type flat-end-mill dia 0.25

section tool 1 rpm 18000 offset 1
  start 0 0 1
  rapid 0 0 0.1
  linear 0 0 -0.25 feed 60
  arc ccw center 1 0 -0.25 to 2 0 -0.25 feed 120
end
"#;

        let translation = post(source, &PostConfig::default(), ErrorPolicy::Halt).expect("post failed");
        let gcode = translation.gcode();
        assert!(gcode.contains("G70"));
        assert!(gcode.contains("G3 X2.0000"), "{}", gcode);
    }

    #[test]
    fn test_errors_are_reported_by_stage() {
        let config = PostConfig::default();
        let err = post("rapid 1 2 3", &config, ErrorPolicy::Halt).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let source = "tool 1 dia 6\nsection tool 1 rpm 1000\nlinear 1 0 0 feed 0\nend";
        let err = post(source, &config, ErrorPolicy::Halt).unwrap_err();
        assert!(matches!(err, Error::Validation(ref errors) if errors.len() == 1));
    }
}
