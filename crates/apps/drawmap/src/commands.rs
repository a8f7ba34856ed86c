use std::fmt;

use foundation::geo::GeoPoint;

/// One line of the interactive session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Replaces the address text; may be empty.
    Address(String),
    Enable,
    Disable,
    Edit,
    Click(GeoPoint),
    /// Whole ring as reported by a vertex drag.
    Drag(Vec<GeoPoint>),
    Done,
    Cancel,
    Wait,
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  address <text>          set the address field
  enable | disable        toggle auto-resolution
  edit                    start editing the outline
  click <lat> <lng>       add a vertex while drawing
  drag <lat,lng> ...      replace the ring while vertex editing
  done | cancel           leave edit mode, keeping or restoring geometry
  wait                    wait for pending lookups, then show
  show                    print the committed geometry
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CommandError {}

/// Parses a session line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<SessionCommand>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.trim_end().is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (trimmed, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        // Keep the text verbatim: whitespace matters for change detection.
        "address" => SessionCommand::Address(rest.to_string()),
        "enable" => SessionCommand::Enable,
        "disable" => SessionCommand::Disable,
        "edit" => SessionCommand::Edit,
        "click" => SessionCommand::Click(parse_click(rest)?),
        "drag" => SessionCommand::Drag(parse_ring(rest)?),
        "done" => SessionCommand::Done,
        "cancel" => SessionCommand::Cancel,
        "wait" => SessionCommand::Wait,
        "show" => SessionCommand::Show,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(CommandError::new(format!("unknown command `{other}`"))),
    };
    Ok(Some(command))
}

fn parse_click(args: &str) -> Result<GeoPoint, CommandError> {
    let parts: Vec<&str> = args
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [lat, lng] => point(lat, lng),
        _ => Err(CommandError::new("usage: click <lat> <lng>")),
    }
}

fn parse_ring(args: &str) -> Result<Vec<GeoPoint>, CommandError> {
    args.split_whitespace()
        .map(|pair| match pair.split_once(',') {
            Some((lat, lng)) => point(lat, lng),
            None => Err(CommandError::new(format!("expected lat,lng, got `{pair}`"))),
        })
        .collect()
}

fn point(lat: &str, lng: &str) -> Result<GeoPoint, CommandError> {
    let coord = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| CommandError::new(format!("invalid coordinate `{s}`")))
    };
    Ok(GeoPoint::new(coord(lat)?, coord(lng)?))
}
