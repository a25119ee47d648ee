//! Line-shape rules.
//!
//! Each rule is a pure predicate + extractor: it looks at one line and either
//! returns a structured [`Shape`] or `None`. The state machine tries the
//! continuation rules (only while collecting) and then the opening rules, in
//! the fixed order of [`CONTINUATION_RULES`] and [`OPENING_RULES`], and stops
//! at the first match.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{simple_name, ErrorKind, Level, RootCause};

/// Prefix of the normalised cause line stored in a stack trace.
pub const CAUSE_PREFIX: &str = "Caused by:";

// `<qualified.Type>Exception|Error|Failure: message` at column zero.
static THROW_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+\.)+\w*(Exception|Error|Failure):\s*(.*)").expect("valid regex")
});

static CAUSED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Caused by:\s*(\S+):\s*(.*)").expect("valid regex"));

static FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+at\s+(.+)").expect("valid regex"));

// `2026-02-05 10:00:00.000 ERROR 1234 --- [main] o.s.b.SpringApplication : body`
static LOG_RECORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}.*\s(ERROR|WARN)\s.*---\s+\[.*\]\s+\S+\s*:\s*(.*)")
        .expect("valid regex")
});

static EMBEDDED_EXCEPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+(?:Exception|Error)):\s*(.*)").expect("valid regex"));

static STARTUP_FAILED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"APPLICATION FAILED TO START").expect("valid regex"));

static PORT_IN_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Port\s+\d+\s+was already in use|Web server failed to start.*Port.*already in use")
        .expect("valid regex")
});

static PORT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Port\s+(\d+)\s+was already in use").expect("valid regex"));

static BEAN_CREATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Error creating bean with name '(\w+)'").expect("valid regex"));

static ROOT_CAUSE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]?\s*with root cause\s*$").expect("valid regex"));

/// Fields needed to open a new event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    pub kind: ErrorKind,
    pub full_type: String,
    pub message: String,
    pub level: Level,
}

/// Result of a matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// Indented `at ...` frame; carries the text after `at`.
    Frame(String),
    /// `Caused by: <type>: <message>`; `line` keeps the untrimmed message.
    Cause { cause: RootCause, line: String },
    /// Raw throw line at column zero.
    Throw(Opening),
    /// Structured log record announcing an error.
    Logged(Opening),
}

pub type Rule = fn(&str) -> Option<Shape>;

/// Rules that extend an open event, in priority order.
pub const CONTINUATION_RULES: [Rule; 2] = [match_frame, match_cause];

/// Rules that open a new event, in priority order.
pub const OPENING_RULES: [Rule; 2] = [match_throw, match_log_record];

/// Body extractors for a structured log record, in priority order.
const LOG_BODY_RULES: [fn(&LogRecord<'_>) -> Option<Opening>; 4] = [
    embedded_exception,
    startup_failure,
    port_in_use,
    bean_creation,
];

/// First matching rule of `rules`, if any.
pub fn first_match(rules: &[Rule], line: &str) -> Option<Shape> {
    rules.iter().find_map(|rule| rule(line))
}

pub fn match_frame(line: &str) -> Option<Shape> {
    let caps = FRAME.captures(line)?;
    Some(Shape::Frame(caps[1].to_string()))
}

pub fn match_cause(line: &str) -> Option<Shape> {
    let caps = CAUSED_BY.captures(line)?;
    let full_type = caps[1].to_string();
    let line = cause_line(&full_type, &caps[2]);
    Some(Shape::Cause {
        cause: RootCause {
            kind: ErrorKind::from_qualified(&full_type),
            full_type,
            message: caps[2].trim().to_string(),
        },
        line,
    })
}

pub fn match_throw(line: &str) -> Option<Shape> {
    let caps = THROW_LINE.captures(line)?;
    let whole = caps.get(0)?.as_str();
    let qualified = whole.split(':').next().unwrap_or(whole);
    Some(Shape::Throw(Opening {
        kind: ErrorKind::from_name(simple_name(qualified)),
        full_type: qualified.trim().to_string(),
        message: caps.get(3).map(|m| m.as_str().trim()).unwrap_or("").to_string(),
        level: Level::Error,
    }))
}

pub fn match_log_record(line: &str) -> Option<Shape> {
    let caps = LOG_RECORD.captures(line)?;
    let record = LogRecord {
        line,
        level: Level::from_token(&caps[1]),
        body: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
    };
    LOG_BODY_RULES
        .iter()
        .find_map(|rule| rule(&record))
        .map(Shape::Logged)
}

struct LogRecord<'a> {
    line: &'a str,
    level: Level,
    body: &'a str,
}

fn embedded_exception(record: &LogRecord<'_>) -> Option<Opening> {
    let caps = EMBEDDED_EXCEPTION.captures(record.body)?;
    let name = caps[1].to_string();
    Some(Opening {
        kind: ErrorKind::from_name(&name),
        full_type: name,
        message: normalize_message(caps.get(2).map(|m| m.as_str()).unwrap_or("")),
        level: record.level,
    })
}

fn startup_failure(record: &LogRecord<'_>) -> Option<Opening> {
    if !STARTUP_FAILED.is_match(record.line) {
        return None;
    }
    Some(Opening {
        kind: ErrorKind::ApplicationStartupFailure,
        full_type: "org.springframework.boot.ApplicationStartupFailure".to_string(),
        message: "APPLICATION FAILED TO START".to_string(),
        level: Level::Error,
    })
}

fn port_in_use(record: &LogRecord<'_>) -> Option<Opening> {
    if !PORT_IN_USE.is_match(record.line) {
        return None;
    }
    // "Web server failed to start. Port 8080 was already in use." matches the
    // second alternative first, so the number is looked up separately.
    let port = PORT_NUMBER
        .captures(record.line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");
    Some(Opening {
        kind: ErrorKind::PortInUse,
        full_type: "org.springframework.boot.web.server.PortInUseException".to_string(),
        message: format!("Port {} was already in use", port),
        level: Level::Error,
    })
}

fn bean_creation(record: &LogRecord<'_>) -> Option<Opening> {
    let caps = BEAN_CREATION.captures(record.line)?;
    Some(Opening {
        kind: ErrorKind::BeanCreation,
        full_type: "org.springframework.beans.factory.BeanCreationException".to_string(),
        message: format!("Error creating bean with name '{}'", &caps[1]),
        level: Level::Error,
    })
}

/// Strip the trailing `"] with root cause"` boilerplate Spring appends to
/// dispatcher error records, then trim.
pub fn normalize_message(message: &str) -> String {
    ROOT_CAUSE_SUFFIX.replace(message, "").trim().to_string()
}

/// Cause line as stored in a stack trace: prefix spacing normalised, the
/// message kept as captured.
pub fn cause_line(full_type: &str, raw_message: &str) -> String {
    format!("{} {}: {}", CAUSE_PREFIX, full_type, raw_message)
}
