use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Kind used when a qualified name yields no usable simple name.
pub const UNKNOWN_KIND: &str = "UnknownException";

/// Classification key of an error event.
///
/// Known kinds carry rule-table entries in [`crate::classify`]; everything
/// else lands in [`ErrorKind::Other`] with its simple class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullPointer,
    ArrayIndexOutOfBounds,
    IllegalArgument,
    NumberFormat,
    StackOverflow,
    OutOfMemory,
    ClassCast,
    BeanCreation,
    PortInUse,
    Connect,
    HttpMessageNotReadable,
    HttpRequestMethodNotSupported,
    NoHandlerFound,
    SqlSyntax,
    ApplicationStartupFailure,
    Other(String),
}

impl ErrorKind {
    /// Map a simple class name to a kind. Empty names fall back to
    /// [`UNKNOWN_KIND`], so the resulting key is never empty.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "NullPointerException" => ErrorKind::NullPointer,
            "ArrayIndexOutOfBoundsException" => ErrorKind::ArrayIndexOutOfBounds,
            "IllegalArgumentException" => ErrorKind::IllegalArgument,
            "NumberFormatException" => ErrorKind::NumberFormat,
            "StackOverflowError" => ErrorKind::StackOverflow,
            "OutOfMemoryError" => ErrorKind::OutOfMemory,
            "ClassCastException" => ErrorKind::ClassCast,
            "BeanCreationException" => ErrorKind::BeanCreation,
            "PortInUseException" => ErrorKind::PortInUse,
            "ConnectException" => ErrorKind::Connect,
            "HttpMessageNotReadableException" => ErrorKind::HttpMessageNotReadable,
            "HttpRequestMethodNotSupportedException" => ErrorKind::HttpRequestMethodNotSupported,
            "NoHandlerFoundException" => ErrorKind::NoHandlerFound,
            "SQLSyntaxErrorException" => ErrorKind::SqlSyntax,
            "ApplicationStartupFailure" => ErrorKind::ApplicationStartupFailure,
            "" => ErrorKind::Other(UNKNOWN_KIND.to_string()),
            other => ErrorKind::Other(other.to_string()),
        }
    }

    /// Map a fully-qualified class name to a kind via its simple name.
    pub fn from_qualified(fqcn: &str) -> Self {
        Self::from_name(simple_name(fqcn))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorKind::NullPointer => "NullPointerException",
            ErrorKind::ArrayIndexOutOfBounds => "ArrayIndexOutOfBoundsException",
            ErrorKind::IllegalArgument => "IllegalArgumentException",
            ErrorKind::NumberFormat => "NumberFormatException",
            ErrorKind::StackOverflow => "StackOverflowError",
            ErrorKind::OutOfMemory => "OutOfMemoryError",
            ErrorKind::ClassCast => "ClassCastException",
            ErrorKind::BeanCreation => "BeanCreationException",
            ErrorKind::PortInUse => "PortInUseException",
            ErrorKind::Connect => "ConnectException",
            ErrorKind::HttpMessageNotReadable => "HttpMessageNotReadableException",
            ErrorKind::HttpRequestMethodNotSupported => "HttpRequestMethodNotSupportedException",
            ErrorKind::NoHandlerFound => "NoHandlerFoundException",
            ErrorKind::SqlSyntax => "SQLSyntaxErrorException",
            ErrorKind::ApplicationStartupFailure => "ApplicationStartupFailure",
            ErrorKind::Other(name) => name,
        }
    }

    /// Kinds rendered with CRITICAL severity.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ErrorKind::StackOverflow
                | ErrorKind::OutOfMemory
                | ErrorKind::ApplicationStartupFailure
                | ErrorKind::PortInUse
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Last `.`-separated segment of a qualified class name.
///
/// `java.lang.NullPointerException` → `NullPointerException`.
/// Blank input yields [`UNKNOWN_KIND`].
pub fn simple_name(fqcn: &str) -> &str {
    let trimmed = fqcn.trim();
    if trimmed.is_empty() {
        return UNKNOWN_KIND;
    }
    match trimmed.rsplit('.').next() {
        Some(last) if !last.is_empty() => last,
        _ => trimmed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    #[default]
    Error,
    Warn,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
        }
    }

    /// Parse a captured level token; anything but `WARN` is treated as `ERROR`.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("WARN") {
            Level::Warn
        } else {
            Level::Error
        }
    }
}

/// Secondary error nested under the primary via a `Caused by:` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCause {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub full_type: String,
    pub message: String,
}

/// One reconstructed occurrence of an exceptional condition.
///
/// Immutable once handed to an [`crate::EventSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    /// When the record was opened, not when it was emitted.
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub full_type: String,
    pub message: String,
    pub raw_line: String,
    pub level: Level,
    /// Last `Caused by:` seen while collecting.
    pub root_cause: Option<RootCause>,
    /// Every `Caused by:` seen while collecting, in encounter order.
    pub cause_chain: Vec<RootCause>,
    /// Frame and cause lines after the triggering line, in encounter order.
    pub stack_trace: Vec<String>,
    /// Application frames drawn from `stack_trace`, capped.
    pub app_stack_trace: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("java.lang.NullPointerException"), "NullPointerException");
        assert_eq!(simple_name("  RuntimeException "), "RuntimeException");
        assert_eq!(simple_name(""), UNKNOWN_KIND);
        assert_eq!(simple_name("   "), UNKNOWN_KIND);
        assert_eq!(simple_name("com.example."), "com.example.");
    }

    #[test]
    fn test_known_kinds_round_trip_name() {
        let kind = ErrorKind::from_qualified("org.springframework.beans.factory.BeanCreationException");
        assert_eq!(kind, ErrorKind::BeanCreation);
        assert_eq!(kind.as_str(), "BeanCreationException");
        assert_eq!(ErrorKind::from_name("SQLSyntaxErrorException"), ErrorKind::SqlSyntax);
    }

    #[test]
    fn test_unknown_kind_keeps_name() {
        let kind = ErrorKind::from_qualified("java.lang.RuntimeException");
        assert_eq!(kind, ErrorKind::Other("RuntimeException".to_string()));
        assert_eq!(kind.to_string(), "RuntimeException");
    }

    #[test]
    fn test_empty_name_falls_back() {
        assert_eq!(ErrorKind::from_name("").as_str(), UNKNOWN_KIND);
    }

    #[test]
    fn test_critical_kinds() {
        assert!(ErrorKind::PortInUse.is_critical());
        assert!(ErrorKind::OutOfMemory.is_critical());
        assert!(!ErrorKind::NullPointer.is_critical());
        assert!(!ErrorKind::Other("RuntimeException".into()).is_critical());
    }

    #[test]
    fn test_level_from_token() {
        assert_eq!(Level::from_token("WARN"), Level::Warn);
        assert_eq!(Level::from_token("ERROR"), Level::Error);
        assert_eq!(Level::default().as_str(), "ERROR");
    }

    #[test]
    fn test_event_serializes_type_key() {
        let event = ErrorEvent {
            timestamp: Utc::now(),
            kind: ErrorKind::NullPointer,
            full_type: "java.lang.NullPointerException".into(),
            message: "x".into(),
            raw_line: "java.lang.NullPointerException: x".into(),
            level: Level::Error,
            root_cause: None,
            cause_chain: Vec::new(),
            stack_trace: Vec::new(),
            app_stack_trace: Vec::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "NullPointerException");
        assert_eq!(json["fullType"], "java.lang.NullPointerException");
        assert_eq!(json["level"], "ERROR");
        assert!(json["rootCause"].is_null());
    }
}
