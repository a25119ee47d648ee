//! Rule-table classifier.
//!
//! Maps a finalised event to human-readable analysis and fix text. The
//! event's own kind is tried first, then its root cause's; when the root cause
//! is the one that matched, its kind and message become the subject the rule
//! reads from. Kinds without an entry get a generic fallback and
//! `matched: false`. Never fails.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::model::{ErrorEvent, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub analysis: String,
    pub suggested_fix: String,
    /// False when no rule covered the event or its root cause.
    pub matched: bool,
}

/// What a rule reads: either the event itself or its root cause.
struct Subject<'a> {
    kind: &'a ErrorKind,
    message: &'a str,
    event: &'a ErrorEvent,
}

struct Rule {
    analyze: fn(&Subject<'_>) -> String,
    suggest_fix: fn(&Subject<'_>) -> String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, event: &ErrorEvent) -> Classification {
        let mut subjects = vec![Subject {
            kind: &event.kind,
            message: &event.message,
            event,
        }];
        if let Some(ref cause) = event.root_cause {
            subjects.push(Subject {
                kind: &cause.kind,
                message: &cause.message,
                event,
            });
        }

        for subject in &subjects {
            if let Some(rule) = rule_for(subject.kind) {
                return Classification {
                    analysis: (rule.analyze)(subject),
                    suggested_fix: (rule.suggest_fix)(subject),
                    matched: true,
                };
            }
        }

        Classification {
            analysis: format!(
                "{} occurred.\n  Message: {}",
                event.kind,
                or_none(&event.message)
            ),
            suggested_fix: "No predefined analysis exists for this error.\n\
                Inspect the stack trace and review the code at the throwing location."
                .to_string(),
            matched: false,
        }
    }
}

fn rule_for(kind: &ErrorKind) -> Option<Rule> {
    let rule = match kind {
        ErrorKind::NullPointer => Rule {
            analyze: analyze_null_pointer,
            suggest_fix: |_| FIX_NULL_POINTER.to_string(),
        },
        ErrorKind::ArrayIndexOutOfBounds => Rule {
            analyze: analyze_array_index,
            suggest_fix: |_| FIX_ARRAY_INDEX.to_string(),
        },
        ErrorKind::IllegalArgument => Rule {
            analyze: |s| {
                format!(
                    "An invalid argument was passed to a method.\n  Message: {}",
                    or_none(s.message)
                )
            },
            suggest_fix: |_| FIX_ILLEGAL_ARGUMENT.to_string(),
        },
        ErrorKind::NumberFormat => Rule {
            analyze: analyze_number_format,
            suggest_fix: |_| FIX_NUMBER_FORMAT.to_string(),
        },
        ErrorKind::StackOverflow => Rule {
            analyze: analyze_stack_overflow,
            suggest_fix: |_| FIX_STACK_OVERFLOW.to_string(),
        },
        ErrorKind::ClassCast => Rule {
            analyze: analyze_class_cast,
            suggest_fix: |_| FIX_CLASS_CAST.to_string(),
        },
        ErrorKind::BeanCreation => Rule {
            analyze: analyze_bean_creation,
            suggest_fix: |_| FIX_BEAN_CREATION.to_string(),
        },
        ErrorKind::PortInUse => Rule {
            analyze: analyze_port_in_use,
            suggest_fix: suggest_port_fix,
        },
        ErrorKind::Connect => Rule {
            analyze: |s| {
                format!(
                    "Failed to connect to an external service.\n  Message: {}\n  \
                     Check that the database, Redis or remote API is running.",
                    or_none(s.message)
                )
            },
            suggest_fix: |_| FIX_CONNECT.to_string(),
        },
        ErrorKind::HttpMessageNotReadable => Rule {
            analyze: |s| {
                format!(
                    "The request body could not be read.\n  \
                     The JSON is malformed or a field has the wrong type.\n  Message: {}",
                    s.message
                )
            },
            suggest_fix: |_| FIX_MESSAGE_NOT_READABLE.to_string(),
        },
        ErrorKind::HttpRequestMethodNotSupported => Rule {
            analyze: analyze_method_not_supported,
            suggest_fix: |_| FIX_METHOD_NOT_SUPPORTED.to_string(),
        },
        ErrorKind::NoHandlerFound => Rule {
            analyze: |s| {
                format!(
                    "No handler (controller method) is mapped to the requested URL.\n  Message: {}",
                    s.message
                )
            },
            suggest_fix: |_| FIX_NO_HANDLER.to_string(),
        },
        ErrorKind::SqlSyntax => Rule {
            analyze: |s| {
                format!(
                    "The SQL statement has a syntax error.\n  Message: {}\n  \
                     The query or the JPA/Hibernate mapping is likely wrong.",
                    s.message
                )
            },
            suggest_fix: |_| FIX_SQL_SYNTAX.to_string(),
        },
        ErrorKind::ApplicationStartupFailure => Rule {
            analyze: |_| {
                "The Spring Boot application failed to start.\n  \
                 Look for the root cause in the log lines below."
                    .to_string()
            },
            suggest_fix: |_| FIX_STARTUP.to_string(),
        },
        ErrorKind::OutOfMemory | ErrorKind::Other(_) => return None,
    };
    Some(rule)
}

fn or_none(message: &str) -> &str {
    if message.is_empty() {
        "(none)"
    } else {
        message
    }
}

// ── Message detail extraction ───────────────────────────────────

static NPE_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Cannot invoke "(.+?)""#).expect("valid regex"));
static NPE_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"because "(.+?)" is null"#).expect("valid regex"));
static NPE_RETURN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"because the return value of "(.+?)" is null"#).expect("valid regex")
});
static INDEX_BOUNDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Index (\d+) out of bounds for length (\d+)").expect("valid regex")
});
static INPUT_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"For input string: "(.+?)""#).expect("valid regex"));
static CAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"class (.+?) cannot be cast to class (.+?)(?:\s|$)").expect("valid regex")
});
static BEAN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bean with name '(\w+)'").expect("valid regex"));
static PORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Port\s+(\d+)").expect("valid regex"));
static HTTP_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Request method '(\w+)' is not supported").expect("valid regex")
});
static FRAME_ARGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*\)").expect("valid regex"));

fn capture<'a>(re: &Regex, text: &'a str, group: usize) -> Option<&'a str> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str())
}

fn analyze_null_pointer(s: &Subject<'_>) -> String {
    let mut analysis =
        String::from("A method was called or a field accessed on a null reference.");
    if let Some(var) = capture(&NPE_VARIABLE, s.message, 1) {
        analysis.push_str(&format!("\n  Variable \"{}\" is null.", var));
    }
    if let Some(method) = capture(&NPE_METHOD, s.message, 1) {
        analysis.push_str(&format!("\n  Method being invoked: {}", method));
    }
    if let Some(call) = capture(&NPE_RETURN, s.message, 1) {
        analysis.push_str(&format!("\n  The return value of \"{}\" is null.", call));
    }
    analysis
}

fn analyze_array_index(s: &Subject<'_>) -> String {
    let Some(caps) = INDEX_BOUNDS.captures(s.message) else {
        return "An array was accessed with an index outside its bounds.".to_string();
    };
    let index = &caps[1];
    let length: u64 = caps[2].parse().unwrap_or(0);
    let range = if length == 0 {
        "none (the array is empty)".to_string()
    } else {
        format!("0 ~ {}", length - 1)
    };
    format!(
        "Array index out of range: index {} was accessed on an array of length {}.\n  Valid index range: {}",
        index, length, range
    )
}

fn analyze_number_format(s: &Subject<'_>) -> String {
    match capture(&INPUT_STRING, s.message, 1) {
        Some(input) => format!(
            "The string \"{}\" cannot be converted to a number.\n  It contains non-numeric characters.",
            input
        ),
        None => "A string that is not a number was parsed as one.".to_string(),
    }
}

fn analyze_stack_overflow(s: &Subject<'_>) -> String {
    let recursive = repeated_methods(&s.event.stack_trace);
    if recursive.is_empty() {
        return "Stack overflow. Unbounded recursion or an excessively deep call chain is the likely cause."
            .to_string();
    }
    format!(
        "Infinite recursion detected.\n  Repeatedly called methods: {}",
        recursive.join(", ")
    )
}

/// Methods appearing more than 3 times within the first 50 stack lines,
/// in first-seen order.
fn repeated_methods(stack_trace: &[String]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();
    for line in stack_trace.iter().take(50) {
        let method = FRAME_ARGS.replace(line, "").trim().to_string();
        let count = counts.entry(method.clone()).or_insert(0);
        if *count == 0 {
            order.push(method);
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter(|method| counts.get(method).copied().unwrap_or(0) > 3)
        .collect()
}

fn analyze_class_cast(s: &Subject<'_>) -> String {
    match CAST.captures(s.message) {
        Some(caps) => format!(
            "Type cast failed: \"{}\" cannot be converted to \"{}\".",
            &caps[1], &caps[2]
        ),
        None => "An object was cast to an incompatible type.".to_string(),
    }
}

fn analyze_bean_creation(s: &Subject<'_>) -> String {
    let mut analysis = String::from("An error occurred while creating a Spring bean.");
    if let Some(bean) = capture(&BEAN_NAME, s.message, 1) {
        analysis.push_str(&format!("\n  Failing bean: {}", bean));
    }
    if let Some(ref cause) = s.event.root_cause {
        analysis.push_str(&format!("\n  Root cause: {} - {}", cause.kind, cause.message));
    }
    analysis
}

fn analyze_port_in_use(s: &Subject<'_>) -> String {
    let port = capture(&PORT, s.message, 1).unwrap_or("(unknown)");
    format!(
        "Port {} is already in use.\n  Another process is holding the port.",
        port
    )
}

fn suggest_port_fix(s: &Subject<'_>) -> String {
    let port = capture(&PORT, s.message, 1).unwrap_or("8080");
    format!(
        "1. Stop the process holding the port:\n   \
         Windows: netstat -ano | findstr :{port} -> taskkill /PID <PID> /F\n   \
         Linux/Mac: lsof -i :{port} -> kill -9 <PID>\n\
         2. Use a different port in application.properties:\n   \
         server.port=8081\n\
         3. Make sure no earlier Spring Boot instance is still running."
    )
}

fn analyze_method_not_supported(s: &Subject<'_>) -> String {
    match capture(&HTTP_METHOD, s.message, 1) {
        Some(method) => format!("HTTP method '{}' is not supported by this endpoint.", method),
        None => "The request used an HTTP method the endpoint does not support.".to_string(),
    }
}

// ── Fix text ────────────────────────────────────────────────────

const FIX_NULL_POINTER: &str = "\
1. Add a null check before using the value:
   if (obj != null) { obj.method(); }
2. Use Optional:
   Optional.ofNullable(obj).ifPresent(o -> o.method());
3. Fail fast with Objects.requireNonNull():
   Objects.requireNonNull(obj, \"obj must not be null\");
4. Use @NonNull annotations to catch it at compile time.";

const FIX_ARRAY_INDEX: &str = "\
1. Check the index range before access:
   if (index >= 0 && index < array.length) { ... }
2. Consider a for-each loop:
   for (var item : array) { ... }
3. For Lists, consider streams instead of get().
4. Verify hard-coded indices match the array size.";

const FIX_ILLEGAL_ARGUMENT: &str = "\
1. Validate argument values before the call.
2. Check the accepted argument range in the API documentation.
3. Add validation to @RequestParam and @PathVariable parameters.
4. Add precondition checks at the method entry:
   if (age < 0) throw new IllegalArgumentException(\"Age cannot be negative\");";

const FIX_NUMBER_FORMAT: &str = "\
1. Validate the string is numeric before parsing:
   if (str.matches(\"-?\\\\d+\")) { Integer.parseInt(str); }
2. Wrap the parse in try-catch:
   try { int n = Integer.parseInt(str); } catch (NumberFormatException e) { ... }
3. Give @RequestParam a defaultValue:
   @RequestParam(defaultValue = \"0\") int value
4. Use Spring Validation (@Min, @Max).";

const FIX_STACK_OVERFLOW: &str = "\
1. Add a termination condition (base case) to the recursive method.
2. Convert the recursion into iteration.
3. Check the data structures for circular references.
4. Prevent circular entity serialisation with @JsonIgnore and similar.";

const FIX_CLASS_CAST: &str = "\
1. Check the type with instanceof first:
   if (obj instanceof TargetType t) { t.method(); }
2. Use generics instead of raw types.
3. Trace the data flow to find where an unexpected type came in.
4. Check the JSON deserialisation settings.";

const FIX_BEAN_CREATION: &str = "\
1. Confirm every dependency of the bean can be injected.
2. Check the class carries @Component, @Service or a similar stereotype.
3. Check the package is inside the @ComponentScan range.
4. Check a bean matching each constructor parameter type exists.
5. For circular dependencies, consider @Lazy.";

const FIX_CONNECT: &str = "\
1. Check the target service (DB, Redis, ...) is running.
2. Check host and port in application.properties.
3. Check firewall and network settings.
4. Try raising the connection timeout.";

const FIX_MESSAGE_NOT_READABLE: &str = "\
1. Check the request JSON is well formed (quotes, commas).
2. Check the Content-Type header is application/json.
3. Check JSON field names match the DTO fields.
4. Check numeric fields are not sent as strings.";

const FIX_METHOD_NOT_SUPPORTED: &str = "\
1. Check the request's HTTP method (GET/POST/PUT/DELETE).
2. Check the controller's @GetMapping, @PostMapping, ... annotations.
3. Check the API documentation for the right method.";

const FIX_NO_HANDLER: &str = "\
1. Check the request URL for typos.
2. Check the controller's @RequestMapping path.
3. Check the class carries @RestController.
4. Check the controller package is inside the @ComponentScan range.";

const FIX_SQL_SYNTAX: &str = "\
1. Run the SQL directly in a database client.
2. Check the JPQL / nativeQuery of @Query annotations.
3. Check the @Table and @Column mappings of the entity.
4. Set spring.jpa.show-sql=true to see the executed SQL.";

const FIX_STARTUP: &str = "\
1. Check for dependency conflicts (mvn dependency:tree).
2. Check the values in application.properties.
3. Check the database connection settings.
4. Check required external services (DB, Redis, ...) are running.
5. Check the Java version matches the project's requirement.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Level, RootCause};
    use chrono::Utc;

    fn event(kind: &str, message: &str) -> ErrorEvent {
        ErrorEvent {
            timestamp: Utc::now(),
            kind: ErrorKind::from_name(kind),
            full_type: kind.to_string(),
            message: message.to_string(),
            raw_line: String::new(),
            level: Level::Error,
            root_cause: None,
            cause_chain: Vec::new(),
            stack_trace: Vec::new(),
            app_stack_trace: Vec::new(),
        }
    }

    fn with_cause(mut event: ErrorEvent, kind: &str, message: &str) -> ErrorEvent {
        let cause = RootCause {
            kind: ErrorKind::from_name(kind),
            full_type: kind.to_string(),
            message: message.to_string(),
        };
        event.cause_chain.push(cause.clone());
        event.root_cause = Some(cause);
        event
    }

    #[test]
    fn test_helpful_npe_message() {
        let result = Classifier::new().classify(&event(
            "NullPointerException",
            "Cannot invoke \"String.length()\" because \"name\" is null",
        ));
        assert!(result.matched);
        assert!(result.analysis.contains("Variable \"name\" is null"));
        assert!(result.analysis.contains("String.length()"));
        assert!(result.suggested_fix.contains("Optional"));
    }

    #[test]
    fn test_root_cause_used_when_primary_unknown() {
        let e = with_cause(
            event("RuntimeException", "boom"),
            "NumberFormatException",
            "For input string: \"abc\"",
        );
        let result = Classifier::new().classify(&e);
        assert!(result.matched);
        assert!(result.analysis.contains("\"abc\""));
    }

    #[test]
    fn test_primary_kind_preferred_over_root_cause() {
        let e = with_cause(
            event("BeanCreationException", "Error creating bean with name 'userService'"),
            "ConnectException",
            "Connection refused",
        );
        let result = Classifier::new().classify(&e);
        assert!(result.analysis.contains("Failing bean: userService"));
        assert!(result.analysis.contains("Root cause: ConnectException - Connection refused"));
    }

    #[test]
    fn test_unmatched_fallback() {
        let result = Classifier::new().classify(&event("RuntimeException", ""));
        assert!(!result.matched);
        assert!(result.analysis.starts_with("RuntimeException occurred."));
        assert!(result.analysis.contains("(none)"));
    }

    #[test]
    fn test_out_of_memory_has_no_rule() {
        let result = Classifier::new().classify(&event("OutOfMemoryError", "Java heap space"));
        assert!(!result.matched);
    }

    #[test]
    fn test_array_index_range() {
        let result = Classifier::new().classify(&event(
            "ArrayIndexOutOfBoundsException",
            "Index 5 out of bounds for length 3",
        ));
        assert!(result.analysis.contains("Valid index range: 0 ~ 2"));
    }

    #[test]
    fn test_array_index_empty_array() {
        let result = Classifier::new().classify(&event(
            "ArrayIndexOutOfBoundsException",
            "Index 0 out of bounds for length 0",
        ));
        assert!(result.analysis.contains("the array is empty"));
    }

    #[test]
    fn test_port_fix_uses_port() {
        let result = Classifier::new().classify(&event("PortInUseException", "Port 9090 was already in use"));
        assert!(result.analysis.contains("Port 9090"));
        assert!(result.suggested_fix.contains("lsof -i :9090"));

        let result = Classifier::new().classify(&event("PortInUseException", "Port  was already in use"));
        assert!(result.analysis.contains("(unknown)"));
        assert!(result.suggested_fix.contains(":8080"));
    }

    #[test]
    fn test_stack_overflow_recursion() {
        let mut e = event("StackOverflowError", "");
        for _ in 0..6 {
            e.stack_trace.push("com.example.Tree.walk(Tree.java:12)".to_string());
            e.stack_trace.push("com.example.Tree.visit(Tree.java:20)".to_string());
        }
        e.stack_trace.push("com.example.App.main(App.java:3)".to_string());
        let result = Classifier::new().classify(&e);
        assert!(result.analysis.contains("com.example.Tree.walk, com.example.Tree.visit"));
        assert!(!result.analysis.contains("App.main"));
    }

    #[test]
    fn test_stack_overflow_without_recursion() {
        let result = Classifier::new().classify(&event("StackOverflowError", ""));
        assert!(result.analysis.starts_with("Stack overflow."));
    }

    #[test]
    fn test_class_cast_detail() {
        let result = Classifier::new().classify(&event(
            "ClassCastException",
            "class java.lang.String cannot be cast to class java.lang.Integer (java.lang.String is in module java.base)",
        ));
        assert!(result.analysis.contains("\"java.lang.String\" cannot be converted to \"java.lang.Integer\""));
    }

    #[test]
    fn test_http_method_detail() {
        let result = Classifier::new().classify(&event(
            "HttpRequestMethodNotSupportedException",
            "Request method 'DELETE' is not supported",
        ));
        assert!(result.analysis.contains("'DELETE'"));
    }
}
