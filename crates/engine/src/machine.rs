use chrono::{DateTime, Utc};

use crate::model::{ErrorEvent, RootCause};
use crate::rules::{self, Opening, Shape, CAUSE_PREFIX, CONTINUATION_RULES, OPENING_RULES};

/// Collection state of the reconstruction machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No open event.
    Idle,
    /// An event is open and accumulating frame/cause lines.
    Collecting,
}

enum LineAction {
    AppendFrame(String),
    AttachCause(RootCause, String),
    CloseAndOpen(Opening),
    ReplaceEcho(Opening),
    Close,
    Open(Opening),
    Discard,
}

/// Error reconstruction state machine.
///
/// Consumes one line at a time and stitches throw lines, structured error
/// records, indented frames and `Caused by:` chains into a single
/// [`ErrorEvent`]:
/// - Frames and causes extend the open event while collecting
/// - Any other line closes the open event before being classified itself
/// - A log-record echo of the same kind with no frames yet is replaced, not
///   emitted, when the raw throw for the same occurrence follows
/// - At most one event is open at any time
pub struct ErrorAssembler {
    open: Option<OpenEvent>,
    app_packages: Vec<String>,
    app_frame_limit: usize,
}

impl ErrorAssembler {
    pub fn new(app_packages: Vec<String>, app_frame_limit: usize) -> Self {
        Self {
            open: None,
            app_packages,
            app_frame_limit,
        }
    }

    pub fn state(&self) -> EngineState {
        if self.open.is_some() {
            EngineState::Collecting
        } else {
            EngineState::Idle
        }
    }

    /// The event currently being collected, with its stack so far.
    pub fn open_event(&self) -> Option<&ErrorEvent> {
        self.open.as_ref().map(|open| &open.event)
    }

    /// Process one line. Returns the event it closed, if any.
    ///
    /// `now` stamps a newly opened event.
    pub fn process(&mut self, line: &str, now: DateTime<Utc>) -> Option<ErrorEvent> {
        let action = self.decide(line);

        match action {
            LineAction::AppendFrame(frame) => {
                if let Some(ref mut open) = self.open {
                    open.push_frame(frame);
                }
                None
            }
            LineAction::AttachCause(cause, cause_line) => {
                if let Some(ref mut open) = self.open {
                    open.attach_cause(cause, cause_line);
                }
                None
            }
            LineAction::CloseAndOpen(opening) => {
                let closed = self.close();
                self.start(opening, line, now);
                closed
            }
            LineAction::ReplaceEcho(opening) => {
                if let Some(echo) = self.open.take() {
                    tracing::debug!(
                        kind = %echo.event.kind,
                        "reconstruct: replacing frameless echo with raw throw"
                    );
                }
                self.start(opening, line, now);
                None
            }
            LineAction::Close => self.close(),
            LineAction::Open(opening) => {
                self.start(opening, line, now);
                None
            }
            LineAction::Discard => None,
        }
    }

    /// Close and return the open event regardless of how complete it is.
    pub fn flush(&mut self) -> Option<ErrorEvent> {
        self.close()
    }

    fn decide(&self, line: &str) -> LineAction {
        if let Some(ref open) = self.open {
            match rules::first_match(&CONTINUATION_RULES, line) {
                Some(Shape::Frame(frame)) => return LineAction::AppendFrame(frame),
                Some(Shape::Cause { cause, line }) => return LineAction::AttachCause(cause, line),
                _ => {}
            }

            return match opening_of(line) {
                Some(opening) if open.is_echo_of(&opening) => LineAction::ReplaceEcho(opening),
                Some(opening) => LineAction::CloseAndOpen(opening),
                None => LineAction::Close,
            };
        }

        match opening_of(line) {
            Some(opening) => LineAction::Open(opening),
            None => LineAction::Discard,
        }
    }

    fn start(&mut self, opening: Opening, line: &str, now: DateTime<Utc>) {
        tracing::trace!(kind = %opening.kind, "reconstruct: event opened");
        self.open = Some(OpenEvent::new(opening, line, now));
    }

    fn close(&mut self) -> Option<ErrorEvent> {
        let open = self.open.take()?;
        let event = open.finish(&self.app_packages, self.app_frame_limit);
        tracing::trace!(
            kind = %event.kind,
            frames = event.stack_trace.len(),
            "reconstruct: event closed"
        );
        Some(event)
    }
}

fn opening_of(line: &str) -> Option<Opening> {
    match rules::first_match(&OPENING_RULES, line) {
        Some(Shape::Throw(opening)) | Some(Shape::Logged(opening)) => Some(opening),
        _ => None,
    }
}

struct OpenEvent {
    event: ErrorEvent,
    /// Index in `stack_trace` of the last cause line; lines from here on
    /// belong to the root cause.
    root_cause_at: Option<usize>,
}

impl OpenEvent {
    fn new(opening: Opening, line: &str, now: DateTime<Utc>) -> Self {
        Self {
            event: ErrorEvent {
                timestamp: now,
                kind: opening.kind,
                full_type: opening.full_type,
                message: opening.message,
                raw_line: line.to_string(),
                level: opening.level,
                root_cause: None,
                cause_chain: Vec::new(),
                stack_trace: Vec::new(),
                app_stack_trace: Vec::new(),
            },
            root_cause_at: None,
        }
    }

    /// Same kind and nothing collected yet.
    fn is_echo_of(&self, opening: &Opening) -> bool {
        self.event.kind == opening.kind && self.event.stack_trace.is_empty()
    }

    fn push_frame(&mut self, frame: String) {
        self.event.stack_trace.push(frame);
    }

    fn attach_cause(&mut self, cause: RootCause, line: String) {
        self.root_cause_at = Some(self.event.stack_trace.len());
        self.event.stack_trace.push(line);
        self.event.cause_chain.push(cause.clone());
        // Last one wins.
        self.event.root_cause = Some(cause);
    }

    fn finish(mut self, app_packages: &[String], limit: usize) -> ErrorEvent {
        let primary_end = self.root_cause_at.unwrap_or(self.event.stack_trace.len());
        self.event.app_stack_trace = self.event.stack_trace[..primary_end]
            .iter()
            .filter(|line| !line.starts_with(CAUSE_PREFIX))
            .filter(|line| is_app_frame(line, app_packages))
            .take(limit)
            .cloned()
            .collect();
        self.event
    }
}

fn is_app_frame(frame: &str, app_packages: &[String]) -> bool {
    app_packages
        .iter()
        .any(|pkg| !pkg.is_empty() && frame.contains(pkg.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;

    fn assembler() -> ErrorAssembler {
        ErrorAssembler::new(vec!["com.example".to_string()], 5)
    }

    fn run(lines: &[&str]) -> Vec<ErrorEvent> {
        let mut machine = assembler();
        let mut out = Vec::new();
        for line in lines {
            out.extend(machine.process(line, Utc::now()));
            assert_eq!(
                machine.state() == EngineState::Collecting,
                machine.open_event().is_some()
            );
        }
        out.extend(machine.flush());
        out
    }

    #[test]
    fn test_starts_idle() {
        let machine = assembler();
        assert_eq!(machine.state(), EngineState::Idle);
        assert!(machine.open_event().is_none());
    }

    #[test]
    fn test_root_cause_capture() {
        let events = run(&[
            "java.lang.RuntimeException: boom",
            "    at com.example.Foo.bar(Foo.java:10)",
            "Caused by: java.lang.NullPointerException: x is null",
            "    at com.example.Foo.baz(Foo.java:5)",
        ]);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.kind.as_str(), "RuntimeException");
        assert_eq!(event.full_type, "java.lang.RuntimeException");
        assert_eq!(event.message, "boom");
        let cause = event.root_cause.as_ref().unwrap();
        assert_eq!(cause.kind, ErrorKind::NullPointer);
        assert_eq!(cause.message, "x is null");
        assert_eq!(event.app_stack_trace, vec!["com.example.Foo.bar(Foo.java:10)"]);
        assert_eq!(
            event.stack_trace,
            vec![
                "com.example.Foo.bar(Foo.java:10)",
                "Caused by: java.lang.NullPointerException: x is null",
                "com.example.Foo.baz(Foo.java:5)",
            ]
        );
    }

    #[test]
    fn test_app_stack_trace_cap() {
        let mut lines = vec!["java.lang.IllegalStateException: too deep".to_string()];
        for i in 0..8 {
            lines.push(format!("    at com.example.Deep.level{}(Deep.java:{})", i, i));
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let events = run(&refs);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].stack_trace.len(), 8);
        assert_eq!(
            events[0].app_stack_trace,
            (0..5)
                .map(|i| format!("com.example.Deep.level{}(Deep.java:{})", i, i))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_library_frames_filtered() {
        let events = run(&[
            "java.lang.IllegalStateException: x",
            "\tat org.springframework.Foo.a(Foo.java:1)",
            "\tat com.example.Service.b(Service.java:2)",
            "\tat java.base/java.lang.Thread.run(Thread.java:833)",
        ]);
        assert_eq!(events[0].stack_trace.len(), 3);
        assert_eq!(events[0].app_stack_trace, vec!["com.example.Service.b(Service.java:2)"]);
    }

    #[test]
    fn test_last_cause_wins_and_chain_kept() {
        let events = run(&[
            "org.springframework.beans.factory.BeanCreationException: Error creating bean with name 'a'",
            "\tat com.example.A.init(A.java:1)",
            "Caused by: org.springframework.beans.factory.UnsatisfiedDependencyException: b",
            "\tat com.example.B.init(B.java:2)",
            "Caused by: java.net.ConnectException: Connection refused",
            "\tat com.example.C.connect(C.java:3)",
        ]);
        let event = &events[0];
        assert_eq!(event.root_cause.as_ref().unwrap().kind, ErrorKind::Connect);
        assert_eq!(event.cause_chain.len(), 2);
        assert_eq!(event.cause_chain[0].message, "b");
        // frames of intermediate causes stay eligible; the root cause's do not
        assert_eq!(
            event.app_stack_trace,
            vec!["com.example.A.init(A.java:1)", "com.example.B.init(B.java:2)"]
        );
    }

    #[test]
    fn test_plain_line_closes_event() {
        let mut machine = assembler();
        assert!(machine.process("java.lang.IllegalStateException: x", Utc::now()).is_none());
        assert!(machine.process("\tat com.example.A.b(A.java:1)", Utc::now()).is_none());
        let closed = machine.process("2026-02-05 INFO all good", Utc::now()).unwrap();
        assert_eq!(closed.stack_trace.len(), 1);
        assert_eq!(machine.state(), EngineState::Idle);
    }

    #[test]
    fn test_new_throw_closes_previous() {
        let events = run(&[
            "java.lang.IllegalStateException: first",
            "\tat com.example.A.b(A.java:1)",
            "java.lang.IllegalArgumentException: second",
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "first");
        assert_eq!(events[1].kind, ErrorKind::IllegalArgument);
    }

    #[test]
    fn test_same_kind_with_frames_is_not_merged() {
        let events = run(&[
            "java.lang.IllegalStateException: first",
            "\tat com.example.A.b(A.java:1)",
            "java.lang.IllegalStateException: second",
        ]);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_merge_on_duplicate_open() {
        let events = run(&[
            "2026-02-05 10:00:00.123 ERROR 1 --- [main] o.s.boot.SpringApplication : Error creating bean with name 'userService'",
            "org.springframework.beans.factory.BeanCreationException: Error creating bean with name 'userService': Unsatisfied dependency",
            "\tat com.example.App.main(App.java:10)",
        ]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ErrorKind::BeanCreation);
        assert!(events[0].raw_line.starts_with("org.springframework"));
        assert_eq!(events[0].stack_trace.len(), 1);
    }

    #[test]
    fn test_different_kind_echo_is_emitted() {
        let events = run(&[
            "2026-02-05 10:00:00.123 ERROR 1 --- [main] o.s.boot.SpringApplication : APPLICATION FAILED TO START",
            "java.lang.IllegalStateException: boom",
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ErrorKind::ApplicationStartupFailure);
    }

    #[test]
    fn test_frame_and_cause_ignored_while_idle() {
        let events = run(&[
            "\tat com.example.A.b(A.java:1)",
            "Caused by: java.lang.NullPointerException: x",
            "just text",
        ]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_flush_idempotent() {
        let mut machine = assembler();
        assert!(machine.flush().is_none());
        machine.process("java.lang.IllegalStateException: x", Utc::now());
        assert!(machine.flush().is_some());
        assert!(machine.flush().is_none());
    }

    #[test]
    fn test_timestamp_is_open_time() {
        let mut machine = assembler();
        let opened = Utc::now() - chrono::Duration::seconds(30);
        machine.process("java.lang.IllegalStateException: x", opened);
        machine.process("\tat com.example.A.b(A.java:1)", Utc::now());
        assert_eq!(machine.flush().unwrap().timestamp, opened);
    }

    #[test]
    fn test_level_from_record() {
        let events = run(&[
            "2026-02-05 10:00:00.123  WARN 1 --- [main] c.e.Client : java.net.ConnectException: Connection refused",
        ]);
        assert_eq!(events[0].level, crate::model::Level::Warn);
    }
}
