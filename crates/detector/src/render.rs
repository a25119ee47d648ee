//! Render — coloured terminal blocks for events, status and summaries.
//!
//! Every block is built as a `String` first so it can be tested with the
//! colour codes stripped; the `print_*` methods only write it out.

use std::path::Path;

use chrono::Local;
use engine::{Classification, ErrorEvent};
use owo_colors::OwoColorize;

use crate::analyzer::AiAnalysis;
use crate::cli::Target;

const SEPARATOR: &str = "════════════════════════════════════════════════════════════";
const THIN_SEP: &str = "────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_event(&self, event: &ErrorEvent, classification: &Classification) -> String {
        let critical = event.kind.is_critical();
        let severity = if critical { " CRITICAL " } else { " ERROR " };
        let severity = if critical {
            severity.on_red().white().bold().to_string()
        } else {
            severity.red().bold().to_string()
        };
        let source = if classification.matched {
            "PATTERN MATCH"
        } else {
            "BASIC ANALYSIS"
        };
        let title = format!("  SPRING BOOT ERROR DETECTOR  [{}]  ", source);
        let time = event
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        let mut out = vec![
            String::new(),
            SEPARATOR.red().to_string(),
            if critical {
                title.on_red().white().bold().to_string()
            } else {
                title.red().bold().to_string()
            },
            SEPARATOR.red().to_string(),
            String::new(),
            format!("  {}      : {}", "TYPE".white().bold(), event.kind.red().bold()),
            format!("  {}      : {}", "TIME".white().bold(), time.bright_black()),
            format!("  {}     : {}", "LEVEL".white().bold(), severity),
        ];

        if !event.message.is_empty() {
            section(&mut out, "MESSAGE");
            out.push(format!("  {}", event.message.yellow()));
        }

        section(&mut out, "ANALYSIS");
        out.extend(classification.analysis.lines().map(|l| format!("  {}", l.cyan())));

        if !classification.suggested_fix.is_empty() {
            section(&mut out, "SUGGESTED FIX");
            out.extend(
                classification
                    .suggested_fix
                    .lines()
                    .map(|l| format!("  {}", l.green())),
            );
        }

        if let Some(ref cause) = event.root_cause {
            section(&mut out, "ROOT CAUSE");
            out.push(format!("  {}: {}", cause.kind.red(), cause.message.yellow()));
        }

        if !event.app_stack_trace.is_empty() {
            section(&mut out, "APP STACK TRACE");
            out.extend(
                event
                    .app_stack_trace
                    .iter()
                    .map(|frame| format!("  {}", format!("at {}", frame).bright_black())),
            );
        }

        out.push(String::new());
        out.push(SEPARATOR.red().to_string());
        out.push(String::new());
        out.join("\n")
    }

    pub fn render_ai_analysis(&self, result: &AiAnalysis) -> String {
        let mut out = vec![
            String::new(),
            THIN_SEP.magenta().to_string(),
            "  AI ANALYSIS (Claude)".magenta().bold().to_string(),
            THIN_SEP.magenta().to_string(),
            String::new(),
            format!("  {}", "ANALYSIS".white().bold()),
        ];
        out.extend(result.analysis.lines().map(|l| format!("  {}", l.cyan())));

        if !result.suggested_fix.is_empty() {
            out.push(String::new());
            out.push(format!("  {}", "AI SUGGESTED FIX".white().bold()));
            out.extend(result.suggested_fix.lines().map(|l| format!("  {}", l.green())));
        }

        out.push(String::new());
        out.push(THIN_SEP.magenta().to_string());
        out.push(String::new());
        out.join("\n")
    }

    pub fn render_banner(&self) -> String {
        [
            String::new(),
            SEPARATOR.cyan().to_string(),
            "  Spring Boot Error Auto-Detector".cyan().bold().to_string(),
            "  Detects and analyses runtime errors automatically.".bright_black().to_string(),
            SEPARATOR.cyan().to_string(),
            String::new(),
        ]
        .join("\n")
    }

    pub fn render_status(&self, target: &Target, analyzer_enabled: bool) -> String {
        let target_line = match target {
            Target::Command(command) => format!("  Command      : {}", command),
            Target::Watch(path) => format!("  Watching log : {}", path.display()),
        };
        let analyzer = if analyzer_enabled {
            "enabled".green().to_string()
        } else {
            "disabled (ANTHROPIC_API_KEY not set)".yellow().to_string()
        };
        let started = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        [
            target_line.bright_black().to_string(),
            format!("{}{}", "  AI analysis  : ".bright_black(), analyzer),
            format!("  Started at   : {}", started).bright_black().to_string(),
            String::new(),
        ]
        .join("\n")
    }

    pub fn render_summary(&self, error_count: u64) -> String {
        let verdict = if error_count == 0 {
            "  No errors detected".green().bold().to_string()
        } else {
            format!("  {} error(s) detected in total.", error_count)
                .red()
                .bold()
                .to_string()
        };
        [
            String::new(),
            THIN_SEP.cyan().to_string(),
            verdict,
            THIN_SEP.cyan().to_string(),
            String::new(),
        ]
        .join("\n")
    }

    pub fn print_event(&self, event: &ErrorEvent, classification: &Classification) {
        println!("{}", self.render_event(event, classification));
    }

    pub fn print_ai_analysis(&self, result: &AiAnalysis) {
        println!("{}", self.render_ai_analysis(result));
    }

    pub fn print_banner(&self) {
        println!("{}", self.render_banner());
    }

    pub fn print_status(&self, target: &Target, analyzer_enabled: bool) {
        println!("{}", self.render_status(target, analyzer_enabled));
    }

    pub fn print_summary(&self, error_count: u64) {
        println!("{}", self.render_summary(error_count));
    }

    pub fn print_exit_code(&self, code: i32) {
        eprintln!("{}", format!("Process exited with code {}.", code).red());
    }

    pub fn print_waiting_for_file(&self, path: &Path) {
        println!("  Waiting for log file: {}", path.display());
        println!("  Monitoring starts automatically once the file appears...\n");
    }

    pub fn print_watch_started(&self, existing_lines: usize) {
        println!(
            "  Analysed {} existing line(s). Watching for new output...\n",
            existing_lines
        );
    }
}

fn section(out: &mut Vec<String>, title: &str) {
    out.push(String::new());
    out.push(THIN_SEP.bright_black().to_string());
    out.push(format!("  {}", title.white().bold()));
}
