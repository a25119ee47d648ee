//! CLI — argument parsing for the two run modes.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "detector")]
#[command(version)]
#[command(about = "Detect and analyse runtime errors in Spring Boot output", long_about = None)]
pub struct Cli {
    /// Tail a log file instead of running a command
    #[arg(short, long, value_name = "FILE", conflicts_with = "command")]
    pub watch: Option<PathBuf>,

    /// Command to run and monitor
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// What a session monitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Command line to spawn; split on whitespace when started.
    Command(String),
    /// Log file to tail.
    Watch(PathBuf),
}

impl Cli {
    /// The selected run mode, or `None` when no arguments were given.
    pub fn target(&self) -> Option<Target> {
        if let Some(ref path) = self.watch {
            return Some(Target::Watch(path.clone()));
        }
        let command = self.command.join(" ");
        if command.trim().is_empty() {
            None
        } else {
            Some(Target::Command(command))
        }
    }
}

pub fn usage() -> &'static str {
    "\
Spring Boot Error Auto-Detector

Usage:
  detector \"./mvnw spring-boot:run\"     run a command and monitor its output
  detector \"mvnw.cmd spring-boot:run\"   same, on Windows
  detector --watch logs/app.log         monitor a log file

Environment:
  ANTHROPIC_API_KEY       enables secondary AI analysis
  DETECTOR_CONFIG_FILE    config file path (default: detector.toml)"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("detector").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_quoted_command() {
        let cli = parse(&["./mvnw spring-boot:run"]);
        assert_eq!(
            cli.target(),
            Some(Target::Command("./mvnw spring-boot:run".to_string()))
        );
    }

    #[test]
    fn test_unquoted_command_with_flags() {
        let cli = parse(&["java", "-jar", "app.jar"]);
        assert_eq!(cli.target(), Some(Target::Command("java -jar app.jar".to_string())));
    }

    #[test]
    fn test_watch() {
        let cli = parse(&["--watch", "logs/app.log"]);
        assert_eq!(cli.target(), Some(Target::Watch(PathBuf::from("logs/app.log"))));
    }

    #[test]
    fn test_no_arguments() {
        assert_eq!(parse(&[]).target(), None);
    }

    #[test]
    fn test_watch_requires_file() {
        assert!(Cli::try_parse_from(["detector", "--watch"]).is_err());
    }
}
