// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use crate::config::ConfigError;
use crate::error::BootstrapError;

const ANSI_RED: &str = "\x1b[31m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Write a value to a provided writer.
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str, hint: Option<&str>) {
    let mut err = io::stderr().lock();
    let rendered = render_error(format, code, message, hint, io::stderr().is_terminal());
    let _ = writeln!(err, "{rendered}");
}

/// Print a command failure with its stable code and, when known, a hint.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, hint) = classify(error);
    print_error(format, code, &format!("{error:#}"), hint.as_deref());
}

fn classify(error: &anyhow::Error) -> (&'static str, Option<String>) {
    for cause in error.chain() {
        if let Some(bootstrap_err) = cause.downcast_ref::<BootstrapError>() {
            return (bootstrap_err.code(), bootstrap_err.hint());
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return (
                "CONFIG_INVALID",
                Some("Check the file passed with --config or INFLUXBOOT_CONFIG.".to_string()),
            );
        }
    }
    ("ERROR", None)
}

fn render_error(
    format: OutputFormat,
    code: &str,
    message: &str,
    hint: Option<&str>,
    is_tty: bool,
) -> String {
    match format {
        OutputFormat::Human => {
            let mut line = if is_tty {
                format!("{ANSI_RED}error:{ANSI_RESET} {message}")
            } else {
                format!("error: {message}")
            };
            if let Some(hint) = hint {
                line.push_str(&format!("\n  hint: {hint}"));
            }
            line
        }
        OutputFormat::Json => {
            let mut obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            if let Some(hint) = hint {
                obj["error"]["hint"] = serde_json::Value::from(hint);
            }
            obj.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        #[derive(Serialize)]
        struct Info {
            user: String,
        }
        let info = Info { user: "rctrl".into() };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &info, |i| format!("User: {}", i.user))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "User: rctrl\n");
    }

    #[test]
    fn write_output_json_does_not_call_human_fn() {
        #[derive(Serialize)]
        struct Info {
            user: String,
            attempts: u32,
        }
        let info = Info { user: "rctrl".into(), attempts: 3 };
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &info, |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["user"], "rctrl");
        assert_eq!(parsed["attempts"], 3);
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_error(OutputFormat::Human, "X", "boom", None, true);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_error_without_tty_is_plain_with_hint() {
        let line = render_error(OutputFormat::Human, "X", "boom", Some("try again"), false);
        assert_eq!(line, "error: boom\n  hint: try again");
    }

    #[test]
    fn render_json_error_carries_code_and_hint() {
        let line = render_error(OutputFormat::Json, "TOKEN_NOT_FOUND", "no token", Some("h"), false);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["error"]["code"], "TOKEN_NOT_FOUND");
        assert_eq!(parsed["error"]["message"], "no token");
        assert_eq!(parsed["error"]["hint"], "h");
    }

    #[test]
    fn classify_uses_bootstrap_error_code_through_context() {
        let err = anyhow::Error::new(BootstrapError::TokenNotFound { user: "rctrl".into() })
            .context("bootstrap failed");
        let (code, hint) = classify(&err);
        assert_eq!(code, "TOKEN_NOT_FOUND");
        assert!(hint.unwrap().contains("influx auth list"));
    }

    #[test]
    fn classify_unknown_error_is_generic() {
        let (code, hint) = classify(&anyhow::anyhow!("something else"));
        assert_eq!(code, "ERROR");
        assert!(hint.is_none());
    }
}
