//! Shared output layer for human/JSON parity across all CLI commands.
//!
//! Every command handler receives an [`OutputMode`] and formats its output
//! accordingly: readable text for humans, stable JSON for scripts and
//! agents. Errors render through [`render_error`] so JSON consumers always
//! get `{ok: false, code, message, details}`.

use serde::Serialize;
use std::io::{self, Write};

/// The two output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per result, or a JSON array).
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Resolve the output mode from the `--json` flag and the user config.
///
/// Precedence: `--json` flag, then `output = "json"` in the user-level
/// config, then human. Config read errors fall back to human output.
#[must_use]
pub fn resolve_output_mode(json_flag: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match chorus_core::config::load_user_config() {
        Ok(user) if user.output.as_deref() == Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}

/// A machine-renderable CLI error.
#[derive(Debug, Clone, Serialize)]
pub struct CliError {
    pub ok: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CliError {
    /// An error with a machine code and a remediation hint.
    #[must_use]
    pub fn with_details(message: &str, details: &str, code: &str) -> Self {
        Self {
            ok: false,
            code: code.to_string(),
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    /// An error with just a machine code.
    #[must_use]
    pub fn new(message: &str, code: &str) -> Self {
        Self {
            ok: false,
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }
}

/// Render a result value in the requested mode.
///
/// JSON mode serializes `value`; human mode calls `human` with a writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render<T, F>(mode: OutputMode, value: &T, human: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T, &mut dyn Write) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut lock, value)?;
            writeln!(lock)?;
        }
        OutputMode::Human => human(value, &mut lock)?,
    }
    Ok(())
}

/// Render an error to stderr (human) or stdout (JSON envelope).
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, error)?;
            writeln!(lock)?;
        }
        OutputMode::Human => {
            eprintln!("error[{}]: {}", error.code, error.message);
            if let Some(details) = &error.details {
                eprintln!("  hint: {details}");
            }
        }
    }
    Ok(())
}

/// Format microseconds-since-epoch as RFC 3339 for human output.
#[must_use]
pub fn micros_to_rfc3339(us: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_micros(us)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| us.to_string())
}
