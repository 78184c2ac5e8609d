//! Input validation shared by command handlers.

use crate::output::CliError;

/// A rejected input, with a machine code for JSON consumers.
#[derive(Debug, Clone)]
pub struct InvalidInput {
    pub reason: String,
    pub code: &'static str,
}

impl InvalidInput {
    pub fn to_cli_error(&self) -> CliError {
        CliError::new(&self.reason, self.code)
    }
}

/// Validate a username: non-empty, no whitespace, reasonable length.
pub fn validate_username(username: &str) -> Result<(), InvalidInput> {
    if username.trim().is_empty() {
        return Err(InvalidInput {
            reason: "username must not be empty".into(),
            code: "invalid_username",
        });
    }
    if username.chars().any(char::is_whitespace) {
        return Err(InvalidInput {
            reason: format!("username '{username}' must not contain whitespace"),
            code: "invalid_username",
        });
    }
    if username.chars().count() > 64 {
        return Err(InvalidInput {
            reason: "username must be 64 characters or fewer".into(),
            code: "invalid_username",
        });
    }
    Ok(())
}

/// Validate a note or comment body against the configured cap.
pub fn validate_body(body: &str, max_chars: usize) -> Result<(), InvalidInput> {
    if body.trim().is_empty() {
        return Err(InvalidInput {
            reason: "body must not be empty".into(),
            code: "invalid_body",
        });
    }
    let chars = body.chars().count();
    if chars > max_chars {
        return Err(InvalidInput {
            reason: format!("body must be <= {max_chars} characters (got {chars})"),
            code: "invalid_body",
        });
    }
    if body
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        return Err(InvalidInput {
            reason: "body must not contain control characters".into(),
            code: "invalid_body",
        });
    }
    Ok(())
}
