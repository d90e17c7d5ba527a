//! Cheap argument checks run before the database is opened.

use crate::output::CliError;

pub const MAX_USER_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(
            format!("invalid {} '{}': {}", self.field, self.value, self.reason),
            self.suggestion.clone(),
            self.code,
        )
    }
}

/// User ids are chosen by the operator: lowercase ASCII, digits, `-`, `_`, `.`.
pub fn validate_user_id(s: &str) -> Result<(), ValidationError> {
    if s.is_empty() {
        return Err(ValidationError::new(
            "user",
            s,
            "must not be empty",
            "pass a short handle like alice or dev-42",
            "invalid_user",
        ));
    }
    if s.chars().count() > MAX_USER_ID_LEN {
        return Err(ValidationError::new(
            "user",
            s,
            format!("must be <= {MAX_USER_ID_LEN} characters"),
            "shorten the handle",
            "invalid_user",
        ));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::new(
            "user",
            s,
            "must use lowercase letters, digits, '-', '_' or '.'",
            "pass a short handle like alice or dev-42",
            "invalid_user",
        ));
    }
    Ok(())
}

/// Generated ids look like `<prefix><hex>`, e.g. `bug-1a2b3c4d`.
pub fn validate_generated_id(
    field: &'static str,
    prefix: &str,
    s: &str,
) -> Result<(), ValidationError> {
    let valid = s
        .strip_prefix(prefix)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_hexdigit()));
    if valid {
        return Ok(());
    }
    Err(ValidationError::new(
        field,
        s,
        format!("must look like {prefix}<hex>"),
        format!("copy the {field} id from the list output"),
        "invalid_id",
    ))
}

pub fn validate_bug_id(s: &str) -> Result<(), ValidationError> {
    validate_generated_id("bug", "bug-", s)
}

pub fn validate_project_id(s: &str) -> Result<(), ValidationError> {
    validate_generated_id("project", "prj-", s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids() {
        assert!(validate_user_id("alice").is_ok());
        assert!(validate_user_id("dev-42").is_ok());
        assert!(validate_user_id("j.doe_2").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("Alice").is_err());
        assert!(validate_user_id("a b").is_err());
        assert!(validate_user_id(&"x".repeat(MAX_USER_ID_LEN + 1)).is_err());
    }

    #[test]
    fn generated_ids() {
        assert!(validate_bug_id("bug-1a2b3c4d").is_ok());
        assert!(validate_project_id("prj-00ff").is_ok());
        assert!(validate_bug_id("bug-").is_err());
        assert!(validate_bug_id("prj-1a2b").is_err());
        assert!(validate_bug_id("bug-xyz").is_err());
    }

    #[test]
    fn cli_error_includes_value() {
        let err = validate_bug_id("nope").unwrap_err().to_cli_error();
        assert!(err.message.contains("'nope'"));
        assert_eq!(err.error_code.as_deref(), Some("invalid_id"));
    }
}
