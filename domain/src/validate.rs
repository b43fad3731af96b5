//! Lightweight input validation helpers. Keep logic minimal and deterministic.

use crate::{CoreError, NoteDraft};

pub const MAX_TITLE_CHARS: usize = 255;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Validate a note title: non-blank and bounded length.
pub fn validate_title(s: &str) -> Result<(), CoreError> {
    if s.trim().is_empty() {
        return Err(CoreError::Validation("title is empty".into()));
    }
    if s.chars().count() > MAX_TITLE_CHARS {
        return Err(CoreError::Validation("title too long".into()));
    }
    Ok(())
}

/// Descriptions may be empty but not unbounded.
pub fn validate_description(s: &str) -> Result<(), CoreError> {
    if s.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(CoreError::Validation("description too long".into()));
    }
    Ok(())
}

/// Validate every field of a draft before it reaches a backend.
pub fn validate_draft(draft: &NoteDraft) -> Result<(), CoreError> {
    validate_title(&draft.title)?;
    validate_description(&draft.description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_validation_basic() {
        assert!(validate_title("slog").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"t".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(validate_title(&"t".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }

    #[test]
    fn description_may_be_empty() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_CHARS + 1)).is_err());
    }

    #[test]
    fn draft_validation_reports_first_failure() {
        let err = validate_draft(&NoteDraft::new("", "fine")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("title")));
    }
}
