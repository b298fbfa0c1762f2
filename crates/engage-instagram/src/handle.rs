use std::sync::LazyLock;

use regex::Regex;

use crate::error::InstagramError;

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid handle regex"));

/// Strips surrounding whitespace and a leading `@`, then checks the result
/// against Instagram's username alphabet.
///
/// # Errors
///
/// Returns [`InstagramError::InvalidHandle`] if the handle can never exist.
pub fn normalize_handle(raw: &str) -> Result<String, InstagramError> {
    let trimmed = raw.trim();
    let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);
    if HANDLE_RE.is_match(handle) {
        Ok(handle.to_string())
    } else {
        Err(InstagramError::InvalidHandle(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_at_and_whitespace() {
        assert_eq!(normalize_handle("  @natgeo ").unwrap(), "natgeo");
    }

    #[test]
    fn keeps_dots_and_underscores() {
        assert_eq!(normalize_handle("first.last_99").unwrap(), "first.last_99");
    }

    #[test]
    fn rejects_empty_and_illegal() {
        assert!(normalize_handle("").is_err());
        assert!(normalize_handle("@").is_err());
        assert!(normalize_handle("../etc/passwd").is_err());
        assert!(normalize_handle("has space").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(31);
        assert!(matches!(
            normalize_handle(&long),
            Err(InstagramError::InvalidHandle(_))
        ));
    }
}
