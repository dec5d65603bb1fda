use tracing::warn;

use super::BreakdownError;

/// Cuts everything before the first `{`. A payload that does not end with `}`
/// gets exactly one closing brace appended; nesting is not balanced, so deeper
/// truncation still fails later at decode time.
pub fn extract(raw: &str) -> Result<String, BreakdownError> {
    let raw = raw.trim();
    let start = raw.find('{').ok_or(BreakdownError::NoJsonFound)?;
    let mut payload = raw[start..].trim().to_string();
    if !payload.ends_with('}') {
        warn!("model reply does not end with '}}'; appending one closing brace");
        payload.push('}');
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::extract;
    use crate::breakdown::BreakdownError;

    #[test]
    fn strips_leading_prose() {
        assert_eq!(extract("blah {\"a\":1}").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn keeps_payload_that_is_already_json() {
        assert_eq!(extract("  {\"a\":1}\n").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn no_brace_is_no_json_found() {
        assert!(matches!(
            extract("no braces here"),
            Err(BreakdownError::NoJsonFound)
        ));
        assert!(matches!(extract(""), Err(BreakdownError::NoJsonFound)));
        assert!(matches!(
            extract("closing only }"),
            Err(BreakdownError::NoJsonFound)
        ));
    }

    #[test]
    fn appends_missing_closing_brace() {
        assert_eq!(extract("{\"a\":1").unwrap(), "{\"a\":1}");
    }

    #[test]
    fn repair_appends_a_single_brace_only() {
        assert_eq!(
            extract("{\"a\": {\"b\":1").unwrap(),
            "{\"a\": {\"b\":1}"
        );
    }

    #[test]
    fn unbalanced_payload_ending_in_brace_is_left_alone() {
        assert_eq!(
            extract("{\"a\": {\"b\":1}").unwrap(),
            "{\"a\": {\"b\":1}"
        );
    }

    #[test]
    fn trailing_prose_is_not_removed() {
        // The reply ends in text, so one brace is appended after it.
        assert_eq!(
            extract("{\"a\":1} hope this helps").unwrap(),
            "{\"a\":1} hope this helps}"
        );
    }

    #[test]
    fn code_fence_suffix_is_treated_as_truncation() {
        assert_eq!(
            extract("```json\n{\"a\":1}\n```").unwrap(),
            "{\"a\":1}\n```}"
        );
    }
}
