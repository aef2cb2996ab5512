//! Subject naming and wildcard matching.
//!
//! Concrete change subjects look like `<prefix>.changes.<event_type>.<subject_type>`.
//! Patterns use NATS wildcards: `*` matches exactly one token and `>` matches
//! one or more trailing tokens.

use crate::events::ChangeType;
use crate::{Error, Result};

const CHANGES: &str = "changes";

/// Build the concrete subject a change is published on.
pub fn change_subject(prefix: &str, event_type: ChangeType, subject_type: &str) -> Result<String> {
    validate_literal(prefix)?;
    validate_literal(subject_type)?;
    Ok(format!("{}.{}.{}.{}", prefix, CHANGES, event_type, subject_type))
}

/// Build a subscription pattern for a topic such as `*.load-balancer`.
pub fn change_pattern(prefix: &str, topic: &str) -> Result<String> {
    validate_literal(prefix)?;
    validate_pattern(topic)?;
    Ok(format!("{}.{}.{}", prefix, CHANGES, topic))
}

/// Pattern covering every change under `prefix`.
pub fn all_changes(prefix: &str) -> Result<String> {
    change_pattern(prefix, ">")
}

/// Check whether `subject` matches `pattern`.
pub fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut subject_tokens = subject.split('.');

    for token in pattern.split('.') {
        match token {
            ">" => return subject_tokens.next().is_some(),
            "*" => {
                if subject_tokens.next().is_none() {
                    return false;
                }
            }
            literal => {
                if subject_tokens.next() != Some(literal) {
                    return false;
                }
            }
        }
    }

    subject_tokens.next().is_none()
}

fn validate_tokens(value: &str, allow_wildcards: bool) -> Result<()> {
    if value.is_empty() {
        return Err(Error::InvalidSubject("empty subject".to_string()));
    }

    let tokens: Vec<&str> = value.split('.').collect();
    for (i, token) in tokens.iter().enumerate() {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSubject(format!("bad token in {:?}", value)));
        }

        let wildcard = *token == "*" || *token == ">";
        let has_wildcard_char = token.contains('*') || token.contains('>');

        if has_wildcard_char && !(allow_wildcards && wildcard) {
            return Err(Error::InvalidSubject(format!(
                "wildcard not allowed in {:?}",
                value
            )));
        }
        if *token == ">" && i != tokens.len() - 1 {
            return Err(Error::InvalidSubject(format!(
                "'>' must be the last token in {:?}",
                value
            )));
        }
    }

    Ok(())
}

fn validate_literal(value: &str) -> Result<()> {
    validate_tokens(value, false)
}

fn validate_pattern(value: &str) -> Result<()> {
    validate_tokens(value, true)
}
