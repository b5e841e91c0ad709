//! Single-pass `{{dotted.key}}` placeholder resolution.

use crate::context::{render_value, Lookup};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// What to do when a placeholder names a key the context does not have
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    /// Fail with [`TemplateError::MissingKey`]
    #[default]
    Strict,
    /// Substitute an empty string
    Lenient,
}

/// Template resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("missing property '{key}'")]
    MissingKey { key: String },

    #[error("unterminated placeholder at offset {offset}")]
    Unterminated { offset: usize },

    #[error("empty placeholder at offset {offset}")]
    EmptyKey { offset: usize },

    #[error("invalid placeholder key '{key}' at offset {offset}")]
    InvalidKey { key: String, offset: usize },
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Key(&'a str),
}

fn tokenize(template: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = template;
    let mut base = 0;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let offset = base + start;
        let inner = &rest[start + OPEN.len()..];
        let end = inner
            .find(CLOSE)
            .ok_or(TemplateError::Unterminated { offset })?;
        let key = inner[..end].trim();
        validate_key(key, offset)?;
        tokens.push(Token::Key(key));

        let consumed = start + OPEN.len() + end + CLOSE.len();
        rest = &rest[consumed..];
        base += consumed;
    }

    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    Ok(tokens)
}

fn validate_key(key: &str, offset: usize) -> Result<(), TemplateError> {
    if key.is_empty() {
        return Err(TemplateError::EmptyKey { offset });
    }
    let well_formed = key.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });
    if !well_formed {
        return Err(TemplateError::InvalidKey {
            key: key.to_string(),
            offset,
        });
    }
    Ok(())
}

/// Resolve every placeholder in `template` against `props`.
///
/// Substituted text is never scanned again, so a value containing `{{x}}`
/// is emitted literally. Malformed placeholders fail under either policy.
pub fn resolve<L: Lookup + ?Sized>(
    template: &str,
    props: &L,
    policy: MissingKeyPolicy,
) -> Result<String, TemplateError> {
    let tokens = tokenize(template)?;
    let mut out = String::with_capacity(template.len());

    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Key(key) => match props.lookup(key) {
                Some(value) => out.push_str(&render_value(value)),
                None => match policy {
                    MissingKeyPolicy::Strict => {
                        return Err(TemplateError::MissingKey {
                            key: key.to_string(),
                        })
                    }
                    MissingKeyPolicy::Lenient => {}
                },
            },
        }
    }

    Ok(out)
}

/// List the keys referenced by `template`, in order of appearance.
pub fn placeholders(template: &str) -> Result<Vec<String>, TemplateError> {
    Ok(tokenize(template)?
        .into_iter()
        .filter_map(|token| match token {
            Token::Key(key) => Some(key.to_string()),
            Token::Text(_) => None,
        })
        .collect())
}
