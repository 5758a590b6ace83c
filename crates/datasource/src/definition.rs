//! Source definition parsing
//!
//! A definition is the user-facing string describing a desired source:
//!
//! ```text
//! name:key1=value1,key2=value2,...
//! ```
//!
//! The interface/device name comes before the first colon. Options follow as
//! comma-separated `key=value` pairs; values may be double-quoted to embed
//! commas. The `type` option selects a driver; a missing type or the literal
//! `auto` requests driver auto-detection. A bare first option token is also
//! accepted as the type. Unknown options are preserved in order and forwarded
//! to the capture child verbatim.

use crate::error::SourceError;

/// Type value requesting driver auto-detection
pub const TYPE_AUTO: &str = "auto";

/// A parsed source definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDefinition {
    raw: String,
    name: String,
    source_type: Option<String>,
    options: Vec<(String, String)>,
}

impl SourceDefinition {
    /// Parse a definition string
    ///
    /// # Errors
    ///
    /// [`SourceError::DefinitionParse`] on an empty name, an unterminated
    /// quote, or an empty option key.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let (name, rest) = match raw.split_once(':') {
            Some((name, rest)) => (name.trim(), Some(rest)),
            None => (raw.trim(), None),
        };

        if name.is_empty() {
            return Err(SourceError::parse(raw, "missing source name"));
        }

        let mut source_type = None;
        let mut options = Vec::new();

        if let Some(rest) = rest {
            for token in split_options(raw, rest)? {
                match token.split_once('=') {
                    Some((key, value)) => {
                        let key = key.trim().to_ascii_lowercase();
                        if key.is_empty() {
                            return Err(SourceError::parse(raw, "empty option key"));
                        }
                        let value = unquote(raw, value.trim())?;
                        if key == "type" {
                            source_type = Some(value.to_ascii_lowercase());
                        } else {
                            options.push((key, value));
                        }
                    }
                    None => {
                        let token = token.trim();
                        if token.is_empty() {
                            continue;
                        }
                        // A bare first token is shorthand for the type
                        if source_type.is_none() && options.is_empty() {
                            source_type = Some(token.to_ascii_lowercase());
                        } else {
                            options.push((token.to_ascii_lowercase(), String::new()));
                        }
                    }
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            name: name.to_string(),
            source_type,
            options,
        })
    }

    /// The original definition string, as given by the user
    #[inline]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The interface/device name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The requested driver type, lowercased, if one was given
    #[inline]
    pub fn source_type(&self) -> Option<&str> {
        self.source_type.as_deref()
    }

    /// Whether this definition requests driver auto-detection
    pub fn is_auto(&self) -> bool {
        match self.source_type.as_deref() {
            None => true,
            Some(t) => t == TYPE_AUTO,
        }
    }

    /// Look up an option value by (lowercase) key
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All options in the order they were given
    #[inline]
    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }
}

impl std::fmt::Display for SourceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split the option list on commas, honoring double quotes
fn split_options<'a>(raw: &str, rest: &'a str) -> Result<Vec<&'a str>, SourceError> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, c) in rest.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                tokens.push(&rest[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(SourceError::parse(raw, "unterminated quote in options"));
    }

    tokens.push(&rest[start..]);
    Ok(tokens.into_iter().filter(|t| !t.trim().is_empty()).collect())
}

/// Strip a matched pair of surrounding double quotes
fn unquote(raw: &str, value: &str) -> Result<String, SourceError> {
    if let Some(stripped) = value.strip_prefix('"') {
        match stripped.strip_suffix('"') {
            Some(inner) => Ok(inner.to_string()),
            None => Err(SourceError::parse(raw, "unterminated quoted value")),
        }
    } else {
        Ok(value.to_string())
    }
}
