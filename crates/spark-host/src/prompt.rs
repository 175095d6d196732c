//! Prompt builder
//!
//! A prompt is plain text assembled from template segments and values,
//! the way a tagged template interleaves them: `s0 v0 s1 v1 ... sN`.

use crate::error::HostError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text sent to the completion service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Prompt(String);

impl Prompt {
    /// Wrap literal text
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Prompt text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if the prompt has no visible content
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Unwrap into the text
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl AsRef<str> for Prompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Interleave template `segments` with `values`
///
/// # Errors
/// `HostError::PromptArity` unless `segments.len() == values.len() + 1`.
pub fn llm_prompt(segments: &[&str], values: &[&dyn fmt::Display]) -> Result<Prompt, HostError> {
    if segments.len() != values.len() + 1 {
        return Err(HostError::PromptArity {
            segments: segments.len(),
            values: values.len(),
        });
    }

    let mut text = String::from(segments[0]);
    for (value, segment) in values.iter().zip(&segments[1..]) {
        text.push_str(&value.to_string());
        text.push_str(segment);
    }
    Ok(Prompt(text))
}

/// Build a [`Prompt`] with `format!` syntax
#[macro_export]
macro_rules! prompt {
    ($($arg:tt)*) => {
        $crate::Prompt::new(format!($($arg)*))
    };
}
