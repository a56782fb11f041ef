//! Code wrapping
//!
//! Problems may ship harness snippets that surround user code (reading
//! input, calling the user's function, printing the result). Wrapping is
//! pure concatenation: snippets are pre-formatted to the nesting the
//! language expects and are never re-indented here.

use serde::{Deserialize, Serialize};

/// Optional harness snippets placed around user code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeWrapper {
    /// Text placed above the user code
    #[serde(default)]
    pub top: Option<String>,

    /// Text placed below the user code
    #[serde(default)]
    pub bottom: Option<String>,
}

/// Concatenate wrapper snippets around user code, separated by blank
/// lines. Without a wrapper the user code passes through unchanged.
pub fn wrap(user_code: &str, wrapper: Option<&CodeWrapper>) -> String {
    let Some(wrapper) = wrapper else {
        return user_code.to_string();
    };

    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(top) = wrapper.top.as_deref()
        && !top.is_empty()
    {
        parts.push(top);
    }
    parts.push(user_code);
    if let Some(bottom) = wrapper.bottom.as_deref()
        && !bottom.is_empty()
    {
        parts.push(bottom);
    }

    parts.join("\n\n")
}
