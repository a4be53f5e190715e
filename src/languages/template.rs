//! Placeholder substitution for interpreter command templates.
//!
//! Templates are shell-word strings such as `mmdc -i {file} -o {output}`.
//! Values are shell-quoted on substitution so that paths with spaces survive
//! the later `shell_words::split`.
//!
//! # Syntax
//!
//! - `{name}` - substitutes the quoted value of `name`
//! - `{{` / `}}` - literal braces

use std::collections::HashMap;
use thiserror::Error;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("undefined placeholder '{name}' at position {position} in command template")]
    UndefinedPlaceholder { name: String, position: usize },

    #[error("unmatched '{{' at position {position} in command template")]
    UnmatchedBrace { position: usize },

    #[error("command '{command}' cannot be split into words: {reason}")]
    Unsplittable { command: String, reason: String },
}

/// Render `template`, replacing each `{name}` with the shell-quoted value.
pub fn render_command(
    template: &str,
    values: &HashMap<&str, String>,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' if chars.next_if(|&(_, c)| c == '{').is_some() => result.push('{'),
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                }

                let name = name.trim();
                let value = values
                    .get(name)
                    .ok_or_else(|| TemplateError::UndefinedPlaceholder {
                        name: name.to_string(),
                        position: pos,
                    })?;
                result.push_str(&shell_words::quote(value));
            }
            '}' => {
                chars.next_if(|&(_, c)| c == '}');
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    Ok(result)
}
