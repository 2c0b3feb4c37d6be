// src/tools/shell.rs

//! POSIX shell-word quoting and splitting.
//!
//! Used for the copy-pasteable command preview and for turning a typed
//! `adb shell` command line into argv. Nothing here ever runs a shell.

use std::path::Path;

use crate::errors::ToolError;

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c)
}

/// Quote one word so a POSIX shell reads it back unchanged.
pub fn quote_word(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if word.chars().all(is_safe) {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', r#"'"'"'"#))
}

/// Render `program args...` as one shell command line.
pub fn command_preview<S: AsRef<str>>(program: &Path, args: &[S]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(quote_word(&program.to_string_lossy()));
    parts.extend(args.iter().map(|a| quote_word(a.as_ref())));
    parts.join(" ")
}

/// Split a command line into words using POSIX quoting rules
/// (single quotes, double quotes, backslash escapes).
pub fn split_words(line: &str) -> Result<Vec<String>, ToolError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => {
                            return Err(ToolError::ShellSyntax(
                                "unterminated single quote".to_string(),
                            ));
                        }
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some('\n') => {}
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => {
                                return Err(ToolError::ShellSyntax(
                                    "unterminated double quote".to_string(),
                                ));
                            }
                        },
                        Some(c) => current.push(c),
                        None => {
                            return Err(ToolError::ShellSyntax(
                                "unterminated double quote".to_string(),
                            ));
                        }
                    }
                }
            }
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(c) => {
                    in_word = true;
                    current.push(c);
                }
                None => {
                    return Err(ToolError::ShellSyntax(
                        "trailing backslash".to_string(),
                    ));
                }
            },
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}
