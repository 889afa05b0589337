// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Resolves `${VAR_NAME}` references in a string from environment variables.
/// Returns `ConfigError::UndefinedVariable` if a referenced variable is not set.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // '{'
        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            var_name.push(c);
        }
        if !closed || var_name.is_empty() {
            // Malformed reference, keep it literally
            result.push_str("${");
            result.push_str(&var_name);
            if closed {
                result.push('}');
            }
            continue;
        }
        let value = std::env::var(&var_name)
            .map_err(|_| ConfigError::UndefinedVariable { name: var_name })?;
        result.push_str(&value);
    }

    Ok(result)
}
