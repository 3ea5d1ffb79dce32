// Copyright 2026 Query Bridge Contributors
// SPDX-License-Identifier: Apache-2.0

//! "Safe substitute" template rendering (spec §9 design note): unresolved
//! `$name` or `${name}` tokens are left literal rather than raising.

use std::collections::BTreeMap;

/// Render `template`, substituting `$key`/`${key}` tokens from `vars`.
/// Tokens with no matching key are left untouched in the output.
pub fn safe_substitute(template: &str, vars: &BTreeMap<String, String>) -> String {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if let Some((key, consumed)) = parse_token(&template[i + 1..]) {
                if let Some(value) = vars.get(&key) {
                    out.push_str(value);
                    i += 1 + consumed;
                    continue;
                }
            }
        }
        // No token matched here; copy one char through unchanged.
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Collect the distinct `$identifier`/`${identifier}` tokens referenced by
/// `template`, in first-seen order.
pub fn referenced_tokens(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if let Some((key, consumed)) = parse_token(&template[i + 1..]) {
                if !seen.contains(&key) {
                    seen.push(key);
                }
                i += 1 + consumed;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        i += ch.len_utf8();
    }
    seen
}

/// Parse a `$identifier` or `${identifier}` token from the start of `rest`
/// (which begins just after the `$`). Returns the identifier and the number
/// of bytes of `rest` it consumed.
fn parse_token(rest: &str) -> Option<(String, usize)> {
    if let Some(stripped) = rest.strip_prefix('{') {
        let end = stripped.find('}')?;
        Some((stripped[..end].to_string(), end + 2))
    } else {
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            None
        } else {
            Some((rest[..end].to_string(), end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_known_keys() {
        let out = safe_substitute("$metric/$function", &vars(&[("metric", "cpu"), ("function", "avg")]));
        assert_eq!(out, "cpu/avg");
    }

    #[test]
    fn leaves_unknown_tokens_literal() {
        let out = safe_substitute("$metric ($unit)", &vars(&[("metric", "cpu")]));
        assert_eq!(out, "cpu ($unit)");
    }

    #[test]
    fn supports_braced_form() {
        let out = safe_substitute("${metric}_total", &vars(&[("metric", "cpu")]));
        assert_eq!(out, "cpu_total");
    }
}
