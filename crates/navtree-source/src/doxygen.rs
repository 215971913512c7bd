//! Extraction of literals from Doxygen-generated navigation scripts.
//!
//! Doxygen writes its navigation data as JavaScript assignments:
//!
//! ```js
//! var NAVTREE = [ ... ];
//! var files_dup = [ ... ];
//! var SYNCONMSG = 'click to disable panel synchronisation';
//! ```
//!
//! The array literals are valid JSON, so only the literal text is located here
//! and parsing is left to `serde_json`.

use regex::Regex;

/// Locate the array or object literal assigned to `var <name>`.
pub(crate) fn array_literal<'a>(script: &'a str, name: &str) -> Option<&'a str> {
    let pattern = Regex::new(&format!(r"\bvar\s+{}\s*=\s*", regex::escape(name))).ok()?;
    let start = pattern.find(script)?.end();
    balanced(&script[start..])
}

/// Read the string literal assigned to `var <name>`.
///
/// Both quote styles are accepted; backslash escapes are resolved.
pub(crate) fn string_literal(script: &str, name: &str) -> Option<String> {
    let pattern = Regex::new(&format!(
        r#"\bvar\s+{}\s*=\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#,
        regex::escape(name)
    ))
    .ok()?;
    let captures = pattern.captures(script)?;
    let raw = captures.get(1).or_else(|| captures.get(2))?.as_str();
    Some(unescape(raw))
}

/// Slice of `text` holding the bracketed literal it starts with.
fn balanced(text: &str) -> Option<&str> {
    if !text.starts_with(['[', '{']) {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
