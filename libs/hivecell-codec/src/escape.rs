//! Backslash escaping applied to STRING leaves.
//!
//! `\001` is written as a bare TAB, which `unescape` maps back to `\001`.
//! That is the upstream byte layout and readers depend on it.

use std::borrow::Cow;

/// Escape `text` for storage. Borrows when nothing needs rewriting.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '\n', '\r', '\t', '\u{1}']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{1}' => out.push('\t'),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Reverse of [`escape`].
///
/// Lenient: an unknown escape keeps its backslash, a trailing lone
/// backslash is dropped.
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains(['\\', '\t']) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pending = false;
    for c in text.chars() {
        match c {
            '\\' if pending => {
                out.push('\\');
                pending = false;
            }
            '\\' => pending = true,
            'n' if pending => {
                out.push('\n');
                pending = false;
            }
            'r' if pending => {
                out.push('\r');
                pending = false;
            }
            't' if pending => {
                out.push('\t');
                pending = false;
            }
            '\t' => {
                if pending {
                    out.push('\\');
                    pending = false;
                }
                out.push('\u{1}');
            }
            c => {
                if pending {
                    out.push('\\');
                    pending = false;
                }
                out.push(c);
            }
        }
    }
    Cow::Owned(out)
}
