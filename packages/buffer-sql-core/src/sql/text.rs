//! Quote-aware helpers for slicing statement text.

/// Splits off the first whitespace-delimited word.
pub(super) fn split_keyword(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (text, ""),
    }
}

/// Splits off a leading name ending at whitespace or `(`.
pub(super) fn split_name(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(|c: char| c.is_whitespace() || c == '(') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte offset of `keyword` as a whole word outside quotes, ignoring case.
pub(super) fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let kw = keyword.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None if b == b'\'' || b == b'"' || b == b'`' => quote = Some(b),
            None => {
                let end = i + kw.len();
                if end <= bytes.len()
                    && bytes[i..end].eq_ignore_ascii_case(kw)
                    && (i == 0 || !is_word_byte(bytes[i - 1]))
                    && (end == bytes.len() || !is_word_byte(bytes[end]))
                {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// Finds the first parenthesised group outside quotes.
///
/// # Returns
/// `(inner, rest)` where `inner` is the text between the group's matching
/// parentheses and `rest` is everything after the closing one. `None` if no
/// complete group exists.
pub(super) fn paren_group(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut start = None;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => {
                if depth == 0 {
                    start = Some(i + 1);
                }
                depth += 1;
            }
            b')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let s = start?;
                    return Some((&text[s..i], &text[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on `separator` outside quotes and parentheses, trimming each part.
///
/// Blank input yields no parts.
pub(super) fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if b == separator && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// Removes one pair of surrounding backticks from an identifier.
pub(super) fn unquote_ident(name: &str) -> &str {
    let name = name.trim();
    name.strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(name)
}
