//! Class-name tokenizer.
//!
//! Splits a raw class token such as `md:has-[>_img]:bg-red-500` into its
//! variant prefixes and trailing base utility. Colons are only separators at
//! bracket and parenthesis depth 0, so arbitrary values like
//! `bg-[url(http://x)]` stay intact. Tokenizing never fails; oddities such as
//! an unterminated `[` are reported as [`Diagnostic`]s alongside the result.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Variant,
    Utility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

/// A tokenized class name. `variants` are in class-name order (leftmost first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedClass<'a> {
    pub raw: &'a str,
    pub variants: Vec<&'a str>,
    pub utility: &'a str,
    pub important: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedClass<'_> {
    pub fn has_variants(&self) -> bool {
        !self.variants.is_empty()
    }
}

pub fn split_segments(input: &str) -> (Vec<Segment<'_>>, Vec<Diagnostic>) {
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut first_open_bracket = None;
    let mut diagnostics = Vec::new();
    let mut bounds = Vec::new();
    let mut start = 0usize;

    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '[' => {
                if bracket_depth == 0 {
                    first_open_bracket = Some(idx);
                }
                bracket_depth += 1;
            }
            ']' => {
                if bracket_depth == 0 {
                    diagnostics.push(Diagnostic {
                        message: "unmatched `]`".to_string(),
                        start: idx,
                        end: idx + 1,
                    });
                }
                bracket_depth = bracket_depth.saturating_sub(1);
            }
            ':' if bracket_depth == 0 && paren_depth == 0 => {
                bounds.push((start, idx));
                start = idx + 1;
            }
            _ => {}
        }
    }
    bounds.push((start, input.len()));

    if bracket_depth > 0 {
        let open = first_open_bracket.unwrap_or(0);
        diagnostics.push(Diagnostic {
            message: "unterminated `[`".to_string(),
            start: open,
            end: input.len(),
        });
    }

    let bounds = bounds
        .into_iter()
        .filter(|(start, end)| end > start)
        .collect::<Vec<_>>();
    let last = bounds.len().saturating_sub(1);
    let segments = bounds
        .into_iter()
        .enumerate()
        .map(|(idx, (start, end))| Segment {
            kind: if idx == last {
                SegmentKind::Utility
            } else {
                SegmentKind::Variant
            },
            text: &input[start..end],
            start,
            end,
        })
        .collect();

    (segments, diagnostics)
}

/// Tokenizes one class name. Returns `None` when the input has no segments
/// at all (empty string, or only colons).
pub fn parse_class(input: &str) -> Option<ParsedClass<'_>> {
    let (segments, diagnostics) = split_segments(input);
    let (utility, variants) = segments.split_last()?;
    let (utility, important) = strip_important(utility.text);
    if utility.is_empty() {
        return None;
    }

    Some(ParsedClass {
        raw: input,
        variants: variants.iter().map(|segment| segment.text).collect(),
        utility,
        important,
        diagnostics,
    })
}

fn strip_important(utility: &str) -> (&str, bool) {
    if utility.len() > 1 {
        if let Some(stripped) = utility.strip_prefix('!') {
            return (stripped, true);
        }
        if let Some(stripped) = utility.strip_suffix('!') {
            return (stripped, true);
        }
    }
    (utility, false)
}

/// Splits `input` on `delimiter` where it appears outside brackets,
/// parentheses and quoted strings. Pieces are trimmed; empty pieces dropped.
pub fn split_top_level(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;

    for (idx, ch) in input.char_indices() {
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            _ if ch == delimiter && bracket_depth == 0 && paren_depth == 0 => {
                parts.push(input[start..idx].trim());
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

/// Turns `_` into spaces inside an arbitrary value. A backslash-escaped
/// underscore (`\_`) stays a literal underscore.
pub fn normalize_arbitrary_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_backslashes = 0usize;

    for ch in raw.chars() {
        if ch == '\\' {
            pending_backslashes += 1;
            continue;
        }

        if ch == '_' {
            for _ in 0..(pending_backslashes / 2) {
                out.push('\\');
            }
            if pending_backslashes % 2 == 1 {
                out.push('_');
            } else {
                out.push(' ');
            }
            pending_backslashes = 0;
            continue;
        }

        for _ in 0..pending_backslashes {
            out.push('\\');
        }
        pending_backslashes = 0;
        out.push(ch);
    }

    for _ in 0..pending_backslashes {
        out.push('\\');
    }

    out
}

/// Returns the payload of a `[...]` wrapped value, e.g. `[#f00]` -> `#f00`.
pub fn bracket_payload(raw: &str) -> Option<&str> {
    raw.strip_prefix('[')?.strip_suffix(']')
}

/// Splits a whitespace separated class list, expanding variant groups:
/// `dark:hover:(bg-gray-800 text-white)` becomes
/// `dark:hover:bg-gray-800` and `dark:hover:text-white`.
pub fn expand_variant_groups(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    expand_into(input, &mut out);
    out
}

fn expand_into(input: &str, out: &mut Vec<String>) {
    let bytes = input.as_bytes();
    let mut idx = 0usize;

    while idx < bytes.len() {
        if bytes[idx].is_ascii_whitespace() {
            idx += 1;
            continue;
        }

        let start = idx;
        if let Some(offset) = group_open_offset(&input[start..]) {
            let open = start + offset;
            let Some(close) = find_closing_paren(input, open) else {
                // Malformed group: keep the remainder as one token.
                out.push(input[start..].trim_end().to_string());
                return;
            };
            let prefix = &input[start..open - 1];
            let mut inner = Vec::new();
            expand_into(&input[open + 1..close], &mut inner);
            out.extend(inner.into_iter().map(|class| format!("{prefix}:{class}")));
            idx = close + 1;
            continue;
        }

        while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() {
            idx += 1;
        }
        out.push(input[start..idx].to_string());
    }
}

fn group_open_offset(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut segment_len = 0usize;

    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' => segment_len += 1,
            b':' => {
                if segment_len == 0 {
                    return None;
                }
                if bytes.get(idx + 1) == Some(&b'(') {
                    return Some(idx + 1);
                }
                segment_len = 0;
            }
            _ => return None,
        }
    }
    None
}

fn find_closing_paren(text: &str, open_idx: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[open_idx..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open_idx + idx);
                }
            }
            _ => {}
        }
    }
    None
}
