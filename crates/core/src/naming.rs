use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseStyle {
    #[default]
    Keep,
    Title,
    Lower,
    Upper,
}

/// Best-effort text rewrite applied to a folder's base name.
///
/// Implementations must return the input unchanged when they cannot do better.
pub trait NameRewriter {
    fn rewrite(&mut self, text: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl NameRewriter for Passthrough {
    fn rewrite(&mut self, text: &str) -> String {
        text.to_string()
    }
}

/// Turns a raw folder name into the display part of a dated name.
pub struct FolderNamer<'a> {
    case_style: CaseStyle,
    rewriter: &'a mut dyn NameRewriter,
}

impl<'a> FolderNamer<'a> {
    pub fn new(case_style: CaseStyle, rewriter: &'a mut dyn NameRewriter) -> Self {
        Self {
            case_style,
            rewriter,
        }
    }

    pub fn clean(&mut self, raw: &str) -> String {
        let stripped = strip_dated_prefix(raw);
        if stripped.trim().is_empty() {
            return String::new();
        }
        let rewritten = self.rewriter.rewrite(stripped);
        let cleaned = cleanup_name(&rewritten.replace('_', " "));
        if cleaned.is_empty() {
            return String::new();
        }
        sanitize_name(&apply_case(&cleaned, self.case_style))
    }

    pub fn proposed_name(&mut self, date: NaiveDate, raw: &str) -> String {
        let base = self.clean(raw);
        let iso = date.format("%Y-%m-%d").to_string();
        if base.is_empty() {
            iso
        } else {
            format!("{iso} {base}")
        }
    }
}

/// True when the name starts with a `YYYY-MM-DD` shaped prefix.
pub fn is_dated_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

/// Removes a leading run of digits and separators, such as `2023-01-01 ` or
/// `20230101_`. The run is only dropped when it ends at a separator or at the
/// end of the name, so `2nd Birthday` stays intact.
pub fn strip_dated_prefix(name: &str) -> &str {
    let end = name
        .char_indices()
        .find(|(_, ch)| !(ch.is_ascii_digit() || is_separator(*ch)))
        .map(|(idx, _)| idx)
        .unwrap_or(name.len());
    let prefix = &name[..end];

    if !prefix.chars().any(|ch| ch.is_ascii_digit()) {
        return name.trim_start_matches(is_separator);
    }
    if end == name.len() || prefix.ends_with(is_separator) {
        return &name[end..];
    }
    name
}

pub fn apply_case(value: &str, style: CaseStyle) -> String {
    match style {
        CaseStyle::Keep => value.to_string(),
        CaseStyle::Lower => value.to_lowercase(),
        CaseStyle::Upper => value.to_uppercase(),
        CaseStyle::Title => value
            .split(' ')
            .map(title_word)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn title_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Collapses repeated separators and trims them from both ends.
pub fn cleanup_name(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_sep: Option<char> = None;

    for ch in value.chars() {
        let ch = if ch.is_whitespace() { ' ' } else { ch };
        if is_separator(ch) {
            if prev_sep == Some(ch) {
                continue;
            }
            prev_sep = Some(ch);
        } else {
            prev_sep = None;
        }
        out.push(ch);
    }

    out.trim_matches(is_separator).to_string()
}

pub fn sanitize_name(value: &str) -> String {
    let mut out: String = value
        .chars()
        .map(|ch| if is_disallowed_char(ch) { '_' } else { ch })
        .collect();

    out = out.trim_end_matches([' ', '.']).trim().to_string();

    if is_windows_reserved(&out) {
        out.push_str("_folder");
    }

    out
}

fn is_separator(ch: char) -> bool {
    matches!(ch, '_' | '-' | ' ' | '.')
}

fn is_disallowed_char(ch: char) -> bool {
    matches!(ch, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || ch.is_control()
}

fn is_windows_reserved(value: &str) -> bool {
    let stem = value
        .split('.')
        .next()
        .unwrap_or(value)
        .to_ascii_uppercase();
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|reserved| reserved == &stem)
}
