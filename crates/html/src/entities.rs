/// Named character references recognised by the tokenizer.
///
/// Contract:
/// - Entries ending in `;` are the canonical forms.
/// - Entries without `;` are the legacy forms that still decode when the
///   semicolon is missing (outside attribute values).
/// - Lookup is longest-match first, so `&amp;` never stops at `&amp`.
///
/// Only the common references; anything else is left as literal text.
const NAMED: &[(&str, char)] = &[
    ("amp;", '&'),
    ("amp", '&'),
    ("apos;", '\''),
    ("copy;", '\u{A9}'),
    ("copy", '\u{A9}'),
    ("gt;", '>'),
    ("gt", '>'),
    ("lt;", '<'),
    ("lt", '<'),
    ("nbsp;", '\u{A0}'),
    ("nbsp", '\u{A0}'),
    ("quot;", '"'),
    ("quot", '"'),
    ("reg;", '\u{AE}'),
    ("reg", '\u{AE}'),
];

/// Longest named reference that prefixes `input`.
///
/// Returns the matched name (including a trailing `;` when present) and the
/// decoded character.
pub(crate) fn match_named(input: &[char]) -> Option<(&'static str, char)> {
    let mut best: Option<(&'static str, char)> = None;
    for &(name, ch) in NAMED {
        let len = name.chars().count();
        if input.len() < len {
            continue;
        }
        if name.chars().zip(input.iter()).all(|(a, b)| a == *b)
            && best.is_none_or(|(prev, _)| prev.len() < name.len())
        {
            best = Some((name, ch));
        }
    }
    best
}

/// True if `input` begins with an alphanumeric run that could still become a
/// named reference. Used to decide whether `&foo` stays literal.
pub(crate) fn could_be_named(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// Map a numeric character reference code to the character it decodes to.
///
/// Null, surrogates and values beyond U+10FFFF become U+FFFD.
pub(crate) fn numeric_reference(code: u32) -> char {
    if code == 0 || (0xD800..=0xDFFF).contains(&code) || code > 0x10FFFF {
        return '\u{FFFD}';
    }
    char::from_u32(code).unwrap_or('\u{FFFD}')
}
