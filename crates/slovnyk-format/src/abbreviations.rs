//! Abbreviation and part-of-speech tables, plus alphabet-aware matching.
//!
//! `\b` in most regex engines has no idea where a Ukrainian word ends next
//! to a trailing dot, so Cyrillic abbreviations are matched by hand: the
//! token must sit between string edges or characters outside the letter set.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Register,
    Domain,
    Geography,
    Grammar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Neighbours must be outside the Cyrillic + Latin letter set.
    Letters,
    /// Plain regex word boundary. Used for the Latin grammar labels.
    Word,
}

#[derive(Debug, Clone, Copy)]
pub struct Abbreviation {
    /// Text as it appears in a definition.
    pub source: &'static str,
    /// Text placed inside the brackets.
    pub tag: &'static str,
    pub category: Category,
    pub boundary: Boundary,
}

const fn letters(source: &'static str, category: Category) -> Abbreviation {
    Abbreviation {
        source,
        tag: source,
        category,
        boundary: Boundary::Letters,
    }
}

const fn latin(source: &'static str, tag: &'static str) -> Abbreviation {
    Abbreviation {
        source,
        tag,
        category: Category::Grammar,
        boundary: Boundary::Word,
    }
}

/// Tagged in this order.
pub const ABBREVIATIONS: &[Abbreviation] = &[
    letters("розм.", Category::Register),
    letters("книжк.", Category::Register),
    letters("поет.", Category::Register),
    letters("жарт.", Category::Register),
    letters("ірон.", Category::Register),
    letters("зневажл.", Category::Register),
    letters("вульг.", Category::Register),
    letters("прост.", Category::Register),
    letters("діал.", Category::Register),
    letters("застар.", Category::Register),
    letters("рідко", Category::Register),
    letters("мор.", Category::Domain),
    letters("військ.", Category::Domain),
    letters("зоол.", Category::Domain),
    letters("бот.", Category::Domain),
    letters("мед.", Category::Domain),
    letters("юр.", Category::Domain),
    letters("тех.", Category::Domain),
    letters("фіз.", Category::Domain),
    letters("хім.", Category::Domain),
    letters("матем.", Category::Domain),
    letters("муз.", Category::Domain),
    letters("спорт.", Category::Domain),
    letters("авіа.", Category::Domain),
    letters("ел.", Category::Domain),
    letters("рел.", Category::Domain),
    letters("біол.", Category::Domain),
    letters("геол.", Category::Domain),
    letters("екон.", Category::Domain),
    letters("політ.", Category::Domain),
    letters("амер.", Category::Geography),
    letters("брит.", Category::Geography),
    letters("шотл.", Category::Geography),
    letters("австрал.", Category::Geography),
    latin("pl", "мн."),
    latin("sg", "одн."),
    letters("перен.", Category::Grammar),
    letters("букв.", Category::Grammar),
    letters("збірн.", Category::Grammar),
    letters("скор.", Category::Grammar),
    latin("attr", "означ."),
    latin("pred", "присуд."),
];

/// Header names that survive the noise-stripping stage. Case-sensitive.
pub const POS_HEADER_NAMES: &[&str] = &[
    "NOUN",
    "VERB",
    "ADJECTIVE",
    "ADVERB",
    "PREPOSITION",
    "CONJUNCTION",
    "PRONOUN",
    "INTERJECTION",
    "NUMERAL",
    "PHRASAL VERB",
];

/// Label variants found in raw definitions, mapped to header names.
pub const POS_LABELS: &[(&str, &str)] = &[
    ("n", "NOUN"),
    ("noun", "NOUN"),
    ("v", "VERB"),
    ("verb", "VERB"),
    ("adj", "ADJECTIVE"),
    ("adjective", "ADJECTIVE"),
    ("adv", "ADVERB"),
    ("adverb", "ADVERB"),
    ("prep", "PREPOSITION"),
    ("preposition", "PREPOSITION"),
    ("conj", "CONJUNCTION"),
    ("conjunction", "CONJUNCTION"),
    ("pron", "PRONOUN"),
    ("pronoun", "PRONOUN"),
    ("int", "INTERJECTION"),
    ("interjection", "INTERJECTION"),
    ("num", "NUMERAL"),
    ("numeral", "NUMERAL"),
    ("phrasal v", "PHRASAL VERB"),
    ("ph v", "PHRASAL VERB"),
    ("ph.v", "PHRASAL VERB"),
];

/// English labels shown next to a definition for the tags it carries.
pub const BADGES: &[(&str, &str)] = &[
    ("юр.", "Legal"),
    ("біол.", "Biology"),
    ("мед.", "Medicine"),
    ("тех.", "Tech"),
    ("рел.", "Religion"),
    ("іст.", "History"),
    ("муз.", "Music"),
    ("арх.", "Architecture"),
    ("хім.", "Chemistry"),
    ("фіз.", "Physics"),
    ("мат.", "Math"),
    ("бот.", "Botany"),
    ("зоол.", "Zoology"),
    ("авіа.", "Aviation"),
    ("воєн.", "Military"),
    ("мор.", "Maritime"),
    ("комп.", "Computing"),
    ("розм.", "Colloquial"),
    ("книжн.", "Literary"),
    ("заст.", "Obsolete"),
    ("діал.", "Dialect"),
    ("pl", "Plural"),
    ("sg", "Singular"),
    ("attr", "Attributive"),
    ("predic", "Predicative"),
    ("амер.", "American"),
    ("брит.", "British"),
];

/// Header name for a label variant, ignoring case and inner spacing.
pub fn canonical_pos(label: &str) -> Option<&'static str> {
    let key = label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    POS_LABELS
        .iter()
        .find(|(variant, _)| *variant == key)
        .map(|&(_, name)| name)
}

pub fn badge_label(tag: &str) -> Option<&'static str> {
    let tag = tag.trim().to_lowercase();
    BADGES
        .iter()
        .find(|(abbr, _)| *abbr == tag)
        .map(|&(_, label)| label)
}

/// Ukrainian alphabet, upper and lower case.
pub fn is_ukrainian_letter(c: char) -> bool {
    matches!(c, 'а'..='я' | 'А'..='Я' | 'і' | 'ї' | 'є' | 'ґ' | 'І' | 'Ї' | 'Є' | 'Ґ')
}

/// Ukrainian plus ASCII Latin letters.
pub fn is_word_letter(c: char) -> bool {
    is_ukrainian_letter(c) || c.is_ascii_alphabetic()
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of `needle` if `haystack` starts with it, ignoring case.
fn prefix_len_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    for n in needle.chars() {
        let (_, c) = hay.next()?;
        if !chars_eq_ignore_case(c, n) {
            return None;
        }
    }
    Some(hay.next().map_or(haystack.len(), |(i, _)| i))
}

/// Non-overlapping, case-insensitive occurrences of `needle` whose neighbours
/// are not letters according to `is_letter`.
pub fn bounded_matches(text: &str, needle: &str, is_letter: fn(char) -> bool) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    if needle.is_empty() {
        return found;
    }
    let mut prev: Option<char> = None;
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        if prev.map_or(true, |p| !is_letter(p)) {
            if let Some(len) = prefix_len_ignore_case(&text[pos..], needle) {
                let end = pos + len;
                if text[end..].chars().next().map_or(true, |n| !is_letter(n)) {
                    found.push(pos..end);
                    prev = text[pos..end].chars().next_back();
                    pos = end;
                    continue;
                }
            }
        }
        prev = Some(c);
        pos += c.len_utf8();
    }
    found
}

/// Replace every bounded occurrence of `needle` with `replacement`.
pub fn replace_bounded(
    text: &str,
    needle: &str,
    replacement: &str,
    is_letter: fn(char) -> bool,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for range in bounded_matches(text, needle, is_letter) {
        out.push_str(&text[last..range.start]);
        out.push_str(replacement);
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}
