//! Keyword-based slot extraction.
//!
//! Every detector scans the lower-cased utterance for a fixed vocabulary and
//! fills its slot with the first entry that matches, in vocabulary order.
//! Detectors run independently, so one utterance may fill several slots.
//! A detector never clears or overwrites a filled slot.
//!
//! Yarn weights are matched as whole words. The ones that double as
//! everyday words ("fine", "light", "medium") need a yarn context.

use crate::slot::{CollectedData, Slot};
use crate::step::Step;

/// Keyword to stored value, in priority order.
const PIECE_TYPES: &[(&str, &str)] = &[
    ("coat", "coat"),
    ("sweater", "sweater"),
    ("hat", "hat"),
    ("scarf", "scarf"),
    ("gloves", "gloves"),
    ("socks", "socks"),
    ("blanket", "blanket"),
    ("bag", "bag"),
];

/// Matched as whole words and stored upper-cased.
const SIZE_ABBREVIATIONS: &[&str] = &["xs", "s", "m", "l", "xl", "xxl"];

/// Matched as whole words and stored verbatim, unless they describe yarn.
const SIZE_WORDS: &[&str] = &["small", "medium", "large"];

const COLORS: &[&str] = &[
    "blue", "red", "green", "yellow", "black", "white", "pink", "purple",
    "gray", "brown",
];

const SLEEVE_TRIGGER: &str = "sleeve";

const SLEEVE_TYPES: &[(&[&str], &str)] = &[
    (&["puffy", "puff"], "puffy"),
    (&["fitted"], "fitted"),
    (&["sleeveless"], "sleeveless"),
];

const YARN_FIBERS: &[&str] = &[
    "cotton", "wool", "acrylic", "merino", "alpaca", "bamboo", "linen", "silk",
    "cashmere", "mohair",
];

// "super" weights come before the plain ones they contain.
const YARN_WEIGHTS: &[(&str, &str)] = &[
    ("super fine", "super fine"),
    ("fingering", "super fine"),
    ("lace", "lace"),
    ("super bulky", "super bulky"),
    ("fine", "fine"),
    ("sport", "fine"),
    ("light", "light"),
    ("dk", "light"),
    ("medium", "medium"),
    ("worsted", "medium"),
    ("aran", "medium"),
    ("bulky", "bulky"),
    ("chunky", "bulky"),
    ("jumbo", "jumbo"),
];

const AMBIGUOUS_WEIGHTS: &[&str] = &["fine", "light", "medium"];

/// Words that put a weight keyword in a yarn context.
const YARN_CONTEXT: &[&str] = &["weight", "yarn", "ply"];

/// "that's fine", "it's light" and the like are not weights.
const NOT_A_WEIGHT_AFTER: &[&str] = &[
    "that's", "thats", "it's", "its", "is", "sounds", "looks", "feels", "i'm",
];

const STYLE_KEYWORDS: &[&str] = &[
    "sleeve", "neck", "collar", "hood", "length", "waist", "button", "pocket",
    "fringe", "stripe", "ruffle", "cuff", "trim",
];

/// Scans `utterance` and fills every slot it mentions.
pub fn extract(data: &mut CollectedData, utterance: &str) {
    extract_with(data, utterance, false);
}

/// Like [`extract`], for an utterance that answers the question asked at
/// `step`.
///
/// A bare ambiguous weight ("medium") is accepted in reply to the yarn
/// question, and any non-blank reply to the style question is stored as
/// the style details.
pub fn extract_answer(data: &mut CollectedData, utterance: &str, step: Step) {
    extract_with(data, utterance, step == Step::YarnPreferences);
    let answer = utterance.trim();
    if step == Step::StyleDetails && !answer.is_empty() {
        fill(data, Slot::StyleDetails, answer);
    }
}

fn extract_with(data: &mut CollectedData, utterance: &str, weight_asked: bool) {
    let text = utterance.to_lowercase();
    if text.trim().is_empty() {
        return;
    }
    let tokens: Vec<&str> = words(&text).collect();

    if let Some(piece) = first_mapped(&text, PIECE_TYPES) {
        fill(data, Slot::PieceType, piece);
    }
    // A size word written now can't also be the weight.
    let mut size_word = None;
    if let Some(size) = detect_size(&text) {
        if fill(data, Slot::Size, size.as_str()) {
            size_word = Some(size);
        }
    }
    if let Some(color) = first_contained(&text, COLORS) {
        fill(data, Slot::Color, color);
    }
    if let Some(sleeve) = detect_sleeve(&text) {
        fill(data, Slot::SleeveType, sleeve);
    }
    if let Some(fiber) = first_contained(&text, YARN_FIBERS) {
        fill(data, Slot::YarnType, fiber);
    }
    if let Some(weight) =
        detect_weight(&tokens, weight_asked, size_word.as_deref())
    {
        fill(data, Slot::YarnWeight, weight);
    }
    if STYLE_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
        fill(data, Slot::StyleDetails, utterance.trim());
    }
}

fn fill(data: &mut CollectedData, slot: Slot, value: &str) -> bool {
    let filled = data.fill(slot, value);
    if filled {
        trace!(%slot, %value, "slot filled");
    }
    filled
}

fn first_contained(text: &str, vocabulary: &[&'static str]) -> Option<&'static str> {
    vocabulary.iter().copied().find(|word| text.contains(word))
}

fn first_mapped(
    text: &str,
    vocabulary: &[(&'static str, &'static str)],
) -> Option<&'static str> {
    vocabulary
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, value)| *value)
}

fn detect_size(text: &str) -> Option<String> {
    // A single letter like "m" is part of almost any sentence, so
    // abbreviations must stand alone.
    let abbreviation = SIZE_ABBREVIATIONS.iter().find(|abbr| {
        words(text).any(|word| word == **abbr)
    });
    if let Some(abbr) = abbreviation {
        return Some(abbr.to_uppercase());
    }
    // "medium weight" and "medium cotton" describe the yarn.
    let tokens: Vec<&str> = words(text).collect();
    SIZE_WORDS
        .iter()
        .find(|size| {
            tokens.iter().enumerate().any(|(at, token)| {
                token == *size
                    && !tokens.get(at + 1).is_some_and(|next| {
                        YARN_CONTEXT.contains(next) || YARN_FIBERS.contains(next)
                    })
            })
        })
        .map(|size| (*size).to_owned())
}

fn detect_sleeve(text: &str) -> Option<&'static str> {
    if !text.contains(SLEEVE_TRIGGER) {
        return None;
    }
    SLEEVE_TYPES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, value)| *value)
}

fn detect_weight(
    tokens: &[&str],
    weight_asked: bool,
    size_word: Option<&str>,
) -> Option<&'static str> {
    let in_context = tokens.iter().any(|token| YARN_CONTEXT.contains(token));
    YARN_WEIGHTS
        .iter()
        .find(|(keyword, _)| {
            let keyword: Vec<&str> = keyword.split(' ').collect();
            (0..tokens.len()).any(|at| {
                tokens[at..].starts_with(&keyword)
                    && (keyword.len() > 1
                        || !AMBIGUOUS_WEIGHTS.contains(&keyword[0])
                        || is_weight_here(
                            tokens,
                            at,
                            in_context || weight_asked,
                            size_word,
                        ))
            })
        })
        .map(|(_, value)| *value)
}

/// Decides whether the ambiguous weight word at `tokens[at]` is a weight.
fn is_weight_here(
    tokens: &[&str],
    at: usize,
    in_context: bool,
    size_word: Option<&str>,
) -> bool {
    let word = tokens[at];
    let prev = at.checked_sub(1).map(|i| tokens[i]);
    let next = tokens.get(at + 1).copied();
    if size_word == Some(word) {
        return false;
    }
    // "light blue" is a shade.
    if next.is_some_and(|next| COLORS.contains(&next)) {
        return false;
    }
    if prev.is_some_and(|prev| NOT_A_WEIGHT_AFTER.contains(&prev)) {
        return false;
    }
    in_context || next.is_some_and(|next| YARN_FIBERS.contains(&next))
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|word| !word.is_empty())
}
