//! Text styler — nudges synthesized prosody with punctuation.
//!
//! Each style is a short list of literal substring replacements applied in
//! order. The speech model reads an ellipsis as a pause and a dash as a
//! livelier break; no markup language is involved.

use crate::request::Style;

/// Replacements for one style, applied left to right.
fn substitutions(style: Style) -> &'static [(&'static str, &'static str)] {
    match style {
        Style::FriendlyCalm => &[("Hallo,", "Hallo …"), ("Leider", "Leider …")],
        Style::Neutral => &[],
        Style::BrightFriendly => &[("Hallo,", "Hallo,")],
        Style::Lively => &[("Hallo,", "Hallo –")],
    }
}

/// Apply `style` to `text`.
///
/// Surrounding whitespace is trimmed first. Pure and deterministic;
/// [`Style::Neutral`] only trims.
pub fn stylize(text: &str, style: Style) -> String {
    substitutions(style)
        .iter()
        .fold(text.trim().to_string(), |acc, (from, to)| acc.replace(from, to))
}
