//! Announcement request — the validated, immutable input of one render job.
//!
//! The front end collects raw field strings in a [`RequestForm`]; calling
//! [`RequestForm::validate`] is the only way to obtain an
//! [`AnnouncementRequest`], so every job starts from checked input.

use std::{fmt, path::PathBuf, str::FromStr};

use crate::error::{CallbenchError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Voice
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of voices accepted by the speech service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Voice {
    #[default]
    Nova,
    Alloy,
    Shimmer,
    Coral,
    Echo,
    Verse,
    Fable,
    Onyx,
    Ballad,
    Ash,
    Sage,
    Marin,
    Cedar,
}

impl Voice {
    /// All voices in display order.
    pub const ALL: [Voice; 13] = [
        Voice::Nova,
        Voice::Alloy,
        Voice::Shimmer,
        Voice::Coral,
        Voice::Echo,
        Voice::Verse,
        Voice::Fable,
        Voice::Onyx,
        Voice::Ballad,
        Voice::Ash,
        Voice::Sage,
        Voice::Marin,
        Voice::Cedar,
    ];

    /// Identifier sent to the speech service.
    pub fn id(self) -> &'static str {
        match self {
            Voice::Nova => "nova",
            Voice::Alloy => "alloy",
            Voice::Shimmer => "shimmer",
            Voice::Coral => "coral",
            Voice::Echo => "echo",
            Voice::Verse => "verse",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Ballad => "ballad",
            Voice::Ash => "ash",
            Voice::Sage => "sage",
            Voice::Marin => "marin",
            Voice::Cedar => "cedar",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Voice {
    type Err = CallbenchError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Voice::ALL
            .into_iter()
            .find(|v| v.id() == s)
            .ok_or_else(|| {
                let ids: Vec<&str> = Voice::ALL.iter().map(|v| v.id()).collect();
                CallbenchError::Validation(format!(
                    "unknown voice '{}'; choose one of: {}",
                    s,
                    ids.join(", ")
                ))
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Style
// ─────────────────────────────────────────────────────────────────────────────

/// Delivery style, expressed through light punctuation changes in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Style {
    /// "freundlich & ruhig": pauses after the greeting and the apology.
    #[default]
    FriendlyCalm,
    /// "neutral": text is sent as typed.
    Neutral,
    /// "hell & freundlich"
    BrightFriendly,
    /// "lebendig": a dash after the greeting.
    Lively,
}

impl Style {
    pub const ALL: [Style; 4] = [
        Style::FriendlyCalm,
        Style::Neutral,
        Style::BrightFriendly,
        Style::Lively,
    ];

    /// Label as shown in the style picker.
    pub fn label(self) -> &'static str {
        match self {
            Style::FriendlyCalm => "freundlich & ruhig",
            Style::Neutral => "neutral",
            Style::BrightFriendly => "hell & freundlich",
            Style::Lively => "lebendig",
        }
    }

    /// Parse a picker label; anything unrecognised falls back to [`Style::Neutral`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Style::ALL
            .into_iter()
            .find(|s| s.label() == label)
            .unwrap_or(Style::Neutral)
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AnnouncementRequest
// ─────────────────────────────────────────────────────────────────────────────

/// Validated parameters of one announcement render.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementRequest {
    pub text: String,
    pub voice: Voice,
    pub style: Style,
    pub start_delay_ms: u32,
    pub music_gain_db: i32,
    pub music_path: Option<PathBuf>,
    pub speed_factor: f64,
    pub pitch_semitones: f64,
}

impl AnnouncementRequest {
    /// Text after the style substitutions, as it will be sent for synthesis.
    pub fn styled_text(&self) -> String {
        crate::style::stylize(&self.text, self.style)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequestForm
// ─────────────────────────────────────────────────────────────────────────────

/// Raw form fields exactly as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestForm {
    pub text: String,
    pub voice: String,
    pub style: String,
    pub start_delay_ms: String,
    pub music_gain_db: String,
    pub music_path: String,
    pub speed_factor: String,
    pub pitch_semitones: String,
}

impl Default for RequestForm {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice: Voice::default().id().to_string(),
            style: Style::default().label().to_string(),
            start_delay_ms: "1000".to_string(),
            music_gain_db: "-18".to_string(),
            music_path: String::new(),
            speed_factor: "1.0".to_string(),
            pitch_semitones: "0".to_string(),
        }
    }
}

fn parse_field<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        CallbenchError::Validation(format!("'{}' is not a valid number for {}", raw.trim(), name))
    })
}

impl RequestForm {
    /// Check every field and build the immutable request.
    ///
    /// Fails on empty text, a voice outside [`Voice::ALL`], or any numeric
    /// field that does not parse. No job is created on failure.
    pub fn validate(&self) -> Result<AnnouncementRequest> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(CallbenchError::Validation("announcement text is empty".into()));
        }

        let voice: Voice = self.voice.parse()?;

        let start_delay_ms: u32 = parse_field("start delay (ms)", &self.start_delay_ms)?;
        let music_gain_db: i32 = parse_field("music gain (dB)", &self.music_gain_db)?;
        let speed_factor: f64 = parse_field("speed factor", &self.speed_factor)?;
        let pitch_semitones: f64 = parse_field("pitch (semitones)", &self.pitch_semitones)?;

        if !speed_factor.is_finite() || speed_factor <= 0.0 {
            return Err(CallbenchError::Validation(format!(
                "speed factor must be positive, got {}",
                speed_factor
            )));
        }
        if !pitch_semitones.is_finite() {
            return Err(CallbenchError::Validation("pitch must be a finite number".into()));
        }

        let music_path = match self.music_path.trim() {
            "" => None,
            p => Some(PathBuf::from(p)),
        };

        Ok(AnnouncementRequest {
            text: text.to_string(),
            voice,
            style: Style::from_label(&self.style),
            start_delay_ms,
            music_gain_db,
            music_path,
            speed_factor,
            pitch_semitones,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
