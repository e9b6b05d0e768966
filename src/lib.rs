//! # callbench
//!
//! Announcement recorder: type a text, pick a voice, get a voice + music
//! mix as WAV and MP3 in `~/Downloads/Callbench`.
//!
//! ## Quick start
//!
//! ```no_run
//! use callbench::{Dispatcher, RenderJob, Renderer, RequestForm, Settings};
//!
//! let settings = Settings::default();
//! let renderer = Renderer::new(settings.synthesizer(), settings.output_layout());
//! let mut dispatcher = Dispatcher::new(renderer);
//!
//! let form = RequestForm {
//!     text: "Hallo, hier ist der Anrufbeantworter der Praxis.".into(),
//!     voice: "coral".into(),
//!     music_path: "musik.mp3".into(),
//!     ..RequestForm::default()
//! };
//! let job = RenderJob::from_form(&form, "sk-…").unwrap();
//! dispatcher.submit(job).unwrap();
//! let result = dispatcher.wait().unwrap().unwrap();
//! println!("{}", result.mp3.display());
//! ```
//!
//! ## Pipeline
//! 1. **Styling** — punctuation tweaks per delivery style ([`style`]).
//! 2. **Synthesis** — one blocking request to the TTS service, WAV streamed to disk ([`synth`]).
//! 3. **Speed / pitch** — sample-rate reinterpretation + resampling ([`transform`]).
//! 4. **Mix** — start delay, looped and faded music, overlay, fade-out ([`mix`]).
//! 5. **Export** — 16-bit WAV and 192 kbit/s MP3 ([`audio::encode`]).
//!
//! Steps 2–5 run on a worker thread owned by the [`Dispatcher`]; only one
//! job runs at a time.

pub mod audio;
pub mod config;
pub mod credentials;
pub mod error;
pub mod job;
pub mod mix;
pub mod output;
pub mod request;
pub mod style;
pub mod synth;
pub mod transform;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{AudioBuffer, CANONICAL_RATE};
pub use config::Settings;
pub use error::CallbenchError;
pub use job::{Dispatcher, JobEvent, JobStatus, RenderJob, RenderResult, Renderer, Stage};
pub use request::{AnnouncementRequest, RequestForm, Style, Voice};
