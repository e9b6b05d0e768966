//! `callbench` — render a phone announcement from the command line.
//!
//! Usage:
//!   callbench --text "Hallo, hier ist die Praxis…" --voice coral --music musik.mp3
//!   callbench --text-file ansage.txt --style lebendig --speed 1.1 --pitch -1
//!   callbench set-key
//!   callbench voices
//!
//! Logging goes to stderr; set `RUST_LOG=callbench=debug` for details.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callbench::{
    config::KeyStrategy,
    credentials::resolve_api_key,
    output::{open_folder, NamingStrategy},
    CallbenchError, Dispatcher, JobEvent, RenderJob, Renderer, RequestForm, Settings, Style,
    Voice,
};

#[derive(Debug, Parser)]
#[command(name = "callbench", version, about = "Announcement recorder: TTS voice + background music → WAV and MP3")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// JSON settings file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the API key comes from.
    #[arg(long, global = true, value_enum)]
    key_source: Option<KeySourceArg>,

    /// Output folder (default: ~/Downloads/Callbench).
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Overwrite ansage.wav / ansage.mp3 instead of timestamped names.
    #[arg(long, global = true)]
    fixed_names: bool,

    /// Do not open the output folder when done.
    #[arg(long, global = true)]
    no_open: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a new API key in the credential store.
    SetKey,
    /// List the available voices and styles.
    Voices,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeySourceArg {
    Keyring,
    Env,
}

/// Form fields. Numbers are taken verbatim and validated with the form.
#[derive(Debug, Args)]
struct GenerateArgs {
    /// Announcement text.
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,

    /// Read the announcement text from a file.
    #[arg(long)]
    text_file: Option<PathBuf>,

    #[arg(long, default_value = "nova")]
    voice: String,

    #[arg(long, default_value = "freundlich & ruhig")]
    style: String,

    /// Silence before the voice starts, in milliseconds.
    #[arg(long, default_value = "1000", allow_hyphen_values = true)]
    delay_ms: String,

    /// Music level in dB (negative attenuates).
    #[arg(long, default_value = "-18", allow_hyphen_values = true)]
    gain_db: String,

    /// Background music file (mp3, wav, m4a, flac, ogg).
    #[arg(long)]
    music: Option<String>,

    /// Tempo factor; 1.0 = unchanged.
    #[arg(long, default_value = "1.0", allow_hyphen_values = true)]
    speed: String,

    /// Pitch shift in semitones; 0 = unchanged.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pitch: String,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("callbench=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).compact())
        .try_init()
        .ok();
}

/// Read an API key from stdin. `None` on EOF or an empty line.
fn prompt_for_key() -> Option<String> {
    eprint!("Please enter your OpenAI API key: ");
    std::io::stderr().flush().ok()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line).ok()?;
    let key = line.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn settings_from(cli: &Cli) -> Result<Settings, CallbenchError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(src) = cli.key_source {
        settings.key_source = match src {
            KeySourceArg::Keyring => KeyStrategy::Keyring,
            KeySourceArg::Env => KeyStrategy::Env,
        };
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.clone());
    }
    if cli.fixed_names {
        settings.naming = NamingStrategy::Fixed;
    }
    if cli.no_open {
        settings.open_folder = false;
    }
    Ok(settings)
}

fn set_key(settings: &Settings) -> Result<(), CallbenchError> {
    let source = settings.key_source()?;
    let key = prompt_for_key()
        .ok_or_else(|| CallbenchError::Configuration("no API key entered".to_string()))?;
    source.set(&key)?;
    println!("API key saved ({}).", source.describe());
    Ok(())
}

fn list_voices() {
    println!("Voices:");
    for v in Voice::ALL {
        println!("  {}", v);
    }
    println!("Styles:");
    for s in Style::ALL {
        println!("  {}", s);
    }
}

fn generate(settings: &Settings, args: &GenerateArgs) -> Result<(), CallbenchError> {
    let source = settings.key_source()?;
    let api_key = resolve_api_key(source.as_ref(), prompt_for_key)?;

    let text = match (&args.text, &args.text_file) {
        (Some(t), _) => t.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => String::new(),
    };
    let form = RequestForm {
        text,
        voice: args.voice.clone(),
        style: args.style.clone(),
        start_delay_ms: args.delay_ms.clone(),
        music_gain_db: args.gain_db.clone(),
        music_path: args.music.clone().unwrap_or_default(),
        speed_factor: args.speed.clone(),
        pitch_semitones: args.pitch.clone(),
    };
    let job = RenderJob::from_form(&form, api_key)?;

    let renderer = Renderer::new(settings.synthesizer(), settings.output_layout());
    let mut dispatcher = Dispatcher::new(renderer);
    dispatcher.submit(job)?;

    while let Some(event) = dispatcher.wait_event() {
        match event {
            JobEvent::Progress(stage) => eprintln!("{}", stage.message()),
            JobEvent::Finished(Ok(result)) => {
                println!("Done. Saved to:\n{}\n{}", result.wav.display(), result.mp3.display());
                if settings.open_folder {
                    open_folder(&result.dir);
                }
            }
            JobEvent::Finished(Err(e)) => return Err(e),
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CallbenchError> {
    let settings = settings_from(&cli)?;
    match cli.command {
        Some(Command::SetKey) => set_key(&settings),
        Some(Command::Voices) => {
            list_voices();
            Ok(())
        }
        None => generate(&settings, &cli.generate),
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
