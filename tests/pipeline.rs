//! End-to-end render tests with a fake speech service.
//!
//! The fake writes a known WAV instead of calling the network, so the whole
//! styler → synthesis → mix → export path runs through the dispatcher.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use callbench::{
    output::{NamingStrategy, OutputLayout},
    synth::SpeechSynthesizer,
    CallbenchError, Dispatcher, JobStatus, RenderJob, Renderer, RequestForm, Voice,
};

const RATE: u32 = 44_100;

fn write_wav(path: &Path, value: f32, ms: u64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    let frames = RATE as u64 * ms / 1000;
    for _ in 0..frames {
        w.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    w.finalize().unwrap();
}

fn read_wav(path: &Path) -> (hound::WavSpec, Vec<f32>) {
    let mut r = hound::WavReader::open(path).unwrap();
    let spec = r.spec();
    let samples = r
        .samples::<i16>()
        .map(|s| s.unwrap() as f32 / i16::MAX as f32)
        .collect();
    (spec, samples)
}

#[derive(Default)]
struct FakeState {
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

/// Writes `voice_ms` of a constant 0.25 tone, or fails when `fail` is set.
struct FakeSpeech {
    state: Arc<FakeState>,
    voice_ms: u64,
    fail: bool,
}

impl SpeechSynthesizer for FakeSpeech {
    fn synthesize(
        &self,
        text: &str,
        _voice: Voice,
        api_key: &str,
        dest: &Path,
    ) -> Result<(), CallbenchError> {
        assert_eq!(api_key, "sk-test");
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(CallbenchError::Synthesis(anyhow::anyhow!("401 invalid api key")));
        }
        write_wav(dest, 0.25, self.voice_ms);
        Ok(())
    }
}

fn dispatcher(
    dir: &Path,
    naming: NamingStrategy,
    voice_ms: u64,
    fail: bool,
) -> (Dispatcher<Renderer<FakeSpeech>>, Arc<FakeState>) {
    let state = Arc::new(FakeState::default());
    let synth = FakeSpeech { state: Arc::clone(&state), voice_ms, fail };
    let renderer = Renderer::new(synth, OutputLayout::new(dir, naming));
    (Dispatcher::new(renderer), state)
}

fn form(text: &str) -> RequestForm {
    RequestForm { text: text.into(), ..RequestForm::default() }
}

#[test]
fn voice_only_is_delayed_and_faded() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut d, state) = dispatcher(tmp.path(), NamingStrategy::Timestamped, 1000, false);

    let f = RequestForm { start_delay_ms: "500".into(), ..form("Hallo, hier ist ein Test.") };
    assert!(d.submit(RenderJob::from_form(&f, "sk-test").unwrap()).unwrap());
    let result = d.wait().unwrap().unwrap();
    assert_eq!(d.status(), JobStatus::Succeeded);

    assert_eq!(state.texts.lock().unwrap().as_slice(), ["Hallo … hier ist ein Test."]);
    assert!(result.wav.exists());
    assert!(result.mp3.exists());
    assert_eq!(result.wav.parent().unwrap(), tmp.path());

    let (spec, samples) = read_wav(&result.wav);
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(spec.channels, 1);
    // 500 ms delay + 1000 ms voice.
    assert_eq!(samples.len(), 22_050 + 44_100);
    assert!(samples[..22_050].iter().all(|&s| s == 0.0));
    // Voice at full level before the 400 ms fade-out, silent at the end.
    assert!((samples[30_000] - 0.25).abs() < 1e-3);
    assert!(samples[samples.len() - 17_640 - 1] > 0.24);
    assert!(samples[samples.len() - 1].abs() < 1e-3);
}

#[test]
fn music_is_looped_under_the_voice() {
    let tmp = tempfile::tempdir().unwrap();
    let music = tmp.path().join("musik.wav");
    write_wav(&music, 0.5, 2000);

    let out_dir = tmp.path().join("out");
    let (mut d, _state) = dispatcher(&out_dir, NamingStrategy::Fixed, 4500, false);

    let f = RequestForm {
        start_delay_ms: "500".into(),
        music_gain_db: "-18".into(),
        music_path: music.to_string_lossy().into_owned(),
        ..form("Guten Tag.")
    };
    d.submit(RenderJob::from_form(&f, "sk-test").unwrap()).unwrap();
    let result = d.wait().unwrap().unwrap();
    assert_eq!(result.wav, out_dir.join("ansage.wav"));

    let (_, samples) = read_wav(&result.wav);
    // Padded voice is 5000 ms; the music is cut to the same length.
    assert_eq!(samples.len(), 5 * RATE as usize);

    let music_level = 0.5 * 10f32.powf(-18.0 / 20.0);
    // Fade-in starts from silence.
    assert!(samples[0].abs() < 1e-3);
    // After the 300 ms fade-in, during the delay: music only.
    assert!((samples[RATE as usize * 400 / 1000] - music_level).abs() < 2e-3);
    // Third repetition of the music, under the voice.
    assert!((samples[RATE as usize * 4200 / 1000] - (0.25 + music_level)).abs() < 2e-3);
}

#[test]
fn missing_music_file_means_voice_only() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut d, _) = dispatcher(tmp.path(), NamingStrategy::Fixed, 1000, false);
    let f = RequestForm {
        start_delay_ms: "0".into(),
        music_path: tmp.path().join("fehlt.mp3").to_string_lossy().into_owned(),
        ..form("Test")
    };
    d.submit(RenderJob::from_form(&f, "sk-test").unwrap()).unwrap();
    let result = d.wait().unwrap().unwrap();
    let (_, samples) = read_wav(&result.wav);
    assert_eq!(samples.len(), RATE as usize);
    assert!((samples[1000] - 0.25).abs() < 1e-3);
}

#[test]
fn invalid_voice_never_reaches_the_service() {
    let tmp = tempfile::tempdir().unwrap();
    let (d, state) = dispatcher(tmp.path(), NamingStrategy::Fixed, 300, false);

    let f = RequestForm { voice: "robo1".into(), ..form("Hallo") };
    let err = RenderJob::from_form(&f, "sk-test").unwrap_err();
    assert!(matches!(err, CallbenchError::Validation(_)));

    assert_eq!(d.status(), JobStatus::Idle);
    assert_eq!(state.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn synthesis_failure_marks_job_failed() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut d, state) = dispatcher(tmp.path(), NamingStrategy::Fixed, 300, true);
    d.submit(RenderJob::from_form(&form("Hallo"), "sk-test").unwrap()).unwrap();

    let err = d.wait().unwrap().unwrap_err();
    assert!(matches!(err, CallbenchError::Synthesis(_)));
    assert!(err.to_string().contains("401"));
    assert_eq!(d.status(), JobStatus::Failed);
    assert!(!d.is_busy());
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    assert!(!tmp.path().join("ansage.wav").exists());
}

#[test]
fn fixed_names_overwrite_previous_run() {
    let tmp = tempfile::tempdir().unwrap();
    let (mut d, state) = dispatcher(tmp.path(), NamingStrategy::Fixed, 200, false);

    let mut paths: Vec<PathBuf> = Vec::new();
    for delay in ["0", "1000"] {
        let f = RequestForm { start_delay_ms: delay.into(), ..form("Hallo") };
        d.submit(RenderJob::from_form(&f, "sk-test").unwrap()).unwrap();
        paths.push(d.wait().unwrap().unwrap().wav);
    }
    assert_eq!(paths[0], paths[1]);
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);

    let (_, samples) = read_wav(&paths[1]);
    assert_eq!(samples.len(), RATE as usize * 1200 / 1000);
}
