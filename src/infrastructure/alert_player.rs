use crate::domain::alerts::Tone;
use std::sync::Mutex;

/// Audible cue output. Hosts without audio use [`NoopAlertPlayer`].
pub trait AlertPlayer: Send + Sync {
    fn play(&self, tones: &[Tone]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertPlayer;

impl AlertPlayer for NoopAlertPlayer {
    fn play(&self, _tones: &[Tone]) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAlertPlayer;

impl AlertPlayer for LoggingAlertPlayer {
    fn play(&self, tones: &[Tone]) {
        let frequencies: Vec<f64> = tones.iter().map(|tone| tone.frequency_hz).collect();
        let total_ms: u64 = tones.iter().map(|tone| tone.duration_ms).sum();
        tracing::info!(?frequencies, total_ms, "alert chime");
    }
}

/// Records each chime; used by notification tests.
#[derive(Debug, Default)]
pub struct RecordingAlertPlayer {
    played: Mutex<Vec<Vec<Tone>>>,
}

impl RecordingAlertPlayer {
    pub fn play_count(&self) -> usize {
        self.played.lock().map(|played| played.len()).unwrap_or(0)
    }
}

impl AlertPlayer for RecordingAlertPlayer {
    fn play(&self, tones: &[Tone]) {
        if let Ok(mut played) = self.played.lock() {
            played.push(tones.to_vec());
        }
    }
}
