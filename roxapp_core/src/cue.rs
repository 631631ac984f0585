//! Audible cues for timer transitions.
//!
//! Every cue maps to a tone through a [`CueProfile`]. Emitters may fail (no
//! audio device, no permission yet); the engine logs the failure and carries
//! on, so a missing cue never blocks a state change.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Events that produce a tone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// Session started
    Start,
    /// Seconds left before the next EMOM interval (3, 2, 1)
    Countdown(u32),
    /// EMOM interval boundary, next exercise is up
    Transition,
    /// Manual advance to the next exercise
    NextExercise,
    /// Athlete reported a finished round
    NextRound,
    /// Section finished
    Complete,
}

/// A sine tone definition
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Tone {
    pub const fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// Tone assigned to each cue class
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CueProfile {
    #[serde(default = "default_start")]
    pub start: Tone,
    #[serde(default = "default_countdown")]
    pub countdown: Tone,
    #[serde(default = "default_transition")]
    pub transition: Tone,
    #[serde(default = "default_next_exercise")]
    pub next_exercise: Tone,
    #[serde(default = "default_next_round")]
    pub next_round: Tone,
    #[serde(default = "default_complete")]
    pub complete: Tone,
}

fn default_start() -> Tone {
    Tone::new(1200, 100)
}

fn default_countdown() -> Tone {
    Tone::new(800, 100)
}

fn default_transition() -> Tone {
    Tone::new(1200, 200)
}

fn default_next_exercise() -> Tone {
    Tone::new(900, 100)
}

fn default_next_round() -> Tone {
    Tone::new(1100, 150)
}

fn default_complete() -> Tone {
    Tone::new(600, 300)
}

impl Default for CueProfile {
    fn default() -> Self {
        Self {
            start: default_start(),
            countdown: default_countdown(),
            transition: default_transition(),
            next_exercise: default_next_exercise(),
            next_round: default_next_round(),
            complete: default_complete(),
        }
    }
}

impl CueProfile {
    pub fn tone(&self, cue: Cue) -> Tone {
        match cue {
            Cue::Start => self.start,
            Cue::Countdown(_) => self.countdown,
            Cue::Transition => self.transition,
            Cue::NextExercise => self.next_exercise,
            Cue::NextRound => self.next_round,
            Cue::Complete => self.complete,
        }
    }
}

/// Sink for cue tones
pub trait CueEmitter {
    /// Acquire the output device. Must be idempotent.
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    /// Play one tone. Implementations acquire lazily if needed.
    fn play(&mut self, cue: Cue, tone: Tone) -> Result<()>;

    /// Release whatever `acquire` obtained.
    fn release(&mut self) {}
}

impl<T: CueEmitter + ?Sized> CueEmitter for Box<T> {
    fn acquire(&mut self) -> Result<()> {
        (**self).acquire()
    }

    fn play(&mut self, cue: Cue, tone: Tone) -> Result<()> {
        (**self).play(cue, tone)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Emitter that plays nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentCues;

impl CueEmitter for SilentCues {
    fn play(&mut self, _cue: Cue, _tone: Tone) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Recording emitter
// ============================================================================

#[derive(Debug, Default)]
struct CueRecord {
    played: Vec<Cue>,
    unread: usize,
    acquisitions: u32,
    acquired: bool,
    released: bool,
    failing: bool,
}

/// Emitter that records cues instead of playing them
///
/// Clones share one record, so a caller can inspect cues played by an
/// engine that owns another clone.
#[derive(Clone, Debug, Default)]
pub struct CueLog {
    inner: Rc<RefCell<CueRecord>>,
}

impl CueLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose every `acquire`/`play` fails, for exercising degradation
    pub fn failing() -> Self {
        let log = Self::default();
        log.inner.borrow_mut().failing = true;
        log
    }

    /// Every cue played so far
    pub fn played(&self) -> Vec<Cue> {
        self.inner.borrow().played.clone()
    }

    /// Cues played since the last call to `take_new`
    pub fn take_new(&self) -> Vec<Cue> {
        let mut rec = self.inner.borrow_mut();
        let start = rec.played.len() - rec.unread;
        rec.unread = 0;
        rec.played[start..].to_vec()
    }

    pub fn count(&self, cue: Cue) -> usize {
        self.inner.borrow().played.iter().filter(|c| **c == cue).count()
    }

    /// How many times the device was actually opened
    pub fn acquisitions(&self) -> u32 {
        self.inner.borrow().acquisitions
    }

    pub fn is_released(&self) -> bool {
        self.inner.borrow().released
    }
}

impl CueEmitter for CueLog {
    fn acquire(&mut self) -> Result<()> {
        let mut rec = self.inner.borrow_mut();
        if rec.failing {
            return Err(Error::Audio("no audio device".into()));
        }
        if !rec.acquired {
            rec.acquired = true;
            rec.released = false;
            rec.acquisitions += 1;
        }
        Ok(())
    }

    fn play(&mut self, cue: Cue, _tone: Tone) -> Result<()> {
        self.acquire()?;
        let mut rec = self.inner.borrow_mut();
        rec.played.push(cue);
        rec.unread += 1;
        Ok(())
    }

    fn release(&mut self) {
        let mut rec = self.inner.borrow_mut();
        rec.acquired = false;
        rec.released = true;
    }
}

// ============================================================================
// Terminal bell
// ============================================================================

/// Rings the terminal bell on stderr for every cue
#[derive(Default)]
pub struct TerminalBell {
    out: Option<std::io::Stderr>,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CueEmitter for TerminalBell {
    fn acquire(&mut self) -> Result<()> {
        if self.out.is_none() {
            self.out = Some(std::io::stderr());
        }
        Ok(())
    }

    fn play(&mut self, cue: Cue, tone: Tone) -> Result<()> {
        self.acquire()?;
        if let Some(out) = self.out.as_mut() {
            // Completion gets a double ring
            let bells: &[u8] = if cue == Cue::Complete { b"\x07\x07" } else { b"\x07" };
            out.write_all(bells)?;
            out.flush()?;
        }
        tracing::trace!("bell for {:?} ({} Hz)", cue, tone.frequency_hz);
        Ok(())
    }

    fn release(&mut self) {
        self.out = None;
    }
}

// ============================================================================
// Sine tones through the default audio device
// ============================================================================

#[cfg(feature = "audio")]
pub use tone::ToneCues;

#[cfg(feature = "audio")]
mod tone {
    use super::{Cue, CueEmitter, Tone};
    use crate::{Error, Result};
    use rodio::source::{SineWave, Source};
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use std::time::Duration;

    /// Plays cues as sine tones on the default output device
    ///
    /// The output stream is opened on first use and kept until `release`.
    pub struct ToneCues {
        volume: f32,
        output: Option<(OutputStream, OutputStreamHandle)>,
    }

    impl ToneCues {
        pub fn new(volume: f32) -> Self {
            Self {
                volume: volume.clamp(0.0, 1.0),
                output: None,
            }
        }
    }

    impl CueEmitter for ToneCues {
        fn acquire(&mut self) -> Result<()> {
            if self.output.is_none() {
                let pair = OutputStream::try_default()
                    .map_err(|e| Error::Audio(format!("Failed to open output: {}", e)))?;
                tracing::debug!("Opened audio output stream");
                self.output = Some(pair);
            }
            Ok(())
        }

        fn play(&mut self, cue: Cue, tone: Tone) -> Result<()> {
            self.acquire()?;
            let Some((_, handle)) = self.output.as_ref() else {
                return Ok(());
            };
            let sink =
                Sink::try_new(handle).map_err(|e| Error::Audio(format!("{:?}: {}", cue, e)))?;
            let source = SineWave::new(tone.frequency_hz as f32)
                .take_duration(Duration::from_millis(u64::from(tone.duration_ms)))
                .amplify(self.volume);
            sink.append(source);
            sink.detach();
            Ok(())
        }

        fn release(&mut self) {
            if self.output.take().is_some() {
                tracing::debug!("Closed audio output stream");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_tones_are_distinct() {
        let profile = CueProfile::default();
        assert_eq!(profile.tone(Cue::Start), Tone::new(1200, 100));
        assert_eq!(profile.tone(Cue::Countdown(2)), Tone::new(800, 100));
        assert_eq!(profile.tone(Cue::Transition), Tone::new(1200, 200));
        assert_eq!(profile.tone(Cue::Complete), Tone::new(600, 300));

        // Completion is the lowest and longest tone
        let complete = profile.tone(Cue::Complete);
        for cue in [Cue::Start, Cue::Countdown(1), Cue::Transition, Cue::NextRound] {
            let tone = profile.tone(cue);
            assert!(complete.frequency_hz < tone.frequency_hz);
            assert!(complete.duration_ms > tone.duration_ms);
        }
    }

    #[test]
    fn test_cue_log_acquires_once() {
        let mut log = CueLog::new();
        log.acquire().unwrap();
        log.acquire().unwrap();
        log.play(Cue::Start, Tone::new(1, 1)).unwrap();
        assert_eq!(log.acquisitions(), 1);
        assert_eq!(log.played(), vec![Cue::Start]);
    }

    #[test]
    fn test_cue_log_take_new() {
        let mut log = CueLog::new();
        log.play(Cue::Start, Tone::new(1, 1)).unwrap();
        assert_eq!(log.take_new(), vec![Cue::Start]);
        log.play(Cue::NextRound, Tone::new(1, 1)).unwrap();
        log.play(Cue::Complete, Tone::new(1, 1)).unwrap();
        assert_eq!(log.take_new(), vec![Cue::NextRound, Cue::Complete]);
        assert!(log.take_new().is_empty());
        assert_eq!(log.played().len(), 3);
    }

    #[test]
    fn test_boxed_emitter_forwards() {
        let log = CueLog::new();
        let mut boxed: Box<dyn CueEmitter> = Box::new(log.clone());
        boxed.play(Cue::NextExercise, Tone::new(900, 100)).unwrap();
        boxed.release();
        assert_eq!(log.played(), vec![Cue::NextExercise]);
        assert!(log.is_released());
    }

    #[test]
    fn test_failing_log_reports_errors() {
        let mut log = CueLog::failing();
        assert!(log.acquire().is_err());
        assert!(log.play(Cue::Start, Tone::new(1, 1)).is_err());
        assert!(log.played().is_empty());
    }

    #[test]
    fn test_partial_profile_toml() {
        let toml_str = r#"
[complete]
frequency_hz = 440
duration_ms = 500
"#;
        let profile: CueProfile = toml::from_str(toml_str).unwrap();
        assert_eq!(profile.complete, Tone::new(440, 500));
        assert_eq!(profile.start, Tone::new(1200, 100));
    }
}
