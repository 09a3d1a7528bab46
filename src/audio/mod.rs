//! Sound effects under browser autoplay rules.
//!
//! Nothing may sound before the page has seen a user gesture. `AudioGate`
//! tracks that one-way unlock and decides what happens to requests made
//! before it; `SoundController` glues the gate to a backend and maps round
//! events to cues.

pub mod web;

use std::collections::VecDeque;

use crate::config::AudioConfig;
use crate::error::Result;
use crate::game::{Outcome, RoundEvent};

#[cfg(feature = "serde")]
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundKey {
    Click,
    Tick,
    Result,
}

impl SoundKey {
    pub const ALL: [SoundKey; 3] = [SoundKey::Click, SoundKey::Tick, SoundKey::Result];

    pub fn file_name(self) -> &'static str {
        match self {
            SoundKey::Click => "click.mp3",
            SoundKey::Tick => "tick.mp3",
            SoundKey::Result => "result.mp3",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayRequest {
    pub key: SoundKey,
    /// 0..=1
    pub gain: f32,
    pub rate: f32,
}

impl PlayRequest {
    pub fn new(key: SoundKey, gain: f32, rate: f32) -> Self {
        Self {
            key,
            gain: gain.clamp(0.0, 1.0),
            rate: if rate > 0.0 { rate } else { 1.0 },
        }
    }
}

/// What to do with a play request that arrives before unlock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum PendingPolicy {
    /// Hold it and play it once unlocked.
    #[default]
    Queue,
    Drop,
}

pub struct AudioGate {
    unlocked: bool,
    policy: PendingPolicy,
    max_pending: usize,
    pending: VecDeque<PlayRequest>,
}

impl AudioGate {
    pub fn new(policy: PendingPolicy, max_pending: usize) -> Self {
        Self {
            unlocked: false,
            policy,
            max_pending,
            pending: VecDeque::new(),
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// `Some` if the request may play right now.
    pub fn admit(&mut self, req: PlayRequest) -> Option<PlayRequest> {
        if self.unlocked {
            return Some(req);
        }
        if self.policy == PendingPolicy::Queue && self.max_pending > 0 {
            if self.pending.len() == self.max_pending {
                self.pending.pop_front();
            }
            self.pending.push_back(req);
        }
        None
    }

    /// Flip to unlocked. Returns the held requests the first time only.
    pub fn unlock(&mut self) -> Option<Vec<PlayRequest>> {
        if self.unlocked {
            return None;
        }
        self.unlocked = true;
        Some(self.pending.drain(..).collect())
    }
}

/// Gain and playback rate for one cue.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct Cue {
    pub gain: f32,
    pub rate: f32,
}

impl Cue {
    pub const fn new(gain: f32, rate: f32) -> Self {
        Self { gain, rate }
    }

    fn request(self, key: SoundKey) -> PlayRequest {
        PlayRequest::new(key, self.gain, self.rate)
    }
}

/// Every cue the device plays. Results share one sample and differ by pitch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(default))]
pub struct CueSheet {
    pub start: Cue,
    pub tick: Cue,
    pub capture: Cue,
    pub forfeit: Cue,
    pub win: Cue,
    pub draw: Cue,
    pub lose: Cue,
}

impl Default for CueSheet {
    fn default() -> Self {
        Self {
            start: Cue::new(0.002, 1.0),
            tick: Cue::new(0.05, 1.0),
            capture: Cue::new(0.9, 1.5),
            forfeit: Cue::new(0.02, 0.7),
            win: Cue::new(0.02, 1.25),
            draw: Cue::new(0.02, 1.0),
            lose: Cue::new(0.02, 0.8),
        }
    }
}

impl CueSheet {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Cue)> {
        [
            ("start", self.start),
            ("tick", self.tick),
            ("capture", self.capture),
            ("forfeit", self.forfeit),
            ("win", self.win),
            ("draw", self.draw),
            ("lose", self.lose),
        ]
        .into_iter()
    }

    /// Cue for a round event, if it has one.
    pub fn for_event(&self, event: &RoundEvent) -> Option<PlayRequest> {
        match event {
            RoundEvent::RoundTicked { .. } => Some(self.tick.request(SoundKey::Tick)),
            RoundEvent::MoveCaptured(_) => Some(self.capture.request(SoundKey::Click)),
            RoundEvent::RoundForfeited => Some(self.forfeit.request(SoundKey::Result)),
            RoundEvent::RoundResolved { outcome, .. } => {
                let cue = match outcome {
                    Outcome::Win => self.win,
                    Outcome::Draw => self.draw,
                    Outcome::Lose => self.lose,
                    Outcome::Forfeit => self.forfeit,
                };
                Some(cue.request(SoundKey::Result))
            }
            RoundEvent::RoundStarted | RoundEvent::ReturnedToTitle => None,
        }
    }

    /// The start button's own click.
    pub fn start_request(&self) -> PlayRequest {
        self.start.request(SoundKey::Click)
    }
}

/// Whatever actually makes noise.
pub trait AudioBackend {
    /// Create/resume the output and push a silent buffer through it. Called
    /// synchronously from inside a user-gesture handler.
    fn activate(&mut self) -> Result<()>;
    /// Start one independent playback. A sound that is not loaded is a no-op.
    fn play(&mut self, req: PlayRequest) -> Result<()>;
}

pub struct SoundController<B> {
    gate: AudioGate,
    backend: B,
    cues: CueSheet,
    enabled: bool,
}

impl<B: AudioBackend> SoundController<B> {
    pub fn new(config: &AudioConfig, backend: B) -> Self {
        Self {
            gate: AudioGate::new(config.pending, config.max_pending),
            backend,
            cues: config.cues.clone(),
            enabled: config.enabled,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn pending(&self) -> usize {
        self.gate.pending()
    }

    /// Gesture hook. Safe to call on every click; only the first successful
    /// activation unlocks and flushes.
    pub fn unlock(&mut self) {
        if !self.enabled || self.gate.is_unlocked() {
            return;
        }
        if let Err(e) = self.backend.activate() {
            log::warn!("audio unlock failed, staying silent: {e}");
            return;
        }
        if let Some(held) = self.gate.unlock() {
            log::debug!("audio unlocked, flushing {} queued cue(s)", held.len());
            for req in held {
                self.play_now(req);
            }
        }
    }

    pub fn play(&mut self, req: PlayRequest) {
        if !self.enabled {
            return;
        }
        if let Some(req) = self.gate.admit(req) {
            self.play_now(req);
        }
    }

    pub fn on_round_event(&mut self, event: &RoundEvent) {
        if let Some(req) = self.cues.for_event(event) {
            self.play(req);
        }
    }

    pub fn play_start(&mut self) {
        self.play(self.cues.start_request());
    }

    fn play_now(&mut self, req: PlayRequest) {
        if let Err(e) = self.backend.play(req) {
            log::warn!("{:?} playback failed: {e}", req.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_bounded_oldest_first_out() {
        let mut gate = AudioGate::new(PendingPolicy::Queue, 2);
        for rate in [1.0, 2.0, 3.0] {
            assert!(gate.admit(PlayRequest::new(SoundKey::Tick, 0.1, rate)).is_none());
        }
        let held = gate.unlock().unwrap();
        assert_eq!(held.iter().map(|r| r.rate).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert!(gate.unlock().is_none());
    }

    #[test]
    fn drop_policy_holds_nothing() {
        let mut gate = AudioGate::new(PendingPolicy::Drop, 16);
        gate.admit(PlayRequest::new(SoundKey::Click, 1.0, 1.0));
        assert_eq!(gate.pending(), 0);
        assert_eq!(gate.unlock(), Some(vec![]));
    }

    #[test]
    fn request_values_are_sanitised() {
        let r = PlayRequest::new(SoundKey::Click, 4.0, -1.0);
        assert_eq!(r.gain, 1.0);
        assert_eq!(r.rate, 1.0);
    }

    #[test]
    fn every_sounding_event_has_a_distinct_purpose() {
        let cues = CueSheet::default();
        assert_eq!(cues.for_event(&RoundEvent::RoundTicked { remaining: 2 }).unwrap().key, SoundKey::Tick);
        assert_eq!(cues.for_event(&RoundEvent::RoundForfeited).unwrap().key, SoundKey::Result);
        assert!(cues.for_event(&RoundEvent::RoundStarted).is_none());
        assert!(cues.for_event(&RoundEvent::ReturnedToTitle).is_none());
    }

    #[test]
    fn start_click_is_barely_audible() {
        let req = CueSheet::default().start_request();
        assert_eq!(req.key, SoundKey::Click);
        assert_eq!(req.gain, 0.002);
    }
}
