// Integration tests (native) for the sound controller: unlock gating,
// pending-request policy and round cues, against a recording backend.

use rps_device::DeviceError;
use rps_device::audio::{
    AudioBackend, Cue, CueSheet, PendingPolicy, PlayRequest, SoundController, SoundKey,
};
use rps_device::config::AudioConfig;
use rps_device::error::Result;
use rps_device::game::{Move, Outcome, RoundEvent};

#[derive(Default)]
struct Recorder {
    activations: usize,
    fail_activation: bool,
    played: Vec<PlayRequest>,
}

impl AudioBackend for Recorder {
    fn activate(&mut self) -> Result<()> {
        self.activations += 1;
        if self.fail_activation {
            return Err(DeviceError::AudioUnavailable("test".into()));
        }
        Ok(())
    }

    fn play(&mut self, req: PlayRequest) -> Result<()> {
        self.played.push(req);
        Ok(())
    }
}

fn controller(pending: PendingPolicy) -> SoundController<Recorder> {
    let config = AudioConfig {
        pending,
        ..AudioConfig::default()
    };
    SoundController::new(&config, Recorder::default())
}

#[test]
fn silent_until_unlocked_then_flushes_once() {
    let mut sounds = controller(PendingPolicy::Queue);
    sounds.on_round_event(&RoundEvent::RoundTicked { remaining: 2 });
    sounds.on_round_event(&RoundEvent::MoveCaptured(Move::Rock));
    assert!(sounds.backend().played.is_empty());
    assert_eq!(sounds.pending(), 2);

    sounds.unlock();
    assert!(sounds.is_unlocked());
    let keys: Vec<_> = sounds.backend().played.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![SoundKey::Tick, SoundKey::Click]);

    // Later gestures are no-ops.
    sounds.unlock();
    assert_eq!(sounds.backend().activations, 1);
    assert_eq!(sounds.backend().played.len(), 2);
}

#[test]
fn unlocked_requests_play_straight_through() {
    let mut sounds = controller(PendingPolicy::Queue);
    sounds.unlock();
    sounds.on_round_event(&RoundEvent::RoundResolved {
        player: Move::Paper,
        computer: Move::Rock,
        outcome: Outcome::Win,
    });
    let played = &sounds.backend().played;
    assert_eq!(played.len(), 1);
    assert_eq!(played[0].key, SoundKey::Result);
    assert_eq!(played[0].rate, 1.25);
}

#[test]
fn drop_policy_forgets_early_requests() {
    let mut sounds = controller(PendingPolicy::Drop);
    sounds.on_round_event(&RoundEvent::RoundForfeited);
    assert_eq!(sounds.pending(), 0);
    sounds.unlock();
    assert!(sounds.backend().played.is_empty());
}

#[test]
fn failed_activation_stays_locked() {
    let mut sounds = controller(PendingPolicy::Queue);
    sounds.backend_mut().fail_activation = true;
    sounds.on_round_event(&RoundEvent::RoundTicked { remaining: 1 });
    sounds.unlock();
    assert!(!sounds.is_unlocked());
    assert_eq!(sounds.pending(), 1);

    sounds.backend_mut().fail_activation = false;
    sounds.unlock();
    assert!(sounds.is_unlocked());
    assert_eq!(sounds.backend().played.len(), 1);
}

#[test]
fn disabled_audio_never_touches_the_backend() {
    let config = AudioConfig {
        enabled: false,
        ..AudioConfig::default()
    };
    let mut sounds = SoundController::new(&config, Recorder::default());
    sounds.unlock();
    sounds.on_round_event(&RoundEvent::RoundTicked { remaining: 0 });
    assert_eq!(sounds.backend().activations, 0);
    assert!(sounds.backend().played.is_empty());
}

#[test]
fn outcome_pitches_are_ordered() {
    let cues = CueSheet::default();
    let rate = |outcome| {
        cues.for_event(&RoundEvent::RoundResolved {
            player: Move::Rock,
            computer: Move::Rock,
            outcome,
        })
        .map(|r| r.rate)
    };
    let (win, draw, lose) = (rate(Outcome::Win), rate(Outcome::Draw), rate(Outcome::Lose));
    assert!(win > draw && draw > lose);
}

#[test]
fn configured_cues_reach_the_backend() {
    let mut config = AudioConfig::default();
    config.cues.tick = Cue::new(0.5, 2.0);
    config.cues.start = Cue::new(0.25, 1.0);
    let mut sounds = SoundController::new(&config, Recorder::default());
    sounds.unlock();
    sounds.on_round_event(&RoundEvent::RoundTicked { remaining: 2 });
    sounds.play_start();
    let played = &sounds.backend().played;
    assert_eq!(played[0], PlayRequest::new(SoundKey::Tick, 0.5, 2.0));
    assert_eq!(played[1], PlayRequest::new(SoundKey::Click, 0.25, 1.0));
}
