//! Round state machine.
//!
//! Phases: `Title → Countdown → (Resolving →) Result → Countdown → …`, with
//! `reset()` returning to `Title` from anywhere. All pacing goes through a
//! [`Scheduler`]; the machine keeps the id of every task it has scheduled and
//! cancels them on each phase exit, so a late or duplicate timer can never
//! advance a round it does not belong to.

use crate::config::RoundConfig;
use crate::game::{Move, MoveSource, Outcome, ScreenView, resolve};
use crate::schedule::{ManualScheduler, Scheduler, TaskId};

#[cfg(feature = "serde")]
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamePhase {
    Title,
    Countdown,
    Resolving,
    Result,
}

/// When a captured move gets resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize), serde(rename_all = "snake_case"))]
pub enum RevealPolicy {
    /// Stop the countdown on capture and reveal after `reveal_delay_ms`.
    #[default]
    Immediate,
    /// Let the countdown run out, then resolve.
    AtZero,
}

/// Timer payloads the machine schedules for itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundTask {
    Tick,
    Reveal,
    Advance,
    Blink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundEvent {
    RoundStarted,
    RoundTicked { remaining: u8 },
    MoveCaptured(Move),
    RoundForfeited,
    RoundResolved {
        player: Move,
        computer: Move,
        outcome: Outcome,
    },
    ReturnedToTitle,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundState {
    pub phase: GamePhase,
    pub ticks_remaining: u8,
    pub player_move: Option<Move>,
    pub computer_move: Option<Move>,
    pub outcome: Option<Outcome>,
    /// "Press Start" blink state, only meaningful in `Title`.
    pub prompt_visible: bool,
}

impl RoundState {
    fn title(ticks: u8) -> Self {
        Self {
            phase: GamePhase::Title,
            ticks_remaining: ticks,
            player_move: None,
            computer_move: None,
            outcome: None,
            prompt_visible: true,
        }
    }
}

pub struct RoundMachine<S, R> {
    config: RoundConfig,
    scheduler: S,
    moves: R,
    state: RoundState,
    countdown: Option<TaskId>,
    // Reveal or next-round advance; never both.
    advance: Option<TaskId>,
    blink: Option<TaskId>,
    events: Vec<RoundEvent>,
}

impl<S: Scheduler<RoundTask>, R: MoveSource> RoundMachine<S, R> {
    pub fn new(config: RoundConfig, scheduler: S, moves: R) -> Self {
        let state = RoundState::title(config.countdown_ticks);
        Self {
            config,
            scheduler,
            moves,
            state,
            countdown: None,
            advance: None,
            blink: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Move buttons are live only while the countdown runs and nothing is captured yet.
    pub fn accepts_moves(&self) -> bool {
        self.state.phase == GamePhase::Countdown && self.state.player_move.is_none()
    }

    pub fn view(&self) -> ScreenView {
        ScreenView::from_state(&self.state, self.config.countdown_ticks)
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Enter (or re-enter) the title screen. Cancels everything in flight.
    pub fn show_title(&mut self) {
        self.cancel_all();
        self.state = RoundState::title(self.config.countdown_ticks);
        self.blink = Some(
            self.scheduler
                .schedule(self.config.blink_interval_ms, RoundTask::Blink),
        );
        log::debug!("phase -> Title");
        self.events.push(RoundEvent::ReturnedToTitle);
    }

    /// Explicit reset from any phase.
    pub fn reset(&mut self) {
        self.show_title();
    }

    /// "Start" input. Only honoured on the title screen.
    pub fn start(&mut self) -> bool {
        if self.state.phase != GamePhase::Title {
            return false;
        }
        self.begin_round();
        true
    }

    /// A move button press. Returns whether it was recorded.
    pub fn submit(&mut self, mv: Move) -> bool {
        if !self.accepts_moves() {
            return false;
        }
        self.state.player_move = Some(mv);
        self.events.push(RoundEvent::MoveCaptured(mv));
        if self.config.reveal == RevealPolicy::Immediate {
            self.cancel(TimerSlot::Countdown);
            self.state.phase = GamePhase::Resolving;
            self.advance = Some(
                self.scheduler
                    .schedule(self.config.reveal_delay_ms, RoundTask::Reveal),
            );
            log::debug!("phase -> Resolving ({mv:?})");
        }
        true
    }

    /// Feed a fired timer back in. Ids the machine is not holding are stale.
    pub fn on_timer(&mut self, id: TaskId, task: RoundTask) {
        self.scheduler.retire(id);
        match task {
            RoundTask::Tick if self.countdown == Some(id) => {
                self.countdown = None;
                self.tick();
            }
            RoundTask::Reveal if self.advance == Some(id) => {
                self.advance = None;
                self.resolve_round();
            }
            RoundTask::Advance if self.advance == Some(id) => {
                self.advance = None;
                self.begin_round();
            }
            RoundTask::Blink if self.blink == Some(id) => {
                self.blink = None;
                if self.state.phase == GamePhase::Title {
                    self.state.prompt_visible = !self.state.prompt_visible;
                    self.blink = Some(
                        self.scheduler
                            .schedule(self.config.blink_interval_ms, RoundTask::Blink),
                    );
                }
            }
            _ => log::debug!("ignoring stale {task:?} timer"),
        }
    }

    fn begin_round(&mut self) {
        self.cancel_all();
        self.state = RoundState {
            phase: GamePhase::Countdown,
            ticks_remaining: self.config.countdown_ticks,
            player_move: None,
            computer_move: None,
            outcome: None,
            prompt_visible: false,
        };
        self.countdown = Some(
            self.scheduler
                .schedule(self.config.countdown_interval_ms, RoundTask::Tick),
        );
        log::debug!("phase -> Countdown");
        self.events.push(RoundEvent::RoundStarted);
    }

    fn tick(&mut self) {
        if self.state.phase != GamePhase::Countdown {
            return;
        }
        self.state.ticks_remaining = self.state.ticks_remaining.saturating_sub(1);
        let remaining = self.state.ticks_remaining;
        self.events.push(RoundEvent::RoundTicked { remaining });
        if remaining > 0 {
            self.countdown = Some(
                self.scheduler
                    .schedule(self.config.countdown_interval_ms, RoundTask::Tick),
            );
            return;
        }
        match self.state.player_move {
            Some(_) => self.resolve_round(),
            None => {
                self.state.phase = GamePhase::Result;
                self.state.outcome = Some(Outcome::Forfeit);
                log::debug!("phase -> Result (forfeit)");
                self.events.push(RoundEvent::RoundForfeited);
                self.schedule_advance();
            }
        }
    }

    fn resolve_round(&mut self) {
        let Some(player) = self.state.player_move else {
            return;
        };
        let computer = self.moves.next_move();
        let outcome = resolve(player, computer);
        self.state.phase = GamePhase::Result;
        self.state.computer_move = Some(computer);
        self.state.outcome = Some(outcome);
        log::debug!("phase -> Result ({player:?} vs {computer:?}: {outcome:?})");
        self.events.push(RoundEvent::RoundResolved {
            player,
            computer,
            outcome,
        });
        self.schedule_advance();
    }

    fn schedule_advance(&mut self) {
        self.cancel(TimerSlot::Advance);
        self.advance = Some(
            self.scheduler
                .schedule(self.config.round_pause_ms, RoundTask::Advance),
        );
    }

    fn cancel_all(&mut self) {
        self.cancel(TimerSlot::Countdown);
        self.cancel(TimerSlot::Advance);
        self.cancel(TimerSlot::Blink);
    }

    fn cancel(&mut self, slot: TimerSlot) {
        let held = match slot {
            TimerSlot::Countdown => self.countdown.take(),
            TimerSlot::Advance => self.advance.take(),
            TimerSlot::Blink => self.blink.take(),
        };
        if let Some(id) = held {
            self.scheduler.cancel(id);
        }
    }
}

#[derive(Clone, Copy)]
enum TimerSlot {
    Countdown,
    Advance,
    Blink,
}

impl<R: MoveSource> RoundMachine<ManualScheduler<RoundTask>, R> {
    /// Advance virtual time by `ms`, firing every task that comes due in order.
    pub fn run_for(&mut self, ms: u64) {
        let until = self.scheduler.now_ms() + ms;
        while let Some((id, task)) = self.scheduler.pop_due(until) {
            self.on_timer(id, task);
        }
        self.scheduler.set_now(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::ScriptedMoves;

    fn machine(reveal: RevealPolicy) -> RoundMachine<ManualScheduler<RoundTask>, ScriptedMoves> {
        let config = RoundConfig {
            reveal,
            ..RoundConfig::default()
        };
        let mut m = RoundMachine::new(config, ManualScheduler::new(), ScriptedMoves::new(vec![Move::Scissors]).unwrap());
        m.show_title();
        m
    }

    #[test]
    fn title_holds_only_the_blink_timer() {
        let m = machine(RevealPolicy::Immediate);
        assert_eq!(m.phase(), GamePhase::Title);
        assert_eq!(m.scheduler().pending(), 1);
        assert!(m.blink.is_some());
        assert!(m.countdown.is_none() && m.advance.is_none());
    }

    #[test]
    fn immediate_capture_stops_countdown() {
        let mut m = machine(RevealPolicy::Immediate);
        m.start();
        m.run_for(600);
        assert!(m.submit(Move::Rock));
        assert_eq!(m.phase(), GamePhase::Resolving);
        assert!(m.countdown.is_none());
        assert_eq!(m.scheduler().pending(), 1);
        m.run_for(400);
        assert_eq!(m.phase(), GamePhase::Result);
        assert_eq!(m.state().outcome, Some(Outcome::Win));
        assert_eq!(m.state().ticks_remaining, 2);
    }

    #[test]
    fn stale_ids_are_ignored() {
        let mut m = machine(RevealPolicy::Immediate);
        m.start();
        let before = m.state().clone();
        let stale = m.scheduler_mut().schedule(1, RoundTask::Tick);
        m.on_timer(stale, RoundTask::Tick);
        assert_eq!(m.state(), &before);
        assert!(m.countdown.is_some());
    }

    #[test]
    fn advance_slot_never_doubles() {
        let mut m = machine(RevealPolicy::AtZero);
        m.start();
        m.submit(Move::Paper);
        m.run_for(1800);
        assert_eq!(m.phase(), GamePhase::Result);
        assert!(m.advance.is_some());
        assert!(m.countdown.is_none());
        assert_eq!(m.scheduler().pending(), 1);
    }
}
