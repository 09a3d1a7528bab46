//! What the screen shows for a given round state.

use super::round::{GamePhase, RoundState};
use super::Outcome;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenView {
    PressStart { visible: bool },
    /// `filled` = ticks elapsed out of `total`.
    Countdown { filled: u8, total: u8 },
    Waiting,
    Result(Outcome),
}

impl ScreenView {
    pub fn from_state(state: &RoundState, total: u8) -> Self {
        match state.phase {
            GamePhase::Title => ScreenView::PressStart {
                visible: state.prompt_visible,
            },
            GamePhase::Countdown if state.player_move.is_some() => ScreenView::Waiting,
            GamePhase::Countdown => ScreenView::Countdown {
                filled: total.saturating_sub(state.ticks_remaining),
                total,
            },
            GamePhase::Resolving => ScreenView::Waiting,
            GamePhase::Result => match state.outcome {
                Some(outcome) => ScreenView::Result(outcome),
                None => ScreenView::Waiting,
            },
        }
    }

    /// Markup for `.screen-text`.
    pub fn to_html(self) -> String {
        match self {
            ScreenView::PressStart { visible } => format!(
                "Rock Paper Scissors!<br><br><span class='blink' style='visibility:{}'>Press Start</span>",
                if visible { "visible" } else { "hidden" }
            ),
            ScreenView::Countdown { filled, total } => (0..total)
                .map(|i| if i < filled { "●" } else { "○" })
                .collect::<Vec<_>>()
                .join(" "),
            ScreenView::Waiting => "· · ·".to_string(),
            ScreenView::Result(outcome) => {
                let glyph = match outcome {
                    Outcome::Win => "○",
                    Outcome::Lose => "✕",
                    Outcome::Draw => "□",
                    Outcome::Forfeit => return outcome.label().to_string(),
                };
                format!("{glyph}<br>{}", outcome.label())
            }
        }
    }

    pub fn shows_title_canvas(self) -> bool {
        matches!(self, ScreenView::PressStart { .. })
    }
}
