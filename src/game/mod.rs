//! Moves, outcomes and the uniform computer opponent.

pub mod round;
pub mod view;

pub use round::{GamePhase, RevealPolicy, RoundEvent, RoundMachine, RoundState, RoundTask};
pub use view::ScreenView;

use rand::Rng;
use rand::rngs::ThreadRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Move {
    Rock,
    Paper,
    Scissors,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// The move this one defeats.
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Paper => Move::Rock,
            Move::Scissors => Move::Paper,
        }
    }

    /// Parse a button's `data-move` value.
    pub fn from_attr(s: &str) -> Option<Move> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" => Some(Move::Rock),
            "paper" => Some(Move::Paper),
            "scissors" => Some(Move::Scissors),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
    Forfeit,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Lose => "LOSE",
            Outcome::Draw => "DRAW",
            Outcome::Forfeit => "FORFEIT",
        }
    }
}

/// Result for the player. Never yields `Forfeit`; that only comes from the clock.
pub fn resolve(player: Move, computer: Move) -> Outcome {
    if player == computer {
        Outcome::Draw
    } else if player.beats() == computer {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}

/// Source of computer moves.
pub trait MoveSource {
    fn next_move(&mut self) -> Move;
}

/// Uniform computer moves. Defaults to the thread RNG (seeded from
/// `crypto.getRandomValues` in the browser); any `Rng` can be plugged in.
pub struct RandomMoves<R = ThreadRng> {
    rng: R,
}

impl Default for RandomMoves {
    fn default() -> Self {
        Self { rng: rand::rng() }
    }
}

impl<R: Rng> RandomMoves<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> MoveSource for RandomMoves<R> {
    fn next_move(&mut self) -> Move {
        Move::ALL[self.rng.random_range(0..Move::ALL.len())]
    }
}

/// Replays a fixed list of moves, cycling. Handy for scripted demos and tests.
pub struct ScriptedMoves {
    moves: Vec<Move>,
    next: usize,
}

impl ScriptedMoves {
    /// `None` for an empty script.
    pub fn new(moves: Vec<Move>) -> Option<Self> {
        if moves.is_empty() {
            return None;
        }
        Some(Self { moves, next: 0 })
    }
}

impl MoveSource for ScriptedMoves {
    fn next_move(&mut self) -> Move {
        let m = self.moves[self.next % self.moves.len()];
        self.next += 1;
        m
    }
}
