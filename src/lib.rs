pub mod cards;
pub mod eval;
pub mod game;
pub mod rules;

pub use cards::{deck, hand};

pub const MAX_PLAYERS: usize = 12;
pub type Currency = i32;
pub type SeatIdx = usize;

use serde::{Deserialize, Serialize};

/// Opaque player handle. Hosts assign these; the engine only compares them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Deref,
    derive_more::From,
)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Fatal, construction-time problems. Action-time problems are
/// `game::ActionError` and come back through `ActionOutcome`s instead.
#[derive(Debug, derive_more::Display)]
pub enum EngineError {
    #[display(fmt = "rules error: {}", _0)]
    Rules(rules::RulesError),
    #[display(fmt = "evaluator config error: {}", _0)]
    Eval(eval::EvalError),
    NotEnoughPlayers,
    TooManyPlayers,
    SeatTaken,
    PlayerAlreadySeated,
    PlayerNotFound,
    InvalidSeat,
    InvalidBuyin,
    StructureNotAllowed,
    HandNotComplete,
    NoResultAvailable,
    DeckExhausted,
}

impl std::error::Error for EngineError {}

impl From<rules::RulesError> for EngineError {
    fn from(e: rules::RulesError) -> Self {
        EngineError::Rules(e)
    }
}

impl From<eval::EvalError> for EngineError {
    fn from(e: eval::EvalError) -> Self {
        EngineError::Eval(e)
    }
}
