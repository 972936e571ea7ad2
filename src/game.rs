pub mod actions;
pub mod betting;
pub mod engine;
pub mod player;
pub mod pot;
pub mod result;
pub mod showdown;
pub mod table;

pub use betting::{BetType, BettingManager, BettingStructure};
pub use engine::{DieMode, Game, GameConfig, GamePhase, Stakes};
pub use player::Player;
pub use pot::Pot;
pub use result::{GameResult, HandResult, PotResult};
pub use table::Table;

use crate::Currency;
use serde::{Deserialize, Serialize};

/// Everything a player can do when it is their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    BringIn,
    Discard,
    Draw,
    Expose,
    Pass,
    Separate,
    Declare,
    Choose,
    /// Accept the deal inside a grouped step (not a real decision, but the
    /// player's turn drives it).
    DealAccept,
    /// Pay the named bet to flip a protected card face up.
    ProtectCard,
    DeclineProtection,
}

impl std::fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Why an action was rejected. These come back to the caller; nothing here
/// is fatal.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum ActionError {
    NotYourTurn,
    #[display(fmt = "illegal action: {}", _0)]
    IllegalAction(String),
    #[display(fmt = "invalid amount {} (expected {}..={})", amount, min, max)]
    InvalidAmount {
        amount: Currency,
        min: Currency,
        max: Currency,
    },
    #[display(fmt = "invalid cards: {}", _0)]
    InvalidCards(String),
    InsufficientChips,
    #[display(fmt = "invalid declaration: {}", _0)]
    InvalidDeclaration(String),
    #[display(fmt = "invalid choice: {}", _0)]
    InvalidChoice(String),
    HandNotInProgress,
}

impl std::error::Error for ActionError {}

/// A successfully applied action.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionOutcome {
    /// The step finished and (with auto-progress off) the caller should
    /// advance the game.
    pub advance_step: bool,
}

/// One legal action with its bounds: chip amounts for betting actions, card
/// counts for card actions, choice values for choose steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAction {
    pub action: PlayerAction,
    pub min: Option<Currency>,
    pub max: Option<Currency>,
    pub choices: Vec<String>,
}

impl ValidAction {
    pub fn new(action: PlayerAction, min: Option<Currency>, max: Option<Currency>) -> Self {
        ValidAction {
            action,
            min,
            max,
            choices: vec![],
        }
    }
}
