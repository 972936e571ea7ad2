use crate::cards::Card;
use crate::eval::EvaluationType;
use crate::{Currency, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One evaluated hand at showdown, with enough detail for a UI to show why
/// it won or lost (including resolved wild cards and classification tags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandResult {
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
    pub used_hole_cards: Vec<Card>,
    /// Which directional pot this hand was built for ("High Hand", "Razz").
    pub hand_name: String,
    pub hand_description: String,
    pub eval_type: EvaluationType,
    pub rank: u32,
    pub ordered_rank: u32,
    pub classifications: BTreeMap<String, String>,
}

/// One awarded pot (or directional share of a pot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotResult {
    pub amount: Currency,
    pub winners: Vec<PlayerId>,
    pub split: bool,
    /// "main" or "side pot N".
    pub pot_type: String,
    /// The directional descriptor that awarded it.
    pub hand_type: String,
    pub side_pot_index: Option<usize>,
    pub eligible_players: BTreeSet<PlayerId>,
}

impl PotResult {
    pub fn pot_label(side_pot_index: Option<usize>) -> String {
        match side_pot_index {
            None => "main".to_string(),
            Some(i) => format!("side pot {}", i + 1),
        }
    }
}

/// Everything that happened when the hand resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameResult {
    pub pots: Vec<PotResult>,
    pub hands: BTreeMap<PlayerId, Vec<HandResult>>,
    pub winning_hands: Vec<HandResult>,
    pub total_pot: Currency,
    pub is_complete: bool,
    pub was_fold_win: bool,
}

impl GameResult {
    /// Total chips a player took from this hand.
    pub fn winnings_of(&self, pid: PlayerId) -> Currency {
        let mut total = 0;
        for pot in &self.pots {
            if !pot.winners.contains(&pid) {
                continue;
            }
            let n = pot.winners.len() as Currency;
            let share = pot.amount / n;
            let remainder = pot.amount % n;
            let idx = pot.winners.iter().position(|w| *w == pid).unwrap() as Currency;
            total += share + if idx < remainder { 1 } else { 0 };
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winnings_follow_split_priority() {
        let result = GameResult {
            pots: vec![PotResult {
                amount: 101,
                winners: vec![PlayerId(1), PlayerId(2)],
                split: true,
                pot_type: "main".to_string(),
                hand_type: "High Hand".to_string(),
                side_pot_index: None,
                eligible_players: BTreeSet::new(),
            }],
            ..Default::default()
        };
        assert_eq!(result.winnings_of(PlayerId(1)), 51);
        assert_eq!(result.winnings_of(PlayerId(2)), 50);
        assert_eq!(result.winnings_of(PlayerId(3)), 0);
    }
}
