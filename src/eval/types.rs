use crate::cards::{Card, Suit};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Every evaluation a rules file may name. The string forms are the ones
/// rules files and ranking-table filenames use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluationType {
    #[serde(rename = "high")]
    High,
    #[serde(rename = "high_wild_bug")]
    HighWild,
    #[serde(rename = "a5_low")]
    A5Low,
    #[serde(rename = "a5_low_wild")]
    A5LowWild,
    #[serde(rename = "a6_low")]
    A6Low,
    #[serde(rename = "27_low")]
    TwoSevenLow,
    #[serde(rename = "27_low_wild")]
    TwoSevenLowWild,
    #[serde(rename = "a5_low_high")]
    A5LowHigh,
    #[serde(rename = "badugi")]
    Badugi,
    #[serde(rename = "badugi_ah")]
    BadugiAh,
    #[serde(rename = "hidugi")]
    Hidugi,
    #[serde(rename = "36card_ffh_high")]
    High36Card,
    #[serde(rename = "20card_high")]
    High20Card,
    #[serde(rename = "27_ja_ffh_high")]
    High27Ja,
    #[serde(rename = "27_ja_ffh_high_wild_bug")]
    High27JaWild,
    #[serde(rename = "quick_quads")]
    QuickQuads,
    #[serde(rename = "49")]
    Game49,
    #[serde(rename = "58")]
    Game58,
    #[serde(rename = "6")]
    Game6,
    #[serde(rename = "zero")]
    GameZero,
    #[serde(rename = "zero_6")]
    GameZero6,
    #[serde(rename = "21")]
    Game21,
    #[serde(rename = "21_6")]
    Game21Six,
    #[serde(rename = "low_pip_6_cards")]
    LowPip6,
    #[serde(rename = "football")]
    Football,
    #[serde(rename = "six_card_football")]
    SixCardFootball,
    #[serde(rename = "seven_card_football")]
    SevenCardFootball,
    #[serde(rename = "one_card_low")]
    OneCardLow,
    #[serde(rename = "one_card_low_al")]
    OneCardLowAl,
    #[serde(rename = "one_card_high")]
    OneCardHigh,
    #[serde(rename = "one_card_high_ah")]
    OneCardHighAh,
    #[serde(rename = "one_card_high_ah_wild_bug")]
    OneCardHighAhWild,
    #[serde(rename = "two_card_a5_low")]
    TwoCardA5Low,
    #[serde(rename = "two_card_27_low")]
    TwoCard27Low,
    #[serde(rename = "two_card_high")]
    TwoCardHigh,
    #[serde(rename = "two_card_high_al")]
    TwoCardHighAl,
    #[serde(rename = "two_card_a5_low_high")]
    TwoCardA5LowHigh,
    #[serde(rename = "three_card_a5_low")]
    ThreeCardA5Low,
    #[serde(rename = "three_card_27_low")]
    ThreeCard27Low,
    #[serde(rename = "three_card_high")]
    ThreeCardHigh,
    #[serde(rename = "three_card_high_al")]
    ThreeCardHighAl,
    #[serde(rename = "three_card_a5_low_high")]
    ThreeCardA5LowHigh,
    #[serde(rename = "four_card_a5_low")]
    FourCardA5Low,
    #[serde(rename = "four_card_27_low")]
    FourCard27Low,
    #[serde(rename = "four_card_high")]
    FourCardHigh,
    #[serde(rename = "four_card_high_al")]
    FourCardHighAl,
    #[serde(rename = "four_card_a5_low_high")]
    FourCardA5LowHigh,
    #[serde(rename = "two_card_27_ja_ffh_high")]
    TwoCardHigh27Ja,
    #[serde(rename = "three_card_27_ja_ffh_high")]
    ThreeCardHigh27Ja,
    #[serde(rename = "four_card_27_ja_ffh_high")]
    FourCardHigh27Ja,
    #[serde(rename = "two_card_27_ja_ffh_high_wild_bug")]
    TwoCardHigh27JaWild,
    #[serde(rename = "three_card_27_ja_ffh_high_wild_bug")]
    ThreeCardHigh27JaWild,
    #[serde(rename = "four_card_27_ja_ffh_high_wild_bug")]
    FourCardHigh27JaWild,
    #[serde(rename = "soko_high")]
    SokoHigh,
    #[serde(rename = "ne_seven_card_high")]
    NeSevenCardHigh,
    #[serde(rename = "one_card_high_spade")]
    OneCardHighSpade,
    #[serde(rename = "one_card_high_heart")]
    OneCardHighHeart,
    #[serde(rename = "one_card_high_diamond")]
    OneCardHighDiamond,
    #[serde(rename = "one_card_high_club")]
    OneCardHighClub,
    #[serde(rename = "one_card_low_spade")]
    OneCardLowSpade,
    #[serde(rename = "one_card_low_heart")]
    OneCardLowHeart,
    #[serde(rename = "one_card_low_diamond")]
    OneCardLowDiamond,
    #[serde(rename = "one_card_low_club")]
    OneCardLowClub,
    #[serde(rename = "three_card_high_spade")]
    ThreeCardHighSpade,
    #[serde(rename = "three_card_high_heart")]
    ThreeCardHighHeart,
    #[serde(rename = "three_card_high_diamond")]
    ThreeCardHighDiamond,
    #[serde(rename = "three_card_high_club")]
    ThreeCardHighClub,
}

impl EvaluationType {
    /// The string form used in rules files and table filenames.
    pub fn as_str(&self) -> &'static str {
        use EvaluationType::*;
        match self {
            High => "high",
            HighWild => "high_wild_bug",
            A5Low => "a5_low",
            A5LowWild => "a5_low_wild",
            A6Low => "a6_low",
            TwoSevenLow => "27_low",
            TwoSevenLowWild => "27_low_wild",
            A5LowHigh => "a5_low_high",
            Badugi => "badugi",
            BadugiAh => "badugi_ah",
            Hidugi => "hidugi",
            High36Card => "36card_ffh_high",
            High20Card => "20card_high",
            High27Ja => "27_ja_ffh_high",
            High27JaWild => "27_ja_ffh_high_wild_bug",
            QuickQuads => "quick_quads",
            Game49 => "49",
            Game58 => "58",
            Game6 => "6",
            GameZero => "zero",
            GameZero6 => "zero_6",
            Game21 => "21",
            Game21Six => "21_6",
            LowPip6 => "low_pip_6_cards",
            Football => "football",
            SixCardFootball => "six_card_football",
            SevenCardFootball => "seven_card_football",
            OneCardLow => "one_card_low",
            OneCardLowAl => "one_card_low_al",
            OneCardHigh => "one_card_high",
            OneCardHighAh => "one_card_high_ah",
            OneCardHighAhWild => "one_card_high_ah_wild_bug",
            TwoCardA5Low => "two_card_a5_low",
            TwoCard27Low => "two_card_27_low",
            TwoCardHigh => "two_card_high",
            TwoCardHighAl => "two_card_high_al",
            TwoCardA5LowHigh => "two_card_a5_low_high",
            ThreeCardA5Low => "three_card_a5_low",
            ThreeCard27Low => "three_card_27_low",
            ThreeCardHigh => "three_card_high",
            ThreeCardHighAl => "three_card_high_al",
            ThreeCardA5LowHigh => "three_card_a5_low_high",
            FourCardA5Low => "four_card_a5_low",
            FourCard27Low => "four_card_27_low",
            FourCardHigh => "four_card_high",
            FourCardHighAl => "four_card_high_al",
            FourCardA5LowHigh => "four_card_a5_low_high",
            TwoCardHigh27Ja => "two_card_27_ja_ffh_high",
            ThreeCardHigh27Ja => "three_card_27_ja_ffh_high",
            FourCardHigh27Ja => "four_card_27_ja_ffh_high",
            TwoCardHigh27JaWild => "two_card_27_ja_ffh_high_wild_bug",
            ThreeCardHigh27JaWild => "three_card_27_ja_ffh_high_wild_bug",
            FourCardHigh27JaWild => "four_card_27_ja_ffh_high_wild_bug",
            SokoHigh => "soko_high",
            NeSevenCardHigh => "ne_seven_card_high",
            OneCardHighSpade => "one_card_high_spade",
            OneCardHighHeart => "one_card_high_heart",
            OneCardHighDiamond => "one_card_high_diamond",
            OneCardHighClub => "one_card_high_club",
            OneCardLowSpade => "one_card_low_spade",
            OneCardLowHeart => "one_card_low_heart",
            OneCardLowDiamond => "one_card_low_diamond",
            OneCardLowClub => "one_card_low_club",
            ThreeCardHighSpade => "three_card_high_spade",
            ThreeCardHighHeart => "three_card_high_heart",
            ThreeCardHighDiamond => "three_card_high_diamond",
            ThreeCardHighClub => "three_card_high_club",
        }
    }

    /// Number of cards a complete hand of this type holds.
    pub fn hand_size(&self) -> usize {
        use EvaluationType::*;
        match self {
            OneCardLow | OneCardLowAl | OneCardHigh | OneCardHighAh | OneCardHighAhWild
            | OneCardHighSpade | OneCardHighHeart | OneCardHighDiamond | OneCardHighClub
            | OneCardLowSpade | OneCardLowHeart | OneCardLowDiamond | OneCardLowClub => 1,
            TwoCardA5Low | TwoCard27Low | TwoCardHigh | TwoCardHighAl | TwoCardA5LowHigh
            | TwoCardHigh27Ja | TwoCardHigh27JaWild => 2,
            ThreeCardA5Low | ThreeCard27Low | ThreeCardHigh | ThreeCardHighAl
            | ThreeCardA5LowHigh | ThreeCardHigh27Ja | ThreeCardHigh27JaWild
            | ThreeCardHighSpade | ThreeCardHighHeart | ThreeCardHighDiamond
            | ThreeCardHighClub => 3,
            Badugi | BadugiAh | Hidugi | FourCardA5Low | FourCard27Low | FourCardHigh
            | FourCardHighAl | FourCardA5LowHigh | FourCardHigh27Ja | FourCardHigh27JaWild => 4,
            GameZero6 | Game21Six | LowPip6 | SixCardFootball => 6,
            NeSevenCardHigh | SevenCardFootball => 7,
            _ => 5,
        }
    }

    /// The non-wild evaluation this type decorates, if it is a wild variant.
    pub fn wild_base(&self) -> Option<EvaluationType> {
        use EvaluationType::*;
        Some(match self {
            HighWild => High,
            A5LowWild => A5Low,
            TwoSevenLowWild => TwoSevenLow,
            High27JaWild => High27Ja,
            OneCardHighAhWild => OneCardHighAh,
            TwoCardHigh27JaWild => TwoCardHigh27Ja,
            ThreeCardHigh27JaWild => ThreeCardHigh27Ja,
            FourCardHigh27JaWild => FourCardHigh27Ja,
            _ => return None,
        })
    }

    /// Pip-count types compare on card totals, not on hand shapes.
    pub fn is_pip_type(&self) -> bool {
        use EvaluationType::*;
        matches!(
            self,
            Game49
                | Game58
                | Game6
                | GameZero
                | GameZero6
                | Game21
                | Game21Six
                | LowPip6
                | Football
                | SixCardFootball
                | SevenCardFootball
        )
    }

    /// The suit a suit-restricted one/three card type demands, if any.
    pub fn required_suit(&self) -> Option<Suit> {
        use EvaluationType::*;
        match self {
            OneCardHighSpade | OneCardLowSpade | ThreeCardHighSpade => Some(Suit::Spade),
            OneCardHighHeart | OneCardLowHeart | ThreeCardHighHeart => Some(Suit::Heart),
            OneCardHighDiamond | OneCardLowDiamond | ThreeCardHighDiamond => Some(Suit::Diamond),
            OneCardHighClub | OneCardLowClub | ThreeCardHighClub => Some(Suit::Club),
            _ => None,
        }
    }
}

impl std::fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EvaluationType {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| EvalError::UnknownType(s.to_string()))
    }
}

/// Outcome of evaluating one hand. Lower is better in both fields, for high
/// and low games alike; the direction is baked into the ranking itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRanking {
    pub rank: u32,
    pub ordered_rank: u32,
    pub description: String,
}

impl HandRanking {
    pub fn new(rank: u32, ordered_rank: u32, description: impl Into<String>) -> Self {
        HandRanking {
            rank,
            ordered_rank,
            description: description.into(),
        }
    }
}

impl Ord for HandRanking {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then(self.ordered_rank.cmp(&other.ordered_rank))
    }
}

impl PartialOrd for HandRanking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One evaluation backend. `evaluate` returns None when the cards cannot
/// form a qualifying hand of this type at all (e.g. no spade for
/// one_card_high_spade); qualifier thresholds are applied by callers.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking>;

    fn hand_size(&self) -> usize;

    /// A representative hand for a ranking, for UI and debugging. Only
    /// table-backed evaluators can answer this.
    fn sample_hand(&self, _rank: u32, _ordered_rank: u32) -> Option<Vec<Card>> {
        None
    }

    /// Display order for this evaluation. Idempotent.
    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        let mut v = cards.to_vec();
        v.sort_by(|a, b| b.rank.value().cmp(&a.rank.value()).then(b.suit.cmp(&a.suit)));
        v
    }
}

#[derive(Debug, derive_more::Display)]
pub enum EvalError {
    #[display(fmt = "unknown evaluation type '{}'", _0)]
    UnknownType(String),
    #[display(fmt = "no evaluator available for '{}'", _0)]
    NoBackend(EvaluationType),
    #[display(fmt = "ranking table for '{}' failed to load: {}", _0, _1)]
    TableLoad(EvaluationType, String),
    #[display(fmt = "comparison table '{}' not found", _0)]
    ComparisonTableMissing(String),
    #[display(fmt = "bad table row: {}", _0)]
    BadTableRow(String),
}

impl std::error::Error for EvalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        for t in [
            EvaluationType::High,
            EvaluationType::TwoSevenLow,
            EvaluationType::Game21Six,
            EvaluationType::ThreeCardHighClub,
            EvaluationType::NeSevenCardHigh,
        ] {
            assert_eq!(t.as_str().parse::<EvaluationType>().unwrap(), t);
        }
        assert!("no_such_eval".parse::<EvaluationType>().is_err());
    }

    #[test]
    fn hand_sizes() {
        assert_eq!(EvaluationType::High.hand_size(), 5);
        assert_eq!(EvaluationType::Badugi.hand_size(), 4);
        assert_eq!(EvaluationType::OneCardHighSpade.hand_size(), 1);
        assert_eq!(EvaluationType::NeSevenCardHigh.hand_size(), 7);
        assert_eq!(EvaluationType::GameZero6.hand_size(), 6);
    }

    #[test]
    fn ranking_order() {
        let better = HandRanking::new(1, 5, "a");
        let worse = HandRanking::new(1, 9, "b");
        assert!(better < worse);
        assert!(HandRanking::new(2, 0, "c") > better);
    }

    #[test]
    fn wild_bases() {
        assert_eq!(
            EvaluationType::HighWild.wild_base(),
            Some(EvaluationType::High)
        );
        assert_eq!(EvaluationType::High.wild_base(), None);
    }
}
