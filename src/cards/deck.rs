use super::card::{Card, Rank, Suit, Visibility, ALL_RANKS, ALL_SUITS};
use base64ct::{Base64, Encoding};
use rand::prelude::*;
use rand_chacha::ChaChaRng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const SEED_LEN: usize = 32;
const ENCODED_SEED_LEN: usize = 4 * ((SEED_LEN + 3 - 1) / 3); // 4 * ceil(SEED_LEN / 3)

/// The card pools the rules file can ask for. `Die` is the degenerate
/// six-card deck used by die-roll games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeckType {
    #[default]
    #[serde(rename = "standard")]
    Standard,
    /// 36 cards, no 2-5.
    #[serde(rename = "short_6a")]
    Short36,
    /// 20 cards, T-A only.
    #[serde(rename = "short_ta")]
    Short20,
    /// 40 cards, no 8-9-T (2-7 plus J-A).
    #[serde(rename = "short_27_ja")]
    Short27Ja,
    #[serde(rename = "standard_joker")]
    WithJoker,
    #[serde(rename = "standard_two_jokers")]
    WithTwoJokers,
    #[serde(rename = "die")]
    Die,
}

impl DeckType {
    /// The rank sequence for this deck, low to high. Straight adjacency and
    /// wheel detection in short-deck evaluations key off this.
    pub fn rank_sequence(&self) -> Vec<Rank> {
        use Rank::*;
        match self {
            DeckType::Standard | DeckType::WithJoker | DeckType::WithTwoJokers => {
                ALL_RANKS.to_vec()
            }
            DeckType::Short36 => vec![
                Six, Seven, Eight, Nine, Ten, Jack, Queen, King, Ace,
            ],
            DeckType::Short20 => vec![Ten, Jack, Queen, King, Ace],
            DeckType::Short27Ja => vec![
                Two, Three, Four, Five, Six, Seven, Jack, Queen, King, Ace,
            ],
            DeckType::Die => vec![Ace, Two, Three, Four, Five, Six],
        }
    }

    fn build(&self) -> Vec<Card> {
        use itertools::Itertools;
        match self {
            DeckType::Die => {
                // One face per rank; suit is a placeholder.
                self.rank_sequence()
                    .into_iter()
                    .map(|r| Card::new(r, Suit::Spade))
                    .collect()
            }
            _ => {
                let mut cards: Vec<Card> = self
                    .rank_sequence()
                    .iter()
                    .cartesian_product(ALL_SUITS.iter())
                    .map(|(r, s)| Card::new(*r, *s))
                    .collect();
                match self {
                    DeckType::WithJoker => cards.push(Card::new(Rank::Joker, Suit::Spade)),
                    DeckType::WithTwoJokers => {
                        cards.push(Card::new(Rank::Joker, Suit::Spade));
                        cards.push(Card::new(Rank::Joker, Suit::Heart));
                    }
                    _ => {}
                }
                cards
            }
        }
    }
}

#[derive(Debug, PartialEq, derive_more::Display)]
pub enum DeckError {
    OutOfCards,
    #[display(fmt = "{}", _0)]
    SeedDecode(base64ct::Error),
}

impl std::error::Error for DeckError {}

impl From<base64ct::Error> for DeckError {
    fn from(e: base64ct::Error) -> Self {
        Self::SeedDecode(e)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    deck_type: DeckType,
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new(DeckType::Standard)
    }
}

impl Deck {
    /// A fresh unshuffled deck of the given type. Call `shuffle` or
    /// `seeded_shuffle` before dealing a real hand.
    pub fn new(deck_type: DeckType) -> Self {
        Deck {
            deck_type,
            cards: deck_type.build(),
        }
    }

    pub fn deck_type(&self) -> DeckType {
        self.deck_type
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Return all cards to the deck and shuffle with a fresh random seed.
    pub fn shuffle(&mut self) -> DeckSeed {
        let seed = DeckSeed::default();
        self.seeded_shuffle(&seed);
        seed
    }

    pub fn seeded_shuffle(&mut self, seed: &DeckSeed) {
        self.cards = self.deck_type.build();
        // For determinism given the same seed, the cards must be in a known
        // order before shuffling.
        self.cards.sort_unstable();
        let mut rng = ChaChaRng::from_seed(seed.0);
        self.cards.shuffle(&mut rng);
    }

    /// Draw the topmost card with the given orientation.
    pub fn deal_card(&mut self, face_up: bool) -> Result<Card, DeckError> {
        let mut c = self.cards.pop().ok_or(DeckError::OutOfCards)?;
        c.visibility = if face_up {
            Visibility::FaceUp
        } else {
            Visibility::FaceDown
        };
        Ok(c)
    }

    pub fn deal_cards(&mut self, n: usize, face_up: bool) -> Result<Vec<Card>, DeckError> {
        (0..n).map(|_| self.deal_card(face_up)).collect()
    }

    pub fn burn(&mut self) {
        self.cards.pop();
    }

    /// Push cards onto the top of the deck so they deal next, first element
    /// dealt first. Test harness hook for fixed boards.
    #[cfg(test)]
    pub(crate) fn stack_top(&mut self, cards: &[Card]) {
        for c in cards.iter().rev() {
            // Remove the identity from wherever it is so the deck stays a
            // permutation of the pool.
            self.cards.retain(|d| d != c);
            self.cards.push(*c);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckSeed([u8; SEED_LEN]);

impl DeckSeed {
    pub fn new(b: [u8; SEED_LEN]) -> Self {
        Self(b)
    }

    /// Hash of the seed, publishable before the hand so the shuffle can be
    /// verified after.
    pub fn commitment(&self) -> String {
        blake3::hash(&self.0).to_hex().to_string()
    }
}

impl Default for DeckSeed {
    fn default() -> Self {
        let mut b = [0u8; SEED_LEN];
        thread_rng().fill_bytes(&mut b);
        Self(b)
    }
}

impl std::fmt::Display for DeckSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut b = [0u8; ENCODED_SEED_LEN];
        let s = Base64::encode(&self.0, &mut b).unwrap();
        write!(f, "{}", s)
    }
}

impl FromStr for DeckSeed {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; SEED_LEN];
        Base64::decode(s, &mut b)?;
        Ok(DeckSeed(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const SEED1: DeckSeed = DeckSeed([1; SEED_LEN]);

    #[test]
    fn standard_len() {
        assert_eq!(Deck::new(DeckType::Standard).remaining(), 52);
        assert_eq!(Deck::new(DeckType::Short36).remaining(), 36);
        assert_eq!(Deck::new(DeckType::Short20).remaining(), 20);
        assert_eq!(Deck::new(DeckType::Short27Ja).remaining(), 40);
        assert_eq!(Deck::new(DeckType::WithJoker).remaining(), 53);
        assert_eq!(Deck::new(DeckType::WithTwoJokers).remaining(), 54);
        assert_eq!(Deck::new(DeckType::Die).remaining(), 6);
    }

    #[test]
    fn all_unique() {
        let mut d = Deck::new(DeckType::WithTwoJokers);
        let mut seen = HashSet::new();
        while let Ok(c) = d.deal_card(false) {
            assert!(seen.insert(c), "duplicate card {}", c);
        }
        assert_eq!(seen.len(), 54);
    }

    #[test]
    fn draw_to_empty() {
        let mut d = Deck::new(DeckType::Die);
        for _ in 0..6 {
            assert!(d.deal_card(true).is_ok());
        }
        assert_eq!(d.deal_card(true).unwrap_err(), DeckError::OutOfCards);
    }

    #[test]
    fn seed_determinism() {
        let mut d1 = Deck::default();
        let mut d2 = Deck::default();
        d1.seeded_shuffle(&SEED1);
        d2.seeded_shuffle(&SEED1);
        assert_eq!(d1, d2);
        let c1 = d1.deal_card(false).unwrap();
        let c2 = d2.deal_card(false).unwrap();
        assert_eq!(c1, c2);
    }

    #[test]
    fn seed_string_roundtrip() {
        let s = DeckSeed::default();
        let parsed: DeckSeed = s.to_string().parse().unwrap();
        assert_eq!(s, parsed);
    }

    #[test]
    fn commitment_is_stable() {
        assert_eq!(SEED1.commitment(), SEED1.commitment());
        assert_ne!(SEED1.commitment(), DeckSeed([2; SEED_LEN]).commitment());
    }

    #[test]
    fn stack_top_deals_in_order() {
        let mut d = Deck::default();
        let want = crate::cards::card::cards_from_str("AhKs2d").unwrap();
        d.stack_top(&want);
        assert_eq!(d.remaining(), 52);
        assert_eq!(d.deal_card(false).unwrap(), want[0]);
        assert_eq!(d.deal_card(false).unwrap(), want[1]);
        assert_eq!(d.deal_card(false).unwrap(), want[2]);
    }
}
