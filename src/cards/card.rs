use enum_map::Enum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const SPADE: char = 's';
pub const HEART: char = 'h';
pub const DIAMOND: char = 'd';
pub const CLUB: char = 'c';

pub const ALL_SUITS: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(
    Hash, Enum, Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
    Joker,
}

impl Rank {
    /// Ace-high value. Jokers sort above everything; they should be wild or
    /// bug by the time anyone cares.
    pub fn value(&self) -> u8 {
        use Rank::*;
        match *self {
            Two => 2,
            Three => 3,
            Four => 4,
            Five => 5,
            Six => 6,
            Seven => 7,
            Eight => 8,
            Nine => 9,
            Ten => 10,
            Jack => 11,
            Queen => 12,
            King => 13,
            Ace => 14,
            Joker => 15,
        }
    }

    /// Ace-to-five value (ace plays low).
    pub fn low_value(&self) -> u8 {
        match *self {
            Rank::Ace => 1,
            r => r.value(),
        }
    }

    /// Pip count for the pip-total games. Courts count zero, aces one.
    pub fn pip_value(&self) -> u8 {
        use Rank::*;
        match *self {
            Ace => 1,
            Jack | Queen | King | Joker => 0,
            r => r.value(),
        }
    }

    /// Die face value for the `die` deck (ace plays one).
    pub fn die_value(&self) -> u8 {
        self.low_value()
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Rank::Jack | Rank::Queen | Rank::King)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Two => write!(f, "2"),
            Self::Three => write!(f, "3"),
            Self::Four => write!(f, "4"),
            Self::Five => write!(f, "5"),
            Self::Six => write!(f, "6"),
            Self::Seven => write!(f, "7"),
            Self::Eight => write!(f, "8"),
            Self::Nine => write!(f, "9"),
            Self::Ten => write!(f, "T"),
            Self::Jack => write!(f, "J"),
            Self::Queen => write!(f, "Q"),
            Self::King => write!(f, "K"),
            Self::Ace => write!(f, "A"),
            Self::Joker => write!(f, "R"),
        }
    }
}

impl TryFrom<char> for Rank {
    type Error = CardParseError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            'R' => Rank::Joker,
            _ => return Err(CardParseError::BadRank(c)),
        })
    }
}

/// Rank names as they appear in rules files ("ACE", "KING", ...).
impl FromStr for Rank {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 1 {
            return Rank::try_from(s.chars().next().unwrap());
        }
        Ok(match s.to_ascii_uppercase().as_str() {
            "TWO" => Rank::Two,
            "THREE" => Rank::Three,
            "FOUR" => Rank::Four,
            "FIVE" => Rank::Five,
            "SIX" => Rank::Six,
            "SEVEN" => Rank::Seven,
            "EIGHT" => Rank::Eight,
            "NINE" => Rank::Nine,
            "TEN" => Rank::Ten,
            "JACK" => Rank::Jack,
            "QUEEN" => Rank::Queen,
            "KING" => Rank::King,
            "ACE" => Rank::Ace,
            "JOKER" => Rank::Joker,
            _ => return Err(CardParseError::BadRankName(s.to_string())),
        })
    }
}

#[derive(Hash, Enum, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub fn is_red(&self) -> bool {
        matches!(self, Suit::Diamond | Suit::Heart)
    }

    pub fn is_black(&self) -> bool {
        !self.is_red()
    }
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Club => write!(f, "{}", CLUB),
            Self::Diamond => write!(f, "{}", DIAMOND),
            Self::Heart => write!(f, "{}", HEART),
            Self::Spade => write!(f, "{}", SPADE),
        }
    }
}

impl TryFrom<char> for Suit {
    type Error = CardParseError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Ok(match c {
            CLUB => Self::Club,
            DIAMOND => Self::Diamond,
            HEART => Self::Heart,
            SPADE => Self::Spade,
            _ => return Err(CardParseError::BadSuit(c)),
        })
    }
}

#[derive(Debug, PartialEq, derive_more::Display)]
pub enum CardParseError {
    #[display(fmt = "bad rank char '{}'", _0)]
    BadRank(char),
    #[display(fmt = "bad rank name '{}'", _0)]
    BadRankName(String),
    #[display(fmt = "bad suit char '{}'", _0)]
    BadSuit(char),
    #[display(fmt = "card string must be two chars, got '{}'", _0)]
    BadLength(String),
}

impl std::error::Error for CardParseError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    FaceDown,
    FaceUp,
}

/// How a card plays once marked wild. A named wild plays as any card; a bug
/// plays as an ace or to complete a straight or flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WildType {
    None,
    Named,
    Bug,
    Matching,
    Natural,
}

/// A card plus its table state. Equality and hashing consider only the
/// (rank, suit) identity: at most one card of each identity is outside the
/// deck at a time, so two `Card` values with the same identity are the same
/// physical card regardless of visibility or wild markings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
    pub visibility: Visibility,
    pub wild: WildType,
}

impl PartialEq for Card {
    fn eq(&self, other: &Self) -> bool {
        self.rank == other.rank && self.suit == other.suit
    }
}

impl Eq for Card {}

impl std::hash::Hash for Card {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.rank.hash(state);
        self.suit.hash(state);
    }
}

/// Identity order only: rank, then suit (clubs low, spades high).
impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank
            .cmp(&other.rank)
            .then(self.suit.cmp(&other.suit))
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Card {
            rank,
            suit,
            visibility: Visibility::FaceDown,
            wild: WildType::None,
        }
    }

    pub const fn is_wild(&self) -> bool {
        !matches!(self.wild, WildType::None)
    }

    pub fn make_wild(&mut self, wild: WildType) {
        self.wild = wild;
    }

    pub fn clear_wild(&mut self) {
        self.wild = WildType::None;
    }

    pub const fn is_face_up(&self) -> bool {
        matches!(self.visibility, Visibility::FaceUp)
    }

    pub fn is_red(&self) -> bool {
        self.suit.is_red()
    }

    pub fn is_black(&self) -> bool {
        self.suit.is_black()
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut i = s.chars();
        let (r, su) = match (i.next(), i.next(), i.next()) {
            (Some(r), Some(su), None) => (r, su),
            _ => return Err(CardParseError::BadLength(s.to_string())),
        };
        Ok(Card::new(Rank::try_from(r)?, Suit::try_from(su)?))
    }
}

/// Parse a run of two-char cards ("AhKs..."). Test and table-file helper.
pub fn cards_from_str(s: &str) -> Result<Vec<Card>, CardParseError> {
    let mut v = vec![];
    let mut chars = s.chars();
    while let Some(r) = chars.next() {
        let su = chars
            .next()
            .ok_or_else(|| CardParseError::BadLength(s.to_string()))?;
        v.push(Card::new(Rank::try_from(r)?, Suit::try_from(su)?));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_values_ascend() {
        for (i, r) in ALL_RANKS.iter().enumerate() {
            assert_eq!(r.value(), 2 + i as u8);
        }
    }

    #[test]
    fn identity_ignores_state() {
        let mut a = Card::new(Rank::Ace, Suit::Spade);
        let b = Card::new(Rank::Ace, Suit::Spade);
        a.visibility = Visibility::FaceUp;
        a.make_wild(WildType::Bug);
        assert_eq!(a, b);
    }

    #[test]
    fn parse_roundtrip() {
        for s in ["Ah", "2c", "Td", "Rs"] {
            let c: Card = s.parse().unwrap();
            assert_eq!(c.to_string(), s);
        }
        assert!("Ahx".parse::<Card>().is_err());
        assert!("1h".parse::<Card>().is_err());
    }

    #[test]
    fn rank_names() {
        assert_eq!("ACE".parse::<Rank>().unwrap(), Rank::Ace);
        assert_eq!("Jack".parse::<Rank>().unwrap(), Rank::Jack);
        assert_eq!("Q".parse::<Rank>().unwrap(), Rank::Queen);
    }

    #[test]
    fn colors() {
        assert!(Card::new(Rank::Two, Suit::Heart).is_red());
        assert!(Card::new(Rank::Two, Suit::Spade).is_black());
    }
}
