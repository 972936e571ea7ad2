pub mod card;
pub mod deck;
pub mod hand;

pub use card::{Card, Rank, Suit, Visibility, WildType};
pub use deck::{Deck, DeckSeed, DeckType};
pub use hand::PlayerHand;
