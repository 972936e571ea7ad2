use super::card::{Card, Visibility, WildType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SUBSET: &str = "default";

/// A player's cards: an ordered list plus named subsets for games that
/// partition the hand (Badugi hole subsets, Chinese-style fronts and backs).
/// A card is in at most one named subset; cards in none belong to "default".
///
/// The canonical card state (visibility, wild markings) lives in `cards`;
/// subsets hold identities and are resolved against `cards` on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerHand {
    cards: Vec<Card>,
    subsets: BTreeMap<String, Vec<Card>>,
}

impl PlayerHand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_card(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn add_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    /// Remove a card (and any subset membership). Returns it with current
    /// state, or None if the hand doesn't hold it.
    pub fn remove_card(&mut self, card: Card) -> Option<Card> {
        let idx = self.cards.iter().position(|c| *c == card)?;
        let removed = self.cards.remove(idx);
        for members in self.subsets.values_mut() {
            members.retain(|c| *c != card);
        }
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.subsets.clear();
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: Card) -> bool {
        self.cards.contains(&card)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn face_up_cards(&self) -> Vec<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.visibility == Visibility::FaceUp)
            .collect()
    }

    pub fn face_down_cards(&self) -> Vec<Card> {
        self.cards
            .iter()
            .copied()
            .filter(|c| c.visibility == Visibility::FaceDown)
            .collect()
    }

    /// Cards of the named subset, canonical state. "default" means every
    /// card not assigned to a named subset.
    pub fn subset(&self, name: &str) -> Vec<Card> {
        if name == DEFAULT_SUBSET && !self.subsets.contains_key(DEFAULT_SUBSET) {
            let named: Vec<Card> = self.subsets.values().flatten().copied().collect();
            return self
                .cards
                .iter()
                .copied()
                .filter(|c| !named.contains(c))
                .collect();
        }
        match self.subsets.get(name) {
            None => vec![],
            Some(members) => self
                .cards
                .iter()
                .copied()
                .filter(|c| members.contains(c))
                .collect(),
        }
    }

    pub fn subset_names(&self) -> impl Iterator<Item = &str> {
        self.subsets.keys().map(|s| s.as_str())
    }

    /// Assign a held card to a named subset, removing it from any other.
    /// Returns false if the card isn't in the hand.
    pub fn add_to_subset(&mut self, card: Card, name: &str) -> bool {
        if !self.contains(card) {
            return false;
        }
        for members in self.subsets.values_mut() {
            members.retain(|c| *c != card);
        }
        self.subsets.entry(name.to_string()).or_default().push(card);
        true
    }

    pub fn clear_subsets(&mut self) {
        self.subsets.clear();
    }

    /// Empty the named subset; the cards stay in the hand.
    pub fn clear_subset(&mut self, name: &str) {
        if let Some(members) = self.subsets.get_mut(name) {
            members.clear();
        }
    }

    pub fn set_visibility(&mut self, card: Card, visibility: Visibility) -> bool {
        match self.cards.iter_mut().find(|c| **c == card) {
            Some(c) => {
                c.visibility = visibility;
                true
            }
            None => false,
        }
    }

    pub fn make_wild(&mut self, card: Card, wild: WildType) -> bool {
        match self.cards.iter_mut().find(|c| **c == card) {
            Some(c) => {
                c.make_wild(wild);
                true
            }
            None => false,
        }
    }

    pub fn clear_wild(&mut self, card: Card) -> bool {
        match self.cards.iter_mut().find(|c| **c == card) {
            Some(c) => {
                c.clear_wild();
                true
            }
            None => false,
        }
    }

    pub fn cards_mut(&mut self) -> impl Iterator<Item = &mut Card> {
        self.cards.iter_mut()
    }

    /// Parse a whole hand from a run of two-char cards.
    pub fn from_string(s: &str) -> Result<Self, super::card::CardParseError> {
        let mut hand = PlayerHand::new();
        hand.add_cards(super::card::cards_from_str(s)?);
        Ok(hand)
    }
}

impl std::fmt::Display for PlayerHand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.cards {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::cards_from_str;

    fn hand(s: &str) -> PlayerHand {
        PlayerHand::from_string(s).unwrap()
    }

    #[test]
    fn default_subset_is_the_rest() {
        let mut h = hand("AhKhQhJh");
        let cards = h.cards().to_vec();
        assert!(h.add_to_subset(cards[0], "front"));
        assert!(h.add_to_subset(cards[1], "front"));
        assert_eq!(h.subset("front").len(), 2);
        assert_eq!(h.subset(DEFAULT_SUBSET), vec![cards[2], cards[3]]);
    }

    #[test]
    fn subset_membership_is_exclusive() {
        let mut h = hand("AhKh");
        let a = h.cards()[0];
        h.add_to_subset(a, "front");
        h.add_to_subset(a, "back");
        assert!(h.subset("front").is_empty());
        assert_eq!(h.subset("back"), vec![a]);
    }

    #[test]
    fn remove_card_drops_subset_membership() {
        let mut h = hand("AhKh");
        let a = h.cards()[0];
        h.add_to_subset(a, "front");
        assert!(h.remove_card(a).is_some());
        assert!(h.subset("front").is_empty());
        assert_eq!(h.len(), 1);
        assert!(h.remove_card(a).is_none());
    }

    #[test]
    fn visibility_reflected_in_subset_reads() {
        let mut h = hand("AhKh");
        let a = h.cards()[0];
        h.add_to_subset(a, "front");
        h.set_visibility(a, Visibility::FaceUp);
        assert_eq!(h.subset("front")[0].visibility, Visibility::FaceUp);
        assert_eq!(h.face_up_cards(), vec![a]);
    }

    #[test]
    fn wild_marks() {
        let mut h = hand("Ah");
        let a = h.cards()[0];
        assert!(h.make_wild(a, WildType::Bug));
        assert!(h.cards()[0].is_wild());
        assert!(h.clear_wild(a));
        assert!(!h.cards()[0].is_wild());
        assert!(!h.make_wild(cards_from_str("2c").unwrap()[0], WildType::Named));
    }
}
