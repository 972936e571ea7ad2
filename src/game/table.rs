//! Seats, button, deck, and community card subsets. Community subsets are
//! named because grid games (Banco, Tic-Tac-Toe boards) place cards by
//! position, and multi-board games run several boards at once.

use super::player::{Player, Position};
use crate::cards::card::{Card, Suit, Visibility};
use crate::cards::deck::{Deck, DeckType};
use crate::eval::{EvaluationType, EvaluatorRegistry, HandRanking};
use crate::{Currency, EngineError, PlayerId, SeatIdx};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct Table {
    seats: Vec<Option<Player>>,
    pub button_pos: SeatIdx,
    pub deck: Deck,
    pub community_cards: BTreeMap<String, Vec<Card>>,
    pub discard_pile: BTreeMap<String, Vec<Card>>,
    pub min_buyin: Currency,
    pub max_buyin: Currency,
}

impl Table {
    pub fn new(
        max_players: usize,
        min_buyin: Currency,
        max_buyin: Currency,
        deck_type: DeckType,
    ) -> Self {
        Table {
            seats: vec![None; max_players],
            button_pos: 0,
            deck: Deck::new(deck_type),
            community_cards: BTreeMap::new(),
            discard_pile: BTreeMap::new(),
            min_buyin,
            max_buyin,
        }
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn player_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: &str,
        buyin: Currency,
        preferred_seat: Option<SeatIdx>,
    ) -> Result<SeatIdx, EngineError> {
        if self.player(id).is_some() {
            return Err(EngineError::PlayerAlreadySeated);
        }
        if buyin < self.min_buyin || buyin > self.max_buyin {
            return Err(EngineError::InvalidBuyin);
        }
        let seat = match preferred_seat {
            Some(seat) => {
                if seat >= self.seats.len() {
                    return Err(EngineError::InvalidSeat);
                }
                if self.seats[seat].is_some() {
                    return Err(EngineError::SeatTaken);
                }
                seat
            }
            None => self
                .seats
                .iter()
                .position(|s| s.is_none())
                .ok_or(EngineError::TooManyPlayers)?,
        };
        self.seats[seat] = Some(Player::new(id, name, buyin, seat));
        Ok(seat)
    }

    /// Remove a player, returning their remaining chips.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Currency> {
        let seat = self.player(id)?.seat;
        let p = self.seats[seat].take()?;
        Some(p.stack)
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.seats
            .iter()
            .flatten()
            .find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.seats
            .iter_mut()
            .flatten()
            .find(|p| p.id == id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().flatten()
    }

    pub fn players_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.seats.iter_mut().flatten()
    }

    pub fn active_player_ids(&self) -> Vec<PlayerId> {
        self.players()
            .filter(|p| p.is_active)
            .map(|p| p.id)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.players().filter(|p| p.is_active).count()
    }

    pub fn total_chips(&self) -> Currency {
        self.players().map(|p| p.stack).sum()
    }

    /// Seated players in action order starting from the button.
    pub fn position_order(&self, include_inactive: bool) -> Vec<PlayerId> {
        let n = self.seats.len();
        let mut out = vec![];
        for off in 0..n {
            let seat = (self.button_pos + off) % n;
            if let Some(p) = &self.seats[seat] {
                if include_inactive || p.is_active {
                    out.push(p.id);
                }
            }
        }
        out
    }

    /// First active player strictly after the given seat, walking clockwise.
    pub fn next_active_after_seat(&self, seat: SeatIdx) -> Option<PlayerId> {
        let n = self.seats.len();
        for off in 1..=n {
            let s = (seat + off) % n;
            if let Some(p) = &self.seats[s] {
                if p.is_active {
                    return Some(p.id);
                }
            }
        }
        None
    }

    pub fn next_active_player(&self, after: PlayerId) -> Option<PlayerId> {
        let seat = self.player(after)?.seat;
        self.next_active_after_seat(seat)
    }

    pub fn player_with_position(&self, pos: Position) -> Option<PlayerId> {
        self.players()
            .find(|p| p.is_active && p.has_position(pos))
            .map(|p| p.id)
    }

    /// Standard preflop opener: first active player past the big blind.
    pub fn player_after_big_blind(&self) -> Option<PlayerId> {
        let bb = self.player_with_position(Position::BIG_BLIND)?;
        self.next_active_player(bb)
    }

    /// Advance the button to the next occupied seat.
    pub fn move_button(&mut self) {
        let n = self.seats.len();
        for off in 1..=n {
            let s = (self.button_pos + off) % n;
            if self.seats[s].is_some() {
                self.button_pos = s;
                return;
            }
        }
    }

    /// Reset hands for a new deal and tag positions. Players without chips
    /// sit the hand out.
    pub fn start_hand(&mut self, move_button: bool) {
        for p in self.players_mut() {
            p.hand.clear();
            p.position = Position::default();
            p.is_active = p.stack > 0;
        }
        self.community_cards.clear();
        self.discard_pile.clear();
        if move_button {
            self.move_button();
        } else if self.seats[self.button_pos].is_none() {
            self.move_button();
        }
        self.assign_positions();
    }

    fn assign_positions(&mut self) {
        let order = self.position_order(false);
        if order.is_empty() {
            return;
        }
        let heads_up = order.len() == 2;
        let btn = order[0];
        self.player_mut(btn).unwrap().position |= Position::BUTTON;
        if heads_up {
            // Button posts the small blind heads-up.
            self.player_mut(order[0]).unwrap().position |= Position::SMALL_BLIND;
            self.player_mut(order[1]).unwrap().position |= Position::BIG_BLIND;
            self.player_mut(order[0]).unwrap().position |= Position::UNDER_THE_GUN;
        } else {
            self.player_mut(order[1]).unwrap().position |= Position::SMALL_BLIND;
            self.player_mut(order[2]).unwrap().position |= Position::BIG_BLIND;
            let utg = order.get(3).copied().unwrap_or(order[0]);
            self.player_mut(utg).unwrap().position |= Position::UNDER_THE_GUN;
        }
        debug!(
            "button at seat {}, order {:?}",
            self.button_pos,
            order.iter().map(|p| p.to_string()).collect::<Vec<_>>()
        );
    }

    pub fn deal_card_to_player(
        &mut self,
        pid: PlayerId,
        subset: &str,
        face_up: bool,
    ) -> Result<Card, EngineError> {
        let card = self
            .deck
            .deal_card(face_up)
            .map_err(|_| EngineError::DeckExhausted)?;
        let p = self.player_mut(pid).ok_or(EngineError::PlayerNotFound)?;
        p.hand.add_card(card);
        if subset != crate::cards::hand::DEFAULT_SUBSET {
            p.hand.add_to_subset(card, subset);
        }
        Ok(card)
    }

    /// Deal `n` cards to every active player, one at a time, starting left
    /// of the button. Returns what each player received.
    pub fn deal_hole_cards(
        &mut self,
        n: usize,
        subset: &str,
        face_up: bool,
    ) -> Result<BTreeMap<PlayerId, Vec<Card>>, EngineError> {
        let mut order = self.position_order(false);
        if order.is_empty() {
            return Ok(BTreeMap::new());
        }
        // Button receives last (when still in the hand).
        if self
            .player(order[0])
            .map(|p| p.seat == self.button_pos)
            .unwrap_or(false)
        {
            order.rotate_left(1);
        }
        let mut dealt: BTreeMap<PlayerId, Vec<Card>> = BTreeMap::new();
        for _ in 0..n {
            for pid in &order {
                let card = self.deal_card_to_player(*pid, subset, face_up)?;
                dealt.entry(*pid).or_default().push(card);
            }
        }
        Ok(dealt)
    }

    /// Deal `n` cards to each named community subset, in order.
    pub fn deal_community_cards(
        &mut self,
        n: usize,
        subsets: &[String],
        face_up: bool,
    ) -> Result<Vec<Card>, EngineError> {
        let mut dealt = vec![];
        for name in subsets {
            for _ in 0..n {
                let card = self
                    .deck
                    .deal_card(face_up)
                    .map_err(|_| EngineError::DeckExhausted)?;
                self.community_cards
                    .entry(name.clone())
                    .or_default()
                    .push(card);
                dealt.push(card);
            }
        }
        Ok(dealt)
    }

    pub fn discard(&mut self, pile: &str, card: Card) {
        self.discard_pile
            .entry(pile.to_string())
            .or_default()
            .push(card);
    }

    /// Best single face-up card ranking for a player under an evaluation
    /// type, for bring-in determination.
    fn best_upcard(
        &self,
        registry: &EvaluatorRegistry,
        eval_type: EvaluationType,
        p: &Player,
    ) -> Option<(HandRanking, Card)> {
        let mut best: Option<(HandRanking, Card)> = None;
        for card in p.hand.face_up_cards() {
            if let Ok(Some(r)) = registry.evaluate(&[card], eval_type) {
                let better = match &best {
                    None => true,
                    // Suit breaks exact ties: the lower suit is forced in.
                    Some((cur, cur_card)) => {
                        r < *cur || (r == *cur && card.suit < cur_card.suit)
                    }
                };
                if better {
                    best = Some((r, card));
                }
            }
        }
        best
    }

    /// The player forced to open a stud round, judged by face-up cards
    /// under the rules' bring-in evaluation.
    pub fn bring_in_player(
        &self,
        registry: &EvaluatorRegistry,
        eval_type: EvaluationType,
    ) -> Option<PlayerId> {
        let mut best: Option<(HandRanking, Suit, PlayerId)> = None;
        for pid in self.position_order(false) {
            let p = self.player(pid)?;
            if let Some((r, card)) = self.best_upcard(registry, eval_type, p) {
                let better = match &best {
                    None => true,
                    Some((cur, cur_suit, _)) => {
                        r < *cur || (r == *cur && card.suit < *cur_suit)
                    }
                };
                if better {
                    best = Some((r, card.suit, pid));
                }
            }
        }
        best.map(|(_, _, pid)| pid)
    }

    /// The player whose exposed cards make the best partial hand, for
    /// stud-style "high hand acts first" ordering. Ties go to the earliest
    /// player in position order.
    pub fn player_with_best_upcards(
        &self,
        registry: &EvaluatorRegistry,
        low: bool,
    ) -> Option<PlayerId> {
        let mut best: Option<(HandRanking, PlayerId)> = None;
        for pid in self.position_order(false) {
            let p = self.player(pid)?;
            let up = p.hand.face_up_cards();
            if up.is_empty() {
                continue;
            }
            let eval_type = match (up.len().min(4), low) {
                (1, false) => EvaluationType::OneCardHighAh,
                (2, false) => EvaluationType::TwoCardHigh,
                (3, false) => EvaluationType::ThreeCardHigh,
                (_, false) => EvaluationType::FourCardHigh,
                (1, true) => EvaluationType::OneCardLowAl,
                (2, true) => EvaluationType::TwoCardA5Low,
                (3, true) => EvaluationType::ThreeCardA5Low,
                (_, true) => EvaluationType::FourCardA5Low,
            };
            let visible: Vec<Card> = up.into_iter().take(4).collect();
            if let Ok(Some(r)) = registry.evaluate(&visible, eval_type) {
                if best.as_ref().map_or(true, |(cur, _)| r < *cur) {
                    best = Some((r, pid));
                }
            }
        }
        best.map(|(_, pid)| pid)
    }

    /// Visibility flip helper that keeps hand state canonical.
    pub fn expose_card(&mut self, pid: PlayerId, card: Card) -> bool {
        match self.player_mut(pid) {
            Some(p) => p.hand.set_visibility(card, Visibility::FaceUp),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::cards_from_str;

    fn table_with(n: usize) -> Table {
        let mut t = Table::new(6, 100, 1000, DeckType::Standard);
        for i in 0..n {
            t.add_player(PlayerId(i as u32 + 1), &format!("p{}", i + 1), 500, Some(i))
                .unwrap();
        }
        t
    }

    #[test]
    fn seating_rules() {
        let mut t = table_with(2);
        assert!(matches!(
            t.add_player(PlayerId(1), "dup", 500, None),
            Err(EngineError::PlayerAlreadySeated)
        ));
        assert!(matches!(
            t.add_player(PlayerId(9), "late", 500, Some(0)),
            Err(EngineError::SeatTaken)
        ));
        assert!(matches!(
            t.add_player(PlayerId(9), "broke", 50, None),
            Err(EngineError::InvalidBuyin)
        ));
        assert_eq!(t.add_player(PlayerId(9), "fine", 500, None).unwrap(), 2);
        assert_eq!(t.remove_player(PlayerId(9)), Some(500));
        assert_eq!(t.player_count(), 2);
    }

    #[test]
    fn button_rotation_and_positions() {
        let mut t = table_with(4);
        t.start_hand(true);
        assert_eq!(t.button_pos, 1);
        let order = t.position_order(false);
        assert_eq!(order[0], PlayerId(2));
        let btn = t.player_with_position(Position::BUTTON).unwrap();
        let sb = t.player_with_position(Position::SMALL_BLIND).unwrap();
        let bb = t.player_with_position(Position::BIG_BLIND).unwrap();
        assert_eq!(btn, PlayerId(2));
        assert_eq!(sb, PlayerId(3));
        assert_eq!(bb, PlayerId(4));
        assert_eq!(t.player_after_big_blind(), Some(PlayerId(1)));
        t.start_hand(true);
        assert_eq!(t.button_pos, 2);
    }

    #[test]
    fn heads_up_button_is_small_blind() {
        let mut t = table_with(2);
        t.start_hand(true);
        let btn = t.player_with_position(Position::BUTTON).unwrap();
        let sb = t.player_with_position(Position::SMALL_BLIND).unwrap();
        assert_eq!(btn, sb);
    }

    #[test]
    fn dealing_updates_hands_and_community() {
        let mut t = table_with(3);
        t.start_hand(true);
        let dealt = t.deal_hole_cards(2, "default", false).unwrap();
        assert_eq!(dealt.len(), 3);
        for p in t.players() {
            assert_eq!(p.hand.len(), 2);
        }
        let flop = t
            .deal_community_cards(3, &["default".to_string()], true)
            .unwrap();
        assert_eq!(flop.len(), 3);
        assert_eq!(t.community_cards["default"].len(), 3);
        assert!(t.community_cards["default"][0].is_face_up());
        assert_eq!(t.deck.remaining(), 52 - 6 - 3);
    }

    #[test]
    fn multi_board_dealing() {
        let mut t = table_with(2);
        t.start_hand(true);
        let boards = vec!["Board 1".to_string(), "Board 2".to_string()];
        t.deal_community_cards(3, &boards, true).unwrap();
        assert_eq!(t.community_cards["Board 1"].len(), 3);
        assert_eq!(t.community_cards["Board 2"].len(), 3);
    }

    #[test]
    fn bring_in_lowest_upcard() {
        let mut t = table_with(3);
        t.start_hand(true);
        let reg = EvaluatorRegistry::new();
        let ups = ["Kh", "2c", "9d"];
        for (i, up) in ups.iter().enumerate() {
            let pid = PlayerId(i as u32 + 1);
            let mut card = cards_from_str(up).unwrap()[0];
            card.visibility = Visibility::FaceUp;
            t.player_mut(pid).unwrap().hand.add_card(card);
        }
        // Lowest card (ace plays high) brings it in.
        let bring = t
            .bring_in_player(&reg, EvaluationType::OneCardLow)
            .unwrap();
        assert_eq!(bring, PlayerId(2));
    }

    #[test]
    fn bring_in_suit_tiebreak() {
        let mut t = table_with(2);
        t.start_hand(true);
        let reg = EvaluatorRegistry::new();
        for (i, up) in ["2h", "2c"].iter().enumerate() {
            let pid = PlayerId(i as u32 + 1);
            let mut card = cards_from_str(up).unwrap()[0];
            card.visibility = Visibility::FaceUp;
            t.player_mut(pid).unwrap().hand.add_card(card);
        }
        // Clubs are the lowest suit, so the deuce of clubs is forced in.
        let bring = t
            .bring_in_player(&reg, EvaluationType::OneCardLow)
            .unwrap();
        assert_eq!(bring, PlayerId(2));
    }

    #[test]
    fn best_upcards_orders_stud_action() {
        let mut t = table_with(2);
        t.start_hand(true);
        let reg = EvaluatorRegistry::new();
        for (i, ups) in ["KhKd", "AhQd"].iter().enumerate() {
            let pid = PlayerId(i as u32 + 1);
            for mut card in cards_from_str(ups).unwrap() {
                card.visibility = Visibility::FaceUp;
                t.player_mut(pid).unwrap().hand.add_card(card);
            }
        }
        // The pair of kings outranks ace-queen.
        assert_eq!(
            t.player_with_best_upcards(&reg, false),
            Some(PlayerId(1))
        );
    }
}
