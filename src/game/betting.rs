//! Per-round bet tracking and validation. One manager serves all three
//! structures; the structure-specific rules live in `BettingStructure` and
//! are dispatched by match.

use super::pot::Pot;
use crate::{Currency, PlayerId};
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetType {
    Ante,
    Blind,
    BringIn,
    Small,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BettingStructure {
    Limit {
        small_bet: Currency,
        big_bet: Currency,
    },
    NoLimit {
        small_bet: Currency,
    },
    PotLimit {
        small_bet: Currency,
    },
}

impl BettingStructure {
    pub fn is_limit(&self) -> bool {
        matches!(self, BettingStructure::Limit { .. })
    }

    pub fn small_bet(&self) -> Currency {
        match *self {
            BettingStructure::Limit { small_bet, .. }
            | BettingStructure::NoLimit { small_bet }
            | BettingStructure::PotLimit { small_bet } => small_bet,
        }
    }

    pub fn big_bet(&self) -> Currency {
        match *self {
            BettingStructure::Limit { big_bet, .. } => big_bet,
            BettingStructure::NoLimit { small_bet } | BettingStructure::PotLimit { small_bet } => {
                small_bet
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerBet {
    /// Chips committed this round (antes excluded).
    pub amount: Currency,
    pub has_acted: bool,
    pub posted_blind: bool,
    pub is_all_in: bool,
}

#[derive(Debug, PartialEq, derive_more::Display)]
pub enum BetError {
    #[display(fmt = "invalid bet of {}", _0)]
    InvalidBet(Currency),
}

impl std::error::Error for BetError {}

#[derive(Debug)]
pub struct BettingManager {
    structure: BettingStructure,
    pub pot: Pot,
    pub current_bets: HashMap<PlayerId, PlayerBet>,
    /// Highest total bet this round.
    pub current_bet: Currency,
    /// 0-based; limit games switch to the big bet from round 2 on.
    pub betting_round: u32,
    pub last_raise_size: Currency,
    pub bring_in: Currency,
    pub bring_in_posted: bool,
    pub last_actor_id: Option<PlayerId>,
    /// Most recent blind/bring-in poster; first voluntary action starts to
    /// their left.
    pub last_forced_bettor: Option<PlayerId>,
}

impl BettingManager {
    pub fn new(structure: BettingStructure, bring_in: Currency) -> Self {
        let last_raise_size = match structure {
            // No-limit opens with the blind as the baseline raise.
            BettingStructure::NoLimit { small_bet } => small_bet,
            _ => 0,
        };
        BettingManager {
            structure,
            pot: Pot::new(),
            current_bets: HashMap::new(),
            current_bet: 0,
            betting_round: 0,
            last_raise_size,
            bring_in,
            bring_in_posted: false,
            last_actor_id: None,
            last_forced_bettor: None,
        }
    }

    pub fn structure(&self) -> BettingStructure {
        self.structure
    }

    pub fn player_bet(&self, pid: PlayerId) -> PlayerBet {
        self.current_bets.get(&pid).copied().unwrap_or_default()
    }

    pub fn get_total_pot(&self) -> Currency {
        self.pot.total()
    }

    pub fn get_ante_total(&self) -> Currency {
        self.pot.ante_total()
    }

    pub fn get_main_pot_amount(&self) -> Currency {
        self.pot.main_pot.amount
    }

    pub fn get_side_pot_count(&self) -> usize {
        self.pot.side_pot_count()
    }

    pub fn get_side_pot_amount(&self, index: usize) -> Currency {
        self.pot.side_pot_amount(index)
    }

    /// Chips the player still owes to call. Antes never count here.
    pub fn get_required_bet(&self, pid: PlayerId) -> Currency {
        (self.current_bet - self.player_bet(pid).amount).max(0)
    }

    /// The bet unit for the current round of a limit game.
    fn limit_bet_unit(&self) -> Currency {
        if self.betting_round < 2 {
            self.structure.small_bet()
        } else {
            self.structure.big_bet()
        }
    }

    /// Lowest round total that is a valid bet of `bet_type`.
    pub fn get_min_bet(&self, _pid: PlayerId, bet_type: BetType) -> Currency {
        match self.structure {
            BettingStructure::Limit { .. } => {
                if bet_type == BetType::BringIn {
                    self.bring_in
                } else {
                    self.current_bet
                }
            }
            _ => {
                if self.current_bet == 0 {
                    self.structure.small_bet()
                } else {
                    self.current_bet
                }
            }
        }
    }

    /// Lowest round total that is a valid raise.
    pub fn get_min_raise(&self, _pid: PlayerId) -> Currency {
        match self.structure {
            BettingStructure::Limit { .. } => {
                let unit = self.limit_bet_unit();
                if self.current_bet == 0 {
                    unit
                } else {
                    self.current_bet + unit
                }
            }
            _ => {
                if self.current_bet == 0 {
                    self.structure.small_bet()
                } else {
                    self.current_bet + self.structure.small_bet().max(self.last_raise_size)
                }
            }
        }
    }

    /// Highest round total the player may bet.
    pub fn get_max_bet(&self, pid: PlayerId, bet_type: BetType, stack: Currency) -> Currency {
        let player_total = self.player_bet(pid).amount;
        match self.structure {
            BettingStructure::Limit { .. } => {
                let _ = bet_type;
                let unit = self.limit_bet_unit();
                let max = if self.current_bet > 0 {
                    self.current_bet + unit
                } else {
                    unit
                };
                max.min(player_total + stack)
            }
            BettingStructure::NoLimit { .. } => player_total + stack,
            BettingStructure::PotLimit { .. } => {
                let call_amount = self.current_bet - player_total;
                // Antes stay out of the pot for sizing purposes.
                let pot_after_call = self.get_total_pot() - self.get_ante_total() + call_amount;
                (self.current_bet + pot_after_call).min(player_total + stack)
            }
        }
    }

    pub fn validate_bet(
        &self,
        pid: PlayerId,
        amount: Currency,
        stack: Currency,
        bet_type: BetType,
    ) -> bool {
        if amount == 0 {
            // Checks and folds are always fine here.
            return true;
        }
        let player_total = self.player_bet(pid).amount;
        let to_call = self.current_bet - player_total;
        match self.structure {
            BettingStructure::Limit { small_bet, big_bet } => {
                let unit = if bet_type == BetType::Small {
                    small_bet
                } else {
                    big_bet
                };
                // All-in for less than the call.
                if amount < self.current_bet && amount == player_total + stack {
                    return true;
                }
                if amount == self.current_bet {
                    return to_call <= stack;
                }
                // Stud completion over the bring-in.
                if bet_type == BetType::Small && amount == small_bet && self.betting_round <= 2 {
                    return amount <= stack;
                }
                // Opening bet when only blinds are in.
                if self.current_bets.values().all(|b| b.posted_blind) && amount == unit {
                    return amount <= stack;
                }
                if amount == self.current_bet + unit {
                    return amount - player_total <= stack;
                }
                // All-in raise for less than the full unit.
                amount > self.current_bet && amount == player_total + stack
            }
            BettingStructure::NoLimit { .. } => {
                if amount == player_total + stack || amount == stack {
                    return true;
                }
                if amount == self.current_bet {
                    return to_call <= stack;
                }
                amount >= self.get_min_raise(pid) && amount - player_total <= stack
            }
            BettingStructure::PotLimit { .. } => {
                if amount < self.current_bet && amount == player_total + stack {
                    return true;
                }
                if amount == self.current_bet {
                    return to_call <= stack;
                }
                amount >= self.get_min_raise(pid)
                    && amount <= self.get_max_bet(pid, BetType::Big, stack)
                    && amount - player_total <= stack
            }
        }
    }

    /// Record a bet. `amount` is the player's round total after the action;
    /// forced bets skip validation. Antes reach the pot but never move
    /// `current_bet` or mark a blind.
    pub fn place_bet(
        &mut self,
        pid: PlayerId,
        amount: Currency,
        stack: Currency,
        is_forced: bool,
        bet_type: BetType,
        is_ante: bool,
    ) -> Result<(), BetError> {
        debug!(
            "place_bet({}, total {}, stack {}, forced {}, {:?}, ante {})",
            pid, amount, stack, is_forced, bet_type, is_ante
        );
        if is_ante {
            if !is_forced && !self.validate_bet(pid, amount, stack, bet_type) {
                return Err(BetError::InvalidBet(amount));
            }
            let is_all_in = amount >= stack;
            if !is_forced {
                self.last_actor_id = Some(pid);
            }
            self.pot.add_bet(pid, amount, is_all_in, stack, true);
            return Ok(());
        }
        let player_total = self.player_bet(pid).amount;
        let amount_to_add = amount - player_total;
        if !is_forced && !self.validate_bet(pid, amount, stack, bet_type) {
            return Err(BetError::InvalidBet(amount));
        }
        let is_all_in = amount_to_add >= stack;
        if amount > self.current_bet {
            let raise_size = amount - self.current_bet;
            self.last_raise_size = self.last_raise_size.max(raise_size);
        }
        let existing = self.player_bet(pid);
        self.current_bets.insert(
            pid,
            PlayerBet {
                amount,
                has_acted: !is_forced,
                posted_blind: is_forced || existing.posted_blind,
                is_all_in,
            },
        );
        if !is_forced {
            self.last_actor_id = Some(pid);
        } else {
            self.last_forced_bettor = Some(pid);
        }
        if amount_to_add > 0 {
            self.pot.add_bet(pid, amount, is_all_in, stack, false);
        }
        self.current_bet = self.current_bet.max(amount);
        if bet_type == BetType::BringIn {
            self.bring_in_posted = true;
        }
        debug!(
            "after bet: current_bet={}, last_raise={}, pot={}",
            self.current_bet,
            self.last_raise_size,
            self.pot.total()
        );
        Ok(())
    }

    /// A betting round is done when every active player has acted and all
    /// non-all-in actives have matched the current bet.
    pub fn round_complete(&self, active_players: &[PlayerId]) -> bool {
        for pid in active_players {
            match self.current_bets.get(pid) {
                None => return false,
                Some(bet) if !bet.has_acted => return false,
                _ => {}
            }
        }
        let amounts: Vec<Currency> = active_players
            .iter()
            .filter_map(|pid| self.current_bets.get(pid))
            .filter(|b| !b.is_all_in)
            .map(|b| b.amount)
            .collect();
        amounts.windows(2).all(|w| w[0] == w[1])
    }

    /// Start a new betting round, or continue the current one after forced
    /// bets (preserving the bet level the blinds set).
    pub fn new_round(&mut self, preserve_current_bet: bool) {
        if !preserve_current_bet {
            self.current_bets.clear();
            self.current_bet = 0;
            self.betting_round += 1;
            self.pot.end_betting_round();
            self.bring_in_posted = false;
            self.last_forced_bettor = None;
        }
        debug!(
            "betting round {} ({}) current_bet={}",
            self.betting_round,
            if preserve_current_bet {
                "continued"
            } else {
                "new"
            },
            self.current_bet
        );
    }

    pub fn new_hand(&mut self) {
        self.current_bets.clear();
        self.current_bet = 0;
        self.betting_round = 0;
        self.bring_in_posted = false;
        self.last_raise_size = 0;
        self.last_actor_id = None;
        self.last_forced_bettor = None;
        self.pot.new_hand();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    fn nl() -> BettingManager {
        BettingManager::new(BettingStructure::NoLimit { small_bet: 10 }, 0)
    }

    fn limit() -> BettingManager {
        BettingManager::new(
            BettingStructure::Limit {
                small_bet: 10,
                big_bet: 20,
            },
            3,
        )
    }

    fn pl() -> BettingManager {
        BettingManager::new(BettingStructure::PotLimit { small_bet: 10 }, 0)
    }

    fn post_blinds(b: &mut BettingManager) {
        b.place_bet(pid(1), 5, 500, true, BetType::Blind, false)
            .unwrap();
        b.place_bet(pid(2), 10, 500, true, BetType::Blind, false)
            .unwrap();
    }

    #[test]
    fn blinds_set_the_bet() {
        let mut b = nl();
        post_blinds(&mut b);
        assert_eq!(b.get_total_pot(), 15);
        assert_eq!(b.current_bet, 10);
        assert_eq!(b.get_required_bet(pid(3)), 10);
        assert_eq!(b.get_required_bet(pid(1)), 5);
        assert!(!b.player_bet(pid(2)).has_acted);
        assert!(b.player_bet(pid(2)).posted_blind);
    }

    #[test]
    fn nl_min_raise_tracks_raise_size() {
        let mut b = nl();
        post_blinds(&mut b);
        assert_eq!(b.get_min_bet(pid(3), BetType::Big), 10);
        assert_eq!(b.get_min_raise(pid(3)), 20);
        assert_eq!(b.get_max_bet(pid(3), BetType::Big, 500), 500);
        b.place_bet(pid(3), 30, 500, false, BetType::Big, false)
            .unwrap();
        assert_eq!(b.get_min_bet(pid(4), BetType::Big), 30);
        assert_eq!(b.get_min_raise(pid(4)), 50); // 30 + raise of 20
        b.place_bet(pid(4), 100, 500, false, BetType::Big, false)
            .unwrap();
        assert_eq!(b.get_min_raise(pid(1)), 170); // 100 + raise of 70
    }

    #[test]
    fn nl_rejects_small_raise_allows_allin() {
        let mut b = nl();
        post_blinds(&mut b);
        b.place_bet(pid(3), 30, 500, false, BetType::Big, false)
            .unwrap();
        // Raise to 40 is under the min raise of 50.
        assert!(b
            .place_bet(pid(4), 40, 500, false, BetType::Big, false)
            .is_err());
        // But an all-in for 40 is fine.
        assert!(b
            .place_bet(pid(4), 40, 40, false, BetType::Big, false)
            .is_ok());
        assert!(b.player_bet(pid(4)).is_all_in);
    }

    #[test]
    fn limit_bets_are_fixed_size() {
        let mut b = limit();
        post_blinds(&mut b);
        // Calling is fine, raising must go to exactly 20.
        assert!(b.validate_bet(pid(3), 10, 500, BetType::Small));
        assert!(b.validate_bet(pid(3), 20, 500, BetType::Small));
        assert!(!b.validate_bet(pid(3), 15, 500, BetType::Small));
        assert!(!b.validate_bet(pid(3), 30, 500, BetType::Small));
        // All-in for less is always allowed.
        assert!(b.validate_bet(pid(3), 7, 7, BetType::Small));
    }

    #[test]
    fn limit_uses_big_bet_in_later_rounds() {
        let mut b = limit();
        b.new_round(false);
        b.new_round(false);
        assert_eq!(b.betting_round, 2);
        assert_eq!(b.get_min_raise(pid(1)), 20);
        b.place_bet(pid(1), 20, 500, false, BetType::Big, false)
            .unwrap();
        assert_eq!(b.get_min_raise(pid(2)), 40);
        assert_eq!(b.get_max_bet(pid(2), BetType::Big, 500), 40);
    }

    #[test]
    fn pot_limit_max_excludes_antes() {
        let mut b = pl();
        b.place_bet(pid(1), 1, 500, true, BetType::Ante, true).unwrap();
        b.place_bet(pid(2), 1, 500, true, BetType::Ante, true).unwrap();
        post_blinds(&mut b);
        // Pot is 17 with 2 in antes; a call adds 10.
        // Max = current_bet + (pot - antes + call) = 10 + (15 + 10) = 35.
        assert_eq!(b.get_max_bet(pid(3), BetType::Big, 500), 35);
        assert!(b.validate_bet(pid(3), 35, 500, BetType::Big));
        assert!(!b.validate_bet(pid(3), 36, 500, BetType::Big));
    }

    #[test]
    fn round_completeness() {
        let mut b = nl();
        let actives = [pid(1), pid(2), pid(3)];
        post_blinds(&mut b);
        assert!(!b.round_complete(&actives));
        b.place_bet(pid(3), 10, 500, false, BetType::Big, false)
            .unwrap();
        // Blinds haven't voluntarily acted yet.
        assert!(!b.round_complete(&actives));
        b.place_bet(pid(1), 10, 495, false, BetType::Big, false)
            .unwrap();
        b.place_bet(pid(2), 10, 490, false, BetType::Big, false)
            .unwrap();
        assert!(b.round_complete(&actives));
    }

    #[test]
    fn all_in_short_counts_complete() {
        let mut b = nl();
        let actives = [pid(1), pid(2)];
        b.place_bet(pid(1), 100, 500, false, BetType::Big, false)
            .unwrap();
        b.place_bet(pid(2), 40, 40, false, BetType::Big, false)
            .unwrap();
        assert!(b.player_bet(pid(2)).is_all_in);
        assert!(b.round_complete(&actives));
    }

    #[test]
    fn new_round_resets_and_preserves() {
        let mut b = nl();
        post_blinds(&mut b);
        b.new_round(true);
        assert_eq!(b.current_bet, 10);
        assert_eq!(b.betting_round, 0);
        b.place_bet(pid(3), 10, 500, false, BetType::Big, false)
            .unwrap();
        b.new_round(false);
        assert_eq!(b.current_bet, 0);
        assert_eq!(b.betting_round, 1);
        assert!(b.current_bets.is_empty());
        assert_eq!(b.get_total_pot(), 25);
    }

    #[test]
    fn antes_do_not_move_current_bet() {
        let mut b = nl();
        b.place_bet(pid(1), 1, 500, true, BetType::Ante, true).unwrap();
        b.place_bet(pid(2), 1, 500, true, BetType::Ante, true).unwrap();
        assert_eq!(b.current_bet, 0);
        assert_eq!(b.get_total_pot(), 2);
        assert_eq!(b.get_ante_total(), 2);
        assert_eq!(b.get_required_bet(pid(1)), 0);
    }

    #[test]
    fn bring_in_flag() {
        let mut b = limit();
        b.place_bet(pid(1), 3, 500, true, BetType::BringIn, false)
            .unwrap();
        assert!(b.bring_in_posted);
        assert_eq!(b.current_bet, 3);
        // Completion to the small bet is valid.
        assert!(b.validate_bet(pid(2), 10, 500, BetType::Small));
    }
}
