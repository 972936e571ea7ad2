//! Pot accounting: one main pot plus ordered side pots, with the
//! restructure rule that keeps them correct under arbitrary interleaved
//! all-ins and raises. Bets arrive as round totals; the pot computes the
//! increment itself, so re-submitting a total is a no-op.

use crate::{Currency, PlayerId};
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// One pool of chips with its own eligibility. The main pot is segment 0 in
/// spirit; side pots follow in creation order.
#[derive(Debug, Clone, Default)]
pub struct PotSegment {
    pub amount: Currency,
    /// Highest per-player contribution to this segment this betting round.
    pub current_bet: Currency,
    /// Per-player contribution limit once an all-in capped the segment.
    pub cap_amount: Currency,
    pub capped: bool,
    /// Capped in an earlier round; takes no further contributions.
    closed: bool,
    /// Per-round contributions, insertion ordered.
    pub player_bets: Vec<(PlayerId, Currency)>,
    pub eligible_players: BTreeSet<PlayerId>,
    pub active_players: BTreeSet<PlayerId>,
    pub excluded_players: BTreeSet<PlayerId>,
    pub order: usize,
}

impl PotSegment {
    fn new(order: usize) -> Self {
        PotSegment {
            order,
            ..Default::default()
        }
    }

    pub fn round_bet_of(&self, pid: PlayerId) -> Currency {
        self.player_bets
            .iter()
            .find(|(p, _)| *p == pid)
            .map(|(_, a)| *a)
            .unwrap_or(0)
    }

    fn contribute(&mut self, pid: PlayerId, amount: Currency, is_all_in: bool) {
        if amount <= 0 {
            return;
        }
        self.amount += amount;
        match self.player_bets.iter_mut().find(|(p, _)| *p == pid) {
            Some((_, a)) => *a += amount,
            None => self.player_bets.push((pid, amount)),
        }
        self.eligible_players.insert(pid);
        if is_all_in {
            self.active_players.remove(&pid);
        } else {
            self.active_players.insert(pid);
        }
    }

    /// Lower this segment's per-player level to `new_level`, refunding every
    /// contribution above it into a fresh overflow segment. The overflow
    /// inherits cap state from any refunded all-in player.
    fn restructure(&mut self, new_level: Currency) -> PotSegment {
        let mut overflow = PotSegment::new(self.order + 1);
        let mut allin_excess: Currency = 0;
        for (pid, amt) in self.player_bets.iter_mut() {
            if *amt <= new_level {
                continue;
            }
            let excess = *amt - new_level;
            *amt = new_level;
            self.amount -= excess;
            overflow.amount += excess;
            overflow.player_bets.push((*pid, excess));
            overflow.eligible_players.insert(*pid);
            if self.active_players.contains(pid) {
                overflow.active_players.insert(*pid);
            } else {
                allin_excess = allin_excess.max(excess);
            }
            overflow.current_bet = overflow.current_bet.max(excess);
        }
        if allin_excess > 0 {
            overflow.capped = true;
            overflow.cap_amount = allin_excess;
        }
        self.capped = true;
        self.cap_amount = new_level;
        self.current_bet = new_level;
        overflow
    }
}

#[derive(Debug, Default)]
pub struct Pot {
    pub main_pot: PotSegment,
    pub side_pots: Vec<PotSegment>,
    current_round: u32,
    /// Per-player round totals, the baseline for computing increments.
    round_totals: HashMap<PlayerId, Currency>,
    /// Antes per (round, player); kept out of betting math entirely.
    total_antes: HashMap<(u32, PlayerId), Currency>,
    contributed: Currency,
    awarded: Currency,
}

impl Pot {
    pub fn new() -> Self {
        Pot::default()
    }

    pub fn total(&self) -> Currency {
        self.main_pot.amount + self.side_pots.iter().map(|p| p.amount).sum::<Currency>()
    }

    pub fn ante_total(&self) -> Currency {
        self.total_antes.values().sum()
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_ante_of(&self, pid: PlayerId) -> Currency {
        self.total_antes
            .get(&(self.current_round, pid))
            .copied()
            .unwrap_or(0)
    }

    pub fn round_total_of(&self, pid: PlayerId) -> Currency {
        self.round_totals.get(&pid).copied().unwrap_or(0)
    }

    fn seg_mut(&mut self, g: usize) -> &mut PotSegment {
        if g == 0 {
            &mut self.main_pot
        } else {
            &mut self.side_pots[g - 1]
        }
    }

    fn seg(&self, g: usize) -> &PotSegment {
        if g == 0 {
            &self.main_pot
        } else {
            &self.side_pots[g - 1]
        }
    }

    fn seg_count(&self) -> usize {
        1 + self.side_pots.len()
    }

    /// Record a bet. `total` is the player's round total after this action,
    /// not the increment. A total at or below the current round total is a
    /// no-op. Antes go to the main pot's chips but touch no bet structure.
    pub fn add_bet(
        &mut self,
        pid: PlayerId,
        total: Currency,
        is_all_in: bool,
        stack_before: Currency,
        is_ante: bool,
    ) {
        let _ = stack_before;
        if is_ante {
            self.main_pot.amount += total;
            self.main_pot.eligible_players.insert(pid);
            *self
                .total_antes
                .entry((self.current_round, pid))
                .or_insert(0) += total;
            self.contributed += total;
            debug!("{} antes {} (pot now {})", pid, total, self.total());
            return;
        }
        let prev = self.round_total_of(pid);
        let delta = total - prev;
        if delta <= 0 {
            return;
        }
        self.round_totals.insert(pid, total);
        self.contributed += delta;
        let mut remaining = delta;
        let mut g = 0;
        while remaining > 0 && g < self.seg_count() {
            remaining = self.route_through(g, pid, remaining, is_all_in);
            g += 1;
        }
        if remaining > 0 {
            // Everything existing is capped and full; open a new side pot.
            let mut seg = PotSegment::new(self.seg_count());
            seg.contribute(pid, remaining, is_all_in);
            seg.current_bet = remaining;
            if is_all_in {
                seg.capped = true;
                seg.cap_amount = remaining;
            }
            debug!("new side pot {} with {} from {}", seg.order, remaining, pid);
            self.side_pots.push(seg);
        }
        if is_all_in {
            debug!("{} is all in; pot total {}", pid, self.total());
        }
        debug_assert_eq!(self.total(), self.contributed - self.awarded);
    }

    /// Push up to `remaining` chips through segment `g`, possibly
    /// restructuring it. Returns what is left for later segments.
    fn route_through(
        &mut self,
        g: usize,
        pid: PlayerId,
        remaining: Currency,
        is_all_in: bool,
    ) -> Currency {
        let seg = self.seg_mut(g);
        if seg.closed {
            return remaining;
        }
        let already = seg.round_bet_of(pid);
        if seg.capped {
            let room = seg.cap_amount - already;
            if room <= 0 {
                return remaining;
            }
            if remaining >= room {
                seg.contribute(pid, room, is_all_in);
                return remaining - room;
            }
            // All-in for less than the cap: lower the cap and spill the
            // refunds into a new segment right behind this one.
            let new_level = already + remaining;
            debug!(
                "restructuring pot {} at {} for short all-in by {}",
                g, new_level, pid
            );
            let overflow = seg.restructure(new_level);
            seg.contribute(pid, remaining, is_all_in);
            self.side_pots.insert(g, overflow);
            self.renumber();
            return 0;
        }
        let needed = seg.current_bet - already;
        if remaining < needed && is_all_in {
            let new_level = already + remaining;
            debug!(
                "restructuring pot {} at {} for short all-in by {}",
                g, new_level, pid
            );
            let overflow = seg.restructure(new_level);
            seg.contribute(pid, remaining, is_all_in);
            self.side_pots.insert(g, overflow);
            self.renumber();
            return 0;
        }
        // An uncapped segment is always the last one, so it absorbs the
        // rest of the bet, raising its level if this is a raise.
        seg.contribute(pid, remaining, is_all_in);
        let level = already + remaining;
        seg.current_bet = seg.current_bet.max(level);
        if is_all_in {
            seg.capped = true;
            seg.cap_amount = level;
        }
        0
    }

    fn renumber(&mut self) {
        self.main_pot.order = 0;
        for (i, s) in self.side_pots.iter_mut().enumerate() {
            s.order = i + 1;
        }
    }

    /// Close out the betting round: capped segments stop accepting chips,
    /// per-round levels reset, and round totals start over.
    pub fn end_betting_round(&mut self) {
        for g in 0..self.seg_count() {
            let seg = self.seg_mut(g);
            if seg.capped {
                seg.closed = true;
            }
            seg.player_bets.clear();
            seg.current_bet = 0;
        }
        self.round_totals.clear();
        self.current_round += 1;
        debug!(
            "betting round closed; pot {} across {} segment(s)",
            self.total(),
            self.seg_count()
        );
    }

    pub fn new_hand(&mut self) {
        *self = Pot::default();
    }

    pub fn side_pot_count(&self) -> usize {
        self.side_pots.len()
    }

    pub fn side_pot_amount(&self, index: usize) -> Currency {
        self.side_pots[index].amount
    }

    pub fn side_pot_eligible(&self, index: usize) -> &BTreeSet<PlayerId> {
        &self.side_pots[index].eligible_players
    }

    pub fn segment(&self, side_pot_index: Option<usize>) -> &PotSegment {
        match side_pot_index {
            None => &self.main_pot,
            Some(i) => &self.side_pots[i],
        }
    }

    /// Remove awarded chips from a segment. The betting manager moves them
    /// onto player stacks.
    pub(crate) fn reduce(&mut self, side_pot_index: Option<usize>, amount: Currency) {
        let seg = match side_pot_index {
            None => &mut self.main_pot,
            Some(i) => &mut self.side_pots[i],
        };
        debug_assert!(amount <= seg.amount, "awarding more than the pot holds");
        seg.amount -= amount;
        self.awarded += amount;
        debug_assert_eq!(self.total(), self.contributed - self.awarded);
    }
}
