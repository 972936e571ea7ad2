//! Computed evaluation backends. These cover the evaluation types whose
//! rankings are cheap to derive on the fly; anything exotic enough to need a
//! precomputed table (quick quads, the New England 7-card table) goes through
//! `tables` instead.

use super::types::{EvaluationType, Evaluator, HandRanking};
use crate::cards::card::{Card, Rank, Suit, ALL_RANKS, ALL_SUITS};
use crate::cards::deck::DeckType;
use enum_map::EnumMap;
use itertools::Itertools;
use std::sync::Arc;

/// Fold a tie-break vector into a single ordered rank. Digits are 0..=15,
/// lower is better, compared left to right.
fn encode_digits(digits: &[u8]) -> u32 {
    debug_assert!(digits.len() <= 6);
    digits.iter().fold(0u32, |acc, d| acc * 16 + *d as u32)
}

fn rank_counts(cards: &[Card]) -> EnumMap<Rank, u8> {
    let mut counts = EnumMap::default();
    for c in cards {
        counts[c.rank] += 1;
    }
    counts
}

/// Shape of a hand under high rules. Ordering here is "standard poker";
/// variant rank numbers come from `HighVariant::rank_of`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HighClass {
    StraightFlush,
    FourOfAKind,
    FullHouse,
    Flush,
    Straight,
    ThreeOfAKind,
    TwoPair,
    FourFlush,
    FourStraight,
    Pair,
    HighCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighVariant {
    /// Flushes beat full houses, as in short-deck games.
    Standard,
    FlushesBeatBoats,
    /// Canadian stud: four-card straights and flushes rank between a pair
    /// and two pair.
    Soko,
}

impl HighVariant {
    fn class_order(&self) -> &'static [HighClass] {
        use HighClass::*;
        match self {
            HighVariant::Standard => &[
                StraightFlush,
                FourOfAKind,
                FullHouse,
                Flush,
                Straight,
                ThreeOfAKind,
                TwoPair,
                Pair,
                HighCard,
            ],
            HighVariant::FlushesBeatBoats => &[
                StraightFlush,
                FourOfAKind,
                Flush,
                FullHouse,
                Straight,
                ThreeOfAKind,
                TwoPair,
                Pair,
                HighCard,
            ],
            HighVariant::Soko => &[
                StraightFlush,
                FourOfAKind,
                FullHouse,
                Flush,
                Straight,
                ThreeOfAKind,
                TwoPair,
                FourFlush,
                FourStraight,
                Pair,
                HighCard,
            ],
        }
    }

    fn rank_of(&self, class: HighClass) -> u32 {
        self.class_order()
            .iter()
            .position(|c| *c == class)
            .map(|i| i as u32 + 1)
            .expect("class not rankable in this variant")
    }

    /// Class ranks a bug substitution other than an ace may produce.
    pub fn bug_classes(&self) -> Vec<u32> {
        [HighClass::StraightFlush, HighClass::Flush, HighClass::Straight]
            .iter()
            .map(|c| self.rank_of(*c))
            .collect()
    }
}

/// High-hand evaluation over an arbitrary deck rank sequence. Straight
/// adjacency follows the sequence, so short decks (6-A, T-A, 2-7+J-A) come
/// out right without special cases.
pub struct HighEvaluator {
    seq: Vec<Rank>,
    hand_size: usize,
    variant: HighVariant,
    /// Ace-plus-lowest-cards counts as a straight (off for 2-7 style).
    allow_wheel: bool,
    /// Ace compares low everywhere (for ace-to-six inversion).
    ace_low: bool,
}

impl HighEvaluator {
    pub fn new(deck: DeckType, hand_size: usize, variant: HighVariant) -> Self {
        HighEvaluator {
            seq: deck.rank_sequence(),
            hand_size,
            variant,
            allow_wheel: true,
            ace_low: false,
        }
    }

    pub fn no_wheel(mut self) -> Self {
        self.allow_wheel = false;
        self
    }

    pub fn ace_low(mut self) -> Self {
        self.ace_low = true;
        self
    }

    fn value(&self, r: Rank) -> u8 {
        if self.ace_low {
            r.low_value()
        } else {
            r.value()
        }
    }

    /// Tie-break digit: lower is better, so invert the card value.
    fn digit(&self, r: Rank) -> u8 {
        15 - self.value(r)
    }

    fn seq_index(&self, r: Rank) -> Option<usize> {
        self.seq.iter().position(|s| *s == r)
    }

    /// Ranks forming a straight of `n` cards, returned as the straight-high
    /// rank, or None. `ranks` must be sorted descending by value.
    fn straight_high(&self, ranks: &[Rank]) -> Option<Rank> {
        let n = ranks.len();
        if n < 3 {
            return None;
        }
        let idxs: Option<Vec<usize>> = ranks.iter().map(|r| self.seq_index(*r)).collect();
        if let Some(idxs) = idxs {
            if idxs.windows(2).all(|w| w[0] == w[1] + 1) {
                return Some(ranks[0]);
            }
        }
        // The wheel: ace plus the n-1 lowest ranks of the sequence. With the
        // ace comparing low it sorts to the back instead of the front.
        if self.allow_wheel {
            let mut wheel: Vec<Rank> = self.seq[..n - 1].to_vec();
            wheel.reverse();
            if ranks[0] == Rank::Ace && ranks[1..] == wheel[..] {
                return Some(ranks[1]);
            }
            if self.ace_low && ranks[n - 1] == Rank::Ace && ranks[..n - 1] == wheel[..] {
                return Some(ranks[0]);
            }
        }
        None
    }

    fn is_flush(cards: &[Card]) -> bool {
        cards.iter().map(|c| c.suit).all_equal()
    }

    /// Grouped ranks: (count, rank) sorted by count desc then value desc.
    fn groups(&self, cards: &[Card]) -> Vec<(u8, Rank)> {
        let counts = rank_counts(cards);
        let mut groups: Vec<(u8, Rank)> = ALL_RANKS
            .iter()
            .filter(|r| counts[**r] > 0)
            .map(|r| (counts[*r], *r))
            .collect();
        groups.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(self.value(b.1).cmp(&self.value(a.1)))
        });
        groups
    }

    /// Best four-card straight or flush inside a five-card soko hand.
    fn soko_four(&self, cards: &[Card]) -> Option<(HighClass, Vec<u8>, Rank)> {
        let mut best: Option<(HighClass, Vec<u8>, Rank)> = None;
        for combo in cards.iter().combinations(4) {
            let four: Vec<Card> = combo.into_iter().copied().collect();
            let kicker = cards.iter().find(|c| !four.contains(*c)).copied();
            let mut sorted = four.clone();
            sorted.sort_by(|a, b| self.value(b.rank).cmp(&self.value(a.rank)));
            let ranks: Vec<Rank> = sorted.iter().map(|c| c.rank).collect();
            let class = if Self::is_flush(&four) {
                HighClass::FourFlush
            } else if self.straight_high(&ranks).is_some() {
                HighClass::FourStraight
            } else {
                continue;
            };
            let mut digits: Vec<u8> = ranks.iter().map(|r| self.digit(*r)).collect();
            if let Some(k) = kicker {
                digits.push(self.digit(k.rank));
            }
            let candidate = (class, digits, ranks[0]);
            best = match best {
                None => Some(candidate),
                Some(cur) => {
                    let cur_rank = self.variant.rank_of(cur.0);
                    let cand_rank = self.variant.rank_of(candidate.0);
                    if (cand_rank, encode_digits(&candidate.1))
                        < (cur_rank, encode_digits(&cur.1))
                    {
                        Some(candidate)
                    } else {
                        Some(cur)
                    }
                }
            };
        }
        best
    }

    fn classify(&self, cards: &[Card]) -> Option<(HighClass, Vec<u8>, String)> {
        if cards.is_empty() || cards.len() > self.hand_size {
            return None;
        }
        if cards.iter().any(|c| c.rank == Rank::Joker) {
            // An unresolved joker can't rank; wild resolution happens a
            // layer up.
            return None;
        }
        let groups = self.groups(cards);
        let mut sorted = cards.to_vec();
        sorted.sort_by(|a, b| self.value(b.rank).cmp(&self.value(a.rank)));
        let desc_digits: Vec<u8> = sorted.iter().map(|c| self.digit(c.rank)).collect();
        let ranks_desc: Vec<Rank> = sorted.iter().map(|c| c.rank).collect();

        // Straights and flushes only exist at full five-card size.
        if cards.len() == 5 && self.hand_size == 5 {
            let flush = Self::is_flush(cards);
            let straight = self.straight_high(&ranks_desc);
            match (flush, straight) {
                (true, Some(high)) => {
                    return Some((
                        HighClass::StraightFlush,
                        vec![self.digit(high)],
                        format!("{} high straight flush", high),
                    ));
                }
                (true, None) if groups.len() == 5 => {
                    return Some((
                        HighClass::Flush,
                        desc_digits,
                        format!("{} high flush", ranks_desc[0]),
                    ));
                }
                (false, Some(high)) if groups.len() == 5 => {
                    return Some((
                        HighClass::Straight,
                        vec![self.digit(high)],
                        format!("{} high straight", high),
                    ));
                }
                _ => {}
            }
        }

        let shape: Vec<u8> = groups.iter().map(|g| g.0).collect();
        let result = match shape.as_slice() {
            [4, ..] => (
                HighClass::FourOfAKind,
                groups.iter().map(|g| self.digit(g.1)).collect::<Vec<u8>>(),
                format!("Quad {}s", groups[0].1),
            ),
            [3, 2] => (
                HighClass::FullHouse,
                vec![self.digit(groups[0].1), self.digit(groups[1].1)],
                format!("Boat {}s full of {}s", groups[0].1, groups[1].1),
            ),
            [3, ..] => (
                HighClass::ThreeOfAKind,
                groups.iter().map(|g| self.digit(g.1)).collect::<Vec<u8>>(),
                format!("Set of {}s", groups[0].1),
            ),
            [2, 2, ..] => (
                HighClass::TwoPair,
                groups.iter().map(|g| self.digit(g.1)).collect::<Vec<u8>>(),
                format!("Two pair {}s and {}s", groups[0].1, groups[1].1),
            ),
            [2, ..] => (
                HighClass::Pair,
                groups.iter().map(|g| self.digit(g.1)).collect::<Vec<u8>>(),
                format!("Pair of {}s", groups[0].1),
            ),
            _ => (
                HighClass::HighCard,
                desc_digits,
                format!("{} high", ranks_desc[0]),
            ),
        };
        // Soko promotes four-card straights and flushes over pairs and
        // bare high cards.
        if self.variant == HighVariant::Soko
            && cards.len() == 5
            && matches!(result.0, HighClass::Pair | HighClass::HighCard)
        {
            if let Some((class, digits, high)) = self.soko_four(cards) {
                if self.variant.rank_of(class) < self.variant.rank_of(result.0) {
                    let name = match class {
                        HighClass::FourFlush => format!("Four flush {} high", high),
                        _ => format!("Four straight {} high", high),
                    };
                    return Some((class, digits, name));
                }
            }
        }
        Some(result)
    }
}

impl Evaluator for HighEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        let (class, digits, desc) = self.classify(cards)?;
        Some(HandRanking::new(
            self.variant.rank_of(class),
            encode_digits(&digits),
            desc,
        ))
    }

    fn hand_size(&self) -> usize {
        self.hand_size
    }

    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        let mut v = cards.to_vec();
        v.sort_by(|a, b| {
            self.value(b.rank)
                .cmp(&self.value(a.rank))
                .then(b.suit.cmp(&a.suit))
        });
        v
    }
}

/// Inverts another evaluator: the worst hand under the inner rules becomes
/// the best. Covers 2-7 and A-6 lowball and the "low rules, high hand wins"
/// oddballs.
pub struct InverseEvaluator {
    inner: Arc<dyn Evaluator>,
    max_rank: u32,
}

impl InverseEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, max_rank: u32) -> Self {
        InverseEvaluator { inner, max_rank }
    }
}

impl Evaluator for InverseEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        let r = self.inner.evaluate(cards)?;
        Some(HandRanking::new(
            self.max_rank + 1 - r.rank.min(self.max_rank),
            u32::MAX - r.ordered_rank,
            r.description,
        ))
    }

    fn hand_size(&self) -> usize {
        self.inner.hand_size()
    }

    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        self.inner.sort_cards(cards)
    }
}

/// Ace-to-five style low: straights and flushes never count, pairing is what
/// hurts you. Works for any hand size 1..=5.
pub struct LowA5Evaluator {
    hand_size: usize,
    /// Ace plays low (a5). Off for the 2-7 style partial lows where the ace
    /// stays high.
    ace_low: bool,
}

impl LowA5Evaluator {
    pub fn new(hand_size: usize, ace_low: bool) -> Self {
        LowA5Evaluator { hand_size, ace_low }
    }

    fn value(&self, r: Rank) -> u8 {
        if self.ace_low {
            r.low_value()
        } else {
            r.value()
        }
    }

    pub fn max_rank(&self) -> u32 {
        // No pair, pair, two pair, trips, boat, quads as hand size allows.
        match self.hand_size {
            1 => 1,
            2 => 2,
            3 => 3,
            4 => 5,
            _ => 6,
        }
    }
}

impl Evaluator for LowA5Evaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        if cards.is_empty()
            || cards.len() > self.hand_size
            || cards.iter().any(|c| c.rank == Rank::Joker)
        {
            return None;
        }
        let counts = rank_counts(cards);
        let mut groups: Vec<(u8, Rank)> = ALL_RANKS
            .iter()
            .filter(|r| counts[**r] > 0)
            .map(|r| (counts[*r], *r))
            .collect();
        // Bigger groups first; within a group size, *higher* cards are
        // worse, so they lead the tie-break.
        groups.sort_by(|a, b| b.0.cmp(&a.0).then(self.value(b.1).cmp(&self.value(a.1))));
        let shape: Vec<u8> = groups.iter().map(|g| g.0).collect();
        let rank = match shape.as_slice() {
            [1, ..] => 1,
            [2, 1, ..] | [2] => 2,
            [2, 2, ..] => 3,
            [3, 1, ..] | [3] => 4,
            [3, 2] => 5,
            [4, ..] => 6,
            _ => return None,
        };
        let digits: Vec<u8> = groups.iter().map(|g| self.value(g.1)).collect();
        let names: Vec<String> = groups.iter().map(|g| g.1.to_string()).collect();
        let desc = match rank {
            1 => format!("{} low", names.join("-")),
            2 => format!("Pair of {}s", groups[0].1),
            3 => format!("Two pair {}s and {}s", groups[0].1, groups[1].1),
            4 => format!("Set of {}s", groups[0].1),
            5 => format!("Boat {}s full of {}s", groups[0].1, groups[1].1),
            _ => format!("Quad {}s", groups[0].1),
        };
        Some(HandRanking::new(rank, encode_digits(&digits), desc))
    }

    fn hand_size(&self) -> usize {
        self.hand_size
    }

    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        let mut v = cards.to_vec();
        v.sort_by(|a, b| {
            self.value(b.rank)
                .cmp(&self.value(a.rank))
                .then(b.suit.cmp(&a.suit))
        });
        v
    }
}

/// Badugi family: the best subset of cards with no shared rank or suit.
/// More cards always beats fewer; card comparison direction is configurable
/// for the ace-high and Hi-Dugi variants.
pub struct BadugiEvaluator {
    ace_high: bool,
    /// Hi-Dugi: higher cards win within a size class.
    high_wins: bool,
}

impl BadugiEvaluator {
    pub fn new(ace_high: bool, high_wins: bool) -> Self {
        BadugiEvaluator { ace_high, high_wins }
    }

    fn value(&self, r: Rank) -> u8 {
        if self.ace_high {
            r.value()
        } else {
            r.low_value()
        }
    }

    fn digit(&self, r: Rank) -> u8 {
        if self.high_wins {
            15 - self.value(r)
        } else {
            self.value(r)
        }
    }
}

impl Evaluator for BadugiEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        if cards.is_empty() || cards.iter().any(|c| c.rank == Rank::Joker) {
            return None;
        }
        let mut best: Option<(usize, Vec<u8>, Vec<Card>)> = None;
        for n in (1..=cards.len().min(4)).rev() {
            for combo in cards.iter().combinations(n) {
                if !combo.iter().map(|c| c.rank).all_unique()
                    || !combo.iter().map(|c| c.suit).all_unique()
                {
                    continue;
                }
                let mut chosen: Vec<Card> = combo.into_iter().copied().collect();
                chosen.sort_by(|a, b| self.value(b.rank).cmp(&self.value(a.rank)));
                let digits: Vec<u8> = chosen.iter().map(|c| self.digit(c.rank)).collect();
                let better = match &best {
                    None => true,
                    Some((bn, bd, _)) => {
                        n > *bn || (n == *bn && encode_digits(&digits) < encode_digits(bd))
                    }
                };
                if better {
                    best = Some((n, digits, chosen));
                }
            }
            if best.is_some() {
                // A larger subset always wins; no need to look smaller.
                break;
            }
        }
        let (n, digits, chosen) = best?;
        let names: Vec<String> = chosen.iter().map(|c| c.rank.to_string()).collect();
        Some(HandRanking::new(
            5 - n as u32,
            encode_digits(&digits),
            format!("{}-card badugi: {}", n, names.join("-")),
        ))
    }

    fn hand_size(&self) -> usize {
        4
    }

    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        let mut v = cards.to_vec();
        v.sort_by(|a, b| {
            self.value(b.rank)
                .cmp(&self.value(a.rank))
                .then(b.suit.cmp(&a.suit))
        });
        v
    }
}

/// Pip-count games: hands compare on card pip totals, either lowest-total
/// or closest-to-target (under beating over on a tie in distance).
pub struct PipEvaluator {
    hand_size: usize,
    target: Option<i32>,
}

impl PipEvaluator {
    pub fn new(hand_size: usize, target: Option<i32>) -> Self {
        PipEvaluator { hand_size, target }
    }
}

impl Evaluator for PipEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        let total: i32 = cards.iter().map(|c| c.rank.pip_value() as i32).sum();
        let rank = match self.target {
            None => total as u32 + 1,
            Some(t) => {
                let dist = (t - total).unsigned_abs();
                // Land under the target on equal distance.
                dist * 2 + 1 + if total > t { 1 } else { 0 }
            }
        };
        Some(HandRanking::new(rank, 0, format!("{} pips", total)))
    }

    fn hand_size(&self) -> usize {
        self.hand_size
    }
}

/// Best single card (or top N cards) of a required suit; hands without
/// enough cards of the suit do not qualify at all.
pub struct SuitBoundEvaluator {
    suit: Suit,
    count: usize,
    low: bool,
}

impl SuitBoundEvaluator {
    pub fn new(suit: Suit, count: usize, low: bool) -> Self {
        SuitBoundEvaluator { suit, count, low }
    }
}

impl Evaluator for SuitBoundEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        let mut suited: Vec<Card> = cards
            .iter()
            .copied()
            .filter(|c| c.suit == self.suit && c.rank != Rank::Joker)
            .collect();
        if suited.len() < self.count {
            return None;
        }
        suited.sort_by(|a, b| {
            if self.low {
                a.rank.value().cmp(&b.rank.value())
            } else {
                b.rank.value().cmp(&a.rank.value())
            }
        });
        suited.truncate(self.count);
        let digits: Vec<u8> = suited
            .iter()
            .map(|c| {
                if self.low {
                    c.rank.value()
                } else {
                    15 - c.rank.value()
                }
            })
            .collect();
        let names: Vec<String> = suited.iter().map(|c| c.to_string()).collect();
        Some(HandRanking::new(
            1,
            encode_digits(&digits),
            format!(
                "{} {}",
                names.join("-"),
                if self.low { "low" } else { "high" }
            ),
        ))
    }

    fn hand_size(&self) -> usize {
        self.count
    }
}

/// Wild-card resolution around a base evaluator. Named wilds try every
/// substitution; bugs play as an ace, or as anything that completes one of
/// `bug_classes` (straights and flushes in high games).
pub struct WildEvaluator {
    inner: Arc<dyn Evaluator>,
    bug_classes: Vec<u32>,
}

impl WildEvaluator {
    pub fn new(inner: Arc<dyn Evaluator>, bug_classes: Vec<u32>) -> Self {
        WildEvaluator { inner, bug_classes }
    }

    fn all_cards() -> Vec<Card> {
        ALL_RANKS
            .iter()
            .cartesian_product(ALL_SUITS.iter())
            .map(|(r, s)| Card::new(*r, *s))
            .collect()
    }

    fn aces() -> Vec<Card> {
        ALL_SUITS
            .iter()
            .map(|s| Card::new(Rank::Ace, *s))
            .collect()
    }
}

impl Evaluator for WildEvaluator {
    fn evaluate(&self, cards: &[Card]) -> Option<HandRanking> {
        use crate::cards::card::WildType;
        let (wilds, naturals): (Vec<Card>, Vec<Card>) = cards
            .iter()
            .copied()
            .partition(|c| c.is_wild() || c.rank == Rank::Joker);
        if wilds.is_empty() {
            return self.inner.evaluate(cards);
        }
        // An unmarked joker in a wild game plays as a full wild.
        let choice_sets: Vec<(bool, Vec<Card>)> = wilds
            .iter()
            .map(|w| {
                let is_bug = w.wild == WildType::Bug;
                let set = if is_bug && self.bug_classes.is_empty() {
                    Self::aces()
                } else {
                    Self::all_cards()
                };
                (is_bug, set)
            })
            .collect();
        let mut best: Option<HandRanking> = None;
        for subs in choice_sets
            .iter()
            .map(|(_, set)| set.iter().copied())
            .multi_cartesian_product()
        {
            let mut candidate = naturals.clone();
            candidate.extend(subs.iter().copied());
            let Some(ranking) = self.inner.evaluate(&candidate) else {
                continue;
            };
            // Bug substitutions other than an ace must actually buy a
            // straight or flush.
            let bug_ok = subs.iter().zip(choice_sets.iter()).all(|(sub, (is_bug, _))| {
                !*is_bug
                    || sub.rank == Rank::Ace
                    || self.bug_classes.contains(&ranking.rank)
            });
            if !bug_ok {
                continue;
            }
            if best.as_ref().map_or(true, |b| ranking < *b) {
                best = Some(ranking);
            }
        }
        best.map(|mut r| {
            r.description.push_str(" (wild)");
            r
        })
    }

    fn hand_size(&self) -> usize {
        self.inner.hand_size()
    }

    fn sort_cards(&self, cards: &[Card]) -> Vec<Card> {
        self.inner.sort_cards(cards)
    }
}

/// Build the computed backend for an evaluation type, if one exists.
pub fn builtin(eval_type: EvaluationType) -> Option<Arc<dyn Evaluator>> {
    use EvaluationType::*;
    if let Some(base) = eval_type.wild_base() {
        let inner = builtin(base)?;
        let bug_classes = match base {
            High | High36Card | High20Card | High27Ja | SokoHigh | TwoCardHigh27Ja
            | ThreeCardHigh27Ja | FourCardHigh27Ja => match base {
                High36Card => HighVariant::FlushesBeatBoats.bug_classes(),
                SokoHigh => HighVariant::Soko.bug_classes(),
                _ => HighVariant::Standard.bug_classes(),
            },
            _ => vec![],
        };
        return Some(Arc::new(WildEvaluator::new(inner, bug_classes)));
    }
    let eval: Arc<dyn Evaluator> = match eval_type {
        High => Arc::new(HighEvaluator::new(DeckType::Standard, 5, HighVariant::Standard)),
        High36Card => Arc::new(HighEvaluator::new(
            DeckType::Short36,
            5,
            HighVariant::FlushesBeatBoats,
        )),
        High20Card => Arc::new(HighEvaluator::new(
            DeckType::Short20,
            5,
            HighVariant::Standard,
        )),
        High27Ja => Arc::new(HighEvaluator::new(
            DeckType::Short27Ja,
            5,
            HighVariant::Standard,
        )),
        SokoHigh => Arc::new(HighEvaluator::new(DeckType::Standard, 5, HighVariant::Soko)),
        A5Low => Arc::new(LowA5Evaluator::new(5, true)),
        A5LowHigh => {
            let inner = LowA5Evaluator::new(5, true);
            let max = inner.max_rank();
            Arc::new(InverseEvaluator::new(Arc::new(inner), max))
        }
        TwoSevenLow => {
            // Worst high hand wins; the ace stays high and the wheel isn't
            // a straight.
            let inner = HighEvaluator::new(DeckType::Standard, 5, HighVariant::Standard).no_wheel();
            Arc::new(InverseEvaluator::new(Arc::new(inner), 9))
        }
        A6Low => {
            let inner = HighEvaluator::new(DeckType::Standard, 5, HighVariant::Standard).ace_low();
            Arc::new(InverseEvaluator::new(Arc::new(inner), 9))
        }
        Badugi => Arc::new(BadugiEvaluator::new(false, false)),
        BadugiAh => Arc::new(BadugiEvaluator::new(true, false)),
        Hidugi => Arc::new(BadugiEvaluator::new(true, true)),
        Game49 => Arc::new(PipEvaluator::new(5, Some(49))),
        Game58 => Arc::new(PipEvaluator::new(5, Some(58))),
        Game6 => Arc::new(PipEvaluator::new(5, Some(6))),
        GameZero => Arc::new(PipEvaluator::new(5, None)),
        GameZero6 => Arc::new(PipEvaluator::new(6, None)),
        Game21 => Arc::new(PipEvaluator::new(5, Some(21))),
        Game21Six => Arc::new(PipEvaluator::new(6, Some(21))),
        LowPip6 => Arc::new(PipEvaluator::new(6, None)),
        Football => Arc::new(PipEvaluator::new(5, Some(11))),
        SixCardFootball => Arc::new(PipEvaluator::new(6, Some(11))),
        SevenCardFootball => Arc::new(PipEvaluator::new(7, Some(11))),
        OneCardHigh => Arc::new(HighEvaluator::new(DeckType::Standard, 1, HighVariant::Standard).ace_low()),
        OneCardHighAh => Arc::new(HighEvaluator::new(DeckType::Standard, 1, HighVariant::Standard)),
        OneCardLow => {
            let inner = HighEvaluator::new(DeckType::Standard, 1, HighVariant::Standard);
            Arc::new(InverseEvaluator::new(Arc::new(inner), 9))
        }
        OneCardLowAl => Arc::new(LowA5Evaluator::new(1, true)),
        TwoCardHigh | TwoCardHighAl => {
            Arc::new(HighEvaluator::new(DeckType::Standard, 2, HighVariant::Standard))
        }
        ThreeCardHigh | ThreeCardHighAl => {
            Arc::new(HighEvaluator::new(DeckType::Standard, 3, HighVariant::Standard))
        }
        FourCardHigh | FourCardHighAl => {
            Arc::new(HighEvaluator::new(DeckType::Standard, 4, HighVariant::Standard))
        }
        TwoCardA5Low => Arc::new(LowA5Evaluator::new(2, true)),
        ThreeCardA5Low => Arc::new(LowA5Evaluator::new(3, true)),
        FourCardA5Low => Arc::new(LowA5Evaluator::new(4, true)),
        TwoCard27Low => Arc::new(LowA5Evaluator::new(2, false)),
        ThreeCard27Low => Arc::new(LowA5Evaluator::new(3, false)),
        FourCard27Low => Arc::new(LowA5Evaluator::new(4, false)),
        TwoCardA5LowHigh => {
            let inner = LowA5Evaluator::new(2, true);
            let max = inner.max_rank();
            Arc::new(InverseEvaluator::new(Arc::new(inner), max))
        }
        ThreeCardA5LowHigh => {
            let inner = LowA5Evaluator::new(3, true);
            let max = inner.max_rank();
            Arc::new(InverseEvaluator::new(Arc::new(inner), max))
        }
        FourCardA5LowHigh => {
            let inner = LowA5Evaluator::new(4, true);
            let max = inner.max_rank();
            Arc::new(InverseEvaluator::new(Arc::new(inner), max))
        }
        TwoCardHigh27Ja => Arc::new(HighEvaluator::new(
            DeckType::Short27Ja,
            2,
            HighVariant::Standard,
        )),
        ThreeCardHigh27Ja => Arc::new(HighEvaluator::new(
            DeckType::Short27Ja,
            3,
            HighVariant::Standard,
        )),
        FourCardHigh27Ja => Arc::new(HighEvaluator::new(
            DeckType::Short27Ja,
            4,
            HighVariant::Standard,
        )),
        OneCardHighSpade => Arc::new(SuitBoundEvaluator::new(Suit::Spade, 1, false)),
        OneCardHighHeart => Arc::new(SuitBoundEvaluator::new(Suit::Heart, 1, false)),
        OneCardHighDiamond => Arc::new(SuitBoundEvaluator::new(Suit::Diamond, 1, false)),
        OneCardHighClub => Arc::new(SuitBoundEvaluator::new(Suit::Club, 1, false)),
        OneCardLowSpade => Arc::new(SuitBoundEvaluator::new(Suit::Spade, 1, true)),
        OneCardLowHeart => Arc::new(SuitBoundEvaluator::new(Suit::Heart, 1, true)),
        OneCardLowDiamond => Arc::new(SuitBoundEvaluator::new(Suit::Diamond, 1, true)),
        OneCardLowClub => Arc::new(SuitBoundEvaluator::new(Suit::Club, 1, true)),
        ThreeCardHighSpade => Arc::new(SuitBoundEvaluator::new(Suit::Spade, 3, false)),
        ThreeCardHighHeart => Arc::new(SuitBoundEvaluator::new(Suit::Heart, 3, false)),
        ThreeCardHighDiamond => Arc::new(SuitBoundEvaluator::new(Suit::Diamond, 3, false)),
        ThreeCardHighClub => Arc::new(SuitBoundEvaluator::new(Suit::Club, 3, false)),
        // Table-only types: no cheap closed form, these come as data files.
        QuickQuads | NeSevenCardHigh => return None,
        HighWild | A5LowWild | TwoSevenLowWild | High27JaWild | OneCardHighAhWild
        | TwoCardHigh27JaWild | ThreeCardHigh27JaWild | FourCardHigh27JaWild => unreachable!(),
    };
    Some(eval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::card::cards_from_str;

    fn eval(t: EvaluationType, s: &str) -> HandRanking {
        builtin(t)
            .unwrap()
            .evaluate(&cards_from_str(s).unwrap())
            .unwrap()
    }

    fn beats(t: EvaluationType, better: &str, worse: &str) {
        let b = eval(t, better);
        let w = eval(t, worse);
        assert!(b < w, "{} ({:?}) should beat {} ({:?})", better, b, worse, w);
    }

    fn ties(t: EvaluationType, a: &str, b: &str) {
        let ra = eval(t, a);
        let rb = eval(t, b);
        assert_eq!((ra.rank, ra.ordered_rank), (rb.rank, rb.ordered_rank));
    }

    #[test]
    fn high_classes_in_order() {
        let hands = [
            "AsKsQsJsTs", // straight flush
            "AcAdAhAsKc", // quads
            "AcAdAhKcKd", // boat
            "AsKsQsJs2s", // flush
            "AsKdQhJcTs", // straight
            "AcAdAh4s3d", // set
            "AcAdKcKd4d", // two pair
            "AcAdKh4s3d", // pair
            "AcKdQhJs7d", // high card
        ];
        for (i, h) in hands.iter().enumerate() {
            assert_eq!(eval(EvaluationType::High, h).rank, i as u32 + 1, "{}", h);
        }
    }

    #[test]
    fn high_tiebreaks() {
        beats(EvaluationType::High, "AcKdQhJs7d", "AcKdQhJs3d");
        beats(EvaluationType::High, "AcAdKh4s3d", "AcAd5h4s3d");
        beats(EvaluationType::High, "4c4d4h4s3c", "3c3d3h3s2d");
        beats(EvaluationType::High, "6s5s4s3s2d", "Ac2c3c4c5s");
        ties(EvaluationType::High, "KcQdJhTs5c", "KdQhJsTc5d");
    }

    #[test]
    fn wheel_is_lowest_straight() {
        let wheel = eval(EvaluationType::High, "Ad2s4s3s5s");
        let six = eval(EvaluationType::High, "6d2s4s3s5s");
        assert_eq!(wheel.rank, 5);
        assert!(six < wheel);
        assert_eq!(wheel.description, "5 high straight");
    }

    #[test]
    fn short_deck_straights() {
        // A-9-8-7-6 wheels in the 36-card deck.
        let r = eval(EvaluationType::High36Card, "Ad9s8s7s6c");
        assert_eq!(r.description, "9 high straight");
        // Flush beats a boat there.
        let flush = eval(EvaluationType::High36Card, "AsKsQsJs9s");
        let boat = eval(EvaluationType::High36Card, "AcAdAhKcKd");
        assert!(flush < boat);
        // 7 and J are adjacent in the 40-card no-8-9-T deck.
        let r = eval(EvaluationType::High27Ja, "Jd7s6s5s4c");
        assert_eq!(r.rank, 5);
    }

    #[test]
    fn a5_low_ignores_straights() {
        let wheel = eval(EvaluationType::A5Low, "Ad2s3s4s5s");
        assert_eq!(wheel.rank, 1);
        beats(EvaluationType::A5Low, "Ad2s3s4s5s", "2d3s4s5s6s");
        beats(EvaluationType::A5Low, "8d5s4s3s2s", "8d6s4s3s2s");
        // Any unpaired beats any pair.
        beats(EvaluationType::A5Low, "KdQsJsTs9s", "Ad2s3s4sAc");
    }

    #[test]
    fn deuce_seven_low() {
        // The classic best 2-7 hand.
        let best = eval(EvaluationType::TwoSevenLow, "7d5s4s3s2s");
        beats(EvaluationType::TwoSevenLow, "7d5s4s3s2s", "8d5s4s3s2s");
        // A straight or flush is a disaster.
        beats(EvaluationType::TwoSevenLow, "KdQsJsTs8s", "6d5s4s3s2s");
        // No wheel: A5432 is just ace high, worse than king high.
        beats(EvaluationType::TwoSevenLow, "Kd5s4s3s2s", "Ad5s4s3s2c");
        assert_eq!(best.rank, 1);
    }

    #[test]
    fn badugi_sizes() {
        // Four distinct ranks and suits beats any three-card badugi.
        beats(EvaluationType::Badugi, "KsQdJhTc", "As2d3h4h");
        // Lower badugi wins at equal size.
        beats(EvaluationType::Badugi, "As2d3h4c", "As2d3h5c");
        // Hi-Dugi flips the card comparison.
        beats(EvaluationType::Hidugi, "KsQdJhTc", "2s3d4h5c");
    }

    #[test]
    fn pip_games() {
        let z = eval(EvaluationType::GameZero, "KsQdJhTc2s");
        assert_eq!(z.description, "12 pips");
        beats(EvaluationType::GameZero, "KsQdJhKc2s", "KsQdJhTc3s");
        // Exactly 21 beats 20; 20 beats 22 (under wins at equal distance).
        beats(EvaluationType::Game21, "KsQdTc9h2s", "KsQdJhTcTs");
        beats(EvaluationType::Game21, "KsQdJhTcTs", "KsQdTc9h3s");
    }

    #[test]
    fn suit_bound() {
        let e = builtin(EvaluationType::OneCardHighSpade).unwrap();
        assert!(e.evaluate(&cards_from_str("AhKdQc").unwrap()).is_none());
        let r = e.evaluate(&cards_from_str("AhKs2s").unwrap()).unwrap();
        assert_eq!(r.description, "Ks high");
    }

    #[test]
    fn partial_hands() {
        beats(EvaluationType::TwoCardHigh, "AsAc", "AsKc");
        beats(EvaluationType::TwoCardHigh, "AsKc", "KsQc");
        beats(EvaluationType::TwoCardA5Low, "As2c", "2s3c");
        // 2-7 style partial low: ace is high, so 2-3 is the best.
        beats(EvaluationType::TwoCard27Low, "2s3c", "As2c");
    }

    #[test]
    fn soko_specials() {
        // Four flush beats a pair, two pair beats four flush.
        beats(EvaluationType::SokoHigh, "AsKsQsJs2d", "AcAd5h4s3d");
        beats(EvaluationType::SokoHigh, "AcAdKcKd4d", "AsKsQsJs2d");
        // Four flush beats four straight.
        beats(EvaluationType::SokoHigh, "As9s5s3s2d", "9c8d7h6s2d");
    }

    #[test]
    fn named_wilds_make_the_nuts() {
        let mut cards = cards_from_str("AsKsQsJs2d").unwrap();
        cards[4].make_wild(crate::cards::card::WildType::Named);
        let e = builtin(EvaluationType::HighWild).unwrap();
        let r = e.evaluate(&cards).unwrap();
        assert_eq!(r.rank, 1, "wild should complete the royal: {:?}", r);
    }

    #[test]
    fn bugs_are_limited() {
        // A bug with a pair of kings plays as an ace, not as a third king.
        let mut cards = cards_from_str("KsKdQh8c2d").unwrap();
        cards[4].make_wild(crate::cards::card::WildType::Bug);
        let e = builtin(EvaluationType::HighWild).unwrap();
        let r = e.evaluate(&cards).unwrap();
        assert_eq!(r.description, "Pair of Ks (wild)");
        // But it completes a straight.
        let mut cards = cards_from_str("9s8d7h6cKd").unwrap();
        cards[4].make_wild(crate::cards::card::WildType::Bug);
        let r = e.evaluate(&cards).unwrap();
        assert_eq!(r.rank, 5, "bug should fill the straight: {:?}", r);
    }

    #[test]
    fn sort_cards_is_idempotent() {
        let e = builtin(EvaluationType::High).unwrap();
        let cards = cards_from_str("2c9hAs9dKc").unwrap();
        let once = e.sort_cards(&cards);
        let twice = e.sort_cards(&once);
        assert_eq!(once, twice);
        assert_eq!(once[0].rank, Rank::Ace);
        let low = builtin(EvaluationType::A5Low).unwrap();
        let once = low.sort_cards(&cards);
        assert_eq!(low.sort_cards(&once), once);
    }

    #[test]
    fn table_only_types_have_no_builtin() {
        assert!(builtin(EvaluationType::QuickQuads).is_none());
        assert!(builtin(EvaluationType::NeSevenCardHigh).is_none());
    }
}
