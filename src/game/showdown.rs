//! Showdown resolution: pick the applicable best-hand descriptors, build
//! each player's best hand over the configured hole/community partitions,
//! then award every pot (main and side, split across directions) honoring
//! qualifiers, classifications, and declarations.

use super::engine::{Game, GamePhase};
use super::result::{GameResult, HandResult, PotResult};
use crate::cards::card::{Card, Rank, Visibility, WildType};
use crate::eval::{EvaluatorRegistry, HandRanking};
use crate::rules::{
    BestHandConfig, CardState, CountSpec, DeclarationMode, WildRole, WildRuleKind,
};
use crate::{Currency, PlayerId};
use itertools::Itertools;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// A candidate hand: the cards to evaluate plus which of them came from the
/// player's hole cards.
#[derive(Debug, Clone)]
struct Candidate {
    cards: Vec<Card>,
    hole_used: Vec<Card>,
}

impl Game {
    /// The directional descriptors in effect for this showdown.
    fn resolve_best_hand_configs(&self) -> Vec<BestHandConfig> {
        for cond in &self.rules.showdown.conditional_best_hands {
            if self.check_condition(&cond.condition) {
                return cond.best_hand.clone();
            }
        }
        if !self.rules.showdown.conditional_best_hands.is_empty()
            && !self.rules.showdown.default_best_hand.is_empty()
        {
            return self.rules.showdown.default_best_hand.clone();
        }
        self.rules.showdown.best_hand.clone()
    }

    /// Everyone folded to one player: no evaluation, whole pot moves.
    pub(crate) fn run_fold_win(&mut self, active: &[PlayerId]) -> GameResult {
        let Some(&winner) = active.first() else {
            return GameResult::default();
        };
        let total = self.betting.pot.total();
        let eligible: BTreeSet<PlayerId> = [winner].into_iter().collect();
        for (idx, seg) in self.pot_segments() {
            if seg.amount > 0 {
                self.betting.pot.reduce(idx, seg.amount);
            }
        }
        if let Some(p) = self.table.player_mut(winner) {
            p.stack += total;
        }
        info!("{} wins {} uncontested", winner, total);
        GameResult {
            pots: vec![PotResult {
                amount: total,
                winners: vec![winner],
                split: false,
                pot_type: "main".to_string(),
                hand_type: "uncontested".to_string(),
                side_pot_index: None,
                eligible_players: eligible,
            }],
            hands: BTreeMap::new(),
            winning_hands: vec![],
            total_pot: total,
            is_complete: true,
            was_fold_win: true,
        }
    }

    pub(crate) fn run_showdown(&mut self) -> GameResult {
        let active = self.table.active_player_ids();
        if active.len() <= 1 {
            return self.run_fold_win(&active);
        }
        let descriptors = self.resolve_best_hand_configs();
        if descriptors.is_empty() {
            warn!("showdown with no best-hand descriptors");
            return self.run_fold_win(&active);
        }
        let total_pot = self.betting.pot.total();
        // Evaluate every active player once per direction.
        let mut hands: BTreeMap<PlayerId, Vec<Option<HandResult>>> = BTreeMap::new();
        for pid in &active {
            let mut per_dir = vec![];
            for cfg in &descriptors {
                per_dir.push(self.find_best_hand_for_player(*pid, cfg));
            }
            hands.insert(*pid, per_dir);
        }

        let declaration_mode = self.rules.showdown.declaration_mode;
        let priority = self.rules.showdown.classification_priority.clone();
        let mut pot_results: Vec<PotResult> = vec![];
        let mut winning_hands: Vec<HandResult> = vec![];

        for (side_idx, seg) in self.pot_segments() {
            if seg.amount <= 0 {
                continue;
            }
            let eligible: BTreeSet<PlayerId> = seg
                .eligible_players
                .iter()
                .copied()
                .filter(|p| active.contains(p))
                .collect();
            let pot_key = side_idx.map(|i| i as i64).unwrap_or(-1);
            // Winners per direction.
            let mut dir_winners: Vec<Vec<PlayerId>> = vec![];
            for (di, cfg) in descriptors.iter().enumerate() {
                let contenders: Vec<PlayerId> = eligible
                    .iter()
                    .copied()
                    .filter(|pid| {
                        self.declaration_allows(declaration_mode, *pid, pot_key, di, descriptors.len())
                    })
                    .collect();
                let winners =
                    self.direction_winners(&contenders, &hands, di, cfg, &priority, true);
                dir_winners.push(winners);
            }
            let mut sharing: Vec<(usize, Vec<PlayerId>)> = dir_winners
                .iter()
                .enumerate()
                .filter(|(_, w)| !w.is_empty())
                .map(|(i, w)| (i, w.clone()))
                .collect();
            if sharing.is_empty() {
                // Nobody met a qualifier anywhere: the first direction takes
                // the pot on raw best hand.
                let winners = self.direction_winners(
                    &eligible.iter().copied().collect::<Vec<_>>(),
                    &hands,
                    0,
                    &descriptors[0],
                    &priority,
                    false,
                );
                if winners.is_empty() {
                    // Still nothing rankable; return the chips evenly.
                    sharing = vec![(0, eligible.iter().copied().collect())];
                } else {
                    sharing = vec![(0, winners)];
                }
            }
            // Split the physical pot between the directions that have
            // winners; the odd chip goes to the direction listed first.
            let k = sharing.len() as Currency;
            let base_share = seg.amount / k;
            for (pos, (di, winners)) in sharing.iter().enumerate() {
                let share = if pos == 0 {
                    seg.amount - base_share * (k - 1)
                } else {
                    base_share
                };
                if share <= 0 {
                    continue;
                }
                let ordered = self.order_winners_from_button(winners);
                self.pay_winners(side_idx, share, &ordered);
                let hand_type = descriptors[*di].display_name();
                debug!(
                    "pot {:?} direction '{}' pays {} to {:?}",
                    side_idx, hand_type, share, ordered
                );
                for w in &ordered {
                    if let Some(Some(hr)) = hands.get(w).map(|v| v[*di].clone()) {
                        if !winning_hands
                            .iter()
                            .any(|existing| existing.player_id == *w && existing.hand_name == hr.hand_name)
                        {
                            winning_hands.push(hr);
                        }
                    }
                }
                pot_results.push(PotResult {
                    amount: share,
                    winners: ordered.clone(),
                    split: ordered.len() > 1,
                    pot_type: PotResult::pot_label(side_idx),
                    hand_type,
                    side_pot_index: side_idx,
                    eligible_players: eligible.clone(),
                });
            }
        }

        let hands_out: BTreeMap<PlayerId, Vec<HandResult>> = hands
            .into_iter()
            .map(|(pid, v)| (pid, v.into_iter().flatten().collect()))
            .collect();
        self.state = GamePhase::Complete;
        GameResult {
            pots: pot_results,
            hands: hands_out,
            winning_hands,
            total_pot,
            is_complete: true,
            was_fold_win: false,
        }
    }

    fn declaration_allows(
        &self,
        mode: DeclarationMode,
        pid: PlayerId,
        pot_key: i64,
        direction: usize,
        direction_count: usize,
    ) -> bool {
        if mode != DeclarationMode::Declare || self.declarations.is_empty() {
            return true;
        }
        let Some(per_pot) = self.declarations.get(&pid) else {
            return false;
        };
        // A global declaration is stored under the main pot key.
        let decl = per_pot.get(&pot_key).or_else(|| per_pot.get(&-1));
        let Some(decl) = decl else {
            return false;
        };
        if decl == "high_low" {
            return true;
        }
        let token = if direction_count <= 1 || direction == 0 {
            "high"
        } else {
            "low"
        };
        decl == token
    }

    /// Best hand(s) among contenders for one direction, honoring the
    /// qualifier (when `use_qualifier`) and classification priority.
    fn direction_winners(
        &self,
        contenders: &[PlayerId],
        hands: &BTreeMap<PlayerId, Vec<Option<HandResult>>>,
        direction: usize,
        cfg: &BestHandConfig,
        priority: &[String],
        use_qualifier: bool,
    ) -> Vec<PlayerId> {
        let mut ranked: Vec<(PlayerId, &HandResult)> = vec![];
        for pid in contenders {
            let Some(Some(hr)) = hands.get(pid).map(|v| v[direction].as_ref()) else {
                continue;
            };
            if use_qualifier {
                if let Some(q) = &cfg.qualifier {
                    let ranking = HandRanking::new(hr.rank, hr.ordered_rank, "");
                    if !EvaluatorRegistry::meets_qualifier(&ranking, q) {
                        continue;
                    }
                }
            }
            ranked.push((*pid, hr));
        }
        if ranked.is_empty() {
            return vec![];
        }
        // Classification outranks the numbers: keep only the best class
        // before comparing hands.
        if let Some(class_cfg) = &cfg.classification {
            if !priority.is_empty() {
                let field = class_cfg
                    .field_name
                    .clone()
                    .unwrap_or_else(|| class_cfg.kind.clone());
                let class_rank = |hr: &HandResult| {
                    hr.classifications
                        .get(&field)
                        .and_then(|tag| priority.iter().position(|p| p == tag))
                        .unwrap_or(priority.len())
                };
                let best_class = ranked.iter().map(|(_, hr)| class_rank(hr)).min().unwrap();
                ranked.retain(|(_, hr)| class_rank(hr) == best_class);
            }
        }
        let best = ranked
            .iter()
            .map(|(_, hr)| (hr.rank, hr.ordered_rank))
            .min()
            .unwrap();
        ranked
            .into_iter()
            .filter(|(_, hr)| (hr.rank, hr.ordered_rank) == best)
            .map(|(pid, _)| pid)
            .collect()
    }

    /// Winners sorted by seat, starting left of the button; odd chips fall
    /// to the earliest seat in that order.
    fn order_winners_from_button(&self, winners: &[PlayerId]) -> Vec<PlayerId> {
        let mut order = self.table.position_order(true);
        if !order.is_empty() {
            order.rotate_left(1);
        }
        let mut out: Vec<PlayerId> = order
            .into_iter()
            .filter(|p| winners.contains(p))
            .collect();
        for w in winners {
            if !out.contains(w) {
                out.push(*w);
            }
        }
        out
    }

    fn pay_winners(&mut self, side_idx: Option<usize>, amount: Currency, winners: &[PlayerId]) {
        if winners.is_empty() || amount <= 0 {
            return;
        }
        self.betting.pot.reduce(side_idx, amount);
        let n = winners.len() as Currency;
        let share = amount / n;
        let remainder = amount % n;
        for (i, pid) in winners.iter().enumerate() {
            let extra = if (i as Currency) < remainder { 1 } else { 0 };
            if let Some(p) = self.table.player_mut(*pid) {
                p.stack += share + extra;
            }
        }
    }

    /// Build the best qualifying hand for one player under one descriptor.
    pub(crate) fn find_best_hand_for_player(
        &self,
        pid: PlayerId,
        cfg: &BestHandConfig,
    ) -> Option<HandResult> {
        let player = self.table.player(pid)?;
        let mut hole: Vec<Card> = match &cfg.hole_subset {
            Some(name) => player.hand.subset(name),
            None => player.hand.cards().to_vec(),
        };
        if let Some(state) = cfg.card_state {
            let want = match state {
                CardState::FaceUp => Visibility::FaceUp,
                _ => Visibility::FaceDown,
            };
            hole.retain(|c| c.visibility == want);
        }
        let evaluator = self.evaluators.get(cfg.eval_type).ok()?;
        let hand_size = cfg.total_cards.unwrap_or_else(|| evaluator.hand_size());
        let community = &self.table.community_cards;
        let community_pool: Vec<Card> = community.values().flatten().copied().collect();

        if hole.is_empty() && cfg.minimum_cards == Some(0) {
            // Empty hands carry a defined pip value in some games.
            let pips = cfg.zero_cards_pip_value.unwrap_or(0);
            return Some(HandResult {
                player_id: pid,
                cards: vec![],
                used_hole_cards: vec![],
                hand_name: cfg.display_name(),
                hand_description: "no cards".to_string(),
                eval_type: cfg.eval_type,
                rank: pips.unsigned_abs() + 1,
                ordered_rank: 0,
                classifications: BTreeMap::new(),
            });
        }

        let mut candidates: Vec<Candidate> = vec![];
        if let Some(n) = cfg.any_cards {
            let mut pool = hole.clone();
            pool.extend(community_pool.iter().copied());
            if pool.len() < n {
                if cfg.padding && !pool.is_empty() {
                    candidates.push(Candidate {
                        cards: pool.clone(),
                        hole_used: hole.clone(),
                    });
                }
            } else {
                for combo in pool.iter().copied().combinations(n) {
                    let hole_used = combo.iter().filter(|c| hole.contains(c)).copied().collect();
                    candidates.push(Candidate {
                        cards: combo,
                        hole_used,
                    });
                }
            }
        } else if !cfg.community_card_combinations.is_empty()
            || !cfg.community_card_select_combinations.is_empty()
        {
            self.grid_candidates(cfg, &hole, hand_size, &mut candidates);
        } else if !cfg.combinations.is_empty() {
            for combo in &cfg.combinations {
                let hc_opts = combo.hole_cards.options().unwrap_or_else(|| vec![hole.len()]);
                let cc_opts = combo
                    .community_cards
                    .options()
                    .unwrap_or_else(|| vec![hand_size.saturating_sub(hole.len())]);
                for &hc in &hc_opts {
                    for &cc in &cc_opts {
                        push_hole_community(&mut candidates, &hole, &community_pool, hc, cc);
                    }
                }
            }
        } else if cfg.hole_cards.is_some() || cfg.community_cards.is_some() {
            match (&cfg.hole_cards, &cfg.community_cards) {
                (Some(CountSpec::All(_)), _) => {
                    // All hole cards, topped up from the board if the hand
                    // needs more.
                    let needed = hand_size.saturating_sub(hole.len());
                    push_hole_community(
                        &mut candidates,
                        &hole,
                        &community_pool,
                        hole.len(),
                        needed.min(community_pool.len()),
                    );
                }
                (hc, cc) => {
                    let hc_opts = hc
                        .as_ref()
                        .and_then(|s| s.options())
                        .unwrap_or_else(|| vec![hole.len().min(hand_size)]);
                    let cc_opts = cc
                        .as_ref()
                        .and_then(|s| s.options());
                    match cc_opts {
                        // Paired lists: holeCards [2,3] with communityCards
                        // [3,2] means exactly those pairings.
                        Some(cc_opts) if cc_opts.len() == hc_opts.len() => {
                            for (hc, cc) in hc_opts.iter().zip(cc_opts.iter()) {
                                push_hole_community(
                                    &mut candidates,
                                    &hole,
                                    &community_pool,
                                    *hc,
                                    *cc,
                                );
                            }
                        }
                        Some(cc_opts) => {
                            for &hc in &hc_opts {
                                for &cc in &cc_opts {
                                    push_hole_community(
                                        &mut candidates,
                                        &hole,
                                        &community_pool,
                                        hc,
                                        cc,
                                    );
                                }
                            }
                        }
                        None => {
                            for &hc in &hc_opts {
                                let cc = hand_size.saturating_sub(hc);
                                push_hole_community(
                                    &mut candidates,
                                    &hole,
                                    &community_pool,
                                    hc,
                                    cc.min(community_pool.len()),
                                );
                            }
                        }
                    }
                }
            }
        } else {
            // No partition config: the whole hand plays (five-card stud
            // style).
            candidates.push(Candidate {
                cards: hole.clone(),
                hole_used: hole.clone(),
            });
        }

        if candidates.is_empty() {
            if cfg.padding && !hole.is_empty() {
                candidates.push(Candidate {
                    cards: hole.clone(),
                    hole_used: hole.clone(),
                });
            } else {
                return None;
            }
        }

        let mut best: Option<(HandRanking, Candidate)> = None;
        for mut candidate in candidates {
            self.apply_showdown_wilds(pid, cfg, &mut candidate.cards);
            let Some(ranking) = evaluator.evaluate(&candidate.cards) else {
                continue;
            };
            if best.as_ref().map_or(true, |(b, _)| ranking < *b) {
                best = Some((ranking, candidate));
            }
        }
        let (ranking, candidate) = best?;
        let classifications = self.classify_hand(cfg, &candidate.cards);
        Some(HandResult {
            player_id: pid,
            cards: candidate.cards,
            used_hole_cards: candidate.hole_used,
            hand_name: cfg.display_name(),
            hand_description: ranking.description.clone(),
            eval_type: cfg.eval_type,
            rank: ranking.rank,
            ordered_rank: ranking.ordered_rank,
            classifications,
        })
    }

    /// Candidates for grid games: community picks restricted to listed
    /// subset groupings, or one-or-more cards from each of several subsets.
    fn grid_candidates(
        &self,
        cfg: &BestHandConfig,
        hole: &[Card],
        hand_size: usize,
        candidates: &mut Vec<Candidate>,
    ) {
        let hc_opts = cfg
            .hole_cards
            .as_ref()
            .and_then(|s| s.options())
            .unwrap_or_else(|| vec![hole.len().min(hand_size)]);
        for group in &cfg.community_card_combinations {
            let pool: Vec<Card> = group
                .iter()
                .filter_map(|name| self.table.community_cards.get(name))
                .flatten()
                .copied()
                .collect();
            for &hc in &hc_opts {
                let cc_opts = cfg
                    .community_cards
                    .as_ref()
                    .and_then(|s| s.options())
                    .unwrap_or_else(|| vec![hand_size.saturating_sub(hc)]);
                for &cc in &cc_opts {
                    push_hole_community(candidates, hole, &pool, hc, cc);
                }
            }
        }
        for selection in &cfg.community_card_select_combinations {
            // One pick-count range per named subset; every combination of
            // counts and cards is a candidate pool.
            let per_subset: Vec<Vec<Vec<Card>>> = selection
                .iter()
                .map(|(name, min, max)| {
                    let cards = self
                        .table
                        .community_cards
                        .get(name)
                        .cloned()
                        .unwrap_or_default();
                    let mut picks = vec![];
                    for k in *min..=*max {
                        for combo in cards.iter().copied().combinations(k) {
                            picks.push(combo);
                        }
                    }
                    picks
                })
                .collect();
            for chosen in per_subset.into_iter().multi_cartesian_product() {
                let community_pick: Vec<Card> = chosen.into_iter().flatten().collect();
                let hc = hand_size.saturating_sub(community_pick.len());
                if hole.len() < hc {
                    continue;
                }
                for hcombo in hole.iter().copied().combinations(hc) {
                    let mut cards = hcombo.clone();
                    cards.extend(community_pick.iter().copied());
                    candidates.push(Candidate {
                        cards,
                        hole_used: hcombo,
                    });
                }
            }
        }
    }

    /// Showdown-scoped wild rules, applied to the candidate before
    /// evaluation (deal-time rules already marked the cards themselves).
    fn apply_showdown_wilds(&self, pid: PlayerId, cfg: &BestHandConfig, cards: &mut [Card]) {
        for rule in &cfg.wild_cards {
            let wild = match rule.role {
                WildRole::Bug => WildType::Bug,
                _ => WildType::Named,
            };
            match rule.kind {
                WildRuleKind::Joker => {
                    for c in cards.iter_mut() {
                        if c.rank == Rank::Joker {
                            c.make_wild(wild);
                        }
                    }
                }
                WildRuleKind::Rank => {
                    if let Some(rank) = rule.rank {
                        for c in cards.iter_mut() {
                            if c.rank == rank {
                                c.make_wild(wild);
                            }
                        }
                    }
                }
                WildRuleKind::LowestHole => {
                    let Some(player) = self.table.player(pid) else {
                        continue;
                    };
                    let want = match rule.visibility {
                        Some(CardState::FaceUp) => Visibility::FaceUp,
                        _ => Visibility::FaceDown,
                    };
                    let lowest = player
                        .hand
                        .cards()
                        .iter()
                        .filter(|c| c.visibility == want && c.rank != Rank::Joker)
                        .min_by_key(|c| c.rank.value())
                        .map(|c| c.rank);
                    if let Some(rank) = lowest {
                        for c in cards.iter_mut() {
                            if c.rank == rank {
                                c.make_wild(wild);
                            }
                        }
                    }
                }
                WildRuleKind::LastCommunityCard => {
                    if let Some(rank) = self.dynamic_wild_rank {
                        for c in cards.iter_mut() {
                            if c.rank == rank {
                                c.make_wild(wild);
                            }
                        }
                    }
                }
            }
        }
    }

    fn classify_hand(
        &self,
        cfg: &BestHandConfig,
        cards: &[Card],
    ) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if let Some(class_cfg) = &cfg.classification {
            if class_cfg.kind == "face_butt" {
                let field = class_cfg
                    .field_name
                    .clone()
                    .unwrap_or_else(|| class_cfg.kind.clone());
                let has_face = cards.iter().any(|c| class_cfg.face_ranks.contains(&c.rank));
                out.insert(
                    field,
                    if has_face { "face" } else { "butt" }.to_string(),
                );
            } else {
                warn!("unknown classification type '{}'", class_cfg.kind);
            }
        }
        out
    }
}

/// All ways to take `hc` hole cards and `cc` community cards.
fn push_hole_community(
    candidates: &mut Vec<Candidate>,
    hole: &[Card],
    community: &[Card],
    hc: usize,
    cc: usize,
) {
    if hole.len() < hc || community.len() < cc {
        return;
    }
    for hcombo in hole.iter().copied().combinations(hc) {
        for ccombo in community.iter().copied().combinations(cc) {
            let mut cards = hcombo.clone();
            cards.extend(ccombo.iter().copied());
            candidates.push(Candidate {
                cards,
                hole_used: hcombo.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::engine::testutil::holdem_game;
    use super::super::engine::{Game, GameConfig};
    use super::*;
    use crate::cards::card::cards_from_str;
    use crate::cards::hand::DEFAULT_SUBSET;
    use crate::rules::GameRules;
    use std::sync::Arc;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    fn give_hand(game: &mut Game, p: PlayerId, cards: &str) {
        let player = game.table.player_mut(p).unwrap();
        player.hand.clear();
        player.hand.add_cards(cards_from_str(cards).unwrap());
    }

    fn best_hand_cfg(json: &str) -> BestHandConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn holdem_any_cards_picks_the_best_five() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        give_hand(&mut game, pid(1), "AhAs");
        game.table.community_cards.insert(
            DEFAULT_SUBSET.to_string(),
            cards_from_str("Ac7d8h9sKc").unwrap(),
        );
        let cfg = best_hand_cfg(r#"{"evaluationType": "high", "anyCards": 5}"#);
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert_eq!(hr.hand_description, "Set of As");
        assert_eq!(hr.used_hole_cards.len(), 2);
    }

    #[test]
    fn omaha_style_exact_counts() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        // Four suited hole cards, but Omaha rules force exactly two.
        give_hand(&mut game, pid(1), "AhKh2h3h");
        game.table.community_cards.insert(
            DEFAULT_SUBSET.to_string(),
            cards_from_str("QhJh4h5d9s").unwrap(),
        );
        let cfg = best_hand_cfg(
            r#"{"evaluationType": "high", "holeCards": 2, "communityCards": 3}"#,
        );
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert_eq!(hr.used_hole_cards.len(), 2);
        assert_eq!(hr.hand_description, "A high flush");
    }

    #[test]
    fn hole_subset_and_card_state_filters() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        give_hand(&mut game, pid(1), "AhKsQdJc9h");
        {
            let hand = &mut game.table.player_mut(pid(1)).unwrap().hand;
            let cards = hand.cards().to_vec();
            hand.add_to_subset(cards[0], "front");
            hand.add_to_subset(cards[1], "front");
            hand.set_visibility(cards[2], Visibility::FaceUp);
        }
        let cfg = best_hand_cfg(r#"{"evaluationType": "two_card_high", "hole_subset": "front"}"#);
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert_eq!(hr.cards.len(), 2);
        let cfg = best_hand_cfg(r#"{"evaluationType": "one_card_high_ah", "cardState": "face up"}"#);
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert_eq!(hr.cards, cards_from_str("Qd").unwrap());
    }

    #[test]
    fn banco_grid_uses_rows_columns_and_selects() {
        let mut game = holdem_game(&[500, 500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        let boards = [
            ("Flop 1.1", "AsKsQs"),
            ("Flop 2.2", "AhKhQh"),
            ("Flop 3.3", "AdKdQd"),
            ("Turn 1.2", "Js"),
            ("Turn 2.3", "Jh"),
            ("Turn 3.1", "Jd"),
            ("River 1.3", "Ts"),
            ("River 2.1", "Th"),
            ("River 3.2", "Td"),
        ];
        for (name, cards) in boards {
            game.table
                .community_cards
                .insert(name.to_string(), cards_from_str(cards).unwrap());
        }
        give_hand(&mut game, pid(1), "2c2d3h4c");
        let cfg = best_hand_cfg(
            r#"{
            "evaluationType": "high",
            "holeCards": 2,
            "communityCards": 3,
            "communityCardCombinations": [
                ["Flop 1.1", "Turn 1.2", "River 1.3"],
                ["River 2.1", "Flop 2.2", "Turn 2.3"],
                ["Turn 3.1", "River 3.2", "Flop 3.3"]
            ],
            "communityCardSelectCombinations": [
                [["Flop 1.1", 1, 1], ["Flop 2.2", 1, 1], ["Flop 3.3", 1, 1]]
            ]
        }"#,
        );
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        // The one-per-flop selection yields aces full of deuces; no single
        // row or column can beat it with these hole cards.
        assert_eq!(hr.hand_description, "Boat As full of 2s");
    }

    #[test]
    fn padding_returns_short_hands() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        give_hand(&mut game, pid(1), "AhKs");
        let cfg = best_hand_cfg(
            r#"{"evaluationType": "high", "holeCards": 5, "communityCards": 0, "padding": true}"#,
        );
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert_eq!(hr.cards.len(), 2);
        let cfg = best_hand_cfg(
            r#"{"evaluationType": "high", "holeCards": 5, "communityCards": 0}"#,
        );
        assert!(game.find_best_hand_for_player(pid(1), &cfg).is_none());
    }

    #[test]
    fn zero_card_pip_hands() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        game.table.player_mut(pid(1)).unwrap().hand.clear();
        let cfg = best_hand_cfg(
            r#"{"evaluationType": "low_pip_6_cards", "minimumCards": 0, "zeroCardsPipValue": 0}"#,
        );
        let hr = game.find_best_hand_for_player(pid(1), &cfg).unwrap();
        assert!(hr.cards.is_empty());
        assert_eq!(hr.rank, 1);
    }

    const RAZZDUGI_RULES: &str = r#"{
        "game": "Razzdugi",
        "players": {"min": 2, "max": 8},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "blinds"},
        "gamePlay": [
            {"bet": {"type": "blinds"}, "name": "Post Blinds"},
            {"deal": {"location": "player", "cards": [{"number": 7, "state": "face down"}]}, "name": "Deal"},
            {"bet": {"type": "small"}, "name": "Bet"},
            {"showdown": {"type": "final"}, "name": "Showdown"}
        ],
        "showdown": {
            "bestHand": [
                {
                    "name": "Razz",
                    "evaluationType": "a5_low",
                    "anyCards": 5,
                    "classification": {
                        "type": "face_butt",
                        "faceRanks": ["JACK", "QUEEN", "KING"],
                        "fieldName": "face_butt"
                    }
                },
                {"name": "Badugi", "evaluationType": "badugi", "anyCards": 4}
            ],
            "classification_priority": ["face", "butt"]
        }
    }"#;

    fn razzdugi_game() -> Game {
        let rules = GameRules::from_json(RAZZDUGI_RULES).unwrap();
        let mut game = Game::new(
            rules,
            Arc::new(EvaluatorRegistry::new()),
            GameConfig::limit(10, 20),
        )
        .unwrap();
        game.table.add_player(pid(1), "p1", 500, Some(0)).unwrap();
        game.table.add_player(pid(2), "p2", 500, Some(1)).unwrap();
        game
    }

    #[test]
    fn razzdugi_classification_beats_numbers() {
        let mut game = razzdugi_game();
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips();
        // P1: perfect butt low. P2: worse low stuck with a jack (face).
        give_hand(&mut game, pid(1), "As2d3h4c5s");
        give_hand(&mut game, pid(2), "3c4d5h6cJs");
        // Both contribute 50 to the pot.
        for p in [pid(1), pid(2)] {
            game.table.player_mut(p).unwrap().stack -= 50;
            game.betting.pot.add_bet(p, 50, false, 500, false);
        }
        let result = game.run_showdown();
        let razz = result
            .pots
            .iter()
            .find(|p| p.hand_type == "Razz")
            .expect("razz share");
        assert_eq!(razz.winners, vec![pid(2)], "face beats butt in Razz");
        let badugi = result
            .pots
            .iter()
            .find(|p| p.hand_type == "Badugi")
            .expect("badugi share");
        // P1's A-2-3-4 four-card badugi beats P2's 3-4-5-6.
        assert_eq!(badugi.winners, vec![pid(1)]);
        assert_eq!(result.total_pot, 100);
        assert_eq!(razz.amount + badugi.amount, 100);
    }

    #[test]
    fn razzdugi_odd_chip_goes_to_first_direction() {
        let mut game = razzdugi_game();
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips() + 101;
        give_hand(&mut game, pid(1), "As2d3h4c5s");
        give_hand(&mut game, pid(2), "3c4d5h6cJs");
        // An odd pot: 101 chips.
        game.betting.pot.add_bet(pid(1), 50, false, 500, false);
        game.betting.pot.add_bet(pid(2), 51, false, 500, false);
        let result = game.run_showdown();
        let razz = result.pots.iter().find(|p| p.hand_type == "Razz").unwrap();
        let badugi = result.pots.iter().find(|p| p.hand_type == "Badugi").unwrap();
        assert_eq!(razz.amount, 51, "first-listed direction takes the odd chip");
        assert_eq!(badugi.amount, 50);
    }

    #[test]
    fn low_qualifier_sends_whole_pot_high() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        // Hi/lo split with an impossible low qualifier: the high hand
        // scoops.
        game.rules.showdown.best_hand = vec![
            best_hand_cfg(r#"{"name": "High", "evaluationType": "high", "anyCards": 5}"#),
            best_hand_cfg(
                r#"{"name": "Low", "evaluationType": "a5_low", "anyCards": 5, "qualifier": [1, 0]}"#,
            ),
        ];
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips();
        give_hand(&mut game, pid(1), "AhAsKdKc2s");
        give_hand(&mut game, pid(2), "QdQh8c7s4d");
        for p in [pid(1), pid(2)] {
            game.table.player_mut(p).unwrap().stack -= 50;
            game.betting.pot.add_bet(p, 50, false, 500, false);
        }
        let result = game.run_showdown();
        assert_eq!(result.pots.len(), 1);
        assert_eq!(result.pots[0].hand_type, "High");
        assert_eq!(result.pots[0].amount, 100);
        assert_eq!(result.pots[0].winners, vec![pid(1)]);
    }

    #[test]
    fn side_pots_award_to_eligible_only() {
        let mut game = holdem_game(&[500, 500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips();
        // P1 all-in short with the best hand; P2 and P3 contest the side
        // pot, P2 ahead of P3.
        give_hand(&mut game, pid(1), "AhAsAdKcKs");
        give_hand(&mut game, pid(2), "QdQhQc8s4d");
        give_hand(&mut game, pid(3), "7d8h9cJs2d");
        game.betting.pot.add_bet(pid(1), 100, true, 100, false);
        game.betting.pot.add_bet(pid(2), 200, false, 500, false);
        game.betting.pot.add_bet(pid(3), 200, false, 500, false);
        for (p, amt) in [(pid(1), 100), (pid(2), 200), (pid(3), 200)] {
            game.table.player_mut(p).unwrap().stack -= amt;
        }
        let result = game.run_showdown();
        // Main pot 300 to P1, side pot 200 to P2.
        let main = result
            .pots
            .iter()
            .find(|p| p.side_pot_index.is_none())
            .unwrap();
        assert_eq!(main.amount, 300);
        assert_eq!(main.winners, vec![pid(1)]);
        let side = result
            .pots
            .iter()
            .find(|p| p.side_pot_index == Some(0))
            .unwrap();
        assert_eq!(side.amount, 200);
        assert_eq!(side.winners, vec![pid(2)]);
        game.assert_chip_conservation();
    }

    #[test]
    fn declarations_restrict_directions() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.rules.showdown.best_hand = vec![
            best_hand_cfg(r#"{"name": "High", "evaluationType": "high", "anyCards": 5}"#),
            best_hand_cfg(r#"{"name": "Low", "evaluationType": "a5_low", "anyCards": 5}"#),
        ];
        game.rules.showdown.declaration_mode = DeclarationMode::Declare;
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips();
        // P1 has both the best high and the best low, but declared high
        // only; P2 declared low.
        give_hand(&mut game, pid(1), "AhAsAd2c3s");
        give_hand(&mut game, pid(2), "8d7h6c5s4d");
        for p in [pid(1), pid(2)] {
            game.table.player_mut(p).unwrap().stack -= 50;
            game.betting.pot.add_bet(p, 50, false, 500, false);
        }
        game.declarations
            .insert(pid(1), [(-1_i64, "high".to_string())].into_iter().collect());
        game.declarations
            .insert(pid(2), [(-1_i64, "low".to_string())].into_iter().collect());
        let result = game.run_showdown();
        let high = result.pots.iter().find(|p| p.hand_type == "High").unwrap();
        let low = result.pots.iter().find(|p| p.hand_type == "Low").unwrap();
        assert_eq!(high.winners, vec![pid(1)]);
        assert_eq!(low.winners, vec![pid(2)]);
    }

    #[test]
    fn wild_cards_resolve_at_showdown() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.rules.showdown.best_hand = vec![best_hand_cfg(
            r#"{
                "name": "High",
                "evaluationType": "high_wild_bug",
                "anyCards": 5,
                "wildCards": [{"type": "rank", "rank": "TWO", "role": "wild"}]
            }"#,
        )];
        game.table.start_hand(true);
        game.hand_chips = game.table.total_chips();
        give_hand(&mut game, pid(1), "AhAs2d2c3s");
        give_hand(&mut game, pid(2), "KdKhKc8s4d");
        for p in [pid(1), pid(2)] {
            game.table.player_mut(p).unwrap().stack -= 10;
            game.betting.pot.add_bet(p, 10, false, 500, false);
        }
        let result = game.run_showdown();
        // Deuces wild make quads for P1.
        assert_eq!(result.pots[0].winners, vec![pid(1)]);
        let hr = &result.hands[&pid(1)][0];
        assert_eq!(hr.rank, 2, "aces with two wilds should be quads: {:?}", hr);
    }
}
