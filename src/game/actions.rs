//! Validation and application of player-initiated actions. `player_action`
//! is the single entry point; it applies the action, moves the turn along,
//! and (with auto-progress on) advances the interpreter when a step ends.

use super::betting::{BetError, BetType};
use super::engine::{Game, GamePhase, RoundConfig};
use super::{ActionError, ActionOutcome, PlayerAction, ValidAction};
use crate::cards::card::{Card, Visibility};
use crate::cards::hand::DEFAULT_SUBSET;
use crate::rules::{
    BetStepKind, CardState, DeclareConfig, DiscardConfig, ExposeConfig, ForcedBetStyle,
    PassConfig, SeparateConfig, StepAction,
};
use crate::{Currency, PlayerId};
use log::{debug, info, warn};

impl From<BetError> for ActionError {
    fn from(e: BetError) -> Self {
        ActionError::IllegalAction(e.to_string())
    }
}

impl Game {
    /// Legal actions for the player right now, with chip bounds for betting
    /// actions, card-count bounds for card actions, and values for choices.
    pub fn get_valid_actions(&self, pid: PlayerId) -> Vec<ValidAction> {
        if self.current_player != Some(pid) {
            return vec![];
        }
        if self.state == GamePhase::ProtectionDecision {
            let Some(decision) = self.pending_protection.get(&pid) else {
                return vec![];
            };
            return vec![
                ValidAction::new(
                    PlayerAction::ProtectCard,
                    Some(decision.cost),
                    Some(decision.cost),
                ),
                ValidAction::new(PlayerAction::DeclineProtection, None, None),
            ];
        }
        let Some(step) = self.rules.gameplay.get(self.current_step) else {
            return vec![];
        };
        if let StepAction::Choose(cfg) = &step.action {
            let mut v = ValidAction::new(
                PlayerAction::Choose,
                Some(0),
                Some(cfg.possible_values.len() as Currency - 1),
            );
            v.choices = cfg.possible_values.clone();
            return vec![v];
        }
        if let StepAction::Grouped(subs) = &step.action {
            let idx = match self.acts.current_substep {
                Some(i) if i < subs.len() => i,
                _ => {
                    warn!("invalid substep for grouped step '{}'", step.name);
                    return vec![];
                }
            };
            return match (&subs[idx], self.state) {
                (StepAction::Bet(cfg), GamePhase::Betting) => self.betting_actions(pid, cfg),
                (StepAction::Discard(cfg), GamePhase::Drawing) => {
                    let cc = &cfg.cards[0];
                    let max = cc.number as Currency;
                    let min = cc.min_number.unwrap_or(cc.number) as Currency;
                    vec![ValidAction::new(PlayerAction::Discard, Some(min), Some(max))]
                }
                (StepAction::Draw(cfg), GamePhase::Drawing) => {
                    let cc = &cfg.cards[0];
                    vec![ValidAction::new(
                        PlayerAction::Draw,
                        Some(cc.min_number.unwrap_or(0) as Currency),
                        Some(cc.number as Currency),
                    )]
                }
                (StepAction::Separate(cfg), GamePhase::Drawing) => {
                    let total: usize = cfg.cards.iter().map(|c| c.number).sum();
                    vec![ValidAction::new(
                        PlayerAction::Separate,
                        Some(total as Currency),
                        Some(total as Currency),
                    )]
                }
                (StepAction::Expose(cfg), GamePhase::Drawing) => {
                    let cc = &cfg.cards[0];
                    let max = cc.number as Currency;
                    let min = cc.min_number.unwrap_or(cc.number) as Currency;
                    vec![ValidAction::new(PlayerAction::Expose, Some(min), Some(max))]
                }
                (StepAction::Pass(cfg), GamePhase::Drawing) => {
                    let n = cfg.cards[0].number as Currency;
                    vec![ValidAction::new(PlayerAction::Pass, Some(n), Some(n))]
                }
                (StepAction::Declare(_), GamePhase::Drawing) => {
                    vec![ValidAction::new(PlayerAction::Declare, None, None)]
                }
                (StepAction::Deal(_), GamePhase::Dealing) => {
                    vec![ValidAction::new(PlayerAction::DealAccept, None, None)]
                }
                _ => vec![],
            };
        }
        if self.state == GamePhase::Drawing {
            return match &self.acts.current_round {
                Some(RoundConfig::Discard(cfg)) => {
                    let n = cfg.cards[0].number as Currency;
                    vec![ValidAction::new(PlayerAction::Discard, Some(n), Some(n))]
                }
                Some(RoundConfig::Draw(cfg)) => {
                    let cc = &cfg.cards[0];
                    vec![ValidAction::new(
                        PlayerAction::Draw,
                        Some(cc.min_number.unwrap_or(0) as Currency),
                        Some(cc.number as Currency),
                    )]
                }
                Some(RoundConfig::Separate(cfg)) => {
                    let total: usize = cfg.cards.iter().map(|c| c.number).sum();
                    vec![ValidAction::new(
                        PlayerAction::Separate,
                        Some(total as Currency),
                        Some(total as Currency),
                    )]
                }
                Some(RoundConfig::Expose(cfg)) => {
                    let cc = &cfg.cards[0];
                    let max = cc.number as Currency;
                    let min = cc.min_number.unwrap_or(cc.number) as Currency;
                    vec![ValidAction::new(PlayerAction::Expose, Some(min), Some(max))]
                }
                Some(RoundConfig::Pass(cfg)) => {
                    let n = cfg.cards[0].number as Currency;
                    vec![ValidAction::new(PlayerAction::Pass, Some(n), Some(n))]
                }
                Some(RoundConfig::Declare(_)) => {
                    vec![ValidAction::new(PlayerAction::Declare, None, None)]
                }
                None => vec![],
            };
        }
        if self.state == GamePhase::Betting {
            if let StepAction::Bet(cfg) = &step.action {
                return self.betting_actions(pid, cfg);
            }
        }
        vec![]
    }

    fn betting_actions(
        &self,
        pid: PlayerId,
        cfg: &crate::rules::BetStepConfig,
    ) -> Vec<ValidAction> {
        let Some(player) = self.table.player(pid) else {
            return vec![];
        };
        let stack = player.stack;
        let player_total = self.betting.player_bet(pid).amount;
        let required = self.betting.get_required_bet(pid);
        let mut actions = vec![];

        if cfg.kind == BetStepKind::BringIn && !self.betting.bring_in_posted {
            actions.push(ValidAction::new(
                PlayerAction::BringIn,
                Some(self.bring_in),
                Some(self.bring_in),
            ));
            // Completing to a full small bet is the alternative.
            if stack >= self.small_bet {
                actions.push(ValidAction::new(
                    PlayerAction::Bet,
                    Some(self.small_bet),
                    Some(self.small_bet),
                ));
            } else if stack > self.bring_in {
                actions.push(ValidAction::new(PlayerAction::Bet, Some(stack), Some(stack)));
            }
            return actions;
        }

        actions.push(ValidAction::new(PlayerAction::Fold, None, None));
        if required > 0 {
            if stack >= required {
                actions.push(ValidAction::new(
                    PlayerAction::Call,
                    Some(self.betting.current_bet),
                    Some(self.betting.current_bet),
                ));
            } else if stack > 0 {
                let total = player_total + stack;
                actions.push(ValidAction::new(PlayerAction::Call, Some(total), Some(total)));
            }
        } else {
            actions.push(ValidAction::new(PlayerAction::Check, None, None));
        }

        // Some games restrict empty-handed players to calling.
        if cfg.zero_cards_betting.as_deref() == Some("call_only") && player.hand.is_empty() {
            return actions;
        }

        if stack > required {
            let current_total = self.betting.current_bet;
            let is_stud = self.rules.forced_bets.style == ForcedBetStyle::BringIn;
            let is_small_step = cfg.kind == BetStepKind::Small;
            let bet_size = if is_small_step {
                self.small_bet
            } else {
                self.big_bet
            };
            let small_or_big = if is_small_step {
                BetType::Small
            } else {
                BetType::Big
            };
            // Directly after the bring-in, the next player may complete (a
            // bet to the small bet) rather than raise.
            let order: Vec<PlayerId> = self
                .table
                .position_order(false)
                .into_iter()
                .filter(|p| self.table.player(*p).map_or(false, |pl| pl.is_active))
                .collect();
            let bring_in_idx = order
                .iter()
                .position(|p| self.betting.player_bet(*p).posted_blind);
            let acted_count = self
                .betting
                .current_bets
                .values()
                .filter(|b| b.has_acted || b.posted_blind)
                .count();
            let is_first_after_bring_in = is_stud
                && is_small_step
                && bring_in_idx.is_some()
                && order
                    .get((bring_in_idx.unwrap() + 1) % order.len().max(1))
                    .copied()
                    == Some(pid)
                && acted_count <= 1;
            let (action, min_amount, max_amount) = if is_first_after_bring_in {
                if current_total == self.bring_in {
                    let min = self.small_bet;
                    let max = if self.betting.structure().is_limit() {
                        min
                    } else {
                        self.betting.get_max_bet(pid, BetType::Small, stack)
                    };
                    (PlayerAction::Bet, min, max)
                } else {
                    let min = self.betting.get_min_raise(pid);
                    let max = if self.betting.structure().is_limit() {
                        min
                    } else {
                        self.betting.get_max_bet(pid, BetType::Small, stack)
                    };
                    (PlayerAction::Raise, min, max)
                }
            } else if current_total == 0 {
                let max = if self.betting.structure().is_limit() {
                    bet_size
                } else {
                    self.betting.get_max_bet(pid, small_or_big, stack)
                };
                (PlayerAction::Bet, bet_size, max)
            } else {
                let min = self.betting.get_min_raise(pid);
                let max = if self.betting.structure().is_limit() {
                    min
                } else {
                    self.betting.get_max_bet(pid, BetType::Big, stack)
                };
                (PlayerAction::Raise, min, max)
            };
            if stack + player_total >= min_amount {
                actions.push(ValidAction::new(action, Some(min_amount), Some(max_amount)));
            } else {
                let all_in = stack + player_total;
                actions.push(ValidAction::new(action, Some(all_in), Some(all_in)));
            }
        }
        actions
    }

    /// Apply a player action. Everything the caller can get wrong comes
    /// back as an `ActionError`; state only changes on `Ok`.
    pub fn player_action(
        &mut self,
        pid: PlayerId,
        action: PlayerAction,
        amount: Currency,
        cards: &[Card],
        declarations: &[(i64, String)],
        choice: Option<&str>,
    ) -> Result<ActionOutcome, ActionError> {
        if matches!(self.state, GamePhase::Waiting | GamePhase::Complete) {
            return Err(ActionError::HandNotInProgress);
        }
        let outcome = self.handle_action(pid, action, amount, cards, declarations, choice)?;
        if outcome.advance_step && self.auto_progress && self.state != GamePhase::Complete {
            self.next_step();
        }
        self.assert_chip_conservation();
        Ok(outcome)
    }

    fn handle_action(
        &mut self,
        pid: PlayerId,
        action: PlayerAction,
        amount: Currency,
        cards: &[Card],
        declarations: &[(i64, String)],
        choice: Option<&str>,
    ) -> Result<ActionOutcome, ActionError> {
        if self.current_player != Some(pid) {
            return Err(ActionError::NotYourTurn);
        }
        if self.state == GamePhase::ProtectionDecision {
            return self.handle_protection_action(pid, action);
        }
        let step = self.rules.gameplay[self.current_step].clone();
        debug!("handling {} by {} at step '{}'", action, pid, step.name);

        if let StepAction::Choose(cfg) = &step.action {
            if action != PlayerAction::Choose {
                return Err(ActionError::IllegalAction(
                    "a choice is required".to_string(),
                ));
            }
            let chosen = match choice {
                Some(v) => {
                    if !cfg.possible_values.iter().any(|p| p == v) {
                        return Err(ActionError::InvalidChoice(v.to_string()));
                    }
                    v.to_string()
                }
                None => {
                    let idx = amount.clamp(0, cfg.possible_values.len() as Currency - 1);
                    cfg.possible_values[idx as usize].clone()
                }
            };
            info!("{} chose {} for {}", pid, chosen, cfg.value);
            self.game_choices.insert(cfg.value.clone(), chosen);
            return Ok(ActionOutcome { advance_step: true });
        }

        if let StepAction::Grouped(subs) = &step.action {
            let subs = subs.clone();
            return self.handle_grouped_action(pid, action, amount, cards, declarations, &subs);
        }

        match action {
            PlayerAction::Discard | PlayerAction::Draw => {
                let cfg = match (&self.acts.current_round, action) {
                    (Some(RoundConfig::Discard(c)), PlayerAction::Discard) => c.clone(),
                    (Some(RoundConfig::Draw(c)), PlayerAction::Draw) => c.clone(),
                    _ => {
                        return Err(ActionError::IllegalAction(
                            "no discard or draw in progress".to_string(),
                        ))
                    }
                };
                let is_draw = action == PlayerAction::Draw;
                self.apply_discard(pid, &cfg, cards, is_draw)?;
                info!("{} {}s {} card(s)", pid, action, cards.len());
                self.finish_simple_round_turn(pid)
            }
            PlayerAction::Separate => {
                let Some(RoundConfig::Separate(cfg)) = self.acts.current_round.clone() else {
                    return Err(ActionError::IllegalAction(
                        "no separate in progress".to_string(),
                    ));
                };
                self.apply_separate(pid, &cfg, cards)?;
                info!("{} separates their cards", pid);
                self.finish_simple_round_turn(pid)
            }
            PlayerAction::Expose => {
                let Some(RoundConfig::Expose(cfg)) = self.acts.current_round.clone() else {
                    return Err(ActionError::IllegalAction(
                        "no expose in progress".to_string(),
                    ));
                };
                self.validate_expose(pid, &cfg, cards)?;
                if cfg.cards[0].immediate {
                    for card in cards {
                        self.table.expose_card(pid, *card);
                    }
                    info!("{} exposes {} card(s) immediately", pid, cards.len());
                    self.finish_simple_round_turn(pid)
                } else {
                    self.acts.pending_exposures.insert(pid, cards.to_vec());
                    info!("{} will expose {} card(s)", pid, cards.len());
                    self.current_player = self.next_player(false);
                    let active = self.table.active_player_ids();
                    if active
                        .iter()
                        .all(|p| self.acts.pending_exposures.contains_key(p))
                    {
                        self.apply_all_exposures();
                        return Ok(ActionOutcome { advance_step: true });
                    }
                    Ok(ActionOutcome::default())
                }
            }
            PlayerAction::Pass => {
                let Some(RoundConfig::Pass(cfg)) = self.acts.current_round.clone() else {
                    return Err(ActionError::IllegalAction("no pass in progress".to_string()));
                };
                self.validate_pass(pid, &cfg, cards)?;
                let recipient = self.pass_recipient(pid)?;
                self.acts
                    .pending_passes
                    .insert(pid, (cards.to_vec(), recipient));
                info!("{} passes {} card(s) to {}", pid, cards.len(), recipient);
                self.current_player = self.next_player(false);
                let active = self.table.active_player_ids();
                if active
                    .iter()
                    .all(|p| self.acts.pending_passes.contains_key(p))
                {
                    self.apply_all_passes();
                    return Ok(ActionOutcome { advance_step: true });
                }
                Ok(ActionOutcome::default())
            }
            PlayerAction::Declare => {
                let Some(RoundConfig::Declare(cfg)) = self.acts.current_round.clone() else {
                    return Err(ActionError::IllegalAction(
                        "no declare in progress".to_string(),
                    ));
                };
                self.validate_declare(pid, &cfg, declarations)?;
                self.acts
                    .pending_declarations
                    .insert(pid, declarations.to_vec());
                info!("{} declares {:?}", pid, declarations);
                self.current_player = self.next_player(false);
                let active = self.table.active_player_ids();
                if active
                    .iter()
                    .all(|p| self.acts.pending_declarations.contains_key(p))
                {
                    self.apply_all_declarations();
                    return Ok(ActionOutcome { advance_step: true });
                }
                Ok(ActionOutcome::default())
            }
            PlayerAction::Fold
            | PlayerAction::Check
            | PlayerAction::Call
            | PlayerAction::Bet
            | PlayerAction::Raise
            | PlayerAction::BringIn => {
                if self.state != GamePhase::Betting {
                    return Err(ActionError::IllegalAction(
                        "not in a betting round".to_string(),
                    ));
                }
                self.handle_betting_action(pid, action, amount, true)
            }
            other => Err(ActionError::IllegalAction(format!(
                "{} is not valid here",
                other
            ))),
        }
    }

    /// Common tail of single-action (non-buffered) card rounds: mark the
    /// player done, pass the turn, and finish when everyone has gone.
    fn finish_simple_round_turn(&mut self, pid: PlayerId) -> Result<ActionOutcome, ActionError> {
        self.acts.players_done.insert(pid);
        self.current_player = self.next_player(false);
        let active = self.table.active_player_ids();
        let complete = active.iter().all(|p| self.acts.players_done.contains(p));
        Ok(ActionOutcome {
            advance_step: complete,
        })
    }

    fn advance_player_if_needed(
        &mut self,
        manage_player: bool,
        round_complete: bool,
    ) -> Result<ActionOutcome, ActionError> {
        if !manage_player {
            return Ok(ActionOutcome::default());
        }
        self.current_player = self.next_player(false);
        Ok(ActionOutcome {
            advance_step: round_complete,
        })
    }

    fn current_bet_step_config(&self) -> Option<crate::rules::BetStepConfig> {
        match &self.rules.gameplay.get(self.current_step)?.action {
            StepAction::Bet(c) => Some(c.clone()),
            StepAction::Grouped(subs) => {
                let idx = self.acts.current_substep.unwrap_or(0);
                match subs.get(idx) {
                    Some(StepAction::Bet(c)) => Some(c.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub(crate) fn handle_betting_action(
        &mut self,
        pid: PlayerId,
        action: PlayerAction,
        amount: Currency,
        manage_player: bool,
    ) -> Result<ActionOutcome, ActionError> {
        let valid_actions = self.get_valid_actions(pid);
        let bet_cfg = self.current_bet_step_config();
        let is_bring_in_step = bet_cfg
            .as_ref()
            .map(|c| c.kind == BetStepKind::BringIn)
            .unwrap_or(false);
        let bet_type = if action == PlayerAction::BringIn {
            BetType::BringIn
        } else if is_bring_in_step
            || bet_cfg.as_ref().map(|c| c.kind) == Some(BetStepKind::Small)
        {
            BetType::Small
        } else {
            BetType::Big
        };

        match action {
            PlayerAction::Fold => {
                if let Some(p) = self.table.player_mut(pid) {
                    p.is_active = false;
                }
                let mut bet = self.betting.player_bet(pid);
                bet.has_acted = true;
                self.betting.current_bets.insert(pid, bet);
                info!("{} folds", pid);
                if self.table.active_count() == 1 {
                    self.handle_fold_win();
                    return Ok(ActionOutcome { advance_step: true });
                }
                let complete = self
                    .betting
                    .round_complete(&self.table.active_player_ids());
                self.advance_player_if_needed(manage_player, complete)
            }
            PlayerAction::Check => {
                if self.betting.get_required_bet(pid) > 0 {
                    return Err(ActionError::IllegalAction(
                        "cannot check facing a bet".to_string(),
                    ));
                }
                let mut bet = self.betting.player_bet(pid);
                bet.has_acted = true;
                self.betting.current_bets.insert(pid, bet);
                self.betting.last_actor_id = Some(pid);
                info!("{} checks", pid);
                let complete = self
                    .betting
                    .round_complete(&self.table.active_player_ids());
                self.advance_player_if_needed(manage_player, complete)
            }
            PlayerAction::Call => {
                let player_total = self.betting.player_bet(pid).amount;
                let stack = self
                    .table
                    .player(pid)
                    .ok_or(ActionError::NotYourTurn)?
                    .stack;
                let mut additional = self.betting.get_required_bet(pid);
                let mut total = self.betting.current_bet;
                if additional > stack {
                    additional = stack;
                    total = player_total + additional;
                }
                info!("{} calls {}", pid, additional);
                self.betting
                    .place_bet(pid, total, stack, false, bet_type, false)?;
                self.table.player_mut(pid).unwrap().stack -= additional;
                let complete = self
                    .betting
                    .round_complete(&self.table.active_player_ids());
                self.advance_player_if_needed(manage_player, complete)
            }
            PlayerAction::BringIn => {
                let expected = valid_actions
                    .iter()
                    .find(|v| v.action == PlayerAction::BringIn)
                    .and_then(|v| v.min);
                if expected != Some(amount) {
                    return Err(ActionError::InvalidAmount {
                        amount,
                        min: expected.unwrap_or(0),
                        max: expected.unwrap_or(0),
                    });
                }
                let stack = self
                    .table
                    .player(pid)
                    .ok_or(ActionError::NotYourTurn)?
                    .stack;
                info!("{} brings in for {}", pid, amount);
                self.betting
                    .place_bet(pid, amount, stack, true, BetType::BringIn, false)?;
                self.table.player_mut(pid).unwrap().stack -= amount;
                self.bring_in_player_id = Some(pid);
                let mut outcome = self.advance_player_if_needed(manage_player, false)?;
                if is_bring_in_step {
                    outcome.advance_step = true;
                }
                Ok(outcome)
            }
            PlayerAction::Bet | PlayerAction::Raise => {
                let valid = valid_actions
                    .iter()
                    .find(|v| v.action == action)
                    .ok_or_else(|| {
                        ActionError::IllegalAction(format!("no {} available", action))
                    })?;
                let (min, max) = (valid.min.unwrap_or(0), valid.max.unwrap_or(0));
                if amount < min || amount > max {
                    return Err(ActionError::InvalidAmount { amount, min, max });
                }
                let player_total = self.betting.player_bet(pid).amount;
                let stack = self
                    .table
                    .player(pid)
                    .ok_or(ActionError::NotYourTurn)?
                    .stack;
                let (total, additional) = if amount >= stack + player_total {
                    info!("{} is all in for {}", pid, stack);
                    (stack + player_total, stack)
                } else {
                    (amount, amount - player_total)
                };
                if additional > stack {
                    return Err(ActionError::InsufficientChips);
                }
                if is_bring_in_step {
                    // Completing counts as a forced open, and ends the
                    // bring-in step.
                    info!("{} completes to {}", pid, total);
                    self.betting
                        .place_bet(pid, total, stack, true, bet_type, false)?;
                    self.table.player_mut(pid).unwrap().stack -= additional;
                    self.bring_in_player_id = Some(pid);
                    let mut outcome = self.advance_player_if_needed(manage_player, false)?;
                    outcome.advance_step = true;
                    Ok(outcome)
                } else {
                    info!("{} {}s to {}", pid, action, total);
                    self.betting
                        .place_bet(pid, total, stack, false, bet_type, false)?;
                    self.table.player_mut(pid).unwrap().stack -= additional;
                    let complete = self
                        .betting
                        .round_complete(&self.table.active_player_ids());
                    self.advance_player_if_needed(manage_player, complete)
                }
            }
            other => Err(ActionError::IllegalAction(format!(
                "{} is not a betting action",
                other
            ))),
        }
    }

    fn handle_grouped_action(
        &mut self,
        pid: PlayerId,
        action: PlayerAction,
        amount: Currency,
        cards: &[Card],
        declarations: &[(i64, String)],
        subs: &[StepAction],
    ) -> Result<ActionOutcome, ActionError> {
        let idx = self.acts.current_substep.unwrap_or(0);
        let sub = subs
            .get(idx)
            .ok_or_else(|| ActionError::IllegalAction("grouped step exhausted".to_string()))?
            .clone();
        debug!("grouped action {} by {} at substep {}", action, pid, idx);
        let last = idx == subs.len() - 1;
        match (&sub, action) {
            (
                StepAction::Bet(_),
                PlayerAction::Check
                | PlayerAction::Call
                | PlayerAction::Bet
                | PlayerAction::Raise
                | PlayerAction::Fold
                | PlayerAction::BringIn,
            ) => {
                if self.state != GamePhase::Betting {
                    return Err(ActionError::IllegalAction(
                        "not in a betting round".to_string(),
                    ));
                }
                self.handle_betting_action(pid, action, amount, false)?;
                if self.state == GamePhase::Complete {
                    // Everyone else folded mid-group.
                    return Ok(ActionOutcome { advance_step: true });
                }
                self.acts
                    .player_completed_subactions
                    .entry(pid)
                    .or_default()
                    .insert(idx);
                let done_all = self
                    .acts
                    .player_completed_subactions
                    .get(&pid)
                    .map(|s| s.len() == subs.len())
                    .unwrap_or(false);
                if action == PlayerAction::Fold {
                    // A fold ends the whole group for this player.
                    self.acts.grouped_completed.insert(pid);
                    self.acts.current_substep = Some(0);
                    self.current_player = self.next_player(false);
                } else if done_all {
                    // Responding to a raise with everything else done.
                    self.current_player = self.next_player(false);
                } else {
                    self.acts.current_substep = Some(idx + 1);
                    self.enter_substep(idx + 1);
                }
            }
            (StepAction::Discard(cfg), PlayerAction::Discard)
            | (StepAction::Draw(cfg), PlayerAction::Draw) => {
                if self.state != GamePhase::Drawing {
                    return Err(ActionError::IllegalAction(
                        "not in a drawing round".to_string(),
                    ));
                }
                let cc = &cfg.cards[0];
                if cc.once_per_step
                    && self
                        .acts
                        .player_completed_subactions
                        .get(&pid)
                        .map(|s| s.contains(&idx))
                        .unwrap_or(false)
                {
                    return Err(ActionError::IllegalAction(
                        "already done this step".to_string(),
                    ));
                }
                let min = cc.min_number.unwrap_or(0);
                if cards.len() < min || cards.len() > cc.number {
                    return Err(ActionError::InvalidCards(format!(
                        "must select between {} and {} cards",
                        min, cc.number
                    )));
                }
                let is_draw = matches!(sub, StepAction::Draw(_));
                self.apply_discard(pid, cfg, cards, is_draw)?;
                info!("{} {}s {} card(s)", pid, action, cards.len());
                self.complete_grouped_subaction(pid, idx, last);
            }
            (StepAction::Separate(cfg), PlayerAction::Separate) => {
                if self.state != GamePhase::Drawing {
                    return Err(ActionError::IllegalAction(
                        "not in a drawing round".to_string(),
                    ));
                }
                self.apply_separate(pid, cfg, cards)?;
                info!("{} separates their cards", pid);
                self.complete_grouped_subaction(pid, idx, last);
            }
            (StepAction::Expose(cfg), PlayerAction::Expose) => {
                if self.state != GamePhase::Drawing {
                    return Err(ActionError::IllegalAction(
                        "not in a drawing round".to_string(),
                    ));
                }
                self.validate_expose_cfg(pid, cfg, cards)?;
                if cfg.cards[0].immediate {
                    for card in cards {
                        self.table.expose_card(pid, *card);
                    }
                    info!("{} exposes {} card(s) immediately", pid, cards.len());
                } else {
                    self.acts.pending_exposures.insert(pid, cards.to_vec());
                    info!("{} will expose {} card(s)", pid, cards.len());
                }
                self.complete_grouped_subaction(pid, idx, last);
            }
            (StepAction::Pass(cfg), PlayerAction::Pass) => {
                if self.state != GamePhase::Drawing {
                    return Err(ActionError::IllegalAction(
                        "not in a drawing round".to_string(),
                    ));
                }
                self.validate_pass(pid, cfg, cards)?;
                let recipient = self.pass_recipient(pid)?;
                self.acts
                    .pending_passes
                    .insert(pid, (cards.to_vec(), recipient));
                info!("{} passes {} card(s) to {}", pid, cards.len(), recipient);
                self.complete_grouped_subaction(pid, idx, last);
            }
            (StepAction::Declare(cfg), PlayerAction::Declare) => {
                if self.state != GamePhase::Drawing {
                    return Err(ActionError::IllegalAction(
                        "not in a declaring round".to_string(),
                    ));
                }
                self.validate_declare(pid, cfg, declarations)?;
                self.acts
                    .pending_declarations
                    .insert(pid, declarations.to_vec());
                info!("{} declares {:?}", pid, declarations);
                self.complete_grouped_subaction(pid, idx, last);
            }
            (StepAction::Deal(cfg), PlayerAction::DealAccept) => {
                if self.state != GamePhase::Dealing {
                    return Err(ActionError::IllegalAction(
                        "not in a dealing round".to_string(),
                    ));
                }
                let cfg = cfg.clone();
                info!("{} takes their deal", pid);
                self.handle_deal(&cfg, Some(pid))
                    .map_err(|e| ActionError::IllegalAction(e.to_string()))?;
                self.complete_grouped_subaction(pid, idx, last);
            }
            (sub, action) => {
                return Err(ActionError::IllegalAction(format!(
                    "{} does not fit substep '{}'",
                    action,
                    sub.kind_name()
                )));
            }
        }
        // The whole group completes when every active player has finished
        // every substep and any betting inside it has settled.
        let active = self.table.active_player_ids();
        let everyone_done = active
            .iter()
            .all(|p| self.acts.grouped_completed.contains(p));
        let has_bet = subs.iter().any(|s| matches!(s, StepAction::Bet(_)));
        if everyone_done && (!has_bet || self.betting.round_complete(&active)) {
            info!("grouped step complete");
            // Pending exposures and passes buffered during the group apply
            // at its end.
            if !self.acts.pending_exposures.is_empty() {
                self.apply_all_exposures();
            }
            if !self.acts.pending_passes.is_empty() {
                self.apply_all_passes();
            }
            if !self.acts.pending_declarations.is_empty() {
                self.apply_all_declarations();
            }
            return Ok(ActionOutcome { advance_step: true });
        }
        Ok(ActionOutcome::default())
    }

    fn complete_grouped_subaction(&mut self, pid: PlayerId, idx: usize, last: bool) {
        self.acts
            .player_completed_subactions
            .entry(pid)
            .or_default()
            .insert(idx);
        if last {
            self.acts.grouped_completed.insert(pid);
            self.acts.current_substep = Some(0);
            self.current_player = self.next_player(false);
            self.enter_substep(0);
        } else {
            self.acts.current_substep = Some(idx + 1);
            self.enter_substep(idx + 1);
        }
    }

    fn handle_protection_action(
        &mut self,
        pid: PlayerId,
        action: PlayerAction,
    ) -> Result<ActionOutcome, ActionError> {
        let Some(decision) = self.pending_protection.get(&pid).cloned() else {
            return Err(ActionError::NotYourTurn);
        };
        match action {
            PlayerAction::ProtectCard => {
                let stack = self
                    .table
                    .player(pid)
                    .ok_or(ActionError::NotYourTurn)?
                    .stack;
                if stack < decision.cost {
                    return Err(ActionError::InsufficientChips);
                }
                self.table.player_mut(pid).unwrap().stack -= decision.cost;
                // Protection money is dead money in the pot, like an ante.
                self.betting
                    .place_bet(pid, decision.cost, stack, true, BetType::Ante, true)?;
                self.table.expose_card(pid, decision.card);
                info!(
                    "{} pays {} ({}) to protect {}",
                    pid, decision.cost, decision.cost_name, decision.card
                );
            }
            PlayerAction::DeclineProtection => {
                info!("{} declines protection on {}", pid, decision.card);
            }
            other => {
                return Err(ActionError::IllegalAction(format!(
                    "{} is not a protection decision",
                    other
                )))
            }
        }
        self.pending_protection.remove(&pid);
        let next = self
            .protection_order
            .iter()
            .find(|p| self.pending_protection.contains_key(*p))
            .copied();
        match next {
            Some(next) => {
                self.current_player = Some(next);
                Ok(ActionOutcome::default())
            }
            None => {
                self.complete_protection_round();
                Ok(ActionOutcome { advance_step: true })
            }
        }
    }

    fn apply_discard(
        &mut self,
        pid: PlayerId,
        cfg: &DiscardConfig,
        cards: &[Card],
        is_draw: bool,
    ) -> Result<(), ActionError> {
        let cc = &cfg.cards[0];
        let max = cc.number;
        let min = cc.min_number.unwrap_or(if is_draw { 0 } else { max });
        let matching_ranks = cc.rule.as_deref() == Some("matching ranks");
        let held: Vec<Card> = self
            .table
            .player(pid)
            .ok_or(ActionError::NotYourTurn)?
            .hand
            .cards()
            .to_vec();
        if !matching_ranks {
            if cards.len() < min || cards.len() > max {
                return Err(ActionError::InvalidCards(format!(
                    "must discard between {} and {} cards",
                    min, max
                )));
            }
            if cards.iter().any(|c| !held.contains(c)) {
                return Err(ActionError::InvalidCards(
                    "card not in hand".to_string(),
                ));
            }
        }
        if cc.entire_subset {
            // The selection must be exactly one named subset.
            let names: Vec<String> = self
                .table
                .player(pid)
                .unwrap()
                .hand
                .subset_names()
                .map(|s| s.to_string())
                .collect();
            let matched = names.iter().any(|name| {
                let subset = self.table.player(pid).unwrap().hand.subset(name);
                subset.len() == cards.len() && cards.iter().all(|c| subset.contains(c))
            });
            if !matched {
                return Err(ActionError::InvalidCards(
                    "must discard a whole subset".to_string(),
                ));
            }
        }
        let face_up = cc.state == Some(CardState::FaceUp);
        let discarded: Vec<Card> = if matching_ranks {
            // Auto-discard everything matching ranks in the named community
            // subset; the player's selection is ignored.
            let target_ranks: Vec<crate::cards::card::Rank> =
                if cc.discard_location.as_deref() == Some("community") {
                    self.table
                        .community_cards
                        .get(&cc.discard_subset)
                        .map(|v| v.iter().map(|c| c.rank).collect())
                        .unwrap_or_default()
                } else {
                    vec![]
                };
            held.into_iter()
                .filter(|c| target_ranks.contains(&c.rank))
                .collect()
        } else {
            cards.to_vec()
        };
        for card in &discarded {
            let mut removed = self
                .table
                .player_mut(pid)
                .unwrap()
                .hand
                .remove_card(*card)
                .expect("validated above");
            removed.visibility = if face_up {
                Visibility::FaceUp
            } else {
                Visibility::FaceDown
            };
            if matching_ranks && cc.discard_location.as_deref() == Some("community") {
                self.table
                    .community_cards
                    .entry(cc.discard_subset.clone())
                    .or_default()
                    .push(removed);
            } else {
                self.table.discard(&cc.discard_subset, removed);
            }
        }
        if is_draw {
            let mut draw_amount = discarded.len();
            if let Some(adj) = &cc.draw_amount {
                if adj.relative_to == "discard" {
                    draw_amount = (draw_amount as i32 + adj.amount).max(0) as usize;
                }
            }
            let available = self.table.deck.remaining();
            if draw_amount > available {
                warn!("deck short; drawing {} instead of {}", available, draw_amount);
                draw_amount = available;
            }
            if draw_amount > 0 {
                let new_cards = self
                    .table
                    .deck
                    .deal_cards(draw_amount, false)
                    .expect("checked remaining");
                let subset = cc.hole_subset.clone().unwrap_or_default();
                let p = self.table.player_mut(pid).unwrap();
                for card in new_cards {
                    p.hand.add_card(card);
                    if !subset.is_empty() && subset != DEFAULT_SUBSET {
                        p.hand.add_to_subset(card, &subset);
                    }
                }
                debug!("{} drew {} card(s)", pid, draw_amount);
            }
        }
        Ok(())
    }

    fn apply_separate(
        &mut self,
        pid: PlayerId,
        cfg: &SeparateConfig,
        cards: &[Card],
    ) -> Result<(), ActionError> {
        let expected: usize = cfg.cards.iter().map(|c| c.number).sum();
        let held: Vec<Card> = self
            .table
            .player(pid)
            .ok_or(ActionError::NotYourTurn)?
            .hand
            .cards()
            .to_vec();
        if cards.len() != expected || cards.iter().any(|c| !held.contains(c)) {
            return Err(ActionError::InvalidCards(format!(
                "separation must use exactly {} held cards",
                expected
            )));
        }
        // Resolve canonical card state before re-partitioning.
        let canonical: Vec<Card> = cards
            .iter()
            .map(|c| *held.iter().find(|h| *h == c).unwrap())
            .collect();
        {
            let p = self.table.player_mut(pid).unwrap();
            p.hand.clear_subsets();
            let mut i = 0;
            for cc in &cfg.cards {
                for card in &canonical[i..i + cc.number] {
                    p.hand.add_to_subset(*card, &cc.hole_subset);
                }
                i += cc.number;
            }
        }
        for req in &cfg.visibility_requirements {
            let subset = self
                .table
                .player(pid)
                .unwrap()
                .hand
                .subset(&req.hole_subset);
            let down = subset
                .iter()
                .filter(|c| c.visibility == Visibility::FaceDown)
                .count();
            let up = subset.iter().filter(|c| c.is_face_up()).count();
            if down < req.min_face_down || up < req.min_face_up {
                self.table.player_mut(pid).unwrap().hand.clear_subsets();
                return Err(ActionError::InvalidCards(format!(
                    "subset '{}' needs {} down and {} up",
                    req.hole_subset, req.min_face_down, req.min_face_up
                )));
            }
        }
        if let Some(cmp) = &cfg.hand_comparison {
            if cmp.subsets.len() == 2 {
                let first = self
                    .table
                    .player(pid)
                    .unwrap()
                    .hand
                    .subset(&cmp.subsets[0].hole_subset);
                let second = self
                    .table
                    .player(pid)
                    .unwrap()
                    .hand
                    .subset(&cmp.subsets[1].hole_subset);
                let ordering = self
                    .evaluators
                    .compare_with_offset(
                        &first,
                        &second,
                        cmp.subsets[0].evaluation_type,
                        cmp.subsets[1].evaluation_type,
                    )
                    .map_err(|e| ActionError::IllegalAction(e.to_string()))?;
                if cmp.comparison_rule == "greater_than"
                    && ordering != std::cmp::Ordering::Greater
                {
                    self.table.player_mut(pid).unwrap().hand.clear_subsets();
                    return Err(ActionError::InvalidCards(format!(
                        "'{}' must beat '{}'",
                        cmp.subsets[0].hole_subset, cmp.subsets[1].hole_subset
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_expose(
        &self,
        pid: PlayerId,
        cfg: &ExposeConfig,
        cards: &[Card],
    ) -> Result<(), ActionError> {
        self.validate_expose_cfg(pid, cfg, cards)
    }

    fn validate_expose_cfg(
        &self,
        pid: PlayerId,
        cfg: &ExposeConfig,
        cards: &[Card],
    ) -> Result<(), ActionError> {
        let cc = &cfg.cards[0];
        let max = cc.number;
        let min = cc.min_number.unwrap_or(max);
        if cards.len() < min || cards.len() > max {
            return Err(ActionError::InvalidCards(format!(
                "must expose between {} and {} cards",
                min, max
            )));
        }
        let p = self.table.player(pid).ok_or(ActionError::NotYourTurn)?;
        let requires_down = cc.state.unwrap_or(CardState::FaceDown) == CardState::FaceDown;
        for card in cards {
            let held = p.hand.cards().iter().find(|c| *c == card);
            match held {
                None => {
                    return Err(ActionError::InvalidCards("card not in hand".to_string()));
                }
                Some(held) if requires_down && held.is_face_up() => {
                    return Err(ActionError::InvalidCards(
                        "card is already face up".to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_pass(
        &self,
        pid: PlayerId,
        cfg: &PassConfig,
        cards: &[Card],
    ) -> Result<(), ActionError> {
        let cc = &cfg.cards[0];
        if cards.len() != cc.number {
            return Err(ActionError::InvalidCards(format!(
                "must pass exactly {} card(s)",
                cc.number
            )));
        }
        let p = self.table.player(pid).ok_or(ActionError::NotYourTurn)?;
        let requires_down = cc.state.unwrap_or(CardState::FaceDown) == CardState::FaceDown;
        for card in cards {
            match p.hand.cards().iter().find(|c| *c == card) {
                None => return Err(ActionError::InvalidCards("card not in hand".to_string())),
                Some(held) if requires_down && held.is_face_up() => {
                    return Err(ActionError::InvalidCards(
                        "card must be face down".to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn pass_recipient(&self, pid: PlayerId) -> Result<PlayerId, ActionError> {
        self.table
            .next_active_player(pid)
            .ok_or_else(|| ActionError::IllegalAction("no one to pass to".to_string()))
    }

    fn validate_declare(
        &self,
        pid: PlayerId,
        cfg: &DeclareConfig,
        declarations: &[(i64, String)],
    ) -> Result<(), ActionError> {
        if declarations.is_empty() {
            return Err(ActionError::InvalidDeclaration("empty".to_string()));
        }
        for (_, decl) in declarations {
            if !cfg.options.iter().any(|o| o == decl) {
                return Err(ActionError::InvalidDeclaration(decl.clone()));
            }
        }
        if cfg.per_pot {
            // Every eligible pot must be covered, exactly once each.
            let eligible = self.eligible_pot_indices(pid);
            let mut declared: Vec<i64> = declarations.iter().map(|(i, _)| *i).collect();
            declared.sort_unstable();
            declared.dedup();
            if declared.len() != declarations.len() {
                return Err(ActionError::InvalidDeclaration(
                    "duplicate pot declarations".to_string(),
                ));
            }
            if declared != eligible {
                return Err(ActionError::InvalidDeclaration(format!(
                    "declarations must cover pots {:?}",
                    eligible
                )));
            }
        } else if declarations.len() != 1 {
            return Err(ActionError::InvalidDeclaration(
                "exactly one declaration expected".to_string(),
            ));
        }
        Ok(())
    }

    /// Pot indices a player may win from: -1 for the main pot, then any
    /// side pots listing them as eligible.
    pub(crate) fn eligible_pot_indices(&self, pid: PlayerId) -> Vec<i64> {
        let mut v = vec![-1];
        for i in 0..self.betting.get_side_pot_count() {
            if self.betting.pot.side_pot_eligible(i).contains(&pid) {
                v.push(i as i64);
            }
        }
        v
    }

    fn apply_all_exposures(&mut self) {
        let pending = std::mem::take(&mut self.acts.pending_exposures);
        for (pid, cards) in pending {
            for card in cards {
                self.table.expose_card(pid, card);
            }
        }
        debug!("applied buffered exposures");
    }

    fn apply_all_passes(&mut self) {
        let pending = std::mem::take(&mut self.acts.pending_passes);
        let mut incoming: Vec<(PlayerId, Vec<Card>)> = vec![];
        for (pid, (cards, recipient)) in pending {
            let mut moved = vec![];
            for card in cards {
                if let Some(p) = self.table.player_mut(pid) {
                    if let Some(c) = p.hand.remove_card(card) {
                        moved.push(c);
                    }
                }
            }
            incoming.push((recipient, moved));
        }
        for (recipient, cards) in incoming {
            if let Some(p) = self.table.player_mut(recipient) {
                p.hand.add_cards(cards);
            }
        }
        debug!("applied buffered passes");
    }

    fn apply_all_declarations(&mut self) {
        let pending = std::mem::take(&mut self.acts.pending_declarations);
        for (pid, decls) in pending {
            let per_pot: std::collections::BTreeMap<i64, String> = decls.into_iter().collect();
            self.declarations.insert(pid, per_pot);
        }
        info!("declarations locked: {:?}", self.declarations);
    }

    // Convenience wrappers for hosts and tests.

    pub fn fold(&mut self, pid: PlayerId) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Fold, 0, &[], &[], None)
    }

    pub fn check(&mut self, pid: PlayerId) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Check, 0, &[], &[], None)
    }

    pub fn call(&mut self, pid: PlayerId, amount: Currency) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Call, amount, &[], &[], None)
    }

    pub fn bet(&mut self, pid: PlayerId, amount: Currency) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Bet, amount, &[], &[], None)
    }

    pub fn raise_to(
        &mut self,
        pid: PlayerId,
        amount: Currency,
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Raise, amount, &[], &[], None)
    }

    pub fn bring_in(
        &mut self,
        pid: PlayerId,
        amount: Currency,
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::BringIn, amount, &[], &[], None)
    }

    pub fn discard_cards(
        &mut self,
        pid: PlayerId,
        cards: &[Card],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Discard, 0, cards, &[], None)
    }

    pub fn draw_cards(
        &mut self,
        pid: PlayerId,
        cards: &[Card],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Draw, 0, cards, &[], None)
    }

    pub fn expose_cards(
        &mut self,
        pid: PlayerId,
        cards: &[Card],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Expose, 0, cards, &[], None)
    }

    pub fn pass_cards(
        &mut self,
        pid: PlayerId,
        cards: &[Card],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Pass, 0, cards, &[], None)
    }

    pub fn separate_cards(
        &mut self,
        pid: PlayerId,
        cards: &[Card],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Separate, 0, cards, &[], None)
    }

    pub fn declare(
        &mut self,
        pid: PlayerId,
        declarations: &[(i64, String)],
    ) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Declare, 0, &[], declarations, None)
    }

    pub fn choose(&mut self, pid: PlayerId, value: &str) -> Result<ActionOutcome, ActionError> {
        self.player_action(pid, PlayerAction::Choose, 0, &[], &[], Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::super::engine::testutil::holdem_game;
    use super::super::engine::GameConfig;
    use super::*;

    fn pid(n: u32) -> PlayerId {
        PlayerId(n)
    }

    fn nl_game(stacks: &[Currency]) -> Game {
        let mut c = GameConfig::no_limit(1, 2);
        c.min_buyin = 10;
        c.max_buyin = 10_000;
        holdem_game(stacks, c)
    }

    #[test]
    fn out_of_turn_is_rejected() {
        let mut game = nl_game(&[200, 200, 200]);
        game.start_hand(true).unwrap();
        let turn = game.current_player().unwrap();
        let other = game
            .table
            .active_player_ids()
            .into_iter()
            .find(|p| *p != turn)
            .unwrap();
        assert_eq!(game.fold(other), Err(ActionError::NotYourTurn));
        assert!(game.get_valid_actions(other).is_empty());
    }

    #[test]
    fn check_requires_no_bet() {
        let mut game = nl_game(&[200, 200, 200]);
        game.start_hand(true).unwrap();
        let turn = game.current_player().unwrap();
        assert!(matches!(
            game.check(turn),
            Err(ActionError::IllegalAction(_))
        ));
    }

    #[test]
    fn heads_up_walkthrough_to_fold_win() {
        let mut game = nl_game(&[200, 200]);
        game.start_hand(true).unwrap();
        // Heads-up: button is the small blind and acts first.
        let sb = game.current_player().unwrap();
        game.fold(sb).unwrap();
        assert_eq!(game.state, GamePhase::Complete);
        let result = game.get_hand_results().unwrap();
        assert!(result.was_fold_win);
        assert_eq!(result.total_pot, 3);
        // Winner recovered the blinds: stacks sum unchanged.
        assert_eq!(game.table.total_chips(), 400);
    }

    #[test]
    fn preflop_call_check_advances_to_flop() {
        let mut game = nl_game(&[200, 200]);
        game.start_hand(true).unwrap();
        let sb = game.current_player().unwrap();
        let actions = game.get_valid_actions(sb);
        assert!(actions.iter().any(|a| a.action == PlayerAction::Call));
        game.call(sb, 2).unwrap();
        let bb = game.current_player().unwrap();
        assert_ne!(sb, bb);
        game.check(bb).unwrap();
        // On the flop now: three community cards, bet reset.
        assert_eq!(game.table.community_cards["default"].len(), 3);
        assert_eq!(game.betting.current_bet, 0);
        game.assert_chip_conservation();
    }

    #[test]
    fn bet_bounds_are_enforced() {
        let mut game = nl_game(&[200, 200]);
        game.start_hand(true).unwrap();
        let sb = game.current_player().unwrap();
        game.call(sb, 2).unwrap();
        let bb = game.current_player().unwrap();
        game.check(bb).unwrap();
        let first = game.current_player().unwrap();
        // Flop: min bet is the big blind.
        assert!(matches!(
            game.bet(first, 1),
            Err(ActionError::InvalidAmount { .. })
        ));
        game.bet(first, 10).unwrap();
        let second = game.current_player().unwrap();
        // Raise below min raise rejected, all-in allowed later.
        assert!(matches!(
            game.raise_to(second, 12),
            Err(ActionError::InvalidAmount { .. })
        ));
        game.raise_to(second, 30).unwrap();
    }

    #[test]
    fn full_hand_reaches_showdown_and_pays() {
        let mut game = nl_game(&[200, 200, 200]);
        game.start_hand(true).unwrap();
        // Preflop: everyone calls/checks around.
        for _ in 0..3 {
            let p = game.current_player().unwrap();
            let acts = game.get_valid_actions(p);
            if acts.iter().any(|a| a.action == PlayerAction::Check) {
                game.check(p).unwrap();
            } else {
                game.call(p, game.betting.current_bet).unwrap();
            }
        }
        // Flop, turn, river: check around.
        for _ in 0..3 {
            for _ in 0..3 {
                let p = game.current_player().unwrap();
                game.check(p).unwrap();
            }
        }
        assert_eq!(game.state, GamePhase::Complete);
        let result = game.get_hand_results().unwrap();
        assert!(!result.was_fold_win);
        assert_eq!(result.total_pot, 6);
        assert_eq!(game.table.total_chips(), 600);
        assert!(!result.pots.is_empty());
        game.assert_chip_conservation();
    }

    #[test]
    fn straight_board_splits_evenly() {
        use crate::cards::card::cards_from_str;
        // Heads-up, both hands play the board; the pot splits with no odd
        // chip movement.
        let mut game = nl_game(&[100, 100]);
        // Deal order heads-up: big blind first, button last. Button is the
        // small blind. Board is a broadway straight, hole cards are bricks
        // that cannot flush.
        let top = cards_from_str("2c2d3c3dAsKdQhJcTs").unwrap();
        game.start_hand_stacked(&top).unwrap();
        let sb = game.current_player().unwrap();
        game.call(sb, 2).unwrap();
        let bb = game.current_player().unwrap();
        game.check(bb).unwrap();
        for _ in 0..3 {
            for _ in 0..2 {
                let p = game.current_player().unwrap();
                game.check(p).unwrap();
            }
        }
        assert_eq!(game.state, GamePhase::Complete);
        let result = game.get_hand_results().unwrap();
        assert_eq!(result.total_pot, 4);
        assert_eq!(result.pots.len(), 1);
        assert_eq!(result.pots[0].winners.len(), 2, "both play the board");
        assert_eq!(game.table.player(pid(1)).unwrap().stack, 100);
        assert_eq!(game.table.player(pid(2)).unwrap().stack, 100);
        let hand = &result.hands[&pid(1)][0];
        assert_eq!(hand.hand_description, "A high straight");
    }

    #[test]
    fn preflop_all_in_plays_to_showdown() {
        // Short stack shoves 40, big stack calls; main pot 80, chips
        // conserve at 240 and one player ends with at least 200.
        let mut game = nl_game(&[40, 200]);
        game.start_hand(true).unwrap();
        let sb = game.current_player().unwrap();
        let shove = game.table.player(sb).unwrap().stack + game.betting.player_bet(sb).amount;
        game.raise_to(sb, shove.min(40)).unwrap();
        let bb = game.current_player().unwrap();
        game.call(bb, game.betting.current_bet).unwrap();
        assert_eq!(game.betting.get_main_pot_amount(), 80);
        // The covered player checks down any remaining streets; the all-in
        // player checks through with nothing behind.
        let mut guard = 0;
        while game.state != GamePhase::Complete && guard < 20 {
            let p = game.current_player().unwrap();
            game.check(p).unwrap();
            guard += 1;
        }
        assert_eq!(game.state, GamePhase::Complete);
        let result = game.get_hand_results().unwrap();
        assert_eq!(result.total_pot, 80);
        assert_eq!(game.table.total_chips(), 240);
        let winner_stack = result
            .pots
            .iter()
            .flat_map(|p| p.winners.iter())
            .map(|w| game.table.player(*w).unwrap().stack)
            .max()
            .unwrap();
        assert!(winner_stack >= 80);
        game.assert_chip_conservation();
    }

    const MINI_STUD_RULES: &str = r#"{
        "game": "Mini Stud",
        "players": {"min": 2, "max": 7},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit"],
        "forcedBets": {"style": "bring-in", "rule": "low card", "bringInEval": "one_card_low"},
        "bettingOrder": {"initial": "bring_in", "subsequent": "high_hand"},
        "gamePlay": [
            {"bet": {"type": "antes"}, "name": "Post Antes"},
            {"deal": {"location": "player", "cards": [{"number": 2, "state": "face down"}, {"number": 1, "state": "face up"}]}, "name": "Deal Third Street"},
            {"bet": {"type": "bring-in"}, "name": "Post Bring-In"},
            {"bet": {"type": "small"}, "name": "Third Street Bet"},
            {"deal": {"location": "player", "cards": [{"number": 1, "state": "face up"}]}, "name": "Deal Fourth Street"},
            {"bet": {"type": "small"}, "name": "Fourth Street Bet"},
            {"deal": {"location": "player", "cards": [{"number": 1, "state": "face up"}]}, "name": "Deal Fifth Street"},
            {"bet": {"type": "big"}, "name": "Fifth Street Bet"},
            {"showdown": {"type": "final"}, "name": "Showdown"}
        ],
        "showdown": {
            "bestHand": [{"evaluationType": "high", "anyCards": 5}]
        }
    }"#;

    #[test]
    fn stud_bring_in_sequence() {
        use crate::cards::card::cards_from_str;
        use crate::eval::EvaluatorRegistry;
        use crate::rules::GameRules;
        use std::sync::Arc;
        let rules = GameRules::from_json(MINI_STUD_RULES).unwrap();
        let mut config = GameConfig::limit(10, 20);
        config.ante = 1;
        config.bring_in = Some(3);
        config.min_buyin = 100;
        config.max_buyin = 1000;
        let mut game = Game::new(rules, Arc::new(EvaluatorRegistry::new()), config).unwrap();
        for i in 0..4u32 {
            game.table
                .add_player(pid(i + 1), &format!("p{}", i + 1), 500, Some(i as usize))
                .unwrap();
        }
        // Button lands on p2, so third street deals p3, p4, p1, p2. Up
        // cards land Kh on p1, 2c on p2 (the bring-in), 9d on p3, Qs on p4.
        let top = cards_from_str("3h4h5h6h3s4s5s6s9dQsKh2cAs7cTh8c").unwrap();
        game.start_hand_stacked(&top).unwrap();
        // Antes are in and the low card is forced to act.
        assert_eq!(game.betting.get_ante_total(), 4);
        assert_eq!(game.betting.get_total_pot(), 4);
        assert_eq!(game.current_player(), Some(pid(2)));
        let actions = game.get_valid_actions(pid(2));
        assert!(actions
            .iter()
            .any(|a| a.action == PlayerAction::BringIn && a.min == Some(3)));
        assert!(actions
            .iter()
            .any(|a| a.action == PlayerAction::Bet && a.min == Some(10)));
        game.bring_in(pid(2), 3).unwrap();
        // Next player may call the bring-in or complete to the small bet.
        assert_eq!(game.current_player(), Some(pid(3)));
        let actions = game.get_valid_actions(pid(3));
        assert!(actions
            .iter()
            .any(|a| a.action == PlayerAction::Call && a.min == Some(3)));
        assert!(actions
            .iter()
            .any(|a| a.action == PlayerAction::Bet && a.min == Some(10)));
        game.bet(pid(3), 10).unwrap();
        // Facing the completed bet, a raise must go to exactly 20.
        let actions = game.get_valid_actions(pid(4));
        let raise = actions
            .iter()
            .find(|a| a.action == PlayerAction::Raise)
            .expect("raise row");
        assert_eq!((raise.min, raise.max), (Some(20), Some(20)));
        assert!(matches!(
            game.raise_to(pid(4), 15),
            Err(ActionError::InvalidAmount { .. })
        ));
        game.raise_to(pid(4), 20).unwrap();
        game.fold(pid(1)).unwrap();
        game.fold(pid(2)).unwrap();
        game.call(pid(3), 20).unwrap();
        // Fourth street: the best exposed hand (the ace) acts first.
        assert_eq!(game.current_player(), Some(pid(3)));
        game.check(pid(3)).unwrap();
        game.check(pid(4)).unwrap();
        // Fifth street moves to the big bet.
        assert_eq!(game.current_player(), Some(pid(3)));
        game.bet(pid(3), 20).unwrap();
        game.fold(pid(4)).unwrap();
        assert_eq!(game.state, GamePhase::Complete);
        let result = game.get_hand_results().unwrap();
        assert!(result.was_fold_win);
        assert_eq!(result.pots[0].winners, vec![pid(3)]);
        assert_eq!(game.table.player(pid(3)).unwrap().stack, 526);
        assert_eq!(game.table.total_chips(), 2000);
        game.assert_chip_conservation();
    }

    #[test]
    fn all_in_for_less_is_allowed() {
        let mut game = nl_game(&[40, 200]);
        game.start_hand(true).unwrap();
        let sb = game.current_player().unwrap();
        // SB shoves (player 1 or 2 depending on button); find their stack.
        let shove = game.table.player(sb).unwrap().stack
            + game.betting.player_bet(sb).amount;
        game.raise_to(sb, shove).unwrap();
        let bb = game.current_player().unwrap();
        game.call(bb, game.betting.current_bet).unwrap();
        // One of them was short: main pot capped at twice the short stack.
        assert_eq!(game.betting.get_main_pot_amount(), 80);
        game.assert_chip_conservation();
    }
}
