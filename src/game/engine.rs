//! The gameplay interpreter: walks the rules' step list, executes the
//! non-interactive steps (deals, forced bets, removals, die rolls) and
//! blocks on the current player for everything else. Callers push actions
//! in through `player_action`; the engine never waits on anything itself.

use super::betting::{BetType, BettingManager, BettingStructure};
use super::pot::PotSegment;
use super::result::GameResult;
use super::table::Table;
use crate::cards::card::{Card, Rank, Visibility, WildType};
use crate::cards::deck::{Deck, DeckType};
use crate::eval::{EvaluationType, EvaluatorRegistry};
use crate::rules::{
    BetStepKind, BettingStructureKind, CardColor, CardDealConfig, CardState, Condition,
    DealConfig, DealLocation, DeclareConfig, DiscardConfig, ExposeConfig, ForcedBetSpec,
    ForcedBetStyle, GameRules, OrderTag, PassConfig, SeparateConfig, StepAction, SubsequentOrder,
    WildCondition, WildRole, WildRule, WildRuleKind,
};
use crate::{Currency, EngineError, PlayerId};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Waiting,
    Dealing,
    Betting,
    Drawing,
    Showdown,
    ProtectionDecision,
    Complete,
}

/// Stake sizes. Limit games quote bets; no-limit and pot-limit quote
/// blinds, with the big blind doubling as the minimum bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stakes {
    Limit {
        small_bet: Currency,
        big_bet: Currency,
    },
    Blinds {
        small_blind: Currency,
        big_blind: Currency,
    },
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub structure: BettingStructureKind,
    pub stakes: Stakes,
    pub ante: Currency,
    pub bring_in: Option<Currency>,
    pub min_buyin: Currency,
    pub max_buyin: Currency,
    pub auto_progress: bool,
    pub named_bets: HashMap<String, Currency>,
}

impl GameConfig {
    pub fn no_limit(small_blind: Currency, big_blind: Currency) -> Self {
        GameConfig {
            structure: BettingStructureKind::NoLimit,
            stakes: Stakes::Blinds {
                small_blind,
                big_blind,
            },
            ante: 0,
            bring_in: None,
            min_buyin: 100,
            max_buyin: 2000,
            auto_progress: true,
            named_bets: HashMap::new(),
        }
    }

    pub fn limit(small_bet: Currency, big_bet: Currency) -> Self {
        GameConfig {
            structure: BettingStructureKind::Limit,
            stakes: Stakes::Limit { small_bet, big_bet },
            ..GameConfig::no_limit(0, 0)
        }
    }

    pub fn pot_limit(small_blind: Currency, big_blind: Currency) -> Self {
        GameConfig {
            structure: BettingStructureKind::PotLimit,
            ..GameConfig::no_limit(small_blind, big_blind)
        }
    }
}

/// Mid-round interactive config for the current non-betting step.
#[derive(Debug, Clone)]
pub(crate) enum RoundConfig {
    Discard(DiscardConfig),
    Draw(DiscardConfig),
    Separate(SeparateConfig),
    Expose(ExposeConfig),
    Pass(PassConfig),
    Declare(DeclareConfig),
}

#[derive(Debug, Clone)]
pub(crate) struct ProtectionDecision {
    pub card: Card,
    pub cost: Currency,
    pub cost_name: String,
    pub prompt: String,
}

/// Per-step scratch the action handler works against. Cleared whenever the
/// interpreter advances.
#[derive(Debug, Default)]
pub(crate) struct ActionState {
    pub current_round: Option<RoundConfig>,
    pub players_done: BTreeSet<PlayerId>,
    pub current_substep: Option<usize>,
    pub grouped_completed: BTreeSet<PlayerId>,
    pub player_completed_subactions: BTreeMap<PlayerId, BTreeSet<usize>>,
    pub pending_exposures: BTreeMap<PlayerId, Vec<Card>>,
    pub pending_passes: BTreeMap<PlayerId, (Vec<Card>, PlayerId)>,
    pub pending_declarations: BTreeMap<PlayerId, Vec<(i64, String)>>,
}

impl ActionState {
    fn clear_step_scratch(&mut self) {
        self.current_round = None;
        self.players_done.clear();
        self.current_substep = None;
        self.grouped_completed.clear();
        self.player_completed_subactions.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieMode {
    HighLow,
    HighOnly,
}

pub struct Game {
    pub rules: GameRules,
    pub table: Table,
    pub betting: BettingManager,
    pub evaluators: Arc<EvaluatorRegistry>,
    pub state: GamePhase,
    pub(crate) small_bet: Currency,
    pub(crate) big_bet: Currency,
    pub(crate) small_blind: Currency,
    pub(crate) big_blind: Currency,
    pub(crate) ante: Currency,
    pub(crate) bring_in: Currency,
    pub(crate) named_bets: HashMap<String, Currency>,
    pub(crate) auto_progress: bool,
    pub(crate) current_step: usize,
    pub(crate) current_player: Option<PlayerId>,
    pub(crate) acts: ActionState,
    pub(crate) game_choices: BTreeMap<String, String>,
    pub(crate) declarations: BTreeMap<PlayerId, BTreeMap<i64, String>>,
    pub(crate) dynamic_wild_rank: Option<Rank>,
    pub(crate) player_wild_ranks: BTreeMap<PlayerId, Rank>,
    pub(crate) pending_protection: BTreeMap<PlayerId, ProtectionDecision>,
    pub(crate) protection_order: Vec<PlayerId>,
    pub(crate) protection_wild_rules: Vec<WildRule>,
    pub(crate) die_mode: Option<DieMode>,
    pub(crate) bring_in_player_id: Option<PlayerId>,
    pub(crate) last_result: Option<GameResult>,
    pub(crate) hand_chips: Currency,
}

impl Game {
    pub fn new(
        rules: GameRules,
        evaluators: Arc<EvaluatorRegistry>,
        config: GameConfig,
    ) -> Result<Self, EngineError> {
        if !rules.betting_structures.contains(&config.structure) {
            return Err(EngineError::StructureNotAllowed);
        }
        let (structure, small_bet, big_bet, small_blind, big_blind) =
            match (config.structure, config.stakes) {
                (BettingStructureKind::Limit, Stakes::Limit { small_bet, big_bet }) => (
                    BettingStructure::Limit { small_bet, big_bet },
                    small_bet,
                    big_bet,
                    // The small blind in a limit game is half the small bet.
                    small_bet / 2,
                    small_bet,
                ),
                (BettingStructureKind::NoLimit, Stakes::Blinds { small_blind, big_blind }) => (
                    BettingStructure::NoLimit {
                        small_bet: big_blind,
                    },
                    big_blind,
                    big_blind,
                    small_blind,
                    big_blind,
                ),
                (BettingStructureKind::PotLimit, Stakes::Blinds { small_blind, big_blind }) => (
                    BettingStructure::PotLimit {
                        small_bet: big_blind,
                    },
                    big_blind,
                    big_blind,
                    small_blind,
                    big_blind,
                ),
                _ => return Err(EngineError::StructureNotAllowed),
            };
        // Fail fast on unknown evaluation types and missing tables.
        for t in rules.referenced_eval_types() {
            evaluators.ensure(t)?;
        }
        let bring_in = match config.bring_in {
            Some(b) => b,
            None if rules.forced_bets.style == ForcedBetStyle::BringIn => (small_bet / 2).max(1),
            None => 0,
        };
        let table = Table::new(
            rules.max_players,
            config.min_buyin,
            config.max_buyin,
            rules.deck_type,
        );
        let betting = BettingManager::new(structure, bring_in);
        Ok(Game {
            rules,
            table,
            betting,
            evaluators,
            state: GamePhase::Waiting,
            small_bet,
            big_bet,
            small_blind,
            big_blind,
            ante: config.ante,
            bring_in,
            named_bets: config.named_bets,
            auto_progress: config.auto_progress,
            current_step: 0,
            current_player: None,
            acts: ActionState::default(),
            game_choices: BTreeMap::new(),
            declarations: BTreeMap::new(),
            dynamic_wild_rank: None,
            player_wild_ranks: BTreeMap::new(),
            pending_protection: BTreeMap::new(),
            protection_order: vec![],
            protection_wild_rules: vec![],
            die_mode: None,
            bring_in_player_id: None,
            last_result: None,
            hand_chips: 0,
        })
    }

    pub fn add_player(
        &mut self,
        id: PlayerId,
        name: &str,
        buyin: Currency,
        preferred_seat: Option<usize>,
    ) -> Result<usize, EngineError> {
        let seat = self.table.add_player(id, name, buyin, preferred_seat)?;
        if self.table.player_count() >= self.rules.min_players
            && self.state == GamePhase::Waiting
        {
            self.state = GamePhase::Dealing;
        }
        Ok(seat)
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Result<Currency, EngineError> {
        let chips = self
            .table
            .remove_player(id)
            .ok_or(EngineError::PlayerNotFound)?;
        if self.table.player_count() < self.rules.min_players {
            self.state = GamePhase::Waiting;
        }
        Ok(chips)
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.current_player
    }

    pub fn phase(&self) -> GamePhase {
        self.state
    }

    /// The die-roll game mode, once a `roll_die` step has run.
    pub fn die_mode(&self) -> Option<DieMode> {
        self.die_mode
    }

    /// Who posted (or completed over) the bring-in this hand.
    pub fn bring_in_player(&self) -> Option<PlayerId> {
        self.bring_in_player_id
    }

    /// The prompt for a pending protection decision, if the player has one.
    pub fn protection_prompt(&self, pid: PlayerId) -> Option<&str> {
        self.pending_protection.get(&pid).map(|d| d.prompt.as_str())
    }

    pub fn get_hand_results(&self) -> Result<GameResult, EngineError> {
        if !matches!(self.state, GamePhase::Complete | GamePhase::Showdown) {
            return Err(EngineError::HandNotComplete);
        }
        self.last_result
            .clone()
            .ok_or(EngineError::NoResultAvailable)
    }

    pub fn start_hand(&mut self, shuffle: bool) -> Result<(), EngineError> {
        if self.table.player_count() < self.rules.min_players {
            return Err(EngineError::NotEnoughPlayers);
        }
        info!("starting hand of {}", self.rules.game);
        self.table.start_hand(true);
        self.table.deck = Deck::new(self.rules.deck_type);
        if shuffle {
            let seed = self.table.deck.shuffle();
            info!("deck shuffled; seed commitment {}", seed.commitment());
        }
        self.betting.new_hand();
        self.acts = ActionState::default();
        self.game_choices.clear();
        self.declarations.clear();
        self.dynamic_wild_rank = None;
        self.player_wild_ranks.clear();
        self.pending_protection.clear();
        self.protection_order.clear();
        self.protection_wild_rules.clear();
        self.die_mode = None;
        self.bring_in_player_id = None;
        self.last_result = None;
        self.hand_chips = self.table.total_chips();
        self.current_step = 0;
        self.state = GamePhase::Betting;
        self.current_player = None;
        self.process_current_step();
        Ok(())
    }

    /// Manual step advancement for hosts running with auto-progress off.
    pub fn advance(&mut self) {
        self.next_step();
    }

    /// Start a hand with known cards on top of the deck, first element
    /// dealt first. Test harness only.
    #[cfg(test)]
    pub(crate) fn start_hand_stacked(
        &mut self,
        top: &[crate::cards::Card],
    ) -> Result<(), EngineError> {
        if self.table.player_count() < self.rules.min_players {
            return Err(EngineError::NotEnoughPlayers);
        }
        self.table.start_hand(true);
        self.table.deck = Deck::new(self.rules.deck_type);
        self.table.deck.stack_top(top);
        self.betting.new_hand();
        self.acts = ActionState::default();
        self.game_choices.clear();
        self.declarations.clear();
        self.dynamic_wild_rank = None;
        self.player_wild_ranks.clear();
        self.pending_protection.clear();
        self.protection_order.clear();
        self.protection_wild_rules.clear();
        self.die_mode = None;
        self.bring_in_player_id = None;
        self.last_result = None;
        self.hand_chips = self.table.total_chips();
        self.current_step = 0;
        self.state = GamePhase::Betting;
        self.current_player = None;
        self.process_current_step();
        Ok(())
    }

    pub(crate) fn next_step(&mut self) {
        self.acts.clear_step_scratch();
        self.current_step += 1;
        self.process_current_step();
    }

    pub(crate) fn process_current_step(&mut self) {
        if self.current_step >= self.rules.gameplay.len() {
            info!("all steps complete - hand finished");
            self.state = GamePhase::Complete;
            self.current_player = None;
            return;
        }
        let step = self.rules.gameplay[self.current_step].clone();
        info!(
            "processing step {}: '{}' ({})",
            self.current_step,
            step.name,
            step.action.kind_name()
        );
        if self.step_should_skip(&step.conditional_state, &step.action) {
            info!("skipping step '{}' - condition not met", step.name);
            self.next_step();
            return;
        }
        match &step.action {
            StepAction::Grouped(subs) => self.begin_grouped_step(subs),
            StepAction::Bet(cfg) => self.begin_bet_step(cfg),
            StepAction::Deal(cfg) => {
                self.state = GamePhase::Dealing;
                if let Err(e) = self.handle_deal(cfg, None) {
                    warn!("deal failed: {}", e);
                }
                if self.state == GamePhase::ProtectionDecision {
                    return;
                }
                if self.auto_progress {
                    self.next_step();
                }
            }
            StepAction::Choose(cfg) => {
                self.state = GamePhase::Dealing;
                self.begin_choose(cfg);
            }
            StepAction::RollDie(cfg) => {
                self.state = GamePhase::Dealing;
                self.handle_roll_die(&cfg.subset);
                if self.auto_progress {
                    self.next_step();
                }
            }
            StepAction::Remove(cfg) => {
                self.state = GamePhase::Dealing;
                self.handle_remove(&cfg.kind, cfg.criteria.as_deref(), &cfg.subsets);
                if self.auto_progress {
                    self.next_step();
                }
            }
            StepAction::Discard(cfg) => {
                self.begin_card_round(RoundConfig::Discard(cfg.clone()));
            }
            StepAction::Draw(cfg) => {
                self.begin_card_round(RoundConfig::Draw(cfg.clone()));
            }
            StepAction::Separate(cfg) => {
                self.begin_card_round(RoundConfig::Separate(cfg.clone()));
            }
            StepAction::Expose(cfg) => {
                self.begin_card_round(RoundConfig::Expose(cfg.clone()));
            }
            StepAction::Pass(cfg) => {
                self.begin_card_round(RoundConfig::Pass(cfg.clone()));
            }
            StepAction::Declare(cfg) => {
                self.begin_card_round(RoundConfig::Declare(cfg.clone()));
            }
            StepAction::Showdown(_) => {
                info!("moving to showdown");
                self.state = GamePhase::Showdown;
                let result = self.run_showdown();
                self.last_result = Some(result);
                self.state = GamePhase::Complete;
                self.current_player = None;
            }
        }
    }

    fn begin_bet_step(&mut self, cfg: &crate::rules::BetStepConfig) {
        self.state = GamePhase::Betting;
        if cfg.kind.is_forced() {
            self.handle_forced_bets(cfg.kind);
            // Antes and blinds complete on their own; the bring-in blocks on
            // the forced player's choice to bring in or complete.
            if cfg.kind != BetStepKind::BringIn && self.auto_progress {
                self.next_step();
            }
        } else {
            let preserve = self.first_voluntary_bet_step() == Some(self.current_step);
            debug!("starting betting round (preserve={})", preserve);
            self.betting.new_round(preserve);
            self.current_player = self.next_player(true);
        }
    }

    fn begin_grouped_step(&mut self, subs: &[StepAction]) {
        let active = self.table.active_player_ids();
        self.acts.player_completed_subactions =
            active.iter().map(|p| (*p, BTreeSet::new())).collect();
        self.acts.current_substep = Some(0);
        self.acts.grouped_completed.clear();
        let first = subs[0].clone();
        match first {
            StepAction::Bet(cfg) => {
                self.state = GamePhase::Betting;
                if cfg.kind.is_forced() {
                    self.handle_forced_bets(cfg.kind);
                    if cfg.kind != BetStepKind::BringIn && self.auto_progress {
                        self.next_step();
                    }
                } else {
                    let preserve = self.betting.betting_round == 0;
                    self.betting.new_round(preserve);
                    self.current_player = self.next_player(true);
                }
            }
            StepAction::Discard(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Discard(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Draw(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Draw(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Separate(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Separate(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Expose(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Expose(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Pass(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Pass(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Declare(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Declare(cfg));
                self.current_player = self.next_player(true);
            }
            StepAction::Deal(cfg) => {
                // A leading deal inside a group runs for everyone, then the
                // group moves to its second sub-action.
                self.state = GamePhase::Dealing;
                if let Err(e) = self.handle_deal(&cfg, None) {
                    warn!("grouped deal failed: {}", e);
                }
                for done in self.acts.player_completed_subactions.values_mut() {
                    done.insert(0);
                }
                if subs.len() == 1 {
                    if self.auto_progress {
                        self.next_step();
                    }
                } else {
                    self.acts.current_substep = Some(1);
                    self.enter_substep(1);
                    self.current_player = self.next_player(true);
                }
            }
            other => {
                warn!(
                    "unsupported first grouped sub-action '{}'",
                    other.kind_name()
                );
            }
        }
    }

    /// Set game phase and scratch for substep `idx` of the current grouped
    /// step, without touching the current player.
    pub(crate) fn enter_substep(&mut self, idx: usize) {
        let StepAction::Grouped(subs) = &self.rules.gameplay[self.current_step].action else {
            return;
        };
        let sub = subs[idx].clone();
        match sub {
            StepAction::Bet(cfg) => {
                self.state = GamePhase::Betting;
                if !cfg.kind.is_forced() {
                    // Open the betting round only when the first player
                    // reaches this substep; later players join the round in
                    // progress.
                    let nobody_there_yet = self
                        .acts
                        .player_completed_subactions
                        .values()
                        .all(|done| !done.contains(&idx));
                    let active = self.table.active_player_ids();
                    if nobody_there_yet && !self.betting.round_complete(&active) {
                        let preserve = self.is_first_betting_round_here(idx);
                        self.betting.new_round(preserve);
                    }
                }
            }
            StepAction::Discard(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Discard(cfg));
            }
            StepAction::Draw(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Draw(cfg));
            }
            StepAction::Separate(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Separate(cfg));
            }
            StepAction::Expose(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Expose(cfg));
            }
            StepAction::Pass(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Pass(cfg));
            }
            StepAction::Declare(cfg) => {
                self.state = GamePhase::Drawing;
                self.acts.current_round = Some(RoundConfig::Declare(cfg));
            }
            StepAction::Deal(_) => {
                self.state = GamePhase::Dealing;
            }
            other => warn!("unsupported grouped sub-action '{}'", other.kind_name()),
        }
    }

    fn is_first_betting_round_here(&self, substep: usize) -> bool {
        for (i, step) in self.rules.gameplay.iter().enumerate() {
            if self.step_should_skip(&step.conditional_state, &step.action) {
                continue;
            }
            match &step.action {
                StepAction::Bet(c) if c.kind == BetStepKind::Small => {
                    return i == self.current_step;
                }
                StepAction::Grouped(subs) => {
                    for (j, sub) in subs.iter().enumerate() {
                        if let StepAction::Bet(c) = sub {
                            if c.kind == BetStepKind::Small {
                                return i == self.current_step && j == substep;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn begin_card_round(&mut self, round: RoundConfig) {
        self.state = GamePhase::Drawing;
        self.acts.current_round = Some(round);
        self.acts.players_done.clear();
        self.current_player = self.next_player(true);
    }

    fn begin_choose(&mut self, cfg: &crate::rules::ChooseConfig) {
        if cfg.possible_values.is_empty() {
            warn!("choose step with no possible values");
            if self.auto_progress {
                self.next_step();
            }
            return;
        }
        // UTG chooses; short-handed (three or fewer) the button chooses.
        let mut chooser = self.table.player_after_big_blind();
        if self.table.active_count() <= 3 {
            if let Some(btn) = self
                .table
                .player_with_position(super::player::Position::BUTTON)
            {
                chooser = Some(btn);
            }
        }
        match chooser {
            Some(pid) => {
                info!("{} to choose from {:?}", pid, cfg.possible_values);
                self.current_player = Some(pid);
            }
            None => warn!("could not determine choosing player"),
        }
    }

    fn first_voluntary_bet_step(&self) -> Option<usize> {
        for (i, step) in self.rules.gameplay.iter().enumerate() {
            if self.step_should_skip(&step.conditional_state, &step.action) {
                continue;
            }
            match &step.action {
                StepAction::Bet(c) if c.kind == BetStepKind::Small => return Some(i),
                StepAction::Grouped(subs) => {
                    if subs.iter().any(
                        |s| matches!(s, StepAction::Bet(c) if c.kind == BetStepKind::Small),
                    ) {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn step_should_skip(
        &self,
        step_cond: &Option<crate::rules::ConditionalState>,
        action: &StepAction,
    ) -> bool {
        if let Some(cond) = step_cond {
            return !self.check_condition(&cond.condition);
        }
        if let Some(cond) = action.inner_conditional() {
            // Deal-level conditionals with per-player states are handled at
            // deal time, not as a skip.
            if cond.true_state.is_none() && cond.false_state.is_none() {
                return !self.check_condition(&cond.condition);
            }
        }
        false
    }

    pub(crate) fn check_condition(&self, condition: &Condition) -> bool {
        match condition {
            Condition::AllExposed => self
                .table
                .players()
                .filter(|p| p.is_active)
                .all(|p| p.hand.cards().iter().all(|c| c.is_face_up())),
            Condition::AnyExposed => self
                .table
                .players()
                .filter(|p| p.is_active)
                .any(|p| p.hand.cards().iter().any(|c| c.is_face_up())),
            Condition::NoneExposed => self
                .table
                .players()
                .filter(|p| p.is_active)
                .all(|p| p.hand.cards().iter().all(|c| !c.is_face_up())),
            Condition::BoardComposition {
                subset,
                check,
                color,
                min_count,
            } => {
                if check.as_deref() != Some("color") {
                    warn!("unsupported board_composition check {:?}", check);
                    return false;
                }
                let cards = self
                    .table
                    .community_cards
                    .get(subset)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]);
                let count = cards
                    .iter()
                    .filter(|c| match color {
                        CardColor::Black => c.is_black(),
                        CardColor::Red => c.is_red(),
                    })
                    .count();
                count >= *min_count
            }
            Condition::PlayerChoice {
                subset,
                value,
                values,
            } => {
                let actual = self.game_choices.get(subset);
                match (value, actual) {
                    (Some(expected), Some(actual)) => actual == expected,
                    (None, Some(actual)) => values.iter().any(|v| v == actual),
                    _ => false,
                }
            }
        }
    }

    /// The forced-bet configuration in effect, honoring conditional orders.
    pub(crate) fn effective_forced_bets(&self) -> ForcedBetSpec {
        if !self.rules.forced_bets.conditional_orders.is_empty() {
            for co in &self.rules.forced_bets.conditional_orders {
                if self.check_condition(&co.condition) {
                    return co.forced_bet.clone();
                }
            }
            if let Some(d) = &self.rules.forced_bets.default {
                return d.clone();
            }
        }
        self.rules.forced_bets.base_spec()
    }

    pub(crate) fn handle_forced_bets(&mut self, kind: BetStepKind) {
        info!("handling forced bets: {:?}", kind);
        match kind {
            BetStepKind::Antes => {
                for pid in self.table.position_order(false) {
                    self.post_forced(pid, self.ante, BetType::Ante, true);
                }
            }
            BetStepKind::Blinds => {
                let dealer_blind = self.rules.betting_order.initial == OrderTag::Dealer
                    || self.effective_forced_bets().style == ForcedBetStyle::DealerBlind;
                let ante_player;
                if dealer_blind {
                    let btn = self
                        .table
                        .player_with_position(super::player::Position::BUTTON);
                    if let Some(btn) = btn {
                        self.post_forced(btn, self.big_blind, BetType::Blind, false);
                    }
                    ante_player = btn;
                } else {
                    let sb = self
                        .table
                        .player_with_position(super::player::Position::SMALL_BLIND);
                    let bb = self
                        .table
                        .player_with_position(super::player::Position::BIG_BLIND);
                    if let Some(sb) = sb {
                        self.post_forced(sb, self.small_blind, BetType::Blind, false);
                    }
                    if let Some(bb) = bb {
                        self.post_forced(bb, self.big_blind, BetType::Blind, false);
                    }
                    ante_player = bb;
                }
                if self.ante > 0 {
                    if let Some(pid) = ante_player {
                        self.post_forced(pid, self.ante, BetType::Ante, true);
                    }
                }
            }
            BetStepKind::BringIn => {
                let eval_type = self
                    .effective_forced_bets()
                    .bring_in_eval
                    .unwrap_or(EvaluationType::OneCardLow);
                match self.table.bring_in_player(&self.evaluators, eval_type) {
                    Some(pid) => {
                        if let Some(p) = self.table.player_mut(pid) {
                            p.position |= super::player::Position::BRING_IN;
                        }
                        info!("bring-in is on {}", pid);
                        self.current_player = Some(pid);
                    }
                    None => {
                        warn!("no bring-in player determined");
                        self.current_player = self.table.active_player_ids().first().copied();
                    }
                }
            }
            _ => unreachable!("not a forced bet: {:?}", kind),
        }
        self.betting.new_round(true);
        if kind != BetStepKind::BringIn {
            self.current_player = None;
        }
    }

    fn post_forced(&mut self, pid: PlayerId, amount: Currency, bet_type: BetType, is_ante: bool) {
        if amount <= 0 {
            return;
        }
        let Some(p) = self.table.player_mut(pid) else {
            return;
        };
        let stack_before = p.stack;
        let posted = amount.min(stack_before);
        if posted <= 0 {
            return;
        }
        p.stack -= posted;
        let name = p.name.clone();
        self.betting
            .place_bet(pid, posted, stack_before, true, bet_type, is_ante)
            .expect("forced bets skip validation");
        info!(
            "{} posts {} of {}",
            name,
            match bet_type {
                BetType::Ante => "ante",
                BetType::BringIn => "bring-in",
                _ => "blind",
            },
            posted
        );
    }

    fn subsequent_order(&self) -> OrderTag {
        match &self.rules.betting_order.subsequent {
            SubsequentOrder::Simple(tag) => *tag,
            SubsequentOrder::Conditional {
                conditional_orders,
                default,
            } => {
                for co in conditional_orders {
                    if self.check_condition(&co.condition) {
                        return co.order;
                    }
                }
                *default
            }
        }
    }

    fn current_step_is_voluntary_bet(&self) -> bool {
        let Some(step) = self.rules.gameplay.get(self.current_step) else {
            return false;
        };
        match &step.action {
            StepAction::Bet(c) => !c.kind.is_forced(),
            StepAction::Grouped(subs) => {
                let idx = self.acts.current_substep.unwrap_or(0);
                matches!(subs.get(idx), Some(StepAction::Bet(c)) if !c.kind.is_forced())
            }
            _ => false,
        }
    }

    /// Who acts next. With `round_start`, picks the opener for the step per
    /// the rules' betting order; otherwise walks left from the current
    /// player, skipping folded seats.
    pub(crate) fn next_player(&self, round_start: bool) -> Option<PlayerId> {
        let active = self.table.active_player_ids();
        if active.is_empty() {
            return None;
        }
        if round_start {
            let is_voluntary = self.current_step_is_voluntary_bet();
            let is_first_after_blinds = self.betting.betting_round == 0
                && is_voluntary
                && self.betting.last_forced_bettor.is_some();
            if is_first_after_blinds {
                // A player who just chose the game variant leads the first
                // round regardless of position.
                if !self.game_choices.is_empty()
                    && self.current_player.is_some()
                    && self.acts.current_substep.unwrap_or(0) == 0
                {
                    return self.current_player;
                }
                let last = self.betting.last_forced_bettor.unwrap();
                return self
                    .table
                    .next_active_player(last)
                    .or_else(|| active.first().copied());
            }
            let order = self.subsequent_order();
            debug!("round start using order {:?}", order);
            let picked = match order {
                OrderTag::Dealer => self.table.next_active_after_seat(self.table.button_pos),
                OrderTag::AfterBigBlind => self.table.player_after_big_blind(),
                OrderTag::BringIn => {
                    let eval_type = self
                        .effective_forced_bets()
                        .bring_in_eval
                        .unwrap_or(EvaluationType::OneCardLow);
                    self.table.bring_in_player(&self.evaluators, eval_type)
                }
                OrderTag::HighHand => {
                    // The best hand acts first in the game's own direction,
                    // which is the opposite of the bring-in criterion: a
                    // low-card bring-in means a high game, and vice versa.
                    let spec = self.effective_forced_bets();
                    let low = spec
                        .rule
                        .as_deref()
                        .map(|r| r.contains("high"))
                        .unwrap_or(false);
                    self.table.player_with_best_upcards(&self.evaluators, low)
                }
                OrderTag::LastActor => self
                    .betting
                    .last_actor_id
                    .filter(|pid| self.table.player(*pid).is_some())
                    .and_then(|pid| self.table.next_active_player(pid))
                    .or_else(|| self.table.next_active_after_seat(self.table.button_pos)),
            };
            return picked.or_else(|| active.first().copied());
        }
        match self.current_player {
            Some(pid) => self
                .table
                .next_active_player(pid)
                .or_else(|| active.first().copied()),
            None => active.first().copied(),
        }
    }

    pub(crate) fn handle_deal(
        &mut self,
        cfg: &DealConfig,
        player_id: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        if let Some(cond) = &cfg.conditional_state {
            // A bare conditional (no per-player deal states) gates the whole
            // deal.
            if cond.true_state.is_none()
                && cond.false_state.is_none()
                && !self.check_condition(&cond.condition)
            {
                info!("conditional deal skipped - condition not met");
                return Ok(());
            }
        }
        for card_cfg in &cfg.cards {
            if card_cfg.protection_option.is_some() && cfg.location == DealLocation::Player {
                self.protected_deal(card_cfg, &cfg.wild_cards)?;
            } else {
                self.standard_deal(cfg, card_cfg, player_id)?;
            }
        }
        if cfg
            .wild_cards
            .iter()
            .any(|r| r.kind == WildRuleKind::LowestHole)
        {
            self.update_player_wild_ranks(&cfg.wild_cards);
        }
        Ok(())
    }

    fn deal_targets(&self, player_id: Option<PlayerId>) -> Vec<PlayerId> {
        match player_id {
            Some(pid) => match self.table.player(pid) {
                Some(p) if p.is_active => vec![pid],
                _ => {
                    warn!("deal target {:?} not found or inactive", player_id);
                    vec![]
                }
            },
            None => {
                // Deal order starts left of the button.
                let mut order = self.table.position_order(false);
                let button_first = order
                    .first()
                    .and_then(|p| self.table.player(*p))
                    .map(|p| p.seat == self.table.button_pos)
                    .unwrap_or(false);
                if button_first {
                    order.rotate_left(1);
                }
                order
            }
        }
    }

    fn exposure_condition_met(&self, pid: PlayerId, condition: &Condition) -> bool {
        let Some(p) = self.table.player(pid) else {
            return false;
        };
        let cards = p.hand.cards();
        match condition {
            Condition::AllExposed => cards.iter().all(|c| c.is_face_up()),
            Condition::AnyExposed => cards.iter().any(|c| c.is_face_up()),
            Condition::NoneExposed => cards.iter().all(|c| !c.is_face_up()),
            other => self.check_condition(other),
        }
    }

    fn standard_deal(
        &mut self,
        cfg: &DealConfig,
        card_cfg: &CardDealConfig,
        player_id: Option<PlayerId>,
    ) -> Result<(), EngineError> {
        // Conditional per-player orientation: deal up or down depending on
        // each player's exposed cards.
        if let (Some(cond), None) = (&cfg.conditional_state, &card_cfg.state) {
            if cond.true_state.is_some() || cond.false_state.is_some() {
                for pid in self.deal_targets(player_id) {
                    let met = self.exposure_condition_met(pid, &cond.condition);
                    let state = if met {
                        cond.true_state
                    } else {
                        cond.false_state
                    }
                    .unwrap_or(CardState::FaceDown);
                    if state == CardState::None {
                        continue;
                    }
                    let face_up = state == CardState::FaceUp;
                    for _ in 0..card_cfg.number {
                        let card = self.table.deal_card_to_player(
                            pid,
                            &card_cfg.hole_subset,
                            face_up,
                        )?;
                        self.apply_wild_rules_to_card(
                            card,
                            &cfg.wild_cards,
                            face_up,
                            Some(pid),
                        );
                    }
                }
                return Ok(());
            }
        }
        let state = card_cfg.state.unwrap_or(CardState::FaceDown);
        if state == CardState::None {
            info!("skipping deal with 'none' state");
            return Ok(());
        }
        let face_up = state == CardState::FaceUp;
        match cfg.location {
            DealLocation::Player => match player_id {
                Some(pid) => {
                    debug!("dealing {} card(s) to {}", card_cfg.number, pid);
                    for _ in 0..card_cfg.number {
                        let card = self.table.deal_card_to_player(
                            pid,
                            &card_cfg.hole_subset,
                            face_up,
                        )?;
                        self.apply_wild_rules_to_card(card, &cfg.wild_cards, face_up, Some(pid));
                    }
                }
                None => {
                    debug!(
                        "dealing {} card(s) to each player (subset '{}')",
                        card_cfg.number, card_cfg.hole_subset
                    );
                    let dealt = self.table.deal_hole_cards(
                        card_cfg.number,
                        &card_cfg.hole_subset,
                        face_up,
                    )?;
                    for (pid, cards) in dealt {
                        for card in cards {
                            self.apply_wild_rules_to_card(
                                card,
                                &cfg.wild_cards,
                                face_up,
                                Some(pid),
                            );
                        }
                    }
                }
            },
            DealLocation::Community => {
                let subsets = card_cfg.subset.names();
                debug!(
                    "dealing {} card(s) to community subsets {:?}",
                    card_cfg.number, subsets
                );
                let dealt = self
                    .table
                    .deal_community_cards(card_cfg.number, &subsets, face_up)?;
                for card in dealt {
                    self.apply_wild_rules_to_card(card, &cfg.wild_cards, face_up, None);
                }
            }
        }
        Ok(())
    }

    fn protected_deal(
        &mut self,
        card_cfg: &CardDealConfig,
        wild_rules: &[WildRule],
    ) -> Result<(), EngineError> {
        let option = card_cfg.protection_option.as_ref().unwrap();
        let cost = self.named_bets.get(&option.cost).copied().unwrap_or(0);
        self.protection_wild_rules = wild_rules.to_vec();
        self.protection_order.clear();
        for pid in self.deal_targets(None) {
            // Face down first; the owner can pay to flip it.
            let card = self
                .table
                .deal_card_to_player(pid, &card_cfg.hole_subset, false)?;
            self.apply_wild_rules_to_card(card, wild_rules, false, Some(pid));
            let prompt = option
                .prompt
                .clone()
                .unwrap_or_else(|| format!("Pay {} to flip {} face up?", cost, card));
            self.pending_protection.insert(
                pid,
                ProtectionDecision {
                    card,
                    cost,
                    cost_name: option.cost.clone(),
                    prompt,
                },
            );
            self.protection_order.push(pid);
            info!("dealt {} to {} face down - protection for {}", card, pid, cost);
        }
        if !self.pending_protection.is_empty() {
            self.state = GamePhase::ProtectionDecision;
            self.current_player = self.protection_order.first().copied();
        }
        Ok(())
    }

    pub(crate) fn complete_protection_round(&mut self) {
        let rules = std::mem::take(&mut self.protection_wild_rules);
        if rules.iter().any(|r| r.kind == WildRuleKind::LowestHole) {
            self.update_player_wild_ranks(&rules);
        }
        self.protection_order.clear();
        self.state = GamePhase::Dealing;
        self.current_player = None;
        info!("protection round complete");
    }

    fn wild_type_for_role(role: WildRole) -> WildType {
        match role {
            WildRole::Bug => WildType::Bug,
            WildRole::Wild => WildType::Named,
            WildRole::Conditional => WildType::Matching,
        }
    }

    fn set_card_wild(&mut self, card: Card, owner: Option<PlayerId>, wild: WildType) {
        match owner {
            Some(pid) => {
                if let Some(p) = self.table.player_mut(pid) {
                    p.hand.make_wild(card, wild);
                }
            }
            None => {
                for cards in self.table.community_cards.values_mut() {
                    for c in cards.iter_mut() {
                        if *c == card {
                            c.make_wild(wild);
                        }
                    }
                }
            }
        }
    }

    fn apply_wild_rules_to_card(
        &mut self,
        card: Card,
        rules: &[WildRule],
        face_up: bool,
        owner: Option<PlayerId>,
    ) {
        for rule in rules {
            match rule.kind {
                // Recomputed after the whole deal, not per card.
                WildRuleKind::LowestHole => continue,
                WildRuleKind::LastCommunityCard => {
                    let wild = Self::wild_type_for_role(rule.role);
                    self.set_card_wild(card, owner, wild);
                    match rule.match_kind {
                        crate::rules::WildMatch::Rank => {
                            self.dynamic_wild_rank = Some(card.rank);
                            if rule.scope.as_deref() != Some("player") {
                                self.make_existing_rank_wild(card.rank, wild);
                            }
                            info!("{} rank is now wild", card.rank);
                        }
                        crate::rules::WildMatch::Card => {
                            info!("only {} is wild", card);
                        }
                        crate::rules::WildMatch::Suit => {
                            self.make_existing_suit_wild(card.suit, wild);
                            info!("{} suit is now wild", card.suit);
                        }
                    }
                    continue;
                }
                WildRuleKind::Joker | WildRuleKind::Rank => {}
            }
            let matches = match rule.kind {
                WildRuleKind::Joker => card.rank == Rank::Joker,
                WildRuleKind::Rank => Some(card.rank) == rule.rank,
                _ => false,
            };
            if !matches {
                continue;
            }
            if rule.role == WildRole::Conditional {
                if let Some(WildCondition {
                    visibility,
                    true_role,
                    false_role,
                }) = &rule.condition
                {
                    let wants_up = *visibility == CardState::FaceUp;
                    let role = if wants_up == face_up {
                        *true_role
                    } else {
                        *false_role
                    };
                    self.set_card_wild(card, owner, Self::wild_type_for_role(role));
                    debug!("conditional wild: {} as {:?}", card, role);
                    continue;
                }
            }
            self.set_card_wild(card, owner, Self::wild_type_for_role(rule.role));
            debug!("wild rule {:?} applied to {}", rule.kind, card);
        }
    }

    fn make_existing_rank_wild(&mut self, rank: Rank, wild: WildType) {
        let pids: Vec<PlayerId> = self.table.players().map(|p| p.id).collect();
        for pid in pids {
            let cards: Vec<Card> = self
                .table
                .player(pid)
                .map(|p| p.hand.cards().to_vec())
                .unwrap_or_default();
            for c in cards {
                if c.rank == rank && !c.is_wild() {
                    self.set_card_wild(c, Some(pid), wild);
                }
            }
        }
        for cards in self.table.community_cards.values_mut() {
            for c in cards.iter_mut() {
                if c.rank == rank && !c.is_wild() {
                    c.make_wild(wild);
                }
            }
        }
    }

    fn make_existing_suit_wild(&mut self, suit: crate::cards::card::Suit, wild: WildType) {
        let pids: Vec<PlayerId> = self.table.players().map(|p| p.id).collect();
        for pid in pids {
            let cards: Vec<Card> = self
                .table
                .player(pid)
                .map(|p| p.hand.cards().to_vec())
                .unwrap_or_default();
            for c in cards {
                if c.suit == suit && !c.is_wild() {
                    self.set_card_wild(c, Some(pid), wild);
                }
            }
        }
        for cards in self.table.community_cards.values_mut() {
            for c in cards.iter_mut() {
                if c.suit == suit && !c.is_wild() {
                    c.make_wild(wild);
                }
            }
        }
    }

    /// Re-derive each player's lowest-hole wild rank after a deal (or a
    /// protection flip) changed their cards.
    pub(crate) fn update_player_wild_ranks(&mut self, rules: &[WildRule]) {
        for rule in rules {
            if rule.kind != WildRuleKind::LowestHole {
                continue;
            }
            let wanted = match rule.visibility {
                Some(CardState::FaceUp) => Visibility::FaceUp,
                _ => Visibility::FaceDown,
            };
            let wild = Self::wild_type_for_role(rule.role);
            for pid in self.table.active_player_ids() {
                let cards: Vec<Card> = self
                    .table
                    .player(pid)
                    .map(|p| p.hand.cards().to_vec())
                    .unwrap_or_default();
                // Ace plays high here: the deuce is the lowest hole card.
                let new_rank = cards
                    .iter()
                    .filter(|c| c.visibility == wanted && c.rank != Rank::Joker)
                    .min_by_key(|c| c.rank.value())
                    .map(|c| c.rank);
                let old_rank = self.player_wild_ranks.get(&pid).copied();
                if old_rank == new_rank {
                    continue;
                }
                if let Some(old) = old_rank {
                    for c in cards.iter().filter(|c| c.rank == old) {
                        if let Some(p) = self.table.player_mut(pid) {
                            p.hand.clear_wild(*c);
                        }
                    }
                }
                if let Some(new) = new_rank {
                    for c in cards.iter().filter(|c| c.rank == new) {
                        self.set_card_wild(*c, Some(pid), wild);
                    }
                    self.player_wild_ranks.insert(pid, new);
                } else {
                    self.player_wild_ranks.remove(&pid);
                }
                debug!("{} wild rank {:?} -> {:?}", pid, old_rank, new_rank);
            }
        }
    }

    pub(crate) fn handle_roll_die(&mut self, subset: &str) {
        let mut die = Deck::new(DeckType::Die);
        die.shuffle();
        let Ok(card) = die.deal_card(true) else {
            return;
        };
        self.table
            .community_cards
            .entry(subset.to_string())
            .or_default()
            .push(card);
        let value = card.rank.die_value();
        let mode = if value <= 3 {
            DieMode::HighLow
        } else {
            DieMode::HighOnly
        };
        self.die_mode = Some(mode);
        // Expose the mode to the condition language as a pseudo-choice.
        self.game_choices.insert(
            "game_mode".to_string(),
            match mode {
                DieMode::HighLow => "high_low".to_string(),
                DieMode::HighOnly => "high_only".to_string(),
            },
        );
        info!("rolled {} - game mode {:?}", value, mode);
    }

    pub(crate) fn handle_remove(
        &mut self,
        kind: &str,
        criteria: Option<&str>,
        subsets: &[String],
    ) {
        if kind != "subset" {
            warn!("unsupported remove type '{}'", kind);
            return;
        }
        if !matches!(
            criteria,
            Some("Lowest River Card") | Some("lowest_river_card_unless_all_same")
        ) {
            warn!("unsupported remove criteria {:?}", criteria);
            return;
        }
        let mut river_values: Vec<(String, u8)> = vec![];
        for name in subsets {
            match self.table.community_cards.get(name) {
                Some(cards) if cards.len() >= 5 => {
                    river_values.push((name.clone(), cards.last().unwrap().rank.value()));
                }
                _ => warn!("subset '{}' too short for river removal", name),
            }
        }
        if river_values.is_empty() {
            return;
        }
        let first = river_values[0].1;
        if river_values.iter().all(|(_, v)| *v == first) {
            info!("all river cards share a rank; keeping every board");
            return;
        }
        let lowest = river_values.iter().map(|(_, v)| *v).min().unwrap();
        for (name, v) in river_values {
            if v == lowest {
                self.table.community_cards.remove(&name);
                info!("removed board '{}' for lowest river card", name);
            }
        }
    }

    /// All but one player folded: the last one standing takes everything,
    /// no evaluation.
    pub(crate) fn handle_fold_win(&mut self) {
        let active = self.table.active_player_ids();
        let result = self.run_fold_win(&active);
        self.last_result = Some(result);
        self.state = GamePhase::Complete;
        self.current_player = None;
    }

    pub(crate) fn pot_segments(&self) -> Vec<(Option<usize>, PotSegment)> {
        let mut v = vec![(None, self.betting.pot.main_pot.clone())];
        for (i, s) in self.betting.pot.side_pots.iter().enumerate() {
            v.push((Some(i), s.clone()));
        }
        v
    }

    pub(crate) fn assert_chip_conservation(&self) {
        debug_assert_eq!(
            self.table.total_chips() + self.betting.pot.total(),
            self.hand_chips,
            "chip conservation violated"
        );
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    pub const HOLDEM_RULES: &str = r#"{
        "game": "Texas Hold'em",
        "players": {"min": 2, "max": 9},
        "deck": {"type": "standard", "cards": 52},
        "bettingStructures": ["Limit", "No Limit", "Pot Limit"],
        "forcedBets": {"style": "blinds"},
        "bettingOrder": {"initial": "after_big_blind", "subsequent": "dealer"},
        "gamePlay": [
            {"bet": {"type": "blinds"}, "name": "Post Blinds"},
            {"deal": {"location": "player", "cards": [{"number": 2, "state": "face down"}]}, "name": "Deal Hole Cards"},
            {"bet": {"type": "small"}, "name": "Pre-Flop Bet"},
            {"deal": {"location": "community", "cards": [{"number": 3, "state": "face up"}]}, "name": "Deal Flop"},
            {"bet": {"type": "small"}, "name": "Flop Bet"},
            {"deal": {"location": "community", "cards": [{"number": 1, "state": "face up"}]}, "name": "Deal Turn"},
            {"bet": {"type": "big"}, "name": "Turn Bet"},
            {"deal": {"location": "community", "cards": [{"number": 1, "state": "face up"}]}, "name": "Deal River"},
            {"bet": {"type": "big"}, "name": "River Bet"},
            {"showdown": {"type": "final"}, "name": "Showdown"}
        ],
        "showdown": {
            "bestHand": [{"name": "High Hand", "evaluationType": "high", "anyCards": 5}]
        }
    }"#;

    pub fn holdem_game(stacks: &[Currency], config: GameConfig) -> Game {
        let rules = GameRules::from_json(HOLDEM_RULES).unwrap();
        let mut game = Game::new(rules, Arc::new(EvaluatorRegistry::new()), config).unwrap();
        for (i, stack) in stacks.iter().enumerate() {
            let pid = PlayerId(i as u32 + 1);
            game.table
                .add_player(pid, &format!("p{}", i + 1), *stack, Some(i))
                .unwrap();
        }
        game
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::holdem_game;
    use super::*;

    #[test]
    fn construction_checks_structure() {
        let rules = GameRules::from_json(testutil::HOLDEM_RULES).unwrap();
        let mut limited = rules.clone();
        limited.betting_structures = vec![BettingStructureKind::Limit];
        let err = Game::new(
            limited,
            Arc::new(EvaluatorRegistry::new()),
            GameConfig::no_limit(1, 2),
        );
        assert!(matches!(err, Err(EngineError::StructureNotAllowed)));
    }

    #[test]
    fn start_hand_posts_blinds_and_deals() {
        let mut game = holdem_game(&[500, 500, 500], {
            let mut c = GameConfig::no_limit(5, 10);
            c.min_buyin = 100;
            c.max_buyin = 1000;
            c
        });
        game.start_hand(true).unwrap();
        // Blinds in, everyone dealt two cards, action on the player after
        // the big blind.
        assert_eq!(game.betting.get_total_pot(), 15);
        assert_eq!(game.betting.current_bet, 10);
        assert_eq!(game.state, GamePhase::Betting);
        for p in game.table.players() {
            assert_eq!(p.hand.len(), 2);
        }
        assert!(game.current_player().is_some());
        game.assert_chip_conservation();
    }

    #[test]
    fn start_hand_requires_players() {
        let mut game = holdem_game(&[500], GameConfig::no_limit(5, 10));
        assert!(matches!(
            game.start_hand(true),
            Err(EngineError::NotEnoughPlayers)
        ));
    }

    #[test]
    fn die_roll_sets_mode() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.handle_roll_die("Die");
        assert!(game.die_mode.is_some());
        assert!(game.game_choices.contains_key("game_mode"));
        assert_eq!(game.table.community_cards["Die"].len(), 1);
    }

    #[test]
    fn remove_lowest_river_board() {
        use crate::cards::card::cards_from_str;
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        let boards = [
            ("Board 1", "2c3c4c5cKh"),
            ("Board 2", "2d3d4d5d9h"),
            ("Board 3", "2h3h4h5hQd"),
        ];
        for (name, cards) in boards {
            game.table
                .community_cards
                .insert(name.to_string(), cards_from_str(cards).unwrap());
        }
        game.handle_remove(
            "subset",
            Some("lowest_river_card_unless_all_same"),
            &[
                "Board 1".to_string(),
                "Board 2".to_string(),
                "Board 3".to_string(),
            ],
        );
        assert!(!game.table.community_cards.contains_key("Board 2"));
        assert!(game.table.community_cards.contains_key("Board 1"));
        assert!(game.table.community_cards.contains_key("Board 3"));
    }

    #[test]
    fn remove_keeps_all_when_tied() {
        use crate::cards::card::cards_from_str;
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        for name in ["Board 1", "Board 2"] {
            game.table.community_cards.insert(
                name.to_string(),
                cards_from_str("2c3c4c5c9h").unwrap(),
            );
        }
        game.handle_remove(
            "subset",
            Some("lowest_river_card_unless_all_same"),
            &["Board 1".to_string(), "Board 2".to_string()],
        );
        assert_eq!(game.table.community_cards.len(), 2);
    }

    #[test]
    fn board_composition_condition() {
        use crate::cards::card::cards_from_str;
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.community_cards.insert(
            "default".to_string(),
            cards_from_str("2c3s4hKd9c").unwrap(),
        );
        let cond = Condition::BoardComposition {
            subset: "default".to_string(),
            check: Some("color".to_string()),
            color: CardColor::Black,
            min_count: 3,
        };
        assert!(game.check_condition(&cond));
        let cond = Condition::BoardComposition {
            subset: "default".to_string(),
            check: Some("color".to_string()),
            color: CardColor::Red,
            min_count: 3,
        };
        assert!(!game.check_condition(&cond));
    }

    #[test]
    fn player_choice_condition() {
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.game_choices
            .insert("Game".to_string(), "Razz".to_string());
        assert!(game.check_condition(&Condition::PlayerChoice {
            subset: "Game".to_string(),
            value: Some("Razz".to_string()),
            values: vec![],
        }));
        assert!(game.check_condition(&Condition::PlayerChoice {
            subset: "Game".to_string(),
            value: None,
            values: vec!["Razz".to_string(), "Stud".to_string()],
        }));
        assert!(!game.check_condition(&Condition::PlayerChoice {
            subset: "Game".to_string(),
            value: Some("Stud".to_string()),
            values: vec![],
        }));
    }

    #[test]
    fn lowest_hole_wilds_track_deals() {
        use crate::cards::card::cards_from_str;
        let mut game = holdem_game(&[500, 500], GameConfig::no_limit(5, 10));
        game.table.start_hand(true);
        let pid = PlayerId(1);
        for c in cards_from_str("7h5d").unwrap() {
            game.table.player_mut(pid).unwrap().hand.add_card(c);
        }
        let rule = WildRule {
            kind: WildRuleKind::LowestHole,
            rank: None,
            role: WildRole::Wild,
            scope: None,
            match_kind: crate::rules::WildMatch::Rank,
            visibility: Some(CardState::FaceDown),
            condition: None,
        };
        game.update_player_wild_ranks(&[rule.clone()]);
        let hand = &game.table.player(pid).unwrap().hand;
        assert!(hand.cards()[1].is_wild(), "the five should be wild");
        assert!(!hand.cards()[0].is_wild());
        // A lower card arrives; the wild moves.
        for c in cards_from_str("3c").unwrap() {
            game.table.player_mut(pid).unwrap().hand.add_card(c);
        }
        game.update_player_wild_ranks(&[rule]);
        let hand = &game.table.player(pid).unwrap().hand;
        assert!(!hand.cards()[1].is_wild());
        assert!(hand.cards()[2].is_wild());
    }
}
