//! The declarative rules file. Parsed once at construction into typed step
//! variants so the interpreter's hot path is pattern matching, not
//! dictionary lookups.

use crate::cards::card::Rank;
use crate::cards::deck::DeckType;
use crate::eval::EvaluationType;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

#[derive(Debug, derive_more::Display)]
pub enum RulesError {
    #[display(fmt = "rules file did not parse: {}", _0)]
    Parse(String),
    #[display(fmt = "invalid rules: {}", _0)]
    Validation(String),
}

impl std::error::Error for RulesError {}

/// Accept JSON `true`/`false` or the string forms some rules files carry.
fn flexible_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        B(bool),
        S(String),
    }
    match Raw::deserialize(d)? {
        Raw::B(b) => Ok(b),
        Raw::S(s) => match s.as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            other => Err(D::Error::custom(format!("bad bool '{}'", other))),
        },
    }
}

fn opt_rank<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Rank>, D::Error> {
    let s: Option<String> = Option::deserialize(d)?;
    match s {
        None => Ok(None),
        Some(s) => Rank::from_str(&s).map(Some).map_err(D::Error::custom),
    }
}

fn rank_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Rank>, D::Error> {
    let v: Vec<String> = Vec::deserialize(d)?;
    v.iter()
        .map(|s| Rank::from_str(s).map_err(D::Error::custom))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BettingStructureKind {
    #[serde(rename = "Limit")]
    Limit,
    #[serde(rename = "No Limit")]
    NoLimit,
    #[serde(rename = "Pot Limit")]
    PotLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CardState {
    #[serde(rename = "face up")]
    FaceUp,
    #[serde(rename = "face down")]
    FaceDown,
    /// Conditional deals use "none" to mean "don't deal at all".
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CardColor {
    #[serde(rename = "black")]
    Black,
    #[serde(rename = "red")]
    Red,
}

fn default_subset() -> String {
    "default".to_string()
}

fn default_min_count() -> usize {
    2
}

fn default_color() -> CardColor {
    CardColor::Black
}

/// The condition language shared by conditional steps, conditional betting
/// orders, conditional forced bets, and conditional showdown descriptors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    #[serde(rename = "all_exposed")]
    AllExposed,
    #[serde(rename = "any_exposed")]
    AnyExposed,
    #[serde(rename = "none_exposed")]
    NoneExposed,
    #[serde(rename = "board_composition")]
    BoardComposition {
        #[serde(default = "default_subset")]
        subset: String,
        #[serde(default)]
        check: Option<String>,
        #[serde(default = "default_color")]
        color: CardColor,
        #[serde(default = "default_min_count")]
        min_count: usize,
    },
    #[serde(rename = "player_choice")]
    PlayerChoice {
        subset: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        values: Vec<String>,
    },
}

/// A step-level condition, possibly with per-player deal states attached
/// (deal a card up or down depending on the player's exposed cards).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalState {
    #[serde(flatten)]
    pub condition: Condition,
    #[serde(default)]
    pub true_state: Option<CardState>,
    #[serde(default)]
    pub false_state: Option<CardState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum ForcedBetStyle {
    #[default]
    #[serde(rename = "blinds")]
    Blinds,
    #[serde(rename = "antes")]
    Antes,
    #[serde(rename = "bring-in")]
    BringIn,
    #[serde(rename = "dealer-blind")]
    DealerBlind,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ForcedBetSpec {
    #[serde(default)]
    pub style: ForcedBetStyle,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(rename = "bringInEval", default)]
    pub bring_in_eval: Option<EvaluationType>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalForcedBet {
    pub condition: Condition,
    #[serde(rename = "forcedBet")]
    pub forced_bet: ForcedBetSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ForcedBets {
    #[serde(default)]
    pub style: ForcedBetStyle,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(rename = "bringInEval", default)]
    pub bring_in_eval: Option<EvaluationType>,
    #[serde(rename = "conditionalOrders", default)]
    pub conditional_orders: Vec<ConditionalForcedBet>,
    #[serde(default)]
    pub default: Option<ForcedBetSpec>,
}

impl ForcedBets {
    pub fn base_spec(&self) -> ForcedBetSpec {
        ForcedBetSpec {
            style: self.style,
            rule: self.rule.clone(),
            bring_in_eval: self.bring_in_eval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum OrderTag {
    #[default]
    #[serde(rename = "dealer")]
    Dealer,
    #[serde(rename = "after_big_blind")]
    AfterBigBlind,
    #[serde(rename = "bring_in")]
    BringIn,
    #[serde(rename = "high_hand")]
    HighHand,
    #[serde(rename = "last_actor")]
    LastActor,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalOrder {
    pub condition: Condition,
    pub order: OrderTag,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SubsequentOrder {
    Simple(OrderTag),
    Conditional {
        #[serde(rename = "conditionalOrders")]
        conditional_orders: Vec<ConditionalOrder>,
        #[serde(default)]
        default: OrderTag,
    },
}

impl Default for SubsequentOrder {
    fn default() -> Self {
        SubsequentOrder::Simple(OrderTag::Dealer)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BettingOrder {
    #[serde(default = "default_initial_order")]
    pub initial: OrderTag,
    #[serde(default)]
    pub subsequent: SubsequentOrder,
}

fn default_initial_order() -> OrderTag {
    OrderTag::AfterBigBlind
}

impl Default for BettingOrder {
    fn default() -> Self {
        BettingOrder {
            initial: OrderTag::AfterBigBlind,
            subsequent: SubsequentOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum BetStepKind {
    #[serde(rename = "blinds")]
    Blinds,
    #[serde(rename = "antes")]
    Antes,
    #[serde(rename = "bring-in")]
    BringIn,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "big")]
    Big,
}

impl BetStepKind {
    pub fn is_forced(&self) -> bool {
        matches!(self, BetStepKind::Blinds | BetStepKind::Antes | BetStepKind::BringIn)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BetStepConfig {
    #[serde(rename = "type")]
    pub kind: BetStepKind,
    #[serde(rename = "zeroCardsBetting", default)]
    pub zero_cards_betting: Option<String>,
    #[serde(default)]
    pub conditional_state: Option<ConditionalState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DealLocation {
    #[serde(rename = "player")]
    Player,
    #[serde(rename = "community")]
    Community,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SubsetSpec {
    One(String),
    Many(Vec<String>),
}

impl Default for SubsetSpec {
    fn default() -> Self {
        SubsetSpec::One(default_subset())
    }
}

impl SubsetSpec {
    pub fn names(&self) -> Vec<String> {
        match self {
            SubsetSpec::One(s) => vec![s.clone()],
            SubsetSpec::Many(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum WildRole {
    #[default]
    #[serde(rename = "wild")]
    Wild,
    #[serde(rename = "bug")]
    Bug,
    #[serde(rename = "conditional")]
    Conditional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum WildRuleKind {
    #[serde(rename = "joker")]
    Joker,
    #[serde(rename = "rank")]
    Rank,
    #[serde(rename = "last_community_card")]
    LastCommunityCard,
    #[serde(rename = "lowest_hole")]
    LowestHole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum WildMatch {
    #[default]
    #[serde(rename = "rank")]
    Rank,
    #[serde(rename = "card")]
    Card,
    #[serde(rename = "suit")]
    Suit,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WildCondition {
    pub visibility: CardState,
    #[serde(default)]
    pub true_role: WildRole,
    #[serde(default)]
    pub false_role: WildRole,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WildRule {
    #[serde(rename = "type")]
    pub kind: WildRuleKind,
    #[serde(default, deserialize_with = "opt_rank")]
    pub rank: Option<Rank>,
    #[serde(default)]
    pub role: WildRole,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(rename = "match", default)]
    pub match_kind: WildMatch,
    #[serde(default)]
    pub visibility: Option<CardState>,
    #[serde(default)]
    pub condition: Option<WildCondition>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProtectionOption {
    /// Named bet paid to flip the card face up.
    pub cost: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub timing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CardDealConfig {
    pub number: usize,
    #[serde(default)]
    pub state: Option<CardState>,
    #[serde(default)]
    pub subset: SubsetSpec,
    #[serde(rename = "hole_subset", default = "default_subset")]
    pub hole_subset: String,
    #[serde(rename = "protection_option", default)]
    pub protection_option: Option<ProtectionOption>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DealConfig {
    pub location: DealLocation,
    pub cards: Vec<CardDealConfig>,
    #[serde(default)]
    pub conditional_state: Option<ConditionalState>,
    #[serde(rename = "wildCards", default)]
    pub wild_cards: Vec<WildRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DrawAmount {
    pub relative_to: String,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscardCardConfig {
    pub number: usize,
    #[serde(rename = "min_number", default)]
    pub min_number: Option<usize>,
    #[serde(default)]
    pub state: Option<CardState>,
    /// "matching ranks" auto-discards cards matching a community subset.
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(rename = "discardLocation", default)]
    pub discard_location: Option<String>,
    #[serde(rename = "discardSubset", default = "default_subset")]
    pub discard_subset: String,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub entire_subset: bool,
    #[serde(rename = "oncePerStep", default, deserialize_with = "flexible_bool")]
    pub once_per_step: bool,
    #[serde(rename = "hole_subset", default)]
    pub hole_subset: Option<String>,
    #[serde(rename = "draw_amount", default)]
    pub draw_amount: Option<DrawAmount>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscardConfig {
    pub cards: Vec<DiscardCardConfig>,
    #[serde(default)]
    pub conditional_state: Option<ConditionalState>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExposeCardConfig {
    pub number: usize,
    #[serde(rename = "min_number", default)]
    pub min_number: Option<usize>,
    #[serde(default)]
    pub state: Option<CardState>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub immediate: bool,
    #[serde(rename = "oncePerStep", default, deserialize_with = "flexible_bool")]
    pub once_per_step: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExposeConfig {
    pub cards: Vec<ExposeCardConfig>,
    #[serde(default)]
    pub conditional_state: Option<ConditionalState>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassCardConfig {
    pub number: usize,
    #[serde(default)]
    pub state: Option<CardState>,
    #[serde(default)]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PassConfig {
    pub cards: Vec<PassCardConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeparateCardConfig {
    pub number: usize,
    #[serde(rename = "hole_subset")]
    pub hole_subset: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisibilityRequirement {
    #[serde(rename = "hole_subset")]
    pub hole_subset: String,
    #[serde(default)]
    pub min_face_down: usize,
    #[serde(default)]
    pub min_face_up: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonSubset {
    #[serde(rename = "hole_subset")]
    pub hole_subset: String,
    #[serde(rename = "evaluationType")]
    pub evaluation_type: EvaluationType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandComparison {
    pub subsets: Vec<ComparisonSubset>,
    /// "greater_than": the first subset must beat the second.
    pub comparison_rule: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeparateConfig {
    pub cards: Vec<SeparateCardConfig>,
    #[serde(default)]
    pub visibility_requirements: Vec<VisibilityRequirement>,
    #[serde(rename = "hand_comparison", default)]
    pub hand_comparison: Option<HandComparison>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeclareConfig {
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub per_pot: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChooseConfig {
    pub possible_values: Vec<String>,
    /// Key the chosen value is stored under for later conditions.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoveConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub subsets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RollDieConfig {
    #[serde(default = "default_die_subset")]
    pub subset: String,
}

fn default_die_subset() -> String {
    "Die".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ShowdownStepConfig {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// One parsed gameplay action. Grouped steps hold their sub-actions in
/// order; a sub-action is any of these except another grouped step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Bet(BetStepConfig),
    Deal(DealConfig),
    Discard(DiscardConfig),
    Draw(DiscardConfig),
    Expose(ExposeConfig),
    Pass(PassConfig),
    Separate(SeparateConfig),
    Declare(DeclareConfig),
    Choose(ChooseConfig),
    Remove(RemoveConfig),
    RollDie(RollDieConfig),
    Grouped(Vec<StepAction>),
    Showdown(ShowdownStepConfig),
}

impl StepAction {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StepAction::Bet(_) => "bet",
            StepAction::Deal(_) => "deal",
            StepAction::Discard(_) => "discard",
            StepAction::Draw(_) => "draw",
            StepAction::Expose(_) => "expose",
            StepAction::Pass(_) => "pass",
            StepAction::Separate(_) => "separate",
            StepAction::Declare(_) => "declare",
            StepAction::Choose(_) => "choose",
            StepAction::Remove(_) => "remove",
            StepAction::RollDie(_) => "roll_die",
            StepAction::Grouped(_) => "grouped",
            StepAction::Showdown(_) => "showdown",
        }
    }

    /// The conditional carried inside the action config, if any. Step-level
    /// conditionals live on `GameStep`.
    pub fn inner_conditional(&self) -> Option<&ConditionalState> {
        match self {
            StepAction::Bet(c) => c.conditional_state.as_ref(),
            StepAction::Deal(c) => c.conditional_state.as_ref(),
            StepAction::Discard(c) | StepAction::Draw(c) => c.conditional_state.as_ref(),
            StepAction::Expose(c) => c.conditional_state.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameStep {
    pub name: String,
    pub conditional_state: Option<ConditionalState>,
    pub action: StepAction,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStep {
    #[serde(default)]
    name: String,
    #[serde(default)]
    conditional_state: Option<ConditionalState>,
    #[serde(default)]
    bet: Option<BetStepConfig>,
    #[serde(default)]
    deal: Option<DealConfig>,
    #[serde(default)]
    discard: Option<DiscardConfig>,
    #[serde(default)]
    draw: Option<DiscardConfig>,
    #[serde(default)]
    expose: Option<ExposeConfig>,
    #[serde(default)]
    pass: Option<PassConfig>,
    #[serde(default)]
    separate: Option<SeparateConfig>,
    #[serde(default)]
    declare: Option<DeclareConfig>,
    #[serde(default)]
    choose: Option<ChooseConfig>,
    #[serde(default)]
    remove: Option<RemoveConfig>,
    #[serde(default)]
    roll_die: Option<RollDieConfig>,
    #[serde(rename = "groupedActions", default)]
    grouped: Option<Vec<RawStep>>,
    #[serde(default)]
    showdown: Option<ShowdownStepConfig>,
}

impl RawStep {
    fn into_action(self, allow_grouped: bool) -> Result<StepAction, RulesError> {
        let mut actions: Vec<StepAction> = vec![];
        if let Some(c) = self.bet {
            actions.push(StepAction::Bet(c));
        }
        if let Some(c) = self.deal {
            actions.push(StepAction::Deal(c));
        }
        if let Some(c) = self.discard {
            actions.push(StepAction::Discard(c));
        }
        if let Some(c) = self.draw {
            actions.push(StepAction::Draw(c));
        }
        if let Some(c) = self.expose {
            actions.push(StepAction::Expose(c));
        }
        if let Some(c) = self.pass {
            actions.push(StepAction::Pass(c));
        }
        if let Some(c) = self.separate {
            actions.push(StepAction::Separate(c));
        }
        if let Some(c) = self.declare {
            actions.push(StepAction::Declare(c));
        }
        if let Some(c) = self.choose {
            actions.push(StepAction::Choose(c));
        }
        if let Some(c) = self.remove {
            actions.push(StepAction::Remove(c));
        }
        if let Some(c) = self.roll_die {
            actions.push(StepAction::RollDie(c));
        }
        if let Some(c) = self.showdown {
            actions.push(StepAction::Showdown(c));
        }
        if let Some(subs) = self.grouped {
            if !allow_grouped {
                return Err(RulesError::Validation(
                    "grouped steps cannot nest".to_string(),
                ));
            }
            if subs.is_empty() {
                return Err(RulesError::Validation(
                    "groupedActions is empty".to_string(),
                ));
            }
            let subactions: Result<Vec<StepAction>, RulesError> = subs
                .into_iter()
                .map(|raw| raw.into_action(false))
                .collect();
            actions.push(StepAction::Grouped(subactions?));
        }
        match actions.len() {
            1 => Ok(actions.pop().unwrap()),
            0 => Err(RulesError::Validation(format!(
                "step '{}' has no action",
                self.name
            ))),
            _ => Err(RulesError::Validation(format!(
                "step '{}' has more than one action",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CountSpec {
    All(AllLiteral),
    One(usize),
    Many(Vec<usize>),
}

/// Deserializes only from the literal string "all".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AllLiteral;

impl<'de> Deserialize<'de> for AllLiteral {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        if s == "all" {
            Ok(AllLiteral)
        } else {
            Err(D::Error::custom("expected \"all\""))
        }
    }
}

impl CountSpec {
    /// The explicit count options, or None for "all".
    pub fn options(&self) -> Option<Vec<usize>> {
        match self {
            CountSpec::All(_) => None,
            CountSpec::One(n) => Some(vec![*n]),
            CountSpec::Many(v) => Some(v.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComboSpec {
    #[serde(rename = "holeCards")]
    pub hole_cards: CountSpec,
    #[serde(rename = "communityCards")]
    pub community_cards: CountSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassificationRule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "faceRanks", default, deserialize_with = "rank_list")]
    pub face_ranks: Vec<Rank>,
    #[serde(rename = "fieldName", default)]
    pub field_name: Option<String>,
}

/// One directional pot descriptor inside the showdown rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BestHandConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "evaluationType")]
    pub eval_type: EvaluationType,
    #[serde(rename = "holeCards", default)]
    pub hole_cards: Option<CountSpec>,
    #[serde(rename = "communityCards", default)]
    pub community_cards: Option<CountSpec>,
    #[serde(rename = "anyCards", default)]
    pub any_cards: Option<usize>,
    #[serde(rename = "hole_subset", default)]
    pub hole_subset: Option<String>,
    #[serde(rename = "cardState", default)]
    pub card_state: Option<CardState>,
    #[serde(rename = "communityCardCombinations", default)]
    pub community_card_combinations: Vec<Vec<String>>,
    #[serde(rename = "communityCardSelectCombinations", default)]
    pub community_card_select_combinations: Vec<Vec<(String, usize, usize)>>,
    #[serde(default)]
    pub combinations: Vec<ComboSpec>,
    #[serde(rename = "totalCards", default)]
    pub total_cards: Option<usize>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub padding: bool,
    #[serde(rename = "minimumCards", default)]
    pub minimum_cards: Option<usize>,
    #[serde(rename = "zeroCardsPipValue", default)]
    pub zero_cards_pip_value: Option<i32>,
    #[serde(default)]
    pub qualifier: Option<Vec<u32>>,
    #[serde(rename = "wildCards", default)]
    pub wild_cards: Vec<WildRule>,
    #[serde(default)]
    pub classification: Option<ClassificationRule>,
}

impl BestHandConfig {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.eval_type.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConditionalBestHands {
    pub condition: Condition,
    #[serde(rename = "bestHand")]
    pub best_hand: Vec<BestHandConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum DeclarationMode {
    #[default]
    #[serde(rename = "cards_speak")]
    CardsSpeak,
    #[serde(rename = "declare")]
    Declare,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ShowdownRules {
    #[serde(rename = "bestHand", default)]
    pub best_hand: Vec<BestHandConfig>,
    #[serde(rename = "conditionalBestHands", default)]
    pub conditional_best_hands: Vec<ConditionalBestHands>,
    #[serde(rename = "defaultBestHand", default)]
    pub default_best_hand: Vec<BestHandConfig>,
    #[serde(rename = "declaration_mode", default)]
    pub declaration_mode: DeclarationMode,
    #[serde(rename = "classification_priority", default)]
    pub classification_priority: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlayersConfig {
    min: usize,
    max: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct DeckConfig {
    #[serde(rename = "type", default)]
    deck_type: DeckType,
    #[serde(default)]
    #[allow(dead_code)]
    cards: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRules {
    game: String,
    players: PlayersConfig,
    #[serde(default = "default_deck_config")]
    deck: DeckConfig,
    #[serde(rename = "bettingStructures")]
    betting_structures: Vec<BettingStructureKind>,
    #[serde(rename = "forcedBets", default)]
    forced_bets: ForcedBets,
    #[serde(rename = "bettingOrder", default)]
    betting_order: BettingOrder,
    #[serde(rename = "gamePlay")]
    gameplay: Vec<RawStep>,
    #[serde(default)]
    showdown: ShowdownRules,
}

fn default_deck_config() -> DeckConfig {
    DeckConfig {
        deck_type: DeckType::Standard,
        cards: None,
    }
}

#[derive(Debug, Clone)]
pub struct GameRules {
    pub game: String,
    pub min_players: usize,
    pub max_players: usize,
    pub deck_type: DeckType,
    pub betting_structures: Vec<BettingStructureKind>,
    pub forced_bets: ForcedBets,
    pub betting_order: BettingOrder,
    pub gameplay: Vec<GameStep>,
    pub showdown: ShowdownRules,
}

impl GameRules {
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let raw: RawRules =
            serde_json::from_str(json).map_err(|e| RulesError::Parse(e.to_string()))?;
        let gameplay: Result<Vec<GameStep>, RulesError> = raw
            .gameplay
            .into_iter()
            .map(|r| {
                let name = r.name.clone();
                let conditional_state = r.conditional_state.clone();
                let action = r.into_action(true)?;
                Ok(GameStep {
                    name,
                    conditional_state,
                    action,
                })
            })
            .collect();
        let rules = GameRules {
            game: raw.game,
            min_players: raw.players.min,
            max_players: raw.players.max,
            deck_type: raw.deck.deck_type,
            betting_structures: raw.betting_structures,
            forced_bets: raw.forced_bets,
            betting_order: raw.betting_order,
            gameplay: gameplay?,
            showdown: raw.showdown,
        };
        rules.validate()?;
        Ok(rules)
    }

    fn validate(&self) -> Result<(), RulesError> {
        if self.min_players < 2 {
            return Err(RulesError::Validation("min players below 2".to_string()));
        }
        if self.max_players < self.min_players {
            return Err(RulesError::Validation(
                "max players below min players".to_string(),
            ));
        }
        if self.gameplay.is_empty() {
            return Err(RulesError::Validation("gamePlay is empty".to_string()));
        }
        if self.betting_structures.is_empty() {
            return Err(RulesError::Validation(
                "no betting structures permitted".to_string(),
            ));
        }
        let has_showdown = self
            .gameplay
            .iter()
            .any(|s| matches!(s.action, StepAction::Showdown(_)));
        let has_best_hand = !self.showdown.best_hand.is_empty()
            || !self.showdown.conditional_best_hands.is_empty()
            || !self.showdown.default_best_hand.is_empty();
        if has_showdown && !has_best_hand {
            return Err(RulesError::Validation(
                "showdown step without bestHand rules".to_string(),
            ));
        }
        Ok(())
    }

    /// Every evaluation type this game can touch, for fail-fast resolution
    /// at construction.
    pub fn referenced_eval_types(&self) -> Vec<EvaluationType> {
        let mut types: Vec<EvaluationType> = vec![];
        let mut push = |t: EvaluationType| {
            if !types.contains(&t) {
                types.push(t);
            }
        };
        for bh in self
            .showdown
            .best_hand
            .iter()
            .chain(self.showdown.default_best_hand.iter())
            .chain(
                self.showdown
                    .conditional_best_hands
                    .iter()
                    .flat_map(|c| c.best_hand.iter()),
            )
        {
            push(bh.eval_type);
        }
        if let Some(t) = self.forced_bets.bring_in_eval {
            push(t);
        }
        for cond in &self.forced_bets.conditional_orders {
            if let Some(t) = cond.forced_bet.bring_in_eval {
                push(t);
            }
        }
        for step in &self.gameplay {
            let actions: Vec<&StepAction> = match &step.action {
                StepAction::Grouped(subs) => subs.iter().collect(),
                other => vec![other],
            };
            for action in actions {
                if let StepAction::Separate(cfg) = action {
                    if let Some(cmp) = &cfg.hand_comparison {
                        for s in &cmp.subsets {
                            push(s.evaluation_type);
                        }
                    }
                }
            }
        }
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLDEM: &str = r#"{
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
            "order": "clockwise",
            "startingFrom": "dealer",
            "cardsRequired": "any combination of hole and community cards",
            "bestHand": [{"evaluationType": "high", "anyCards": 5}]
        }
    }"#;

    #[test]
    fn parses_holdem() {
        let rules = GameRules::from_json(HOLDEM).unwrap();
        assert_eq!(rules.game, "Texas Hold'em");
        assert_eq!(rules.gameplay.len(), 10);
        assert!(matches!(rules.gameplay[0].action, StepAction::Bet(_)));
        assert!(matches!(rules.gameplay[9].action, StepAction::Showdown(_)));
        assert_eq!(
            rules.referenced_eval_types(),
            vec![EvaluationType::High]
        );
        match &rules.gameplay[1].action {
            StepAction::Deal(d) => {
                assert_eq!(d.location, DealLocation::Player);
                assert_eq!(d.cards[0].number, 2);
                assert_eq!(d.cards[0].state, Some(CardState::FaceDown));
            }
            other => panic!("expected deal, got {:?}", other),
        }
    }

    #[test]
    fn grouped_steps_parse() {
        let json = r#"{
            "game": "Grouped",
            "players": {"min": 2, "max": 9},
            "deck": {"type": "standard", "cards": 52},
            "bettingStructures": ["Limit"],
            "gamePlay": [
                {"bet": {"type": "blinds"}, "name": "Post Blinds"},
                {"deal": {"location": "player", "cards": [{"number": 5, "state": "face down"}]}, "name": "Deal"},
                {"groupedActions": [
                    {"bet": {"type": "small"}},
                    {"expose": {"cards": [{"number": 1, "state": "face down", "oncePerStep": "true", "immediate": "true"}]}}
                ], "name": "Bet and Expose"},
                {"showdown": {"type": "final"}, "name": "Showdown"}
            ],
            "showdown": {"bestHand": [{"evaluationType": "high", "anyCards": 5}]}
        }"#;
        let rules = GameRules::from_json(json).unwrap();
        match &rules.gameplay[2].action {
            StepAction::Grouped(subs) => {
                assert_eq!(subs.len(), 2);
                assert!(matches!(subs[0], StepAction::Bet(_)));
                match &subs[1] {
                    StepAction::Expose(e) => {
                        assert!(e.cards[0].immediate);
                        assert!(e.cards[0].once_per_step);
                    }
                    other => panic!("expected expose, got {:?}", other),
                }
            }
            other => panic!("expected grouped, got {:?}", other),
        }
    }

    #[test]
    fn conditions_parse() {
        let json = r#"{"type": "player_choice", "subset": "Game", "values": ["Razz", "Stud"]}"#;
        let c: Condition = serde_json::from_str(json).unwrap();
        assert!(matches!(c, Condition::PlayerChoice { .. }));
        let json = r#"{"type": "board_composition", "subset": "Board", "check": "color", "color": "black", "min_count": 3}"#;
        let c: Condition = serde_json::from_str(json).unwrap();
        match c {
            Condition::BoardComposition {
                color, min_count, ..
            } => {
                assert_eq!(color, CardColor::Black);
                assert_eq!(min_count, 3);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn conditional_subsequent_order() {
        let json = r#"{
            "initial": "after_big_blind",
            "subsequent": {
                "conditionalOrders": [
                    {"condition": {"type": "player_choice", "subset": "Game", "values": ["Seven Card Stud"]}, "order": "high_hand"}
                ],
                "default": "dealer"
            }
        }"#;
        let order: BettingOrder = serde_json::from_str(json).unwrap();
        match order.subsequent {
            SubsequentOrder::Conditional {
                conditional_orders,
                default,
            } => {
                assert_eq!(conditional_orders.len(), 1);
                assert_eq!(conditional_orders[0].order, OrderTag::HighHand);
                assert_eq!(default, OrderTag::Dealer);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn best_hand_count_specs() {
        let json = r#"{
            "name": "High Hand",
            "evaluationType": "high",
            "holeCards": [2, 3, 4],
            "communityCards": [3, 2, 1],
            "qualifier": [1, 100]
        }"#;
        let bh: BestHandConfig = serde_json::from_str(json).unwrap();
        assert_eq!(bh.hole_cards.unwrap().options(), Some(vec![2, 3, 4]));
        assert_eq!(bh.community_cards.unwrap().options(), Some(vec![3, 2, 1]));
        let json = r#"{"evaluationType": "high", "holeCards": "all"}"#;
        let bh: BestHandConfig = serde_json::from_str(json).unwrap();
        assert_eq!(bh.hole_cards.unwrap().options(), None);
    }

    #[test]
    fn rejects_bad_rules() {
        assert!(GameRules::from_json("{}").is_err());
        let no_action = r#"{
            "game": "Broken",
            "players": {"min": 2, "max": 4},
            "bettingStructures": ["Limit"],
            "gamePlay": [{"name": "Nothing"}],
            "showdown": {"bestHand": [{"evaluationType": "high"}]}
        }"#;
        assert!(matches!(
            GameRules::from_json(no_action),
            Err(RulesError::Validation(_))
        ));
    }

    #[test]
    fn wild_rule_parse() {
        let json = r#"{"type": "rank", "rank": "TWO", "role": "bug", "scope": "global"}"#;
        let w: WildRule = serde_json::from_str(json).unwrap();
        assert_eq!(w.kind, WildRuleKind::Rank);
        assert_eq!(w.rank, Some(Rank::Two));
        assert_eq!(w.role, WildRole::Bug);
    }
}
