//! Встроенный модуль правил «四色牌» (Four Color Card).
//!
//! Колода: 4 масти × 7 рангов × `copies` + пять особых карт «цзинь тяо».
//! Дилер получает 21 карту, остальные по 20, остаток: в прикуп.
//!
//! Ход игрока: `draw` (взять из прикупа), затем `play_cards` (сбросить одну)
//! или `pass` (сбросить только что взятую). После сброса следующий игрок
//! отвечает: `chi` / `pass`; любой другой может `peng` / `kai`; `hu` означает победу.
//! Партия заканчивается на `hu` или когда прикуп опустился до `liuju_deck_limit`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{count_matching, take_matching, Card, Deck, GameState, LastPlay, Meld, PlayerId};
use crate::infra::rng::RandomSource;
use crate::infra::rng_seed::RngSeed;
use crate::rules::{ActionRegistry, RuleError, RuleLogic, Verdict};

pub const RULE_NAME: &str = "Four Color Card";
pub const LOGIC_REF: &str = "four_color_card";

const SOLDIER: &str = "卒";
const GENERAL: &str = "将";
const JIN_TIAO: &str = "jin_tiao";

const PLAY: &str = "play";
const DRAW: &str = "draw";

/// Конфиг по умолчанию (то, что засевается в хранилище).
pub fn default_config() -> serde_json::Value {
    json!({
        "meta": {
            "player_count": { "min": 4, "max": 4 },
            "start_policy": "owner",
            "deck_type": "four_color_custom"
        },
        "setup": {
            "initial_cards": { "dealer": 21, "others": 20 }
        },
        "custom_data": {
            "deck_definition": {
                "suits": ["yellow", "red", "green", "white"],
                "ranks": ["将", "士", "象", "车", "马", "炮", "卒"],
                "copies": 4,
                "special_rank": {
                    "name": "jin_tiao",
                    "cards": ["公", "侯", "伯", "子", "男"],
                    "color": "red"
                }
            },
            "chi_patterns": [
                { "type": "sequence", "ranks": ["车", "马", "炮"], "points": 1 },
                { "type": "sequence", "ranks": ["将", "士", "象"], "points": 1 },
                { "type": "soldier_diff_3", "points": 1 },
                { "type": "soldier_diff_4", "points": 2 },
                { "type": "single_jiang", "points": 1 },
                { "type": "single_jin_tiao", "points": 3 }
            ],
            "scoring_rules": {
                "jin_tiao_kan_multiplier": 3,
                "jin_tiao_yu_multiplier": 3,
                "da_hu_multiplier": 2,
                "liuju_deck_limit": 8
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Конфиг
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
struct FourColorConfig {
    setup: Setup,
    custom_data: CustomData,
}

#[derive(Clone, Debug, Deserialize)]
struct Setup {
    initial_cards: InitialCards,
}

#[derive(Clone, Debug, Deserialize)]
struct InitialCards {
    dealer: usize,
    others: usize,
}

#[derive(Clone, Debug, Deserialize)]
struct CustomData {
    deck_definition: DeckDefinition,
    #[serde(default)]
    chi_patterns: Vec<ChiPattern>,
    scoring_rules: ScoringRules,
}

#[derive(Clone, Debug, Deserialize)]
struct DeckDefinition {
    suits: Vec<String>,
    ranks: Vec<String>,
    #[serde(default = "one")]
    copies: usize,
    special_rank: SpecialRank,
}

fn one() -> usize {
    1
}

#[derive(Clone, Debug, Deserialize)]
struct SpecialRank {
    name: String,
    cards: Vec<String>,
    color: String,
}

#[derive(Clone, Debug, Deserialize)]
struct ChiPattern {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    ranks: Vec<String>,
    points: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct ScoringRules {
    da_hu_multiplier: i64,
    liuju_deck_limit: usize,
}

fn parse_config(config: &serde_json::Value) -> Result<FourColorConfig, RuleError> {
    serde_json::from_value(config.clone()).map_err(|e| RuleError::InvalidConfig(e.to_string()))
}

// ---------------------------------------------------------------------------
// game_data модуля
// ---------------------------------------------------------------------------

/// Приватные данные модуля внутри `GameState::game_data`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FourColorData {
    pub dealer: PlayerId,
    pub bonus_card: Option<Card>,
    pub bonus_value: u8,
    pub waiting_for_response: bool,
    pub response_allowed_players: Vec<PlayerId>,
    #[serde(default)]
    pub winner: Option<PlayerId>,
    #[serde(default)]
    pub final_scores: Option<BTreeMap<PlayerId, i64>>,
    /// "hu": победа, "liuju": ничья по исчерпанию прикупа.
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub game_ended: bool,
}

impl FourColorData {
    pub fn read(state: &GameState) -> Result<Self, RuleError> {
        serde_json::from_value(state.game_data.clone())
            .map_err(|e| RuleError::InvalidState(format!("game_data: {e}")))
    }

    fn write(&self, state: &mut GameState) -> Result<(), RuleError> {
        state.game_data =
            serde_json::to_value(self).map_err(|e| RuleError::InvalidState(e.to_string()))?;
        Ok(())
    }

    fn open_response(&mut self, responder: PlayerId) {
        self.waiting_for_response = true;
        self.response_allowed_players = vec![responder];
    }

    fn close_response(&mut self) {
        self.waiting_for_response = false;
        self.response_allowed_players.clear();
    }
}

/// Данные действий с картами: `{ "cards": [...] }`.
#[derive(Clone, Debug, Default, Deserialize)]
struct CardsPayload {
    #[serde(default)]
    cards: Vec<Card>,
}

fn parse_cards(payload: &serde_json::Value) -> Result<Vec<Card>, String> {
    if payload.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value::<CardsPayload>(payload.clone())
        .map(|p| p.cards)
        .map_err(|e| format!("Некорректные данные действия: {e}"))
}

// ---------------------------------------------------------------------------
// Логика
// ---------------------------------------------------------------------------

/// Реализация правил 四色牌.
#[derive(Clone, Debug)]
pub struct FourColorCard {
    config: FourColorConfig,
}

impl FourColorCard {
    pub fn from_config(config: &serde_json::Value) -> Result<Self, RuleError> {
        let config = parse_config(config)?;
        let deck = &config.custom_data.deck_definition;
        if deck.suits.is_empty() || deck.ranks.is_empty() || deck.copies == 0 {
            return Err(RuleError::InvalidConfig("пустое описание колоды".into()));
        }
        Ok(Self { config })
    }

    /// Вся колода в каноническом порядке (до тасовки).
    fn build_deck(&self) -> Vec<Card> {
        let def = &self.config.custom_data.deck_definition;
        let mut cards = Vec::with_capacity(
            def.suits.len() * def.ranks.len() * def.copies + def.special_rank.cards.len(),
        );
        for _ in 0..def.copies {
            for suit in &def.suits {
                for rank in &def.ranks {
                    cards.push(Card::new(suit.clone(), rank.clone()));
                }
            }
        }
        for rank in &def.special_rank.cards {
            cards.push(Card::with_kind(
                def.special_rank.color.clone(),
                rank.clone(),
                def.special_rank.name.clone(),
            ));
        }
        cards
    }
}

impl FourColorCard {
    /// Подобрать карты с руки, которые вместе со сброшенной `response` дают «чи».
    pub fn find_chi_combination(&self, response: &Card, hand: &[Card]) -> Option<Vec<Card>> {
        for pattern in &self.config.custom_data.chi_patterns {
            let candidate = match pattern.kind.as_str() {
                "sequence" if pattern.ranks.contains(&response.rank) => {
                    let mut pool = hand.to_vec();
                    pattern
                        .ranks
                        .iter()
                        .filter(|rank| **rank != response.rank)
                        .map(|rank| take_matching(&mut pool, &Card::new(response.suit.clone(), rank.clone())))
                        .collect::<Option<Vec<Card>>>()
                }
                "soldier_diff_3" | "soldier_diff_4" if response.rank == SOLDIER => {
                    let needed = if pattern.kind == "soldier_diff_3" { 2 } else { 3 };
                    let mut seen = BTreeSet::from([response.suit.as_str()]);
                    let picked: Vec<Card> = hand
                        .iter()
                        .filter(|c| c.rank == SOLDIER && seen.insert(c.suit.as_str()))
                        .take(needed)
                        .cloned()
                        .collect();
                    (picked.len() == needed).then_some(picked)
                }
                "single_jiang" | "single_jin_tiao" => Some(Vec::new()),
                _ => None,
            };

            if let Some(cards) = candidate {
                if identify_chi_pattern(&self.config, response, &cards).is_some() {
                    return Some(cards);
                }
            }
        }
        None
    }
}

/// 黄=1, 红=2, 绿=3, 白=4.
fn bonus_value(card: &Card) -> u8 {
    match card.suit.as_str() {
        "yellow" => 1,
        "red" => 2,
        "green" => 3,
        "white" => 4,
        _ => 0,
    }
}

impl RuleLogic for FourColorCard {
    fn initialize(
        &self,
        _config: &serde_json::Value,
        members: &[PlayerId],
        seed: &RngSeed,
    ) -> Result<GameState, RuleError> {
        if members.is_empty() {
            return Err(RuleError::InvalidState("за столом нет игроков".into()));
        }

        let initial = &self.config.setup.initial_cards;
        let mut cards = self.build_deck();
        let needed = initial.dealer + initial.others * (members.len() - 1);
        if cards.len() < needed {
            return Err(RuleError::InvalidConfig(format!(
                "в колоде {} карт, а для раздачи нужно {needed}",
                cards.len()
            )));
        }

        let mut rng = seed.to_rng();
        rng.shuffle(&mut cards);
        let dealer = members[rng.pick_index(members.len())];

        let mut deck = Deck::new(cards);
        let mut hands = BTreeMap::new();
        let mut melds = BTreeMap::new();
        for &player in members {
            let count = if player == dealer {
                initial.dealer
            } else {
                initial.others
            };
            hands.insert(player, deck.draw_n(count));
            melds.insert(player, Vec::new());
        }

        let bonus_card = hands.get(&dealer).and_then(|h: &Vec<Card>| h.last().cloned());
        let data = FourColorData {
            dealer,
            bonus_value: bonus_card.as_ref().map(bonus_value).unwrap_or(0),
            bonus_card,
            ..FourColorData::default()
        };

        let mut state = GameState {
            round: 1,
            players: members.to_vec(),
            current_turn: Some(dealer),
            hands,
            draw_pile: deck,
            discard_pile: Vec::new(),
            last_play: None,
            melds,
            game_data: serde_json::Value::Null,
        };
        data.write(&mut state)?;
        Ok(state)
    }

    fn register_actions(&self, actions: &mut ActionRegistry) -> Result<(), RuleError> {
        actions.register("play_cards", validate_play_cards, apply_play_cards)?;
        actions.register("chi", validate_chi, apply_chi)?;
        actions.register("peng", validate_peng, apply_peng)?;
        actions.register("kai", validate_kai, apply_kai)?;
        actions.register("hu", validate_hu, apply_hu)?;
        actions.register("draw", validate_draw, apply_draw)?;
        actions.register("pass", validate_pass, apply_pass)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Общие проверки
// ---------------------------------------------------------------------------

/// Последний сброс, на который можно ответить (не добор и не свой).
fn claimable_discard<'a>(
    state: &'a GameState,
    data: &FourColorData,
    player_id: PlayerId,
) -> Result<&'a Card, String> {
    if !data.waiting_for_response {
        return Err("Сейчас не время отвечать на сброс".into());
    }
    let last = state
        .last_play
        .as_ref()
        .filter(|lp| lp.kind == PLAY)
        .ok_or("Нет сброшенной карты")?;
    if last.player == player_id {
        return Err("Нельзя забрать собственный сброс".into());
    }
    last.cards.first().ok_or_else(|| "Пустой сброс".to_string())
}

fn drew_last(state: &GameState, player_id: PlayerId) -> bool {
    state
        .last_play
        .as_ref()
        .is_some_and(|lp| lp.kind == DRAW && lp.player == player_id)
}

fn pop_discard(state: &mut GameState, expected: &Card) -> Result<Card, RuleError> {
    match state.discard_pile.pop() {
        Some(card) if card.same_face(expected) => Ok(card),
        _ => Err(RuleError::InvalidState(
            "верх сброса не совпадает с последним розыгрышем".into(),
        )),
    }
}

fn hand_mut(state: &mut GameState, player_id: PlayerId) -> Result<&mut Vec<Card>, RuleError> {
    state
        .hands
        .get_mut(&player_id)
        .ok_or_else(|| RuleError::InvalidState(format!("нет руки игрока {player_id}")))
}

fn push_meld(state: &mut GameState, player_id: PlayerId, meld: Meld) {
    state.melds.entry(player_id).or_default().push(meld);
}

macro_rules! reject_on_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(reason) => return Ok(Verdict::reject(reason)),
        }
    };
}

// ---------------------------------------------------------------------------
// play_cards
// ---------------------------------------------------------------------------

fn validate_play_cards(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    if state.current_turn != Some(player_id) {
        return Ok(Verdict::reject("Сейчас не ваш ход"));
    }
    if data.waiting_for_response {
        return Ok(Verdict::reject("Ждём ответа других игроков"));
    }
    let cards = reject_on_err!(parse_cards(payload));
    if cards.len() != 1 {
        return Ok(Verdict::reject("Нужно сбросить ровно одну карту"));
    }
    if count_matching(state.hand(player_id), &cards[0]) == 0 {
        return Ok(Verdict::reject("Такой карты нет на руке"));
    }
    Ok(Verdict::accept())
}

fn apply_play_cards(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut next = state.clone();
    let mut data = FourColorData::read(state)?;
    let wanted = parse_cards(payload)
        .map_err(RuleError::InvalidPayload)?
        .into_iter()
        .next()
        .ok_or_else(|| RuleError::InvalidPayload("нет карты".into()))?;

    let card = take_matching(hand_mut(&mut next, player_id)?, &wanted)
        .ok_or_else(|| RuleError::InvalidState("карты нет на руке".into()))?;
    discard_and_pass_turn(&mut next, &mut data, player_id, card)?;
    data.write(&mut next)?;
    Ok(next)
}

/// Сбросить карту и передать ход следующему, открыв ему окно ответа.
fn discard_and_pass_turn(
    state: &mut GameState,
    data: &mut FourColorData,
    player_id: PlayerId,
    card: Card,
) -> Result<(), RuleError> {
    state.discard_pile.push(card.clone());
    state.last_play = Some(LastPlay {
        player: player_id,
        cards: vec![card],
        kind: PLAY.to_string(),
    });

    let next_player = state
        .next_player(player_id)
        .ok_or_else(|| RuleError::InvalidState(format!("игрок {player_id} не сидит за столом")))?;
    data.open_response(next_player);
    state.current_turn = Some(next_player);
    Ok(())
}

// ---------------------------------------------------------------------------
// chi
// ---------------------------------------------------------------------------

/// Какой шаблон «чи» образуют сброшенная карта и карты игрока.
fn identify_chi_pattern(cfg: &FourColorConfig, response: &Card, used: &[Card]) -> Option<(String, i64)> {
    let all: Vec<&Card> = std::iter::once(response).chain(used.iter()).collect();

    for pattern in &cfg.custom_data.chi_patterns {
        let matched = match pattern.kind.as_str() {
            "sequence" => {
                let same_suit = all.iter().all(|c| c.suit == response.suit);
                let mut ranks: Vec<&str> = all.iter().map(|c| c.rank.as_str()).collect();
                let mut wanted: Vec<&str> = pattern.ranks.iter().map(String::as_str).collect();
                ranks.sort_unstable();
                wanted.sort_unstable();
                same_suit && ranks == wanted
            }
            "soldier_diff_3" | "soldier_diff_4" => {
                let expected = if pattern.kind == "soldier_diff_3" { 3 } else { 4 };
                let all_soldiers = all.iter().all(|c| c.rank == SOLDIER);
                let suits: BTreeSet<&str> = all.iter().map(|c| c.suit.as_str()).collect();
                all_soldiers && suits.len() == expected && all.len() == expected
            }
            "single_jiang" => response.rank == GENERAL && used.is_empty(),
            "single_jin_tiao" => response.kind == JIN_TIAO && used.is_empty(),
            _ => false,
        };
        if matched {
            return Some((pattern.kind.clone(), pattern.points));
        }
    }
    None
}

fn validate_chi(
    config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let cfg = parse_config(config)?;
    let data = FourColorData::read(state)?;

    if !data.response_allowed_players.contains(&player_id) {
        return Ok(Verdict::reject("Вам сейчас нельзя отвечать"));
    }
    let response = reject_on_err!(claimable_discard(state, &data, player_id));
    let from_previous = state
        .last_play
        .as_ref()
        .is_some_and(|lp| Some(lp.player) == state.previous_player(player_id));
    if !from_previous {
        return Ok(Verdict::reject("Чи можно только у предыдущего игрока"));
    }

    let used = reject_on_err!(parse_cards(payload));
    let mut hand = state.hand(player_id).to_vec();
    if used.iter().any(|c| take_matching(&mut hand, c).is_none()) {
        return Ok(Verdict::reject("Таких карт нет на руке"));
    }
    if identify_chi_pattern(&cfg, response, &used).is_none() {
        return Ok(Verdict::reject("Неверная комбинация для чи"));
    }
    Ok(Verdict::accept())
}

fn apply_chi(
    config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let cfg = parse_config(config)?;
    let mut data = FourColorData::read(state)?;
    let response = claimable_discard(state, &data, player_id)
        .map_err(RuleError::InvalidState)?
        .clone();
    let used = parse_cards(payload).map_err(RuleError::InvalidPayload)?;
    let (_, points) = identify_chi_pattern(&cfg, &response, &used)
        .ok_or_else(|| RuleError::InvalidPayload("неверная комбинация для чи".into()))?;

    let mut next = state.clone();
    let mut meld_cards = vec![pop_discard(&mut next, &response)?];
    let hand = hand_mut(&mut next, player_id)?;
    for card in &used {
        let taken = take_matching(hand, card)
            .ok_or_else(|| RuleError::InvalidState("карты нет на руке".into()))?;
        meld_cards.push(taken);
    }

    push_meld(
        &mut next,
        player_id,
        Meld {
            kind: "chi".into(),
            cards: meld_cards,
            points,
        },
    );
    data.close_response();
    next.current_turn = Some(player_id);
    data.write(&mut next)?;
    Ok(next)
}

// ---------------------------------------------------------------------------
// peng
// ---------------------------------------------------------------------------

fn validate_peng(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    let response = reject_on_err!(claimable_discard(state, &data, player_id));
    if count_matching(state.hand(player_id), response) < 2 {
        return Ok(Verdict::reject("Для пэн нужны две такие же карты на руке"));
    }
    Ok(Verdict::accept())
}

fn apply_peng(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut data = FourColorData::read(state)?;
    let response = claimable_discard(state, &data, player_id)
        .map_err(RuleError::InvalidState)?
        .clone();

    let mut next = state.clone();
    let mut meld_cards = vec![pop_discard(&mut next, &response)?];
    let hand = hand_mut(&mut next, player_id)?;
    for _ in 0..2 {
        let taken = take_matching(hand, &response)
            .ok_or_else(|| RuleError::InvalidState("не хватает карт для пэн".into()))?;
        meld_cards.push(taken);
    }

    push_meld(
        &mut next,
        player_id,
        Meld {
            kind: "peng".into(),
            cards: meld_cards,
            points: 1,
        },
    );
    data.close_response();
    next.current_turn = Some(player_id);
    data.write(&mut next)?;
    Ok(next)
}

// ---------------------------------------------------------------------------
// kai: четвёртая карта к тройке (кан или пэн)
// ---------------------------------------------------------------------------

fn upgradable_meld(state: &GameState, player_id: PlayerId, card: &Card) -> Option<usize> {
    state.melds.get(&player_id)?.iter().position(|m| {
        (m.kind == "kan" || m.kind == "peng") && m.cards.first().is_some_and(|c| c.same_face(card))
    })
}

fn validate_kai(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    let response = reject_on_err!(claimable_discard(state, &data, player_id));
    if upgradable_meld(state, player_id, response).is_none() {
        return Ok(Verdict::reject("Нет подходящей тройки для кай"));
    }
    Ok(Verdict::accept())
}

fn apply_kai(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut data = FourColorData::read(state)?;
    let response = claimable_discard(state, &data, player_id)
        .map_err(RuleError::InvalidState)?
        .clone();
    let idx = upgradable_meld(state, player_id, &response)
        .ok_or_else(|| RuleError::InvalidState("нет тройки для кай".into()))?;

    let mut next = state.clone();
    let card = pop_discard(&mut next, &response)?;
    let melds = next.melds.entry(player_id).or_default();
    let mut base = melds.remove(idx);
    base.cards.push(card);
    melds.push(Meld {
        kind: "kai".into(),
        cards: base.cards,
        points: 6,
    });

    data.close_response();
    next.current_turn = Some(player_id);
    data.write(&mut next)?;
    Ok(next)
}

// ---------------------------------------------------------------------------
// hu
// ---------------------------------------------------------------------------

/// Откуда берётся выигрышная карта.
enum HuSource {
    /// Со сброса другого игрока.
    Discard(Card),
    /// Сам взял из прикупа, карта уже на руке.
    SelfDrawn,
}

fn hu_source(state: &GameState, data: &FourColorData, player_id: PlayerId) -> Result<HuSource, String> {
    if data.waiting_for_response {
        return claimable_discard(state, data, player_id).map(|c| HuSource::Discard(c.clone()));
    }
    if state.current_turn == Some(player_id) && drew_last(state, player_id) {
        return Ok(HuSource::SelfDrawn);
    }
    Err("Нечем объявить ху".into())
}

/// Упрощённое условие выигрыша: рука раскладывается на группы по 3 (остаток 0 или 1).
fn is_winning_hand(hand_len: usize) -> bool {
    hand_len % 3 == 0 || hand_len % 3 == 1
}

fn validate_hu(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    let source = reject_on_err!(hu_source(state, &data, player_id));
    let hand_len = state.hand(player_id).len()
        + match source {
            HuSource::Discard(_) => 1,
            HuSource::SelfDrawn => 0,
        };
    if !is_winning_hand(hand_len) {
        return Ok(Verdict::reject("Рука не складывается в выигрышную"));
    }
    Ok(Verdict::accept())
}

fn apply_hu(
    config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let cfg = parse_config(config)?;
    let mut data = FourColorData::read(state)?;
    let source = hu_source(state, &data, player_id).map_err(RuleError::InvalidState)?;

    let mut next = state.clone();
    if let HuSource::Discard(card) = source {
        let card = pop_discard(&mut next, &card)?;
        hand_mut(&mut next, player_id)?.push(card);
    }

    data.close_response();
    data.final_scores = Some(final_scores(&cfg, &next, player_id));
    data.winner = Some(player_id);
    data.outcome = Some("hu".into());
    data.game_ended = true;
    next.current_turn = Some(player_id);
    data.write(&mut next)?;
    Ok(next)
}

/// Победитель собирает очки своих мелдов с каждого (大胡: с множителем).
fn final_scores(cfg: &FourColorConfig, state: &GameState, winner: PlayerId) -> BTreeMap<PlayerId, i64> {
    let melds = state.melds.get(&winner).map(Vec::as_slice).unwrap_or(&[]);
    let mut score: i64 = melds.iter().map(|m| m.points).sum();
    let da_hu = melds.iter().any(|m| m.kind == "kai" || m.kind == "yu");
    if da_hu {
        score *= cfg.custom_data.scoring_rules.da_hu_multiplier;
    }

    let others = state.players.len().saturating_sub(1) as i64;
    state
        .players
        .iter()
        .map(|&p| (p, if p == winner { score * others } else { -score }))
        .collect()
}

// ---------------------------------------------------------------------------
// draw
// ---------------------------------------------------------------------------

fn validate_draw(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    if state.current_turn != Some(player_id) {
        return Ok(Verdict::reject("Сейчас не ваш ход"));
    }
    if data.waiting_for_response {
        return Ok(Verdict::reject("Нельзя брать карту, пока ждём ответа"));
    }
    if state.draw_pile.is_empty() {
        return Ok(Verdict::reject("Прикуп пуст"));
    }
    if drew_last(state, player_id) {
        return Ok(Verdict::reject("Сначала сбросьте взятую карту"));
    }
    Ok(Verdict::accept())
}

fn apply_draw(
    config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let cfg = parse_config(config)?;
    let mut data = FourColorData::read(state)?;

    let mut next = state.clone();
    let card = next
        .draw_pile
        .draw_one()
        .ok_or_else(|| RuleError::InvalidState("прикуп пуст".into()))?;
    hand_mut(&mut next, player_id)?.push(card.clone());
    next.last_play = Some(LastPlay {
        player: player_id,
        cards: vec![card],
        kind: DRAW.to_string(),
    });

    // 流局: прикуп исчерпан до лимита, ничья.
    if next.draw_pile.len() <= cfg.custom_data.scoring_rules.liuju_deck_limit {
        data.outcome = Some("liuju".into());
        data.final_scores = Some(next.players.iter().map(|&p| (p, 0)).collect());
        data.game_ended = true;
    }

    data.write(&mut next)?;
    Ok(next)
}

// ---------------------------------------------------------------------------
// pass
// ---------------------------------------------------------------------------

fn validate_pass(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<Verdict, RuleError> {
    let data = FourColorData::read(state)?;
    if data.waiting_for_response {
        if data.response_allowed_players.contains(&player_id) {
            return Ok(Verdict::accept());
        }
        return Ok(Verdict::reject("Вам сейчас нельзя пасовать"));
    }
    if state.current_turn == Some(player_id) && drew_last(state, player_id) {
        return Ok(Verdict::accept());
    }
    Ok(Verdict::reject("Пасовать сейчас нельзя"))
}

fn apply_pass(
    _config: &serde_json::Value,
    state: &GameState,
    player_id: PlayerId,
    _payload: &serde_json::Value,
) -> Result<GameState, RuleError> {
    let mut data = FourColorData::read(state)?;
    let mut next = state.clone();

    if data.waiting_for_response {
        // Отказ от ответа: ход остаётся у отвечавшего, теперь он берёт карту.
        data.close_response();
    } else {
        // Пас после добора: взятая карта уходит в сброс.
        let drawn = state
            .last_play
            .as_ref()
            .and_then(|lp| lp.cards.first())
            .cloned()
            .ok_or_else(|| RuleError::InvalidState("нет взятой карты".into()))?;
        let card = take_matching(hand_mut(&mut next, player_id)?, &drawn)
            .ok_or_else(|| RuleError::InvalidState("взятой карты нет на руке".into()))?;
        discard_and_pass_turn(&mut next, &mut data, player_id, card)?;
    }

    data.write(&mut next)?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logic() -> FourColorCard {
        FourColorCard::from_config(&default_config()).unwrap()
    }

    #[test]
    fn deck_has_expected_size() {
        // 4 масти × 7 рангов × 4 копии + 5 цзинь тяо
        assert_eq!(logic().build_deck().len(), 117);
    }

    #[test]
    fn chi_sequence_needs_same_suit() {
        let cfg = parse_config(&default_config()).unwrap();
        let response = Card::new("red", "车");
        let ok = [Card::new("red", "马"), Card::new("red", "炮")];
        let mixed = [Card::new("red", "马"), Card::new("green", "炮")];
        assert_eq!(
            identify_chi_pattern(&cfg, &response, &ok),
            Some(("sequence".to_string(), 1))
        );
        assert_eq!(identify_chi_pattern(&cfg, &response, &mixed), None);
    }

    #[test]
    fn chi_soldiers_of_four_suits_score_two() {
        let cfg = parse_config(&default_config()).unwrap();
        let response = Card::new("red", SOLDIER);
        let used = [
            Card::new("yellow", SOLDIER),
            Card::new("green", SOLDIER),
            Card::new("white", SOLDIER),
        ];
        assert_eq!(
            identify_chi_pattern(&cfg, &response, &used),
            Some(("soldier_diff_4".to_string(), 2))
        );
    }

    #[test]
    fn single_jin_tiao_is_claimable_alone() {
        let cfg = parse_config(&default_config()).unwrap();
        let response = Card::with_kind("red", "公", JIN_TIAO);
        assert_eq!(
            identify_chi_pattern(&cfg, &response, &[]),
            Some(("single_jin_tiao".to_string(), 3))
        );
    }

    #[test]
    fn bonus_values_follow_suit_order() {
        assert_eq!(bonus_value(&Card::new("yellow", GENERAL)), 1);
        assert_eq!(bonus_value(&Card::new("white", GENERAL)), 4);
        assert_eq!(bonus_value(&Card::new("purple", GENERAL)), 0);
    }
}
