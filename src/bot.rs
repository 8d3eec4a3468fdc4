//! Простой бот для «四色牌».
//!
//! Бот ходит только через `TableManager::submit`, как обычный клиент:
//! - ждут его ответа на сброс: иногда пробует ху / пэн / чи, иначе пас;
//! - его ход: если только что взял карту, сбрасывает случайную, иначе берёт.
//!
//! Отклонённое действие не считается ошибкой, бот просто пробует следующее.

use serde_json::json;

use crate::domain::{count_matching, Action, GameState, PlayerId, TableId, TableStatus};
use crate::engine::{EngineError, SubmitAction, TableManager};
use crate::infra::rng::RandomSource;
use crate::rules::four_color::{FourColorCard, FourColorData};

const HU_CHANCE: f64 = 0.1;
const PENG_CHANCE: f64 = 0.3;
const CHI_CHANCE: f64 = 0.2;

pub struct BotPlayer<R: RandomSource> {
    pub player_id: PlayerId,
    pub table_id: TableId,
    rules: FourColorCard,
    rng: R,
}

impl<R: RandomSource> BotPlayer<R> {
    pub fn new(player_id: PlayerId, table_id: TableId, rules: FourColorCard, rng: R) -> Self {
        Self {
            player_id,
            table_id,
            rules,
            rng,
        }
    }

    /// Ждёт ли партия хода от этого бота.
    pub fn has_move(&self, state: &GameState) -> bool {
        if state.is_terminal() {
            return false;
        }
        match FourColorData::read(state) {
            Ok(data) if data.waiting_for_response => {
                data.response_allowed_players.contains(&self.player_id)
            }
            Ok(_) => state.current_turn == Some(self.player_id),
            Err(_) => false,
        }
    }

    /// Действия в порядке предпочтения. Последнее всегда допустимо.
    pub fn candidates(&mut self, state: &GameState) -> Vec<SubmitAction> {
        let waiting = FourColorData::read(state)
            .map(|d| d.waiting_for_response)
            .unwrap_or(false);

        let mut out = Vec::new();
        if waiting {
            self.respond_to_play(state, &mut out);
        } else {
            self.play_turn(state, &mut out);
        }
        out
    }

    fn action(&self, action_type: &str, payload: serde_json::Value) -> SubmitAction {
        SubmitAction::new(self.table_id, self.player_id, action_type, payload)
    }

    fn respond_to_play(&mut self, state: &GameState, out: &mut Vec<SubmitAction>) {
        let hand = state.hand(self.player_id);
        let last_card = state.last_play.as_ref().and_then(|lp| lp.cards.first());

        if let Some(card) = last_card {
            if self.rng.chance(HU_CHANCE) {
                out.push(self.action("hu", json!({})));
            }
            if count_matching(hand, card) >= 2 && self.rng.chance(PENG_CHANCE) {
                out.push(self.action("peng", json!({})));
            }
            if self.rng.chance(CHI_CHANCE) {
                if let Some(cards) = self.rules.find_chi_combination(card, hand) {
                    out.push(self.action("chi", json!({ "cards": cards })));
                }
            }
        }

        out.push(self.action("pass", json!({})));
    }

    fn play_turn(&mut self, state: &GameState, out: &mut Vec<SubmitAction>) {
        let just_drew = state
            .last_play
            .as_ref()
            .is_some_and(|lp| lp.kind == "draw" && lp.player == self.player_id);
        let hand = state.hand(self.player_id);

        if just_drew && !hand.is_empty() {
            let card = &hand[self.rng.pick_index(hand.len())];
            out.push(self.action("play_cards", json!({ "cards": [card] })));
        } else {
            out.push(self.action("draw", json!({})));
        }
    }

    /// Сделать один ход, если сейчас очередь бота.
    pub async fn play_once(&mut self, manager: &TableManager) -> Result<Option<Action>, EngineError> {
        let record = manager.game_state(self.table_id)?;
        if !self.has_move(&record.state) {
            return Ok(None);
        }

        for request in self.candidates(&record.state) {
            let action_type = request.action_type.clone();
            match manager.submit(request).await {
                Ok(action) => return Ok(Some(action)),
                Err(EngineError::ActionRejected { reason }) => {
                    log::debug!("bot {}: {action_type} отклонено: {reason}", self.player_id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }
}

/// Гонять ботов по кругу, пока стол не закончит партию.
///
/// Возвращает число принятых действий. `max_actions`: предохранитель от зацикливания.
pub async fn play_until_finished<R: RandomSource>(
    manager: &TableManager,
    bots: &mut [BotPlayer<R>],
    max_actions: usize,
) -> Result<usize, EngineError> {
    let Some(table_id) = bots.first().map(|b| b.table_id) else {
        return Ok(0);
    };

    let mut accepted = 0;
    while manager.table(table_id)?.status == TableStatus::Playing {
        let mut moved = false;
        for bot in bots.iter_mut() {
            if bot.play_once(manager).await?.is_some() {
                accepted += 1;
                moved = true;
                break;
            }
        }

        if !moved {
            return Err(EngineError::Internal(format!(
                "стол {table_id}: ни один бот не может сделать ход"
            )));
        }
        if accepted >= max_actions && manager.table(table_id)?.status == TableStatus::Playing {
            return Err(EngineError::Internal(format!(
                "стол {table_id}: партия не закончилась за {max_actions} действий"
            )));
        }
    }
    Ok(accepted)
}
