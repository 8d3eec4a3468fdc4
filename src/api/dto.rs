use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    Action, Card, GameStateRecord, LastPlay, Meld, PlayerId, SeqNo, Table, TableId, TableStatus,
};

/// Вид `last_play` после добора из прикупа.
const DRAW_KIND: &str = "draw";

/// DTO участника стола.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MemberDto {
    pub player_id: PlayerId,
    pub seat_index: usize,
    pub ready: bool,
    pub is_owner: bool,
}

/// DTO стола (для лобби и экрана стола). Пароль наружу не отдаём.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TableViewDto {
    pub table_id: TableId,
    pub name: String,
    pub rule: String,
    pub owner: PlayerId,
    pub status: TableStatus,
    pub members: Vec<MemberDto>,
    pub is_private: bool,
    pub has_secret: bool,
    pub current_game: Option<u64>,
}

impl TableViewDto {
    pub fn from_table(table: &Table) -> Self {
        let members = table
            .members
            .iter()
            .enumerate()
            .map(|(idx, &player_id)| MemberDto {
                player_id,
                seat_index: idx,
                ready: table.is_ready(player_id),
                is_owner: player_id == table.owner,
            })
            .collect();

        Self {
            table_id: table.id,
            name: table.name.clone(),
            rule: table.rule.clone(),
            owner: table.owner,
            status: table.status,
            members,
            is_private: table.is_private,
            has_secret: table.secret.is_some(),
            current_game: table.current_game,
        }
    }
}

/// Партия глазами одного игрока: свои карты видны, у чужих только количество.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameStateViewDto {
    pub table_id: TableId,
    pub version: u64,
    pub round: u32,
    pub players: Vec<PlayerId>,
    pub current_turn: Option<PlayerId>,
    /// Рука смотрящего (None, если он не играет за этим столом).
    pub my_hand: Option<Vec<Card>>,
    pub hand_sizes: BTreeMap<PlayerId, usize>,
    pub draw_pile_size: usize,
    pub discard_pile: Vec<Card>,
    pub last_play: Option<LastPlay>,
    pub melds: BTreeMap<PlayerId, Vec<Meld>>,
    pub game_data: serde_json::Value,
}

impl GameStateViewDto {
    pub fn for_viewer(record: &GameStateRecord, viewer: Option<PlayerId>) -> Self {
        let state = &record.state;
        let my_hand = viewer.and_then(|p| state.hands.get(&p).cloned());

        Self {
            table_id: record.table_id,
            version: record.version,
            round: state.round,
            players: state.players.clone(),
            current_turn: state.current_turn,
            my_hand,
            hand_sizes: state.hands.iter().map(|(&p, h)| (p, h.len())).collect(),
            draw_pile_size: state.draw_pile.len(),
            discard_pile: state.discard_pile.clone(),
            last_play: state.last_play.as_ref().map(|lp| visible_play(lp, viewer)),
            melds: state.melds.clone(),
            game_data: state.game_data.clone(),
        }
    }
}

/// Добор из прикупа видит только тот, кто добирал: карта ушла в закрытую руку.
fn visible_play(play: &LastPlay, viewer: Option<PlayerId>) -> LastPlay {
    if play.kind == DRAW_KIND && viewer != Some(play.player) {
        return LastPlay {
            player: play.player,
            cards: Vec::new(),
            kind: play.kind.clone(),
        };
    }
    play.clone()
}

/// DTO записи лога.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionDto {
    pub sequence_number: SeqNo,
    pub player_id: PlayerId,
    pub action_type: String,
    pub payload: serde_json::Value,
}

impl From<&Action> for ActionDto {
    fn from(action: &Action) -> Self {
        Self {
            sequence_number: action.sequence_number,
            player_id: action.player_id,
            action_type: action.action_type.to_string(),
            payload: action.payload.clone(),
        }
    }
}
