use serde::{Deserialize, Serialize};

/// Опубликованный модуль правил: имя, конфиг и ссылка на логику.
///
/// После публикации не меняется; ищется по имени.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RuleModuleRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Конфиг игры: состав колоды, очки и т.д. Движок читает только `meta`.
    pub config: serde_json::Value,
    /// Ключ реализации в каталоге загрузчика (например, `four_color_card`).
    pub logic: String,
}

/// Сколько игроков нужно для старта и сколько помещается за стол.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerCountLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for PlayerCountLimits {
    fn default() -> Self {
        Self { min: 2, max: 8 }
    }
}

/// Кто и когда запускает партию.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Старт вручную владельцем, готовность не нужна.
    #[default]
    Owner,
    /// Старт владельцем, но только когда все отметились готовыми.
    OwnerWhenAllReady,
    /// Старт автоматически, как только все готовы (владелец тоже может стартовать).
    AutoWhenAllReady,
}

impl StartPolicy {
    pub fn requires_all_ready(self) -> bool {
        !matches!(self, StartPolicy::Owner)
    }
}

/// Часть конфига, которую понимает движок (`config.meta`).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleMeta {
    #[serde(default)]
    pub player_count: PlayerCountLimits,
    #[serde(default)]
    pub start_policy: StartPolicy,
}

impl RuleMeta {
    /// Прочитать `meta` из конфига. Отсутствие `meta` = значения по умолчанию.
    pub fn from_config(config: &serde_json::Value) -> Result<Self, String> {
        let meta = match config.get("meta") {
            Some(meta) => serde_json::from_value::<RuleMeta>(meta.clone())
                .map_err(|e| format!("Некорректный meta в конфиге: {e}"))?,
            None => RuleMeta::default(),
        };

        let limits = meta.player_count;
        if limits.min == 0 || limits.min > limits.max {
            return Err(format!(
                "Некорректные границы числа игроков: min={}, max={}",
                limits.min, limits.max
            ));
        }
        Ok(meta)
    }
}
