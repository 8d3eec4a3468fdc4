use crate::domain::RuleModuleRecord;
use crate::infra::persistence::{GameStore, StorageError};
use crate::rules::four_color;

/// Засеять встроенные модули правил. Повторный вызов ничего не меняет.
///
/// Возвращает имена модулей, которые реально были добавлены.
pub fn seed_builtin_rules(store: &dyn GameStore) -> Result<Vec<String>, StorageError> {
    let mut inserted = Vec::new();

    for rule in builtin_rules() {
        let name = rule.name.clone();
        if store.insert_rule_if_absent(rule)? {
            log::info!("seed: добавлен модуль правил {name:?}");
            inserted.push(name);
        } else {
            log::debug!("seed: модуль правил {name:?} уже есть");
        }
    }

    Ok(inserted)
}

/// Все встроенные модули правил.
pub fn builtin_rules() -> Vec<RuleModuleRecord> {
    vec![RuleModuleRecord {
        name: four_color::RULE_NAME.to_string(),
        description: "四色牌: четыре масти, семь рангов и пять особых карт «цзинь тяо».".to_string(),
        config: four_color::default_config(),
        logic: four_color::LOGIC_REF.to_string(),
    }]
}
