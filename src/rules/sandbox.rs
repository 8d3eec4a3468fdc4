use std::time::Duration;

use crate::engine::errors::EngineError;
use crate::rules::RuleError;

/// Изолированный запуск кода модуля правил.
///
/// Каждый вызов идёт отдельной blocking-задачей tokio, паника модуля
/// перехватывается и не трогает ни вызывающий поток, ни другие столы.
/// Вызов ограничен по времени; по таймауту возвращаем `RuleTimeout`
/// (повисшая задача остаётся на blocking-пуле и ничего не коммитит).
#[derive(Clone, Debug)]
pub struct RuleSandbox {
    timeout: Duration,
}

impl RuleSandbox {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<T, F>(&self, rule: &str, entry_point: &str, call: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<T, RuleError> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(call);

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                log::warn!(
                    "rule {rule}: {entry_point} не уложился в {} мс",
                    self.timeout.as_millis()
                );
                Err(EngineError::RuleTimeout {
                    rule: rule.to_string(),
                    entry_point: entry_point.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
            Ok(Err(join_err)) => {
                let reason = if join_err.is_panic() {
                    "паника в коде модуля".to_string()
                } else {
                    "вызов отменён".to_string()
                };
                log::error!("rule {rule}: {entry_point}: {reason}");
                Err(EngineError::RuleModule {
                    rule: rule.to_string(),
                    entry_point: entry_point.to_string(),
                    reason,
                })
            }
            Ok(Ok(Err(rule_err))) => {
                log::error!("rule {rule}: {entry_point}: {rule_err}");
                Err(EngineError::RuleModule {
                    rule: rule.to_string(),
                    entry_point: entry_point.to_string(),
                    reason: rule_err.to_string(),
                })
            }
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}
