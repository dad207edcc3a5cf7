use serde::{Deserialize, Serialize};

/// Engine-wide ceilings and budgets.
///
/// Everything here guards the shared simulation loop; the defaults are
/// deliberately conservative and a host can widen them from its own config
/// file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard ceiling on occurrences processed per scheduling tick. Excess
    /// occurrences are dropped, never queued.
    #[serde(default = "default_max_occurrences_per_tick")]
    pub max_occurrences_per_tick: u32,

    /// Ceiling on event-handler chains one player may register.
    #[serde(default = "default_max_handlers_per_player")]
    pub max_handlers_per_player: usize,

    /// Soft per-handler wall-clock budget in milliseconds; measured and
    /// logged, never enforced.
    #[serde(default = "default_handler_time_budget_ms")]
    pub handler_time_budget_ms: u64,

    /// Hard ceiling on bounded-loop iterations.
    #[serde(default = "default_loop_iteration_ceiling")]
    pub loop_iteration_ceiling: u32,

    /// Minimum ticks between loop iterations.
    #[serde(default = "default_loop_min_delay_ticks")]
    pub loop_min_delay_ticks: u32,
}

fn default_max_occurrences_per_tick() -> u32 {
    512
}

fn default_max_handlers_per_player() -> usize {
    64
}

fn default_handler_time_budget_ms() -> u64 {
    5
}

fn default_loop_iteration_ceiling() -> u32 {
    2048
}

fn default_loop_min_delay_ticks() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_occurrences_per_tick: default_max_occurrences_per_tick(),
            max_handlers_per_player: default_max_handlers_per_player(),
            handler_time_budget_ms: default_handler_time_budget_ms(),
            loop_iteration_ceiling: default_loop_iteration_ceiling(),
            loop_min_delay_ticks: default_loop_min_delay_ticks(),
        }
    }
}

impl EngineConfig {
    /// Parse from a TOML fragment, filling omitted fields with defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_omitted_fields() {
        let config = EngineConfig::from_toml_str("max_occurrences_per_tick = 100").unwrap();
        assert_eq!(config.max_occurrences_per_tick, 100);
        assert_eq!(config.loop_iteration_ceiling, 2048);
        assert_eq!(config.loop_min_delay_ticks, 1);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_handlers_per_player, 64);
    }
}
