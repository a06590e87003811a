//! Engine tuning loaded from TOML, following an OnceLock singleton pattern.
//!
//! - `init_custom(toml_content)` sets a custom TOML before first `settings()` call
//! - `settings()` returns `&'static Settings` (lazy-init singleton)
//! - Default values are embedded via `include_str!("default_settings.toml")`

use std::sync::OnceLock;

use serde::Deserialize;

pub const DEFAULT_SETTINGS_TOML: &str = include_str!("default_settings.toml");

static CUSTOM_TOML: OnceLock<String> = OnceLock::new();

/// Set custom TOML before first `settings()` call.
pub fn init_custom(toml_content: String) -> Result<(), SettingsError> {
    parse_settings_toml(&toml_content)?;
    CUSTOM_TOML
        .set(toml_content)
        .map_err(|_| SettingsError::AlreadyInitialized)
}

/// Get or initialize the global settings singleton.
pub fn settings() -> &'static Settings {
    static INSTANCE: OnceLock<Settings> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let toml_str = CUSTOM_TOML
            .get()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SETTINGS_TOML);
        parse_settings_toml(toml_str).expect("settings TOML must be valid")
    })
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("settings already initialized")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub caches: CacheSettings,
    pub correction: CorrectionSettings,
    pub user_dict: UserDictSettings,
    pub predictor: PredictorSettings,
}

/// LRU capacities. `negative_lookup` bounds the absent-word set that
/// short-circuits repeated misses against the static trie.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub prefix: usize,
    pub spell: usize,
    pub context: usize,
    pub utf32: usize,
    pub negative_lookup: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionSettings {
    /// Stage-2 rejects inputs longer than this many code points.
    pub max_input_len: usize,
    /// Fast mode: substitutions considered per position per table.
    pub fast_per_position: usize,
    /// Fast mode: total candidate cap is `factor * max_results`.
    pub fast_candidate_factor: usize,
    /// Full mode: total candidate cap is `factor * max_results`.
    pub full_candidate_factor: usize,
    pub fast_max_distance: usize,
    pub full_max_distance: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDictSettings {
    /// Snapshot builder timed-wait interval.
    pub snapshot_wait_ms: u64,
    /// Node budget for the trie BFS fallback in prefix search.
    pub bfs_node_limit: usize,
    /// Entries idle longer than this lose one frequency point per decay pass.
    pub decay_after_days: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictorSettings {
    /// Caller-side wait budget for the blocking Stage-3 wrapper.
    pub heavy_timeout_ms: u64,
    /// Result count requested by Stage-3.
    pub heavy_results: usize,
}

pub fn parse_settings_toml(toml_str: &str) -> Result<Settings, SettingsError> {
    let s: Settings = toml::from_str(toml_str).map_err(|e| SettingsError::Parse(e.to_string()))?;
    validate(&s)?;
    Ok(s)
}

fn validate(s: &Settings) -> Result<(), SettingsError> {
    macro_rules! check_positive {
        ($section:ident . $field:ident) => {
            if s.$section.$field == 0 {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        };
    }

    check_positive!(caches.prefix);
    check_positive!(caches.spell);
    check_positive!(caches.context);
    check_positive!(caches.utf32);
    check_positive!(caches.negative_lookup);

    check_positive!(correction.max_input_len);
    check_positive!(correction.fast_per_position);
    check_positive!(correction.fast_candidate_factor);
    check_positive!(correction.full_candidate_factor);
    check_positive!(correction.fast_max_distance);
    check_positive!(correction.full_max_distance);

    check_positive!(user_dict.snapshot_wait_ms);
    check_positive!(user_dict.bfs_node_limit);
    check_positive!(user_dict.decay_after_days);

    check_positive!(predictor.heavy_timeout_ms);
    check_positive!(predictor.heavy_results);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_toml() {
        let s = parse_settings_toml(DEFAULT_SETTINGS_TOML).unwrap();
        assert_eq!(s.caches.prefix, 500);
        assert_eq!(s.caches.spell, 2000);
        assert_eq!(s.caches.context, 3000);
        assert_eq!(s.caches.utf32, 5000);
        assert_eq!(s.caches.negative_lookup, 10000);
        assert_eq!(s.correction.max_input_len, 10);
        assert_eq!(s.correction.fast_per_position, 2);
        assert_eq!(s.correction.fast_candidate_factor, 5);
        assert_eq!(s.correction.full_candidate_factor, 10);
        assert_eq!(s.correction.fast_max_distance, 2);
        assert_eq!(s.correction.full_max_distance, 3);
        assert_eq!(s.user_dict.snapshot_wait_ms, 100);
        assert_eq!(s.user_dict.bfs_node_limit, 200);
        assert_eq!(s.user_dict.decay_after_days, 30);
        assert_eq!(s.predictor.heavy_timeout_ms, 100);
        assert_eq!(s.predictor.heavy_results, 10);
    }

    #[test]
    fn error_zero_capacity() {
        let toml = DEFAULT_SETTINGS_TOML.replace("prefix = 500", "prefix = 0");
        let err = parse_settings_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("caches.prefix"));
    }

    #[test]
    fn error_invalid_toml() {
        let err = parse_settings_toml("not valid toml {{{").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn error_missing_section() {
        let err = parse_settings_toml("[caches]\nprefix = 1\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
