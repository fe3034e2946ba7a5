//! Global settings loaded from TOML.
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
        parse_settings_toml(toml_str).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "settings rejected, using defaults");
            Settings::default()
        })
    })
}

/// Returns the embedded default settings TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_SETTINGS_TOML
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

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub suggestions: SuggestionSettings,
    pub generation: GenerationSettings,
    pub features: FeatureSettings,
    pub channel: ChannelSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionSettings {
    pub word_limit: usize,
    pub emoji_debounce_ms: u64,
    pub max_messages: usize,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            word_limit: 3,
            emoji_debounce_ms: 1000,
            max_messages: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationSettings {
    pub model_asset: String,
    pub max_tokens: u32,
    pub top_k: u32,
    pub temperature: f32,
    pub allow_emojis: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_asset: "gemma-3-1b.task".to_string(),
            max_tokens: 512,
            top_k: 4,
            temperature: 0.0,
            allow_emojis: true,
        }
    }
}

/// Optional feature modules wired into the session.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureSettings {
    pub word_suggestions: bool,
    pub reply_options: bool,
    pub llm_assist: bool,
    /// Generate reply options locally from message snapshots.
    pub llm_replies: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            word_suggestions: true,
            reply_options: true,
            llm_assist: true,
            llm_replies: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSettings {
    pub emotion_action: String,
    pub reply_options_action: String,
    pub messages_action: String,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            emotion_action: "kz.project.minimessenger.EMOTION_RECEIVED".to_string(),
            reply_options_action: "kz.project.minimessenger.SEND_REPLY_OPTIONS".to_string(),
            messages_action: "kz.project.minimessenger.SEND_MESSAGES_WITH_EMOTION".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    pub action: String,
    pub target_package: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            action: "kz.project.minimessenger.ACTION_KEYBOARD_EVENT".to_string(),
            target_package: "kz.project.minimessenger".to_string(),
        }
    }
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
    macro_rules! check_non_empty {
        ($section:ident . $field:ident) => {
            if s.$section.$field.trim().is_empty() {
                return Err(SettingsError::InvalidValue {
                    field: concat!(stringify!($section), ".", stringify!($field)).to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        };
    }

    check_positive!(suggestions.word_limit);
    check_positive!(suggestions.max_messages);
    check_positive!(generation.max_tokens);
    check_positive!(generation.top_k);
    if !(0.0..=2.0).contains(&s.generation.temperature) {
        return Err(SettingsError::InvalidValue {
            field: "generation.temperature".to_string(),
            reason: "must be within 0.0..=2.0".to_string(),
        });
    }

    check_non_empty!(generation.model_asset);
    check_non_empty!(channel.emotion_action);
    check_non_empty!(channel.reply_options_action);
    check_non_empty!(channel.messages_action);
    check_non_empty!(telemetry.action);
    check_non_empty!(telemetry.target_package);

    let actions = [
        &s.channel.emotion_action,
        &s.channel.reply_options_action,
        &s.channel.messages_action,
    ];
    for (i, a) in actions.iter().enumerate() {
        if actions[i + 1..].contains(a) {
            return Err(SettingsError::InvalidValue {
                field: "channel".to_string(),
                reason: format!("action {a} is used for more than one notification kind"),
            });
        }
    }

    // emoji_debounce_ms = 0 is allowed: emoji refresh on the next poll.
    Ok(())
}
