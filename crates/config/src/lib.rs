//! Configuration loading, validation, and management for Synapse.
//!
//! Loads configuration from `~/.synapse/config.toml` with environment
//! variable overrides. Validates all settings at startup.
//!
//! The persona table and the model candidate lists live here as data, so
//! tests and deployments can substitute their own.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.synapse/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM provider the model lists are sent to
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Optional cap on tokens per response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_tokens: Option<u32>,

    /// Model candidate lists, in priority order
    #[serde(default)]
    pub models: ModelsConfig,

    /// Persona name → tone descriptor
    #[serde(default)]
    pub personas: PersonaTable,

    /// Assistant identity and locale
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Document context limits
    #[serde(default)]
    pub context: ContextConfig,

    /// Interaction storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("models", &self.models)
            .field("personas", &self.personas)
            .field("assistant", &self.assistant)
            .field("context", &self.context)
            .field("storage", &self.storage)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

// --- Models ---

/// Which kind of input a candidate model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Vision,
}

/// One named backend model the dispatcher may try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub identifier: String,
    pub modality: Modality,
}

/// The fallback chains. Order is priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Tried when an image is attached, regardless of fast mode
    #[serde(default = "default_vision_models")]
    pub vision: Vec<String>,

    /// Text models when the caller asks for fast mode
    #[serde(default = "default_fast_models")]
    pub fast: Vec<String>,

    /// Text models otherwise
    #[serde(default = "default_quality_models")]
    pub quality: Vec<String>,

    /// Per-submission timeout. Unset means the dispatcher waits on the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_timeout_secs: Option<u64>,
}

fn default_vision_models() -> Vec<String> {
    vec![
        "llama-3.2-90b-vision-preview".into(),
        "llama-3.2-11b-vision-preview".into(),
    ]
}
fn default_fast_models() -> Vec<String> {
    vec!["llama-3.1-8b-instant".into()]
}
fn default_quality_models() -> Vec<String> {
    vec![
        "llama-3.3-70b-versatile".into(),
        "llama-3.1-70b-versatile".into(),
    ]
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            vision: default_vision_models(),
            fast: default_fast_models(),
            quality: default_quality_models(),
            submit_timeout_secs: None,
        }
    }
}

impl ModelsConfig {
    /// Select the candidate list for a request.
    pub fn select(&self, has_image: bool, fast_mode: bool) -> Vec<ModelCandidate> {
        let (ids, modality) = if has_image {
            (&self.vision, Modality::Vision)
        } else if fast_mode {
            (&self.fast, Modality::Text)
        } else {
            (&self.quality, Modality::Text)
        };

        ids.iter()
            .map(|id| ModelCandidate {
                identifier: id.clone(),
                modality,
            })
            .collect()
    }
}

// --- Personas ---

/// The name every unknown persona falls back to.
pub const DEFAULT_PERSONA: &str = "Default";

const DEFAULT_TONE: &str = "Standard preset style and tone.";

/// Fixed persona → tone table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaTable(BTreeMap<String, String>);

impl PersonaTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// The tone descriptor for `persona`, or the `Default` entry.
    pub fn tone(&self, persona: &str) -> &str {
        self.0
            .get(persona)
            .or_else(|| self.0.get(DEFAULT_PERSONA))
            .map(String::as_str)
            .unwrap_or(DEFAULT_TONE)
    }

    pub fn contains(&self, persona: &str) -> bool {
        self.0.contains_key(persona)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl Default for PersonaTable {
    fn default() -> Self {
        let entries = [
            (DEFAULT_PERSONA, DEFAULT_TONE),
            ("Professional", "Polished and precise."),
            ("Friendly", "Warm and chatty."),
            ("Candid", "Direct and encouraging."),
            ("Quirky", "Playful and imaginative."),
            ("Efficient", "Concise and plain."),
            ("Nerdy", "Exploratory and enthusiastic."),
            ("Cynical", "Critical and sarcastic."),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

// --- Assistant ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_name")]
    pub name: String,

    /// Region named in the identity line and in location clauses
    #[serde(default = "default_region")]
    pub region: String,

    /// Language code → language name used in "Respond in ..."
    #[serde(default = "default_languages")]
    pub languages: BTreeMap<String, String>,
}

fn default_assistant_name() -> String {
    "Synapse-V".into()
}
fn default_region() -> String {
    "India".into()
}
fn default_languages() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("en".to_string(), "English".to_string()),
        ("hi".to_string(), "Hindi".to_string()),
    ])
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: default_assistant_name(),
            region: default_region(),
            languages: default_languages(),
        }
    }
}

impl AssistantConfig {
    /// Language name for a code; unknown codes answer in English.
    pub fn language_name(&self, code: &str) -> &str {
        self.languages
            .get(code)
            .map(String::as_str)
            .unwrap_or("English")
    }
}

// --- Context ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Hard cap on document context, in characters
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,

    /// Appended after a truncated context
    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,

    /// Rows rendered from CSV and spreadsheet files
    #[serde(default = "default_table_preview_rows")]
    pub table_preview_rows: usize,
}

fn default_max_document_chars() -> usize {
    20_000
}
fn default_truncation_marker() -> String {
    "\n... [Content Truncated] ...".into()
}
fn default_table_preview_rows() -> usize {
    20
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_document_chars: default_max_document_chars(),
            truncation_marker: default_truncation_marker(),
            table_preview_rows: default_table_preview_rows(),
        }
    }
}

// --- Storage ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "sqlite" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database file; defaults to `~/.synapse/synapse_v.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Save every completed streamed answer
    #[serde(default = "default_true")]
    pub auto_save: bool,
}

fn default_storage_backend() -> String {
    "sqlite".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: None,
            auto_save: true,
        }
    }
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("synapse_v.db"))
    }
}

// --- Gateway ---

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Where uploads are written; defaults to `~/.synapse/uploads`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<PathBuf>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,

    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// When set, every route except `/health` requires `Authorization: Bearer <token>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}
fn default_rate_limit() -> usize {
    60
}
fn default_allowed_origin() -> String {
    "http://localhost:8501".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            upload_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
            rate_limit_per_minute: default_rate_limit(),
            allowed_origin: default_allowed_origin(),
            api_token: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("upload_dir", &self.upload_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("allowed_origin", &self.allowed_origin)
            .field("api_token", &redact(&self.api_token))
            .finish()
    }
}

impl GatewayConfig {
    pub fn upload_dir(&self) -> PathBuf {
        self.upload_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("uploads"))
    }
}

// --- Providers ---

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.synapse/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SYNAPSE_API_KEY` (highest priority), `GROQ_API_KEY`, `OPENAI_API_KEY`
    /// - `SYNAPSE_PROVIDER`
    /// - `SYNAPSE_DB`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("SYNAPSE_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("SYNAPSE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(db) = std::env::var("SYNAPSE_DB") {
            self.storage.path = Some(PathBuf::from(db));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".synapse")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        for (name, list) in [
            ("models.vision", &self.models.vision),
            ("models.fast", &self.models.fast),
            ("models.quality", &self.models.quality),
        ] {
            if list.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must list at least one model"
                )));
            }
        }

        if !self.personas.contains(DEFAULT_PERSONA) {
            return Err(ConfigError::ValidationError(format!(
                "personas must contain a '{DEFAULT_PERSONA}' entry"
            )));
        }

        if self.context.max_document_chars == 0 {
            return Err(ConfigError::ValidationError(
                "context.max_document_chars must be > 0".into(),
            ));
        }

        if !matches!(self.storage.backend.as_str(), "sqlite" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown storage backend '{}'",
                self.storage.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_temperature: default_temperature(),
            default_max_tokens: None,
            models: ModelsConfig::default(),
            personas: PersonaTable::default(),
            assistant: AssistantConfig::default(),
            context: ContextConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
