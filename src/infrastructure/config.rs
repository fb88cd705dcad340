use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::application::services::{
    AccessPolicy, BotTexts, DEFAULT_CHUNK_SIZE, DEFAULT_NO_RESULTS_MESSAGE, DEFAULT_SYSTEM_PROMPT,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("failed to read prompts from {path}: {reason}")]
    Prompts { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub access: AccessConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub storage: StorageConfig,
    pub ingestion: IngestionConfig,
    pub ocr: OcrConfig,
    pub prompts_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    pub admin_user_ids: Vec<u64>,
    pub home_chat_id: Option<i64>,
}

impl AccessConfig {
    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy {
            admins: self.admin_user_ids.iter().copied().collect::<HashSet<_>>(),
            home_chat: self.home_chat_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimension: usize,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub qdrant_url: Option<String>,
    pub qdrant_collection: String,
    pub redis_url: Option<String>,
}

impl StorageConfig {
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn state_db(&self) -> PathBuf {
        self.data_dir.join("bot_data.db")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub chunk_size: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub binary: PathBuf,
    pub languages: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let token = require("TELEGRAM_TOKEN")?;
        require("OPENAI_API_KEY")?;

        let admin_user_ids = match get("ADMIN_USER_IDS") {
            Some(raw) => parse_id_list(&raw).ok_or(ConfigError::Invalid {
                key: "ADMIN_USER_IDS",
                value: raw,
            })?,
            None => Vec::new(),
        };
        let home_chat_id = get("HOME_CHAT_ID")
            .map(|raw| parse_value("HOME_CHAT_ID", raw))
            .transpose()?;

        let dimension = get("EMBEDDING_DIMENSION")
            .map(|raw| parse_value("EMBEDDING_DIMENSION", raw))
            .transpose()?
            .unwrap_or(1536);
        let chunk_size: usize = get("CHUNK_SIZE")
            .map(|raw| parse_value("CHUNK_SIZE", raw))
            .transpose()?
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "CHUNK_SIZE",
                value: "0".into(),
            });
        }

        Ok(Self {
            telegram: TelegramConfig { token },
            access: AccessConfig {
                admin_user_ids,
                home_chat_id,
            },
            llm: LlmConfig {
                model: get("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
            },
            embedding: EmbeddingConfig {
                model: get("EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".into()),
                dimension,
            },
            storage: StorageConfig {
                data_dir: get("DATA_DIR").unwrap_or_else(|| "data".into()).into(),
                qdrant_url: get("QDRANT_URL"),
                qdrant_collection: get("QDRANT_COLLECTION").unwrap_or_else(|| "node_docs".into()),
                redis_url: get("REDIS_URL"),
            },
            ingestion: IngestionConfig {
                chunk_size,
                user_agent: get("FETCH_USER_AGENT")
                    .unwrap_or_else(|| "NodeInstallationBot/1.0".into()),
            },
            ocr: OcrConfig {
                binary: get("TESSERACT_PATH").unwrap_or_else(|| "tesseract".into()).into(),
                languages: get("OCR_LANGUAGES").unwrap_or_else(|| "rus+eng".into()),
            },
            prompts_path: get("PROMPTS_PATH")
                .unwrap_or_else(|| "config/prompts.yaml".into())
                .into(),
        })
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw })
}

fn parse_id_list(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

/// System instruction, fallback answer and every user-facing text.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    pub system: String,
    pub no_results: String,
    pub texts: BotTexts,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            no_results: DEFAULT_NO_RESULTS_MESSAGE.to_string(),
            texts: BotTexts::default(),
        }
    }
}

impl PromptsConfig {
    /// Reads the YAML file at `path`; built-in texts are used when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Prompts {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_yaml(&raw).map_err(|e| ConfigError::Prompts {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub config: Config,
    pub prompts: PromptsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::from_env()?;
        let prompts = PromptsConfig::load(&config.prompts_path)?;
        Ok(Self { config, prompts })
    }
}
