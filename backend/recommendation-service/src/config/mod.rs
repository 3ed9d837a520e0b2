use crate::error::{AppError, Result};
use crate::models::EngineName;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub data: DataConfig,
    pub router: RouterConfig,
    pub fusion: FusionConfig,
    pub serving: ServingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        format!("{},actix_web=info", self.log_level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub games_path: String,
    pub descriptions_path: String,
    pub model_path: String,
    pub records_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Serving distribution, raw weights in configured order
    pub engine_weights: Vec<(EngineName, f64)>,
}

impl RouterConfig {
    pub fn weight_of(&self, engine: EngineName) -> f64 {
        self.engine_weights
            .iter()
            .find(|(e, _)| *e == engine)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub genre_weight: f64,
    pub content_weight: f64,
    pub vector_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    pub adapter_timeout_ms: u64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub search_limit: usize,
}

impl ServingConfig {
    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    /// Requested limit, defaulted and clamped to `[1, max_limit]`
    pub fn clamp_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_limit,
            Some(n) if n < 1 => 1,
            Some(n) => (n as u64).min(self.max_limit as u64) as usize,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            app: AppConfig {
                env: var("APP_ENV", "development"),
                host: var("APP_HOST", "0.0.0.0"),
                port: parse("APP_PORT", &var("APP_PORT", "8000"))?,
                log_level: var("LOG_LEVEL", "info"),
            },
            data: DataConfig {
                games_path: var("GAMES_CSV_PATH", "./data/steam-store-games/steam.csv"),
                descriptions_path: var(
                    "DESCRIPTIONS_CSV_PATH",
                    "./data/steam-store-games/steam_description_data.csv",
                ),
                model_path: var("NEURAL_MODEL_PATH", "./models/model_neural_network.json"),
                records_path: var("RECORDS_PATH", "./records.jsonl"),
            },
            router: RouterConfig {
                engine_weights: parse_engine_weights(&var(
                    "ENGINE_WEIGHTS",
                    "combined=0.4,neural=0.4,random=0.2",
                ))?,
            },
            fusion: FusionConfig {
                genre_weight: parse("FUSION_GENRE_WEIGHT", &var("FUSION_GENRE_WEIGHT", "0.2"))?,
                content_weight: parse(
                    "FUSION_CONTENT_WEIGHT",
                    &var("FUSION_CONTENT_WEIGHT", "0.5"),
                )?,
                vector_weight: parse("FUSION_VECTOR_WEIGHT", &var("FUSION_VECTOR_WEIGHT", "0.3"))?,
            },
            serving: ServingConfig {
                adapter_timeout_ms: parse("ADAPTER_TIMEOUT_MS", &var("ADAPTER_TIMEOUT_MS", "5000"))?,
                default_limit: parse("DEFAULT_LIMIT", &var("DEFAULT_LIMIT", "30"))?,
                max_limit: parse("MAX_LIMIT", &var("MAX_LIMIT", "100"))?,
                search_limit: parse("SEARCH_LIMIT", &var("SEARCH_LIMIT", "10"))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.serving.max_limit == 0 {
            return Err(AppError::InvalidConfiguration(
                "MAX_LIMIT must be at least 1".to_string(),
            ));
        }
        if self.serving.default_limit == 0 || self.serving.default_limit > self.serving.max_limit {
            return Err(AppError::InvalidConfiguration(format!(
                "DEFAULT_LIMIT must be within 1..={}",
                self.serving.max_limit
            )));
        }
        if self.serving.adapter_timeout_ms == 0 {
            return Err(AppError::InvalidConfiguration(
                "ADAPTER_TIMEOUT_MS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::InvalidConfiguration(format!("{} = `{}`: {}", key, raw, e)))
}

/// Parse `engine=weight` pairs separated by commas
pub fn parse_engine_weights(raw: &str) -> Result<Vec<(EngineName, f64)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<(EngineName, f64)> {
            let (name, weight) = pair.split_once('=').ok_or_else(|| {
                AppError::InvalidConfiguration(format!(
                    "ENGINE_WEIGHTS entry `{}` is not engine=weight",
                    pair
                ))
            })?;
            let engine = EngineName::from_str(name).map_err(AppError::InvalidConfiguration)?;
            let weight = parse::<f64>("ENGINE_WEIGHTS", weight)?;
            Ok((engine, weight))
        })
        .collect()
}
