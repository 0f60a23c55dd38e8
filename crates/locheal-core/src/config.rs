//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `locheal.toml` + `locheal.<env>.toml` + `LOCHEAL_*`
//! env vars, and exposes the typed retrieval and healer sections. Also
//! provides helpers to expand `~` and `${VAR}` in user-supplied paths.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_from(Path::new(".")) }

    /// Same as [`Config::load`] but resolves the TOML files against `base`.
    pub fn load_from(base: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(base.join("locheal.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("locheal.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("locheal.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("locheal.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("LOCHEAL_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like [`Config::get`], but a missing section yields `T::default()`.
    pub fn get_or_default<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    pub fn retrieval(&self) -> anyhow::Result<RetrievalConfig> {
        let retrieval: RetrievalConfig = self.get_or_default("retrieval")?;
        retrieval.validate()?;
        Ok(retrieval)
    }

    pub fn healer(&self) -> anyhow::Result<HealerConfig> {
        let healer: HealerConfig = self.get_or_default("healer")?;
        healer.validate()?;
        Ok(healer)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.retrieval()?;
        self.healer()?;
        Ok(())
    }
}

/// How the retrieval engine picks context out of the chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Fixed-weight scoring over `chunk_count` chunks, best one wins.
    #[default]
    SingleBest,
    /// Config-weighted scoring over sliding chunks, assembled under budget.
    Budgeted,
}

/// Read-only settings for chunking and relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub enabled: bool,
    pub strategy: RetrievalStrategy,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub overlap_size: usize,
    /// Maximum context length in characters handed to the LLM.
    pub max_context_length: usize,
    pub relevance_threshold: f64,
    pub max_chunks_to_analyze: usize,
    pub id_match_weight: f64,
    pub resource_id_match_weight: f64,
    pub class_match_weight: f64,
    pub text_match_weight: f64,
    pub tag_match_weight: f64,
    pub other_attribute_match_weight: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: RetrievalStrategy::SingleBest,
            chunk_count: 5,
            chunk_size: 500,
            overlap_size: 50,
            max_context_length: 4000,
            relevance_threshold: 0.1,
            max_chunks_to_analyze: 100,
            id_match_weight: 3.0,
            resource_id_match_weight: 2.5,
            class_match_weight: 1.5,
            text_match_weight: 2.0,
            tag_match_weight: 1.0,
            other_attribute_match_weight: 1.0,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_context_length == 0 {
            return Err(Error::InvalidConfig("retrieval.max_context_length must be > 0".into()));
        }
        if self.chunk_count == 0 {
            return Err(Error::InvalidConfig("retrieval.chunk_count must be > 0".into()));
        }
        if self.chunk_size == 0 || self.overlap_size >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "retrieval.overlap_size ({}) must be smaller than a non-zero chunk_size ({})",
                self.overlap_size, self.chunk_size
            )));
        }
        if self.max_chunks_to_analyze == 0 {
            return Err(Error::InvalidConfig("retrieval.max_chunks_to_analyze must be > 0".into()));
        }
        if !(self.relevance_threshold.is_finite() && self.relevance_threshold >= 0.0) {
            return Err(Error::InvalidConfig("retrieval.relevance_threshold must be >= 0".into()));
        }
        let weights = [
            ("id_match_weight", self.id_match_weight),
            ("resource_id_match_weight", self.resource_id_match_weight),
            ("class_match_weight", self.class_match_weight),
            ("text_match_weight", self.text_match_weight),
            ("tag_match_weight", self.tag_match_weight),
            ("other_attribute_match_weight", self.other_attribute_match_weight),
        ];
        for (name, w) in weights {
            if !(w.is_finite() && w >= 0.0) {
                return Err(Error::InvalidConfig(format!("retrieval.{} must be a non-negative number", name)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealerConfig {
    /// Fuzzy text matches must score strictly above this to be accepted.
    pub similarity_threshold: f64,
}

impl Default for HealerConfig {
    fn default() -> Self { Self { similarity_threshold: 0.25 } }
}

impl HealerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::InvalidConfig("healer.similarity_threshold must be within [0, 1]".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
