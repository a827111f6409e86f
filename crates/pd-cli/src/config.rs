//! Event configuration: one TOML file per draw event
//!
//! ```toml
//! event_name = "Undian Tahunan 2026"
//! roster = "peserta.csv"
//!
//! [ingest]
//! ticket_width = 4
//! exclude = ["F"]
//!
//! [stages]
//! shortfall = "draw-remaining"
//!
//! [[stages.full_pool]]
//! name = "Hadiah Utama"
//! count = 100
//!
//! [[stages.batch]]
//! name = "Batch 1"
//! prize = "Voucher"
//! count = 30
//!
//! [storage]
//! dir = "./sesi"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use pd_core::{DrawPlan, RoundPlan, ShortfallPolicy, TierSpec, standard_tiers};
use pd_ingest::RosterConfig;
use pd_state::StoreConfig;

/// File picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "prizedraw.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    pub full_pool: Vec<TierSpec>,
    pub batch: Vec<RoundPlan>,
    pub single: Vec<RoundPlan>,
    pub shortfall: ShortfallPolicy,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            full_pool: standard_tiers(),
            batch: Vec::new(),
            single: Vec::new(),
            shortfall: ShortfallPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub event_name: String,
    /// Default roster for `init`
    pub roster: Option<PathBuf>,
    pub ingest: RosterConfig,
    pub stages: StagesConfig,
    pub storage: StoreConfig,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            event_name: "Prize Draw".to_string(),
            roster: None,
            ingest: RosterConfig::default(),
            stages: StagesConfig::default(),
            storage: StoreConfig::default(),
        }
    }
}

impl EventConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Invalid event configuration")?;
        config.ingest.validate()?;
        Ok(config)
    }

    /// Load `path`, or `prizedraw.toml` if present, or the built-in defaults.
    ///
    /// Relative roster and storage paths are resolved against the config
    /// file's directory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config = Self::from_toml(&text)
            .with_context(|| format!("Failed to load config {}", path.display()))?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        log::info!("Loaded event config {}", path.display());
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &Path| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.to_path_buf()
            }
        };
        self.roster = self.roster.as_deref().map(join);
        self.storage.dir = join(&self.storage.dir);
        self.storage.mirror_dir = self.storage.mirror_dir.as_deref().map(join);
    }

    pub fn plan(&self) -> Result<DrawPlan> {
        let plan = DrawPlan::from_specs(
            &self.stages.full_pool,
            self.stages.batch.clone(),
            self.stages.single.clone(),
        )?
        .with_shortfall(self.stages.shortfall);
        Ok(plan)
    }
}
