mod palette;
mod tables;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

pub use palette::{Color, ColorPalette, DEFAULT_FALLBACK_HEX};
pub use tables::{CustomImageTable, SourceTable};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const REFETCH_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
pub const DEFAULT_FETCH_RETRIES: u32 = 3;
pub const DEFAULT_FETCH_TIMEOUT_S: f64 = 10.0;
pub const REFETCH_TIMEOUT_S: f64 = 15.0;
pub const DEFAULT_LABEL_PX: f32 = 22.0;

const FETCH_RETRIES_MAX: u32 = 10;
const FETCH_TIMEOUT_MIN_S: f64 = 1.0;
const FETCH_TIMEOUT_MAX_S: f64 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub max_retries: u32,
    pub timeout_s: f64,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_FETCH_RETRIES,
            timeout_s: DEFAULT_FETCH_TIMEOUT_S,
            retry_delay_ms: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    /// Targeted refetches wait longer and present a full browser agent.
    pub fn refetch() -> Self {
        Self {
            timeout_s: REFETCH_TIMEOUT_S,
            user_agent: REFETCH_USER_AGENT.to_string(),
            ..Self::default()
        }
    }

    fn apply_file(&mut self, file: FetchFile) {
        if let Some(value) = file.max_retries {
            self.set_max_retries(value);
        }
        if let Some(value) = file.timeout_s {
            self.set_timeout_s(value);
        }
        if let Some(value) = file.retry_delay_ms {
            self.retry_delay_ms = value;
        }
        if let Some(value) = non_empty(file.user_agent) {
            self.user_agent = value;
        }
    }

    fn set_max_retries(&mut self, value: u32) {
        self.max_retries = value.clamp(1, FETCH_RETRIES_MAX);
    }

    fn set_timeout_s(&mut self, value: f64) {
        if value.is_finite() {
            self.timeout_s = value.clamp(FETCH_TIMEOUT_MIN_S, FETCH_TIMEOUT_MAX_S);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfig {
    pub font_path: Option<PathBuf>,
    pub px: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            px: DEFAULT_LABEL_PX,
        }
    }
}

/// Everything the jobs need besides the catalog. Built from defaults, then
/// an optional JSON file, then `SHOPIMG_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ShopimgConfig {
    pub fetch: FetchConfig,
    pub refetch_fetch: FetchConfig,
    pub label: LabelConfig,
    pub palette: ColorPalette,
    pub sources: SourceTable,
    pub refetch_sources: SourceTable,
    pub custom_images: CustomImageTable,
}

impl Default for ShopimgConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    fetch: FetchFile,
    refetch_fetch: FetchFile,
    label: LabelFile,
    palette: PaletteFile,
    sources: IndexMap<String, Vec<String>>,
    refetch_sources: IndexMap<String, Vec<String>>,
    custom_images: IndexMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FetchFile {
    max_retries: Option<u32>,
    timeout_s: Option<f64>,
    retry_delay_ms: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LabelFile {
    font_path: Option<PathBuf>,
    px: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PaletteFile {
    colors: IndexMap<String, String>,
    fallback: Option<String>,
}

impl ShopimgConfig {
    pub fn builtin() -> Self {
        Self {
            fetch: FetchConfig::default(),
            refetch_fetch: FetchConfig::refetch(),
            label: LabelConfig::default(),
            palette: ColorPalette::builtin(),
            sources: SourceTable::builtin_download(),
            refetch_sources: SourceTable::builtin_refetch(),
            custom_images: CustomImageTable::builtin(),
        }
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::builtin();
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed reading config {}", path.display()))?;
            config
                .apply_json(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?;
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_json(&mut self, raw: &str) -> Result<()> {
        let file: ConfigFile = serde_json::from_str(raw)?;

        self.fetch.apply_file(file.fetch);
        self.refetch_fetch.apply_file(file.refetch_fetch);

        if file.label.font_path.is_some() {
            self.label.font_path = file.label.font_path;
        }
        if let Some(px) = file.label.px.filter(|px| px.is_finite() && *px > 0.0) {
            self.label.px = px;
        }

        self.palette.merge_hex(&file.palette.colors)?;
        if let Some(raw) = non_empty(file.palette.fallback) {
            let color = Color::parse_hex(&raw).context("palette fallback")?;
            self.palette.set_fallback(color);
        }

        self.sources.merge(&file.sources);
        self.refetch_sources.merge(&file.refetch_sources);
        self.custom_images.merge(&file.custom_images);
        Ok(())
    }

    /// Malformed values are ignored so a stray variable never blocks a run.
    /// Fetch variables apply to every job.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SHOPIMG_FETCH_RETRIES")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
        {
            self.fetch.set_max_retries(value);
            self.refetch_fetch.set_max_retries(value);
        }
        if let Some(value) = lookup("SHOPIMG_FETCH_TIMEOUT_S")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
        {
            self.fetch.set_timeout_s(value);
            self.refetch_fetch.set_timeout_s(value);
        }
        if let Some(value) = non_empty(lookup("SHOPIMG_USER_AGENT")) {
            self.refetch_fetch.user_agent = value.clone();
            self.fetch.user_agent = value;
        }
        if let Some(value) = non_empty(lookup("SHOPIMG_FONT")) {
            self.label.font_path = Some(PathBuf::from(value));
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
