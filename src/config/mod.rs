use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::config::fonts::FontRegistry;

pub mod fonts;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "AnoNikki";
const APP_NAME: &str = "anonikki";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn from_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            self.write_default_config(&default_cfg)?;
            default_cfg.post_load();
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub token_file: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("ANONIKKI_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("ANONIKKI_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_root = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let state_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_root.join("state"));
        let token_file = state_dir.join("session.json");

        Ok(Self {
            config_dir,
            config_file,
            data_dir: data_root,
            state_dir,
            token_file,
        })
    }

    /// Lays every path out beneath one root; handy for tests and portable installs.
    pub fn rooted_at(root: &Path) -> Self {
        let config_dir = root.join("config");
        let data_dir = root.join("data");
        let state_dir = root.join("state");
        Self {
            config_file: config_dir.join("config.toml"),
            token_file: state_dir.join("session.json"),
            config_dir,
            data_dir,
            state_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.state_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name sent with every new entry.
    pub author: String,
    pub api: ApiOptions,
    pub canvas: CanvasOptions,
    pub style: StyleDefaults,
    pub notifications: NotificationOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            author: "User".to_string(),
            api: ApiOptions::default(),
            canvas: CanvasOptions::default(),
            style: StyleDefaults::default(),
            notifications: NotificationOptions::default(),
        }
    }
}

impl AppConfig {
    fn post_load(&mut self) {
        if let Ok(url) = env::var("ANONIKKI_API_URL") {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        let registry = FontRegistry::default();
        if !registry.contains_family(&self.style.font_family) {
            tracing::warn!(
                font = %self.style.font_family,
                "unknown font family in config, falling back to sans-serif"
            );
            self.style.font_family = StyleDefaults::default().font_family;
        }
        if self.canvas.min_size <= 0.0 {
            tracing::warn!(min_size = self.canvas.min_size, "non-positive min_size, using 50");
            self.canvas.min_size = CanvasOptions::default().min_size;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Attempts for idempotent requests; entry creation is always sent once.
    pub max_attempts: u32,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 10,
            max_attempts: 3,
        }
    }
}

impl ApiOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasOptions {
    pub default_x: f64,
    pub default_y: f64,
    pub default_width: f64,
    pub default_height: f64,
    pub min_size: f64,
    pub handle_size: f64,
    pub delete_size: f64,
}

impl Default for CanvasOptions {
    fn default() -> Self {
        Self {
            default_x: 50.0,
            default_y: 50.0,
            default_width: 150.0,
            default_height: 150.0,
            min_size: 50.0,
            handle_size: 16.0,
            delete_size: 24.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleDefaults {
    pub font_family: String,
    pub font_size: String,
    pub font_style: String,
    pub font_weight: String,
    pub color: String,
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: "16px".to_string(),
            font_style: "normal".to_string(),
            font_weight: "normal".to_string(),
            color: "#000000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationOptions {
    pub dismiss_after_ms: u64,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            dismiss_after_ms: 3000,
        }
    }
}

impl NotificationOptions {
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }
}
