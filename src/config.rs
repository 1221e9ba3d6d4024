//! Configuration for the protected scope, lease naming and heartbeat timing.

use std::{
   fs,
   path::{Path, PathBuf},
   sync::OnceLock,
   time::Duration,
};

use directories::BaseDirs;
use figment::{
   Figment,
   providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{
   error::{ConfigError, Result},
   lease,
   scope::ScopePattern,
};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration loaded from config files and environment
/// variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
   pub url_pattern:           String,
   pub storage_key:           String,
   pub heartbeat_interval_ms: u64,
   pub message_text:          String,
   pub redirect_path:         String,

   /// Directory of the file-backed store; `~/.leasehold/data` when unset.
   #[serde(skip_serializing_if = "Option::is_none")]
   pub store_dir: Option<PathBuf>,
}

impl Default for Config {
   fn default() -> Self {
      Self {
         url_pattern:           "/createpost/".to_string(),
         storage_key:           "createpost-tab".to_string(),
         heartbeat_interval_ms: 1000,
         message_text:          "You already have an editor open in another tab.".to_string(),
         redirect_path:         "/profile".to_string(),
         store_dir:             None,
      }
   }
}

impl Config {
   /// Defaults, then `~/.leasehold/config.toml`, then `extra` if given, then
   /// `LEASEHOLD_*` environment variables.
   pub fn try_load(extra: Option<&Path>) -> Result<Self> {
      let config_path = ensure_global_config();
      let mut figment =
         Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(config_path));

      if let Some(path) = extra {
         if !path.exists() {
            return Err(
               ConfigError::Load(format!("config file {} not found", path.display())).into(),
            );
         }
         figment = figment.merge(Toml::file(path));
      }

      let cfg: Self = figment
         .merge(Env::prefixed("LEASEHOLD_").lowercase(true))
         .extract()
         .map_err(|e| ConfigError::Load(e.to_string()))?;
      cfg.validate()?;
      Ok(cfg)
   }

   fn create_default_config(path: &Path) {
      if let Some(parent) = path.parent() {
         let _ = fs::create_dir_all(parent);
      }
      if let Ok(toml) = toml::to_string_pretty(&Self::default()) {
         let _ = fs::write(path, toml);
      }
   }

   pub fn validate(&self) -> Result<()> {
      if self.heartbeat_interval_ms == 0 {
         return Err(ConfigError::Invalid("heartbeat_interval_ms must be positive".into()).into());
      }
      if self.url_pattern.is_empty() {
         return Err(ConfigError::Invalid("url_pattern must not be empty".into()).into());
      }
      if self.storage_key.is_empty() {
         return Err(ConfigError::Invalid("storage_key must not be empty".into()).into());
      }
      if self.scope().matches(&self.redirect_path) {
         return Err(
            ConfigError::Invalid(format!(
               "redirect_path {} is inside the protected scope {}",
               self.redirect_path, self.url_pattern
            ))
            .into(),
         );
      }
      Ok(())
   }

   pub fn scope(&self) -> ScopePattern {
      ScopePattern::new(self.url_pattern.clone())
   }

   pub const fn heartbeat_interval(&self) -> Duration {
      Duration::from_millis(self.heartbeat_interval_ms)
   }

   pub fn stale_after(&self) -> Duration {
      lease::stale_after(self.heartbeat_interval())
   }

   pub fn store_dir(&self) -> PathBuf {
      self
         .store_dir
         .clone()
         .unwrap_or_else(|| data_dir().clone())
   }
}

/// Initializes the global config from an explicit file. Later calls return
/// the first loaded value.
pub fn init_from(path: Option<&Path>) -> Result<&'static Config> {
   if let Some(cfg) = CONFIG.get() {
      return Ok(cfg);
   }
   let cfg = Config::try_load(path)?;
   Ok(CONFIG.get_or_init(|| cfg))
}

/// Returns the base directory for leasehold data and configuration
pub fn base_dir() -> &'static PathBuf {
   static ONCE: OnceLock<PathBuf> = OnceLock::new();
   ONCE.get_or_init(|| resolve_base_dir(".leasehold"))
}

fn ensure_global_config() -> PathBuf {
   let config_path = config_file_path();
   if !config_path.exists() {
      Config::create_default_config(config_path);
   }
   config_path.clone()
}

fn resolve_base_dir(dir_name: &str) -> PathBuf {
   BaseDirs::new()
      .map(|d| d.home_dir().join(dir_name))
      .or_else(|| {
         std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(dir_name))
      })
      .unwrap_or_else(|| {
         std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(dir_name)
      })
}

macro_rules! define_paths {
   ($($fn_name:ident: $path:literal),* $(,)?) => {
      $(
         pub fn $fn_name() -> &'static PathBuf {
            static ONCE: OnceLock<PathBuf> = OnceLock::new();
            ONCE.get_or_init(|| base_dir().join($path))
         }
      )*
   };
}

define_paths! {
   config_file_path: "config.toml",
   data_dir: "data",
}
