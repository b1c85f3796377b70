use std::env;
use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3003";
pub const AUTO_SAVE_DELAY_MS: u64 = 1200;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub autosave: AutoSaveSettings,
    pub schema_config_path: Option<String>,
    #[serde(default)]
    pub navigation: NavigationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoSaveSettings {
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NavigationSettings {
    #[serde(default)]
    pub nested: bool,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        Self::build(
            &run_mode,
            Environment::with_prefix("admin").separator("__"),
            env::var("API_BASE_URL").ok(),
        )
    }

    /// Layers, lowest first: built-in default, `config/default`, `config/<run_mode>`,
    /// `ADMIN__*` variables, then the `API_BASE_URL` override.
    fn build(
        run_mode: &str,
        environment: Environment,
        base_url_override: Option<String>,
    ) -> anyhow::Result<Self> {
        let s = Config::builder()
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .add_source(File::with_name("./config/default").required(false))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(environment)
            .set_override_option("api.base_url", base_url_override)?
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl AutoSaveSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for AutoSaveSettings {
    fn default() -> Self {
        Self {
            delay_ms: AUTO_SAVE_DELAY_MS,
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
