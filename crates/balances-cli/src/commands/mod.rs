//! CLI Command Implementations

pub mod check;
pub mod serve;

use anyhow::{Context, Result};
use balances_core::config::{RawConfig, RelayConfig};
use clap::builder::BoolishValueParser;
use clap::Args;
use std::path::PathBuf;

/// Settings shared by every command. Each flag falls back to its environment variable.
#[derive(Args, Clone)]
pub struct ConfigArgs {
    /// Username the updater must present
    #[arg(long, env = "API_USER", hide_env_values = true)]
    api_user: Option<String>,

    /// Secret the updater must present
    #[arg(long, env = "API_PASS", hide_env_values = true)]
    api_pass: Option<String>,

    /// Listen port (1-65535, default 3000)
    #[arg(short, long, env = "PORT")]
    port: Option<String>,

    /// Bind address (default 0.0.0.0)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Deployment environment; `production` suppresses auth diagnostics
    #[arg(long, env = "NODE_ENV")]
    node_env: Option<String>,

    /// Directory holding the viewer front-end
    #[arg(long, env = "FRONTEND_DIR")]
    frontend_dir: Option<PathBuf>,

    /// Webhook notified by /api/trigger-update
    #[arg(long, env = "TRIGGER_WEBHOOK_URL")]
    webhook_url: Option<String>,

    /// Require credentials on /api/trigger-update
    #[arg(long, env = "TRIGGER_REQUIRE_AUTH", value_parser = BoolishValueParser::new())]
    trigger_require_auth: bool,
}

impl ConfigArgs {
    /// Validate into a [`RelayConfig`]. Errors here abort startup.
    pub fn load(self) -> Result<RelayConfig> {
        let raw = RawConfig {
            api_user: self.api_user,
            api_pass: self.api_pass,
            port: self.port,
            host: self.host,
            node_env: self.node_env,
            frontend_dir: self.frontend_dir,
            webhook_url: self.webhook_url,
            trigger_require_auth: self.trigger_require_auth,
        };
        RelayConfig::from_raw(raw).context("refusing to start")
    }
}
