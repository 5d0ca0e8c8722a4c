//! `balances check` command implementation

use std::io::{self, Write};

use anyhow::Result;
use balances_core::RelayConfig;

pub fn run(config: RelayConfig) -> Result<()> {
    let stdout = io::stdout();
    report(&config, &mut stdout.lock())?;
    Ok(())
}

/// Redacted configuration summary. The API secret is never written.
fn report(config: &RelayConfig, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Balances relay configuration")?;
    writeln!(out)?;
    writeln!(out, "  listen:        {}:{}", config.host, config.port)?;
    writeln!(out, "  environment:   {:?}", config.environment)?;
    writeln!(out, "  api user:      {}", config.credentials.name)?;
    writeln!(out, "  api pass:      ***")?;
    writeln!(out, "  body limit:    {} bytes", config.body_limit)?;

    let frontend = if config.frontend_dir.join("index.html").is_file() {
        "ok"
    } else {
        "missing index.html"
    };
    writeln!(
        out,
        "  frontend dir:  {} ({})",
        config.frontend_dir.display(),
        frontend
    )?;

    writeln!(
        out,
        "  trigger hook:  {}",
        config.webhook_url.host_str().unwrap_or("<none>")
    )?;
    if config.trigger_require_auth {
        writeln!(out, "  trigger auth:  required")?;
    } else {
        writeln!(
            out,
            "  trigger auth:  NONE (endpoint is public; set TRIGGER_REQUIRE_AUTH=true to protect it)"
        )?;
    }

    Ok(())
}
