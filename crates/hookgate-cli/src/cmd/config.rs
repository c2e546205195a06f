use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use hookgate_core::checks::all_check_names;
use hookgate_core::config::{HookConfig, WarnLevel};
use hookgate_core::io::write_if_missing;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a default config file if none exists
    Init,

    /// Print the effective config
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(config_path: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Init => init(config_path),
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

/// Every registered check listed explicitly so the file doubles as a catalogue.
fn default_config() -> HookConfig {
    let mut config = HookConfig::default();
    for name in all_check_names() {
        config.set_enabled(name, true);
    }
    config
}

fn init(config_path: &Path) -> anyhow::Result<()> {
    let yaml = render_yaml(&default_config())?;
    let created = write_if_missing(config_path, yaml.as_bytes())
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    if created {
        println!("Created {}", config_path.display());
    } else {
        println!("{} already exists; left unchanged", config_path.display());
    }
    Ok(())
}

fn render_yaml(config: &HookConfig) -> anyhow::Result<String> {
    let body = serde_yaml::to_string(config).context("failed to serialize config")?;
    Ok(format!("# hookgate configuration\n{body}"))
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = if config_path.exists() {
        HookConfig::load(config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?
    } else {
        HookConfig::default()
    };

    if json {
        return print_json(&config);
    }
    println!("# {}", config_path.display());
    print!("{}", serde_yaml::to_string(&config).context("failed to serialize config")?);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = HookConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let warnings = config.validate(&all_check_names());

    if json {
        let value = serde_json::json!({
            "path": config_path.display().to_string(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
