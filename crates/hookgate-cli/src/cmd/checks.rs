use crate::output::{print_json, print_table};
use hookgate_core::check::Stage;
use hookgate_core::checks::{checks_for_stage, describe, CheckInfo};
use hookgate_core::config::HookConfig;
use hookgate_core::runner::ProcessRunner;
use std::path::Path;
use std::sync::Arc;

pub fn run(config_path: &Path, stage: Option<Stage>, json: bool) -> anyhow::Result<()> {
    let config = HookConfig::load_or_default(config_path);
    let stages: &[Stage] = match stage {
        Some(Stage::PreAction) => &[Stage::PreAction],
        Some(Stage::PostAction) => &[Stage::PostAction],
        None => &[Stage::PreAction, Stage::PostAction],
    };

    let infos: Vec<CheckInfo> = stages
        .iter()
        .flat_map(|&s| {
            let checks = checks_for_stage(s, &config, Arc::new(ProcessRunner::new()));
            describe(s, &checks, &config)
        })
        .collect();

    if json {
        return print_json(&infos);
    }

    let rows = infos
        .iter()
        .map(|info| {
            vec![
                info.name.to_string(),
                info.stage.to_string(),
                info.applies_to
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                if info.enabled { "yes" } else { "no" }.to_string(),
                info.description.to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "STAGE", "APPLIES TO", "ENABLED", "DESCRIPTION"], rows);
    Ok(())
}
