//! Feature flag CLI commands.

use anyhow::{Context, Result};
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};

use crate::application::FlagRuntime;
use crate::cli::output::{output, truncate, CommandOutput};
use crate::cli::types::Commands;
use crate::domain::models::{Config, FeatureFlag, NewFeatureFlag};
use crate::services::FlagRepository;

#[derive(Debug, serde::Serialize)]
pub struct FlagOutput {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub created_at: String,
}

impl From<&FeatureFlag> for FlagOutput {
    fn from(flag: &FeatureFlag) -> Self {
        Self {
            id: flag.id,
            name: flag.name.clone(),
            enabled: flag.enabled,
            created_at: flag.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct FlagListOutput {
    pub flags: Vec<FlagOutput>,
    pub total: usize,
}

impl CommandOutput for FlagListOutput {
    fn to_human(&self) -> String {
        if self.flags.is_empty() {
            return "No feature flags found.".to_string();
        }

        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Name").add_attribute(Attribute::Bold),
                Cell::new("Enabled").add_attribute(Attribute::Bold),
                Cell::new("Created").add_attribute(Attribute::Bold),
            ]);

        for flag in &self.flags {
            table.add_row(vec![
                Cell::new(flag.id),
                Cell::new(truncate(&flag.name, 48)),
                Cell::new(if flag.enabled { "yes" } else { "no" }),
                Cell::new(&flag.created_at),
            ]);
        }

        format!("Found {} feature flag(s):\n{table}", self.total)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct FlagActionOutput {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<FlagOutput>,
}

impl CommandOutput for FlagActionOutput {
    fn to_human(&self) -> String {
        self.message.clone()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Run one command against a freshly started runtime, then shut it down.
pub async fn execute(command: Commands, config: &Config, json_mode: bool) -> Result<()> {
    let runtime = FlagRuntime::start(config)
        .await
        .context("Failed to start flag runtime")?;

    let result = run(runtime.repository(), command, json_mode).await;
    let report = runtime.shutdown().await;

    tracing::debug!(
        notifications_delivered = report.dispatch.delivered,
        notifications_handled = report.listener.handled,
        "Command finished"
    );
    result
}

async fn run(repo: &FlagRepository, command: Commands, json_mode: bool) -> Result<()> {
    match command {
        Commands::List => {
            let flags = repo.get_all().await?;
            let out = FlagListOutput {
                total: flags.len(),
                flags: flags.iter().map(FlagOutput::from).collect(),
            };
            output(&out, json_mode);
        }

        Commands::Create { name, enabled } => {
            let flag = repo.create(NewFeatureFlag::new(name, enabled)).await?;
            let out = FlagActionOutput {
                success: true,
                message: format!("Feature flag created: {}", flag.id),
                flag: Some(FlagOutput::from(&flag)),
            };
            output(&out, json_mode);
        }

        Commands::Update { id, name, enabled } => {
            let flag = FeatureFlag {
                id,
                name,
                enabled,
                created_at: chrono::Utc::now(),
            };
            repo.update(&flag).await?;
            let out = FlagActionOutput {
                success: true,
                message: format!("Feature flag updated: {id}"),
                flag: None,
            };
            output(&out, json_mode);
        }

        Commands::Delete { id } => {
            repo.delete(id).await?;
            let out = FlagActionOutput {
                success: true,
                message: format!("Feature flag deleted: {id}"),
                flag: None,
            };
            output(&out, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(id: i64, enabled: bool) -> FeatureFlag {
        FeatureFlag {
            id,
            name: format!("flag-{id}"),
            enabled,
            created_at: chrono::Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_list_output_empty() {
        let out = FlagListOutput {
            flags: vec![],
            total: 0,
        };
        assert_eq!(out.to_human(), "No feature flags found.");
    }

    #[test]
    fn test_list_output_table() {
        let flags = [sample(1, true), sample(2, false)];
        let out = FlagListOutput {
            total: flags.len(),
            flags: flags.iter().map(FlagOutput::from).collect(),
        };

        let human = out.to_human();
        assert!(human.starts_with("Found 2 feature flag(s):"));
        assert!(human.contains("flag-1"));
        assert!(human.contains("flag-2"));

        let json = out.to_json();
        assert_eq!(json["total"], 2);
        assert_eq!(json["flags"][0]["enabled"], true);
        assert_eq!(json["flags"][1]["created_at"], "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_action_output_omits_missing_flag() {
        let out = FlagActionOutput {
            success: true,
            message: "Feature flag deleted: 3".to_string(),
            flag: None,
        };
        assert_eq!(out.to_human(), "Feature flag deleted: 3");
        assert!(out.to_json().get("flag").is_none());
    }

    #[tokio::test]
    async fn test_execute_against_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("flags.db").display().to_string();

        let create = Commands::Create {
            name: "beta".to_string(),
            enabled: true,
        };
        execute(create, &config, true).await.unwrap();

        let update = Commands::Update {
            id: 1,
            name: "beta".to_string(),
            enabled: false,
        };
        execute(update, &config, true).await.unwrap();

        let missing = Commands::Delete { id: 99 };
        let err = execute(missing, &config, true).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
