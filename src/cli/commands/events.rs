use clap::Subcommand;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::cli::utils::*;
use crate::cli::{connect, OutputFormat};
use crate::database::models::{EventEntry, Events};
use crate::validation::validate_events;

#[derive(Subcommand)]
pub enum EventsCommands {
    #[command(about = "Replace one month's calendar from a YAML or JSON list of entries")]
    Import {
        #[arg(help = "School id")]
        school_id: String,

        #[arg(help = "Month (1-12)")]
        month: i16,

        #[arg(help = "File with the entries (.yaml, .yml or .json)")]
        file: PathBuf,
    },
}

/// Parse a list of entries; the extension picks the format
pub fn parse_entries(path: &Path, contents: &str) -> anyhow::Result<Vec<EventEntry>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "json" => Ok(serde_json::from_str(contents)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(contents)?),
        other => anyhow::bail!("Unsupported events file type '{}'", other),
    }
}

pub async fn handle(cmd: EventsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EventsCommands::Import { school_id, month, file } => {
            let contents = tokio::fs::read_to_string(&file).await?;
            let events = Events {
                id: 0,
                school_id,
                month,
                events: parse_entries(&file, &contents)?,
            };
            validate_events(&events)?;

            let db = connect().await?;
            if db.schools().find(&events.school_id).await?.is_none() {
                anyhow::bail!("School '{}' is not registered", events.school_id);
            }
            let stored = db.events().upsert(&events).await?;
            db.close().await;

            output_success(
                &output_format,
                &format!(
                    "Imported {} events for {} month {}",
                    stored.events.len(),
                    stored.school_id,
                    stored.month
                ),
                Some(json!({ "events": stored })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yaml_entries() {
        let yaml = r#"
- date: 2024-03-04
  date_kind: school_day
  event_name: Opening ceremony
  first_grade: 1
  second_grade: 1
  third_grade: -1
"#;
        let entries = parse_entries(Path::new("march.yaml"), yaml).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event_name, "Opening ceremony");
        assert_eq!(entries[0].third_grade, -1);
        assert_eq!(entries[0].modified_date, None);
    }

    #[test]
    fn parses_json_and_rejects_unknown_types() {
        let json = r#"[{"date":"2024-03-04","date_kind":"holiday","event_name":"Holiday"}]"#;
        let entries = parse_entries(Path::new("march.json"), json).unwrap();
        assert_eq!(entries[0].first_grade, 0);

        assert!(parse_entries(Path::new("march.txt"), json).is_err());
    }
}
