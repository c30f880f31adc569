use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::{connect, OutputFormat};
use crate::database::models::School;
use crate::validation::validate_school;

#[derive(Subcommand)]
pub enum SchoolCommands {
    #[command(about = "Register a school")]
    Add {
        #[arg(help = "School id, e.g. S1")]
        school_id: String,

        #[arg(help = "Region id")]
        region_id: String,

        #[arg(long, help = "School display name")]
        name: String,

        #[arg(long, help = "Region display name")]
        region: String,

        #[arg(long, help = "Only accept registrations from this email domain")]
        domain: Option<String>,
    },

    #[command(about = "List registered schools")]
    List,
}

pub async fn handle(cmd: SchoolCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SchoolCommands::Add {
            school_id,
            region_id,
            name,
            region,
            domain,
        } => {
            let school = School {
                id: 0,
                school_id,
                region_id,
                school_name: name,
                region_name: region,
                organization_email_only: domain.is_some(),
                email_domain: domain,
            };
            validate_school(&school)?;

            let db = connect().await?;
            let stored = db.schools().insert(&school).await?;
            db.close().await;

            output_success(
                &output_format,
                &format!("Registered school '{}' ({})", stored.school_name, stored.school_id),
                Some(json!({ "school": stored })),
            )
        }
        SchoolCommands::List => {
            let db = connect().await?;
            let schools = db.schools().list().await?;
            db.close().await;

            if schools.is_empty() {
                return output_empty_collection(&output_format, "schools", "No schools registered");
            }

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json!({ "schools": schools }))?);
                }
                OutputFormat::Text => {
                    println!("{:<10} {:<25} {:<10} {:<15} {}", "ID", "NAME", "REGION", "REGION NAME", "DOMAIN");
                    println!("{}", "-".repeat(80));
                    for school in &schools {
                        println!(
                            "{:<10} {:<25} {:<10} {:<15} {}",
                            school.school_id,
                            school.school_name,
                            school.region_id,
                            school.region_name,
                            school.email_domain.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
