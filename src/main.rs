use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

mod averages;
mod classify;
mod config;
mod error;
mod input;
mod models;
mod periods;
mod report;
mod telemetry;

use models::{AcademicPeriod, GradeRecord, StudentIdentity};

#[derive(Parser)]
#[command(name = "report-cards")]
#[command(about = "Bimester schedules and report cards for Group Scholar", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PeriodArgs {
    /// CSV with id,name,start_date,end_date,status,is_current
    #[arg(long)]
    periods: PathBuf,
    /// Period to use instead of the one marked current
    #[arg(long)]
    period_id: Option<String>,
    /// Reference date for bimester status (defaults to today)
    #[arg(long)]
    today: Option<NaiveDate>,
}

#[derive(Args)]
struct GradeArgs {
    #[arg(long)]
    grades: PathBuf,
    /// CSV with subject_type_id,category
    #[arg(long)]
    subject_types: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the four bimesters of a period
    Bimesters {
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Build one student's report card
    Report {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        grades: GradeArgs,
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        student_name: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write a JSON report payload for every student in the grade file
    Batch {
        #[command(flatten)]
        period: PeriodArgs,
        #[command(flatten)]
        grades: GradeArgs,
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = config::Settings::from_env().context("invalid REPORT_CARDS_* configuration")?;
    telemetry::init_tracing(&settings)?;

    match cli.command {
        Commands::Bimesters { period } => {
            let (selected, today) = resolve_period(&period)?;
            let bimesters = periods::split_into_bimesters(&selected, today)?;
            let status = periods::derive_period_status(&selected, today);

            println!(
                "{} ({} to {}), {:?} as of {}:",
                selected.name, selected.start_date, selected.end_date, status, today
            );
            for bimester in bimesters.iter() {
                println!(
                    "- {}: {} to {} ({} days) {} {}%",
                    bimester.name,
                    bimester.start_date,
                    bimester.end_date,
                    bimester.days,
                    bimester.status,
                    bimester.progress
                );
            }
        }
        Commands::Report {
            period,
            grades,
            student_id,
            student_name,
            format,
            out,
        } => {
            let (selected, today) = resolve_period(&period)?;
            let lookup = input::load_subject_types(&grades.subject_types)?;
            let records: Vec<GradeRecord> = input::load_grades(&grades.grades)?
                .into_iter()
                .filter(|record| record.period_id == selected.id && record.student_id == student_id)
                .collect();

            if records.is_empty() {
                warn!(
                    %student_id,
                    period_id = %selected.id,
                    "no grades found for student in period"
                );
            }

            let payload = report::assemble_report(&selected, &records, &lookup, today)?;
            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&payload)?,
                Format::Markdown => {
                    let student = StudentIdentity {
                        full_name: student_name.unwrap_or_else(|| student_id.clone()),
                        id: student_id.clone(),
                    };
                    report::render_markdown(
                        settings.school_name.as_deref(),
                        &student,
                        &selected,
                        &payload,
                    )
                }
            };

            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(%student_id, records = records.len(), "report written");
            println!("Report written to {}.", out.display());
        }
        Commands::Batch {
            period,
            grades,
            out_dir,
        } => {
            let (selected, today) = resolve_period(&period)?;
            let lookup = input::load_subject_types(&grades.subject_types)?;
            let mut by_student: BTreeMap<String, Vec<GradeRecord>> = BTreeMap::new();
            for record in input::load_grades(&grades.grades)? {
                if record.period_id == selected.id {
                    by_student.entry(record.student_id.clone()).or_default().push(record);
                }
            }

            if by_student.is_empty() {
                println!("No grades found for period {}.", selected.id);
                return Ok(());
            }

            std::fs::create_dir_all(&out_dir)
                .with_context(|| format!("failed to create {}", out_dir.display()))?;
            for (student_id, records) in &by_student {
                let payload = report::assemble_report(&selected, records, &lookup, today)?;
                let path = payload_path(&out_dir, student_id);
                std::fs::write(&path, serde_json::to_string_pretty(&payload)?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            info!(students = by_student.len(), period_id = %selected.id, "batch complete");
            println!(
                "Wrote {} report payloads to {}.",
                by_student.len(),
                out_dir.display()
            );
        }
    }

    Ok(())
}

fn resolve_period(args: &PeriodArgs) -> anyhow::Result<(AcademicPeriod, NaiveDate)> {
    let all = input::load_periods(&args.periods)?;
    let selected = match &args.period_id {
        Some(id) => all
            .iter()
            .find(|period| &period.id == id)
            .with_context(|| format!("period {id} not found in {}", args.periods.display()))?,
        None => periods::current_period(&all)?
            .context("no period is marked current; pass --period-id")?,
    };
    let today = args
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok((selected.clone(), today))
}

fn payload_path(out_dir: &Path, student_id: &str) -> PathBuf {
    let file_stem: String = student_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    out_dir.join(format!("{file_stem}.json"))
}
