//! ClinAudit CLI - Main entry point for CLI binary
//!
//! This binary provides the `clinaudit` CLI tool for keeping an audit register.

use anyhow::{anyhow, bail, Context, Result};
use chrono::Datelike;
use clap::Parser;
use clinaudit_lib::engine::{
    api::{self, ApiState},
    cli::{formatter::CliFormatter, Cli, Commands, NoteAction, OutputFormat, RegisterCommand},
    config::{AppMode, Config},
    controller::Controller,
    database::Database,
    export::{self, ExportFormat},
    logging::init_logging,
    model::{current_period, AuditEdit, AuditRecord, NewAudit, NoteInput},
    state,
    store::{open_store, LocalStore},
};
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

fn main() {
    let cli = Cli::parse();
    let json_output = cli.format == OutputFormat::Json;

    if let Err(e) = run_cli(cli) {
        if json_output {
            println!("{}", json!({ "error": format!("{:#}", e) }));
        } else {
            CliFormatter::error(&format!("{:#}", e));
        }
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    let project_dir = cli.get_project_dir();
    let json_output = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Init {
            name,
            endpoint,
            view_only,
        } => cmd_init(cli.project, &name, endpoint, view_only, json_output),
        Commands::Serve { port, host } => cmd_serve(&project_dir, host, port),
        Commands::Register(command) => cmd_register(command, &project_dir, json_output),
    }
}

fn cmd_init(
    project: Option<PathBuf>,
    name: &str,
    endpoint: Option<String>,
    view_only: bool,
    json: bool,
) -> Result<()> {
    let project_dir = match project {
        Some(dir) => dir,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .join("ClinAudit")
            .join("projects")
            .join(name),
    };

    if project_dir.join(clinaudit_lib::engine::config::CONFIG_FILE).exists() {
        bail!("Project already initialized: {}", project_dir.display());
    }
    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("Could not create {}", project_dir.display()))?;

    let mut config = Config::default_for_project(name);
    config.store.endpoint = endpoint.filter(|url| !url.trim().is_empty());
    if view_only {
        config.mode = AppMode::View;
    }
    config.save(&project_dir)?;

    if config.store.endpoint.is_none() {
        let _db = Database::new(&config.database_path(&project_dir))?;
    }

    if json {
        println!(
            "{}",
            json!({
                "success": true,
                "project_dir": project_dir.display().to_string(),
                "name": name,
            })
        );
    } else {
        CliFormatter::success(&format!("Created audit register: {}", name));
        CliFormatter::kv("Directory", &project_dir.display().to_string());
        CliFormatter::kv(
            "Storage",
            config.store.endpoint.as_deref().unwrap_or("local database"),
        );
        CliFormatter::blank();
        CliFormatter::info(&format!(
            "Next: clinaudit -p {} add -n \"<audit name>\" -y <year>",
            project_dir.display()
        ));
    }

    Ok(())
}

#[tokio::main]
async fn cmd_serve(project_dir: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load(project_dir)?;
    init_logging(&config.logging.level)?;

    let store = LocalStore::open(&config.database_path(project_dir), &config.store.storage_key)?;
    let host = host.unwrap_or_else(|| config.api.host.clone());
    let port = port.unwrap_or(config.api.port);
    let addr = format!("{}:{}", host, port);

    println!("Serving {} at http://{}", config.project.name, addr);
    api::serve(ApiState::new(store), &addr)
        .await
        .with_context(|| format!("Server on {} failed", addr))?;
    Ok(())
}

#[tokio::main]
async fn cmd_register(command: RegisterCommand, project_dir: &Path, json: bool) -> Result<()> {
    let config = Config::load(project_dir)?;
    init_logging(&config.logging.level)?;

    let store = open_store(&config, project_dir)?;
    let mut controller = Controller::new(store)
        .with_mode(config.mode)
        .with_sync_mode(config.store.sync_mode);
    controller.refresh().await?;

    match command {
        RegisterCommand::List { year } => {
            controller.set_filter(year.as_deref());
            let rows = state::display_order(&controller.filtered());
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                CliFormatter::header(&controller.state().title());
                CliFormatter::audit_table(&rows);
            }
        }
        RegisterCommand::Add {
            name,
            year,
            start,
            reaudit,
        } => {
            let record = controller
                .add_audit(NewAudit {
                    name,
                    year,
                    start_period: start,
                    first_reaudit: reaudit,
                })
                .await?;
            print_record(&record, "Audit added", json)?;
        }
        RegisterCommand::Reaudit { id, period } => {
            let record = controller.add_reaudit(&id, &period).await?;
            print_record(&record, "Re-audit added", json)?;
        }
        RegisterCommand::Note { action } => cmd_note(&mut controller, action, json).await?,
        RegisterCommand::Edit {
            id,
            year,
            name,
            start,
        } => {
            let current = controller
                .state()
                .find(&id)
                .ok_or_else(|| anyhow!("Audit not found: {}", id))?;
            let mut edit = AuditEdit::from_record(current);
            if let Some(year) = year {
                edit.year = year;
            }
            if let Some(name) = name {
                edit.name = name;
            }
            if let Some(start) = start {
                edit.start_period = Some(start);
            }
            let record = controller.edit_audit(&id, edit).await?;
            print_record(&record, "Audit updated", json)?;
        }
        RegisterCommand::Delete { id, yes } => {
            controller.ensure_writable()?;
            let Some(current) = controller.state().find(&id) else {
                bail!("Audit not found: {}", id);
            };
            if !yes && !confirm(&format!("Delete \"{}\" ({})?", current.name, current.year))? {
                CliFormatter::warning("Cancelled");
                return Ok(());
            }
            let removed = controller.delete_audit(&id).await?;
            if json {
                println!("{}", json!({ "success": true, "deleted": removed.id }));
            } else {
                CliFormatter::success(&format!("Deleted audit {}", removed.id));
            }
        }
        RegisterCommand::Stats { year } => {
            controller.set_filter(year.as_deref());
            let totals = state::stats(controller.filtered());
            let years = state::year_stats(&controller.state().items);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "totals": totals, "years": years }))?
                );
            } else {
                CliFormatter::header(&controller.state().title());
                CliFormatter::stats(&totals);
                CliFormatter::header("By Year");
                CliFormatter::year_cards(&state::stats(&controller.state().items), &years);
            }
        }
        RegisterCommand::Years => {
            let now_year = chrono::Local::now().year();
            let items = &controller.state().items;
            let cards = state::year_cards(items, now_year);
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else {
                CliFormatter::header("Years");
                CliFormatter::year_cards(&state::stats(items), &cards);
            }
        }
        RegisterCommand::Export { year, csv, output } => {
            controller.set_filter(year.as_deref());
            let format = if csv { ExportFormat::Csv } else { ExportFormat::Json };
            let filter = controller.state().filter_year.clone();
            let rows = controller.filtered();
            let body = export::render(&rows, format)?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(export::file_name(filter.as_deref(), format)));
            std::fs::write(&path, body)
                .with_context(|| format!("Could not write {}", path.display()))?;

            if json {
                println!(
                    "{}",
                    json!({ "success": true, "path": path.display().to_string(), "count": rows.len() })
                );
            } else {
                CliFormatter::success(&format!(
                    "Exported {} audits to {}",
                    rows.len(),
                    path.display()
                ));
            }
        }
        RegisterCommand::Status => {
            let totals = state::stats(&controller.state().items);
            let mode = match controller.mode() {
                AppMode::Manage => "manage",
                AppMode::View => "view",
            };
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "project": config.project.name,
                        "store": controller.store_description(),
                        "mode": mode,
                        "totals": totals,
                    }))?
                );
            } else {
                CliFormatter::header(&format!("ClinAudit: {}", config.project.name));
                CliFormatter::kv("Directory", &project_dir.display().to_string());
                CliFormatter::kv("Store", &controller.store_description());
                CliFormatter::kv("Mode", mode);
                CliFormatter::stats(&totals);
            }
        }
    }

    Ok(())
}

async fn cmd_note(controller: &mut Controller, action: NoteAction, json: bool) -> Result<()> {
    match action {
        NoteAction::Add {
            id,
            author,
            text,
            period,
        } => {
            let record = controller
                .add_note(
                    &id,
                    NoteInput {
                        author,
                        text,
                        period: Some(period.unwrap_or_else(current_period)),
                    },
                )
                .await?;
            print_record(&record, "Note added", json)
        }
        NoteAction::Edit { id, number, text } => {
            let record = controller.edit_note(&id, note_index(number)?, &text).await?;
            print_record(&record, &format!("Note {} updated", number), json)
        }
        NoteAction::Delete { id, number } => {
            let record = controller.delete_note(&id, note_index(number)?).await?;
            print_record(&record, &format!("Note {} deleted", number), json)
        }
    }
}

/// Notes are numbered from 1 on screen.
fn note_index(number: usize) -> Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Note numbers start at 1"))
}

fn print_record(record: &AuditRecord, message: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
    } else {
        CliFormatter::success(message);
        CliFormatter::audit_table(&[record]);
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
