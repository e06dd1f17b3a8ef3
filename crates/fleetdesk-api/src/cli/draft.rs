//! Draft CLI commands: list, new, show, apply, check, reprice, delete.
//!
//! Every command that changes a draft restores the builder session from its
//! snapshot, edits it through the session, and writes it back through the
//! autosaver, so the CLI goes through the same gates as an interactive
//! builder.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use dialoguer::Confirm;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use fleetdesk_core::builder::agreement::{
    new_agreement_session, restore_agreement_session, AgreementCommand, AgreementSession,
};
use fleetdesk_core::builder::draft_store::{decode_draft, encode_draft, Draft, DraftStore};
use fleetdesk_core::builder::reservation::{ReservationCommand, ReservationSession};
use fleetdesk_core::pricing::PricingBreakdown;
use fleetdesk_core::progress::ProgressTracker;
use fleetdesk_infra::crypto::hash::Sha256ContentHasher;
use fleetdesk_types::agreement::AgreementData;
use fleetdesk_types::draft::BuilderKind;
use fleetdesk_types::progress::StepStatus;
use fleetdesk_types::reservation::ReservationData;
use fleetdesk_types::validation::ValidationResult;

use crate::state::AppState;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DraftCommand {
    /// List saved drafts, most recently updated first.
    List,

    /// Start an empty draft.
    New {
        /// Builder to start (agreement or reservation).
        kind: BuilderKind,

        /// Storage key (defaults to `<kind>-<uuid>`).
        #[arg(long)]
        key: Option<String>,
    },

    /// Print the stored snapshot of a draft.
    Show { key: String },

    /// Apply one builder command given as JSON.
    ///
    /// Example: '{"command":"set_notes","payload":"Airport pickup"}'
    Apply { key: String, command: String },

    /// Validate every step and report whether the draft can be submitted.
    Check {
        key: String,

        /// Builder the draft must belong to.
        #[arg(long)]
        kind: Option<BuilderKind>,
    },

    /// Reprice every reservation line against the current rates.
    Reprice { key: String },

    /// Delete a draft.
    Delete {
        key: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_draft_command(cmd: DraftCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        DraftCommand::List => list_drafts(state, json).await,
        DraftCommand::New { kind, key } => {
            let key = create_draft(state, kind, key).await?;
            print_created(&key, kind, json)
        }
        DraftCommand::Show { key } => show_draft(state, &key, json).await,
        DraftCommand::Apply { key, command } => {
            let outcome = apply_command(state, &key, &command).await?;
            print_applied(&key, &outcome, json)
        }
        DraftCommand::Check { key, kind } => {
            let report = check_draft(state, &key, kind).await?;
            print_report(&report, json)
        }
        DraftCommand::Reprice { key } => {
            let changed = reprice_draft(state, &key).await?;
            if json {
                println!("{}", serde_json::json!({ "key": key, "changed": changed }));
            } else {
                println!(
                    "  {} Repriced '{}': {} line(s) changed.",
                    style("✓").green().bold(),
                    key,
                    changed
                );
            }
            Ok(())
        }
        DraftCommand::Delete { key, force } => delete_draft(state, &key, force, json).await,
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A builder session restored from a draft.
enum Session {
    Agreement(AgreementSession),
    Reservation(ReservationSession<Sha256ContentHasher>),
}

impl Session {
    fn kind(&self) -> BuilderKind {
        match self {
            Session::Agreement(_) => BuilderKind::Agreement,
            Session::Reservation(_) => BuilderKind::Reservation,
        }
    }

    fn progress(&self) -> &ProgressTracker {
        match self {
            Session::Agreement(session) => session.progress(),
            Session::Reservation(session) => session.progress(),
        }
    }

    /// Decode `draft` as the `expected` builder.
    fn restore(draft: &Draft, expected: BuilderKind, state: &AppState) -> Result<Self> {
        let session = match expected {
            BuilderKind::Agreement => {
                let snapshot = decode_draft::<AgreementData>(draft, expected)?;
                Session::Agreement(restore_agreement_session(snapshot, &state.config.pricing)?)
            }
            BuilderKind::Reservation => {
                let snapshot = decode_draft::<ReservationData>(draft, expected)?;
                Session::Reservation(ReservationSession::restore(snapshot, state.pricing_engine())?)
            }
        };
        Ok(session)
    }

    fn encode(&mut self, key: &str, created_at: DateTime<Utc>) -> Result<Draft> {
        let now = Utc::now();
        let kind = self.kind();
        let draft = match self {
            Session::Agreement(session) => {
                encode_draft(key, kind, &session.snapshot_for_save(now), created_at, now)?
            }
            Session::Reservation(session) => {
                encode_draft(key, kind, &session.snapshot_for_save(now), created_at, now)?
            }
        };
        Ok(draft)
    }
}

async fn load(state: &AppState, key: &str) -> Result<Draft> {
    state
        .drafts
        .load_draft(key)
        .await?
        .with_context(|| format!("draft '{key}' not found"))
}

async fn save(state: &AppState, session: &mut Session, key: &str, created_at: DateTime<Utc>) -> Result<()> {
    let draft = session.encode(key, created_at)?;
    let autosaver = state.autosaver();
    autosaver.schedule(draft);
    autosaver.flush().await?;
    tracing::debug!(key, kind = %session.kind(), "draft saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Create an empty draft and return its key.
pub async fn create_draft(state: &AppState, kind: BuilderKind, key: Option<String>) -> Result<String> {
    let key = key.unwrap_or_else(|| format!("{kind}-{}", Uuid::now_v7()));
    if state.drafts.load_draft(&key).await?.is_some() {
        bail!("draft '{key}' already exists");
    }

    let mut session = match kind {
        BuilderKind::Agreement => Session::Agreement(new_agreement_session(&state.config.pricing)?),
        BuilderKind::Reservation => {
            Session::Reservation(ReservationSession::new(state.pricing_engine())?)
        }
    };
    save(state, &mut session, &key, Utc::now()).await?;
    tracing::info!(key = %key, kind = %kind, "draft created");
    Ok(key)
}

/// Result of applying one command to a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub kind: BuilderKind,
    /// Step or section the command edited.
    pub step: usize,
    pub step_title: String,
    /// Lines now priced against an outdated rate context.
    pub stale_lines: usize,
}

/// Parse `command` as the draft's builder command, apply it and save.
pub async fn apply_command(state: &AppState, key: &str, command: &str) -> Result<ApplyOutcome> {
    let draft = load(state, key).await?;
    let mut session = Session::restore(&draft, draft.kind, state)?;

    let (step, stale_lines) = match &mut session {
        Session::Agreement(session) => {
            let command: AgreementCommand =
                serde_json::from_str(command).context("invalid agreement command")?;
            (session.apply(command)?, 0)
        }
        Session::Reservation(session) => {
            let command: ReservationCommand =
                serde_json::from_str(command).context("invalid reservation command")?;
            let applied = session.apply(command, Utc::now())?;
            if let Some(stale) = &applied.stale {
                tracing::info!(lines = stale.line_count, "rate context changed, lines are stale");
            }
            (applied.section, session.stale_lines().len())
        }
    };

    save(state, &mut session, key, draft.created_at).await?;

    let step_title = session
        .progress()
        .steps()
        .get(step)
        .map(|s| s.title.clone())
        .unwrap_or_default();
    Ok(ApplyOutcome {
        kind: session.kind(),
        step,
        step_title,
        stale_lines,
    })
}

/// Reprice every line of a reservation draft and save it.
pub async fn reprice_draft(state: &AppState, key: &str) -> Result<usize> {
    let draft = load(state, key).await?;
    let mut session = Session::restore(&draft, draft.kind, state)?;
    let Session::Reservation(reservation) = &mut session else {
        bail!("draft '{key}' is an agreement; only reservations have priced lines");
    };
    let changed = reservation.reprice_all()?;
    save(state, &mut session, key, draft.created_at).await?;
    Ok(changed)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub title: String,
    pub status: StepStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validation and pricing state of one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub key: String,
    pub kind: BuilderKind,
    pub progress_percent: u8,
    pub steps: Vec<StepReport>,
    /// Why submission is refused, if it is.
    pub blocked: Option<String>,
    pub stale_lines: Vec<Uuid>,
    /// Reservation grand total.
    pub total: Option<Decimal>,
    pub breakdown: Option<PricingBreakdown>,
    /// Why the agreement could not be priced yet.
    pub pricing_error: Option<String>,
}

/// Validate every step of a draft. The draft itself is left unchanged.
pub async fn check_draft(state: &AppState, key: &str, kind: Option<BuilderKind>) -> Result<CheckReport> {
    let draft = load(state, key).await?;
    let mut session = Session::restore(&draft, kind.unwrap_or(draft.kind), state)?;

    let results = match &mut session {
        Session::Agreement(session) => session.validate_all()?,
        Session::Reservation(session) => session.validate_all()?,
    };
    let steps = step_reports(session.progress(), results);

    let blocked = match &session {
        Session::Agreement(session) => session.submit().err(),
        Session::Reservation(session) => session.submit().err(),
    }
    .map(|e| e.to_string());

    let mut report = CheckReport {
        key: key.to_string(),
        kind: session.kind(),
        progress_percent: session.progress().progress_percentage(),
        steps,
        blocked,
        stale_lines: Vec::new(),
        total: None,
        breakdown: None,
        pricing_error: None,
    };

    match &session {
        Session::Agreement(session) => match state.pricing_engine().agreement_breakdown(session.data()) {
            Ok(breakdown) => report.breakdown = Some(breakdown),
            Err(e) => report.pricing_error = Some(e.to_string()),
        },
        Session::Reservation(session) => {
            report.stale_lines = session.stale_lines();
            report.total = Some(session.data().grand_total());
        }
    }
    Ok(report)
}

fn step_reports(progress: &ProgressTracker, results: Vec<ValidationResult>) -> Vec<StepReport> {
    progress
        .steps()
        .iter()
        .zip(results)
        .enumerate()
        .map(|(index, (step, result))| StepReport {
            index,
            title: step.title.clone(),
            status: progress.step_status(index).unwrap_or(StepStatus::NotVisited),
            errors: result.errors,
            warnings: result.warnings,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Read-only commands
// ---------------------------------------------------------------------------

async fn list_drafts(state: &AppState, json: bool) -> Result<()> {
    let drafts = state.drafts.list_drafts().await?;

    if json {
        let items: Vec<_> = drafts
            .iter()
            .map(|d| {
                serde_json::json!({
                    "key": d.key,
                    "kind": d.kind,
                    "current_step": d.current_step,
                    "completed_steps": d.completed_steps,
                    "total_steps": d.total_steps,
                    "updated_at": d.updated_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if drafts.is_empty() {
        println!();
        println!(
            "  {} No drafts found. Start one with: {}",
            style("i").blue().bold(),
            style("fdesk draft new agreement").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Key").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Step").fg(Color::White),
        Cell::new("Complete").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for draft in &drafts {
        let complete = format!("{}/{}", draft.completed_steps, draft.total_steps);
        let complete_cell = if draft.total_steps > 0 && draft.completed_steps == draft.total_steps {
            Cell::new(complete).fg(Color::Green)
        } else {
            Cell::new(complete)
        };
        table.add_row(vec![
            Cell::new(&draft.key),
            Cell::new(draft.kind.to_string()),
            Cell::new(draft.current_step + 1),
            complete_cell,
            Cell::new(format_relative_time(&draft.updated_at)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!("  {} draft(s)", drafts.len());
    println!();
    Ok(())
}

async fn show_draft(state: &AppState, key: &str, json: bool) -> Result<()> {
    let draft = load(state, key).await?;
    let snapshot: serde_json::Value =
        serde_json::from_str(&draft.state_json).context("stored snapshot is not valid JSON")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    println!("  {}  {}", style("Key:").bold(), style(&draft.key).cyan());
    println!("  {}  {}", style("Kind:").bold(), draft.kind);
    println!("  {}  v{}", style("Schema:").bold(), draft.schema_version);
    println!(
        "  {}  {}",
        style("Created:").bold(),
        draft.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {}  {}",
        style("Updated:").bold(),
        draft.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    println!();
    Ok(())
}

async fn delete_draft(state: &AppState, key: &str, force: bool, json: bool) -> Result<()> {
    let draft = load(state, key).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} draft '{}'?",
                draft.kind,
                style(key).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.drafts.delete_draft(key).await?;
    tracing::info!(key, "draft deleted");

    if json {
        println!("{}", serde_json::json!({ "deleted": true, "key": key }));
    } else {
        println!("  {} Draft '{}' deleted.", style("✓").red().bold(), key);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_created(key: &str, kind: BuilderKind, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "key": key, "kind": kind }));
        return Ok(());
    }
    println!();
    println!("  {} {} draft created.", style("✓").green().bold(), kind);
    println!("  {}  {}", style("Key:").bold(), style(key).cyan());
    println!();
    Ok(())
}

fn print_applied(key: &str, outcome: &ApplyOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    println!(
        "  {} Updated '{}' ({}: {}).",
        style("✓").green().bold(),
        key,
        outcome.step + 1,
        outcome.step_title
    );
    if outcome.stale_lines > 0 {
        println!(
            "  {} {} line(s) priced against old rates. Run {} to update them.",
            style("!").yellow().bold(),
            outcome.stale_lines,
            style(format!("fdesk draft reprice {key}")).yellow()
        );
    }
    Ok(())
}

fn print_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Step").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Errors").fg(Color::White),
        Cell::new("Warnings").fg(Color::White),
    ]);
    for step in &report.steps {
        table.add_row(vec![
            Cell::new(step.index + 1),
            Cell::new(&step.title),
            status_cell(step.status),
            Cell::new(step.errors.join("\n")).fg(Color::Red),
            Cell::new(step.warnings.join("\n")).fg(Color::Yellow),
        ]);
    }

    println!();
    println!(
        "  {} {} ({}, {}% complete)",
        style("Draft").bold(),
        style(&report.key).cyan(),
        report.kind,
        report.progress_percent
    );
    println!();
    println!("{table}");
    println!();

    if let Some(breakdown) = &report.breakdown {
        println!(
            "  {} {} x {} @ {} ({})",
            style("Price").bold(),
            breakdown.units,
            breakdown.tier,
            breakdown.unit_rate,
            style(breakdown.source).dim()
        );
        println!("  Net:    {:>10}", breakdown.net.to_string());
        println!("  Tax:    {:>10}", breakdown.tax.to_string());
        println!("  Total:  {:>10}", breakdown.total.to_string());
        println!();
    }
    if let Some(error) = &report.pricing_error {
        println!("  {}", style(format!("Not priced yet: {error}")).dim());
        println!();
    }
    if let Some(total) = report.total {
        println!("  {} {}", style("Grand total:").bold(), total);
        if !report.stale_lines.is_empty() {
            println!(
                "  {} {} line(s) priced against old rates.",
                style("!").yellow().bold(),
                report.stale_lines.len()
            );
        }
        println!();
    }

    match &report.blocked {
        None => println!("  {} Ready to submit.", style("✓").green().bold()),
        Some(reason) => println!("  {} {}", style("✗").red().bold(), reason),
    }
    println!();
    Ok(())
}

fn status_cell(status: StepStatus) -> Cell {
    match status {
        StepStatus::Complete => Cell::new("● complete").fg(Color::Green),
        StepStatus::HasErrors => Cell::new("✗ has errors").fg(Color::Red),
        StepStatus::Incomplete => Cell::new("○ incomplete").fg(Color::Yellow),
        StepStatus::NotVisited => Cell::new("◌ not visited").fg(Color::DarkGrey),
    }
}

fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
