//! `mqt ncr` command - Non-conformance report management

use chrono::Utc;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{escape_csv, format_short_id, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::provider::StaticCapaProvider;
use crate::core::workflow::DispositionEngine;
use crate::core::provider::NullSink;
use crate::entities::ncr::{
    AffectedItem, Defect, Disposition, DispositionDecision, Ncr, NcrSeverity, NcrSource,
    NcrStatus,
};
use crate::store::{DocumentStore, FsStore};

#[derive(clap::Subcommand, Debug)]
pub enum NcrCommands {
    /// List NCRs with filtering
    List(ListArgs),

    /// Create a new NCR manually
    New(NewArgs),

    /// Show an NCR's details
    Show(ShowArgs),

    /// Edit an NCR in your editor
    Edit(EditArgs),

    /// Assign a reviewer and begin review
    Review(ReviewArgs),

    /// Record the disposition decision
    Disposition(DispositionArgs),

    /// Link a corrective action
    LinkCapa(LinkCapaArgs),

    /// Close a dispositioned NCR
    Close(CloseArgs),

    /// Cancel an NCR before disposition
    Cancel(CancelArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by severity
    #[arg(long, short = 'S')]
    pub severity: Option<String>,

    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Search in title and description
    #[arg(long)]
    pub search: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show only count
    #[arg(long)]
    pub count: bool,

    /// Output format
    #[arg(long, short = 'o', default_value = "auto")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// NCR title
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Source (inspection, production, customer, supplier)
    #[arg(long, default_value = "inspection")]
    pub source: String,

    /// Severity level
    #[arg(long, short = 'S', default_value = "minor")]
    pub severity: String,

    /// Defect type (e.g., dimensional, cosmetic)
    #[arg(long, default_value = "dimensional")]
    pub defect_type: String,

    /// Defect description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Affected item as type:identifier:quantity (repeatable)
    #[arg(long = "item", short = 'i')]
    pub items: Vec<String>,

    /// Interactive mode (prompt for fields)
    #[arg(long, short = 'I')]
    pub interactive: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "yaml")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// NCR ID (full or partial)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ReviewArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// Assigned reviewer
    #[arg(long, short = 'r')]
    pub reviewer: String,
}

#[derive(clap::Args, Debug)]
pub struct DispositionArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// Decision (use_as_is, rework, repair, scrap, return, sort)
    #[arg(long, short = 'd')]
    pub decision: String,

    /// Justification for the decision
    #[arg(long, short = 'j')]
    pub justification: String,

    /// Approver
    #[arg(long, short = 'a')]
    pub approver: String,

    /// Material must be reinspected (required for rework/repair)
    #[arg(long)]
    pub reinspection: bool,
}

#[derive(clap::Args, Debug)]
pub struct LinkCapaArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// Corrective action ID (CAPA-xxx)
    pub capa: String,
}

#[derive(clap::Args, Debug)]
pub struct CloseArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// The linked corrective action was verified effective
    #[arg(long)]
    pub capa_effective: bool,
}

#[derive(clap::Args, Debug)]
pub struct CancelArgs {
    /// NCR ID (full or partial)
    pub id: String,

    /// Reason for cancellation
    #[arg(long, short = 'r')]
    pub reason: String,
}

pub fn run(cmd: NcrCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        NcrCommands::List(args) => run_list(args, global),
        NcrCommands::New(args) => run_new(args, global),
        NcrCommands::Show(args) => run_show(args, global),
        NcrCommands::Edit(args) => run_edit(args, global),
        NcrCommands::Review(args) => run_review(args, global),
        NcrCommands::Disposition(args) => run_disposition(args, global),
        NcrCommands::LinkCapa(args) => run_link_capa(args, global),
        NcrCommands::Close(args) => run_close(args, global),
        NcrCommands::Cancel(args) => run_cancel(args, global),
    }
}

fn load_ncr(store: &FsStore, partial: &str) -> Result<Ncr> {
    let id = store
        .resolve_id(EntityPrefix::Ncr, partial)
        .into_diagnostic()?;
    store.load(&id).into_diagnostic()
}

fn save_transitioned(store: &FsStore, ncr: &Ncr, loaded_version: u64) -> Result<()> {
    store.save_versioned(ncr, loaded_version).into_diagnostic()
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;

    let severity_filter: Option<NcrSeverity> = args
        .severity
        .map(|s| s.parse().map_err(|e| miette::miette!("{}", e)))
        .transpose()?;
    let status_filter: Option<NcrStatus> = args
        .status
        .map(|s| s.parse().map_err(|e| miette::miette!("{}", e)))
        .transpose()?;

    let mut ncrs: Vec<Ncr> = store
        .list()
        .into_diagnostic()?
        .into_iter()
        .filter(|n: &Ncr| severity_filter.map_or(true, |s| n.severity() == s))
        .filter(|n| status_filter.map_or(true, |s| n.status == s))
        .filter(|n| {
            if let Some(ref search) = args.search {
                let needle = search.to_lowercase();
                n.title.to_lowercase().contains(&needle)
                    || n.defect.description.to_lowercase().contains(&needle)
            } else {
                true
            }
        })
        .collect();

    ncrs.sort_by(|a, b| a.created.cmp(&b.created));
    if let Some(limit) = args.limit {
        ncrs.truncate(limit);
    }

    if args.count {
        println!("{}", ncrs.len());
        return Ok(());
    }

    if ncrs.is_empty() {
        println!("No NCRs found.");
        return Ok(());
    }

    let format = if args.format == OutputFormat::Auto {
        OutputFormat::Tsv
    } else {
        args.format
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ncrs).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&ncrs).into_diagnostic()?);
        }
        OutputFormat::Csv => {
            println!("id,title,source,severity,status");
            for ncr in &ncrs {
                println!(
                    "{},{},{},{},{}",
                    ncr.id,
                    escape_csv(&ncr.title),
                    ncr.source,
                    ncr.severity(),
                    ncr.status
                );
            }
        }
        OutputFormat::Id => {
            for ncr in &ncrs {
                println!("{}", ncr.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<30} {:<11} {:<9} {:<13}",
                style("ID").bold(),
                style("TITLE").bold(),
                style("SOURCE").bold(),
                style("SEVERITY").bold(),
                style("STATUS").bold()
            );
            println!("{}", "-".repeat(84));

            for ncr in &ncrs {
                let severity_styled = match ncr.severity() {
                    NcrSeverity::Critical => style(ncr.severity().to_string()).red().bold(),
                    NcrSeverity::Major => style(ncr.severity().to_string()).yellow(),
                    NcrSeverity::Minor => style(ncr.severity().to_string()).white(),
                };
                println!(
                    "{:<17} {:<30} {:<11} {:<9} {:<13}",
                    style(format_short_id(&ncr.id)).cyan(),
                    truncate_str(&ncr.title, 28),
                    ncr.source.to_string(),
                    severity_styled,
                    ncr.status.to_string()
                );
            }

            println!();
            println!("{} NCR(s) found.", style(ncrs.len()).cyan());
        }
    }

    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let config = Config::load();

    let title: String;
    let source: String;
    let severity: String;
    let description: String;

    if args.interactive || args.title.is_none() {
        use dialoguer::{Input, Select};

        title = Input::new()
            .with_prompt("NCR title")
            .interact_text()
            .into_diagnostic()?;

        let source_options = ["inspection", "production", "customer", "supplier"];
        let source_idx = Select::new()
            .with_prompt("Source")
            .items(&source_options)
            .default(0)
            .interact()
            .into_diagnostic()?;
        source = source_options[source_idx].to_string();

        let severity_options = ["minor", "major", "critical"];
        let severity_idx = Select::new()
            .with_prompt("Severity")
            .items(&severity_options)
            .default(0)
            .interact()
            .into_diagnostic()?;
        severity = severity_options[severity_idx].to_string();

        description = Input::new()
            .with_prompt("Defect description")
            .interact_text()
            .into_diagnostic()?;
    } else {
        title = args.title.expect("checked above");
        source = args.source;
        severity = args.severity;
        description = args.description.unwrap_or_default();
    }

    let source: NcrSource = source.parse().map_err(|e| miette::miette!("{}", e))?;
    let severity: NcrSeverity = severity.parse().map_err(|e| miette::miette!("{}", e))?;

    let mut affected_items = Vec::new();
    for spec in &args.items {
        affected_items.push(parse_item(spec)?);
    }

    let mut ncr = Ncr::new(
        title,
        source,
        Defect::new(args.defect_type, description, severity),
        affected_items,
        config.author(),
    );

    // Manual creation follows the same containment rule as
    // signal-driven creation.
    if severity == NcrSeverity::Critical {
        for item in &mut ncr.affected_items {
            item.quarantined = true;
        }
        ncr.containment = Some(crate::entities::ncr::Containment {
            action: "auto-quarantine".to_string(),
            implemented_by: "system".to_string(),
            implemented_at: Utc::now(),
        });
    }

    store.save(&ncr).into_diagnostic()?;

    let severity_styled = match severity {
        NcrSeverity::Critical => style(severity.to_string()).red().bold(),
        NcrSeverity::Major => style(severity.to_string()).yellow(),
        NcrSeverity::Minor => style(severity.to_string()).white(),
    };
    println!(
        "{} Created NCR {}",
        style("✓").green(),
        style(&ncr.id).cyan()
    );
    println!(
        "   {} | {} | {}",
        style(ncr.source.to_string()).yellow(),
        severity_styled,
        style(&ncr.title).white()
    );

    Ok(())
}

fn parse_item(spec: &str) -> Result<AffectedItem> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [item_type, identifier, quantity] => {
            let quantity: u32 = quantity
                .parse()
                .map_err(|e| miette::miette!("bad quantity in '{}': {}", spec, e))?;
            Ok(AffectedItem::new(*item_type, *identifier, quantity))
        }
        _ => Err(miette::miette!(
            "bad item '{}': expected type:identifier:quantity",
            spec
        )),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let ncr = load_ncr(&store, &args.id)?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ncr).into_diagnostic()?);
        }
        _ => {
            print!("{}", serde_yml::to_string(&ncr).into_diagnostic()?);
        }
    }

    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let (project, store) = open_store(&global.project)?;
    let config = Config::load();

    let id = store
        .resolve_id(EntityPrefix::Ncr, &args.id)
        .into_diagnostic()?;
    let path = project.entity_path(&id);

    println!(
        "Opening {} in {}...",
        style(path.display()).cyan(),
        style(config.editor()).yellow()
    );
    config.run_editor(&path).into_diagnostic()?;

    Ok(())
}

fn run_review(args: ReviewArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut ncr = load_ncr(&store, &args.id)?;
    let loaded_version = ncr.entity_revision;

    let engine = DispositionEngine::new(&NullSink);
    engine
        .begin_review(&mut ncr, &args.reviewer)
        .into_diagnostic()?;
    save_transitioned(&store, &ncr, loaded_version)?;

    println!(
        "{} {} under review by {}",
        style("✓").green(),
        style(&ncr.id).cyan(),
        style(&args.reviewer).yellow()
    );
    Ok(())
}

fn run_disposition(args: DispositionArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut ncr = load_ncr(&store, &args.id)?;
    let loaded_version = ncr.entity_revision;

    let decision: DispositionDecision =
        args.decision.parse().map_err(|e| miette::miette!("{}", e))?;

    let engine = DispositionEngine::new(&NullSink);
    engine
        .disposition(
            &mut ncr,
            Disposition {
                decision,
                justification: args.justification,
                approver: args.approver,
                reinspection_required: args.reinspection,
                decided_at: Utc::now(),
            },
        )
        .into_diagnostic()?;
    save_transitioned(&store, &ncr, loaded_version)?;

    println!(
        "{} {} dispositioned: {}",
        style("✓").green(),
        style(&ncr.id).cyan(),
        style(decision).bold()
    );
    Ok(())
}

fn run_link_capa(args: LinkCapaArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut ncr = load_ncr(&store, &args.id)?;
    let loaded_version = ncr.entity_revision;

    let capa_id: EntityId = args.capa.parse().map_err(|e| miette::miette!("{}", e))?;
    if capa_id.prefix() != EntityPrefix::Capa {
        return Err(miette::miette!("'{}' is not a CAPA identifier", args.capa));
    }

    ncr.capa = Some(capa_id.clone());
    ncr.bump_version();
    save_transitioned(&store, &ncr, loaded_version)?;

    println!(
        "{} Linked {} to {}",
        style("✓").green(),
        style(&capa_id).cyan(),
        style(&ncr.id).cyan()
    );
    Ok(())
}

fn run_close(args: CloseArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut ncr = load_ncr(&store, &args.id)?;
    let loaded_version = ncr.entity_revision;

    // The corrective-action service is external; the flag carries its
    // verification verdict across the CLI boundary.
    let mut provider = StaticCapaProvider::new();
    if let Some(capa_id) = &ncr.capa {
        provider = provider.with_outcome(capa_id, args.capa_effective);
    }

    let engine = DispositionEngine::new(&NullSink);
    engine.close(&mut ncr, &provider).into_diagnostic()?;
    save_transitioned(&store, &ncr, loaded_version)?;

    println!("{} Closed {}", style("✓").green(), style(&ncr.id).cyan());
    Ok(())
}

fn run_cancel(args: CancelArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut ncr = load_ncr(&store, &args.id)?;
    let loaded_version = ncr.entity_revision;

    let engine = DispositionEngine::new(&NullSink);
    engine.cancel(&mut ncr, &args.reason).into_diagnostic()?;
    save_transitioned(&store, &ncr, loaded_version)?;

    println!(
        "{} Cancelled {} ({})",
        style("✓").green(),
        style(&ncr.id).cyan(),
        args.reason
    );
    Ok(())
}
