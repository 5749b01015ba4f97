//! `mqt chart` command - control chart management and analysis

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_short_id, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::provider::NullSink;
use crate::core::workflow::{DispositionEngine, QualitySignal};
use crate::entities::ncr::{AffectedItem, NcrSeverity};
use crate::spc::{
    capability, detect_violations, ChartType, ControlChart, DetectionRule, Measurement,
    SpecLimits, Subgroup,
};
use crate::store::{DocumentStore, FsStore};

#[derive(clap::Subcommand, Debug)]
pub enum ChartCommands {
    /// Create a new control chart
    New(NewArgs),

    /// Append one subgroup of measurements
    Add(AddArgs),

    /// Import subgroups from a CSV file (one subgroup per row)
    Import(ImportArgs),

    /// List charts
    List(ListArgs),

    /// Show a chart's record
    Show(ShowArgs),

    /// Show computed control limits
    Limits(ShowArgs),

    /// Detect out-of-control violations
    Violations(ViolationsArgs),

    /// Compute process capability indices
    Capability(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Chart title
    #[arg(long, short = 't')]
    pub title: String,

    /// Characteristic being charted
    #[arg(long, short = 'c')]
    pub characteristic: String,

    /// Chart type (xbar_r, xbar_s, individuals, p, np, c, u)
    #[arg(long, short = 'T', default_value = "xbar_r")]
    pub r#type: String,

    /// Upper specification limit
    #[arg(long)]
    pub usl: Option<f64>,

    /// Lower specification limit
    #[arg(long)]
    pub lsl: Option<f64>,

    /// Target value
    #[arg(long)]
    pub target: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Chart ID (full or partial)
    pub id: String,

    /// Measurement values for one subgroup
    #[arg(required = true, num_args = 1..)]
    pub values: Vec<f64>,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Chart ID (full or partial)
    pub id: String,

    /// CSV file, one subgroup per row
    #[arg(long, short = 'F')]
    pub file: PathBuf,

    /// Skip a header row
    #[arg(long)]
    pub headers: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "auto")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Chart ID (full or partial)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ViolationsArgs {
    /// Chart ID (full or partial)
    pub id: String,

    /// Include the alternation test
    #[arg(long)]
    pub all_rules: bool,

    /// Open an NCR when violations are found
    #[arg(long)]
    pub open_ncr: bool,

    /// NCR severity when opening one
    #[arg(long, short = 'S', default_value = "major")]
    pub severity: String,
}

pub fn run(cmd: ChartCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ChartCommands::New(args) => run_new(args, global),
        ChartCommands::Add(args) => run_add(args, global),
        ChartCommands::Import(args) => run_import(args, global),
        ChartCommands::List(args) => run_list(args, global),
        ChartCommands::Show(args) => run_show(args, global),
        ChartCommands::Limits(args) => run_limits(args, global),
        ChartCommands::Violations(args) => run_violations(args, global),
        ChartCommands::Capability(args) => run_capability(args, global),
    }
}

fn load_chart(store: &FsStore, partial: &str) -> Result<(EntityId, ControlChart)> {
    let id = store
        .resolve_id(EntityPrefix::Chart, partial)
        .into_diagnostic()?;
    let chart: ControlChart = store.load(&id).into_diagnostic()?;
    Ok((id, chart))
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let config = Config::load();

    let chart_type: ChartType = args.r#type.parse().map_err(|e| miette::miette!("{}", e))?;
    let mut chart = ControlChart::new(
        args.title,
        args.characteristic,
        chart_type,
        config.author(),
    );

    if args.usl.is_some() || args.lsl.is_some() {
        let mut spec = SpecLimits::new(args.usl, args.lsl).into_diagnostic()?;
        if let Some(target) = args.target {
            spec = spec.with_target(target);
        }
        chart = chart.with_spec_limits(spec);
    }

    store.save(&chart).into_diagnostic()?;

    println!(
        "{} Created chart {}",
        style("✓").green(),
        style(&chart.id).cyan()
    );
    println!(
        "   {} | {}",
        style(chart.chart_type).yellow(),
        chart.characteristic
    );

    Ok(())
}

fn append_subgroups(
    store: &FsStore,
    partial: &str,
    rows: Vec<Vec<f64>>,
) -> Result<(EntityId, usize)> {
    let (id, mut chart) = load_chart(store, partial)?;
    let loaded_version = chart.entity_revision;

    let mut appended = 0;
    for row in rows {
        let subgroup = Subgroup::new(row.into_iter().map(Measurement::conforming).collect());
        chart.add_subgroup(subgroup).into_diagnostic()?;
        appended += 1;
    }

    store.save_versioned(&chart, loaded_version).into_diagnostic()?;
    Ok((id, appended))
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let (id, _) = append_subgroups(&store, &args.id, vec![args.values])?;

    println!(
        "{} Appended subgroup to {}",
        style("✓").green(),
        style(&id).cyan()
    );
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(args.headers)
        .flexible(true)
        .from_path(&args.file)
        .into_diagnostic()?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.into_diagnostic()?;
        let row: Vec<f64> = record
            .iter()
            .filter(|field| !field.trim().is_empty())
            .map(|field| {
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| miette::miette!("bad value '{}': {}", field, e))
            })
            .collect::<Result<_>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }

    let count = rows.len();
    let (id, appended) = append_subgroups(&store, &args.id, rows)?;

    println!(
        "{} Imported {}/{} subgroup(s) into {}",
        style("✓").green(),
        appended,
        count,
        style(&id).cyan()
    );
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut charts: Vec<ControlChart> = store.list().into_diagnostic()?;
    charts.sort_by(|a, b| a.created.cmp(&b.created));

    if charts.is_empty() {
        println!("No charts found.");
        return Ok(());
    }

    match args.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&charts).into_diagnostic()?
            );
        }
        OutputFormat::Id => {
            for chart in &charts {
                println!("{}", chart.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<26} {:<12} {:<10} {:<6}",
                style("ID").bold(),
                style("TITLE").bold(),
                style("TYPE").bold(),
                style("SUBGROUPS").bold(),
                style("SPEC").bold()
            );
            println!("{}", "-".repeat(75));
            for chart in &charts {
                println!(
                    "{:<17} {:<26} {:<12} {:<10} {:<6}",
                    style(format_short_id(&chart.id)).cyan(),
                    truncate_str(&chart.title, 24),
                    chart.chart_type.to_string(),
                    chart.subgroups().len(),
                    if chart.spec_limits.is_some() { "yes" } else { "-" }
                );
            }
            println!();
            println!("{} chart(s) found.", style(charts.len()).cyan());
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let (_, chart) = load_chart(&store, &args.id)?;
    print!("{}", serde_yml::to_string(&chart).into_diagnostic()?);
    Ok(())
}

fn run_limits(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let (_, chart) = load_chart(&store, &args.id)?;
    let limits = chart.control_limits().into_diagnostic()?;

    let mut builder = Builder::default();
    builder.push_record(["chart", "UCL", "CL", "LCL"]);
    builder.push_record([
        chart.chart_type.to_string(),
        format!("{:.4}", limits.primary.ucl),
        format!("{:.4}", limits.primary.cl),
        format!("{:.4}", limits.primary.lcl),
    ]);
    if let Some(secondary) = limits.secondary {
        builder.push_record([
            "dispersion".to_string(),
            format!("{:.4}", secondary.ucl),
            format!("{:.4}", secondary.cl),
            format!("{:.4}", secondary.lcl),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::sharp());
    println!("{table}");

    Ok(())
}

fn run_violations(args: ViolationsArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let (id, chart) = load_chart(&store, &args.id)?;

    let rules = if args.all_rules {
        DetectionRule::all()
    } else {
        DetectionRule::default_set()
    };
    let violations = detect_violations(&chart, rules).into_diagnostic()?;

    if violations.is_empty() {
        println!("{} No violations detected.", style("✓").green());
        return Ok(());
    }

    let mut builder = Builder::default();
    builder.push_record(["#", "RULE", "VALUE", "DESCRIPTION"]);
    for violation in &violations {
        builder.push_record([
            violation.subgroup_index.to_string(),
            violation.rule.to_string(),
            format!("{:.4}", violation.value),
            violation.description.clone(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    println!("{table}");
    println!(
        "{} violation(s) on {}",
        style(violations.len()).red().bold(),
        style(&id).cyan()
    );

    if args.open_ncr {
        let severity: NcrSeverity =
            args.severity.parse().map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load();
        let engine = DispositionEngine::new(&NullSink);
        let ncr = engine.open_from_signal(
            QualitySignal::OutOfControl {
                chart_id: id.clone(),
                characteristic: chart.characteristic.clone(),
                violations,
                severity,
                affected_items: vec![AffectedItem::new(
                    "characteristic",
                    chart.characteristic.clone(),
                    0,
                )],
            },
            &config.author(),
        );
        store.save(&ncr).into_diagnostic()?;
        println!("{} Opened {}", style("✓").green(), style(&ncr.id).cyan());
    }

    Ok(())
}

fn run_capability(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let (_, chart) = load_chart(&store, &args.id)?;
    let study = capability(&chart).into_diagnostic()?;

    if study.is_indeterminate() {
        println!(
            "{} capability indeterminate: process spread is zero",
            style("!").yellow().bold()
        );
        return Ok(());
    }

    let fmt = |index: Option<f64>| match index {
        Some(v) => format!("{v:.3}"),
        None => "-".to_string(),
    };

    let mut builder = Builder::default();
    builder.push_record(["Cp", "Cpk", "Pp", "Ppk"]);
    builder.push_record([
        fmt(study.cp),
        fmt(study.cpk),
        fmt(study.pp),
        fmt(study.ppk),
    ]);
    let mut table = builder.build();
    table.with(Style::sharp());
    println!("{table}");
    println!(
        "mean {:.4}  sigma(within) {:.4}  sigma(overall) {:.4}",
        study.mean, study.sigma_within, study.sigma_overall
    );

    Ok(())
}
