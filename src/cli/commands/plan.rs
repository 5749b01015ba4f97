//! `mqt plan` command - inspection plan management

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{format_short_id, open_store, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::Config;
use crate::core::identity::EntityPrefix;
use crate::entities::plan::InspectionPlan;
use crate::sampling::{InspectionLevel, SamplingPlan, SwitchingRules};
use crate::spc::SpecLimits;
use crate::store::DocumentStore;

#[derive(clap::Subcommand, Debug)]
pub enum PlanCommands {
    /// Create a new inspection plan
    New(NewArgs),

    /// List inspection plans
    List(ListArgs),

    /// Show an inspection plan
    Show(ShowArgs),
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Plan title
    #[arg(long, short = 't')]
    pub title: String,

    /// Product identifier
    #[arg(long, short = 'p')]
    pub product: String,

    /// Characteristic being inspected
    #[arg(long, short = 'c')]
    pub characteristic: String,

    /// Inspection level (S1-S4, I, II, III)
    #[arg(long, short = 'l', default_value = "II")]
    pub level: String,

    /// Acceptable quality level, percent
    #[arg(long, short = 'a')]
    pub aql: f64,

    /// Upper specification limit
    #[arg(long)]
    pub usl: Option<f64>,

    /// Lower specification limit
    #[arg(long)]
    pub lsl: Option<f64>,

    /// Track regime switching for this plan
    #[arg(long)]
    pub switching: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "auto")]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Plan ID (full or partial)
    pub id: String,
}

pub fn run(cmd: PlanCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        PlanCommands::New(args) => run_new(args, global),
        PlanCommands::List(args) => run_list(args, global),
        PlanCommands::Show(args) => run_show(args, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let config = Config::load();

    let level: InspectionLevel = args.level.parse().map_err(|e| miette::miette!("{}", e))?;

    let mut sampling_plan = SamplingPlan::aql(level, args.aql);
    if args.switching {
        sampling_plan.switching_rules = Some(SwitchingRules::default());
    }

    let mut plan = InspectionPlan::new(
        args.title,
        args.product,
        args.characteristic,
        sampling_plan,
        config.author(),
    );

    if args.usl.is_some() || args.lsl.is_some() {
        plan.spec_limits = Some(SpecLimits::new(args.usl, args.lsl).into_diagnostic()?);
    }

    store.save(&plan).into_diagnostic()?;

    println!(
        "{} Created plan {}",
        style("✓").green(),
        style(&plan.id).cyan()
    );
    println!(
        "   {} / {} | level {} | AQL {}",
        style(&plan.product).yellow(),
        plan.characteristic,
        plan.sampling_plan.inspection_level,
        plan.sampling_plan.aql
    );

    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let mut plans: Vec<InspectionPlan> = store.list().into_diagnostic()?;
    plans.sort_by(|a, b| a.created.cmp(&b.created));

    if plans.is_empty() {
        println!("No inspection plans found.");
        return Ok(());
    }

    let format = if args.format == OutputFormat::Auto {
        OutputFormat::Tsv
    } else {
        args.format
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&plans).into_diagnostic()?
            );
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&plans).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for plan in &plans {
                println!("{}", plan.id);
            }
        }
        _ => {
            println!(
                "{:<17} {:<26} {:<14} {:<6} {:<6}",
                style("ID").bold(),
                style("TITLE").bold(),
                style("PRODUCT").bold(),
                style("LEVEL").bold(),
                style("AQL").bold()
            );
            println!("{}", "-".repeat(75));
            for plan in &plans {
                println!(
                    "{:<17} {:<26} {:<14} {:<6} {:<6}",
                    style(format_short_id(&plan.id)).cyan(),
                    truncate_str(&plan.title, 24),
                    truncate_str(&plan.product, 12),
                    plan.sampling_plan.inspection_level.to_string(),
                    plan.sampling_plan.aql
                );
            }
            println!();
            println!("{} plan(s) found.", style(plans.len()).cyan());
        }
    }

    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let id = store
        .resolve_id(EntityPrefix::Plan, &args.id)
        .into_diagnostic()?;
    let plan: InspectionPlan = store.load(&id).into_diagnostic()?;
    print!("{}", serde_yml::to_string(&plan).into_diagnostic()?);
    Ok(())
}
