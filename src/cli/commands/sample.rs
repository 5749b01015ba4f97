//! `mqt sample` command - acceptance sampling

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::open_store;
use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::identity::EntityPrefix;
use crate::core::provider::{InspectionPlanProvider, NotificationSink, QualityEvent};
use crate::core::workflow::{DispositionEngine, QualitySignal};
use crate::entities::ncr::{AffectedItem, NcrSeverity, NcrSource};
use crate::sampling::{
    draw_sample_indices, resolve_sample_size, CodeTables, InspectionLevel, LotDecision,
    LotOutcome, RegimeKey, RegimeRecord, SampleSizeResult, SamplingPlan, Z14Tables,
};
use crate::store::{DocumentStore, FsStore, NEW_RECORD};

#[derive(clap::Subcommand, Debug)]
pub enum SampleCommands {
    /// Resolve sample size and accept/reject numbers for a lot
    Resolve(ResolveArgs),

    /// Draw random unit indices for a sample
    Draw(DrawArgs),

    /// Evaluate a defect count against a plan
    Evaluate(EvaluateArgs),
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Inspection level (S1-S4, I, II, III)
    #[arg(long, short = 'l', default_value = "II")]
    pub level: String,

    /// Acceptable quality level, percent
    #[arg(long, short = 'a')]
    pub aql: f64,

    /// Lot size
    #[arg(long, short = 'n')]
    pub lot_size: u64,

    /// Also show the double sampling plan
    #[arg(long)]
    pub double: bool,
}

#[derive(clap::Args, Debug)]
pub struct DrawArgs {
    /// Inspection level (S1-S4, I, II, III)
    #[arg(long, short = 'l', default_value = "II")]
    pub level: String,

    /// Acceptable quality level, percent
    #[arg(long, short = 'a')]
    pub aql: f64,

    /// Lot size
    #[arg(long, short = 'n')]
    pub lot_size: u64,
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// Inspection plan ID (full or partial); overrides level/aql
    #[arg(long, short = 'p')]
    pub plan: Option<String>,

    /// Inspection level (S1-S4, I, II, III)
    #[arg(long, short = 'l', default_value = "II")]
    pub level: String,

    /// Acceptable quality level, percent
    #[arg(long, short = 'a')]
    pub aql: Option<f64>,

    /// Lot size
    #[arg(long, short = 'n')]
    pub lot_size: u64,

    /// Nonconforming units found in the first sample
    #[arg(long, short = 'd')]
    pub defects: u32,

    /// Nonconforming units found in the second sample, when escalating
    #[arg(long)]
    pub second_defects: Option<u32>,

    /// Lot number for traceability
    #[arg(long)]
    pub lot: Option<String>,

    /// NCR severity on rejection
    #[arg(long, short = 'S', default_value = "major")]
    pub severity: String,

    /// Do not open an NCR on rejection
    #[arg(long)]
    pub no_ncr: bool,
}

/// Sink that narrates workflow events on the terminal
struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn notify(&self, event: &QualityEvent) {
        match event {
            QualityEvent::NcrOpened { ncr_id, severity, .. } => {
                println!(
                    "{} Quality team notified: {} opened ({})",
                    style("→").dim(),
                    style(ncr_id).cyan(),
                    severity
                );
            }
            QualityEvent::CriticalQuarantine { items, .. } => {
                println!(
                    "{} Auto-quarantine applied to {} item(s)",
                    style("→").red().bold(),
                    items.len()
                );
            }
        }
    }
}

pub fn run(cmd: SampleCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SampleCommands::Resolve(args) => run_resolve(args),
        SampleCommands::Draw(args) => run_draw(args),
        SampleCommands::Evaluate(args) => run_evaluate(args, global),
    }
}

fn print_plan(result: &SampleSizeResult) {
    println!(
        "code {}  sample size {}  accept {}  reject {}",
        style(result.code).cyan().bold(),
        style(result.sample_size).bold(),
        style(result.accept_number).green(),
        style(result.reject_number).red()
    );
}

fn run_resolve(args: ResolveArgs) -> Result<()> {
    let level: InspectionLevel = args.level.parse().map_err(|e| miette::miette!("{}", e))?;
    let plan = SamplingPlan::aql(level, args.aql);
    let result = resolve_sample_size(&plan, args.lot_size).into_diagnostic()?;

    print_plan(&result);

    if args.double {
        match Z14Tables.double_plan(result.code, args.aql).into_diagnostic()? {
            Some(double) => {
                println!(
                    "double: n1 {} ({}/{})  n2 {} (cumulative {}/{})",
                    double.n1, double.ac1, double.re1, double.n2, double.ac2, double.re2
                );
            }
            None => println!("double: not available for this cell, use single sampling"),
        }
    }

    Ok(())
}

fn run_draw(args: DrawArgs) -> Result<()> {
    let level: InspectionLevel = args.level.parse().map_err(|e| miette::miette!("{}", e))?;
    let plan = SamplingPlan::aql(level, args.aql);
    let result = resolve_sample_size(&plan, args.lot_size).into_diagnostic()?;

    let mut rng = rand::rng();
    let indices = draw_sample_indices(&mut rng, args.lot_size, result.sample_size);

    println!(
        "{} unit(s) of {} to inspect:",
        style(indices.len()).bold(),
        args.lot_size
    );
    for chunk in indices.chunks(16) {
        println!(
            "  {}",
            chunk
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        );
    }

    Ok(())
}

fn run_evaluate(args: EvaluateArgs, global: &GlobalOpts) -> Result<()> {
    let (_, store) = open_store(&global.project)?;
    let severity: NcrSeverity = args.severity.parse().map_err(|e| miette::miette!("{}", e))?;

    // The plan comes from a stored inspection plan or from level/aql.
    let (sampling_plan, product, characteristic) = match &args.plan {
        Some(partial) => {
            let id = store
                .resolve_id(EntityPrefix::Plan, partial)
                .into_diagnostic()?;
            let plan = store.plan_for(&id).into_diagnostic()?;
            (
                plan.sampling_plan.clone(),
                Some(plan.product.clone()),
                plan.characteristic.clone(),
            )
        }
        None => {
            let level: InspectionLevel =
                args.level.parse().map_err(|e| miette::miette!("{}", e))?;
            let aql = args
                .aql
                .ok_or_else(|| miette::miette!("either --plan or --aql is required"))?;
            (SamplingPlan::aql(level, aql), None, "unspecified".to_string())
        }
    };

    let result = resolve_sample_size(&sampling_plan, args.lot_size).into_diagnostic()?;
    print_plan(&result);

    let mut decision = result.decide(args.defects);

    if decision == LotDecision::SecondSampleRequired {
        let double = Z14Tables
            .double_plan(result.code, sampling_plan.aql)
            .ok()
            .flatten();
        match (args.second_defects, double) {
            (Some(second), Some(double)) => {
                decision = double.combined(args.defects, second);
                println!(
                    "second sample of {} evaluated: cumulative {} against {}/{}",
                    double.n2,
                    args.defects + second,
                    double.ac2,
                    double.re2
                );
            }
            (None, Some(double)) => {
                println!(
                    "{} draw a second sample of {} and re-run with --second-defects",
                    style("inconclusive:").yellow().bold(),
                    style(double.n2).bold()
                );
                return Ok(());
            }
            (_, None) => {
                println!(
                    "{} no double sampling plan for this cell",
                    style("inconclusive:").yellow().bold()
                );
                return Ok(());
            }
        }
    }

    match decision {
        LotDecision::Accept => println!("{}", style("ACCEPT").green().bold()),
        LotDecision::Reject => println!("{}", style("REJECT").red().bold()),
        LotDecision::SecondSampleRequired => unreachable!("resolved above"),
    }

    // Feed the final outcome into the per-(product, characteristic)
    // switching regime when the plan tracks one.
    if sampling_plan.switching_rules.is_some() {
        if let Some(product) = &product {
            record_regime_outcome(&store, product, &characteristic, &sampling_plan, decision)?;
        }
    }

    if decision == LotDecision::Reject && !args.no_ncr {
        let config = Config::load();
        let lot_number = args.lot.clone().unwrap_or_else(|| "unknown".to_string());
        let engine = DispositionEngine::new(&ConsoleSink);
        let ncr = engine.open_from_signal(
            QualitySignal::LotRejected {
                product: product.unwrap_or_else(|| "unspecified".to_string()),
                characteristic,
                lot_number: lot_number.clone(),
                defects: args.defects + args.second_defects.unwrap_or(0),
                severity,
                affected_items: vec![AffectedItem::new(
                    "lot",
                    lot_number,
                    args.lot_size.min(u64::from(u32::MAX)) as u32,
                )],
                source: NcrSource::Inspection,
            },
            &config.author(),
        );
        store.save(&ncr).into_diagnostic()?;
        println!("{} Opened {}", style("✓").green(), style(&ncr.id).cyan());
    }

    Ok(())
}

fn record_regime_outcome(
    store: &FsStore,
    product: &str,
    characteristic: &str,
    sampling_plan: &SamplingPlan,
    decision: LotDecision,
) -> Result<()> {
    let outcome = match decision {
        LotDecision::Accept => LotOutcome::Accepted,
        LotDecision::Reject => LotOutcome::Rejected,
        LotDecision::SecondSampleRequired => return Ok(()),
    };

    let rules = sampling_plan.switching_rules.unwrap_or_default();
    let key = RegimeKey::new(product, characteristic);

    let (mut record, expected) = match store.load_regime(&key).into_diagnostic()? {
        Some(record) => {
            let version = record.version;
            (record, version)
        }
        None => (RegimeRecord::new(key), NEW_RECORD),
    };

    let shift = record.record_outcome(outcome, &rules);
    store.save_regime(&record, expected).into_diagnostic()?;

    if let Some(shift) = shift {
        println!(
            "{} inspection regime: {} → {}",
            style("!").yellow().bold(),
            shift.from,
            style(shift.to).bold()
        );
    }

    Ok(())
}
