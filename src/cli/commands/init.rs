//! `mqt init` command - create a new project

use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::core::project::Project;

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    pub path: Option<PathBuf>,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = args.path.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&path).map_err(|e| miette::miette!("{}", e))?;

    let project = Project::init(&path).map_err(|e| miette::miette!("{}", e))?;

    println!(
        "{} Initialized MQT project at {}",
        style("✓").green(),
        style(project.root().display()).cyan()
    );
    println!("   quality/plans     inspection plans");
    println!("   quality/charts    control charts");
    println!("   quality/regimes   switching-rule state");
    println!("   quality/ncrs      non-conformance reports");

    Ok(())
}
