use clap::Parser;
use miette::Result;
use mqt::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    // Install miette's fancy error handler for readable diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Init(args) => mqt::cli::commands::init::run(args),
        Commands::Plan(cmd) => mqt::cli::commands::plan::run(cmd, &global),
        Commands::Sample(cmd) => mqt::cli::commands::sample::run(cmd, &global),
        Commands::Chart(cmd) => mqt::cli::commands::chart::run(cmd, &global),
        Commands::Ncr(cmd) => mqt::cli::commands::ncr::run(cmd, &global),
        Commands::Completions(args) => mqt::cli::commands::completions::run(args),
    }
}
