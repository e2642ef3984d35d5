use catalog::cli::{Cli, Commands};
use catalog::core::Config;
use clap::Parser;
use miette::Result;

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
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
    catalog::cli::logging::init(&global, &Config::load());

    match cli.command {
        Commands::Init(args) => catalog::cli::commands::init::run(args, &global),
        Commands::Product(cmd) => catalog::cli::commands::product::run(cmd, &global),
        Commands::Import(cmd) => catalog::cli::commands::import::run(cmd, &global),
        Commands::Missing(cmd) => catalog::cli::commands::missing::run(cmd, &global),
        Commands::Hierarchy(cmd) => catalog::cli::commands::hierarchy::run(cmd, &global),
        Commands::Alias(cmd) => catalog::cli::commands::alias::run(cmd, &global),
        Commands::Link(cmd) => catalog::cli::commands::link::run(cmd, &global),
        Commands::Rename(args) => catalog::cli::commands::identity::run_rename(args, &global),
        Commands::Merge(args) => catalog::cli::commands::identity::run_merge(args, &global),
        Commands::Completions(args) => catalog::cli::commands::completions::run(args),
    }
}
