use clap::Parser;
use restore_cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {e}");
    }

    let result = match &cli.command {
        Commands::Build { dir, format } => commands::build::handle(dir, *format),
        Commands::Solve {
            dir,
            out,
            tolerance,
            zero,
        } => commands::solve::handle(dir, out.as_deref(), *tolerance, *zero),
        Commands::Cluster {
            profile,
            days,
            hour_slice,
            seed,
            total,
            out,
        } => commands::cluster::handle(profile, *days, *hour_slice, *seed, *total, out.as_deref()),
    };

    if let Err(e) = result {
        error!("{e:#}");
        std::process::exit(1);
    }
}
