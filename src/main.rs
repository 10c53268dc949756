use autofill_engine::cli::commands::{PageSource, cmd_collect};
use autofill_engine::cli::config::{Cli, Commands, load_config};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Collect {
            url,
            file,
            format,
            output,
            trace,
            field_limit,
        } => {
            let source = PageSource::from_args(url.as_deref(), file.as_deref())
                .ok_or("either --url or --file is required")?;
            cmd_collect(
                &source,
                &format,
                output.as_deref(),
                trace.as_deref(),
                field_limit,
                &config,
            )?;
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v` raises the level from warn.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
