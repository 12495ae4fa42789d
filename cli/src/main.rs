use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::args::{Cli, Commands};
use cli::commands::{disassemble, run};

fn main() {
    // Program output owns stdout; diagnostics go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vm=info,cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            path,
            args,
            config,
            stack_capacity,
            module_dir,
            no_extensions,
        } => {
            let opts = run::RunOptions {
                config,
                stack_capacity,
                module_dir,
                no_extensions,
            };
            run::run_file(&path, &args, &opts)
        }
        Commands::Disassemble { path } => disassemble::disassemble_file(&path).map(|()| 0),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
