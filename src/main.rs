// src/main.rs

use std::sync::Arc;

use slidewatch::errors::SlideWatchError;
use slidewatch::fs::RealFileSystem;
use slidewatch::{cli, logging, Supervisor};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("slidewatch error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();

    let supervisor = match Supervisor::prepare(&args, Arc::new(RealFileSystem)) {
        Ok(s) => s,
        Err(err @ SlideWatchError::InputDirMissing(_)) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
        Err(err) => return Err(err.into()),
    };

    if args.dry_run {
        supervisor.print_dry_run();
        return Ok(());
    }

    logging::init_logging(args.log_level, supervisor.output_dir())?;
    supervisor.run().await?;
    Ok(())
}
