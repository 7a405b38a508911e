use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use finquest::{Catalog, SimulationParameters, api, compute_simulation};

#[derive(Parser, Debug)]
#[command(
    name = "finquest",
    about = "Personal-finance simulations with XP, levels and badges"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, help = "Catalog JSON file; defaults to the built-in catalog")]
        catalog: Option<PathBuf>,
    },
    /// Run one simulation from a JSON parameters file and print the outcome.
    Simulate {
        file: PathBuf,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Print the built-in catalog as JSON.
    Catalog,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("finquest=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn load_catalog(path: Option<PathBuf>) -> Result<Catalog, finquest::CatalogError> {
    match path {
        Some(path) => Catalog::load(path),
        None => Ok(Catalog::standard()),
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::Serve { port, catalog } => {
            let catalog = load_catalog(catalog)?;
            api::run_http_server(port, catalog).await?;
        }
        Command::Simulate { file, catalog } => {
            let catalog = load_catalog(catalog)?;
            let parameters: SimulationParameters =
                serde_json::from_str(&fs::read_to_string(&file)?)?;
            let outcome = compute_simulation(&catalog, &parameters)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Catalog => {
            println!("{}", serde_json::to_string_pretty(&Catalog::standard())?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "finquest failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
