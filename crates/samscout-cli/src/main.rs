use anyhow::Result;
use clap::{Parser, Subcommand};
use samscout_leads::service_from_env;

#[derive(Debug, Parser)]
#[command(name = "samscout-cli")]
#[command(about = "SAM small-business lead scout command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the JSON API.
    Serve,
    /// List every stored lead.
    Pack,
    /// Probe one lead and print the summary.
    Probe {
        lead_id: String,
        #[arg(long)]
        verbose: bool,
    },
    /// Keyword-search the stored leads.
    Search { term: String },
    /// Pull registry notices across the fixed code set and import new leads.
    Reconcile,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("samscout v{}", env!("CARGO_PKG_VERSION"));
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => samscout_web::serve_from_env().await?,
        Commands::Pack => {
            let service = service_from_env().await?;
            let pack = service.pack_leads().await?;
            for lead in &pack.leads {
                println!(
                    "{}  {}  {}  {}",
                    lead.lead_id,
                    lead.company_name,
                    lead.naics_code,
                    lead.probe_status
                );
            }
            println!("{}", pack.script_output);
        }
        Commands::Probe { lead_id, verbose } => {
            let service = service_from_env().await?;
            let result = if verbose {
                service.probe_verbose(&lead_id).await?
            } else {
                service.probe(&lead_id).await?
            };
            println!("{}", result.result);
        }
        Commands::Search { term } => {
            let service = service_from_env().await?;
            let found = service.search_leads(&term).await?;
            for line in &found.results {
                println!("{line}");
            }
            println!("total: {}", found.total);
        }
        Commands::Reconcile => {
            let service = service_from_env().await?;
            let report = service.reconcile_from_registry().await?;
            println!(
                "reconcile complete: codes={} considered={} imported={}",
                report.naics_codes_searched.join(","),
                report.considered,
                report.imported
            );
        }
    }

    Ok(())
}
