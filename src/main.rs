use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use maestro::cli::{Cli, Commands};
use maestro::config;
use maestro::request::RunRequest;
use maestro::runner::Runner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the result envelope.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { request, .. } => {
            let config = config::load_config(&cli)?;
            tracing::info!(
                model = %config.model,
                router = %config.router_url,
                log_dir = %config.log_dir.display(),
                "Config loaded"
            );

            let request_json = tokio::fs::read_to_string(request)
                .await
                .with_context(|| format!("Failed to read request {}", request.display()))?;

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling run");
                    on_signal.cancel();
                }
            });

            let runner = Runner::from_config(config);
            let result = runner.execute(&request_json, &cancel).await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.is_success {
                std::process::exit(1);
            }
        }
        Commands::Catalog { request } => {
            let request_json = tokio::fs::read_to_string(request)
                .await
                .with_context(|| format!("Failed to read request {}", request.display()))?;
            let catalog = RunRequest::from_json(&request_json)?.catalog()?;
            let (flows, workers) = catalog.partition();

            println!("Flows ({}):", flows.len());
            for flow in &flows {
                let members = flow.member_ids().unwrap_or_default().join(" -> ");
                println!("  {} [{}]: {}", flow.display_name, flow.id, members);
            }
            println!("Agents ({}):", workers.len());
            for worker in &workers {
                println!("  {} [{}]: {}", worker.display_name, worker.id, worker.description);
            }
        }
    }

    Ok(())
}
