use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use csw_catalog::CatalogClient;
use csw_discovery::bands::FileBandCatalog;
use csw_discovery::config::ServiceConfig;
use csw_discovery::logger::init_logger;
use csw_discovery::service::DataService;
use csw_discovery::state::FileMutationStore;
use csw_discovery::{run, Cli};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    let config = ServiceConfig::load(args.config.as_deref())?;
    init_logger(args.verbose, config.log_dir.as_deref())?;
    debug!(server = %config.server, state_file = %config.state_file.display(), "starting");

    let mutations = FileMutationStore::new(&config.state_file);
    let bands = FileBandCatalog::new(config.bands_file.clone());
    let client = CatalogClient::new(config.client_config()?, mutations.clone(), bands)
        .context("failed to create catalog client")?;

    let user_id = args.user_id.unwrap_or(config.user_id);
    let service = DataService::new(client, mutations).with_user_id(user_id);

    let envelope = run(&service, args.command).await;
    let output = if args.pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    }
    .context("failed to serialize response")?;
    println!("{output}");

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
