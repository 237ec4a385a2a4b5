//! Earth-observation data discovery over a CSW catalog, answered with
//! JSON envelopes.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use csw_catalog::DiscoveryApi;

pub mod bands;
pub mod config;
pub mod envelope;
pub mod logger;
pub mod service;
pub mod state;

use envelope::Envelope;
use service::{DataService, RecordsArgs};

const SHORT_HELP: &str = "Discover Earth-observation products and granules in a CSW catalog.";
const LONG_HELP: &str = "Discover Earth-observation products and granules in a CSW catalog.

Every command prints a JSON envelope with a status, a code and either the
requested data or an error message. The catalog endpoint is read from the
configuration file or the CSW_SERVER environment variable.";

#[derive(Debug, Parser)]
#[command(about = SHORT_HELP, long_about = LONG_HELP)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// The configuration file to read instead of ./csw-discovery.toml
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (may be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// The user on whose behalf the request is made
    #[arg(long, value_name = "ID")]
    pub user_id: Option<String>,

    /// Pretty print the envelope
    #[arg(long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "List all products of the catalog.")]
    Products,
    #[command(about = "Describe a single product including its bands.")]
    Product {
        /// The product identifier
        name: String,
    },
    #[command(about = "List the granules of a product.")]
    Records(RecordsCommand),
    #[command(about = "Show the catalog request a listing would send.")]
    Query(RecordsCommand),
    #[command(subcommand, about = "Inspect or change the archive mutation state.")]
    State(StateCommand),
}

#[derive(Debug, Args)]
pub struct RecordsCommand {
    /// The product identifier
    pub name: String,

    /// The detail level: full, short or file_path
    #[arg(short, long)]
    pub detail: Option<String>,

    /// Spatial extent as west,south,east,north[,crs] or a JSON object
    #[arg(short, long = "bbox", value_name = "EXTENT")]
    pub spatial_extent: Option<String>,

    /// Temporal extent as <start>/<end>, either side may be empty
    #[arg(short, long = "temporal", value_name = "EXTENT")]
    pub temporal_extent: Option<String>,

    /// The snapshot cutoff as a date or a timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    pub timestamp: Option<String>,
}

impl From<RecordsCommand> for RecordsArgs {
    fn from(command: RecordsCommand) -> Self {
        RecordsArgs {
            product: command.name,
            detail: command.detail,
            spatial_extent: command.spatial_extent,
            temporal_extent: command.temporal_extent,
            timestamp: command.timestamp,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    #[command(about = "Show the current mutation state.")]
    Show,
    #[command(about = "Set whether data has been deleted from the archive.")]
    SetDeleted {
        #[arg(action = clap::ArgAction::Set)]
        deleted: bool,
    },
    #[command(about = "Stamp the archive as updated now, or clear the stamp.")]
    SetUpdated {
        #[arg(action = clap::ArgAction::Set)]
        updated: bool,
    },
}

/// Run a single command against the service.
pub async fn run<C: DiscoveryApi>(service: &DataService<C>, command: Command) -> Envelope {
    match command {
        Command::Products => service.products().await,
        Command::Product { name } => service.product(&name).await,
        Command::Records(args) => service.records(&args.into()).await,
        Command::Query(args) => service.query(&args.into()).await,
        Command::State(StateCommand::Show) => service.mutation_state().await,
        Command::State(StateCommand::SetDeleted { deleted }) => {
            service.set_deleted(deleted).await
        },
        Command::State(StateCommand::SetUpdated { updated }) => {
            service.set_updated(updated).await
        },
    }
}

#[cfg(test)]
mod tests {
    use csw_catalog::{CatalogClient, CatalogClientConfig, InMemoryMutationStore};
    use httpmock::prelude::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::bands::FileBandCatalog;

    #[test]
    fn parses_records_command() {
        let cli = Cli::try_parse_from([
            "csw-discovery",
            "-vv",
            "records",
            "s2a_prd_msil1c",
            "--detail",
            "short",
            "--bbox",
            "9.5,46.3,17.2,49.0",
            "--temporal",
            "2023-01-01/",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Records(args) = cli.command else {
            panic!("expected records command");
        };
        assert_eq!(RecordsArgs::from(args), RecordsArgs {
            product: "s2a_prd_msil1c".to_string(),
            detail: Some("short".to_string()),
            spatial_extent: Some("9.5,46.3,17.2,49.0".to_string()),
            temporal_extent: Some("2023-01-01/".to_string()),
            timestamp: None,
        });
    }

    #[test]
    fn parses_state_commands() {
        let cli = Cli::try_parse_from(["csw-discovery", "state", "set-deleted", "true"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::State(StateCommand::SetDeleted { deleted: true })
        ));
        assert!(Cli::try_parse_from(["csw-discovery", "state", "set-updated", "maybe"]).is_err());
    }

    #[tokio::test]
    async fn lists_products_from_catalog() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/csw");
            then.status(200).body(indoc! {r#"
            {"csw:GetRecordsResponse": {"csw:SearchResults": {
                "@nextRecord": "0",
                "csw:Record": {
                    "dc:identifier": "s2a_prd_msil1c",
                    "dct:abstract": "Sentinel-2 Level-1C",
                    "dc:creator": "ESA",
                    "dc:date": "2015-06-23",
                    "ows:BoundingBox": {
                        "ows:LowerCorner": "-180.0 -90.0",
                        "ows:UpperCorner": "180.0 90.0"
                    }
                }
            }}}
            "#});
        });

        let client = CatalogClient::new(
            CatalogClientConfig::new(server.url("/csw")),
            InMemoryMutationStore::default(),
            FileBandCatalog::default(),
        )
        .unwrap();
        let service = DataService::new(client, InMemoryMutationStore::default());

        let envelope = run(&service, Command::Products).await;

        mock.assert();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "status": "success",
                "code": 200,
                "data": [{
                    "data_id": "s2a_prd_msil1c",
                    "description": "Sentinel-2 Level-1C",
                    "source": "ESA"
                }]
            })
        );
    }

    #[tokio::test]
    async fn catalog_errors_become_error_envelopes() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/csw");
            then.status(200)
                .body(r#"<?xml version="1.0"?><ows:ExceptionReport/>"#);
        });

        let client = CatalogClient::new(
            CatalogClientConfig::new(server.url("/csw")),
            InMemoryMutationStore::default(),
            FileBandCatalog::default(),
        )
        .unwrap();
        let service = DataService::new(client, InMemoryMutationStore::default());

        let envelope = run(&service, Command::Product {
            name: "s2a_prd_msil1c".to_string(),
        })
        .await;

        assert_eq!(envelope.code(), 500);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["internal"], true);
        assert_eq!(value["service"], "data");
    }
}
