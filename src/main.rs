use clap::Parser;
use rift_processor::{
    api::RiotApiClient,
    args::Args,
    database::db::DbClient,
    gateway::{Gateway, GatewayConfig},
    messaging::{RabbitMqConfig, RabbitMqPublisher},
    worker::JobWorker
};
use tracing::{error, info, warn};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let db = match DbClient::connect(&args.connection_string).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {e}");
            error!("Application cannot start without a valid database connection");
            std::process::exit(1);
        }
    };

    let gateway = Gateway::spawn(GatewayConfig::default());
    let api = match RiotApiClient::new(&args.api_key, gateway) {
        Ok(api) => api,
        Err(e) => {
            error!("Failed to build the upstream client: {e}");
            std::process::exit(1);
        }
    };

    let publisher = if args.enable_messaging {
        match RabbitMqConfig::from_env() {
            Ok(config) => match RabbitMqPublisher::connect_from_config(&config).await {
                Ok(publisher) => Some(publisher),
                Err(e) => {
                    warn!("Messaging enabled but RabbitMQ is unreachable, continuing without: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("Messaging enabled but configuration is incomplete, continuing without: {e}");
                None
            }
        }
    } else {
        None
    };

    info!(platform = %args.platform, "starting job worker");
    JobWorker::new(api, db, publisher).run().await;
}

fn init_tracing(level: &str) {
    let indicatif_layer = IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .init();
}
