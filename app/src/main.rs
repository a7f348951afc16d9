mod config;
mod inbound;
mod nats_client;
mod outbound;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use async_nats::jetstream;
use config::app_config::AppConfig;
use futures::StreamExt;
use inbound::nats::{self as requests, NatsRequestListener};
use internal::service::control_service::ControlService;
use log::{error, info, warn};
use nats_client::NatsClient;
use outbound::{nats_channel::NatsChannel, postgres::AuditRepository};
use sqlx::postgres::PgPoolOptions;
use utils::pem::PemUtils;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    if let Err(e) = PemUtils::init_provider() {
        warn!("{e}");
    }
    let conf = AppConfig::load("config.toml")?;
    let nats = NatsClient {
        client_config: conf.nats.client,
    };
    let client = nats.connect().await?;
    let context = jetstream::new(client.clone());
    let channel = Arc::new(NatsChannel::open(&context, &conf.nats.channel).await?);

    let pool = PgPoolOptions::new().connect_with(conf.postgres.options()).await?;
    let audit = Arc::new(AuditRepository::new(pool, conf.postgres.audit_table.clone()));
    audit.ensure_schema().await?;

    let service = Arc::new(ControlService::new(
        channel,
        audit,
        conf.control.settings(),
        conf.control.fleet.clone(),
    ));
    let mut subscriber = NatsRequestListener::new(conf.nats.inbound).subscribe(&client).await?;

    while let Some(message) = subscriber.next().await {
        let client = client.clone();
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = requests::handle(&client, service.as_ref(), message).await {
                error!("{e}");
            }
        });
    }
    info!("Request subscription closed, shutting down");
    Ok(())
}
