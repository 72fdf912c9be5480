use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod contract;
mod db;
mod error;
mod indexer;
mod notify;

use config::Config;
use contract::Contract;
use db::{create_pool, queries};
use error::Result;
use indexer::backfill::LogSource;
use indexer::processor::{EventProcessor, IngestStats};
use notify::{Notifier, Telegram};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting eth-event-bot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Network: {}", config.network);
    tracing::info!("Database: {}", config.database_path);

    let contracts = load_contracts(&config)?;

    let pool = create_pool(&config.database_path)?;
    let conn = pool.get()?;

    let source = LogSource::connect(&config.rpc_http_url, config.rpc_chunk_size)?;
    let chain_head = source.chain_head().await?;
    tracing::info!("Chain head: {}", chain_head);

    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(telegram) = &config.telegram {
        notifiers.push(Box::new(Telegram::new(
            telegram.token.clone(),
            telegram.chat_id.clone(),
        )?));
    }
    tracing::info!("Notification channels: {}", notifiers.len());

    let processor = EventProcessor::new(&conn, config.network.clone(), notifiers);
    let mut totals = IngestStats::default();

    for contract in &contracts {
        let last_stored = if config.resume {
            let address = contract.address.to_checksum(None);
            queries::last_block(&conn, &config.network, &address)?
        } else {
            None
        };
        let from_block = config.start_block(last_stored);

        let logs = source
            .fetch_logs(contract.address, from_block, chain_head)
            .await?;
        tracing::info!(
            "{}: {} logs in blocks {}..={}",
            contract.name,
            logs.len(),
            from_block,
            chain_head
        );

        totals.merge(processor.process_batch(contract, &logs).await?);
    }

    let counts = queries::event_counts(&conn, &config.network)?;
    tracing::info!(
        logs = totals.logs,
        new_events = totals.stored,
        notified = totals.notified,
        notify_failures = totals.notify_failures,
        stored_events = counts.events,
        notification_records = counts.notifications,
        "Run complete"
    );

    Ok(())
}

fn load_contracts(config: &Config) -> Result<Vec<Contract>> {
    config
        .contracts
        .iter()
        .map(|cc| {
            let contract = Contract::from_file(&cc.interface_path, cc.address)?;
            tracing::info!("{} at {}", contract.name, contract.address);
            for event in contract.events() {
                tracing::info!("  {} {}", event.signature(), event.topic_hash);
            }
            Ok(contract)
        })
        .collect()
}
