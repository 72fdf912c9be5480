use rusqlite::Connection;

use crate::contract::decoder::{decode, RawLog};
use crate::contract::value::format_value;
use crate::contract::{Contract, EventSignature};
use crate::db::models::{DecodedEvent, NotificationRecord};
use crate::db::queries::{get_event, insert_event, notification_exists, record_notification};
use crate::error::Result;
use crate::notify::Notifier;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub logs: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub unknown: u64,
    pub undecodable: u64,
    pub notified: u64,
    pub notify_failures: u64,
}

impl IngestStats {
    pub fn merge(&mut self, other: IngestStats) {
        self.logs += other.logs;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.unknown += other.unknown;
        self.undecodable += other.undecodable;
        self.notified += other.notified;
        self.notify_failures += other.notify_failures;
    }
}

/// Decodes, stores and dispatches one contract's logs over a single
/// connection.
pub struct EventProcessor<'a> {
    conn: &'a Connection,
    network: String,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl<'a> EventProcessor<'a> {
    pub fn new(
        conn: &'a Connection,
        network: String,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            conn,
            network,
            notifiers,
        }
    }

    /// Process logs in the order given. Store failures abort the batch;
    /// undecodable logs and failed deliveries are reported and skipped.
    pub async fn process_batch(
        &self,
        contract: &Contract,
        logs: &[RawLog],
    ) -> Result<IngestStats> {
        let mut stats = IngestStats::default();

        for log in logs {
            stats.logs += 1;
            self.process(contract, log, &mut stats).await?;
        }

        tracing::info!(
            contract = %contract.name,
            logs = stats.logs,
            stored = stats.stored,
            duplicates = stats.duplicates,
            unknown = stats.unknown,
            undecodable = stats.undecodable,
            notified = stats.notified,
            notify_failures = stats.notify_failures,
            "Processed batch"
        );

        Ok(stats)
    }

    async fn process(
        &self,
        contract: &Contract,
        log: &RawLog,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let Some(signature) = log.topics.first().and_then(|t| contract.find_event(t)) else {
            tracing::debug!(
                block = log.block_number,
                log_index = log.log_index,
                "Skipping log with unknown topic"
            );
            stats.unknown += 1;
            return Ok(());
        };

        let event = match self.to_event(contract, signature, log) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    block = log.block_number,
                    log_index = log.log_index,
                    tx = %log.transaction_hash,
                    "Failed to decode {}: {e}",
                    signature.name
                );
                stats.undecodable += 1;
                return Ok(());
            }
        };

        if insert_event(self.conn, &event)? {
            tracing::debug!(
                block = log.block_number,
                log_index = log.log_index,
                "Stored {}",
                event.event_name
            );
            stats.stored += 1;
            return self.dispatch(&event, stats).await;
        }

        // Duplicates are dispatched too, so a delivery missing from an earlier run goes
        // out now. The stored row is what gets announced.
        stats.duplicates += 1;
        let stored = get_event(
            self.conn,
            &event.network,
            &event.transaction_hash,
            event.log_index,
        )?;
        self.dispatch(stored.as_ref().unwrap_or(&event), stats).await
    }

    fn to_event(
        &self,
        contract: &Contract,
        signature: &EventSignature,
        log: &RawLog,
    ) -> Result<DecodedEvent> {
        let values = decode(signature, log)?;

        Ok(DecodedEvent {
            network: self.network.clone(),
            contract_name: contract.name.clone(),
            address: contract.address.to_checksum(None),
            block_hash: format!("{:#x}", log.block_hash),
            block_number: log.block_number as i64,
            transaction_hash: format!("{:#x}", log.transaction_hash),
            transaction_index: log.transaction_index as i64,
            log_index: log.log_index as i64,
            event_name: signature.name.clone(),
            arguments: values.iter().map(format_value).collect(),
        })
    }

    async fn dispatch(&self, event: &DecodedEvent, stats: &mut IngestStats) -> Result<()> {
        for notifier in &self.notifiers {
            let record = NotificationRecord::for_event(event, notifier.platform_name());
            if notification_exists(self.conn, &record)? {
                continue;
            }

            match notifier.send(event).await {
                Ok(()) => {
                    record_notification(self.conn, &record)?;
                    stats.notified += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        platform = %record.platform,
                        tx = %event.transaction_hash,
                        log_index = event.log_index,
                        "Notification failed, will retry on next run: {e}"
                    );
                    stats.notify_failures += 1;
                }
            }
        }
        Ok(())
    }
}
