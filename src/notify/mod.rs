//! Notification channels.
//!
//! A channel only knows how to deliver one stored event. Whether an event
//! still needs delivering is decided by the ingestion loop from the
//! `notifications` table.

use async_trait::async_trait;
use thiserror::Error;

use crate::db::models::DecodedEvent;

pub mod telegram;

pub use telegram::Telegram;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rejected with status {status}: {description}")]
    Rejected { status: u16, description: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable key recorded with each successful delivery.
    fn platform_name(&self) -> &str;

    async fn send(&self, event: &DecodedEvent) -> Result<(), NotifyError>;
}

/// One-line summary: `[network] Contract Event(arg0,arg1,...)`.
pub fn summary_line(event: &DecodedEvent) -> String {
    format!(
        "[{}] {} {}({})",
        event.network,
        event.contract_name,
        event.event_name,
        event.arguments.join(",")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_lists_arguments_in_order() {
        let event = DecodedEvent {
            network: "ropsten".into(),
            contract_name: "Auction".into(),
            address: "0x00".into(),
            block_hash: "0x01".into(),
            block_number: 1,
            transaction_hash: "0x02".into(),
            transaction_index: 0,
            log_index: 0,
            event_name: "Bid".into(),
            arguments: vec!["0xAbC".into(), "100".into()],
        };
        assert_eq!(summary_line(&event), "[ropsten] Auction Bid(0xAbC,100)");

        let empty = DecodedEvent {
            arguments: Vec::new(),
            ..event
        };
        assert_eq!(summary_line(&empty), "[ropsten] Auction Bid()");
    }
}
