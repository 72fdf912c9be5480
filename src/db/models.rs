/// Upper bound on stored arguments; the `events` table has slots `arg0..arg9`.
pub const MAX_ARGS: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub network: String,
    pub contract_name: String,
    pub address: String,
    pub block_hash: String,
    pub block_number: i64,
    pub transaction_hash: String,
    pub transaction_index: i64,
    pub log_index: i64,
    pub event_name: String,
    pub arguments: Vec<String>,
}

/// Marks an event as delivered to one platform.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecord {
    pub network: String,
    pub transaction_hash: String,
    pub log_index: i64,
    pub platform: String,
}

impl NotificationRecord {
    pub fn for_event(event: &DecodedEvent, platform: &str) -> Self {
        Self {
            network: event.network.clone(),
            transaction_hash: event.transaction_hash.clone(),
            log_index: event.log_index,
            platform: platform.to_string(),
        }
    }
}

pub struct EventCounts {
    pub events: i64,
    pub notifications: i64,
}
