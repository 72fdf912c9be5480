use std::num::NonZeroU32;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::http::{Client, Http};
use governor::{DefaultDirectRateLimiter, Jitter, Quota, RateLimiter};

use crate::contract::decoder::RawLog;
use crate::error::{IndexerError, Result};

const REQUESTS_PER_SECOND: u32 = 5;
const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// `eth_getLogs` access for one chain endpoint.
pub struct LogSource {
    provider: RootProvider<Http<Client>>,
    limiter: DefaultDirectRateLimiter,
    chunk_size: Option<u64>,
}

impl LogSource {
    pub fn connect(rpc_url: &str, chunk_size: Option<u64>) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| IndexerError::Config(format!("Invalid RPC URL: {e}")))?,
        );

        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            provider,
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            chunk_size,
        })
    }

    pub async fn chain_head(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    /// All logs emitted by `address` in `from_block..=to_block`, in the order
    /// the endpoint returns them.
    pub async fn fetch_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>> {
        let mut out = Vec::new();

        for (start, end) in block_ranges(from_block, to_block, self.chunk_size) {
            self.limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;

            let filter = Filter::new()
                .address(address)
                .from_block(start)
                .to_block(end);

            let logs = self.get_logs_with_retry(&filter).await?;
            tracing::debug!("Fetched {} logs for blocks {}..={}", logs.len(), start, end);
            for log in &logs {
                match RawLog::try_from(log) {
                    Ok(raw) => out.push(raw),
                    Err(e) => tracing::warn!("Skipping log in blocks {}..={}: {e}", start, end),
                }
            }
        }

        Ok(out)
    }

    async fn get_logs_with_retry(&self, filter: &Filter) -> Result<Vec<Log>> {
        let mut attempt = 0;
        loop {
            match self.provider.get_logs(filter).await {
                Ok(logs) => return Ok(logs),
                Err(e) => {
                    if is_rate_limited(&e.to_string()) && attempt < MAX_RETRIES {
                        attempt += 1;
                        let backoff =
                            Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1));
                        tracing::warn!(
                            "Rate limited, retrying in {:?} (attempt {}/{})",
                            backoff,
                            attempt,
                            MAX_RETRIES
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        return Err(e.into());
                    }
                }
            }
        }
    }
}

fn is_rate_limited(message: &str) -> bool {
    message.contains("429") || message.contains("exceeded") || message.contains("rate")
}

/// Split an inclusive block range into request-sized pieces. Without a chunk
/// size the whole range goes out as one request.
fn block_ranges(from_block: u64, to_block: u64, chunk_size: Option<u64>) -> Vec<(u64, u64)> {
    if from_block > to_block {
        return Vec::new();
    }

    match chunk_size.filter(|&size| size > 0) {
        None => vec![(from_block, to_block)],
        Some(size) => {
            let mut ranges = Vec::new();
            let mut start = from_block;
            loop {
                let end = start.saturating_add(size - 1).min(to_block);
                ranges.push((start, end));
                if end == to_block {
                    break;
                }
                start = end + 1;
            }
            ranges
        }
    }
}
