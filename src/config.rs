use alloy::primitives::Address;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{IndexerError, Result};

pub struct ContractConfig {
    pub address: Address,
    pub interface_path: PathBuf,
}

pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
}

pub struct Config {
    pub network: String,
    pub rpc_http_url: String,
    pub database_path: String,
    pub contracts: Vec<ContractConfig>,
    pub from_block: u64,
    pub rpc_chunk_size: Option<u64>,
    pub resume: bool,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = var("NETWORK")
            .ok_or_else(|| IndexerError::Config("NETWORK is required".into()))?;

        let rpc_http_url = match var("RPC_HTTP_URL") {
            Some(url) => url,
            None => {
                let api_key = var("INFURA_API_KEY").ok_or_else(|| {
                    IndexerError::Config("RPC_HTTP_URL or INFURA_API_KEY is required".into())
                })?;
                infura_endpoint(&network, &api_key)
            }
        };

        let database_path = var("DATABASE_PATH").unwrap_or_else(|| "./data/events.db".into());

        let contracts = parse_contracts(
            &var("CONTRACTS")
                .ok_or_else(|| IndexerError::Config("CONTRACTS is required".into()))?,
        )?;

        let from_block = var("FROM_BLOCK")
            .unwrap_or_else(|| "0".into())
            .parse::<u64>()
            .map_err(|e| IndexerError::Config(format!("Invalid FROM_BLOCK: {e}")))?;

        let rpc_chunk_size = var("RPC_CHUNK_SIZE")
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| IndexerError::Config(format!("Invalid RPC_CHUNK_SIZE: {e}")))?;

        let resume = var("RESUME")
            .unwrap_or_else(|| "false".into())
            .parse::<bool>()
            .map_err(|e| IndexerError::Config(format!("Invalid RESUME: {e}")))?;

        let telegram = match (var("TELEGRAM_BOT_TOKEN"), var("TELEGRAM_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig { token, chat_id }),
            (None, None) => None,
            _ => {
                return Err(IndexerError::Config(
                    "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".into(),
                ))
            }
        };

        Ok(Self {
            network,
            rpc_http_url,
            database_path,
            contracts,
            from_block,
            rpc_chunk_size,
            resume,
            telegram,
        })
    }

    /// First block to query for a contract whose highest stored block is
    /// `last_stored`. Resuming re-reads that block; ingestion is idempotent.
    pub fn start_block(&self, last_stored: Option<i64>) -> u64 {
        match last_stored.and_then(|last| u64::try_from(last).ok()) {
            Some(last) if self.resume => last.max(self.from_block),
            _ => self.from_block,
        }
    }
}

fn infura_endpoint(network: &str, api_key: &str) -> String {
    format!("https://{network}.infura.io/v3/{api_key}")
}

/// `ADDRESS=PATH[,ADDRESS=PATH...]`
fn parse_contracts(raw: &str) -> Result<Vec<ContractConfig>> {
    let contracts = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (address, path) = entry.split_once('=').ok_or_else(|| {
                IndexerError::Config(format!(
                    "Invalid CONTRACTS entry {entry:?}: expected ADDRESS=PATH"
                ))
            })?;
            let address = Address::from_str(address.trim()).map_err(|e| {
                IndexerError::Config(format!("Invalid contract address {address:?}: {e}"))
            })?;
            Ok(ContractConfig {
                address,
                interface_path: PathBuf::from(path.trim()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if contracts.is_empty() {
        return Err(IndexerError::Config("CONTRACTS lists no contracts".into()));
    }
    Ok(contracts)
}
