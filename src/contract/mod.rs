//! Contract registry: one interface description mapped to an indexed set of
//! event signatures.
//!
//! Interface descriptions are Truffle build artifacts
//! (`{"contractName": ..., "abi": [...]}`) or a bare ABI array. Every event
//! is resolved eagerly so a broken description fails at startup instead of
//! silently matching nothing.

use std::collections::HashMap;
use std::path::Path;

use alloy::dyn_abi::{DynSolType, Specifier};
use alloy::json_abi::{Event, JsonAbi};
use alloy::primitives::{Address, B256};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{IndexerError, Result};

pub mod decoder;
pub mod value;

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub ty: DynSolType,
    pub indexed: bool,
}

#[derive(Debug, Clone)]
pub struct EventSignature {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub topic_hash: B256,
    signature: String,
}

impl EventSignature {
    fn from_abi(event: &Event) -> Result<Self> {
        let arguments = event
            .inputs
            .iter()
            .map(|param| {
                let ty = param.resolve().map_err(|e| {
                    IndexerError::Abi(format!(
                        "event {} argument {:?} has unusable type {}: {e}",
                        event.name, param.name, param.ty
                    ))
                })?;
                Ok(Argument {
                    name: param.name.clone(),
                    ty,
                    indexed: param.indexed,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: event.name.clone(),
            arguments,
            topic_hash: event.selector(),
            signature: event.signature(),
        })
    }

    /// Canonical `Name(type,...)` form the topic hash is computed from.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Deserialize)]
struct BuildArtifact {
    #[serde(rename = "contractName")]
    contract_name: String,
    #[serde(alias = "ABI")]
    abi: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct Contract {
    pub name: String,
    pub address: Address,
    events: Vec<EventSignature>,
    by_topic: HashMap<B256, usize>,
}

impl Contract {
    /// Load an interface description from disk. A bare ABI array takes its
    /// contract name from the file stem.
    pub fn from_file(path: &Path, address: Address) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            IndexerError::Abi(format!("cannot read {}: {e}", path.display()))
        })?;
        let name_hint = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("contract");

        Self::parse(&raw, name_hint, address)
    }

    pub fn parse(raw: &str, name_hint: &str, address: Address) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| IndexerError::Abi(format!("{name_hint}: invalid JSON: {e}")))?;

        let (name, items) = match value {
            Value::Array(items) => (name_hint.to_string(), items),
            other => {
                let artifact: BuildArtifact = serde_json::from_value(other).map_err(|e| {
                    IndexerError::Abi(format!("{name_hint}: invalid build artifact: {e}"))
                })?;
                (artifact.contract_name, artifact.abi)
            }
        };

        let abi: JsonAbi = serde_json::from_value(Value::Array(items.clone()))
            .map_err(|e| IndexerError::Abi(format!("{name}: invalid ABI: {e}")))?;

        Self::from_abi(name, address, &abi, &items)
    }

    // `JsonAbi` groups events by name; the raw items give back declaration order.
    fn from_abi(name: String, address: Address, abi: &JsonAbi, items: &[Value]) -> Result<Self> {
        let mut events = Vec::new();
        let mut by_topic = HashMap::new();
        let mut seen_per_name: HashMap<&str, usize> = HashMap::new();

        let declared = items
            .iter()
            .filter(|item| item.get("type").and_then(Value::as_str) == Some("event"))
            .filter_map(|item| item.get("name").and_then(Value::as_str));

        for event_name in declared {
            let nth = seen_per_name.entry(event_name).or_insert(0);
            let Some(event) = abi.event(event_name).and_then(|overloads| overloads.get(*nth))
            else {
                continue;
            };
            *nth += 1;

            if event.anonymous {
                tracing::warn!(
                    contract = %name,
                    "Skipping anonymous event {}: it has no topic hash",
                    event.name
                );
                continue;
            }

            let signature = EventSignature::from_abi(event)?;
            if by_topic.contains_key(&signature.topic_hash) {
                continue;
            }
            by_topic.insert(signature.topic_hash, events.len());
            events.push(signature);
        }

        Ok(Self {
            name,
            address,
            events,
            by_topic,
        })
    }

    pub fn find_event(&self, topic_hash: &B256) -> Option<&EventSignature> {
        self.by_topic.get(topic_hash).map(|&i| &self.events[i])
    }

    pub fn events(&self) -> &[EventSignature] {
        &self.events
    }
}
