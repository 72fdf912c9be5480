use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::Log;

use crate::error::{IndexerError, Result};

use super::value::DecodedValue;
use super::{Argument, EventSignature};

/// A log record as handed over by the chain collaborator.
#[derive(Debug, Clone, Default)]
pub struct RawLog {
    pub block_hash: B256,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub log_index: u64,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Pending logs lack the fields an event's identity is built from and are
/// refused rather than stored under zeroed keys.
impl TryFrom<&Log> for RawLog {
    type Error = IndexerError;

    fn try_from(log: &Log) -> Result<Self> {
        let missing = |field: &str| IndexerError::Decode(format!("log without {field}"));

        Ok(Self {
            block_hash: log.block_hash.ok_or_else(|| missing("block hash"))?,
            block_number: log.block_number.ok_or_else(|| missing("block number"))?,
            transaction_hash: log.transaction_hash.ok_or_else(|| missing("transaction hash"))?,
            transaction_index: log.transaction_index.unwrap_or(0),
            log_index: log.log_index.ok_or_else(|| missing("log index"))?,
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
    }
}

/// Decode the arguments of `log` in declaration order.
///
/// Non-indexed arguments are unpacked from `data` in one pass; indexed ones
/// are taken from `topics[1..]`. The two cursors advance independently while
/// walking the declared arguments, so mixed layouts keep their order.
pub fn decode(event: &EventSignature, log: &RawLog) -> Result<Vec<DecodedValue>> {
    let data_types: Vec<DynSolType> = event
        .arguments
        .iter()
        .filter(|arg| !arg.indexed)
        .map(|arg| arg.ty.clone())
        .collect();

    let mut unpacked = unpack_data(event, data_types, &log.data)?.into_iter();
    let mut topics = log.topics.iter().skip(1);

    let mut values = Vec::with_capacity(event.arguments.len());
    for arg in &event.arguments {
        if arg.indexed {
            let word = topics.next().ok_or_else(|| {
                IndexerError::Decode(format!(
                    "{}: no topic left for indexed argument {:?}",
                    event.name, arg.name
                ))
            })?;
            values.push(decode_topic(arg, *word));
        } else {
            let value = unpacked.next().ok_or_else(|| {
                IndexerError::Decode(format!(
                    "{}: no data value for argument {:?}",
                    event.name, arg.name
                ))
            })?;
            values.push(DecodedValue::from(value));
        }
    }

    Ok(values)
}

fn unpack_data(
    event: &EventSignature,
    types: Vec<DynSolType>,
    data: &[u8],
) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }

    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .map_err(|e| {
            IndexerError::Decode(format!(
                "{}: cannot unpack {} bytes of log data: {e}",
                event.name,
                data.len()
            ))
        })?;

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Err(IndexerError::Decode(format!(
            "{}: expected tuple from log data, got {other:?}",
            event.name
        ))),
    }
}

// Only addresses have a fixed-width mapping; everything else stays a raw word.
fn decode_topic(arg: &Argument, word: B256) -> DecodedValue {
    match arg.ty {
        DynSolType::Address => DecodedValue::Address(Address::from_word(word)),
        _ => DecodedValue::Word(word),
    }
}
