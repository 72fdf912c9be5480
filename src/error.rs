use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    #[error("config error: {0}")]
    Config(String),

    #[error("interface description error: {0}")]
    Abi(String),

    #[error("event decode error: {0}")]
    Decode(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("notifier setup error: {0}")]
    Notify(#[from] crate::notify::NotifyError),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
