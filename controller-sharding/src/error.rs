use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to determine hostname: {0}")]
    HostnameUnavailable(String),

    #[error("hostname should end with a shard number separated by '-' but got: {0}")]
    MissingOrdinal(String),

    #[error("hostname {hostname} ends with a non-numeric shard ordinal: {ordinal:?}")]
    InvalidOrdinal { hostname: String, ordinal: String },

    #[error("unknown sharding algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid shard mapping: {0}")]
    ShardMapping(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] envconfig::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
