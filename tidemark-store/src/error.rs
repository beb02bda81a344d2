use thiserror::Error;

/// All errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("data layer: {0}")]
    Data(#[from] tidemark_data::DataError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv encoding: {0}")]
    Csv(#[from] csv::Error),

    #[error("clickhouse transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("clickhouse responded {status}: {body}")]
    ClickHouse {
        status: reqwest::StatusCode,
        body: String,
    },
}
