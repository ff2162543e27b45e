use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("store error: {0}")]
    Corpus(#[from] refrain_corpus::Error),

    #[error("window index error: {0}")]
    Index(#[from] refrain_window_index::Error),

    #[error("database error: {0}")]
    Db(#[from] refrain_db_core::Error),

    #[error("window size must be at least 1")]
    InvalidWindowSize,
}
