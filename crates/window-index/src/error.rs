use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] libsql::Error),

    #[error("refusing to swap in an empty window stage")]
    EmptyStage,

    #[error("window size must be at least 1")]
    InvalidWindowSize,
}
