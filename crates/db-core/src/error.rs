use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] libsql::Error),

    #[error("database builder needs `.memory()` or `.local(path)`")]
    MissingTarget,
}
