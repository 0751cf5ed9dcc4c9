use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: the path '{0}' does not exist")]
    NotFound(String),

    #[error("Unsupported format '{0}': supported extensions are pdf, txt, docx, md")]
    UnsupportedFormat(String),

    #[error("Failed to load document '{path}': {detail}")]
    LoadFailed { path: String, detail: String },

    #[error("No chunks to index: provide at least one document with content")]
    EmptyInput,

    #[error("No index loaded: index documents or load an existing index first")]
    NotReady,

    #[error("Indexing failed")]
    Indexing(#[source] anyhow::Error),

    #[error("Query failed")]
    Query(#[source] anyhow::Error),

    #[error("Index storage at '{}' could not be opened", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Full message chain, symptom first, root cause appended.
    pub fn detail(&self) -> String {
        use std::error::Error as _;
        let mut out = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, Error>;
