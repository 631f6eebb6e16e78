use std::path::PathBuf;

/// Errors from loading run inputs and building request parameters.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid params template for [{report}]: {source}")]
    Params {
        report: String,
        #[source]
        source: serde_json::Error,
    },
}
