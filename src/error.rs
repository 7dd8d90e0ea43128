use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml_edit::TomlError),

    #[error("Mapping failed: {0}")]
    Mapping(String),

    #[error("Missing value: {0}")]
    Missing(String),

    #[error("Rejected {count} element(s), first: {first}")]
    RejectedElements { count: usize, first: String },

    #[error("Unsupported root for {format}: {found}")]
    UnsupportedRoot { format: &'static str, found: String },

    #[error("Invalid log filter: {0}")]
    Logging(String),
}
