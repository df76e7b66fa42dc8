#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown network name {0:?}; known networks are {1:?}")]
    UnknownNetwork(String, Vec<&'static str>),

    #[error("missing required environment variable {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid value for {field}: {value:?} ({reason})")]
    InvalidValue { field: &'static str, value: String, reason: String },
}
