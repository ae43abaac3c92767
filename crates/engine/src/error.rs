use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (missing required source, bad batch size).
    ConfigValidation(String),
    /// A source could not be parsed as tabular data at all.
    SourceParse { source: String, detail: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::SourceParse { source, detail } => {
                write!(f, "source '{source}': {detail}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
