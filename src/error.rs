use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty collection set, bad threshold, etc.).
    ConfigValidation(String),
    /// A rule references a collection that is not declared in the config.
    UnknownCollection(String),
    /// A declared column is missing from the input data.
    MissingColumn { collection: String, column: String },
    /// IO error (CSV read, JSON write, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownCollection(name) => write!(f, "unknown collection: {name}"),
            Self::MissingColumn { collection, column } => {
                write!(f, "collection '{collection}': missing column '{column}'")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
