use std::path::PathBuf;

/// Errors raised while opening a programmer
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A parameter is not of the form `key=value`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidParam(String),
    /// No enabled programmer has this name
    #[error("Unknown programmer: {0}")]
    UnknownProgrammer(String),
    /// The programmer does not take this parameter
    #[error("Unknown parameter '{key}' for programmer {programmer}")]
    UnknownParam {
        /// Programmer name
        programmer: String,
        /// Offending key
        key: String,
    },
    /// A parameter value could not be interpreted
    #[error("Invalid value '{value}' for parameter '{key}'")]
    InvalidValue {
        /// Parameter name
        key: String,
        /// Offending value
        value: String,
    },
    /// The chip to emulate is not in the database
    #[error("Unknown chip '{0}' specified.")]
    UnknownChip(String),
    /// Reading a file named by a parameter failed
    #[error("{}: {source}", path.display())]
    Io {
        /// File named by the parameter
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}
