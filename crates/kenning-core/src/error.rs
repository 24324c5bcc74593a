use std::path::PathBuf;

/// Errors that can occur while mining history or computing knowledge.
///
/// Library crates return this type directly; the binary hands it to
/// `miette` at the boundary, so it also derives [`miette::Diagnostic`].
///
/// # Examples
///
/// ```
/// use kenning_core::KenningError;
///
/// let err = KenningError::Config("half_life_days must be positive".into());
/// assert!(err.to_string().contains("half_life_days"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum KenningError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(kenning::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(kenning::config), help("check the [knowledge] section of .kenning.toml"))]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    #[diagnostic(code(kenning::git))]
    Git(String),

    /// A difference does not line up with the content it is replayed against.
    #[error("replay error in revision {revision}: {message}")]
    #[diagnostic(
        code(kenning::replay),
        help("the line splitting used for the diff must match the one used for the content")
    )]
    Replay {
        /// Identifier of the offending revision.
        revision: String,
        /// What went wrong.
        message: String,
    },

    /// A revision is older than the knowledge state it is folded into.
    #[error("revision {revision} is older than the knowledge state ({state} > {revision_time})")]
    #[diagnostic(code(kenning::out_of_order))]
    OutOfOrder {
        /// Identifier of the offending revision.
        revision: String,
        /// Timestamp of the state, RFC 3339.
        state: String,
        /// Timestamp of the revision, RFC 3339.
        revision_time: String,
    },

    /// A computed knowledge level is not finite or falls outside `[0, 1]`.
    #[error("knowledge level {value} for developer {developer} is outside [0, 1]")]
    #[diagnostic(code(kenning::invariant), help("this is a bug in kenning, please report it"))]
    Invariant {
        /// Developer whose level is broken.
        developer: String,
        /// The offending value.
        value: f64,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(kenning::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(kenning::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(kenning::file_not_found))]
    FileNotFound(PathBuf),
}
