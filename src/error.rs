//! Error definitions

/// Errors raised by kernel application.
#[derive(thiserror::Error, Debug)]
pub enum KernelError {
    /// The requested backend name is not known.
    #[error("Unknown backend '{name}'. Valid backends are: {valid}")]
    UnknownBackend {
        /// The name that was requested.
        name: String,
        /// The accepted names.
        valid: &'static str,
    },
    /// The fast backend was requested without a far-field evaluator.
    #[error("The fast backend requires a far-field evaluator")]
    MissingFarFieldEvaluator,
    /// The far-field evaluator cannot handle the given wavenumber.
    #[error("Unsupported wavenumber ({re}, {im})")]
    UnsupportedWavenumber {
        /// Real part.
        re: f64,
        /// Imaginary part.
        im: f64,
    },
    /// Failure reported by a far-field evaluator.
    #[error("Far-field evaluation failed: {0}")]
    FarField(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, KernelError>;
