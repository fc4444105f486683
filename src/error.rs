//! Error types for the speckle-masking reconstruction library.

use thiserror::Error;

/// Result type for fallible library operations.
pub type Result<T> = std::result::Result<T, SmipError>;

/// Errors surfaced by the core reconstruction library.
///
/// `Bounds`, `DimensionMismatch`, `Domain` and `InvalidState` are
/// programming errors: local to the call that raised them, and raised
/// only after validation, before any output is mutated. `Io` is
/// user-visible and expected to terminate the pipeline step that hit it.
/// `ReferenceArrayResize` indicates a logic bug (resizing or assigning
/// into a borrowed view).
#[derive(Debug, Error)]
pub enum SmipError {
    /// Element access with an out-of-range unsigned or signed index.
    #[error("index out of bounds: {0}")]
    Bounds(String),

    /// Arithmetic between arrays/bispectra of incompatible shape.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Cross-correlation result read before `correlate()` ran.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A domain precondition (e.g. window aperture > 0) was violated.
    #[error("domain error: {0}")]
    Domain(String),

    /// Video open / image write / bispectrum dump I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Attempt to resize or assign into a non-owning (borrowed) Array2 view.
    #[error("cannot resize or assign into a borrowed array view: {0}")]
    ReferenceArrayResize(String),
}
