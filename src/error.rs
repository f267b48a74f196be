//! Error types for graph construction, persistence, and loading.

/// Errors surfaced by the public operations.
///
/// Query operations (`contains`, `lookup`, `find_prefixes`, wildcard and
/// fuzzy search) never fail on a well-formed graph: unrepresentable input
/// is a miss, not an error.
#[derive(Debug, thiserror::Error)]
pub enum DawgError {
    /// A container file failed validation: bad magic, unknown version,
    /// contradictory flags, truncated regions, or out-of-range indices.
    #[error("bad container: {0}")]
    BadContainer(String),

    /// An explicit narrow rebuild was requested but the data cannot fit
    /// the target encoding.
    #[error("encoding exceeded: {0}")]
    EncodingExceeded(String),

    /// Minimization produced a graph whose accepted key set differs from
    /// the input. The automaton is left unchanged; this indicates a bug
    /// in the library, never in caller data.
    #[error("minimization changed the accepted key set")]
    MinimizeConsistency,

    /// A host file or mapping operation failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DawgError>;
