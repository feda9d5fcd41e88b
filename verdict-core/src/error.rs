//! Error types for the harness.

/// Errors surfaced by registry, receiver-registration, and option-parsing operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A test case was requested with an empty name.
    #[error("test case name must not be empty")]
    EmptyName,

    /// The registry is broadcasting to its receivers and can't be modified right now.
    #[error("registry is busy broadcasting to receivers")]
    Busy,

    /// The receiver to remove was never registered (or was already unsubscribed).
    #[error("receiver is not registered")]
    ReceiverNotRegistered,

    /// An output option letter was not recognized.
    #[error("unknown output option: '{0}'")]
    InvalidOutputOption(char),

    /// An output option letter was given more than once.
    #[error("output option given more than once: '{0}'")]
    DuplicateOutputOption(char),

    /// The 'nothing' output option was combined with options that add output content.
    #[error("output option 'n' can't be combined with any of 'tdpmhw'")]
    ConflictingOutputOptions,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
