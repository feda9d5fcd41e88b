use crate::config::ConfigLoadError;

/// Exit code used when tests failed.
pub const EXIT_TEST_FAILURE: u8 = 1;

/// Exit code used for invalid arguments or configuration.
pub const EXIT_USAGE: u8 = 2;

/// Errors that stop the demo before or while it runs its suites.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// The output option letters could not be parsed.
    #[error("invalid output options '{letters}'")]
    OutputOptions {
        /// The letters as given.
        letters: String,
        /// What was wrong with them.
        #[source]
        source: verdict_core::Error,
    },

    /// No output destination was configured.
    #[error(
        "no output destination configured; use -o with S or E, or one of -t, --html, -x, or -j"
    )]
    NoOutput,

    /// An explicitly requested configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigLoadError),

    /// The registry rejected a request.
    #[error(transparent)]
    Registry(#[from] verdict_core::Error),
}

impl DemoError {
    /// Process exit code for this error.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::OutputOptions { .. } | Self::NoOutput | Self::Config(_) => EXIT_USAGE,
            Self::Registry(_) => EXIT_TEST_FAILURE,
        }
    }
}
