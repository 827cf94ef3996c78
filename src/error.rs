use thiserror::Error;

/// Errors surfaced by the tracker.
///
/// Each variant maps to a process exit code via [`AppError::exit_code`].
/// Soft conditions (missing MoM/YoY history, a cleaning run that filters out
/// every row) are not errors; they are logged and produce empty/`None` values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// No commodity and/or no market selected for an index or summary run.
    #[error("Please select at least one commodity and one market (commodities: {commodities}, markets: {markets}).")]
    EmptySelection { commodities: usize, markets: usize },

    /// Country absent from the country index.
    #[error("Unknown country '{0}': not present in the country index.")]
    UnknownCountry(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Fetch(String),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::EmptySelection { .. } | AppError::UnknownCountry(_) | AppError::InvalidInput(_) => 2,
            AppError::Io(_) => 3,
            AppError::Fetch(_) => 4,
        }
    }
}
