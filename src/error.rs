//! Fatal, user-visible errors.
//!
//! Anything that should stop a run is an `AppError`: it carries the process
//! exit code and a message that already tells the operator what to do next.
//! Recoverable conditions (a ticker with no data, a column that is not a date)
//! are logged and never become an `AppError`.

/// Required input file is missing or unreadable.
pub const EXIT_MISSING_INPUT: u8 = 1;
/// Missing credential, bad configuration, or no usable columns.
pub const EXIT_CONFIG: u8 = 2;
/// Nothing could be constructed from the inputs.
pub const EXIT_NO_DATA: u8 = 3;
/// Filesystem or provider failure.
pub const EXIT_IO: u8 = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::new(EXIT_MISSING_INPUT, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(EXIT_CONFIG, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[fatal] {}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
