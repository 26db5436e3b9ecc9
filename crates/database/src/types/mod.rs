pub mod errors;

pub use errors::AccountError;

/// Result type for account store operations
pub type AccountResult<T> = Result<T, AccountError>;
