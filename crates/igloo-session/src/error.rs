//! Error types for the session layer.

/// Errors that can occur in account and session management.
///
/// Most authority operations answer with `bool` or `Option` because the
/// login flow only needs a yes/no; these variants cover the cases where
/// the caller has to know what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No account exists for the given (lowercased) username.
    #[error("no account named {0:?}")]
    UnknownAccount(String),

    /// The account cannot afford a purchase.
    #[error("insufficient coins: have {have}, need {need}")]
    InsufficientCoins {
        /// Current balance.
        have: u32,
        /// Price of the purchase.
        need: u32,
    },

    /// The account already owns the maximum number of furniture items.
    #[error("furniture limit of {0} reached")]
    FurnitureLimit(usize),

    /// Reading or writing the accounts file failed.
    #[error("account store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The accounts document could not be (de)serialized.
    #[error("account store encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}
