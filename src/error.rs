//! Rich diagnostic error types for the lumina core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. An absent profile or an
//! empty candidate set is deliberately NOT an error anywhere in this crate:
//! the recommendation path degrades to the cold-start fallback or an empty
//! result instead of failing.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for catalog operations.
///
/// Wraps subsystem errors transparently and adds the domain rules the
/// facade enforces (borrow-before-review, one review per item, and so on).
#[derive(Debug, Error, Diagnostic)]
pub enum LibraryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] crate::llm::LlmError),

    #[error("invalid rating {rating}: must be between 1 and 5")]
    #[diagnostic(
        code(lumina::library::invalid_rating),
        help("Ratings are whole stars from 1 to 5.")
    )]
    InvalidRating { rating: u8 },

    #[error("user {user_id} has not borrowed item {item_id}")]
    #[diagnostic(
        code(lumina::library::not_borrowed),
        help("An item must be borrowed at least once before it can be reviewed.")
    )]
    NotBorrowed { user_id: u64, item_id: u64 },

    #[error("user {user_id} already has an active borrow of item {item_id}")]
    #[diagnostic(
        code(lumina::library::already_borrowed),
        help("Return the item before borrowing it again.")
    )]
    AlreadyBorrowed { user_id: u64, item_id: u64 },

    #[error("user {user_id} has already reviewed item {item_id}")]
    #[diagnostic(
        code(lumina::library::already_reviewed),
        help("Only one review per user and item is kept.")
    )]
    AlreadyReviewed { user_id: u64, item_id: u64 },

    #[error("no active borrow of item {item_id} by user {user_id}")]
    #[diagnostic(
        code(lumina::library::not_active),
        help("The item is not currently borrowed by this user, so it cannot be returned.")
    )]
    NoActiveBorrow { user_id: u64, item_id: u64 },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(lumina::library::invalid_config),
        help("Check the config file fields. {message}")
    )]
    InvalidConfig { message: String },
}

/// Errors from the catalog store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("item not found: {id}")]
    #[diagnostic(
        code(lumina::store::item_not_found),
        help("No item with this ID exists in the catalog. List items with `lumina list`.")
    )]
    ItemNotFound { id: u64 },

    #[error("catalog I/O error: {message}")]
    #[diagnostic(
        code(lumina::store::catalog_io),
        help(
            "Failed to read or write the catalog file. Check that the data \
             directory exists and has correct permissions."
        )
    )]
    CatalogIo { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(lumina::store::serde),
        help(
            "Failed to serialize or deserialize catalog data. The stored format \
             may predate this version; try a fresh data directory."
        )
    )]
    Serialization { message: String },
}

/// Convenience alias for catalog operation results.
pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

/// Convenience alias for store operation results.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
