use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A query expected a row but found none.
    #[error("Record not found")]
    NotFound,

    /// Booking date range with `end <= start`.
    #[error("End date must be after start date")]
    InvalidDateRange,

    /// An overlapping non-cancelled booking already holds the date range.
    #[error("Listing is not available for the selected dates")]
    Unavailable,

    /// A (listing, user) pair already has a review.
    #[error("Listing already reviewed by this user")]
    DuplicateReview,

    /// Connection mutex poisoned by a panicking thread.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// Timestamp or date parsing error.
    #[error("Date parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
