//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// Alias for the ID of a row in the transaction table.
pub type TransactionId = DatabaseId;
