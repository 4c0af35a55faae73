/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
/// Venue persistence (balances, action log, catalog, sales).
pub mod venue_store;
