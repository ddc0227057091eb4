/// Database model definitions.
pub mod models;
/// Tournament, ledger, and player persistence.
pub mod seeding_store;
/// Storage abstraction layer for database operations.
pub mod storage;
