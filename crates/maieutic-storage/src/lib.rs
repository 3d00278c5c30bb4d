// Postgres storage layer with sqlx, plus an in-memory double for tests that don't need a
// live database (§B.4).

pub mod encryption;
pub mod memory;
pub mod models;
pub mod password;
pub mod postgres;

pub use encryption::{generate_encryption_key, EncryptedPayload, EncryptionService};
pub use memory::MemoryStore;
pub use postgres::Database;
