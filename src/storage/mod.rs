mod memory;
mod postgres;
mod repo_types;

pub use memory::MemoryStore;
pub use postgres::PgStore;
