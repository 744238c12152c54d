//! Session Directory implementations.

mod memory;
mod sqlite;

pub use memory::MemorySessionDirectory;
pub use sqlite::SqliteSessionDirectory;
