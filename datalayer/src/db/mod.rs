pub mod core;
pub mod dao;
pub mod memory;
pub mod mysql;

pub use self::core::*;
pub use dao::{expect_key_arity, Dao, ReadOnlyDao, ReadSource, Readable, Writable, WriteSink};
pub use memory::MemoryConnector;
pub use mysql::MySqlConnector;
