mod redis;
mod sqlite;

pub use self::redis::{create_pool, RedisPool, RedisStateStore};
pub use self::sqlite::SqliteStateStore;
