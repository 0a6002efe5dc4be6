pub mod connection;
pub mod fixtures;
pub mod snowflake;
pub mod sqlite;
pub mod warehouse;

pub use connection::connect;
pub use fixtures::{DemoCatalog, SeedReport};
pub use snowflake::{SnowflakeSettings, SnowflakeWarehouse};
pub use sqlite::SqliteWarehouse;
pub use warehouse::{Warehouse, WarehouseError, WarehouseSession};
