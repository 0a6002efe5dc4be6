use std::sync::Arc;

use vidsage_core::config::{WarehouseConfig, WarehouseProvider};

use crate::snowflake::{SnowflakeSettings, SnowflakeWarehouse};
use crate::sqlite::SqliteWarehouse;
use crate::warehouse::{Warehouse, WarehouseError};

/// Builds the configured warehouse. No connection is opened here; sessions
/// are opened per request by the executor.
pub fn connect(config: &WarehouseConfig) -> Result<Arc<dyn Warehouse>, WarehouseError> {
    match config.provider {
        WarehouseProvider::Snowflake => {
            let settings = SnowflakeSettings::from_config(config)?;
            Ok(Arc::new(SnowflakeWarehouse::new(settings)))
        }
        WarehouseProvider::Sqlite => Ok(Arc::new(SqliteWarehouse::new(config.url.clone()))),
    }
}
