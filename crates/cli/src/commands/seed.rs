use crate::commands::{current_thread_runtime, CommandResult};
use vidsage_core::config::{AppConfig, LoadOptions, WarehouseProvider};
use vidsage_db::{DemoCatalog, SeedReport};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    if config.warehouse.provider != WarehouseProvider::Sqlite {
        return CommandResult::failure(
            "seed",
            "unsupported_provider",
            format!(
                "the demo catalog only seeds sqlite warehouses; configured provider is `{}`",
                config.warehouse.provider.as_str()
            ),
            2,
        );
    }

    let runtime = match current_thread_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(DemoCatalog::seed(
        &config.warehouse.url,
        &config.warehouse.catalog_table,
        &config.warehouse.fallback_table,
    ));

    match result {
        Ok(report) => CommandResult::success("seed", summary(&report)),
        Err(error) => CommandResult::failure("seed", "seed_execution", error.to_string(), 5),
    }
}

fn summary(report: &SeedReport) -> String {
    format!(
        "demo catalog seeded: {} rows in {}, {} rows in {}",
        report.catalog_rows, report.catalog_table, report.fallback_rows, report.fallback_table
    )
}
