//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `tinytasks_core` linkage.
//! - Start core logging from `CoreConfig` and exercise one add/commit round
//!   trip against an in-memory store.

use std::process::ExitCode;
use tinytasks_core::db::open_db_in_memory;
use tinytasks_core::{init_logging, CoreConfig, SqliteProvider, TaskStorage};

const LOG_DIR_NAME: &str = "tinytasks-logs";

fn main() -> ExitCode {
    println!("tinytasks_core ping={}", tinytasks_core::ping());
    println!("tinytasks_core version={}", tinytasks_core::core_version());

    let config = CoreConfig::default();
    match start_logging(&config) {
        Ok(log_dir) => println!("tinytasks_core logging=ok dir={log_dir}"),
        Err(err) => eprintln!("tinytasks_core logging=error error={err}"),
    }

    match run_store_round_trip(config) {
        Ok(lists) => {
            println!("tinytasks_core store=ok lists={lists}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tinytasks_core store=error error={err}");
            ExitCode::FAILURE
        }
    }
}

fn start_logging(config: &CoreConfig) -> Result<String, String> {
    let log_dir = std::env::temp_dir().join(LOG_DIR_NAME);
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log dir `{}` is not valid UTF-8", log_dir.display()))?
        .to_string();
    init_logging(&config.log_level, &log_dir)?;
    Ok(log_dir)
}

fn run_store_round_trip(config: CoreConfig) -> Result<usize, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let provider = SqliteProvider::try_new(&conn)?;
    let mut storage = TaskStorage::open(provider, config)?;
    let list = storage.add_task_list()?;
    storage.add_task(list.id)?;
    Ok(storage.task_list_count())
}
