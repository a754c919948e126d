//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `fileset_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use fileset_core::db::migrations::{current_user_version, latest_version};
use fileset_core::db::open_db_in_memory;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("fileset_core ping={}", fileset_core::ping());
    println!("fileset_core version={}", fileset_core::core_version());

    let schema = open_db_in_memory()
        .map_err(|err| err.to_string())
        .and_then(|conn| current_user_version(&conn).map_err(|err| err.to_string()));
    match schema {
        Ok(version) => {
            println!("fileset_core schema={version}/{}", latest_version());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("fileset_core schema error={err}");
            ExitCode::FAILURE
        }
    }
}
