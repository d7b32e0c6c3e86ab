//! # Fixture Check
//!
//! Validates a harness configuration file and the fixture document it
//! points at, without contacting Traffic Ops.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin fixture-check traffic-ops-test.conf
//! cargo run --bin fixture-check traffic-ops-test.conf tests/fixtures/tc-fixtures.json
//! ```
//!
//! The optional second argument overrides the `fixtures` path from the
//! configuration. `TO_*` and `TODB_*` environment overrides are applied
//! before validation, as they are for test runs.
//!
//! ## Output
//!
//! ```text
//! Configuration: traffic-ops-test.conf
//!   Traffic Ops: https://localhost:8443 (admin user 'admin')
//!   API versions: default
//!   Database back-door: not configured
//! Fixtures: tc-fixtures.json
//!   divisions: 2
//!   regions: 3
//!   ...
//! ✓ No dangling references
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: configuration and fixtures are usable
//! - `1`: the configuration is invalid, the fixtures cannot be loaded, or
//!   fixtures reference entities that are not defined

use std::env;
use std::process;
use traffic_ops_harness::{HarnessConfig, ResourceKind, TestData};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [tc-fixtures.json]", args[0]);
        process::exit(1);
    }

    let mut config = match HarnessConfig::load(&args[1]) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Cannot load configuration: {}", e);
            process::exit(1);
        }
    };
    if let Err(e) = config.apply_overrides(|name| env::var(name).ok()) {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
    if let Some(fixtures) = args.get(2) {
        config.fixtures = fixtures.clone();
    }
    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration is invalid: {}", e);
        process::exit(1);
    }
    print_config_summary(&args[1], &config);

    let data = match TestData::load(&config.fixtures) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("❌ Cannot load fixtures: {}", e);
            process::exit(1);
        }
    };

    println!("Fixtures: {}", config.fixtures);
    for kind in ResourceKind::ALL {
        println!("  {}: {}", kind, data.count(kind));
    }

    let problems = data.reference_problems();
    if problems.is_empty() {
        println!("✓ No dangling references");
    } else {
        for problem in &problems {
            eprintln!("  ❌ {}", problem);
        }
        eprintln!("{} fixture problem(s) found", problems.len());
        process::exit(1);
    }
}

fn print_config_summary(path: &str, config: &HarnessConfig) {
    println!("Configuration: {}", path);
    println!(
        "  Traffic Ops: {} (admin user '{}')",
        config.traffic_ops.url,
        config.admin_user().unwrap_or_default()
    );
    let versions = config.api_versions();
    if versions.is_empty() {
        println!("  API versions: default");
    } else {
        println!("  API versions: {}", versions.join(", "));
    }
    if config.traffic_ops_db.is_configured() {
        println!(
            "  Database back-door: {}@{}/{}",
            config.traffic_ops_db.user, config.traffic_ops_db.hostname, config.traffic_ops_db.dbname
        );
    } else {
        println!("  Database back-door: not configured");
    }
}
