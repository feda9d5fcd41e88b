//! Self-test program for the `verdict` unit-test harness.

#![deny(missing_docs)]

mod args;
mod config;
mod error;
mod events;
mod productinfo;
mod strict;
mod suites;
mod thingy;

use std::panic::AssertUnwindSafe;
use std::process::ExitCode;
use std::rc::Rc;

use clap::Parser;
use colored::Colorize;
use verdict_core::{FatalFailure, TestRegistry};

use crate::args::CommandLineArgs;
use crate::error::{DemoError, EXIT_TEST_FAILURE};
use crate::events::SUITES_TARGET;

/// Main entry point for the demo.
fn main() -> ExitCode {
    //
    // Parse args. Usage errors exit with code 2.
    //
    let args = CommandLineArgs::parse();

    events::TraceEventConfig::init(&args.enabled_log_events);
    tracing::debug!(target: SUITES_TARGET, "{}", productinfo::get_product_display_str());

    //
    // The suites panic on purpose; keep those panics out of the results.
    //
    std::panic::set_hook(Box::new(|info| {
        tracing::debug!(target: SUITES_TARGET, "panic: {info}");
    }));

    match std::panic::catch_unwind(AssertUnwindSafe(|| run(&args))) {
        Ok(Ok(code)) => ExitCode::from(code),
        Ok(Err(e)) => {
            let code = e.exit_code();
            report_error(&anyhow::Error::from(e));
            ExitCode::from(code)
        }
        Err(payload) => {
            if let Some(fatal) = payload.downcast_ref::<FatalFailure>() {
                tracing::debug!(target: SUITES_TARGET, "{fatal}");
            } else {
                eprintln!("{}: a suite panicked outside of any check", "error".red().bold());
            }
            ExitCode::from(EXIT_TEST_FAILURE)
        }
    }
}

fn report_error(e: &anyhow::Error) {
    eprintln!("{}: {e:#}", "error".red().bold());
}

/// Runs the suites; returns the process exit code.
fn run(args: &CommandLineArgs) -> Result<u8, DemoError> {
    //
    // Load configuration.
    //
    let loaded = config::load_config(args.no_config, args.config_file.as_deref());
    if let Some(error) = loaded.error {
        if loaded.explicit_path {
            return Err(error.into());
        }

        let path = loaded
            .path
            .as_deref()
            .map_or_else(String::new, |p| p.display().to_string());
        tracing::warn!("ignoring config file {path}: {error}");
    }

    let registry = Rc::new(TestRegistry::new(loaded.config.to_registry_config(args)?));
    tracing::debug!(target: SUITES_TARGET, "created registry '{}'", registry.name());

    let failures = if args.strict {
        Some(strict::StrictReceiver::attach(&registry)?)
    } else {
        None
    };

    if !args.no_tests {
        suites::run_all(&registry, args)?;
        if args.repeat {
            registry.flush_summary();
            suites::run_all(&registry, args)?;
        }
    }

    if !args.table_at_exit {
        registry.flush_summary();
    }

    // Dropping the registry flushes what's left, unless told to keep quiet.
    drop(registry);

    match failures.map(|f| f.get()) {
        Some(count) if count > 0 => {
            tracing::info!("{count} failing results");
            Ok(EXIT_TEST_FAILURE)
        }
        _ => Ok(0),
    }
}
