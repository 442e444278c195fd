//! `hoopstat` fetches data from the NBA stats APIs.
//!
//! The hoopstat binary is a wrapper around hoopstat-lib: every request goes
//! through the same retrying, rate-limited middleware chain that library
//! users get.
//!
//! Fetch the league game log of a season:
//! ```sh
//! hoopstat get leaguegamelog -p LeagueID=00 -p Season=2023-24 -p SeasonType="Regular Season"
//! ```
//!
//! Fetch today's live scoreboard and pretty-print it:
//! ```sh
//! hoopstat get scoreboard/todaysScoreboard_00.json \
//!     --base-url https://cdn.nba.com/static/json/liveData --pretty
//! ```
//!
//! Watch every attempt, including retries:
//! ```sh
//! hoopstat get commonallplayers -p LeagueID=00 --verbose-http -v
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]

use std::io::{self, Write};

use anyhow::{Context, Error, Result};
use clap::Parser;
use hoopstat_lib::{QueryParams, RawResponse};
use log::{LevelFilter, error};
#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature
use tokio_util::sync::CancellationToken;

mod client;
mod logging;
mod options;
mod verbosity;

use crate::{
    logging::init_logging,
    options::{Command, Config, GetArgs, HoopstatOptions, Settings},
};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator: config errors, network failures, cancellation.
    #[allow(unused)]
    UnexpectedFailure = 1,
    /// The server answered with a status of 400 or above
    ApiFailure = 2,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

fn run_main() -> Result<i32> {
    let opts = HoopstatOptions::parse();
    let config = Config::load(opts.config_file.as_deref())?;

    let Command::Get(args) = opts.command;

    let verbosity = match config.verbose {
        Some(verbosity) if opts.verbose.is_default() => verbosity,
        _ => opts.verbose,
    };
    let mut level = verbosity.log_level_filter();
    if args.verbose_http {
        // Request dumps are logged at `info`
        level = level.max(LevelFilter::Info);
    }
    init_logging(level);

    let settings = config.resolve(&args)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let exit_code = runtime.block_on(run(&args, &settings))?;
    Ok(exit_code as i32)
}

/// Fetch the endpoint and print the body to stdout
async fn run(args: &GetArgs, settings: &Settings) -> Result<ExitCode> {
    let client = client::create(settings, args.verbose_http)?;
    let params: QueryParams = args.params.iter().cloned().collect();

    // Ctrl-C cancels the request, including any backoff or rate-limit wait
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match client.get(&cancel, &args.endpoint, &params).await {
        Ok(response) => {
            print_body(&response, args.pretty)?;
            Ok(ExitCode::Success)
        }
        Err(e) if e.api_kind().is_some() => {
            error!("{e}");
            Ok(ExitCode::ApiFailure)
        }
        Err(e) => Err(Error::new(e).context(format!("Cannot fetch `{}`", args.endpoint))),
    }
}

fn print_body(response: &RawResponse, pretty: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if pretty {
        match response.json::<serde_json::Value>() {
            Ok(value) => {
                let formatted =
                    serde_json::to_string_pretty(&value).context("Cannot format response")?;
                writeln!(stdout, "{formatted}")?;
                return Ok(());
            }
            Err(e) => log::warn!("Printing raw body: {e}"),
        }
    }
    stdout.write_all(&response.body)?;
    if !response.body.ends_with(b"\n") {
        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}
