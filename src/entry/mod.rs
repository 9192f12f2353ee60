use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{info, warn};

use crate::args::{DEFAULT_CONFIG_FILES, OutputFormat, SurgeArgs};
use crate::config::{LoadTestSettings, apply_config, load_config};
use crate::error::AppResult;
use crate::metrics::MetricsAggregator;
use crate::protocol::build_adapter;
use crate::reporters::build_reporters;
use crate::runner::{RunComponents, run as run_load_test};
use crate::scenario::build_scenario;
use crate::shutdown::ShutdownToken;
use crate::shutdown_handlers::setup_signal_shutdown_handler;
use crate::system::banner::print_banner;
use crate::system::logger::init_logging;

/// Parses the command line, merges the config file, and runs one load test.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, or when the
/// runtime or the test components cannot be built.
pub fn run() -> AppResult<()> {
    let (mut args, matches) = match parse_args()? {
        Some(parsed) => parsed,
        None => return Ok(()),
    };

    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, &matches, &config)?;
    }

    init_logging(args.verbose, args.no_color);

    let settings = Arc::new(LoadTestSettings::from_args(&args)?);
    if settings.output_format.includes(OutputFormat::Console) {
        print_banner(settings.no_color);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(settings))
}

fn parse_args() -> AppResult<Option<(SurgeArgs, ArgMatches)>> {
    let mut cmd = SurgeArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = SurgeArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

/// A bare invocation prints help unless a default config file can supply
/// the target.
fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    treat_as_empty && !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

async fn run_async(settings: Arc<LoadTestSettings>) -> AppResult<()> {
    let adapter = build_adapter(&settings);
    let scenario = build_scenario(&settings, adapter)?;
    let reporters = build_reporters(&settings);

    let shutdown = ShutdownToken::new();
    let signal_handler = setup_signal_shutdown_handler(&shutdown);

    info!(
        "Testing {} with {} users ({} mode, {} scenario)",
        settings.url,
        settings.num_users,
        settings.mode.as_str(),
        settings.scenario.as_str()
    );
    let results = run_load_test(RunComponents {
        settings,
        scenario,
        reporters,
        metrics: Arc::new(MetricsAggregator::new()),
        shutdown: shutdown.clone(),
    })
    .await;

    shutdown.trigger();
    if let Err(err) = signal_handler.await {
        warn!("Signal handler ended abnormally: {}", err);
    }
    info!(
        "Completed {} requests ({} failed) in {:.2}s",
        results.total_requests,
        results.failed_requests,
        results.duration.as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_is_treated_as_empty() -> Result<(), String> {
        let double_dash = [OsString::from("surge"), OsString::from("--")];
        let with_url = [
            OsString::from("surge"),
            OsString::from("http://localhost"),
        ];
        if has_default_config() {
            return Ok(());
        }
        let checks = [
            (should_show_help(&[]), "no argv"),
            (should_show_help(&[OsString::from("surge")]), "program only"),
            (should_show_help(&double_dash), "double dash"),
            (!should_show_help(&with_url), "url given"),
        ];
        for (passed, message) in checks {
            if !passed {
                return Err(message.to_owned());
            }
        }
        Ok(())
    }
}
