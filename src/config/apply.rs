use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{PositiveU64, PositiveUsize, SurgeArgs, parse_cookie, parse_header};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::ConfigFile;

/// Applies configuration values to CLI arguments. Values given on the command
/// line always win over the file.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(
    args: &mut SurgeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    apply_target_config(args, matches, config);
    apply_load_config(args, matches, config)?;
    apply_request_config(args, matches, config)?;
    apply_output_config(args, matches, config);
    Ok(())
}

fn apply_target_config(args: &mut SurgeArgs, matches: &ArgMatches, config: &ConfigFile) {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "url_mode")
        && let Some(mode) = config.url_mode
    {
        args.url_mode = mode;
    }

    if !is_cli(matches, "paths")
        && let Some(paths) = config.paths.clone()
    {
        args.paths = paths;
    }

    if !is_cli(matches, "protocol")
        && let Some(protocol) = config.protocol
    {
        args.protocol = protocol;
    }

    if !is_cli(matches, "scenario")
        && let Some(scenario) = config.scenario
    {
        args.scenario = scenario;
    }

    if !is_cli(matches, "workflow_file")
        && let Some(path) = config.workflow_file.clone()
    {
        args.workflow_file = Some(path);
    }

    if let Some(steps) = config.workflow_steps.clone() {
        args.workflow_steps = Some(steps);
    }
}

fn apply_load_config(
    args: &mut SurgeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "users")
        && let Some(users) = config.users
    {
        args.users = ensure_positive_usize(users, "users")?;
    }

    if !is_cli(matches, "mode")
        && let Some(mode) = config.mode
    {
        args.mode = mode;
    }

    if !is_cli(matches, "requests_per_user")
        && let Some(requests) = config.requests_per_user
    {
        args.requests_per_user = ensure_positive_u64(requests, "requests_per_user")?;
    }

    if !is_cli(matches, "duration")
        && let Some(duration) = config.duration
    {
        args.duration = ensure_positive_u64(duration, "duration")?;
    }

    if !is_cli(matches, "ramp_up")
        && let Some(ramp_up) = config.ramp_up
    {
        args.ramp_up = ramp_up;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout
    {
        args.timeout = ensure_positive_u64(timeout, "timeout")?;
    }

    if !is_cli(matches, "think_min")
        && let Some(value) = config.think_min
    {
        args.think_min = value;
    }

    if !is_cli(matches, "think_max")
        && let Some(value) = config.think_max
    {
        args.think_max = value;
    }

    if !is_cli(matches, "rate_limit")
        && let Some(limit) = config.rate_limit
    {
        args.rate_limit = Some(ensure_positive_u64(limit, "rate_limit")?);
    }

    if !is_cli(matches, "connections_per_host")
        && let Some(value) = config.connections_per_host
    {
        args.connections_per_host = ensure_positive_usize(value, "connections_per_host")?;
    }

    if !is_cli(matches, "max_connections")
        && let Some(value) = config.max_connections
    {
        args.max_connections = ensure_positive_usize(value, "max_connections")?;
    }

    Ok(())
}

fn apply_request_config(
    args: &mut SurgeArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "method")
        && let Some(method) = config.method
    {
        args.method = method;
    }

    if !is_cli(matches, "headers")
        && let Some(headers) = config.headers.as_ref()
    {
        args.headers = parse_pairs(headers, parse_header, |source| {
            ConfigError::InvalidHeader { source }
        })?;
    }

    if !is_cli(matches, "cookies")
        && let Some(cookies) = config.cookies.as_ref()
    {
        args.cookies = parse_pairs(cookies, parse_cookie, |source| {
            ConfigError::InvalidCookie { source }
        })?;
    }

    if !is_cli(matches, "payload")
        && !is_cli(matches, "payload_file")
        && let Some(payload) = config.payload.clone()
    {
        args.payload = Some(payload);
    }

    if !is_cli(matches, "payload_file")
        && !is_cli(matches, "payload")
        && let Some(path) = config.payload_file.clone()
    {
        args.payload_file = Some(path);
    }

    if !is_cli(matches, "content_type")
        && let Some(content_type) = config.content_type.clone()
    {
        args.content_type = content_type;
    }

    if !is_cli(matches, "ws_max_messages")
        && let Some(value) = config.ws_max_messages
    {
        args.ws_max_messages = ensure_positive_usize(value, "ws_max_messages")?;
    }

    if !is_cli(matches, "auth_type")
        && let Some(auth_type) = config.auth_type
    {
        args.auth_type = auth_type;
    }

    if !is_cli(matches, "auth_username")
        && let Some(value) = config.auth_username.clone()
    {
        args.auth_username = Some(value);
    }

    if args.auth_password.is_none()
        && let Some(value) = config.auth_password.clone()
    {
        args.auth_password = Some(value);
    }

    if args.auth_token.is_none()
        && let Some(value) = config.auth_token.clone()
    {
        args.auth_token = Some(value);
    }

    if !is_cli(matches, "auth_header")
        && let Some(value) = config.auth_header.clone()
    {
        args.auth_header = Some(value);
    }

    if !is_cli(matches, "validate_status")
        && let Some(value) = config.validate_status
    {
        args.validate_status = Some(value);
    }

    if !is_cli(matches, "validate_text")
        && let Some(value) = config.validate_text.clone()
    {
        args.validate_text = Some(value);
    }

    if !is_cli(matches, "validate_regex")
        && let Some(value) = config.validate_regex.clone()
    {
        args.validate_regex = Some(value);
    }

    if !is_cli(matches, "validate_json_path")
        && let Some(value) = config.validate_json_path.clone()
    {
        args.validate_json_path = Some(value);
    }

    if !is_cli(matches, "validate_json_value")
        && let Some(value) = config.validate_json_value.clone()
    {
        args.validate_json_value = Some(value);
    }

    Ok(())
}

fn apply_output_config(args: &mut SurgeArgs, matches: &ArgMatches, config: &ConfigFile) {
    if !is_cli(matches, "output_format")
        && let Some(format) = config.output_format
    {
        args.output_format = format;
    }

    if !is_cli(matches, "output_file")
        && let Some(path) = config.output_file.clone()
    {
        args.output_file = Some(path);
    }

    if !is_cli(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| {
        AppError::config(ConfigError::FieldMustBePositive {
            field: field.to_owned(),
            source: err,
        })
    })
}

fn parse_pairs<P, W>(entries: &[String], parse: P, wrap: W) -> AppResult<Vec<(String, String)>>
where
    P: Fn(&str) -> Result<(String, String), ValidationError>,
    W: Fn(ValidationError) -> ConfigError,
{
    let mut parsed = Vec::with_capacity(entries.len());
    for entry in entries {
        parsed.push(parse(entry).map_err(|err| AppError::config(wrap(err)))?);
    }
    Ok(parsed)
}
