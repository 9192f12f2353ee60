//! Validated, immutable run settings.
use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::args::{
    AuthType, DEFAULT_PATHS, DEFAULT_USER_AGENT, HttpMethod, OutputFormat, Protocol, ScenarioKind,
    SurgeArgs, TestMode, UrlMode, parse_header,
};
use crate::error::{AppError, AppResult, ConfigError};
use crate::jsonpath::JsonPath;
use crate::protocol::ResponseValidation;
use crate::scenario::WorkflowStep;

/// Uniform think-time bounds in seconds. `min <= max` and both are finite
/// and non-negative once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinkTime {
    min: f64,
    max: f64,
}

impl ThinkTime {
    /// Builds think-time bounds.
    ///
    /// # Errors
    ///
    /// Returns an error when either bound is negative or not finite, or when
    /// `max < min`.
    pub fn new(min: f64, max: f64) -> Result<Self, ConfigError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ConfigError::ThinkTimeNotFinite);
        }
        if min < 0.0 {
            return Err(ConfigError::ThinkTimeNegative);
        }
        if max < min {
            return Err(ConfigError::ThinkTimeBounds { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Draws a uniformly random pause in `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer { token: String },
    Custom { name: String, value: String },
}

#[derive(Debug, Clone)]
pub struct LoadTestSettings {
    pub url: String,
    pub url_mode: UrlMode,
    pub paths: Vec<String>,
    pub target_urls: Vec<String>,
    pub num_users: usize,
    pub mode: TestMode,
    pub requests_per_user: u64,
    pub duration: Duration,
    pub ramp_up: Duration,
    pub timeout: Duration,
    pub think_time: ThinkTime,
    pub rate_limit: Option<f64>,
    pub connections_per_host: usize,
    pub max_connections: usize,
    pub protocol: Protocol,
    pub scenario: ScenarioKind,
    pub workflow_steps: Vec<WorkflowStep>,
    pub auth: Auth,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub method: HttpMethod,
    pub payload: Option<String>,
    pub content_type: String,
    pub ws_max_messages: usize,
    pub validation: ResponseValidation,
    pub output_format: OutputFormat,
    pub output_base: String,
    pub verbose: bool,
    pub no_color: bool,
}

impl LoadTestSettings {
    /// Validates merged CLI/config arguments into run settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing or malformed URL,
    /// inconsistent bounds, unreadable workflow or payload files, incomplete
    /// authentication, or invalid validation patterns.
    pub fn from_args(args: &SurgeArgs) -> AppResult<Self> {
        let raw_url = args
            .url
            .clone()
            .ok_or_else(|| AppError::config(ConfigError::MissingUrl))?;
        let url = parse_target_url(&raw_url)?;

        let paths = if args.paths.is_empty() {
            DEFAULT_PATHS.iter().map(|path| (*path).to_owned()).collect()
        } else {
            args.paths.clone()
        };
        let target_urls = build_target_urls(&raw_url, &url, args.url_mode, &paths);

        let think_time = ThinkTime::new(args.think_min, args.think_max).map_err(AppError::config)?;

        let workflow_steps = match args.scenario {
            ScenarioKind::Workflow => load_workflow_steps(args)?,
            ScenarioKind::Simple => Vec::new(),
        };

        let payload = match args.payload_file.as_deref() {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|err| {
                AppError::config(ConfigError::ReadPayload {
                    path: PathBuf::from(path),
                    source: err,
                })
            })?),
            None => args.payload.clone(),
        };

        let mut headers = args.headers.clone();
        if !headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        {
            headers.push(("User-Agent".to_owned(), DEFAULT_USER_AGENT.to_owned()));
        }

        let output_base = args.output_file.clone().unwrap_or_else(|| {
            format!(
                "load_test_results_{}",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )
        });

        Ok(Self {
            url: raw_url,
            url_mode: args.url_mode,
            paths,
            target_urls,
            num_users: args.users.get(),
            mode: args.mode,
            requests_per_user: args.requests_per_user.get(),
            duration: Duration::from_secs(args.duration.get()),
            ramp_up: Duration::from_secs(args.ramp_up),
            timeout: Duration::from_secs(args.timeout.get()),
            think_time,
            rate_limit: args.rate_limit.map(|limit| limit.get() as f64),
            connections_per_host: args.connections_per_host.get(),
            max_connections: args.max_connections.get(),
            protocol: args.protocol,
            scenario: args.scenario,
            workflow_steps,
            auth: resolve_auth(args)?,
            headers,
            cookies: args.cookies.clone(),
            method: args.method,
            payload,
            content_type: args.content_type.clone(),
            ws_max_messages: args.ws_max_messages.get(),
            validation: build_validation(args)?,
            output_format: args.output_format,
            output_base,
            verbose: args.verbose,
            no_color: args.no_color,
        })
    }

    /// Total requests a fixed-mode run will issue.
    #[must_use]
    pub fn planned_requests(&self) -> u64 {
        u64::try_from(self.num_users)
            .unwrap_or(u64::MAX)
            .saturating_mul(self.requests_per_user)
    }

    /// Output file path for the given suffix, e.g. `"_summary.csv"` or `".json"`.
    #[must_use]
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}{}", self.output_base, suffix))
    }
}

fn parse_target_url(raw: &str) -> AppResult<Url> {
    let url = Url::parse(raw).map_err(|err| {
        AppError::config(ConfigError::InvalidUrl {
            url: raw.to_owned(),
            source: err,
        })
    })?;
    if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
        return Err(AppError::config(ConfigError::UnsupportedScheme {
            scheme: url.scheme().to_owned(),
        }));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::config(ConfigError::MissingHost {
            url: raw.to_owned(),
        }));
    }
    Ok(url)
}

/// `scheme://host[:port]` of the target URL.
pub(crate) fn base_url(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

fn build_target_urls(raw: &str, url: &Url, mode: UrlMode, paths: &[String]) -> Vec<String> {
    if mode == UrlMode::Exact {
        return vec![raw.to_owned()];
    }
    let base = base_url(url);
    paths
        .iter()
        .map(|path| {
            if path.starts_with('/') {
                format!("{}{}", base, path)
            } else {
                format!("{}/{}", base, path)
            }
        })
        .collect()
}

fn load_workflow_steps(args: &SurgeArgs) -> AppResult<Vec<WorkflowStep>> {
    let steps = match (&args.workflow_steps, args.workflow_file.as_deref()) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => {
            let path = PathBuf::from(path);
            let content = std::fs::read_to_string(&path).map_err(|err| {
                AppError::config(ConfigError::ReadWorkflow {
                    path: path.clone(),
                    source: err,
                })
            })?;
            serde_json::from_str::<Vec<WorkflowStep>>(&content).map_err(|err| {
                AppError::config(ConfigError::ParseWorkflow { path, source: err })
            })?
        }
        (None, None) => return Err(AppError::config(ConfigError::WorkflowMissing)),
    };

    if steps.is_empty() {
        return Err(AppError::config(ConfigError::EmptyWorkflow));
    }
    if args.url_mode == UrlMode::Exact
        && let Some(index) = steps.iter().position(|step| step.url.is_none())
    {
        return Err(AppError::config(ConfigError::WorkflowStepMissingUrl { index }));
    }
    Ok(steps)
}

fn resolve_auth(args: &SurgeArgs) -> AppResult<Auth> {
    match args.auth_type {
        AuthType::None => Ok(Auth::None),
        AuthType::Basic => match (&args.auth_username, &args.auth_password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Auth::Basic {
                    username: username.clone(),
                    password: password.clone(),
                })
            }
            _ => Err(AppError::config(ConfigError::BasicAuthIncomplete)),
        },
        AuthType::Bearer => match &args.auth_token {
            Some(token) if !token.is_empty() => Ok(Auth::Bearer {
                token: token.clone(),
            }),
            _ => Err(AppError::config(ConfigError::BearerTokenMissing)),
        },
        AuthType::Custom => {
            let header = args
                .auth_header
                .as_deref()
                .ok_or_else(|| AppError::config(ConfigError::CustomAuthHeaderMissing))?;
            let (name, value) = parse_header(header)
                .map_err(|err| AppError::config(ConfigError::InvalidAuthHeader { source: err }))?;
            Ok(Auth::Custom { name, value })
        }
    }
}

fn build_validation(args: &SurgeArgs) -> AppResult<ResponseValidation> {
    let regex = match args.validate_regex.as_deref() {
        Some(pattern) => Some(regex::Regex::new(pattern).map_err(|err| {
            AppError::config(ConfigError::InvalidRegex {
                pattern: pattern.to_owned(),
                source: err,
            })
        })?),
        None => None,
    };
    let json_path = match args.validate_json_path.as_deref() {
        Some(path) => Some(JsonPath::parse(path).map_err(|err| {
            AppError::config(ConfigError::InvalidJsonPath {
                path: path.to_owned(),
                source: err,
            })
        })?),
        None => None,
    };
    Ok(ResponseValidation {
        status: args.validate_status,
        text: args.validate_text.clone(),
        regex,
        json_path,
        json_value: args.validate_json_value.clone(),
    })
}
