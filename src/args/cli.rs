use clap::Parser;

use crate::scenario::WorkflowStep;

use super::defaults::DEFAULT_CONTENT_TYPE;
use super::parsers::{
    parse_bool_env, parse_cookie, parse_header, parse_positive_u64, parse_positive_usize,
    parse_seconds,
};
use super::types::{
    AuthType, HttpMethod, OutputFormat, PositiveU64, PositiveUsize, Protocol, ScenarioKind,
    TestMode, UrlMode,
};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Concurrent HTTP and WebSocket load generator: staggered virtual users, think time, multi-step workflows, and live statistics."
)]
pub struct SurgeArgs {
    /// URL to test (e.g., https://example.com)
    #[arg(help_heading = "Target")]
    pub url: Option<String>,

    /// How target URLs are derived from the URL
    #[arg(long = "url-mode", value_enum, default_value_t = UrlMode::Default, help_heading = "Target")]
    pub url_mode: UrlMode,

    /// Paths to request against the URL's host (used with --url-mode paths/default)
    #[arg(long = "paths", num_args = 1.., help_heading = "Target")]
    pub paths: Vec<String>,

    /// Number of concurrent virtual users
    #[arg(
        long = "users",
        short = 'u',
        default_value = "10",
        value_parser = parse_positive_usize,
        help_heading = "Load"
    )]
    pub users: PositiveUsize,

    /// Execution mode: loop runs for --duration, fixed runs --requests per user
    #[arg(long = "mode", value_enum, default_value_t = TestMode::Loop, help_heading = "Load")]
    pub mode: TestMode,

    /// Requests per user (fixed mode)
    #[arg(
        long = "requests",
        short = 'r',
        default_value = "10",
        value_parser = parse_positive_u64,
        help_heading = "Load"
    )]
    pub requests_per_user: PositiveU64,

    /// Test duration in seconds (loop mode)
    #[arg(
        long = "duration",
        short = 'd',
        default_value = "30",
        value_parser = parse_positive_u64,
        help_heading = "Load"
    )]
    pub duration: PositiveU64,

    /// Window in seconds over which users are staggered to start
    #[arg(long = "ramp-up", default_value = "5", help_heading = "Load")]
    pub ramp_up: u64,

    /// Request timeout in seconds
    #[arg(
        long = "timeout",
        default_value = "10",
        value_parser = parse_positive_u64,
        help_heading = "Load"
    )]
    pub timeout: PositiveU64,

    /// Minimum think time between requests (seconds)
    #[arg(long = "think-min", default_value = "1.0", value_parser = parse_seconds, help_heading = "Load")]
    pub think_min: f64,

    /// Maximum think time between requests (seconds)
    #[arg(long = "think-max", default_value = "5.0", value_parser = parse_seconds, help_heading = "Load")]
    pub think_max: f64,

    /// Best-effort ceiling on requests per second
    #[arg(long = "rate-limit", value_parser = parse_positive_u64, help_heading = "Load")]
    pub rate_limit: Option<PositiveU64>,

    /// Max idle connections per host kept by each user's HTTP pool
    #[arg(long = "connections-per-host", default_value = "100", value_parser = parse_positive_usize)]
    pub connections_per_host: PositiveUsize,

    /// Total connection budget, split evenly across users
    #[arg(long = "max-connections", default_value = "10000", value_parser = parse_positive_usize)]
    pub max_connections: PositiveUsize,

    /// Protocol used to reach the target
    #[arg(long = "protocol", value_enum, default_value_t = Protocol::Http)]
    pub protocol: Protocol,

    /// Scenario driving each user
    #[arg(long = "scenario", value_enum, default_value_t = ScenarioKind::Simple)]
    pub scenario: ScenarioKind,

    /// JSON file with workflow steps (workflow scenario)
    #[arg(long = "workflow-file")]
    pub workflow_file: Option<String>,

    /// Workflow steps embedded in the config file
    #[arg(skip)]
    pub workflow_steps: Option<Vec<WorkflowStep>>,

    /// Authentication type
    #[arg(long = "auth-type", value_enum, default_value_t = AuthType::None, help_heading = "Auth")]
    pub auth_type: AuthType,

    /// Username for basic auth
    #[arg(long = "auth-username", help_heading = "Auth")]
    pub auth_username: Option<String>,

    /// Password for basic auth
    #[arg(long = "auth-password", env = "SURGE_AUTH_PASSWORD", hide_env_values = true, help_heading = "Auth")]
    pub auth_password: Option<String>,

    /// Token for bearer auth
    #[arg(long = "auth-token", env = "SURGE_AUTH_TOKEN", hide_env_values = true, help_heading = "Auth")]
    pub auth_token: Option<String>,

    /// Custom auth header in 'Name: Value' format
    #[arg(long = "auth-header", help_heading = "Auth")]
    pub auth_header: Option<String>,

    /// HTTP headers in 'Name: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header, help_heading = "Request")]
    pub headers: Vec<(String, String)>,

    /// Cookies in 'name=value' format (repeatable)
    #[arg(long = "cookie", short = 'b', value_parser = parse_cookie, help_heading = "Request")]
    pub cookies: Vec<(String, String)>,

    /// HTTP method
    #[arg(
        long = "method",
        short = 'X',
        value_enum,
        ignore_case = true,
        default_value_t = HttpMethod::Get,
        help_heading = "Request"
    )]
    pub method: HttpMethod,

    /// Request payload
    #[arg(long = "payload", conflicts_with = "payload_file", help_heading = "Request")]
    pub payload: Option<String>,

    /// File containing the request payload
    #[arg(long = "payload-file", help_heading = "Request")]
    pub payload_file: Option<String>,

    /// Content type for the request payload
    #[arg(long = "content-type", default_value = DEFAULT_CONTENT_TYPE, help_heading = "Request")]
    pub content_type: String,

    /// Messages to wait for after each WebSocket send
    #[arg(long = "ws-max-messages", default_value = "1", value_parser = parse_positive_usize, help_heading = "Request")]
    pub ws_max_messages: PositiveUsize,

    /// Expected HTTP status code
    #[arg(long = "validate-status", help_heading = "Validation")]
    pub validate_status: Option<u16>,

    /// Text that must appear in each response body
    #[arg(long = "validate-text", help_heading = "Validation")]
    pub validate_text: Option<String>,

    /// Regex each response body must match
    #[arg(long = "validate-regex", help_heading = "Validation")]
    pub validate_regex: Option<String>,

    /// JSON path that must resolve in each response body (e.g. $.data.id)
    #[arg(long = "validate-json-path", help_heading = "Validation")]
    pub validate_json_path: Option<String>,

    /// Expected value at --validate-json-path
    #[arg(long = "validate-json-value", requires = "validate_json_path", help_heading = "Validation")]
    pub validate_json_value: Option<String>,

    /// Output format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Console, help_heading = "Output")]
    pub output_format: OutputFormat,

    /// Output file name without extension
    #[arg(long = "output-file", help_heading = "Output")]
    pub output_file: Option<String>,

    /// Path to a config file (.toml or .json)
    #[arg(long = "config", short = 'c')]
    pub config: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by SURGE_LOG/RUST_LOG)
    #[arg(long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Disable color output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}
