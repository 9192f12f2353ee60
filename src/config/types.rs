use serde::Deserialize;

use crate::args::{
    AuthType, HttpMethod, OutputFormat, Protocol, ScenarioKind, TestMode, UrlMode,
};
use crate::scenario::WorkflowStep;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub url_mode: Option<UrlMode>,
    pub paths: Option<Vec<String>>,
    #[serde(alias = "num_users")]
    pub users: Option<usize>,
    pub mode: Option<TestMode>,
    #[serde(alias = "requests")]
    pub requests_per_user: Option<u64>,
    pub duration: Option<u64>,
    pub ramp_up: Option<u64>,
    pub timeout: Option<u64>,
    #[serde(alias = "think_time_min")]
    pub think_min: Option<f64>,
    #[serde(alias = "think_time_max")]
    pub think_max: Option<f64>,
    pub rate_limit: Option<u64>,
    pub connections_per_host: Option<usize>,
    pub max_connections: Option<usize>,
    pub protocol: Option<Protocol>,
    pub scenario: Option<ScenarioKind>,
    pub workflow_file: Option<String>,
    pub workflow_steps: Option<Vec<WorkflowStep>>,
    pub auth_type: Option<AuthType>,
    pub auth_username: Option<String>,
    pub auth_password: Option<String>,
    pub auth_token: Option<String>,
    pub auth_header: Option<String>,
    pub headers: Option<Vec<String>>,
    pub cookies: Option<Vec<String>>,
    #[serde(alias = "request_method")]
    pub method: Option<HttpMethod>,
    pub payload: Option<String>,
    pub payload_file: Option<String>,
    pub content_type: Option<String>,
    pub ws_max_messages: Option<usize>,
    pub validate_status: Option<u16>,
    pub validate_text: Option<String>,
    pub validate_regex: Option<String>,
    pub validate_json_path: Option<String>,
    pub validate_json_value: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub output_file: Option<String>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}
