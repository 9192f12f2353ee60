use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::LoadTestSettings;
use crate::error::ReportError;
use crate::metrics::{FinalResults, ProgressSnapshot};

use super::{Reporter, write_output};

/// Writes the full run as one pretty-printed `<base>.json` document.
pub struct JsonReporter {
    path: PathBuf,
    test_info: Value,
    config: Value,
    snapshots: Vec<ProgressSnapshot>,
}

impl JsonReporter {
    #[must_use]
    pub fn new(settings: &LoadTestSettings) -> Self {
        Self {
            path: settings.output_path(".json"),
            test_info: test_info(settings),
            config: config_section(settings),
            snapshots: Vec::new(),
        }
    }

    pub(super) fn document(&self, results: &FinalResults) -> Value {
        let mut test_info = self.test_info.clone();
        if let Some(info) = test_info.as_object_mut() {
            info.insert(
                "duration".to_owned(),
                json!(results.duration.as_secs_f64()),
            );
        }
        let named = |pairs: Vec<(String, u64)>| -> Vec<Value> {
            pairs
                .into_iter()
                .map(|(name, count)| json!({ "name": name, "count": count }))
                .collect()
        };

        json!({
            "test_info": test_info,
            "config": self.config,
            "summary": {
                "total_requests": results.total_requests,
                "successful_requests": results.successful_requests,
                "failed_requests": results.failed_requests,
                "success_rate": results.success_rate(),
                "failure_rate": results.failure_rate(),
                "requests_per_second": results.requests_per_second,
                "max_rps": results.max_rps,
            },
            "response_times": results.response_times,
            "status_codes": named(
                results
                    .status_codes
                    .iter()
                    .map(|(code, count)| (code.to_string(), *count))
                    .collect()
            ),
            "errors": named(
                results
                    .errors_by_count()
                    .into_iter()
                    .map(|(name, count)| (name.to_owned(), count))
                    .collect()
            ),
            "history": results.history,
            "metrics_data": self.snapshots,
        })
    }
}

#[async_trait]
impl Reporter for JsonReporter {
    fn name(&self) -> &'static str {
        "json"
    }

    async fn report_start(&mut self, settings: &LoadTestSettings) -> Result<(), ReportError> {
        self.test_info = test_info(settings);
        self.snapshots.clear();
        Ok(())
    }

    async fn report_progress(&mut self, snapshot: &ProgressSnapshot) -> Result<(), ReportError> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn report(&mut self, results: &FinalResults) -> Result<(), ReportError> {
        let rendered = serde_json::to_string_pretty(&self.document(results))
            .map_err(|err| ReportError::Serialize { source: err })?;
        write_output(&self.path, rendered).await?;
        println!("JSON Reporter: Results saved to {}", self.path.display());
        Ok(())
    }
}

fn test_info(settings: &LoadTestSettings) -> Value {
    json!({
        "url": settings.url,
        "protocol": settings.protocol.as_str(),
        "mode": settings.mode.as_str(),
        "users": settings.num_users,
        "test_time": chrono::Local::now().to_rfc3339(),
    })
}

fn config_section(settings: &LoadTestSettings) -> Value {
    json!({
        "url": settings.url,
        "url_mode": settings.url_mode.as_str(),
        "url_paths": settings.paths,
        "num_users": settings.num_users,
        "mode": settings.mode.as_str(),
        "requests_per_user": settings.requests_per_user,
        "duration": settings.duration.as_secs(),
        "ramp_up": settings.ramp_up.as_secs(),
        "timeout": settings.timeout.as_secs(),
        "think_time_min": settings.think_time.min(),
        "think_time_max": settings.think_time.max(),
        "connections_per_host": settings.connections_per_host,
        "max_connections": settings.max_connections,
        "protocol": settings.protocol.as_str(),
        "scenario": settings.scenario.as_str(),
        "request_method": settings.method.as_str(),
        "rate_limit": settings.rate_limit,
    })
}
