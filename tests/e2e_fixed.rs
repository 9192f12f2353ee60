mod support;

use std::fs;

use tempfile::tempdir;

use support::{run_surge, spawn_http_server_or_skip};

fn fixed_args(url: &str, users: &str, requests: &str) -> Vec<String> {
    [
        url,
        "--url-mode",
        "exact",
        "--mode",
        "fixed",
        "--users",
        users,
        "--requests",
        requests,
        "--ramp-up",
        "0",
        "--think-min",
        "0",
        "--think-max",
        "0",
        "--timeout",
        "5",
        "--no-color",
    ]
    .iter()
    .map(|arg| (*arg).to_owned())
    .collect()
}

fn describe(output: &std::process::Output) -> String {
    format!(
        "status: {:?}\nstdout: {}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn e2e_fixed_console_summary() -> Result<(), String> {
    let Some((url, server)) = spawn_http_server_or_skip()? else {
        return Ok(());
    };

    let output = run_surge(fixed_args(&url, "3", "4"))?;
    if !output.status.success() {
        return Err(describe(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let checks = [
        (stdout.contains("LOAD TEST STARTED"), "start banner"),
        (stdout.contains("Mode: FIXED, Users: 3"), "mode line"),
        (stdout.contains("LOAD TEST RESULTS"), "results block"),
        (stdout.contains("Requests Completed: 12"), "request total"),
        (stdout.contains("Successful Requests: 12 (100.0%)"), "success share"),
        (stdout.contains("  - 200: 12 (100.0%)"), "status tally"),
        (stdout.contains("No errors reported"), "no errors"),
        (server.hits() == 12, "server saw every request"),
    ];
    for (passed, message) in checks {
        if !passed {
            return Err(format!("{}\n{}", message, describe(&output)));
        }
    }
    Ok(())
}

#[test]
fn e2e_fixed_file_reports() -> Result<(), String> {
    let Some((url, _server)) = spawn_http_server_or_skip()? else {
        return Ok(());
    };
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let base = dir.path().join("reports").join("run");
    let base = base.to_string_lossy().into_owned();

    let mut args = fixed_args(&url, "2", "3");
    args.extend([
        "--output-format".to_owned(),
        "all".to_owned(),
        "--output-file".to_owned(),
        base.clone(),
    ]);
    let output = run_surge(args)?;
    if !output.status.success() {
        return Err(describe(&output));
    }

    for suffix in ["_summary.csv", "_detailed.csv", "_metrics.csv", ".json", ".html"] {
        let path = format!("{}{}", base, suffix);
        let meta = fs::metadata(&path).map_err(|err| format!("{} missing: {}", path, err))?;
        if meta.len() == 0 {
            return Err(format!("{} is empty", path));
        }
    }

    let json = fs::read_to_string(format!("{}.json", base))
        .map_err(|err| format!("read json failed: {}", err))?;
    let document: serde_json::Value =
        serde_json::from_str(&json).map_err(|err| format!("parse json failed: {}", err))?;
    let summary = fs::read_to_string(format!("{}_summary.csv", base))
        .map_err(|err| format!("read summary failed: {}", err))?;

    let checks = [
        (document["summary"]["total_requests"] == 6, "json total"),
        (document["summary"]["failed_requests"] == 0, "json failures"),
        (document["test_info"]["mode"] == "fixed", "json mode"),
        (document["status_codes"][0]["name"] == "200", "json status name"),
        (summary.starts_with("Metric,Value"), "csv header"),
        (summary.lines().any(|line| line == "Total Requests,6"), "csv total"),
        (
            String::from_utf8_lossy(&output.stdout).contains("JSON Reporter: Results saved to"),
            "save notice",
        ),
    ];
    for (passed, message) in checks {
        if !passed {
            return Err(format!("{}\n{}", message, json));
        }
    }
    Ok(())
}

#[test]
fn e2e_failed_validation_is_counted_not_fatal() -> Result<(), String> {
    let Some((url, _server)) = spawn_http_server_or_skip()? else {
        return Ok(());
    };
    let mut args = fixed_args(&url, "1", "2");
    args.extend(["--validate-status".to_owned(), "201".to_owned()]);

    let output = run_surge(args)?;
    if !output.status.success() {
        return Err(describe(&output));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.contains("Failed Requests: 2 (100.0%)") || !stdout.contains("validation_failed") {
        return Err(describe(&output));
    }
    Ok(())
}

#[test]
fn e2e_invalid_url_exits_with_config_error() -> Result<(), String> {
    let output = run_surge(["ftp://example.com"])?;
    if output.status.success() {
        return Err(describe(&output));
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.contains("URL scheme must be http, https, ws, or wss") {
        return Err(describe(&output));
    }
    Ok(())
}
