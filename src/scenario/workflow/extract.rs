use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::jsonpath::JsonPath;
use crate::protocol::OutcomeRecord;

use super::step::{ExtractKind, ExtractRule, ExtractSpec, OrderedMap, RegexGroup};
use super::template::Bindings;

/// A compiled extraction rule.
#[derive(Debug, Clone)]
pub enum Extractor {
    JsonPath(JsonPath),
    Regex { pattern: Regex, group: RegexGroup },
    Header(String),
    Cookie(String),
    Status,
}

impl Extractor {
    /// Compiles one rule.
    ///
    /// # Errors
    ///
    /// Returns a description when a required field is missing or a path or
    /// pattern does not compile.
    pub fn compile(rule: &ExtractRule) -> Result<Self, String> {
        match rule {
            ExtractRule::JsonPath(path) => compile_path(path),
            ExtractRule::Spec(spec) => compile_spec(spec),
        }
    }

    #[must_use]
    pub const fn needs_body(&self) -> bool {
        matches!(self, Extractor::JsonPath(_) | Extractor::Regex { .. })
    }

    /// Finds this extractor's value in the response, if present.
    #[must_use]
    pub fn extract(&self, record: &OutcomeRecord, document: Option<&Value>) -> Option<Value> {
        match self {
            Extractor::JsonPath(path) => document.and_then(|doc| path.first(doc)).cloned(),
            Extractor::Regex { pattern, group } => {
                let body = record.body_text()?;
                let captures = pattern.captures(&body)?;
                let matched = match group {
                    RegexGroup::Index(index) => captures.get(*index),
                    RegexGroup::Name(name) => captures.name(name),
                }?;
                Some(Value::String(matched.as_str().to_owned()))
            }
            Extractor::Header(name) => record
                .header(name)
                .map(|value| Value::String(value.to_owned())),
            Extractor::Cookie(name) => record
                .cookies
                .get(name)
                .map(|value| Value::String(value.clone())),
            Extractor::Status => Some(Value::from(record.status.unwrap_or(0))),
        }
    }
}

fn compile_path(path: &str) -> Result<Extractor, String> {
    JsonPath::parse(path)
        .map(Extractor::JsonPath)
        .map_err(|err| format!("invalid JSON path '{}': {}", path, err))
}

fn compile_spec(spec: &ExtractSpec) -> Result<Extractor, String> {
    match spec.kind {
        ExtractKind::JsonPath => {
            let path = spec
                .path
                .as_deref()
                .ok_or_else(|| "jsonpath rule without 'path'".to_owned())?;
            compile_path(path)
        }
        ExtractKind::Regex => {
            let raw = spec
                .pattern
                .as_deref()
                .ok_or_else(|| "regex rule without 'pattern'".to_owned())?;
            let pattern =
                Regex::new(raw).map_err(|err| format!("invalid regex '{}': {}", raw, err))?;
            Ok(Extractor::Regex {
                pattern,
                group: spec.group.clone().unwrap_or(RegexGroup::Index(0)),
            })
        }
        ExtractKind::Header => spec
            .name
            .clone()
            .map(Extractor::Header)
            .ok_or_else(|| "header rule without 'name'".to_owned()),
        ExtractKind::Cookie => spec
            .name
            .clone()
            .map(Extractor::Cookie)
            .ok_or_else(|| "cookie rule without 'name'".to_owned()),
        ExtractKind::Status => Ok(Extractor::Status),
    }
}

/// Compiles a step's rules, dropping the malformed ones.
#[must_use]
pub fn compile_rules(step_index: usize, rules: &OrderedMap<ExtractRule>) -> Vec<(String, Extractor)> {
    rules
        .iter()
        .filter_map(|(name, rule)| match Extractor::compile(rule) {
            Ok(extractor) => Some((name.to_owned(), extractor)),
            Err(err) => {
                debug!("Step {} extraction '{}' skipped: {}", step_index, name, err);
                None
            }
        })
        .collect()
}

/// Applies extractors in declaration order. Misses leave bindings untouched.
pub fn apply(extractors: &[(String, Extractor)], record: &OutcomeRecord, bindings: &mut Bindings) {
    let needs_document = extractors
        .iter()
        .any(|(_, extractor)| matches!(extractor, Extractor::JsonPath(_)));
    let document = if needs_document {
        record
            .body_text()
            .and_then(|body| match serde_json::from_str::<Value>(&body) {
                Ok(document) => Some(document),
                Err(err) => {
                    debug!("JSON path extraction skipped, body is not JSON: {}", err);
                    None
                }
            })
    } else {
        None
    };

    for (name, extractor) in extractors {
        if let Some(value) = extractor.extract(record, document.as_ref()) {
            bindings.insert(name.clone(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> OutcomeRecord {
        let mut record = OutcomeRecord::new(1, "http://h/login", "POST");
        record.status = Some(201);
        record.body = Some(br#"{"data":{"token":"abc","ids":[4,5]}} order=77"#.to_vec());
        record
            .headers
            .insert("x-request-id".to_owned(), "req-9".to_owned());
        record.cookies.insert("sid".to_owned(), "s1".to_owned());
        record
    }

    fn rules(doc: Value) -> Result<OrderedMap<ExtractRule>, String> {
        serde_json::from_value(doc).map_err(|err| err.to_string())
    }

    #[test]
    fn extracts_from_every_source() -> Result<(), String> {
        let record = OutcomeRecord {
            body: Some(br#"{"data":{"token":"abc","ids":[4,5]}}"#.to_vec()),
            ..response()
        };
        let rules = rules(json!({
            "token": "$.data.token",
            "last_id": {"type": "jsonpath", "path": "$.data.ids[-1]"},
            "request": {"type": "header", "name": "X-Request-Id"},
            "session": {"type": "cookie", "name": "sid"},
            "code": {"type": "status"},
            "quoted": {"type": "regex", "pattern": "\"token\":\"(?P<tok>\\w+)\"", "group": "tok"}
        }))?;
        let extractors = compile_rules(0, &rules);
        let mut bindings = Bindings::new();
        apply(&extractors, &record, &mut bindings);

        let expected: Bindings = [
            ("token".to_owned(), json!("abc")),
            ("last_id".to_owned(), json!(5)),
            ("request".to_owned(), json!("req-9")),
            ("session".to_owned(), json!("s1")),
            ("code".to_owned(), json!(201)),
            ("quoted".to_owned(), json!("abc")),
        ]
        .into_iter()
        .collect();
        if bindings != expected {
            return Err(format!("Unexpected bindings: {:?}", bindings));
        }
        Ok(())
    }

    #[test]
    fn misses_leave_existing_bindings() -> Result<(), String> {
        let rules = rules(json!({
            "token": "$.nothing.here",
            "order": {"type": "regex", "pattern": "order=(\\d+)", "group": 1},
            "absent": {"type": "header", "name": "x-missing"}
        }))?;
        let extractors = compile_rules(0, &rules);
        let mut bindings: Bindings = [("token".to_owned(), json!("old"))].into_iter().collect();
        apply(&extractors, &response(), &mut bindings);

        if bindings.get("token") != Some(&json!("old")) {
            return Err("Miss should keep the previous value".to_owned());
        }
        if bindings.get("order") != Some(&json!("77")) {
            return Err(format!("Regex group not extracted: {:?}", bindings));
        }
        if bindings.contains_key("absent") {
            return Err("Missing header should not bind".to_owned());
        }
        Ok(())
    }

    #[test]
    fn malformed_rules_are_skipped() -> Result<(), String> {
        let rules = rules(json!({
            "bad_path": "$..deep",
            "bad_regex": {"type": "regex", "pattern": "("},
            "no_name": {"type": "header"},
            "ok": {"type": "status"}
        }))?;
        let extractors = compile_rules(2, &rules);
        let names: Vec<&str> = extractors.iter().map(|(name, _)| name.as_str()).collect();
        if names != vec!["ok"] {
            return Err(format!("Unexpected compiled rules: {:?}", names));
        }
        Ok(())
    }
}
