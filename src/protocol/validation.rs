use regex::Regex;
use serde_json::Value;

use crate::jsonpath::JsonPath;

/// Response checks applied to every protocol-level success. Patterns are
/// compiled once when settings are built.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidation {
    pub status: Option<u16>,
    pub text: Option<String>,
    pub regex: Option<Regex>,
    pub json_path: Option<JsonPath>,
    pub json_value: Option<String>,
}

impl ResponseValidation {
    /// Whether any rule inspects the body, so adapters know to read it.
    #[must_use]
    pub const fn requires_body(&self) -> bool {
        self.text.is_some() || self.regex.is_some() || self.json_path.is_some()
    }

    /// Checks the response, returning the failure reason of the first rule
    /// that does not hold.
    ///
    /// # Errors
    ///
    /// Returns the reason string (e.g. `status_code:500!=200`) of the first
    /// failing rule.
    pub fn validate(&self, status: u16, body: Option<&str>) -> Result<(), String> {
        if let Some(expected) = self.status
            && status != expected
        {
            return Err(format!("status_code:{}!={}", status, expected));
        }

        let Some(body) = body else {
            return Ok(());
        };

        if let Some(text) = self.text.as_deref()
            && !body.contains(text)
        {
            return Err("text_not_found".to_owned());
        }

        if let Some(regex) = self.regex.as_ref()
            && !regex.is_match(body)
        {
            return Err("regex_not_matched".to_owned());
        }

        if let Some(path) = self.json_path.as_ref() {
            let document: Value =
                serde_json::from_str(body).map_err(|_decode_err| "invalid_json".to_owned())?;
            let matches = path.find(&document);
            if matches.is_empty() {
                return Err("json_path_not_found".to_owned());
            }
            if let Some(raw) = self.json_value.as_deref() {
                let expected = serde_json::from_str::<Value>(raw)
                    .unwrap_or_else(|_not_json| Value::String(raw.to_owned()));
                if !matches.iter().any(|found| **found == expected) {
                    return Err("json_value_mismatch".to_owned());
                }
            }
        }

        Ok(())
    }
}
