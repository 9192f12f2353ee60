use std::collections::BTreeMap;

use serde_json::Value;

/// A user's workflow variables.
pub type Bindings = BTreeMap<String, Value>;

/// Replaces every `${name}` whose name is bound. Unbound placeholders are
/// kept verbatim.
#[must_use]
pub fn render(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(rest.get(..start).unwrap_or_default());
        let after_open = rest.get(start.saturating_add(2)..).unwrap_or_default();
        let name_len = after_open
            .find(|ch: char| !is_word_char(ch))
            .unwrap_or(after_open.len());
        let name = after_open.get(..name_len).unwrap_or_default();
        let tail = after_open.get(name_len..).unwrap_or_default();

        if name.is_empty() || !tail.starts_with('}') {
            out.push_str("${");
            rest = after_open;
            continue;
        }

        match bindings.get(name) {
            Some(value) => out.push_str(&display_value(value)),
            None => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = tail.get(1..).unwrap_or_default();
    }
    out.push_str(rest);
    out
}

/// Strings render bare; everything else renders as JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_substitutes_bound_names_only() -> Result<(), String> {
        let bindings: Bindings = [
            ("token".to_owned(), json!("abc")),
            ("id".to_owned(), json!(42)),
            ("ok".to_owned(), json!(true)),
        ]
        .into_iter()
        .collect();
        let empty = Bindings::new();

        let cases = [
            ("${token}/path", &bindings, "abc/path"),
            ("${token}/path", &empty, "${token}/path"),
            ("/items/${id}?ok=${ok}", &bindings, "/items/42?ok=true"),
            ("${missing}-${token}", &bindings, "${missing}-abc"),
            ("cost: $5 and ${ unterminated", &bindings, "cost: $5 and ${ unterminated"),
            ("${}${token", &bindings, "${}${token"),
            ("no placeholders", &bindings, "no placeholders"),
        ];
        for (template, vars, expected) in cases {
            let rendered = render(template, vars);
            if rendered != expected {
                return Err(format!("{} -> {}", template, rendered));
            }
        }
        Ok(())
    }
}
