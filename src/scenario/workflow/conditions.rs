use regex::Regex;
use serde_json::Value;

use crate::protocol::OutcomeRecord;

use super::expr::{CompareOp, Operand};
use super::step::{ConditionCheck, ConditionKind};
use super::template::{Bindings, display_value};

/// Evaluates a post-response check. Status and variable checks read as
/// `value <op> actual`, so `{"operator": "<", "value": 400}` holds for any
/// status above 400.
///
/// # Errors
///
/// Returns a description when the check itself is malformed (unknown
/// operator, invalid regex, missing variable name).
pub fn check(
    condition: &ConditionCheck,
    record: &OutcomeRecord,
    bindings: &Bindings,
) -> Result<bool, String> {
    let expected = condition.value.clone().unwrap_or(Value::Null);
    match condition.kind {
        ConditionKind::Status => {
            let actual = record
                .status
                .map_or(Operand::Null, |status| Operand::Int(i64::from(status)));
            compare(condition.operator.as_deref(), &actual, &expected)
        }
        ConditionKind::Variable => {
            let name = condition
                .variable
                .as_deref()
                .ok_or_else(|| "variable condition without a variable name".to_owned())?;
            let actual = bindings.get(name).map_or(Operand::Null, Operand::from_value);
            compare(condition.operator.as_deref(), &actual, &expected)
        }
        ConditionKind::Content => {
            let needle = display_value(&expected);
            let body = record.body_text().unwrap_or_default();
            match condition.operator.as_deref().unwrap_or("contains") {
                "contains" => Ok(body.contains(needle.as_str())),
                "not_contains" => Ok(!body.contains(needle.as_str())),
                "regex" => Regex::new(&needle)
                    .map(|pattern| pattern.is_match(&body))
                    .map_err(|err| format!("invalid content regex '{}': {}", needle, err)),
                other => Err(format!("unknown content operator '{}'", other)),
            }
        }
    }
}

fn compare(operator: Option<&str>, actual: &Operand, expected: &Value) -> Result<bool, String> {
    let symbol = operator.unwrap_or("==");
    let op = CompareOp::parse(symbol).ok_or_else(|| format!("unknown operator '{}'", symbol))?;
    Ok(op.apply(&Operand::from_value(expected), actual))
}
