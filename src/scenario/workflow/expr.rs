//! Closed-grammar boolean expressions for conditional branching.
//!
//! Grammar: `operand (op operand)?` where `op` is one of `== != >= <= > <`
//! and an operand is a bound variable, a number, `true`/`false`/`null`, or a
//! string (optionally quoted). Nothing is ever executed.
use std::cmp::Ordering;

use serde_json::Value;

use super::template::{Bindings, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

impl CompareOp {
    /// Split order: two-character operators before their one-character prefixes.
    const SPLIT_ORDER: [CompareOp; 6] = [
        CompareOp::Eq,
        CompareOp::Ne,
        CompareOp::Ge,
        CompareOp::Le,
        CompareOp::Gt,
        CompareOp::Lt,
    ];

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Ge => ">=",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
        }
    }

    #[must_use]
    pub fn parse(symbol: &str) -> Option<Self> {
        Self::SPLIT_ORDER
            .into_iter()
            .find(|op| op.symbol() == symbol.trim())
    }

    /// Applies the operator. Mismatched types are unequal and unordered.
    #[must_use]
    pub fn apply(self, left: &Operand, right: &Operand) -> bool {
        let ordering = left.compare(right);
        match self {
            CompareOp::Eq => ordering == Some(Ordering::Equal),
            CompareOp::Ne => ordering != Some(Ordering::Equal),
            CompareOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Gt => ordering == Some(Ordering::Greater),
            CompareOp::Lt => ordering == Some(Ordering::Less),
        }
    }
}

/// Typed scalar produced from a literal or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Operand {
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Operand::Null,
            Value::Bool(flag) => Operand::Bool(*flag),
            Value::Number(number) => number
                .as_i64()
                .map(Operand::Int)
                .or_else(|| number.as_f64().map(Operand::Float))
                .unwrap_or(Operand::Null),
            Value::String(text) => Operand::Str(text.clone()),
            Value::Array(_) | Value::Object(_) => Operand::Str(value.to_string()),
        }
    }

    /// Parses a literal token without consulting variables.
    #[must_use]
    pub fn literal(token: &str) -> Self {
        let token = token.trim();
        if token.contains('.') {
            if let Ok(number) = token.parse::<f64>() {
                return Operand::Float(number);
            }
        } else if let Ok(number) = token.parse::<i64>() {
            return Operand::Int(number);
        }
        match token.to_ascii_lowercase().as_str() {
            "true" => return Operand::Bool(true),
            "false" => return Operand::Bool(false),
            "null" => return Operand::Null,
            _ => {}
        }
        Operand::Str(unquote(token).to_owned())
    }

    fn resolve(token: &str, bindings: &Bindings) -> Self {
        let token = token.trim();
        match bindings.get(token) {
            Some(value) => Operand::from_value(value),
            None => Operand::literal(token),
        }
    }

    fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self, other) {
            (Operand::Null, Operand::Null) => Some(Ordering::Equal),
            (Operand::Bool(a), Operand::Bool(b)) => Some(a.cmp(b)),
            (Operand::Int(a), Operand::Int(b)) => Some(a.cmp(b)),
            (Operand::Float(a), Operand::Float(b)) => a.partial_cmp(b),
            (Operand::Int(a), Operand::Float(b)) => (*a as f64).partial_cmp(b),
            (Operand::Float(a), Operand::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(b)),
            (
                Operand::Null | Operand::Bool(_) | Operand::Int(_) | Operand::Float(_) | Operand::Str(_),
                _,
            ) => None,
        }
    }

    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Operand::Null => false,
            Operand::Bool(flag) => *flag,
            Operand::Int(number) => *number != 0,
            Operand::Float(number) => number.is_normal() || number.is_subnormal(),
            Operand::Str(text) => !text.is_empty(),
        }
    }
}

fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = token
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    token
}

fn is_quoted(token: &str) -> bool {
    token.len() >= 2
        && ((token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('\'') && token.ends_with('\'')))
}

/// Evaluates a branch expression against the user's bindings. Templates are
/// resolved first; anything unparsable is false.
#[must_use]
pub fn evaluate(expr: &str, bindings: &Bindings) -> bool {
    let resolved = render(expr, bindings);
    let trimmed = resolved.trim();

    if let Some(value) = bindings.get(trimmed) {
        return Operand::from_value(value).truthy();
    }

    for op in CompareOp::SPLIT_ORDER {
        if let Some((left, right)) = trimmed.split_once(op.symbol()) {
            let left = Operand::resolve(left, bindings);
            let right = Operand::resolve(right, bindings);
            return op.apply(&left, &right);
        }
    }

    match Operand::literal(trimmed) {
        Operand::Str(_) if !is_quoted(trimmed) => false,
        operand @ (Operand::Null
        | Operand::Bool(_)
        | Operand::Int(_)
        | Operand::Float(_)
        | Operand::Str(_)) => operand.truthy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bindings() -> Bindings {
        [
            ("status".to_owned(), json!(200)),
            ("role".to_owned(), json!("admin")),
            ("ratio".to_owned(), json!(0.75)),
            ("ready".to_owned(), json!(true)),
            ("empty".to_owned(), json!("")),
            ("missing_value".to_owned(), Value::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn comparisons_against_variables_and_literals() -> Result<(), String> {
        let vars = bindings();
        let cases = [
            ("status == 200", true),
            ("status != 200", false),
            ("status >= 200", true),
            ("status < 300", true),
            ("status > 200.5", false),
            ("ratio <= 0.75", true),
            ("ratio == 0.75", true),
            ("role == admin", true),
            ("role == 'admin'", true),
            ("role == \"user\"", false),
            ("role > 200", false),
            ("role != 200", true),
            ("missing_value == null", true),
            ("ready == TRUE", true),
            ("${status} == 200", true),
            ("unbound == unbound", true),
            ("unbound > 3", false),
        ];
        for (expr, expected) in cases {
            if evaluate(expr, &vars) != expected {
                return Err(format!("'{}' should be {}", expr, expected));
            }
        }
        Ok(())
    }

    #[test]
    fn bare_operands_use_truthiness() -> Result<(), String> {
        let vars = bindings();
        let cases = [
            ("ready", true),
            ("empty", false),
            ("missing_value", false),
            ("status", true),
            ("1", true),
            ("0", false),
            ("true", true),
            ("null", false),
            ("'text'", true),
            ("__import__('os')", false),
            ("", false),
        ];
        for (expr, expected) in cases {
            if evaluate(expr, &vars) != expected {
                return Err(format!("'{}' should be {}", expr, expected));
            }
        }
        Ok(())
    }

    #[test]
    fn operator_parse_accepts_known_symbols() -> Result<(), String> {
        if CompareOp::parse(" >= ") != Some(CompareOp::Ge) {
            return Err("Expected >= to parse".to_owned());
        }
        if CompareOp::parse("=~").is_some() {
            return Err("Unexpected operator accepted".to_owned());
        }
        Ok(())
    }
}
