use crate::ast::{Property, PropertyValue, Rule, SelectorClause};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A JSON-shaped value. Objects keep their keys in insertion order, so
/// selectors and properties come out in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(serde_json::Number),
    Boolean(bool),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => n.serialize(serializer),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// `{ "if": { <selector>: { "position": N, ... } }, "then": { ... } }`
///
/// The `then` key is left out entirely when the rule has no `then` block.
pub(crate) fn rule_to_value(rule: &Rule) -> Value {
    let selectors = rule
        .condition
        .clauses
        .iter()
        .map(|clause| (clause.selector.name.clone(), clause_to_value(clause)))
        .collect();

    let mut entries = vec![("if".to_string(), Value::Object(selectors))];
    if let Some(consequence) = &rule.consequence {
        entries.push((
            "then".to_string(),
            properties_to_value(Vec::new(), &consequence.properties),
        ));
    }
    Value::Object(entries)
}

fn clause_to_value(clause: &SelectorClause) -> Value {
    let position = (
        "position".to_string(),
        Value::Number(clause.selector.position().into()),
    );
    properties_to_value(vec![position], &clause.properties)
}

fn properties_to_value(mut entries: Vec<(String, Value)>, properties: &[Property]) -> Value {
    entries.extend(
        properties
            .iter()
            .map(|p| (p.name.clone(), property_value(&p.value))),
    );
    Value::Object(entries)
}

fn property_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Boolean(positive, text) => Value::Array(vec![
            Value::Boolean(*positive),
            Value::String(text.clone()),
        ]),
        PropertyValue::Raw(text) => raw_value(text),
    }
}

/// `becomes` values are numbers when they read as a JSON number literal and
/// strings otherwise. Numbers keep their exact source text, so `1e999` or a
/// 30-digit integer come out the way they were written.
pub(crate) fn raw_value(text: &str) -> Value {
    if is_json_number(text) {
        if let Ok(number) = text.parse::<serde_json::Number>() {
            return Value::Number(number);
        }
    }
    Value::String(text.to_string())
}

/// `-? (0 | [1-9][0-9]*) (. [0-9]+)? ([eE] [+-]? [0-9]+)?`
fn is_json_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            digits(&mut i);
        }
        _ => return false,
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        if digits(&mut i) == 0 {
            return false;
        }
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}

/// The same tree as a YAML document.
///
/// YAML has no arbitrary-precision numbers. A number stays a YAML int or
/// float when that represents the written value exactly, and becomes a
/// string holding the original text otherwise.
pub(crate) fn yaml_value(value: &Value) -> serde_yaml::Value {
    match value {
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Number(n) => yaml_number(n),
        Value::Boolean(b) => serde_yaml::Value::Bool(*b),
        Value::Array(items) => serde_yaml::Value::Sequence(items.iter().map(yaml_value).collect()),
        Value::Object(entries) => serde_yaml::Value::Mapping(
            entries
                .iter()
                .map(|(key, value)| (serde_yaml::Value::String(key.clone()), yaml_value(value)))
                .collect(),
        ),
    }
}

fn yaml_number(number: &serde_json::Number) -> serde_yaml::Value {
    let text = number.to_string();
    if let Some(n) = number.as_u64().filter(|n| n.to_string() == text) {
        return serde_yaml::Value::Number(n.into());
    }
    if let Some(n) = number.as_i64().filter(|n| n.to_string() == text) {
        return serde_yaml::Value::Number(n.into());
    }
    if let Some(f) = number.as_f64().filter(|f| f.is_finite()) {
        let digits = decimal_digits(&text);
        if digits.is_some() && digits == decimal_digits(&format!("{f:e}")) {
            return serde_yaml::Value::Number(f.into());
        }
    }
    serde_yaml::Value::String(text)
}

/// Sign, significant digits and decimal point position of a number literal,
/// so that `0.75`, `0.750` and `7.5e-1` compare equal.
fn decimal_digits(text: &str) -> Option<(bool, String, i64)> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match rest.find(['e', 'E']) {
        Some(i) => (&rest[..i], rest[i + 1..].parse::<i64>().ok()?),
        None => (rest, 0),
    };
    let (int, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{int}{frac}");
    let significant = digits.trim_start_matches('0');
    let leading_zeros = digits.len() - significant.len();
    let significant = significant.trim_end_matches('0');
    if significant.is_empty() {
        return Some((negative, String::new(), 0));
    }
    let point = (int.len() as i64)
        .checked_add(exponent)?
        .checked_sub(leading_zeros as i64)?;
    Some((negative, significant.to_string(), point))
}
