use crate::ast::*;
use crate::error::Ctx19Error;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;
use std::marker::PhantomData;

/// A map in document order, repeated keys included.
struct Ordered<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Ordered<V> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Ordered<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with string keys")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// One element of the emitted array, before it is checked against the
/// rule grammar.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleShape {
    #[serde(rename = "if")]
    condition: Ordered<Ordered<serde_json::Value>>,
    #[serde(rename = "then", default)]
    consequence: Option<Ordered<serde_json::Value>>,
}

pub(crate) fn rules_from_json(text: &str) -> Result<Vec<Rule>, Ctx19Error> {
    let shapes: Vec<RuleShape> = serde_json::from_str(text)?;
    rules_from_shapes(shapes)
}

pub(crate) fn rules_from_yaml(text: &str) -> Result<Vec<Rule>, Ctx19Error> {
    let shapes: Vec<RuleShape> = serde_yaml::from_str(text)?;
    rules_from_shapes(shapes)
}

fn rules_from_shapes(shapes: Vec<RuleShape>) -> Result<Vec<Rule>, Ctx19Error> {
    shapes
        .into_iter()
        .enumerate()
        .map(|(i, shape)| {
            rule_from_shape(shape).map_err(|reason| Ctx19Error::InvalidRule {
                index: i + 1,
                reason,
            })
        })
        .collect()
}

/// Checks a rule against everything the text grammar can express, so that
/// rendering it gives a file that parses back to the same rule.
fn rule_from_shape(shape: RuleShape) -> Result<Rule, String> {
    if shape.condition.0.is_empty() {
        return Err("`if` has no selectors".to_string());
    }

    let mut clauses: Vec<SelectorClause> = Vec::new();
    for (name, fields) in shape.condition.0 {
        check_words(&name, "selector name")?;
        if clauses.iter().any(|c| c.selector.name == name) {
            return Err(format!("selector `{name}` appears twice"));
        }

        let mut position = None;
        let mut rest = Vec::new();
        for (key, value) in fields.0 {
            if key != "position" {
                rest.push((key, value));
            } else if position.is_some() {
                return Err(format!("selector `{name}` has two positions"));
            } else {
                position = Some(position_from(&name, &value)?);
            }
        }
        let position = position.ok_or_else(|| format!("selector `{name}` has no position"))?;

        clauses.push(SelectorClause {
            selector: Selector {
                kind: kind_for(&name, position),
                name,
            },
            properties: properties_from(rest)?,
        });
    }

    let consequence = match shape.consequence {
        Some(then) => Some(Consequence {
            properties: properties_from(then.0)?,
        }),
        None => None,
    };

    Ok(Rule {
        condition: Condition { clauses },
        consequence,
        line: 0,
    })
}

fn position_from(name: &str, value: &serde_json::Value) -> Result<u32, String> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("position of `{name}` must be a whole number from 1, not {value}"))
}

/// Keywords at position 1 stay bare; other positions get the ordinal word
/// when there is one.
fn kind_for(name: &str, position: u32) -> SelectorKind {
    if position == 1 && KEYWORDS.contains(&name) {
        SelectorKind::Keyword
    } else if ordinal_word(position).is_some() {
        SelectorKind::Word(position)
    } else {
        SelectorKind::Numeric(position)
    }
}

fn properties_from(entries: Vec<(String, serde_json::Value)>) -> Result<Vec<Property>, String> {
    let mut properties: Vec<Property> = Vec::new();
    for (name, value) in entries {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(format!("property name `{name}` must be a single word"));
        }
        if properties.iter().any(|p| p.name == name) {
            return Err(format!("property `{name}` appears twice"));
        }
        let value = property_value_from(&name, value)?;
        properties.push(Property { name, value });
    }
    Ok(properties)
}

fn property_value_from(name: &str, value: serde_json::Value) -> Result<PropertyValue, String> {
    use serde_json::Value as Json;

    let value = match value {
        Json::String(text) => PropertyValue::Raw(text),
        Json::Number(number) => PropertyValue::Raw(number.to_string()),
        Json::Array(pair) => match <[Json; 2]>::try_from(pair) {
            Ok([Json::Bool(positive), Json::String(text)]) => {
                // `x is not y` always reads as a negation.
                if positive && text.starts_with("not ") {
                    return Err(format!(
                        "value of `{name}` starts with `not` and would read as a negation"
                    ));
                }
                PropertyValue::Boolean(positive, text)
            }
            _ => return Err(format!("`{name}` must be a [bool, string] pair")),
        },
        other => {
            return Err(format!(
                "`{name}` must be a string, a number or a [bool, string] pair, not {other}"
            ))
        }
    };

    let text = match &value {
        PropertyValue::Boolean(_, text) | PropertyValue::Raw(text) => text,
    };
    check_words(text, "value")?;
    Ok(value)
}

/// Words separated by single spaces, as the line grammar splits them.
fn check_words(text: &str, what: &str) -> Result<(), String> {
    if text
        .split(' ')
        .any(|word| word.is_empty() || word.contains(char::is_whitespace))
    {
        return Err(format!(
            "{what} `{text}` must be words separated by single spaces"
        ));
    }
    Ok(())
}
