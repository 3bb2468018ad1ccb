use crate::ast::Rule;
use crate::emitter::emit_json;
use crate::error::Ctx19Error;
use crate::loader::{rules_from_json, rules_from_yaml};
use crate::parser::Parser;
use crate::render::render_rules;
use crate::serialization::{rule_to_value, yaml_value, Value};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// The shapes a rule set can be read from and written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Yaml,
    /// The tab-indented source format itself, normalized.
    Ctx19,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "ctx19" => Ok(Format::Ctx19),
            other => Err(format!(
                "unknown format `{other}` (expected json, yaml or ctx19)"
            )),
        }
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Ctx19 => "ctx19",
        };
        write!(f, "{name}")
    }
}

/// Every rule of a source file, held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl Serialize for RuleSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

impl RuleSet {
    /// Reads rules back from the JSON shape [`RuleSet::to_json`] writes.
    ///
    /// Number values keep their text. Selectors get the ordinal word for
    /// positions 1 to 5 and a numeric ordinal above that; `end`,
    /// `beginning` and `token` at position 1 stay bare.
    ///
    /// # Errors
    /// `Ctx19Error::Json` if the document is not that shape,
    /// `Ctx19Error::InvalidRule` if a rule has no ctx19 spelling.
    pub fn from_json(text: &str) -> Result<Self, Ctx19Error> {
        Ok(RuleSet {
            rules: rules_from_json(text)?,
        })
    }

    /// Like [`RuleSet::from_json`], for the YAML shape.
    ///
    /// # Errors
    /// `Ctx19Error::Yaml` or `Ctx19Error::InvalidRule`.
    pub fn from_yaml(text: &str) -> Result<Self, Ctx19Error> {
        Ok(RuleSet {
            rules: rules_from_yaml(text)?,
        })
    }

    /// The rule set as a JSON-shaped array, one object per rule.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Array(self.rules.iter().map(rule_to_value).collect())
    }

    /// Serializes the rules into a pretty-printed JSON string.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self)
    }

    /// Serializes the rules into a YAML string.
    ///
    /// # Errors
    /// Returns a `serde_yaml::Error` if serialization fails.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&yaml_value(&self.to_value()))
    }

    /// Renders the rules back into the source format.
    #[must_use]
    pub fn to_ctx19(&self) -> String {
        render_rules(&self.rules)
    }

    /// Writes the rules to `output` in `format`.
    ///
    /// # Errors
    /// Returns a `Ctx19Error` if encoding or writing fails.
    pub fn write_to<W: Write>(&self, mut output: W, format: Format) -> Result<(), Ctx19Error> {
        match format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut output, self)?;
                output.write_all(b"\n")?;
            }
            Format::Yaml => serde_yaml::to_writer(&mut output, &yaml_value(&self.to_value()))?,
            Format::Ctx19 => output.write_all(self.to_ctx19().as_bytes())?,
        }
        output.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parses a whole rule file held in memory.
///
/// # Arguments
///
/// * `source` - The rule file contents.
/// * `file_name` - The name shown in error reports.
///
/// # Errors
///
/// Returns a `Ctx19Error` for the first malformed or truncated line.
pub fn parse_rules(source: &str, file_name: &str) -> Result<RuleSet, Ctx19Error> {
    let rules = Parser::new_with_name(source, file_name).parse_rules()?;
    Ok(RuleSet { rules })
}

/// Translates a rule stream into a JSON array on `output`, one rule at a
/// time, and returns how many rules were written.
///
/// # Errors
///
/// Fails on the first parse error or on any read/write failure. The output
/// is incomplete in that case.
///
/// Output is written rule by rule, but the reader keeps the input consumed
/// so far for error reports, so memory still grows with the input size.
pub fn translate<R: BufRead, W: Write>(
    input: R,
    output: W,
    file_name: &str,
) -> Result<usize, Ctx19Error> {
    emit_json(output, Parser::from_reader(input, file_name))
}

/// Like [`translate`], for any [`Format`]. Only JSON is streamed; the
/// other formats are written once the whole input has been parsed.
///
/// # Errors
///
/// See [`translate`].
pub fn translate_to<R: BufRead, W: Write>(
    input: R,
    output: W,
    file_name: &str,
    format: Format,
) -> Result<usize, Ctx19Error> {
    if format == Format::Json {
        return translate(input, output, file_name);
    }

    let rule_set = RuleSet {
        rules: Parser::from_reader(input, file_name).parse_rules()?,
    };
    rule_set.write_to(output, format)?;
    Ok(rule_set.len())
}

/// Reads rules in `from` and writes them in `to`, returning how many rules
/// were converted. ctx19 input goes through [`translate_to`]; JSON and YAML
/// input is read whole first.
///
/// # Errors
///
/// See [`translate`] and [`RuleSet::from_json`].
pub fn convert<R: BufRead, W: Write>(
    mut input: R,
    output: W,
    file_name: &str,
    from: Format,
    to: Format,
) -> Result<usize, Ctx19Error> {
    let mut text = String::new();
    let rule_set = match from {
        Format::Ctx19 => return translate_to(input, output, file_name, to),
        Format::Json => {
            input.read_to_string(&mut text)?;
            RuleSet::from_json(&text)?
        }
        Format::Yaml => {
            input.read_to_string(&mut text)?;
            RuleSet::from_yaml(&text)?
        }
    };
    rule_set.write_to(output, to)?;
    Ok(rule_set.len())
}
