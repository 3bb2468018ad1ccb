use crate::ast::Rule;
use crate::error::Ctx19Error;
use crate::serialization::rule_to_value;
use log::debug;
use serde::ser::{SerializeSeq, Serializer as _};
use serde_json::ser::PrettyFormatter;
use std::io::Write;

/// Writes `rules` to `output` as one pretty-printed JSON array, one element
/// per rule, as each rule arrives.
///
/// Stops at the first error; whatever was already written is then not a
/// complete document and should be discarded by the caller.
///
/// # Errors
/// The first error produced by `rules`, or a failure writing to `output`.
pub fn emit_json<W, I>(output: W, rules: I) -> Result<usize, Ctx19Error>
where
    W: Write,
    I: IntoIterator<Item = Result<Rule, Ctx19Error>>,
{
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = serde_json::Serializer::with_formatter(output, formatter);
    let mut count = 0;

    let mut seq = (&mut serializer).serialize_seq(None)?;
    for rule in rules {
        let rule = rule?;
        seq.serialize_element(&rule_to_value(&rule))?;
        count += 1;
    }
    seq.end()?;

    let mut output = serializer.into_inner();
    output.write_all(b"\n")?;
    output.flush()?;
    debug!("emitted {count} rule(s) as JSON");
    Ok(count)
}
