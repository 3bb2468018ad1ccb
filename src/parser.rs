use crate::ast::*;
use crate::error::{Ctx19Error, ParseError};
use crate::reader::LineReader;
use log::{debug, trace};
use std::io::BufRead;

const IF_MARKER: &[u8] = b"if\n";
const THEN_MARKER: &[u8] = b"then\n";
const SELECTOR_INDENT: &[u8] = b"\t";
const PROPERTY_INDENT: &[u8] = b"\t\t";

/// Recognizer for the three-level rule grammar:
///
/// ```text
/// Rule        ::= "if" NL Clause { Clause } [ Consequence ]
/// Clause      ::= TAB Selector NL { TAB TAB Property NL }
/// Consequence ::= "then" NL { TAB Property NL }
/// ```
///
/// Rules are produced one at a time; the parser never holds more than the
/// rule it is building.
pub struct Parser<R> {
    reader: LineReader<R>,
    finished: bool,
}

impl<'a> Parser<&'a [u8]> {
    pub fn new(source: &'a str) -> Self {
        Self::new_with_name(source, "source.ctx19")
    }

    pub fn new_with_name(source: &'a str, name: impl Into<String>) -> Self {
        Self::from_reader(source.as_bytes(), name)
    }
}

impl<R: BufRead> Parser<R> {
    pub fn from_reader(input: R, name: impl Into<String>) -> Self {
        Self {
            reader: LineReader::new(input, name),
            finished: false,
        }
    }

    /// Parses the whole input.
    pub fn parse_rules(&mut self) -> Result<Vec<Rule>, Ctx19Error> {
        let mut rules = Vec::new();
        while let Some(rule) = self.next_rule()? {
            rules.push(rule);
        }
        Ok(rules)
    }

    /// Rule ::= "if" NL Condition [ Consequence ]
    ///
    /// Returns `Ok(None)` once only blank lines remain.
    pub fn next_rule(&mut self) -> Result<Option<Rule>, Ctx19Error> {
        loop {
            if self.reader.at_end()? {
                return Ok(None);
            }
            let line = self.reader.line();
            if self.reader.accept(IF_MARKER)? {
                let condition = self.parse_condition()?;
                let consequence = self.parse_consequence()?;
                debug!(
                    "rule on line {line}: {} selector(s), then block: {}",
                    condition.clauses.len(),
                    consequence.is_some()
                );
                return Ok(Some(Rule {
                    condition,
                    consequence,
                    line,
                }));
            }

            let start = self.reader.offset();
            let text = self.reader.read_until(b'\n')?;
            if !text.trim().is_empty() {
                return Err(self.malformed(start, line, &text, "expected `if` to start a rule"));
            }
        }
    }

    /// Condition ::= Clause { Clause }
    fn parse_condition(&mut self) -> Result<Condition, Ctx19Error> {
        let mut clauses: Vec<SelectorClause> = Vec::new();
        while self.reader.accept(SELECTOR_INDENT)? {
            let start = self.reader.offset();
            let line = self.reader.line();
            let text = self.reader.read_until(b'\n')?;
            let selector = parse_selector(&text)
                .map_err(|reason| self.malformed(start, line, &text, reason))?;
            trace!("selector on line {line}: {selector:?}");

            if clauses.iter().any(|c| c.selector.name == selector.name) {
                return Err(ParseError::DuplicateSelector {
                    src: self.reader.source(),
                    span: (start, text.len()).into(),
                    name: selector.name,
                    line,
                }
                .into());
            }

            let properties = self.parse_properties(PROPERTY_INDENT, &["position"])?;
            clauses.push(SelectorClause {
                selector,
                properties,
            });
        }

        if clauses.is_empty() {
            return Err(self.missing_block("a selector clause indented by one tab"));
        }
        Ok(Condition { clauses })
    }

    /// Consequence ::= "then" NL { TAB Property NL }
    fn parse_consequence(&mut self) -> Result<Option<Consequence>, Ctx19Error> {
        if !self.reader.accept(THEN_MARKER)? {
            return Ok(None);
        }
        let properties = self.parse_properties(SELECTOR_INDENT, &[])?;
        Ok(Some(Consequence { properties }))
    }

    /// Reads property lines for as long as each starts with `indent`.
    /// Names in `reserved` are rejected as if they were already present.
    fn parse_properties(
        &mut self,
        indent: &[u8],
        reserved: &[&str],
    ) -> Result<Vec<Property>, Ctx19Error> {
        let mut properties: Vec<Property> = Vec::new();
        while self.reader.accept(indent)? {
            let start = self.reader.offset();
            let line = self.reader.line();
            let text = self.reader.read_until(b'\n')?;
            let property = parse_property(&text)
                .map_err(|reason| self.malformed(start, line, &text, reason))?;
            trace!("property on line {line}: {property:?}");

            if reserved.contains(&property.name.as_str())
                || properties.iter().any(|p| p.name == property.name)
            {
                return Err(ParseError::DuplicateProperty {
                    src: self.reader.source(),
                    span: (start, property.name.len()).into(),
                    name: property.name,
                    line,
                }
                .into());
            }
            properties.push(property);
        }
        Ok(properties)
    }

    /// Error for a block that must have at least one line but has none.
    fn missing_block(&mut self, expected: &str) -> Ctx19Error {
        match self.reader.at_end() {
            Ok(true) => self.reader.unexpected_eof(expected),
            Ok(false) => {
                let start = self.reader.offset();
                let line = self.reader.line();
                match self.reader.read_until(b'\n') {
                    Ok(text) => self.malformed(start, line, &text, &format!("expected {expected}")),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        }
    }

    fn malformed(&self, start: usize, line: usize, text: &str, reason: &str) -> Ctx19Error {
        ParseError::MalformedLine {
            src: self.reader.source(),
            span: (start, text.len()).into(),
            text: text.to_string(),
            reason: reason.to_string(),
            line,
        }
        .into()
    }
}

/// Yields rules until the input is exhausted or the first error, after
/// which it stays empty.
impl<R: BufRead> Iterator for Parser<R> {
    type Item = Result<Rule, Ctx19Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.next_rule().transpose();
        if !matches!(next, Some(Ok(_))) {
            self.finished = true;
        }
        next
    }
}

/// Selector ::= Word | Ordinal Word { " " Word }
///
/// A leading word that is not an ordinal still counts as position 1. A lone
/// ordinal (`5th`, `first`) names nothing and is rejected.
pub fn parse_selector(text: &str) -> Result<Selector, &'static str> {
    if text.starts_with(char::is_whitespace) {
        return Err("selector header is indented too deep");
    }
    let words: Vec<&str> = text.split(' ').collect();
    if words.iter().any(|w| w.is_empty()) {
        return Err("selector header has an empty word (stray or doubled space?)");
    }

    match words.as_slice() {
        [word] => {
            let kind = if KEYWORDS.contains(word) {
                SelectorKind::Keyword
            } else if let SelectorKind::Implicit(_) = parse_ordinal(word)? {
                SelectorKind::Implicit(None)
            } else {
                return Err("ordinal without a selector name after it");
            };
            Ok(Selector {
                kind,
                name: (*word).to_string(),
            })
        }
        [lead, rest @ ..] => Ok(Selector {
            kind: parse_ordinal(lead)?,
            name: rest.join(" "),
        }),
        [] => Err("empty selector header"),
    }
}

fn parse_ordinal(word: &str) -> Result<SelectorKind, &'static str> {
    if let Some(index) = ORDINAL_WORDS.iter().position(|w| *w == word) {
        return Ok(SelectorKind::Word(index as u32 + 1));
    }

    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()));

    match digits {
        Some(digits) => match digits.parse::<u32>() {
            Ok(0) => Err("ordinal positions start at 1"),
            Ok(n) => Ok(SelectorKind::Numeric(n)),
            Err(_) => Err("ordinal position is too large"),
        },
        None => Ok(SelectorKind::Implicit(Some(word.to_string()))),
    }
}

/// Property ::= Name " " ( "is" [ " not" ] | "becomes" ) " " Value
pub fn parse_property(text: &str) -> Result<Property, &'static str> {
    if text.starts_with(char::is_whitespace) {
        return Err("property line is indented too deep");
    }
    let words: Vec<&str> = text.split(' ').collect();
    if words.iter().any(|w| w.is_empty()) {
        return Err("property line has an empty word (stray or doubled space?)");
    }

    let (name, value) = match words.as_slice() {
        [name, "is", "not", value @ ..] if !value.is_empty() => {
            (name, PropertyValue::Boolean(false, value.join(" ")))
        }
        [name, "is", value @ ..] if !value.is_empty() => {
            (name, PropertyValue::Boolean(true, value.join(" ")))
        }
        [name, "becomes", value @ ..] if !value.is_empty() => {
            (name, PropertyValue::Raw(value.join(" ")))
        }
        [_, "is" | "becomes"] => return Err("missing value after the verb"),
        [_] => return Err("expected `<name> is|is not|becomes <value>`"),
        _ => return Err("unknown verb, expected `is`, `is not` or `becomes`"),
    };

    Ok(Property {
        name: (*name).to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Report;

    fn parse_ok(source: &str) -> Vec<Rule> {
        let mut parser = Parser::new_with_name(source, "test.ctx19");
        match parser.parse_rules() {
            Ok(rules) => rules,
            Err(err) => panic!("{:?}", Report::from(err)),
        }
    }

    fn parse_err(source: &str) -> ParseError {
        match Parser::new_with_name(source, "test.ctx19").parse_rules() {
            Err(Ctx19Error::Parse(err)) => err,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    fn boolean(name: &str, positive: bool, value: &str) -> Property {
        Property {
            name: name.to_string(),
            value: PropertyValue::Boolean(positive, value.to_string()),
        }
    }

    #[test]
    fn test_single_rule() {
        let rules = parse_ok("if\n\tfirst next\n\t\tcolor is red\nthen\n\taction becomes stop\n");
        assert_eq!(rules.len(), 1);
        let rule = &rules[0];
        assert_eq!(rule.line, 1);
        assert_eq!(rule.condition.clauses.len(), 1);

        let clause = &rule.condition.clauses[0];
        assert_eq!(clause.selector.kind, SelectorKind::Word(1));
        assert_eq!(clause.selector.name, "next");
        assert_eq!(clause.properties, vec![boolean("color", true, "red")]);

        let then = rule.consequence.as_ref().unwrap();
        assert_eq!(
            then.properties,
            vec![Property {
                name: "action".to_string(),
                value: PropertyValue::Raw("stop".to_string()),
            }]
        );
    }

    #[test]
    fn test_multiple_clauses_and_rules() {
        let source = "\
if
\tsecond previous
\t\tpos is noun
\t\tcase is not nom
\ttoken
\t\tpos is verb
then
\ttense becomes past

if
\t4th next
\t\tpos is adj
";
        let rules = parse_ok(source);
        assert_eq!(rules.len(), 2);

        let first = &rules[0];
        let names: Vec<_> = first
            .condition
            .clauses
            .iter()
            .map(|c| (c.selector.name.as_str(), c.selector.position()))
            .collect();
        assert_eq!(names, vec![("previous", 2), ("token", 1)]);
        assert_eq!(
            first.condition.clauses[0].properties,
            vec![boolean("pos", true, "noun"), boolean("case", false, "nom")]
        );
        assert_eq!(first.condition.clauses[1].selector.kind, SelectorKind::Keyword);

        let second = &rules[1];
        assert_eq!(second.line, 10);
        assert_eq!(second.condition.clauses[0].selector.kind, SelectorKind::Numeric(4));
        assert!(second.consequence.is_none());
    }

    #[test]
    fn test_clause_without_properties() {
        let rules = parse_ok("if\n\tend\n\tfirst next\n\t\tx is y\n");
        let clauses = &rules[0].condition.clauses;
        assert!(clauses[0].properties.is_empty());
        assert_eq!(clauses[1].properties.len(), 1);
    }

    #[test]
    fn test_empty_then_block() {
        let rules = parse_ok("if\n\ttoken\nthen\n");
        assert_eq!(rules[0].consequence, Some(Consequence::default()));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let rules = parse_ok("\n\nif\n\ttoken\n\n  \nif\n\tend\n\n");
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ok("").is_empty());
        assert!(parse_ok("\n").is_empty());
    }

    #[test]
    fn test_truncated_selector() {
        let err = parse_err("if\n\tfirst nex");
        assert!(matches!(err, ParseError::UnexpectedEndOfInput { line: 2, .. }));
    }

    #[test]
    fn test_if_without_clauses_at_end() {
        let err = parse_err("if\n");
        assert!(matches!(err, ParseError::UnexpectedEndOfInput { .. }));
    }

    #[test]
    fn test_if_followed_by_then() {
        let err = parse_err("if\nthen\n\tx becomes 1\n");
        match err {
            ParseError::MalformedLine { text, line, .. } => {
                assert_eq!(text, "then");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stray_top_level_line() {
        let err = parse_err("if\n\ttoken\nwhen\n");
        assert!(matches!(err, ParseError::MalformedLine { line: 3, .. }));
        assert_eq!(err.offset(), 10);
    }

    #[test]
    fn test_property_too_deep() {
        let err = parse_err("if\n\ttoken\n\t\t\tx is y\n");
        assert!(matches!(err, ParseError::MalformedLine { line: 3, .. }));
    }

    #[test]
    fn test_duplicate_selector() {
        let err = parse_err("if\n\tfirst token\n\tsecond token\n");
        match err {
            ParseError::DuplicateSelector { name, line, .. } => {
                assert_eq!(name, "token");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_property() {
        let err = parse_err("if\n\ttoken\n\t\tx is a\n\t\tx is not b\n");
        assert!(matches!(err, ParseError::DuplicateProperty { line: 4, .. }));

        let err = parse_err("if\n\ttoken\nthen\n\ty becomes 1\n\ty becomes 2\n");
        assert!(matches!(err, ParseError::DuplicateProperty { line: 5, .. }));
    }

    #[test]
    fn test_position_is_reserved_in_selectors_only() {
        let err = parse_err("if\n\ttoken\n\t\tposition is 3\n");
        assert!(matches!(err, ParseError::DuplicateProperty { .. }));

        let rules = parse_ok("if\n\ttoken\nthen\n\tposition becomes 3\n");
        assert_eq!(rules[0].consequence.as_ref().unwrap().properties[0].name, "position");
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let mut parser = Parser::new("if\n\ttoken\nbogus\nif\n\tend\n");
        assert!(matches!(parser.next(), Some(Ok(_))));
        assert!(matches!(parser.next(), Some(Err(_))));
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_selector_forms() {
        let cases = [
            ("first token", SelectorKind::Word(1), "token", 1),
            ("fifth next", SelectorKind::Word(5), "next", 5),
            ("3rd token", SelectorKind::Numeric(3), "token", 3),
            ("6th previous", SelectorKind::Numeric(6), "previous", 6),
            ("21st next", SelectorKind::Numeric(21), "next", 21),
            ("end", SelectorKind::Keyword, "end", 1),
            ("beginning", SelectorKind::Keyword, "beginning", 1),
            ("next", SelectorKind::Implicit(None), "next", 1),
            (
                "nearest noun",
                SelectorKind::Implicit(Some("nearest".to_string())),
                "noun",
                1,
            ),
            (
                "north token",
                SelectorKind::Implicit(Some("north".to_string())),
                "token",
                1,
            ),
        ];
        for (text, kind, name, position) in cases {
            let selector = parse_selector(text).unwrap();
            assert_eq!(selector.kind, kind, "{text}");
            assert_eq!(selector.name, name, "{text}");
            assert_eq!(selector.position(), position, "{text}");
        }
    }

    #[test]
    fn test_selector_errors() {
        assert!(parse_selector("").is_err());
        assert!(parse_selector("first  token").is_err());
        assert!(parse_selector("0th token").is_err());
        assert!(parse_selector("99999999999th token").is_err());
    }

    #[test]
    fn test_lone_ordinal_is_not_a_name() {
        for text in ["5th", "first", "21st", "fifth", "0th"] {
            assert!(parse_selector(text).is_err(), "{text}");
        }
        // Words that merely end like an ordinal are still names.
        assert_eq!(parse_selector("north").unwrap().kind, SelectorKind::Implicit(None));

        match parse_err("if\n\t5th\n\t\tpos is NOUN\n") {
            ParseError::MalformedLine { text, line, .. } => {
                assert_eq!(text, "5th");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            parse_err("if\n\ttoken\n\tfirst\n"),
            ParseError::MalformedLine { line: 3, .. }
        ));
    }

    #[test]
    fn test_invalid_utf8_line() {
        let input: &[u8] = b"if\n\tfirst n\xffxt\n";
        let mut parser = Parser::from_reader(input, "test.ctx19");
        match parser.parse_rules() {
            Err(Ctx19Error::Parse(ParseError::MalformedLine { line, span, .. })) => {
                assert_eq!(line, 2);
                assert_eq!(span.offset(), 4);
            }
            other => panic!("expected a malformed line, got {other:?}"),
        }
    }

    #[test]
    fn test_property_forms() {
        assert_eq!(parse_property("speed is fast").unwrap(), boolean("speed", true, "fast"));
        assert_eq!(
            parse_property("speed is not fast").unwrap(),
            boolean("speed", false, "fast")
        );
        assert_eq!(
            parse_property("speed becomes 5").unwrap().value,
            PropertyValue::Raw("5".to_string())
        );
        assert_eq!(
            parse_property("lemma is New York").unwrap(),
            boolean("lemma", true, "New York")
        );
        // `not` alone is the value, not a negation.
        assert_eq!(parse_property("word is not").unwrap(), boolean("word", true, "not"));
    }

    #[test]
    fn test_property_errors() {
        assert!(parse_property("speed").is_err());
        assert!(parse_property("speed is").is_err());
        assert!(parse_property("speed becomes").is_err());
        assert!(parse_property("speed equals 5").is_err());
        assert!(parse_property("speed  is fast").is_err());
        assert!(parse_property("").is_err());
    }
}
