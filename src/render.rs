use crate::ast::{ordinal_word, Property, PropertyValue, Rule, Selector, SelectorKind};

/// Renders rules back into the tab-indented source format.
///
/// Parsing the result yields the same rules again.
#[must_use]
pub fn render_rules(rules: &[Rule]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str("if\n");
        for clause in &rule.condition.clauses {
            push_line(&mut out, 1, &render_selector(&clause.selector));
            for property in &clause.properties {
                push_line(&mut out, 2, &render_property(property));
            }
        }
        if let Some(consequence) = &rule.consequence {
            out.push_str("then\n");
            for property in &consequence.properties {
                push_line(&mut out, 1, &render_property(property));
            }
        }
    }
    out
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push('\t');
    }
    out.push_str(line);
    out.push('\n');
}

fn render_selector(selector: &Selector) -> String {
    let name = &selector.name;
    match &selector.kind {
        SelectorKind::Word(n) => match ordinal_word(*n) {
            Some(word) => format!("{word} {name}"),
            None => format!("{n}{} {name}", ordinal_suffix(*n)),
        },
        SelectorKind::Numeric(n) => format!("{n}{} {name}", ordinal_suffix(*n)),
        SelectorKind::Keyword | SelectorKind::Implicit(None) => name.clone(),
        SelectorKind::Implicit(Some(lead)) => format!("{lead} {name}"),
    }
}

fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn render_property(property: &Property) -> String {
    match &property.value {
        PropertyValue::Boolean(true, value) => format!("{} is {value}", property.name),
        PropertyValue::Boolean(false, value) => format!("{} is not {value}", property.name),
        PropertyValue::Raw(value) => format!("{} becomes {value}", property.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn test_suffixes() {
        let rendered: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101, 111]
            .iter()
            .map(|n| format!("{n}{}", ordinal_suffix(*n)))
            .collect();
        assert_eq!(
            rendered,
            ["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st", "111th"]
        );
    }

    #[test]
    fn test_render_is_stable() {
        let source = "\
if
\tsecond previous
\t\tpos is noun
\t\tcase is not nom
\t6th next
\tnearest noun
\t\tlemma is New York
\tend
then
\ttense becomes past
if
\ttoken
then
";
        let rules = Parser::new(source).parse_rules().unwrap();
        let rendered = render_rules(&rules);
        assert_eq!(rendered, source);
        assert_eq!(Parser::new(&rendered).parse_rules().unwrap(), rules);
    }

    #[test]
    fn test_word_positions_outside_the_table() {
        let selector = |n| Selector {
            kind: SelectorKind::Word(n),
            name: "next".to_string(),
        };
        assert_eq!(render_selector(&selector(2)), "second next");
        assert_eq!(render_selector(&selector(9)), "9th next");
        assert_eq!(render_selector(&selector(0)), "0th next");
    }

    #[test]
    fn test_numeric_suffix_normalized() {
        let rules = Parser::new("if\n\t1th next\n\t2th previous\n").parse_rules().unwrap();
        assert_eq!(render_rules(&rules), "if\n\t1st next\n\t2nd previous\n");
    }
}
