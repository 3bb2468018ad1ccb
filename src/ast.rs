/// One `if`/`then` unit of a rule file.
#[derive(Debug, PartialEq, Clone)]
pub struct Rule {
    pub condition: Condition,
    pub consequence: Option<Consequence>,
    /// 1-based line number of the `if` marker, or 0 for rules loaded from
    /// JSON or YAML.
    pub line: usize,
}

/// The selector clauses of a rule, in file order. Never empty.
#[derive(Debug, PartialEq, Clone)]
pub struct Condition {
    pub clauses: Vec<SelectorClause>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct SelectorClause {
    pub selector: Selector,
    pub properties: Vec<Property>,
}

/// The body of a `then` block.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Consequence {
    pub properties: Vec<Property>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Selector {
    pub kind: SelectorKind,
    pub name: String,
}

/// How a selector header line spelled its position.
#[derive(Debug, PartialEq, Clone)]
pub enum SelectorKind {
    /// `first` through `fifth`, holding the resolved position.
    Word(u32),
    /// `<N>th` and its `st`/`nd`/`rd` siblings.
    Numeric(u32),
    /// `end`, `beginning` or `token` written without an ordinal.
    Keyword,
    /// A bare word, or a header whose leading word is not an ordinal.
    /// The leading word is kept so the header can be rendered again.
    Implicit(Option<String>),
}

/// The ordinal words, indexed by `position - 1`.
pub const ORDINAL_WORDS: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];

/// The ordinal word for `position`, if it has one.
#[must_use]
pub fn ordinal_word(position: u32) -> Option<&'static str> {
    let index = usize::try_from(position.checked_sub(1)?).ok()?;
    ORDINAL_WORDS.get(index).copied()
}

/// Selector names that are meaningful without an ordinal prefix.
pub const KEYWORDS: [&str; 3] = ["end", "beginning", "token"];

impl Selector {
    /// The 1-based position this selector resolves to.
    ///
    /// Keywords and unrecognized leading words resolve to `1`.
    #[must_use]
    pub fn position(&self) -> u32 {
        match self.kind {
            SelectorKind::Word(n) | SelectorKind::Numeric(n) => n,
            SelectorKind::Keyword | SelectorKind::Implicit(_) => 1,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

#[derive(Debug, PartialEq, Clone)]
pub enum PropertyValue {
    /// `name is value` (`true`) or `name is not value` (`false`).
    Boolean(bool, String),
    /// `name becomes value`.
    Raw(String),
}
