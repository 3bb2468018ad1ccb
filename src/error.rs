use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Ctx19Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    /// A failure of the underlying input or output stream, passed through untouched.
    #[error(transparent)]
    #[diagnostic(code(ctx19::io))]
    Io(#[from] std::io::Error),

    #[error("Failed to read or write rules as JSON")]
    #[diagnostic(code(ctx19::json))]
    Json(#[source] serde_json::Error),

    #[error("Failed to read or write rules as YAML")]
    #[diagnostic(code(ctx19::yaml))]
    Yaml(#[from] serde_yaml::Error),

    /// A loaded JSON or YAML rule that has no ctx19 spelling.
    #[error("Rule {index} cannot be written as ctx19: {reason}")]
    #[diagnostic(
        code(ctx19::invalid_rule),
        help("Each rule needs an `if` map of selectors with a `position` from 1; property values are strings, numbers or [bool, string] pairs.")
    )]
    InvalidRule { index: usize, reason: String },
}

impl From<serde_json::Error> for Ctx19Error {
    fn from(err: serde_json::Error) -> Self {
        // serde_json wraps writer failures; surface those as plain stream errors.
        if err.is_io() {
            Ctx19Error::Io(err.into())
        } else {
            Ctx19Error::Json(err)
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParseError {
    #[error("Unexpected end of input on line {line}")]
    #[diagnostic(
        code(ctx19::unexpected_eof),
        help("The input ended before {expected} was found. Is the last line terminated by a newline?")
    )]
    UnexpectedEndOfInput {
        #[source_code]
        src: NamedSource<String>,
        #[label("Expected {expected} here")]
        span: SourceSpan,
        expected: String,
        line: usize,
    },

    #[error("Malformed line {line}: `{text}`")]
    #[diagnostic(
        code(ctx19::malformed_line),
        help("Selector lines look like `first next` or `3rd token`; property lines look like `name is value`, `name is not value` or `name becomes value`.")
    )]
    MalformedLine {
        #[source_code]
        src: NamedSource<String>,
        #[label("{reason}")]
        span: SourceSpan,
        text: String,
        reason: String,
        line: usize,
    },

    #[error("Selector `{name}` is used twice in one condition (line {line})")]
    #[diagnostic(
        code(ctx19::duplicate_selector),
        help("Each selector name may appear once per `if` block, since it becomes a JSON object key.")
    )]
    DuplicateSelector {
        #[source_code]
        src: NamedSource<String>,
        #[label("`{name}` was already selected in this rule")]
        span: SourceSpan,
        name: String,
        line: usize,
    },

    #[error("Property `{name}` is set twice in one block (line {line})")]
    #[diagnostic(
        code(ctx19::duplicate_property),
        help("Each property may appear once per selector or `then` block. `position` is reserved inside selectors.")
    )]
    DuplicateProperty {
        #[source_code]
        src: NamedSource<String>,
        #[label("`{name}` is already defined here")]
        span: SourceSpan,
        name: String,
        line: usize,
    },
}

impl ParseError {
    /// 1-based line number the error points at.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedEndOfInput { line, .. }
            | ParseError::MalformedLine { line, .. }
            | ParseError::DuplicateSelector { line, .. }
            | ParseError::DuplicateProperty { line, .. } => *line,
        }
    }

    /// Byte offset of the fault in the input stream.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            ParseError::UnexpectedEndOfInput { span, .. }
            | ParseError::MalformedLine { span, .. }
            | ParseError::DuplicateSelector { span, .. }
            | ParseError::DuplicateProperty { span, .. } => span.offset(),
        }
    }
}
