pub mod api;
pub mod ast;
pub mod emitter;
pub mod error;
mod loader;
pub mod parser;
pub mod reader;
pub mod render;
mod serialization;

pub use api::{convert, parse_rules, translate, translate_to, Format, RuleSet};
pub use error::{Ctx19Error, ParseError};
pub use serialization::Value;
