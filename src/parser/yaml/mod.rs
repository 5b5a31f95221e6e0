//! YAML front end: a hand-written scanner and an indentation-driven tree
//! builder. Flow collections are tracked separately from block structure.

mod builder;
pub mod scanner;

pub use builder::build;
pub(crate) use builder::build_into;
pub use scanner::{Token, TokenKind, YamlScanner};
