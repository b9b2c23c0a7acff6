//! # Ferrissh TextFSM
//!
//! Structured parsing of network device CLI output with TextFSM templates.
//!
//! Give it the platform, the command that was run and the raw text the device
//! printed; it finds the right template through an ntc-templates style index
//! and returns one record per matched row.
//!
//! ## Features
//!
//! - Index resolution with `sh[[ow]] ver[[sion]]` abbreviation syntax
//! - Exact-then-substring matching, deterministic in index order
//! - TextFSM engine: `Required`, `Filldown`, `Fillup`, `Key` and `List` values,
//!   `Continue`/`Record`/`Clear`/`Clearall`/`Error` actions, state transitions
//! - Lock-free registry snapshots with explicit `reload()`
//! - Records serialize to JSON in template field order
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferrissh_textfsm::ParserBuilder;
//!
//! fn main() -> Result<(), ferrissh_textfsm::Error> {
//!     let parser = ParserBuilder::new("/opt/ntc-templates/templates").build();
//!
//!     let output = "Cisco IOS Software, C2960 Software, Version 15.0(2)SE11\n";
//!     for record in parser.parse("cisco_ios", "sh ver", output)? {
//!         println!("{:?}", record.get_str("VERSION"));
//!     }
//!
//!     println!("{}", parser.parse_to_json("cisco_ios", "show version", output)?);
//!     Ok(())
//! }
//! ```
//!
//! Templates can also be used directly, without an index:
//!
//! ```rust
//! use ferrissh_textfsm::{TemplateDefinition, engine};
//!
//! let template = TemplateDefinition::parse(
//!     "Value NAME (\\S+)\n\nStart\n  ^${NAME}$$ -> Record\n",
//! ).unwrap();
//! let outcome = engine::extract(&template, "eth0\neth1\n").unwrap();
//! assert_eq!(outcome.records.len(), 2);
//! ```

pub mod engine;
pub mod error;
pub mod index;
pub mod parser;
pub mod template;

// Re-export main types for convenience
pub use engine::{FieldValue, ParseOutcome, ParseWarning, Record};
pub use error::{Error, IndexLoadError, ParseError, TemplateError};
pub use index::{MatchKind, Resolution, TemplateRef, TemplateRegistry};
pub use parser::{OutputParser, ParserBuilder, ParserConfig};
pub use template::TemplateDefinition;
