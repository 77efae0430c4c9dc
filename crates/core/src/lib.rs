//! StackLang Core: the language engine
//!
//! Programs are sequences of literal tokens pushed onto a single data stack.
//! Whenever an unquoted command lands on top, the engine pops it, checks the
//! arguments beneath it against the command's signature, and runs it.
//!
//! # Modules
//!
//! - `value`: Element model (numbers, strings, booleans, substacks, types, commands)
//! - `stack`: Bounded, owning data stack
//! - `types`: Structural type checking of arguments
//! - `parser`: Literal parsers, one token to one element
//! - `engine`: Registry, interrupt flag, and directive execution
//! - `builtins`: Core primitive catalog
//! - `config`: Engine settings (TOML)
//! - `error`: Structured language errors
//!
//! # Example
//!
//! ```rust,ignore
//! use stacklang_core::{Element, Engine, Registry, Stack};
//!
//! let mut engine = Engine::new(Registry::with_builtins());
//! let mut stack = Stack::new();
//! for token in ["5", "dup", "*"] {
//!     stack.push(Element::parse(token)?)?;
//!     engine.execute(&mut stack)?;
//! }
//! assert_eq!(stack.top()?, &Element::integer(25));
//! ```

pub mod builtins;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod stack;
pub mod types;
pub mod value;

pub use config::EngineConfig;
pub use engine::{
    DEFAULT_MAX_CALL_DEPTH, DefinedFunction, Engine, Interrupt, Primitive, PrimitiveFn, Registry,
};
pub use error::{ErrorContext, ErrorKind, LanguageError, Result};
pub use parser::{escape, find_improper_escape, unescape};
pub use stack::Stack;
pub use types::{check_type, check_types};
pub use value::{Command, DataType, Element, Number, TypeDescriptor};
