//! Element model for StackLang
//!
//! An [`Element`] is one tagged value on the data stack. Elements own their
//! payloads outright: a `Substack` owns its nested [`Stack`], so cloning an
//! element is always a deep copy and no two stacks ever share an element.
//!
//! Every element has a canonical printed form (its `Display` impl) that the
//! literal parsers accept back, so a dumped stack can be re-read.

use crate::error::LanguageError;
use crate::parser::escape;
use crate::stack::Stack;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use std::fmt;

/// Kinds of elements, plus the tags used only as specializations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Number,
    String,
    Boolean,
    Substack,
    Type,
    Command,
    Identifier,
    Primitive,
    Defined,
    Any,
    /// Specialization tag: exact Number
    Exact,
    /// Specialization tag: inexact Number
    Inexact,
    /// Specialization tag: quoted Command
    Quoted,
}

impl DataType {
    /// Every data type, in declaration order
    pub const ALL: [DataType; 13] = [
        DataType::Number,
        DataType::String,
        DataType::Boolean,
        DataType::Substack,
        DataType::Type,
        DataType::Command,
        DataType::Identifier,
        DataType::Primitive,
        DataType::Defined,
        DataType::Any,
        DataType::Exact,
        DataType::Inexact,
        DataType::Quoted,
    ];

    /// Canonical (capitalized) spelling
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Number => "Number",
            DataType::String => "String",
            DataType::Boolean => "Boolean",
            DataType::Substack => "Substack",
            DataType::Type => "Type",
            DataType::Command => "Command",
            DataType::Identifier => "Identifier",
            DataType::Primitive => "Primitive",
            DataType::Defined => "Defined",
            DataType::Any => "Any",
            DataType::Exact => "Exact",
            DataType::Inexact => "Inexact",
            DataType::Quoted => "Quoted",
        }
    }

    /// Look a data type up by its canonical spelling
    pub fn from_name(name: &str) -> Option<DataType> {
        DataType::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Whether a descriptor of this kind may carry `spec` as its specialization
    ///
    /// Only Substack, Number, and Command admit specialization. `Any` is
    /// accepted everywhere and behaves like no specialization.
    pub fn accepts_specialization(&self, spec: DataType) -> bool {
        match (*self, spec) {
            (DataType::Substack | DataType::Number | DataType::Command, DataType::Any) => true,
            (DataType::Number, DataType::Exact | DataType::Inexact) => true,
            (DataType::Command, DataType::Quoted) => true,
            (DataType::Substack, inner) => !inner.is_tag(),
            _ => false,
        }
    }

    /// Tags that only make sense as a specialization
    pub fn is_tag(&self) -> bool {
        matches!(self, DataType::Exact | DataType::Inexact | DataType::Quoted)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DataType {
    type Err = LanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_name(s)
            .ok_or_else(|| LanguageError::parser(format!("`{}` is not a type.", s), s, 0))
    }
}

/// A required shape, with an optional recursive specialization
///
/// Examples: `Number`, `Number(Exact)`, `Command(Quoted)`,
/// `Substack(Substack(String))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub kind: DataType,
    pub specialization: Option<Box<TypeDescriptor>>,
}

impl TypeDescriptor {
    /// An unspecialized descriptor
    pub fn new(kind: DataType) -> Self {
        TypeDescriptor {
            kind,
            specialization: None,
        }
    }

    /// A descriptor with a specialization
    pub fn specialized(kind: DataType, specialization: TypeDescriptor) -> Self {
        TypeDescriptor {
            kind,
            specialization: Some(Box::new(specialization)),
        }
    }

    pub fn specialization(&self) -> Option<&TypeDescriptor> {
        self.specialization.as_deref()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.specialization {
            Some(spec) => write!(f, "{}({})", self.kind, spec),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// An arbitrary-precision rational tagged with its exactness
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    pub value: BigRational,
    pub exact: bool,
}

impl Number {
    pub fn new(value: BigRational, exact: bool) -> Self {
        Number { value, exact }
    }

    /// An exact integer
    pub fn integer(n: i64) -> Self {
        Number::new(BigRational::from_integer(BigInt::from(n)), true)
    }

    /// An exact fraction; `denom` must be nonzero
    pub fn fraction(numer: i64, denom: i64) -> Self {
        Number::new(
            BigRational::new(BigInt::from(numer), BigInt::from(denom)),
            true,
        )
    }

    /// The same magnitude marked inexact
    pub fn into_inexact(self) -> Self {
        Number::new(self.value, false)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exact {
            f.write_str("~")?;
        }
        if self.value.denom().is_one() {
            write!(f, "{}", self.value.numer())
        } else {
            write!(f, "{}/{}", self.value.numer(), self.value.denom())
        }
    }
}

/// A command name; quoted commands are data, unquoted ones are directives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    pub name: String,
    pub quoted: bool,
}

impl Command {
    /// An executable command
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            quoted: false,
        }
    }

    /// A command held as data
    pub fn quoted(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            quoted: true,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "{}{}", crate::parser::COMMAND_QUOTE, self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

/// One value on the data stack
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Number(Number),
    String(String),
    Boolean(bool),
    Substack(Stack),
    Type(TypeDescriptor),
    Command(Command),
}

impl Element {
    /// The data type this element belongs to
    pub fn kind(&self) -> DataType {
        match self {
            Element::Number(_) => DataType::Number,
            Element::String(_) => DataType::String,
            Element::Boolean(_) => DataType::Boolean,
            Element::Substack(_) => DataType::Substack,
            Element::Type(_) => DataType::Type,
            Element::Command(_) => DataType::Command,
        }
    }

    /// True for an unquoted command, the only element the engine executes
    pub fn is_directive(&self) -> bool {
        matches!(self, Element::Command(c) if !c.quoted)
    }

    /// Shorthand for an unquoted command element
    pub fn command(name: impl Into<String>) -> Self {
        Element::Command(Command::new(name))
    }

    /// Shorthand for a quoted command element
    pub fn quoted_command(name: impl Into<String>) -> Self {
        Element::Command(Command::quoted(name))
    }

    /// Shorthand for an exact integer element
    pub fn integer(n: i64) -> Self {
        Element::Number(Number::integer(n))
    }
}

impl From<Number> for Element {
    fn from(n: Number) -> Self {
        Element::Number(n)
    }
}

impl From<TypeDescriptor> for Element {
    fn from(t: TypeDescriptor) -> Self {
        Element::Type(t)
    }
}

impl From<Command> for Element {
    fn from(c: Command) -> Self {
        Element::Command(c)
    }
}

impl From<Stack> for Element {
    fn from(s: Stack) -> Self {
        Element::Substack(s)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Number(n) => write!(f, "{}", n),
            Element::String(s) => write!(f, "\"{}\"", escape(s)),
            Element::Boolean(b) => write!(f, "{}", b),
            Element::Substack(stack) => {
                if stack.is_empty() {
                    return f.write_str("<< >>");
                }
                let items: Vec<String> = stack.iter().map(|e| e.to_string()).collect();
                write!(f, "<< {} >>", items.join(", "))
            }
            Element::Type(t) => write!(f, "{}", t),
            Element::Command(c) => write!(f, "{}", c),
        }
    }
}
