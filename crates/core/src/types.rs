//! Structural type checking for command arguments
//!
//! Before any command runs, its signature (a list of [`TypeDescriptor`]s,
//! topmost argument first) is matched against the top of the stack.
//!
//! Matching rules for one element against one descriptor:
//!
//! | Descriptor            | Matches                                        |
//! |-----------------------|------------------------------------------------|
//! | `K` or `K(Any)`       | elements of kind `K`; commands must be unquoted |
//! | `Number(Exact)`       | exact numbers (likewise `Inexact`)             |
//! | `Command(Quoted)`     | quoted commands                                |
//! | `Substack(T)`         | substacks whose every element matches `T`      |
//!
//! Anything else (kind mismatch, or a specialization on a kind that does not
//! take one) is a non-match, never a panic. No element has kind `Any`, so a
//! bare `Any` descriptor matches nothing; commands that accept any element
//! declare no signature and inspect the stack themselves.

use crate::error::{LanguageError, Result};
use crate::stack::Stack;
use crate::value::{DataType, Element, TypeDescriptor};

/// Check whether `elm` satisfies `descriptor`
///
/// Pure function of its arguments.
pub fn check_type(elm: &Element, descriptor: &TypeDescriptor) -> bool {
    let spec = descriptor
        .specialization()
        .filter(|s| s.kind != DataType::Any);

    let Some(spec) = spec else {
        return match elm {
            // A quoted command is data and does not satisfy a bare Command
            Element::Command(c) => descriptor.kind == DataType::Command && !c.quoted,
            _ => elm.kind() == descriptor.kind,
        };
    };

    match (elm, descriptor.kind) {
        (Element::Number(n), DataType::Number) => match spec.kind {
            DataType::Exact => n.exact,
            DataType::Inexact => !n.exact,
            _ => false,
        },
        (Element::Command(c), DataType::Command) => c.quoted,
        (Element::Substack(inner), DataType::Substack) => {
            inner.iter().all(|e| check_type(e, spec))
        }
        _ => false,
    }
}

/// Check a signature against the top of the stack
///
/// The first descriptor is matched against the top element, the second
/// against the one below it, and so on. Stack depth beyond the signature
/// is ignored. A signature longer than the stack fails on the first
/// descriptor with nothing to match, as a type error rather than an
/// underflow.
pub fn check_types(stack: &Stack, signature: &[TypeDescriptor]) -> Result<()> {
    let mut elements = stack.iter();
    for expected in signature {
        match elements.next() {
            Some(actual) if check_type(actual, expected) => {}
            Some(actual) => return Err(LanguageError::type_mismatch(expected, actual)),
            None => return Err(LanguageError::type_missing(expected)),
        }
    }
    Ok(())
}
