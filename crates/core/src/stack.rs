//! The data stack
//!
//! A bounded, top-addressed sequence of owned [`Element`]s. The vector's end
//! is the top of the stack; iteration runs from the top down.
//!
//! ## Capacity
//!
//! Every stack has a capacity (`usize::MAX` when unbounded) and the invariant
//! `len() <= capacity()` holds after every operation:
//! - `push` on a full stack fails with a stack overflow and changes nothing
//! - `set_capacity` below the current length fails the same way
//!
//! ## Ownership
//!
//! `Clone` is a deep copy: nested substacks are cloned recursively, so
//! executing a copy of a function body can never disturb the definition.

use crate::error::{LanguageError, Result};
use crate::value::{Command, Element};

#[derive(Debug, Clone)]
pub struct Stack {
    /// Bottom at index 0, top at the end
    elements: Vec<Element>,
    capacity: usize,
}

impl Stack {
    /// An empty, unbounded stack
    pub fn new() -> Self {
        Stack {
            elements: Vec::new(),
            capacity: usize::MAX,
        }
    }

    /// An empty stack holding at most `capacity` elements
    pub fn bounded(capacity: usize) -> Self {
        Stack {
            elements: Vec::new(),
            capacity,
        }
    }

    /// Build an unbounded stack from elements listed top first
    pub fn from_top_down(elements: Vec<Element>) -> Self {
        let mut elements = elements;
        elements.reverse();
        Stack {
            elements,
            capacity: usize::MAX,
        }
    }

    /// Push an element, failing if the stack is full
    pub fn push(&mut self, elm: Element) -> Result<()> {
        if self.elements.len() >= self.capacity {
            return Err(LanguageError::overflow(self.capacity));
        }
        self.elements.push(elm);
        Ok(())
    }

    /// Remove and return the top element
    pub fn pop(&mut self) -> Result<Element> {
        self.elements.pop().ok_or_else(LanguageError::underflow)
    }

    /// Borrow the top element
    pub fn top(&self) -> Result<&Element> {
        self.elements.last().ok_or_else(LanguageError::underflow)
    }

    /// Pop the top element only if it is an unquoted command
    pub fn pop_directive(&mut self) -> Option<Command> {
        if !self.elements.last().is_some_and(Element::is_directive) {
            return None;
        }
        match self.elements.pop() {
            Some(Element::Command(command)) => Some(command),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the capacity; it cannot drop below the current length
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.elements.len() {
            return Err(LanguageError::overflow(capacity));
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Drop every element (the capacity is kept)
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Invert the order in place, so the bottom becomes the top
    pub fn reverse(&mut self) {
        self.elements.reverse();
    }

    /// Iterate from the top of the stack to the bottom
    pub fn iter(&self) -> std::iter::Rev<std::slice::Iter<'_, Element>> {
        self.elements.iter().rev()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Stack::new()
    }
}

/// Stacks compare by contents, top to bottom; capacity is not part of equality
impl PartialEq for Stack {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a Element;
    type IntoIter = std::iter::Rev<std::slice::Iter<'a, Element>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
