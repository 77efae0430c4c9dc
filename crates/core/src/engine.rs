//! Execution engine
//!
//! The engine consumes directives (unquoted commands) from the top of a
//! [`Stack`]. A directive is resolved against the [`Registry`], primitives
//! first, then defined functions:
//!
//! - a primitive is type-checked against its signature and its native
//!   behavior is invoked with the stack and the registry
//! - a defined function is type-checked, then each element of a fresh copy
//!   of its body is pushed and executed in order
//!
//! Every entry checks the [`Interrupt`] first, so a cancellation request is
//! observed between any two steps of a body, however deep the recursion.
//!
//! Errors are never handled here. They unwind to the caller of
//! [`Engine::execute`] with the chain of defined functions that was active
//! at the failure point attached as a trace.

use crate::error::{LanguageError, Result};
use crate::stack::Stack;
use crate::types::check_types;
use crate::value::{Element, TypeDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// Default bound on nested defined-function invocations
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Native behavior of a primitive
///
/// Receives the stack after the directive was popped and its signature was
/// verified. Behaviors must not mutate the stack before they are certain to
/// succeed.
pub type PrimitiveFn = fn(&mut Stack, &mut Registry) -> Result<()>;

/// A natively implemented command
#[derive(Debug, Clone)]
pub struct Primitive {
    /// Argument descriptors, topmost argument first
    pub signature: Vec<TypeDescriptor>,
    pub behavior: PrimitiveFn,
}

/// A user-defined command
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedFunction {
    /// Argument descriptors, topmost argument first
    pub signature: Vec<TypeDescriptor>,
    /// Elements pushed, in order, on each invocation
    pub body: Vec<Element>,
}

/// Name tables for primitives and defined functions
#[derive(Debug, Clone, Default)]
pub struct Registry {
    primitives: HashMap<String, Primitive>,
    defined: HashMap<String, DefinedFunction>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry preloaded with the core primitive catalog
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        crate::builtins::install(&mut registry);
        registry
    }

    /// Register (or replace) a primitive
    pub fn register_primitive(
        &mut self,
        name: impl Into<String>,
        signature: Vec<TypeDescriptor>,
        behavior: PrimitiveFn,
    ) {
        self.primitives.insert(
            name.into(),
            Primitive {
                signature,
                behavior,
            },
        );
    }

    /// Register a defined function under a name nobody has taken yet
    pub fn define(&mut self, name: impl Into<String>, function: DefinedFunction) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(LanguageError::runtime(format!(
                "Cannot define `{}`: the name is already taken.",
                name
            )));
        }
        debug!(name = %name, arity = function.signature.len(), "defined function");
        self.defined.insert(name, function);
        Ok(())
    }

    pub fn primitive(&self, name: &str) -> Option<&Primitive> {
        self.primitives.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&DefinedFunction> {
        self.defined.get(name)
    }

    /// Whether `name` resolves to a primitive or a defined function
    pub fn contains(&self, name: &str) -> bool {
        self.primitives.contains_key(name) || self.defined.contains_key(name)
    }

    /// Every known command name, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .primitives
            .keys()
            .chain(self.defined.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

/// Shared cancellation flag
///
/// Clones share the same flag, so a handle given to a signal handler (see
/// [`Interrupt::flag`]) stops the engine that owns the original.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Interrupt::default()
    }

    /// Ask the engine to stop at its next checkpoint
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Read and clear the flag in one step
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// The underlying flag, for registration with a signal handler
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Dispatches directives against a registry
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    interrupt: Interrupt,
    max_call_depth: usize,
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Engine {
            registry,
            interrupt: Interrupt::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    /// Share an existing interrupt handle (builder pattern)
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Bound nested defined-function invocations (builder pattern)
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// Run the directive on top of the stack, if there is one
    ///
    /// Data on top of the stack is left alone. An empty stack is an
    /// underflow. A pending interrupt is consumed and reported as a stop
    /// before anything else is touched.
    pub fn execute(&mut self, stack: &mut Stack) -> Result<()> {
        let mut context = Vec::new();
        self.execute_in(stack, &mut context)
    }

    fn execute_in(&mut self, stack: &mut Stack, context: &mut Vec<String>) -> Result<()> {
        if self.interrupt.take() {
            debug!(depth = context.len(), "interrupt observed");
            return Err(LanguageError::stop());
        }
        if stack.is_empty() {
            return Err(LanguageError::underflow());
        }
        let Some(command) = stack.pop_directive() else {
            return Ok(());
        };

        if let Some(primitive) = self.registry.primitive(&command.name) {
            check_types(stack, &primitive.signature)?;
            let behavior = primitive.behavior;
            debug!(command = %command.name, depth = context.len(), "primitive");
            return behavior(stack, &mut self.registry);
        }

        if let Some(function) = self.registry.function(&command.name) {
            check_types(stack, &function.signature)?;
            let body = function.body.clone();
            if context.len() >= self.max_call_depth {
                return Err(LanguageError::call_depth_exceeded(self.max_call_depth));
            }
            debug!(command = %command.name, depth = context.len(), "defined function");

            context.push(command.name);
            let result = self
                .run_body(stack, body, context)
                .map_err(|e| e.in_context(context));
            context.pop();
            return result;
        }

        Err(LanguageError::syntax(
            "Given command is not recognized.",
            &command.name,
            0,
        ))
    }

    fn run_body(
        &mut self,
        stack: &mut Stack,
        body: Vec<Element>,
        context: &mut Vec<String>,
    ) -> Result<()> {
        for elm in body {
            trace!(element = %elm, "body step");
            stack.push(elm)?;
            self.execute_in(stack, context)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::DataType;

    fn number() -> TypeDescriptor {
        TypeDescriptor::new(DataType::Number)
    }

    fn dup(stack: &mut Stack, _: &mut Registry) -> Result<()> {
        let top = stack.top()?.clone();
        stack.push(top)
    }

    fn fail(_: &mut Stack, _: &mut Registry) -> Result<()> {
        Err(LanguageError::runtime("boom"))
    }

    fn mark(_: &mut Stack, registry: &mut Registry) -> Result<()> {
        registry.register_primitive("ran", vec![], fail);
        Ok(())
    }

    fn engine() -> Engine {
        let mut registry = Registry::new();
        registry.register_primitive("dup", vec![number()], dup);
        registry.register_primitive("fail", vec![], fail);
        Engine::new(registry)
    }

    #[test]
    fn test_primitive_dispatch() {
        let mut engine = engine();
        let mut stack = Stack::new();
        stack.push(Element::integer(5)).unwrap();
        stack.push(Element::command("dup")).unwrap();
        engine.execute(&mut stack).unwrap();
        assert_eq!(
            stack,
            Stack::from_top_down(vec![Element::integer(5), Element::integer(5)])
        );
    }

    #[test]
    fn test_data_on_top_is_left_alone() {
        let mut engine = engine();
        let mut stack = Stack::from_top_down(vec![Element::quoted_command("dup")]);
        engine.execute(&mut stack).unwrap();
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_empty_stack_underflows() {
        let mut engine = engine();
        let err = engine.execute(&mut Stack::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackUnderflow);
    }

    #[test]
    fn test_unknown_command_is_syntax_error() {
        let mut engine = engine();
        let mut stack = Stack::from_top_down(vec![Element::command("nope")]);
        let err = engine.execute(&mut stack).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert_eq!(err.context.unwrap().text, "nope");
        assert!(stack.is_empty());
    }

    #[test]
    fn test_type_failure_leaves_arguments() {
        let mut engine = engine();
        let mut stack = Stack::from_top_down(vec![Element::command("dup")]);
        let err = engine.execute(&mut stack).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_interrupt_stops_without_consuming() {
        let mut engine = engine();
        let mut stack = Stack::from_top_down(vec![Element::command("dup"), Element::integer(1)]);
        engine.interrupt().request();
        let err = engine.execute(&mut stack).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Stop);
        assert_eq!(stack.len(), 2);
        assert!(!engine.interrupt().is_requested());
    }

    #[test]
    fn test_interrupt_clones_share_flag() {
        let interrupt = Interrupt::new();
        let handle = interrupt.clone();
        handle.request();
        assert!(interrupt.is_requested());
        assert!(interrupt.take());
        assert!(!handle.is_requested());
        interrupt.flag().store(true, Ordering::SeqCst);
        assert!(handle.is_requested());
        handle.clear();
        assert!(!interrupt.is_requested());
    }

    #[test]
    fn test_defined_function_body_runs_in_order() {
        let mut engine = engine();
        engine
            .registry_mut()
            .define(
                "twice",
                DefinedFunction {
                    signature: vec![number()],
                    body: vec![Element::command("dup"), Element::integer(7)],
                },
            )
            .unwrap();

        let mut stack = Stack::from_top_down(vec![Element::command("twice"), Element::integer(3)]);
        engine.execute(&mut stack).unwrap();
        assert_eq!(
            stack,
            Stack::from_top_down(vec![
                Element::integer(7),
                Element::integer(3),
                Element::integer(3)
            ])
        );
        // The definition is untouched by execution
        assert_eq!(engine.registry().function("twice").unwrap().body.len(), 2);
    }

    #[test]
    fn test_error_trace_names_enclosing_functions() {
        let mut engine = engine();
        let registry = engine.registry_mut();
        registry
            .define(
                "inner",
                DefinedFunction {
                    signature: vec![],
                    body: vec![Element::command("fail")],
                },
            )
            .unwrap();
        registry
            .define(
                "outer",
                DefinedFunction {
                    signature: vec![],
                    body: vec![Element::command("inner")],
                },
            )
            .unwrap();

        let mut stack = Stack::from_top_down(vec![Element::command("outer")]);
        let err = engine.execute(&mut stack).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(err.trace, vec!["outer".to_string(), "inner".to_string()]);
    }

    #[test]
    fn test_unbounded_recursion_is_reported() {
        let mut engine = engine().with_max_call_depth(16);
        engine
            .registry_mut()
            .define(
                "forever",
                DefinedFunction {
                    signature: vec![],
                    body: vec![Element::command("forever")],
                },
            )
            .unwrap();

        let mut stack = Stack::from_top_down(vec![Element::command("forever")]);
        let err = engine.execute(&mut stack).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert_eq!(err.trace.len(), 16);
    }

    #[test]
    fn test_primitive_may_mutate_registry() {
        let mut engine = engine();
        engine
            .registry_mut()
            .register_primitive("mark", vec![], mark);
        let mut stack = Stack::from_top_down(vec![Element::command("mark")]);
        engine.execute(&mut stack).unwrap();
        assert!(engine.registry().contains("ran"));
    }

    #[test]
    fn test_define_rejects_taken_names() {
        let mut registry = Registry::new();
        registry.register_primitive("dup", vec![number()], dup);
        let function = DefinedFunction {
            signature: vec![],
            body: vec![],
        };
        assert_eq!(
            registry.define("dup", function.clone()).unwrap_err().kind,
            ErrorKind::Runtime
        );
        registry.define("mine", function.clone()).unwrap();
        assert!(registry.define("mine", function).is_err());
        assert_eq!(registry.names(), vec!["dup", "mine"]);
    }
}
