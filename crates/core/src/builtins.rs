//! Core primitive catalog
//!
//! The minimal set of primitives the interpreter ships with: stack
//! shuffling, function definition, rational arithmetic, and boolean
//! negation. Hosts can register more through
//! [`Registry::register_primitive`].
//!
//! Every behavior inspects its arguments before it pops anything, so a
//! failing primitive leaves the stack as it found it.

use crate::engine::{DefinedFunction, Registry};
use crate::error::{LanguageError, Result};
use crate::stack::Stack;
use crate::value::{DataType, Element, Number, TypeDescriptor};
use num_rational::BigRational;
use num_traits::Zero;

/// Build a type descriptor from its printed form
///
/// `ty!(Number)` is a plain descriptor, `ty!(Substack(Number(Exact)))` nests.
macro_rules! ty {
    ($kind:ident) => {
        TypeDescriptor::new(DataType::$kind)
    };
    ($kind:ident($($inner:tt)+)) => {
        TypeDescriptor::specialized(DataType::$kind, ty!($($inner)+))
    };
}

/// Register the core catalog
pub fn install(registry: &mut Registry) {
    // Stack shuffling takes any element, so these check depth themselves
    registry.register_primitive("dup", vec![], dup);
    registry.register_primitive("drop", vec![], drop_top);
    registry.register_primitive("swap", vec![], swap);
    registry.register_primitive("clear", vec![], clear);

    // `name << Type, ... >> << body >> define`, name on top
    registry.register_primitive(
        "define",
        vec![ty!(Command(Quoted)), ty!(Substack(Type)), ty!(Substack)],
        define,
    );

    // Arithmetic
    registry.register_primitive("+", vec![ty!(Number), ty!(Number)], add);
    registry.register_primitive("-", vec![ty!(Number), ty!(Number)], subtract);
    registry.register_primitive("*", vec![ty!(Number), ty!(Number)], multiply);
    registry.register_primitive("/", vec![ty!(Number), ty!(Number)], divide);

    // Logic
    registry.register_primitive("not", vec![ty!(Boolean)], not);
}

fn malformed(command: &str) -> LanguageError {
    LanguageError::runtime(format!(
        "Arguments to `{}` do not have the expected shape.",
        command
    ))
}

fn dup(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    let top = stack.top()?.clone();
    stack.push(top)
}

fn drop_top(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    stack.pop().map(|_| ())
}

fn swap(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    if stack.len() < 2 {
        return Err(LanguageError::underflow());
    }
    let first = stack.pop()?;
    let second = stack.pop()?;
    stack.push(first)?;
    stack.push(second)
}

fn clear(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    stack.clear();
    Ok(())
}

fn define(stack: &mut Stack, registry: &mut Registry) -> Result<()> {
    let mut args = stack.iter();
    let (
        Some(Element::Command(name)),
        Some(Element::Substack(signature)),
        Some(Element::Substack(body)),
    ) = (args.next(), args.next(), args.next())
    else {
        return Err(malformed("define"));
    };

    let signature = signature
        .iter()
        .map(|elm| match elm {
            Element::Type(t) => Ok(t.clone()),
            _ => Err(malformed("define")),
        })
        .collect::<Result<Vec<_>>>()?;
    let function = DefinedFunction {
        signature,
        body: body.iter().cloned().collect(),
    };

    registry.define(name.name.clone(), function)?;
    for _ in 0..3 {
        stack.pop()?;
    }
    Ok(())
}

/// Replace the two numbers on top with `apply(lower, upper)`
///
/// The result is exact only when both operands are.
fn arithmetic(
    stack: &mut Stack,
    command: &str,
    apply: impl FnOnce(&BigRational, &BigRational) -> Result<BigRational>,
) -> Result<()> {
    let mut args = stack.iter();
    let (Some(Element::Number(rhs)), Some(Element::Number(lhs))) = (args.next(), args.next())
    else {
        return Err(malformed(command));
    };

    let result = Number::new(apply(&lhs.value, &rhs.value)?, lhs.exact && rhs.exact);
    stack.pop()?;
    stack.pop()?;
    stack.push(Element::Number(result))
}

fn add(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    arithmetic(stack, "+", |a, b| Ok(a + b))
}

fn subtract(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    arithmetic(stack, "-", |a, b| Ok(a - b))
}

fn multiply(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    arithmetic(stack, "*", |a, b| Ok(a * b))
}

fn divide(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    arithmetic(stack, "/", |a, b| {
        if b.is_zero() {
            return Err(LanguageError::runtime("Division by zero."));
        }
        Ok(a / b)
    })
}

fn not(stack: &mut Stack, _: &mut Registry) -> Result<()> {
    let Element::Boolean(b) = stack.top()? else {
        return Err(malformed("not"));
    };
    let negated = !*b;
    stack.pop()?;
    stack.push(Element::Boolean(negated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::error::ErrorKind;

    /// Push each token and execute after every push, like a driver does
    fn run(engine: &mut Engine, stack: &mut Stack, tokens: &[&str]) -> Result<()> {
        for token in tokens {
            stack.push(Element::parse(token)?)?;
            engine.execute(stack)?;
        }
        Ok(())
    }

    fn fresh() -> (Engine, Stack) {
        (Engine::new(Registry::with_builtins()), Stack::new())
    }

    #[test]
    fn test_ty_macro() {
        assert_eq!(ty!(Number).to_string(), "Number");
        assert_eq!(ty!(Command(Quoted)).to_string(), "Command(Quoted)");
        assert_eq!(
            ty!(Substack(Substack(Number(Exact)))).to_string(),
            "Substack(Substack(Number(Exact)))"
        );
    }

    #[test]
    fn test_shuffling() {
        let (mut engine, mut stack) = fresh();
        run(&mut engine, &mut stack, &["1", "2", "swap"]).unwrap();
        assert_eq!(
            stack,
            Stack::from_top_down(vec![Element::integer(1), Element::integer(2)])
        );
        run(&mut engine, &mut stack, &["drop", "dup"]).unwrap();
        assert_eq!(
            stack,
            Stack::from_top_down(vec![Element::integer(2), Element::integer(2)])
        );
        run(&mut engine, &mut stack, &["clear"]).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_arithmetic_exactness() {
        let (mut engine, mut stack) = fresh();
        run(&mut engine, &mut stack, &["1/2", "1/3", "+"]).unwrap();
        assert_eq!(stack.top().unwrap(), &Element::Number(Number::fraction(5, 6)));

        run(&mut engine, &mut stack, &["~2", "*"]).unwrap();
        assert_eq!(
            stack.top().unwrap(),
            &Element::Number(Number::fraction(5, 3).into_inexact())
        );
    }

    #[test]
    fn test_subtract_and_divide_operand_order() {
        let (mut engine, mut stack) = fresh();
        run(&mut engine, &mut stack, &["10", "4", "-"]).unwrap();
        assert_eq!(stack.top().unwrap(), &Element::integer(6));
        run(&mut engine, &mut stack, &["4", "/"]).unwrap();
        assert_eq!(stack.top().unwrap(), &Element::Number(Number::fraction(3, 2)));
    }

    #[test]
    fn test_divide_by_zero_leaves_operands() {
        let (mut engine, mut stack) = fresh();
        let err = run(&mut engine, &mut stack, &["1", "0", "/"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(
            stack,
            Stack::from_top_down(vec![Element::integer(0), Element::integer(1)])
        );
    }

    #[test]
    fn test_not() {
        let (mut engine, mut stack) = fresh();
        run(&mut engine, &mut stack, &["true", "not"]).unwrap();
        assert_eq!(stack.top().unwrap(), &Element::Boolean(false));
        let err = run(&mut engine, &mut stack, &["5", "not"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_define_and_call() {
        let (mut engine, mut stack) = fresh();
        run(
            &mut engine,
            &mut stack,
            &["<< dup, * >>", "<< Number >>", "`square", "define"],
        )
        .unwrap();
        assert!(stack.is_empty());

        run(&mut engine, &mut stack, &["7", "square"]).unwrap();
        assert_eq!(stack, Stack::from_top_down(vec![Element::integer(49)]));

        let err = run(&mut engine, &mut stack, &["true", "square"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_define_taken_name_leaves_arguments() {
        let (mut engine, mut stack) = fresh();
        let err = run(&mut engine, &mut stack, &["<< >>", "<< >>", "`dup", "define"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Runtime);
        assert_eq!(stack.len(), 3);
    }

    #[test]
    fn test_define_rejects_non_type_signature() {
        let (mut engine, mut stack) = fresh();
        let err = run(&mut engine, &mut stack, &["<< >>", "<< 1 >>", "`f", "define"])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_swap_needs_two_arguments() {
        let (mut engine, mut stack) = fresh();
        let err = run(&mut engine, &mut stack, &["1", "swap"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackUnderflow);
        assert_eq!(stack, Stack::from_top_down(vec![Element::integer(1)]));
    }

    #[test]
    fn test_shuffling_accepts_any_element() {
        let (mut engine, mut stack) = fresh();
        run(&mut engine, &mut stack, &["`x", "<< >>", "swap", "dup"]).unwrap();
        assert_eq!(
            stack,
            Stack::from_top_down(vec![
                Element::quoted_command("x"),
                Element::quoted_command("x"),
                Element::Substack(Stack::new()),
            ])
        );
        run(&mut engine, &mut stack, &["drop", "drop", "drop"]).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_dup_and_drop_on_empty_stack() {
        let (mut engine, mut stack) = fresh();
        for command in ["dup", "drop"] {
            let err = run(&mut engine, &mut stack, &[command]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::StackUnderflow);
            assert!(stack.is_empty());
        }
    }
}
