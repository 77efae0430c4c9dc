//! Error presentation
//!
//! ```text
//! Could not parse:
//! Number has more than one decimal point.
//! 1..2
//!   ^
//!   in outer
//!   in inner
//! ```

use stacklang_core::LanguageError;
use std::fmt::Write;

/// Render an error as the lines shown to the user
pub fn render(err: &LanguageError) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", err.kind.header());
    let _ = writeln!(out, "{}", err.message);
    if let Some(ctx) = &err.context {
        let _ = writeln!(out, "{}", ctx.text);
        let _ = writeln!(out, "{}^", " ".repeat(ctx.offset));
    }
    for name in &err.trace {
        let _ = writeln!(out, "  in {}", name);
    }
    out
}
