//! Literal parsers
//!
//! Turns one source token into an [`Element`]. Dispatch looks at the shape
//! of the token, in this order:
//!
//! ```text
//! "..."            String      (escapes: \" \\ \n)
//! << a, b, ... >>  Substack    (elements listed top first)
//! true | false     Boolean
//! [~][+|-]digits   Number      (integer, decimal, or fraction)
//! Capitalized      Type        (optionally Kind(Specialization))
//! anything else    Command     (`name marks a quoted command)
//! ```
//!
//! Once a token has been recognized, a defect inside it is a parse error
//! pointing at the offending character; the parser never falls through to
//! a later grammar.
//!
//! Offsets in errors count characters, not bytes.

use crate::error::{LanguageError, Result};
use crate::stack::Stack;
use crate::value::{Command, DataType, Element, Number, TypeDescriptor};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Zero, pow};

/// Marks a command as quoted data
pub const COMMAND_QUOTE: char = '`';
/// Delimits string literals
pub const STRING_QUOTE: char = '"';
/// Opens a substack literal
pub const SUBSTACK_OPEN: &str = "<<";
/// Closes a substack literal
pub const SUBSTACK_CLOSE: &str = ">>";
/// Separates substack elements
pub const SUBSTACK_SEPARATOR: char = ',';
/// Leading marker for inexact numbers
pub const INEXACT_MARKER: char = '~';
/// Visual separator ignored inside numbers
pub const DIGIT_SEPARATOR: char = '\'';

impl Element {
    /// Parse one source token into an element
    pub fn parse(token: &str) -> Result<Element> {
        if token.trim().is_empty() {
            return Err(LanguageError::parser("Nothing to parse.", token, 0));
        }
        if token.starts_with(STRING_QUOTE) {
            return parse_string(token).map(Element::String);
        }
        if token.starts_with(SUBSTACK_OPEN) {
            return parse_substack(token).map(Element::Substack);
        }
        if let Some(b) = parse_boolean(token) {
            return Ok(Element::Boolean(b));
        }
        if looks_numeric(token) {
            return parse_number(token).map(Element::Number);
        }
        if token.starts_with(|c: char| c.is_ascii_uppercase()) {
            return parse_type(token).map(Element::Type);
        }
        parse_command(token).map(Element::Command)
    }
}

// =============================================================================
// Strings
// =============================================================================

/// Escape quotes, backslashes, and newlines
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Expand `\"`, `\\`, and `\n`; exact inverse of [`escape`]
///
/// Other backslash sequences are left as written. Use
/// [`find_improper_escape`] to reject them first.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Character offset of the first malformed escape or bare quote, if any
pub fn find_improper_escape(s: &str) -> Option<usize> {
    let mut chars = s.chars().enumerate();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some(i),
            '\\' => match chars.next() {
                Some((_, '"' | '\\' | 'n')) => {}
                _ => return Some(i),
            },
            _ => {}
        }
    }
    None
}

/// Parse a quoted string literal into its unescaped contents
pub fn parse_string(token: &str) -> Result<String> {
    let len = token.chars().count();
    if !token.starts_with(STRING_QUOTE) {
        return Err(LanguageError::parser(
            "A string must start with a quote.",
            token,
            0,
        ));
    }
    if len < 2 || !token.ends_with(STRING_QUOTE) {
        return Err(LanguageError::parser(
            "Looks like a string, but is missing a closing quote.",
            token,
            len,
        ));
    }

    let body = &token[1..token.len() - 1];
    if let Some(pos) = find_improper_escape(body) {
        return Err(LanguageError::parser(
            "Looks like a string, but has an invalid escape sequence.",
            token,
            pos + 1,
        ));
    }
    Ok(unescape(body))
}

// =============================================================================
// Substacks
// =============================================================================

/// Parse a `<< ... >>` literal
///
/// Commas split elements only at nesting depth zero and outside string
/// literals. Each element is trimmed and parsed recursively. Trailing commas
/// and empty substacks are allowed.
pub fn parse_substack(token: &str) -> Result<Stack> {
    let chars: Vec<char> = token.chars().collect();
    let n = chars.len();

    if !token.starts_with(SUBSTACK_OPEN) {
        return Err(LanguageError::parser(
            "A substack must start with `<<`.",
            token,
            0,
        ));
    }
    if n < 4 || !token.ends_with(SUBSTACK_CLOSE) {
        return Err(LanguageError::parser(
            "Looks like a substack, but is missing the closing delimiter.",
            token,
            n,
        ));
    }

    let mut elements = Vec::new();
    let mut accumulator = String::new();
    let mut acc_start = 2;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last: Option<char> = None;

    for (i, &c) in chars.iter().enumerate().take(n - 2).skip(2) {
        if in_string {
            accumulator.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == STRING_QUOTE {
                in_string = false;
            }
            continue;
        }

        match c {
            SUBSTACK_SEPARATOR if depth == 0 => {
                elements.push(parse_item(token, &accumulator, acc_start)?);
                accumulator.clear();
                acc_start = i + 1;
                last = None;
                continue;
            }
            STRING_QUOTE if last != Some('\\') => in_string = true,
            '<' if last == Some('<') => {
                depth += 1;
                accumulator.push(c);
                last = None;
                continue;
            }
            '>' if last == Some('>') => {
                if depth == 0 {
                    return Err(LanguageError::parser(
                        "Missing at least one matching opening substack delimiter.",
                        token,
                        i - 1,
                    ));
                }
                depth -= 1;
                accumulator.push(c);
                last = None;
                continue;
            }
            _ => {}
        }

        accumulator.push(c);
        last = Some(c);
    }

    if depth != 0 {
        return Err(LanguageError::parser(
            format!(
                "Missing {} closing substack delimiter{}.",
                depth,
                if depth == 1 { "" } else { "s" }
            ),
            token,
            n - 1,
        ));
    }
    if !accumulator.trim().is_empty() {
        elements.push(parse_item(token, &accumulator, acc_start)?);
    }

    Ok(Stack::from_top_down(elements))
}

/// Parse one comma-separated piece of a substack, reporting defects
/// relative to the enclosing token
fn parse_item(outer: &str, raw: &str, start: usize) -> Result<Element> {
    let leading = raw.chars().take_while(|c| c.is_whitespace()).count();
    Element::parse(raw.trim()).map_err(|e| e.rebase(outer, start + leading))
}

// =============================================================================
// Booleans
// =============================================================================

/// `true` or `false`, exactly
pub fn parse_boolean(token: &str) -> Option<bool> {
    match token {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Numbers
// =============================================================================

/// Whether the token should be handled by the number grammar
fn looks_numeric(token: &str) -> bool {
    let mut chars = token.chars().filter(|&c| c != DIGIT_SEPARATOR);
    let starts_digits = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    match chars.next() {
        Some(c) if c.is_ascii_digit() || c == INEXACT_MARKER => true,
        Some('.') => starts_digits(chars.next()),
        Some('+' | '-') => match chars.next() {
            Some('.') => starts_digits(chars.next()),
            c => starts_digits(c),
        },
        _ => false,
    }
}

/// Parse a number literal
///
/// Grammar, after dropping `'` separators:
/// `[~][+|-](digits | digits.digits | .digits | digits. | digits/digits)`.
/// The value is always an exact rational; `~` only clears the exact flag.
pub fn parse_number(token: &str) -> Result<Number> {
    let len = token.chars().count();
    let chars: Vec<(usize, char)> = token
        .chars()
        .enumerate()
        .filter(|&(_, c)| c != DIGIT_SEPARATOR)
        .collect();
    let err = |msg: &str, at: usize| Err(LanguageError::parser(msg, token, at));

    let mut rest = chars.as_slice();
    let mut exact = true;
    if let Some(((_, INEXACT_MARKER), tail)) = rest.split_first() {
        exact = false;
        rest = tail;
    }
    let mut negative = false;
    if let Some(((_, sign @ ('+' | '-')), tail)) = rest.split_first() {
        negative = *sign == '-';
        rest = tail;
    }

    let mut whole = String::new();
    let mut fraction = String::new();
    let mut denominator = String::new();
    let mut point_at = None;
    let mut slash_at = None;
    let mut denom_start = len;

    for &(at, c) in rest {
        match c {
            '0'..='9' => {
                if slash_at.is_some() {
                    if denominator.is_empty() {
                        denom_start = at;
                    }
                    denominator.push(c);
                } else if point_at.is_some() {
                    fraction.push(c);
                } else {
                    whole.push(c);
                }
            }
            '.' if point_at.is_some() => {
                return err("Number has more than one decimal point.", at);
            }
            '.' if slash_at.is_some() => {
                return err("A fraction cannot contain a decimal point.", at);
            }
            '.' => point_at = Some(at),
            '/' if slash_at.is_some() => {
                return err("Number has more than one fraction bar.", at);
            }
            '/' if point_at.is_some() => {
                return err("A decimal cannot also be a fraction.", at);
            }
            '/' => {
                if whole.is_empty() {
                    return err("Fraction is missing its numerator.", at);
                }
                slash_at = Some(at);
            }
            INEXACT_MARKER => {
                return err("`~` may only appear at the start of a number.", at);
            }
            '+' | '-' => {
                return err("A sign may only appear at the start of a number.", at);
            }
            _ => return err("Unexpected character in number.", at),
        }
    }

    if whole.is_empty() && fraction.is_empty() {
        return err("Number has no digits.", len);
    }

    let value = if slash_at.is_some() {
        if denominator.is_empty() {
            return err("Fraction is missing its denominator.", len);
        }
        let numer = digits_to_bigint(&whole, token)?;
        let denom = digits_to_bigint(&denominator, token)?;
        if denom.is_zero() {
            return err("Fraction has a zero denominator.", denom_start);
        }
        BigRational::new(numer, denom)
    } else {
        let digits = format!("{}{}", whole, fraction);
        let numer = digits_to_bigint(&digits, token)?;
        let denom = pow(BigInt::from(10), fraction.len());
        BigRational::new(numer, denom)
    };

    let value = if negative { -value } else { value };
    Ok(Number::new(value, exact))
}

fn digits_to_bigint(digits: &str, token: &str) -> Result<BigInt> {
    BigInt::parse_bytes(digits.as_bytes(), 10)
        .ok_or_else(|| LanguageError::parser("Number has no digits.", token, 0))
}

// =============================================================================
// Types
// =============================================================================

/// Parse a type descriptor such as `Number` or `Substack(Number(Exact))`
pub fn parse_type(token: &str) -> Result<TypeDescriptor> {
    let Some(open) = token.find('(') else {
        return token.parse::<DataType>().map(TypeDescriptor::new);
    };

    let open_at = token[..open].chars().count();
    if !token.ends_with(')') {
        return Err(LanguageError::parser(
            "Type specialization is missing its closing parenthesis.",
            token,
            token.chars().count(),
        ));
    }

    let base = &token[..open];
    let kind = base
        .parse::<DataType>()
        .map_err(|e| e.rebase(token, 0))?;

    let inner = &token[open + 1..token.len() - 1];
    let spec = parse_type(inner).map_err(|e| e.rebase(token, open_at + 1))?;
    if !kind.accepts_specialization(spec.kind) {
        return Err(LanguageError::parser(
            format!("{} cannot be specialized as {}.", kind, spec),
            token,
            open_at + 1,
        ));
    }

    Ok(TypeDescriptor::specialized(kind, spec))
}

// =============================================================================
// Commands
// =============================================================================

/// Parse a command name, quoted if it starts with a backtick
pub fn parse_command(token: &str) -> Result<Command> {
    let (quoted, name) = match token.strip_prefix(COMMAND_QUOTE) {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let name_start = usize::from(quoted);

    if name.is_empty() {
        return Err(LanguageError::parser(
            "Command name is empty.",
            token,
            token.chars().count(),
        ));
    }
    for (i, c) in name.chars().enumerate() {
        if c == COMMAND_QUOTE {
            return Err(LanguageError::parser(
                "A quote may only appear at the start of a command.",
                token,
                name_start + i,
            ));
        }
        if c.is_whitespace() {
            return Err(LanguageError::parser(
                "A command cannot contain whitespace.",
                token,
                name_start + i,
            ));
        }
    }

    Ok(Command {
        name: name.to_string(),
        quoted,
    })
}
