//! Interpreter session
//!
//! A session owns one data stack and one engine. Input arrives one token
//! per line: each line is parsed, pushed, and then given a chance to run.
//! A failing line leaves the session usable; whatever the failed command
//! had not yet consumed stays on the stack.

use stacklang_core::{
    Element, Engine, EngineConfig, Interrupt, LanguageError, Registry, Result, Stack,
};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

pub struct Session {
    stack: Stack,
    engine: Engine,
}

impl Session {
    /// A fresh session with the core primitive catalog
    pub fn new(config: &EngineConfig) -> Self {
        Session {
            stack: config.stack(),
            engine: config.engine(Registry::with_builtins()),
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Handle for stopping a running submission from elsewhere
    pub fn interrupt(&self) -> &Interrupt {
        self.engine.interrupt()
    }

    /// Parse one token, push it, and execute
    ///
    /// Blank lines are ignored. A stop requested before this call is
    /// discarded; only one raised while the line runs is honored.
    pub fn submit(&mut self, line: &str) -> Result<()> {
        let token = line.trim();
        if token.is_empty() {
            return Ok(());
        }

        self.engine.interrupt().clear();
        let elm = Element::parse(token)?;
        debug!(token, "submit");
        self.stack.push(elm)?;
        self.engine.execute(&mut self.stack)
    }

    /// Submit every line of a file, stopping at the first error
    ///
    /// The error message is suffixed with the file and line it came from.
    pub fn include(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LanguageError::argument(format!("Cannot read include {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "include");

        for (index, line) in content.lines().enumerate() {
            self.submit(line).map_err(|mut e| {
                e.message = format!("{} ({}:{})", e.message, path.display(), index + 1);
                e
            })?;
        }
        Ok(())
    }

    /// Write the stack one element per line, earliest entered first
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        let mut ordered = self.stack.clone();
        ordered.reverse();
        for elm in ordered.iter() {
            writeln!(out, "{}", elm)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stacklang_core::ErrorKind;

    fn session() -> Session {
        Session::new(&EngineConfig::default())
    }

    fn dumped(session: &Session) -> String {
        let mut out = Vec::new();
        session.dump(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_submit_runs_commands() {
        let mut s = session();
        for line in ["3", "4", "*", "  "] {
            s.submit(line).unwrap();
        }
        assert_eq!(s.stack().top().unwrap(), &Element::integer(12));
        assert_eq!(s.stack().len(), 1);
    }

    #[test]
    fn test_submit_error_keeps_session_usable() {
        let mut s = session();
        s.submit("1").unwrap();
        assert_eq!(s.submit("1..2").unwrap_err().kind, ErrorKind::Parser);
        assert_eq!(s.submit("bogus").unwrap_err().kind, ErrorKind::Syntax);
        s.submit("dup").unwrap();
        assert_eq!(s.stack().len(), 2);
    }

    #[test]
    fn test_stale_interrupt_is_discarded() {
        let mut s = session();
        s.submit("1").unwrap();
        s.interrupt().request();
        s.submit("dup").unwrap();
        assert_eq!(s.stack().len(), 2);
    }

    #[test]
    fn test_dump_order() {
        let mut s = session();
        for line in ["1", "\"two\"", "<< 3, 4 >>"] {
            s.submit(line).unwrap();
        }
        assert_eq!(dumped(&s), "1\n\"two\"\n<< 3, 4 >>\n");
    }

    #[test]
    fn test_include_and_dump_round_trip() {
        let mut s = session();
        for line in ["~1/2", "\"a\\nb\"", "<< `dup, Number >>", "true"] {
            s.submit(line).unwrap();
        }

        let mut file = tempfile::NamedTempFile::new().unwrap();
        s.dump(&mut file).unwrap();
        file.flush().unwrap();

        let mut restored = session();
        restored.include(file.path()).unwrap();
        assert_eq!(restored.stack(), s.stack());
    }

    #[test]
    fn test_include_stops_at_first_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1\n\n2\n+\nnot\n5").unwrap();
        file.flush().unwrap();

        let mut s = session();
        let err = s.include(file.path()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Type);
        assert!(err.message.ends_with(":5)"));
        assert_eq!(s.stack(), &Stack::from_top_down(vec![Element::integer(3)]));
    }

    #[test]
    fn test_include_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = session().include(&dir.path().join("nope.stk")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Argument);
    }

    #[test]
    fn test_limit_from_config() {
        let mut s = Session::new(&EngineConfig::new().with_stack_limit(1));
        s.submit("1").unwrap();
        assert_eq!(s.submit("2").unwrap_err().kind, ErrorKind::StackOverflow);
    }
}
