//! Crate-level error type
//!
//! Each stage has its own error ([`CompileError`], [`MatchError`], [`InvokeError`], ...). [`Error`]
//! gathers them for callers that drive several stages and only want to propagate with `?`.

use crate::compiling::CompileError;
use crate::cvec::CvecError;
use crate::grammar::UnresolvedReference;
use crate::matching::{InvokeError, MatchError};
use crate::var::VarError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error(transparent)]
    Var(#[from] VarError),
    #[error(transparent)]
    Cvec(#[from] CvecError),
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiling::Compiler;

    fn count_trees(source: &str) -> Result<usize> {
        let compiler = Compiler::default();
        let grammar = compiler.compile(source)?;
        grammar.resolve("main")?;
        Ok(grammar.len())
    }

    #[test]
    fn test_question_mark_conversion() {
        assert_eq!(count_trees("a;").unwrap(), 1);
        let err = count_trees("a <b:nope>;").unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
        assert_eq!(
            err.to_string(),
            "line 1, column 3: unknown variable type `nope`"
        );
    }
}
