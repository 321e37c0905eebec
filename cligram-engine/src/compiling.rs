//! Grammar compiler
//!
//!     Grammar text becomes a [`Grammar`] in three stages:
//!
//!         1. Lexing. See [lexing](lexing). Logos tokens with byte spans; comments and whitespace
//!            are dropped, strings unescaped.
//!         2. Parsing. See [parsing](parsing). Recursive descent into statements, blocks and
//!            assignments. Names are kept as text.
//!         3. Building. See [building](building). Statements expand into paths which are merged
//!            into the trees; type, callback, expand and translate names are looked up in the
//!            [`Registry`]; constraints are checked; `@references` are resolved last.
//!
//!     Compilation is all or nothing. [`Compiler::compile_into`] works on a copy of the target
//!     grammar and only replaces it once every stage has succeeded.
//!
//! Errors
//!
//!     Every failure is a [`CompileError`] carrying the line, column and byte offset of the
//!     offending source. [`CompileError::with_context`] renders it with the surrounding lines.

pub mod building;
pub mod lexing;
pub mod parsing;

use crate::grammar::Grammar;
use crate::registry::Registry;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Location in grammar source. `line` and `column` are 1-based, `column` counts characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourcePosition {
    /// Position of byte `offset` in `source`. Offsets past the end are clamped.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unresolved reference to tree `{0}`")]
    UnresolvedReference(String),
    #[error("ambiguous grammar: {0}")]
    AmbiguousGrammar(String),
    #[error("unknown variable type `{0}`")]
    UnknownType(String),
    #[error("unknown callback `{0}`")]
    UnknownCallback(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("invalid regular expression: {0}")]
    InvalidRegex(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// A grammar that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{position}: {kind}")]
pub struct CompileError {
    pub position: SourcePosition,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn at(source: &str, offset: usize, kind: CompileErrorKind) -> Self {
        Self {
            position: SourcePosition::from_offset(source, offset),
            kind,
        }
    }

    /// The error followed by the source lines around it.
    pub fn with_context(&self, source: &str) -> String {
        format!("{}\n\n{}", self, format_source_context(source, &self.position))
    }
}

/// Format source code context around an error location.
///
/// Shows 2 lines before the error, the error line with a `>>` marker, and 2 lines after.
/// A caret under the error line points at the column.
pub fn format_source_context(source: &str, position: &SourcePosition) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let error_line = position.line.saturating_sub(1);

    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();

    for (line_num, line) in lines.iter().enumerate().take(end_line).skip(start_line) {
        let marker = if line_num == error_line { ">>" } else { "  " };
        context.push_str(&format!("{} {:3} | {}\n", marker, line_num + 1, line));
        if line_num == error_line {
            context.push_str(&format!(
                "{:7}| {}^\n",
                "",
                " ".repeat(position.column.saturating_sub(1))
            ));
        }
    }

    context
}

/// Compiles grammar text against a registry of types and callbacks.
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<Registry>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Registry::new())
    }
}

impl Compiler {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile `source` into a new grammar.
    pub fn compile(&self, source: &str) -> Result<Grammar, CompileError> {
        let mut grammar = Grammar::new();
        self.compile_into(&mut grammar, source)?;
        Ok(grammar)
    }

    /// Add the statements of `source` to an existing grammar.
    ///
    /// References may point at trees defined by earlier calls. On error `grammar` is left untouched.
    pub fn compile_into(&self, grammar: &mut Grammar, source: &str) -> Result<(), CompileError> {
        let tokens = lexing::tokenize(source)?;
        let items = parsing::parse(source, &tokens)?;
        let mut staged = grammar.clone();
        building::build(&self.registry, &mut staged, source, &items)?;
        debug!(
            trees = staged.len(),
            tokens = tokens.len(),
            "compiled grammar: {}",
            staged.tree_names().join(", ")
        );
        *grammar = staged;
        Ok(())
    }
}
