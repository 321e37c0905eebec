//! # cligram
//!
//! A command-line grammar engine.
//!
//! A grammar is written as text, compiled into a tree of grammar objects and then used to
//! match, complete and evaluate command lines typed by a user:
//!
//! ```text
//! show version, print();
//! show interface <name:interface>("Interface name"), print();
//! set mtu <mtu:uint16 range[576:9216]>, print();
//! ```
//!
//! File Layout
//!
//! The crate is organised leaves first, the same way data flows through it:
//!
//!   var        typed values (`CgVar`) and their text formats
//!   cvec       ordered vectors of values, used for matched arguments and callback args
//!   object     grammar objects (keywords, variables, references, terminators)
//!   parsetree  one level of sibling grammar objects
//!   grammar    a set of named trees plus global assignments
//!   registry   capability tables: variable types, callbacks, expand and translate functions
//!   compiling  grammar text -> `Grammar` (lexing, parsing, building, resolving)
//!   matching   input line -> match, completion candidates, callback invocation
//!   printing   tree -> grammar-like text, and structural dumps
//!
//! For test helpers shared by the unit and integration tests, see the [testing module](testing).

#![allow(rustdoc::invalid_html_tags)]

pub mod compiling;
pub mod cvec;
pub mod error;
pub mod grammar;
pub mod matching;
pub mod object;
pub mod parsetree;
pub mod printing;
pub mod registry;
pub mod testing;
pub mod var;

pub use compiling::{CompileError, CompileErrorKind, Compiler, SourcePosition};
pub use cvec::{Cvec, CvecError, KeySearch};
pub use error::{Error, Result};
pub use grammar::{Grammar, UnresolvedReference, DEFAULT_TREE};
pub use matching::{
    complete, eval, invoke, match_line, CommandMatch, Completion, CompletionCandidate,
    CandidateKind, InvokeError, MatchError, MatchOptions,
};
pub use object::{CallbackBinding, CgObj, ObjFlags, ObjKind, VarSpec};
pub use parsetree::ParseTree;
pub use registry::{
    CallbackResult, CommandCallback, Expander, Expansion, Registry, Translator, VarTypeHandler,
};
pub use var::{CgVar, Value, VarError, VarType};
