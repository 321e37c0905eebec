//! Command line matching
//!
//!     Input lines are matched against a compiled [`Grammar`] one word at a time. The walk starts at
//!     a named tree and at each step picks the one object of the current level the word selects, see
//!     [walk](walk) for the level and selection rules. It ends in one of:
//!
//!         - a match: the input ended on a terminal object. The result carries the bound variables
//!           and the callbacks of that terminal ([`CommandMatch`]).
//!         - [`MatchError::NoMatch`]: no object accepts a word.
//!         - [`MatchError::Ambiguous`]: several objects accept a word and nothing breaks the tie.
//!         - [`MatchError::Incomplete`]: the input ended before a terminal.
//!
//!     Matching never changes the grammar, so one compiled grammar serves any number of threads.
//!     Options are passed per call in [`MatchOptions`].
//!
//! Completion
//!
//!     [`complete`] reuses the walk for everything but the last word and lists what may follow. See
//!     [completion](completion).
//!
//! Invocation
//!
//!     [`invoke`] runs the callbacks of a match in declaration order, each with the full variable
//!     vector and its own grammar arguments. The first failure stops the rest. [`eval`] is match and
//!     invoke in one call.

pub mod completion;
pub mod tokens;
pub(crate) mod walk;

pub use completion::{complete, CandidateKind, Completion, CompletionCandidate};

use crate::cvec::{Cvec, CvecError};
use crate::grammar::{Grammar, UnresolvedReference};
use crate::object::CallbackBinding;
use thiserror::Error;
use tokens::tokenize;
use tracing::debug;
use walk::Walk;

/// Per-call matching options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Leave matched keywords out of the variable vector.
    pub exclude_keys: bool,
    /// Compare keywords and choices without regard to case.
    pub case_insensitive: bool,
    /// When several variables accept a word, take the most specific type instead of failing.
    pub prefer_specific_types: bool,
    /// Offer hidden objects in completion.
    pub show_hidden: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            exclude_keys: true,
            case_insensitive: false,
            prefer_specific_types: true,
            show_hidden: false,
        }
    }
}

/// A successfully matched command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMatch {
    /// Entry 0 is the whole line (`cmd`), then one entry per bound variable (and keyword, unless
    /// excluded) in input order.
    pub vars: Cvec,
    /// Callbacks of the terminal object, in declaration order.
    pub callbacks: Vec<CallbackBinding>,
    /// Display names of the matched objects.
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no match for `{token}` at position {position}{}", detail_suffix(.detail, .expected))]
    NoMatch {
        position: usize,
        token: String,
        expected: Vec<String>,
        detail: Option<String>,
    },
    #[error("incomplete command at position {position}, expected {}", .expected.join(" | "))]
    Incomplete {
        position: usize,
        expected: Vec<String>,
    },
    #[error("ambiguous command `{token}` at position {position}: {}", .candidates.join(" | "))]
    Ambiguous {
        position: usize,
        token: String,
        candidates: Vec<String>,
    },
    #[error("no tree named `{0}`")]
    UnknownTree(String),
    #[error(transparent)]
    UnresolvedReference(#[from] UnresolvedReference),
    #[error(transparent)]
    Allocation(#[from] CvecError),
}

impl MatchError {
    /// Byte offset in the line the error points at, when it points anywhere.
    pub fn position(&self) -> Option<usize> {
        match self {
            MatchError::NoMatch { position, .. }
            | MatchError::Incomplete { position, .. }
            | MatchError::Ambiguous { position, .. } => Some(*position),
            _ => None,
        }
    }
}

fn detail_suffix(detail: &Option<String>, expected: &[String]) -> String {
    match (detail, expected.is_empty()) {
        (Some(detail), _) => format!(": {}", detail),
        (None, false) => format!(", expected {}", expected.join(" | ")),
        (None, true) => String::new(),
    }
}

/// A callback of a matched command returned an error.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("callback `{which}` failed: {source}")]
    CallbackFailed {
        which: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Match `line` against the tree named `tree`.
pub fn match_line(
    grammar: &Grammar,
    tree: &str,
    line: &str,
    opts: &MatchOptions,
) -> Result<CommandMatch, MatchError> {
    let tokens = tokenize(line);
    let mut walk = Walk::new(grammar, tree, line, opts)?;
    let mut i = 0;
    while i < tokens.len() {
        i += walk.step(&tokens, i)?;
    }
    walk.finish()
}

/// Run the callbacks of `command`, returning how many ran.
pub fn invoke(command: &CommandMatch) -> Result<usize, InvokeError> {
    for binding in &command.callbacks {
        debug!(callback = binding.name(), args = binding.args().len(), "invoking callback");
        binding
            .call(&command.vars)
            .map_err(|source| InvokeError::CallbackFailed {
                which: binding.name().to_string(),
                source,
            })?;
    }
    Ok(command.callbacks.len())
}

/// Match `line` and run its callbacks.
pub fn eval(
    grammar: &Grammar,
    tree: &str,
    line: &str,
    opts: &MatchOptions,
) -> crate::Result<CommandMatch> {
    let command = match_line(grammar, tree, line, opts)?;
    invoke(&command)?;
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::var::VarType;

    fn opts() -> MatchOptions {
        MatchOptions::default()
    }

    fn matched(source: &str, line: &str) -> CommandMatch {
        match_line(&testing::compile(source), "main", line, &opts()).unwrap()
    }

    fn failed(source: &str, line: &str) -> MatchError {
        match_line(&testing::compile(source), "main", line, &opts()).unwrap_err()
    }

    #[test]
    fn test_keywords_and_prefixes() {
        let m = matched("show version; set mtu;", "sh ver");
        assert_eq!(m.vars.len(), 1);
        assert_eq!(m.vars.get_str(0), Some("sh ver"));
        assert_eq!(m.path, ["show", "version"]);
    }

    #[test]
    fn test_exact_keyword_beats_longer_prefix() {
        let m = matched("show; showall;", "show");
        assert_eq!(m.path, ["show"]);
        assert!(matches!(failed("show; showall;", "sho"), MatchError::Ambiguous { .. }));
    }

    #[test]
    fn test_keyword_beats_variable() {
        let grammar = testing::compile("set all; set <name:string>;");
        let m = match_line(&grammar, "main", "set all", &opts()).unwrap();
        assert_eq!(m.path, ["set", "all"]);
        let m = match_line(&grammar, "main", "set eth0", &opts()).unwrap();
        assert_eq!(m.path, ["set", "<name>"]);
        assert_eq!(m.vars.find_str("name"), Some("eth0"));
    }

    #[test]
    fn test_specific_type_wins() {
        let source = "v <s:string>, cb(\"s\"); v <n:int32>, cb(\"n\");";
        let m = matched(source, "v 42");
        assert_eq!(m.vars[1].ty(), VarType::Int32);
        assert_eq!(m.callbacks[0].args().get_str(0), Some("n"));
        assert_eq!(matched(source, "v x").vars[1].ty(), VarType::String);

        let strict = MatchOptions {
            prefer_specific_types: false,
            ..opts()
        };
        let err = match_line(&testing::compile(source), "main", "v 42", &strict).unwrap_err();
        assert_eq!(
            err,
            MatchError::Ambiguous {
                position: 2,
                token: "42".into(),
                candidates: vec!["<s>".into(), "<n>".into()],
            }
        );
    }

    #[test]
    fn test_constraints_reject_tokens() {
        let err = failed("mtu <m:uint16 range[576:9216]>;", "mtu 100");
        let MatchError::NoMatch { position, detail, .. } = &err else {
            panic!("expected no match, got {err:?}");
        };
        assert_eq!(*position, 4);
        assert_eq!(detail.as_deref(), Some("`100` is out of range range[576:9216]"));
        assert_eq!(
            err.to_string(),
            "no match for `100` at position 4: `100` is out of range range[576:9216]"
        );
    }

    #[test]
    fn test_incomplete_lists_expected() {
        let err = failed("show version; show clock, hide;", "show");
        assert_eq!(
            err,
            MatchError::Incomplete {
                position: 4,
                expected: vec!["version".into()],
            }
        );
        assert!(matches!(failed("show version;", ""), MatchError::Incomplete { position: 0, .. }));
    }

    #[test]
    fn test_rest_takes_remaining_line() {
        let m = matched("echo <msg:rest>;", "echo hello   big world ");
        assert_eq!(m.vars.find_str("msg"), Some("hello   big world"));
        let m = matched("echo <msg:rest>;", r#"echo say "hi there""#);
        assert_eq!(m.vars.find_str("msg"), Some(r#"say "hi there""#));
    }

    #[test]
    fn test_quoted_tokens() {
        let m = matched("descr <text:string>;", r#"descr "to the core""#);
        assert_eq!(m.vars.find_str("text"), Some("to the core"));
    }

    #[test]
    fn test_keywords_in_vector() {
        let keep = MatchOptions {
            exclude_keys: false,
            ..opts()
        };
        let grammar = testing::compile("set mtu <mtu:uint16>;");
        let m = match_line(&grammar, "main", "set mtu 1500", &keep).unwrap();
        assert_eq!(
            m.vars.to_string(),
            "0 : cmd = set mtu 1500\n1 : set = set\n2 : mtu = mtu\n3 : mtu = 1500\n"
        );
        assert!(m.vars[1].is_keyword());
        assert!(!m.vars[3].is_keyword());
    }

    #[test]
    fn test_case_insensitive() {
        let grammar = testing::compile("Show <c:string choice:Red|Green>;");
        let loose = MatchOptions {
            case_insensitive: true,
            ..opts()
        };
        assert!(match_line(&grammar, "main", "show red", &opts()).is_err());
        let m = match_line(&grammar, "main", "SHOW red", &loose).unwrap();
        assert_eq!(m.vars.find_str("c"), Some("Red"));
    }

    #[test]
    fn test_translate_runs_before_binding() {
        let m = matched("name <n:string translate:upper()>;", "name bob");
        assert_eq!(m.vars.find_str("n"), Some("BOB"));
    }

    #[test]
    fn test_reference_callbacks_are_inherited() {
        let source = "ip @addr, cb(\"ip\");\ntreename=\"addr\";\nnone;\nlocal, print();";
        let m = matched(source, "ip none");
        assert_eq!(m.callbacks[0].name(), "cb");
        assert_eq!(matched(source, "ip local").callbacks[0].name(), "print");
    }

    #[test]
    fn test_unknown_tree() {
        let grammar = testing::compile("a;");
        assert_eq!(
            match_line(&grammar, "other", "a", &opts()).unwrap_err(),
            MatchError::UnknownTree("other".into())
        );
    }

    #[test]
    fn test_invoke_in_order() {
        let (registry, log) = testing::recording_registry();
        let grammar = testing::compile_with(
            &crate::compiling::Compiler::new(registry),
            "set <n:int32>, cb(\"first\"), print(), fail(), cb(\"never\");",
        );
        let err = eval(&grammar, "main", "set 7", &opts()).unwrap_err();
        assert_eq!(err.to_string(), "callback `fail` failed: callback failed");
        let calls = log.calls();
        assert_eq!(log.names(), ["cb", "print"]);
        assert_eq!(calls[0].args, ["first"]);
        assert_eq!(
            calls[1].vars,
            [("cmd".to_string(), "set 7".to_string()), ("n".to_string(), "7".to_string())]
        );
    }
}
