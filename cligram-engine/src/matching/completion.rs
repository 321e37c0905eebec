//! Completion
//!
//! Completing a line walks every finished word exactly like matching does, so a bad word earlier in
//! the line is reported as a [`MatchError`]. The word under the cursor (the last one, unless the line
//! ends in whitespace) is then compared against the level reached:
//!
//!   - keywords it prefixes,
//!   - values from the variable's expand function, or its choices, that it prefixes,
//!   - a `<name>` placeholder for any other variable,
//!   - `<cr>` when the command may end here and no word is started.
//!
//! A word that is a complete keyword and the only one it prefixes is taken as finished: the
//! candidates are those of the next level, and `word_start` moves to the end of the line.

use super::tokens::tokenize;
use super::walk::Walk;
use super::{MatchError, MatchOptions};
use crate::grammar::Grammar;
use crate::object::ObjKind;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Keyword,
    /// A placeholder such as `<name>`; not text to insert.
    Variable,
    /// A value produced by an expand function or a choice list.
    Expansion,
    /// `<cr>`: the command may end here.
    EndOfCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub text: String,
    pub help: Option<String>,
    pub kind: CandidateKind,
}

impl CompletionCandidate {
    fn new(text: impl Into<String>, help: Option<&str>, kind: CandidateKind) -> Self {
        Self {
            text: text.into(),
            help: help.map(str::to_string),
            kind,
        }
    }

    /// Whether the text can be inserted into the line as is.
    pub fn is_insertable(&self) -> bool {
        matches!(self.kind, CandidateKind::Keyword | CandidateKind::Expansion)
    }
}

/// Candidates for the word under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Byte offset in the line where the completed word starts.
    pub word_start: usize,
    /// Text of the word typed so far.
    pub partial: String,
    pub candidates: Vec<CompletionCandidate>,
}

impl Completion {
    pub fn texts(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.text.as_str()).collect()
    }

    /// Longest common prefix of the insertable candidates, the text a completing line editor puts in
    /// place of `partial`. `partial` itself when nothing can be inserted.
    pub fn common_prefix(&self) -> String {
        let mut insertable = self
            .candidates
            .iter()
            .filter(|c| c.is_insertable())
            .map(|c| c.text.as_str());
        let Some(first) = insertable.next() else {
            return self.partial.clone();
        };
        let mut prefix = first.to_string();
        for text in insertable {
            let common = prefix
                .char_indices()
                .zip(text.chars())
                .find(|((_, a), b)| a != b)
                .map_or(prefix.len().min(text.len()), |((i, _), _)| i);
            prefix.truncate(common);
        }
        prefix
    }
}

/// Completion candidates for the end of `line` in tree `tree`.
pub fn complete(
    grammar: &Grammar,
    tree: &str,
    line: &str,
    opts: &MatchOptions,
) -> Result<Completion, MatchError> {
    let tokens = tokenize(line);
    let partial = tokens.last().filter(|t| t.end == line.len());
    let finished = tokens.len() - usize::from(partial.is_some());

    let mut walk = Walk::new(grammar, tree, line, opts)?;
    let mut i = 0;
    while i < finished {
        i += walk.step(&tokens, i)?;
    }

    let (word_start, word) = match partial {
        // A rest variable swallowed the word under the cursor too.
        Some(_) if i > finished => (line.len(), String::new()),
        Some(token) => (token.start, token.text.clone()),
        None => (line.len(), String::new()),
    };

    if !word.is_empty() {
        if let Some(entry) = walk.unique_keyword(&word)? {
            walk.apply(entry, None)?;
            return Ok(Completion {
                word_start: line.len(),
                partial: String::new(),
                candidates: candidates(&walk, "")?,
            });
        }
    }

    Ok(Completion {
        word_start,
        candidates: candidates(&walk, &word)?,
        partial: word,
    })
}

fn candidates(walk: &Walk, word: &str) -> Result<Vec<CompletionCandidate>, MatchError> {
    let mut out = Vec::new();
    for entry in walk.level()? {
        let obj = entry.cand.obj;
        if obj.is_hidden() && !walk.opts().show_hidden {
            continue;
        }
        match (obj.kind(), obj.var()) {
            (ObjKind::Command, _) => {
                if walk.starts_with(obj.text(), word) {
                    out.push(CompletionCandidate::new(
                        obj.text(),
                        obj.help_line(),
                        CandidateKind::Keyword,
                    ));
                }
            }
            (ObjKind::Variable, Some(spec)) => {
                if let Some(expand) = spec.expand() {
                    for value in expand.func.expand(&expand.args, &walk.vars) {
                        if walk.starts_with(&value.value, word) {
                            out.push(CompletionCandidate {
                                text: value.value,
                                help: value.help.or_else(|| obj.help_line().map(str::to_string)),
                                kind: CandidateKind::Expansion,
                            });
                        }
                    }
                } else if !spec.choices().is_empty() {
                    for choice in spec.choices() {
                        if walk.starts_with(choice, word) {
                            out.push(CompletionCandidate::new(
                                choice.as_str(),
                                obj.help_line(),
                                CandidateKind::Expansion,
                            ));
                        }
                    }
                } else {
                    out.push(CompletionCandidate::new(
                        obj.display_name(),
                        obj.help_line(),
                        CandidateKind::Variable,
                    ));
                }
            }
            _ => {}
        }
    }
    if word.is_empty() && walk.is_terminal() {
        out.push(CompletionCandidate::new("<cr>", None, CandidateKind::EndOfCommand));
    }

    let mut seen = HashSet::new();
    out.retain(|c| seen.insert(c.text.clone()));
    Ok(out)
}
