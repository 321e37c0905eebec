//! Tree walking
//!
//! A [`Walk`] holds the position reached in a grammar while consuming an input line. Each step
//! computes the level (the objects that may come next), picks the one object the token selects and
//! moves there.
//!
//! Levels
//!
//!     The level after an object is its child tree with every `@reference` replaced by the
//!     objects of the referenced tree, recursively. A reference already being expanded is skipped,
//!     so self-referencing trees terminate. Callbacks written on a reference are inherited by the
//!     terminals reached through it that have none of their own.
//!
//!     A `@{ ... }` tree opens a set frame. Once the walk reaches a terminal inside a set, the set's
//!     unused branches are offered again, so `interface eth0 mtu 1500 shutdown` can take the
//!     branches in any order, each at most once.
//!
//! Selection
//!
//!     1. A keyword equal to the token. Equal keywords from different trees, brought to one
//!        level through references, are ambiguous.
//!     2. The keyword the token is a prefix of. Several of them are ambiguous.
//!     3. The variables whose type and constraints accept the token. With several, the most
//!        specific wins when [`MatchOptions::prefer_specific_types`] is set; a tie is ambiguous.
//!
//!     A `rest` variable takes the remainder of the line as typed, quotes and inner spacing
//!     included. Every other variable binds the unquoted text of its one token.

use super::tokens::InputToken;
use super::{CommandMatch, MatchError, MatchOptions};
use crate::cvec::Cvec;
use crate::grammar::Grammar;
use crate::object::{CallbackBinding, CgObj, ObjKind, VarSpec};
use crate::parsetree::ParseTree;
use crate::var::{CgVar, VarError, VarType};
use tracing::trace;

/// An object of a level, with the callbacks it inherits through references.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'g> {
    pub obj: &'g CgObj,
    pub inherited: &'g [CallbackBinding],
    /// Index of the branch in the sets tree the object was offered from.
    pub branch: Option<usize>,
}

impl<'g> Candidate<'g> {
    /// Callbacks that run when a command ends at this object.
    pub fn callbacks(&self) -> &'g [CallbackBinding] {
        if self.obj.callbacks().is_empty() {
            self.inherited
        } else {
            self.obj.callbacks()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Child tree of the current object.
    Child,
    /// Child tree of the current object, which is a sets tree.
    NewSet,
    /// An unused branch of the open set frame at this index.
    Frame(usize),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Entry<'g> {
    pub cand: Candidate<'g>,
    pub origin: Origin,
}

#[derive(Debug, Clone)]
struct SetFrame<'g> {
    tree: &'g ParseTree,
    inherited: &'g [CallbackBinding],
    used: Vec<usize>,
}

pub(crate) struct Walk<'g, 'l> {
    grammar: &'g Grammar,
    root: &'g ParseTree,
    line: &'l str,
    opts: &'l MatchOptions,
    current: Option<Candidate<'g>>,
    frames: Vec<SetFrame<'g>>,
    pub vars: Cvec,
    pub path: Vec<String>,
}

impl<'g, 'l> Walk<'g, 'l> {
    pub fn new(
        grammar: &'g Grammar,
        tree: &str,
        line: &'l str,
        opts: &'l MatchOptions,
    ) -> Result<Self, MatchError> {
        let root = grammar
            .tree(tree)
            .ok_or_else(|| MatchError::UnknownTree(tree.to_string()))?;
        Ok(Self {
            grammar,
            root,
            line,
            opts,
            current: None,
            frames: Vec::new(),
            vars: Cvec::start(line),
            path: Vec::new(),
        })
    }

    pub fn opts(&self) -> &MatchOptions {
        self.opts
    }

    /// Whether a command may end where the walk stands.
    pub fn is_terminal(&self) -> bool {
        self.current.is_some_and(|c| c.obj.is_terminal())
    }

    /// The objects that may come next.
    pub fn level(&self) -> Result<Vec<Entry<'g>>, MatchError> {
        let mut out = Vec::new();
        let (tree, inherited) = match self.current {
            Some(c) => (c.obj.tree(), c.inherited),
            None => (self.root, &[][..]),
        };
        let origin = if tree.sets() { Origin::NewSet } else { Origin::Child };
        self.collect(tree, inherited, origin, tree.sets(), None, &[], &mut out, &mut Vec::new())?;

        if self.is_terminal() {
            if let Some(k) = self.frames.len().checked_sub(1) {
                let frame = &self.frames[k];
                self.collect(
                    frame.tree,
                    frame.inherited,
                    Origin::Frame(k),
                    true,
                    None,
                    &frame.used,
                    &mut out,
                    &mut Vec::new(),
                )?;
            }
        }
        Ok(out)
    }

    /// Add the objects of `tree` to `out`, expanding references.
    ///
    /// With `track` set each top-level object records its own index as branch and `skip` lists
    /// branches to leave out; otherwise every object gets `branch`.
    #[allow(clippy::too_many_arguments)]
    fn collect(
        &self,
        tree: &'g ParseTree,
        inherited: &'g [CallbackBinding],
        origin: Origin,
        track: bool,
        branch: Option<usize>,
        skip: &[usize],
        out: &mut Vec<Entry<'g>>,
        visited: &mut Vec<&'g str>,
    ) -> Result<(), MatchError> {
        for (i, obj) in tree.iter().enumerate() {
            if track && skip.contains(&i) {
                continue;
            }
            let branch = if track { Some(i) } else { branch };
            match obj.kind() {
                ObjKind::Empty => {}
                ObjKind::Reference => {
                    let name = obj.text();
                    if visited.contains(&name) {
                        trace!(reference = name, "skipping recursive reference");
                        continue;
                    }
                    let target = self.grammar.resolve(name)?;
                    let inherit = if obj.callbacks().is_empty() {
                        inherited
                    } else {
                        obj.callbacks()
                    };
                    trace!(reference = name, objects = target.len(), "expanding reference");
                    visited.push(name);
                    self.collect(target, inherit, origin, false, branch, &[], out, visited)?;
                    visited.pop();
                }
                ObjKind::Command | ObjKind::Variable => {
                    // A tree reached twice through references offers its objects once.
                    if out.iter().any(|e| std::ptr::eq(e.cand.obj, obj)) {
                        continue;
                    }
                    out.push(Entry {
                        cand: Candidate {
                            obj,
                            inherited,
                            branch,
                        },
                        origin,
                    });
                }
            }
        }
        Ok(())
    }

    /// Consume the token at `tokens[i]`, returning how many tokens were used.
    pub fn step(&mut self, tokens: &[InputToken], i: usize) -> Result<usize, MatchError> {
        let token = &tokens[i];
        let level = self.level()?;
        let (entry, var) = self.choose(&level, token)?;
        trace!(token = %token.text, object = %entry.cand.obj.display_name(), "matched token");
        let consumed = match &var {
            Some(var) if var.ty() == VarType::Rest => tokens.len() - i,
            _ => 1,
        };
        self.apply(entry, var)?;
        Ok(consumed)
    }

    fn choose(
        &self,
        level: &[Entry<'g>],
        token: &InputToken,
    ) -> Result<(Entry<'g>, Option<CgVar>), MatchError> {
        let keywords: Vec<&Entry<'g>> = level
            .iter()
            .filter(|e| e.cand.obj.kind() == ObjKind::Command)
            .collect();
        let exact: Vec<&Entry<'g>> = keywords
            .iter()
            .copied()
            .filter(|e| self.same(e.cand.obj.text(), &token.text))
            .collect();
        match exact.as_slice() {
            [one] => return Ok((**one, None)),
            [] => {}
            many => {
                return Err(MatchError::Ambiguous {
                    position: token.start,
                    token: token.text.clone(),
                    candidates: names(many.iter().copied(), true),
                })
            }
        }
        let prefixed: Vec<&Entry<'g>> = keywords
            .into_iter()
            .filter(|e| self.starts_with(e.cand.obj.text(), &token.text))
            .collect();
        match prefixed.as_slice() {
            [one] => return Ok((**one, None)),
            [] => {}
            many => {
                return Err(MatchError::Ambiguous {
                    position: token.start,
                    token: token.text.clone(),
                    candidates: names(many.iter().copied(), true),
                })
            }
        }

        let mut accepted: Vec<(&Entry<'g>, CgVar)> = Vec::new();
        let mut detail = None;
        for entry in level {
            let Some(spec) = entry.cand.obj.var() else {
                continue;
            };
            let text = if spec.base() == VarType::Rest {
                self.line[token.start..].trim_end()
            } else {
                token.text.as_str()
            };
            match self.bind(entry.cand.obj, spec, text) {
                Ok(var) => accepted.push((entry, var)),
                Err(err) => {
                    detail.get_or_insert_with(|| err.to_string());
                }
            }
        }

        if accepted.len() > 1 && self.opts.prefer_specific_types {
            let best = accepted
                .iter()
                .map(|(e, _)| e.cand.obj.specificity())
                .max()
                .unwrap_or_default();
            accepted.retain(|(e, _)| e.cand.obj.specificity() == best);
        }
        match accepted.len() {
            0 => Err(MatchError::NoMatch {
                position: token.start,
                token: token.text.clone(),
                expected: names(level.iter(), false),
                detail,
            }),
            1 => {
                let (entry, var) = accepted.remove(0);
                Ok((*entry, Some(var)))
            }
            _ => Err(MatchError::Ambiguous {
                position: token.start,
                token: token.text.clone(),
                candidates: names(accepted.iter().map(|(e, _)| *e), true),
            }),
        }
    }

    /// Parse `text` as a value of the variable `obj`, then translate it.
    fn bind(&self, obj: &CgObj, spec: &VarSpec, text: &str) -> Result<CgVar, VarError> {
        let text = if self.opts.case_insensitive {
            spec.choices()
                .iter()
                .find(|c| self.same(c, text))
                .map_or(text, String::as_str)
        } else {
            text
        };
        let mut var = spec.parse(obj.text(), text)?;
        if let Some(translate) = spec.translate() {
            translate.func.translate(&mut var)?;
        }
        Ok(var)
    }

    /// Move to `entry`, binding `var` (or the keyword) into the vector.
    pub fn apply(&mut self, entry: Entry<'g>, var: Option<CgVar>) -> Result<(), MatchError> {
        match (entry.origin, entry.cand.branch) {
            (Origin::NewSet, Some(branch)) => {
                let (tree, inherited) = match self.current {
                    Some(c) => (c.obj.tree(), c.inherited),
                    None => (self.root, &[][..]),
                };
                self.frames.push(SetFrame {
                    tree,
                    inherited,
                    used: vec![branch],
                });
            }
            (Origin::Frame(k), Some(branch)) => {
                self.frames.truncate(k + 1);
                if let Some(frame) = self.frames.last_mut() {
                    frame.used.push(branch);
                }
            }
            _ => {}
        }

        match var {
            Some(var) => {
                self.vars.append_var(&var)?;
            }
            None if !self.opts.exclude_keys => {
                self.vars.append_var(&CgVar::keyword(entry.cand.obj.text()))?;
            }
            None => {}
        }
        self.path.push(entry.cand.obj.display_name());
        self.current = Some(entry.cand);
        Ok(())
    }

    /// The keyword `word` names exactly, when no other keyword of the level starts with it.
    pub fn unique_keyword(&self, word: &str) -> Result<Option<Entry<'g>>, MatchError> {
        let level = self.level()?;
        let mut prefixed = level.into_iter().filter(|e| {
            e.cand.obj.kind() == ObjKind::Command && self.starts_with(e.cand.obj.text(), word)
        });
        match (prefixed.next(), prefixed.next()) {
            (Some(only), None) if self.same(only.cand.obj.text(), word) => Ok(Some(only)),
            _ => Ok(None),
        }
    }

    /// End of input: succeed if the walk stands on a terminal.
    pub fn finish(self) -> Result<CommandMatch, MatchError> {
        match self.current {
            Some(c) if c.obj.is_terminal() => Ok(CommandMatch {
                vars: self.vars,
                callbacks: c.callbacks().to_vec(),
                path: self.path,
            }),
            _ => Err(MatchError::Incomplete {
                position: self.line.len(),
                expected: names(self.level()?.iter(), false),
            }),
        }
    }

    pub fn same(&self, a: &str, b: &str) -> bool {
        if self.opts.case_insensitive {
            a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }

    pub fn starts_with(&self, text: &str, prefix: &str) -> bool {
        if self.opts.case_insensitive {
            text.to_lowercase().starts_with(&prefix.to_lowercase())
        } else {
            text.starts_with(prefix)
        }
    }
}

/// Display names of entries, deduplicated. Hidden objects are left out unless `with_hidden`.
fn names<'a, 'g: 'a>(entries: impl Iterator<Item = &'a Entry<'g>>, with_hidden: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entry in entries {
        if entry.cand.obj.is_hidden() && !with_hidden {
            continue;
        }
        let name = entry.cand.obj.display_name();
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::tokens::tokenize;
    use crate::testing;

    fn walk<'g, 'l>(grammar: &'g Grammar, line: &'l str, opts: &'l MatchOptions) -> Walk<'g, 'l> {
        let tokens = tokenize(line);
        let mut walk = Walk::new(grammar, "main", line, opts).unwrap();
        let mut i = 0;
        while i < tokens.len() {
            i += walk.step(&tokens, i).unwrap();
        }
        walk
    }

    fn level_names(walk: &Walk) -> Vec<String> {
        walk.level().unwrap().iter().map(|e| e.cand.obj.display_name()).collect()
    }

    #[test]
    fn test_references_expand_in_place() {
        let grammar = testing::compile(
            "ip @addr;\nset @addr;\ntreename=\"addr\";\naddress <a:ipv4addr>;\nnone;",
        );
        let opts = MatchOptions::default();
        assert_eq!(level_names(&walk(&grammar, "ip", &opts)), ["address", "none"]);
    }

    #[test]
    fn test_same_keyword_through_references_is_ambiguous() {
        let grammar = testing::compile(
            "ip @v4;\nip @v6;\ntreename=\"v4\";\nroute, cb(\"v4\");\ntreename=\"v6\";\nroute, cb(\"v6\");",
        );
        let opts = MatchOptions::default();
        let tokens = tokenize("ip route");
        let mut w = Walk::new(&grammar, "main", "ip route", &opts).unwrap();
        assert_eq!(w.step(&tokens, 0), Ok(1));
        assert_eq!(
            w.step(&tokens, 1),
            Err(MatchError::Ambiguous {
                position: 3,
                token: "route".into(),
                candidates: vec!["route".into()],
            })
        );
    }

    #[test]
    fn test_recursive_reference_terminates() {
        let grammar = testing::compile("treename=\"loop\";\n@loop;\nx;");
        let opts = MatchOptions::default();
        let walk = Walk::new(&grammar, "loop", "", &opts).unwrap();
        assert_eq!(level_names(&walk), ["x"]);
    }

    #[test]
    fn test_sets_reoffer_unused_branches() {
        let grammar = testing::compile("if <name:string>; @{ mtu <m:uint16>; shutdown; speed <s:uint32>; }");
        let opts = MatchOptions::default();
        let w = walk(&grammar, "if eth0 mtu 1500", &opts);
        assert_eq!(level_names(&w), ["shutdown", "speed"]);
        let w = walk(&grammar, "if eth0 mtu 1500 speed 10", &opts);
        assert_eq!(level_names(&w), ["shutdown"]);
        assert!(w.is_terminal());
    }

    #[test]
    fn test_unique_keyword() {
        let grammar = testing::compile("show; shutdown; set;");
        let opts = MatchOptions::default();
        let walk = Walk::new(&grammar, "main", "", &opts).unwrap();
        assert!(walk.unique_keyword("set").unwrap().is_some());
        assert!(walk.unique_keyword("sh").unwrap().is_none());
        assert!(walk.unique_keyword("show").unwrap().is_some());
    }
}
