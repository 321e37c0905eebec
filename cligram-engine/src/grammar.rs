//! Compiled grammars
//!
//! A [`Grammar`] is what the compiler produces from one source text: named trees in definition
//! order, plus the top-level assignments (`prompt="cli> ";`) collected in `globals`. Statements
//! before any `treename="...";` assignment go to the tree named [`DEFAULT_TREE`].
//!
//! `@name` references are resolved against the trees of the same grammar.

use crate::cvec::Cvec;
use crate::parsetree::ParseTree;
use crate::var::CgVar;
use thiserror::Error;

/// Tree receiving statements that precede any `treename` assignment.
pub const DEFAULT_TREE: &str = "main";

/// A reference or lookup named a tree the grammar does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved reference to tree `{0}`")]
pub struct UnresolvedReference(pub String);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grammar {
    trees: Vec<ParseTree>,
    globals: Cvec,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self, name: &str) -> Option<&ParseTree> {
        self.trees.iter().find(|t| t.name() == Some(name))
    }

    pub fn tree_mut(&mut self, name: &str) -> Option<&mut ParseTree> {
        self.trees.iter_mut().find(|t| t.name() == Some(name))
    }

    /// The tree named `name`, created empty at the end if missing.
    pub fn tree_or_insert(&mut self, name: &str) -> &mut ParseTree {
        let i = match self.trees.iter().position(|t| t.name() == Some(name)) {
            Some(i) => i,
            None => {
                self.trees.push(ParseTree::named(name));
                self.trees.len() - 1
            }
        };
        &mut self.trees[i]
    }

    /// Target of `@name`.
    pub fn resolve(&self, name: &str) -> Result<&ParseTree, UnresolvedReference> {
        self.tree(name)
            .ok_or_else(|| UnresolvedReference(name.to_string()))
    }

    pub fn trees(&self) -> std::slice::Iter<'_, ParseTree> {
        self.trees.iter()
    }

    pub fn tree_names(&self) -> Vec<&str> {
        self.trees.iter().filter_map(ParseTree::name).collect()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Top-level assignments, in source order.
    pub fn globals(&self) -> &Cvec {
        &self.globals
    }

    /// Value of the assignment `name="..."`. A later assignment overrides an earlier one.
    pub fn global(&self, name: &str) -> Option<&str> {
        self.globals
            .iter()
            .rev()
            .find(|v| v.name() == Some(name))
            .and_then(|v| v.string_value().ok())
    }

    pub fn set_global(&mut self, name: &str, value: &str) {
        match self.globals.find_mut(name) {
            Some(var) => *var = CgVar::string(Some(name), value),
            None => self.globals.push(CgVar::string(Some(name), value)),
        }
    }
}
