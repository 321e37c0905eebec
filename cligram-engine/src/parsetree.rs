//! Parse trees
//!
//! A [`ParseTree`] is one level of a grammar: the sibling objects that may come next, in source
//! order. Trees nest through [`CgObj::tree`]; dropping a tree drops everything below it.
//!
//! A tree flagged as `sets` (written `@{ ... }`) lets its branches be given in any order, each at
//! most once, on the same command line.

use crate::object::{CgObj, ObjKind};
use crate::printing;
use std::fmt;
use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseTree {
    name: Option<String>,
    objs: Vec<CgObj>,
    sets: bool,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&CgObj> {
        self.objs.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut CgObj> {
        self.objs.get_mut(i)
    }

    pub fn push(&mut self, obj: CgObj) {
        self.objs.push(obj);
    }

    /// Insert at `i`, shifting later objects up. Panics when `i > len`, like [`Vec::insert`].
    pub fn insert(&mut self, i: usize, obj: CgObj) {
        self.objs.insert(i, obj);
    }

    /// Remove the object at `i` together with its subtree.
    pub fn remove(&mut self, i: usize) -> Option<CgObj> {
        if i < self.objs.len() {
            Some(self.objs.remove(i))
        } else {
            None
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CgObj> {
        self.objs.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CgObj> {
        self.objs.iter_mut()
    }

    pub fn objs(&self) -> &[CgObj] {
        &self.objs
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    pub fn sets(&self) -> bool {
        self.sets
    }

    pub fn set_sets(&mut self, sets: bool) {
        self.sets = sets;
    }

    /// Whether a command may end at this level.
    pub fn is_terminal(&self) -> bool {
        self.objs.iter().any(|o| o.kind() == ObjKind::Empty)
    }

    /// Index of the first keyword with exactly this text.
    pub fn find_command(&self, text: &str) -> Option<usize> {
        self.objs
            .iter()
            .position(|o| o.kind() == ObjKind::Command && o.text() == text)
    }

    /// Number of objects in this tree and every tree below it.
    pub fn count_objects(&self) -> usize {
        self.objs
            .iter()
            .map(|o| 1 + o.tree().count_objects())
            .sum()
    }
}

impl Index<usize> for ParseTree {
    type Output = CgObj;

    fn index(&self, i: usize) -> &CgObj {
        &self.objs[i]
    }
}

impl IndexMut<usize> for ParseTree {
    fn index_mut(&mut self, i: usize) -> &mut CgObj {
        &mut self.objs[i]
    }
}

impl<'a> IntoIterator for &'a ParseTree {
    type Item = &'a CgObj;
    type IntoIter = std::slice::Iter<'a, CgObj>;

    fn into_iter(self) -> Self::IntoIter {
        self.objs.iter()
    }
}

/// Full grammar syntax, see [`printing::print_tree`].
impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&printing::print_tree(self, false))
    }
}
