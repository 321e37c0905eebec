//! Variable vectors
//!
//! A [`Cvec`] is an ordered, optionally named collection of [`CgVar`]s. The matcher fills one with the
//! values bound while walking a command line, and the same type carries the argument list declared
//! next to a callback in the grammar (`, fn("a", "b")`).
//!
//! Conventions:
//!
//! - Index 0 of a vector handed to a callback is the whole command line, named `cmd`, of type `rest`
//!   (see [`Cvec::start`]). [`Cvec::args`] iterates everything after it.
//! - Storage is contiguous and index addressed. Removing an entry shifts the following entries down by
//!   one, so indices obtained before a removal or an append must be fetched again afterwards. The
//!   borrow checker already refuses to keep a `&CgVar` alive across those calls; the same rule applies
//!   to remembered indices.
//! - The vector owns its values. [`Cvec::dup`] (and `Clone`) deep-copies every value and the name.

use crate::var::{CgVar, VarType};
use std::collections::TryReserveError;
use std::fmt;
use std::ops::Index;
use thiserror::Error;

/// Errors of vector mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CvecError {
    #[error("allocation failure while growing a variable vector: {0}")]
    AllocationFailure(#[from] TryReserveError),
}

/// Which entries a lookup by name may return.
///
/// This is the per-call form of the "exclude keys from search" switch: callers decide for each lookup
/// instead of flipping shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeySearch {
    /// Keywords and variables alike.
    #[default]
    Any,
    KeywordsOnly,
    VariablesOnly,
}

impl KeySearch {
    /// `VariablesOnly` when keywords are excluded, `Any` otherwise.
    pub fn from_exclude_keys(exclude_keys: bool) -> Self {
        if exclude_keys {
            KeySearch::VariablesOnly
        } else {
            KeySearch::Any
        }
    }

    fn admits(self, var: &CgVar) -> bool {
        match self {
            KeySearch::Any => true,
            KeySearch::KeywordsOnly => var.is_keyword(),
            KeySearch::VariablesOnly => !var.is_keyword(),
        }
    }
}

/// Ordered vector of variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cvec {
    name: Option<String>,
    vars: Vec<CgVar>,
}

impl Cvec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vector of `len` uninitialised (`error` typed) entries.
    pub fn with_len(len: usize) -> Self {
        Self {
            name: None,
            vars: vec![CgVar::default(); len],
        }
    }

    /// A vector whose only entry is the whole command line: name `cmd`, type `rest`.
    pub fn start(cmd: &str) -> Self {
        Self {
            name: None,
            vars: vec![CgVar::rest(Some("cmd"), cmd)],
        }
    }

    /// A vector holding a copy of `var`.
    pub fn from_var(var: &CgVar) -> Self {
        Self {
            name: None,
            vars: vec![var.clone()],
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&CgVar> {
        self.vars.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut CgVar> {
        self.vars.get_mut(i)
    }

    /// Text of entry `i`, if it exists and holds a string-like value.
    pub fn get_str(&self, i: usize) -> Option<&str> {
        self.vars.get(i).and_then(|v| v.string_value().ok())
    }

    /// Append a fresh entry of type `ty` and return it for filling.
    pub fn add(&mut self, ty: VarType) -> Result<&mut CgVar, CvecError> {
        self.vars.try_reserve(1)?;
        self.vars.push(CgVar::new(ty));
        Ok(self.tail())
    }

    /// Append a copy of `var`.
    ///
    /// Space is reserved before the copy is made, so a failed append leaves the vector exactly as it
    /// was: no half-built entry survives.
    pub fn append_var(&mut self, var: &CgVar) -> Result<&mut CgVar, CvecError> {
        self.vars.try_reserve(1)?;
        self.vars.push(var.clone());
        Ok(self.tail())
    }

    /// Append `var`, moving it in.
    pub fn push(&mut self, var: CgVar) {
        self.vars.push(var);
    }

    /// Remove entry `i`, shifting every later entry down by one. `None` when `i` is out of bounds.
    pub fn remove(&mut self, i: usize) -> Option<CgVar> {
        if i < self.vars.len() {
            Some(self.vars.remove(i))
        } else {
            None
        }
    }

    /// Remove the first entry equal to `var`.
    ///
    /// Linear scan by value; prefer [`Cvec::remove`] with a freshly fetched index.
    pub fn remove_matching(&mut self, var: &CgVar) -> Option<CgVar> {
        let i = self.vars.iter().position(|v| v == var)?;
        self.remove(i)
    }

    /// First entry named `name`, keyword or not.
    pub fn find(&self, name: &str) -> Option<&CgVar> {
        self.find_with(name, KeySearch::Any)
    }

    pub fn find_keyword(&self, name: &str) -> Option<&CgVar> {
        self.find_with(name, KeySearch::KeywordsOnly)
    }

    pub fn find_var(&self, name: &str) -> Option<&CgVar> {
        self.find_with(name, KeySearch::VariablesOnly)
    }

    pub fn find_with(&self, name: &str, search: KeySearch) -> Option<&CgVar> {
        self.vars
            .iter()
            .find(|v| v.name() == Some(name) && search.admits(v))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut CgVar> {
        self.vars.iter_mut().find(|v| v.name() == Some(name))
    }

    /// First entry without a name.
    pub fn find_unnamed(&self) -> Option<&CgVar> {
        self.vars.iter().find(|v| v.name().is_none())
    }

    /// Text of the first entry named `name`, when that entry is string-like.
    ///
    /// Does not distinguish "not found" from "found with another type".
    pub fn find_str(&self, name: &str) -> Option<&str> {
        self.find(name).and_then(|v| v.string_value().ok())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CgVar> {
        self.vars.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, CgVar> {
        self.vars.iter_mut()
    }

    /// Every entry except index 0 (the command line).
    pub fn args(&self) -> std::slice::Iter<'_, CgVar> {
        self.vars.get(1..).unwrap_or_default().iter()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(str::to_string);
    }

    /// Deep copy.
    pub fn dup(&self) -> Self {
        self.clone()
    }

    /// Drop every entry and the name.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.name = None;
    }

    /// Approximate memory footprint in bytes.
    pub fn size(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.as_ref().map_or(0, |n| n.capacity())
            + self.vars.iter().map(CgVar::size).sum::<usize>()
    }

    fn tail(&mut self) -> &mut CgVar {
        let last = self.vars.len() - 1;
        &mut self.vars[last]
    }
}

impl Index<usize> for Cvec {
    type Output = CgVar;

    fn index(&self, i: usize) -> &CgVar {
        &self.vars[i]
    }
}

impl<'a> IntoIterator for &'a Cvec {
    type Item = &'a CgVar;
    type IntoIter = std::slice::Iter<'a, CgVar>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.iter()
    }
}

impl FromIterator<CgVar> for Cvec {
    fn from_iter<I: IntoIterator<Item = CgVar>>(iter: I) -> Self {
        Self {
            name: None,
            vars: iter.into_iter().collect(),
        }
    }
}

/// One line per entry: `<index> : <name> = <value>`, preceded by `<vector name>:` when named.
impl fmt::Display for Cvec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "{}:", name)?;
        }
        for (i, var) in self.vars.iter().enumerate() {
            match var.name() {
                Some(name) => writeln!(f, "{} : {} = {}", i, name, var)?,
                None => writeln!(f, "{} : {}", i, var)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Cvec {
        let mut cvec = Cvec::start("set mtu 1500");
        cvec.push(CgVar::keyword("set"));
        cvec.add(VarType::Uint16).unwrap().set_uint16(1500).unwrap();
        cvec.get_mut(2).unwrap().set_name(Some("mtu"));
        cvec
    }

    #[test]
    fn test_start_holds_command_line() {
        let cvec = Cvec::start("show version");
        assert_eq!(cvec.len(), 1);
        assert_eq!(cvec[0].name(), Some("cmd"));
        assert_eq!(cvec[0].ty(), VarType::Rest);
        assert_eq!(cvec.get_str(0), Some("show version"));
        assert_eq!(cvec.args().count(), 0);
    }

    #[test]
    fn test_with_len_is_uninitialised() {
        let cvec = Cvec::with_len(3);
        assert_eq!(cvec.len(), 3);
        assert!(cvec.iter().all(|v| v.ty() == VarType::Error));
    }

    #[test]
    fn test_remove_shifts_down() {
        let mut cvec = sample();
        let removed = cvec.remove(1).unwrap();
        assert_eq!(removed.name(), Some("set"));
        assert_eq!(cvec.len(), 2);
        assert_eq!(cvec[1].name(), Some("mtu"));
        assert!(cvec.remove(5).is_none());
    }

    #[test]
    fn test_remove_matching() {
        let mut cvec = sample();
        let keyword = CgVar::keyword("set");
        assert!(cvec.remove_matching(&keyword).is_some());
        assert!(cvec.remove_matching(&keyword).is_none());
        assert_eq!(cvec.len(), 2);
    }

    #[test]
    fn test_find_variants() {
        let mut cvec = sample();
        cvec.push(CgVar::string(Some("set"), "value"));
        assert!(cvec.find("set").unwrap().is_keyword());
        assert!(cvec.find_keyword("set").unwrap().is_keyword());
        assert_eq!(cvec.find_var("set").unwrap().string_value(), Ok("value"));
        assert_eq!(
            cvec.find_with("set", KeySearch::from_exclude_keys(true))
                .unwrap()
                .string_value(),
            Ok("value")
        );
        assert_eq!(cvec.find_str("cmd"), Some("set mtu 1500"));
        assert_eq!(cvec.find_str("mtu"), None);
        assert!(cvec.find("missing").is_none());
    }

    #[test]
    fn test_dup_is_deep_and_named() {
        let mut cvec = sample();
        cvec.set_name(Some("args"));
        let copy = cvec.dup();
        cvec.get_mut(2).unwrap().set_uint16(9000).unwrap();
        assert_eq!(copy.name(), Some("args"));
        assert_eq!(copy.find("mtu").unwrap().uint16(), Ok(1500));
        assert_ne!(copy, cvec);
    }

    #[test]
    fn test_display() {
        let mut cvec = sample();
        cvec.set_name(Some("args"));
        assert_eq!(
            cvec.to_string(),
            "args:\n0 : cmd = set mtu 1500\n1 : set = set\n2 : mtu = 1500\n"
        );
    }

    #[test]
    fn test_size_and_reset() {
        let mut cvec = sample();
        assert!(cvec.size() > std::mem::size_of::<Cvec>());
        cvec.reset();
        assert!(cvec.is_empty());
        assert_eq!(cvec.name(), None);
    }
}
