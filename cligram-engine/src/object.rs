//! Grammar objects
//!
//! A [`CgObj`] is one node of a compiled grammar. Its kind decides what the `command` text means:
//!
//!   Command    the keyword itself                     `show`
//!   Variable   the variable name (plus a [`VarSpec`])  `<n:int32>`
//!   Reference  the name of the referenced tree        `@interfaces`
//!   Empty      nothing; marks "a command may end here"  `;`
//!
//! Each object owns the tree of what may follow it. An object whose child tree holds an `Empty`
//! object is terminal: the input may stop right after it. Callbacks live on terminal objects.

pub mod varspec;

pub use varspec::{ExpandBinding, Pattern, TranslateBinding, VarSpec};

use crate::cvec::Cvec;
use crate::parsetree::ParseTree;
use crate::registry::{CallbackResult, CommandCallback};
use crate::var::{CgVar, VarError};
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjKind {
    Command,
    Variable,
    Reference,
    Empty,
}

/// Display flags of an object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ObjFlags(u8);

impl ObjFlags {
    pub const NONE: ObjFlags = ObjFlags(0);
    /// Left out of completion and help.
    pub const HIDE: ObjFlags = ObjFlags(0b01);
    /// Left out of database (configuration) output.
    pub const HIDE_DATABASE: ObjFlags = ObjFlags(0b10);

    pub fn contains(self, other: ObjFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ObjFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ObjFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ObjFlags {
    type Output = ObjFlags;

    fn bitor(self, rhs: ObjFlags) -> ObjFlags {
        ObjFlags(self.0 | rhs.0)
    }
}

/// A `, name(args)` callback attached to an object.
#[derive(Clone)]
pub struct CallbackBinding {
    name: String,
    args: Cvec,
    func: Arc<dyn CommandCallback>,
}

impl CallbackBinding {
    pub fn new(name: &str, args: Cvec, func: Arc<dyn CommandCallback>) -> Self {
        Self {
            name: name.to_string(),
            args,
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments written in the grammar.
    pub fn args(&self) -> &Cvec {
        &self.args
    }

    pub fn call(&self, vars: &Cvec) -> CallbackResult {
        self.func.call(vars, &self.args)
    }
}

impl fmt::Debug for CallbackBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackBinding")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CallbackBinding {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.args == other.args
    }
}

/// One node of a compiled grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct CgObj {
    kind: ObjKind,
    command: String,
    var: Option<VarSpec>,
    help: Vec<String>,
    callbacks: Vec<CallbackBinding>,
    flags: ObjFlags,
    tree: ParseTree,
}

impl CgObj {
    fn with_kind(kind: ObjKind, command: &str) -> Self {
        Self {
            kind,
            command: command.to_string(),
            var: None,
            help: Vec::new(),
            callbacks: Vec::new(),
            flags: ObjFlags::NONE,
            tree: ParseTree::new(),
        }
    }

    pub fn command(text: &str) -> Self {
        Self::with_kind(ObjKind::Command, text)
    }

    pub fn variable(name: &str, spec: VarSpec) -> Self {
        let mut obj = Self::with_kind(ObjKind::Variable, name);
        obj.var = Some(spec);
        obj
    }

    pub fn reference(target: &str) -> Self {
        Self::with_kind(ObjKind::Reference, target)
    }

    pub fn empty() -> Self {
        Self::with_kind(ObjKind::Empty, "")
    }

    pub fn kind(&self) -> ObjKind {
        self.kind
    }

    /// Keyword text, variable name or reference target, depending on the kind.
    pub fn text(&self) -> &str {
        &self.command
    }

    pub fn var(&self) -> Option<&VarSpec> {
        self.var.as_ref()
    }

    pub fn var_mut(&mut self) -> Option<&mut VarSpec> {
        self.var.as_mut()
    }

    pub fn help(&self) -> &[String] {
        &self.help
    }

    pub fn set_help(&mut self, help: Vec<String>) {
        self.help = help;
    }

    /// First help line, if any.
    pub fn help_line(&self) -> Option<&str> {
        self.help.first().map(String::as_str)
    }

    pub fn callbacks(&self) -> &[CallbackBinding] {
        &self.callbacks
    }

    pub fn set_callbacks(&mut self, callbacks: Vec<CallbackBinding>) {
        self.callbacks = callbacks;
    }

    pub fn add_callback(&mut self, callback: CallbackBinding) {
        self.callbacks.push(callback);
    }

    pub fn flags(&self) -> ObjFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ObjFlags) {
        self.flags = flags;
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(ObjFlags::HIDE)
    }

    /// What may follow this object.
    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ParseTree {
        &mut self.tree
    }

    pub fn is_terminal(&self) -> bool {
        self.tree.is_terminal()
    }

    /// Whether the two objects accept the same tokens: equal keyword text, equal reference target,
    /// or variables of the same declared type, constraints aside.
    pub fn equivalent(&self, other: &CgObj) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match (self.kind, &self.var, &other.var) {
            (ObjKind::Variable, Some(a), Some(b)) => a.equivalent(b),
            (ObjKind::Empty, _, _) => true,
            _ => self.command == other.command,
        }
    }

    /// Whether `other` describes the same node, children, help and flags aside. Identical objects at
    /// one level are merged by the compiler.
    pub fn identical(&self, other: &CgObj) -> bool {
        self.equivalent(other) && self.command == other.command && self.var == other.var
    }

    /// Rank used when several objects accept the same token.
    ///
    /// Keywords outrank every variable. Among variables the narrower type wins, and a constrained
    /// variable beats an unconstrained one of the same base type, as with a registered type over
    /// `string`, or two variables brought to one level through a reference.
    pub fn specificity(&self) -> u8 {
        match (&self.kind, &self.var) {
            (ObjKind::Command, _) => u8::MAX,
            (ObjKind::Variable, Some(spec)) => {
                spec.base().specificity() * 2 + u8::from(spec.is_constrained())
            }
            _ => 0,
        }
    }

    /// Check a candidate value against the variable's constraints. Non-variables accept anything.
    pub fn validate(&self, var: &CgVar) -> Result<(), VarError> {
        match &self.var {
            Some(spec) => spec.validate(var),
            None => Ok(()),
        }
    }

    /// How the object is named in help and completion: the keyword, `<name>` (or `<show>`) for a
    /// variable, `(a|b)` for a choice variable, `@name` for a reference.
    pub fn display_name(&self) -> String {
        match (&self.kind, &self.var) {
            (ObjKind::Command, _) => self.command.clone(),
            (ObjKind::Variable, Some(spec)) if !spec.choices().is_empty() => {
                if spec.choices().len() > 1 {
                    format!("({})", spec.choices().join("|"))
                } else {
                    spec.choices().join("|")
                }
            }
            (ObjKind::Variable, Some(spec)) => {
                format!("<{}>", spec.show().unwrap_or(&self.command))
            }
            (ObjKind::Reference, _) => format!("@{}", self.command),
            _ => "<cr>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn int32(name: &str) -> CgObj {
        CgObj::variable(name, VarSpec::new(Registry::new().var_type("int32").unwrap()))
    }

    #[test]
    fn test_terminal() {
        let mut show = CgObj::command("show");
        assert!(!show.is_terminal());
        show.tree_mut().push(CgObj::empty());
        assert!(show.is_terminal());
    }

    #[test]
    fn test_equivalence() {
        assert!(CgObj::command("foo").equivalent(&CgObj::command("foo")));
        assert!(!CgObj::command("foo").equivalent(&CgObj::reference("foo")));
        assert!(int32("a").equivalent(&int32("b")));
        assert!(!int32("a").identical(&int32("b")));
        assert!(int32("a").identical(&int32("a")));
    }

    #[test]
    fn test_identity_ignores_children_help_and_flags() {
        let mut a = CgObj::command("show");
        a.set_help(vec!["Show things".into()]);
        a.tree_mut().push(CgObj::command("version"));
        assert!(a.identical(&CgObj::command("show")));
        let mut hidden = CgObj::command("show");
        hidden.set_flags(ObjFlags::HIDE);
        assert!(a.identical(&hidden));
        assert!(!a.identical(&CgObj::command("shoe")));
    }

    #[test]
    fn test_specificity_order() {
        let registry = Registry::new();
        let rest = CgObj::variable("r", VarSpec::new(registry.var_type("rest").unwrap()));
        let string = CgObj::variable("s", VarSpec::new(registry.var_type("string").unwrap()));
        let mut constrained = VarSpec::new(registry.var_type("string").unwrap());
        constrained.add_pattern("a.*").unwrap();
        let constrained = CgObj::variable("c", constrained);
        assert!(rest.specificity() < string.specificity());
        assert!(string.specificity() < constrained.specificity());
        assert!(constrained.specificity() < int32("n").specificity());
        assert!(int32("n").specificity() < CgObj::command("x").specificity());
    }

    #[test]
    fn test_flags() {
        let mut flags = ObjFlags::HIDE | ObjFlags::HIDE_DATABASE;
        assert!(flags.contains(ObjFlags::HIDE));
        flags.remove(ObjFlags::HIDE);
        assert!(!flags.contains(ObjFlags::HIDE));
        assert!(flags.contains(ObjFlags::HIDE_DATABASE));
        assert!(ObjFlags::NONE.is_empty());
    }

    #[test]
    fn test_display_name() {
        let mut spec = VarSpec::new(Registry::new().var_type("string").unwrap());
        spec.set_show(Some("ifname"));
        assert_eq!(CgObj::variable("name", spec).display_name(), "<ifname>");
        assert_eq!(int32("n").display_name(), "<n>");
        assert_eq!(CgObj::reference("sub").display_name(), "@sub");
        assert_eq!(CgObj::empty().display_name(), "<cr>");
    }

    #[test]
    fn test_callback_binding() {
        let binding = CallbackBinding::new(
            "fail",
            Cvec::new(),
            Arc::new(|_: &Cvec, _: &Cvec| -> CallbackResult { Err("boom".into()) }),
        );
        let err = binding.call(&Cvec::start("x")).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(binding.name(), "fail");
    }
}
