//! Capability tables
//!
//! A [`Registry`] maps the names a grammar mentions to the code behind them:
//!
//!   variable types      `<x:int32>`             -> [`VarTypeHandler`]
//!   callbacks           `, print("a")`          -> [`CommandCallback`]
//!   expand functions    `<x:string list()>`     -> [`Expander`]
//!   translate functions `<x:string translate:upper()>` -> [`Translator`]
//!
//! Every name is looked up once, while compiling. A compiled grammar holds the resolved `Arc`s, so
//! matching never dispatches on strings and a name that is not registered fails the compile instead
//! of the first command that uses it.
//!
//! All capabilities are `Send + Sync`: a compiled grammar is shared read-only between threads.

use crate::cvec::Cvec;
use crate::var::{CgVar, VarError, VarType};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a callback returns. Any error stops the remaining callbacks of the command.
pub type CallbackResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Parse, format and compare functions of one variable type.
///
/// Built-in types are handled by the value parsers in [`crate::var`]. Applications register their own
/// handlers for new type names; such a type stores its values in the payload of its [`base`] type.
///
/// [`base`]: VarTypeHandler::base
pub trait VarTypeHandler: Send + Sync {
    /// Name used in grammar text.
    fn name(&self) -> &str;

    /// Payload type of variables declared with this type.
    fn base(&self) -> VarType;

    /// Set `var` (already typed with [`base`](VarTypeHandler::base)) from `text`.
    fn parse(&self, var: &mut CgVar, text: &str) -> Result<(), VarError> {
        var.parse(text)
    }

    fn format(&self, var: &CgVar) -> String {
        var.to_text()
    }

    fn compare(&self, a: &CgVar, b: &CgVar) -> Result<Ordering, VarError> {
        a.compare(b)
    }
}

/// A function bound to a command with `, name(args)`.
///
/// `vars` is the vector produced by the match (index 0 is the command line), `args` the arguments
/// written in the grammar.
pub trait CommandCallback: Send + Sync {
    fn call(&self, vars: &Cvec, args: &Cvec) -> CallbackResult;
}

impl<F> CommandCallback for F
where
    F: Fn(&Cvec, &Cvec) -> CallbackResult + Send + Sync,
{
    fn call(&self, vars: &Cvec, args: &Cvec) -> CallbackResult {
        self(vars, args)
    }
}

/// One value offered by an [`Expander`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub value: String,
    pub help: Option<String>,
}

impl Expansion {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            help: None,
        }
    }

    pub fn with_help(value: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            help: Some(help.into()),
        }
    }
}

/// Produces the values a variable may take, for completion.
///
/// `args` are the arguments written in the grammar, `vars` what the line matched so far.
pub trait Expander: Send + Sync {
    fn expand(&self, args: &Cvec, vars: &Cvec) -> Vec<Expansion>;
}

impl<F> Expander for F
where
    F: Fn(&Cvec, &Cvec) -> Vec<Expansion> + Send + Sync,
{
    fn expand(&self, args: &Cvec, vars: &Cvec) -> Vec<Expansion> {
        self(args, vars)
    }
}

/// Rewrites a matched variable before it is bound.
pub trait Translator: Send + Sync {
    fn translate(&self, var: &mut CgVar) -> Result<(), VarError>;
}

impl<F> Translator for F
where
    F: Fn(&mut CgVar) -> Result<(), VarError> + Send + Sync,
{
    fn translate(&self, var: &mut CgVar) -> Result<(), VarError> {
        self(var)
    }
}

/// Handler of a built-in type.
#[derive(Debug, Clone, Copy)]
struct Builtin(VarType);

impl VarTypeHandler for Builtin {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn base(&self) -> VarType {
        self.0
    }
}

/// Name to capability tables used by the compiler.
#[derive(Clone, Default)]
pub struct Registry {
    types: HashMap<String, Arc<dyn VarTypeHandler>>,
    callbacks: HashMap<String, Arc<dyn CommandCallback>>,
    expanders: HashMap<String, Arc<dyn Expander>>,
    translators: HashMap<String, Arc<dyn Translator>>,
}

impl Registry {
    /// A registry knowing every built-in variable type and nothing else.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for ty in VarType::BUILTIN {
            registry.register_type(Builtin(*ty));
        }
        registry
    }

    /// A registry without any type, not even the built-in ones.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a variable type, replacing any type of the same name.
    pub fn register_type(&mut self, handler: impl VarTypeHandler + 'static) -> &mut Self {
        self.types
            .insert(handler.name().to_string(), Arc::new(handler));
        self
    }

    pub fn register_callback(
        &mut self,
        name: &str,
        callback: impl CommandCallback + 'static,
    ) -> &mut Self {
        self.callbacks.insert(name.to_string(), Arc::new(callback));
        self
    }

    pub fn register_expander(&mut self, name: &str, expander: impl Expander + 'static) -> &mut Self {
        self.expanders.insert(name.to_string(), Arc::new(expander));
        self
    }

    pub fn register_translator(
        &mut self,
        name: &str,
        translator: impl Translator + 'static,
    ) -> &mut Self {
        self.translators.insert(name.to_string(), Arc::new(translator));
        self
    }

    pub fn var_type(&self, name: &str) -> Option<Arc<dyn VarTypeHandler>> {
        self.types.get(name).cloned()
    }

    pub fn callback(&self, name: &str) -> Option<Arc<dyn CommandCallback>> {
        self.callbacks.get(name).cloned()
    }

    pub fn expander(&self, name: &str) -> Option<Arc<dyn Expander>> {
        self.expanders.get(name).cloned()
    }

    pub fn translator(&self, name: &str) -> Option<Arc<dyn Translator>> {
        self.translators.get(name).cloned()
    }

    /// Registered callback names, sorted.
    pub fn callback_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut expanders: Vec<&String> = self.expanders.keys().collect();
        expanders.sort_unstable();
        let mut translators: Vec<&String> = self.translators.keys().collect();
        translators.sort_unstable();
        f.debug_struct("Registry")
            .field("types", &self.type_names())
            .field("callbacks", &self.callback_names())
            .field("expanders", &expanders)
            .field("translators", &translators)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// TCP/UDP port: a uint16 that refuses 0.
    struct Port;

    impl VarTypeHandler for Port {
        fn name(&self) -> &str {
            "port"
        }

        fn base(&self) -> VarType {
            VarType::Uint16
        }

        fn parse(&self, var: &mut CgVar, text: &str) -> Result<(), VarError> {
            var.parse(text)?;
            if var.uint16()? == 0 {
                return Err(VarError::InvalidFormat {
                    ty: VarType::Uint16,
                    text: text.to_string(),
                    reason: "port 0 is reserved".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::new();
        for ty in VarType::BUILTIN {
            let handler = registry.var_type(ty.name()).unwrap();
            assert_eq!(handler.base(), *ty);
        }
        assert!(registry.var_type("port").is_none());
        assert!(Registry::empty().var_type("int32").is_none());
    }

    #[test]
    fn test_custom_type() {
        let mut registry = Registry::new();
        registry.register_type(Port);
        let port = registry.var_type("port").unwrap();
        let mut var = CgVar::new(port.base());
        assert!(port.parse(&mut var, "0").is_err());
        port.parse(&mut var, "8080").unwrap();
        assert_eq!(port.format(&var), "8080");
    }

    #[test]
    fn test_closures_as_capabilities() {
        let mut registry = Registry::new();
        registry
            .register_callback("ok", |_: &Cvec, _: &Cvec| -> CallbackResult { Ok(()) })
            .register_expander("colors", |_: &Cvec, _: &Cvec| {
                vec![Expansion::new("red"), Expansion::with_help("blue", "cold")]
            })
            .register_translator("upper", |var: &mut CgVar| {
                let upper = var.string_value()?.to_uppercase();
                var.set_string(&upper)
            });

        let vars = Cvec::start("x");
        assert!(registry.callback("ok").unwrap().call(&vars, &Cvec::new()).is_ok());
        assert_eq!(
            registry.expander("colors").unwrap().expand(&Cvec::new(), &vars)[1],
            Expansion::with_help("blue", "cold")
        );
        let mut var = CgVar::string(Some("s"), "abc");
        registry.translator("upper").unwrap().translate(&mut var).unwrap();
        assert_eq!(var.string_value(), Ok("ABC"));
        assert_eq!(registry.callback_names(), vec!["ok"]);
        assert!(registry.callback("missing").is_none());
    }
}
