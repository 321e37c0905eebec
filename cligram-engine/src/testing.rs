//! Test helpers
//!
//!     Shared by the unit tests and the integration tests under `tests/`. They are part of the
//!     public API so integration tests and downstream crates can use them, but nothing in the
//!     engine depends on them.
//!
//! Registries
//!
//!     [`registry`] returns the built-in types plus a fixed set of named capabilities that test
//!     grammars may use:
//!
//!         callbacks    `cb`, `print` (both recorded), `fail` (always errors)
//!         expanders    `list` (its own arguments), `interfaces` (eth0, eth1, lo)
//!         translators  `upper`
//!
//!     [`recording_registry`] also hands back the [`CallLog`] the recording callbacks write to.
//!
//! Compiling
//!
//!     [`compile`] panics with the rendered source context when a grammar does not compile, so a
//!     broken test grammar points at its own mistake.

use crate::compiling::Compiler;
use crate::cvec::Cvec;
use crate::grammar::Grammar;
use crate::registry::{CallbackResult, Expansion, Registry};
use crate::var::CgVar;
use std::sync::{Arc, Mutex, PoisonError};

/// One callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callback: String,
    /// Grammar arguments, as text.
    pub args: Vec<String>,
    /// Matched vector, as `(name, value)` pairs. Unnamed entries have an empty name.
    pub vars: Vec<(String, String)>,
}

/// Invocations recorded by the `cb` and `print` test callbacks.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Names of the callbacks invoked so far, in order.
    pub fn names(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.callback).collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn record(&self, callback: &str, vars: &Cvec, args: &Cvec) {
        let call = Call {
            callback: callback.to_string(),
            args: args.iter().map(CgVar::to_text).collect(),
            vars: pairs(vars),
        };
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

/// `(name, value)` text pairs of a vector, for compact assertions.
pub fn pairs(vars: &Cvec) -> Vec<(String, String)> {
    vars.iter()
        .map(|v| (v.name().unwrap_or_default().to_string(), v.to_text()))
        .collect()
}

/// Registry with the test capabilities and the log they record into.
pub fn recording_registry() -> (Registry, CallLog) {
    let log = CallLog::default();
    let mut registry = Registry::new();
    for name in ["cb", "print"] {
        let log = log.clone();
        registry.register_callback(name, move |vars: &Cvec, args: &Cvec| -> CallbackResult {
            log.record(name, vars, args);
            Ok(())
        });
    }
    registry
        .register_callback("fail", |_: &Cvec, _: &Cvec| -> CallbackResult {
            Err("callback failed".into())
        })
        .register_expander("list", |args: &Cvec, _: &Cvec| {
            args.iter().map(|a| Expansion::new(a.to_text())).collect()
        })
        .register_expander("interfaces", |_: &Cvec, _: &Cvec| {
            vec![
                Expansion::with_help("eth0", "Uplink"),
                Expansion::new("eth1"),
                Expansion::with_help("lo", "Loopback"),
            ]
        })
        .register_translator("upper", |var: &mut CgVar| {
            let upper = var.string_value()?.to_uppercase();
            var.set_string(&upper)
        });
    (registry, log)
}

/// Registry with the test capabilities.
pub fn registry() -> Registry {
    recording_registry().0
}

/// Compile `source` against [`registry`], panicking with context on error.
pub fn compile(source: &str) -> Grammar {
    compile_with(&Compiler::new(registry()), source)
}

pub fn compile_with(compiler: &Compiler, source: &str) -> Grammar {
    compiler
        .compile(source)
        .unwrap_or_else(|e| panic!("test grammar does not compile: {}", e.with_context(source)))
}
