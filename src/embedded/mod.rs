//! Embedded loading surface
//!
//! Callback-style entry points for hosts that embed the loader:
//! - `load`: run a script by address
//! - `import`: load a module by address and hand back its exports
//! - `eval` / `eval_async`: run inline source
//!
//! Fetches complete only while the host drives the loader with
//! [`CodeLoader::poll`] or [`CodeLoader::run_until_idle`].
//!
//! # Usage
//! ```rust
//! use codeloader::embedded::CodeLoader;
//! use codeloader::frontend::module::{Loader, MemoryFetcher};
//! use codeloader::frontend::plain::{self, Value};
//!
//! let fetcher = MemoryFetcher::new().with_source("/lib", "export x = 41");
//! let loader = Loader::builder(plain::toolchain())
//!     .fetcher(fetcher)
//!     .build()
//!     .unwrap();
//! let host = CodeLoader::new(loader);
//!
//! host.import(
//!     "/lib",
//!     |module| assert_eq!(module.exports["x"], Value::Int(41)),
//!     |e| panic!("{}", e),
//! )
//! .unwrap();
//! host.run_until_idle();
//! assert_eq!(host.eval("import x from \"/lib\"\nx + 1").unwrap(), Value::Int(42));
//! ```

use std::time::Duration;

use indexmap::IndexMap;

use crate::frontend::module::{ListenerPair, LoadError, Loader, LoaderError, UnitId, UnitKind};
use crate::frontend::toolchain::Language;

/// A module handed to `import` callbacks
#[derive(Debug, Clone)]
pub struct LoadedModule<V> {
    /// Normalized address
    pub address: String,
    /// Completion value of the module body
    pub value: V,
    /// Exported bindings, in declaration order
    pub exports: IndexMap<String, V>,
}

/// Embedded loader facade
pub struct CodeLoader<L: Language> {
    loader: Loader<L>,
}

impl<L: Language> Clone for CodeLoader<L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
        }
    }
}

impl<L: Language> std::fmt::Debug for CodeLoader<L> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CodeLoader")
            .field("loader", &self.loader)
            .finish()
    }
}

impl<L: Language> CodeLoader<L> {
    pub fn new(loader: Loader<L>) -> Self {
        Self { loader }
    }

    /// Underlying loader
    pub fn loader(&self) -> &Loader<L> {
        &self.loader
    }

    /// Load and run a script
    pub fn load(
        &self,
        address: &str,
        on_success: impl FnOnce(&L::Value) + 'static,
        on_error: impl FnOnce(&LoadError) + 'static,
    ) -> Result<UnitId, LoaderError> {
        self.loader.load_with_listener(
            address,
            UnitKind::Script,
            ListenerPair::new(on_success, on_error),
        )
    }

    /// Load a module
    pub fn import(
        &self,
        address: &str,
        on_module: impl FnOnce(&LoadedModule<L::Value>) + 'static,
        on_error: impl FnOnce(&LoadError) + 'static,
    ) -> Result<UnitId, LoaderError> {
        let address = self.loader.resolve_address(address);
        let module_address = address.clone();
        let loader = self.loader.downgrade();
        self.loader.load_with_listener(
            &address,
            UnitKind::Module,
            ListenerPair::new(
                move |value: &L::Value| {
                    let exports = loader
                        .upgrade()
                        .map(|loader| loader.module_exports(&module_address))
                        .unwrap_or_default();
                    on_module(&LoadedModule {
                        address: module_address,
                        value: value.clone(),
                        exports,
                    });
                },
                on_error,
            ),
        )
    }

    /// Evaluate inline source; fails if module references remain unresolved
    pub fn eval(
        &self,
        code: impl Into<String>,
    ) -> Result<L::Value, LoaderError> {
        self.loader.eval(code)
    }

    /// Evaluate inline source, delivering the result to callbacks
    pub fn eval_async(
        &self,
        code: impl Into<String>,
        on_success: impl FnOnce(&L::Value) + 'static,
        on_error: impl FnOnce(&LoadError) + 'static,
    ) -> UnitId {
        self.loader
            .eval_async(code, ListenerPair::new(on_success, on_error))
    }

    /// Seed a global binding
    pub fn define_global(
        &self,
        name: impl Into<String>,
        value: L::Value,
    ) {
        self.loader.define_global(name, value);
    }

    /// Process completed fetches without blocking
    pub fn poll(&self) -> usize {
        self.loader.poll()
    }

    /// Block until no fetch is outstanding
    pub fn run_until_idle(&self) -> usize {
        self.loader.run_until_idle()
    }

    /// Like `run_until_idle`, giving up after `timeout` without progress
    pub fn run_until_idle_timeout(
        &self,
        timeout: Duration,
    ) -> bool {
        self.loader.run_until_idle_timeout(timeout)
    }
}
