//! codeloader
//!
//! Module loading and batch compilation orchestration for source-to-source
//! compilers. Units (scripts and modules) are fetched, parsed, linked as a
//! whole graph, transformed and executed in dependency order.
//!
//! # Example
//!
//! ```rust
//! use codeloader::frontend::plain::Value;
//!
//! let value = codeloader::eval("let a = 40\na + 2").unwrap();
//! assert_eq!(value, Value::Int(42));
//! ```
//!
//! # Layout
//!
//! - [`frontend::module`]: unit cache, fetching, the loader itself
//! - [`frontend::toolchain`]: the collaborator traits a language plugs in
//! - [`frontend::plain`]: a small reference language
//! - [`embedded`]: callback-style host surface

#![doc(html_root_url = "https://docs.rs/codeloader")]
#![warn(rust_2018_idioms)]

pub mod embedded;
pub mod frontend;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use embedded::CodeLoader;
pub use frontend::module::{LoadError, Loader, LoaderBuilder, LoaderError, UnitId, UnitKind};
pub use frontend::toolchain::{Language, Toolchain};

use std::path::Path;

use tracing::debug;

use crate::frontend::plain::{self, Plain, Value};
use crate::util::config::LoaderConfig;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = "codeloader";

/// Build a loader for the plain language
pub fn plain_loader(config: LoaderConfig) -> Result<Loader<Plain>> {
    Loader::builder(plain::toolchain())
        .config(config)
        .build()
        .context("Invalid loader configuration")
}

/// Evaluate plain source with a fresh loader
pub fn eval(code: &str) -> Result<Value> {
    debug!("eval called");
    let loader = plain_loader(LoaderConfig::default())?;
    loader.eval(code).context("Evaluation failed")
}

/// Load a plain source file and its imports, returning the completion value
///
/// The file is addressed by its absolute path. With `config.sync` every fetch
/// blocks; otherwise reads run on the thread pool and this call drives the
/// loader until it is idle.
pub fn run_file(
    path: &Path,
    kind: UnitKind,
    config: LoaderConfig,
) -> Result<Value> {
    let address = file_address(path)?;
    let sync = config.sync;
    debug!(file = %address, sync, "run file");
    let loader = plain_loader(config)?;
    if sync {
        return loader
            .load_sync(&address, kind)
            .with_context(|| format!("Failed to run: {}", path.display()));
    }

    let id = loader.load(&address, kind);
    loader.run_until_idle();
    match (loader.result(id), loader.error(id)) {
        (Some(value), _) => Ok(value),
        (None, Some(error)) => {
            Err(error).with_context(|| format!("Failed to run: {}", path.display()))
        }
        (None, None) => anyhow::bail!("'{}' did not settle", address),
    }
}

/// Absolute `/`-separated address of a file
pub fn file_address(path: &Path) -> Result<String> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(absolute.to_string_lossy().replace('\\', "/"))
}
