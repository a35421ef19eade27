//! `tessel_core` is the engine behind tessel, an incremental static site builder. It keeps a tree of output nodes in step with a set of source paths and only rebuilds what changed since the previous run.
//!
//! ## Render Cycle
//!
//! ```text
//! Source providers (filesystem, memory, stacked at mount points)
//!   → Path registry (deduplicated, ignore list applied, changed flags)
//!   → Reconciler (remove stale nodes, dispatch new paths to handlers, two passes)
//!   → Output writer (remove vanished outputs, write dirty nodes, reset flags)
//!   → Build state (tree + fingerprints persisted for the next run)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `tessel.toml`, including sources, output, handler patterns, priorities and default metadata.
//! - [`handlers`]: The built-in `directory`, `copy`, `template` and `page` handlers.
//! - [`resolve`]: Resolution of references between nodes and the `relocatable` link rewriting used by pages.
//!
//! ## Key Types
//!
//! - [`SourcePath`]: A path supplied by a provider for one cycle, with its metadata overlay and changed flag.
//! - [`PathRegistry`]: The filtered set of source paths a cycle works on.
//! - [`Tree`] and [`Node`]: The output nodes, indexed by canonical path.
//! - [`Reconciler`]: Keeps the tree consistent with the registry.
//! - [`OutputWriter`]: Emits dirty nodes to an [`OutputSink`].
//! - [`Site`]: A project directory tying all of the above together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessel_core::Site;
//!
//! let mut site = Site::open(".").unwrap();
//! let report = site.render().unwrap();
//! if report.has_errors() {
//!     eprintln!("{} node(s) failed to render", report.write.render_errors.len());
//! }
//! ```

pub use config::*;
pub use error::*;
pub use factory::*;
pub use handler::*;
pub use observer::*;
pub use path::*;
pub use pattern::*;
pub use reconciler::*;
pub use registry::*;
pub use site::*;
pub use source::*;
pub use state::*;
pub use tree::*;
pub use writer::*;

pub mod config;
#[allow(unused_assignments)]
mod error;
mod factory;
mod handler;
pub mod handlers;
mod observer;
mod path;
mod pattern;
mod reconciler;
mod registry;
pub mod resolve;
mod site;
mod source;
mod state;
mod tree;
mod writer;

#[cfg(test)]
mod __fixtures;
