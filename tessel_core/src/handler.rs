use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Node;
use crate::PathRegistry;
use crate::RenderError;
use crate::SourcePath;
use crate::TesselError;
use crate::TesselResult;
use crate::Tree;
use crate::handlers::CopyHandler;
use crate::handlers::DirectoryHandler;
use crate::handlers::PageHandler;
use crate::handlers::TemplateHandler;

/// Everything a handler may consult while producing the content of a node.
///
/// The tree is a shared snapshot taken before writing starts so renderers
/// can hand it to template functions that outlive the borrow.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
	pub tree: Arc<Tree>,
	pub registry: &'a PathRegistry,
}

/// Turns a source path into output nodes and renders their content.
///
/// Handlers are registered by name in a [`HandlerRegistry`]; which paths a
/// handler sees is decided by the pattern table, and when it sees them by
/// the priority table.
pub trait Handler {
	/// Insert zero or more nodes for `path` below the node at `parent` and
	/// return their paths.
	///
	/// `path` is a copy of the registry entry whose metadata already has the
	/// global and handler defaults merged in.
	fn create_node(
		&self,
		tree: &mut Tree,
		parent: &str,
		path: &SourcePath,
	) -> TesselResult<Vec<String>>;

	/// The bytes a dirty node writes, or `None` when the node has nothing to
	/// write.
	fn content(&self, node: &Node, ctx: &RenderContext<'_>)
	-> Result<Option<Vec<u8>>, RenderError>;
}

/// Static map from handler name to implementation.
#[derive(Default)]
pub struct HandlerRegistry {
	handlers: BTreeMap<String, Box<dyn Handler>>,
}

impl HandlerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry with the handlers shipped with tessel: `directory`, `copy`,
	/// `template` and `page`.
	pub fn builtin() -> Self {
		let mut registry = Self::new();
		registry.register("directory", Box::new(DirectoryHandler));
		registry.register("copy", Box::new(CopyHandler));
		registry.register("template", Box::new(TemplateHandler));
		registry.register("page", Box::new(PageHandler));
		registry
	}

	/// Register `handler` under `name`, replacing any previous registration.
	pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn Handler>) {
		self.handlers.insert(name.into(), handler);
	}

	pub fn get(&self, name: &str) -> Option<&dyn Handler> {
		self.handlers.get(name).map(AsRef::as_ref)
	}

	/// Like [`get`](Self::get) but fails for unknown names.
	pub fn require(&self, name: &str) -> TesselResult<&dyn Handler> {
		self.get(name)
			.ok_or_else(|| TesselError::UnknownHandler(name.to_string()))
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.handlers.keys().map(String::as_str)
	}
}
