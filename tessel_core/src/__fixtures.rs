use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use crate::Handler;
use crate::HandlerRegistry;
use crate::MemorySource;
use crate::MetaInfo;
use crate::Node;
use crate::NodeKind;
use crate::NodeObserver;
use crate::RenderContext;
use crate::RenderError;
use crate::Site;
use crate::SourcePath;
use crate::TesselConfig;
use crate::TesselResult;
use crate::Tree;

/// Shared log of everything the recording handlers and observers saw.
pub type Calls = Rc<RefCell<Vec<String>>>;

/// A handler that creates one file node per path and records each call.
pub struct RecordingHandler {
	pub name: &'static str,
	pub calls: Calls,
	/// Node paths whose content fails to render.
	pub failing: Vec<&'static str>,
}

impl RecordingHandler {
	pub fn new(name: &'static str, calls: &Calls) -> Self {
		Self {
			name,
			calls: Rc::clone(calls),
			failing: Vec::new(),
		}
	}

	#[must_use]
	pub fn failing_on(mut self, path: &'static str) -> Self {
		self.failing.push(path);
		self
	}
}

impl Handler for RecordingHandler {
	fn create_node(
		&self,
		tree: &mut Tree,
		parent: &str,
		path: &SourcePath,
	) -> TesselResult<Vec<String>> {
		self.calls
			.borrow_mut()
			.push(format!("{}:{}", self.name, path.path()));
		let kind = if path.is_directory() {
			NodeKind::Directory
		} else {
			NodeKind::File
		};
		let node = tree.insert(parent, path.path(), kind)?;
		node.meta_info = path.meta_info().clone();

		Ok(vec![path.path().to_string()])
	}

	fn content(&self, node: &Node, _ctx: &RenderContext<'_>) -> Result<Option<Vec<u8>>, RenderError> {
		if self.failing.iter().any(|path| *path == node.path()) {
			return Err(RenderError::new(node.path(), node.path(), "boom"));
		}

		Ok(Some(format!("{}:{}", self.name, node.path()).into_bytes()))
	}
}

/// Records observer notifications into a shared log.
pub struct RecordingObserver {
	pub calls: Calls,
}

impl NodeObserver for RecordingObserver {
	fn before_node_created(&self, parent: &Node, path: &SourcePath) {
		self.calls
			.borrow_mut()
			.push(format!("before:{}:{}", parent.path(), path.path()));
	}

	fn after_node_created(&self, node: &Node) {
		self.calls
			.borrow_mut()
			.push(format!("after:{}:{}", node.path(), node.src()));
	}
}

pub fn calls() -> Calls {
	Rc::new(RefCell::new(Vec::new()))
}

/// A changed source path with text content.
pub fn source(path: &str, content: &str) -> SourcePath {
	SourcePath::new(path)
		.with_bytes(content.as_bytes())
		.with_changed(true)
}

/// A changed directory path.
pub fn directory(path: &str) -> SourcePath {
	SourcePath::new(path).with_changed(true)
}

/// A small site: the root, one nested directory, a stylesheet and a page.
pub fn sample_source() -> MemorySource {
	[
		directory("/"),
		directory("/docs/"),
		source("/site.css", "body {}"),
		source("/docs/intro.page", "---\ntitle: Intro\n---\n# Getting Started\n\nHello."),
	]
	.into_iter()
	.collect()
}

/// Parse a config snippet, panicking on invalid TOML.
pub fn config(toml: &str) -> TesselConfig {
	TesselConfig::parse(toml).unwrap_or_else(|e| panic!("invalid test config: {e}"))
}

/// A config routing every file to `file` and directories to `dir`, so that
/// [`RecordingHandler`]s see all paths.
pub fn recording_config() -> TesselConfig {
	config(
		r#"
[sourcehandler.patterns]
dir = ["**/"]
file = ["**/*"]

[sourcehandler.invoke]
1 = ["dir"]
5 = ["file"]
"#,
	)
}

/// A registry with recording `dir` and `file` handlers.
pub fn recording_handlers(calls: &Calls) -> HandlerRegistry {
	let mut handlers = HandlerRegistry::builtin();
	handlers.register("dir", Box::new(RecordingHandler::new("dir", calls)));
	handlers.register("file", Box::new(RecordingHandler::new("file", calls)));
	handlers
}

/// A site that neither reads nor writes the state cache.
pub fn memory_site(config: TesselConfig, handlers: HandlerRegistry) -> Site {
	Site::with_config(PathBuf::from("memory-site"), config, handlers)
		.unwrap_or_else(|e| panic!("invalid test site: {e}"))
		.without_persistence()
}

/// Sorted list helper for comparing unordered results.
pub fn sorted<I, S>(items: I) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut items: Vec<String> = items.into_iter().map(Into::into).collect();
	items.sort();
	items
}

/// Build metadata from key/value pairs.
pub fn meta(pairs: &[(&str, serde_json::Value)]) -> MetaInfo {
	pairs
		.iter()
		.map(|(key, value)| (*key, value.clone()))
		.collect()
}
