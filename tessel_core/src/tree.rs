use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::MetaInfo;
use crate::PathRegistry;
use crate::TesselError;
use crate::TesselResult;

/// The path of the dummy root. Every top-level node hangs off it.
pub const ROOT_PATH: &str = "";

/// What a node writes when it is dirty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
	File,
	Directory,
	Fragment,
}

impl fmt::Display for NodeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::File => "file",
			Self::Directory => "directory",
			Self::Fragment => "fragment",
		};
		write!(f, "{name}")
	}
}

/// One entry of the output tree.
///
/// The parent link is a path rather than a reference: the [`Tree`] owns every
/// node and resolves links through its index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
	path: String,
	parent: Option<String>,
	children: BTreeSet<String>,
	kind: NodeKind,
	handler: String,
	src: String,
	/// Dependency source paths, each with whether it was provided when the
	/// node was created.
	#[serde(default)]
	dependencies: BTreeMap<String, bool>,
	/// Metadata merged from defaults, the source overlay, and the handler.
	pub meta_info: MetaInfo,
	/// The node must be written by the next output pass.
	pub dirty: bool,
	/// The node was inserted during the current cycle.
	pub created: bool,
}

impl Node {
	pub fn path(&self) -> &str {
		&self.path
	}

	/// The parent path, `None` only for the dummy root.
	pub fn parent(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	pub fn children(&self) -> impl Iterator<Item = &str> {
		self.children.iter().map(String::as_str)
	}

	pub fn kind(&self) -> NodeKind {
		self.kind
	}

	/// Name of the handler that created this node and renders its content.
	pub fn handler(&self) -> &str {
		&self.handler
	}

	/// The source path this node was produced from.
	pub fn src(&self) -> &str {
		&self.src
	}

	pub(crate) fn set_src(&mut self, src: &str) {
		src.clone_into(&mut self.src);
	}

	pub(crate) fn set_handler(&mut self, handler: &str) {
		handler.clone_into(&mut self.handler);
	}

	pub fn is_root(&self) -> bool {
		self.parent.is_none()
	}

	pub fn is_directory(&self) -> bool {
		self.kind == NodeKind::Directory
	}

	pub fn is_fragment(&self) -> bool {
		self.kind == NodeKind::Fragment
	}

	/// Additional source paths whose change invalidates this node.
	pub fn dependencies(&self) -> impl Iterator<Item = &str> {
		self.dependencies.keys().map(String::as_str)
	}

	/// Record a dependency. It counts as provided until
	/// [`record_presence`](Self::record_presence) says otherwise.
	pub fn add_dependency(&mut self, src: impl Into<String>) {
		self.dependencies.insert(src.into(), true);
	}

	/// Remember which dependencies `registry` provides right now.
	pub fn record_presence(&mut self, registry: &PathRegistry) {
		for (dependency, present) in &mut self.dependencies {
			*present = registry.contains(dependency);
		}
	}

	/// Whether a dependency of this node vanished or changed, including one
	/// listed in `regenerated` (source paths). A dependency that was already
	/// missing when the node was created is not a change.
	pub fn is_changed(&self, registry: &PathRegistry, regenerated: &BTreeSet<String>) -> bool {
		self.dependencies.iter().any(|(dependency, present)| {
			(*present && !registry.contains(dependency))
				|| registry.is_changed(dependency)
				|| regenerated.contains(dependency)
		})
	}
}

/// An output removed from the tree because its source no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Removal {
	pub path: String,
	pub kind: NodeKind,
}

/// The hierarchical set of output nodes, indexed by canonical path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
	nodes: BTreeMap<String, Node>,
	#[serde(default)]
	removals: Vec<Removal>,
	/// Source paths regenerated by the last pass of the previous cycle.
	#[serde(default)]
	deferred: BTreeSet<String>,
}

impl Default for Tree {
	fn default() -> Self {
		Self::new()
	}
}

impl Tree {
	/// A tree holding only the dummy root.
	pub fn new() -> Self {
		let root = Node {
			path: ROOT_PATH.to_string(),
			parent: None,
			children: BTreeSet::new(),
			kind: NodeKind::Directory,
			handler: String::new(),
			src: String::new(),
			dependencies: BTreeMap::new(),
			meta_info: MetaInfo::new(),
			dirty: false,
			created: false,
		};

		Self {
			nodes: BTreeMap::from([(ROOT_PATH.to_string(), root)]),
			removals: Vec::new(),
			deferred: BTreeSet::new(),
		}
	}

	/// The dummy root, absent only from a tree deserialized from a damaged
	/// state file.
	pub fn dummy_root(&self) -> Option<&Node> {
		self.nodes.get(ROOT_PATH).filter(|node| node.is_root())
	}

	pub fn lookup(&self, path: &str) -> Option<&Node> {
		self.nodes.get(path)
	}

	pub fn lookup_mut(&mut self, path: &str) -> Option<&mut Node> {
		self.nodes.get_mut(path)
	}

	pub fn contains(&self, path: &str) -> bool {
		self.nodes.contains_key(path)
	}

	/// Insert a new node under `parent`. The node starts out dirty and
	/// created; its provenance and handler are stamped by the
	/// [`NodeFactory`](crate::NodeFactory).
	pub fn insert(
		&mut self,
		parent: &str,
		path: &str,
		kind: NodeKind,
	) -> TesselResult<&mut Node> {
		if self.nodes.contains_key(path) {
			return Err(TesselError::DuplicateNode(path.to_string()));
		}
		let Some(parent_node) = self.nodes.get_mut(parent) else {
			return Err(TesselError::MissingParent {
				parent: parent.to_string(),
				path: path.to_string(),
			});
		};
		parent_node.children.insert(path.to_string());

		let node = Node {
			path: path.to_string(),
			parent: Some(parent.to_string()),
			children: BTreeSet::new(),
			kind,
			handler: String::new(),
			src: String::new(),
			dependencies: BTreeMap::new(),
			meta_info: MetaInfo::new(),
			dirty: true,
			created: true,
		};
		tracing::trace!(path, parent, %kind, "inserted node");

		Ok(self.nodes.entry(path.to_string()).or_insert(node))
	}

	/// Remove the node at `path` and its whole subtree, returning the removed
	/// nodes. When `physical` is set the outputs of the removed nodes are
	/// queued for deletion from the sink. The dummy root is never removed.
	pub fn delete(&mut self, path: &str, physical: bool) -> Vec<Node> {
		if path == ROOT_PATH || !self.nodes.contains_key(path) {
			return Vec::new();
		}

		let mut pending = vec![path.to_string()];
		let mut removed = Vec::new();
		while let Some(current) = pending.pop() {
			let Some(node) = self.nodes.remove(&current) else {
				continue;
			};
			pending.extend(node.children.iter().cloned());
			removed.push(node);
		}

		if let Some(parent) = removed
			.first()
			.and_then(|node| node.parent.clone())
			.and_then(|parent| self.nodes.get_mut(&parent))
		{
			parent.children.remove(path);
		}

		if physical {
			self.removals.extend(
				removed
					.iter()
					.filter(|node| !node.is_fragment())
					.map(|node| {
						Removal {
							path: node.path.clone(),
							kind: node.kind,
						}
					}),
			);
		}

		tracing::debug!(path, physical, count = removed.len(), "deleted subtree");
		removed
	}

	/// Drain the outputs queued for deletion, deepest paths first.
	pub fn take_removals(&mut self) -> Vec<Removal> {
		let mut removals = std::mem::take(&mut self.removals);
		removals.sort_by(|a, b| b.path.cmp(&a.path));
		removals.dedup();
		removals
	}

	/// Put removals back in the queue, e.g. after the sink failed to delete
	/// them.
	pub fn requeue_removals(&mut self, removals: impl IntoIterator<Item = Removal>) {
		self.removals.extend(removals);
	}

	/// Source paths whose nodes were regenerated too late in the previous
	/// cycle for their dependents to be rebuilt.
	pub fn deferred(&self) -> &BTreeSet<String> {
		&self.deferred
	}

	pub(crate) fn set_deferred(&mut self, deferred: BTreeSet<String>) {
		self.deferred = deferred;
	}

	/// All nodes, including the dummy root, in canonical path order.
	pub fn nodes(&self) -> impl Iterator<Item = &Node> {
		self.nodes.values()
	}

	pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
		self.nodes.values_mut()
	}

	/// Number of nodes excluding the dummy root.
	pub fn len(&self) -> usize {
		self.nodes.len().saturating_sub(1)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Paths of every node except the dummy root.
	pub fn node_paths(&self) -> Vec<String> {
		self.nodes
			.keys()
			.filter(|path| path.as_str() != ROOT_PATH)
			.cloned()
			.collect()
	}
}
