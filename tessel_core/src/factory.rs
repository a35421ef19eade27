use crate::DefaultMetaInfo;
use crate::Handler;
use crate::MetaInfo;
use crate::NodeObserver;
use crate::SourcePath;
use crate::TesselError;
use crate::TesselResult;
use crate::Tree;

/// Prepares a source path for a handler and records what the handler made.
///
/// The factory merges default metadata into a copy of the path, notifies
/// observers before and after creation, and stamps provenance on every node
/// the handler returns.
#[derive(Default)]
pub struct NodeFactory {
	defaults: DefaultMetaInfo,
	observers: Vec<Box<dyn NodeObserver>>,
}

impl NodeFactory {
	pub fn new(defaults: DefaultMetaInfo) -> Self {
		Self {
			defaults,
			observers: Vec::new(),
		}
	}

	/// Append an observer. Observers run in registration order.
	pub fn add_observer(&mut self, observer: Box<dyn NodeObserver>) {
		self.observers.push(observer);
	}

	/// The metadata a handler sees for `path`: global defaults, then the
	/// handler's defaults, then the path's own overlay. Later values win.
	pub fn merged_meta_info(&self, handler_name: &str, path: &SourcePath) -> MetaInfo {
		let layers = [
			self.defaults.global(),
			self.defaults.for_handler(handler_name),
			Some(path.meta_info()),
		];

		MetaInfo::layered(layers.into_iter().flatten())
	}

	/// Let `handler` create nodes for `path` below `parent_path`.
	///
	/// The provider's [`SourcePath`] is never modified; the handler receives
	/// a copy carrying the merged metadata.
	pub fn create_nodes(
		&self,
		tree: &mut Tree,
		parent_path: &str,
		path: &SourcePath,
		handler_name: &str,
		handler: &dyn Handler,
	) -> TesselResult<Vec<String>> {
		let Some(parent) = tree.lookup(parent_path) else {
			return Err(TesselError::MissingParent {
				parent: parent_path.to_string(),
				path: path.path().to_string(),
			});
		};

		let meta_info = self.merged_meta_info(handler_name, path);
		let path = path.clone().with_meta_info(meta_info);

		for observer in &self.observers {
			observer.before_node_created(parent, &path);
		}

		let created = handler.create_node(tree, parent_path, &path)?;

		for node_path in &created {
			let Some(node) = tree.lookup_mut(node_path) else {
				return Err(TesselError::UninsertedNode {
					handler: handler_name.to_string(),
					path: node_path.clone(),
				});
			};
			node.set_src(path.path());
			node.set_handler(handler_name);

			for observer in &self.observers {
				observer.after_node_created(node);
			}
		}

		Ok(created)
	}
}
