use crate::Node;
use crate::SourcePath;

/// Receives synchronous notifications around node creation.
///
/// Observers are called in registration order and cannot influence the
/// creation; return values are not consulted.
pub trait NodeObserver {
	fn before_node_created(&self, _parent: &Node, _path: &SourcePath) {}

	fn after_node_created(&self, _node: &Node) {}
}

/// Logs every node creation at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl NodeObserver for TracingObserver {
	fn before_node_created(&self, parent: &Node, path: &SourcePath) {
		tracing::debug!(parent = parent.path(), src = path.path(), "creating nodes");
	}

	fn after_node_created(&self, node: &Node) {
		tracing::debug!(
			node = node.path(),
			src = node.src(),
			handler = node.handler(),
			kind = %node.kind(),
			"created node"
		);
	}
}
