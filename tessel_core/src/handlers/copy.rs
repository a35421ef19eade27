use super::read_source;
use crate::Handler;
use crate::Node;
use crate::NodeKind;
use crate::RenderContext;
use crate::RenderError;
use crate::SourcePath;
use crate::TesselResult;
use crate::Tree;

/// Writes the source bytes unchanged under the same name.
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyHandler;

impl Handler for CopyHandler {
	fn create_node(
		&self,
		tree: &mut Tree,
		parent: &str,
		path: &SourcePath,
	) -> TesselResult<Vec<String>> {
		let node = tree.insert(parent, path.path(), NodeKind::File)?;
		node.meta_info = path.meta_info().clone();

		Ok(vec![path.path().to_string()])
	}

	fn content(&self, node: &Node, ctx: &RenderContext<'_>) -> Result<Option<Vec<u8>>, RenderError> {
		read_source(node, ctx).map(Some)
	}
}
