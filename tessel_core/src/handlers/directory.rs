use crate::Handler;
use crate::Node;
use crate::NodeKind;
use crate::RenderContext;
use crate::RenderError;
use crate::SourcePath;
use crate::TesselResult;
use crate::Tree;

/// Mirrors a source directory as an output directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryHandler;

impl Handler for DirectoryHandler {
	fn create_node(
		&self,
		tree: &mut Tree,
		parent: &str,
		path: &SourcePath,
	) -> TesselResult<Vec<String>> {
		let node = tree.insert(parent, path.path(), NodeKind::Directory)?;
		node.meta_info = path.meta_info().clone();

		Ok(vec![path.path().to_string()])
	}

	fn content(
		&self,
		_node: &Node,
		_ctx: &RenderContext<'_>,
	) -> Result<Option<Vec<u8>>, RenderError> {
		Ok(Some(Vec::new()))
	}
}
