use crate::Handler;
use crate::Node;
use crate::NodeKind;
use crate::RenderContext;
use crate::RenderError;
use crate::SourcePath;
use crate::TesselResult;
use crate::Tree;

/// Layout templates used by pages.
///
/// A template gets a node so that pages can depend on it and references in
/// it can be resolved, but it never writes output of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateHandler;

impl Handler for TemplateHandler {
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

	fn content(
		&self,
		_node: &Node,
		_ctx: &RenderContext<'_>,
	) -> Result<Option<Vec<u8>>, RenderError> {
		Ok(None)
	}
}
