//! Handlers shipped with tessel.

pub use copy::*;
pub use directory::*;
pub use page::*;
pub use template::*;

mod copy;
mod directory;
mod page;
mod template;

use crate::Node;
use crate::RenderContext;
use crate::RenderError;

/// The source content behind `node`, read through the registry of the
/// current cycle.
pub(crate) fn read_source(node: &Node, ctx: &RenderContext<'_>) -> Result<Vec<u8>, RenderError> {
	let Some(source) = ctx.registry.get(node.src()) else {
		return Err(RenderError::new(
			node.path(),
			node.path(),
			format!("source path `{}` is no longer provided", node.src()),
		));
	};

	source
		.read()
		.map_err(|e| RenderError::new(node.path(), node.path(), e.to_string()))
}
