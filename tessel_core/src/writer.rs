use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::HandlerRegistry;
use crate::NodeKind;
use crate::PathRegistry;
use crate::RenderContext;
use crate::RenderError;
use crate::TesselResult;
use crate::Tree;

/// Destination of rendered node content.
pub trait OutputSink {
	/// Write `content` for the node at `path`.
	fn write(&mut self, path: &str, content: &[u8], kind: NodeKind) -> TesselResult<()>;

	/// Remove the output previously written for the node at `path`.
	fn delete(&mut self, path: &str, kind: NodeKind) -> TesselResult<()>;
}

/// Writes nodes below a directory on disk.
///
/// Fragments have no file of their own and are skipped. Removing an output
/// that is already gone, or a directory that still holds foreign files, is
/// not an error.
#[derive(Debug, Clone)]
pub struct FileSystemOutput {
	root: PathBuf,
}

impl FileSystemOutput {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// The file system location of the node at `path`.
	pub fn resolve(&self, path: &str) -> PathBuf {
		let relative = path.trim_start_matches('/').trim_end_matches('/');
		if relative.is_empty() {
			self.root.clone()
		} else {
			self.root.join(relative)
		}
	}
}

impl OutputSink for FileSystemOutput {
	fn write(&mut self, path: &str, content: &[u8], kind: NodeKind) -> TesselResult<()> {
		let target = self.resolve(path);
		match kind {
			NodeKind::Fragment => {}
			NodeKind::Directory => std::fs::create_dir_all(&target)?,
			NodeKind::File => {
				if let Some(parent) = target.parent() {
					std::fs::create_dir_all(parent)?;
				}
				std::fs::write(&target, content)?;
			}
		}

		Ok(())
	}

	fn delete(&mut self, path: &str, kind: NodeKind) -> TesselResult<()> {
		let target = self.resolve(path);
		let result = match kind {
			NodeKind::Fragment => return Ok(()),
			NodeKind::Directory => std::fs::remove_dir(&target),
			NodeKind::File => std::fs::remove_file(&target),
		};

		match result {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) if e.kind() == ErrorKind::DirectoryNotEmpty => {
				tracing::warn!(path, "output directory not empty, leaving it in place");
				Ok(())
			}
			Err(e) => Err(e.into()),
		}
	}
}

/// Keeps written outputs in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryOutput {
	/// Current content by node path.
	pub files: BTreeMap<String, Vec<u8>>,
	/// Every write in order.
	pub writes: Vec<String>,
	/// Every deletion in order.
	pub deletes: Vec<String>,
}

impl MemoryOutput {
	pub fn new() -> Self {
		Self::default()
	}

	/// Content of the node at `path` as text, if it was written.
	pub fn get_str(&self, path: &str) -> Option<&str> {
		self.files
			.get(path)
			.and_then(|bytes| std::str::from_utf8(bytes).ok())
	}
}

impl OutputSink for MemoryOutput {
	fn write(&mut self, path: &str, content: &[u8], _kind: NodeKind) -> TesselResult<()> {
		self.files.insert(path.to_string(), content.to_vec());
		self.writes.push(path.to_string());
		Ok(())
	}

	fn delete(&mut self, path: &str, _kind: NodeKind) -> TesselResult<()> {
		self.files.remove(path);
		self.deletes.push(path.to_string());
		Ok(())
	}
}

/// Result of writing a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
	/// Node paths whose content was written.
	pub written: Vec<String>,
	/// Node paths whose output was removed.
	pub removed: Vec<String>,
	/// Dirty node paths whose handler had nothing to write.
	pub skipped: Vec<String>,
	/// Nodes that failed to render. These are collected instead of aborting
	/// so that a single run reports every broken node.
	pub render_errors: Vec<RenderError>,
}

impl WriteReport {
	pub fn has_errors(&self) -> bool {
		!self.render_errors.is_empty()
	}
}

/// Emits dirty nodes to an [`OutputSink`].
pub struct OutputWriter<'a> {
	handlers: &'a HandlerRegistry,
}

impl<'a> OutputWriter<'a> {
	pub fn new(handlers: &'a HandlerRegistry) -> Self {
		Self { handlers }
	}

	/// Remove queued outputs, write every dirty node, then clear the `dirty`
	/// and `created` flags of all nodes.
	///
	/// A node that fails to render is recorded in the report and left out;
	/// its flags are reset like any other so it is retried only when its
	/// sources change. Errors from the sink abort the write before any flag
	/// is touched; removals the sink did not complete stay queued.
	pub fn write(
		&self,
		tree: &mut Tree,
		registry: &PathRegistry,
		sink: &mut dyn OutputSink,
	) -> TesselResult<WriteReport> {
		let mut report = WriteReport::default();

		let mut removals = tree.take_removals().into_iter();
		while let Some(removal) = removals.next() {
			if let Err(e) = sink.delete(&removal.path, removal.kind) {
				tree.requeue_removals(std::iter::once(removal).chain(removals));
				return Err(e);
			}
			report.removed.push(removal.path);
		}

		let ctx = RenderContext {
			tree: Arc::new(tree.clone()),
			registry,
		};
		for node in ctx.tree.nodes() {
			if node.is_root() || !node.dirty {
				continue;
			}

			let Some(handler) = self.handlers.get(node.handler()) else {
				report.render_errors.push(RenderError::new(
					node.path(),
					node.path(),
					format!("no handler named `{}` is registered", node.handler()),
				));
				continue;
			};

			match handler.content(node, &ctx) {
				Ok(Some(content)) => {
					sink.write(node.path(), &content, node.kind())?;
					tracing::trace!(path = node.path(), bytes = content.len(), "wrote node");
					report.written.push(node.path().to_string());
				}
				Ok(None) => report.skipped.push(node.path().to_string()),
				Err(e) => {
					tracing::warn!(
						node = %e.node,
						reference = %e.reference,
						"render failed: {}",
						e.message
					);
					report.render_errors.push(e);
				}
			}
		}

		for node in tree.nodes_mut() {
			node.dirty = false;
			node.created = false;
		}

		Ok(report)
	}
}
