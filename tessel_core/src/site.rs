use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use crate::BuildState;
use crate::FileSystemOutput;
use crate::FileSystemSource;
use crate::GlobList;
use crate::HandlerRegistry;
use crate::MatchOptions;
use crate::NodeFactory;
use crate::NodeObserver;
use crate::OutputSink;
use crate::OutputWriter;
use crate::PathRegistry;
use crate::PatternMatcher;
use crate::ReconcileReport;
use crate::Reconciler;
use crate::SourceProvider;
use crate::StackedSource;
use crate::TesselConfig;
use crate::TesselResult;
use crate::TracingObserver;
use crate::Tree;
use crate::WriteReport;

/// Outcome of one render cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
	pub reconcile: ReconcileReport,
	pub write: WriteReport,
}

impl CycleReport {
	/// Returns true if any node failed to render.
	pub fn has_errors(&self) -> bool {
		self.write.has_errors()
	}

	/// Returns true if the cycle neither changed the tree nor wrote anything.
	pub fn is_noop(&self) -> bool {
		self.reconcile.created.is_empty()
			&& self.reconcile.deleted.is_empty()
			&& self.write.written.is_empty()
			&& self.write.removed.is_empty()
	}
}

/// A project directory together with everything needed to build it.
///
/// The site owns the node tree between cycles and persists it, along with
/// the source fingerprints, under `.tessel/cache/` so that a later process
/// continues incrementally.
pub struct Site {
	root: PathBuf,
	config: TesselConfig,
	handlers: HandlerRegistry,
	invoke: BTreeMap<u32, Vec<String>>,
	matcher: PatternMatcher,
	ignore: GlobList,
	factory: NodeFactory,
	state: BuildState,
	persist: bool,
}

impl Site {
	/// Open the project at `root` with its discovered config (or the
	/// defaults) and the built-in handlers.
	pub fn open(root: impl Into<PathBuf>) -> TesselResult<Self> {
		let root = root.into();
		let config = TesselConfig::load(&root)?.unwrap_or_default();
		Self::with_config(root, config, HandlerRegistry::builtin())
	}

	/// Open the project at `root` with an explicit config and handler set.
	///
	/// Fails when the priority table names a handler that is not registered
	/// or when any pattern does not compile.
	pub fn with_config(
		root: impl Into<PathBuf>,
		config: TesselConfig,
		handlers: HandlerRegistry,
	) -> TesselResult<Self> {
		let root = root.into();
		let settings = &config.sourcehandler;

		let invoke = settings.invoke()?;
		for name in invoke.values().flatten() {
			handlers.require(name)?;
		}

		let matcher = PatternMatcher::new(&settings.patterns(), MatchOptions {
			casefold: settings.casefold,
			dotmatch: settings.use_hidden_files,
		})?;
		let ignore = GlobList::new(&settings.ignore, MatchOptions {
			casefold: settings.ignore_casefold,
			dotmatch: settings.ignore_dotmatch,
		})?;

		let mut factory = NodeFactory::new(settings.default_meta_info());
		factory.add_observer(Box::new(TracingObserver));

		let state = BuildState::load(&root).unwrap_or_default();
		tracing::debug!(root = %root.display(), nodes = state.tree.len(), "opened site");

		Ok(Self {
			root,
			config,
			handlers,
			invoke,
			matcher,
			ignore,
			factory,
			state,
			persist: true,
		})
	}

	/// Keep the tree in memory only; nothing is read from or written to the
	/// state cache.
	#[must_use]
	pub fn without_persistence(mut self) -> Self {
		self.persist = false;
		self.state = BuildState::default();
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn config(&self) -> &TesselConfig {
		&self.config
	}

	pub fn tree(&self) -> &Tree {
		&self.state.tree
	}

	/// Register an observer of node creation.
	pub fn add_observer(&mut self, observer: Box<dyn NodeObserver>) {
		self.factory.add_observer(observer);
	}

	/// The configured source directories stacked into one provider.
	pub fn source(&self) -> TesselResult<StackedSource> {
		let mut stacked = StackedSource::new();
		for source in &self.config.sources {
			let provider = FileSystemSource::new(
				self.root.join(&source.path),
				&source.glob,
				self.state.fingerprints.clone(),
			)?
			.with_mount(&source.mount);
			stacked.mount("/", Box::new(provider));
		}

		Ok(stacked)
	}

	/// The configured output directory.
	pub fn output_sink(&self) -> FileSystemOutput {
		FileSystemOutput::new(self.root.join(&self.config.output.path))
	}

	/// Run one cycle over the configured sources into the configured output
	/// directory.
	pub fn render(&mut self) -> TesselResult<CycleReport> {
		let source = self.source()?;
		let mut sink = self.output_sink();
		self.render_from(&source, &mut sink)
	}

	/// Run one cycle: rebuild the path registry from `provider`, reconcile
	/// the tree against it, write dirty nodes to `sink` and persist the
	/// result.
	///
	/// The tree and fingerprints are only replaced once the whole cycle has
	/// succeeded. On error the site keeps the state of the last successful
	/// cycle, so the failed cycle's changes are picked up again next time.
	pub fn render_from(
		&mut self,
		provider: &dyn SourceProvider,
		sink: &mut dyn OutputSink,
	) -> TesselResult<CycleReport> {
		let registry = PathRegistry::build(provider, &self.ignore)?;

		// Committed only once the cycle has been written.
		let mut tree = self.state.tree.clone();
		let reconcile = Reconciler::new(
			&registry,
			&self.matcher,
			&self.invoke,
			&self.handlers,
			&self.factory,
		)
		.run(&mut tree)?;

		let write = OutputWriter::new(&self.handlers).write(&mut tree, &registry, sink)?;
		self.state.tree = tree;
		self.state.fingerprints = registry.fingerprints();
		if self.persist {
			self.state.save(&self.root)?;
		}

		tracing::info!(
			paths = registry.len(),
			created = reconcile.created.len(),
			deleted = reconcile.deleted.len(),
			written = write.written.len(),
			removed = write.removed.len(),
			errors = write.render_errors.len(),
			"render cycle finished"
		);

		Ok(CycleReport { reconcile, write })
	}

	/// Forget the persisted state. The next cycle rebuilds every node.
	pub fn clean(&mut self) -> TesselResult<bool> {
		self.state = BuildState::default();
		if !self.persist {
			return Ok(false);
		}

		BuildState::remove(&self.root)
	}
}
