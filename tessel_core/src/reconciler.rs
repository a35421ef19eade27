use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::HandlerRegistry;
use crate::NodeFactory;
use crate::PathRegistry;
use crate::PatternMatcher;
use crate::TesselResult;
use crate::Tree;

/// Number of discovery passes per cycle. The second pass picks up nodes
/// invalidated by what the first pass regenerated; anything invalidated by
/// the second pass waits for the next cycle (see [`Tree::deferred`]).
pub const PASSES: usize = 2;

/// What a reconciliation did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Node paths removed because they were stale, in removal order.
	pub deleted: Vec<String>,
	/// Node paths created, in creation order.
	pub created: Vec<String>,
	/// Source paths offered to handlers, per pass.
	pub processed: [BTreeSet<String>; PASSES],
	/// Source paths regenerated by the last pass, whose dependents are
	/// rebuilt by the next cycle.
	pub deferred: BTreeSet<String>,
}

/// Keeps the node tree consistent with the path registry.
pub struct Reconciler<'a> {
	registry: &'a PathRegistry,
	matcher: &'a PatternMatcher,
	invoke: &'a BTreeMap<u32, Vec<String>>,
	handlers: &'a HandlerRegistry,
	factory: &'a NodeFactory,
}

impl<'a> Reconciler<'a> {
	/// `invoke` maps priority buckets to handler names; smaller buckets run
	/// first and names run in lexical order within a bucket.
	pub fn new(
		registry: &'a PathRegistry,
		matcher: &'a PatternMatcher,
		invoke: &'a BTreeMap<u32, Vec<String>>,
		handlers: &'a HandlerRegistry,
		factory: &'a NodeFactory,
	) -> Self {
		Self {
			registry,
			matcher,
			invoke,
			handlers,
			factory,
		}
	}

	/// Run both passes over `tree`.
	pub fn run(&self, tree: &mut Tree) -> TesselResult<ReconcileReport> {
		let mut report = ReconcileReport::default();
		let all_paths = self.registry.path_names();
		let mut processed: BTreeSet<String> = BTreeSet::new();

		for pass in 0..PASSES {
			let fresh = self.clean(tree, &mut report.deleted);
			if pass == 0 {
				tree.set_deferred(BTreeSet::new());
			}
			let candidates: BTreeSet<String> = all_paths
				.iter()
				.filter(|path| !processed.contains(*path) && !fresh.contains(*path))
				.cloned()
				.collect();

			tracing::debug!(pass, candidates = candidates.len(), "reconciling");
			let created = self.create_nodes_from_paths(tree, &candidates)?;
			if pass + 1 == PASSES {
				report.deferred = created
					.iter()
					.filter_map(|path| tree.lookup(path))
					.map(|node| node.src().to_string())
					.collect();
			}
			report.created.extend(created);
			processed.extend(candidates.iter().cloned());
			report.processed[pass] = candidates;
		}

		tree.set_deferred(report.deferred.clone());
		Ok(report)
	}

	/// Delete every stale node and return the source paths whose nodes are
	/// still fresh.
	///
	/// A node is stale when it was not created in this cycle and its source
	/// vanished, its source changed, or the node itself changed. Nodes whose
	/// source vanished are deleted physically so their output is removed.
	/// Sources deferred by the previous cycle count as regenerated.
	pub fn clean(&self, tree: &mut Tree, deleted: &mut Vec<String>) -> BTreeSet<String> {
		let mut regenerated: BTreeSet<String> = tree
			.nodes()
			.filter(|node| !node.is_root() && node.created)
			.map(|node| node.src().to_string())
			.collect();
		regenerated.extend(tree.deferred().iter().cloned());
		let mut fresh_sources = BTreeSet::new();
		let mut stale_sources = BTreeSet::new();

		for path in tree.node_paths() {
			// Already gone with an ancestor removed earlier in this walk.
			let Some(node) = tree.lookup(&path) else {
				continue;
			};

			let src = node.src().to_string();
			let vanished = !self.registry.contains(&src);
			let stale = !node.created
				&& (vanished
					|| self.registry.is_changed(&src)
					|| node.is_changed(self.registry, &regenerated));

			if stale {
				tracing::debug!(node = %path, src = %src, vanished, "removing stale node");
				tree.delete(&path, vanished);
				deleted.push(path);
				stale_sources.insert(src);
			} else {
				fresh_sources.insert(src);
			}
		}

		fresh_sources
			.difference(&stale_sources)
			.cloned()
			.collect()
	}

	/// Offer `paths` to the handlers in priority order and return the node
	/// paths they created. A path goes to the first handler that claims it.
	pub fn create_nodes_from_paths(
		&self,
		tree: &mut Tree,
		paths: &BTreeSet<String>,
	) -> TesselResult<Vec<String>> {
		let mut created = Vec::new();
		let mut claimed: BTreeSet<&str> = BTreeSet::new();

		for (priority, names) in self.invoke {
			let mut names: Vec<&String> = names.iter().collect();
			names.sort();

			for name in names {
				let handler = self.handlers.require(name)?;
				for path in self.matcher.paths_for_handler(name, paths, self.registry) {
					if !claimed.insert(path.path()) {
						continue;
					}

					tracing::trace!(priority, handler = %name, src = path.path(), "dispatching");
					let nodes =
						self.factory
							.create_nodes(tree, path.directory(), path, name, handler)?;
					for node_path in &nodes {
						if let Some(node) = tree.lookup_mut(node_path) {
							node.record_presence(self.registry);
						}
					}
					created.extend(nodes);
				}
			}
		}

		Ok(created)
	}
}
