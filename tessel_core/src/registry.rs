use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::GlobList;
use crate::SourcePath;
use crate::SourceProvider;
use crate::TesselResult;
use crate::source::FingerprintMap;

/// The deduplicated, filtered set of source paths for one cycle.
///
/// Built once per cycle and handed to every pass of the reconciler and to
/// the output writer so that all of them agree on which paths exist and
/// which of them changed.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
	paths: BTreeMap<String, SourcePath>,
}

impl PathRegistry {
	/// Enumerate `provider` and drop every path matched by `ignore`.
	pub fn build(provider: &dyn SourceProvider, ignore: &GlobList) -> TesselResult<Self> {
		let mut paths = BTreeMap::new();
		let mut ignored = 0usize;
		for path in provider.paths()? {
			if ignore.is_match(path.path()) {
				ignored += 1;
				continue;
			}
			paths.insert(path.path().to_string(), path);
		}

		tracing::debug!(paths = paths.len(), ignored, "built path registry");
		Ok(Self { paths })
	}

	/// A registry holding exactly `paths`, without any filtering.
	pub fn from_paths(paths: impl IntoIterator<Item = SourcePath>) -> Self {
		Self {
			paths: paths
				.into_iter()
				.map(|path| (path.path().to_string(), path))
				.collect(),
		}
	}

	pub fn all_paths(&self) -> &BTreeMap<String, SourcePath> {
		&self.paths
	}

	/// The set of all path names, used as the starting point of each pass.
	pub fn path_names(&self) -> BTreeSet<String> {
		self.paths.keys().cloned().collect()
	}

	pub fn get(&self, path: &str) -> Option<&SourcePath> {
		self.paths.get(path)
	}

	pub fn contains(&self, path: &str) -> bool {
		self.paths.contains_key(path)
	}

	/// Whether `path` exists and reports a change.
	pub fn is_changed(&self, path: &str) -> bool {
		self.paths.get(path).is_some_and(SourcePath::changed)
	}

	pub fn len(&self) -> usize {
		self.paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	/// Fingerprints of every path that has one, to be compared against in
	/// the next cycle.
	pub fn fingerprints(&self) -> FingerprintMap {
		self.paths
			.iter()
			.filter_map(|(name, path)| path.fingerprint().map(|fp| (name.clone(), *fp)))
			.collect()
	}
}
