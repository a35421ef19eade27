use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

use crate::TesselResult;
use crate::Tree;
use crate::source::FingerprintMap;

pub(crate) const STATE_SCHEMA_VERSION: u32 = 1;
const STATE_FILE_NAME: &str = "state-v1.json";

/// Everything carried from one cycle to the next: the node tree and the
/// fingerprints the source paths had when it was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildState {
	pub schema_version: u32,
	pub tree: Tree,
	#[serde(default)]
	pub fingerprints: FingerprintMap,
}

impl Default for BuildState {
	fn default() -> Self {
		Self::new(Tree::new(), FingerprintMap::new())
	}
}

impl BuildState {
	pub fn new(tree: Tree, fingerprints: FingerprintMap) -> Self {
		Self {
			schema_version: STATE_SCHEMA_VERSION,
			tree,
			fingerprints,
		}
	}

	/// Location of the state file for the project at `root`.
	pub fn cache_path(root: &Path) -> PathBuf {
		root.join(".tessel").join("cache").join(STATE_FILE_NAME)
	}

	/// Load the state persisted for `root`. A missing, unreadable, or
	/// outdated state file yields `None` and the next cycle starts from an
	/// empty tree.
	pub fn load(root: &Path) -> Option<Self> {
		let cache_path = Self::cache_path(root);
		let bytes = std::fs::read(&cache_path).ok()?;
		let state: Self = match serde_json::from_slice(&bytes) {
			Ok(state) => state,
			Err(e) => {
				tracing::warn!(path = %cache_path.display(), "ignoring unreadable build state: {e}");
				return None;
			}
		};

		if state.schema_version != STATE_SCHEMA_VERSION {
			tracing::debug!(
				found = state.schema_version,
				expected = STATE_SCHEMA_VERSION,
				"ignoring build state from another schema version"
			);
			return None;
		}

		if state.tree.dummy_root().is_none() {
			tracing::warn!(path = %cache_path.display(), "ignoring build state without a root node");
			return None;
		}

		Some(state)
	}

	/// Persist the state for `root`, replacing the previous file atomically.
	pub fn save(&self, root: &Path) -> TesselResult<()> {
		let cache_path = Self::cache_path(root);
		if let Some(cache_dir) = cache_path.parent() {
			std::fs::create_dir_all(cache_dir)?;
		}

		let payload = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
		let temp_path = cache_path.with_extension(format!(
			"json.tmp-{}-{}",
			std::process::id(),
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map_or(0, |duration| duration.as_nanos())
		));

		std::fs::write(&temp_path, payload)?;
		if let Err(e) = std::fs::rename(&temp_path, &cache_path) {
			let _ = std::fs::remove_file(&temp_path);
			return Err(e.into());
		}

		Ok(())
	}

	/// Delete the persisted state for `root`. Returns whether a file was
	/// removed.
	pub fn remove(root: &Path) -> TesselResult<bool> {
		match std::fs::remove_file(Self::cache_path(root)) {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
			Err(e) => Err(e.into()),
		}
	}
}
