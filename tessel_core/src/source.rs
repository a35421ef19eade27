//! Source providers enumerate the raw paths a cycle works on.
//!
//! A provider reports each path once per cycle together with a flag telling
//! whether the path changed since the previous cycle. Providers are stacked
//! at mount points with [`StackedSource`]; a later provider shadows an
//! earlier one at the same logical path.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::Path;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

use globset::GlobBuilder;
use globset::GlobMatcher;
use ignore::WalkBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::SourceContent;
use crate::SourcePath;
use crate::TesselError;
use crate::TesselResult;
use crate::normalize_path;
use crate::parent_path;

/// Something that can enumerate source paths.
pub trait SourceProvider {
	/// All paths currently provided, each with its changed flag set.
	fn paths(&self) -> TesselResult<Vec<SourcePath>>;
}

/// Cheap identity of a file on disk used to detect changes between cycles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Fingerprint {
	pub size: u64,
	pub modified_unix_ms: u64,
}

impl Fingerprint {
	pub fn from_metadata(metadata: &Metadata) -> Self {
		if metadata.is_dir() {
			// Directory mtimes move whenever an entry is added, which must not
			// invalidate the directory node itself.
			return Self::default();
		}

		let modified_unix_ms = metadata
			.modified()
			.ok()
			.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
			.and_then(|duration| duration.as_millis().try_into().ok())
			.unwrap_or(0);

		Self {
			size: metadata.len(),
			modified_unix_ms,
		}
	}
}

/// Fingerprints recorded at the end of a cycle, keyed by logical path.
pub type FingerprintMap = BTreeMap<String, Fingerprint>;

/// A provider backed by an in-memory list of paths.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	paths: BTreeMap<String, SourcePath>,
}

impl MemorySource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add or replace a path.
	pub fn insert(&mut self, path: SourcePath) {
		self.paths.insert(path.path().to_string(), path);
	}

	/// Remove a path, returning it if it was present.
	pub fn remove(&mut self, path: &str) -> Option<SourcePath> {
		self.paths.remove(path)
	}

	/// Clear the changed flag on every path, as a provider would between
	/// cycles when nothing was touched.
	pub fn mark_unchanged(&mut self) {
		for path in self.paths.values_mut() {
			*path = path.clone().with_changed(false);
		}
	}
}

impl FromIterator<SourcePath> for MemorySource {
	fn from_iter<I: IntoIterator<Item = SourcePath>>(paths: I) -> Self {
		let mut source = Self::new();
		for path in paths {
			source.insert(path);
		}
		source
	}
}

impl SourceProvider for MemorySource {
	fn paths(&self) -> TesselResult<Vec<SourcePath>> {
		Ok(self.paths.values().cloned().collect())
	}
}

/// A provider reading a directory tree from disk.
///
/// The directory itself is reported as its mount point (`/` by default),
/// subdirectories with a trailing `/`. A path is reported as changed when its
/// [`Fingerprint`] differs from the one recorded for the same logical path in
/// the previous cycle.
#[derive(Debug)]
pub struct FileSystemSource {
	root: PathBuf,
	mount: String,
	glob: GlobMatcher,
	previous: FingerprintMap,
}

impl FileSystemSource {
	pub fn new(root: impl Into<PathBuf>, glob: &str, previous: FingerprintMap) -> TesselResult<Self> {
		let glob = GlobBuilder::new(glob)
			.literal_separator(true)
			.build()
			.map_err(|e| {
				TesselError::PatternConfig {
					pattern: glob.to_string(),
					reason: e.to_string(),
				}
			})?
			.compile_matcher();

		Ok(Self {
			root: root.into(),
			mount: "/".to_string(),
			glob,
			previous,
		})
	}

	/// Report paths below `mount` instead of `/`.
	#[must_use]
	pub fn with_mount(mut self, mount: &str) -> Self {
		self.mount = normalize_path(&format!("{mount}/"));
		self
	}

	fn logical_path(&self, file: &Path, is_dir: bool) -> Option<String> {
		let relative = file.strip_prefix(&self.root).ok()?;
		let relative = relative.to_string_lossy().replace('\\', "/");
		if relative.is_empty() {
			return Some(self.mount.clone());
		}

		if !self.glob.is_match(&relative) {
			return None;
		}

		Some(if is_dir {
			format!("{}{relative}/", self.mount)
		} else {
			format!("{}{relative}", self.mount)
		})
	}
}

impl SourceProvider for FileSystemSource {
	fn paths(&self) -> TesselResult<Vec<SourcePath>> {
		let mut paths = Vec::new();
		if !self.root.is_dir() {
			return Ok(paths);
		}

		let walker = WalkBuilder::new(&self.root)
			.hidden(false)
			.ignore(false)
			.git_ignore(false)
			.git_global(false)
			.git_exclude(false)
			.parents(false)
			.sort_by_file_name(|a, b| a.cmp(b))
			.build();

		for entry in walker {
			let entry = entry.map_err(|e| {
				TesselError::SourceRead {
					path: self.root.display().to_string(),
					reason: e.to_string(),
				}
			})?;
			let metadata = entry.metadata().map_err(|e| {
				TesselError::SourceRead {
					path: entry.path().display().to_string(),
					reason: e.to_string(),
				}
			})?;
			let is_dir = metadata.is_dir();
			let Some(logical) = self.logical_path(entry.path(), is_dir) else {
				continue;
			};

			let fingerprint = Fingerprint::from_metadata(&metadata);
			let changed = self.previous.get(&logical) != Some(&fingerprint);
			let content = if is_dir {
				SourceContent::Directory
			} else {
				SourceContent::File(entry.path().to_path_buf())
			};

			paths.push(
				SourcePath::new(&logical)
					.with_content(content)
					.with_changed(changed)
					.with_fingerprint(fingerprint),
			);
		}

		Ok(paths)
	}
}

/// Several providers mounted at logical mount points.
///
/// Directories leading up to a provided path are reported as unchanged
/// directory paths when no provider supplies them, so that every path has a
/// parent node.
#[derive(Default)]
pub struct StackedSource {
	providers: Vec<(String, Box<dyn SourceProvider>)>,
}

impl StackedSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Mount a provider. Providers added later shadow earlier ones.
	pub fn mount(&mut self, mount: impl Into<String>, provider: Box<dyn SourceProvider>) {
		self.providers.push((mount.into(), provider));
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}

impl SourceProvider for StackedSource {
	fn paths(&self) -> TesselResult<Vec<SourcePath>> {
		let mut merged: BTreeMap<String, SourcePath> = BTreeMap::new();
		for (mount, provider) in &self.providers {
			for path in provider.paths()? {
				let path = path.mounted_at(mount);
				merged.insert(path.path().to_string(), path);
			}
		}

		let mut missing = Vec::new();
		for path in merged.keys() {
			let mut directory = parent_path(path);
			while !directory.is_empty() && !merged.contains_key(directory) {
				missing.push(directory.to_string());
				directory = parent_path(directory);
			}
		}
		for directory in missing {
			merged
				.entry(directory.clone())
				.or_insert_with(|| SourcePath::new(&directory));
		}

		Ok(merged.into_values().collect())
	}
}
