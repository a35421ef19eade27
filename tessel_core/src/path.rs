use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;

use crate::TesselError;
use crate::TesselResult;
use crate::source::Fingerprint;

/// Metadata attached to source paths and nodes.
///
/// Keys are kept sorted so that serialized trees and rendered output are
/// identical across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Deref, DerefMut)]
#[serde(transparent)]
pub struct MetaInfo(
	#[deref]
	#[deref_mut]
	BTreeMap<String, serde_json::Value>,
);

impl MetaInfo {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy every entry of `other` into `self`, replacing existing keys.
	pub fn update(&mut self, other: &MetaInfo) {
		for (key, value) in other.iter() {
			self.0.insert(key.clone(), value.clone());
		}
	}

	/// Merge the given layers in order. Later layers win.
	pub fn layered<'a>(layers: impl IntoIterator<Item = &'a MetaInfo>) -> Self {
		let mut merged = Self::new();
		for layer in layers {
			merged.update(layer);
		}
		merged
	}

	/// Look up a string value.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.0.get(key).and_then(serde_json::Value::as_str)
	}
}

impl<K: Into<String>, V: Into<serde_json::Value>> FromIterator<(K, V)> for MetaInfo {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// Where the bytes of a source path come from.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SourceContent {
	/// Directories have no content.
	Directory,
	/// Content held in memory.
	Bytes(Arc<[u8]>),
	/// Content read lazily from disk.
	File(PathBuf),
}

/// A single path supplied by a source provider for one cycle.
#[derive(Debug, Clone)]
pub struct SourcePath {
	path: String,
	meta_info: MetaInfo,
	changed: bool,
	content: SourceContent,
	fingerprint: Option<Fingerprint>,
}

impl SourcePath {
	/// Create a source path. Paths ending in `/` are directories.
	pub fn new(path: impl AsRef<str>) -> Self {
		let path = normalize_path(path.as_ref());
		let content = if path.ends_with('/') {
			SourceContent::Directory
		} else {
			SourceContent::Bytes(Arc::from(Vec::new()))
		};

		Self {
			path,
			meta_info: MetaInfo::new(),
			changed: false,
			content,
			fingerprint: None,
		}
	}

	#[must_use]
	pub fn with_content(mut self, content: SourceContent) -> Self {
		self.content = content;
		self
	}

	#[must_use]
	pub fn with_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
		let bytes: Vec<u8> = bytes.into();
		self.with_content(SourceContent::Bytes(Arc::from(bytes)))
	}

	#[must_use]
	pub fn with_changed(mut self, changed: bool) -> Self {
		self.changed = changed;
		self
	}

	#[must_use]
	pub fn with_meta_info(mut self, meta_info: MetaInfo) -> Self {
		self.meta_info = meta_info;
		self
	}

	#[must_use]
	pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
		self.fingerprint = Some(fingerprint);
		self
	}

	/// Re-root this path under `mount`, e.g. `/a.page` mounted at `/docs/`
	/// becomes `/docs/a.page`.
	#[must_use]
	pub fn mounted_at(mut self, mount: &str) -> Self {
		self.path = join_mount(mount, &self.path);
		self
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn is_directory(&self) -> bool {
		self.path.ends_with('/')
	}

	/// Whether this path changed since the previous cycle.
	pub fn changed(&self) -> bool {
		self.changed
	}

	pub fn meta_info(&self) -> &MetaInfo {
		&self.meta_info
	}

	pub fn meta_info_mut(&mut self) -> &mut MetaInfo {
		&mut self.meta_info
	}

	pub fn fingerprint(&self) -> Option<&Fingerprint> {
		self.fingerprint.as_ref()
	}

	/// The directory containing this path, with a trailing `/`. The root
	/// directory `/` has the empty parent, which is the dummy root.
	pub fn directory(&self) -> &str {
		parent_path(&self.path)
	}

	/// The last segment of the path without any trailing `/`.
	pub fn basename(&self) -> &str {
		let trimmed = self.path.trim_end_matches('/');
		trimmed.rsplit('/').next().unwrap_or(trimmed)
	}

	/// The basename without its final extension.
	pub fn stem(&self) -> &str {
		let name = self.basename();
		match name.rfind('.') {
			Some(0) | None => name,
			Some(index) => &name[..index],
		}
	}

	/// Read the full content of this path.
	pub fn read(&self) -> TesselResult<Vec<u8>> {
		match &self.content {
			SourceContent::Directory => Ok(Vec::new()),
			SourceContent::Bytes(bytes) => Ok(bytes.to_vec()),
			SourceContent::File(file) => {
				std::fs::read(file).map_err(|e| {
					TesselError::SourceRead {
						path: self.path.clone(),
						reason: e.to_string(),
					}
				})
			}
		}
	}

	/// Read the content of this path as UTF-8 text.
	pub fn read_to_string(&self) -> TesselResult<String> {
		let bytes = self.read()?;
		String::from_utf8(bytes).map_err(|e| {
			TesselError::SourceRead {
				path: self.path.clone(),
				reason: e.to_string(),
			}
		})
	}
}

/// Normalize a logical path: forward slashes, a single leading `/`, no
/// repeated separators. A trailing `/` is preserved since it marks a
/// directory.
pub fn normalize_path(path: &str) -> String {
	let path = path.replace('\\', "/");
	let is_dir = path.ends_with('/');
	let segments: Vec<&str> = path
		.split('/')
		.filter(|segment| !segment.is_empty() && *segment != ".")
		.collect();

	if segments.is_empty() {
		return "/".to_string();
	}

	let mut normalized = String::with_capacity(path.len() + 2);
	for segment in segments {
		normalized.push('/');
		normalized.push_str(segment);
	}
	if is_dir {
		normalized.push('/');
	}
	normalized
}

/// The parent directory path of a logical path (always ending in `/`), or
/// the empty string for `/` itself.
pub fn parent_path(path: &str) -> &str {
	if path == "/" || path.is_empty() {
		return "";
	}

	let trimmed = path.trim_end_matches('/');
	match trimmed.rfind('/') {
		Some(index) => &path[..=index],
		None => "",
	}
}

fn join_mount(mount: &str, path: &str) -> String {
	let mount = normalize_path(mount);
	if mount == "/" {
		return normalize_path(path);
	}
	normalize_path(&format!("{}/{}", mount.trim_end_matches('/'), path))
}
