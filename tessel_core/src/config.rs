use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::MetaInfo;
use crate::TesselError;
use crate::TesselResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["tessel.toml", ".tessel.toml", ".config/tessel.toml"];

/// Key of the `default_meta_info` table applied to every handler.
pub const GLOBAL_META_KEY: &str = "all";

/// Configuration loaded from a `tessel.toml` file.
///
/// ```toml
/// [[sources]]
/// mount = "/"
/// path = "src"
/// glob = "**/*"
///
/// [output]
/// path = "out"
///
/// [sourcehandler]
/// ignore = ["**/*~"]
/// casefold = true
/// use_hidden_files = false
///
/// [sourcehandler.patterns]
/// page = ["**/*.page", "**/*.md"]
///
/// [sourcehandler.invoke]
/// 1 = ["directory"]
/// 5 = ["copy", "page", "template"]
///
/// [sourcehandler.default_meta_info.all]
/// author = "me"
/// ```
///
/// Every section is optional. Entries of the `patterns`, `invoke` and
/// `default_meta_info` tables are laid over the built-in defaults key by
/// key, so a config only needs to mention what it changes.
#[derive(Debug, Clone, Deserialize)]
pub struct TesselConfig {
	/// Directories providing source paths. Later entries shadow earlier ones.
	#[serde(default = "default_sources")]
	pub sources: Vec<SourceConfig>,
	/// Where rendered output goes.
	#[serde(default)]
	pub output: OutputConfig,
	/// Handler dispatch configuration.
	#[serde(default)]
	pub sourcehandler: SourceHandlerConfig,
}

impl Default for TesselConfig {
	fn default() -> Self {
		Self {
			sources: default_sources(),
			output: OutputConfig::default(),
			sourcehandler: SourceHandlerConfig::default(),
		}
	}
}

/// A directory mounted into the logical path space.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
	/// Logical mount point, e.g. `/` or `/blog/`.
	#[serde(default = "default_mount")]
	pub mount: String,
	/// Directory relative to the project root.
	pub path: PathBuf,
	/// Glob restricting which entries of the directory are provided.
	#[serde(default = "default_source_glob")]
	pub glob: String,
}

/// Output sink configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
	/// Directory, relative to the project root, receiving rendered files.
	#[serde(default = "default_output_path")]
	pub path: PathBuf,
}

impl Default for OutputConfig {
	fn default() -> Self {
		Self {
			path: default_output_path(),
		}
	}
}

/// The `[sourcehandler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceHandlerConfig {
	/// Globs of source paths dropped before any handler sees them.
	#[serde(default = "default_ignore")]
	pub ignore: Vec<String>,
	/// Match the ignore list without regard to case.
	#[serde(default = "default_true")]
	pub ignore_casefold: bool,
	/// Let ignore wildcards match hidden path segments.
	#[serde(default = "default_true")]
	pub ignore_dotmatch: bool,
	/// Match handler patterns without regard to case.
	#[serde(default = "default_true")]
	pub casefold: bool,
	/// Let handler wildcards match hidden path segments.
	#[serde(default)]
	pub use_hidden_files: bool,
	/// Handler name to glob patterns, laid over the defaults.
	#[serde(default)]
	pub patterns: BTreeMap<String, Vec<String>>,
	/// Priority bucket to handler names, laid over the defaults. Buckets
	/// are TOML keys and therefore strings; they must parse as integers.
	#[serde(default)]
	pub invoke: BTreeMap<String, Vec<String>>,
	/// Handler name (or `all`) to default metadata, laid over the defaults.
	#[serde(default)]
	pub default_meta_info: BTreeMap<String, MetaInfo>,
}

impl Default for SourceHandlerConfig {
	fn default() -> Self {
		Self {
			ignore: default_ignore(),
			ignore_casefold: true,
			ignore_dotmatch: true,
			casefold: true,
			use_hidden_files: false,
			patterns: BTreeMap::new(),
			invoke: BTreeMap::new(),
			default_meta_info: BTreeMap::new(),
		}
	}
}

impl SourceHandlerConfig {
	/// The effective handler pattern table.
	pub fn patterns(&self) -> BTreeMap<String, Vec<String>> {
		let mut patterns = default_patterns();
		for (name, globs) in &self.patterns {
			patterns.insert(name.clone(), globs.clone());
		}
		patterns
	}

	/// The effective priority table, ascending by bucket, handler names
	/// sorted within each bucket.
	pub fn invoke(&self) -> TesselResult<BTreeMap<u32, Vec<String>>> {
		let mut invoke = default_invoke();
		for (bucket, names) in &self.invoke {
			let priority = bucket.trim().parse::<u32>().map_err(|_| {
				TesselError::ConfigParse(format!(
					"priority bucket `{bucket}` in [sourcehandler.invoke] is not a non-negative \
					 integer"
				))
			})?;
			invoke.insert(priority, names.clone());
		}

		for names in invoke.values_mut() {
			names.sort();
			names.dedup();
		}

		Ok(invoke)
	}

	/// The effective default metadata table.
	pub fn default_meta_info(&self) -> DefaultMetaInfo {
		let mut table = default_meta_info_table();
		for (name, meta) in &self.default_meta_info {
			table.entry(name.clone()).or_default().update(meta);
		}
		DefaultMetaInfo(table)
	}
}

/// Default metadata keyed by handler name, with [`GLOBAL_META_KEY`] applying
/// to every handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefaultMetaInfo(BTreeMap<String, MetaInfo>);

impl DefaultMetaInfo {
	pub fn new(table: BTreeMap<String, MetaInfo>) -> Self {
		Self(table)
	}

	/// Defaults applied to every handler.
	pub fn global(&self) -> Option<&MetaInfo> {
		self.0.get(GLOBAL_META_KEY)
	}

	/// Defaults applied to a single handler.
	pub fn for_handler(&self, name: &str) -> Option<&MetaInfo> {
		self.0.get(name)
	}
}

impl TesselConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> TesselResult<Option<TesselConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	/// Parse a config from TOML text.
	pub fn parse(content: &str) -> TesselResult<TesselConfig> {
		toml::from_str(content).map_err(|e| TesselError::ConfigParse(e.to_string()))
	}
}

fn default_true() -> bool {
	true
}

fn default_mount() -> String {
	"/".to_string()
}

fn default_source_glob() -> String {
	"**/*".to_string()
}

fn default_output_path() -> PathBuf {
	PathBuf::from("out")
}

fn default_sources() -> Vec<SourceConfig> {
	vec![SourceConfig {
		mount: default_mount(),
		path: PathBuf::from("src"),
		glob: default_source_glob(),
	}]
}

fn default_ignore() -> Vec<String> {
	["**/*~", "**/.svn", "**/.svn/**", "**/.git", "**/.git/**"]
		.into_iter()
		.map(String::from)
		.collect()
}

fn default_patterns() -> BTreeMap<String, Vec<String>> {
	let table: [(&str, &[&str]); 4] = [
		("directory", &["**/"]),
		(
			"copy",
			&[
				"**/*.css", "**/*.js", "**/*.png", "**/*.jpg", "**/*.jpeg", "**/*.gif",
				"**/*.svg", "**/*.ico",
			],
		),
		("template", &["**/*.template"]),
		("page", &["**/*.page"]),
	];

	table
		.into_iter()
		.map(|(name, globs)| {
			(
				name.to_string(),
				globs.iter().map(|glob| (*glob).to_string()).collect(),
			)
		})
		.collect()
}

fn default_invoke() -> BTreeMap<u32, Vec<String>> {
	BTreeMap::from([
		(1, vec!["directory".to_string()]),
		(
			5,
			vec![
				"copy".to_string(),
				"page".to_string(),
				"template".to_string(),
			],
		),
	])
}

fn default_meta_info_table() -> BTreeMap<String, MetaInfo> {
	BTreeMap::from([
		(GLOBAL_META_KEY.to_string(), MetaInfo::new()),
		(
			"page".to_string(),
			[("in_menu", serde_json::Value::Bool(false))]
				.into_iter()
				.collect(),
		),
	])
}
