use std::collections::BTreeMap;
use std::collections::BTreeSet;

use globset::GlobBuilder;
use globset::GlobMatcher;

use crate::PathRegistry;
use crate::SourcePath;
use crate::TesselError;
use crate::TesselResult;

/// Flags folded into every glob match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
	/// Match without regard to ASCII case.
	pub casefold: bool,
	/// Allow wildcards to match path segments starting with `.`.
	pub dotmatch: bool,
}

#[derive(Debug, Clone)]
struct CompiledGlob {
	matcher: GlobMatcher,
	/// Pattern ends in `/` and only claims directories.
	directory_only: bool,
	/// Pattern spells out a leading `.` in one of its segments.
	explicit_dot: bool,
	/// Pattern consists of `**` segments only and so also claims `/`.
	matches_root: bool,
}

/// An ordered list of compiled glob patterns.
///
/// Patterns are matched against logical paths with the leading `/` removed,
/// so `**/*.page` claims both `/index.page` and `/docs/intro.page`. `*` never
/// crosses a `/`. A pattern ending in `/` only claims directories, and `**/`
/// claims every directory including `/` itself.
#[derive(Debug, Clone, Default)]
pub struct GlobList {
	globs: Vec<CompiledGlob>,
	options: MatchOptions,
}

impl GlobList {
	pub fn new<S: AsRef<str>>(patterns: &[S], options: MatchOptions) -> TesselResult<Self> {
		let mut globs = Vec::with_capacity(patterns.len());
		for pattern in patterns {
			let pattern = pattern.as_ref();
			let source = pattern.trim_start_matches('/').trim_end_matches('/');
			let matcher = GlobBuilder::new(source)
				.literal_separator(true)
				.case_insensitive(options.casefold)
				.build()
				.map_err(|e| {
					TesselError::PatternConfig {
						pattern: pattern.to_string(),
						reason: e.to_string(),
					}
				})?
				.compile_matcher();

			globs.push(CompiledGlob {
				matcher,
				directory_only: pattern.ends_with('/'),
				explicit_dot: source.split('/').any(|segment| segment.starts_with('.')),
				matches_root: source.split('/').all(|segment| segment == "**"),
			});
		}

		Ok(Self { globs, options })
	}

	pub fn is_empty(&self) -> bool {
		self.globs.is_empty()
	}

	/// Whether any pattern claims the logical `path`.
	pub fn is_match(&self, path: &str) -> bool {
		let is_directory = path.ends_with('/');
		let target = path.trim_start_matches('/').trim_end_matches('/');
		let hidden = is_hidden(target);

		self.globs.iter().any(|glob| {
			if glob.directory_only && !is_directory {
				return false;
			}
			if hidden && !self.options.dotmatch && !glob.explicit_dot {
				return false;
			}
			if target.is_empty() {
				return glob.matches_root || glob.matcher.is_match(target);
			}
			glob.matcher.is_match(target)
		})
	}
}

fn is_hidden(target: &str) -> bool {
	target.split('/').any(|segment| segment.starts_with('.'))
}

/// Maps handler names to the glob patterns they claim.
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
	handlers: BTreeMap<String, GlobList>,
}

impl PatternMatcher {
	/// Compile the pattern table. A malformed pattern fails the whole table.
	pub fn new(table: &BTreeMap<String, Vec<String>>, options: MatchOptions) -> TesselResult<Self> {
		let mut handlers = BTreeMap::new();
		for (name, patterns) in table {
			handlers.insert(name.clone(), GlobList::new(patterns, options)?);
		}

		Ok(Self { handlers })
	}

	/// The candidate paths claimed by the handler `name`, in lexical order.
	///
	/// A handler without registered patterns claims nothing. Candidates that
	/// are not present in the registry are skipped.
	pub fn paths_for_handler<'r>(
		&self,
		name: &str,
		candidates: &BTreeSet<String>,
		registry: &'r PathRegistry,
	) -> Vec<&'r SourcePath> {
		let Some(globs) = self.handlers.get(name) else {
			return Vec::new();
		};

		candidates
			.iter()
			.filter_map(|path| registry.get(path))
			.filter(|path| globs.is_match(path.path()))
			.collect()
	}
}
