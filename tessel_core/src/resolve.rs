//! Resolution of references between nodes.
//!
//! Content refers to other nodes by path, either absolute (`/css/site.css`)
//! or relative to the node containing the reference (`../index.html`). The
//! functions here find the referenced node and compute the route a browser
//! needs from the node actually being written.

use crate::RenderError;
use crate::Tree;
use crate::normalize_path;
use crate::parent_path;

/// Characters that may never appear in a reference.
const INVALID_CHARACTERS: &[char] = &['<', '>', '"', '{', '}', '|', '\\', '^', '`'];

/// Whether `reference` is an absolute URL such as `https://example.com/` or
/// `mailto:someone@example.com`.
pub fn is_absolute_url(reference: &str) -> bool {
	let Some((scheme, _)) = reference.split_once(':') else {
		return false;
	};

	let mut chars = scheme.chars();
	chars.next().is_some_and(|c| c.is_ascii_alphabetic())
		&& chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Check that `reference` is a well formed URL reference.
pub fn validate_reference(reference: &str) -> Result<(), String> {
	if reference.is_empty() {
		return Err("the path is empty".to_string());
	}

	if let Some(c) = reference
		.chars()
		.find(|c| c.is_whitespace() || c.is_control() || INVALID_CHARACTERS.contains(c))
	{
		return Err(format!("bad character {c:?}"));
	}

	if reference.matches('#').count() > 1 {
		return Err("more than one fragment separator".to_string());
	}

	Ok(())
}

/// The directory a reference inside the node at `path` is relative to.
fn base_directory(path: &str) -> &str {
	if path.ends_with('/') {
		path
	} else {
		parent_path(path)
	}
}

/// Join `reference` onto the directory of `from` and collapse `.` and `..`
/// segments. `..` never climbs above `/`.
pub fn join_reference(from: &str, reference: &str) -> String {
	let joined = if reference.starts_with('/') {
		reference.to_string()
	} else {
		format!("{}{reference}", base_directory(from))
	};

	let is_directory = joined.ends_with('/') || joined.ends_with("/..") || joined.ends_with("/.");
	let mut segments: Vec<&str> = Vec::new();
	for segment in joined.split('/') {
		match segment {
			"" | "." => {}
			".." => {
				segments.pop();
			}
			segment => segments.push(segment),
		}
	}

	let mut path = String::from("/");
	path.push_str(&segments.join("/"));
	if is_directory && !segments.is_empty() {
		path.push('/');
	}
	normalize_path(&path)
}

/// Find the node `reference` points at, relative to the node at `from`.
///
/// The reference is tried as a node path, then as a directory, and finally
/// as the source path of a node so that `about.page` finds `about.html`. A
/// fragment (`#intro`) is kept on the resolved node.
pub fn resolve(tree: &Tree, from: &str, reference: &str) -> Option<String> {
	let (base, fragment) = match reference.split_once('#') {
		Some((base, fragment)) => (base, Some(fragment)),
		None => (reference, None),
	};

	let target = if base.is_empty() {
		from.to_string()
	} else {
		resolve_base(tree, from, base)?
	};

	match fragment {
		Some(fragment) => Some(format!("{target}#{fragment}")),
		None => Some(target),
	}
}

fn resolve_base(tree: &Tree, from: &str, base: &str) -> Option<String> {
	let joined = join_reference(from, base);
	if tree.contains(&joined) {
		return Some(joined);
	}

	if !joined.ends_with('/') {
		let directory = format!("{joined}/");
		if tree.contains(&directory) {
			return Some(directory);
		}
	}

	tree.nodes()
		.find(|node| !node.is_root() && !node.is_fragment() && node.src() == joined)
		.map(|node| node.path().to_string())
}

/// The relative route from the node at `from` to the node at `to`.
pub fn route_to(from: &str, to: &str) -> String {
	let (to_base, fragment) = match to.split_once('#') {
		Some((base, fragment)) => (base, Some(fragment)),
		None => (to, None),
	};

	let from_base = from.split_once('#').map_or(from, |(base, _)| base);
	if let (Some(fragment), true) = (fragment, to_base == from_base) {
		return format!("#{fragment}");
	}

	let from_segments: Vec<&str> = base_directory(from_base)
		.split('/')
		.filter(|segment| !segment.is_empty())
		.collect();
	let to_segments: Vec<&str> = to_base
		.split('/')
		.filter(|segment| !segment.is_empty())
		.collect();
	let (to_directories, file) = if to_base.ends_with('/') {
		(&to_segments[..], None)
	} else {
		match to_segments.split_last() {
			Some((file, directories)) => (directories, Some(*file)),
			None => (&to_segments[..], None),
		}
	};

	let common = from_segments
		.iter()
		.zip(to_directories)
		.take_while(|(a, b)| a == b)
		.count();

	let mut route = "../".repeat(from_segments.len() - common);
	for directory in &to_directories[common..] {
		route.push_str(directory);
		route.push('/');
	}
	if let Some(file) = file {
		route.push_str(file);
	}
	if route.is_empty() {
		route.push_str("./");
	}
	if let Some(fragment) = fragment {
		route.push('#');
		route.push_str(fragment);
	}

	route
}

/// Turn `reference`, written inside the node at `ref_node`, into a link that
/// is valid from the node at `dest_node`.
///
/// Absolute URLs are returned unchanged. A malformed reference is a
/// [`RenderError`]; a reference that names no node is logged and yields an
/// empty string so the rest of the page still renders.
pub fn relocatable(
	tree: &Tree,
	dest_node: &str,
	ref_node: &str,
	reference: &str,
) -> Result<String, RenderError> {
	validate_reference(reference).map_err(|reason| {
		RenderError::new(
			dest_node,
			ref_node,
			format!("error while parsing path `{reference}`: {reason}"),
		)
	})?;

	if is_absolute_url(reference) {
		return Ok(reference.to_string());
	}

	match resolve(tree, ref_node, reference) {
		Some(target) => Ok(route_to(dest_node, &target)),
		None => {
			tracing::error!(path = reference, node = ref_node, "could not resolve path");
			Ok(String::new())
		}
	}
}
