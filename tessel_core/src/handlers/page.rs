use std::collections::BTreeSet;
use std::sync::Arc;

use minijinja::Environment;
use minijinja::UndefinedBehavior;
use minijinja::context;

use super::read_source;
use crate::Handler;
use crate::MetaInfo;
use crate::Node;
use crate::NodeKind;
use crate::RenderContext;
use crate::RenderError;
use crate::SourcePath;
use crate::TesselError;
use crate::TesselResult;
use crate::Tree;
use crate::resolve::join_reference;
use crate::resolve::relocatable;

/// Metadata key naming the layout template of a page.
pub const TEMPLATE_META_KEY: &str = "template";

/// Turns a `.page` file into an HTML document.
///
/// A page may start with a YAML front matter block between two `---` lines
/// whose entries are merged over the default metadata. The body is rendered
/// with minijinja and then placed into the layout named by the `template`
/// metadata key, if any. Markdown headings in the body become fragment
/// nodes so other content can link to `page.html#heading`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageHandler;

impl Handler for PageHandler {
	fn create_node(
		&self,
		tree: &mut Tree,
		parent: &str,
		path: &SourcePath,
	) -> TesselResult<Vec<String>> {
		let text = path.read_to_string()?;
		let (front_matter, body) = split_front_matter(&text);
		let mut meta_info = path.meta_info().clone();
		if let Some(front_matter) = front_matter {
			meta_info.update(&parse_front_matter(path.path(), front_matter)?);
		}

		let output = format!("{parent}{}.html", path.stem());
		let template = meta_info
			.get_str(TEMPLATE_META_KEY)
			.map(|template| join_reference(path.path(), template));

		let node = tree.insert(parent, &output, NodeKind::File)?;
		node.meta_info = meta_info;
		if let Some(template) = template {
			node.add_dependency(template);
		}

		let mut created = vec![output.clone()];
		let mut slugs = BTreeSet::new();
		for heading in headings(body) {
			let base = slugify(heading);
			if base.is_empty() {
				continue;
			}

			let mut slug = base.clone();
			let mut counter = 1;
			while !slugs.insert(slug.clone()) {
				slug = format!("{base}-{counter}");
				counter += 1;
			}

			let fragment = format!("{output}#{slug}");
			let node = tree.insert(&output, &fragment, NodeKind::Fragment)?;
			node.meta_info
				.insert("title".to_string(), heading.to_string().into());
			created.push(fragment);
		}

		Ok(created)
	}

	fn content(&self, node: &Node, ctx: &RenderContext<'_>) -> Result<Option<Vec<u8>>, RenderError> {
		if node.is_fragment() {
			return Ok(None);
		}

		let bytes = read_source(node, ctx)?;
		let text = String::from_utf8(bytes)
			.map_err(|e| RenderError::new(node.path(), node.path(), e.to_string()))?;
		let (_, body) = split_front_matter(&text);

		let content = render(
			&ctx.tree,
			node,
			node.path(),
			body,
			context! { meta => &node.meta_info, node => node_value(node) },
		)?;

		let Some(template) = node.meta_info.get_str(TEMPLATE_META_KEY) else {
			return Ok(Some(content.into_bytes()));
		};

		let template_src = join_reference(node.src(), template);
		let Some(layout) = ctx.registry.get(&template_src) else {
			return Err(RenderError::new(
				node.path(),
				node.path(),
				format!("layout template `{template_src}` does not exist"),
			));
		};
		let layout = layout
			.read_to_string()
			.map_err(|e| RenderError::new(node.path(), &template_src, e.to_string()))?;

		let document = render(
			&ctx.tree,
			node,
			&template_src,
			&layout,
			context! {
				content => content,
				meta => &node.meta_info,
				node => node_value(node),
			},
		)?;

		Ok(Some(document.into_bytes()))
	}
}

fn node_value(node: &Node) -> minijinja::Value {
	context! {
		path => node.path(),
		src => node.src(),
		kind => node.kind().to_string(),
	}
}

/// Render `source`, which lives in the node at `reference`, for the node
/// being written.
fn render(
	tree: &Arc<Tree>,
	node: &Node,
	reference: &str,
	source: &str,
	ctx: minijinja::Value,
) -> Result<String, RenderError> {
	let mut env = Environment::new();
	env.set_keep_trailing_newline(true);
	env.set_undefined_behavior(UndefinedBehavior::Chainable);

	let tree = Arc::clone(tree);
	let dest = node.path().to_string();
	let ref_node = reference.to_string();
	env.add_function("relocatable", move |path: &str| {
		relocatable(&tree, &dest, &ref_node, path).map_err(|e| {
			minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.message)
		})
	});

	env.add_template("__inline__", source)
		.map_err(|e| RenderError::new(node.path(), reference, e.to_string()))?;
	let template = env
		.get_template("__inline__")
		.map_err(|e| RenderError::new(node.path(), reference, e.to_string()))?;

	template
		.render(ctx)
		.map_err(|e| RenderError::new(node.path(), reference, e.to_string()))
}

/// Split `text` into its front matter block, if any, and the body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
	let Some(rest) = text
		.strip_prefix("---\n")
		.or_else(|| text.strip_prefix("---\r\n"))
	else {
		return (None, text);
	};

	let mut offset = 0;
	for line in rest.split_inclusive('\n') {
		if line.trim_end_matches(['\r', '\n']) == "---" {
			return (Some(&rest[..offset]), &rest[offset + line.len()..]);
		}
		offset += line.len();
	}

	(None, text)
}

fn parse_front_matter(path: &str, yaml: &str) -> TesselResult<MetaInfo> {
	let value: serde_json::Value = serde_yaml_ng::from_str(yaml).map_err(|e| {
		TesselError::FrontMatter {
			path: path.to_string(),
			reason: e.to_string(),
		}
	})?;

	match value {
		serde_json::Value::Null => Ok(MetaInfo::new()),
		serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
		other => {
			Err(TesselError::FrontMatter {
				path: path.to_string(),
				reason: format!("expected a mapping, found `{other}`"),
			})
		}
	}
}

/// ATX headings of a markdown body, outside fenced code blocks.
fn headings(body: &str) -> Vec<&str> {
	let mut headings = Vec::new();
	let mut in_fence = false;
	for line in body.lines() {
		let trimmed = line.trim_start();
		if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
			in_fence = !in_fence;
			continue;
		}
		if in_fence {
			continue;
		}

		let level = trimmed.chars().take_while(|c| *c == '#').count();
		if !(1..=6).contains(&level) {
			continue;
		}
		let Some(text) = trimmed[level..].strip_prefix(' ') else {
			continue;
		};
		let text = text.trim().trim_end_matches('#').trim();
		if !text.is_empty() {
			headings.push(text);
		}
	}

	headings
}

/// Lowercase `text`, keep alphanumerics and join the rest with `-`.
pub fn slugify(text: &str) -> String {
	let mut slug = String::with_capacity(text.len());
	for c in text.chars() {
		if c.is_alphanumeric() {
			slug.extend(c.to_lowercase());
		} else if !slug.is_empty() && !slug.ends_with('-') {
			slug.push('-');
		}
	}

	slug.trim_end_matches('-').to_string()
}
