use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TesselError {
	#[error(transparent)]
	#[diagnostic(code(tessel::io_error))]
	Io(#[from] std::io::Error),

	#[error("the parent path `{parent}` of `{path}` does not exist")]
	#[diagnostic(
		code(tessel::missing_parent),
		help("directory nodes must be created before the nodes inside them; give the directory handler a lower priority bucket")
	)]
	MissingParent { parent: String, path: String },

	#[error("a node already exists at `{0}`")]
	#[diagnostic(
		code(tessel::duplicate_node),
		help("two source paths produced the same output path; rename one of them")
	)]
	DuplicateNode(String),

	#[error("invalid glob pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(tessel::pattern_config),
		help("check the `[sourcehandler]` patterns and ignore list in tessel.toml")
	)]
	PatternConfig { pattern: String, reason: String },

	#[error("failed to render `{}` (referenced from `{}`): {}", .0.node, .0.reference, .0.message)]
	#[diagnostic(code(tessel::render))]
	Render(#[from] RenderError),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(tessel::config_parse),
		help("check that tessel.toml is valid TOML with [output], [[sources]] and [sourcehandler] sections")
	)]
	ConfigParse(String),

	#[error("handler `{handler}` returned the node `{path}` without inserting it")]
	#[diagnostic(
		code(tessel::uninserted_node),
		help("a handler must only return paths of nodes it inserted into the tree")
	)]
	UninsertedNode { handler: String, path: String },

	#[error("unknown source handler: `{0}`")]
	#[diagnostic(
		code(tessel::unknown_handler),
		help("available handlers: directory, copy, template, page")
	)]
	UnknownHandler(String),

	#[error("failed to read source `{path}`: {reason}")]
	#[diagnostic(code(tessel::source_read))]
	SourceRead { path: String, reason: String },

	#[error("invalid front matter in `{path}`: {reason}")]
	#[diagnostic(
		code(tessel::front_matter),
		help("front matter must be a YAML mapping between two `---` lines")
	)]
	FrontMatter { path: String, reason: String },
}

/// A failure to produce the content of a single node.
///
/// Carries the node being written and the path of the node whose content
/// referenced it so that diagnostics can point at both.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RenderError {
	/// The node whose content could not be produced.
	pub node: String,
	/// The node that contained the failing reference. Equal to `node` when
	/// the failure is not caused by a reference.
	pub reference: String,
	/// Human readable description of the failure.
	pub message: String,
}

impl RenderError {
	pub fn new(
		node: impl Into<String>,
		reference: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			node: node.into(),
			reference: reference.into(),
			message: message.into(),
		}
	}
}

pub type TesselResult<T> = Result<T, TesselError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
