use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Build a static site incrementally from a tree of source files.",
	long_about = "tessel keeps a tree of output nodes in step with your source directory and \
	              only rebuilds what changed since the previous run.\n\nQuick start:\n  tessel \
	              init   Create a sample project\n  tessel build  Render the site into the \
	              output directory\n  tessel list   Show every node of the output tree\n  tessel \
	              clean  Forget the cached build state"
)]
pub struct TesselCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Initialize tessel in a project by creating a sample config and page.
	///
	/// Creates `tessel.toml` and `src/index.page` in the project root. Files
	/// that already exist are left untouched.
	Init,
	/// Render the site.
	///
	/// Reconciles the output tree with the source directories from
	/// `tessel.toml` and writes every node that changed. The tree is cached
	/// under `.tessel/cache/` so the next build only touches what changed
	/// in between. Exits with a non-zero status code if any node failed to
	/// render.
	Build {
		/// Watch the source directories and rebuild whenever a file is
		/// created, modified or removed.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
	/// List every node of the cached output tree.
	///
	/// Shows the node path, its kind, the handler that created it and the
	/// source path it was produced from.
	List,
	/// Remove the cached build state so the next build starts from scratch.
	Clean,
}
