use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use owo_colors::OwoColorize;
use tessel_cli::Commands;
use tessel_cli::TesselCli;
use tessel_core::BuildState;
use tessel_core::CONFIG_FILE_CANDIDATES;
use tessel_core::CycleReport;
use tessel_core::Site;
use tessel_core::TesselConfig;
use tracing_subscriber::EnvFilter;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = TesselCli::parse();

	// Respect NO_COLOR env var, --no-color flag and terminals without color.
	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stdout).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match args.command {
		Some(Commands::Init) => run_init(&args),
		Some(Commands::Build { watch }) => run_build(&args, watch),
		Some(Commands::List) => run_list(&args),
		Some(Commands::Clean) => run_clean(&args),
		None => {
			eprintln!("No subcommand specified. Run `tessel --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<tessel_core::TesselError>() {
			Ok(tessel_err) => {
				let report: miette::Report = (*tessel_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `RUST_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let filter = if std::env::var_os("RUST_LOG").is_some() {
		EnvFilter::from_default_env()
	} else if verbose {
		EnvFilter::new("warn,tessel_core=debug")
	} else {
		EnvFilter::new("warn")
	};

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.try_init()
		.ok();
}

fn resolve_root(args: &TesselCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn run_init(args: &TesselCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let config_path = root.join(CONFIG_FILE_CANDIDATES[0]);
	let page_path = root.join("src").join("index.page");

	let page_exists = page_path.exists();

	if let Some(existing) = TesselConfig::resolve_path(&root) {
		println!("Config file already exists: {}", existing.display());
	} else {
		let sample_config = "# tessel configuration\n\n[[sources]]\nmount = \"/\"\npath = \
		                     \"src\"\nglob = \"**/*\"\n\n[output]\npath = \"out\"\n\n# Handler \
		                     patterns and priorities default to the built-in table.\n# \
		                     [sourcehandler.patterns]\n# page = [\"**/*.page\"]\n\n# \
		                     [sourcehandler.default_meta_info.page]\n# in_menu = true\n";

		std::fs::write(&config_path, sample_config)?;
		println!("Created {}", CONFIG_FILE_CANDIDATES[0]);
	}

	if page_exists {
		println!("Page already exists: {}", page_path.display());
	} else {
		if let Some(parent) = page_path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let sample_page = "---\ntitle: Hello\n---\n# {{ meta.title }}\n\nWelcome to your tessel \
		                   site.\n";

		std::fs::write(&page_path, sample_page)?;
		println!("Created page: {}", page_path.display());
	}

	if !page_exists {
		println!();
		println!("Next steps:");
		println!("  1. Edit {} or add more pages", page_path.display());
		println!("  2. Run `tessel build` to render the site");
	}

	Ok(())
}

fn run_build(args: &TesselCli, watch: bool) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let mut site = Site::open(&root)?;

	// Run the initial build.
	let failed = run_build_once(args, &mut site)?;

	if !watch {
		if failed {
			process::exit(1);
		}
		return Ok(());
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_)
						| notify::EventKind::Create(_)
						| notify::EventKind::Remove(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	// Only the source directories are watched so that writing the output
	// does not trigger another build.
	for directory in source_directories(&root, site.config()) {
		watcher.watch(&directory, notify::RecursiveMode::Recursive)?;
	}

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, rebuilding...");
		if let Err(e) = run_build_once(args, &mut site) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

fn source_directories(root: &Path, config: &TesselConfig) -> Vec<PathBuf> {
	let mut directories: Vec<PathBuf> = config
		.sources
		.iter()
		.map(|source| root.join(&source.path))
		.filter(|path| path.is_dir())
		.collect();
	directories.sort();
	directories.dedup();
	directories
}

/// Run a single build and return whether any node failed to render.
fn run_build_once(args: &TesselCli, site: &mut Site) -> Result<bool, Box<dyn std::error::Error>> {
	let report = site.render()?;
	print_build_report(args, &report);

	Ok(report.has_errors())
}

fn print_build_report(args: &TesselCli, report: &CycleReport) {
	let write = &report.write;

	if report.is_noop() && !report.has_errors() {
		println!("Nothing to do, the output is up to date.");
		return;
	}

	if !write.written.is_empty() {
		println!(
			"{} {} file(s).",
			colored!("Wrote", green),
			write.written.len()
		);
	}
	if !write.removed.is_empty() {
		println!(
			"{} {} file(s).",
			colored!("Removed", yellow),
			write.removed.len()
		);
	}

	if args.verbose {
		for path in &write.written {
			println!("  + {path}");
		}
		for path in &write.removed {
			println!("  - {path}");
		}
	}

	if report.has_errors() {
		eprintln!(
			"\n{} {} node(s) failed to render:",
			colored!("error:", red),
			write.render_errors.len()
		);
		for error in &write.render_errors {
			if error.node == error.reference {
				eprintln!("  {}: {}", error.node, error.message);
			} else {
				eprintln!("  {} (in {}): {}", error.node, error.reference, error.message);
			}
		}
	}
}

fn run_list(args: &TesselCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	let Some(state) = BuildState::load(&root) else {
		println!("No build state found. Run `tessel build` first.");
		return Ok(());
	};

	if state.tree.is_empty() {
		println!("The output tree is empty.");
		return Ok(());
	}

	println!("{}", colored!("Nodes:", bold));
	for node in state.tree.nodes().filter(|node| !node.is_root()) {
		let mut flags = Vec::new();
		if node.dirty {
			flags.push("dirty");
		}
		if node.created {
			flags.push("created");
		}
		let flags = if flags.is_empty() {
			String::new()
		} else {
			format!(" [{}]", flags.join(", "))
		};

		println!(
			"  {} ({}, {}) <- {}{flags}",
			node.path(),
			node.kind(),
			node.handler(),
			node.src()
		);
	}

	println!("\n{} node(s)", state.tree.len());

	Ok(())
}

fn run_clean(args: &TesselCli) -> Result<(), Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	if BuildState::remove(&root)? {
		println!("Removed {}", BuildState::cache_path(&root).display());
	} else {
		println!("No build state to remove.");
	}

	Ok(())
}
