mod common;

use predicates::prelude::PredicateBooleanExt;
use tessel_core::AnyEmptyResult;
use tessel_core::BuildState;

fn sample_site(root: &std::path::Path) -> std::io::Result<()> {
	common::write_file(root, "src/default.template", "<html>{{ content }}</html>\n")?;
	common::write_file(
		root,
		"src/index.page",
		"---\ntitle: Home\ntemplate: default.template\n---\n<h1>{{ meta.title }}</h1>\n<a \
		 href=\"{{ relocatable('docs/intro.page') }}\">Intro</a>",
	)?;
	common::write_file(
		root,
		"src/docs/intro.page",
		"---\ntemplate: ../default.template\n---\n<a href=\"{{ relocatable('/css/site.css') \
		 }}\">style</a>",
	)?;
	common::write_file(root, "src/css/site.css", "body {}\n")
}

#[test]
fn build_renders_site() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_site(tmp.path())?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote"));

	let out = tmp.path().join("out");
	assert_eq!(
		std::fs::read_to_string(out.join("index.html"))?,
		"<html><h1>Home</h1>\n<a href=\"docs/intro.html\">Intro</a></html>\n"
	);
	assert_eq!(
		std::fs::read_to_string(out.join("docs").join("intro.html"))?,
		"<html><a href=\"../css/site.css\">style</a></html>\n"
	);
	assert_eq!(
		std::fs::read_to_string(out.join("css").join("site.css"))?,
		"body {}\n"
	);
	assert!(!out.join("default.template").exists());
	assert!(BuildState::cache_path(tmp.path()).is_file());

	Ok(())
}

#[test]
fn second_build_is_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_site(tmp.path())?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();
	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("up to date"));

	Ok(())
}

#[test]
fn build_removes_outputs_of_deleted_sources() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	sample_site(tmp.path())?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	std::fs::remove_file(tmp.path().join("src").join("css").join("site.css"))?;

	common::tessel_cmd()
		.arg("build")
		.arg("--verbose")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Removed 1 file(s)."))
		.stdout(predicates::str::contains("- /css/site.css"));

	assert!(!tmp.path().join("out").join("css").join("site.css").exists());

	Ok(())
}

#[test]
fn build_fails_when_a_node_cannot_render() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"src/index.page",
		"---\ntemplate: missing.template\n---\nHello",
	)?;
	common::write_file(tmp.path(), "src/about.page", "About")?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("failed to render"))
		.stderr(predicates::str::contains("/index.html"));

	// Other nodes are still written.
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("out").join("about.html"))?,
		"About"
	);

	Ok(())
}

#[test]
fn build_reports_invalid_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tessel.toml", "[sourcehandler.invoke]\nfirst = [\"page\"]\n")?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("bucket").and(predicates::str::contains("`first`")));

	Ok(())
}

#[test]
fn build_reports_unknown_handler() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(tmp.path(), "tessel.toml", "[sourcehandler.invoke]\n3 = [\"markdown\"]\n")?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unknown source handler"));

	Ok(())
}

#[test]
fn build_reads_mounted_sources() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_file(
		tmp.path(),
		"tessel.toml",
		"[[sources]]\npath = \"src\"\n\n[[sources]]\nmount = \"/blog/\"\npath = \
		 \"posts\"\n\n[output]\npath = \"public\"\n",
	)?;
	common::write_file(tmp.path(), "src/index.page", "Home")?;
	common::write_file(tmp.path(), "posts/first.page", "First post")?;

	common::tessel_cmd()
		.arg("build")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	assert_eq!(
		std::fs::read_to_string(tmp.path().join("public").join("index.html"))?,
		"Home"
	);
	assert_eq!(
		std::fs::read_to_string(tmp.path().join("public").join("blog").join("first.html"))?,
		"First post"
	);

	Ok(())
}
