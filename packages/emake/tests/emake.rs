use std::{
	os::unix::process::CommandExt as _,
	path::{Path, PathBuf},
	process::{Command, Output},
};

// A stand-in for make that records its arguments one per line and exits with `STUB_EXIT`.
const STUB: &str = r#"for arg in "$@"; do printf '%s\n' "$arg"; done > "$STUB_LOG"
exit "${STUB_EXIT:-0}"
"#;

struct Fixture {
	temp: tempfile::TempDir,
}

impl Fixture {
	fn new() -> Self {
		let temp = tempfile::tempdir().unwrap();
		std::fs::write(temp.path().join("make.sh"), STUB).unwrap();
		Self { temp }
	}

	fn path(&self) -> PathBuf {
		self.temp.path().canonicalize().unwrap()
	}

	fn make(&self) -> String {
		format!("/bin/sh {}", self.path().join("make.sh").display())
	}

	fn log(&self) -> PathBuf {
		self.path().join("make.log")
	}

	fn command(&self, args: &[&str]) -> Command {
		let mut command = Command::new(env!("CARGO_BIN_EXE_emake"));
		command
			.env_clear()
			.env("MAKE", self.make())
			.env("STUB_LOG", self.log())
			.current_dir(self.path())
			.args(args);
		command
	}

	fn recorded_args(&self) -> Vec<String> {
		std::fs::read_to_string(self.log())
			.unwrap()
			.lines()
			.map(ToOwned::to_owned)
			.collect()
	}
}

fn stderr(output: &Output) -> String {
	String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn success_echoes_and_passes_arguments_through() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&["install", "DESTDIR=/tmp/a b"])
		.env("MAKEOPTS", "-j3 -l4")
		.env("EXTRA_EMAKE", "V=1")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(0));
	assert_eq!(
		stderr(&output),
		format!("{} -j3 -l4 V=1 install 'DESTDIR=/tmp/a b' \n", fixture.make())
	);
	assert_eq!(
		fixture.recorded_args(),
		["-j3", "-l4", "V=1", "install", "DESTDIR=/tmp/a b"]
	);
}

#[test]
fn quiet_mode_suppresses_the_echo() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&["all"])
		.env("MAKEOPTS", "-j2")
		.env("PORTAGE_QUIET", "1")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(0));
	assert!(stderr(&output).is_empty(), "{}", stderr(&output));
	assert_eq!(fixture.recorded_args(), ["-j2", "all"]);
}

#[test]
fn only_one_means_quiet() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&["all"])
		.env("MAKEOPTS", "-j2")
		.env("PORTAGE_QUIET", "0")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(0));
	assert_eq!(stderr(&output), format!("{} -j2 all \n", fixture.make()));
}

#[test]
fn unset_makeopts_uses_a_job_count_for_the_host() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&[])
		.env("PORTAGE_QUIET", "1")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(0));
	let args = fixture.recorded_args();
	assert_eq!(args.len(), 1);
	assert!(args[0].starts_with("-j"), "{args:?}");
}

#[test]
fn failure_relays_the_status_and_reports_once() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&["check"])
		.env("PORTAGE_QUIET", "1")
		.env("STUB_EXIT", "2")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(2));
	assert_eq!(stderr(&output), "emake failed\n");
}

#[test]
fn the_report_names_the_helper_as_invoked() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&[])
		.arg0("gmake-wrapper")
		.env("PORTAGE_QUIET", "1")
		.env("STUB_EXIT", "1")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(1));
	assert_eq!(stderr(&output), "gmake-wrapper failed\n");
}

#[test]
fn fatal_failures_print_the_die_banner() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&[])
		.env("PORTAGE_QUIET", "1")
		.env("STUB_EXIT", "1")
		.env("EAPI", "5")
		.env("CATEGORY", "dev-libs")
		.env("PF", "foo-1.2")
		.env("EBUILD_PHASE", "compile")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(1));
	let stderr = stderr(&output);
	assert!(stderr.contains(" * ERROR: dev-libs/foo-1.2 failed (compile phase):\n"), "{stderr}");
	assert!(stderr.contains(" *   emake failed\n"), "{stderr}");
	let directory = format!(" * Working directory: '{}'\n", fixture.path().display());
	assert!(stderr.contains(&directory), "{stderr}");
}

#[test]
fn a_missing_make_exits_127() {
	let fixture = Fixture::new();
	let output = fixture
		.command(&[])
		.env("MAKE", "/nonexistent/bin/make")
		.env("PORTAGE_QUIET", "1")
		.output()
		.unwrap();
	assert_eq!(output.status.code(), Some(127));
	assert!(stderr(&output).ends_with("emake failed\n"), "{}", stderr(&output));
	assert!(!Path::new(&fixture.log()).exists());
}
