use crate::{die, jobs};
use std::{
	collections::BTreeMap,
	ffi::{OsStr, OsString},
	path::PathBuf,
};

/// The default directory holding the helper executables and work scripts.
pub const DEFAULT_BIN_PATH: &str = "/usr/lib/portage/bin";

/// The default directory holding the package manager's Python modules.
pub const DEFAULT_PYM_PATH: &str = "/usr/lib/portage/pym";

/// The default Python interpreter.
pub const DEFAULT_PYTHON: &str = "/usr/bin/python";

/// The default make program.
pub const DEFAULT_MAKE: &str = "make";

/// The default EAPI when none is set.
pub const DEFAULT_EAPI: &str = "0";

/// The variable the caller's working directory is exported in for the delegate.
pub const HELPER_CWD_VAR: &str = "__PORTAGE_HELPER_CWD";

/// A snapshot of the process environment, read once when a helper starts.
#[derive(Clone, Debug, Default)]
pub struct Environment {
	vars: BTreeMap<String, OsString>,
}

impl Environment {
	/// Capture the current process environment. Values are kept as they are; only variables whose name is not valid UTF-8 are skipped.
	#[must_use]
	pub fn capture() -> Self {
		Self::from_os_vars(std::env::vars_os())
	}

	fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
		let vars = vars
			.into_iter()
			.filter_map(|(name, value)| Some((name.into_string().ok()?, value)))
			.collect();
		Self { vars }
	}

	/// Create a snapshot from explicit name/value pairs.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<OsString>,
	{
		let vars = vars
			.into_iter()
			.map(|(name, value)| (name.into(), value.into()))
			.collect();
		Self { vars }
	}

	/// Get a variable. Empty values are treated as unset.
	#[must_use]
	pub fn get_os(&self, name: &str) -> Option<&OsStr> {
		self.vars
			.get(name)
			.map(OsString::as_os_str)
			.filter(|value| !value.is_empty())
	}

	/// Get a variable as text. Empty values and values that are not valid UTF-8 are treated as unset.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&str> {
		self.get_os(name).and_then(OsStr::to_str)
	}

	/// Get a path-valued variable, or `default` when it is unset or empty.
	#[must_use]
	pub fn path_or(&self, name: &str, default: &str) -> PathBuf {
		PathBuf::from(self.get_os(name).unwrap_or(OsStr::new(default)))
	}

	/// Get a variable, or `default` when it is unset or empty.
	#[must_use]
	pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
		self.get(name).unwrap_or(default)
	}

	/// Get a variable split into words the way an unquoted shell expansion would be.
	#[must_use]
	pub fn words(&self, name: &str) -> Option<Vec<String>> {
		self.get(name).map(split_words)
	}
}

fn split_words(value: &str) -> Vec<String> {
	value.split_whitespace().map(ToOwned::to_owned).collect()
}

/// The helper configuration, resolved from an [`Environment`].
#[derive(Clone, Debug)]
pub struct Config {
	/// `PORTAGE_BIN_PATH`.
	pub bin_path: PathBuf,

	/// `PORTAGE_PYM_PATH`.
	pub pym_path: PathBuf,

	/// `PORTAGE_PYTHON`.
	pub python: PathBuf,

	/// The entry put at the front of `PYTHONPATH`. From `PORTAGE_PYTHONPATH`, defaulting to the pym path.
	pub python_path_prefix: OsString,

	/// The inherited `PYTHONPATH`, if any.
	pub inherited_python_path: Option<OsString>,

	/// Whether `PORTAGE_QUIET` is `1`.
	pub quiet: bool,

	/// `MAKE`, split into words.
	pub make: Vec<String>,

	/// `MAKEOPTS`, split into words. Defaults to a job count suited to the host.
	pub makeopts: Vec<String>,

	/// `EXTRA_EMAKE`, split into words.
	pub extra_emake: Vec<String>,

	/// What the failure reporter needs to know about the running build.
	pub die: die::Context,
}

impl Config {
	/// Resolve the configuration. This never fails; every variable has a default.
	#[must_use]
	pub fn resolve(env: &Environment) -> Self {
		let bin_path = env.path_or("PORTAGE_BIN_PATH", DEFAULT_BIN_PATH);
		let pym_path = env.path_or("PORTAGE_PYM_PATH", DEFAULT_PYM_PATH);
		let python = env.path_or("PORTAGE_PYTHON", DEFAULT_PYTHON);
		let python_path_prefix = env
			.get_os("PORTAGE_PYTHONPATH")
			.unwrap_or(pym_path.as_os_str())
			.to_owned();
		let inherited_python_path = env.get_os("PYTHONPATH").map(ToOwned::to_owned);
		let quiet = env.get("PORTAGE_QUIET") == Some("1");
		let make = env
			.words("MAKE")
			.filter(|words| !words.is_empty())
			.unwrap_or_else(|| vec![DEFAULT_MAKE.to_owned()]);
		let makeopts = env
			.words("MAKEOPTS")
			.unwrap_or_else(|| split_words(&jobs::default_makeopts()));
		let extra_emake = env.words("EXTRA_EMAKE").unwrap_or_default();
		let die = die::Context::resolve(env);
		Self {
			bin_path,
			pym_path,
			python,
			python_path_prefix,
			inherited_python_path,
			quiet,
			make,
			makeopts,
			extra_emake,
			die,
		}
	}

	/// The `PYTHONPATH` to give an interpreter-backed delegate. The prefix comes first and the inherited entries are kept after it.
	#[must_use]
	pub fn python_path(&self) -> OsString {
		let mut python_path = self.python_path_prefix.clone();
		if let Some(inherited) = &self.inherited_python_path {
			python_path.push(":");
			python_path.push(inherited);
		}
		python_path
	}

	/// The path of a work script in the bin path.
	#[must_use]
	pub fn script(&self, name: &str) -> PathBuf {
		self.bin_path.join(name)
	}

	/// The full make command line: the make program, its options, the extra flags, then `args`.
	#[must_use]
	pub fn make_command(&self, args: &[OsString]) -> Vec<OsString> {
		self.make
			.iter()
			.chain(&self.makeopts)
			.chain(&self.extra_emake)
			.map(OsString::from)
			.chain(args.iter().cloned())
			.collect()
	}
}
