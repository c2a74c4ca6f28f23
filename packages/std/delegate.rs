use crate::{
	Error, Result,
	die::{Failure, Reporter},
	env::HELPER_CWD_VAR,
};
use std::{
	ffi::{OsStr, OsString},
	os::unix::{fs::MetadataExt as _, process::ExitStatusExt as _},
	path::{Path, PathBuf},
};

/// An exit status in `0..=255`. Zero is success; every other value is relayed as is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Status(u8);

impl Status {
	pub const SUCCESS: Self = Self(0);

	/// The status a shell reports for a command it cannot find.
	pub const NOT_FOUND: Self = Self(127);

	/// The status a shell reports for a command it found but cannot run.
	pub const NOT_EXECUTABLE: Self = Self(126);

	#[must_use]
	pub fn new(code: u8) -> Self {
		Self(code)
	}

	#[must_use]
	pub fn code(self) -> u8 {
		self.0
	}

	#[must_use]
	pub fn success(self) -> bool {
		self.0 == 0
	}

	/// The status for a delegate that could not be spawned.
	#[must_use]
	pub fn from_spawn_error(error: &std::io::Error) -> Self {
		if error.kind() == std::io::ErrorKind::NotFound {
			Self::NOT_FOUND
		} else {
			Self::NOT_EXECUTABLE
		}
	}
}

impl From<std::process::ExitStatus> for Status {
	fn from(status: std::process::ExitStatus) -> Self {
		// A process killed by a signal reports 128 plus the signal number, as a shell does.
		let code = status
			.code()
			.or_else(|| status.signal().map(|signal| 128 + signal))
			.unwrap_or(1);
		Self(u8::try_from(code & 0xff).unwrap_or(1))
	}
}

impl From<Status> for std::process::ExitCode {
	fn from(status: Status) -> Self {
		std::process::ExitCode::from(status.0)
	}
}

impl std::fmt::Display for Status {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A saved working directory. The directory is restored by [`WorkingDirectory::restore`], or on drop if that was never called.
#[derive(Debug)]
pub struct WorkingDirectory {
	original: PathBuf,
	armed: bool,
}

impl WorkingDirectory {
	/// Save the current working directory. The caller's logical `PWD` is kept when it names the current directory, so symlinked paths are reported as the caller sees them.
	pub fn save() -> Result<Self> {
		let physical = std::env::current_dir().map_err(Error::CurrentDirectory)?;
		let original = logical_directory(physical, std::env::var_os("PWD"));
		Ok(Self {
			original,
			armed: true,
		})
	}

	/// The directory that will be restored.
	#[must_use]
	pub fn original(&self) -> &Path {
		&self.original
	}

	/// Change the working directory to `path` until the guard is restored.
	pub fn change_to(&mut self, path: &Path) -> Result<()> {
		tracing::debug!(path = %path.display(), "changing the working directory");
		std::env::set_current_dir(path).map_err(|source| Error::ChangeDirectory {
			path: path.to_owned(),
			source,
		})
	}

	/// Restore the saved working directory.
	pub fn restore(mut self) -> Result<()> {
		self.armed = false;
		Self::restore_to(&self.original)
	}

	fn restore_to(original: &Path) -> Result<()> {
		tracing::debug!(path = %original.display(), "restoring the working directory");
		std::env::set_current_dir(original).map_err(|source| Error::RestoreDirectory {
			path: original.to_owned(),
			source,
		})
	}
}

/// Choose `pwd` over `physical` when it is absolute and refers to the same directory.
fn logical_directory(physical: PathBuf, pwd: Option<OsString>) -> PathBuf {
	let Some(pwd) = pwd.map(PathBuf::from).filter(|pwd| pwd.is_absolute()) else {
		return physical;
	};
	match (std::fs::metadata(&pwd), std::fs::metadata(&physical)) {
		(Ok(logical), Ok(actual)) if logical.dev() == actual.dev() && logical.ino() == actual.ino() => pwd,
		_ => physical,
	}
}

impl Drop for WorkingDirectory {
	fn drop(&mut self) {
		if self.armed {
			if let Err(error) = Self::restore_to(&self.original) {
				tracing::error!(%error, "failed to restore the working directory");
			}
		}
	}
}

/// An external tool or interpreter a helper hands its work to.
#[derive(Clone, Debug)]
pub struct Delegate {
	program: PathBuf,
	leading_args: Vec<OsString>,
	args: Vec<OsString>,
	env: Vec<(OsString, OsString)>,
	working_directory: Option<PathBuf>,
}

impl Delegate {
	pub fn new(program: impl Into<PathBuf>) -> Self {
		Self {
			program: program.into(),
			leading_args: Vec::new(),
			args: Vec::new(),
			env: Vec::new(),
			working_directory: None,
		}
	}

	/// Add a fixed argument that comes before the helper's own arguments, such as the path of a work script.
	#[must_use]
	pub fn leading_arg(mut self, arg: impl AsRef<OsStr>) -> Self {
		self.leading_args.push(arg.as_ref().to_owned());
		self
	}

	/// Set the helper's own arguments. They are passed through unchanged.
	#[must_use]
	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		self.args = args.into_iter().map(|arg| arg.as_ref().to_owned()).collect();
		self
	}

	/// Set a variable in the delegate's environment. The helper's own environment is left alone.
	#[must_use]
	pub fn env(mut self, name: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
		self.env
			.push((name.as_ref().to_owned(), value.as_ref().to_owned()));
		self
	}

	/// Run the delegate from `path` instead of the caller's working directory.
	#[must_use]
	pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
		self.working_directory = Some(path.into());
		self
	}

	#[must_use]
	pub fn program(&self) -> &Path {
		&self.program
	}

	/// The full argument vector, leading arguments first.
	pub fn argv(&self) -> impl Iterator<Item = &OsStr> {
		self.leading_args
			.iter()
			.chain(&self.args)
			.map(OsString::as_os_str)
	}

	fn command(&self, original: &Path) -> std::process::Command {
		let mut command = std::process::Command::new(&self.program);
		command.args(self.argv());
		command.envs(self.env.iter().map(|(name, value)| (name, value)));
		command.env(HELPER_CWD_VAR, original);
		command
	}
}

/// The record of one helper invocation.
#[derive(Clone, Debug)]
pub struct Invocation {
	/// The caller's working directory, saved before and restored after the delegate ran.
	pub working_directory: PathBuf,

	/// The helper's own arguments.
	pub args: Vec<OsString>,

	/// The delegate's status.
	pub status: Status,
}

/// Run `delegate` on behalf of `helper` and relay its status.
///
/// The caller's working directory is saved first and restored as soon as the delegate returns, before anything is reported. A nonzero status is reported to `reporter` exactly once. The only error is failing to read the working directory at entry.
pub fn run_and_relay(helper: &str, delegate: &Delegate, reporter: &dyn Reporter) -> Result<Invocation> {
	// Save the working directory.
	let mut cwd = WorkingDirectory::save()?;
	let original = cwd.original().to_owned();
	tracing::debug!(%helper, original = %original.display(), "saved the working directory");

	// Enter the directory the delegate expects. If that fails, run from the caller's directory.
	if let Some(path) = &delegate.working_directory {
		if let Err(error) = cwd.change_to(path) {
			tracing::warn!(%error, "running the delegate from the caller's directory");
			eprintln!("{helper}: {}", error_chain(&error));
		}
	}

	// Run the delegate and wait for it.
	tracing::info!(program = %delegate.program.display(), args = ?delegate.argv().collect::<Vec<_>>(), "running the delegate");
	let status = match delegate.command(&original).status() {
		Ok(status) => Status::from(status),
		Err(error) => {
			eprintln!("{helper}: {}: {error}", delegate.program.display());
			Status::from_spawn_error(&error)
		},
	};
	tracing::info!(%status, "the delegate exited");

	// Restore the working directory before reporting anything.
	if let Err(error) = cwd.restore() {
		eprintln!("{helper}: {}", error_chain(&error));
	}

	// Report a failure.
	if !status.success() {
		reporter.report(&Failure::new(helper, status.code(), original.clone()));
	}

	Ok(Invocation {
		working_directory: original,
		args: delegate.args.clone(),
		status,
	})
}

/// Render an error followed by its sources.
#[must_use]
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
	let mut message = error.to_string();
	let mut source = error.source();
	while let Some(error) = source {
		message.push_str(": ");
		message.push_str(&error.to_string());
		source = error.source();
	}
	message
}
