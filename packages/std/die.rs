use crate::env::{DEFAULT_EAPI, Environment};
use std::{io::Write, path::PathBuf};

/// A helper failure, as handed to a [`Reporter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
	/// The name of the helper that failed.
	pub helper: String,

	/// The message to report, `"<helper> failed"`.
	pub message: String,

	/// The status the helper is about to exit with.
	pub status: u8,

	/// The caller's working directory.
	pub working_directory: PathBuf,
}

impl Failure {
	#[must_use]
	pub fn new(helper: &str, status: u8, working_directory: PathBuf) -> Self {
		Self {
			helper: helper.to_owned(),
			message: format!("{helper} failed"),
			status,
			working_directory,
		}
	}
}

/// The shared failure channel. Reporting is best effort: implementations must not block and must not fail.
pub trait Reporter {
	fn report(&self, failure: &Failure);
}

impl<R: Reporter + ?Sized> Reporter for &R {
	fn report(&self, failure: &Failure) {
		(**self).report(failure);
	}
}

/// What the failure reporter knows about the running build.
#[derive(Clone, Debug, Default)]
pub struct Context {
	/// `EAPI`.
	pub eapi: String,

	/// Whether `PORTAGE_NONFATAL` is `1`.
	pub nonfatal: bool,

	/// `EBUILD_MASTER_PID`, the process told to abort the build.
	pub master_pid: Option<i32>,

	/// `CATEGORY/PF`, with `::PORTAGE_REPO_NAME` appended when known.
	pub package: Option<String>,

	/// `EBUILD_PHASE`.
	pub phase: Option<String>,

	/// `PORTAGE_LOG_FILE`.
	pub log_file: Option<PathBuf>,
}

impl Context {
	#[must_use]
	pub fn resolve(env: &Environment) -> Self {
		let eapi = env.get_or("EAPI", DEFAULT_EAPI).to_owned();
		let nonfatal = env.get("PORTAGE_NONFATAL") == Some("1");
		let master_pid = env
			.get("EBUILD_MASTER_PID")
			.and_then(|pid| pid.trim().parse::<i32>().ok())
			.filter(|pid| *pid > 0);
		let package = match (env.get("CATEGORY"), env.get("PF")) {
			(Some(category), Some(pf)) => {
				let mut package = format!("{category}/{pf}");
				if let Some(repo) = env.get("PORTAGE_REPO_NAME") {
					package.push_str("::");
					package.push_str(repo);
				}
				Some(package)
			},
			_ => None,
		};
		let phase = env.get("EBUILD_PHASE").map(ToOwned::to_owned);
		let log_file = env.get_os("PORTAGE_LOG_FILE").map(PathBuf::from);
		Self {
			eapi,
			nonfatal,
			master_pid,
			package,
			phase,
			log_file,
		}
	}

	/// Whether a failing helper aborts the build. Helpers die from EAPI 4 on, unless the call is marked nonfatal.
	#[must_use]
	pub fn helpers_can_die(&self) -> bool {
		!self.nonfatal && !eapi_predates_dying_helpers(&self.eapi)
	}
}

fn eapi_predates_dying_helpers(eapi: &str) -> bool {
	// EAPIs 0 through 3 and their prerelease or hdepend variants.
	let base = eapi
		.split(['_', '-'])
		.next()
		.unwrap_or(eapi);
	matches!(base, "0" | "1" | "2" | "3")
}

/// The default reporter. It writes to stderr and, when helpers can die, asks the build master process to abort.
#[derive(Clone, Debug)]
pub struct Die {
	context: Context,
}

impl Die {
	#[must_use]
	pub fn new(context: Context) -> Self {
		Self { context }
	}

	/// Render the report for `failure`.
	#[must_use]
	pub fn render(&self, failure: &Failure) -> String {
		if !self.context.helpers_can_die() {
			return format!("{}\n", failure.message);
		}
		let package = self.context.package.as_deref().unwrap_or("unknown package");
		let phase = self.context.phase.as_deref().unwrap_or("unknown");
		let mut report = format!(" * ERROR: {package} failed ({phase} phase):\n");
		report.push_str(&format!(" *   {}\n", failure.message));
		report.push_str(" * \n");
		if let Some(log_file) = &self.context.log_file {
			report.push_str(&format!(
				" * The complete build log is located at '{}'.\n",
				log_file.display()
			));
		}
		report.push_str(&format!(
			" * Working directory: '{}'\n",
			failure.working_directory.display()
		));
		report.push_str(" * \n");
		report
	}

	fn signal_master(&self) {
		let Some(pid) = self.context.master_pid else {
			tracing::debug!("no build master process to signal");
			return;
		};
		tracing::info!(pid, "signalling the build master process");
		let ret = unsafe { libc::kill(pid, libc::SIGTERM) };
		if ret == -1 {
			let error = std::io::Error::last_os_error();
			tracing::warn!(pid, %error, "failed to signal the build master process");
		}
	}
}

impl Reporter for Die {
	fn report(&self, failure: &Failure) {
		tracing::error!(helper = %failure.helper, status = failure.status, "helper failed");
		let report = self.render(failure);
		let mut stderr = std::io::stderr().lock();
		if let Err(error) = stderr.write_all(report.as_bytes()).and_then(|()| stderr.flush()) {
			tracing::warn!(%error, "failed to write the failure report");
		}
		drop(stderr);
		if self.context.helpers_can_die() {
			self.signal_master();
		}
	}
}
