use std::{
	ffi::{OsStr, OsString},
	path::Path,
	process::ExitCode,
};

pub mod delegate;
pub mod die;
pub mod env;
pub mod error;
pub mod jobs;
pub mod quote;

#[cfg(feature = "subscriber")]
pub mod tracing;

pub use delegate::{Delegate, Invocation, Status, WorkingDirectory};
pub use die::{Die, Failure, Reporter};
pub use env::{Config, Environment};
pub use error::{Error, Result};

/// The name of the environment variable that enables helper tracing.
pub const TRACING_VAR: &str = "EBUILD_HELPER_TRACING";

/// Get the name a helper was invoked as. This is the basename of `argv[0]`, falling back to the running executable's file name, then to `fallback`.
#[must_use]
pub fn helper_name(arg0: Option<&OsStr>, fallback: &str) -> String {
	let from_path = |path: &Path| {
		path.file_name()
			.and_then(OsStr::to_str)
			.filter(|name| !name.is_empty())
			.map(ToOwned::to_owned)
	};
	arg0.map(Path::new)
		.and_then(from_path)
		.or_else(|| {
			std::env::current_exe()
				.ok()
				.and_then(|path| from_path(&path))
		})
		.unwrap_or_else(|| fallback.to_owned())
}

/// Run a helper. Resolve the environment once, build the delegate from the configuration and the helper's arguments, then run it and relay its status.
pub fn run(fallback_name: &str, build: impl FnOnce(&Config, Vec<OsString>) -> Delegate) -> ExitCode {
	let env = Environment::capture();

	// Setup tracing.
	#[cfg(feature = "subscriber")]
	tracing::setup(&env);

	let mut args = std::env::args_os();
	let helper = helper_name(args.next().as_deref(), fallback_name);
	let config = Config::resolve(&env);
	::tracing::debug!(%helper, ?config, "resolved the configuration");

	let tool = build(&config, args.collect());
	let reporter = Die::new(config.die.clone());
	match delegate::run_and_relay(&helper, &tool, &reporter) {
		Ok(invocation) => invocation.status.into(),
		Err(error) => {
			eprintln!("{helper} failed: {}", delegate::error_chain(&error));
			ExitCode::from(Error::EXIT_CODE)
		},
	}
}
