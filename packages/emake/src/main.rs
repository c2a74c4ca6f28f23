use ebuild_helpers_std::{Delegate, env::DEFAULT_MAKE, quote};

fn main() -> std::process::ExitCode {
	ebuild_helpers_std::run("emake", |config, args| {
		let command = config.make_command(&args);
		#[cfg(feature = "tracing")]
		tracing::debug!(
			jobs = ebuild_helpers_std::jobs::makeopts_jobs(&config.makeopts),
			"composed the make command"
		);

		// Echo the command line unless quiet.
		quote::echo(&mut std::io::stderr().lock(), &command, config.quiet);

		let mut command = command.into_iter();
		let program = command.next().unwrap_or_else(|| DEFAULT_MAKE.into());
		Delegate::new(program).args(command)
	})
}
