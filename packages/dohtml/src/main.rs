use ebuild_helpers_std::Delegate;

/// The work script that installs the HTML documentation.
const SCRIPT: &str = "dohtml.py";

fn main() -> std::process::ExitCode {
	ebuild_helpers_std::run("dohtml", |config, args| {
		// Run the work script from the pym directory so it imports the package manager's own modules, with the pym path ahead of any inherited Python path.
		let script = config.script(SCRIPT);
		#[cfg(feature = "tracing")]
		tracing::debug!(script = %script.display(), python = %config.python.display(), "delegating to the work script");
		Delegate::new(&config.python)
			.leading_arg(script)
			.args(args)
			.env("PYTHONPATH", config.python_path())
			.working_directory(&config.pym_path)
	})
}
