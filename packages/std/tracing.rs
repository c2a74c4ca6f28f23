use crate::env::Environment;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Install a stderr subscriber if the environment asks for helper tracing.
///
/// The value of [`crate::TRACING_VAR`] is a target filter such as `debug` or `ebuild_helpers_std=trace`. Nothing is installed when it is unset or does not parse, so helpers stay silent by default.
pub fn setup(env: &Environment) {
	let Some(filter) = env.get(crate::TRACING_VAR) else {
		return;
	};
	let Ok(targets) = filter.parse::<tracing_subscriber::filter::Targets>() else {
		eprintln!("ignoring invalid {}: {filter:?}", crate::TRACING_VAR);
		return;
	};
	let format_layer = tracing_subscriber::fmt::layer()
		.compact()
		.with_ansi(false)
		.with_target(false)
		.with_writer(std::io::stderr);
	let registry = tracing_subscriber::registry()
		.with(targets)
		.with(format_layer);
	if registry.try_init().is_err() {
		eprintln!("a tracing subscriber is already installed");
	}
}
