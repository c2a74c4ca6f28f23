use itertools::Itertools as _;
use std::{ffi::OsStr, io::Write};

/// Quote an argument for display. Arguments containing whitespace are wrapped in single quotes; all others are left bare.
#[must_use]
pub fn quote(arg: &str) -> String {
	if arg.contains(char::is_whitespace) {
		format!("'{arg}'")
	} else {
		arg.to_owned()
	}
}

/// Render a command line for display. Each argument is followed by a single space and the line ends with a newline.
#[must_use]
pub fn command_line(args: &[impl AsRef<OsStr>]) -> String {
	let line = args
		.iter()
		.map(|arg| quote(&arg.as_ref().to_string_lossy()))
		.format_with("", |arg, f| {
			f(&arg)?;
			f(&' ')
		});
	format!("{line}\n")
}

/// Write a command line to `writer` unless `quiet` is set. Write errors are ignored; the echo is diagnostic only.
pub fn echo(writer: &mut impl Write, args: &[impl AsRef<OsStr>], quiet: bool) {
	if quiet {
		return;
	}
	let line = command_line(args);
	if let Err(error) = writer.write_all(line.as_bytes()).and_then(|()| writer.flush()) {
		tracing::warn!(%error, "failed to echo the command line");
	}
}

#[cfg(test)]
mod tests {
	use super::{command_line, echo, quote};

	fn args(args: &[&str]) -> Vec<String> {
		args.iter().map(ToString::to_string).collect()
	}

	#[test]
	fn quote_only_wraps_arguments_with_whitespace() {
		assert_eq!(quote("foo"), "foo");
		assert_eq!(quote("bar baz"), "'bar baz'");
		assert_eq!(quote("CFLAGS=-O2\t-pipe"), "'CFLAGS=-O2\t-pipe'");
		assert_eq!(quote(""), "");
	}

	#[test]
	fn command_line_has_a_trailing_space_and_newline() {
		assert_eq!(command_line(&args(&["foo", "bar baz"])), "foo 'bar baz' \n");
		assert_eq!(command_line(&args(&["make", "-j4"])), "make -j4 \n");
		let empty: [String; 0] = [];
		assert_eq!(command_line(&empty), "\n");
	}

	#[test]
	fn echo_respects_quiet() {
		let mut out = Vec::new();
		echo(&mut out, &args(&["foo", "bar baz"]), false);
		assert_eq!(out, b"foo 'bar baz' \n");

		let mut out = Vec::new();
		echo(&mut out, &args(&["foo", "bar baz"]), true);
		assert!(out.is_empty());
	}
}
