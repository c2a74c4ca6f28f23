use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by a helper itself, as opposed to a failing delegate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to get the current working directory")]
	CurrentDirectory(#[source] std::io::Error),

	#[error("failed to change the working directory to {}", path.display())]
	ChangeDirectory {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to restore the working directory to {}", path.display())]
	RestoreDirectory {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

impl Error {
	/// The status a helper exits with when it fails on its own.
	pub const EXIT_CODE: u8 = 1;
}
