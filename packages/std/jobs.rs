/// The job count reported for a `-j` with no limit.
pub const UNLIMITED_JOBS: usize = 999;

/// The number of make jobs suited to the host: one more than the available parallelism.
#[must_use]
pub fn host_jobs() -> usize {
	std::thread::available_parallelism().map_or(1, |n| n.get() + 1)
}

/// The make options used when `MAKEOPTS` is not set.
#[must_use]
pub fn default_makeopts() -> String {
	format!("-j{}", host_jobs())
}

/// Get the job count named by a list of make options. The last job option wins. A bare `-j` or `--jobs` means no limit, and no job option means one job.
#[must_use]
pub fn makeopts_jobs(makeopts: &[String]) -> usize {
	let mut jobs = 1;
	let mut options = makeopts.iter().map(String::as_str).peekable();
	while let Some(option) = options.next() {
		let value = if let Some(value) = option.strip_prefix("--jobs=") {
			Some(value)
		} else if option == "-j" || option == "--jobs" {
			// The count may be the next word.
			options.next_if(|next| next.parse::<usize>().is_ok())
		} else if let Some(value) = option.strip_prefix("-j") {
			Some(value)
		} else {
			continue;
		};
		jobs = match value.map(str::parse::<usize>) {
			None => UNLIMITED_JOBS,
			Some(Ok(0) | Err(_)) => continue,
			Some(Ok(n)) => n,
		};
	}
	jobs
}

#[cfg(test)]
mod tests {
	use super::{UNLIMITED_JOBS, default_makeopts, host_jobs, makeopts_jobs};

	fn words(s: &str) -> Vec<String> {
		s.split_whitespace().map(ToOwned::to_owned).collect()
	}

	#[test]
	fn host_jobs_is_never_zero() {
		assert!(host_jobs() >= 1);
		assert_eq!(default_makeopts(), format!("-j{}", host_jobs()));
	}

	#[test]
	fn makeopts_jobs_reads_every_spelling() {
		assert_eq!(makeopts_jobs(&words("")), 1);
		assert_eq!(makeopts_jobs(&words("-l3")), 1);
		assert_eq!(makeopts_jobs(&words("-j8")), 8);
		assert_eq!(makeopts_jobs(&words("-j 8 -l4")), 8);
		assert_eq!(makeopts_jobs(&words("--jobs=12")), 12);
		assert_eq!(makeopts_jobs(&words("--jobs 3")), 3);
		assert_eq!(makeopts_jobs(&words("-j")), UNLIMITED_JOBS);
		assert_eq!(makeopts_jobs(&words("-j -l4")), UNLIMITED_JOBS);
		assert_eq!(makeopts_jobs(&words("-j2 -j5")), 5);
	}

	#[test]
	fn makeopts_jobs_ignores_garbage() {
		assert_eq!(makeopts_jobs(&words("-jfoo")), 1);
		assert_eq!(makeopts_jobs(&words("-j0")), 1);
		assert_eq!(makeopts_jobs(&words("-j4 --jobs=x")), 4);
	}
}
