use std::process::Command;

/// Run an external quota tool and return its stdout.
///
/// A non-zero exit still yields stdout: `quota` exits 1 while a
/// filesystem is over quota but prints the full table. Missing binaries
/// and empty output come back as `None`.
pub fn run(argv: &[String]) -> Option<String> {
    let (program, args) = argv.split_first()?;
    let out = match Command::new(program).args(args).output() {
        Ok(o) => o,
        Err(err) => {
            log::warn!("cannot run {}: {}", program, err);
            return None;
        }
    };

    let text = String::from_utf8_lossy(&out.stdout).into_owned();
    if text.trim().is_empty() {
        if out.status.success() {
            log::debug!("{} printed nothing", argv.join(" "));
        } else {
            log::warn!(
                "{} exited with {}: {}",
                argv.join(" "),
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        return None;
    }
    if !out.status.success() {
        log::debug!("{} exited with {}, keeping its output", argv.join(" "), out.status);
    }
    Some(text)
}
