use anyhow::bail;
use std::path::Path;

/// Start the target application. Executables are spawned directly (with any
/// arguments embedded in the command line); everything else (URLs, documents,
/// folders) goes through the platform opener.
pub fn launch_target(target: &str) -> anyhow::Result<()> {
    let target = target.trim();
    if target.is_empty() {
        bail!("empty launch target");
    }

    // Only shell-split commands that carry arguments; a bare path must not go
    // through escape processing (backslashes in Windows paths).
    let (program, args) = if target.contains(char::is_whitespace) {
        let mut parts = shlex::split(target).unwrap_or_default();
        if parts.is_empty() {
            (target.to_string(), Vec::new())
        } else {
            let program = parts.remove(0);
            (program, parts)
        }
    } else {
        (target.to_string(), Vec::new())
    };

    let is_exe = Path::new(&program)
        .extension()
        .map(|e| e.eq_ignore_ascii_case("exe"))
        .unwrap_or(false);

    if is_exe {
        std::process::Command::new(&program)
            .args(&args)
            .spawn()
            .map(|_| ())
            .map_err(|e| e.into())
    } else {
        open::that(target).map_err(|e| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::launch_target;

    #[test]
    fn empty_target_is_an_error() {
        assert!(launch_target("").is_err());
        assert!(launch_target("   ").is_err());
    }

    #[test]
    fn missing_executable_is_an_error_not_a_panic() {
        let err = launch_target(r"definitely-not-here-12345.exe");
        assert!(err.is_err());
    }
}
