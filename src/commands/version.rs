//! Command: print version information.
use std::io::{self, Write};

/// Version string embedded at build time, or the crate version for local
/// builds.
#[must_use]
pub fn version() -> &'static str {
    option_env!("INFRA_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Target triple the binary was built for.
#[must_use]
pub fn target() -> &'static str {
    option_env!("INFRA_TARGET").unwrap_or("unknown")
}

/// Write the version and build target to `out`.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn run(out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "infra {} ({})", version(), target())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn run_prints_name_and_version() {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("infra {} ({})\n", version(), target()));
    }

    #[test]
    fn version_has_no_tag_prefix() {
        assert!(!version().starts_with("infra-"), "{}", version());
        assert!(!version().is_empty());
    }

    #[test]
    fn target_is_embedded_by_build_script() {
        assert_ne!(target(), "unknown");
    }
}
