//! Version and build information.

/// Full version string including build metadata.
///
/// Returns format: "sindex {version} ({commit} {date})"
pub fn version() -> String {
    format!(
        "sindex {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        build_commit(),
        build_date()
    )
}

/// Build commit SHA, or "unknown" when not built from a checkout.
pub fn build_commit() -> &'static str {
    option_env!("SINDEX_COMMIT_SHA").unwrap_or("unknown")
}

/// Build date, or "unknown" when not recorded.
pub fn build_date() -> &'static str {
    option_env!("SINDEX_BUILD_DATE").unwrap_or("unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_carries_the_package_version() {
        assert!(version().contains(env!("CARGO_PKG_VERSION")));
    }
}
