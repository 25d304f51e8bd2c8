//! `pvw version`: Print version information.

/// Executes the `version` command.
///
/// # Errors
///
/// Never fails; returns `Result` for dispatch uniformity.
#[allow(clippy::unnecessary_wraps)]
pub fn execute() -> anyhow::Result<()> {
    println!("{}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
