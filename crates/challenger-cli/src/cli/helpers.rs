use anyhow::Context;
use challenger_core::common::RunConfig;
use challenger_core::modules::{CommandFragmenter, Toolkit};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Progress goes to stderr so stdout stays machine readable. `RUST_LOG`
/// overrides the default `info` filter.
pub(super) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed when the CLI is embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn current_working_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("failed to read current working directory")
}

pub(super) fn resolve_config(config: RunConfig, working_dir: &Path) -> RunConfig {
    config.resolve_against(working_dir)
}

pub(super) fn build_toolkit(program: &Path, args: &[String]) -> Toolkit {
    Toolkit::with_command_fragmenter(CommandFragmenter::new(program).with_args(args.iter().cloned()))
}
