//! Tracing initialization.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the subscriber that reports configuration resolution.
///
/// stdout is reserved for the rendered JSON so the output can be piped into
/// other tools; all events go to stderr. At `info` the resolved transformer,
/// Retro and split settings are shown. `debug` on `nvisy_retro` adds applied
/// overrides and the note emitted when a supplied `retro_retrieved_length`
/// is replaced.
///
/// ```bash
/// RUST_LOG=debug nvisy-retro --config retro.json
/// RUST_LOG=nvisy_retro=debug,nvisy_retro_cli=info nvisy-retro --config retro.json
/// ```
pub(super) fn init_tracing() -> anyhow::Result<()> {
    let env_filter = create_env_filter()?;

    tracing_subscriber::registry()
        .with(create_fmt_layer())
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    Ok(())
}

/// Reads `RUST_LOG`, falling back to `info`.
fn create_env_filter() -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {e}"))
}

/// Human-readable layer on stderr, tagged with targets so library and CLI
/// events can be told apart.
fn create_fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_ansi(true)
}
