//! logging
//!
//! Diagnostic tracing for fork operations.
//!
//! User-facing results go through [`crate::ui::output`]. This module only
//! configures the `tracing` subscriber that carries step-by-step diagnostics
//! (branch created, worktree added, ref moved, rollback) to stderr.
//!
//! `RUST_LOG` always wins. Without it the level is `warn`, or `debug` when
//! `--debug` is passed.
//!
//! ```bash
//! RUST_LOG=forkline=trace fl fork --pick feature
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Later calls are no-ops.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}
