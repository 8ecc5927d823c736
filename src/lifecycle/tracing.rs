//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`. Module paths are hidden (`with_target(false)`); the
//! structured fields (`key`, `shard`, `version`) carry the context instead.
//!
//! ```bash
//! RUST_LOG=info cargo run     # commits, degradations, lifecycle
//! RUST_LOG=debug cargo run    # every shard request, cache hits and misses, full item lists
//! ```
//!
//! ## What Gets Traced
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | Shard start/stop, `Created` / `Updated` / `Cancelled` commits, system start/stop |
//! | `warn` | Shard retries, pricing failures, `Event unconfirmed`, `Cache not updated`, rejected updates |
//! | `debug` | Each shard request, cache hit/miss, priced totals, appended events |
//!
//! Every `OrderCore` operation opens a span named after the operation with the
//! order key and the resolved shard as fields:
//!
//! ```text
//! INFO create_within{key=ord-1 shard=2}: Created price=20.00
//! WARN update_within{key=ord-1 shard=2}: Event unconfirmed error=broker error: connection refused sequence=2
//! ```

/// Initialises the global subscriber. Call once, at the top of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
