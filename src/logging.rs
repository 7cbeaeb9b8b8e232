use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
fn default_directives(verbose: bool) -> &'static str {
  if verbose {
    "info,plan_sync_lib=debug"
  } else {
    "info"
  }
}

/// Install the global subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

  // A second call (e.g. from tests) keeps the first subscriber
  let _ = tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_target(false))
    .try_init();
}
