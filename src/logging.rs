use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "motoring_buchhaltung=info";

pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
    if verbose {
      EnvFilter::new("motoring_buchhaltung=debug")
    } else {
      EnvFilter::new(DEFAULT_FILTER)
    }
  });

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}
