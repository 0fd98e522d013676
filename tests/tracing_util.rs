use tracing::subscriber::DefaultGuard;

/// Per-test tracing capture.
///
/// Installs a thread-default subscriber writing through the test writer so
/// log output is attributed to the owning test. Dropping the guard removes
/// the subscriber.
pub struct TestTracing {
    _guard: DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}
