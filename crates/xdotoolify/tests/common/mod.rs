// Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;
use xdotoolify::{Page, PageFn, RecordingDriver, Value, Xdotoolify};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per test binary.
///
/// Respects RUST_LOG, e.g. `RUST_LOG=xdotoolify=trace cargo test`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Fresh page with a recording driver and the accessor attached.
pub fn attached_page(xdo: &Xdotoolify) -> (Arc<RecordingDriver>, Page) {
    let driver = Arc::new(RecordingDriver::new());
    let page = Page::new(driver.clone());
    xdo.attach(&page);
    (driver, page)
}

/// Producer that always returns `value`.
pub fn constant(xdo: &Xdotoolify, value: impl Into<Value>) -> PageFn {
    let value = value.into();
    xdo.setup_with_page(move |_, _| {
        let value = value.clone();
        async move { Ok(value) }
    })
}

/// Projection that doubles an integer value.
pub fn doubled(value: &Value) -> xdotoolify::Result<Value> {
    Ok(Value::from(value.as_i64().unwrap_or_default() * 2))
}

/// Projection that passes the value through.
pub fn identity(value: &Value) -> xdotoolify::Result<Value> {
    Ok(value.clone())
}
