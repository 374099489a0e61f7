//! xdotoolify: Declarative interaction chains with mandatory verification
//!
//! Tests describe what they do to a page as a chain of actions (mouse and
//! keyboard input, sleeps, nested sub-chains) interleaved with verification
//! steps. By default a chain refuses to finish while an interaction is left
//! unverified, and verification retries until the page state converges or a
//! timeout passes, with diagnostics that show the most recent observed value.
//!
//! The actual input delivery lives behind [`PageDriver`]; this crate only
//! sequences actions and enforces the verification discipline.
//!
//! # Examples
//!
//! ## Click and wait for a result
//!
//! ```ignore
//! use std::sync::Arc;
//! use xdotoolify::{MoveTarget, Page, RecordingDriver, Value, Xdotoolify};
//!
//! #[tokio::main]
//! async fn main() -> xdotoolify::Result<()> {
//!     let xdo = Xdotoolify::default();
//!     let page = Page::new(Arc::new(RecordingDriver::new()));
//!     xdo.attach(&page);
//!
//!     let status = xdo
//!         .setup_with_page(|_page, _args| async move { Ok(Value::from("Saved")) })
//!         .named("statusText");
//!
//!     page.x()
//!         .mouse_move(MoveTarget::selector("#save"))
//!         .click()
//!         .check_until(status, |v| Ok(v.clone()), "Saved")
//!         .execute(None)
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Nested sub-chains
//!
//! ```ignore
//! use xdotoolify::{Value, Xdotoolify};
//!
//! let open_menu = xdo.setup_with_page(|page, _args| async move {
//!     page.x().click().check_nothing().execute(None).await?;
//!     Ok(Value::Null)
//! });
//!
//! page.x()
//!     .run(open_menu)
//!     .check_until(menu_visible, |v| Ok(v.clone()), true)
//!     .execute(None)
//!     .await?;
//! ```
//!
//! ## Unsafe chains
//!
//! ```ignore
//! use xdotoolify::DoOptions;
//!
//! // No verification required; deprecated `check` actions are allowed.
//! page.x()
//!     .key("ctrl+a")
//!     .execute(Some(DoOptions::new().unsafe_mode(true)))
//!     .await?;
//! ```

mod chain;
mod check_until;
mod context;
mod driver;
mod error;
mod interaction;
mod options;
mod page;
mod serializer;
mod setup;
mod trampoline;
mod value;

// Re-export error types
pub use error::{Error, ErrorKind, Result};

// Re-export the entry point and page handle
pub use page::{Page, Xdotoolify};

// Re-export chain building types
pub use chain::{
    Action, Chain, CheckUntilAction, PendingCheck, Predicate, Projection, Target, Validator,
};
pub use setup::{PageFn, PageFuture};

// Re-export verification diagnostics
pub use check_until::{CheckOutcome, CheckTimeout};

// Re-export input types and the driver capability
pub use driver::{DriverFuture, PageDriver, RecordingDriver};
pub use interaction::{Interaction, MouseButton, MoveTarget};

// Re-export configuration
pub use options::{
    CHECK_UNTIL_TIMEOUT_ENV, CheckUntilOptions, DEFAULT_CHECK_UNTIL_TIMEOUT_MS,
    DEFAULT_POLL_INTERVAL_MS, DoOptions, POLL_INTERVAL_ENV, Settings, TimeoutGuard,
    XdotoolifyOptions,
};

// Re-export values and serialization
pub use serializer::{CIRCULAR_STRUCTURE, serialize, serialize_args, try_serialize};
pub use value::{SharedValue, Value};
