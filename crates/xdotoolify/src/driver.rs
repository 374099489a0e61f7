// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// PageDriver - the capability that actually delivers input to a page
//
// Key and mouse delivery, the page process and its connection lifecycle all
// live behind this trait. The chain core only ever awaits
// `perform_interaction` and never inspects the page itself.

use crate::error::{Error, Result};
use crate::interaction::Interaction;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`PageDriver::perform_interaction`]
pub type DriverFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Trait defining what the chain core needs from a page driver
pub trait PageDriver: Send + Sync {
    /// Deliver one interaction to the page and resolve once it has been sent
    fn perform_interaction(&self, interaction: &Interaction) -> DriverFuture<'_>;
}

/// Driver that records interactions instead of delivering them.
///
/// Useful for dry runs and for exercising chains without a page process.
/// A failure can be scripted with [`RecordingDriver::fail_on`].
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{Page, RecordingDriver};
/// use std::sync::Arc;
///
/// let driver = Arc::new(RecordingDriver::new());
/// let page = Page::new(driver.clone());
/// // ... run chains against `page` ...
/// assert!(driver.interactions().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingDriver {
    performed: Mutex<Vec<Interaction>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every interaction with the given name (e.g. `"click"`) fail.
    pub fn fail_on(&self, name: impl Into<String>) {
        *self.fail_on.lock() = Some(name.into());
    }

    /// Interactions performed so far, in order.
    pub fn interactions(&self) -> Vec<Interaction> {
        self.performed.lock().clone()
    }
}

impl PageDriver for RecordingDriver {
    fn perform_interaction(&self, interaction: &Interaction) -> DriverFuture<'_> {
        let interaction = interaction.clone();
        Box::pin(async move {
            if self.fail_on.lock().as_deref() == Some(interaction.name()) {
                return Err(Error::Driver(format!(
                    "refusing to perform {}",
                    interaction.name()
                )));
            }
            tracing::debug!("Recorded {:?}", interaction);
            self.performed.lock().push(interaction);
            Ok(())
        })
    }
}
