// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Page handle and the Xdotoolify entry point
//
// A `Page` is a cheap, cloneable handle over a driver. Attaching gives it the
// chain-builder accessor (`page.x()`); the accessor carries the settings of the
// `Xdotoolify` instance that attached it. All clones of a handle are
// interchangeable; nothing about nested runs is stored on the handle.

use crate::chain::Chain;
use crate::driver::PageDriver;
use crate::error::Result;
use crate::options::{Settings, TimeoutGuard, XdotoolifyOptions};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// A page that chains can drive.
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{Page, RecordingDriver, Xdotoolify};
/// use std::sync::Arc;
///
/// let xdo = Xdotoolify::default();
/// let page = Page::new(Arc::new(RecordingDriver::new()));
/// xdo.attach(&page);
///
/// page.x().click().check_nothing().execute(None).await?;
/// ```
#[derive(Clone)]
pub struct Page {
    inner: Arc<PageInner>,
}

struct PageInner {
    driver: Arc<dyn PageDriver>,
    accessor: OnceLock<Settings>,
}

impl Page {
    /// Creates a page handle over a driver. No accessor is attached yet.
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self {
            inner: Arc::new(PageInner {
                driver,
                accessor: OnceLock::new(),
            }),
        }
    }

    /// Starts a new, empty chain on this page.
    ///
    /// Every call returns an independent chain; nothing is shared between two
    /// chains obtained from the same page.
    pub fn x(&self) -> Chain {
        Chain::new(self.clone())
    }

    /// Whether an accessor has been attached to this page.
    pub fn is_attached(&self) -> bool {
        self.inner.accessor.get().is_some()
    }

    /// Whether two handles refer to the same page.
    pub fn same_page(&self, other: &Page) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attaches the accessor unless one is already present. Returns `true` if
    /// this call attached it.
    pub(crate) fn attach(&self, settings: &Settings) -> bool {
        let mut attached = false;
        self.inner.accessor.get_or_init(|| {
            attached = true;
            settings.clone()
        });
        attached
    }

    pub(crate) fn settings(&self) -> Option<&Settings> {
        self.inner.accessor.get()
    }

    pub(crate) fn driver(&self) -> &dyn PageDriver {
        self.inner.driver.as_ref()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Entry point: attaches accessors to pages, wraps page callbacks, and owns the
/// default checkUntil timeout.
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{Value, Xdotoolify, XdotoolifyOptions};
/// use std::time::Duration;
///
/// let xdo = Xdotoolify::new(XdotoolifyOptions::new().check_until_timeout_ms(5000));
/// xdo.attach(&page);
///
/// let title = xdo.setup_with_page(|_page, _args| async move { Ok(Value::from("Inbox")) });
/// page.x()
///     .click()
///     .check_until(title, |v| Ok(v.clone()), "Inbox")
///     .execute(None)
///     .await?;
/// ```
#[derive(Clone, Default)]
pub struct Xdotoolify {
    settings: Settings,
}

impl Xdotoolify {
    pub fn new(options: XdotoolifyOptions) -> Self {
        Self {
            settings: Settings::from_options(&options),
        }
    }

    /// Creates an instance configured from `XDOTOOLIFY_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(XdotoolifyOptions::from_env()?))
    }

    /// Attaches the chain-builder accessor to `page`. Idempotent: a page that
    /// already has an accessor keeps it.
    pub fn attach(&self, page: &Page) {
        if page.attach(&self.settings) {
            tracing::debug!("Attached accessor to {:?}", page);
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Timeout given to checkUntil actions built from now on.
    pub fn default_check_until_timeout(&self) -> Duration {
        self.settings.default_check_until_timeout()
    }

    /// Changes the timeout for checkUntil actions built after this call.
    /// Actions already built keep the timeout they captured.
    pub fn set_default_check_until_timeout(&self, timeout: Duration) {
        self.settings.set_default_check_until_timeout(timeout);
    }

    /// Overrides the default timeout until the returned guard is dropped.
    pub fn scoped_check_until_timeout(&self, timeout: Duration) -> TimeoutGuard {
        self.settings.scoped_check_until_timeout(timeout)
    }
}
