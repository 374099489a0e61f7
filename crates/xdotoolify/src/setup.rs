// Setup guard - page callbacks that are guaranteed to see an attached accessor
//
// Chains call user code in three places: the producer of `check`/`check_until`
// and the callback of `run`. All of them must be `PageFn`s created through
// `Xdotoolify::setup_with_page`; a bare callback is rejected with a message
// naming that call before any page interaction happens.

use crate::error::{Error, Result};
use crate::options::Settings;
use crate::page::{Page, Xdotoolify};
use crate::serializer::serialize_args;
use crate::value::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by page callbacks
pub type PageFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

type PageCallback = Arc<dyn Fn(Page, Vec<Value>) -> PageFuture + Send + Sync>;

/// A callback that receives the page and its bound arguments.
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{Value, Xdotoolify};
///
/// let xdo = Xdotoolify::default();
/// let row_count = xdo
///     .setup_with_page(|_page, args| async move {
///         let table = args[0].as_str().unwrap_or_default();
///         Ok(Value::from(table.len()))
///     })
///     .named("rowCount")
///     .with_args(vec![Value::from("#results")]);
/// ```
#[derive(Clone)]
pub struct PageFn {
    callback: PageCallback,
    setup: Option<Settings>,
    name: String,
    args: Vec<Value>,
}

impl PageFn {
    fn from_callback<F, Fut>(f: F, setup: Option<Settings>) -> Self
    where
        F: Fn(Page, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let callback: PageCallback = Arc::new(move |page: Page, args: Vec<Value>| -> PageFuture {
            Box::pin(f(page, args))
        });
        Self {
            callback,
            setup,
            name: String::new(),
            args: Vec::new(),
        }
    }

    /// Wraps a callback without the setup step.
    ///
    /// Chains refuse to call the result; this exists for callbacks that are
    /// invoked by hand and for code that wraps them later.
    pub fn bare<F, Fut>(f: F) -> Self
    where
        F: Fn(Page, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::from_callback(f, None)
    }

    /// Sets the name shown in checkUntil timeout messages.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Binds arguments passed to the callback on every call.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Bound arguments rendered for diagnostics.
    pub(crate) fn describe_args(&self) -> String {
        serialize_args(&self.args)
    }

    /// Whether this callback went through `setup_with_page`.
    pub fn is_setup(&self) -> bool {
        self.setup.is_some()
    }

    pub(crate) fn ensure_setup(&self) -> Result<&Settings> {
        self.setup.as_ref().ok_or_else(|| {
            let name = if self.name.is_empty() {
                "<anonymous>"
            } else {
                self.name.as_str()
            };
            Error::Setup(name.to_string())
        })
    }

    /// Calls the callback with `page`, attaching the accessor first if the page
    /// has none.
    pub async fn call(&self, page: &Page) -> Result<Value> {
        let settings = self.ensure_setup()?;
        page.attach(settings);
        (self.callback)(page.clone(), self.args.clone()).await
    }
}

impl fmt::Debug for PageFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFn")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("setup", &self.is_setup())
            .finish()
    }
}

impl Xdotoolify {
    /// Wraps a page callback so it always runs with the accessor attached.
    ///
    /// This is the only way to build callbacks that chains accept as producers
    /// or as `run` bodies.
    pub fn setup_with_page<F, Fut>(&self, f: F) -> PageFn
    where
        F: Fn(Page, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        PageFn::from_callback(f, Some(self.settings().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;

    fn page() -> Page {
        Page::new(Arc::new(RecordingDriver::new()))
    }

    #[tokio::test]
    async fn test_wrapped_callback_attaches_accessor() {
        let xdo = Xdotoolify::default();
        let page = page();
        let producer =
            xdo.setup_with_page(|page, _| async move { Ok(Value::from(page.is_attached())) });

        assert!(!page.is_attached());
        let seen = producer.call(&page).await.unwrap();
        assert_eq!(seen, Value::from(true));
        assert!(page.is_attached());
    }

    #[tokio::test]
    async fn test_bare_callback_is_rejected_before_running() {
        let page = page();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let bare = PageFn::bare(move |_, _| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            async { Ok(Value::Null) }
        });

        let err = bare.call(&page).await.unwrap_err();
        assert!(matches!(err, Error::Setup(_)));
        assert!(err.to_string().contains("you must call Xdotoolify.setupWithPage"));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!page.is_attached());
    }

    #[tokio::test]
    async fn test_args_are_passed_and_described() {
        let xdo = Xdotoolify::default();
        let echo = xdo
            .setup_with_page(|_, args| async move { Ok(Value::from(args)) })
            .named("echo")
            .with_args(vec![Value::from("#btn"), Value::from(2)]);

        assert_eq!(echo.name(), "echo");
        assert_eq!(echo.describe_args(), r##""#btn", 2"##);
        let result = echo.call(&page()).await.unwrap();
        assert_eq!(result, Value::from(vec![Value::from("#btn"), Value::from(2)]));
    }

    #[test]
    fn test_setup_error_names_the_callback() {
        let bare = PageFn::bare(|_, _| async { Ok(Value::Null) }).named("title");
        let message = bare.ensure_setup().unwrap_err().to_string();
        assert!(message.contains("'title'"));
    }
}
