// Chain builder - ordered actions accumulated through fluent calls
//
// A chain owns its action list outright. Building never executes anything and
// never fails; all validation happens when `execute` walks the list, so chains
// can be assembled conditionally.

use crate::context::RunScope;
use crate::error::Result;
use crate::interaction::{Interaction, MouseButton, MoveTarget};
use crate::options::{CheckUntilOptions, DEFAULT_CHECK_UNTIL_TIMEOUT_MS};
use crate::page::Page;
use crate::setup::PageFn;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maps a produced value to the value compared against the target
pub type Projection = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Deprecated `check` validator: returns an error to reject the value
pub type Validator = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Predicate target: `Ok(true)` means satisfied
pub type Predicate = Arc<dyn Fn(&Value) -> Result<bool> + Send + Sync>;

/// What a checkUntil projection has to reach.
#[derive(Clone)]
pub enum Target {
    /// Deep structural equality with this value
    Value(Value),
    /// A predicate over the projected value; `label` is shown in diagnostics
    Predicate { label: String, predicate: Predicate },
}

impl Target {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool> + Send + Sync + 'static,
    {
        Self::labeled_predicate("<predicate>", f)
    }

    pub fn labeled_predicate<F>(label: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool> + Send + Sync + 'static,
    {
        Target::Predicate {
            label: label.into(),
            predicate: Arc::new(f),
        }
    }

    /// Text used for the `to be <target>` part of a timeout message.
    pub(crate) fn describe(&self) -> String {
        match self {
            Target::Value(value) => crate::serializer::serialize(value),
            Target::Predicate { label, .. } => label.clone(),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Target::Predicate { label, .. } => f.debug_tuple("Predicate").field(label).finish(),
        }
    }
}

macro_rules! target_from {
    ($($t:ty),*) => {
        $(impl From<$t> for Target {
            fn from(value: $t) -> Self {
                Target::Value(Value::from(value))
            }
        })*
    };
}

target_from!(
    bool,
    i32,
    i64,
    u32,
    u64,
    usize,
    f64,
    &str,
    String,
    Vec<Value>,
    serde_json::Value
);

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        Target::Value(value)
    }
}

/// A checkUntil step as recorded in the chain
#[derive(Clone)]
pub struct CheckUntilAction {
    pub producer: PageFn,
    pub projection: Projection,
    pub target: Target,
    /// Captured from the default timeout when the action was built
    pub timeout: Duration,
    /// Overrides the executing chain's `legacy_check_until` when set
    pub legacy_check_until: Option<bool>,
}

impl fmt::Debug for CheckUntilAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckUntilAction")
            .field("producer", &self.producer)
            .field("target", &self.target)
            .field("timeout", &self.timeout)
            .field("legacy_check_until", &self.legacy_check_until)
            .finish()
    }
}

/// One step of a chain
#[derive(Clone)]
pub enum Action {
    /// Input delivered by the page driver
    Interaction(Interaction),
    /// Pause without touching the page
    Sleep(Duration),
    /// Deprecated one-shot check; only runs in unsafe chains
    Check { producer: PageFn, validator: Validator },
    /// Bounded-retry verification
    CheckUntil(CheckUntilAction),
    /// Explicit opt-out from verifying the preceding interaction
    CheckNothing,
    /// Requires a verification step after this point
    RequireCheckMarker,
    /// Nested sub-chain built by the callback when the action is reached
    Run(PageFn),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Interaction(interaction) => {
                f.debug_tuple("Interaction").field(interaction).finish()
            }
            Action::Sleep(duration) => f.debug_tuple("Sleep").field(duration).finish(),
            Action::Check { producer, .. } => {
                f.debug_struct("Check").field("producer", producer).finish()
            }
            Action::CheckUntil(action) => fmt::Debug::fmt(action, f),
            Action::CheckNothing => f.write_str("CheckNothing"),
            Action::RequireCheckMarker => f.write_str("RequireCheckMarker"),
            Action::Run(callback) => f.debug_tuple("Run").field(callback).finish(),
        }
    }
}

/// Why a chain still owes a verification step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCheck {
    /// An interaction has not been verified yet
    Interaction,
    /// `add_require_check_immediately_after` has not been satisfied yet
    Marker,
}

impl PendingCheck {
    /// Effect of one action on the pending obligation.
    pub(crate) fn after(pending: Option<PendingCheck>, action: &Action) -> Option<PendingCheck> {
        match action {
            Action::Interaction(_) => Some(PendingCheck::Interaction),
            Action::RequireCheckMarker => Some(PendingCheck::Marker),
            Action::CheckUntil(_) | Action::CheckNothing => None,
            Action::Sleep(_) | Action::Check { .. } | Action::Run(_) => pending,
        }
    }
}

/// An ordered list of actions for one page, consumed by `execute`.
///
/// # Example
///
/// ```ignore
/// page.x()
///     .mouse_move(MoveTarget::selector("#save"))
///     .click()
///     .check_until(status, |v| Ok(v.clone()), "Saved")
///     .execute(None)
///     .await?;
/// ```
#[must_use = "a chain does nothing until `execute` is awaited"]
pub struct Chain {
    page: Page,
    /// Run the chain was built in; it owes that run an `execute`
    built_in: Option<RunScope>,
    actions: Vec<Action>,
    pending: Option<PendingCheck>,
}

impl Chain {
    pub(crate) fn new(page: Page) -> Self {
        let built_in = RunScope::current();
        if let Some(scope) = &built_in {
            scope.chain_opened();
        }
        Self {
            page,
            built_in,
            actions: Vec::new(),
            pending: None,
        }
    }

    fn push(mut self, action: Action) -> Self {
        self.pending = PendingCheck::after(self.pending, &action);
        self.actions.push(action);
        self
    }

    /// Appends an arbitrary interaction.
    pub fn interact(self, interaction: Interaction) -> Self {
        self.push(Action::Interaction(interaction))
    }

    /// Left click at the current pointer position.
    pub fn click(self) -> Self {
        self.click_with(MouseButton::Left)
    }

    pub fn click_with(self, button: MouseButton) -> Self {
        self.interact(Interaction::Click { button })
    }

    pub fn mouse_down(self, button: MouseButton) -> Self {
        self.interact(Interaction::MouseDown { button })
    }

    pub fn mouse_up(self, button: MouseButton) -> Self {
        self.interact(Interaction::MouseUp { button })
    }

    pub fn mouse_move(self, target: MoveTarget) -> Self {
        self.interact(Interaction::MouseMove { target })
    }

    pub fn wheel(self, delta_x: i32, delta_y: i32) -> Self {
        self.interact(Interaction::Wheel { delta_x, delta_y })
    }

    /// Presses a key combination such as `ctrl+s`.
    pub fn key(self, combo: impl Into<String>) -> Self {
        self.interact(Interaction::Key {
            combo: combo.into(),
        })
    }

    pub fn key_down(self, key: impl Into<String>) -> Self {
        self.interact(Interaction::KeyDown { key: key.into() })
    }

    pub fn key_up(self, key: impl Into<String>) -> Self {
        self.interact(Interaction::KeyUp { key: key.into() })
    }

    pub fn type_text(self, text: impl Into<String>) -> Self {
        self.interact(Interaction::Type { text: text.into() })
    }

    /// Waits without interacting. Does not create a verification obligation.
    pub fn sleep(self, duration: Duration) -> Self {
        self.push(Action::Sleep(duration))
    }

    /// Deprecated one-shot check.
    ///
    /// Always accepted while building; executing it fails unless the chain is
    /// executed in unsafe mode. Prefer [`Chain::check_until`].
    pub fn check<F>(self, producer: PageFn, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        self.push(Action::Check {
            producer,
            validator: Arc::new(validator),
        })
    }

    /// Polls `producer` until `projection` of its value reaches `target`.
    ///
    /// The timeout is the default in effect right now; changing the default
    /// later does not affect this action.
    pub fn check_until<P>(
        self,
        producer: PageFn,
        projection: P,
        target: impl Into<Target>,
    ) -> Self
    where
        P: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.check_until_with(producer, projection, target, CheckUntilOptions::default())
    }

    pub fn check_until_with<P>(
        self,
        producer: PageFn,
        projection: P,
        target: impl Into<Target>,
        options: CheckUntilOptions,
    ) -> Self
    where
        P: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        let timeout = options.timeout.unwrap_or_else(|| {
            self.page
                .settings()
                .map(|settings| settings.default_check_until_timeout())
                .unwrap_or(Duration::from_millis(DEFAULT_CHECK_UNTIL_TIMEOUT_MS))
        });
        self.push(Action::CheckUntil(CheckUntilAction {
            producer,
            projection: Arc::new(projection),
            target: target.into(),
            timeout,
            legacy_check_until: options.legacy_check_until,
        }))
    }

    /// Marks the preceding interaction as deliberately unverified.
    pub fn check_nothing(self) -> Self {
        self.push(Action::CheckNothing)
    }

    /// Requires a checkUntil after this point even without an interaction.
    pub fn add_require_check_immediately_after(self) -> Self {
        self.push(Action::RequireCheckMarker)
    }

    /// Runs `callback` as a nested sub-chain when this action is reached.
    pub fn run(self, callback: PageFn) -> Self {
        self.push(Action::Run(callback))
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Obligation left by the actions recorded so far, not counting any that a
    /// nested run may hand back during execution.
    pub fn pending_check(&self) -> Option<PendingCheck> {
        self.pending
    }

    pub(crate) fn into_parts(self) -> (Page, Option<RunScope>, Vec<Action>) {
        (self.page, self.built_in, self.actions)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("page", &self.page)
            .field("actions", &self.actions)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::RecordingDriver;
    use crate::page::Xdotoolify;

    fn setup() -> (Xdotoolify, Page) {
        let xdo = Xdotoolify::default();
        let page = Page::new(Arc::new(RecordingDriver::new()));
        xdo.attach(&page);
        (xdo, page)
    }

    #[test]
    fn test_actions_keep_insertion_order() {
        let (xdo, page) = setup();
        let producer = xdo.setup_with_page(|_, _| async { Ok(Value::Null) });
        let chain = page
            .x()
            .mouse_move(MoveTarget::point(1.0, 2.0))
            .click()
            .check_until(producer.clone(), |v| Ok(v.clone()), Value::Null)
            .run(producer);

        let kinds: Vec<_> = chain
            .actions()
            .iter()
            .map(|action| match action {
                Action::Interaction(i) => i.name(),
                Action::CheckUntil(_) => "checkUntil",
                Action::Run(_) => "run",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["mousemove", "click", "checkUntil", "run"]);
    }

    #[test]
    fn test_pending_flag_tracks_interactions() {
        let (xdo, page) = setup();
        let producer = xdo.setup_with_page(|_, _| async { Ok(Value::Null) });

        let chain = page.x().click();
        assert_eq!(chain.pending_check(), Some(PendingCheck::Interaction));

        let chain = chain.sleep(Duration::from_millis(1));
        assert_eq!(chain.pending_check(), Some(PendingCheck::Interaction));

        let chain = chain.check_until(producer, |v| Ok(v.clone()), Value::Null);
        assert_eq!(chain.pending_check(), None);

        let chain = chain.add_require_check_immediately_after();
        assert_eq!(chain.pending_check(), Some(PendingCheck::Marker));

        let chain = chain.check_nothing();
        assert_eq!(chain.pending_check(), None);
    }

    #[test]
    fn test_deprecated_check_builds_without_error() {
        let (xdo, page) = setup();
        let producer = xdo.setup_with_page(|_, _| async { Ok(Value::from(5)) });
        let chain = page.x().check(producer, |_| Ok(()));
        assert_eq!(chain.len(), 1);
        assert!(matches!(chain.actions()[0], Action::Check { .. }));
    }

    #[test]
    fn test_timeout_captured_at_build_time() {
        let (xdo, page) = setup();
        let producer = xdo.setup_with_page(|_, _| async { Ok(Value::Null) });

        xdo.set_default_check_until_timeout(Duration::from_millis(40));
        let chain = page.x().check_until(producer.clone(), |v| Ok(v.clone()), 1);
        xdo.set_default_check_until_timeout(Duration::from_millis(900));

        let Action::CheckUntil(action) = &chain.actions()[0] else {
            panic!("expected a checkUntil action");
        };
        assert_eq!(action.timeout, Duration::from_millis(40));

        let chain = page.x().check_until_with(
            producer,
            |v| Ok(v.clone()),
            1,
            CheckUntilOptions::new()
                .timeout(Duration::from_millis(7))
                .legacy_check_until(false),
        );
        let Action::CheckUntil(action) = &chain.actions()[0] else {
            panic!("expected a checkUntil action");
        };
        assert_eq!(action.timeout, Duration::from_millis(7));
        assert_eq!(action.legacy_check_until, Some(false));
    }

    #[test]
    fn test_chains_from_one_page_are_independent() {
        let (_xdo, page) = setup();
        let first = page.x().click();
        let second = page.x();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_target_descriptions() {
        assert_eq!(Target::from(5).describe(), "5");
        assert_eq!(
            Target::from(serde_json::json!({"a": 2, "b": 2})).describe(),
            r#"{"a":2,"b":2}"#
        );
        assert_eq!(Target::predicate(|_| Ok(true)).describe(), "<predicate>");
        assert_eq!(
            Target::labeled_predicate("non-empty", |_| Ok(true)).describe(),
            "non-empty"
        );
    }
}
