// Chain execution - walks the recorded actions in order
//
// Ordering per `execute` call:
// 1. Enter a mode frame (unsafe inside safe is rejected here)
// 2. Reject any callback that skipped `setup_with_page`, before touching the page
// 3. Run every action, stopping at the first error
// 4. In safe mode, fail if a verification step is still owed
//
// A `run` callback is awaited inside a fresh `RunScope` that shares this call's
// mode stack. Chains built or executed while it runs join the same invocation
// tree whichever page handle they were obtained from.

use crate::chain::{Action, Chain, PendingCheck};
use crate::check_until;
use crate::context::{ExecutionContext, RunScope};
use crate::error::{Error, Result};
use crate::options::{DoOptions, Settings};
use crate::page::Page;
use crate::serializer::serialize;

impl Chain {
    /// Executes the chain (the terminal `.do()` call).
    ///
    /// Actions run strictly in order; the first failure stops the chain and is
    /// returned as-is. With default options the chain is safe: it must not end
    /// with an unverified interaction or an unsatisfied
    /// [`add_require_check_immediately_after`](Chain::add_require_check_immediately_after),
    /// and deprecated `check` actions are rejected.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The page has no accessor attached
    /// - An unsafe chain is executed inside a safe one
    /// - A producer or `run` callback was not created with `setup_with_page`
    /// - An interaction, check, or nested chain fails
    /// - A safe chain ends while a verification step is still owed
    pub async fn execute(self, options: Option<DoOptions>) -> Result<()> {
        let options = options.unwrap_or_default();
        let (page, built_in, actions) = self.into_parts();

        if let Some(scope) = &built_in {
            scope.chain_executed();
        }

        let settings = page.settings().cloned().ok_or(Error::NotAttached)?;
        let scope = RunScope::current();
        let context = scope
            .as_ref()
            .map(|scope| scope.context().clone())
            .unwrap_or_else(ExecutionContext::new);
        let _frame = context.enter(options.unsafe_mode)?;

        ensure_callbacks_setup(&actions)?;

        tracing::debug!(
            "Executing chain: {} actions, unsafe={}, depth={}",
            actions.len(),
            options.unsafe_mode,
            context.depth()
        );

        let mut walk = Walk {
            page: &page,
            scope: scope.as_ref(),
            context: &context,
            settings: &settings,
            options: &options,
            pending: None,
        };
        for action in &actions {
            walk.step(action).await?;
        }
        walk.finish()
    }
}

/// Fails on the first producer or run callback that skipped the setup step.
fn ensure_callbacks_setup(actions: &[Action]) -> Result<()> {
    for action in actions {
        match action {
            Action::Check { producer, .. } => {
                producer.ensure_setup()?;
            }
            Action::CheckUntil(check) => {
                check.producer.ensure_setup()?;
            }
            Action::Run(callback) => {
                callback.ensure_setup()?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// State of one chain while its actions run
struct Walk<'a> {
    page: &'a Page,
    /// Enclosing run, if this chain executes inside one
    scope: Option<&'a RunScope>,
    context: &'a ExecutionContext,
    settings: &'a Settings,
    options: &'a DoOptions,
    pending: Option<PendingCheck>,
}

impl Walk<'_> {
    async fn step(&mut self, action: &Action) -> Result<()> {
        let mut pending = PendingCheck::after(self.pending, action);

        match action {
            Action::Interaction(interaction) => {
                tracing::debug!("Performing {}", interaction.name());
                self.page
                    .driver()
                    .perform_interaction(interaction)
                    .await
                    .map_err(|e| e.context(format!("{} failed", interaction.name())))?;
            }
            Action::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
            }
            Action::Check {
                producer,
                validator,
            } => {
                if !self.options.unsafe_mode {
                    return Err(Error::DeprecatedCheck);
                }
                let value = producer.call(self.page).await?;
                validator(&value).map_err(|e| e.with_checked_value(serialize(&value)))?;
            }
            Action::CheckUntil(check) => {
                let legacy = check
                    .legacy_check_until
                    .unwrap_or(self.options.legacy_check_until);
                check_until::poll(self.page, check, legacy, self.settings.poll_interval())
                    .await?
                    .into_result(check)?;
            }
            Action::CheckNothing | Action::RequireCheckMarker => {}
            Action::Run(callback) => {
                let scope = RunScope::new(self.context.clone());
                scope.clone().run_within(callback.call(self.page)).await?;

                if scope.unexecuted() > 0 {
                    return Err(Error::MissingSubcommandDo);
                }
                if scope.take_require_check() {
                    pending = Some(PendingCheck::Marker);
                }
            }
        }

        self.pending = pending;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.options.unsafe_mode {
            return Ok(());
        }
        match self.pending {
            None => Ok(()),
            Some(PendingCheck::Interaction) => Err(Error::MissingCheckAfterInteraction),
            Some(PendingCheck::Marker) => match self.scope {
                // The enclosing chain must verify right after this run.
                Some(scope) => {
                    scope.defer_require_check();
                    Ok(())
                }
                None => Err(Error::MissingCheckAfterMarker),
            },
        }
    }
}
