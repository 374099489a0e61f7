// checkUntil engine - bounded polling of a producer against a target
//
// Polling -> Succeeded | TimedOut | Errored. The producer runs at least once
// even with a zero timeout. Producer errors end the loop immediately; errors
// from the projection or predicate are fatal in legacy mode and count as "not
// yet satisfied" otherwise.

use crate::chain::{CheckUntilAction, Target};
use crate::error::{Error, Result};
use crate::page::Page;
use crate::serializer::serialize;
use crate::value::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Diagnostic for a checkUntil that ran out of time.
///
/// All fields are already serialized with the cycle-safe fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTimeout {
    /// Name of the producer (empty if it was never named)
    pub producer: String,
    /// Serialized producer arguments
    pub args: String,
    /// Serialized target, or the predicate label
    pub target: String,
    /// Most recent value returned by the producer
    pub last_value: String,
    /// Most recent projection result
    pub last_result: String,
    /// The timeout that was exceeded
    pub timeout: Duration,
}

impl fmt::Display for CheckTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Timeout exceeded waiting for {} called with {} to be {}.\n\
             Most recent value: {}\n\
             Most recent check result: {}\n",
            self.producer, self.args, self.target, self.last_value, self.last_result
        )
    }
}

/// Result of one engine run that did not error.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// The target was reached; carries the producer value that satisfied it
    Succeeded(Value),
    /// The deadline passed first
    TimedOut { last_value: Value, last_result: Value },
}

impl CheckOutcome {
    /// Converts a timeout into an error carrying the serialized diagnostic.
    pub fn into_result(self, action: &CheckUntilAction) -> Result<Value> {
        match self {
            CheckOutcome::Succeeded(value) => Ok(value),
            CheckOutcome::TimedOut {
                last_value,
                last_result,
            } => Err(Error::CheckUntilTimeout(Box::new(CheckTimeout {
                producer: action.producer.name().to_string(),
                args: action.producer.describe_args(),
                target: action.target.describe(),
                last_value: serialize(&last_value),
                last_result: serialize(&last_result),
                timeout: action.timeout,
            }))),
        }
    }
}

/// Polls until the projected value reaches the target or the action's timeout passes.
pub(crate) async fn poll(
    page: &Page,
    action: &CheckUntilAction,
    legacy_check_until: bool,
    poll_interval: Duration,
) -> Result<CheckOutcome> {
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let value = action.producer.call(page).await?;

        let (projected, satisfied) = match compare(action, &value) {
            Ok(result) => result,
            Err(e) if legacy_check_until => {
                return Err(e.with_checked_value(serialize(&value)));
            }
            Err(e) => (Value::from(e.to_string()), false),
        };

        if satisfied {
            tracing::debug!(
                "checkUntil '{}' satisfied after {} attempt(s)",
                action.producer.name(),
                attempts
            );
            return Ok(CheckOutcome::Succeeded(value));
        }

        if start.elapsed() >= action.timeout {
            tracing::warn!(
                "checkUntil '{}' timed out after {:?} ({} attempts)",
                action.producer.name(),
                action.timeout,
                attempts
            );
            return Ok(CheckOutcome::TimedOut {
                last_value: value,
                last_result: projected,
            });
        }

        tracing::trace!("checkUntil attempt {} not satisfied: {}", attempts, projected);
        sleep(poll_interval).await;
    }
}

/// Projects a produced value and compares it with the target.
fn compare(action: &CheckUntilAction, value: &Value) -> Result<(Value, bool)> {
    let projected = (action.projection)(value)?;
    let satisfied = match &action.target {
        Target::Value(expected) => projected.deep_eq(expected),
        Target::Predicate { predicate, .. } => predicate(&projected)?,
    };
    Ok((projected, satisfied))
}
