//! Bounded retries with an explicit outcome.
//!
//! An attempt either finishes (`Attempt::Done`), asks for another try
//! (`Attempt::Retry`), or fails fatally (`Err`), which stops the loop at once.
//! Running out of budget is a normal, tagged result rather than an error so
//! callers decide themselves whether exhaustion is recoverable.

use std::future::Future;

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, R> {
    /// The attempt produced a value
    Done(T),
    /// The attempt should be repeated; carries the reason
    Retry(R),
}

/// Result of a whole retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, R> {
    /// An attempt succeeded
    Succeeded {
        /// Produced value
        value: T,
        /// Attempts used, the successful one included
        attempts: usize,
    },
    /// Every attempt asked for a retry
    Exhausted {
        /// Attempts used
        attempts: usize,
        /// Reason given by the last attempt
        last: R,
    },
}

/// Run `op` up to `budget` times (at least once).
///
/// `op` receives the zero-based attempt index.
pub async fn retry_with_budget<T, R, E, F, Fut>(budget: usize, mut op: F) -> Result<RetryOutcome<T, R>, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Attempt<T, R>, E>>,
{
    let budget = budget.max(1);
    let mut attempt = 0;

    loop {
        match op(attempt).await? {
            Attempt::Done(value) => {
                return Ok(RetryOutcome::Succeeded {
                    value,
                    attempts: attempt + 1,
                })
            }
            Attempt::Retry(reason) => {
                attempt += 1;
                if attempt >= budget {
                    return Ok(RetryOutcome::Exhausted {
                        attempts: attempt,
                        last: reason,
                    });
                }
                tracing::debug!(attempt, budget, "retrying");
            }
        }
    }
}
