use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorrelatorError {
    #[error("Timed out waiting for the store to reply.")]
    Timeout,
    #[error("Wait for the store reply was aborted.")]
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Armed(usize),
    Satisfied,
    Aborted,
}

/// One-shot rendezvous between a request and the asynchronous reply that
/// answers it.
///
/// The handle starts armed with an expected number of signals. Reaching zero
/// satisfies it; [`abort`](Self::abort) fails every current and future
/// waiter. Both end states are terminal.
#[derive(Debug)]
pub struct ResponseCorrelator {
    state: watch::Sender<State>,
}

impl ResponseCorrelator {
    pub fn new(expected: usize) -> Self {
        let initial = if expected == 0 {
            State::Satisfied
        } else {
            State::Armed(expected)
        };
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn signal(&self) {
        self.state.send_if_modified(|state| match *state {
            State::Armed(1) => {
                *state = State::Satisfied;
                true
            }
            State::Armed(n) => {
                *state = State::Armed(n - 1);
                false
            }
            State::Satisfied | State::Aborted => false,
        });
    }

    pub fn abort(&self) {
        self.state.send_if_modified(|state| match *state {
            State::Armed(_) => {
                *state = State::Aborted;
                true
            }
            State::Satisfied | State::Aborted => false,
        });
    }

    pub fn is_aborted(&self) -> bool {
        *self.state.borrow() == State::Aborted
    }

    /// Waits until satisfied. `None` waits without limit. Dropping the
    /// future stops the wait.
    pub async fn wait(&self, timeout: Option<Duration>) -> Result<(), CorrelatorError> {
        let mut rx = self.state.subscribe();
        let settled = rx.wait_for(|state| !matches!(state, State::Armed(_)));
        let state = match timeout {
            Some(limit) => match tokio::time::timeout(limit, settled).await {
                Ok(result) => result.map(|s| *s),
                Err(_) => return Err(CorrelatorError::Timeout),
            },
            None => settled.await.map(|s| *s),
        };
        match state {
            Ok(State::Satisfied) => Ok(()),
            Ok(_) | Err(_) => Err(CorrelatorError::Aborted),
        }
    }
}
