//! Routing of user interrupts for interactive sessions.

use std::sync::{Arc, Mutex};

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

/// A single listener for interrupt signals.
///
/// A signal cancels the turn in flight when there is one. With no turn in
/// flight it fires [`Interrupts::quit`] and the listener stops.
#[derive(Debug, Clone)]
pub struct Interrupts {
    in_flight: Arc<Mutex<Option<CancellationToken>>>,
    quit: CancellationToken,
}

impl Interrupts {
    pub fn spawn<S>(signals: S) -> Self
    where
        S: Stream<Item = ()> + Send + 'static,
    {
        let interrupts = Self {
            in_flight: Arc::default(),
            quit: CancellationToken::new(),
        };

        let handle = interrupts.clone();
        tokio::spawn(async move {
            let mut signals = Box::pin(signals);
            while signals.next().await.is_some() {
                let turn = handle.in_flight.lock().ok().and_then(|mut slot| slot.take());
                match turn {
                    Some(cancel) => cancel.cancel(),
                    None => {
                        handle.quit.cancel();
                        break;
                    }
                }
            }
        });

        interrupts
    }

    /// Listen for ctrl-c for the life of the process.
    pub fn ctrl_c() -> Self {
        Self::spawn(futures::stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok().map(|()| ((), ()))
        }))
    }

    /// Token for a new turn; the next signal cancels it.
    pub fn begin_turn(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = Some(cancel.clone());
        }
        cancel
    }

    pub fn end_turn(&self) {
        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = None;
        }
    }

    /// Fires when a signal arrives while no turn is running.
    pub fn quit(&self) -> &CancellationToken {
        &self.quit
    }
}
