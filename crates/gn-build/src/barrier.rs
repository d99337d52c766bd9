//! Single-shot readiness barrier

use std::time::SystemTime;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    /// Open, carrying the instant merged artifacts are stamped with
    Open(SystemTime),
    Cancelled,
}

/// The barrier was cancelled instead of opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Signals that the target GOROOT exists.
///
/// Resolves exactly once, to either open or cancelled; later calls are
/// ignored. Dropping an unresolved barrier cancels it, so waiters can never
/// be stranded.
#[derive(Debug)]
pub struct ReadinessBarrier {
    tx: watch::Sender<State>,
}

impl ReadinessBarrier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(State::Pending);
        Self { tx }
    }

    pub fn waiter(&self) -> BarrierWaiter {
        BarrierWaiter {
            rx: self.tx.subscribe(),
        }
    }

    /// Release every waiter with `instant`. Returns false if already resolved.
    pub fn open(&self, instant: SystemTime) -> bool {
        self.resolve(State::Open(instant))
    }

    /// Release every waiter with [`Cancelled`]. Returns false if already resolved.
    pub fn cancel(&self) -> bool {
        self.resolve(State::Cancelled)
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.tx.borrow(), State::Open(_))
    }

    fn resolve(&self, to: State) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == State::Pending {
                *state = to;
                true
            } else {
                false
            }
        })
    }
}

impl Default for ReadinessBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReadinessBarrier {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// One task's handle on a [`ReadinessBarrier`]
#[derive(Debug, Clone)]
pub struct BarrierWaiter {
    rx: watch::Receiver<State>,
}

impl BarrierWaiter {
    /// Wait until the barrier resolves.
    pub async fn wait(&mut self) -> Result<SystemTime, Cancelled> {
        match self.rx.wait_for(|state| *state != State::Pending).await {
            Ok(state) => match *state {
                State::Open(instant) => Ok(instant),
                _ => Err(Cancelled),
            },
            Err(_) => Err(Cancelled),
        }
    }
}
