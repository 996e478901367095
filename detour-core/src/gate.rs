//! Latest-request-wins bookkeeping for in-flight operations.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

/// Handle for one issued request.
#[derive(Debug, Clone)]
pub struct Ticket {
    id: u64,
    token: CancellationToken,
}

impl Ticket {
    /// Monotonic request number, starting at 1.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Token cancelled once a newer ticket is issued.
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Issues tickets so that only the newest request of a kind may apply its
/// result. Issuing a ticket cancels the previous one.
///
/// # Examples
/// ```
/// use detour_core::RequestGate;
///
/// let gate = RequestGate::default();
/// let first = gate.issue();
/// let second = gate.issue();
/// assert!(first.token().is_cancelled());
/// assert!(!gate.is_current(&first));
/// assert!(gate.is_current(&second));
/// ```
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
    current: Mutex<CancellationToken>,
}

impl RequestGate {
    /// Issue a new ticket, superseding any outstanding one.
    pub fn issue(&self) -> Ticket {
        let token = CancellationToken::new();
        let (id, previous) = {
            let mut current = self
                .current
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let id = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
            (id, std::mem::replace(&mut *current, token.clone()))
        };
        previous.cancel();
        Ticket { id, token }
    }

    /// Whether `ticket` is still the newest one issued.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.id
    }
}
