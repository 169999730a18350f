use std::fmt;
use std::mem;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tokio::time::{timeout_at, Instant};
use zeroize::Zeroizing;

use crate::crypto::shamir::{MAX_SHARES, MIN_THRESHOLD};
use crate::crypto::{split, Secret, SecretError, ShamirError};
use crate::error::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    #[error("threshold must be between {MIN_THRESHOLD} and {MAX_SHARES}, got {0}")]
    InvalidThreshold(usize),
    #[error("threshold mismatch: ceremony uses {expected}, got {got}")]
    ThresholdMismatch { expected: u8, got: usize },
    #[error("ceremony already has {MAX_SHARES} recipients")]
    TooManyRecipients,
    #[error("no generation ceremony in progress")]
    NoCeremony,
    #[error("{recipients} recipients cannot satisfy threshold {threshold}")]
    TooFewRecipients { recipients: usize, threshold: u8 },
    #[error(transparent)]
    Shamir(#[from] ShamirError),
    #[error(transparent)]
    Secret(#[from] SecretError),
}

impl CeremonyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CeremonyError::InvalidThreshold(_) | CeremonyError::ThresholdMismatch { .. } => {
                ErrorKind::Validation
            }
            CeremonyError::TooManyRecipients
            | CeremonyError::NoCeremony
            | CeremonyError::TooFewRecipients { .. } => ErrorKind::Conflict,
            CeremonyError::Shamir(e) => e.kind(),
            CeremonyError::Secret(e) => e.kind(),
        }
    }
}

/// How long recipients get to confirm they passed their share on
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(30);

/// One share on its way to one recipient.
///
/// The recipient must call [`ShareDelivery::acknowledge`] once the share has
/// actually left its hands (written to the socket, say). Dropping the
/// delivery instead counts it as lost.
pub struct ShareDelivery {
    share: Zeroizing<Vec<u8>>,
    ack: oneshot::Sender<()>,
}

impl fmt::Debug for ShareDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareDelivery(..)")
    }
}

impl ShareDelivery {
    pub fn share(&self) -> &[u8] {
        &self.share
    }

    /// Confirm the share reached its recipient
    pub fn acknowledge(self) {
        let _ = self.ack.send(());
    }
}

/// Outcome of handing out a freshly minted master secret
pub struct Distribution {
    pub secret: Secret,
    pub threshold: u8,
    pub recipients: usize,
    /// Recipients that acknowledged their share
    pub delivered: usize,
}

#[derive(Default)]
struct Pending {
    threshold: Option<u8>,
    recipients: Vec<flume::Sender<ShareDelivery>>,
}

impl Pending {
    /// Forget recipients whose receiving end has gone away
    fn prune(&mut self) {
        self.recipients.retain(|recipient| !recipient.is_disconnected());
        if self.recipients.is_empty() {
            self.threshold = None;
        }
    }
}

/// Collects the parties waiting for a share of a new master secret
pub struct GenerationCeremony {
    pending: Mutex<Pending>,
    ack_timeout: Duration,
}

impl Default for GenerationCeremony {
    fn default() -> Self {
        Self::with_ack_timeout(DEFAULT_ACK_TIMEOUT)
    }
}

impl GenerationCeremony {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ack_timeout(ack_timeout: Duration) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            ack_timeout,
        }
    }

    /// Register a recipient for the next distribution.
    ///
    /// The first recipient fixes the threshold; later ones must agree with it.
    /// The returned receiver yields exactly one share, or disconnects if the
    /// ceremony is aborted.
    pub async fn register(
        &self,
        threshold: usize,
    ) -> Result<flume::Receiver<ShareDelivery>, CeremonyError> {
        if !(MIN_THRESHOLD..=MAX_SHARES).contains(&threshold) {
            return Err(CeremonyError::InvalidThreshold(threshold));
        }

        let mut pending = self.pending.lock().await;
        pending.prune();
        match pending.threshold {
            Some(expected) if usize::from(expected) != threshold => {
                return Err(CeremonyError::ThresholdMismatch {
                    expected,
                    got: threshold,
                });
            }
            _ => {}
        }
        if pending.recipients.len() >= MAX_SHARES {
            return Err(CeremonyError::TooManyRecipients);
        }

        let (sender, receiver) = flume::bounded(1);
        pending.threshold = Some(threshold as u8);
        pending.recipients.push(sender);
        tracing::debug!(
            threshold,
            recipients = pending.recipients.len(),
            "registered share recipient"
        );
        Ok(receiver)
    }

    /// Live recipient count and the agreed threshold
    pub async fn pending(&self) -> (usize, Option<u8>) {
        let mut pending = self.pending.lock().await;
        pending.prune();
        (pending.recipients.len(), pending.threshold)
    }

    /// Drop every registered recipient, disconnecting their receivers
    pub async fn abort(&self) -> usize {
        let mut pending = self.pending.lock().await;
        let dropped = pending.recipients.len();
        *pending = Pending::default();
        dropped
    }

    /// Mint a random master secret, split it between every registered
    /// recipient and hand one share to each.
    ///
    /// Only shares acknowledged within the ack timeout count as delivered.
    /// A recipient that has gone away, or never confirms, is logged and
    /// skipped. The recipient list is cleared either way.
    pub async fn distribute(&self) -> Result<Distribution, CeremonyError> {
        let (recipients, threshold) = {
            let mut pending = self.pending.lock().await;
            pending.prune();
            let threshold = pending.threshold.ok_or(CeremonyError::NoCeremony)?;
            if pending.recipients.len() < usize::from(threshold) {
                return Err(CeremonyError::TooFewRecipients {
                    recipients: pending.recipients.len(),
                    threshold,
                });
            }
            pending.threshold = None;
            (mem::take(&mut pending.recipients), threshold)
        };

        let secret = Secret::generate()?;
        let total = recipients.len();
        let shares = split(secret.bytes(), total, usize::from(threshold))?;

        let mut acks = Vec::with_capacity(total);
        for (idx, (recipient, share)) in recipients.iter().zip(shares).enumerate() {
            let (ack, acked) = oneshot::channel();
            let delivery = ShareDelivery {
                share: Zeroizing::new(share),
                ack,
            };
            match recipient.try_send(delivery) {
                Ok(()) => acks.push((idx, acked)),
                Err(e) => tracing::warn!(recipient = idx, "failed to hand over share: {e}"),
            }
        }
        drop(recipients);

        let deadline = Instant::now() + self.ack_timeout;
        let mut delivered = 0;
        for (idx, acked) in acks {
            match timeout_at(deadline, acked).await {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(_)) => tracing::warn!(recipient = idx, "share was lost in transit"),
                Err(_) => tracing::warn!(recipient = idx, "share was not acknowledged in time"),
            }
        }

        tracing::info!(
            threshold,
            recipients = total,
            delivered,
            "distributed new master secret"
        );
        Ok(Distribution {
            secret,
            threshold,
            recipients: total,
            delivered,
        })
    }
}
