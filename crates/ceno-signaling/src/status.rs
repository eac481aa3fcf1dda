//! Channel status taxonomy and a lock-free view of it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a channel maker stands in the establishment handshake.
///
/// `Syn` is the only sendable status. Every `Failed*` status and `Fatal` are
/// terminal: once reached, the status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChannelStatus {
    Starting = 0,
    WaitingForSyn = 1,
    Syn = 2,
    FailedToGetSignalSsk = 3,
    FailedToSolvePuzzle = 4,
    FailedToPublishKsk = 5,
    FailedToParseSyn = 6,
    Fatal = 7,
}

impl ChannelStatus {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Starting),
            1 => Some(Self::WaitingForSyn),
            2 => Some(Self::Syn),
            3 => Some(Self::FailedToGetSignalSsk),
            4 => Some(Self::FailedToSolvePuzzle),
            5 => Some(Self::FailedToPublishKsk),
            6 => Some(Self::FailedToParseSyn),
            7 => Some(Self::Fatal),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FailedToGetSignalSsk
                | Self::FailedToSolvePuzzle
                | Self::FailedToPublishKsk
                | Self::FailedToParseSyn
                | Self::Fatal
        )
    }

    #[must_use]
    pub const fn can_send(&self) -> bool {
        matches!(self, Self::Syn)
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Starting | Self::WaitingForSyn)
    }

    /// Whether the bridge may already know this client's key, so that an
    /// acknowledgement record is worth probing for.
    #[must_use]
    pub const fn may_have_syn(&self) -> bool {
        matches!(self, Self::WaitingForSyn | Self::Syn)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::WaitingForSyn => "waitingForSyn",
            Self::Syn => "syn",
            Self::FailedToGetSignalSsk => "failedToGetSignalSSK",
            Self::FailedToSolvePuzzle => "failedToSolvePuzzle",
            Self::FailedToPublishKsk => "failedToPublishKSK",
            Self::FailedToParseSyn => "failedToParseSyn",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free view of a channel maker's status.
///
/// Only the owning channel maker writes; clones can be handed to other tasks
/// that want to poll [`is_fatal`](Self::is_fatal) or [`can_send`](Self::can_send).
#[derive(Debug, Clone)]
pub struct StatusHandle(Arc<AtomicU8>);

impl StatusHandle {
    pub(crate) fn new(initial: ChannelStatus) -> Self {
        Self(Arc::new(AtomicU8::new(initial as u8)))
    }

    #[must_use]
    pub fn get(&self) -> ChannelStatus {
        ChannelStatus::from_u8(self.0.load(Ordering::Acquire)).unwrap_or(ChannelStatus::Fatal)
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.get().is_fatal()
    }

    #[must_use]
    pub fn can_send(&self) -> bool {
        self.get().can_send()
    }

    /// Move to `next` unless the current status is terminal.
    ///
    /// Returns the status in effect afterwards.
    pub(crate) fn transition(&self, next: ChannelStatus) -> ChannelStatus {
        let result = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                match ChannelStatus::from_u8(current) {
                    Some(status) if !status.is_fatal() => Some(next as u8),
                    _ => None,
                }
            });
        match result {
            Ok(previous) => {
                if previous != next as u8 {
                    tracing::trace!(
                        from = %ChannelStatus::from_u8(previous).unwrap_or(ChannelStatus::Fatal),
                        to = %next,
                        "channel status transition"
                    );
                }
                next
            }
            Err(current) => ChannelStatus::from_u8(current).unwrap_or(ChannelStatus::Fatal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ChannelStatus; 8] = [
        ChannelStatus::Starting,
        ChannelStatus::WaitingForSyn,
        ChannelStatus::Syn,
        ChannelStatus::FailedToGetSignalSsk,
        ChannelStatus::FailedToSolvePuzzle,
        ChannelStatus::FailedToPublishKsk,
        ChannelStatus::FailedToParseSyn,
        ChannelStatus::Fatal,
    ];

    #[test]
    fn exactly_one_sendable_status() {
        let sendable: Vec<_> = ALL.iter().filter(|s| s.can_send()).collect();
        assert_eq!(sendable, [&ChannelStatus::Syn]);
    }

    #[test]
    fn fatal_transient_and_sendable_partition_the_set() {
        for status in ALL {
            let classes = [status.is_fatal(), status.is_transient(), status.can_send()];
            assert_eq!(
                classes.iter().filter(|c| **c).count(),
                1,
                "{status} must belong to exactly one class"
            );
        }
    }

    #[test]
    fn u8_mapping_is_total_over_variants() {
        for status in ALL {
            assert_eq!(ChannelStatus::from_u8(status as u8), Some(status));
        }
        assert_eq!(ChannelStatus::from_u8(8), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(ChannelStatus::WaitingForSyn.to_string(), "waitingForSyn");
        assert_eq!(
            ChannelStatus::FailedToGetSignalSsk.to_string(),
            "failedToGetSignalSSK"
        );
        assert_eq!(
            ChannelStatus::FailedToPublishKsk.to_string(),
            "failedToPublishKSK"
        );
    }

    #[test]
    fn handle_transitions_until_fatal() {
        let handle = StatusHandle::new(ChannelStatus::Starting);
        assert_eq!(
            handle.transition(ChannelStatus::WaitingForSyn),
            ChannelStatus::WaitingForSyn
        );
        assert_eq!(handle.transition(ChannelStatus::Syn), ChannelStatus::Syn);
        assert!(handle.can_send());

        assert_eq!(
            handle.transition(ChannelStatus::FailedToParseSyn),
            ChannelStatus::FailedToParseSyn
        );
        assert_eq!(
            handle.transition(ChannelStatus::Syn),
            ChannelStatus::FailedToParseSyn
        );
        assert!(handle.is_fatal());
        assert!(!handle.can_send());
    }

    #[test]
    fn clones_observe_transitions() {
        let handle = StatusHandle::new(ChannelStatus::Starting);
        let observer = handle.clone();
        handle.transition(ChannelStatus::Syn);
        assert!(observer.can_send());
    }
}
