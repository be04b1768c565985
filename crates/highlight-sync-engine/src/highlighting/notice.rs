use std::time::Duration;

/// How long a notice stays up unless configured otherwise.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The selection could not be turned into offsets; nothing was highlighted.
    SelectionNotFound,
    /// The store rejected or never answered; the local state was kept.
    PersistenceFailed,
}

/// A small, auto-dismissing message shown near the point of interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub ttl: Duration,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            kind,
            message: message.into(),
            ttl,
        }
    }

    pub fn is_expired(&self, elapsed: Duration) -> bool {
        elapsed >= self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_expires_after_ttl() {
        let notice = Notice::new(NoticeKind::PersistenceFailed, "x", Duration::from_secs(2));

        assert!(!notice.is_expired(Duration::from_millis(1999)));
        assert!(notice.is_expired(Duration::from_secs(2)));
    }
}
