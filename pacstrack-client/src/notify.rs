//! User-facing notifications (summary alerts, warnings, failures).

use std::fmt;
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            f.write_str(&self.title)
        } else {
            write!(f, "{}: {}", self.title, self.body)
        }
    }
}

/// Sending half of the notification stream. Notices sent after the receiver
/// is gone are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A notifier nobody listens to.
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn info(&self, title: impl Into<String>, body: impl Into<String>) {
        self.send(NoticeLevel::Info, title.into(), body.into());
    }

    pub fn warn(&self, title: impl Into<String>, body: impl Into<String>) {
        self.send(NoticeLevel::Warning, title.into(), body.into());
    }

    pub fn error(&self, title: impl Into<String>, body: impl Into<String>) {
        self.send(NoticeLevel::Error, title.into(), body.into());
    }

    fn send(&self, level: NoticeLevel, title: String, body: String) {
        if self.tx.send(Notice { level, title, body }).is_err() {
            trace!("notice dropped, no listener");
        }
    }
}

/// Drain everything queued so far without waiting.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}
