use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Fire-and-forget user notifications.
pub trait NotificationSink {
    fn notify(&mut self, kind: NoticeKind, message: String);
}

/// Collects notices raised while serving one request so the router can attach
/// them to that request's response.
#[derive(Debug, Default)]
pub struct Notices {
    pending: Vec<Notice>,
}

impl Notices {
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}

impl NotificationSink for Notices {
    fn notify(&mut self, kind: NoticeKind, message: String) {
        match kind {
            NoticeKind::Error => tracing::warn!(%message, "notify error"),
            NoticeKind::Warning => tracing::info!(%message, "notify warning"),
            NoticeKind::Success => tracing::debug!(%message, "notify success"),
        }
        self.pending.push(Notice { kind, message });
    }
}
