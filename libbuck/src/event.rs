use crate::cid::Cid;
use crate::path::BuckPath;
use tokio::sync::mpsc;

pub type EventSender = mpsc::UnboundedSender<PathEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PathEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathEventKind {
    PathStart,
    PathComplete,
    FileStart,
    FileProgress,
    FileComplete,
    FileRemoved,
}

#[derive(Debug, Clone)]
pub struct PathEvent {
    pub path: BuckPath,
    pub cid: Cid,
    pub kind: PathEventKind,
    pub size: u64,
    pub progress: u64,
}

impl PathEvent {
    pub fn new(kind: PathEventKind, path: BuckPath) -> Self {
        Self { path, cid: Cid::UNKNOWN, kind, size: 0, progress: 0 }
    }
}

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// engines must never block (or fail) on a missing or lost consumer, so
/// when the caller passed no channel we send into one whose receiver is
/// already gone
pub(crate) fn events_or_drain(events: Option<EventSender>) -> EventSender {
    events.unwrap_or_else(|| channel().0)
}

/// a send to a closed channel just means nobody is watching anymore
pub(crate) fn emit(events: &EventSender, event: PathEvent) {
    let _ = events.send(event);
}

/// bridges a transfer's byte-count channel onto the event stream. The task
/// ends when the transport drops its sender; progress never exceeds `size`.
pub(crate) fn forward_progress(
    events: &EventSender,
    path: BuckPath,
    cid: Cid,
    size: u64,
) -> (crate::remote::ProgressSender, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
    let events = events.clone();
    let handle = tokio::spawn(async move {
        while let Some(up) = rx.recv().await {
            emit(
                &events,
                PathEvent {
                    path: path.clone(),
                    cid,
                    kind: PathEventKind::FileProgress,
                    size,
                    progress: up.min(size),
                },
            );
        }
    });
    (tx, handle)
}
