use heave_core::io::Sink;
use tokio::sync::broadcast;

/// Fans payloads out to every WebSocket subscriber.
///
/// Sending never blocks. With no subscribers the payload is dropped.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: broadcast::Sender<String>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Sink for ChannelSink {
    fn send(&mut self, payload: &[u8]) {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text.to_owned(),
            Err(err) => {
                tracing::warn!("dropping non-UTF-8 payload: {err}");
                return;
            }
        };
        if self.tx.send(text).is_err() {
            tracing::trace!("no subscribers");
        }
    }
}
