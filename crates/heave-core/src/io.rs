// Capability seams to the sensor and the subscribers

use crate::vector::Vec3;
use std::collections::VecDeque;

/// Provides angular velocity samples in rad/s.
pub trait SampleSource {
    /// Whether a fresh sample can be read right now.
    fn ready(&mut self) -> bool;

    /// Read the current sample. Only called after `ready` returned true.
    fn read(&mut self) -> Vec3;
}

/// Fan-out publish channel. Delivery is fire-and-forget.
pub trait Sink {
    fn send(&mut self, payload: &[u8]);
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn ready(&mut self) -> bool {
        (**self).ready()
    }

    fn read(&mut self) -> Vec3 {
        (**self).read()
    }
}

/// Source that replays a fixed script of readings.
///
/// `None` entries report not-ready. Once the script is exhausted the source
/// stays not-ready.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Option<Vec3>>,
    current: Option<Vec3>,
    pub ready_calls: usize,
    pub reads: usize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<Vec3>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// A source that is always ready with the same reading.
    pub fn constant(omega: Vec3, count: usize) -> Self {
        Self::new(std::iter::repeat_n(Some(omega), count))
    }
}

impl SampleSource for ScriptedSource {
    fn ready(&mut self) -> bool {
        self.ready_calls += 1;
        self.current = self.script.pop_front().flatten();
        self.current.is_some()
    }

    fn read(&mut self) -> Vec3 {
        self.reads += 1;
        self.current.take().unwrap_or_default()
    }
}

#[derive(Default, Debug)]
pub struct RecordingSink {
    pub payloads: Vec<Vec<u8>>,
}

impl RecordingSink {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.payloads
            .iter()
            .filter_map(|p| std::str::from_utf8(p).ok())
    }
}

impl Sink for RecordingSink {
    fn send(&mut self, payload: &[u8]) {
        self.payloads.push(payload.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_follows_script() {
        let omega = Vec3::new(0.1, 0.2, 0.3);
        let mut source = ScriptedSource::new([None, Some(omega)]);
        assert!(!source.ready());
        assert!(source.ready());
        assert_eq!(source.read(), omega);
        assert!(!source.ready());
        assert_eq!(source.ready_calls, 3);
        assert_eq!(source.reads, 1);
    }

    #[test]
    fn recording_sink_keeps_payloads() {
        let mut sink = RecordingSink::default();
        sink.send(b"one");
        sink.send(b"two");
        assert_eq!(sink.texts().collect::<Vec<_>>(), ["one", "two"]);
    }
}
