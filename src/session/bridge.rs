// SPDX-License-Identifier: GPL-3.0-only

//! Symbology filter between raw metadata batches and the controller
//!
//! The capture backend's metadata surface is generic: a batch can interleave
//! symbologies nobody asked for, and objects whose payload never decoded.
//! The bridge narrows each batch to the first usable match and delivers it
//! to its target as one event. Every batch is handled whole before the next
//! arrives; nothing is buffered across batches, and the one-shot suppression
//! lives in the controller, not here.

use tracing::trace;

use crate::backends::camera::MetadataSink;
use crate::backends::camera::types::{MetadataObject, Symbology};

use super::DetectedCode;

/// Where the bridge delivers its single per-batch event
///
/// Invoked on the capture-processing thread. Targets that mutate shared
/// state must do their own locking.
pub type DetectionTarget = Box<dyn Fn(DetectedCode) + Send + Sync>;

pub struct MetadataDetectionBridge {
    recognized: Vec<Symbology>,
    target: DetectionTarget,
}

impl MetadataDetectionBridge {
    pub fn new(recognized: Vec<Symbology>, target: DetectionTarget) -> Self {
        Self { recognized, target }
    }

    /// First object of a recognized symbology that carries a payload
    fn first_match<'a>(&self, objects: &'a [MetadataObject]) -> Option<&'a MetadataObject> {
        objects.iter().find(|object| {
            self.recognized.contains(&object.symbology) && !object.payload.is_empty()
        })
    }
}

impl MetadataSink for MetadataDetectionBridge {
    fn on_metadata_objects(&self, objects: &[MetadataObject]) {
        let Some(object) = self.first_match(objects) else {
            return;
        };
        trace!(symbology = %object.symbology, "Forwarding detection");
        (self.target)(DetectedCode {
            symbology: object.symbology,
            payload: object.payload.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting_bridge(recognized: Vec<Symbology>) -> (MetadataDetectionBridge, Arc<Mutex<Vec<DetectedCode>>>) {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        let bridge = MetadataDetectionBridge::new(
            recognized,
            Box::new(move |code| sink.lock().unwrap().push(code)),
        );
        (bridge, collected)
    }

    fn object(symbology: Symbology, payload: &str) -> MetadataObject {
        MetadataObject {
            symbology,
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_first_match_in_mixed_batch() {
        let (bridge, collected) = collecting_bridge(vec![Symbology::QrCode]);

        bridge.on_metadata_objects(&[
            object(Symbology::Aztec, "wrong-kind"),
            object(Symbology::QrCode, "first"),
            object(Symbology::QrCode, "second"),
        ]);

        let events = collected.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, "first");
        assert_eq!(events[0].symbology, Symbology::QrCode);
    }

    #[test]
    fn test_unrecognized_symbologies_are_dropped() {
        let (bridge, collected) = collecting_bridge(vec![Symbology::QrCode]);

        bridge.on_metadata_objects(&[
            object(Symbology::Aztec, "a"),
            object(Symbology::Pdf417, "b"),
        ]);

        assert!(collected.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        let (bridge, collected) = collecting_bridge(vec![Symbology::QrCode]);

        bridge.on_metadata_objects(&[
            object(Symbology::QrCode, ""),
            object(Symbology::QrCode, "decoded"),
        ]);

        let events = collected.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, "decoded");
    }

    #[test]
    fn test_empty_batch_is_a_noop() {
        let (bridge, collected) = collecting_bridge(vec![Symbology::QrCode]);
        bridge.on_metadata_objects(&[]);
        assert!(collected.lock().unwrap().is_empty());
    }

    #[test]
    fn test_each_batch_forwards_independently() {
        // The bridge is a stateless filter; run suppression is the
        // controller's job.
        let (bridge, collected) = collecting_bridge(vec![Symbology::QrCode]);

        bridge.on_metadata_objects(&[object(Symbology::QrCode, "one")]);
        bridge.on_metadata_objects(&[object(Symbology::QrCode, "two")]);

        let events = collected.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].payload, "two");
    }
}
