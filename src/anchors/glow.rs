//! File-tree glow
//!
//! Each hint lights the target file at full intensity. `obvious` also
//! lights the listed directories; `unmissable` lights every ancestor, fading
//! with distance. Where hints overlap the brightest wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::bus::{MessageBus, Subscription};
use crate::protocol::{InboundKind, InboundMessage};
use crate::types::advice::{FileTreeHint, GlowStyle};

/// Intensity of the hinted file itself
pub const FILE_INTENSITY: f64 = 1.0;
/// Intensity of directories named by an `obvious` hint
pub const DIRECTORY_INTENSITY: f64 = 0.7;
/// Intensity of the parent directory under `unmissable`
pub const PARENT_INTENSITY: f64 = 0.8;
/// Per-level fade for further ancestors under `unmissable`
pub const ANCESTOR_FADE: f64 = 0.75;

/// Paths lit by one hint, with their intensities
#[must_use]
pub fn glow_for(hint: &FileTreeHint) -> Vec<(String, f64)> {
    let file = hint.file.trim_matches('/').to_string();
    let mut lit = vec![(file.clone(), FILE_INTENSITY)];

    match hint.style.effective() {
        GlowStyle::Subtle | GlowStyle::Unknown => {}
        GlowStyle::Obvious => {
            lit.extend(
                hint.directories
                    .iter()
                    .map(|dir| (dir.trim_matches('/').to_string(), DIRECTORY_INTENSITY)),
            );
        }
        GlowStyle::Unmissable => {
            let mut intensity = PARENT_INTENSITY;
            let mut path = file.as_str();
            while let Some((parent, _)) = path.rsplit_once('/') {
                lit.push((parent.to_string(), intensity));
                intensity *= ANCESTOR_FADE;
                path = parent;
            }
        }
    }
    lit
}

/// Current glow across the file tree
#[derive(Debug, Default)]
pub struct FileTreeGlow {
    intensities: Mutex<BTreeMap<String, f64>>,
}

impl FileTreeGlow {
    /// Create an unlit tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a hint into the current glow
    pub fn apply(&self, hint: &FileTreeHint) {
        let mut intensities = self.intensities.lock();
        for (path, intensity) in glow_for(hint) {
            let entry = intensities.entry(path).or_insert(0.0);
            if intensity > *entry {
                *entry = intensity;
            }
        }
    }

    /// Turn everything off
    pub fn clear(&self) {
        self.intensities.lock().clear();
    }

    /// Intensity of one path, 0.0 when unlit
    #[must_use]
    pub fn intensity(&self, path: &str) -> f64 {
        self.intensities
            .lock()
            .get(path.trim_matches('/'))
            .copied()
            .unwrap_or(0.0)
    }

    /// Every lit path
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.intensities.lock().clone()
    }

    /// Subscribe to file-tree traffic on the bus
    #[must_use]
    pub fn attach(self: &Arc<Self>, bus: &MessageBus) -> Vec<Subscription> {
        let on_hint = Arc::clone(self);
        let on_clear = Arc::clone(self);
        vec![
            bus.on(InboundKind::FileTreeHint, move |message| {
                if let InboundMessage::FileTreeHint(hint) = message {
                    on_hint.apply(hint);
                }
            }),
            bus.on(InboundKind::FileTreeClear, move |_| on_clear.clear()),
        ]
    }
}
