//! Client capability definitions
//!
//! Capability flags advertised in the `session:hello` handshake so the
//! backend only streams what this client can render.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Client capabilities for negotiation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClientCapabilities: u8 {
        /// Renders hint levels locally
        const HINTS = 0b00_0001;
        /// Navigates review batches
        const REVIEW = 0b00_0010;
        /// Sends explain requests
        const EXPLAIN = 0b00_0100;
        /// Shows observer output
        const OBSERVER = 0b00_1000;
        /// Applies editor decorations
        const DECORATIONS = 0b01_0000;
        /// Lights up the file tree
        const FILE_TREE = 0b10_0000;
    }
}

impl ClientCapabilities {
    /// Create capabilities with all features enabled
    #[must_use]
    pub const fn all_features() -> Self {
        Self::all()
    }
}

// Custom serialization to maintain JSON compatibility with boolean fields
impl Serialize for ClientCapabilities {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientCapabilities", 6)?;
        state.serialize_field("hints", &self.contains(Self::HINTS))?;
        state.serialize_field("review", &self.contains(Self::REVIEW))?;
        state.serialize_field("explain", &self.contains(Self::EXPLAIN))?;
        state.serialize_field("observer", &self.contains(Self::OBSERVER))?;
        state.serialize_field("decorations", &self.contains(Self::DECORATIONS))?;
        state.serialize_field("file_tree", &self.contains(Self::FILE_TREE))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ClientCapabilities {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[allow(clippy::struct_excessive_bools)]
        struct Helper {
            #[serde(default)]
            hints: bool,
            #[serde(default)]
            review: bool,
            #[serde(default)]
            explain: bool,
            #[serde(default)]
            observer: bool,
            #[serde(default)]
            decorations: bool,
            #[serde(default)]
            file_tree: bool,
        }

        let h = Helper::deserialize(deserializer)?;
        let mut caps = Self::empty();
        caps.set(Self::HINTS, h.hints);
        caps.set(Self::REVIEW, h.review);
        caps.set(Self::EXPLAIN, h.explain);
        caps.set(Self::OBSERVER, h.observer);
        caps.set(Self::DECORATIONS, h.decorations);
        caps.set(Self::FILE_TREE, h.file_tree);
        Ok(caps)
    }
}
