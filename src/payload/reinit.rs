//! Agent id remapping sent with REINIT.
//!
//! Wire layout: `i32` count followed by `count` pairs of `i32` ids.

use super::{Payload, PayloadKind};
use crate::codec::{Decode, DecodeError, Encode, INT_SIZE, WireReader, WireWriter};

/// Largest number of mappings a [`ReinitMap`] holds.
pub const REINIT_MAP_CAPACITY: usize = 8192;

/// One `from -> to` id mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IdMapping {
    /// Id before the restart.
    pub from: i32,
    /// Id after the restart.
    pub to: i32,
}

impl IdMapping {
    /// Create a mapping.
    #[must_use]
    pub const fn new(from: i32, to: i32) -> Self { Self { from, to } }
}

/// Ordered list of id mappings, at most [`REINIT_MAP_CAPACITY`] long.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReinitMap {
    entries: Vec<IdMapping>,
}

impl ReinitMap {
    /// Build a map from `entries`, keeping only the first
    /// [`REINIT_MAP_CAPACITY`] of them.
    ///
    /// ```
    /// use agentlink::payload::{IdMapping, REINIT_MAP_CAPACITY, ReinitMap};
    ///
    /// let map = ReinitMap::new(vec![IdMapping::new(1, 2); 9000]);
    /// assert_eq!(map.len(), REINIT_MAP_CAPACITY);
    /// ```
    #[must_use]
    pub fn new(mut entries: Vec<IdMapping>) -> Self {
        if entries.len() > REINIT_MAP_CAPACITY {
            tracing::warn!(
                requested = entries.len(),
                capacity = REINIT_MAP_CAPACITY,
                "reinit map truncated to capacity"
            );
            entries.truncate(REINIT_MAP_CAPACITY);
        }
        Self { entries }
    }

    /// Mappings in order.
    #[must_use]
    pub fn entries(&self) -> &[IdMapping] { &self.entries }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Whether the map holds no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl FromIterator<IdMapping> for ReinitMap {
    fn from_iter<I: IntoIterator<Item = IdMapping>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Encode for ReinitMap {
    fn encode(&self, out: &mut WireWriter) {
        // `new` caps the length at REINIT_MAP_CAPACITY, which fits an i32.
        out.put_i32(i32::try_from(self.entries.len()).unwrap_or(i32::MAX));
        for mapping in &self.entries {
            out.put_i32(mapping.from);
            out.put_i32(mapping.to);
        }
    }

    fn wire_size(&self) -> usize { INT_SIZE + 2 * INT_SIZE * self.entries.len() }
}

impl Decode for ReinitMap {
    fn decode(input: &mut WireReader) -> Result<Self, DecodeError> {
        let length = input.get_i32()?;
        let count = usize::try_from(length)
            .ok()
            .filter(|count| *count <= REINIT_MAP_CAPACITY)
            .ok_or(DecodeError::InvalidLength {
                field: "reinit map",
                length: i64::from(length),
                limit: REINIT_MAP_CAPACITY,
            })?;
        let needed = count * 2 * INT_SIZE;
        if input.remaining() < needed {
            return Err(DecodeError::Truncated {
                field: "reinit map",
                needed,
                remaining: input.remaining(),
            });
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            entries.push(IdMapping {
                from: input.get_i32()?,
                to: input.get_i32()?,
            });
        }
        Ok(Self { entries })
    }
}

impl Payload for ReinitMap {
    const KIND: PayloadKind = PayloadKind::ReinitMap;
}
