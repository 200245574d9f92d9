//! Correlation identifiers for request/reply matching.
//!
//! Requests that expect a reply are stamped with a non-zero 8-bit identifier
//! in the header tag byte. Responders copy the tag of the request into the
//! reply. Tag `0` marks an uncorrelated frame, as sent by peers that predate
//! correlation; such replies are matched on their command code alone.

use crate::frame::Frame;

/// Access and mutate correlation identifiers on frames.
pub trait CorrelatableFrame {
    /// Return the correlation identifier of this frame, if any.
    fn correlation_id(&self) -> Option<u8>;

    /// Set or clear the correlation identifier.
    fn set_correlation_id(&mut self, correlation_id: Option<u8>);
}

impl CorrelatableFrame for Frame {
    fn correlation_id(&self) -> Option<u8> { (self.tag() != 0).then_some(self.tag()) }

    fn set_correlation_id(&mut self, correlation_id: Option<u8>) {
        self.set_tag(correlation_id.unwrap_or(0));
    }
}

/// Source of correlation identifiers for one connection.
///
/// Identifiers start at 1, wrap after 255 and never take the value 0.
///
/// ```
/// use agentlink::correlation::CorrelationGenerator;
///
/// let mut ids = CorrelationGenerator::default();
/// assert_eq!(ids.next_id(), 1);
/// assert_eq!(ids.next_id(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct CorrelationGenerator {
    next: u8,
}

impl Default for CorrelationGenerator {
    fn default() -> Self { Self { next: 1 } }
}

impl CorrelationGenerator {
    /// Return the next identifier.
    pub fn next_id(&mut self) -> u8 {
        let id = self.next;
        self.next = match self.next.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        id
    }
}

/// Whether a reply tagged `received` answers a request tagged `expected`.
#[must_use]
pub const fn reply_matches(expected: u8, received: u8) -> bool {
    received == 0 || received == expected
}
