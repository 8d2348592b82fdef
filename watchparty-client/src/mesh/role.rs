use crate::link::LinkRole;
use std::cmp::Ordering;
use watchparty_core::ParticipantId;

/// Decides which side of a pair sends the offer. Both sides compute the same
/// answer from the ids alone: the smaller id initiates. `None` when the ids
/// are equal, which only happens for a malformed membership.
pub fn elect(local: &ParticipantId, remote: &ParticipantId) -> Option<LinkRole> {
    match local.cmp(remote) {
        Ordering::Less => Some(LinkRole::Initiator),
        Ordering::Greater => Some(LinkRole::Responder),
        Ordering::Equal => None,
    }
}
