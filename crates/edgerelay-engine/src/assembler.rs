//! Sequence assembly.
//!
//! Splits one validated envelope into its ordered list of atomic messages,
//! all stamped with the same freshly generated sequence id.

use edgerelay_core::{Envelope, Message};

/// Build one [`Message`] per command in the envelope, in order.
///
/// An envelope with no commands yields an empty queue; the caller skips
/// dispatch entirely and treats the envelope as a no-op.
pub fn unpack(envelope: &Envelope, sequence_id: &str) -> Vec<Message> {
    envelope
        .cmd
        .iter()
        .zip(envelope.args.iter())
        .map(|(command, args)| Message::new(sequence_id, command.clone(), args.clone()))
        .collect()
}
