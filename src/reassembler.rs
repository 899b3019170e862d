use std::ops::Range;

use crate::types::MessageType;

/// Collects the fragments of one handshake message.
///
/// What is still missing is kept as a sorted list of disjoint byte ranges.
/// The message is complete once that list is empty. A zero length message
/// starts with the empty range `0..0` and only completes when an empty
/// fragment at offset 0 arrives.
///
/// Fragments are untrusted. Anything that does not match the message being
/// assembled is ignored without error, so a forged fragment cannot break a
/// message that may still complete from genuine ones.
#[derive(Debug)]
pub struct Reassembler {
    msg_type: MessageType,
    body: Vec<u8>,
    missing: Vec<Range<usize>>,
}

impl Reassembler {
    pub fn new(msg_type: MessageType, length: usize) -> Self {
        Reassembler {
            msg_type,
            body: vec![0; length],
            missing: vec![0..length],
        }
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn total_length(&self) -> usize {
        self.body.len()
    }

    /// Byte ranges not yet received.
    pub fn missing(&self) -> &[Range<usize>] {
        &self.missing
    }

    /// Add the fragment `data[..fragment_length]` at `fragment_offset`.
    pub fn contribute_fragment(
        &mut self,
        msg_type: MessageType,
        length: usize,
        data: &[u8],
        fragment_offset: usize,
        fragment_length: usize,
    ) {
        if msg_type != self.msg_type || length != self.body.len() {
            trace!(
                "Ignore fragment for {:?} len {}, assembling {:?} len {}",
                msg_type,
                length,
                self.msg_type,
                self.body.len()
            );
            return;
        }

        let Some(fragment_end) = fragment_offset.checked_add(fragment_length) else {
            return;
        };
        if fragment_end > length || data.len() < fragment_length {
            trace!(
                "Ignore fragment {}..{} beyond length {}",
                fragment_offset,
                fragment_end,
                length
            );
            return;
        }

        if fragment_length == 0 {
            if fragment_offset == 0 && self.missing.first().is_some_and(|r| r.end == 0) {
                self.missing.remove(0);
            }
            return;
        }

        let mut i = 0;
        while i < self.missing.len() {
            let range = self.missing[i].clone();
            if range.start >= fragment_end {
                break;
            }
            if range.end <= fragment_offset {
                i += 1;
                continue;
            }

            let copy_start = range.start.max(fragment_offset);
            let copy_end = range.end.min(fragment_end);
            self.body[copy_start..copy_end].copy_from_slice(
                &data[copy_start - fragment_offset..copy_end - fragment_offset],
            );

            if copy_start == range.start {
                if copy_end == range.end {
                    self.missing.remove(i);
                    continue;
                }
                self.missing[i].start = copy_end;
            } else {
                self.missing[i].end = copy_start;
                if copy_end != range.end {
                    i += 1;
                    self.missing.insert(i, copy_end..range.end);
                }
            }
            i += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// The assembled body, once every byte has arrived.
    pub fn get_body_if_complete(&self) -> Option<&[u8]> {
        self.is_complete().then_some(&self.body[..])
    }

    /// Consume into the assembled body, once every byte has arrived.
    pub fn into_body(self) -> Option<Vec<u8>> {
        self.is_complete().then_some(self.body)
    }

    /// Forget all received fragments.
    pub fn reset(&mut self) {
        self.missing.clear();
        self.missing.push(0..self.body.len());
    }
}
