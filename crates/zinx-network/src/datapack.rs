//! Length-prefixed framing codec.
//!
//! Wire format (little-endian):
//!
//! ```text
//! offset  width  field
//! 0       4      data_len
//! 4       4      msg_id
//! 8       n      data
//! ```
//!
//! `DataPack` is stateless; the only configuration it carries is the
//! `max_package_size` ceiling used to reject oversize frames before the
//! caller wastes a read on a payload it will have to discard anyway.

use crate::error::FramingError;

/// Size in bytes of the fixed header (`data_len` + `msg_id`).
pub const HEAD_LEN: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct DataPack {
    max_package_size: u32,
}

impl DataPack {
    pub fn new(max_package_size: u32) -> Self {
        Self { max_package_size }
    }

    pub const fn head_len(&self) -> usize {
        HEAD_LEN
    }

    /// Serializes `msg_id` and `data` into a single frame: header followed
    /// by payload.
    pub fn pack(&self, msg_id: u32, data: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEAD_LEN + data.len());
        buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&msg_id.to_le_bytes());
        buf.extend_from_slice(data);
        buf
    }

    /// Decodes an 8-byte header into a header-only `Message` (its `data` is
    /// empty; the caller reads exactly `data_len` further bytes off the
    /// stream and assigns them separately).
    ///
    /// Does not validate `msg_id` — an unknown id is a routing concern, not
    /// a framing one.
    pub fn unpack(&self, header: &[u8]) -> Result<crate::message::Message, FramingError> {
        debug_assert_eq!(header.len(), HEAD_LEN);
        let data_len = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let msg_id = u32::from_le_bytes(header[4..8].try_into().unwrap());

        if self.max_package_size > 0 && data_len > self.max_package_size {
            return Err(FramingError::MessageTooLarge { data_len, max: self.max_package_size });
        }

        Ok(crate::message::Message::header_only(msg_id, data_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mirrors the reference `TestDataPack` scenario: two packed messages,
    /// "hello" and "world!!", read back bit-exactly.
    #[test]
    fn round_trip_two_coalesced_messages() {
        let dp = DataPack::new(4096);
        let mut stream = dp.pack(1, b"hello");
        stream.extend(dp.pack(2, b"world!!"));

        let cursor = &stream[..];

        let (head1, rest) = cursor.split_at(HEAD_LEN);
        let msg1 = dp.unpack(head1).unwrap();
        let (payload1, rest) = rest.split_at(msg1.data_len() as usize);
        assert_eq!(msg1.msg_id(), 1);
        assert_eq!(payload1, b"hello");

        let (head2, rest) = rest.split_at(HEAD_LEN);
        let msg2 = dp.unpack(head2).unwrap();
        let (payload2, rest) = rest.split_at(msg2.data_len() as usize);
        assert_eq!(msg2.msg_id(), 2);
        assert_eq!(payload2, b"world!!");
        assert!(rest.is_empty());
    }

    #[test]
    fn empty_payload_round_trips() {
        let dp = DataPack::new(4096);
        let framed = dp.pack(9, &[]);
        let msg = dp.unpack(&framed[..HEAD_LEN]).unwrap();
        assert_eq!(msg.msg_id(), 9);
        assert_eq!(msg.data_len(), 0);
    }

    #[test]
    fn oversize_header_is_rejected() {
        let dp = DataPack::new(4096);
        let mut header = [0u8; HEAD_LEN];
        header[0..4].copy_from_slice(&5000u32.to_le_bytes());
        header[4..8].copy_from_slice(&1u32.to_le_bytes());

        let err = dp.unpack(&header).unwrap_err();
        assert!(matches!(
            err,
            FramingError::MessageTooLarge { data_len: 5000, max: 4096 }
        ));
    }

    #[test]
    fn zero_max_package_size_disables_the_check() {
        let dp = DataPack::new(0);
        let mut header = [0u8; HEAD_LEN];
        header[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(dp.unpack(&header).is_ok());
    }
}
