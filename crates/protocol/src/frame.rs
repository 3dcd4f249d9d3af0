//! Length-prefixed framing.
//!
//! Every message on the channel is a 4-byte big-endian length followed by that
//! many payload bytes. The helper side writes the prefix as a Java-style
//! signed int, so lengths above `i32::MAX` never occur in valid traffic.

/// Size of the length prefix.
pub const FRAME_HEADER_LEN: usize = 4;

/// Largest payload accepted in either direction.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Encodes the length prefix for a payload of `len` bytes.
///
/// Returns `None` when the payload exceeds [`MAX_FRAME_LEN`].
pub fn encode_header(len: usize) -> Option<[u8; FRAME_HEADER_LEN]> {
	let len = u32::try_from(len).ok().filter(|len| *len <= MAX_FRAME_LEN)?;
	Some(len.to_be_bytes())
}

/// Decodes a received length prefix, rejecting oversized frames.
pub fn decode_header(header: [u8; FRAME_HEADER_LEN]) -> Result<usize, u32> {
	let len = u32::from_be_bytes(header);
	if len > MAX_FRAME_LEN {
		return Err(len);
	}
	Ok(len as usize)
}
