//! Length framing for the TCP leg of the plug protocol.
//!
//! A frame is a 4-byte big-endian u32 payload length followed by the
//! ciphered payload. Plaintext and ciphertext lengths are equal by
//! construction of the cipher, so the header states both.

use super::cipher;
use tokio::io::{AsyncRead, AsyncReadExt};

const HEADER_LENGTH: usize = 4;

/// Ciphers `payload` and prepends the length header.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LENGTH + payload.len());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&cipher::encrypt(payload));
    out
}

/// Reads exactly 4 header bytes and returns the advertised payload length.
pub async fn read_header<R: AsyncRead + Unpin>(stream: &mut R) -> std::io::Result<u32> {
    let mut header = [0u8; HEADER_LENGTH];
    stream.read_exact(&mut header).await?;
    Ok(u32::from_be_bytes(header))
}

/// Reads exactly `length` payload bytes. A stream socket may deliver them in
/// pieces; `read_exact` loops until all arrive. EOF before that is an error,
/// never a silently truncated buffer.
pub async fn read_payload<R: AsyncRead + Unpin>(
    stream: &mut R,
    length: u32,
) -> std::io::Result<Vec<u8>> {
    let mut payload = vec![0u8; length as usize];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}
