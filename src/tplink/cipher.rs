//! Autokey XOR codec for the HS110 wire protocol.
//!
//! Every datagram and TCP payload the plugs exchange is obscured with a
//! self-synchronizing XOR stream: each ciphertext byte becomes the key for
//! the next byte, starting from a fixed constant. This is firmware-mandated
//! obfuscation, not cryptography.

/// Initial key byte, fixed by the device firmware.
const INITIAL_KEY: u8 = 0xAB;

/// Ciphers `input` left to right. The key state is local to the call and
/// reset to the initial constant every time, so output is deterministic.
pub fn encrypt(input: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        let ciphered = byte ^ key;
        key = ciphered;
        out.push(ciphered);
    }
    out
}

/// Exact inverse of [`encrypt`]. The key advances on the ciphertext byte,
/// which for position i is the same value encryption advanced on.
pub fn decrypt(input: &[u8]) -> Vec<u8> {
    let mut key = INITIAL_KEY;
    let mut out = Vec::with_capacity(input.len());
    for &byte in input {
        out.push(byte ^ key);
        key = byte;
    }
    out
}
