//! Keyed block mixing primitive used by the token deriver
//!
//! This is the gate server's AES-128-derived construction, reimplemented
//! round for round. It is not usable as general-purpose encryption: the key
//! schedule is computed on the fly while the rounds run, `Forward` walks the
//! schedule from the last round key back to the first, and the two modes are
//! applied by the protocol as independent one-way mixing passes over
//! unrelated blocks. The server validates the result byte for byte, so the
//! round ordering here must not be "corrected" toward standard AES.

use crate::constants::{BLOCK_SIZE, INVERSE_S_BOX, KEY_SIZE, RCON, S_BOX};
use crate::error::GateError;

/// Direction of the mixing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherMode {
    Forward,
    Inverse,
}

/// Mix a 16-byte `state` under a 16-byte `key`.
///
/// Both operands must be exactly 16 bytes; anything else fails with
/// [`GateError::InvalidBlockLength`]. The caller's buffers are never
/// mutated; the rounds run on private copies (the key copy is consumed by
/// the incremental schedule).
pub fn mix_block(state: &[u8], key: &[u8], mode: CipherMode) -> Result<[u8; BLOCK_SIZE], GateError> {
    let mut state: [u8; BLOCK_SIZE] = state
        .try_into()
        .map_err(|_| GateError::InvalidBlockLength(state.len()))?;
    let mut key: [u8; KEY_SIZE] = key
        .try_into()
        .map_err(|_| GateError::InvalidBlockLength(key.len()))?;

    match mode {
        CipherMode::Forward => forward(&mut state, &mut key),
        CipherMode::Inverse => inverse(&mut state, &mut key),
    }

    Ok(state)
}

/// Doubling in GF(2^8) with reduction constant 0x1B.
#[inline]
fn gmul2(value: u8) -> u8 {
    if value & 0x80 != 0 {
        (value << 1) ^ 0x1b
    } else {
        value << 1
    }
}

/// Advance the key schedule by one round.
///
/// Bytes 0..4 take the substituted, rotated tail of the previous round key
/// (13, 14, 15, 12 in that order, round constant folded into byte 0 only),
/// then the change propagates through bytes 4..16 by XOR with the byte four
/// positions earlier.
fn advance_key(key: &mut [u8; KEY_SIZE], rcon: u8) {
    key[0] ^= S_BOX[key[13] as usize] ^ rcon;
    key[1] ^= S_BOX[key[14] as usize];
    key[2] ^= S_BOX[key[15] as usize];
    key[3] ^= S_BOX[key[12] as usize];
    for i in 4..KEY_SIZE {
        key[i] ^= key[i - 4];
    }
}

/// Step the key schedule back by one round: undo the tail propagation in
/// reverse order, then undo the substituted head.
fn rewind_key(key: &mut [u8; KEY_SIZE], rcon: u8) {
    for i in (4..KEY_SIZE).rev() {
        key[i] ^= key[i - 4];
    }
    key[0] ^= S_BOX[key[13] as usize] ^ rcon;
    key[1] ^= S_BOX[key[14] as usize];
    key[2] ^= S_BOX[key[15] as usize];
    key[3] ^= S_BOX[key[12] as usize];
}

/// Rotate the four byte rows by {0, 1, 2, 3} positions.
fn rotate_rows(state: &mut [u8; BLOCK_SIZE]) {
    let b = state[1];
    state[1] = state[5];
    state[5] = state[9];
    state[9] = state[13];
    state[13] = b;

    let (b, c) = (state[2], state[6]);
    state[2] = state[10];
    state[6] = state[14];
    state[10] = b;
    state[14] = c;

    let b = state[15];
    state[15] = state[11];
    state[11] = state[7];
    state[7] = state[3];
    state[3] = b;
}

/// Rotate the four byte rows in the opposite direction.
fn unrotate_rows(state: &mut [u8; BLOCK_SIZE]) {
    let b = state[13];
    state[13] = state[9];
    state[9] = state[5];
    state[5] = state[1];
    state[1] = b;

    let (b, c) = (state[10], state[14]);
    state[10] = state[2];
    state[14] = state[6];
    state[2] = b;
    state[6] = c;

    let b = state[3];
    state[3] = state[7];
    state[7] = state[11];
    state[11] = state[15];
    state[15] = b;
}

/// Diffusion step over one 4-byte column.
fn mix_column(state: &mut [u8; BLOCK_SIZE], col: usize) {
    let b = col << 2;
    let all = state[b] ^ state[b + 1] ^ state[b + 2] ^ state[b + 3];
    let first = state[b];
    state[b] ^= gmul2(state[b] ^ state[b + 1]) ^ all;
    state[b + 1] ^= gmul2(state[b + 1] ^ state[b + 2]) ^ all;
    state[b + 2] ^= gmul2(state[b + 2] ^ state[b + 3]) ^ all;
    state[b + 3] ^= gmul2(state[b + 3] ^ first) ^ all;
}

/// Pre-conditioning applied to one column before [`mix_column`] in forward
/// mode only: fold in the doubly-doubled cross terms.
fn precondition_column(state: &mut [u8; BLOCK_SIZE], col: usize) {
    let b = col << 2;
    let d0 = gmul2(gmul2(state[b] ^ state[b + 2]));
    let d1 = gmul2(gmul2(state[b + 1] ^ state[b + 3]));
    state[b] ^= d0;
    state[b + 1] ^= d1;
    state[b + 2] ^= d0;
    state[b + 3] ^= d1;
}

/// Forward pass: advance the schedule through all ten round constants, fold
/// the resulting round key into the state, then run ten rounds that walk the
/// schedule backward. Column mixing is skipped on round 0.
fn forward(state: &mut [u8; BLOCK_SIZE], key: &mut [u8; KEY_SIZE]) {
    for &rcon in &RCON {
        advance_key(key, rcon);
    }
    for i in 0..BLOCK_SIZE {
        state[i] ^= key[i];
    }

    for rnd in 0..10 {
        rewind_key(key, RCON[9 - rnd]);

        if rnd > 0 {
            for col in 0..4 {
                precondition_column(state, col);
                mix_column(state, col);
            }
        }

        unrotate_rows(state);
        for i in 0..BLOCK_SIZE {
            state[i] = INVERSE_S_BOX[state[i] as usize] ^ key[i];
        }
    }
}

/// Inverse pass: ten rounds of combined round-key XOR and substitution, row
/// rotation, and column mixing (skipped on round 9), the schedule advancing
/// after each round, with a final round-key XOR at the end.
fn inverse(state: &mut [u8; BLOCK_SIZE], key: &mut [u8; KEY_SIZE]) {
    for rnd in 0..10 {
        for i in 0..BLOCK_SIZE {
            state[i] = S_BOX[(state[i] ^ key[i]) as usize];
        }
        rotate_rows(state);

        if rnd < 9 {
            for col in 0..4 {
                mix_column(state, col);
            }
        }

        advance_key(key, RCON[rnd]);
    }

    for i in 0..BLOCK_SIZE {
        state[i] ^= key[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gmul2() {
        assert_eq!(gmul2(0x00), 0x00);
        assert_eq!(gmul2(0x01), 0x02);
        assert_eq!(gmul2(0x7f), 0xfe);
        assert_eq!(gmul2(0x80), 0x1b);
        assert_eq!(gmul2(0xff), 0xe5);
    }

    #[test]
    fn test_rejects_short_state() {
        let err = mix_block(&[0u8; 15], &[0u8; 16], CipherMode::Forward).unwrap_err();
        assert!(matches!(err, GateError::InvalidBlockLength(15)));
    }

    #[test]
    fn test_rejects_long_key() {
        let err = mix_block(&[0u8; 16], &[0u8; 17], CipherMode::Inverse).unwrap_err();
        assert!(matches!(err, GateError::InvalidBlockLength(17)));
    }

    #[test]
    fn test_inputs_not_mutated() {
        let state = [0x42u8; 16];
        let key = [0x17u8; 16];
        let out = mix_block(&state, &key, CipherMode::Forward).unwrap();
        assert_ne!(out, state);
        assert_eq!(state, [0x42u8; 16]);
        assert_eq!(key, [0x17u8; 16]);
    }

    #[test]
    fn test_deterministic() {
        let state: Vec<u8> = (0..16).collect();
        let key: Vec<u8> = (16..32).collect();
        let a = mix_block(&state, &key, CipherMode::Inverse).unwrap();
        let b = mix_block(&state, &key, CipherMode::Inverse).unwrap();
        assert_eq!(a, b);
    }

    // Known-answer vectors captured from a trusted run of the reference
    // routine. These pin the exact round ordering; a standard AES library
    // would not reproduce the Forward values.

    #[test]
    fn test_forward_vector() {
        let state: Vec<u8> = (0..16).collect();
        let key: Vec<u8> = (16..32).collect();
        let out = mix_block(&state, &key, CipherMode::Forward).unwrap();
        assert_eq!(hex::encode(out), "5be480de16c2a7e3a50457a1b2962804");
    }

    #[test]
    fn test_inverse_vector() {
        let state: Vec<u8> = (0..16).collect();
        let key: Vec<u8> = (16..32).collect();
        let out = mix_block(&state, &key, CipherMode::Inverse).unwrap();
        assert_eq!(hex::encode(out), "9c54d571702cfa0f03f36215676bab78");
    }

    #[test]
    fn test_zero_vectors() {
        let zero = [0u8; 16];
        let fwd = mix_block(&zero, &zero, CipherMode::Forward).unwrap();
        let inv = mix_block(&zero, &zero, CipherMode::Inverse).unwrap();
        assert_eq!(hex::encode(fwd), "140f0f1011b5223d79587717ffd9ec3a");
        assert_eq!(hex::encode(inv), "66e94bd4ef8a2c3b884cfa59ca342b2e");
    }
}
