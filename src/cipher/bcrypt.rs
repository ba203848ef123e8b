//! The Bcrypt-style key schedule: password and salt are folded into the
//! subkeys and S-boxes by repeatedly re-encrypting the cipher's own state
//! with itself, `2^cost` times.

use crate::cipher::blowfish::{run_rounds, BlowFish};
use crate::cipher::feistel::Matrix;

/// Draw the next little-endian 32-bit word from `data`, indexed modulo
/// `data.len()` starting at `*cursor`, and advance `*cursor` by 4. Reading
/// from an empty slice always yields zero without moving the cursor.
///
/// `cursor` is shared across every call made during one [`bcrypt`]
/// derivation — it is never reset between the initial expansion and any
/// cost-loop iteration, only the slice it indexes into changes.
fn next_u32(cursor: &mut usize, data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    let mut bytes = [0u8; 4];
    for b in bytes.iter_mut() {
        *b = data[*cursor % data.len()];
        *cursor = cursor.wrapping_add(1);
    }
    u32::from_le_bytes(bytes)
}

/// XOR every subkey, in order, with successive 32-bit words drawn from
/// `material` at the shared cursor position. No encryption: this is the
/// plain mixing step applied before `expand_keys`/`expand_boxes` run.
fn xor_subkeys(subkeys: &mut [u32], material: &[u8], cursor: &mut usize) {
    for k in subkeys.iter_mut() {
        *k ^= next_u32(cursor, material);
    }
}

/// XOR the running block with the next pair of words from `salt` (a no-op
/// if `salt` is empty), then re-encrypt it under the cipher's current
/// (still-mutating) state.
fn advance_block(cursor: &mut usize, salt: &[u8], matrix: &Matrix, subkeys: &[u32], l: &mut u32, r: &mut u32) {
    *l ^= next_u32(cursor, salt);
    *r ^= next_u32(cursor, salt);
    let (nl, nr) = run_rounds(matrix, subkeys, *l, *r, 32);
    *l = nl;
    *r = nr;
}

/// Walk the subkey array in pairs, overwriting each with the output of
/// [`advance_block`]. `salt` is empty during the cost loop's bare rounds,
/// which leaves the shared cursor untouched for that call.
fn expand_keys(subkeys: &mut [u32], matrix: &Matrix, cursor: &mut usize, salt: &[u8], l: &mut u32, r: &mut u32) {
    let mut i = 0;
    while i < subkeys.len() {
        advance_block(cursor, salt, matrix, subkeys, l, r);
        subkeys[i] = *l;
        subkeys[i + 1] = *r;
        i += 2;
    }
}

/// Same procedure as [`expand_keys`], continued across all 1024 S-box
/// entries.
fn expand_boxes(matrix: &mut Matrix, subkeys: &[u32], cursor: &mut usize, salt: &[u8], l: &mut u32, r: &mut u32) {
    for box_idx in 0..matrix.s.len() {
        let mut j = 0;
        while j < matrix.s[box_idx].len() {
            advance_block(cursor, salt, matrix, subkeys, l, r);
            matrix.s[box_idx][j] = *l;
            matrix.s[box_idx][j + 1] = *r;
            j += 2;
        }
    }
}

/// Derive a cipher from a password and salt, applying `cost` extra
/// stretching rounds beyond the initial expansion.
///
/// One cursor (kept on the returned cipher as [`BlowFish::salt_cursor`])
/// threads through the entire derivation: the initial `xor_subkeys`/
/// `expand_keys`/`expand_boxes` pass and every cost-loop iteration all
/// advance the same position, only switching which of `password`/`salt`/
/// nothing they read modulo. It is never rewound mid-call.
pub fn bcrypt(password: &[u8], salt: &[u8], cost: u32) -> BlowFish {
    let mut cipher = BlowFish::canonical();
    let mut matrix = cipher.matrix.get().clone();
    let mut cursor = 0usize;
    let (mut l, mut r) = (0u32, 0u32);

    xor_subkeys(&mut cipher.subkeys, password, &mut cursor);
    expand_keys(&mut cipher.subkeys, &matrix, &mut cursor, salt, &mut l, &mut r);
    expand_boxes(&mut matrix, &cipher.subkeys, &mut cursor, salt, &mut l, &mut r);

    for _ in 0..cost {
        xor_subkeys(&mut cipher.subkeys, password, &mut cursor);
        expand_keys(&mut cipher.subkeys, &matrix, &mut cursor, &[], &mut l, &mut r);
        expand_boxes(&mut matrix, &cipher.subkeys, &mut cursor, &[], &mut l, &mut r);

        xor_subkeys(&mut cipher.subkeys, salt, &mut cursor);
        expand_keys(&mut cipher.subkeys, &matrix, &mut cursor, &[], &mut l, &mut r);
        expand_boxes(&mut matrix, &cipher.subkeys, &mut cursor, &[], &mut l, &mut r);
    }

    cipher.matrix = crate::cipher::feistel::FeistelBox::from_matrix(matrix);
    cipher.salt_cursor = cursor;
    cipher
}
