//! Program image decoding.
//!
//! An image is a flat sequence of little-endian unsigned 16-bit words, loaded
//! from address 0. Words are kept raw; out-of-range operand values are dealt
//! with when the machine resolves them.

use crate::error::ImageError;
use crate::MEMORY_SIZE;
use std::fs;
use std::path::Path;

pub fn decode(bytes: &[u8]) -> Result<Vec<u16>, ImageError> {
    if bytes.len() % 2 != 0 {
        return Err(ImageError::OddLength(bytes.len()));
    }
    let words = bytes.len() / 2;
    if words > MEMORY_SIZE {
        return Err(ImageError::TooLarge(words));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<u16>, ImageError> {
    let bytes = fs::read(path.as_ref())?;
    let image = decode(&bytes)?;
    log::info!(
        "loaded {} words from {}",
        image.len(),
        path.as_ref().display()
    );
    Ok(image)
}

/// Reads a word that was decoded as signed back into `0..=65535` by negating
/// it and adding `2 * (32768 - |v|)`. Equivalent to an unsigned reinterpret.
pub fn legacy_word(word: i16) -> u16 {
    let mut v = word as i32;
    if v < 0 {
        v = -v;
        let diff = 32768 - v;
        v += diff * 2;
    }
    v as u16
}
