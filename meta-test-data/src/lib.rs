//! test data shared between the metations crates.
//!
//! Real sample files are deliberately absent: every fixture is built
//! byte-by-byte so tests can state exactly which structure they exercise.

pub mod bebuffer;
pub mod bmff;
pub mod gif;
pub mod jpeg;
pub mod png;
pub mod webp;

/// One well-formed fixture per container family, for smoke tests and as
/// mutation seeds for randomized scanning.
pub fn seed_files() -> Vec<Vec<u8>> {
    vec![
        jpeg::sample(),
        png::sample(),
        webp::sample(),
        gif::sample(),
        bmff::sample(),
    ]
}
