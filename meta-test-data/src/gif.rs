//! Builders for synthetic GIF files.

/// Encode `data` as a length-prefixed sub-block sequence with terminator.
pub fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// An application extension with an 11-byte identifier.
pub fn app_extension(app_id: &[u8; 11], data: &[u8]) -> Vec<u8> {
    let mut out = vec![0x21, 0xFF, 11];
    out.extend_from_slice(app_id);
    out.extend_from_slice(&sub_blocks(data));
    out
}

/// Header and logical screen descriptor (no color table), the given
/// blocks, then the trailer.
pub fn file_with(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut file = b"GIF89a".to_vec();
    file.extend_from_slice(&[1, 0, 1, 0, 0x00, 0, 0]);
    for block in blocks {
        file.extend_from_slice(block);
    }
    file.push(0x3B);
    file
}

/// A small well-formed GIF carrying an XMP application extension.
pub fn sample() -> Vec<u8> {
    file_with(&[
        app_extension(b"XMP DataXMP", b"<x:xmpmeta/>"),
        vec![0x21, 0xFE, 5, b'h', b'e', b'l', b'l', b'o', 0],
    ])
}
