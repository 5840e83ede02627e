//! Builders for synthetic RIFF/WebP files.

/// Assemble a RIFF/WEBP file from `(fourcc, data)` chunks, padding odd
/// chunks to even sizes.
pub fn file_with(chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();
    for (fourcc, data) in chunks {
        body.extend_from_slice(*fourcc);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
        if data.len() % 2 == 1 {
            body.push(0);
        }
    }
    let mut file = b"RIFF".to_vec();
    file.extend_from_slice(&(body.len() as u32).to_le_bytes());
    file.extend_from_slice(&body);
    file
}

/// A small well-formed WebP carrying EXIF and XMP chunks.
pub fn sample() -> Vec<u8> {
    let tiff = crate::jpeg::tiny_tiff();
    file_with(&[
        (b"VP8L", &[0x2F, 0, 0, 0, 0]),
        (b"EXIF", &tiff),
        (b"XMP ", b"<x:xmpmeta/>"),
    ])
}
