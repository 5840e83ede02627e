//! Builders for synthetic JPEG files.

/// A complete marker segment: `FF <marker> <len> <payload>`.
pub fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// SOI, the given segments, then EOI.
pub fn file_with(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut file = vec![0xFF, 0xD8];
    for seg in segments {
        file.extend_from_slice(seg);
    }
    file.extend_from_slice(&[0xFF, 0xD9]);
    file
}

/// An APP1 EXIF segment wrapping `tiff` bytes.
pub fn exif_segment(tiff: &[u8]) -> Vec<u8> {
    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(tiff);
    segment(0xE1, &payload)
}

/// An APP1 XMP segment wrapping `packet`.
pub fn xmp_segment(packet: &[u8]) -> Vec<u8> {
    let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    payload.extend_from_slice(packet);
    segment(0xE1, &payload)
}

/// One APP2 ICC part (`seq` is 1-based).
pub fn icc_segment(seq: u8, total: u8, profile_part: &[u8]) -> Vec<u8> {
    let mut payload = b"ICC_PROFILE\0".to_vec();
    payload.push(seq);
    payload.push(total);
    payload.extend_from_slice(profile_part);
    segment(0xE2, &payload)
}

/// A minimal little-endian TIFF header with no IFD entries.
pub fn tiny_tiff() -> Vec<u8> {
    let mut tiff = vec![0x49, 0x49, 0x2A, 0x00];
    tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
    tiff.extend_from_slice(&0u16.to_le_bytes()); // entry count
    tiff.extend_from_slice(&0u32.to_le_bytes()); // next IFD
    tiff
}

/// A small well-formed JPEG carrying EXIF, XMP, a two-part ICC profile,
/// and a comment.
pub fn sample() -> Vec<u8> {
    file_with(&[
        exif_segment(&tiny_tiff()),
        xmp_segment(b"<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/>"),
        icc_segment(1, 2, &[0xAA; 16]),
        icc_segment(2, 2, &[0xBB; 16]),
        segment(0xFE, b"created for tests"),
    ])
}
