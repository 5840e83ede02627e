//! Builders for synthetic PNG files.

pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A chunk with a zeroed (unvalidated) CRC.
pub fn chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(chunk_type);
    out.extend_from_slice(data);
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}

/// Signature, IHDR, the given chunks, then IEND.
pub fn file_with(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut file = SIGNATURE.to_vec();
    file.extend_from_slice(&chunk(b"IHDR", &[0; 13]));
    for c in chunks {
        file.extend_from_slice(c);
    }
    file.extend_from_slice(&chunk(b"IEND", &[]));
    file
}

/// A small well-formed PNG carrying eXIf, iTXt XMP, and tEXt chunks.
pub fn sample() -> Vec<u8> {
    let mut itxt = b"XML:com.adobe.xmp".to_vec();
    itxt.extend_from_slice(b"\0\0\0\0\0<x:xmpmeta/>");
    file_with(&[
        chunk(b"eXIf", &crate::jpeg::tiny_tiff()),
        chunk(b"iTXt", &itxt),
        chunk(b"tEXt", b"Comment\0hello"),
    ])
}
