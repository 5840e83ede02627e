//! TIFF/DNG scanning.

use super::{
    BlockSink, ContainerBlockKind, ContainerBlockRef, ContainerFormat, ScanResult, ScanStatus,
};

/// Scans a TIFF/DNG byte stream.
///
/// TIFF *is* the EXIF encoding, so the whole file is exposed as a single
/// EXIF block; IFD traversal belongs to the value-level decoder.
pub fn scan_tiff(bytes: &[u8], out: &mut [ContainerBlockRef]) -> ScanResult {
    let little = bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]);
    let big = bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]);
    if !little && !big {
        return ScanResult::UNSUPPORTED;
    }

    let mut sink = BlockSink::new(out);
    sink.push(ContainerBlockRef {
        format: ContainerFormat::Tiff,
        kind: ContainerBlockKind::Exif,
        outer_offset: 0,
        outer_size: bytes.len() as u64,
        data_offset: 0,
        data_size: bytes.len() as u64,
        ..Default::default()
    });
    sink.finish(ScanStatus::Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_auto;

    #[test]
    fn whole_file_is_one_exif_block() {
        let mut file = vec![0x49, 0x49, 0x2A, 0x00];
        file.extend_from_slice(&8u32.to_le_bytes());
        file.extend_from_slice(&[0; 16]);
        let mut out = [ContainerBlockRef::default(); 2];
        let result = scan_auto(&file, &mut out);
        assert_eq!(result.status, ScanStatus::Ok);
        assert_eq!(result.written, 1);
        assert_eq!(out[0].kind, ContainerBlockKind::Exif);
        assert_eq!(out[0].data_size, file.len() as u64);
    }

    #[test]
    fn big_endian_magic_also_matches() {
        let file = [0x4D, 0x4D, 0x00, 0x2A, 0, 0, 0, 8];
        let mut out = [ContainerBlockRef::default(); 2];
        assert_eq!(scan_tiff(&file, &mut out).written, 1);
    }

    #[test]
    fn wrong_magic_is_unsupported() {
        let mut out = [ContainerBlockRef::default(); 2];
        assert_eq!(
            scan_tiff(&[0x49, 0x49, 0x00, 0x2A], &mut out).status,
            ScanStatus::Unsupported
        );
    }
}
