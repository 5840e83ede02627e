//! Human-readable names for well-known tag and key ids.
//!
//! Tables are compile-time constants sorted by id and probed by binary
//! search. Coverage follows the common EXIF/TIFF and GeoTIFF sets;
//! unknown ids resolve to `None` and callers fall back to numeric
//! rendering.

/// IFD token groups recognized by [`exif_tag_name`].
enum IfdGroup {
    Tiff,
    Exif,
    Gps,
    Interop,
    Unknown,
}

fn ifd_group(ifd: &str) -> IfdGroup {
    match ifd {
        "exififd" => IfdGroup::Exif,
        "gpsifd" => IfdGroup::Gps,
        "interopifd" => IfdGroup::Interop,
        _ if ifd.starts_with("ifd") || ifd.starts_with("subifd") => IfdGroup::Tiff,
        _ => IfdGroup::Unknown,
    }
}

fn lookup(table: &[(u16, &'static str)], id: u16) -> Option<&'static str> {
    table
        .binary_search_by_key(&id, |entry| entry.0)
        .ok()
        .map(|pos| table[pos].1)
}

#[rustfmt::skip]
static TIFF_TAG_NAMES: &[(u16, &str)] = &[
    (0x00FE, "NewSubfileType"),
    (0x00FF, "SubfileType"),
    (0x0100, "ImageWidth"),
    (0x0101, "ImageLength"),
    (0x0102, "BitsPerSample"),
    (0x0103, "Compression"),
    (0x0106, "PhotometricInterpretation"),
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0111, "StripOffsets"),
    (0x0112, "Orientation"),
    (0x0115, "SamplesPerPixel"),
    (0x0116, "RowsPerStrip"),
    (0x0117, "StripByteCounts"),
    (0x011A, "XResolution"),
    (0x011B, "YResolution"),
    (0x011C, "PlanarConfiguration"),
    (0x0128, "ResolutionUnit"),
    (0x012D, "TransferFunction"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x013C, "HostComputer"),
    (0x014A, "SubIFDs"),
    (0x0201, "JPEGInterchangeFormat"),
    (0x0202, "JPEGInterchangeFormatLength"),
    (0x8298, "Copyright"),
    (0x8769, "ExifIFDPointer"),
    (0x8825, "GPSInfoIFDPointer"),
];

#[rustfmt::skip]
static EXIF_TAG_NAMES: &[(u16, &str)] = &[
    (0x829A, "ExposureTime"),
    (0x829D, "FNumber"),
    (0x8822, "ExposureProgram"),
    (0x8827, "ISOSpeedRatings"),
    (0x9000, "ExifVersion"),
    (0x9003, "DateTimeOriginal"),
    (0x9004, "DateTimeDigitized"),
    (0x9101, "ComponentsConfiguration"),
    (0x9102, "CompressedBitsPerPixel"),
    (0x9201, "ShutterSpeedValue"),
    (0x9202, "ApertureValue"),
    (0x9204, "ExposureBiasValue"),
    (0x9207, "MeteringMode"),
    (0x9208, "LightSource"),
    (0x9209, "Flash"),
    (0x920A, "FocalLength"),
    (0x927C, "MakerNote"),
    (0x9286, "UserComment"),
    (0x9290, "SubSecTime"),
    (0x9291, "SubSecTimeOriginal"),
    (0x9292, "SubSecTimeDigitized"),
    (0xA000, "FlashpixVersion"),
    (0xA001, "ColorSpace"),
    (0xA002, "PixelXDimension"),
    (0xA003, "PixelYDimension"),
    (0xA004, "RelatedSoundFile"),
    (0xA005, "InteroperabilityIFDPointer"),
    (0xA420, "ImageUniqueID"),
];

#[rustfmt::skip]
static GPS_TAG_NAMES: &[(u16, &str)] = &[
    (0x0000, "GPSVersionID"),
    (0x0001, "GPSLatitudeRef"),
    (0x0002, "GPSLatitude"),
    (0x0003, "GPSLongitudeRef"),
    (0x0004, "GPSLongitude"),
    (0x0005, "GPSAltitudeRef"),
    (0x0006, "GPSAltitude"),
    (0x0007, "GPSTimeStamp"),
    (0x0008, "GPSSatellites"),
    (0x0009, "GPSStatus"),
    (0x000A, "GPSMeasureMode"),
    (0x000B, "GPSDOP"),
    (0x000C, "GPSSpeedRef"),
    (0x000D, "GPSSpeed"),
    (0x000E, "GPSTrackRef"),
    (0x000F, "GPSTrack"),
    (0x0010, "GPSImgDirectionRef"),
    (0x0011, "GPSImgDirection"),
    (0x0012, "GPSMapDatum"),
    (0x001B, "GPSProcessingMethod"),
    (0x001C, "GPSAreaInformation"),
    (0x001D, "GPSDateStamp"),
    (0x001E, "GPSDifferential"),
    (0x001F, "GPSHPositioningError"),
];

#[rustfmt::skip]
static INTEROP_TAG_NAMES: &[(u16, &str)] = &[
    (0x0001, "InteroperabilityIndex"),
    (0x0002, "InteroperabilityVersion"),
    (0x1001, "RelatedImageWidth"),
    (0x1002, "RelatedImageLength"),
];

#[rustfmt::skip]
static GEOTIFF_KEY_NAMES: &[(u16, &str)] = &[
    (1024, "GTModelTypeGeoKey"),
    (1025, "GTRasterTypeGeoKey"),
    (1026, "GTCitationGeoKey"),
    (2048, "GeographicTypeGeoKey"),
    (2049, "GeogCitationGeoKey"),
    (2050, "GeogGeodeticDatumGeoKey"),
    (2051, "GeogPrimeMeridianGeoKey"),
    (2052, "GeogLinearUnitsGeoKey"),
    (2053, "GeogLinearUnitSizeGeoKey"),
    (2054, "GeogAngularUnitsGeoKey"),
    (2055, "GeogAngularUnitSizeGeoKey"),
    (2056, "GeogEllipsoidGeoKey"),
    (2057, "GeogSemiMajorAxisGeoKey"),
    (2058, "GeogSemiMinorAxisGeoKey"),
    (2059, "GeogInvFlatteningGeoKey"),
    (2060, "GeogAzimuthUnitsGeoKey"),
    (2061, "GeogPrimeMeridianLongGeoKey"),
    (3072, "ProjectedCSTypeGeoKey"),
    (3073, "PCSCitationGeoKey"),
    (3074, "ProjectionGeoKey"),
    (3075, "ProjCoordTransGeoKey"),
    (3076, "ProjLinearUnitsGeoKey"),
    (3077, "ProjLinearUnitSizeGeoKey"),
    (3078, "ProjStdParallel1GeoKey"),
    (3079, "ProjStdParallel2GeoKey"),
    (3080, "ProjNatOriginLongGeoKey"),
    (3081, "ProjNatOriginLatGeoKey"),
    (3082, "ProjFalseEastingGeoKey"),
    (3083, "ProjFalseNorthingGeoKey"),
    (3084, "ProjFalseOriginLongGeoKey"),
    (3085, "ProjFalseOriginLatGeoKey"),
    (3086, "ProjFalseOriginEastingGeoKey"),
    (3087, "ProjFalseOriginNorthingGeoKey"),
    (3088, "ProjCenterLongGeoKey"),
    (3089, "ProjCenterLatGeoKey"),
    (3090, "ProjCenterEastingGeoKey"),
    (3091, "ProjCenterNorthingGeoKey"),
    (3092, "ProjScaleAtNatOriginGeoKey"),
    (3093, "ProjScaleAtCenterGeoKey"),
    (3094, "ProjAzimuthAngleGeoKey"),
    (3095, "ProjStraightVertPoleLongGeoKey"),
    (4096, "VerticalCSTypeGeoKey"),
    (4097, "VerticalCitationGeoKey"),
    (4098, "VerticalDatumGeoKey"),
    (4099, "VerticalUnitsGeoKey"),
];

/// The conventional name of an EXIF/TIFF tag within the given IFD token,
/// or `None` when the tag (or the IFD group) is unknown.
///
/// MakerNote pseudo-IFDs (`mk_` prefix) are vendor-specific and resolve
/// to `None` here.
pub fn exif_tag_name(ifd: &str, tag: u16) -> Option<&'static str> {
    let table = match ifd_group(ifd) {
        IfdGroup::Tiff => TIFF_TAG_NAMES,
        IfdGroup::Exif => EXIF_TAG_NAMES,
        IfdGroup::Gps => GPS_TAG_NAMES,
        IfdGroup::Interop => INTEROP_TAG_NAMES,
        IfdGroup::Unknown => return None,
    };
    lookup(table, tag)
}

/// The conventional name of a GeoTIFF key id.
pub fn geotiff_key_name(key_id: u16) -> Option<&'static str> {
    lookup(GEOTIFF_KEY_NAMES, key_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_resolve_to_their_tables() {
        assert_eq!(exif_tag_name("ifd0", 0x010F), Some("Make"));
        assert_eq!(exif_tag_name("ifd1", 0x0100), Some("ImageWidth"));
        assert_eq!(exif_tag_name("subifd0", 0x0103), Some("Compression"));
        assert_eq!(exif_tag_name("exififd", 0x9003), Some("DateTimeOriginal"));
        assert_eq!(exif_tag_name("gpsifd", 0x0002), Some("GPSLatitude"));
        assert_eq!(
            exif_tag_name("interopifd", 0x0001),
            Some("InteroperabilityIndex")
        );
    }

    #[test]
    fn unknown_tags_and_groups_miss() {
        assert_eq!(exif_tag_name("ifd0", 0xFFFF), None);
        assert_eq!(exif_tag_name("mk_canon_0", 0x0001), None);
        assert_eq!(exif_tag_name("", 0x010F), None);
        // group decides the table: a GPS id is not a TIFF id
        assert_eq!(exif_tag_name("gpsifd", 0x010F), None);
    }

    #[test]
    fn geotiff_keys() {
        assert_eq!(geotiff_key_name(1024), Some("GTModelTypeGeoKey"));
        assert_eq!(geotiff_key_name(3076), Some("ProjLinearUnitsGeoKey"));
        assert_eq!(geotiff_key_name(9999), None);
    }

    #[test]
    fn tables_are_sorted() {
        for table in [
            TIFF_TAG_NAMES,
            EXIF_TAG_NAMES,
            GPS_TAG_NAMES,
            INTEROP_TAG_NAMES,
            GEOTIFF_KEY_NAMES,
        ] {
            assert!(table.windows(2).all(|w| w[0].0 < w[1].0));
        }
    }
}
