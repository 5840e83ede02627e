//! Parsing metadata out of image container files.
//!
//! This crate is the read-only half of the workspace: it locates metadata
//! blocks inside untrusted file bytes (JPEG, PNG, WebP, GIF, TIFF, JP2,
//! JPEG XL, and the ISO-BMFF family) without decoding their inner formats,
//! and it walks BMFF `meta` boxes into a bounded summary of the primary
//! item's property and reference graph.

#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(test)))]
#[macro_use]
extern crate core as std;

pub mod bmff;
mod data;
pub mod scan;

pub use data::{Cursor, MetaData};
pub use scan::{
    scan_auto, scan_bmff, scan_gif, scan_jp2, scan_jpeg, scan_jxl, scan_png, scan_tiff, scan_webp,
    BlockChunking, BlockCompression, ContainerBlockKind, ContainerBlockRef, ContainerFormat,
    ScanResult, ScanStatus,
};

/// Public re-export of the meta-types crate.
pub use meta_types as types;
