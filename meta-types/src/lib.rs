//! Common scalar and storage types used in image-file metadata containers.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::doc_markdown)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
#[macro_use]
extern crate std;

#[cfg(not(feature = "std"))]
#[macro_use]
extern crate core as std;

#[cfg(feature = "std")]
mod arena;
mod fourcc;
mod rational;
mod raw;
mod raw_le;
mod span;

#[cfg(all(test, feature = "serde"))]
mod serde_test;

#[cfg(feature = "std")]
pub use arena::ByteArena;
pub use fourcc::FourCc;
pub use rational::{SRational, URational};
pub use raw::{FixedSize, Scalar};
pub use raw_le::ScalarLE;
pub use span::ByteSpan;
