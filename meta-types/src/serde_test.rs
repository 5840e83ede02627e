//! we use serde_json here because it's a simple way to test serde support

use crate::{ByteSpan, FourCc, SRational, URational};

#[test]
fn spans() {
    let span = ByteSpan::new(12, 7);
    let json = serde_json::to_string(&span).unwrap();
    let de: ByteSpan = serde_json::from_str(&json).unwrap();
    assert_eq!(span, de);
}

#[test]
fn fourcc() {
    let cc = FourCc::new(b"ftyp");
    let json = serde_json::to_string(&cc).unwrap();
    let de: FourCc = serde_json::from_str(&json).unwrap();
    assert_eq!(cc, de);
}

#[test]
fn rationals() {
    let ur = URational::new(72, 1);
    let sr = SRational::new(-1, 3);
    let json = serde_json::to_string(&(ur, sr)).unwrap();
    let de: (URational, SRational) = serde_json::from_str(&json).unwrap();
    assert_eq!((ur, sr), de);
}
