//! Builders for synthetic ISO-BMFF (HEIF-flavored) files.

/// Wrap `payload` in a box of the given type.
pub fn boxed(box_type: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = (payload.len() as u32 + 8).to_be_bytes().to_vec();
    out.extend_from_slice(box_type);
    out.extend_from_slice(payload);
    out
}

/// Wrap `payload` in a FullBox (version + zero flags).
pub fn full_box(box_type: &[u8; 4], version: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![version, 0, 0, 0];
    body.extend_from_slice(payload);
    boxed(box_type, &body)
}

/// An `ispe` property box.
pub fn ispe(width: u32, height: u32) -> Vec<u8> {
    let mut payload = width.to_be_bytes().to_vec();
    payload.extend_from_slice(&height.to_be_bytes());
    full_box(b"ispe", 0, &payload)
}

/// An `irot` property box (rotation in 90-degree steps, 0..=3).
pub fn irot(steps: u8) -> Vec<u8> {
    boxed(b"irot", &[steps])
}

/// An `imir` property box (mirror direction).
pub fn imir(direction: u8) -> Vec<u8> {
    boxed(b"imir", &[direction])
}

/// An `auxC` property box: NUL-terminated URN plus an opaque subtype.
pub fn auxc(urn: &str, subtype: &[u8]) -> Vec<u8> {
    let mut payload = urn.as_bytes().to_vec();
    payload.push(0);
    payload.extend_from_slice(subtype);
    full_box(b"auxC", 0, &payload)
}

/// Builds the children of one `meta` box.
#[derive(Default)]
pub struct MetaBoxBuilder {
    pitm: Option<Vec<u8>>,
    iref_children: Vec<u8>,
    ipco: Option<Vec<u8>>,
    ipma_entries: Vec<u8>,
    ipma_entry_count: u32,
    infe_boxes: Vec<u8>,
    infe_count: u16,
    iloc_entries: Vec<u8>,
    iloc_count: u16,
}

impl MetaBoxBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the primary item id (`pitm` version 0).
    pub fn pitm(mut self, item_id: u16) -> Self {
        self.pitm = Some(full_box(b"pitm", 0, &item_id.to_be_bytes()));
        self
    }

    /// Add an `auxl` reference box: `from` refers to every id in `to`.
    pub fn iref_auxl(self, from: u16, to: &[u16]) -> Self {
        self.iref_edges(b"auxl", from, to)
    }

    /// Add a reference box of arbitrary type (version 0 ids).
    pub fn iref_edges(mut self, ref_type: &[u8; 4], from: u16, to: &[u16]) -> Self {
        let mut payload = from.to_be_bytes().to_vec();
        payload.extend_from_slice(&(to.len() as u16).to_be_bytes());
        for id in to {
            payload.extend_from_slice(&id.to_be_bytes());
        }
        self.iref_children.extend_from_slice(&boxed(ref_type, &payload));
        self
    }

    /// Set the `ipco` property array; properties get 1-based indices in
    /// order.
    pub fn ipco(mut self, properties: &[Vec<u8>]) -> Self {
        let mut payload = Vec::new();
        for prop in properties {
            payload.extend_from_slice(prop);
        }
        self.ipco = Some(boxed(b"ipco", &payload));
        self
    }

    /// Associate `item_id` with the given 1-based property indices
    /// (`ipma` version 0).
    pub fn ipma(mut self, item_id: u16, prop_indices: &[u8]) -> Self {
        self.ipma_entries.extend_from_slice(&item_id.to_be_bytes());
        self.ipma_entries.push(prop_indices.len() as u8);
        self.ipma_entries.extend_from_slice(prop_indices);
        self.ipma_entry_count += 1;
        self
    }

    /// Declare an item (`infe` version 2) with the given type; `mime`
    /// items get a content type after the empty name.
    pub fn infe(mut self, item_id: u16, item_type: &[u8; 4], content_type: Option<&str>) -> Self {
        let mut payload = item_id.to_be_bytes().to_vec();
        payload.extend_from_slice(&0u16.to_be_bytes()); // protection index
        payload.extend_from_slice(item_type);
        payload.push(0); // empty item name
        if let Some(content_type) = content_type {
            payload.extend_from_slice(content_type.as_bytes());
            payload.push(0);
        }
        self.infe_boxes.extend_from_slice(&full_box(b"infe", 2, &payload));
        self.infe_count += 1;
        self
    }

    /// Locate an item at a file-absolute range (`iloc` version 0, 4-byte
    /// offsets and lengths, single extent).
    pub fn iloc_item(mut self, item_id: u16, offset: u32, length: u32) -> Self {
        self.iloc_entries.extend_from_slice(&item_id.to_be_bytes());
        self.iloc_entries.extend_from_slice(&0u16.to_be_bytes()); // data_reference_index
        self.iloc_entries.extend_from_slice(&1u16.to_be_bytes()); // extent_count
        self.iloc_entries.extend_from_slice(&offset.to_be_bytes());
        self.iloc_entries.extend_from_slice(&length.to_be_bytes());
        self.iloc_count += 1;
        self
    }

    /// Assemble the `meta` box.
    pub fn build(self) -> Vec<u8> {
        let mut payload = Vec::new();
        if let Some(pitm) = self.pitm {
            payload.extend_from_slice(&pitm);
        }
        if !self.iref_children.is_empty() {
            let mut iref_payload = vec![0u8, 0, 0, 0]; // FullBox v0
            iref_payload.extend_from_slice(&self.iref_children);
            payload.extend_from_slice(&boxed(b"iref", &iref_payload));
        }
        if self.ipco.is_some() || self.ipma_entry_count > 0 {
            let mut iprp_payload = Vec::new();
            if let Some(ipco) = self.ipco {
                iprp_payload.extend_from_slice(&ipco);
            }
            if self.ipma_entry_count > 0 {
                let mut ipma_payload = self.ipma_entry_count.to_be_bytes().to_vec();
                ipma_payload.extend_from_slice(&self.ipma_entries);
                iprp_payload.extend_from_slice(&full_box(b"ipma", 0, &ipma_payload));
            }
            payload.extend_from_slice(&boxed(b"iprp", &iprp_payload));
        }
        if self.infe_count > 0 {
            let mut iinf_payload = self.infe_count.to_be_bytes().to_vec();
            iinf_payload.extend_from_slice(&self.infe_boxes);
            payload.extend_from_slice(&full_box(b"iinf", 0, &iinf_payload));
        }
        if self.iloc_count > 0 {
            let mut iloc_payload = vec![0x44, 0x00]; // offset/length size 4, no base
            iloc_payload.extend_from_slice(&self.iloc_count.to_be_bytes());
            iloc_payload.extend_from_slice(&self.iloc_entries);
            payload.extend_from_slice(&full_box(b"iloc", 0, &iloc_payload));
        }
        full_box(b"meta", 0, &payload)
    }
}

/// Builds a whole file: `ftyp` plus any boxes appended after it.
#[derive(Default)]
pub struct BmffFileBuilder {
    ftyp: Option<Vec<u8>>,
    boxes: Vec<u8>,
}

impl BmffFileBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn ftyp(mut self, major: &[u8; 4], minor: u32, compat: &[[u8; 4]]) -> Self {
        let mut payload = major.to_vec();
        payload.extend_from_slice(&minor.to_be_bytes());
        for brand in compat {
            payload.extend_from_slice(brand);
        }
        self.ftyp = Some(boxed(b"ftyp", &payload));
        self
    }

    pub fn meta(mut self, meta: MetaBoxBuilder) -> Self {
        self.boxes.extend_from_slice(&meta.build());
        self
    }

    /// Append an arbitrary already-encoded box.
    pub fn raw_box(mut self, bytes: &[u8]) -> Self {
        self.boxes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut file = self.ftyp.unwrap_or_default();
        file.extend_from_slice(&self.boxes);
        file
    }
}

/// A small well-formed HEIF: primary item with dimensions, rotation, one
/// alpha auxiliary, and an EXIF item resolvable through `iinf`/`iloc`.
pub fn sample() -> Vec<u8> {
    // exif item payload: 4-byte tiff-offset prefix, then a tiff header
    let mut exif_payload = 4u32.to_be_bytes().to_vec();
    exif_payload.extend_from_slice(b"pad.II*\0....");

    let build = |exif_offset: u32| {
        BmffFileBuilder::new()
            .ftyp(b"heic", 0, &[*b"mif1"])
            .meta(
                MetaBoxBuilder::new()
                    .pitm(1)
                    .iref_auxl(1, &[2])
                    .ipco(&[
                        ispe(640, 480),
                        irot(1),
                        auxc("urn:mpeg:hevc:2015:auxid:1", &[]),
                    ])
                    .ipma(1, &[1, 2])
                    .ipma(2, &[3])
                    .infe(3, b"Exif", None)
                    .iloc_item(3, exif_offset, exif_payload.len() as u32),
            )
            .build()
    };

    // two passes: the first measures where the mdat payload will land
    let exif_offset = (build(0).len() + 8) as u32;
    let mut file = build(exif_offset);
    file.extend_from_slice(&boxed(b"mdat", &exif_payload));
    file
}
