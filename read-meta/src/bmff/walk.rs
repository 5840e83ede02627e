//! Walking BMFF `meta` boxes into a bounded summary of the primary item.
//!
//! The walker resolves `pitm`, the `iprp` property graph (`ipco`/`ipma`),
//! and the `iref` reference graph against the primary item, producing a
//! fixed-capacity [`MetaSummary`]. Reference edges can form cycles (`cdsc`
//! paired with `dimg` is common), so the graph is never traversed
//! recursively: edges are stored as a flat list and queried by iteration.
//!
//! All tables have hard capacities; overflow sets a `truncated` flag and
//! keeps the totals, it is never an error.

use meta_types::{FourCc, Scalar};

use super::{is_container_box, parse_box, parse_ftyp, BmffBox, FtypInfo};
use super::{FOURCC_FTYP, FOURCC_META, MAX_BOX_COUNT, MAX_BOX_DEPTH};
use crate::MetaData;

const FOURCC_PITM: FourCc = FourCc::new(b"pitm");
const FOURCC_IPRP: FourCc = FourCc::new(b"iprp");
const FOURCC_IREF: FourCc = FourCc::new(b"iref");
const FOURCC_IPCO: FourCc = FourCc::new(b"ipco");
const FOURCC_IPMA: FourCc = FourCc::new(b"ipma");
const FOURCC_ISPE: FourCc = FourCc::new(b"ispe");
const FOURCC_IROT: FourCc = FourCc::new(b"irot");
const FOURCC_IMIR: FourCc = FourCc::new(b"imir");
const FOURCC_AUXC: FourCc = FourCc::new(b"auxC");
const FOURCC_AUXL: FourCc = FourCc::new(b"auxl");
const FOURCC_DIMG: FourCc = FourCc::new(b"dimg");
const FOURCC_THMB: FourCc = FourCc::new(b"thmb");
const FOURCC_CDSC: FourCc = FourCc::new(b"cdsc");

/// Stored reference edges; the total keeps counting past this.
const MAX_IREF_EDGES: usize = 512;
/// Auxiliary item catalogue capacity.
const MAX_AUX_ITEMS: usize = 256;
/// Per-kind `ipco` property capacity.
const MAX_IPCO_PROPS: usize = 64;
/// Per-bucket capacity for the primary item's reference targets.
const MAX_PRIMARY_REFS: usize = 128;
/// A single reference box may not carry more entries than this.
const MAX_REFS_PER_BOX: u32 = 1 << 14;
/// Total reference entries across all boxes.
const MAX_TOTAL_REFS: u32 = 1 << 18;

const AUX_TYPE_CAP: usize = 96;
const AUX_SUBTYPE_CAP: usize = 32;

/// Semantic role of an auxiliary image item, classified from its `auxC`
/// URN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuxSemantic {
    #[default]
    Unknown,
    Alpha,
    Depth,
    Disparity,
    Matte,
}

impl AuxSemantic {
    pub fn name(self) -> &'static str {
        match self {
            AuxSemantic::Unknown => "unknown",
            AuxSemantic::Alpha => "alpha",
            AuxSemantic::Depth => "depth",
            AuxSemantic::Disparity => "disparity",
            AuxSemantic::Matte => "matte",
        }
    }
}

/// One `iref` edge: `from_item_id --ref_type--> to_item_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItemRefEdge {
    pub ref_type: FourCc,
    pub from_item_id: u32,
    pub to_item_id: u32,
}

impl ItemRefEdge {
    const EMPTY: ItemRefEdge = ItemRefEdge {
        ref_type: FourCc::from_u32(0),
        from_item_id: 0,
        to_item_id: 0,
    };
}

/// Catalogue entry for an auxiliary item: its semantic, `auxC` URN, and a
/// capped copy of the URN's subtype payload.
#[derive(Clone, Copy, Debug)]
pub struct AuxItemInfo {
    pub item_id: u32,
    pub semantic: AuxSemantic,
    aux_type: [u8; AUX_TYPE_CAP],
    aux_type_len: u16,
    aux_subtype: [u8; AUX_SUBTYPE_CAP],
    aux_subtype_len: u16,
    /// Full subtype length in the file (clamped to `u16::MAX`).
    pub aux_subtype_total_len: u16,
    /// Whether the stored subtype bytes are a truncated copy.
    pub aux_subtype_truncated: bool,
}

impl AuxItemInfo {
    const EMPTY: AuxItemInfo = AuxItemInfo {
        item_id: 0,
        semantic: AuxSemantic::Unknown,
        aux_type: [0; AUX_TYPE_CAP],
        aux_type_len: 0,
        aux_subtype: [0; AUX_SUBTYPE_CAP],
        aux_subtype_len: 0,
        aux_subtype_total_len: 0,
        aux_subtype_truncated: false,
    };

    /// The `auxC` URN bytes (ASCII in practice), empty if none was seen.
    pub fn aux_type(&self) -> &[u8] {
        &self.aux_type[..self.aux_type_len as usize]
    }

    /// The stored subtype bytes (possibly a truncated prefix).
    pub fn aux_subtype(&self) -> &[u8] {
        &self.aux_subtype[..self.aux_subtype_len as usize]
    }

    pub fn interpret_subtype(&self) -> SubtypeInterpretation {
        interpret_aux_subtype(
            self.aux_subtype(),
            self.aux_subtype_total_len,
            self.aux_subtype_truncated,
        )
    }
}

/// `ispe` dimensions found in `ipco`, keyed by 1-based property index.
#[derive(Clone, Copy)]
struct IspeProp {
    index: u32,
    width: u32,
    height: u32,
}

impl IspeProp {
    const EMPTY: IspeProp = IspeProp {
        index: 0,
        width: 0,
        height: 0,
    };
}

/// A one-byte property (`irot`, `imir`), keyed by 1-based property index.
#[derive(Clone, Copy)]
struct ByteProp {
    index: u32,
    value: u8,
}

impl ByteProp {
    const EMPTY: ByteProp = ByteProp { index: 0, value: 0 };
}

/// An `auxC` property, keyed by 1-based property index.
#[derive(Clone, Copy)]
struct AuxCProp {
    index: u32,
    semantic: AuxSemantic,
    aux_type: [u8; AUX_TYPE_CAP],
    aux_type_len: u16,
    aux_subtype: [u8; AUX_SUBTYPE_CAP],
    aux_subtype_len: u16,
    aux_subtype_total_len: u16,
    aux_subtype_truncated: bool,
}

impl AuxCProp {
    const EMPTY: AuxCProp = AuxCProp {
        index: 0,
        semantic: AuxSemantic::Unknown,
        aux_type: [0; AUX_TYPE_CAP],
        aux_type_len: 0,
        aux_subtype: [0; AUX_SUBTYPE_CAP],
        aux_subtype_len: 0,
        aux_subtype_total_len: 0,
        aux_subtype_truncated: false,
    };
}

/// A deduplicated, capacity-bounded list of item ids.
#[derive(Clone, Copy)]
struct IdBucket {
    ids: [u32; MAX_PRIMARY_REFS],
    count: u32,
}

impl IdBucket {
    const EMPTY: IdBucket = IdBucket {
        ids: [0; MAX_PRIMARY_REFS],
        count: 0,
    };

    fn as_slice(&self) -> &[u32] {
        &self.ids[..self.count as usize]
    }

    fn push(&mut self, value: u32) {
        if (self.count as usize) < self.ids.len() {
            self.ids[self.count as usize] = value;
            self.count += 1;
        }
    }

    fn push_unique(&mut self, value: u32) {
        if self.as_slice().contains(&value) {
            return;
        }
        self.push(value);
    }

    fn position(&self, value: u32) -> Option<usize> {
        self.as_slice().iter().position(|id| *id == value)
    }
}

/// Everything the walker derives from one `meta` box.
///
/// Present only when a `pitm` box resolved; a `meta` box without a primary
/// item yields nothing.
#[derive(Clone)]
pub struct PrimarySummary {
    pub item_id: u32,

    /// `ispe` width/height associated with the primary item.
    pub width_height: Option<(u32, u32)>,
    /// `irot` as degrees: 90 times the stored 2-bit value.
    pub rotation_degrees: Option<u16>,
    /// `imir` mirror direction byte.
    pub mirror: Option<u8>,

    edges: [ItemRefEdge; MAX_IREF_EDGES],
    edge_count: u32,
    /// Total edges seen, including any beyond capacity.
    pub edge_total: u32,
    pub edges_truncated: bool,

    auxl_targets: IdBucket,
    auxl_semantics: [AuxSemantic; MAX_PRIMARY_REFS],
    alpha_targets: IdBucket,
    depth_targets: IdBucket,
    disparity_targets: IdBucket,
    matte_targets: IdBucket,
    dimg_targets: IdBucket,
    thmb_targets: IdBucket,
    cdsc_targets: IdBucket,

    aux_items: [AuxItemInfo; MAX_AUX_ITEMS],
    aux_item_count: u32,
}

impl PrimarySummary {
    fn new(item_id: u32) -> Self {
        PrimarySummary {
            item_id,
            width_height: None,
            rotation_degrees: None,
            mirror: None,
            edges: [ItemRefEdge::EMPTY; MAX_IREF_EDGES],
            edge_count: 0,
            edge_total: 0,
            edges_truncated: false,
            auxl_targets: IdBucket::EMPTY,
            auxl_semantics: [AuxSemantic::Unknown; MAX_PRIMARY_REFS],
            alpha_targets: IdBucket::EMPTY,
            depth_targets: IdBucket::EMPTY,
            disparity_targets: IdBucket::EMPTY,
            matte_targets: IdBucket::EMPTY,
            dimg_targets: IdBucket::EMPTY,
            thmb_targets: IdBucket::EMPTY,
            cdsc_targets: IdBucket::EMPTY,
            aux_items: [AuxItemInfo::EMPTY; MAX_AUX_ITEMS],
            aux_item_count: 0,
        }
    }

    /// The stored reference edges, in file order.
    pub fn edges(&self) -> &[ItemRefEdge] {
        &self.edges[..self.edge_count as usize]
    }

    /// The auxiliary item catalogue, in first-seen order.
    pub fn aux_items(&self) -> &[AuxItemInfo] {
        &self.aux_items[..self.aux_item_count as usize]
    }

    pub fn aux_item(&self, item_id: u32) -> Option<&AuxItemInfo> {
        self.aux_items().iter().find(|info| info.item_id == item_id)
    }

    pub fn aux_semantic(&self, item_id: u32) -> AuxSemantic {
        self.aux_item(item_id)
            .map(|info| info.semantic)
            .unwrap_or(AuxSemantic::Unknown)
    }

    /// The primary item's `auxl` targets, in reference order.
    pub fn auxl_item_ids(&self) -> &[u32] {
        self.auxl_targets.as_slice()
    }

    /// Semantics parallel to [`auxl_item_ids`](Self::auxl_item_ids).
    pub fn auxl_item_semantics(&self) -> &[AuxSemantic] {
        &self.auxl_semantics[..self.auxl_targets.count as usize]
    }

    pub fn alpha_item_ids(&self) -> &[u32] {
        self.alpha_targets.as_slice()
    }

    pub fn depth_item_ids(&self) -> &[u32] {
        self.depth_targets.as_slice()
    }

    pub fn disparity_item_ids(&self) -> &[u32] {
        self.disparity_targets.as_slice()
    }

    pub fn matte_item_ids(&self) -> &[u32] {
        self.matte_targets.as_slice()
    }

    pub fn dimg_item_ids(&self) -> &[u32] {
        self.dimg_targets.as_slice()
    }

    pub fn thmb_item_ids(&self) -> &[u32] {
        self.thmb_targets.as_slice()
    }

    pub fn cdsc_item_ids(&self) -> &[u32] {
        self.cdsc_targets.as_slice()
    }

    fn is_primary_auxl(&self, item_id: u32) -> bool {
        self.auxl_targets.position(item_id).is_some()
    }

    fn upsert_aux_item(&mut self, item_id: u32) -> Option<usize> {
        if let Some(pos) = self
            .aux_items()
            .iter()
            .position(|info| info.item_id == item_id)
        {
            return Some(pos);
        }
        if (self.aux_item_count as usize) >= self.aux_items.len() {
            return None;
        }
        let pos = self.aux_item_count as usize;
        self.aux_items[pos] = AuxItemInfo {
            item_id,
            ..AuxItemInfo::EMPTY
        };
        self.aux_item_count += 1;
        Some(pos)
    }

    fn set_aux_item_semantic(&mut self, item_id: u32, semantic: AuxSemantic) {
        if semantic == AuxSemantic::Unknown {
            return;
        }
        let Some(pos) = self.upsert_aux_item(item_id) else {
            return;
        };
        if self.aux_items[pos].semantic == AuxSemantic::Unknown {
            self.aux_items[pos].semantic = semantic;
        }
    }

    fn set_aux_item_type(&mut self, item_id: u32, aux_type: &[u8]) {
        if aux_type.is_empty() {
            return;
        }
        let Some(pos) = self.upsert_aux_item(item_id) else {
            return;
        };
        let info = &mut self.aux_items[pos];
        if info.aux_type_len != 0 {
            return;
        }
        let copy = aux_type.len().min(AUX_TYPE_CAP);
        info.aux_type[..copy].copy_from_slice(&aux_type[..copy]);
        info.aux_type_len = copy as u16;
    }

    fn set_aux_item_subtype(&mut self, item_id: u32, subtype: &[u8], total_len: u16, trunc: bool) {
        let Some(pos) = self.upsert_aux_item(item_id) else {
            return;
        };
        let info = &mut self.aux_items[pos];
        if info.aux_subtype_total_len != 0 {
            return;
        }
        let copy = subtype.len().min(AUX_SUBTYPE_CAP);
        info.aux_subtype[..copy].copy_from_slice(&subtype[..copy]);
        info.aux_subtype_len = copy as u16;
        info.aux_subtype_total_len = total_len;
        info.aux_subtype_truncated = trunc;
    }

    /// Record the resolved semantic for one of the primary's `auxl`
    /// targets and file it into the matching typed bucket.
    fn set_primary_auxl_semantic(&mut self, item_id: u32, semantic: AuxSemantic) {
        if semantic == AuxSemantic::Unknown {
            return;
        }
        let Some(pos) = self.auxl_targets.position(item_id) else {
            return;
        };
        if self.auxl_semantics[pos] != AuxSemantic::Unknown {
            return;
        }
        self.auxl_semantics[pos] = semantic;
        match semantic {
            AuxSemantic::Alpha => self.alpha_targets.push_unique(item_id),
            AuxSemantic::Depth => self.depth_targets.push_unique(item_id),
            AuxSemantic::Disparity => self.disparity_targets.push_unique(item_id),
            AuxSemantic::Matte => self.matte_targets.push_unique(item_id),
            AuxSemantic::Unknown => {}
        }
    }

    fn add_primary_ref(&mut self, ref_type: FourCc, to_item_id: u32) {
        match ref_type {
            FOURCC_AUXL => self.auxl_targets.push(to_item_id),
            FOURCC_DIMG => self.dimg_targets.push(to_item_id),
            FOURCC_THMB => self.thmb_targets.push(to_item_id),
            FOURCC_CDSC => self.cdsc_targets.push(to_item_id),
            _ => {}
        }
    }

    /// Returns `false` when the total reference budget is exhausted.
    fn append_edge(&mut self, ref_type: FourCc, from_item_id: u32, to_item_id: u32) -> bool {
        if self.edge_total == u32::MAX {
            return false;
        }
        self.edge_total += 1;
        if (self.edge_count as usize) < self.edges.len() {
            self.edges[self.edge_count as usize] = ItemRefEdge {
                ref_type,
                from_item_id,
                to_item_id,
            };
            self.edge_count += 1;
        } else {
            self.edges_truncated = true;
        }

        if from_item_id == self.item_id {
            self.add_primary_ref(ref_type, to_item_id);
        }
        true
    }
}

/// The walker's output for one file: the `ftyp` contents plus, when a
/// `meta` box with a primary item was found, its derived summary.
#[derive(Clone)]
pub struct MetaSummary {
    pub ftyp: FtypInfo,
    pub primary: Option<PrimarySummary>,
}

/// Walk `bytes` as an ISO-BMFF file and summarize its first decodable
/// `meta` box.
///
/// Returns `None` unless the file starts with an `ftyp` whose brands map
/// to a container family this crate understands (HEIF/AVIF/CR3).
/// Termination is bounded: box depth is capped at 16 and the total visited
/// box count at 65,536.
pub fn summarize(bytes: &[u8]) -> Option<MetaSummary> {
    let data = MetaData::new(bytes);
    let ftyp_box = parse_box(data, 0, data.len())?;
    if ftyp_box.box_type != FOURCC_FTYP {
        return None;
    }
    let ftyp = parse_ftyp(data, &ftyp_box)?;

    let mut seen = 0u32;
    let primary = find_meta_summary(data, 0, data.len(), 0, &mut seen);
    Some(MetaSummary { ftyp, primary })
}

fn find_meta_summary(
    data: MetaData,
    mut offset: u64,
    end: u64,
    depth: u32,
    seen: &mut u32,
) -> Option<PrimarySummary> {
    if depth > MAX_BOX_DEPTH {
        return None;
    }

    while offset + 8 <= end {
        *seen += 1;
        if *seen > MAX_BOX_COUNT {
            return None;
        }
        let Some(parsed) = parse_box(data, offset, end) else {
            break;
        };

        if parsed.box_type == FOURCC_META {
            if let Some(summary) = decode_meta(data, &parsed) {
                return Some(summary);
            }
        } else if is_container_box(parsed.box_type) {
            let child_offset = parsed.payload_offset();
            let child_end = parsed.end();
            if child_offset < child_end {
                if let Some(summary) =
                    find_meta_summary(data, child_offset, child_end, depth + 1, seen)
                {
                    return Some(summary);
                }
                if *seen > MAX_BOX_COUNT {
                    return None;
                }
            }
        }

        offset = parsed.end();
    }
    None
}

/// Decode one `meta` box. Fails (returns `None`) when there is no
/// resolvable `pitm` or the reference graph is malformed.
fn decode_meta(data: MetaData, meta: &BmffBox) -> Option<PrimarySummary> {
    if meta.payload_size() < 4 {
        return None;
    }

    let mut pitm = None;
    let mut iprp = None;
    let mut iref = None;

    let mut offset = meta.payload_offset() + 4; // FullBox header
    let end = meta.end();
    let mut seen = 0u32;
    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            return None;
        }
        let Some(child) = parse_box(data, offset, end) else {
            break;
        };
        match child.box_type {
            FOURCC_PITM => pitm = Some(child),
            FOURCC_IPRP => iprp = Some(child),
            FOURCC_IREF => iref = Some(child),
            _ => {}
        }
        offset = child.end();
    }

    let primary_id = parse_pitm(data, &pitm?)?;
    let mut summary = PrimarySummary::new(primary_id);

    if let Some(iref) = iref {
        if !collect_iref_edges(data, &iref, &mut summary) {
            return None;
        }
    }

    let Some(iprp) = iprp else {
        return Some(summary);
    };

    let mut ipco = None;
    let mut ipma = None;
    let mut offset = iprp.payload_offset();
    let end = iprp.end();
    let mut seen = 0u32;
    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            break;
        }
        let Some(child) = parse_box(data, offset, end) else {
            break;
        };
        match child.box_type {
            FOURCC_IPCO => ipco = Some(child),
            FOURCC_IPMA => ipma = Some(child),
            _ => {}
        }
        offset = child.end();
    }

    let Some(ipma) = ipma else {
        return Some(summary);
    };

    let mut props = IpcoProps::default();
    if let Some(ipco) = ipco {
        collect_ipco_props(data, &ipco, &mut props);
    }
    apply_ipma(data, &ipma, &props, &mut summary);

    Some(summary)
}

fn parse_pitm(data: MetaData, pitm: &BmffBox) -> Option<u32> {
    let payload_offset = pitm.payload_offset();
    if pitm.payload_size() < 6 {
        return None;
    }
    let version: u8 = data.read_be_at(payload_offset)?;
    match version {
        0 => data.read_be_at::<u16>(payload_offset + 4).map(u32::from),
        1 => {
            if pitm.payload_size() < 8 {
                return None;
            }
            data.read_be_at::<u32>(payload_offset + 4)
        }
        _ => None,
    }
}

/// Returns `false` when the reference graph violates a hard bound.
fn collect_iref_edges(data: MetaData, iref: &BmffBox, summary: &mut PrimarySummary) -> bool {
    let payload_offset = iref.payload_offset();
    let end = iref.end();
    if payload_offset + 4 > end {
        return false;
    }
    let Some(version) = data.read_be_at::<u8>(payload_offset) else {
        return false;
    };
    if version > 1 {
        return false;
    }

    let mut offset = payload_offset + 4; // skip FullBox header
    let mut seen = 0u32;
    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            return false;
        }
        let Some(child) = parse_box(data, offset, end) else {
            break;
        };

        // the id list is confined to the reference box that declares it
        let mut cursor = data.cursor(child.payload_offset(), child.end());
        let from_item_id = if version == 0 {
            let Some(id) = cursor.read_be::<u16>() else {
                return false;
            };
            id as u32
        } else {
            let Some(id) = cursor.read_be::<u32>() else {
                return false;
            };
            id
        };

        let Some(ref_count) = cursor.read_be::<u16>() else {
            return false;
        };
        if u32::from(ref_count) > MAX_REFS_PER_BOX {
            return false;
        }

        for _ in 0..ref_count {
            let to_item_id = if version == 0 {
                let Some(id) = cursor.read_be::<u16>() else {
                    return false;
                };
                id as u32
            } else {
                let Some(id) = cursor.read_be::<u32>() else {
                    return false;
                };
                id
            };

            if !summary.append_edge(child.box_type, from_item_id, to_item_id) {
                return false;
            }
            if summary.edge_total > MAX_TOTAL_REFS {
                return false;
            }
        }

        offset = child.end();
    }
    true
}

struct IpcoProps {
    ispe: [IspeProp; MAX_IPCO_PROPS],
    ispe_count: u32,
    irot: [ByteProp; MAX_IPCO_PROPS],
    irot_count: u32,
    imir: [ByteProp; MAX_IPCO_PROPS],
    imir_count: u32,
    auxc: [AuxCProp; MAX_IPCO_PROPS],
    auxc_count: u32,
}

impl Default for IpcoProps {
    fn default() -> Self {
        IpcoProps {
            ispe: [IspeProp::EMPTY; MAX_IPCO_PROPS],
            ispe_count: 0,
            irot: [ByteProp::EMPTY; MAX_IPCO_PROPS],
            irot_count: 0,
            imir: [ByteProp::EMPTY; MAX_IPCO_PROPS],
            imir_count: 0,
            auxc: [AuxCProp::EMPTY; MAX_IPCO_PROPS],
            auxc_count: 0,
        }
    }
}

impl IpcoProps {
    fn find_ispe(&self, index: u32) -> Option<&IspeProp> {
        self.ispe[..self.ispe_count as usize]
            .iter()
            .find(|p| p.index == index)
    }

    fn find_irot(&self, index: u32) -> Option<&ByteProp> {
        self.irot[..self.irot_count as usize]
            .iter()
            .find(|p| p.index == index)
    }

    fn find_imir(&self, index: u32) -> Option<&ByteProp> {
        self.imir[..self.imir_count as usize]
            .iter()
            .find(|p| p.index == index)
    }

    fn find_auxc(&self, index: u32) -> Option<&AuxCProp> {
        self.auxc[..self.auxc_count as usize]
            .iter()
            .find(|p| p.index == index)
    }
}

/// Pre-scan `ipco`, collecting the property kinds the walker applies.
/// Property indices are 1-based, in box order.
fn collect_ipco_props(data: MetaData, ipco: &BmffBox, out: &mut IpcoProps) {
    let payload_offset = ipco.payload_offset();
    let end = ipco.end();
    if payload_offset > end || end > data.len() {
        return;
    }

    let mut offset = payload_offset;
    let mut prop_index = 1u32;
    let mut seen = 0u32;
    while offset + 8 <= end {
        seen += 1;
        if seen > MAX_BOX_COUNT {
            return;
        }
        let Some(child) = parse_box(data, offset, end) else {
            break;
        };

        let payload = child.payload_offset();
        let payload_size = child.payload_size();
        match child.box_type {
            FOURCC_ISPE if payload_size >= 12 => {
                // FullBox header, then width and height
                if let (Some(width), Some(height)) = (
                    data.read_be_at::<u32>(payload + 4),
                    data.read_be_at::<u32>(payload + 8),
                ) {
                    if (out.ispe_count as usize) < out.ispe.len() {
                        out.ispe[out.ispe_count as usize] = IspeProp {
                            index: prop_index,
                            width,
                            height,
                        };
                        out.ispe_count += 1;
                    }
                }
            }
            FOURCC_IROT if payload_size >= 1 => {
                if let Some(raw) = data.read_be_at::<u8>(payload) {
                    if (out.irot_count as usize) < out.irot.len() {
                        out.irot[out.irot_count as usize] = ByteProp {
                            index: prop_index,
                            value: raw & 0x03,
                        };
                        out.irot_count += 1;
                    }
                }
            }
            FOURCC_IMIR if payload_size >= 1 => {
                if let Some(raw) = data.read_be_at::<u8>(payload) {
                    if (out.imir_count as usize) < out.imir.len() {
                        out.imir[out.imir_count as usize] = ByteProp {
                            index: prop_index,
                            value: raw,
                        };
                        out.imir_count += 1;
                    }
                }
            }
            FOURCC_AUXC if payload_size >= 5 => {
                collect_auxc_prop(data, &child, prop_index, out);
            }
            _ => {}
        }

        offset = child.end();
        if prop_index == u32::MAX {
            break;
        }
        prop_index += 1;
    }
}

/// `auxC` payload: FullBox header, NUL-terminated URN, then an opaque
/// subtype blob running to the end of the box.
fn collect_auxc_prop(data: MetaData, child: &BmffBox, prop_index: u32, out: &mut IpcoProps) {
    let type_start = child.payload_offset() + 4;
    let stop = child.end().min(data.len());
    if type_start >= stop {
        return;
    }
    let Some(tail) = data.subrange(type_start, stop - type_start) else {
        return;
    };
    let Some(nul) = tail.iter().position(|b| *b == 0) else {
        return;
    };
    if nul == 0 {
        return;
    }
    let aux_type = &tail[..nul];
    let semantic = classify_auxc_type(aux_type);

    if (out.auxc_count as usize) >= out.auxc.len() {
        return;
    }
    let mut prop = AuxCProp {
        index: prop_index,
        semantic,
        ..AuxCProp::EMPTY
    };
    let type_copy = aux_type.len().min(AUX_TYPE_CAP);
    prop.aux_type[..type_copy].copy_from_slice(&aux_type[..type_copy]);
    prop.aux_type_len = type_copy as u16;

    let subtype = &tail[nul + 1..];
    let subtype_copy = subtype.len().min(AUX_SUBTYPE_CAP);
    prop.aux_subtype[..subtype_copy].copy_from_slice(&subtype[..subtype_copy]);
    prop.aux_subtype_len = subtype_copy as u16;
    prop.aux_subtype_total_len = subtype.len().min(0xFFFF) as u16;
    prop.aux_subtype_truncated = subtype_copy < subtype.len();

    out.auxc[out.auxc_count as usize] = prop;
    out.auxc_count += 1;
}

/// Walk `ipma` associations and apply properties to the primary item and
/// the auxiliary catalogue.
///
/// Version 0 encodes item ids as u16 and property indices in 7 bits;
/// later versions use u32 ids and 15-bit indices. The essential bit is
/// ignored, and index 0 is a placeholder that associates nothing.
fn apply_ipma(data: MetaData, ipma: &BmffBox, props: &IpcoProps, summary: &mut PrimarySummary) {
    let payload_offset = ipma.payload_offset();
    if ipma.payload_size() < 8 {
        return;
    }
    let Some(version) = data.read_be_at::<u8>(payload_offset) else {
        return;
    };
    let Some(entry_count) = data.read_be_at::<u32>(payload_offset + 4) else {
        return;
    };
    if entry_count == 0 {
        return;
    }

    // association records are confined to the ipma box
    let mut cursor = data.cursor(payload_offset + 8, ipma.end());
    let take_entries = entry_count.min(MAX_BOX_COUNT);
    for _ in 0..take_entries {
        let item_id = if version < 1 {
            let Some(id) = cursor.read_be::<u16>() else {
                return;
            };
            id as u32
        } else {
            let Some(id) = cursor.read_be::<u32>() else {
                return;
            };
            id
        };

        let Some(assoc_count) = cursor.read_be::<u8>() else {
            return;
        };

        for _ in 0..assoc_count {
            let prop_index = if version < 1 {
                let Some(raw) = cursor.read_be::<u8>() else {
                    return;
                };
                u32::from(raw & 0x7F)
            } else {
                let Some(raw) = cursor.read_be::<u16>() else {
                    return;
                };
                u32::from(raw & 0x7FFF)
            };
            if prop_index != 0 {
                apply_property(item_id, prop_index, props, summary);
            }
        }
    }
}

fn apply_property(item_id: u32, prop_index: u32, props: &IpcoProps, summary: &mut PrimarySummary) {
    let is_primary = item_id == summary.item_id;
    let is_primary_aux = !is_primary && summary.is_primary_auxl(item_id);

    if is_primary {
        if let Some(p) = props.find_ispe(prop_index) {
            summary.width_height = Some((p.width, p.height));
        }
        if let Some(p) = props.find_irot(prop_index) {
            summary.rotation_degrees = Some(u16::from(p.value) * 90);
        }
        if let Some(p) = props.find_imir(prop_index) {
            summary.mirror = Some(p.value);
        }
    }

    // auxC fills the catalogue for any item; primary auxl targets also get
    // their semantic filed into the typed buckets
    if let Some(p) = props.find_auxc(prop_index) {
        summary.set_aux_item_semantic(item_id, p.semantic);
        if p.aux_type_len > 0 {
            summary.set_aux_item_type(item_id, &p.aux_type[..p.aux_type_len as usize]);
        }
        if p.aux_subtype_len > 0 || p.aux_subtype_total_len > 0 {
            summary.set_aux_item_subtype(
                item_id,
                &p.aux_subtype[..p.aux_subtype_len as usize],
                p.aux_subtype_total_len,
                p.aux_subtype_truncated,
            );
        }
        if is_primary_aux {
            summary.set_primary_auxl_semantic(item_id, p.semantic);
        }
    }
}

fn ascii_ieq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

fn ascii_icontains(hay: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    if hay.len() < needle.len() {
        return false;
    }
    hay.windows(needle.len())
        .any(|window| ascii_ieq(window, needle))
}

/// Classify an `auxC` URN into its semantic role.
///
/// Matching is case-insensitive ASCII; the URN sets cover the HEVC auxid
/// URNs, the MIAF/CICP alpha URN, and the vendor matte/depth spellings
/// seen in the wild.
pub fn classify_auxc_type(aux_type: &[u8]) -> AuxSemantic {
    if aux_type.is_empty() {
        return AuxSemantic::Unknown;
    }
    if ascii_ieq(aux_type, b"urn:mpeg:hevc:2015:auxid:1")
        || ascii_icontains(aux_type, b":aux:alpha")
        || ascii_ieq(aux_type, b"urn:mpeg:mpegb:cicp:systems:auxiliary:alpha")
    {
        return AuxSemantic::Alpha;
    }
    if ascii_ieq(aux_type, b"urn:mpeg:hevc:2015:auxid:2")
        || ascii_icontains(aux_type, b":aux:depth")
        || ascii_icontains(aux_type, b"depth")
    {
        return AuxSemantic::Depth;
    }
    if ascii_ieq(aux_type, b"urn:mpeg:hevc:2015:auxid:3")
        || ascii_icontains(aux_type, b":aux:disparity")
        || ascii_icontains(aux_type, b"disparity")
    {
        return AuxSemantic::Disparity;
    }
    if ascii_icontains(aux_type, b"portraitmatte")
        || ascii_icontains(aux_type, b":aux:matte")
        || ascii_icontains(aux_type, b"matte")
    {
        return AuxSemantic::Matte;
    }
    AuxSemantic::Unknown
}

/// How an `auxC` subtype payload should be presented, classified from its
/// total length and printability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubtypeKind {
    /// No subtype bytes at all.
    None,
    U8,
    U16Be,
    /// Four printable ASCII bytes.
    FourCc,
    U32Be,
    /// Sixteen bytes, canonically rendered as a hyphenated UUID.
    Uuid,
    /// Fully captured printable ASCII of some other length.
    Ascii,
    /// Anything else: present as raw bytes.
    Bytes,
}

impl SubtypeKind {
    pub fn name(self) -> &'static str {
        match self {
            SubtypeKind::None => "none",
            SubtypeKind::U8 => "u8",
            SubtypeKind::U16Be => "u16be",
            SubtypeKind::FourCc => "fourcc",
            SubtypeKind::U32Be => "u32be",
            SubtypeKind::Uuid => "uuid",
            SubtypeKind::Ascii => "ascii",
            SubtypeKind::Bytes => "bytes",
        }
    }
}

/// A classified subtype: the kind plus, where one exists, the decoded
/// integer value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubtypeInterpretation {
    pub kind: SubtypeKind,
    pub value: Option<u32>,
}

fn printable_ascii(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(|b| (0x20..=0x7E).contains(b))
}

/// Classify a subtype payload by total length and printability.
pub fn interpret_aux_subtype(
    subtype: &[u8],
    total_len: u16,
    truncated: bool,
) -> SubtypeInterpretation {
    let none = SubtypeInterpretation {
        kind: SubtypeKind::Bytes,
        value: None,
    };
    if total_len == 0 {
        return SubtypeInterpretation {
            kind: SubtypeKind::None,
            value: None,
        };
    }
    if subtype.is_empty() {
        return none;
    }

    match total_len {
        1 => SubtypeInterpretation {
            kind: SubtypeKind::U8,
            value: Some(subtype[0] as u32),
        },
        2 if subtype.len() >= 2 => SubtypeInterpretation {
            kind: SubtypeKind::U16Be,
            value: u16::read(subtype).map(u32::from),
        },
        4 if subtype.len() >= 4 => {
            if printable_ascii(&subtype[..4]) {
                SubtypeInterpretation {
                    kind: SubtypeKind::FourCc,
                    value: None,
                }
            } else {
                SubtypeInterpretation {
                    kind: SubtypeKind::U32Be,
                    value: u32::read(subtype),
                }
            }
        }
        16 if subtype.len() >= 16 => SubtypeInterpretation {
            kind: SubtypeKind::Uuid,
            value: None,
        },
        _ => {
            if !truncated && total_len as usize == subtype.len() && printable_ascii(subtype) {
                SubtypeInterpretation {
                    kind: SubtypeKind::Ascii,
                    value: None,
                }
            } else {
                none
            }
        }
    }
}
