/// H.265 `nal_unit_type` values (ITU-T H.265 Table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    TrailN,
    TrailR,
    BlaWLp,
    BlaWRadl,
    BlaNLp,
    IdrWRadl,
    IdrNLp,
    CraNut,
    ReservedIrap(u8),
    Vps,
    Sps,
    Pps,
    Aud,
    Eos,
    Eob,
    PrefixSei,
    SuffixSei,
    Other(u8),
}

impl NalUnitType {
    /// Reads the type out of the first byte of the two-byte NAL header.
    pub fn from_header(header: u8) -> Self {
        match (header >> 1) & 0x3F {
            0 => NalUnitType::TrailN,
            1 => NalUnitType::TrailR,
            16 => NalUnitType::BlaWLp,
            17 => NalUnitType::BlaWRadl,
            18 => NalUnitType::BlaNLp,
            19 => NalUnitType::IdrWRadl,
            20 => NalUnitType::IdrNLp,
            21 => NalUnitType::CraNut,
            t @ 22..=23 => NalUnitType::ReservedIrap(t),
            32 => NalUnitType::Vps,
            33 => NalUnitType::Sps,
            34 => NalUnitType::Pps,
            35 => NalUnitType::Aud,
            36 => NalUnitType::Eos,
            37 => NalUnitType::Eob,
            39 => NalUnitType::PrefixSei,
            40 => NalUnitType::SuffixSei,
            other => NalUnitType::Other(other),
        }
    }

    /// Intra random access point pictures (BLA, IDR, CRA).
    pub fn is_irap(&self) -> bool {
        matches!(
            self,
            NalUnitType::BlaWLp
                | NalUnitType::BlaWRadl
                | NalUnitType::BlaNLp
                | NalUnitType::IdrWRadl
                | NalUnitType::IdrNLp
                | NalUnitType::CraNut
                | NalUnitType::ReservedIrap(_)
        )
    }
}
