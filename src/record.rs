use crate::flag::Flags;

/// One parsed alignment line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub query_name: String,
    pub flag: u16,
    pub flags: Flags,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub read_group: String,
}

impl AlignmentRecord {
    pub fn new(
        query_name: impl Into<String>,
        flag: u16,
        sequence: impl Into<Vec<u8>>,
        quality: impl Into<Vec<u8>>,
        read_group: impl Into<String>,
    ) -> Self {
        Self {
            query_name: query_name.into(),
            flag,
            flags: Flags::decode(flag),
            sequence: sequence.into(),
            quality: quality.into(),
            read_group: read_group.into(),
        }
    }

    #[inline]
    pub fn is_unmapped(&self) -> bool {
        self.flags.unmapped
    }
    #[inline]
    pub fn mate_is_unmapped(&self) -> bool {
        self.flags.mate_unmapped
    }
    #[inline]
    pub fn is_reverse_strand(&self) -> bool {
        self.flags.reverse
    }
    #[inline]
    pub fn is_secondary(&self) -> bool {
        self.flags.secondary
    }
    #[inline]
    pub fn is_first_in_pair(&self) -> bool {
        self.flags.first_in_pair
    }
    #[inline]
    pub fn is_second_in_pair(&self) -> bool {
        self.flags.second_in_pair
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}
