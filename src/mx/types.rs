#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }
}

/// Outcome of the MX check. Records keep the order of the DNS answer.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MxStatus {
    Records(Vec<MxRecord>),
    NoRecords,
    /// The resolver failed without a definitive answer (timeout, SERVFAIL, ...).
    Unresolved(String),
}

impl MxStatus {
    pub fn records(&self) -> &[MxRecord] {
        match self {
            Self::Records(records) => records.as_slice(),
            Self::NoRecords | Self::Unresolved(_) => &[],
        }
    }

    pub fn has_records(&self) -> bool {
        !self.records().is_empty()
    }
}

/// Outcome of the A-record existence check.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainStatus {
    Exists,
    NotFound,
    Unresolved(String),
}

impl DomainStatus {
    pub fn exists(&self) -> bool {
        matches!(self, Self::Exists)
    }
}
