use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A TCP control flag.
///
/// Declaration order is the canonical display order FIN, SYN, RST, PSH,
/// ACK, URG; the derived `Ord` (and therefore [`FlagSet`] iteration) follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TcpFlag {
    Fin,
    Syn,
    Rst,
    Psh,
    Ack,
    Urg,
}

impl TcpFlag {
    /// Every flag, in canonical order
    pub const ALL: [TcpFlag; 6] = [
        TcpFlag::Fin,
        TcpFlag::Syn,
        TcpFlag::Rst,
        TcpFlag::Psh,
        TcpFlag::Ack,
        TcpFlag::Urg,
    ];

    /// Upper-case name as printed in packet records
    pub fn name(self) -> &'static str {
        match self {
            TcpFlag::Fin => "FIN",
            TcpFlag::Syn => "SYN",
            TcpFlag::Rst => "RST",
            TcpFlag::Psh => "PSH",
            TcpFlag::Ack => "ACK",
            TcpFlag::Urg => "URG",
        }
    }
}

impl fmt::Display for TcpFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of TCP control flags.
///
/// Displays as a bracketed, space separated list in canonical order,
/// e.g. `[SYN ACK]`, or `[]` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeSet<TcpFlag>);

impl FlagSet {
    /// Create an empty flag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flag; returns false if it was already present
    pub fn insert(&mut self, flag: TcpFlag) -> bool {
        self.0.insert(flag)
    }

    pub fn contains(&self, flag: TcpFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if at least one flag is present in both sets
    pub fn intersects(&self, other: &FlagSet) -> bool {
        self.iter().any(|flag| other.contains(flag))
    }

    /// Iterate in canonical order
    pub fn iter(&self) -> impl Iterator<Item = TcpFlag> + '_ {
        self.0.iter().copied()
    }

    /// Flag names in canonical order
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(TcpFlag::name).collect()
    }
}

impl FromIterator<TcpFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = TcpFlag>>(iter: I) -> Self {
        FlagSet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[TcpFlag; N]> for FlagSet {
    fn from(flags: [TcpFlag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(" "))
    }
}
