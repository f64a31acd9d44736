use std::fmt;
use std::str::FromStr;

/// Instruments that share the Zephyr link protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Floats,
    Rachuts,
    Lpc,
    Rats,
}

impl Instrument {
    pub const ALL: [Instrument; 4] = [Self::Floats, Self::Rachuts, Self::Lpc, Self::Rats];

    /// Identifier carried in the `Inst` field.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Floats => "FLOATS",
            Self::Rachuts => "RACHUTS",
            Self::Lpc => "LPC",
            Self::Rats => "RATS",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Error returned when an instrument id is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown instrument {0:?} (expected FLOATS, RACHUTS, LPC or RATS)")]
pub struct UnknownInstrument(pub String);

impl FromStr for Instrument {
    type Err = UnknownInstrument;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|instrument| instrument.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}
