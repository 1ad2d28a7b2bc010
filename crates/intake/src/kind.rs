use core::str::FromStr;

use serde::{Deserialize, Serialize};

use investi_core::DomainError;

/// Which application table a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationKind {
    Founder,
    Investor,
    Career,
}

impl ApplicationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationKind::Founder => "founder",
            ApplicationKind::Investor => "investor",
            ApplicationKind::Career => "career",
        }
    }
}

impl FromStr for ApplicationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "founder" | "founders" => Ok(Self::Founder),
            "investor" | "investors" => Ok(Self::Investor),
            "career" | "careers" => Ok(Self::Career),
            other => Err(DomainError::unsupported(format!("application kind '{other}'"))),
        }
    }
}

impl core::fmt::Display for ApplicationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
