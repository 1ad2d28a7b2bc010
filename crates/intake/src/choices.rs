//! Enumerated choice fields shared by the application forms.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $wire:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            /// Accepts the wire value case-insensitively, with `-` or space
            /// in place of `_`.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| format!("unknown {}: {s}", stringify!($name)))
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

choice_enum! {
    /// Industry a startup operates in, or an investor focuses on.
    Sector {
        Fintech => "fintech",
        Healthtech => "healthtech",
        Edtech => "edtech",
        Agritech => "agritech",
        ECommerce => "e_commerce",
        Saas => "saas",
        Climate => "climate",
        Deeptech => "deeptech",
        Other => "other",
    }
}

choice_enum! {
    /// Funding stage of a startup.
    Stage {
        Idea => "idea",
        PreSeed => "pre_seed",
        Seed => "seed",
        SeriesA => "series_a",
        SeriesBPlus => "series_b_plus",
    }
}

choice_enum! {
    InvestorType {
        Angel => "angel",
        VentureCapital => "venture_capital",
        FamilyOffice => "family_office",
        Corporate => "corporate",
        Accelerator => "accelerator",
        Other => "other",
    }
}

choice_enum! {
    /// Typical cheque size, in USD.
    TicketSize {
        Under50k => "under_50k",
        From50kTo250k => "50k_250k",
        From250kTo1m => "250k_1m",
        From1mTo5m => "1m_5m",
        Over5m => "over_5m",
    }
}
