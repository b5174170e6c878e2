use std::str::FromStr;

use crate::types::ValueError;

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $token:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token),*
                }
            }
        }

        impl FromStr for $name {
            type Err = ValueError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                $(if value.eq_ignore_ascii_case($token) {
                    return Ok(Self::$variant);
                })*
                Err(ValueError::malformed($kind, value))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyword_enum!(
    /// `STATUS`. [`Status::None`] is never written.
    Status, "STATUS", {
        None => "NONE",
        Tentative => "TENTATIVE",
        Confirmed => "CONFIRMED",
        Cancelled => "CANCELLED",
        NeedsAction => "NEEDS-ACTION",
        Completed => "COMPLETED",
        InProcess => "IN-PROCESS",
        Draft => "DRAFT",
        Final => "FINAL",
    }
);

keyword_enum!(
    /// `CLASS`, the secrecy of an incidence.
    Secrecy, "CLASS", {
        Public => "PUBLIC",
        Private => "PRIVATE",
        Confidential => "CONFIDENTIAL",
    }
);

keyword_enum!(
    /// `TRANSP`, whether an event blocks time for free/busy purposes.
    Transparency, "TRANSP", {
        Opaque => "OPAQUE",
        Transparent => "TRANSPARENT",
    }
);

impl Default for Status {
    fn default() -> Self {
        Self::None
    }
}

impl Default for Secrecy {
    fn default() -> Self {
        Self::Public
    }
}

impl Default for Transparency {
    fn default() -> Self {
        Self::Opaque
    }
}
