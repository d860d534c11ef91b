// src/models/catalog.rs

//! Fixed enumerations behind every categorical hike field.
//!
//! Each bucket type carries its French display label, which is also the value
//! persisted in the store and compared by the filter engine.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Declares a closed set of labelled values with serde support via the label.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every value, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Every label, in display order.
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            /// The display label.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Look up a value by its label, ignoring surrounding whitespace.
            pub fn from_label(label: &str) -> Option<Self> {
                let label = label.trim();
                Self::ALL.iter().copied().find(|v| v.as_str() == label)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                Self::from_label(&label)
                    .ok_or_else(|| de::Error::unknown_variant(&label, Self::LABELS))
            }
        }
    };
}

labelled_enum! {
    /// Route shape, derived from departure and arrival locations.
    pub enum TypeParcours {
        Lineaire => "Linéaire",
        Boucle => "En boucle",
    }
}

labelled_enum! {
    /// Distance bucket.
    pub enum KmRange {
        Under5 => "Moins de 5 km",
        From5To10 => "5-10 km",
        From10To15 => "10-15 km",
        From15To20 => "15-20 km",
        Over20 => "Plus de 20 km",
    }
}

labelled_enum! {
    /// Walking time bucket.
    pub enum DureeRange {
        Under3h => "Moins de 3h",
        From3To5h => "De 3h à 5h",
        Over5h => "Plus de 5h",
    }
}

labelled_enum! {
    /// Positive elevation gain bucket.
    pub enum DeniveleRange {
        Under500 => "Moins de 500 m",
        From500To1000 => "De 500 à 1000 m",
        Over1000 => "Plus de 1000 m",
    }
}

labelled_enum! {
    /// Grade on the SAC hiking scale.
    pub enum Difficulte {
        T1 => "Difficulté T1",
        T2 => "Difficulté T2",
        T3 => "Difficulté T3",
    }
}

labelled_enum! {
    /// Canonical season names.
    pub enum Season {
        Printemps => "Printemps",
        Ete => "Été",
        Automne => "Automne",
        Hiver => "Hiver",
    }
}

/// Season filter option standing for all four seasons.
pub const YEAR_ROUND: &str = "Toute l'année";

/// Season filter options, in display order.
pub const SEASONS: &[&str] = &[YEAR_ROUND, "Printemps", "Été", "Automne", "Hiver"];

/// Cantons and regions offered as filter options.
pub const CANTONS: &[&str] = &[
    "Genève",
    "France voisine",
    "Vaud",
    "Fribourg",
    "Valais romand",
    "Haut-Valais",
    "Neuchâtel",
    "Jura",
    "Berne",
];

/// Tag appended to the environment set of hikes walkable in winter.
pub const WINTER_TAG: &str = "Hivernal";

/// Environment tags recognised in the raw environment cell, in output order.
pub const ENVIRONMENT_TAGS: &[&str] = &[
    "Montagne",
    "Campagne",
    "Bord de rivière",
    "Bord de lac",
    "Bisses",
    "Gorges",
    "Ville",
];

/// Environment filter options, in display order.
pub const ENVIRONNEMENTS: &[&str] = &[
    "Montagne",
    "Campagne",
    "Bord de rivière",
    "Bord de lac",
    "Bisses",
    "Gorges",
    WINTER_TAG,
    "Ville",
];
