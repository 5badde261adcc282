//! Macros for reducing boilerplate in per-axis class enums

/// Declares a class enum for one feature axis and implements [`FeatureClass`]
/// and `Display` for it
///
/// Each variant lists its canonical snake_case label and a clinical
/// description. Points are deliberately not declared here; the rule table
/// lives in `rules::points`.
///
/// [`FeatureClass`]: crate::types::FeatureClass
macro_rules! feature_class {
    (
        $(#[$meta:meta])*
        $name:ident, $axis:expr, {
            $($variant:ident => ($label:literal, $desc:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
        pub enum $name {
            $($variant),+
        }

        impl $crate::types::FeatureClass for $name {
            const AXIS: $crate::types::FeatureAxis = $axis;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn description(&self) -> &'static str {
                match self {
                    $($name::$variant => $desc),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", $crate::types::FeatureClass::label(self))
            }
        }
    };
}

pub(crate) use feature_class;
