//! Core public types for the survival dose-response module.

use thiserror::Error;

use crate::inference::TraceError;
use crate::input::InputError;
use crate::models::response::ResponseError;

/// Which likelihood assembly to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelVariant {
    /// One infection-response curve per group: homogeneous for group 1,
    /// beta-heterogeneous for group 2.
    #[default]
    Single,
    /// Model-comparison fit: independent homogeneous and heterogeneous
    /// submodels for each group, sharing one set of mortality parameters.
    HomVsHetComparison,
}

impl ModelVariant {
    /// Infection-response parameter names fixed for this variant.
    #[must_use]
    pub fn response_parameter_names(self) -> Vec<String> {
        let names: &[&str] = match self {
            Self::Single => &["p", "a", "b", "eps"],
            Self::HomVsHetComparison => &[
                "p1hom", "p1het", "a1", "b1", "p2hom", "p2het", "a2", "b2", "eps",
            ],
        };
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    /// Mortality parameter names shared by both variants.
    #[must_use]
    pub const fn mortality_parameter_names() -> [&'static str; 7] {
        ["meanU", "sU", "meanI1", "sI1", "meanI2", "sI2", "k"]
    }

    /// All scalar (non-latent) parameter names for this variant.
    #[must_use]
    pub fn scalar_parameter_names(self) -> Vec<String> {
        let mut names = self.response_parameter_names();
        names.extend(
            Self::mortality_parameter_names()
                .iter()
                .map(|n| (*n).to_owned()),
        );
        names
    }

    /// Latent infection-count name prefixes for this variant; each prefix
    /// is suffixed with the absolute dose index of every positive dose.
    #[must_use]
    pub const fn latent_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Single => &["Ig1d", "Ig2d"],
            Self::HomVsHetComparison => &["I1hom", "I1het", "I2hom", "I2het"],
        }
    }
}

/// Errors returned by model assembly and posterior summarization.
#[derive(Debug, Error)]
pub enum SurvivalModelError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error("parameter `{name}` missing from parameter vector")]
    MissingParameterValue { name: String },
    #[error("no prior declared for parameter `{name}`")]
    MissingPrior { name: String },
    #[error("invalid prior configuration")]
    InvalidPriorConfig,
    #[error("posterior summarization requires a loaded trace")]
    TraceNotLoaded,
    #[error("trace contains no retained draws after burn-in and thinning")]
    EmptyTrace,
    #[error("failed to persist posterior summary to {path}")]
    PersistSummary {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode posterior summary")]
    EncodeSummary(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_variant_declares_expected_scalars() {
        let names = ModelVariant::Single.scalar_parameter_names();
        assert_eq!(names.len(), 11);
        assert!(names.iter().any(|n| n == "p"));
        assert!(names.iter().any(|n| n == "k"));
    }

    #[test]
    fn comparison_variant_declares_four_latent_prefixes() {
        assert_eq!(
            ModelVariant::HomVsHetComparison.latent_prefixes().len(),
            4
        );
    }
}
