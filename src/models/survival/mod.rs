//! Two-group dose-challenge survival model.
//!
//! Combines the dose-response families with mixture time-to-death
//! likelihoods into a single joint log-probability over scalar and
//! latent infection-count parameters, and summarizes sampler output
//! into credible-band curves for reporting.

pub mod assembly;
pub mod likelihood;
pub mod posterior;
pub mod priors;
pub mod types;

pub use assembly::{SurvivalModel, parameter_names};
pub use likelihood::{death_log_likelihood, mixture_weight, survivor_log_likelihood};
pub use posterior::{
    CredibleBand, NoProgress, OutputConfig, PosteriorAnalysis, PosteriorSummary, ProgressObserver,
    ResponseCurveSet, SummarizeOptions,
};
pub use priors::{Prior, PriorSet, binomial_log_pmf};
pub use types::{ModelVariant, SurvivalModelError};
