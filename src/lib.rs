#![forbid(unsafe_code)]

//! # `survival_dose_models`
//!
//! Bayesian models for two-group dose-challenge survival experiments:
//! per-virion infection probabilities (homogeneous and beta-heterogeneous
//! susceptibility), gamma time-to-death mixtures with a constant
//! background hazard, and posterior summarization into credible-band
//! survival and dose-response curves.
//!
//! The crate was initially developed for animal challenge studies, but
//! the API is intentionally domain-agnostic over any paired
//! dose/time-to-event design with a control arm.

pub mod inference;
pub mod input;
pub mod models;
pub mod utils;

pub use inference::{Evaluation, ParameterVector, TargetDistribution, Trace, TraceError, TraceView};
pub use input::{GroupObservations, InputError, SurvivalData};

pub use models::survival::{
    CredibleBand, ModelVariant, NoProgress, OutputConfig, PosteriorAnalysis, PosteriorSummary,
    Prior, PriorSet, ProgressObserver, ResponseCurveSet, SummarizeOptions, SurvivalModel,
    SurvivalModelError, parameter_names,
};

pub use models::response::{HeterogeneousResponse, ResponseError, heterogeneous, homogeneous};
