//! Sampler contract and trace handling.
//!
//! The MCMC engine itself lives outside this crate. The core exposes a
//! [`TargetDistribution`], a fixed parameter-name list plus a
//! log-probability evaluation over a [`ParameterVector`], and consumes
//! the engine's output as a [`Trace`]: one ordered sample sequence per
//! parameter per chain. Burn-in and thinning are applied as a read-time
//! view ([`TraceView`]), never by mutating the trace.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or viewing a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace artifact not found at {path}")]
    MissingArtifact {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode trace")]
    Decode(#[from] serde_json::Error),
    #[error("failed to write trace to {path}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parameter `{name}` missing from trace")]
    MissingParameter { name: String },
    #[error(
        "burn-in ({burn_in}) must be smaller than the chain length ({chain_length}) \
         of parameter `{name}`"
    )]
    ChainMismatch {
        name: String,
        burn_in: usize,
        chain_length: usize,
    },
    #[error("thinning factor must be positive")]
    InvalidThinning,
}

/// Explicit name-to-value map for one point of the parameter space.
///
/// The set of recognized names is declared statically per model variant;
/// lookups of undeclared names fail loudly in the model, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterVector {
    values: BTreeMap<String, f64>,
}

impl ParameterVector {
    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl FromIterator<(String, f64)> for ParameterVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Outcome of one target-distribution evaluation.
///
/// Zero-probability regions (the monotonicity constraint, prior support
/// violations) are a designed part of the target, so rejection is a value
/// the sampler branches on, not an error or an exception.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Finite log-probability.
    Accepted(f64),
    /// Zero probability mass; the sampler must reject the draw.
    Rejected,
}

impl Evaluation {
    #[must_use]
    pub const fn log_probability(self) -> Option<f64> {
        match self {
            Self::Accepted(lp) => Some(lp),
            Self::Rejected => None,
        }
    }

    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// The whole surface an external sampler sees.
pub trait TargetDistribution {
    type Error;

    /// Names of every sampled parameter, latent counts included.
    fn parameter_names(&self) -> &[String];

    /// Log-probability of `params`, or [`Evaluation::Rejected`] for
    /// zero-mass regions. Must be side-effect free.
    ///
    /// # Errors
    ///
    /// Returns an error only for malformed parameter vectors, never for
    /// merely improbable ones.
    fn log_probability(&self, params: &ParameterVector) -> Result<Evaluation, Self::Error>;
}

/// Raw sampler output: per parameter, one ordered sample sequence per chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    chains: BTreeMap<String, Vec<Vec<f64>>>,
}

impl Trace {
    /// Append one chain's samples for `name`.
    pub fn push_chain(&mut self, name: &str, samples: Vec<f64>) {
        self.chains.entry(name.to_owned()).or_default().push(samples);
    }

    #[must_use]
    pub fn chains(&self, name: &str) -> Option<&[Vec<f64>]> {
        self.chains.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn parameter_names(&self) -> Vec<&str> {
        self.chains.keys().map(String::as_str).collect()
    }

    /// # Errors
    ///
    /// Returns `TraceError::MissingArtifact` if the file is absent and
    /// `TraceError::Decode` if it cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path).map_err(|source| TraceError::MissingArtifact {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// # Errors
    ///
    /// Returns `TraceError::Persist` if the file cannot be created and
    /// `TraceError::Decode` if serialization fails.
    pub fn to_file(&self, path: &Path) -> Result<(), TraceError> {
        let file = File::create(path).map_err(|source| TraceError::Persist {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::to_writer(BufWriter::new(file), self)?)
    }
}

/// Read-time view of a trace: burn-in dropped and thinning applied per
/// chain independently, then chains concatenated.
#[derive(Debug, Clone)]
pub struct TraceView {
    pub burn_in: usize,
    pub thin: usize,
    samples: BTreeMap<String, Vec<f64>>,
}

impl TraceView {
    /// # Errors
    ///
    /// Returns `TraceError::InvalidThinning` for `thin == 0`,
    /// `TraceError::MissingParameter` when a required name is absent, and
    /// `TraceError::ChainMismatch` when `burn_in` reaches the length of
    /// any chain.
    pub fn build(
        trace: &Trace,
        burn_in: usize,
        thin: usize,
        required: &[String],
    ) -> Result<Self, TraceError> {
        if thin == 0 {
            return Err(TraceError::InvalidThinning);
        }

        let mut samples = BTreeMap::new();
        for name in required {
            let chains = trace
                .chains(name)
                .ok_or_else(|| TraceError::MissingParameter { name: name.clone() })?;
            let mut retained = Vec::new();
            for chain in chains {
                if burn_in >= chain.len() {
                    return Err(TraceError::ChainMismatch {
                        name: name.clone(),
                        burn_in,
                        chain_length: chain.len(),
                    });
                }
                retained.extend(chain[burn_in..].iter().step_by(thin).copied());
            }
            samples.insert(name.clone(), retained);
        }

        Ok(Self {
            burn_in,
            thin,
            samples,
        })
    }

    #[must_use]
    pub fn samples(&self, name: &str) -> Option<&[f64]> {
        self.samples.get(name).map(Vec::as_slice)
    }

    /// Retained draw count (identical across parameters by construction).
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.samples.values().next().map_or(0, Vec::len)
    }

    /// All post-burn-in sample arrays, keyed by parameter name.
    #[must_use]
    pub const fn all_samples(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.samples
    }
}
