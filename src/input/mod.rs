//! # Survival data inputs
//!
//! Observed time-to-event data from two host populations challenged with a
//! range of pathogen doses. Each group records, per dose level, the number
//! of hosts at risk, the ordered death times censored at the end of the
//! study, and the number of survivors at study end.
//!
//! The distinct death times across both groups form the *change times*
//! used to discretize the continuous hazard into interval probabilities.
//! They are derived once at model-build time and never mutated afterward.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when validating survival data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("at least one dose level is required")]
    EmptyDoses,
    #[error("dose levels must be finite and non-negative")]
    InvalidDose,
    #[error("dose levels must be strictly ascending")]
    UnsortedDoses,
    #[error("at most one dose level may be zero (the control)")]
    MultipleControlDoses,
    #[error("maximum study time must be positive and finite")]
    InvalidStudyEnd,
    #[error("group {group} must record {expected} dose levels; found {found}")]
    DoseCountMismatch {
        group: usize,
        expected: usize,
        found: usize,
    },
    #[error(
        "group {group}, dose index {dose_index}: hosts at risk ({nhosts}) must equal \
         deaths ({deaths}) plus survivors ({survivors})"
    )]
    HostCountMismatch {
        group: usize,
        dose_index: usize,
        nhosts: u64,
        deaths: usize,
        survivors: u64,
    },
    #[error("group {group}, dose index {dose_index}: death time {time} outside (0, tmax]")]
    InvalidDeathTime {
        group: usize,
        dose_index: usize,
        time: f64,
    },
}

/// Per-dose observations for one host population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupObservations {
    /// Hosts at risk per dose level.
    pub nhosts: Vec<u64>,
    /// Ordered death times per dose level, censored at study end.
    pub death_times: Vec<Vec<f64>>,
    /// Hosts still alive at study end, per dose level.
    pub survivors: Vec<u64>,
}

impl GroupObservations {
    #[must_use]
    pub const fn new(nhosts: Vec<u64>, death_times: Vec<Vec<f64>>, survivors: Vec<u64>) -> Self {
        Self {
            nhosts,
            death_times,
            survivors,
        }
    }

    fn validate(&self, group: usize, ndoses: usize, tmax: f64) -> Result<(), InputError> {
        if self.nhosts.len() != ndoses
            || self.death_times.len() != ndoses
            || self.survivors.len() != ndoses
        {
            return Err(InputError::DoseCountMismatch {
                group,
                expected: ndoses,
                found: self.nhosts.len().min(self.death_times.len()),
            });
        }
        for dose_index in 0..ndoses {
            let deaths = self.death_times[dose_index].len();
            let survivors = self.survivors[dose_index];
            let nhosts = self.nhosts[dose_index];
            let deaths_u64 = u64::try_from(deaths).unwrap_or(u64::MAX);
            if nhosts != deaths_u64 + survivors {
                return Err(InputError::HostCountMismatch {
                    group,
                    dose_index,
                    nhosts,
                    deaths,
                    survivors,
                });
            }
            for &time in &self.death_times[dose_index] {
                if !(time.is_finite() && time > 0.0 && time <= tmax) {
                    return Err(InputError::InvalidDeathTime {
                        group,
                        dose_index,
                        time,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Complete two-group dose-challenge survival dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalData {
    /// Short dataset name, used to key persisted artifacts.
    pub name: String,
    /// Dose levels, ascending; the first may be zero (control).
    pub doses: Vec<f64>,
    /// Observations for group 1 (homogeneous susceptibility model).
    pub group1: GroupObservations,
    /// Observations for group 2 (beta-heterogeneous susceptibility model).
    pub group2: GroupObservations,
    /// End of the study; death times are censored here.
    pub tmax: f64,
}

impl SurvivalData {
    #[must_use]
    pub const fn new(
        name: String,
        doses: Vec<f64>,
        group1: GroupObservations,
        group2: GroupObservations,
        tmax: f64,
    ) -> Self {
        Self {
            name,
            doses,
            group1,
            group2,
            tmax,
        }
    }

    #[must_use]
    pub fn ndoses(&self) -> usize {
        self.doses.len()
    }

    /// Indices of dose levels that carry an infection term (dose > 0).
    #[must_use]
    pub fn positive_dose_indices(&self) -> Vec<usize> {
        (0..self.doses.len())
            .filter(|&i| self.doses[i] > 0.0)
            .collect()
    }

    /// # Errors
    ///
    /// Returns `InputError` if counts, doses, or death times are
    /// inconsistent.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.doses.is_empty() {
            return Err(InputError::EmptyDoses);
        }
        if self.doses.iter().any(|d| !d.is_finite() || *d < 0.0) {
            return Err(InputError::InvalidDose);
        }
        if self.doses.windows(2).any(|w| w[0] >= w[1]) {
            return Err(InputError::UnsortedDoses);
        }
        if self.doses.iter().filter(|d| **d == 0.0).count() > 1 {
            return Err(InputError::MultipleControlDoses);
        }
        if !(self.tmax.is_finite() && self.tmax > 0.0) {
            return Err(InputError::InvalidStudyEnd);
        }
        self.group1.validate(1, self.doses.len(), self.tmax)?;
        self.group2.validate(2, self.doses.len(), self.tmax)?;
        Ok(())
    }

    /// Distinct death times across both groups, strictly ascending.
    #[must_use]
    pub fn change_times(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .group1
            .death_times
            .iter()
            .chain(self.group2.death_times.iter())
            .flatten()
            .copied()
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// Per-dose interval index (into `change_times`) of every recorded
    /// death in `group`.
    #[must_use]
    pub fn death_intervals(&self, group: &GroupObservations, change_times: &[f64]) -> Vec<Vec<usize>> {
        group
            .death_times
            .iter()
            .map(|times| {
                times
                    .iter()
                    .map(|t| {
                        change_times
                            .binary_search_by(|c| c.total_cmp(t))
                            .unwrap_or_else(|insertion| {
                                // Change times are derived from these same
                                // death times, so every lookup must hit.
                                debug_assert!(
                                    false,
                                    "death time {t} absent from change times"
                                );
                                insertion.min(change_times.len().saturating_sub(1))
                            })
                    })
                    .collect()
            })
            .collect()
    }
}
