//! Target-distribution assembly.
//!
//! Wires priors, derived scale parameters (`tau = mean / shape` for the
//! uninfected, group-1-infected, and group-2-infected hazard regimes),
//! latent infection counts, and the mixture likelihood into one
//! sampleable log-probability. The biological monotonicity constraint is
//! a hard gate: any draw under which infected hosts would systematically
//! outlive natural mortality has zero mass and evaluates to
//! [`Evaluation::Rejected`].

use crate::inference::{Evaluation, ParameterVector, TargetDistribution};
use crate::input::{GroupObservations, SurvivalData};
use crate::models::hazard;
use crate::models::response::{HeterogeneousResponse, homogeneous};
use crate::utils::usize_to_f64;

use super::likelihood::{death_log_likelihood, survivor_log_likelihood};
use super::priors::{PriorSet, binomial_log_pmf};
use super::types::{ModelVariant, SurvivalModelError};

/// Full parameter-name list for `variant` over `data`: scalars first,
/// then one latent infection count per positive dose and latent prefix.
#[must_use]
pub fn parameter_names(variant: ModelVariant, data: &SurvivalData) -> Vec<String> {
    let mut names = variant.scalar_parameter_names();
    for prefix in variant.latent_prefixes() {
        for dose_index in data.positive_dose_indices() {
            names.push(format!("{prefix}{dose_index}"));
        }
    }
    names
}

/// Hazard-kernel outputs shared by every dose-level likelihood term of
/// one evaluation.
struct MortalityTerms {
    probd_uninfected: Vec<f64>,
    probd_infected_g1: Vec<f64>,
    probd_infected_g2: Vec<f64>,
    probs_uninfected: f64,
    probs_infected_g1: f64,
    probs_infected_g2: f64,
}

/// Infection probabilities per positive dose for one response submodel.
struct ResponseFit {
    latent_prefix: &'static str,
    infection_probabilities: Vec<f64>,
}

/// Assembled target distribution for one dataset and model variant.
#[derive(Debug, Clone)]
pub struct SurvivalModel {
    data: SurvivalData,
    variant: ModelVariant,
    priors: PriorSet,
    change_times: Vec<f64>,
    death_intervals_g1: Vec<Vec<usize>>,
    death_intervals_g2: Vec<Vec<usize>>,
    positive_doses: Vec<usize>,
    parameter_names: Vec<String>,
}

impl SurvivalModel {
    /// # Errors
    ///
    /// Returns `SurvivalModelError` if the data fail validation or the
    /// prior set carries invalid hyperparameters.
    pub fn new(
        data: SurvivalData,
        priors: PriorSet,
        variant: ModelVariant,
    ) -> Result<Self, SurvivalModelError> {
        data.validate()?;
        if !priors.is_valid() {
            return Err(SurvivalModelError::InvalidPriorConfig);
        }

        let change_times = data.change_times();
        let death_intervals_g1 = data.death_intervals(&data.group1, &change_times);
        let death_intervals_g2 = data.death_intervals(&data.group2, &change_times);
        let positive_doses = data.positive_dose_indices();
        let names = parameter_names(variant, &data);

        Ok(Self {
            data,
            variant,
            priors,
            change_times,
            death_intervals_g1,
            death_intervals_g2,
            positive_doses,
            parameter_names: names,
        })
    }

    #[must_use]
    pub const fn data(&self) -> &SurvivalData {
        &self.data
    }

    #[must_use]
    pub const fn variant(&self) -> ModelVariant {
        self.variant
    }

    #[must_use]
    pub fn change_times(&self) -> &[f64] {
        &self.change_times
    }

    fn require(params: &ParameterVector, name: &str) -> Result<f64, SurvivalModelError> {
        params
            .get(name)
            .ok_or_else(|| SurvivalModelError::MissingParameterValue {
                name: name.to_owned(),
            })
    }

    /// Interval death probabilities and study-end survival under the
    /// three hazard regimes, or `None` when the monotonicity constraint
    /// is violated.
    fn mortality_terms(
        &self,
        mean_u: f64,
        s_u: f64,
        mean_i1: f64,
        s_i1: f64,
        mean_i2: f64,
        s_i2: f64,
        k: f64,
    ) -> Option<MortalityTerms> {
        let tau_u = mean_u / s_u;
        let tau_i1 = mean_i1 / s_i1;
        let tau_i2 = mean_i2 / s_i2;
        let tmax = self.data.tmax;

        // Infected hosts cannot outlive natural mortality: the infected
        // cumulative death probability at study end must dominate the
        // uninfected one, for each group, under the pure gamma component.
        let end_uninfected = hazard::gamma_cumulative(tmax, s_u, tau_u);
        if hazard::gamma_cumulative(tmax, s_i1, tau_i1) < end_uninfected
            || hazard::gamma_cumulative(tmax, s_i2, tau_i2) < end_uninfected
        {
            return None;
        }

        let interval_probs = |shape: f64, scale: f64| -> Vec<f64> {
            let mut probs = Vec::with_capacity(self.change_times.len());
            let mut previous = 0.0;
            for &t in &self.change_times {
                probs.push(hazard::cumulative(previous, t, shape, scale, k));
                previous = t;
            }
            probs
        };

        Some(MortalityTerms {
            probd_uninfected: interval_probs(s_u, tau_u),
            probd_infected_g1: interval_probs(s_i1, tau_i1),
            probd_infected_g2: interval_probs(s_i2, tau_i2),
            probs_uninfected: hazard::survival(tmax, s_u, tau_u, k),
            probs_infected_g1: hazard::survival(tmax, s_i1, tau_i1, k),
            probs_infected_g2: hazard::survival(tmax, s_i2, tau_i2, k),
        })
    }

    /// Likelihood contribution of one group at one positive dose under
    /// one response submodel: latent binomial mass, deaths, survivors.
    #[allow(clippy::too_many_arguments)]
    fn dose_term(
        params: &ParameterVector,
        latent_name: &str,
        group: &GroupObservations,
        intervals: &[Vec<usize>],
        dose_index: usize,
        infection_probability: f64,
        probd_infected: &[f64],
        prob_survive_infected: f64,
        terms: &MortalityTerms,
    ) -> Result<f64, SurvivalModelError> {
        let n_at_risk = usize_to_f64(usize::try_from(group.nhosts[dose_index]).unwrap_or(usize::MAX));
        let infected = Self::require(params, latent_name)?;
        if !(0.0..=n_at_risk).contains(&infected) {
            return Ok(f64::NEG_INFINITY);
        }

        let mut ll = binomial_log_pmf(infected, n_at_risk, infection_probability);
        ll += death_log_likelihood(
            &intervals[dose_index],
            n_at_risk,
            infected,
            probd_infected,
            &terms.probd_uninfected,
        );
        let survivors =
            usize_to_f64(usize::try_from(group.survivors[dose_index]).unwrap_or(usize::MAX));
        ll += survivor_log_likelihood(
            survivors,
            n_at_risk,
            infected,
            prob_survive_infected,
            terms.probs_uninfected,
        );
        Ok(ll)
    }

    /// Response submodels for the current draw, each with per-dose
    /// infection probabilities, paired with the group they apply to.
    fn response_fits(
        &self,
        params: &ParameterVector,
    ) -> Result<Option<Vec<(ResponseFit, bool)>>, SurvivalModelError> {
        let eps = Self::require(params, "eps")?;
        let doses: Vec<f64> = self
            .positive_doses
            .iter()
            .map(|&i| self.data.doses[i])
            .collect();

        let hom_fit = |p: f64, prefix: &'static str| ResponseFit {
            latent_prefix: prefix,
            infection_probabilities: doses.iter().map(|&d| homogeneous(d, p, eps)).collect(),
        };
        let het_fit = |p: f64, a: f64, b: f64, prefix: &'static str| -> Option<ResponseFit> {
            let response = HeterogeneousResponse::new(p, a, b, eps).ok()?;
            Some(ResponseFit {
                latent_prefix: prefix,
                infection_probabilities: doses.iter().map(|&d| response.probability(d)).collect(),
            })
        };

        // Second tuple element: does this fit apply to group 1?
        let fits = match self.variant {
            ModelVariant::Single => {
                let p = Self::require(params, "p")?;
                let a = Self::require(params, "a")?;
                let b = Self::require(params, "b")?;
                let Some(het) = het_fit(p, a, b, "Ig2d") else {
                    return Ok(None);
                };
                vec![(hom_fit(p, "Ig1d"), true), (het, false)]
            }
            ModelVariant::HomVsHetComparison => {
                let p1hom = Self::require(params, "p1hom")?;
                let p1het = Self::require(params, "p1het")?;
                let a1 = Self::require(params, "a1")?;
                let b1 = Self::require(params, "b1")?;
                let p2hom = Self::require(params, "p2hom")?;
                let p2het = Self::require(params, "p2het")?;
                let a2 = Self::require(params, "a2")?;
                let b2 = Self::require(params, "b2")?;
                let Some(het1) = het_fit(p1het, a1, b1, "I1het") else {
                    return Ok(None);
                };
                let Some(het2) = het_fit(p2het, a2, b2, "I2het") else {
                    return Ok(None);
                };
                vec![
                    (hom_fit(p1hom, "I1hom"), true),
                    (het1, true),
                    (hom_fit(p2hom, "I2hom"), false),
                    (het2, false),
                ]
            }
        };
        Ok(Some(fits))
    }

    /// Evaluate the joint log-probability of `params`.
    ///
    /// # Errors
    ///
    /// Returns `SurvivalModelError::MissingParameterValue` or
    /// `MissingPrior` for malformed inputs; improbable draws come back as
    /// [`Evaluation::Rejected`].
    pub fn log_probability(
        &self,
        params: &ParameterVector,
    ) -> Result<Evaluation, SurvivalModelError> {
        let mut total = 0.0;

        for name in self.variant.scalar_parameter_names() {
            let value = Self::require(params, &name)?;
            let prior = self
                .priors
                .get(&name)
                .ok_or_else(|| SurvivalModelError::MissingPrior { name: name.clone() })?;
            let log_density = prior.log_density(value);
            if !log_density.is_finite() {
                return Ok(Evaluation::Rejected);
            }
            total += log_density;
        }

        let mean_u = Self::require(params, "meanU")?;
        let s_u = Self::require(params, "sU")?;
        let mean_i1 = Self::require(params, "meanI1")?;
        let s_i1 = Self::require(params, "sI1")?;
        let mean_i2 = Self::require(params, "meanI2")?;
        let s_i2 = Self::require(params, "sI2")?;
        let k = Self::require(params, "k")?;
        if [mean_u, s_u, mean_i1, s_i1, mean_i2, s_i2, k]
            .iter()
            .any(|v| *v <= 0.0)
        {
            return Ok(Evaluation::Rejected);
        }

        let Some(terms) = self.mortality_terms(mean_u, s_u, mean_i1, s_i1, mean_i2, s_i2, k)
        else {
            return Ok(Evaluation::Rejected);
        };

        let Some(fits) = self.response_fits(params)? else {
            return Ok(Evaluation::Rejected);
        };

        for (fit, is_group1) in &fits {
            let (group, intervals, probd_infected, probs_infected) = if *is_group1 {
                (
                    &self.data.group1,
                    &self.death_intervals_g1,
                    &terms.probd_infected_g1,
                    terms.probs_infected_g1,
                )
            } else {
                (
                    &self.data.group2,
                    &self.death_intervals_g2,
                    &terms.probd_infected_g2,
                    terms.probs_infected_g2,
                )
            };
            for (slot, &dose_index) in self.positive_doses.iter().enumerate() {
                let latent_name = format!("{}{}", fit.latent_prefix, dose_index);
                total += Self::dose_term(
                    params,
                    &latent_name,
                    group,
                    intervals,
                    dose_index,
                    fit.infection_probabilities[slot],
                    probd_infected,
                    probs_infected,
                    &terms,
                )?;
            }
        }

        if total.is_finite() {
            Ok(Evaluation::Accepted(total))
        } else {
            Ok(Evaluation::Rejected)
        }
    }
}

impl TargetDistribution for SurvivalModel {
    type Error = SurvivalModelError;

    fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    fn log_probability(&self, params: &ParameterVector) -> Result<Evaluation, Self::Error> {
        Self::log_probability(self, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::GroupObservations;

    fn synthetic_data() -> SurvivalData {
        let deaths_g1 = vec![vec![], vec![3.0, 5.0, 5.0], vec![2.0, 3.0, 4.0, 4.0]];
        let deaths_g2 = vec![vec![], vec![4.0, 6.0], vec![3.0, 5.0, 6.0]];
        SurvivalData::new(
            "synthetic".to_owned(),
            vec![0.0, 10.0, 100.0],
            GroupObservations::new(vec![100, 100, 100], deaths_g1, vec![100, 97, 96]),
            GroupObservations::new(vec![100, 100, 100], deaths_g2, vec![100, 98, 97]),
            14.0,
        )
    }

    fn good_parameters() -> ParameterVector {
        let mut params = ParameterVector::default();
        params.insert("p", 0.05);
        params.insert("a", 2.0);
        params.insert("b", 3.0);
        params.insert("eps", 0.05);
        params.insert("meanI1", 6.0);
        params.insert("sI1", 3.0);
        params.insert("meanI2", 7.0);
        params.insert("sI2", 3.0);
        params.insert("meanU", 25.0);
        params.insert("sU", 4.0);
        params.insert("k", 0.001);
        for name in ["Ig1d1", "Ig2d1"] {
            params.insert(name, 5.0);
        }
        for name in ["Ig1d2", "Ig2d2"] {
            params.insert(name, 20.0);
        }
        params
    }

    fn single_model() -> SurvivalModel {
        let data = synthetic_data();
        let priors = PriorSet::defaults(ModelVariant::Single, data.tmax);
        SurvivalModel::new(data, priors, ModelVariant::Single).expect("model builds")
    }

    #[test]
    fn good_parameters_have_finite_log_probability() {
        let model = single_model();
        let evaluation = model
            .log_probability(&good_parameters())
            .expect("evaluation succeeds");
        let lp = evaluation.log_probability().expect("accepted");
        assert!(lp.is_finite());
    }

    #[test]
    fn monotonicity_violation_is_rejected_not_erred() {
        let model = single_model();
        let mut params = good_parameters();
        // Infected now outlive natural mortality by a wide margin.
        params.insert("meanI1", 50.0);
        params.insert("meanU", 5.0);
        let evaluation = model.log_probability(&params).expect("evaluation succeeds");
        assert!(evaluation.is_rejected());
    }

    #[test]
    fn good_vector_beats_rejected_vector() {
        let model = single_model();
        let good = model
            .log_probability(&good_parameters())
            .expect("evaluation succeeds")
            .log_probability()
            .expect("accepted");
        // Rejection corresponds to -inf mass, hence strictly worse.
        assert!(good > f64::NEG_INFINITY);
    }

    #[test]
    fn missing_parameter_is_a_loud_error() {
        let model = single_model();
        let mut params = good_parameters();
        let removed = ParameterVector::from_iter(
            params
                .names()
                .filter(|n| *n != "eps")
                .map(|n| (n.to_owned(), params.get(n).unwrap_or_default()))
                .collect::<Vec<_>>(),
        );
        params = removed;
        let err = model.log_probability(&params).unwrap_err();
        assert!(matches!(
            err,
            SurvivalModelError::MissingParameterValue { .. }
        ));
    }

    #[test]
    fn out_of_range_latent_count_is_rejected() {
        let model = single_model();
        let mut params = good_parameters();
        params.insert("Ig1d1", 500.0);
        let evaluation = model.log_probability(&params).expect("evaluation succeeds");
        assert!(evaluation.is_rejected());
    }

    #[test]
    fn prior_support_violation_is_rejected() {
        let model = single_model();
        let mut params = good_parameters();
        params.insert("eps", 1.5);
        let evaluation = model.log_probability(&params).expect("evaluation succeeds");
        assert!(evaluation.is_rejected());
    }

    #[test]
    fn comparison_variant_declares_latents_for_each_submodel() {
        let data = synthetic_data();
        let names = parameter_names(ModelVariant::HomVsHetComparison, &data);
        for expected in ["I1hom1", "I1het2", "I2hom1", "I2het2"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn comparison_variant_evaluates_finite() {
        let data = synthetic_data();
        let priors = PriorSet::defaults(ModelVariant::HomVsHetComparison, data.tmax);
        let model = SurvivalModel::new(data, priors, ModelVariant::HomVsHetComparison)
            .expect("model builds");

        let mut params = ParameterVector::default();
        for (name, value) in [
            ("p1hom", 0.05),
            ("p1het", 0.05),
            ("a1", 2.0),
            ("b1", 3.0),
            ("p2hom", 0.03),
            ("p2het", 0.03),
            ("a2", 2.0),
            ("b2", 3.0),
            ("eps", 0.05),
            ("meanI1", 6.0),
            ("sI1", 3.0),
            ("meanI2", 7.0),
            ("sI2", 3.0),
            ("meanU", 25.0),
            ("sU", 4.0),
            ("k", 0.001),
        ] {
            params.insert(name, value);
        }
        for prefix in ["I1hom", "I1het", "I2hom", "I2het"] {
            params.insert(&format!("{prefix}1"), 5.0);
            params.insert(&format!("{prefix}2"), 20.0);
        }

        let lp = model
            .log_probability(&params)
            .expect("evaluation succeeds")
            .log_probability()
            .expect("accepted");
        assert!(lp.is_finite());
    }
}
