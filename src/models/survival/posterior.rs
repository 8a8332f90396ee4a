//! Posterior-predictive summarization.
//!
//! Turns a raw MCMC trace into the summary curves needed for reporting:
//! survival over time per dose, dose-response curves over a log-spaced
//! dose grid, and hazard cdf/pdf curves, each reduced across the sample
//! axis to a pointwise 95% credible band (2.5th/50th/97.5th percentiles).
//!
//! One analysis walks `Uninitialized → TraceLoaded → Summarized`. The
//! finished summary is persisted as a single JSON blob keyed by
//! `(burn_in, thin)`; a repeat request with identical keys is served from
//! the cache instead of recomputing.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use faer::Mat;
use serde::{Deserialize, Serialize};

use crate::inference::{Trace, TraceView};
use crate::input::SurvivalData;
use crate::models::hazard;
use crate::models::response::{HeterogeneousResponse, homogeneous};
use crate::utils::{central_interval, log_spaced_grid, time_grid, usize_to_f64};

use super::assembly::parameter_names;
use super::types::{ModelVariant, SurvivalModelError};

/// Time-grid resolution for survival and hazard curves.
const TIME_STEP: f64 = 0.2;
/// Dose-grid resolution, in decades.
const DOSE_DECADE_STEP: f64 = 0.1;

/// Coarse progress reporting for long summarizations.
pub trait ProgressObserver {
    /// `fraction_complete` is monotone over one summarization, in `[0, 1]`.
    fn advance(&mut self, fraction_complete: f64);
}

/// Observer that discards all progress reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn advance(&mut self, _fraction_complete: f64) {}
}

impl<F: FnMut(f64)> ProgressObserver for F {
    fn advance(&mut self, fraction_complete: f64) {
        self(fraction_complete);
    }
}

/// Pointwise credible band over one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibleBand {
    pub lower: Vec<f64>,
    pub median: Vec<f64>,
    pub upper: Vec<f64>,
}

impl CredibleBand {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            lower: Vec::with_capacity(capacity),
            median: Vec::with_capacity(capacity),
            upper: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, (lower, median, upper): (f64, f64, f64)) {
        self.lower.push(lower);
        self.median.push(median);
        self.upper.push(upper);
    }

    /// Column-wise reduction of a sample × grid matrix.
    fn from_matrix(matrix: &Mat<f64>) -> Self {
        let mut band = Self::with_capacity(matrix.ncols());
        for j in 0..matrix.ncols() {
            let values: Vec<f64> = (0..matrix.nrows()).map(|i| matrix[(i, j)]).collect();
            band.push(central_interval(&values));
        }
        band
    }

    /// Band of adjacent-column differences (finite-difference pdf).
    fn from_matrix_differences(matrix: &Mat<f64>) -> Self {
        let cols = matrix.ncols().saturating_sub(1);
        let mut band = Self::with_capacity(cols);
        for j in 0..cols {
            let values: Vec<f64> = (0..matrix.nrows())
                .map(|i| matrix[(i, j + 1)] - matrix[(i, j)])
                .collect();
            band.push(central_interval(&values));
        }
        band
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.median.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.median.is_empty()
    }
}

/// Survival and dose-response bands for one response submodel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseCurveSet {
    /// Stable label, e.g. `group1-homogeneous`.
    pub label: String,
    /// One band per dose level over the time grid; the control dose is
    /// the uninfected survival curve alone.
    pub survival_by_dose: Vec<CredibleBand>,
    /// Infection probability band over the log-spaced dose grid.
    pub dose_response: CredibleBand,
}

/// Everything the reporting side needs, plus the post-burn-in parameter
/// sample arrays for the persistence contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    pub burn_in: usize,
    pub thin: usize,
    pub time_grid: Vec<f64>,
    pub dose_grid: Vec<f64>,
    pub curve_sets: Vec<ResponseCurveSet>,
    pub cdf_uninfected: CredibleBand,
    pub pdf_uninfected: CredibleBand,
    pub pdf_infected_g1: CredibleBand,
    pub pdf_infected_g2: CredibleBand,
    pub parameter_samples: BTreeMap<String, Vec<f64>>,
}

/// Output destinations for persisted artifacts; replaces ambient paths.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl OutputConfig {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    #[must_use]
    pub fn trace_path(&self, run_name: &str) -> PathBuf {
        self.directory.join(format!("{run_name}-trace.json"))
    }

    #[must_use]
    pub fn summary_path(&self, run_name: &str) -> PathBuf {
        self.directory.join(format!("{run_name}-summary.json"))
    }
}

/// Summarization controls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarizeOptions {
    /// Recompute even when a cached summary with matching keys exists.
    pub force_recompute: bool,
}

enum AnalysisState {
    Uninitialized,
    TraceLoaded(TraceView),
    Summarized {
        view: TraceView,
        summary: PosteriorSummary,
    },
}

/// Posterior analysis over one model run.
pub struct PosteriorAnalysis {
    data: SurvivalData,
    variant: ModelVariant,
    output: OutputConfig,
    state: AnalysisState,
}

impl PosteriorAnalysis {
    /// # Errors
    ///
    /// Returns `SurvivalModelError::InvalidInput` if the data fail
    /// validation.
    pub fn new(
        data: SurvivalData,
        variant: ModelVariant,
        output: OutputConfig,
    ) -> Result<Self, SurvivalModelError> {
        data.validate()?;
        Ok(Self {
            data,
            variant,
            output,
            state: AnalysisState::Uninitialized,
        })
    }

    /// Load a trace file and apply burn-in/thinning as a read-time view.
    ///
    /// # Errors
    ///
    /// Surfaces `TraceError::MissingArtifact` for an absent file,
    /// `MissingParameter` for an incomplete trace, and `ChainMismatch`
    /// when burn-in reaches any chain's length.
    pub fn load_trace(
        &mut self,
        path: &Path,
        burn_in: usize,
        thin: usize,
    ) -> Result<(), SurvivalModelError> {
        let trace = Trace::from_file(path)?;
        let required = parameter_names(self.variant, &self.data);
        let view = TraceView::build(&trace, burn_in, thin, &required)?;
        if view.draw_count() == 0 {
            return Err(SurvivalModelError::EmptyTrace);
        }
        self.state = AnalysisState::TraceLoaded(view);
        Ok(())
    }

    /// Summarize the loaded trace, serving identical `(burn_in, thin)`
    /// requests from the in-memory or on-disk cache.
    ///
    /// # Errors
    ///
    /// Returns `TraceNotLoaded` before [`Self::load_trace`], and
    /// persistence errors when the summary blob cannot be written.
    pub fn summarize<P: ProgressObserver>(
        &mut self,
        options: SummarizeOptions,
        progress: &mut P,
    ) -> Result<&PosteriorSummary, SurvivalModelError> {
        let view = match std::mem::replace(&mut self.state, AnalysisState::Uninitialized) {
            AnalysisState::Uninitialized => return Err(SurvivalModelError::TraceNotLoaded),
            AnalysisState::Summarized { view, summary } if !options.force_recompute => {
                progress.advance(1.0);
                self.state = AnalysisState::Summarized { view, summary };
                return self.current_summary();
            }
            AnalysisState::Summarized { view, .. } | AnalysisState::TraceLoaded(view) => view,
        };

        let summary = if options.force_recompute {
            None
        } else {
            Self::cached_summary(&self.output.summary_path(&self.data.name), &view)
        };
        let summary = match summary {
            Some(cached) => cached,
            None => {
                let result = self
                    .compute_summary(&view, progress)
                    .and_then(|computed| self.persist_summary(&computed).map(|()| computed));
                match result {
                    Ok(computed) => computed,
                    // A failed computation must not lose the loaded trace;
                    // the caller may retry or load different keys.
                    Err(error) => {
                        self.state = AnalysisState::TraceLoaded(view);
                        return Err(error);
                    }
                }
            }
        };

        progress.advance(1.0);
        self.state = AnalysisState::Summarized { view, summary };
        self.current_summary()
    }

    #[must_use]
    pub const fn data(&self) -> &SurvivalData {
        &self.data
    }

    fn current_summary(&self) -> Result<&PosteriorSummary, SurvivalModelError> {
        match &self.state {
            AnalysisState::Summarized { summary, .. } => Ok(summary),
            _ => Err(SurvivalModelError::TraceNotLoaded),
        }
    }

    /// A cached summary is valid only on exact `(burn_in, thin)` match;
    /// unreadable cache files count as a miss, not an error.
    fn cached_summary(path: &Path, view: &TraceView) -> Option<PosteriorSummary> {
        let file = File::open(path).ok()?;
        let summary: PosteriorSummary = serde_json::from_reader(BufReader::new(file)).ok()?;
        (summary.burn_in == view.burn_in && summary.thin == view.thin).then_some(summary)
    }

    fn persist_summary(&self, summary: &PosteriorSummary) -> Result<(), SurvivalModelError> {
        let path = self.output.summary_path(&self.data.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SurvivalModelError::PersistSummary {
                path: path.display().to_string(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| SurvivalModelError::PersistSummary {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::to_writer(BufWriter::new(file), summary)?)
    }

    fn required_samples<'a>(
        view: &'a TraceView,
        name: &str,
    ) -> Result<&'a [f64], SurvivalModelError> {
        view.samples(name)
            .ok_or_else(|| SurvivalModelError::MissingParameterValue {
                name: name.to_owned(),
            })
    }

    /// Sample × time matrix of cumulative death probabilities, built by
    /// accumulating interval probabilities so adjacent grid points share
    /// quadrature work.
    fn cdf_matrix(times: &[f64], shapes: &[f64], scales: &[f64], backgrounds: &[f64]) -> Mat<f64> {
        let n = shapes.len();
        let mut matrix = Mat::zeros(n, times.len());
        for i in 0..n {
            let mut acc = 0.0;
            let mut previous = 0.0;
            for (j, &t) in times.iter().enumerate() {
                acc = (acc + hazard::cumulative(previous, t, shapes[i], scales[i], backgrounds[i]))
                    .clamp(0.0, 1.0);
                matrix[(i, j)] = acc;
                previous = t;
            }
        }
        matrix
    }

    /// Survival band for one positive dose: the convex combination of the
    /// infected and uninfected cumulative curves weighted by each
    /// sample's infection probability.
    fn mixture_survival_band(
        infection_probabilities: &[f64],
        cdf_infected: &Mat<f64>,
        cdf_uninfected: &Mat<f64>,
    ) -> CredibleBand {
        let mut band = CredibleBand::with_capacity(cdf_uninfected.ncols());
        for j in 0..cdf_uninfected.ncols() {
            let values: Vec<f64> = infection_probabilities
                .iter()
                .enumerate()
                .map(|(i, &pi)| {
                    1.0 - pi.mul_add(cdf_infected[(i, j)], (1.0 - pi) * cdf_uninfected[(i, j)])
                })
                .collect();
            band.push(central_interval(&values));
        }
        band
    }

    fn uninfected_survival_band(cdf_uninfected: &Mat<f64>) -> CredibleBand {
        let mut band = CredibleBand::with_capacity(cdf_uninfected.ncols());
        for j in 0..cdf_uninfected.ncols() {
            let values: Vec<f64> = (0..cdf_uninfected.nrows())
                .map(|i| 1.0 - cdf_uninfected[(i, j)])
                .collect();
            band.push(central_interval(&values));
        }
        band
    }

    /// Response submodel specs for the current variant: label, parameter
    /// names, and which group's infected hazard they pair with.
    fn response_specs(variant: ModelVariant) -> Vec<ResponseSpec> {
        match variant {
            ModelVariant::Single => vec![
                ResponseSpec::homogeneous("group1-homogeneous", "p", true),
                ResponseSpec::heterogeneous("group2-heterogeneous", "p", "a", "b", false),
            ],
            ModelVariant::HomVsHetComparison => vec![
                ResponseSpec::homogeneous("group1-homogeneous", "p1hom", true),
                ResponseSpec::heterogeneous("group1-heterogeneous", "p1het", "a1", "b1", true),
                ResponseSpec::homogeneous("group2-homogeneous", "p2hom", false),
                ResponseSpec::heterogeneous("group2-heterogeneous", "p2het", "a2", "b2", false),
            ],
        }
    }

    fn compute_summary<P: ProgressObserver>(
        &self,
        view: &TraceView,
        progress: &mut P,
    ) -> Result<PosteriorSummary, SurvivalModelError> {
        let mean_u = Self::required_samples(view, "meanU")?;
        let s_u = Self::required_samples(view, "sU")?;
        let mean_i1 = Self::required_samples(view, "meanI1")?;
        let s_i1 = Self::required_samples(view, "sI1")?;
        let mean_i2 = Self::required_samples(view, "meanI2")?;
        let s_i2 = Self::required_samples(view, "sI2")?;
        let k = Self::required_samples(view, "k")?;

        // Derived scales, elementwise across the full sample array.
        let scale_of = |means: &[f64], shapes: &[f64]| -> Vec<f64> {
            means
                .iter()
                .zip(shapes)
                .map(|(mean, shape)| mean / shape)
                .collect()
        };
        let tau_u = scale_of(mean_u, s_u);
        let tau_i1 = scale_of(mean_i1, s_i1);
        let tau_i2 = scale_of(mean_i2, s_i2);

        let change_times = self.data.change_times();
        let grid_end = change_times.last().copied().unwrap_or(self.data.tmax);
        let times = time_grid(grid_end, TIME_STEP);

        let cdf_u = Self::cdf_matrix(&times, s_u, &tau_u, k);
        progress.advance(0.2);
        let cdf_i1 = Self::cdf_matrix(&times, s_i1, &tau_i1, k);
        progress.advance(0.4);
        let cdf_i2 = Self::cdf_matrix(&times, s_i2, &tau_i2, k);
        progress.advance(0.6);

        let positive_doses = self.data.positive_dose_indices();
        let dose_grid = positive_doses.first().map_or_else(Vec::new, |&first| {
            let lo = self.data.doses[first].log10() - 1.0;
            let hi = self.data.doses[self.data.doses.len() - 1].log10() + 1.0;
            log_spaced_grid(lo, hi, DOSE_DECADE_STEP)
        });

        let specs = Self::response_specs(self.variant);
        let mut curve_sets = Vec::with_capacity(specs.len());
        let spec_count = usize_to_f64(specs.len());
        for (spec_index, spec) in specs.iter().enumerate() {
            let responses = spec.build(view)?;
            let cdf_infected = if spec.group1 { &cdf_i1 } else { &cdf_i2 };

            let mut survival_by_dose = Vec::with_capacity(self.data.ndoses());
            for &dose in &self.data.doses {
                if dose > 0.0 {
                    let pis: Vec<f64> = (0..view.draw_count())
                        .map(|i| responses.probability(i, dose))
                        .collect();
                    survival_by_dose.push(Self::mixture_survival_band(&pis, cdf_infected, &cdf_u));
                } else {
                    survival_by_dose.push(Self::uninfected_survival_band(&cdf_u));
                }
            }

            let mut dose_response = CredibleBand::with_capacity(dose_grid.len());
            for &x in &dose_grid {
                let values: Vec<f64> = (0..view.draw_count())
                    .map(|i| responses.probability(i, x))
                    .collect();
                dose_response.push(central_interval(&values));
            }

            curve_sets.push(ResponseCurveSet {
                label: spec.label.to_owned(),
                survival_by_dose,
                dose_response,
            });
            progress.advance(0.3_f64.mul_add(usize_to_f64(spec_index + 1) / spec_count, 0.6));
        }

        Ok(PosteriorSummary {
            burn_in: view.burn_in,
            thin: view.thin,
            time_grid: times,
            dose_grid,
            curve_sets,
            cdf_uninfected: CredibleBand::from_matrix(&cdf_u),
            // Finite differencing of the cumulative curves sidesteps the
            // density blow-up at extreme shape samples.
            pdf_uninfected: CredibleBand::from_matrix_differences(&cdf_u),
            pdf_infected_g1: CredibleBand::from_matrix_differences(&cdf_i1),
            pdf_infected_g2: CredibleBand::from_matrix_differences(&cdf_i2),
            parameter_samples: view.all_samples().clone(),
        })
    }
}

/// Label and parameter wiring for one response submodel.
struct ResponseSpec {
    label: &'static str,
    group1: bool,
    p_name: &'static str,
    beta_names: Option<(&'static str, &'static str)>,
}

impl ResponseSpec {
    const fn homogeneous(label: &'static str, p_name: &'static str, group1: bool) -> Self {
        Self {
            label,
            group1,
            p_name,
            beta_names: None,
        }
    }

    const fn heterogeneous(
        label: &'static str,
        p_name: &'static str,
        a_name: &'static str,
        b_name: &'static str,
        group1: bool,
    ) -> Self {
        Self {
            label,
            group1,
            p_name,
            beta_names: Some((a_name, b_name)),
        }
    }

    fn build(&self, view: &TraceView) -> Result<SampleResponses, SurvivalModelError> {
        let p = PosteriorAnalysis::required_samples(view, self.p_name)?.to_vec();
        let eps = PosteriorAnalysis::required_samples(view, "eps")?.to_vec();
        match self.beta_names {
            None => Ok(SampleResponses::Homogeneous { p, eps }),
            Some((a_name, b_name)) => {
                let a = PosteriorAnalysis::required_samples(view, a_name)?;
                let b = PosteriorAnalysis::required_samples(view, b_name)?;
                let responses = p
                    .iter()
                    .zip(&eps)
                    .zip(a.iter().zip(b))
                    .map(|((&p_i, &eps_i), (&a_i, &b_i))| {
                        HeterogeneousResponse::new(p_i, a_i, b_i, eps_i)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SampleResponses::Heterogeneous { responses })
            }
        }
    }
}

/// Per-sample response evaluators, beta quantile nodes precomputed once.
enum SampleResponses {
    Homogeneous { p: Vec<f64>, eps: Vec<f64> },
    Heterogeneous { responses: Vec<HeterogeneousResponse> },
}

impl SampleResponses {
    fn probability(&self, sample: usize, dose: f64) -> f64 {
        match self {
            Self::Homogeneous { p, eps } => homogeneous(dose, p[sample], eps[sample]),
            Self::Heterogeneous { responses } => responses[sample].probability(dose),
        }
    }
}
