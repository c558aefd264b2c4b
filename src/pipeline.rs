use crate::catalog::Catalog;
use crate::construct::DemandFirstConstructor;
use crate::data::{SlotAssignment, Snapshot};
use crate::error::SolverError;
use crate::exact::{ExactOutcome, ExactSolver};
use crate::feasibility::{FeasibilityAnalyzer, FeasibilityResult};
use crate::improve::{LocalSearchImprover, SearchParams, SearchStats};
use crate::quality::{QualityBreakdown, QualityScorer, QualityWeights};
use crate::validate::{HardRuleValidator, ValidationResult};
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Knobs of one `generate` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationParams {
    pub seed: u64,
    pub max_iterations: usize,
    pub patience: usize,
    /// Wall-clock cap on local search. Runs with a limit are not reproducible.
    pub time_limit_ms: Option<u64>,
    /// Construct even when the feasibility analysis says the snapshot cannot work.
    pub skip_feasibility: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        let search = SearchParams::default();
        Self {
            seed: 42,
            max_iterations: search.max_iterations,
            patience: search.patience,
            time_limit_ms: None,
            skip_feasibility: false,
        }
    }
}

impl GenerationParams {
    fn search(&self) -> SearchParams {
        SearchParams {
            max_iterations: self.max_iterations,
            patience: self.patience,
            time_limit: self.time_limit_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub seed: u64,
    pub courses: usize,
    pub completed_courses: usize,
    pub total_slots: usize,
    pub filler_slots: usize,
    pub initial_quality: f64,
    pub search: Option<SearchStats>,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub success: bool,
    pub slots: Vec<SlotAssignment>,
    pub quality: f64,
    pub quality_breakdown: QualityBreakdown,
    /// Absent when the run stopped before producing a timetable.
    pub validation: Option<ValidationResult>,
    pub feasibility: Option<FeasibilityResult>,
    pub stats: GenerationStats,
    pub failure_reason: Option<String>,
}

/// Entry point of the pipeline: owns the catalog of one snapshot and runs
/// feasibility analysis, construction, local search and validation over it.
#[derive(Debug, Clone)]
pub struct Timetabler {
    catalog: Catalog,
    weights: QualityWeights,
}

impl Timetabler {
    pub fn new(snapshot: Snapshot) -> Result<Self, SolverError> {
        Self::with_weights(snapshot, QualityWeights::default())
    }

    pub fn with_weights(snapshot: Snapshot, weights: QualityWeights) -> Result<Self, SolverError> {
        weights.check()?;
        Ok(Self {
            catalog: Catalog::new(snapshot)?,
            weights,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn analyze_feasibility(&self) -> FeasibilityResult {
        FeasibilityAnalyzer::new(&self.catalog).analyze()
    }

    pub fn validate(&self, slots: &[SlotAssignment]) -> ValidationResult {
        HardRuleValidator::new(&self.catalog).validate(slots)
    }

    pub fn generate(&self, params: &GenerationParams) -> GenerationOutcome {
        let started = Instant::now();
        info!(
            "Generating timetable: seed {}, max {} iterations, patience {}",
            params.seed, params.max_iterations, params.patience
        );

        let feasibility = if params.skip_feasibility {
            None
        } else {
            let result = self.analyze_feasibility();
            if !result.is_feasible {
                warn!("Aborting generation: snapshot is infeasible");
                return GenerationOutcome {
                    success: false,
                    slots: Vec::new(),
                    quality: 0.0,
                    quality_breakdown: QualityBreakdown::default(),
                    validation: None,
                    stats: GenerationStats {
                        seed: params.seed,
                        courses: self.catalog.courses().len(),
                        elapsed_ms: started.elapsed().as_millis(),
                        ..GenerationStats::default()
                    },
                    failure_reason: Some(format!(
                        "snapshot is infeasible: {} critical problems",
                        result.stats.critical_problems
                    )),
                    feasibility: Some(result),
                };
            }
            Some(result)
        };

        let scorer = QualityScorer::new(&self.catalog, self.weights);
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
        let mut state = DemandFirstConstructor::new(&self.catalog).construct(&scorer, &mut rng);
        let initial_quality = state.quality();
        let completed_courses = state.completed_courses().len();

        let search = LocalSearchImprover::new(&self.catalog, &scorer).improve(
            &mut state,
            &params.search(),
            &mut rng,
        );

        let quality = state.quality();
        let slots = state.into_slots();
        let validation = self.validate(&slots);
        let stats = GenerationStats {
            seed: params.seed,
            courses: self.catalog.courses().len(),
            completed_courses,
            total_slots: slots.len(),
            filler_slots: slots.iter().filter(|s| s.is_filler).count(),
            initial_quality,
            search: Some(search),
            elapsed_ms: started.elapsed().as_millis(),
        };
        self.finish(slots, quality, validation, feasibility, stats, &scorer)
    }

    /// Runs an exact solver over the same catalog. Its answer goes through
    /// the same validator as a heuristic one.
    pub fn solve_exact(&self, solver: &impl ExactSolver, budget: Duration) -> GenerationOutcome {
        let started = Instant::now();
        let scorer = QualityScorer::new(&self.catalog, self.weights);
        let slots = match solver.solve(&self.catalog, budget) {
            ExactOutcome::Solved { slots } => slots,
            ExactOutcome::NoSolution { reason } => {
                warn!("Exact solver gave up: {}", reason);
                return GenerationOutcome {
                    success: false,
                    slots: Vec::new(),
                    quality: 0.0,
                    quality_breakdown: QualityBreakdown::default(),
                    validation: None,
                    feasibility: None,
                    stats: GenerationStats {
                        courses: self.catalog.courses().len(),
                        elapsed_ms: started.elapsed().as_millis(),
                        ..GenerationStats::default()
                    },
                    failure_reason: Some(format!("no exact solution within budget: {reason}")),
                };
            }
        };

        let quality = scorer.score(&slots);
        let validation = self.validate(&slots);
        let stats = GenerationStats {
            courses: self.catalog.courses().len(),
            completed_courses: validation.stats.complete_courses,
            total_slots: slots.len(),
            filler_slots: slots.iter().filter(|s| s.is_filler).count(),
            initial_quality: quality,
            elapsed_ms: started.elapsed().as_millis(),
            ..GenerationStats::default()
        };
        self.finish(slots, quality, validation, None, stats, &scorer)
    }

    fn finish(
        &self,
        slots: Vec<SlotAssignment>,
        quality: f64,
        validation: ValidationResult,
        feasibility: Option<FeasibilityResult>,
        stats: GenerationStats,
        scorer: &QualityScorer<'_>,
    ) -> GenerationOutcome {
        let success = validation.is_valid;
        let failure_reason = if success {
            info!("Generated {} slots, quality {:.3}", slots.len(), quality);
            None
        } else {
            let reason = format!(
                "{} rule violations, {} integrity errors",
                validation.violations.len(),
                validation.integrity_errors.len()
            );
            warn!("Generated timetable is not valid: {}", reason);
            Some(reason)
        };
        GenerationOutcome {
            success,
            quality_breakdown: scorer.breakdown(&slots),
            slots,
            quality,
            validation: Some(validation),
            feasibility,
            stats,
            failure_reason,
        }
    }
}
