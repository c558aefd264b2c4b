//! Exact fallback for snapshots the heuristic pipeline cannot complete.
//!
//! [`ExactSolver`] is the seam; [`HighsExactSolver`] is the integer model
//! solved with HiGHS through `good_lp`, compiled with the `exact` feature.

use crate::catalog::Catalog;
use crate::data::SlotAssignment;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ExactOutcome {
    Solved { slots: Vec<SlotAssignment> },
    NoSolution { reason: String },
}

/// Builds a complete timetable satisfying every hard rule within a time
/// budget, or explains why it could not.
pub trait ExactSolver {
    fn solve(&self, catalog: &Catalog, budget: Duration) -> ExactOutcome;
}

#[cfg(feature = "exact")]
pub use highs::HighsExactSolver;

#[cfg(feature = "exact")]
mod highs {
    use super::{ExactOutcome, ExactSolver};
    use crate::catalog::Catalog;
    use crate::data::{CourseId, Period, SlotAssignment, SubjectId, TeacherId, Weekday};
    use good_lp::variable;
    use good_lp::{
        Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
    };
    use itertools::Itertools;
    use log::{info, trace, warn};
    use std::collections::BTreeMap;
    use std::time::{Duration, Instant};

    type Key = (CourseId, Weekday, Period, SubjectId, TeacherId);

    /// 0/1 model over admissible `(course, day, period, subject, teacher)`
    /// combinations. Teacher availability, eligibility and the teaching grid
    /// are enforced by never creating a variable that would break them.
    #[derive(Debug, Clone)]
    pub struct HighsExactSolver {
        pub seed: i32,
        pub log_to_console: bool,
    }

    impl Default for HighsExactSolver {
        fn default() -> Self {
            Self {
                seed: 1234,
                log_to_console: false,
            }
        }
    }

    impl HighsExactSolver {
        fn admissible(&self, catalog: &Catalog) -> Vec<Key> {
            let mut keys = Vec::new();
            for course in catalog.courses() {
                let subjects: Vec<SubjectId> = catalog
                    .requirements(course.id)
                    .iter()
                    .map(|r| r.subject_id)
                    .chain(catalog.filler_subjects_for(course.id).iter().copied())
                    .sorted()
                    .dedup()
                    .collect();
                for (day, period) in catalog.teaching_grid() {
                    for &subject in &subjects {
                        for teacher in catalog.eligible_teachers(subject) {
                            if catalog.is_available(teacher, day, period) {
                                keys.push((course.id, day, period, subject, teacher));
                            }
                        }
                    }
                }
            }
            keys
        }
    }

    fn sum_of(vars: &[Variable]) -> Expression {
        vars.iter().copied().sum()
    }

    impl ExactSolver for HighsExactSolver {
        fn solve(&self, catalog: &Catalog, budget: Duration) -> ExactOutcome {
            let start_time = Instant::now();
            let keys = self.admissible(catalog);
            info!(
                "Setting up exact model with {} courses and {} candidate assignments",
                catalog.courses().len(),
                keys.len()
            );
            if keys.is_empty() {
                if catalog.courses().iter().all(|c| catalog.target_slots(c.id) == 0) {
                    return ExactOutcome::Solved { slots: Vec::new() };
                }
                return ExactOutcome::NoSolution {
                    reason: "no admissible assignment exists for any course".to_string(),
                };
            }

            let mut problem = ProblemVariables::new();
            let vars = problem.add_vector(variable().binary(), keys.len());
            let assignment_vars: Vec<(Key, Variable)> = keys.into_iter().zip(vars).collect();

            let preferred: Expression = assignment_vars
                .iter()
                .filter(|((_, _, period, subject, _), _)| {
                    catalog
                        .subject(*subject)
                        .and_then(|s| catalog.matches_preference(s.preferred_time, *period))
                        .unwrap_or(false)
                })
                .map(|(_, var)| *var)
                .sum();

            let mut model = problem
                .maximise(preferred)
                .using(default_solver)
                .set_option("threads", 1)
                .set_option("random_seed", self.seed)
                .set_option("time_limit", budget.as_secs_f64())
                .set_option("log_to_console", if self.log_to_console { "true" } else { "false" });

            // one lesson per course cell
            let by_course_cell: BTreeMap<(CourseId, Weekday, Period), Vec<Variable>> = assignment_vars
                .iter()
                .map(|&((c, d, p, _, _), var)| ((c, d, p), var))
                .into_group_map()
                .into_iter()
                .collect();
            for vars in by_course_cell.values() {
                model.add_constraint(constraint!(sum_of(vars) <= 1));
            }

            // one lesson per teacher cell
            let by_teacher_cell: BTreeMap<(TeacherId, Weekday, Period), Vec<Variable>> = assignment_vars
                .iter()
                .map(|&((_, d, p, _, t), var)| ((t, d, p), var))
                .into_group_map()
                .into_iter()
                .collect();
            for vars in by_teacher_cell.values() {
                model.add_constraint(constraint!(sum_of(vars) <= 1));
            }

            let by_course_subject: BTreeMap<(CourseId, SubjectId), Vec<Variable>> = assignment_vars
                .iter()
                .map(|&((c, _, _, s, _), var)| ((c, s), var))
                .into_group_map()
                .into_iter()
                .collect();
            let by_course: BTreeMap<CourseId, Vec<Variable>> = assignment_vars
                .iter()
                .map(|&((c, _, _, _, _), var)| (c, var))
                .into_group_map()
                .into_iter()
                .collect();
            for course in catalog.courses() {
                for requirement in catalog.requirements(course.id) {
                    let vars = by_course_subject
                        .get(&(course.id, requirement.subject_id))
                        .map_or(&[][..], Vec::as_slice);
                    if vars.is_empty() {
                        if requirement.blocks == 0 {
                            continue;
                        }
                        return ExactOutcome::NoSolution {
                            reason: format!(
                                "course {} cannot receive any block of subject {}",
                                course.id, requirement.subject_id
                            ),
                        };
                    }
                    let blocks = f64::from(requirement.blocks);
                    model.add_constraint(constraint!(sum_of(vars) == blocks));
                }
                let target = f64::from(catalog.target_slots(course.id));
                let vars = by_course.get(&course.id).map_or(&[][..], Vec::as_slice);
                model.add_constraint(constraint!(sum_of(vars) == target));
            }

            let by_course_day_subject: BTreeMap<(CourseId, Weekday, SubjectId), Vec<Variable>> =
                assignment_vars
                    .iter()
                    .map(|&((c, d, _, s, _), var)| ((c, d, s), var))
                    .into_group_map()
                    .into_iter()
                    .collect();
            for ((_, _, subject), vars) in &by_course_day_subject {
                if let Some(cap) = catalog.daily_cap(*subject) {
                    let cap = f64::from(cap);
                    model.add_constraint(constraint!(sum_of(vars) <= cap));
                }
            }

            // same-day blocks of a rule-covered subject form one run: for any
            // p < q < r, using p and r forces q
            let mut by_run: BTreeMap<(CourseId, Weekday, SubjectId), BTreeMap<Period, Vec<Variable>>> =
                BTreeMap::new();
            for &((c, d, p, s, _), var) in &assignment_vars {
                if catalog.consecutive_rule_covers(s) {
                    by_run.entry((c, d, s)).or_default().entry(p).or_default().push(var);
                }
            }
            for cells in by_run.values() {
                // periods without variables, breaks included, are never filled
                let occupied =
                    |period: Period| sum_of(cells.get(&period).map_or(&[][..], Vec::as_slice));
                for (&p, &r) in cells.keys().tuple_combinations() {
                    for q in p + 1..r {
                        model.add_constraint(constraint!(
                            occupied(p) + occupied(r) - occupied(q) <= 1
                        ));
                    }
                }
            }
            trace!("Exact model built in {:.2?}", start_time.elapsed());

            info!("Starting exact solver with a budget of {:.2?}", budget);
            let solution = match model.solve() {
                Ok(s) => s,
                Err(e) => {
                    warn!("Exact solver found no solution: {}", e);
                    return ExactOutcome::NoSolution {
                        reason: format!("solver error: {e}"),
                    };
                }
            };
            info!("Exact solution found in {:.2?}", start_time.elapsed());

            let mut slots: Vec<SlotAssignment> = assignment_vars
                .iter()
                .filter(|(_, var)| solution.value(*var) > 0.9)
                .filter_map(|&((course_id, day, period, subject_id, teacher_id), _)| {
                    let course = catalog.course(course_id)?;
                    let subject = catalog.subject(subject_id)?;
                    Some(SlotAssignment {
                        course_id,
                        subject_id,
                        teacher_id,
                        day,
                        period,
                        room_id: course.fixed_room_id,
                        is_filler: subject.is_filler,
                    })
                })
                .collect();
            slots.sort_by_key(|s| (s.course_id, s.day, s.period));
            ExactOutcome::Solved { slots }
        }
    }

}
