use crate::catalog::Catalog;
use crate::data::{Period, SlotAssignment, SubjectId, Weekday};
use crate::quality::{QualityScorer, is_strictly_consecutive};
use crate::state::GenerationState;
use log::{debug, info, trace};
use rand::Rng;
use rand::seq::IteratorRandom;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Budget of one hill-climbing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    pub max_iterations: usize,
    pub patience: usize,
    /// Checked between iterations only. Leave unset for reproducible runs.
    pub time_limit: Option<Duration>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            patience: 50,
            time_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    Iterations,
    Patience,
    TimeLimit,
    NoCandidates,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStats {
    pub iterations: usize,
    pub accepted_moves: usize,
    pub rejected_infeasible: usize,
    pub initial_quality: f64,
    pub final_quality: f64,
    pub stopped_by: StopReason,
}

/// Single-solution hill climbing over intra-course period swaps.
///
/// A move picks a completed course, two of its lessons, and exchanges their
/// `(day, period)`. It is applied only when it keeps every hard constraint the
/// state tracks and strictly improves the quality score.
pub struct LocalSearchImprover<'a> {
    catalog: &'a Catalog,
    scorer: &'a QualityScorer<'a>,
}

impl<'a> LocalSearchImprover<'a> {
    pub fn new(catalog: &'a Catalog, scorer: &'a QualityScorer<'a>) -> Self {
        Self { catalog, scorer }
    }

    pub fn improve<R: Rng>(
        &self,
        state: &mut GenerationState,
        params: &SearchParams,
        rng: &mut R,
    ) -> SearchStats {
        let started = Instant::now();
        let initial_quality = state.quality();
        let mut best = initial_quality;
        let mut without_improvement = 0;
        let mut accepted_moves = 0;
        let mut rejected_infeasible = 0;
        let mut iterations = 0;
        info!(
            "Starting local search: quality {:.3}, max {} iterations, patience {}",
            initial_quality, params.max_iterations, params.patience
        );

        let stopped_by = loop {
            if iterations >= params.max_iterations {
                break StopReason::Iterations;
            }
            if without_improvement >= params.patience {
                break StopReason::Patience;
            }
            if params.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
                break StopReason::TimeLimit;
            }
            let Some(&course) = state.completed_courses().iter().choose(rng) else {
                break StopReason::NoCandidates;
            };
            iterations += 1;

            let indices = state.course_slot_indices(course);
            if indices.len() < 2 {
                without_improvement += 1;
                continue;
            }
            let picked = sample(rng, indices.len(), 2);
            let (a, b) = (indices[picked.index(0)], indices[picked.index(1)]);

            let Some((new_a, new_b)) = self.propose_swap(state, a, b) else {
                rejected_infeasible += 1;
                without_improvement += 1;
                continue;
            };

            let mut candidate = state.slots().to_vec();
            candidate[a] = new_a.clone();
            candidate[b] = new_b.clone();
            let quality = self.scorer.score(&candidate);

            if quality > state.quality() && state.apply_swap(a, b, new_a, new_b).is_ok() {
                state.set_quality(quality);
                accepted_moves += 1;
                trace!("Iteration {}: accepted swap, quality {:.4}", iterations, quality);
            }

            if state.quality() > best {
                best = state.quality();
                without_improvement = 0;
                debug!("Iteration {}: new best quality {:.4}", iterations, best);
            } else {
                without_improvement += 1;
            }
        };

        info!(
            "Local search stopped ({:?}) after {} iterations: quality {:.3} -> {:.3}, {} moves accepted",
            stopped_by,
            iterations,
            initial_quality,
            state.quality(),
            accepted_moves
        );
        SearchStats {
            iterations,
            accepted_moves,
            rejected_infeasible,
            initial_quality,
            final_quality: state.quality(),
            stopped_by,
        }
    }

    /// Two new slot values with exchanged cells, or `None` if the exchange
    /// would put a teacher outside their availability, double-book them,
    /// break a per-day cap or split a run a consecutive rule protects.
    fn propose_swap(
        &self,
        state: &GenerationState,
        a: usize,
        b: usize,
    ) -> Option<(SlotAssignment, SlotAssignment)> {
        let slot_a = &state.slots()[a];
        let slot_b = &state.slots()[b];
        let new_a = slot_a.moved_to(slot_b.day, slot_b.period);
        let new_b = slot_b.moved_to(slot_a.day, slot_a.period);

        if slot_a.teacher_id != slot_b.teacher_id {
            let reachable = self
                .catalog
                .is_available(new_a.teacher_id, new_a.day, new_a.period)
                && self
                    .catalog
                    .is_available(new_b.teacher_id, new_b.day, new_b.period);
            if !reachable {
                return None;
            }
            // the two freed cells belong to the other teacher, so any hit is a third lesson
            if state.teacher_busy(new_a.teacher_id, new_a.day, new_a.period)
                || state.teacher_busy(new_b.teacher_id, new_b.day, new_b.period)
            {
                return None;
            }
        }

        if slot_a.subject_id != slot_b.subject_id && slot_a.day != slot_b.day {
            for (moved, from) in [(&new_a, slot_a), (&new_b, slot_b)] {
                if let Some(cap) = self.catalog.daily_cap(moved.subject_id) {
                    let already = state.blocks_on_day(moved.course_id, moved.subject_id, moved.day);
                    if already + 1 > cap {
                        trace!("Swap rejected: subject {} would exceed {} per day", from.subject_id, cap);
                        return None;
                    }
                }
            }
        }

        if slot_a.subject_id != slot_b.subject_id {
            let swapped = state.slots().iter().enumerate().map(|(i, s)| match i {
                i if i == a => &new_a,
                i if i == b => &new_b,
                _ => s,
            });
            let before = self.split_runs(state.slots().iter(), slot_a, slot_b);
            if self.split_runs(swapped, slot_a, slot_b) > before {
                trace!(
                    "Swap rejected: course {} would split a consecutive run",
                    slot_a.course_id
                );
                return None;
            }
        }
        Some((new_a, new_b))
    }

    /// Number of rule-covered `(subject, day)` groups touched by a swap of
    /// `slot_a` and `slot_b` whose periods are not one unbroken run.
    fn split_runs<'s>(
        &self,
        slots: impl Iterator<Item = &'s SlotAssignment>,
        slot_a: &SlotAssignment,
        slot_b: &SlotAssignment,
    ) -> usize {
        let mut groups: Vec<((SubjectId, Weekday), Vec<Period>)> = [slot_a.subject_id, slot_b.subject_id]
            .into_iter()
            .filter(|&subject| self.catalog.consecutive_rule_covers(subject))
            .flat_map(|subject| [(subject, slot_a.day), (subject, slot_b.day)])
            .map(|key| (key, Vec::new()))
            .collect();
        groups.sort_by_key(|(key, _)| *key);
        groups.dedup_by_key(|(key, _)| *key);
        if groups.is_empty() {
            return 0;
        }
        for slot in slots.filter(|s| s.course_id == slot_a.course_id) {
            if let Some((_, periods)) = groups
                .iter_mut()
                .find(|(key, _)| *key == (slot.subject_id, slot.day))
            {
                periods.push(slot.period);
            }
        }
        groups
            .into_iter()
            .filter(|(_, periods)| periods.len() >= 2 && !is_strictly_consecutive(periods.clone()))
            .count()
    }
}
