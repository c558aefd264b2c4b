use crate::catalog::Catalog;
use crate::data::{Course, Period, SlotAssignment, SubjectId, TeacherId, Weekday};
use crate::quality::{QualityScorer, is_strictly_consecutive};
use crate::state::GenerationState;
use log::{debug, info, trace, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Builds an initial timetable course by course: mandatory subjects first,
/// then filler subjects until the course reaches its target occupancy.
pub struct DemandFirstConstructor<'a> {
    catalog: &'a Catalog,
}

impl<'a> DemandFirstConstructor<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Runs construction with the given generator. The same seed and the same
    /// catalog always produce the same state.
    pub fn construct<R: Rng>(&self, scorer: &QualityScorer<'_>, rng: &mut R) -> GenerationState {
        info!(
            "Starting demand-first construction for {} courses",
            self.catalog.courses().len()
        );
        let mut state = GenerationState::new();

        for course in self.catalog.courses() {
            let before = state.slots().len();
            self.place_mandatory(course, &mut state, rng);
            self.place_fillers(course, &mut state, rng);

            let placed = state.slots().len() - before;
            let target = self.catalog.target_slots(course.id) as usize;
            if placed == target {
                state.mark_complete(course.id);
                debug!("Course {} complete: {}/{} slots", course.id, placed, target);
            } else {
                warn!("Course {} incomplete: {}/{} slots", course.id, placed, target);
            }
        }

        let quality = scorer.score(state.slots());
        state.set_quality(quality);
        state.set_valid(state.completed_courses().len() == self.catalog.courses().len());
        info!(
            "Initial construction: {} slots, {}/{} complete courses, quality {:.3}",
            state.slots().len(),
            state.completed_courses().len(),
            self.catalog.courses().len(),
            quality
        );
        state
    }

    fn place_mandatory<R: Rng>(&self, course: &Course, state: &mut GenerationState, rng: &mut R) {
        let mut grid = self.catalog.teaching_grid();
        grid.shuffle(rng);
        let mut pool: VecDeque<(Weekday, Period)> = grid.into();

        for requirement in self.catalog.requirements(course.id) {
            let teachers = self.catalog.eligible_teachers(requirement.subject_id);
            if teachers.is_empty() {
                warn!(
                    "No eligible teachers for subject {} (course {})",
                    requirement.subject_id, course.id
                );
                continue;
            }

            let mut assigned = 0;
            let mut attempts = 0;
            let max_attempts = pool.len() * 2;
            while assigned < requirement.blocks && attempts < max_attempts {
                attempts += 1;
                let Some((day, period)) = pool.pop_front() else {
                    break;
                };
                if self.exceeds_daily_cap(state, course, requirement.subject_id, day)
                    || self.breaks_adjacency(state, course, requirement.subject_id, day, period)
                {
                    pool.push_back((day, period));
                    continue;
                }
                match self.find_teacher(&teachers, day, period, state, rng) {
                    Some(teacher_id) => {
                        let slot = SlotAssignment {
                            course_id: course.id,
                            subject_id: requirement.subject_id,
                            teacher_id,
                            day,
                            period,
                            room_id: course.fixed_room_id,
                            is_filler: false,
                        };
                        if state.try_place(slot).is_ok() {
                            if let Some(placed) = state.slots().last() {
                                trace!("Placed {}", placed);
                            }
                            assigned += 1;
                        } else {
                            pool.push_back((day, period));
                        }
                    }
                    // try this cell again later with another subject
                    None => pool.push_back((day, period)),
                }
            }

            if assigned < requirement.blocks {
                warn!(
                    "Only {}/{} blocks of subject {} placed for course {}",
                    assigned, requirement.blocks, requirement.subject_id, course.id
                );
            }
        }
    }

    fn place_fillers<R: Rng>(&self, course: &Course, state: &mut GenerationState, rng: &mut R) {
        let target = self.catalog.target_slots(course.id) as usize;
        let current = state.course_slot_count(course.id);
        if current >= target {
            return;
        }
        let missing = target - current;

        let fillers = self.catalog.filler_subjects_for(course.id);
        if fillers.is_empty() {
            warn!("No filler subjects available for course {}", course.id);
            return;
        }
        debug!("Filling course {} with {} filler slots", course.id, missing);

        let mut free: Vec<(Weekday, Period)> = self
            .catalog
            .teaching_grid()
            .into_iter()
            .filter(|&(day, period)| !state.course_busy(course.id, day, period))
            .collect();
        free.shuffle(rng);

        let mut assigned = 0;
        for (day, period) in free {
            if assigned == missing {
                break;
            }
            let mut candidates = fillers.to_vec();
            candidates.shuffle(rng);
            for subject_id in candidates {
                if self.exceeds_daily_cap(state, course, subject_id, day)
                    || self.breaks_adjacency(state, course, subject_id, day, period)
                {
                    continue;
                }
                let teachers = self.catalog.eligible_teachers(subject_id);
                let Some(teacher_id) = self.find_teacher(&teachers, day, period, state, rng) else {
                    continue;
                };
                let slot = SlotAssignment {
                    course_id: course.id,
                    subject_id,
                    teacher_id,
                    day,
                    period,
                    room_id: course.fixed_room_id,
                    is_filler: true,
                };
                if state.try_place(slot).is_ok() {
                    if let Some(placed) = state.slots().last() {
                        trace!("Placed filler {}", placed);
                    }
                    assigned += 1;
                    break;
                }
            }
        }

        if assigned < missing {
            warn!(
                "Only {}/{} filler slots placed for course {}",
                assigned, missing, course.id
            );
        }
    }

    fn exceeds_daily_cap(
        &self,
        state: &GenerationState,
        course: &Course,
        subject: SubjectId,
        day: Weekday,
    ) -> bool {
        self.catalog
            .daily_cap(subject)
            .is_some_and(|cap| state.blocks_on_day(course.id, subject, day) >= cap)
    }

    /// Whether a block at `period` would split a same-day run of a subject
    /// that an active consecutive rule covers.
    fn breaks_adjacency(
        &self,
        state: &GenerationState,
        course: &Course,
        subject: SubjectId,
        day: Weekday,
        period: Period,
    ) -> bool {
        if !self.catalog.consecutive_rule_covers(subject) {
            return false;
        }
        let mut periods = state.periods_on_day(course.id, subject, day);
        if periods.is_empty() {
            return false;
        }
        periods.push(period);
        !is_strictly_consecutive(periods)
    }

    /// A random eligible teacher that is available and not yet booked at the cell.
    fn find_teacher<R: Rng>(
        &self,
        eligible: &[TeacherId],
        day: Weekday,
        period: Period,
        state: &GenerationState,
        rng: &mut R,
    ) -> Option<TeacherId> {
        let mut shuffled = eligible.to_vec();
        shuffled.shuffle(rng);
        shuffled.into_iter().find(|&teacher| {
            !state.teacher_busy(teacher, day, period)
                && self.catalog.is_available(teacher, day, period)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RuleKind;
    use crate::quality::QualityWeights;
    use crate::testing::SnapshotBuilder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn build(catalog: &Catalog, seed: u64) -> GenerationState {
        let scorer = QualityScorer::new(catalog, QualityWeights::default());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        DemandFirstConstructor::new(catalog).construct(&scorer, &mut rng)
    }

    fn school() -> Catalog {
        let days = [Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday];
        let snapshot = SnapshotBuilder::new(&days, 4)
            .course(1, 1)
            .course_in_room(2, 1, 50)
            .subject(10, 3)
            .subject(11, 2)
            .filler_subject(20)
            .grade_subject(1, 10)
            .grade_subject(1, 11)
            .teacher(1, 20, false)
            .teacher(2, 20, false)
            .teacher(3, 20, true)
            .teacher(4, 20, true)
            .eligible(1, 10)
            .eligible(2, 11)
            .always_available(1)
            .always_available(2)
            .always_available(3)
            .always_available(4)
            .build();
        Catalog::new(snapshot).unwrap()
    }

    #[test]
    fn every_course_reaches_its_target() {
        let catalog = school();
        let state = build(&catalog, 7);

        assert!(state.is_valid());
        assert_eq!(state.slots().len(), 24);
        assert_eq!(state.fulfilled(1, 10), 3);
        assert_eq!(state.fulfilled(2, 11), 2);
        assert_eq!(state.completed_courses().len(), 2);
        assert!(
            state
                .slots()
                .iter()
                .filter(|s| s.course_id == 2)
                .all(|s| s.room_id == Some(50))
        );
        assert_eq!(state.slots().iter().filter(|s| s.is_filler).count(), 14);
    }

    #[test]
    fn same_seed_same_timetable() {
        let catalog = school();
        assert_eq!(build(&catalog, 42).slots(), build(&catalog, 42).slots());
    }

    #[test]
    fn missing_teachers_leave_the_course_incomplete() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 2)
            .course(1, 1)
            .subject(10, 2)
            .grade_subject(1, 10)
            .teacher(1, 10, false)
            .eligible(1, 10)
            .available(1, Weekday::Monday, 1, 1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let state = build(&catalog, 1);

        assert!(!state.is_valid());
        assert_eq!(state.slots().len(), 1);
        assert!(state.completed_courses().is_empty());
    }

    #[test]
    fn one_teacher_is_never_double_booked_across_courses() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 2)
            .course(1, 1)
            .course(2, 1)
            .subject(10, 2)
            .grade_subject(1, 10)
            .teacher(1, 10, false)
            .eligible(1, 10)
            .always_available(1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let state = build(&catalog, 3);

        // the single teacher can only cover the first course
        assert_eq!(state.slots().len(), 2);
        assert!(state.slots().iter().all(|s| s.course_id == 1));
        assert_eq!(state.teacher_occupancy_len(), 2);
    }

    #[test]
    fn daily_cap_rule_is_honoured() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 3)
            .course(1, 1)
            .subject(10, 4)
            .grade_subject(1, 10)
            .target(1, 4)
            .teacher(1, 10, false)
            .eligible(1, 10)
            .always_available(1)
            .rule(RuleKind::MaxBlocksPerDay {
                max_blocks: 2,
                subject_ids: vec![],
            })
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        for seed in 0..10 {
            let state = build(&catalog, seed);
            assert_eq!(state.slots().len(), 4);
            assert_eq!(state.blocks_on_day(1, 10, Weekday::Monday), 2);
            assert_eq!(state.blocks_on_day(1, 10, Weekday::Tuesday), 2);
        }
    }

    #[test]
    fn consecutive_rule_keeps_same_day_blocks_together() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 3)
            .course(1, 1)
            .subject(10, 4)
            .filler_subject(20)
            .grade_subject(1, 10)
            .teacher(1, 10, false)
            .teacher(2, 10, true)
            .eligible(1, 10)
            .always_available(1)
            .always_available(2)
            .rule(RuleKind::MaxBlocksPerDay {
                max_blocks: 2,
                subject_ids: vec![10],
            })
            .rule(RuleKind::ConsecutiveBlocks { subject_ids: vec![10] })
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        for seed in 0..20 {
            let state = build(&catalog, seed);
            assert!(state.is_valid(), "seed {seed}");
            for day in [Weekday::Monday, Weekday::Tuesday] {
                let periods = state.periods_on_day(1, 10, day);
                assert_eq!(periods.len(), 2, "seed {seed}");
                assert!(is_strictly_consecutive(periods), "seed {seed}");
            }
        }
    }
}
