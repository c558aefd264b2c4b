use crate::data::{
    Course, CourseId, Period, PeriodKind, RoomId, RuleKind, Snapshot, Subject, SubjectId, Teacher,
    TeacherId, TimePreference, Weekday,
};
use crate::error::SolverError;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap, HashSet};

/// A resolved weekly requirement of one mandatory subject for one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub subject_id: SubjectId,
    pub blocks: u32,
}

/// Read-only, indexed view over a [`Snapshot`].
///
/// Everything a run needs to look up repeatedly is computed here once:
/// the teaching grid, the expanded availability sets, eligibility lists,
/// resolved requirements and targets per course. Every list is sorted by id
/// so that iterating it is deterministic.
#[derive(Debug, Clone)]
pub struct Catalog {
    snapshot: Snapshot,
    course_index: HashMap<CourseId, usize>,
    subject_index: HashMap<SubjectId, usize>,
    teacher_index: HashMap<TeacherId, usize>,
    rooms: HashSet<RoomId>,
    teaching_days: Vec<Weekday>,
    teaching_periods: Vec<Period>,
    period_kinds: HashMap<Period, PeriodKind>,
    availability: HashMap<TeacherId, HashSet<(Weekday, Period)>>,
    direct_teachers: HashMap<SubjectId, Vec<TeacherId>>,
    eligibility: HashSet<(TeacherId, SubjectId)>,
    filler_capable: Vec<TeacherId>,
    requirements: HashMap<CourseId, Vec<Requirement>>,
    targets: HashMap<CourseId, u32>,
    fillers_by_course: HashMap<CourseId, Vec<SubjectId>>,
    daily_caps: HashMap<SubjectId, u32>,
    adjacency_subjects: BTreeSet<SubjectId>,
    consecutive_rule_subjects: BTreeSet<SubjectId>,
}

fn index_by_id<T>(
    items: &[T],
    entity: &'static str,
    id: impl Fn(&T) -> u32,
) -> Result<HashMap<u32, usize>, SolverError> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        if index.insert(id(item), pos).is_some() {
            return Err(SolverError::DuplicateId {
                entity,
                id: id(item),
            });
        }
    }
    Ok(index)
}

impl Catalog {
    pub fn new(snapshot: Snapshot) -> Result<Self, SolverError> {
        let config = &snapshot.config;
        if config.teaching_days.is_empty() {
            return Err(SolverError::NoTeachingDays);
        }
        if config.periods_per_day == 0 {
            return Err(SolverError::NoPeriods);
        }

        let course_index = index_by_id(&snapshot.courses, "course", |c| c.id)?;
        let subject_index = index_by_id(&snapshot.subjects, "subject", |s| s.id)?;
        let teacher_index = index_by_id(&snapshot.teachers, "teacher", |t| t.id)?;
        index_by_id(&snapshot.rooms, "room", |r| r.id)?;
        let rooms: HashSet<RoomId> = snapshot.rooms.iter().map(|r| r.id).collect();

        let teaching_days: Vec<Weekday> = config.teaching_days.iter().copied().unique().collect();
        let period_kinds: HashMap<Period, PeriodKind> =
            config.periods.iter().map(|p| (p.number, p.kind)).collect();
        let teaching_periods: Vec<Period> = (1..=config.periods_per_day)
            .filter(|p| period_kinds.get(p).copied().unwrap_or(PeriodKind::Class) == PeriodKind::Class)
            .collect();
        if teaching_periods.is_empty() {
            return Err(SolverError::NoTeachingPeriods {
                periods_per_day: config.periods_per_day,
            });
        }

        // expand availability ranges once into O(1) lookup sets
        let mut availability: HashMap<TeacherId, HashSet<(Weekday, Period)>> = HashMap::new();
        for window in &snapshot.availability {
            if window.period_start > window.period_end {
                return Err(SolverError::InvertedAvailability {
                    teacher_id: window.teacher_id,
                    start: window.period_start,
                    end: window.period_end,
                });
            }
            if !teacher_index.contains_key(&window.teacher_id) {
                warn!("Skipping availability of unknown teacher {}", window.teacher_id);
                continue;
            }
            // only periods of the school day can ever be used
            let start = window.period_start.max(1);
            let end = window.period_end.min(config.periods_per_day);
            let cells = availability.entry(window.teacher_id).or_default();
            for period in start..=end {
                cells.insert((window.day, period));
            }
        }

        let mut eligibility = HashSet::new();
        for link in &snapshot.eligibility {
            if !teacher_index.contains_key(&link.teacher_id)
                || !subject_index.contains_key(&link.subject_id)
            {
                warn!(
                    "Skipping eligibility of teacher {} for subject {}: unknown id",
                    link.teacher_id, link.subject_id
                );
                continue;
            }
            eligibility.insert((link.teacher_id, link.subject_id));
        }
        let direct_teachers: HashMap<SubjectId, Vec<TeacherId>> = eligibility
            .iter()
            .map(|&(teacher, subject)| (subject, teacher))
            .into_group_map()
            .into_iter()
            .map(|(subject, teachers)| (subject, teachers.into_iter().sorted().collect()))
            .collect();
        let filler_capable: Vec<TeacherId> = snapshot
            .teachers
            .iter()
            .filter(|t| t.can_teach_filler)
            .map(|t| t.id)
            .sorted()
            .collect();

        let weekly_slots = (teaching_days.len() * teaching_periods.len()) as u32;
        let mut targets = HashMap::with_capacity(snapshot.courses.len());
        for course in &snapshot.courses {
            targets.insert(course.id, weekly_slots);
        }
        for target in &snapshot.course_targets {
            if targets.contains_key(&target.course_id) {
                targets.insert(target.course_id, target.target_slots);
            } else {
                warn!("Skipping target of unknown course {}", target.course_id);
            }
        }

        let is_mandatory = |subject_id: &SubjectId| {
            subject_index
                .get(subject_id)
                .is_some_and(|&pos| !snapshot.subjects[pos].is_filler)
        };
        let overrides: HashMap<CourseId, Vec<Requirement>> = snapshot
            .course_requirements
            .iter()
            .filter(|r| is_mandatory(&r.subject_id))
            .map(|r| {
                (
                    r.course_id,
                    Requirement {
                        subject_id: r.subject_id,
                        blocks: r.required_blocks,
                    },
                )
            })
            .into_group_map();
        let by_grade: HashMap<u32, Vec<SubjectId>> = snapshot
            .grade_subjects
            .iter()
            .filter(|gs| is_mandatory(&gs.subject_id))
            .map(|gs| (gs.grade_id, gs.subject_id))
            .into_group_map();

        let mut requirements = HashMap::with_capacity(snapshot.courses.len());
        let mut fillers_by_course = HashMap::with_capacity(snapshot.courses.len());
        for course in &snapshot.courses {
            let resolved: Vec<Requirement> = match overrides.get(&course.id) {
                Some(specific) => specific
                    .iter()
                    .copied()
                    .sorted_by_key(|r| r.subject_id)
                    .collect(),
                None => by_grade
                    .get(&course.grade_id)
                    .map(|subjects| {
                        subjects
                            .iter()
                            .unique()
                            .sorted()
                            .map(|&subject_id| Requirement {
                                subject_id,
                                blocks: snapshot.subjects[subject_index[&subject_id]].weekly_blocks,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            };
            requirements.insert(course.id, resolved);

            let fillers: Vec<SubjectId> = snapshot
                .subjects
                .iter()
                .filter(|s| s.is_filler)
                .filter(|s| {
                    let policies: Vec<_> = snapshot
                        .filler_policies
                        .iter()
                        .filter(|p| p.subject_id == s.id)
                        .collect();
                    policies.is_empty()
                        || policies.iter().any(|p| {
                            p.active
                                && (p.compatible_grades.is_empty()
                                    || p.compatible_grades.contains(&course.grade_id))
                        })
                })
                .map(|s| s.id)
                .sorted()
                .collect();
            fillers_by_course.insert(course.id, fillers);
        }

        let mut daily_caps: HashMap<SubjectId, u32> = HashMap::new();
        let mut adjacency_subjects: BTreeSet<SubjectId> = snapshot
            .subjects
            .iter()
            .filter(|s| s.wants_adjacent_blocks())
            .map(|s| s.id)
            .collect();
        let mut consecutive_rule_subjects = BTreeSet::new();
        for rule in snapshot.rules.iter().filter(|r| r.active) {
            match &rule.kind {
                RuleKind::MaxBlocksPerDay {
                    max_blocks,
                    subject_ids,
                } => {
                    let scope: Vec<SubjectId> = if subject_ids.is_empty() {
                        snapshot.subjects.iter().map(|s| s.id).collect()
                    } else {
                        subject_ids.clone()
                    };
                    for subject_id in scope {
                        let cap = daily_caps.entry(subject_id).or_insert(*max_blocks);
                        *cap = (*cap).min(*max_blocks);
                    }
                }
                RuleKind::ConsecutiveBlocks { subject_ids } => {
                    adjacency_subjects.extend(subject_ids.iter().copied());
                    consecutive_rule_subjects.extend(subject_ids.iter().copied());
                    // double-block subjects fall under every consecutive rule
                    consecutive_rule_subjects.extend(
                        snapshot
                            .subjects
                            .iter()
                            .filter(|s| s.requires_double_block)
                            .map(|s| s.id),
                    );
                }
            }
        }

        debug!(
            "Catalog built: {} courses, {} subjects, {} teachers, {} days x {} teaching periods",
            snapshot.courses.len(),
            snapshot.subjects.len(),
            snapshot.teachers.len(),
            teaching_days.len(),
            teaching_periods.len()
        );

        Ok(Self {
            snapshot,
            course_index,
            subject_index,
            teacher_index,
            rooms,
            teaching_days,
            teaching_periods,
            period_kinds,
            availability,
            direct_teachers,
            eligibility,
            filler_capable,
            requirements,
            targets,
            fillers_by_course,
            daily_caps,
            adjacency_subjects,
            consecutive_rule_subjects,
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn courses(&self) -> &[Course] {
        &self.snapshot.courses
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.snapshot.subjects
    }

    pub fn teachers(&self) -> &[Teacher] {
        &self.snapshot.teachers
    }

    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.course_index.get(&id).map(|&pos| &self.snapshot.courses[pos])
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subject_index.get(&id).map(|&pos| &self.snapshot.subjects[pos])
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teacher_index.get(&id).map(|&pos| &self.snapshot.teachers[pos])
    }

    pub fn has_room(&self, id: RoomId) -> bool {
        self.rooms.contains(&id)
    }

    pub fn teaching_days(&self) -> &[Weekday] {
        &self.teaching_days
    }

    pub fn teaching_periods(&self) -> &[Period] {
        &self.teaching_periods
    }

    pub fn is_teaching_day(&self, day: Weekday) -> bool {
        self.teaching_days.contains(&day)
    }

    pub fn is_teaching_period(&self, period: Period) -> bool {
        self.teaching_periods.binary_search(&period).is_ok()
    }

    /// Kind of a period number, `None` if it lies outside the configured day.
    pub fn period_kind(&self, period: Period) -> Option<PeriodKind> {
        if period == 0 || period > self.snapshot.config.periods_per_day {
            return None;
        }
        Some(self.period_kinds.get(&period).copied().unwrap_or(PeriodKind::Class))
    }

    /// Every teaching `(day, period)` cell of the week, days in configured order.
    pub fn teaching_grid(&self) -> Vec<(Weekday, Period)> {
        self.teaching_days
            .iter()
            .flat_map(|&day| self.teaching_periods.iter().map(move |&period| (day, period)))
            .collect()
    }

    pub fn weekly_slots(&self) -> u32 {
        (self.teaching_days.len() * self.teaching_periods.len()) as u32
    }

    pub fn is_available(&self, teacher: TeacherId, day: Weekday, period: Period) -> bool {
        self.availability
            .get(&teacher)
            .is_some_and(|cells| cells.contains(&(day, period)))
    }

    /// Availability cells of a teacher that fall inside the teaching grid.
    pub fn available_blocks(&self, teacher: TeacherId) -> u32 {
        self.availability.get(&teacher).map_or(0, |cells| {
            cells
                .iter()
                .filter(|&&(day, period)| self.is_teaching_day(day) && self.is_teaching_period(period))
                .count() as u32
        })
    }

    pub fn available_blocks_on(&self, teacher: TeacherId, day: Weekday) -> u32 {
        self.availability.get(&teacher).map_or(0, |cells| {
            cells
                .iter()
                .filter(|&&(d, period)| d == day && self.is_teaching_period(period))
                .count() as u32
        })
    }

    /// Distinct days on which a teacher declared any availability.
    pub fn availability_days(&self, teacher: TeacherId) -> BTreeSet<Weekday> {
        self.availability
            .get(&teacher)
            .map(|cells| cells.iter().map(|&(day, _)| day).collect())
            .unwrap_or_default()
    }

    /// Weekly supply of a teacher: physical availability capped by the contract.
    pub fn weekly_capacity(&self, teacher: &Teacher) -> u32 {
        self.available_blocks(teacher.id).min(teacher.max_weekly_blocks)
    }

    pub fn teaches_directly(&self, teacher: TeacherId, subject: SubjectId) -> bool {
        self.eligibility.contains(&(teacher, subject))
    }

    pub fn has_direct_subjects(&self, teacher: TeacherId) -> bool {
        self.eligibility.iter().any(|&(t, _)| t == teacher)
    }

    /// Whether a teacher may teach a subject: direct eligibility, or the
    /// general filler capability when the subject is a filler.
    pub fn is_eligible(&self, teacher: TeacherId, subject: SubjectId) -> bool {
        if self.teaches_directly(teacher, subject) {
            return true;
        }
        match (self.teacher(teacher), self.subject(subject)) {
            (Some(t), Some(s)) => s.is_filler && t.can_teach_filler,
            _ => false,
        }
    }

    /// Teachers eligible for a subject, sorted by id.
    pub fn eligible_teachers(&self, subject: SubjectId) -> Vec<TeacherId> {
        let direct = self.direct_teachers.get(&subject).cloned().unwrap_or_default();
        match self.subject(subject) {
            Some(s) if s.is_filler => direct
                .into_iter()
                .chain(self.filler_capable.iter().copied())
                .sorted()
                .dedup()
                .collect(),
            _ => direct,
        }
    }

    pub fn requirements(&self, course: CourseId) -> &[Requirement] {
        self.requirements.get(&course).map_or(&[], Vec::as_slice)
    }

    pub fn required_blocks(&self, course: CourseId) -> u32 {
        self.requirements(course).iter().map(|r| r.blocks).sum()
    }

    pub fn target_slots(&self, course: CourseId) -> u32 {
        self.targets
            .get(&course)
            .copied()
            .unwrap_or_else(|| self.weekly_slots())
    }

    /// Filler subjects usable to pad this course, sorted by id.
    pub fn filler_subjects_for(&self, course: CourseId) -> &[SubjectId] {
        self.fillers_by_course.get(&course).map_or(&[], Vec::as_slice)
    }

    /// Tightest active per-day cap for a subject, if any rule applies.
    pub fn daily_cap(&self, subject: SubjectId) -> Option<u32> {
        self.daily_caps.get(&subject).copied()
    }

    /// Whether same-day blocks of this subject must be adjacent, by flag or by rule.
    pub fn requires_adjacency(&self, subject: SubjectId) -> bool {
        self.adjacency_subjects.contains(&subject)
    }

    /// Whether an active rule makes same-day adjacency of this subject a hard
    /// rule: the subjects a consecutive rule lists, plus every double-block
    /// subject once such a rule is active. Flags alone only count towards quality.
    pub fn consecutive_rule_covers(&self, subject: SubjectId) -> bool {
        self.consecutive_rule_subjects.contains(&subject)
    }

    pub fn has_active_rules(&self) -> bool {
        self.snapshot.rules.iter().any(|r| r.active)
    }

    pub fn matches_preference(&self, preference: TimePreference, period: Period) -> Option<bool> {
        let morning_last = self.snapshot.config.morning_last_period;
        match preference {
            TimePreference::Any => None,
            TimePreference::Morning => Some(period <= morning_last),
            TimePreference::Afternoon => Some(period > morning_last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SnapshotBuilder;

    #[test]
    fn break_periods_are_not_teaching_periods() {
        let mut snapshot = SnapshotBuilder::new(&[Weekday::Monday], 4).build();
        snapshot.config.periods.push(crate::data::PeriodDefinition {
            number: 3,
            kind: PeriodKind::Break,
        });
        let catalog = Catalog::new(snapshot).unwrap();

        assert_eq!(catalog.teaching_periods(), &[1, 2, 4]);
        assert_eq!(catalog.weekly_slots(), 3);
        assert_eq!(catalog.period_kind(3), Some(PeriodKind::Break));
        assert_eq!(catalog.period_kind(5), None);
    }

    #[test]
    fn zero_teaching_days_is_fatal() {
        let snapshot = SnapshotBuilder::new(&[], 4).build();
        assert_eq!(Catalog::new(snapshot).unwrap_err(), SolverError::NoTeachingDays);
    }

    #[test]
    fn duplicate_teacher_ids_are_fatal() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 2)
            .teacher(1, 10, false)
            .teacher(1, 10, false)
            .build();
        assert_eq!(
            Catalog::new(snapshot).unwrap_err(),
            SolverError::DuplicateId {
                entity: "teacher",
                id: 1
            }
        );
    }

    #[test]
    fn availability_ranges_expand_into_cells() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 6)
            .teacher(1, 30, false)
            .available(1, Weekday::Monday, 2, 4)
            .available(1, Weekday::Saturday, 1, 6)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert!(catalog.is_available(1, Weekday::Monday, 3));
        assert!(!catalog.is_available(1, Weekday::Monday, 5));
        // saturday is not a teaching day, so it does not add supply
        assert_eq!(catalog.available_blocks(1), 3);
        assert_eq!(catalog.availability_days(1).len(), 2);
    }

    #[test]
    fn availability_is_clamped_to_the_school_day() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .teacher(1, 30, false)
            .available(1, Weekday::Monday, 0, 4_000_000_000)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert_eq!(catalog.available_blocks(1), 6);
        assert!(catalog.is_available(1, Weekday::Monday, 6));
        assert!(!catalog.is_available(1, Weekday::Monday, 7));
        assert!(!catalog.is_available(1, Weekday::Monday, 0));
    }

    #[test]
    fn course_override_replaces_grade_requirements() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .course(1, 7)
            .course(2, 7)
            .subject(10, 3)
            .subject(11, 2)
            .grade_subject(7, 10)
            .grade_subject(7, 11)
            .course_requirement(2, 11, 5)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert_eq!(
            catalog.requirements(1),
            &[
                Requirement { subject_id: 10, blocks: 3 },
                Requirement { subject_id: 11, blocks: 2 }
            ]
        );
        assert_eq!(catalog.requirements(2), &[Requirement { subject_id: 11, blocks: 5 }]);
    }

    #[test]
    fn filler_eligibility_includes_general_filler_teachers() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .teacher(1, 10, false)
            .teacher(2, 10, true)
            .teacher(3, 10, false)
            .filler_subject(20)
            .subject(21, 2)
            .eligible(3, 20)
            .eligible(1, 21)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert_eq!(catalog.eligible_teachers(20), vec![2, 3]);
        assert_eq!(catalog.eligible_teachers(21), vec![1]);
        assert!(catalog.is_eligible(2, 20));
        assert!(!catalog.is_eligible(2, 21));
    }

    #[test]
    fn filler_policies_restrict_grades() {
        let mut snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .course(1, 7)
            .course(2, 8)
            .filler_subject(20)
            .filler_subject(21)
            .filler_subject(22)
            .filler_subject(23)
            .build();
        let policy = |subject_id, active, compatible_grades| crate::data::FillerPolicy {
            subject_id,
            active,
            compatible_grades,
        };
        snapshot.filler_policies.push(policy(21, true, vec![8]));
        snapshot.filler_policies.push(policy(22, false, vec![]));
        snapshot.filler_policies.push(policy(23, true, vec![]));
        let catalog = Catalog::new(snapshot).unwrap();

        // 20 has no policy entry and stays open to every grade
        assert_eq!(catalog.filler_subjects_for(1), &[20, 23]);
        assert_eq!(catalog.filler_subjects_for(2), &[20, 21, 23]);
    }

    #[test]
    fn consecutive_rule_covers_double_block_subjects() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .subject(10, 2)
            .double_block_subject(11, 2)
            .subject(12, 2)
            .rule(RuleKind::ConsecutiveBlocks { subject_ids: vec![12] })
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert!(!catalog.consecutive_rule_covers(10));
        assert!(catalog.consecutive_rule_covers(11));
        assert!(catalog.consecutive_rule_covers(12));
    }

    #[test]
    fn double_block_flag_without_a_rule_is_not_covered() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 6)
            .double_block_subject(11, 2)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert!(catalog.requires_adjacency(11));
        assert!(!catalog.consecutive_rule_covers(11));
    }
}
