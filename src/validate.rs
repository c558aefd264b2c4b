//! Hard-rule validation of a complete timetable.
//!
//! The validator never trusts bookkeeping kept during construction or search:
//! every grouping is rebuilt from the flat slot list. All checks run to the
//! end so that every violation is reported, and the result depends only on
//! the slot order and the catalog, which makes repeated calls identical.

use crate::catalog::Catalog;
use crate::data::{CourseId, Period, PeriodKind, SlotAssignment, SubjectId, TeacherId, Weekday};
use crate::quality::is_strictly_consecutive;
use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    CourseSlotConflict,
    TeacherSlotConflict,
    TeacherUnavailable,
    TeacherNotEligible,
    FillerTeacherNotEligible,
    RequiredBlocksMismatch,
    NonTeachingPeriod,
    OutsideTeachingDays,
    FixedRoomViolated,
    CourseOccupancyMismatch,
    MaxBlocksPerDayExceeded,
    NonConsecutiveBlocks,
    UnknownReference,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ViolationKind::CourseSlotConflict => "course_slot_conflict",
            ViolationKind::TeacherSlotConflict => "teacher_slot_conflict",
            ViolationKind::TeacherUnavailable => "teacher_unavailable",
            ViolationKind::TeacherNotEligible => "teacher_not_eligible",
            ViolationKind::FillerTeacherNotEligible => "filler_teacher_not_eligible",
            ViolationKind::RequiredBlocksMismatch => "required_blocks_mismatch",
            ViolationKind::NonTeachingPeriod => "non_teaching_period",
            ViolationKind::OutsideTeachingDays => "outside_teaching_days",
            ViolationKind::FixedRoomViolated => "fixed_room_violated",
            ViolationKind::CourseOccupancyMismatch => "course_occupancy_mismatch",
            ViolationKind::MaxBlocksPerDayExceeded => "max_blocks_per_day_exceeded",
            ViolationKind::NonConsecutiveBlocks => "non_consecutive_blocks",
            ViolationKind::UnknownReference => "unknown_reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    pub description: String,
    pub course_id: Option<CourseId>,
    pub teacher_id: Option<TeacherId>,
    pub subject_id: Option<SubjectId>,
    pub day: Option<Weekday>,
    pub period: Option<Period>,
    pub severity: Severity,
}

impl Violation {
    fn new(kind: ViolationKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            course_id: None,
            teacher_id: None,
            subject_id: None,
            day: None,
            period: None,
            severity: Severity::High,
        }
    }

    fn course(mut self, id: CourseId) -> Self {
        self.course_id = Some(id);
        self
    }

    fn teacher(mut self, id: TeacherId) -> Self {
        self.teacher_id = Some(id);
        self
    }

    fn subject(mut self, id: SubjectId) -> Self {
        self.subject_id = Some(id);
        self
    }

    fn at(mut self, day: Weekday, period: Option<Period>) -> Self {
        self.day = Some(day);
        self.period = period;
        self
    }

    fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total_slots: usize,
    pub courses: usize,
    pub active_teachers: usize,
    pub complete_courses: usize,
    pub filler_subjects_used: usize,
    pub violations_by_kind: BTreeMap<ViolationKind, usize>,
    pub high_severity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub violations: Vec<Violation>,
    /// Slots referring to ids absent from the catalog. Kept apart from rule violations.
    pub integrity_errors: Vec<Violation>,
    pub stats: ValidationStats,
}

pub struct HardRuleValidator<'a> {
    catalog: &'a Catalog,
}

impl<'a> HardRuleValidator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, slots: &[SlotAssignment]) -> ValidationResult {
        info!("Validating {} slots", slots.len());
        let mut integrity_errors = Vec::new();
        let known: Vec<&SlotAssignment> = slots
            .iter()
            .filter(|slot| match self.unknown_reference(slot) {
                Some(error) => {
                    integrity_errors.push(error);
                    false
                }
                None => true,
            })
            .collect();

        let mut violations = Vec::new();
        self.check_course_uniqueness(&known, &mut violations);
        self.check_teacher_uniqueness(&known, &mut violations);
        self.check_availability(&known, &mut violations);
        self.check_eligibility(&known, &mut violations);
        self.check_required_blocks(&known, &mut violations);
        self.check_teaching_cells(&known, &mut violations);
        self.check_fixed_rooms(&known, &mut violations);
        self.check_occupancy(&known, &mut violations);
        if self.catalog.has_active_rules() {
            self.check_daily_caps(&known, &mut violations);
            self.check_adjacency(&known, &mut violations);
        }

        let stats = self.stats(&known, &violations);
        let is_valid = violations.is_empty() && integrity_errors.is_empty();
        if is_valid {
            info!("Validation passed");
        } else {
            warn!(
                "Validation failed: {} violations, {} integrity errors",
                violations.len(),
                integrity_errors.len()
            );
        }
        ValidationResult {
            is_valid,
            violations,
            integrity_errors,
            stats,
        }
    }

    fn unknown_reference(&self, slot: &SlotAssignment) -> Option<Violation> {
        let mut missing = Vec::new();
        if self.catalog.course(slot.course_id).is_none() {
            missing.push(format!("course {}", slot.course_id));
        }
        if self.catalog.subject(slot.subject_id).is_none() {
            missing.push(format!("subject {}", slot.subject_id));
        }
        if self.catalog.teacher(slot.teacher_id).is_none() {
            missing.push(format!("teacher {}", slot.teacher_id));
        }
        if let Some(room) = slot.room_id {
            if !self.catalog.has_room(room) {
                missing.push(format!("room {room}"));
            }
        }
        if missing.is_empty() {
            return None;
        }
        Some(
            Violation::new(
                ViolationKind::UnknownReference,
                format!("Slot {} refers to unknown {}", slot, missing.join(", ")),
            )
            .course(slot.course_id)
            .teacher(slot.teacher_id)
            .subject(slot.subject_id)
            .at(slot.day, Some(slot.period)),
        )
    }

    fn check_course_uniqueness(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let mut seen = HashSet::new();
        for slot in slots {
            if !seen.insert((slot.course_id, slot.day, slot.period)) {
                out.push(
                    Violation::new(
                        ViolationKind::CourseSlotConflict,
                        format!(
                            "Course {} has more than one lesson on {} period {}",
                            slot.course_id, slot.day, slot.period
                        ),
                    )
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                );
            }
        }
    }

    fn check_teacher_uniqueness(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let mut seen = HashSet::new();
        for slot in slots {
            if !seen.insert((slot.teacher_id, slot.day, slot.period)) {
                out.push(
                    Violation::new(
                        ViolationKind::TeacherSlotConflict,
                        format!(
                            "Teacher {} is assigned to several courses on {} period {}",
                            slot.teacher_id, slot.day, slot.period
                        ),
                    )
                    .teacher(slot.teacher_id)
                    .at(slot.day, Some(slot.period)),
                );
            }
        }
    }

    fn check_availability(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        for slot in slots {
            if !self.catalog.is_available(slot.teacher_id, slot.day, slot.period) {
                out.push(
                    Violation::new(
                        ViolationKind::TeacherUnavailable,
                        format!(
                            "Teacher {} is not available on {} period {}",
                            slot.teacher_id, slot.day, slot.period
                        ),
                    )
                    .teacher(slot.teacher_id)
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                );
            }
        }
    }

    fn check_eligibility(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        for slot in slots {
            if self.catalog.is_eligible(slot.teacher_id, slot.subject_id) {
                continue;
            }
            let is_filler = self
                .catalog
                .subject(slot.subject_id)
                .is_some_and(|s| s.is_filler);
            let (kind, description) = if is_filler {
                (
                    ViolationKind::FillerTeacherNotEligible,
                    format!(
                        "Teacher {} cannot teach filler subject {}",
                        slot.teacher_id, slot.subject_id
                    ),
                )
            } else {
                (
                    ViolationKind::TeacherNotEligible,
                    format!(
                        "Teacher {} is not qualified for subject {}",
                        slot.teacher_id, slot.subject_id
                    ),
                )
            };
            out.push(
                Violation::new(kind, description)
                    .teacher(slot.teacher_id)
                    .subject(slot.subject_id)
                    .course(slot.course_id),
            );
        }
    }

    fn check_required_blocks(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let counts = slots
            .iter()
            .map(|s| (s.course_id, s.subject_id))
            .counts();
        for course in self.catalog.courses() {
            for requirement in self.catalog.requirements(course.id) {
                let actual = counts
                    .get(&(course.id, requirement.subject_id))
                    .copied()
                    .unwrap_or(0) as i64;
                let difference = actual - i64::from(requirement.blocks);
                if difference != 0 {
                    out.push(
                        Violation::new(
                            ViolationKind::RequiredBlocksMismatch,
                            format!(
                                "Course {}: subject {} has difference {} (requires {}, has {})",
                                course.id, requirement.subject_id, difference, requirement.blocks, actual
                            ),
                        )
                        .course(course.id)
                        .subject(requirement.subject_id),
                    );
                }
            }
        }
    }

    fn check_teaching_cells(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        for slot in slots {
            if !self.catalog.is_teaching_day(slot.day) {
                out.push(
                    Violation::new(
                        ViolationKind::OutsideTeachingDays,
                        format!("{} is not a teaching day", slot.day),
                    )
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                );
            }
            match self.catalog.period_kind(slot.period) {
                Some(PeriodKind::Class) => {}
                Some(kind) => out.push(
                    Violation::new(
                        ViolationKind::NonTeachingPeriod,
                        format!("Period {} is a {:?} period, not a class period", slot.period, kind),
                    )
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                ),
                None => out.push(
                    Violation::new(
                        ViolationKind::NonTeachingPeriod,
                        format!("Period {} is outside the school day", slot.period),
                    )
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                ),
            }
        }
    }

    fn check_fixed_rooms(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        for slot in slots {
            let Some(fixed) = self.catalog.course(slot.course_id).and_then(|c| c.fixed_room_id) else {
                continue;
            };
            if slot.room_id != Some(fixed) {
                out.push(
                    Violation::new(
                        ViolationKind::FixedRoomViolated,
                        format!(
                            "Course {} must use its fixed room {} on {} period {}",
                            slot.course_id, fixed, slot.day, slot.period
                        ),
                    )
                    .course(slot.course_id)
                    .at(slot.day, Some(slot.period)),
                );
            }
        }
    }

    fn check_occupancy(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let counts = slots.iter().map(|s| s.course_id).counts();
        for course in self.catalog.courses() {
            let assigned = counts.get(&course.id).copied().unwrap_or(0);
            let target = self.catalog.target_slots(course.id) as usize;
            if assigned != target {
                out.push(
                    Violation::new(
                        ViolationKind::CourseOccupancyMismatch,
                        format!(
                            "Course {} has {}/{} slots (must be exactly full)",
                            course.id, assigned, target
                        ),
                    )
                    .course(course.id),
                );
            }
        }
    }

    fn check_daily_caps(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let per_day: BTreeMap<(CourseId, Weekday, SubjectId), u32> = slots
            .iter()
            .map(|s| (s.course_id, s.day, s.subject_id))
            .counts()
            .into_iter()
            .map(|(key, n)| (key, n as u32))
            .collect();
        for ((course, day, subject), count) in per_day {
            let Some(cap) = self.catalog.daily_cap(subject) else {
                continue;
            };
            if count > cap {
                out.push(
                    Violation::new(
                        ViolationKind::MaxBlocksPerDayExceeded,
                        format!(
                            "Course {course}: subject {subject} has {count} blocks on {day} (maximum {cap})"
                        ),
                    )
                    .course(course)
                    .subject(subject)
                    .at(day, None)
                    .severity(Severity::Medium),
                );
            }
        }
    }

    fn check_adjacency(&self, slots: &[&SlotAssignment], out: &mut Vec<Violation>) {
        let mut groups: BTreeMap<(CourseId, Weekday, SubjectId), Vec<Period>> = BTreeMap::new();
        for slot in slots
            .iter()
            .filter(|s| self.catalog.consecutive_rule_covers(s.subject_id))
        {
            groups
                .entry((slot.course_id, slot.day, slot.subject_id))
                .or_default()
                .push(slot.period);
        }
        for ((course, day, subject), periods) in groups {
            if periods.len() >= 2 && !is_strictly_consecutive(periods) {
                out.push(
                    Violation::new(
                        ViolationKind::NonConsecutiveBlocks,
                        format!("Course {course}: subject {subject} on {day} is not in consecutive blocks"),
                    )
                    .course(course)
                    .subject(subject)
                    .at(day, None)
                    .severity(Severity::Medium),
                );
            }
        }
    }

    fn stats(&self, slots: &[&SlotAssignment], violations: &[Violation]) -> ValidationStats {
        let per_course = slots.iter().map(|s| s.course_id).counts();
        let complete_courses = self
            .catalog
            .courses()
            .iter()
            .filter(|c| per_course.get(&c.id).copied().unwrap_or(0) == self.catalog.target_slots(c.id) as usize)
            .count();
        let filler_subjects_used = slots
            .iter()
            .filter(|s| self.catalog.subject(s.subject_id).is_some_and(|x| x.is_filler))
            .map(|s| s.subject_id)
            .collect::<BTreeSet<_>>()
            .len();
        ValidationStats {
            total_slots: slots.len(),
            courses: per_course.len(),
            active_teachers: slots.iter().map(|s| s.teacher_id).unique().count(),
            complete_courses,
            filler_subjects_used,
            violations_by_kind: violations
                .iter()
                .map(|v| v.kind)
                .counts()
                .into_iter()
                .collect(),
            high_severity: violations
                .iter()
                .filter(|v| v.severity == Severity::High)
                .count(),
        }
    }
}
