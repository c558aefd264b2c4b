use crate::data::{CourseId, Period, SlotAssignment, SubjectId, TeacherId, Weekday};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Why a slot could not be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    CourseBusy,
    TeacherBusy,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::CourseBusy => f.write_str("course already has a lesson in this cell"),
            Conflict::TeacherBusy => f.write_str("teacher already teaches in this cell"),
        }
    }
}

/// The mutable working aggregate of one generation run.
///
/// Invariant: no two slots share `(course, day, period)` and no two slots
/// share `(teacher, day, period)`. Every mutation goes through
/// [`GenerationState::try_place`] or [`GenerationState::apply_swap`], which
/// check the occupancy sets before touching anything.
#[derive(Debug, Clone, Default)]
pub struct GenerationState {
    slots: Vec<SlotAssignment>,
    completed_courses: BTreeSet<CourseId>,
    teacher_occupancy: HashSet<(TeacherId, Weekday, Period)>,
    course_occupancy: HashSet<(CourseId, Weekday, Period)>,
    fulfilled: HashMap<(CourseId, SubjectId), u32>,
    quality: f64,
    valid: bool,
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slots(&self) -> &[SlotAssignment] {
        &self.slots
    }

    pub fn into_slots(self) -> Vec<SlotAssignment> {
        self.slots
    }

    pub fn completed_courses(&self) -> &BTreeSet<CourseId> {
        &self.completed_courses
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn set_quality(&mut self, quality: f64) {
        self.quality = quality;
    }

    /// True when every course reached its target during construction.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub fn mark_complete(&mut self, course: CourseId) {
        self.completed_courses.insert(course);
    }

    pub fn teacher_busy(&self, teacher: TeacherId, day: Weekday, period: Period) -> bool {
        self.teacher_occupancy.contains(&(teacher, day, period))
    }

    pub fn course_busy(&self, course: CourseId, day: Weekday, period: Period) -> bool {
        self.course_occupancy.contains(&(course, day, period))
    }

    pub fn teacher_occupancy_len(&self) -> usize {
        self.teacher_occupancy.len()
    }

    pub fn fulfilled(&self, course: CourseId, subject: SubjectId) -> u32 {
        self.fulfilled.get(&(course, subject)).copied().unwrap_or(0)
    }

    /// Slots of one course, in insertion order.
    pub fn course_slot_indices(&self, course: CourseId) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.course_id == course)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn course_slot_count(&self, course: CourseId) -> usize {
        self.slots.iter().filter(|s| s.course_id == course).count()
    }

    /// Blocks of a subject a course already has on a given day.
    pub fn blocks_on_day(&self, course: CourseId, subject: SubjectId, day: Weekday) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.course_id == course && s.subject_id == subject && s.day == day)
            .count() as u32
    }

    pub fn periods_on_day(&self, course: CourseId, subject: SubjectId, day: Weekday) -> Vec<Period> {
        self.slots
            .iter()
            .filter(|s| s.course_id == course && s.subject_id == subject && s.day == day)
            .map(|s| s.period)
            .collect()
    }

    /// Records a slot unless it would double-book its course or teacher.
    /// Nothing is modified when a conflict is returned.
    pub fn try_place(&mut self, slot: SlotAssignment) -> Result<(), Conflict> {
        if self.course_busy(slot.course_id, slot.day, slot.period) {
            return Err(Conflict::CourseBusy);
        }
        if self.teacher_busy(slot.teacher_id, slot.day, slot.period) {
            return Err(Conflict::TeacherBusy);
        }
        self.course_occupancy
            .insert((slot.course_id, slot.day, slot.period));
        self.teacher_occupancy
            .insert((slot.teacher_id, slot.day, slot.period));
        *self
            .fulfilled
            .entry((slot.course_id, slot.subject_id))
            .or_insert(0) += 1;
        self.slots.push(slot);
        Ok(())
    }

    /// Replaces the slots at `a` and `b` with two new values, keeping both
    /// occupancy sets in step. The replacement must keep the multiset of
    /// course cells of the two slots unchanged (a period swap inside one
    /// course). Rejected without modification if either new teacher cell is
    /// taken by a slot other than the two being replaced.
    pub fn apply_swap(
        &mut self,
        a: usize,
        b: usize,
        new_a: SlotAssignment,
        new_b: SlotAssignment,
    ) -> Result<(), Conflict> {
        let old_a = &self.slots[a];
        let old_b = &self.slots[b];
        let old_teacher_keys = [
            (old_a.teacher_id, old_a.day, old_a.period),
            (old_b.teacher_id, old_b.day, old_b.period),
        ];
        let new_teacher_keys = [
            (new_a.teacher_id, new_a.day, new_a.period),
            (new_b.teacher_id, new_b.day, new_b.period),
        ];
        let mut old_course_keys = [
            (old_a.course_id, old_a.day, old_a.period),
            (old_b.course_id, old_b.day, old_b.period),
        ];
        let mut new_course_keys = [
            (new_a.course_id, new_a.day, new_a.period),
            (new_b.course_id, new_b.day, new_b.period),
        ];
        old_course_keys.sort();
        new_course_keys.sort();
        if old_course_keys != new_course_keys {
            return Err(Conflict::CourseBusy);
        }
        if new_teacher_keys[0] == new_teacher_keys[1] {
            return Err(Conflict::TeacherBusy);
        }
        for key in &new_teacher_keys {
            if self.teacher_occupancy.contains(key) && !old_teacher_keys.contains(key) {
                return Err(Conflict::TeacherBusy);
            }
        }

        for key in &old_teacher_keys {
            self.teacher_occupancy.remove(key);
        }
        for key in new_teacher_keys {
            self.teacher_occupancy.insert(key);
        }
        self.slots[a] = new_a;
        self.slots[b] = new_b;
        Ok(())
    }
}
