//! Fixture builders shared by the unit tests.

use crate::data::{
    AvailabilityWindow, Course, CourseRequirement, CourseTarget, Eligibility, GradeSubject,
    PedagogicalRule, Period, RuleKind, SchoolConfig, Snapshot, Subject, Teacher, TimePreference,
    Weekday,
};

pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new(days: &[Weekday], periods_per_day: u32) -> Self {
        Self {
            snapshot: Snapshot {
                config: SchoolConfig {
                    teaching_days: days.to_vec(),
                    periods_per_day,
                    periods: Vec::new(),
                    morning_last_period: 6,
                },
                courses: Vec::new(),
                subjects: Vec::new(),
                teachers: Vec::new(),
                rooms: Vec::new(),
                eligibility: Vec::new(),
                availability: Vec::new(),
                grade_subjects: Vec::new(),
                course_requirements: Vec::new(),
                course_targets: Vec::new(),
                filler_policies: Vec::new(),
                rules: Vec::new(),
            },
        }
    }

    pub fn course(mut self, id: u32, grade_id: u32) -> Self {
        self.snapshot.courses.push(Course {
            id,
            name: format!("course-{id}"),
            grade_id,
            fixed_room_id: None,
        });
        self
    }

    pub fn course_in_room(mut self, id: u32, grade_id: u32, room_id: u32) -> Self {
        self.snapshot.courses.push(Course {
            id,
            name: format!("course-{id}"),
            grade_id,
            fixed_room_id: Some(room_id),
        });
        self.snapshot.rooms.push(crate::data::Room {
            id: room_id,
            name: format!("room-{room_id}"),
        });
        self
    }

    pub fn subject(mut self, id: u32, weekly_blocks: u32) -> Self {
        self.snapshot.subjects.push(Subject {
            id,
            name: format!("subject-{id}"),
            weekly_blocks,
            is_filler: false,
            requires_consecutive_blocks: false,
            requires_double_block: false,
            preferred_time: TimePreference::Any,
        });
        self
    }

    pub fn consecutive_subject(mut self, id: u32, weekly_blocks: u32) -> Self {
        self = self.subject(id, weekly_blocks);
        if let Some(subject) = self.snapshot.subjects.last_mut() {
            subject.requires_consecutive_blocks = true;
        }
        self
    }

    pub fn double_block_subject(mut self, id: u32, weekly_blocks: u32) -> Self {
        self = self.subject(id, weekly_blocks);
        if let Some(subject) = self.snapshot.subjects.last_mut() {
            subject.requires_double_block = true;
        }
        self
    }

    pub fn preferring(mut self, subject_id: u32, preference: TimePreference) -> Self {
        if let Some(subject) = self.snapshot.subjects.iter_mut().find(|s| s.id == subject_id) {
            subject.preferred_time = preference;
        }
        self
    }

    pub fn filler_subject(mut self, id: u32) -> Self {
        self = self.subject(id, 0);
        if let Some(subject) = self.snapshot.subjects.last_mut() {
            subject.is_filler = true;
        }
        self
    }

    pub fn teacher(mut self, id: u32, max_weekly_blocks: u32, can_teach_filler: bool) -> Self {
        self.snapshot.teachers.push(Teacher {
            id,
            name: format!("teacher-{id}"),
            max_weekly_blocks,
            can_teach_filler,
        });
        self
    }

    pub fn eligible(mut self, teacher_id: u32, subject_id: u32) -> Self {
        self.snapshot.eligibility.push(Eligibility {
            teacher_id,
            subject_id,
        });
        self
    }

    pub fn available(mut self, teacher_id: u32, day: Weekday, start: Period, end: Period) -> Self {
        self.snapshot.availability.push(AvailabilityWindow {
            teacher_id,
            day,
            period_start: start,
            period_end: end,
        });
        self
    }

    /// Availability on every teaching day for every period.
    pub fn always_available(mut self, teacher_id: u32) -> Self {
        let days = self.snapshot.config.teaching_days.clone();
        let last = self.snapshot.config.periods_per_day;
        for day in days {
            self = self.available(teacher_id, day, 1, last);
        }
        self
    }

    pub fn grade_subject(mut self, grade_id: u32, subject_id: u32) -> Self {
        self.snapshot.grade_subjects.push(GradeSubject {
            grade_id,
            subject_id,
        });
        self
    }

    pub fn course_requirement(mut self, course_id: u32, subject_id: u32, blocks: u32) -> Self {
        self.snapshot.course_requirements.push(CourseRequirement {
            course_id,
            subject_id,
            required_blocks: blocks,
        });
        self
    }

    pub fn target(mut self, course_id: u32, target_slots: u32) -> Self {
        self.snapshot.course_targets.push(CourseTarget {
            course_id,
            target_slots,
        });
        self
    }

    pub fn rule(mut self, kind: RuleKind) -> Self {
        self.snapshot.rules.push(PedagogicalRule { active: true, kind });
        self
    }

    pub fn build(self) -> Snapshot {
        self.snapshot
    }
}
