use serde::{Deserialize, Serialize};
use std::fmt;

// Ids are plain integers on the wire; periods count from 1.
pub type CourseId = u32;
pub type SubjectId = u32;
pub type TeacherId = u32;
pub type RoomId = u32;
pub type GradeId = u32;
pub type Period = u32;

/// A day of the school week. Ordered Monday first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        };
        f.write_str(name)
    }
}

/// What a period of the day is used for. Only `Class` periods can hold lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Class,
    Break,
    Lunch,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDefinition {
    pub number: Period,
    pub kind: PeriodKind,
}

/// Preferred half of the day for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePreference {
    Morning,
    Afternoon,
    #[default]
    Any,
}

/// School-wide grid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolConfig {
    pub teaching_days: Vec<Weekday>,
    pub periods_per_day: u32,
    /// Periods missing from this list are class periods.
    #[serde(default)]
    pub periods: Vec<PeriodDefinition>,
    /// Last period counted as morning; later periods are afternoon.
    #[serde(default = "default_morning_last_period")]
    pub morning_last_period: Period,
}

fn default_morning_last_period() -> Period {
    6
}

/// A class-group that receives a weekly schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    #[serde(default)]
    pub name: String,
    pub grade_id: GradeId,
    #[serde(default)]
    pub fixed_room_id: Option<RoomId>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub name: String,
    pub weekly_blocks: u32,
    #[serde(default)]
    pub is_filler: bool,
    #[serde(default)]
    pub requires_consecutive_blocks: bool,
    #[serde(default)]
    pub requires_double_block: bool,
    #[serde(default)]
    pub preferred_time: TimePreference,
}

impl Subject {
    pub fn wants_adjacent_blocks(&self) -> bool {
        self.requires_consecutive_blocks || self.requires_double_block
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    #[serde(default)]
    pub name: String,
    pub max_weekly_blocks: u32,
    #[serde(default)]
    pub can_teach_filler: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    #[serde(default)]
    pub name: String,
}

/// Teacher × subject relation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
}

/// An inclusive range of periods on one day in which a teacher can be scheduled.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityWindow {
    pub teacher_id: TeacherId,
    pub day: Weekday,
    pub period_start: Period,
    pub period_end: Period,
}

/// Grade-level standard requirement; the block count comes from the subject.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeSubject {
    pub grade_id: GradeId,
    pub subject_id: SubjectId,
}

/// Course-specific override of the grade-level requirements.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRequirement {
    pub course_id: CourseId,
    pub subject_id: SubjectId,
    pub required_blocks: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseTarget {
    pub course_id: CourseId,
    pub target_slots: u32,
}

/// Which grades may be padded with a filler subject. An empty grade list means every grade.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillerPolicy {
    pub subject_id: SubjectId,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub compatible_grades: Vec<GradeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// At most `max_blocks` blocks of a subject per course and day.
    #[serde(rename_all = "camelCase")]
    MaxBlocksPerDay {
        #[serde(default = "default_max_blocks")]
        max_blocks: u32,
        /// Empty means every subject.
        #[serde(default)]
        subject_ids: Vec<SubjectId>,
    },
    /// Same-day blocks of these subjects must be adjacent.
    #[serde(rename_all = "camelCase")]
    ConsecutiveBlocks {
        #[serde(default)]
        subject_ids: Vec<SubjectId>,
    },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PedagogicalRule {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(flatten)]
    pub kind: RuleKind,
}

fn default_true() -> bool {
    true
}

fn default_max_blocks() -> u32 {
    2
}

/// Everything a generation run reads. Treated as immutable for the run's duration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub config: SchoolConfig,
    pub courses: Vec<Course>,
    pub subjects: Vec<Subject>,
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub eligibility: Vec<Eligibility>,
    #[serde(default)]
    pub availability: Vec<AvailabilityWindow>,
    #[serde(default)]
    pub grade_subjects: Vec<GradeSubject>,
    #[serde(default)]
    pub course_requirements: Vec<CourseRequirement>,
    #[serde(default)]
    pub course_targets: Vec<CourseTarget>,
    #[serde(default)]
    pub filler_policies: Vec<FillerPolicy>,
    #[serde(default)]
    pub rules: Vec<PedagogicalRule>,
}

/// One scheduled lesson: `(course, day, period) -> (subject, teacher, room)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub course_id: CourseId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub day: Weekday,
    pub period: Period,
    pub room_id: Option<RoomId>,
    pub is_filler: bool,
}

impl SlotAssignment {
    /// A new slot value identical to this one except for its cell.
    pub fn moved_to(&self, day: Weekday, period: Period) -> SlotAssignment {
        SlotAssignment {
            day,
            period,
            ..self.clone()
        }
    }
}

impl fmt::Display for SlotAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "course {} / subject {} / teacher {} @ {} period {}",
            self.course_id, self.subject_id, self.teacher_id, self.day, self.period
        )
    }
}
