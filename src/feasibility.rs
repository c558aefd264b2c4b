//! Supply/demand diagnosis of a snapshot before any search starts.
//!
//! The analyzer only reads the [`Catalog`]; running it twice, or after a
//! failed generation, gives the same answer.

use crate::catalog::Catalog;
use crate::data::{CourseId, SubjectId, Weekday};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Approximate per-day demand below which the daily check stays quiet.
const DAILY_DEMAND_THRESHOLD: f64 = 2.0;
/// Problems listed per kind in [`FeasibilityResult::report`].
const REPORT_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    GlobalDeficit,
    WeeklyDeficit,
    DailyBottleneck,
    NoFillerTeacher,
    ConcentratedAvailability,
    PeriodConfiguration,
    NoCourses,
    NoTeachers,
}

impl ProblemKind {
    /// Kinds that make the snapshot infeasible.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            ProblemKind::GlobalDeficit | ProblemKind::WeeklyDeficit | ProblemKind::NoFillerTeacher
        )
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProblemKind::GlobalDeficit => "global deficit",
            ProblemKind::WeeklyDeficit => "weekly deficit",
            ProblemKind::DailyBottleneck => "daily bottleneck",
            ProblemKind::NoFillerTeacher => "no filler teacher",
            ProblemKind::ConcentratedAvailability => "concentrated availability",
            ProblemKind::PeriodConfiguration => "period configuration",
            ProblemKind::NoCourses => "no courses",
            ProblemKind::NoTeachers => "no teachers",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityProblem {
    pub kind: ProblemKind,
    pub description: String,
    pub subject_id: Option<SubjectId>,
    pub course_id: Option<CourseId>,
    pub day: Option<Weekday>,
    pub supply: f64,
    pub demand: f64,
    pub deficit: f64,
    pub remedy: String,
    pub severity: Severity,
}

impl FeasibilityProblem {
    fn new(kind: ProblemKind, severity: Severity, description: String, remedy: String) -> Self {
        Self {
            kind,
            description,
            subject_id: None,
            course_id: None,
            day: None,
            supply: 0.0,
            demand: 0.0,
            deficit: 0.0,
            remedy,
            severity,
        }
    }

    fn balance(mut self, supply: f64, demand: f64) -> Self {
        self.supply = supply;
        self.demand = demand;
        self.deficit = (demand - supply).max(0.0);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityStats {
    pub total_problems: usize,
    pub critical_problems: usize,
    pub problems_by_kind: BTreeMap<ProblemKind, usize>,
    pub subjects_with_deficit: usize,
    pub total_deficit: f64,
    pub courses: usize,
    pub subjects: usize,
    pub teachers: usize,
    pub total_demand: u32,
    pub total_supply: u32,
}

/// Yes/no answers to the questions worth asking before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreGenerationChecklist {
    pub mandatory_fits_target: bool,
    pub subject_supply_covers_demand: bool,
    pub filler_teachers_defined: bool,
    pub availability_spread: bool,
    pub active_rules: bool,
}

impl PreGenerationChecklist {
    pub fn all_passed(&self) -> bool {
        self.mandatory_fits_target
            && self.subject_supply_covers_demand
            && self.filler_teachers_defined
            && self.availability_spread
            && self.active_rules
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityResult {
    pub is_feasible: bool,
    pub problems: Vec<FeasibilityProblem>,
    pub stats: FeasibilityStats,
    pub checklist: PreGenerationChecklist,
}

impl FeasibilityResult {
    pub fn problems_of(&self, kind: ProblemKind) -> impl Iterator<Item = &FeasibilityProblem> {
        self.problems.iter().filter(move |p| p.kind == kind)
    }

    /// Human-readable summary: verdict, counts, then the problems grouped by kind.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let verdict = if self.is_feasible { "FEASIBLE" } else { "INFEASIBLE" };
        let _ = writeln!(out, "Feasibility: {verdict}");
        let _ = writeln!(
            out,
            "Problems: {} ({} critical), demand {} / supply {} blocks",
            self.stats.total_problems,
            self.stats.critical_problems,
            self.stats.total_demand,
            self.stats.total_supply
        );

        let grouped = self.problems.iter().into_group_map_by(|p| p.kind);
        for kind in grouped.keys().sorted() {
            let problems = &grouped[kind];
            let _ = writeln!(out, "\n{} ({}):", kind, problems.len());
            for problem in problems.iter().take(REPORT_LIMIT) {
                let _ = writeln!(out, "  - {}", problem.description);
                let _ = writeln!(out, "    fix: {}", problem.remedy);
            }
            if problems.len() > REPORT_LIMIT {
                let _ = writeln!(out, "  ... and {} more", problems.len() - REPORT_LIMIT);
            }
        }

        if !self.checklist.all_passed() {
            let _ = writeln!(out, "\nChecklist:");
            let items = [
                ("mandatory blocks fit course targets", self.checklist.mandatory_fits_target),
                ("subject supply covers demand", self.checklist.subject_supply_covers_demand),
                ("filler teachers defined", self.checklist.filler_teachers_defined),
                ("availability spread over two or more days", self.checklist.availability_spread),
                ("at least one active pedagogical rule", self.checklist.active_rules),
            ];
            for (label, ok) in items {
                let mark = if ok { "x" } else { " " };
                let _ = writeln!(out, "  [{mark}] {label}");
            }
        }
        out
    }
}

pub struct FeasibilityAnalyzer<'a> {
    catalog: &'a Catalog,
}

impl<'a> FeasibilityAnalyzer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn analyze(&self) -> FeasibilityResult {
        info!("Analyzing feasibility");
        let mut problems = Vec::new();

        self.check_configuration(&mut problems);
        let demand = self.subject_demand();
        let (total_demand, total_supply) = self.check_global_balance(&mut problems);
        self.check_weekly_balance(&demand, &mut problems);
        self.check_daily_bottlenecks(&demand, &mut problems);
        self.check_filler_coverage(&mut problems);
        self.check_availability_spread(&mut problems);

        let is_feasible = !problems.iter().any(|p| p.kind.is_blocking());
        let weekly: Vec<&FeasibilityProblem> = problems
            .iter()
            .filter(|p| p.kind == ProblemKind::WeeklyDeficit)
            .collect();
        let stats = FeasibilityStats {
            total_problems: problems.len(),
            critical_problems: problems
                .iter()
                .filter(|p| p.severity == Severity::Critical)
                .count(),
            problems_by_kind: problems.iter().map(|p| p.kind).counts().into_iter().collect(),
            subjects_with_deficit: weekly.len(),
            total_deficit: weekly.iter().map(|p| p.deficit).sum(),
            courses: self.catalog.courses().len(),
            subjects: self.catalog.subjects().len(),
            teachers: self.catalog.teachers().len(),
            total_demand,
            total_supply,
        };
        let checklist = self.checklist(&problems);

        if is_feasible {
            info!("Snapshot is feasible ({} advisory problems)", problems.len());
        } else {
            warn!(
                "Snapshot is infeasible: {} critical problems",
                stats.critical_problems
            );
        }
        FeasibilityResult {
            is_feasible,
            problems,
            stats,
            checklist,
        }
    }

    fn check_configuration(&self, out: &mut Vec<FeasibilityProblem>) {
        let per_day = self.catalog.snapshot().config.periods_per_day;
        let teaching = self.catalog.teaching_periods().len() as u32;
        if teaching < per_day {
            out.push(FeasibilityProblem::new(
                ProblemKind::PeriodConfiguration,
                Severity::Warning,
                format!(
                    "{teaching} of {per_day} daily periods are class periods; the rest are breaks or lunch"
                ),
                "Check that break and lunch periods are configured as intended".to_string(),
            ));
        }
        if self.catalog.courses().is_empty() {
            out.push(FeasibilityProblem::new(
                ProblemKind::NoCourses,
                Severity::Warning,
                "No courses are defined".to_string(),
                "Create the courses to schedule".to_string(),
            ));
        }
        if self.catalog.teachers().is_empty() {
            out.push(FeasibilityProblem::new(
                ProblemKind::NoTeachers,
                Severity::Warning,
                "No teachers are defined".to_string(),
                "Register teachers with their availability and subjects".to_string(),
            ));
        }
    }

    /// Weekly block demand per subject. Mandatory subjects sum their
    /// requirements; the padding each course needs to reach its target is
    /// shared evenly among the fillers that course may use, remainder to
    /// the lowest ids.
    fn subject_demand(&self) -> BTreeMap<SubjectId, u32> {
        let mut demand: BTreeMap<SubjectId, u32> = BTreeMap::new();
        for course in self.catalog.courses() {
            for requirement in self.catalog.requirements(course.id) {
                *demand.entry(requirement.subject_id).or_insert(0) += requirement.blocks;
            }
            let padding = self
                .catalog
                .target_slots(course.id)
                .saturating_sub(self.catalog.required_blocks(course.id));
            let fillers = self.catalog.filler_subjects_for(course.id);
            if fillers.is_empty() {
                if padding > 0 {
                    warn!(
                        "Course {} needs {padding} filler blocks but no filler subject is open to it",
                        course.id
                    );
                }
                continue;
            }
            let share = padding / fillers.len() as u32;
            let remainder = padding as usize % fillers.len();
            for (i, &subject) in fillers.iter().enumerate() {
                let extra = u32::from(i < remainder);
                *demand.entry(subject).or_insert(0) += share + extra;
            }
        }
        demand
    }

    fn check_global_balance(&self, out: &mut Vec<FeasibilityProblem>) -> (u32, u32) {
        let demand: u32 = self
            .catalog
            .courses()
            .iter()
            .map(|c| {
                self.catalog
                    .target_slots(c.id)
                    .max(self.catalog.required_blocks(c.id))
            })
            .sum();
        // one pass over teachers so shared teachers count once
        let supply: u32 = self
            .catalog
            .teachers()
            .iter()
            .map(|t| self.catalog.weekly_capacity(t))
            .sum();
        debug!("Global balance: demand {demand}, supply {supply}");

        if supply < demand {
            out.push(
                FeasibilityProblem::new(
                    ProblemKind::GlobalDeficit,
                    Severity::Critical,
                    format!(
                        "Teachers can cover {supply} blocks per week but courses need {demand}"
                    ),
                    format!(
                        "Add {} blocks of teacher availability or raise weekly limits",
                        demand - supply
                    ),
                )
                .balance(f64::from(supply), f64::from(demand)),
            );
        }
        (demand, supply)
    }

    fn subject_supply(&self, subject: SubjectId) -> u32 {
        self.catalog
            .eligible_teachers(subject)
            .into_iter()
            .filter_map(|id| self.catalog.teacher(id))
            .map(|t| self.catalog.weekly_capacity(t))
            .sum()
    }

    fn check_weekly_balance(
        &self,
        demand: &BTreeMap<SubjectId, u32>,
        out: &mut Vec<FeasibilityProblem>,
    ) {
        for (&subject_id, &needed) in demand {
            if needed == 0 {
                continue;
            }
            let supply = self.subject_supply(subject_id);
            if supply >= needed {
                continue;
            }
            let (name, is_filler) = self
                .catalog
                .subject(subject_id)
                .map_or(("?", false), |s| (s.name.as_str(), s.is_filler));
            let severity = if is_filler {
                Severity::Warning
            } else {
                Severity::Critical
            };
            let mut problem = FeasibilityProblem::new(
                ProblemKind::WeeklyDeficit,
                severity,
                format!(
                    "Subject {name} ({subject_id}) needs {needed} blocks per week, eligible teachers cover {supply}"
                ),
                format!(
                    "Qualify more teachers for {name} or extend their availability by {} blocks",
                    needed - supply
                ),
            )
            .balance(f64::from(supply), f64::from(needed));
            problem.subject_id = Some(subject_id);
            out.push(problem);
        }
    }

    fn check_daily_bottlenecks(
        &self,
        demand: &BTreeMap<SubjectId, u32>,
        out: &mut Vec<FeasibilityProblem>,
    ) {
        let days = self.catalog.teaching_days();
        if days.is_empty() {
            return;
        }
        for (&subject_id, &needed) in demand {
            let per_day = f64::from(needed) / days.len() as f64;
            if per_day <= DAILY_DEMAND_THRESHOLD {
                continue;
            }
            let teachers = self.catalog.eligible_teachers(subject_id);
            for &day in days {
                let supply: u32 = teachers
                    .iter()
                    .map(|&t| self.catalog.available_blocks_on(t, day))
                    .sum();
                if f64::from(supply) >= per_day {
                    continue;
                }
                let mut problem = FeasibilityProblem::new(
                    ProblemKind::DailyBottleneck,
                    Severity::Warning,
                    format!(
                        "Subject {subject_id} needs about {per_day:.1} blocks on {day}, teachers offer {supply}"
                    ),
                    format!("Add availability on {day} for teachers of subject {subject_id}"),
                )
                .balance(f64::from(supply), per_day);
                problem.subject_id = Some(subject_id);
                problem.day = Some(day);
                out.push(problem);
            }
        }
    }

    fn check_filler_coverage(&self, out: &mut Vec<FeasibilityProblem>) {
        for subject in self.catalog.subjects().iter().filter(|s| s.is_filler) {
            if !self.catalog.eligible_teachers(subject.id).is_empty() {
                continue;
            }
            let mut problem = FeasibilityProblem::new(
                ProblemKind::NoFillerTeacher,
                Severity::Critical,
                format!("Filler subject {} ({}) has no eligible teacher", subject.name, subject.id),
                "Mark at least one teacher as able to teach filler subjects".to_string(),
            );
            problem.subject_id = Some(subject.id);
            out.push(problem);
        }
    }

    fn check_availability_spread(&self, out: &mut Vec<FeasibilityProblem>) {
        for teacher in self.catalog.teachers() {
            if !self.catalog.has_direct_subjects(teacher.id) {
                continue;
            }
            let days = self.catalog.availability_days(teacher.id).len();
            if days == 0 || days >= 2 {
                continue;
            }
            out.push(FeasibilityProblem::new(
                ProblemKind::ConcentratedAvailability,
                Severity::Warning,
                format!(
                    "Teacher {} ({}) is available on {} day(s) only",
                    teacher.name, teacher.id, days
                ),
                format!("Spread the availability of {} over more days", teacher.name),
            ));
        }
    }

    fn checklist(&self, problems: &[FeasibilityProblem]) -> PreGenerationChecklist {
        let absent = |kind: ProblemKind| !problems.iter().any(|p| p.kind == kind);
        PreGenerationChecklist {
            mandatory_fits_target: self
                .catalog
                .courses()
                .iter()
                .all(|c| self.catalog.required_blocks(c.id) <= self.catalog.target_slots(c.id)),
            subject_supply_covers_demand: absent(ProblemKind::WeeklyDeficit),
            filler_teachers_defined: absent(ProblemKind::NoFillerTeacher),
            availability_spread: absent(ProblemKind::ConcentratedAvailability),
            active_rules: self.catalog.has_active_rules(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RuleKind;
    use crate::testing::SnapshotBuilder;

    fn analyze(catalog: &Catalog) -> FeasibilityResult {
        FeasibilityAnalyzer::new(catalog).analyze()
    }

    #[test]
    fn weekly_deficit_is_reported_with_its_size() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 6)
            .course(1, 1)
            .subject(10, 5)
            .grade_subject(1, 10)
            .target(1, 5)
            .teacher(1, 30, false)
            .eligible(1, 10)
            .available(1, Weekday::Monday, 1, 2)
            .available(1, Weekday::Tuesday, 1, 1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        assert!(!result.is_feasible);
        let weekly: Vec<_> = result.problems_of(ProblemKind::WeeklyDeficit).collect();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].deficit, 2.0);
        assert_eq!(weekly[0].supply, 3.0);
        assert_eq!(weekly[0].severity, Severity::Critical);
        assert_eq!(result.stats.subjects_with_deficit, 1);
    }

    #[test]
    fn shared_teacher_is_counted_once_globally() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 4)
            .course(1, 1)
            .subject(10, 2)
            .subject(11, 2)
            .grade_subject(1, 10)
            .grade_subject(1, 11)
            .teacher(1, 40, false)
            .eligible(1, 10)
            .eligible(1, 11)
            .available(1, Weekday::Monday, 1, 3)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        // 3 real blocks, not 3 per subject
        assert_eq!(result.stats.total_supply, 3);
        assert_eq!(result.stats.total_demand, 4);
        assert_eq!(result.problems_of(ProblemKind::GlobalDeficit).count(), 1);
        assert!(!result.is_feasible);
    }

    #[test]
    fn weekly_cap_limits_supply() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 4)
            .course(1, 1)
            .subject(10, 4)
            .grade_subject(1, 10)
            .target(1, 4)
            .teacher(1, 3, false)
            .eligible(1, 10)
            .always_available(1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let weekly: Vec<_> = analyze(&catalog)
            .problems_of(ProblemKind::WeeklyDeficit)
            .cloned()
            .collect();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].deficit, 1.0);
    }

    #[test]
    fn filler_subject_without_teacher_blocks_generation() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 2)
            .course(1, 1)
            .filler_subject(20)
            .teacher(1, 10, false)
            .always_available(1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        assert!(!result.is_feasible);
        assert_eq!(result.problems_of(ProblemKind::NoFillerTeacher).count(), 1);
        assert!(!result.checklist.filler_teachers_defined);
    }

    #[test]
    fn filler_demand_is_spread_over_filler_subjects() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 5)
            .course(1, 1)
            .filler_subject(20)
            .filler_subject(21)
            .teacher(1, 2, true)
            .always_available(1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        // 5 filler blocks: 3 for subject 20, 2 for subject 21, teacher offers 2
        let weekly: Vec<_> = result.problems_of(ProblemKind::WeeklyDeficit).collect();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].subject_id, Some(20));
        assert_eq!(weekly[0].severity, Severity::Warning);
        assert!(!result.is_feasible);
    }

    #[test]
    fn filler_demand_only_counts_fillers_open_to_the_course() {
        let mut snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 5)
            .course(1, 1)
            .filler_subject(20)
            .filler_subject(21)
            .target(1, 10)
            .teacher(1, 6, true)
            .always_available(1)
            .build();
        snapshot.filler_policies.push(crate::data::FillerPolicy {
            subject_id: 21,
            active: true,
            compatible_grades: vec![2],
        });
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        // all 10 padding blocks land on subject 20, the only filler grade 1 may use
        let weekly: Vec<_> = result.problems_of(ProblemKind::WeeklyDeficit).collect();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].subject_id, Some(20));
        assert_eq!(weekly[0].deficit, 4.0);
        assert!(!result.is_feasible);
    }

    #[test]
    fn concentrated_availability_ignores_filler_only_and_absent_teachers() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 4)
            .course(1, 1)
            .subject(10, 2)
            .filler_subject(20)
            .grade_subject(1, 10)
            .teacher(1, 10, false)
            .teacher(2, 10, true)
            .teacher(3, 10, false)
            .eligible(1, 10)
            .eligible(3, 10)
            .always_available(1)
            .available(2, Weekday::Monday, 1, 4)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        // teacher 2 only teaches fillers, teacher 3 is never available
        assert_eq!(result.problems_of(ProblemKind::ConcentratedAvailability).count(), 0);
        assert!(result.checklist.availability_spread);
    }

    #[test]
    fn advisory_problems_do_not_change_the_verdict() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 8)
            .course(1, 1)
            .subject(10, 6)
            .grade_subject(1, 10)
            .target(1, 6)
            .teacher(1, 10, false)
            .eligible(1, 10)
            .available(1, Weekday::Monday, 1, 8)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        assert!(result.is_feasible);
        // 3 blocks a day expected, nothing offered on Tuesday
        let daily: Vec<_> = result.problems_of(ProblemKind::DailyBottleneck).collect();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].day, Some(Weekday::Tuesday));
        assert_eq!(result.problems_of(ProblemKind::ConcentratedAvailability).count(), 1);
        assert!(!result.checklist.availability_spread);
    }

    #[test]
    fn empty_catalog_gets_configuration_notes() {
        let catalog = Catalog::new(SnapshotBuilder::new(&[Weekday::Monday], 2).build()).unwrap();

        let result = analyze(&catalog);

        assert!(result.is_feasible);
        assert_eq!(result.problems_of(ProblemKind::NoCourses).count(), 1);
        assert_eq!(result.problems_of(ProblemKind::NoTeachers).count(), 1);
    }

    #[test]
    fn checklist_and_report_reflect_the_snapshot() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 2)
            .course(1, 1)
            .subject(10, 2)
            .grade_subject(1, 10)
            .filler_subject(20)
            .teacher(1, 10, true)
            .eligible(1, 10)
            .always_available(1)
            .rule(RuleKind::MaxBlocksPerDay {
                max_blocks: 2,
                subject_ids: vec![],
            })
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        let result = analyze(&catalog);

        assert!(result.is_feasible);
        assert!(result.checklist.all_passed());
        assert!(result.report().starts_with("Feasibility: FEASIBLE"));
    }

    #[test]
    fn analysis_is_repeatable() {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday], 3)
            .course(1, 1)
            .subject(10, 3)
            .grade_subject(1, 10)
            .teacher(1, 1, false)
            .eligible(1, 10)
            .always_available(1)
            .build();
        let catalog = Catalog::new(snapshot).unwrap();

        assert_eq!(analyze(&catalog), analyze(&catalog));
    }
}
