//! Soft-constraint scoring of a (full or partial) timetable.
//!
//! The score is a weighted sum of five sub-scores, each bounded in `[0, 1]`:
//!
//! | Term | Measures |
//! |------|----------|
//! | gaps | idle periods between a course's lessons on the same day |
//! | balance | how evenly lessons spread over the days of the week |
//! | consecutive | same-day blocks of adjacency subjects being back to back |
//! | teacher compactness | idle periods inside each teacher's day |
//! | time preference | subjects landing in their preferred half of the day |
//!
//! Groupings are rebuilt from the flat slot list on every call; nothing is cached.

use crate::catalog::Catalog;
use crate::data::{CourseId, Period, SlotAssignment, SubjectId, TeacherId, Weekday};
use crate::error::SolverError;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Gaps per course at which the gap sub-score bottoms out.
const GAP_SATURATION: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityWeights {
    pub gaps: f64,
    pub balance: f64,
    pub consecutive: f64,
    pub teacher_compactness: f64,
    pub time_preference: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            gaps: 0.4,
            balance: 0.3,
            consecutive: 0.2,
            teacher_compactness: 0.1,
            time_preference: 0.1,
        }
    }
}

impl QualityWeights {
    pub fn check(&self) -> Result<(), SolverError> {
        let all = [
            self.gaps,
            self.balance,
            self.consecutive,
            self.teacher_compactness,
            self.time_preference,
        ];
        if all.iter().all(|w| w.is_finite() && *w >= 0.0) {
            Ok(())
        } else {
            Err(SolverError::InvalidWeights)
        }
    }
}

/// The five sub-scores and their weighted total.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityBreakdown {
    pub gaps: f64,
    pub balance: f64,
    pub consecutive: f64,
    pub teacher_compactness: f64,
    pub time_preference: f64,
    pub total: f64,
}

pub struct QualityScorer<'a> {
    catalog: &'a Catalog,
    weights: QualityWeights,
}

impl<'a> QualityScorer<'a> {
    pub fn new(catalog: &'a Catalog, weights: QualityWeights) -> Self {
        Self { catalog, weights }
    }

    /// Weighted quality of a slot collection. Empty input scores 0.
    pub fn score(&self, slots: &[SlotAssignment]) -> f64 {
        self.breakdown(slots).total
    }

    pub fn breakdown(&self, slots: &[SlotAssignment]) -> QualityBreakdown {
        if slots.is_empty() {
            return QualityBreakdown::default();
        }
        let gaps = course_gap_score(slots);
        let balance = weekly_balance_score(slots);
        let consecutive = self.consecutive_score(slots);
        let teacher_compactness = teacher_compactness_score(slots);
        let time_preference = self.time_preference_score(slots);
        let w = &self.weights;
        QualityBreakdown {
            gaps,
            balance,
            consecutive,
            teacher_compactness,
            time_preference,
            total: gaps * w.gaps
                + balance * w.balance
                + consecutive * w.consecutive
                + teacher_compactness * w.teacher_compactness
                + time_preference * w.time_preference,
        }
    }

    fn consecutive_score(&self, slots: &[SlotAssignment]) -> f64 {
        let mut groups: BTreeMap<(CourseId, SubjectId, Weekday), Vec<Period>> = BTreeMap::new();
        for slot in slots
            .iter()
            .filter(|s| self.catalog.requires_adjacency(s.subject_id))
        {
            groups
                .entry((slot.course_id, slot.subject_id, slot.day))
                .or_default()
                .push(slot.period);
        }

        let (checked, compliant) = groups
            .into_values()
            .filter(|periods| periods.len() >= 2)
            .fold((0usize, 0usize), |(checked, compliant), periods| {
                let ok = is_strictly_consecutive(periods);
                (checked + 1, compliant + usize::from(ok))
            });
        if checked == 0 {
            1.0
        } else {
            compliant as f64 / checked as f64
        }
    }

    fn time_preference_score(&self, slots: &[SlotAssignment]) -> f64 {
        let (evaluated, met) = slots
            .iter()
            .filter_map(|slot| {
                let subject = self.catalog.subject(slot.subject_id)?;
                self.catalog
                    .matches_preference(subject.preferred_time, slot.period)
            })
            .fold((0usize, 0usize), |(evaluated, met), ok| {
                (evaluated + 1, met + usize::from(ok))
            });
        if evaluated == 0 {
            1.0
        } else {
            met as f64 / evaluated as f64
        }
    }
}

/// True when the sorted periods have no holes between them.
pub(crate) fn is_strictly_consecutive(mut periods: Vec<Period>) -> bool {
    periods.sort_unstable();
    periods.iter().tuple_windows().all(|(a, b)| *b == a + 1)
}

fn idle_between(periods: &mut [Period]) -> u32 {
    periods.sort_unstable();
    periods
        .iter()
        .tuple_windows()
        .map(|(a, b)| b.saturating_sub(*a).saturating_sub(1))
        .sum()
}

fn course_gap_score(slots: &[SlotAssignment]) -> f64 {
    let mut by_course: BTreeMap<CourseId, BTreeMap<Weekday, Vec<Period>>> = BTreeMap::new();
    for slot in slots {
        by_course
            .entry(slot.course_id)
            .or_default()
            .entry(slot.day)
            .or_default()
            .push(slot.period);
    }
    let course_count = by_course.len();
    let total: f64 = by_course
        .into_values()
        .map(|days| {
            let gaps: u32 = days
                .into_values()
                .map(|mut periods| idle_between(&mut periods))
                .sum();
            (1.0 - f64::from(gaps) / GAP_SATURATION).max(0.0)
        })
        .sum();
    total / course_count as f64
}

fn weekly_balance_score(slots: &[SlotAssignment]) -> f64 {
    let per_day: BTreeMap<Weekday, usize> = slots.iter().map(|s| s.day).counts().into_iter().collect();
    let values: Vec<f64> = per_day.into_values().map(|n| n as f64).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (1.0 - variance.sqrt() / mean).max(0.0)
}

fn teacher_compactness_score(slots: &[SlotAssignment]) -> f64 {
    // double-booked cells count once
    let mut by_teacher: BTreeMap<TeacherId, BTreeMap<Weekday, BTreeSet<Period>>> = BTreeMap::new();
    for slot in slots {
        by_teacher
            .entry(slot.teacher_id)
            .or_default()
            .entry(slot.day)
            .or_default()
            .insert(slot.period);
    }
    if by_teacher.is_empty() {
        return 1.0;
    }
    let teacher_count = by_teacher.len();
    let total: f64 = by_teacher
        .into_values()
        .map(|days| {
            let mut blocks = 0usize;
            let mut idle = 0u32;
            for periods in days.into_values() {
                blocks += periods.len();
                if let MinMaxResult::MinMax(lo, hi) = periods.iter().minmax() {
                    idle += (hi - lo + 1).saturating_sub(periods.len() as u32);
                }
            }
            (1.0 - f64::from(idle) / (blocks as f64 + 1.0)).max(0.0)
        })
        .sum();
    total / teacher_count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimePreference;
    use crate::testing::SnapshotBuilder;

    fn slot(course: u32, subject: u32, teacher: u32, day: Weekday, period: u32) -> SlotAssignment {
        SlotAssignment {
            course_id: course,
            subject_id: subject,
            teacher_id: teacher,
            day,
            period,
            room_id: None,
            is_filler: false,
        }
    }

    fn catalog() -> Catalog {
        let snapshot = SnapshotBuilder::new(&[Weekday::Monday, Weekday::Tuesday], 10)
            .course(1, 1)
            .subject(10, 2)
            .consecutive_subject(11, 2)
            .subject(12, 2)
            .preferring(12, TimePreference::Afternoon)
            .build();
        Catalog::new(snapshot).unwrap()
    }

    #[test]
    fn empty_input_scores_zero() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        assert_eq!(scorer.score(&[]), 0.0);
    }

    #[test]
    fn compact_balanced_schedule_scores_full_marks() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        let slots = vec![
            slot(1, 11, 1, Weekday::Monday, 1),
            slot(1, 11, 1, Weekday::Monday, 2),
            slot(1, 10, 2, Weekday::Tuesday, 1),
            slot(1, 10, 2, Weekday::Tuesday, 2),
        ];

        let breakdown = scorer.breakdown(&slots);

        assert_eq!(breakdown.gaps, 1.0);
        assert_eq!(breakdown.balance, 1.0);
        assert_eq!(breakdown.consecutive, 1.0);
        assert_eq!(breakdown.teacher_compactness, 1.0);
        assert_eq!(breakdown.time_preference, 1.0);
        assert!((breakdown.total - 1.1).abs() < 1e-9);
    }

    #[test]
    fn gaps_and_split_adjacency_lower_the_score() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        let slots = vec![
            slot(1, 11, 1, Weekday::Monday, 1),
            slot(1, 11, 1, Weekday::Monday, 4),
        ];

        let breakdown = scorer.breakdown(&slots);

        // two idle periods between 1 and 4
        assert!((breakdown.gaps - 0.8).abs() < 1e-9);
        assert_eq!(breakdown.consecutive, 0.0);
        // teacher: 2 idle over 2 blocks -> 1 - 2/3
        assert!((breakdown.teacher_compactness - (1.0 - 2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn uneven_days_reduce_balance() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        let slots = vec![
            slot(1, 10, 1, Weekday::Monday, 1),
            slot(1, 10, 1, Weekday::Monday, 2),
            slot(1, 10, 1, Weekday::Monday, 3),
            slot(1, 10, 1, Weekday::Tuesday, 1),
        ];

        // counts 3 and 1: mean 2, std 1
        assert!((scorer.breakdown(&slots).balance - 0.5).abs() < 1e-9);
    }

    #[test]
    fn time_preference_counts_only_subjects_with_a_preference() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        let slots = vec![
            slot(1, 12, 1, Weekday::Monday, 2),
            slot(1, 12, 1, Weekday::Monday, 8),
            slot(1, 10, 2, Weekday::Monday, 3),
        ];

        assert_eq!(scorer.breakdown(&slots).time_preference, 0.5);
    }

    #[test]
    fn double_booked_teacher_cells_still_score_within_bounds() {
        let catalog = catalog();
        let scorer = QualityScorer::new(&catalog, QualityWeights::default());
        let slots = vec![
            slot(1, 10, 1, Weekday::Monday, 1),
            slot(2, 10, 1, Weekday::Monday, 1),
            slot(3, 10, 1, Weekday::Monday, 1),
        ];

        let breakdown = scorer.breakdown(&slots);

        assert_eq!(breakdown.teacher_compactness, 1.0);
        assert!(breakdown.total.is_finite());
        assert!(breakdown.total >= 0.0 && breakdown.total <= 1.1 + 1e-9);
    }

    #[test]
    fn negative_weights_are_rejected() {
        let weights = QualityWeights {
            gaps: -1.0,
            ..QualityWeights::default()
        };
        assert_eq!(weights.check(), Err(SolverError::InvalidWeights));
    }
}
