use crate::persistence::StateSnapshot;
use common::model::level::{Level, LevelId};
use indexmap::IndexSet;
use std::collections::BTreeMap;

/// A learner's progress. Only the controller mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    score: u32,
    badges: IndexSet<String>,
    attempts: BTreeMap<LevelId, u32>,
    completed: IndexSet<LevelId>,
    all_complete_shown: bool,
}

/// What a successful run was worth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub points: u32,
    /// The badge unlocked by this run, if it wasn't already held.
    pub badge: Option<String>,
    /// False if the level had already been completed before this run.
    pub newly_completed: bool,
}

impl RunState {
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn badges(&self) -> &IndexSet<String> {
        &self.badges
    }

    pub fn completed(&self) -> &IndexSet<LevelId> {
        &self.completed
    }

    pub fn is_completed(&self, id: LevelId) -> bool {
        self.completed.contains(&id)
    }

    pub fn attempts(&self, id: LevelId) -> u32 {
        self.attempts.get(&id).copied().unwrap_or(0)
    }

    pub fn all_complete_shown(&self) -> bool {
        self.all_complete_shown
    }

    /// Records that the all-levels celebration was shown. Returns false if it already had been.
    pub fn mark_all_complete_shown(&mut self) -> bool {
        !std::mem::replace(&mut self.all_complete_shown, true)
    }

    /// Records a failed test for `id`, returning the new attempt count.
    pub fn record_failure(&mut self, id: LevelId) -> u32 {
        let attempts = self.attempts.entry(id).or_insert(0);
        *attempts = attempts.saturating_add(1);
        *attempts
    }

    /// Records a passed test for `level`.
    ///
    /// Points and the badge are only granted the first time a level is completed. The attempt
    /// counter is reset either way.
    pub fn record_success(&mut self, level: &Level) -> Award {
        self.attempts.insert(level.id, 0);
        if !self.completed.insert(level.id) {
            return Award {
                points: 0,
                badge: None,
                newly_completed: false,
            };
        }
        self.score = self.score.saturating_add(level.points);
        let badge = level.badge_name();
        let badge = self.badges.insert(badge.clone()).then_some(badge);
        Award {
            points: level.points,
            badge,
            newly_completed: true,
        }
    }

    /// Resets every field to its initial value.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            score: self.score,
            badges: self.badges.iter().cloned().collect(),
            attempts: self.attempts.clone(),
            completed: self.completed.iter().copied().collect(),
            all_complete_shown: self.all_complete_shown,
        }
    }

    /// Restores a [`RunState`]. Duplicate badges and level ids collapse into one entry.
    pub fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            score: snapshot.score,
            badges: snapshot.badges.into_iter().collect(),
            attempts: snapshot.attempts,
            completed: snapshot.completed.into_iter().collect(),
            all_complete_shown: snapshot.all_complete_shown,
        }
    }
}
