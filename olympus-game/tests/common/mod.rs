#![allow(dead_code)]

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use olympus_game::{
    ActivityConfig, CompletionRecord, Notification, NoteStore, ProgressionEngine, Settings,
    TrackingMode,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

/// In-memory note vault keyed by folder.
#[derive(Clone, Default)]
pub struct MemoryNotes {
    records: Rc<RefCell<HashMap<String, Vec<CompletionRecord>>>>,
    discipline: Rc<RefCell<HashMap<String, u32>>>,
}

impl MemoryNotes {
    pub fn complete(&self, folder: &str, date: NaiveDate) {
        self.records
            .borrow_mut()
            .entry(folder.to_string())
            .or_default()
            .push(CompletionRecord::new(date.to_string(), true));
    }

    pub fn complete_days(&self, folder: &str, first: NaiveDate, count: u64) {
        for offset in 0..count {
            self.complete(folder, first + Days::new(offset));
        }
    }

    pub fn remove_last(&self, folder: &str) {
        if let Some(records) = self.records.borrow_mut().get_mut(folder) {
            records.pop();
        }
    }

    pub fn set_discipline(&self, folder: &str, count: u32) {
        self.discipline
            .borrow_mut()
            .insert(folder.to_string(), count);
    }
}

impl NoteStore for MemoryNotes {
    type Error = Infallible;

    fn get_completions(
        &self,
        folder: &str,
        _field: &str,
    ) -> Result<Vec<CompletionRecord>, Self::Error> {
        Ok(self.records.borrow().get(folder).cloned().unwrap_or_default())
    }

    fn count_discipline_completions(&self, folder: &str, _field: &str) -> Result<u32, Self::Error> {
        Ok(self.discipline.borrow().get(folder).copied().unwrap_or(0))
    }
}

pub type Engine = ProgressionEngine<MemoryNotes, Vec<Notification>>;

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

pub fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
}

pub fn daily(id: &str, weekly_target: u32, damage: u32) -> ActivityConfig {
    ActivityConfig {
        id: id.to_string(),
        name: id.to_string(),
        folder: id.to_string(),
        field: "done".to_string(),
        damage_per_completion: damage,
        weekly_target,
        tracking_mode: TrackingMode::Daily,
        damage_per_week: 0,
        enabled: true,
    }
}

/// One gym activity (target 7, 1 damage) with a baseline pass already run,
/// so the boss sits at 35/35 on tier 1.
pub fn gym_setup(now: DateTime<Utc>) -> (Engine, MemoryNotes, Settings) {
    let notes = MemoryNotes::default();
    let mut settings = Settings::default();
    settings.activities.push(daily("gym", 7, 1));
    let mut engine = ProgressionEngine::new(notes.clone(), Vec::new());
    engine.on_note_store_changed(&mut settings, now);
    engine.sink_mut().clear();
    (engine, notes, settings)
}
