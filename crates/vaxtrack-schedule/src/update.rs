// SPDX-FileCopyrightText: 2026 Vaxtrack Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit partial-update payload for administrative bulk edits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dose::DoseDay;
use crate::record::ScheduleStatus;

/// One field a partial update may touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum ScheduleField {
    /// Overwrite a dose's due date.
    DueDate { day: DoseDay, date: NaiveDate },
    /// Set a dose's completion flag to an explicit value.
    Completed { day: DoseDay, completed: bool },
    /// Requested status. Never honored over the status derived from the flags.
    Status { status: ScheduleStatus },
}

/// An ordered list of field edits, applied first to last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleUpdate {
    fields: Vec<ScheduleField>,
}

impl ScheduleUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn due_date(mut self, day: DoseDay, date: NaiveDate) -> Self {
        self.fields.push(ScheduleField::DueDate { day, date });
        self
    }

    pub fn completed(mut self, day: DoseDay, completed: bool) -> Self {
        self.fields.push(ScheduleField::Completed { day, completed });
        self
    }

    pub fn status(mut self, status: ScheduleStatus) -> Self {
        self.fields.push(ScheduleField::Status { status });
        self
    }

    pub fn fields(&self) -> &[ScheduleField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<ScheduleField> for ScheduleUpdate {
    fn from_iter<I: IntoIterator<Item = ScheduleField>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_order() {
        let update = ScheduleUpdate::new()
            .completed(DoseDay::Day0, true)
            .status(ScheduleStatus::Completed)
            .completed(DoseDay::Day0, false);
        assert_eq!(update.fields().len(), 3);
        assert_eq!(
            update.fields()[2],
            ScheduleField::Completed {
                day: DoseDay::Day0,
                completed: false
            }
        );
    }

    #[test]
    fn deserializes_tagged_form_payload() {
        let json = r#"[
            {"field": "completed", "day": 3, "completed": true},
            {"field": "due_date", "day": 28, "date": "2025-02-01"},
            {"field": "status", "status": "completed"}
        ]"#;
        let update: ScheduleUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.fields().len(), 3);
        assert!(matches!(
            update.fields()[1],
            ScheduleField::DueDate { day: DoseDay::Day28, .. }
        ));
    }

    #[test]
    fn rejects_unknown_fields_and_days() {
        let unknown = r#"[{"field": "patient_ref", "value": "x"}]"#;
        assert!(serde_json::from_str::<ScheduleUpdate>(unknown).is_err());

        let bad_day = r#"[{"field": "completed", "day": 14, "completed": true}]"#;
        assert!(serde_json::from_str::<ScheduleUpdate>(bad_day).is_err());
    }
}
