use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::recurrence::ItemRecurrence;

/// One-off checklist entry owned by a single day or period record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub done: bool,
}

impl ChecklistItem {
    pub fn new(id: String, text: String) -> Self {
        Self {
            id,
            text,
            done: false,
        }
    }
}

/// Checklist item that reappears on every date its rule covers. The item
/// itself carries no completion state; per-day completion is recorded on the
/// day record so each occurrence is tracked independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringItem {
    pub id: String,
    pub text: String,
    pub recurrence: ItemRecurrence,
}

impl RecurringItem {
    pub fn new(id: String, text: String, recurrence: ItemRecurrence) -> Result<Self, Error> {
        recurrence.validate()?;
        Ok(Self {
            id,
            text,
            recurrence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn recurring_item_rejects_an_empty_weekly_rule() {
        let result = RecurringItem::new(
            "item-1".into(),
            "review inbox".into(),
            ItemRecurrence::Weekly {
                days: BTreeSet::new(),
            },
        );
        assert_eq!(result, Err(Error::EmptyWeeklyRule));
    }

    #[test]
    fn new_items_start_open() {
        let item = ChecklistItem::new("item-1".into(), "buy milk".into());
        assert!(!item.done);
    }
}
