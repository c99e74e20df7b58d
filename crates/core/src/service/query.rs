//! Read-only commands: weekly calendar and subscription listing.

use std::collections::HashMap;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use super::{CommandResult, SubscriptionService};
use crate::catalog::SubtitleGroup;
use crate::error::CommandError;
use crate::subscription::{SubscriptionFilter, SubscriptionStatus};

/// One series on the weekly calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub name: String,
    pub subtitle_groups: Vec<SubtitleGroup>,
    /// Subscription status when the series is followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<u32>,
    /// Tracked by a script rather than a subscription.
    #[serde(default)]
    pub scripted: bool,
}

/// Series grouped by the weekday they air.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyCalendar {
    pub mon: Vec<CalendarEntry>,
    pub tue: Vec<CalendarEntry>,
    pub wed: Vec<CalendarEntry>,
    pub thu: Vec<CalendarEntry>,
    pub fri: Vec<CalendarEntry>,
    pub sat: Vec<CalendarEntry>,
    pub sun: Vec<CalendarEntry>,
}

impl WeeklyCalendar {
    pub fn day(&self, day: Weekday) -> &[CalendarEntry] {
        match day {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
            Weekday::Sun => &self.sun,
        }
    }

    fn day_mut(&mut self, day: Weekday) -> &mut Vec<CalendarEntry> {
        match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
            Weekday::Sun => &mut self.sun,
        }
    }

    pub fn len(&self) -> usize {
        self.mon.len()
            + self.tue.len()
            + self.wed.len()
            + self.thu.len()
            + self.fri.len()
            + self.sat.len()
            + self.sun.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionService {
    /// Known series and active scripted series grouped by weekday, with
    /// their follow state.
    pub async fn calendar(&self) -> Result<CommandResult, CommandError> {
        let result = self.build_calendar().map(|calendar| {
            CommandResult::success(format!("{} series scheduled", calendar.len()))
                .with_data(&calendar)
        });
        self.respond("calendar", result)
    }

    pub fn build_calendar(&self) -> Result<WeeklyCalendar, CommandError> {
        let followed: HashMap<String, (SubscriptionStatus, u32)> = self
            .store
            .list_active()?
            .into_iter()
            .map(|s| (s.series_name, (s.status, s.watermark)))
            .collect();

        let mut calendar = WeeklyCalendar::default();
        for series in self.catalog.list()? {
            let follow = followed.get(&series.name);
            calendar.day_mut(series.update_day).push(CalendarEntry {
                status: follow.map(|(status, _)| *status),
                watermark: follow.map(|(_, watermark)| *watermark),
                name: series.name,
                subtitle_groups: series.subtitle_groups,
                scripted: false,
            });
        }

        if let Some(scripts) = self.scripts.as_ref() {
            for scripted in scripts.list()?.into_iter().filter(|s| s.is_active()) {
                calendar.day_mut(scripted.update_day).push(CalendarEntry {
                    name: scripted.name,
                    subtitle_groups: Vec::new(),
                    status: Some(scripted.status),
                    watermark: Some(scripted.episode),
                    scripted: true,
                });
            }
        }
        Ok(calendar)
    }

    /// List subscriptions, all active ones unless a status is given.
    pub async fn list(
        &self,
        status: Option<SubscriptionStatus>,
    ) -> Result<CommandResult, CommandError> {
        let filter = match status {
            Some(status) => SubscriptionFilter::new().with_status(status),
            None => SubscriptionFilter::new(),
        };

        let result = self.store.list(&filter).map_err(CommandError::from).map(|subs| {
            CommandResult::success(format!("{} subscriptions", subs.len())).with_data(&subs)
        });
        self.respond("list", result)
    }
}
