//! Next-run calculation for scheduled backups.
//!
//! All calculations happen in the wall-clock time of the zone `now` is
//! expressed in, so "03:00 daily" means 03:00 local time for a
//! `DateTime<Local>` and 03:00 UTC for a `DateTime<Utc>`.

use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use tidemark_core::config::MAX_MONTHLY_DAY;
use tidemark_core::{BackupConfig, BackupFrequency};

/// Zone whose wall clock the schedule follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleZone {
    /// The machine's local time
    #[default]
    Local,
    /// Coordinated universal time
    Utc,
}

impl ScheduleZone {
    /// [`next_run`] evaluated in this zone, returned as UTC.
    #[must_use]
    pub fn next_run(self, config: &BackupConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Local => {
                next_run(config, &now.with_timezone(&Local)).map(|t| t.with_timezone(&Utc))
            }
            Self::Utc => next_run(config, &now),
        }
    }
}

/// Compute the next instant a backup should run.
///
/// Returns `None` when scheduling is disabled or the frequency is manual.
/// Any returned instant is strictly after `now`.
pub fn next_run<Tz: TimeZone>(config: &BackupConfig, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    if !config.is_scheduled() {
        return None;
    }

    let tz = now.timezone();
    let today = now.date_naive();
    let time = config.scheduled_time.to_naive_time();

    let next = match config.frequency {
        BackupFrequency::Manual => return None,
        BackupFrequency::Hourly => {
            let into_hour = Duration::seconds(i64::from(now.minute() * 60 + now.second()))
                + Duration::nanoseconds(i64::from(now.nanosecond()));
            now.clone() - into_hour + Duration::hours(1)
        }
        BackupFrequency::Daily => {
            let candidate = resolve_local(&tz, today.and_time(time))?;
            if candidate > *now {
                candidate
            } else {
                resolve_local(&tz, (today + Duration::days(1)).and_time(time))?
            }
        }
        BackupFrequency::Weekly => {
            let target = chrono::Weekday::from(config.weekly_day);
            let days_ahead = (7 + target.num_days_from_monday()
                - now.weekday().num_days_from_monday())
                % 7;
            let day = today + Duration::days(i64::from(days_ahead));
            let candidate = resolve_local(&tz, day.and_time(time))?;
            if candidate > *now {
                candidate
            } else {
                resolve_local(&tz, (day + Duration::days(7)).and_time(time))?
            }
        }
        BackupFrequency::Monthly => {
            let day = config.monthly_day.clamp(1, MAX_MONTHLY_DAY);
            let this_month = NaiveDate::from_ymd_opt(today.year(), today.month(), day)?;
            let candidate = resolve_local(&tz, this_month.and_time(time))?;
            if candidate > *now {
                candidate
            } else {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                let next_month = NaiveDate::from_ymd_opt(year, month, day)?;
                resolve_local(&tz, next_month.and_time(time))?
            }
        }
    };

    Some(next)
}

/// Returns true if a run scheduled for `next_run_at` is due at `now`.
pub fn is_due<Tz: TimeZone, Tz2: TimeZone>(next_run_at: &DateTime<Tz>, now: &DateTime<Tz2>) -> bool {
    next_run_at <= now
}

/// Map a wall-clock time onto the zone.
///
/// Ambiguous times (clocks going back) take the earlier instant; times that
/// do not exist (clocks going forward) are pushed one hour later.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}
