use chrono::{DateTime, Datelike, Duration, Utc, Weekday};

/// Deadline arithmetic is a policy detail, so it stays pluggable. The
/// default counts forward in business days, skipping weekends.
pub trait Calendar: Send + Sync {
    fn deadline(&self, created_at: DateTime<Utc>, business_days: i64) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeekdayCalendar;

impl Calendar for WeekdayCalendar {
    fn deadline(&self, created_at: DateTime<Utc>, business_days: i64) -> DateTime<Utc> {
        let mut at = created_at;
        for _ in 0..business_days {
            at += Duration::days(1);
            while is_weekend(at) {
                at += Duration::days(1);
            }
        }
        at
    }
}

fn is_weekend(at: DateTime<Utc>) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}
