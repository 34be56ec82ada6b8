//! Names of date-sharded tables.

use chrono::{Days, NaiveDate, Utc};

/// Returns the id of the shard of `prefix` for `date`, e.g. `events20240131`.
pub fn table_id_for_date(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}{}", date.format("%Y%m%d"))
}

/// Returns the shard ids of `prefix` for today (UTC) and the following days.
///
/// `days_ahead` is the total number of names returned, today included.
pub fn daily_table_names(prefix: &str, days_ahead: u32) -> Vec<String> {
    daily_table_names_from(prefix, Utc::now().date_naive(), days_ahead)
}

/// Returns the shard ids of `prefix` for `start` and the following days.
pub fn daily_table_names_from(prefix: &str, start: NaiveDate, days_ahead: u32) -> Vec<String> {
    (0..days_ahead)
        .map_while(|offset| start.checked_add_days(Days::new(u64::from(offset))))
        .map(|date| table_id_for_date(prefix, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_appends_compact_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(table_id_for_date("events", date), "events20240131");
    }

    #[test]
    fn daily_names_cross_month_boundaries() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();

        assert_eq!(
            daily_table_names_from("events_", start, 3),
            vec!["events_20240228", "events_20240229", "events_20240301"]
        );
        assert!(daily_table_names_from("events_", start, 0).is_empty());
    }

    #[test]
    fn daily_names_start_today() {
        let today = Utc::now().date_naive();
        let names = daily_table_names("t", 2);

        assert_eq!(names.len(), 2);
        // Skip the comparison if the test straddles midnight.
        if Utc::now().date_naive() == today {
            assert_eq!(names[0], table_id_for_date("t", today));
        }
    }
}
