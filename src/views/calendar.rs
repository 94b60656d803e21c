//! Month grid of Sunday-first weeks.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Status, Task};

#[derive(Debug, Clone, Serialize)]
pub struct DayTask {
    pub id: String,
    pub title: String,
    pub status: Status,
}

#[derive(Debug, Clone, Serialize)]
pub struct Day {
    pub date: NaiveDate,
    /// False for leading and trailing days from adjacent months.
    pub in_month: bool,
    pub tasks: Vec<DayTask>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<[Day; 7]>,
}

impl CalendarMonth {
    pub fn day(&self, date: NaiveDate) -> Option<&Day> {
        self.weeks.iter().flatten().find(|day| day.date == date)
    }
}

/// Grid covering every day of `year`-`month`, padded to whole weeks.
pub fn month_grid(tasks: &[Task], year: i32, month: u32) -> Result<CalendarMonth> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidArgument(format!("invalid month {year}-{month:02}")))?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| Error::InvalidArgument(format!("invalid month {year}-{month:02}")))?;
    let last = next_first - Duration::days(1);

    let lead = first.weekday().num_days_from_sunday() as i64;
    let mut cursor = first - Duration::days(lead);
    let mut weeks = Vec::new();
    while cursor <= last {
        let week: [Day; 7] = std::array::from_fn(|offset| {
            let date = cursor + Duration::days(offset as i64);
            Day {
                date,
                in_month: date.month() == month && date.year() == year,
                tasks: tasks_due(tasks, date),
            }
        });
        weeks.push(week);
        cursor += Duration::days(7);
    }

    Ok(CalendarMonth { year, month, weeks })
}

fn tasks_due(tasks: &[Task], date: NaiveDate) -> Vec<DayTask> {
    tasks
        .iter()
        .filter(|task| task.due_date == Some(date))
        .map(|task| DayTask {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status,
        })
        .collect()
}

/// Parse `YYYY-MM` into (year, month).
pub fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let invalid = || Error::InvalidArgument(format!("invalid month '{}' (expected YYYY-MM)", raw.trim()));
    let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weeks_start_on_sunday_and_cover_month() {
        // 2024-01-01 is a Monday.
        let grid = month_grid(&[], 2024, 1).unwrap();
        assert_eq!(grid.weeks[0][0].date, date(2023, 12, 31));
        assert!(!grid.weeks[0][0].in_month);
        assert_eq!(grid.weeks[0][1].date, date(2024, 1, 1));
        let last_week = grid.weeks.last().unwrap();
        assert!(last_week.iter().any(|d| d.date == date(2024, 1, 31)));
        assert_eq!(grid.weeks.len(), 5);
    }

    #[test]
    fn tasks_land_on_their_due_date() {
        let mut task = Task::new("Design mock");
        task.due_date = Some(date(2024, 1, 1));
        let grid = month_grid(&[task, Task::new("Undated")], 2024, 1).unwrap();
        let cell = grid.day(date(2024, 1, 1)).unwrap();
        assert_eq!(cell.tasks.len(), 1);
        assert_eq!(cell.tasks[0].title, "Design mock");
        let total: usize = grid.weeks.iter().flatten().map(|d| d.tasks.len()).sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn december_rolls_into_next_year() {
        let grid = month_grid(&[], 2024, 12).unwrap();
        assert!(grid.day(date(2024, 12, 31)).unwrap().in_month);
        assert!(month_grid(&[], 2024, 13).is_err());
    }

    #[test]
    fn month_argument_parses() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, 2));
        assert!(parse_month("2024-00").is_err());
        assert!(parse_month("Feb").is_err());
    }
}
