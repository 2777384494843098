use time::{error::ComponentRange, util::days_in_year_month, Date, Month, UtcOffset};

use crate::entry::EntryView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: Date,
    /// Indices into the entry slice the grid was built from.
    pub entries: Vec<usize>,
    pub is_today: bool,
    pub is_selected: bool,
}

/// Sunday-first month grid for browsing entries by day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: Month,
    pub leading_blanks: u8,
    pub days: Vec<DayCell>,
}

impl MonthGrid {
    pub fn build(
        year: i32,
        month: Month,
        entries: &[EntryView],
        today: Date,
        selected: Option<Date>,
        offset: UtcOffset,
    ) -> Result<Self, ComponentRange> {
        let first = Date::from_calendar_date(year, month, 1)?;
        let leading_blanks = first.weekday().number_days_from_sunday();
        let entry_dates: Vec<Option<Date>> =
            entries.iter().map(|entry| entry.created_on(offset)).collect();

        let days = (1..=days_in_year_month(year, month))
            .map(|day| {
                let date = Date::from_calendar_date(year, month, day)?;
                let entries = entry_dates
                    .iter()
                    .enumerate()
                    .filter(|(_, on)| **on == Some(date))
                    .map(|(idx, _)| idx)
                    .collect();
                Ok(DayCell {
                    date,
                    entries,
                    is_today: date == today,
                    is_selected: selected == Some(date),
                })
            })
            .collect::<Result<Vec<_>, ComponentRange>>()?;

        Ok(Self {
            year,
            month,
            leading_blanks,
            days,
        })
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.month, self.year)
    }

    pub fn day(&self, day: u8) -> Option<&DayCell> {
        self.days.get(usize::from(day).checked_sub(1)?)
    }

    /// Clicking a day opens its entry directly only when there is exactly one.
    pub fn entry_for_click(&self, day: u8) -> Option<usize> {
        match self.day(day)?.entries.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Rows of seven slots, padded with `None` before the first and after the last day.
    pub fn weeks(&self) -> Vec<[Option<&DayCell>; 7]> {
        let mut slots: Vec<Option<&DayCell>> = vec![None; usize::from(self.leading_blanks)];
        slots.extend(self.days.iter().map(Some));
        while slots.len() % 7 != 0 {
            slots.push(None);
        }
        slots
            .chunks(7)
            .map(|chunk| {
                let mut row = [None; 7];
                row.copy_from_slice(chunk);
                row
            })
            .collect()
    }
}

pub fn shift_month(year: i32, month: Month, delta: i32) -> (i32, Month) {
    let index = year * 12 + i32::from(u8::from(month)) - 1 + delta;
    let month = Month::January.nth_next(index.rem_euclid(12) as u8);
    (index.div_euclid(12), month)
}
