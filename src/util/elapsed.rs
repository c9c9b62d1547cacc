use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Elapsed {
    pub years: i64,
    pub months: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

fn days_in_month(year: i32, month: u32) -> i64 {
    let (year, month) = if month == 0 { (year - 1, 12) } else { (year, month) };
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(start), Some(end)) => (end - start).num_days(),
        _ => 30,
    }
}

/// Calendar difference between two instants, borrowing from the larger
/// units the way a person counts ("1 month, 27 days").
pub fn elapsed_between(a: NaiveDateTime, b: NaiveDateTime) -> Elapsed {
    let (from, to) = if a > b { (b, a) } else { (a, b) };

    let mut e = Elapsed {
        years: i64::from(to.year() - from.year()),
        months: i64::from(to.month()) - i64::from(from.month()),
        days: i64::from(to.day()) - i64::from(from.day()),
        hours: i64::from(to.hour()) - i64::from(from.hour()),
        minutes: i64::from(to.minute()) - i64::from(from.minute()),
        seconds: i64::from(to.second()) - i64::from(from.second()),
    };

    if e.seconds < 0 {
        e.seconds += 60;
        e.minutes -= 1;
    }
    if e.minutes < 0 {
        e.minutes += 60;
        e.hours -= 1;
    }
    if e.hours < 0 {
        e.hours += 24;
        e.days -= 1;
    }
    if e.days < 0 {
        e.days += days_in_month(to.year(), to.month() - 1);
        e.months -= 1;
    }
    if e.months < 0 {
        e.months += 12;
        e.years -= 1;
    }
    e
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{} {}", count, unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

pub fn format_elapsed(a: NaiveDateTime, b: NaiveDateTime) -> String {
    let e = elapsed_between(a, b);
    let mut out = String::new();
    if e.years > 0 {
        out.push_str(&plural(e.years, "year"));
        out.push_str(", ");
    }
    if !out.is_empty() || e.months > 0 {
        out.push_str(&plural(e.months, "month"));
        out.push_str(", ");
    }
    if !out.is_empty() || e.days > 0 {
        out.push_str(&plural(e.days, "day"));
        out.push_str(", ");
    }

    if !out.is_empty() || e.hours > 0 {
        out.push_str(&format!("{}:{:02}:{:02}", e.hours, e.minutes, e.seconds));
        out
    } else if e.minutes > 0 {
        format!("{}:{:02}", e.minutes, e.seconds)
    } else {
        plural(e.seconds, "second")
    }
}
