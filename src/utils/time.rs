use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Weekday};

/// Hour used when a date is given without a time
const DEFAULT_HOUR: u32 = 12;

/// Outcome of looking at one position in the token stream
enum Step {
    /// Recognized, consumed this many tokens
    Matched(usize),
    /// Not a date word, ignore it
    Skipped,
    /// Looked like a date or time but is impossible (e.g. `June 31`, `13pm`)
    Invalid,
}

/// Everything picked up from the text before it is resolved against "now"
#[derive(Debug, Default)]
struct Fragments {
    date: Option<NaiveDate>,
    /// Month and day given without a year
    yearless: bool,
    day_offset: Option<i64>,
    /// Weekday, and whether it must be strictly after today (`next friday`)
    weekday: Option<(Weekday, bool)>,
    /// A month named without a day (`in may`); the weakest date hint
    month_only: Option<NaiveDate>,
    time: Option<NaiveTime>,
    /// Hour 1-11 given without am/pm, so `tonight at 8` can mean 20:00
    bare_hour: bool,
    /// Time implied by words like `tonight` or `morning`
    implied_time: Option<NaiveTime>,
    relative: Option<Duration>,
    now: bool,
}

/// Parse free-form date/time text such as `June 27, 15:00`, `tomorrow 9am`
/// or `next friday at 18.30` relative to `now`.
///
/// The result is in the timezone of `now`. Returns `None` when nothing in the
/// text can be read as a date or time, or when what was given is impossible.
pub fn parse_natural_datetime<Tz: TimeZone>(text: &str, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(exact) = DateTime::parse_from_rfc3339(text) {
        return Some(exact.with_timezone(&now.timezone()));
    }

    let normalized = text.to_lowercase().replace(',', " ");
    let tokens: Vec<&str> = normalized.split_whitespace().collect();

    let today = now.date_naive();
    let mut fragments = Fragments::default();
    let mut matched = false;
    let mut i = 0;

    while i < tokens.len() {
        match fragments.step(&tokens, i, today) {
            Step::Matched(consumed) => {
                matched = true;
                i += consumed;
            }
            Step::Skipped => i += 1,
            Step::Invalid => return None,
        }
    }

    if !matched {
        return None;
    }

    fragments.resolve(now)
}

impl Fragments {
    fn step(&mut self, tokens: &[&str], i: usize, today: NaiveDate) -> Step {
        let token = tokens[i];
        let next = tokens.get(i + 1).copied();
        let prev = if i > 0 { tokens.get(i - 1).copied() } else { None };

        match token {
            "now" => {
                self.now = true;
                return Step::Matched(1);
            }
            "today" => {
                self.day_offset = Some(0);
                return Step::Matched(1);
            }
            "tonight" => {
                self.day_offset = Some(0);
                self.implied_time = hm(22, 0);
                return Step::Matched(1);
            }
            "tomorrow" | "tmr" | "tmrw" => {
                self.day_offset = Some(1);
                return Step::Matched(1);
            }
            "yesterday" => {
                self.day_offset = Some(-1);
                return Step::Matched(1);
            }
            "noon" | "midday" => {
                self.time = hm(12, 0);
                return Step::Matched(1);
            }
            "midnight" => {
                self.time = hm(0, 0);
                return Step::Matched(1);
            }
            "morning" => {
                self.implied_time = hm(6, 0);
                return Step::Matched(1);
            }
            "afternoon" => {
                self.implied_time = hm(15, 0);
                return Step::Matched(1);
            }
            "evening" => {
                self.implied_time = hm(20, 0);
                return Step::Matched(1);
            }
            "next" | "this" => {
                let strict = token == "next";
                if let Some(weekday) = next.and_then(parse_weekday) {
                    self.weekday = Some((weekday, strict));
                    return Step::Matched(2);
                }
                if strict && next == Some("week") {
                    self.day_offset = Some(7);
                    return Step::Matched(2);
                }
                return Step::Skipped;
            }
            "in" => {
                let amount = next.and_then(parse_amount);
                let unit = tokens.get(i + 2).copied().and_then(parse_unit);
                if let (Some(amount), Some(unit)) = (amount, unit) {
                    self.relative = Some(unit * amount);
                    return Step::Matched(3);
                }
                return Step::Skipped;
            }
            _ => {}
        }

        if let Some(weekday) = parse_weekday(token) {
            self.weekday = Some((weekday, false));
            return Step::Matched(1);
        }

        // Month first: "june 27", "jun 27th 2026", "june"
        if let Some(month) = parse_month(token) {
            return match next.and_then(parse_day) {
                Some(day) => {
                    let year = tokens.get(i + 2).copied().and_then(parse_year);
                    let consumed = if year.is_some() { 3 } else { 2 };
                    self.set_month_day(month, day, year, today, consumed)
                }
                None => {
                    let year = next.and_then(parse_year);
                    let consumed = if year.is_some() { 2 } else { 1 };
                    match NaiveDate::from_ymd_opt(year.unwrap_or(today.year()), month, 1) {
                        Some(first) => {
                            self.month_only = Some(roll_forward(first, year.is_none(), today));
                            Step::Matched(consumed)
                        }
                        None => Step::Invalid,
                    }
                }
            };
        }

        // Day first: "27 june", "27th of june 2026"
        if let Some(day) = parse_day(token) {
            let (month_at, month) = match (next, tokens.get(i + 2).copied()) {
                (Some("of"), Some(word)) => (i + 2, parse_month(word)),
                (Some(word), _) => (i + 1, parse_month(word)),
                _ => (i, None),
            };
            if let Some(month) = month {
                let year = tokens.get(month_at + 1).copied().and_then(parse_year);
                let consumed = month_at - i + 1 + usize::from(year.is_some());
                return self.set_month_day(month, day, year, today, consumed);
            }
        }

        if token.contains('-') {
            return self.iso_date(token);
        }
        if token.contains('/') {
            return self.slash_date(token, today);
        }
        if token.contains('.') && token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            if let Some(step) = self.dotted(token, next, today) {
                return step;
            }
        }

        self.clock(token, next, prev == Some("at"))
    }

    fn set_month_day(
        &mut self,
        month: u32,
        day: u32,
        year: Option<i32>,
        today: NaiveDate,
        consumed: usize,
    ) -> Step {
        match NaiveDate::from_ymd_opt(year.unwrap_or(today.year()), month, day) {
            Some(date) => {
                self.date = Some(date);
                self.yearless = year.is_none();
                Step::Matched(consumed)
            }
            None => Step::Invalid,
        }
    }

    /// `2026-06-27` or `2026-06-27t15:00`
    fn iso_date(&mut self, token: &str) -> Step {
        let (date_part, time_part) = match token.split_once('t') {
            Some((date, time)) => (date, Some(time)),
            None => (token, None),
        };

        let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            return Step::Skipped;
        };
        self.date = Some(date);

        if let Some(time_part) = time_part {
            match parse_clock_digits(time_part) {
                Some(time) => self.time = Some(time),
                None => return Step::Invalid,
            }
        }
        Step::Matched(1)
    }

    /// `6/27` or `6/27/2026`, month first
    fn slash_date(&mut self, token: &str, today: NaiveDate) -> Step {
        let parts: Vec<&str> = token.split('/').collect();
        let numbers: Option<Vec<i32>> = parts.iter().map(|p| p.parse::<i32>().ok()).collect();
        match numbers.as_deref() {
            Some([month, day]) => self.set_month_day(*month as u32, *day as u32, None, today, 1),
            Some([month, day, year]) => {
                self.set_month_day(*month as u32, *day as u32, Some(*year), today, 1)
            }
            _ => Step::Skipped,
        }
    }

    /// `27.6.`, `27.6.2026` and `27.6` are dates; `15.30` is a time
    fn dotted(&mut self, token: &str, next: Option<&str>, today: NaiveDate) -> Option<Step> {
        let trailing_dot = token.ends_with('.');
        let parts: Vec<&str> = token.trim_end_matches('.').split('.').collect();
        let numbers: Vec<u32> = parts
            .iter()
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;

        match numbers.as_slice() {
            [day, month, _] => match parse_year(parts[2]) {
                Some(year) => Some(self.set_month_day(*month, *day, Some(year), today, 1)),
                None => Some(Step::Invalid),
            },
            [hour, _minute] if !trailing_dot && parts[1].len() == 2 && *hour < 24 => {
                Some(self.clock(&token.replace('.', ":"), next, false))
            }
            [day, month] => Some(self.set_month_day(*month, *day, None, today, 1)),
            _ => None,
        }
    }

    /// `15:00`, `3pm`, `3:30 pm`, and a bare hour after `at`
    fn clock(&mut self, token: &str, next: Option<&str>, after_at: bool) -> Step {
        let (digits, meridiem, consumed) = match split_meridiem(token) {
            Some((digits, meridiem)) => (digits, Some(meridiem), 1),
            None => match next.and_then(meridiem_word) {
                Some(meridiem) => (token, Some(meridiem), 2),
                None => (token, None, 1),
            },
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == ':') {
            return Step::Skipped;
        }
        // A lone number is only an hour when it is clearly meant as one
        if !digits.contains(':') && meridiem.is_none() && !after_at {
            return Step::Skipped;
        }

        let Some(time) = parse_clock_digits(digits) else {
            return Step::Invalid;
        };

        let time = match meridiem {
            Some(pm) => match to_24_hour(time, pm) {
                Some(time) => time,
                None => return Step::Invalid,
            },
            None => time,
        };

        self.bare_hour = meridiem.is_none() && (1..12).contains(&time.hour());
        self.time = Some(time);
        Step::Matched(consumed)
    }

    /// The time of day asked for, if any. A bare hour next to an afternoon or
    /// evening word is read as pm.
    fn time_of_day(&self) -> Option<NaiveTime> {
        match (self.time, self.implied_time) {
            (Some(time), Some(implied)) if self.bare_hour && implied.hour() >= 12 => {
                time.with_hour(time.hour() + 12)
            }
            (time, implied) => time.or(implied),
        }
    }

    fn resolve<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let today = now.date_naive();
        let time_of_day = self.time_of_day();

        // `in 2 days` moves the date; a time given next to it still applies
        if let Some(relative) = self.relative {
            let shifted = now.clone().checked_add_signed(relative)?;
            return match time_of_day {
                Some(time) => local(now, shifted.date_naive(), time),
                None => Some(shifted),
            };
        }

        let date = if let Some(date) = self.date {
            roll_forward(date, self.yearless, today)
        } else if let Some(offset) = self.day_offset {
            today.checked_add_signed(Duration::days(offset))?
        } else if let Some((weekday, strict)) = self.weekday {
            next_weekday(today, weekday, strict)
        } else if let Some(first) = self.month_only {
            first
        } else {
            today
        };

        // Casual day words keep the current clock time; explicit dates default to noon
        let keeps_clock = self.now || (self.day_offset.is_some() && self.date.is_none());
        let time = time_of_day
            .or(if keeps_clock { Some(now.time()) } else { None })
            .or_else(|| hm(DEFAULT_HOUR, 0))?;

        local(now, date, time)
    }
}

fn local<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    now.timezone()
        .from_local_datetime(&date.and_time(time))
        .earliest()
}

/// A yearless date already behind us means the same day next year
fn roll_forward(date: NaiveDate, yearless: bool, today: NaiveDate) -> NaiveDate {
    if yearless && date < today {
        date.with_year(date.year() + 1).unwrap_or(date)
    } else {
        date
    }
}

fn hm(hour: u32, minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Next occurrence of `weekday`, today included unless `strict`
fn next_weekday(today: NaiveDate, weekday: Weekday, strict: bool) -> NaiveDate {
    let mut days_ahead = (weekday.num_days_from_monday() + 7
        - today.weekday().num_days_from_monday())
        % 7;
    if days_ahead == 0 && strict {
        days_ahead = 7;
    }
    today + Duration::days(days_ahead as i64)
}

fn parse_weekday(word: &str) -> Option<Weekday> {
    match word {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "weds" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_month(word: &str) -> Option<u32> {
    let word = word.trim_end_matches('.');
    let month = match word {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Day of month, with an optional ordinal suffix (`27`, `27th`, `1st`)
fn parse_day(word: &str) -> Option<u32> {
    let word = word.trim_end_matches('.');
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .unwrap_or(word);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    digits.parse::<u32>().ok().filter(|day| (1..=31).contains(day))
}

fn parse_year(word: &str) -> Option<i32> {
    if word.len() != 4 {
        return None;
    }
    word.parse::<i32>().ok().filter(|year| (1970..=2100).contains(year))
}

fn parse_amount(word: &str) -> Option<i32> {
    match word {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        _ => word.parse::<i32>().ok().filter(|n| *n >= 0),
    }
}

fn parse_unit(word: &str) -> Option<Duration> {
    match word {
        "min" | "mins" | "minute" | "minutes" => Some(Duration::minutes(1)),
        "h" | "hr" | "hrs" | "hour" | "hours" => Some(Duration::hours(1)),
        "day" | "days" => Some(Duration::days(1)),
        "week" | "weeks" => Some(Duration::weeks(1)),
        _ => None,
    }
}

fn meridiem_word(word: &str) -> Option<bool> {
    match word {
        "am" | "a.m." => Some(false),
        "pm" | "p.m." => Some(true),
        _ => None,
    }
}

/// Split `3pm` into (`3`, true)
fn split_meridiem(token: &str) -> Option<(&str, bool)> {
    for (suffix, pm) in [("a.m.", false), ("p.m.", true), ("am", false), ("pm", true)] {
        if let Some(digits) = token.strip_suffix(suffix) {
            return Some((digits, pm));
        }
    }
    None
}

/// `15`, `15:00` or `15:00:30`
fn parse_clock_digits(digits: &str) -> Option<NaiveTime> {
    let parts: Vec<u32> = digits
        .split(':')
        .map(|p| if p.len() <= 2 { p.parse::<u32>().ok() } else { None })
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [hour] => NaiveTime::from_hms_opt(*hour, 0, 0),
        [hour, minute] => NaiveTime::from_hms_opt(*hour, *minute, 0),
        [hour, minute, second] => NaiveTime::from_hms_opt(*hour, *minute, *second),
        _ => None,
    }
}

fn to_24_hour(time: NaiveTime, pm: bool) -> Option<NaiveTime> {
    let hour = time.hour();
    if hour == 0 || hour > 12 {
        return None;
    }
    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };
    time.with_hour(hour)
}
