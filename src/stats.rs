use crate::live::LiveSession;
use crate::models::{ArcSpan, Bucket, Subject, SubjectShare, SubjectTotal};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;

const DAY_COUNT: i64 = 7;
const WEEK_COUNT: i64 = 4;
const MONTH_COUNT: u32 = 6;

#[derive(Debug, Clone, Default)]
pub struct Overview {
    pub shares: Vec<SubjectShare>,
    pub arcs: Vec<ArcSpan>,
    pub total_seconds: u64,
    pub daily: Vec<Bucket>,
    pub weekly: Vec<Bucket>,
    pub monthly: Vec<Bucket>,
}

pub fn build_overview_at<Tz: TimeZone>(
    now: &DateTime<Tz>,
    subjects: &[Subject],
    sessions: &[LiveSession],
) -> Overview {
    let shares = percentage_shares(&subject_totals(subjects, sessions));
    let arcs = arc_layout(&shares);

    Overview {
        total_seconds: sessions.iter().map(|live| live.displayed_seconds).sum(),
        daily: daily_buckets(now, sessions),
        weekly: weekly_buckets(now, sessions),
        monthly: monthly_buckets(now, sessions),
        shares,
        arcs,
    }
}

pub fn subject_totals(subjects: &[Subject], sessions: &[LiveSession]) -> Vec<SubjectTotal> {
    let mut by_subject: HashMap<_, u64> = HashMap::new();
    for live in sessions {
        let entry = by_subject.entry(live.session.subject_id).or_default();
        *entry = entry.saturating_add(live.displayed_seconds);
    }

    subjects
        .iter()
        .map(|subject| SubjectTotal {
            subject_id: subject.id,
            total_seconds: by_subject.get(&subject.id).copied().unwrap_or(0),
        })
        .collect()
}

pub fn percentage_shares(totals: &[SubjectTotal]) -> Vec<SubjectShare> {
    let grand_total: u64 = totals.iter().map(|total| total.total_seconds).sum();

    totals
        .iter()
        .map(|total| SubjectShare {
            subject_id: total.subject_id,
            total_seconds: total.total_seconds,
            percentage: if grand_total == 0 {
                0.0
            } else {
                total.total_seconds as f64 / grand_total as f64 * 100.0
            },
        })
        .collect()
}

/// One span per share, in order. Subjects with no time get a zero-width
/// span for renderers to skip.
pub fn arc_layout(shares: &[SubjectShare]) -> Vec<ArcSpan> {
    let mut start_deg = 0.0;
    shares
        .iter()
        .map(|share| {
            let sweep_deg = share.percentage / 100.0 * 360.0;
            let arc = ArcSpan {
                subject_id: share.subject_id,
                start_deg,
                sweep_deg,
            };
            start_deg += sweep_deg;
            arc
        })
        .collect()
}

// A session lands in the bucket holding its start time with its full current
// duration, even when it runs past the end of that bucket.

pub fn daily_buckets<Tz: TimeZone>(now: &DateTime<Tz>, sessions: &[LiveSession]) -> Vec<Bucket> {
    let today = now.date_naive();
    let windows = (0..DAY_COUNT)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            Window {
                label: date.format("%a %-m/%-d").to_string(),
                first: date,
                next: date + Duration::days(1),
            }
        })
        .collect();

    fill_buckets(&now.timezone(), windows, sessions)
}

pub fn weekly_buckets<Tz: TimeZone>(now: &DateTime<Tz>, sessions: &[LiveSession]) -> Vec<Bucket> {
    let today = now.date_naive();
    let windows = (0..WEEK_COUNT)
        .rev()
        .map(|offset| {
            let last = today - Duration::weeks(offset);
            let first = last - Duration::days(6);
            Window {
                label: format!("{}-{}", first.format("%-m/%-d"), last.format("%-m/%-d")),
                first,
                next: last + Duration::days(1),
            }
        })
        .collect();

    fill_buckets(&now.timezone(), windows, sessions)
}

pub fn monthly_buckets<Tz: TimeZone>(now: &DateTime<Tz>, sessions: &[LiveSession]) -> Vec<Bucket> {
    let today = now.date_naive();
    let this_month = today.with_day(1).unwrap_or(today);
    let windows = (0..MONTH_COUNT)
        .rev()
        .filter_map(|offset| {
            let first = this_month.checked_sub_months(Months::new(offset))?;
            let next = first.checked_add_months(Months::new(1))?;
            Some(Window {
                label: first.format("%b").to_string(),
                first,
                next,
            })
        })
        .collect();

    fill_buckets(&now.timezone(), windows, sessions)
}

struct Window {
    label: String,
    first: NaiveDate,
    next: NaiveDate,
}

fn fill_buckets<Tz: TimeZone>(
    tz: &Tz,
    windows: Vec<Window>,
    sessions: &[LiveSession],
) -> Vec<Bucket> {
    windows
        .into_iter()
        .map(|window| {
            let start = start_of_day(tz, window.first);
            let end = start_of_day(tz, window.next);
            let total_seconds = sessions
                .iter()
                .filter(|live| {
                    live.session
                        .start_time
                        .is_some_and(|started| started >= start && started < end)
                })
                .fold(0u64, |sum, live| sum.saturating_add(live.displayed_seconds));

            Bucket {
                label: window.label,
                start_date: window.first.to_string(),
                end_date: (window.next - Duration::days(1)).to_string(),
                total_seconds,
            }
        })
        .collect()
}

/// First instant of `date` in `tz`. When a DST gap swallows midnight the day
/// starts at the first whole local hour that exists.
fn start_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use chrono::{FixedOffset, LocalResult, NaiveDateTime, Timelike};

    /// +05:00 everywhere, except that local clocks jump straight from 23:59
    /// to 01:00.
    #[derive(Debug, Clone, Copy)]
    struct SkipsMidnight;

    fn plus_five() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600).unwrap()
    }

    impl TimeZone for SkipsMidnight {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SkipsMidnight
        }

        fn offset_from_local_date(&self, _local: &NaiveDate) -> LocalResult<FixedOffset> {
            LocalResult::Single(plus_five())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if local.hour() == 0 {
                LocalResult::None
            } else {
                LocalResult::Single(plus_five())
            }
        }

        fn offset_from_utc_date(&self, _utc: &NaiveDate) -> FixedOffset {
            plus_five()
        }

        fn offset_from_utc_datetime(&self, _utc: &NaiveDateTime) -> FixedOffset {
            plus_five()
        }
    }

    fn live(id: i64, subject_id: i64, start: Option<DateTime<Utc>>, seconds: u64) -> LiveSession {
        LiveSession {
            session: Session {
                id,
                subject_id,
                start_time: start,
                end_time: None,
                running: false,
                time_allotted: seconds,
            },
            displayed_seconds: seconds,
            fault: None,
        }
    }

    fn subject(id: i64, name: &str) -> Subject {
        Subject {
            id,
            name: name.to_string(),
            description: None,
            user_id: Some(1),
            number_of_sessions: 0,
            time_allotted: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap()
    }

    #[test]
    fn shares_and_arcs_for_two_subjects() {
        let subjects = vec![subject(1, "a"), subject(2, "b")];
        let sessions = vec![
            live(1, 1, Some(now()), 200),
            live(2, 1, Some(now()), 100),
            live(3, 2, Some(now()), 100),
        ];

        let totals = subject_totals(&subjects, &sessions);
        assert_eq!(totals[0].total_seconds, 300);
        assert_eq!(totals[1].total_seconds, 100);

        let shares = percentage_shares(&totals);
        assert_eq!(shares[0].percentage, 75.0);
        assert_eq!(shares[1].percentage, 25.0);

        let arcs = arc_layout(&shares);
        assert_eq!(arcs.len(), 2);
        assert_eq!((arcs[0].start_deg, arcs[0].sweep_deg), (0.0, 270.0));
        assert_eq!((arcs[1].start_deg, arcs[1].sweep_deg), (270.0, 90.0));
    }

    #[test]
    fn zero_grand_total_gives_zero_shares() {
        let subjects = vec![subject(1, "a"), subject(2, "b")];
        let shares = percentage_shares(&subject_totals(&subjects, &[]));
        assert!(shares.iter().all(|share| share.percentage == 0.0));
        let arcs = arc_layout(&shares);
        assert_eq!(arcs.len(), 2);
        assert!(arcs.iter().all(|arc| arc.sweep_deg == 0.0 && arc.start_deg == 0.0));
    }

    #[test]
    fn zero_share_in_the_middle_keeps_its_slot() {
        let subjects = vec![subject(1, "a"), subject(2, "b"), subject(3, "c")];
        let sessions = vec![live(1, 1, None, 90), live(2, 3, None, 270)];
        let arcs = arc_layout(&percentage_shares(&subject_totals(&subjects, &sessions)));

        let ids: Vec<_> = arcs.iter().map(|arc| arc.subject_id).collect();
        assert_eq!(ids, [1, 2, 3]);
        assert_eq!((arcs[1].start_deg, arcs[1].sweep_deg), (90.0, 0.0));
        assert_eq!((arcs[2].start_deg, arcs[2].sweep_deg), (90.0, 270.0));
    }

    #[test]
    fn shares_sum_to_one_hundred() {
        let subjects: Vec<_> = (1..=7).map(|id| subject(id, "s")).collect();
        let sessions: Vec<_> = (1..=7).map(|id| live(id, id, None, id as u64 * 37)).collect();
        let sum: f64 = percentage_shares(&subject_totals(&subjects, &sessions))
            .iter()
            .map(|share| share.percentage)
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn daily_bucket_takes_todays_session() {
        let today_ten = Utc.with_ymd_and_hms(2026, 3, 10, 10, 0, 0).unwrap();
        let buckets = daily_buckets(&now(), &[live(1, 1, Some(today_ten), 600)]);

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[6].total_seconds, 600);
        assert_eq!(buckets[6].start_date, "2026-03-10");
        assert_eq!(buckets[6].label, "Tue 3/10");
        assert!(buckets[..6].iter().all(|bucket| bucket.total_seconds == 0));
    }

    #[test]
    fn daily_boundaries_follow_the_local_calendar() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let local_now = now().with_timezone(&tz);
        // 23:30 UTC on the 9th is 01:30 on the 10th at +02:00
        let late = Utc.with_ymd_and_hms(2026, 3, 9, 23, 30, 0).unwrap();
        let buckets = daily_buckets(&local_now, &[live(1, 1, Some(late), 60)]);
        assert_eq!(buckets[6].total_seconds, 60);
        assert_eq!(buckets[5].total_seconds, 0);
    }

    #[test]
    fn day_without_a_midnight_starts_at_the_first_valid_hour() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        // 01:00 at +05:00
        let expected = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        assert_eq!(start_of_day(&SkipsMidnight, date), expected);

        let local_now = now().with_timezone(&SkipsMidnight);
        let just_before = Utc.with_ymd_and_hms(2026, 3, 9, 19, 59, 0).unwrap();
        let just_after = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        let buckets = daily_buckets(
            &local_now,
            &[live(1, 1, Some(just_before), 5), live(2, 1, Some(just_after), 7)],
        );
        assert_eq!(buckets[5].total_seconds, 5);
        assert_eq!(buckets[6].total_seconds, 7);
    }

    #[test]
    fn weekly_buckets_end_today() {
        let eight_days_ago = now() - Duration::days(8);
        let buckets = weekly_buckets(&now(), &[live(1, 1, Some(eight_days_ago), 120)]);

        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[3].end_date, "2026-03-10");
        assert_eq!(buckets[3].start_date, "2026-03-04");
        assert_eq!(buckets[3].label, "3/4-3/10");
        assert_eq!(buckets[2].total_seconds, 120);
        assert_eq!(buckets[0].start_date, "2026-02-11");
    }

    #[test]
    fn monthly_buckets_use_calendar_months() {
        let feb_end = Utc.with_ymd_and_hms(2026, 2, 28, 23, 0, 0).unwrap();
        let mar_start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let buckets = monthly_buckets(
            &now(),
            &[live(1, 1, Some(feb_end), 50), live(2, 1, Some(mar_start), 70)],
        );

        let labels: Vec<_> = buckets.iter().map(|bucket| bucket.label.as_str()).collect();
        assert_eq!(labels, ["Oct", "Nov", "Dec", "Jan", "Feb", "Mar"]);
        assert_eq!(buckets[4].end_date, "2026-02-28");
        assert_eq!(buckets[4].total_seconds, 50);
        assert_eq!(buckets[5].total_seconds, 70);
    }

    #[test]
    fn buckets_are_disjoint_and_total() {
        let sessions: Vec<_> = (0..40)
            .map(|i| live(i, 1, Some(now() - Duration::hours(i * 13)), 10 + i as u64))
            .chain(std::iter::once(live(99, 1, None, 1000)))
            .collect();

        for buckets in [
            daily_buckets(&now(), &sessions),
            weekly_buckets(&now(), &sessions),
            monthly_buckets(&now(), &sessions),
        ] {
            let window_start = start_of_day(&Utc, buckets[0].start_date.parse().unwrap());
            let expected: u64 = sessions
                .iter()
                .filter(|live| live.session.start_time.is_some_and(|s| s >= window_start))
                .map(|live| live.displayed_seconds)
                .sum();
            let actual: u64 = buckets.iter().map(|bucket| bucket.total_seconds).sum();
            assert_eq!(actual, expected);
        }
    }

    #[test]
    fn overview_totals_every_session() {
        let subjects = vec![subject(1, "a")];
        let sessions = vec![live(1, 1, Some(now()), 30), live(2, 42, Some(now()), 12)];
        let overview = build_overview_at(&now(), &subjects, &sessions);
        assert_eq!(overview.total_seconds, 42);
        assert_eq!(overview.shares[0].total_seconds, 30);
        assert_eq!(overview.arcs.len(), 1);
        assert_eq!(overview.shares[0].percentage, 100.0);
        assert_eq!(overview.daily.len(), 7);
        assert_eq!(overview.weekly.len(), 4);
        assert_eq!(overview.monthly.len(), 6);
    }
}
