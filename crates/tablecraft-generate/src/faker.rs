use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use fake::Fake;
use fake::faker::chrono::en::DateTimeBetween;
use rand::RngCore;

/// Source of random calendar values.
///
/// The engine only relies on this contract; the default implementation is
/// backed by the `fake` crate.
pub trait FakeDataProvider {
    /// Random date within `[start, end)`.
    fn random_date(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rng: &mut dyn RngCore,
    ) -> NaiveDate;

    /// Random date-time within `[start, end)`, whole seconds.
    fn random_date_time(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rng: &mut dyn RngCore,
    ) -> NaiveDateTime;
}

/// `fake`-backed provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct FakerProvider;

impl FakeDataProvider for FakerProvider {
    fn random_date(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rng: &mut dyn RngCore,
    ) -> NaiveDate {
        self.random_date_time(start, end, rng).date()
    }

    fn random_date_time(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        rng: &mut dyn RngCore,
    ) -> NaiveDateTime {
        if start >= end {
            return start;
        }
        let value: DateTime<Utc> =
            DateTimeBetween(start.and_utc(), end.and_utc()).fake_with_rng(rng);
        let naive = value.naive_utc();
        naive.with_nanosecond(0).unwrap_or(naive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    #[test]
    fn values_fall_inside_the_window() {
        let provider = FakerProvider;
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (start, end) = (at(2023, 1, 1), at(2024, 1, 1));
        for _ in 0..200 {
            let value = provider.random_date_time(start, end, &mut rng);
            assert!(value >= start && value <= end, "{value} out of window");
            let date = provider.random_date(start, end, &mut rng);
            assert!(date >= start.date() && date <= end.date(), "{date} out of window");
        }
    }

    #[test]
    fn same_seed_same_values() {
        let provider = FakerProvider;
        let (start, end) = (at(2023, 1, 1), at(2024, 1, 1));
        let mut a = ChaCha8Rng::seed_from_u64(3);
        let mut b = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..10 {
            assert_eq!(
                provider.random_date_time(start, end, &mut a),
                provider.random_date_time(start, end, &mut b)
            );
        }
    }
}
