use crate::{
    error::Error,
    repository::{ObservationFilter, Store},
};

/// Truncated mean of the boarding counts, `None` when there are none.
pub fn average_boarding<I>(counts: I) -> Option<u32>
where
    I: IntoIterator<Item = u32>,
{
    let (sum, n) = counts
        .into_iter()
        .fold((0u64, 0u64), |(sum, n), count| (sum + u64::from(count), n + 1));
    (n > 0).then(|| (sum / n) as u32)
}

/// Average boarding count observed for `trip_id` at `stop_id`.
pub fn historical_average<S>(store: &S, trip_id: &str, stop_id: &str) -> Result<Option<u32>, Error>
where
    S: Store + ?Sized,
{
    let observations = store.observations(&ObservationFilter::trip_stop(trip_id, stop_id))?;
    Ok(average_boarding(
        observations.iter().map(|observation| observation.boarding_count),
    ))
}
