//! Human-facing five digit reference numbers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use tracing::{debug, warn};

use super::error::MeetingRequestsError;

pub const MAX_REFERENCE_ATTEMPTS: usize = 10;

pub fn generate_reference_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:05}", rng.gen_range(0..100_000u32))
}

/// Draws random candidates and hands the first free one to `write`.
///
/// `is_taken` is only a pre-check: a concurrent writer can still claim the
/// same number before `write` commits. `write` reports that as
/// [`MeetingRequestsError::ReferenceTaken`] and the next candidate is tried.
/// After [`MAX_REFERENCE_ATTEMPTS`] candidates the row is written with no
/// reference number.
pub async fn save_with_reference_number<T, C, CFut, W, WFut>(
    mut is_taken: C,
    mut write: W,
) -> Result<T, MeetingRequestsError>
where
    C: FnMut(String) -> CFut,
    CFut: Future<Output = Result<bool, MeetingRequestsError>>,
    W: FnMut(Option<String>) -> WFut,
    WFut: Future<Output = Result<T, MeetingRequestsError>>,
{
    let mut rng = StdRng::from_entropy();
    for _ in 0..MAX_REFERENCE_ATTEMPTS {
        let candidate = generate_reference_number(&mut rng);
        if is_taken(candidate.clone()).await? {
            continue;
        }
        match write(Some(candidate.clone())).await {
            Err(MeetingRequestsError::ReferenceTaken(_)) => {
                debug!("Reference number {candidate} was claimed concurrently, retrying");
            }
            other => return other,
        }
    }
    warn!("No free reference number after {MAX_REFERENCE_ATTEMPTS} attempts");
    write(None).await
}
