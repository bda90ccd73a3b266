//! Leading-records extraction: the pipeline behind `hephead`.
//!
//! Each of the first `n` records is pulled through the seeker, composed
//! as its own signal event (no overlay) and written out.

use std::path::Path;

use tracing::{debug, info};

use crate::composer::{ComposeError, EventComposer};
use crate::io::{AsciiWriter, EventWriter, RecordError};
use crate::policy::AttributePolicy;
use crate::seeker::{EventSeeker, SeekerError};

/// Error type for the extraction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum HeadError {
    /// Reading the input failed.
    #[error(transparent)]
    Seeker(#[from] SeekerError),
    /// Composing a record failed.
    #[error(transparent)]
    Compose(#[from] ComposeError),
    /// Writing the output failed.
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Summary of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadSummary {
    /// Records in the input.
    pub total: usize,
    /// Records written.
    pub written: usize,
    /// Particles written without their production edge.
    pub unattached_production: usize,
    /// Particles written without their end edge.
    pub unattached_end: usize,
}

/// Write the first `min(n, total)` records of `input` to `output`.
///
/// The input's run information is copied to the output header. The run
/// stops at the first error; records already written stay in `output`.
pub fn write_head(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    n: usize,
    policy: &AttributePolicy,
) -> Result<HeadSummary, HeadError> {
    let mut seeker = EventSeeker::open(input)?;
    let total = seeker.total_count();
    let count = n.min(total);
    info!(
        input = %seeker.path().display(),
        total,
        requested = n,
        count,
        policy = policy.policy_id(),
        policy_fingerprint = %policy.fingerprint(),
        "extracting leading records"
    );

    let mut writer = AsciiWriter::create(output)?.with_run_info(seeker.run_info()?);
    let mut summary = HeadSummary {
        total,
        ..HeadSummary::default()
    };

    for _ in 0..count {
        let signal = seeker.fetch_next()?;
        let composer = EventComposer::with_policy(&signal, policy.clone())?;
        summary.unattached_production += composer.unattached_production();
        summary.unattached_end += composer.unattached_end();

        writer.write_event(composer.event())?;
        summary.written += 1;
        debug!(event_number = signal.event_number(), "record written");
    }
    writer.close()?;

    Ok(summary)
}
