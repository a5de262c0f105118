//! Progress milestones for import jobs.

/// Upper bound reached when every row is prepared.
pub const PREPARED: u8 = 85;
/// After new products are inserted.
pub const INSERTED: u8 = 87;
/// After existing products are updated.
pub const UPDATED: u8 = 89;
/// After images are written and uploaded.
pub const IMAGES_DONE: u8 = 90;
/// Highest value reported before the job completes.
pub const DELETE_END: u8 = 99;

/// Scales `done / total` onto `from..=to`.
fn scale(done: usize, total: usize, from: u8, to: u8) -> u8 {
    if total == 0 {
        return to;
    }
    let span = usize::from(to - from);
    let step = done.min(total) * span / total;
    from + u8::try_from(step).unwrap_or(to - from)
}

/// Progress while rows are being prepared, 0 to 85.
#[must_use]
pub fn preparing(done: usize, total: usize) -> u8 {
    scale(done, total, 0, PREPARED)
}

/// Progress during delete-missing, 90 to 99.
#[must_use]
pub fn deleting(done: usize, total: usize) -> u8 {
    scale(done, total, IMAGES_DONE, DELETE_END)
}
