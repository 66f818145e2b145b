use embassy_time::{Duration, Instant};

/// Blocks until a condition becomes false or a timeout is reached.
///
/// A zero timeout still evaluates the condition once.
#[inline]
pub(crate) fn blocking_wait_timeout<F>(mut condition: F, timeout: Duration) -> Result<(), ()>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();

    while condition() {
        if start.elapsed() > timeout {
            return Err(());
        }
        core::hint::spin_loop();
    }

    Ok(())
}
