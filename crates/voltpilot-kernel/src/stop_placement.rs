//! Stop placement – where on the current lane a charging stop can go.
//!
//! A stop is placed [`FORWARD_CLEARANCE`] ahead of the vehicle but never
//! closer than [`TRAILING_MARGIN`] to the end of the lane.  When the lane
//! ahead is shorter than both margins together the stop is unsafe and no
//! offset is produced; the caller retries on a later step.

use thiserror::Error;

/// Minimum distance between the vehicle and its stop position.
pub const FORWARD_CLEARANCE: f64 = 2.0;

/// Minimum distance between the stop position and the end of the lane.
pub const TRAILING_MARGIN: f64 = 1.0;

/// Lane length that must remain ahead of the vehicle for a safe stop.
pub const MIN_REMAINING_LANE: f64 = FORWARD_CLEARANCE + TRAILING_MARGIN;

/// Not enough lane left ahead of the vehicle to stop safely.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("only {remaining:.2} of lane left, {required:.2} required")]
pub struct UnsafeStop {
    pub remaining: f64,
    pub required: f64,
}

/// Compute the in-lane stop offset for a vehicle at `position` on a lane of
/// `lane_length`.
///
/// The safety guard runs before the offset is computed: a remaining lane of
/// exactly [`MIN_REMAINING_LANE`] is still safe.
///
/// # Example
///
/// ```
/// use voltpilot_kernel::stop_placement::compute_stop_offset;
///
/// assert_eq!(compute_stop_offset(5.0, 10.0), Ok(7.0));
/// assert!(compute_stop_offset(8.0, 10.0).is_err());
/// ```
pub fn compute_stop_offset(position: f64, lane_length: f64) -> Result<f64, UnsafeStop> {
    let remaining = lane_length - position;
    if remaining.is_nan() || remaining < MIN_REMAINING_LANE {
        return Err(UnsafeStop {
            remaining,
            required: MIN_REMAINING_LANE,
        });
    }
    Ok((position + FORWARD_CLEARANCE).min(lane_length - TRAILING_MARGIN))
}
