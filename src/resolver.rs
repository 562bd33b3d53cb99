// Angle-to-category resolution. Pure functions of (angle, slice count): the
// pointer is fixed at 0° and the wheel turns underneath it.
//
// Boundary rule: a pointer angle exactly on a slice boundary belongs to the slice
// that starts there (floor semantics), i.e. ranges are `[start, start + slice)`.

use crate::error::WheelError;
use crate::types::{Category, CategoryId, Degrees, SessionId, FULL_TURN};

/// Wheel angle sitting under the pointer after rotating by `angle`, in `[0, 360)`.
pub fn pointer_angle(angle: Degrees) -> f64 {
    (FULL_TURN - angle.normalized()) % FULL_TURN
}

/// Index of the slice under the pointer. `None` for an empty wheel or a
/// non-finite angle.
pub fn resolve_index(angle: Degrees, slice_count: usize) -> Option<usize> {
    if slice_count == 0 || !angle.as_f64().is_finite() {
        return None;
    }
    let slice = FULL_TURN / slice_count as f64;
    let segment = (pointer_angle(angle) / slice).floor() as usize;
    Some(segment % slice_count)
}

/// Category under the pointer after rotating the wheel by `angle`.
pub fn resolve_category(angle: Degrees, categories: &[Category]) -> Option<&Category> {
    resolve_index(angle, categories.len()).map(|index| &categories[index])
}

/// Confirm a committed landing: the category under `angle` must be `expected`.
pub fn verify_landing<'a>(
    session: SessionId,
    angle: Degrees,
    categories: &'a [Category],
    expected: CategoryId,
) -> Result<&'a Category, WheelError> {
    let resolved = resolve_category(angle, categories).ok_or(WheelError::UnknownCategory(expected))?;
    if resolved.id != expected {
        return Err(WheelError::InvariantViolation {
            session,
            expected,
            resolved: resolved.id,
            angle,
        });
    }
    Ok(resolved)
}
