// Winner selection. Weight is an eligibility gate only: weight-1 items are reserved
// and never picked while anything else is on the wheel; the rest are uniform.

use crate::rng::RandomSource;
use crate::types::Category;

/// Categories the default selector may pick, with their wheel indices.
/// Falls back to the whole list when every category is reserved.
pub fn eligible(categories: &[Category]) -> Vec<(usize, &Category)> {
    let gated: Vec<(usize, &Category)> = categories
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_eligible())
        .collect();

    if gated.is_empty() {
        categories.iter().enumerate().collect()
    } else {
        gated
    }
}

/// Pick the target category uniformly from the eligible set.
/// Returns the wheel index alongside the category; `None` only for an empty list.
pub fn select_winner<'a, R>(categories: &'a [Category], rng: &mut R) -> Option<(usize, &'a Category)>
where
    R: RandomSource + ?Sized,
{
    let pool = eligible(categories);
    if pool.is_empty() {
        return None;
    }
    Some(pool[rng.next_index(pool.len())])
}
