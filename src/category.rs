// Category model validation. A face is checked once, before a spin starts;
// the machine never spins a face that failed here.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{Category, WheelFace};

/// Fewest categories a spinnable face may have.
pub const MIN_CATEGORIES: usize = 2;
pub const MIN_WEIGHT: u32 = 1;
pub const MAX_WEIGHT: u32 = 100;
/// Weight reserved for grand-prize items the default selector never picks.
pub const RESERVED_WEIGHT: u32 = 1;
pub const MAX_NAME_CHARS: usize = 50;

impl Category {
    /// Check one category. `index` is only used for the error message.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { index });
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong {
                index,
                max: MAX_NAME_CHARS,
            });
        }
        if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&self.weight) {
            return Err(ValidationError::WeightOutOfRange {
                index,
                weight: self.weight,
                min: MIN_WEIGHT,
                max: MAX_WEIGHT,
            });
        }
        Ok(())
    }

    /// Eligible for the default selector.
    pub fn is_eligible(&self) -> bool {
        self.weight > RESERVED_WEIGHT
    }
}

impl WheelFace {
    /// Check the face can be spun: between `MIN_CATEGORIES` and `max_categories`
    /// entries, each valid, ids unique.
    pub fn validate(&self, max_categories: usize) -> Result<(), ValidationError> {
        let found = self.categories.len();
        if found < MIN_CATEGORIES {
            return Err(ValidationError::TooFewCategories {
                min: MIN_CATEGORIES,
                found,
            });
        }
        if found > max_categories {
            return Err(ValidationError::TooManyCategories {
                max: max_categories,
                found,
            });
        }

        let mut seen = HashSet::with_capacity(found);
        for (index, category) in self.categories.iter().enumerate() {
            category.validate(index)?;
            if !seen.insert(category.id) {
                return Err(ValidationError::DuplicateId {
                    index,
                    id: category.id,
                });
            }
        }
        Ok(())
    }
}
