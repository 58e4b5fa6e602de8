//! Card number type and the first-available allocator.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A card's unique positive number.
///
/// Numbers are reused after deletions: allocation fills the lowest hole in the
/// sequence rather than growing forever, so a fleet of physical cards keeps a
/// compact numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardNumber(i32);

impl CardNumber {
    /// Create a card number. Returns `None` unless the value is positive.
    #[must_use]
    pub const fn new(n: i32) -> Option<Self> {
        if n >= 1 { Some(Self(n)) } else { None }
    }

    /// Get the underlying i32 value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// The smallest positive number not present in `existing`.
    ///
    /// Duplicates and non-positive values in the input are ignored. The scan
    /// sorts the set ascending and returns the first gap; with no gap, one
    /// past the maximum.
    #[must_use]
    pub fn first_available(existing: &[Self]) -> Self {
        let mut numbers: Vec<i32> = existing.iter().map(|n| n.0).collect();
        numbers.sort_unstable();
        numbers.dedup();

        let mut next = 1;
        for n in numbers {
            if n > next {
                break;
            }
            if n == next {
                next += 1;
            }
        }

        Self(next)
    }
}

impl fmt::Display for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CardNumber> for i32 {
    fn from(n: CardNumber) -> Self {
        n.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CardNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CardNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let n = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are constrained positive by the schema
        Ok(Self(n))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CardNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn numbers(ns: &[i32]) -> Vec<CardNumber> {
        ns.iter().map(|&n| CardNumber::new(n).unwrap()).collect()
    }

    #[test]
    fn test_new_rejects_non_positive() {
        assert!(CardNumber::new(0).is_none());
        assert!(CardNumber::new(-3).is_none());
        assert_eq!(CardNumber::new(1).unwrap().as_i32(), 1);
    }

    #[test]
    fn test_empty_set_starts_at_one() {
        assert_eq!(CardNumber::first_available(&[]).as_i32(), 1);
    }

    #[test]
    fn test_contiguous_set_extends() {
        assert_eq!(CardNumber::first_available(&numbers(&[1, 2, 3])).as_i32(), 4);
    }

    #[test]
    fn test_gap_is_filled() {
        assert_eq!(CardNumber::first_available(&numbers(&[1, 3])).as_i32(), 2);
    }

    #[test]
    fn test_missing_one_is_filled_first() {
        assert_eq!(CardNumber::first_available(&numbers(&[2, 3])).as_i32(), 1);
    }

    #[test]
    fn test_unordered_input() {
        assert_eq!(
            CardNumber::first_available(&numbers(&[7, 1, 4, 2, 3])).as_i32(),
            5
        );
    }

    #[test]
    fn test_duplicates_ignored() {
        assert_eq!(
            CardNumber::first_available(&numbers(&[1, 1, 2, 2])).as_i32(),
            3
        );
    }
}
