//! Merging of one book side with a delta for that side.
//!
//! Both inputs are already sorted in the side's direction, so a single
//! two-cursor pass produces the merged side in O(n + m) without ever
//! re-sorting:
//!
//! ```text
//! old:   100 ─ 101 ─ 103
//! delta:  100(0) ─ 102(4)
//! out:   101 ─ 102(4) ─ 103
//! ```

use std::cmp::Ordering;

use crate::types::PriceLevel;

/// Ordering rule of one book side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Lowest price first (asks)
    Ascending,
    /// Highest price first (bids)
    Descending,
}

impl SortDirection {
    /// Compare two levels by price under this direction.
    ///
    /// `Less` means `a` sorts before `b`.
    #[inline]
    pub fn compare(self, a: &PriceLevel, b: &PriceLevel) -> Ordering {
        match self {
            SortDirection::Ascending => a.price.cmp(&b.price),
            SortDirection::Descending => b.price.cmp(&a.price),
        }
    }
}

/// Merge a delta into the previous levels of one side.
///
/// - A delta level at a price already present replaces it, or removes it
///   when its size is zero.
/// - A delta level at a new price is inserted in order, unless its size is
///   zero.
/// - Old levels at prices the delta does not mention are kept unchanged.
///
/// Prices are compared by decimal value, so `"1.50"` matches `"1.5"`.
///
/// Both `old` and `delta` must already be sorted in `direction` with unique
/// prices; unsorted input is not detected and yields an unspecified order.
#[must_use]
pub fn merge_side(
    old: &[PriceLevel],
    delta: &[PriceLevel],
    direction: SortDirection,
) -> Vec<PriceLevel> {
    let mut merged = Vec::with_capacity(old.len() + delta.len());
    let mut i = 0;
    let mut j = 0;

    while i < old.len() && j < delta.len() {
        let (current, change) = (&old[i], &delta[j]);
        match direction.compare(current, change) {
            Ordering::Equal => {
                if !change.is_removal() {
                    merged.push(change.clone());
                }
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                merged.push(current.clone());
                i += 1;
            }
            Ordering::Greater => {
                if !change.is_removal() {
                    merged.push(change.clone());
                }
                j += 1;
            }
        }
    }

    merged.extend_from_slice(&old[i..]);
    merged.extend(delta[j..].iter().filter(|l| !l.is_removal()).cloned());

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn lvl(price: Decimal, size: Decimal) -> PriceLevel {
        PriceLevel::new(price, size)
    }

    #[test]
    fn test_equal_price_override() {
        let old = vec![lvl(dec!(100), dec!(1))];
        let delta = vec![lvl(dec!(100), dec!(2))];

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert_eq!(merged, vec![lvl(dec!(100), dec!(2))]);
    }

    #[test]
    fn test_zero_size_removal() {
        let old = vec![lvl(dec!(100), dec!(1)), lvl(dec!(101), dec!(2))];
        let delta = vec![lvl(dec!(100), dec!(0))];

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert_eq!(merged, vec![lvl(dec!(101), dec!(2))]);
    }

    #[test]
    fn test_new_price_insertion() {
        let old = vec![lvl(dec!(101), dec!(2))];
        let delta = vec![lvl(dec!(100), dec!(5))];

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert_eq!(merged, vec![lvl(dec!(100), dec!(5)), lvl(dec!(101), dec!(2))]);
    }

    #[test]
    fn test_empty_delta_is_noop() {
        let old = vec![
            lvl(dec!(99), dec!(1)),
            lvl(dec!(98.5), dec!(2)),
            lvl(dec!(97), dec!(3)),
        ];

        let merged = merge_side(&old, &[], SortDirection::Descending);
        assert_eq!(merged, old);
    }

    #[test]
    fn test_empty_old_drops_zero_tail() {
        let delta = vec![
            lvl(dec!(10), dec!(1)),
            lvl(dec!(11), dec!(0)),
            lvl(dec!(12), dec!(3)),
        ];

        let merged = merge_side(&[], &delta, SortDirection::Ascending);
        assert_eq!(merged, vec![lvl(dec!(10), dec!(1)), lvl(dec!(12), dec!(3))]);
    }

    #[test]
    fn test_descending_interleave() {
        // Bids: highest first
        let old = vec![
            lvl(dec!(105), dec!(1)),
            lvl(dec!(103), dec!(1)),
            lvl(dec!(101), dec!(1)),
        ];
        let delta = vec![
            lvl(dec!(106), dec!(4)),
            lvl(dec!(103), dec!(0)),
            lvl(dec!(102), dec!(7)),
            lvl(dec!(100), dec!(9)),
        ];

        let merged = merge_side(&old, &delta, SortDirection::Descending);
        assert_eq!(
            merged,
            vec![
                lvl(dec!(106), dec!(4)),
                lvl(dec!(105), dec!(1)),
                lvl(dec!(102), dec!(7)),
                lvl(dec!(101), dec!(1)),
                lvl(dec!(100), dec!(9)),
            ]
        );
    }

    #[test]
    fn test_differently_formatted_prices_match() {
        let old = vec![lvl(dec!(1.50), dec!(3)), lvl(dec!(1.6), dec!(1))];
        let delta = vec![lvl(dec!(1.5), dec!(0.00))];

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert_eq!(merged, vec![lvl(dec!(1.6), dec!(1))]);
    }

    #[test]
    fn test_removal_of_missing_price_is_noop() {
        let old = vec![lvl(dec!(100), dec!(1)), lvl(dec!(102), dec!(1))];
        let delta = vec![lvl(dec!(101), dec!(0)), lvl(dec!(103), dec!(0))];

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert_eq!(merged, old);
    }

    #[test]
    fn test_inputs_untouched() {
        let old = vec![lvl(dec!(100), dec!(1))];
        let delta = vec![lvl(dec!(100), dec!(0))];
        let old_copy = old.clone();
        let delta_copy = delta.clone();

        let merged = merge_side(&old, &delta, SortDirection::Ascending);
        assert!(merged.is_empty());
        assert_eq!(old, old_copy);
        assert_eq!(delta, delta_copy);
    }
}
