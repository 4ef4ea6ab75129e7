//! Physical asset barcodes.
//!
//! Format: `SSSS.OOO.QQQ.YYYY.CCC`
//!
//! | field | width | meaning |
//! |---|---|---|
//! | `SSSS` | 4 | running sequence within `(year, category)` |
//! | `OOO` | 3 | position within the procurement order |
//! | `QQQ` | 3 | quantity procured in that order |
//! | `YYYY` | 4 | registration year |
//! | `CCC` | 3 | category code |
use std::{fmt, future::Future, time::Duration};

use async_trait::async_trait;

use crate::{
    models::AssetCategory,
    repository::{Repository, StoreError, StoreResult},
};

pub const MAX_ATTEMPTS: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

const MAX_SEQUENCE: u32 = 9_999;
const MAX_ORDER: u32 = 999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeParts {
    pub sequence: u32,
    pub order_number: u32,
    pub quota: u32,
    pub year: i32,
    pub category_code: String,
}

impl fmt::Display for BarcodeParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}.{:03}.{:03}.{:04}.{}",
            self.sequence, self.order_number, self.quota, self.year, self.category_code
        )
    }
}

pub fn format_barcode(parts: &BarcodeParts) -> String {
    parts.to_string()
}

/// Strict parse: every field must have its exact width and the code must be
/// three uppercase ASCII letters.
pub fn parse_barcode(text: &str) -> Option<BarcodeParts> {
    let fields: Vec<&str> = text.trim().split('.').collect();
    let [seq, order, quota, year, code] = fields[..] else {
        return None;
    };
    let digits = |s: &str, width: usize| s.len() == width && s.bytes().all(|b| b.is_ascii_digit());
    if !(digits(seq, 4) && digits(order, 3) && digits(quota, 3) && digits(year, 4)) {
        return None;
    }
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    Some(BarcodeParts {
        sequence: seq.parse().ok()?,
        order_number: order.parse().ok()?,
        quota: quota.parse().ok()?,
        year: year.parse().ok()?,
        category_code: code.to_string(),
    })
}

/// `.YYYY.CCC`, the part shared by every barcode in one sequence.
pub fn sequence_suffix(year: i32, category: AssetCategory) -> String {
    format!(".{:04}.{}", year, category.code())
}

/// Highest sequence among `existing` for `(year, code)`, plus one.
pub fn next_sequence<S: AsRef<str>>(existing: &[S], year: i32, code: &str) -> u32 {
    existing
        .iter()
        .filter_map(|b| parse_barcode(b.as_ref()))
        .filter(|p| p.year == year && p.category_code == code)
        .map(|p| p.sequence)
        .max()
        .map_or(1, |max| max + 1)
}

fn validate_field(name: &str, value: i32, max: u32) -> StoreResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| (1..=max).contains(v))
        .ok_or_else(|| StoreError::Conflict(format!("{name} must be between 1 and {max}")))
}

/// The two reads barcode allocation needs. Every `Repository` provides them.
#[async_trait]
pub trait BarcodeLookup: Send + Sync {
    async fn existing_barcodes(&self, suffix: &str) -> StoreResult<Vec<String>>;
    async fn is_taken(&self, barcode: &str) -> StoreResult<bool>;
}

#[async_trait]
impl<R: Repository + ?Sized> BarcodeLookup for R {
    async fn existing_barcodes(&self, suffix: &str) -> StoreResult<Vec<String>> {
        self.barcodes_with_suffix(suffix).await
    }

    async fn is_taken(&self, barcode: &str) -> StoreResult<bool> {
        self.barcode_exists(barcode).await
    }
}

/// generate_unique_barcode
///
/// Proposes `next_sequence + attempt` and returns the first candidate not yet
/// stored, sleeping `RETRY_DELAY` between attempts. Gives up with `Conflict`
/// after `MAX_ATTEMPTS`. The database uniqueness constraint remains the final
/// guard against concurrent writers.
pub async fn generate_unique_barcode<L: BarcodeLookup + ?Sized>(
    lookup: &L,
    order_number: i32,
    quota: i32,
    year: i32,
    category: AssetCategory,
) -> StoreResult<String> {
    let order_number = validate_field("order_number", order_number, MAX_ORDER)?;
    let quota = validate_field("quota", quota, MAX_ORDER)?;
    let suffix = sequence_suffix(year, category);

    for attempt in 0..MAX_ATTEMPTS {
        let existing = lookup.existing_barcodes(&suffix).await?;
        let sequence = next_sequence(&existing, year, category.code()) + attempt;
        if sequence > MAX_SEQUENCE {
            return Err(StoreError::Conflict(format!(
                "barcode sequence exhausted for {year} {}",
                category.code()
            )));
        }

        let candidate = format_barcode(&BarcodeParts {
            sequence,
            order_number,
            quota,
            year,
            category_code: category.code().to_string(),
        });
        if !lookup.is_taken(&candidate).await? {
            return Ok(candidate);
        }

        tracing::debug!(%candidate, attempt, "barcode collision, retrying");
        tokio::time::sleep(RETRY_DELAY).await;
    }

    Err(StoreError::Conflict(
        "could not allocate a unique barcode".to_string(),
    ))
}

/// insert_with_unique_barcode
///
/// Allocates a barcode and hands it to `insert`. When the insert reports a
/// `Conflict` (a concurrent writer took the barcode) a fresh one is allocated
/// and the insert is tried once more.
pub async fn insert_with_unique_barcode<L, T, F, Fut>(
    lookup: &L,
    order_number: i32,
    quota: i32,
    year: i32,
    category: AssetCategory,
    mut insert: F,
) -> StoreResult<T>
where
    L: BarcodeLookup + ?Sized,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut retried = false;
    loop {
        let code = generate_unique_barcode(lookup, order_number, quota, year, category).await?;
        match insert(code).await {
            Err(StoreError::Conflict(_)) if !retried => {
                tracing::warn!("barcode taken by a concurrent insert, regenerating");
                retried = true;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(sequence: u32) -> BarcodeParts {
        BarcodeParts {
            sequence,
            order_number: 2,
            quota: 10,
            year: 2024,
            category_code: "ELC".into(),
        }
    }

    #[test]
    fn formats_with_fixed_widths() {
        assert_eq!(format_barcode(&parts(7)), "0007.002.010.2024.ELC");
    }

    #[test]
    fn parse_is_inverse_of_format() {
        let p = parts(123);
        assert_eq!(parse_barcode(&format_barcode(&p)), Some(p));
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in [
            "",
            "7.002.010.2024.ELC",
            "0007.002.010.2024.elc",
            "0007.002.010.2024",
            "0007.002.010.2024.ELC.X",
            "000A.002.010.2024.ELC",
        ] {
            assert_eq!(parse_barcode(bad), None, "{bad}");
        }
    }

    #[test]
    fn next_sequence_scans_only_matching_year_and_code() {
        let existing = [
            "0003.001.001.2024.ELC",
            "0009.001.001.2023.ELC",
            "0011.001.001.2024.FUR",
            "garbage.2024.ELC",
        ];
        assert_eq!(next_sequence(&existing, 2024, "ELC"), 4);
        assert_eq!(next_sequence(&existing, 2025, "ELC"), 1);
        assert_eq!(next_sequence::<&str>(&[], 2024, "VEH"), 1);
    }

    #[test]
    fn suffix_uses_category_code() {
        assert_eq!(sequence_suffix(2024, AssetCategory::OfficeEquipment), ".2024.OFE");
    }

    /// Stored barcodes plus a number of upcoming `is_taken` checks that report
    /// a collision.
    struct ScriptedLookup {
        existing: Vec<String>,
        collisions: std::sync::Mutex<u32>,
        checked: std::sync::Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn new(existing: &[&str], collisions: u32) -> Self {
            Self {
                existing: existing.iter().map(|s| s.to_string()).collect(),
                collisions: std::sync::Mutex::new(collisions),
                checked: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn checked(&self) -> Vec<String> {
            self.checked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BarcodeLookup for ScriptedLookup {
        async fn existing_barcodes(&self, suffix: &str) -> StoreResult<Vec<String>> {
            Ok(self
                .existing
                .iter()
                .filter(|b| b.ends_with(suffix))
                .cloned()
                .collect())
        }

        async fn is_taken(&self, barcode: &str) -> StoreResult<bool> {
            self.checked.lock().unwrap().push(barcode.to_string());
            let mut remaining = self.collisions.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[tokio::test]
    async fn collisions_advance_the_sequence() {
        let lookup = ScriptedLookup::new(&["0004.001.001.2024.ELC"], 2);
        let code = generate_unique_barcode(&lookup, 2, 10, 2024, AssetCategory::Electronics)
            .await
            .unwrap();
        assert_eq!(code, "0007.002.010.2024.ELC");
        assert_eq!(
            lookup.checked(),
            vec![
                "0005.002.010.2024.ELC",
                "0006.002.010.2024.ELC",
                "0007.002.010.2024.ELC"
            ]
        );
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let lookup = ScriptedLookup::new(&[], u32::MAX);
        let result = generate_unique_barcode(&lookup, 1, 1, 2024, AssetCategory::Electronics).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(lookup.checked().len(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn exhausted_sequence_is_a_conflict() {
        let lookup = ScriptedLookup::new(&["9999.001.001.2024.ELC"], 0);
        let result = generate_unique_barcode(&lookup, 1, 1, 2024, AssetCategory::Electronics).await;
        assert!(matches!(result, Err(StoreError::Conflict(msg)) if msg.contains("exhausted")));
        assert!(lookup.checked().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_order_fields_are_rejected() {
        let lookup = ScriptedLookup::new(&[], 0);
        for (order, quota) in [(0, 1), (1, 1000), (-3, 5)] {
            let result =
                generate_unique_barcode(&lookup, order, quota, 2024, AssetCategory::Electronics).await;
            assert!(result.is_err(), "{order}/{quota}");
        }
    }

    #[tokio::test]
    async fn insert_conflict_is_retried_once_with_a_fresh_barcode() {
        let lookup = ScriptedLookup::new(&[], 0);
        let attempts = std::sync::Mutex::new(Vec::new());

        let stored = insert_with_unique_barcode(
            &lookup,
            1,
            1,
            2024,
            AssetCategory::Electronics,
            |code| {
                let mut seen = attempts.lock().unwrap();
                seen.push(code.clone());
                let first = seen.len() == 1;
                async move {
                    if first {
                        Err(StoreError::Conflict("barcode taken".into()))
                    } else {
                        Ok(code)
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(stored, "0001.001.001.2024.ELC");
        assert_eq!(attempts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_insert_conflict_is_returned() {
        let lookup = ScriptedLookup::new(&[], 0);
        let calls = std::sync::Mutex::new(0);

        let result: StoreResult<String> = insert_with_unique_barcode(
            &lookup,
            1,
            1,
            2024,
            AssetCategory::Furniture,
            |_code| {
                *calls.lock().unwrap() += 1;
                async { Err(StoreError::Conflict("barcode taken".into())) }
            },
        )
        .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
