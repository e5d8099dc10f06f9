use chrono::{Datelike, Local};
use rand::Rng;

/// Generate a number for a new, unsaved invoice: `INV-{YYYY}{MM}-{NNNN}`.
///
/// The suffix is random, so two invoices created in the same month can
/// collide; the server decides whether that matters.
pub fn generate_invoice_number() -> String {
    invoice_number_for(&Local::now(), &mut rand::thread_rng())
}

/// Same as [`generate_invoice_number`] with the date and RNG supplied
pub fn invoice_number_for(date: &impl Datelike, rng: &mut impl Rng) -> String {
    let suffix: u16 = rng.gen_range(0..10_000);
    format!("INV-{:04}{:02}-{:04}", date.year(), date.month(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn matches_shape(number: &str, prefix: &str) -> bool {
        number.len() == prefix.len() + 4
            && number.starts_with(prefix)
            && number[prefix.len()..].chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_shape_for_march_2025() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let number = invoice_number_for(&date, &mut rng);
            assert!(matches_shape(&number, "INV-202503-"), "{number}");
        }
    }

    #[test]
    fn test_current_month() {
        let now = Local::now();
        let prefix = format!("INV-{:04}{:02}-", now.year(), now.month());
        assert!(matches_shape(&generate_invoice_number(), &prefix));
    }
}
