//! Gap analysis: which record fields are still empty.

use crate::types::record::{CompanyRecord, RecordField};

/// Fields that are null, empty lists, or blank strings, in declaration order.
pub fn missing_fields(record: &CompanyRecord) -> Vec<RecordField> {
    RecordField::ALL
        .into_iter()
        .filter(|field| !record.is_filled(*field))
        .collect()
}

/// Filled optional fields divided by total optional fields.
pub fn completeness_ratio(record: &CompanyRecord) -> f32 {
    let total = RecordField::ALL.len();
    let filled = total - missing_fields(record).len();
    filled as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_missing_everything() {
        let record = CompanyRecord::new("Acme").unwrap();
        assert_eq!(missing_fields(&record), RecordField::ALL.to_vec());
        assert_eq!(completeness_ratio(&record), 0.0);
    }

    #[test]
    fn test_order_is_declaration_order() {
        let record = CompanyRecord::new("Acme")
            .unwrap()
            .with_founders(["Alice"])
            .with_funding_summary("Bootstrapped");

        assert_eq!(
            missing_fields(&record),
            vec![
                RecordField::FoundingYear,
                RecordField::ProductDescription,
                RecordField::NotableCustomers,
            ]
        );
        assert!((completeness_ratio(&record) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let record = CompanyRecord::new("Acme")
            .unwrap()
            .with_founders(["", "  "])
            .with_product_description("");

        let missing = missing_fields(&record);
        assert!(missing.contains(&RecordField::FounderNames));
        assert!(missing.contains(&RecordField::ProductDescription));
    }

    #[test]
    fn test_full_record_has_no_gaps() {
        let record = CompanyRecord::new("Acme")
            .unwrap()
            .with_founding_year(1949)
            .with_founders(["Wile E. Coyote"])
            .with_product_description("Anvils")
            .with_funding_summary("Privately held")
            .with_notable_customers("Road Runner enthusiasts");

        assert!(missing_fields(&record).is_empty());
        assert_eq!(completeness_ratio(&record), 1.0);
    }
}
