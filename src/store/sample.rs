//! Sample CVE records for a locally created database.

use crate::model::CveRecord;

const SAMPLES: [(&str, &str, &str, &str, &str, &str, &str, f64); 9] = [
    ("CVE-2023-0001", "microsoft", "windows", "10.0", "10.0.19045", "Test vulnerability in Windows", "2023-01-01", 7.5),
    ("CVE-2023-0002", "microsoft", "windows", "11.0", "11.0", "Test critical vulnerability in Windows 11", "2023-01-15", 9.2),
    ("CVE-2023-0003", "google", "chrome", "100.0.0.0", "110.0.0.0", "Test vulnerability in Chrome browser", "2023-02-01", 8.1),
    ("CVE-2023-0004", "google", "chromium", "100.0.0.0", "110.0.0.0", "Test medium severity in Chromium", "2023-02-15", 5.5),
    ("CVE-2023-0005", "adobe", "acrobat", "22.0.0", "23.0.0", "Test vulnerability in Adobe Acrobat", "2023-03-01", 6.8),
    ("CVE-2023-0006", "adobe", "reader", "22.0.0", "23.0.0", "Test low severity in Adobe Reader", "2023-03-15", 3.2),
    ("CVE-2023-0007", "microsoft", "office", "16.0.0", "16.0.15000", "Test vulnerability in MS Office", "2023-04-01", 7.2),
    ("CVE-2023-0008", "microsoft", "excel", "16.0.0", "16.0.15000", "Test high severity in Excel", "2023-04-15", 8.7),
    ("CVE-2023-0009", "mozilla", "firefox", "100.0", "110.0", "Test vulnerability in Firefox browser", "2023-05-01", 6.5),
];

/// Returns the records inserted by [`CveStore::seed_sample_data`](super::CveStore::seed_sample_data).
pub fn sample_records() -> Vec<CveRecord> {
    SAMPLES
        .iter()
        .map(
            |&(id, vendor, product, start, end, description, published, score)| CveRecord {
                id: id.to_string(),
                vendor: Some(vendor.to_string()),
                product: Some(product.to_string()),
                version_start: Some(start.to_string()),
                version_end: Some(end.to_string()),
                description: Some(description.to_string()),
                published_date: Some(published.to_string()),
                cvss_score: Some(score),
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    #[test]
    fn test_sample_ids_unique() {
        let records = sample_records();
        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_sample_covers_severities() {
        let records = sample_records();
        let severities: Vec<Severity> = records.iter().map(|r| r.severity()).collect();
        assert!(severities.contains(&Severity::Critical));
        assert!(severities.contains(&Severity::High));
        assert!(severities.contains(&Severity::Medium));
        assert!(severities.contains(&Severity::Low));
    }
}
