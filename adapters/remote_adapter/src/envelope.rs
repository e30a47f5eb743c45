use crate::content_api::ContentFile;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bills_core::domain::CustomerRecord;
use bills_core::error::StorageError;
use bills_core::ports::Result;

/// Encodes a record into the base64 text stored inside the envelope.
pub fn encode_record(record: &CustomerRecord) -> Result<String> {
    Ok(STANDARD.encode(record.to_pretty_json()?))
}

/// Decodes the record carried by a fetched file. Line breaks in the base64
/// text are tolerated.
pub fn decode_record(key: &str, file: &ContentFile) -> Result<CustomerRecord> {
    if let Some(encoding) = file.encoding.as_deref() {
        if encoding != "base64" {
            return Err(StorageError::Encoding(format!(
                "unsupported content encoding {encoding:?} for {key}"
            )));
        }
    }

    let compact: String = file
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| StorageError::malformed(key, e))?;

    serde_json::from_slice(&bytes).map_err(|e| StorageError::malformed(key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bills_core::domain::BillEntry;

    fn file(content: String) -> ContentFile {
        ContentFile {
            content,
            sha: "abc123".to_string(),
            encoding: Some("base64".to_string()),
        }
    }

    #[test]
    fn test_encoded_record_decodes_back() {
        let record = CustomerRecord::new(
            "Asha".into(),
            "12 Lake Road".into(),
            BillEntry::new(500.0, "2024-03-15T10:00:00"),
        );
        let decoded = decode_record("k", &file(encode_record(&record).unwrap())).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_decode_tolerates_wrapped_lines() {
        let json = concat!(
            r#"{"customer_name":"Ravi","bill_to":"4 Hill St","#,
            r#""bills":[{"amount":640.0,"timestamp":"2024-03-03T18:42:07"}]}"#
        );
        let encoded = STANDARD.encode(json);
        let wrapped: String = encoded
            .as_bytes()
            .chunks(60)
            .map(|chunk| format!("{}\n", std::str::from_utf8(chunk).unwrap()))
            .collect();

        let record = decode_record("k", &file(wrapped)).unwrap();
        assert_eq!(record.customer_name, "Ravi");
        assert_eq!(record.bills[0].amount, 640.0);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let err = decode_record("k", &file("!!!not base64!!!".into())).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn test_decode_rejects_non_record_json() {
        let err = decode_record("k", &file(STANDARD.encode("[1, 2, 3]"))).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn test_decode_rejects_other_encodings() {
        let mut f = file(String::new());
        f.encoding = Some("none".into());
        assert!(matches!(
            decode_record("k", &f),
            Err(StorageError::Encoding(_))
        ));
    }
}
