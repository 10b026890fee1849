//! Value encoding for stored records.
//!
//! A record value is a little-endian `u16` schema version followed by the
//! bincode-encoded [`VerificationRecord`]. The version is read before the
//! body so a record written by a newer build is refused instead of being
//! decoded as garbage.

use kahukura_store::StoreError;
use kahukura_types::{VerificationRecord, CURRENT_RECORD_SCHEMA};

const HEADER_LEN: usize = 2;

pub fn encode_record(record: &VerificationRecord) -> Result<Vec<u8>, StoreError> {
    let body = bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&CURRENT_RECORD_SCHEMA.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

pub fn decode_record(bytes: &[u8]) -> Result<VerificationRecord, StoreError> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::Corruption(format!(
            "record value too short ({} bytes)",
            bytes.len()
        )));
    }
    let version = u16::from_le_bytes([bytes[0], bytes[1]]);
    if version > CURRENT_RECORD_SCHEMA {
        return Err(StoreError::SchemaMismatch {
            found: version,
            supported: CURRENT_RECORD_SCHEMA,
        });
    }
    let mut record: VerificationRecord = bincode::deserialize(&bytes[HEADER_LEN..])
        .map_err(|e| StoreError::Corruption(format!("undecodable record: {e}")))?;
    record.schema_version = CURRENT_RECORD_SCHEMA;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kahukura_types::{Email, MemberId};

    fn sample() -> VerificationRecord {
        let mut record = VerificationRecord::new(MemberId::new("5").unwrap());
        record.email = Some(Email::parse("a@uni.edu").unwrap());
        record.verified = true;
        record.revision = 3;
        record
    }

    #[test]
    fn decode_reads_back_encoded_record() {
        let bytes = encode_record(&sample()).unwrap();
        assert_eq!(decode_record(&bytes).unwrap(), sample());
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut bytes = encode_record(&sample()).unwrap();
        bytes[..2].copy_from_slice(&(CURRENT_RECORD_SCHEMA + 1).to_le_bytes());
        assert!(matches!(
            decode_record(&bytes),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn truncated_value_is_corruption() {
        assert!(matches!(decode_record(&[1]), Err(StoreError::Corruption(_))));
        let bytes = encode_record(&sample()).unwrap();
        assert!(matches!(
            decode_record(&bytes[..bytes.len() / 2]),
            Err(StoreError::Corruption(_))
        ));
    }
}
