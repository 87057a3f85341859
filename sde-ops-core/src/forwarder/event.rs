//! Extraction of the imported object from an S3 upload notification.

use serde_json::Value;
use thiserror::Error;

/// Why an upload notification could not be turned into an [`ImportObject`].
///
/// The `Display` text is returned to the caller verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedEvent {
    #[error("Request must contain a bucket")]
    MissingBucket,
    #[error("Request must contain a key")]
    MissingKey,
    #[error("Request must contain a size")]
    MissingSize,
    #[error("Imported object key must have the format <agreement>/<email>/<file>.")]
    InvalidKeyFormat,
}

/// The uploaded object a single invocation is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportObject {
    pub bucket: String,
    pub key: String,
    /// Size as declared by the notification.
    pub size: i64,
}

impl ImportObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, size: i64) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            size,
        }
    }

    /// Reads bucket, key and size from the first record of an S3 event.
    ///
    /// Only the presence of the three fields is checked here; the key shape is
    /// checked by [`ImportObject::agreement_and_user`].
    pub fn from_event(event: &Value) -> Result<Self, MalformedEvent> {
        let record = event.pointer("/Records/0/s3");
        let bucket = record
            .and_then(|s3| s3.pointer("/bucket/name"))
            .and_then(Value::as_str)
            .ok_or(MalformedEvent::MissingBucket)?;
        let key = record
            .and_then(|s3| s3.pointer("/object/key"))
            .and_then(Value::as_str)
            .ok_or(MalformedEvent::MissingKey)?;
        let size = record
            .and_then(|s3| s3.pointer("/object/size"))
            .and_then(Value::as_i64)
            .ok_or(MalformedEvent::MissingSize)?;

        Ok(Self::new(bucket, decode_key(key), size))
    }

    /// `s3://bucket/key`, used in every message about this object.
    pub fn s3_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn key_parts(&self) -> Option<(&str, &str)> {
        let mut parts = self.key.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(agreement), Some(user), Some(_), None) => Some((agreement, user)),
            _ => None,
        }
    }

    /// Agreement the file was uploaded under, from `<agreement>/<user>/<file>`.
    pub fn agreement(&self) -> Option<&str> {
        self.key_parts()
            .map(|(agreement, _)| agreement)
            .filter(|agreement| !agreement.is_empty())
    }

    /// Uploader's email address, from `<agreement>/<user>/<file>`.
    pub fn user(&self) -> Option<&str> {
        self.key_parts()
            .map(|(_, user)| user)
            .filter(|user| !user.is_empty())
    }

    /// Last segment of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Agreement and uploader, failing unless the key has the
    /// `<agreement>/<user>/<file>` shape.
    pub fn agreement_and_user(&self) -> Result<(&str, &str), MalformedEvent> {
        match (self.agreement(), self.user()) {
            (Some(agreement), Some(user)) => Ok((agreement, user)),
            _ => Err(MalformedEvent::InvalidKeyFormat),
        }
    }
}

/// S3 notifications form-urlencode object keys (`+` for space).
fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_first_record() {
        let event = json!({"Records": [{"s3": {
            "bucket": {"name": "landing"},
            "object": {"key": "dsa-1/user%40email.com/my+file.csv", "size": 42}
        }}]});

        let object = ImportObject::from_event(&event).unwrap();

        assert_eq!(object.bucket, "landing");
        assert_eq!(object.key, "dsa-1/user@email.com/my file.csv");
        assert_eq!(object.size, 42);
        assert_eq!(object.agreement(), Some("dsa-1"));
        assert_eq!(object.user(), Some("user@email.com"));
        assert_eq!(object.file_name(), "my file.csv");
        assert_eq!(object.s3_uri(), "s3://landing/dsa-1/user@email.com/my file.csv");
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        assert_eq!(
            ImportObject::from_event(&json!({})),
            Err(MalformedEvent::MissingBucket)
        );
        assert_eq!(
            ImportObject::from_event(&json!({"Records": [{"s3": {"object": {"key": "k"}}}]})),
            Err(MalformedEvent::MissingBucket)
        );
        assert_eq!(
            ImportObject::from_event(&json!({"Records": [{"s3": {"bucket": {"name": "b"}}}]})),
            Err(MalformedEvent::MissingKey)
        );
        assert_eq!(
            ImportObject::from_event(
                &json!({"Records": [{"s3": {"bucket": {"name": "b"}, "object": {"key": "k"}}}]})
            ),
            Err(MalformedEvent::MissingSize)
        );
    }

    #[test]
    fn key_must_have_three_non_empty_leading_segments() {
        for key in ["test", "a/b", "a/b/c/d", "/user/file.csv", "agreement//file.csv"] {
            let object = ImportObject::new("b", key, 10);
            assert_eq!(
                object.agreement_and_user(),
                Err(MalformedEvent::InvalidKeyFormat),
                "key {key:?} should be rejected"
            );
        }
        assert_eq!(
            ImportObject::new("b", "a/u/f.csv", 10).agreement_and_user(),
            Ok(("a", "u"))
        );
    }
}
