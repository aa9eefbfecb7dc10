//! The `Document` trait implemented by every stored type.

use serde::{de::DeserializeOwned, Serialize};

/// A type stored in a named collection.
///
/// The serialized form must be a JSON object carrying its id under `_id`.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    /// Collection name (also the file stem when persisted).
    const COLLECTION: &'static str;

    /// The document id.
    fn id(&self) -> &str;

    /// Groups of field paths that must be unique together.
    ///
    /// A document whose fields in a group are all null or missing is
    /// exempt from that group.
    fn unique_keys() -> &'static [&'static [&'static str]] {
        &[]
    }
}

/// Look up a dotted field path (`bankDetails.IFSCCode`) in a JSON value.
pub fn lookup<'a>(doc: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(doc, |value, segment| value.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"bankDetails": {"IFSCCode": "HDFC0001234"}});
        assert_eq!(
            lookup(&doc, "bankDetails.IFSCCode"),
            Some(&json!("HDFC0001234"))
        );
        assert_eq!(lookup(&doc, "bankDetails.missing"), None);
        assert_eq!(lookup(&doc, "nope"), None);
    }
}
