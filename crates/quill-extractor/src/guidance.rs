//! Guidance baton handed from one chunk to the next

use serde::{Deserialize, Serialize};

/// Continuation summary written by the finalize action
///
/// Every field is optional on input; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guidance {
    /// Last pointer written while processing the chunk
    #[serde(alias = "lastProcessedPath")]
    pub last_processed_path: String,

    /// What is being built, in the model's words
    #[serde(alias = "currentContext")]
    pub current_context: String,

    /// What the next chunk should expect or complete
    #[serde(alias = "pendingAction")]
    pub pending_action: String,

    /// Entities extracted in the chunk
    #[serde(alias = "extractedEntitiesCount")]
    pub extracted_entities_count: u64,
}

/// Result reported for a successful finalize action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finalized {
    /// Always `true`
    pub finalized: bool,
    /// Baton for the next chunk
    pub guidance: Guidance,
}

impl Guidance {
    /// Wrap the baton as a finalize result.
    pub fn finalize(self) -> Finalized {
        Finalized {
            finalized: true,
            guidance: self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_fields() {
        let guidance: Guidance = serde_json::from_value(json!({"current_context": "clients"})).unwrap();
        assert_eq!(guidance.current_context, "clients");
        assert_eq!(guidance.last_processed_path, "");
        assert_eq!(guidance.extracted_entities_count, 0);
    }

    #[test]
    fn test_camel_case_aliases() {
        let guidance: Guidance = serde_json::from_value(json!({
            "lastProcessedPath": "/clients/0",
            "pendingAction": "expecting_contract",
            "extractedEntitiesCount": 2
        }))
        .unwrap();
        assert_eq!(guidance.last_processed_path, "/clients/0");
        assert_eq!(guidance.pending_action, "expecting_contract");
        assert_eq!(guidance.extracted_entities_count, 2);
    }

    #[test]
    fn test_wrong_type_rejected() {
        let result: Result<Guidance, _> = serde_json::from_value(json!({"extracted_entities_count": "two"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_finalize_shape() {
        let finalized = Guidance {
            current_context: "invoices".to_string(),
            ..Guidance::default()
        }
        .finalize();
        assert_eq!(
            serde_json::to_value(&finalized).unwrap(),
            json!({
                "finalized": true,
                "guidance": {
                    "last_processed_path": "",
                    "current_context": "invoices",
                    "pending_action": "",
                    "extracted_entities_count": 0
                }
            })
        );
    }
}
