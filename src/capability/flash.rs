//! Flash messages (session data that lives for one follow-up request).
//!
//! A request's flash values are carried to the next request of the same
//! client in the [`FLASH_COOKIE`] cookie, as a JSON list of pairs.

use std::sync::Mutex;

/// Cookie that carries flash values to the next request.
pub const FLASH_COOKIE: &str = "leaf_flash";

/// Encode flash values for [`FLASH_COOKIE`].
pub fn encode_flash(entries: &[(String, String)]) -> Option<String> {
    match serde_json::to_string(entries) {
        Ok(encoded) => Some(encoded),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode flash values");
            None
        }
    }
}

/// Decode the value of [`FLASH_COOKIE`]. Malformed values yield nothing.
pub fn decode_flash(raw: &str) -> Vec<(String, String)> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring malformed flash cookie");
        Vec::new()
    })
}

/// Stores flash values for the next request.
pub trait FlashStore: Send + Sync {
    fn set(&self, key: &str, value: &str);
}

/// In-memory flash store.
///
/// Later writes to the same key replace the earlier value. A context
/// creates one per request; see [`ContextBuilder`](crate::core::ContextBuilder).
#[derive(Debug, Default)]
pub struct MemoryFlash {
    entries: Mutex<Vec<(String, String)>>,
}

impl MemoryFlash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a flashed value.
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Remove and return every flashed value.
    pub fn take_all(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FlashStore for MemoryFlash {
    fn set(&self, key: &str, value: &str) {
        let Ok(mut entries) = self.entries.lock() else {
            tracing::warn!(key, "Flash store lock poisoned, value dropped");
            return;
        };

        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let flash = MemoryFlash::new();
        flash.set("notice", "Saved");
        flash.set("error", "Nope");
        flash.set("notice", "Saved again");

        assert_eq!(flash.len(), 2);
        assert_eq!(flash.get("notice").as_deref(), Some("Saved again"));
        assert_eq!(flash.get("missing"), None);
    }

    #[test]
    fn test_flash_cookie_encoding() {
        let entries = vec![
            ("notice".to_string(), "saved; \"quoted\", ok".to_string()),
            ("level".to_string(), "info".to_string()),
        ];

        let encoded = encode_flash(&entries).unwrap();
        assert_eq!(decode_flash(&encoded), entries);
        assert!(decode_flash("not json").is_empty());
        assert!(decode_flash(r#"{"a":"b"}"#).is_empty());
    }

    #[test]
    fn test_take_all_drains() {
        let flash = MemoryFlash::new();
        flash.set("a", "1");

        assert_eq!(flash.take_all(), vec![("a".to_string(), "1".to_string())]);
        assert!(flash.is_empty());
    }
}
