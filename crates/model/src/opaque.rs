use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific history item that callers keep without inspecting.
///
/// Some providers need the exact assistant message they produced (for
/// example one carrying tool calls) to be echoed back in later requests.
/// The provider wraps that message here, the agent stores it in its
/// history, and the provider unwraps it again with [`OpaqueMessage::to_raw`]
/// when it builds the next request.
///
/// Two opaque messages are equal when their ids are equal.
#[derive(Clone)]
pub struct OpaqueMessage {
    id: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueMessage {
    /// Wraps `value` under `id`, which must be unique within a conversation.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        let id: String = id.into();
        Self {
            id: id.into(),
            value: Arc::new(value),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wrapped value if it has type `T`.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct ProviderMessage {
        role: &'static str,
        content: String,
    }

    #[test]
    fn test_downcast() {
        let opaque = OpaqueMessage::new(
            "chatcmpl-1",
            ProviderMessage {
                role: "assistant",
                content: "{}".to_owned(),
            },
        );
        assert_eq!(opaque.id(), "chatcmpl-1");

        let raw = opaque.to_raw::<ProviderMessage>().unwrap();
        assert_eq!(raw.role, "assistant");
        assert!(opaque.to_raw::<String>().is_none());
    }

    #[test]
    fn test_identity_by_id() {
        let first = OpaqueMessage::new("a", 1_u32);
        let same_id = OpaqueMessage::new("a", "different payload");
        let other = OpaqueMessage::new("b", 1_u32);

        assert_eq!(first, same_id);
        assert_ne!(first, other);

        let set: HashSet<_> = [first.clone(), same_id, other].into();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&first));
    }
}
