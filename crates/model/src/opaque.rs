use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// A provider-specific history message the agent carries around without
/// looking inside.
///
/// The neutral [`ModelMessage`](crate::ModelMessage) variants lose detail
/// that some providers need when the conversation is replayed. Gemini, for
/// instance, wants its own `functionCall` parts back verbatim before the
/// matching `functionResponse` parts. Providers wrap their native message
/// in an `OpaqueMessage` and unwrap it again when building the next
/// request.
pub struct OpaqueMessage(Arc<dyn OpaqueValue>);

impl OpaqueMessage {
    /// Creates a new `OpaqueMessage`.
    ///
    /// The `id` identifies the message and should be unique across the
    /// conversation. Two opaque messages are equal iff their ids are.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        let id = id.into();
        Self(Arc::new(Tagged { id, value }))
    }

    /// Returns the id given at construction.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Borrows the wrapped value if it has type `T`.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Clone for OpaqueMessage {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id()).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OpaqueMessage {}

trait OpaqueValue: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct Tagged<T> {
    id: String,
    value: T,
}

impl<T: Send + Sync + 'static> OpaqueValue for Tagged<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct NativeTurn {
        role: &'static str,
        text: String,
    }

    #[test]
    fn test_unwrap_native_message() {
        let turn = NativeTurn {
            role: "model",
            text: "1 USD is 0.9 EUR".to_owned(),
        };
        let opaque = OpaqueMessage::new("resp-1", turn.clone());
        assert_eq!(opaque.id(), "resp-1");
        assert_eq!(opaque.to_raw::<NativeTurn>(), Some(&turn));
        assert!(opaque.to_raw::<String>().is_none());
    }

    #[test]
    fn test_equality_by_id() {
        let first = OpaqueMessage::new("resp-1", "a".to_owned());
        let same_id = OpaqueMessage::new("resp-1", 42_u32);
        let other = OpaqueMessage::new("resp-2", "a".to_owned());
        assert_eq!(first, first.clone());
        assert_eq!(first, same_id);
        assert_ne!(first, other);
        assert_eq!(format!("{first:?}"), r#"OpaqueMessage("resp-1")"#);
    }
}
