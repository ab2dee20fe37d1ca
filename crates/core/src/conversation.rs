//! Conversation-related types.

use fx_agent_model::{ModelMessage, ToolCallResult};

use crate::model_client::ModelClientResponse;

/// Represents a conversation.
///
/// Every model turn that requested tool calls is followed by a
/// [`ModelMessage::ToolResults`] item answering those calls before the model
/// is asked to continue.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) items: Vec<Item>,
}

impl Conversation {
    /// Returns the items in this conversation, oldest first.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been said yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn messages(&self) -> Vec<ModelMessage> {
        self.items.iter().map(|i| i.msg.clone()).collect()
    }

    pub(crate) fn push_system(&mut self, prompt: &str) {
        self.items.push(Item {
            msg: ModelMessage::System(prompt.to_owned()),
            transcript: prompt.to_owned(),
        });
    }

    pub(crate) fn push_user(&mut self, input: &str) {
        self.items.push(Item {
            msg: ModelMessage::User(input.to_owned()),
            transcript: input.to_owned(),
        });
    }

    pub(crate) fn push_model_response(&mut self, resp: &ModelClientResponse) {
        let transcript = resp.transcript.clone();
        let msg = if let Some(opaque_msg) = &resp.opaque_msg {
            ModelMessage::Opaque(opaque_msg.clone())
        } else {
            // Downgrade to a text-only message.
            ModelMessage::Assistant(transcript.clone())
        };
        self.items.push(Item { msg, transcript });
    }

    pub(crate) fn push_tool_results(&mut self, results: Vec<ToolCallResult>) {
        let transcript = results
            .iter()
            .map(|r| format!("{}: {}", r.name, r.outcome.text()))
            .collect::<Vec<_>>()
            .join("\n");
        self.items.push(Item {
            msg: ModelMessage::ToolResults(results),
            transcript,
        });
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
}

impl Item {
    /// Returns the message sent to the model for this item.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}
