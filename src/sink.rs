//! Persistence boundary: the capabilities the codec needs from its caller, plus an
//! in-memory implementation used by the binary and the tests.

use crate::model::{Conversation, ConversationMessage, Hashtag, Payload, Post, PostType};
use ahash::AHashMap;
use anyhow::{anyhow, Result};

/// Counters reported by the import drivers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub posts: u64,
    pub photos: u64,
    pub hashtags: u64,
    pub conversations: u64,
    pub messages: u64,
}

/// Receives records as the post reader produces them, in document order.
pub trait PostSink {
    fn save_post(&mut self, post: &Post) -> Result<()>;
    fn save_payload(&mut self, post_id: &str, payload: &Payload) -> Result<()>;
    fn save_hashtag(&mut self, _tag: &Hashtag) -> Result<()> {
        Ok(())
    }
}

/// Supplies stored records to the post writer.
pub trait PostSource {
    fn get_post(&self, blog: &str, id: &str) -> Result<Post>;
    fn get_payload(&self, blog: &str, id: &str, kind: PostType) -> Result<Payload>;
}

/// Receives conversations; `save_conversation` returns the id assigned to the parent,
/// which is stamped onto every message before `save_message`.
pub trait ConversationSink {
    fn save_conversation(&mut self, convo: &Conversation) -> Result<u64>;
    fn save_message(&mut self, msg: &ConversationMessage) -> Result<()>;
}

/// In-memory store keyed by (blog, post id). Re-importing a post replaces it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: AHashMap<(String, String), Post>,
    payloads: AHashMap<(String, String), Payload>,
    post_order: Vec<(String, String)>,
    hashtags: AHashMap<Hashtag, u64>,
    conversations: Vec<Conversation>,
    messages: Vec<ConversationMessage>,
    // blog of the post most recently passed to save_post; payloads follow their post
    current_blog: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, blog: &str, id: &str) -> Option<&Post> {
        self.posts.get(&(blog.to_string(), id.to_string()))
    }

    pub fn payload(&self, blog: &str, id: &str) -> Option<&Payload> {
        self.payloads.get(&(blog.to_string(), id.to_string()))
    }

    /// Ids of the posts stored for `blog`, in first-import order.
    pub fn post_ids(&self, blog: &str) -> Vec<String> {
        self.post_order.iter().filter(|(b, _)| b == blog).map(|(_, id)| id.clone()).collect()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Usage count of a tag on `blog` across everything imported.
    pub fn hashtag_count(&self, blog: &str, tag: &str) -> u64 {
        let key = Hashtag { tag: tag.to_string(), blog: blog.to_string() };
        self.hashtags.get(&key).copied().unwrap_or(0)
    }

    pub fn hashtags(&self) -> impl Iterator<Item = (&Hashtag, u64)> {
        self.hashtags.iter().map(|(h, n)| (h, *n))
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Messages of the conversation with id `convo_id`, in import order.
    pub fn messages_for(&self, convo_id: u64) -> Vec<&ConversationMessage> {
        self.messages.iter().filter(|m| m.conversation_id == Some(convo_id)).collect()
    }

    pub fn conversation_by_participant(&self, participant: &str) -> Option<(u64, &Conversation)> {
        self.conversations
            .iter()
            .enumerate()
            .find(|(_, c)| c.participant == participant)
            .map(|(i, c)| (i as u64 + 1, c))
    }
}

impl PostSink for MemoryStore {
    fn save_post(&mut self, post: &Post) -> Result<()> {
        let key = (post.tumblelog.clone(), post.id.clone());
        if self.posts.insert(key.clone(), post.clone()).is_none() {
            self.post_order.push(key);
        }
        self.current_blog = post.tumblelog.clone();
        Ok(())
    }

    fn save_payload(&mut self, post_id: &str, payload: &Payload) -> Result<()> {
        self.payloads.insert((self.current_blog.clone(), post_id.to_string()), payload.clone());
        Ok(())
    }

    fn save_hashtag(&mut self, tag: &Hashtag) -> Result<()> {
        *self.hashtags.entry(tag.clone()).or_insert(0) += 1;
        Ok(())
    }
}

impl PostSource for MemoryStore {
    fn get_post(&self, blog: &str, id: &str) -> Result<Post> {
        self.post(blog, id).cloned().ok_or_else(|| anyhow!("post {id} not found for blog {blog}"))
    }

    fn get_payload(&self, blog: &str, id: &str, kind: PostType) -> Result<Payload> {
        let payload = self.payload(blog, id).ok_or_else(|| anyhow!("no {kind} payload for post {id} on blog {blog}"))?;
        Ok(payload.clone())
    }
}

impl ConversationSink for MemoryStore {
    fn save_conversation(&mut self, convo: &Conversation) -> Result<u64> {
        self.conversations.push(convo.clone());
        Ok(self.conversations.len() as u64)
    }

    fn save_message(&mut self, msg: &ConversationMessage) -> Result<()> {
        if msg.conversation_id.is_none() {
            return Err(anyhow!("message has no parent conversation"));
        }
        self.messages.push(msg.clone());
        Ok(())
    }
}
