//! Reader for the `<conversations>` messaging export.
//!
//! Every conversation lists exactly two participants, one of whom is the archive
//! owner. Only the other one is kept on the [`Conversation`] record.

use crate::cursor::{Element, XmlCursor};
use crate::error::{CodecError, Result};
use crate::model::{normalize_participant_name, Conversation, ConversationMessage, MessageKind};
use crate::sink::{ConversationSink, ImportStats};
use ahash::{AHashMap, AHashSet};
use std::cmp::Reverse;
use std::io::BufRead;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedConversation {
    pub conversation: Conversation,
    pub messages: Vec<ConversationMessage>,
}

pub struct ConversationReader<R: BufRead> {
    cursor: XmlCursor<R>,
    identity: String,
    participant_id: Option<String>,
    blog: Option<String>,
    done: bool,
}

impl<R: BufRead> ConversationReader<R> {
    /// `identity` is the owner's display name. Unless overridden with
    /// [`with_participant_id`](Self::with_participant_id), it is also what message
    /// `participant` attributes are compared against to decide direction.
    pub fn new(inner: R, identity: impl Into<String>) -> Self {
        Self {
            cursor: XmlCursor::new(inner),
            identity: identity.into(),
            participant_id: None,
            blog: None,
            done: false,
        }
    }

    pub fn with_participant_id(mut self, id: impl Into<String>) -> Self {
        self.participant_id = Some(id.into());
        self
    }

    pub fn with_blog(mut self, blog: impl Into<String>) -> Self {
        self.blog = Some(blog.into());
        self
    }

    fn my_id(&self) -> &str {
        self.participant_id.as_deref().unwrap_or(&self.identity)
    }

    pub fn next_conversation(&mut self) -> Result<Option<ParsedConversation>> {
        let convo_el = match self.cursor.seek("conversation")? {
            Some(el) => el,
            None => return Ok(None),
        };
        let identity = self.identity.clone();
        let my_id = self.my_id().to_string();

        let mut conversation = Conversation { blog: self.blog.clone(), ..Conversation::default() };
        let mut messages = Vec::new();

        while let Some(child) = self.cursor.next_element(&convo_el)? {
            match child.name() {
                "participants" => read_participants(&mut self.cursor, child, &identity, &mut conversation)?,
                "messages" => {
                    while let Some(msg_el) = self.cursor.next_element(&child)? {
                        if msg_el.name() == "message" {
                            messages.push(read_message(&mut self.cursor, msg_el, &my_id)?);
                        } else {
                            self.cursor.skip(msg_el)?;
                        }
                    }
                }
                "message" => messages.push(read_message(&mut self.cursor, child, &my_id)?),
                _ => self.cursor.skip(child)?,
            }
        }

        conversation.participant_id = first_inbound_sender(&messages);
        conversation.num_messages = messages.len();
        Ok(Some(ParsedConversation { conversation, messages: messages.into_iter().map(|(m, _)| m).collect() }))
    }
}

impl<R: BufRead> Iterator for ConversationReader<R> {
    type Item = Result<ParsedConversation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_conversation() {
            Ok(Some(c)) => Some(Ok(c)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse a whole document into `sink`. Each conversation is saved first; the id it
/// gets back is stamped on the messages, which are then saved in document order.
pub fn read_conversations<R: BufRead, S: ConversationSink + ?Sized>(
    reader: ConversationReader<R>,
    sink: &mut S,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    for parsed in reader {
        let ParsedConversation { conversation, messages } = parsed?;
        let convo_id = sink.save_conversation(&conversation)?;
        for mut msg in messages {
            msg.conversation_id = Some(convo_id);
            sink.save_message(&msg)?;
            stats.messages += 1;
        }
        stats.conversations += 1;
    }
    Ok(stats)
}

/// The platform id of the other participant: the sender of the first received message.
fn first_inbound_sender(messages: &[(ConversationMessage, String)]) -> Option<String> {
    messages.iter().find(|(m, _)| m.received).map(|(_, sender)| sender.clone())
}

/// With malformed input where neither or both names match `identity`, the last
/// non-matching participant read is the one kept.
fn read_participants<R: BufRead>(
    cur: &mut XmlCursor<R>,
    block: Element,
    identity: &str,
    conversation: &mut Conversation,
) -> Result<()> {
    while let Some(el) = cur.next_element(&block)? {
        if el.name() != "participant" {
            cur.skip(el)?;
            continue;
        }
        let avatar = el.attr("avatar_url").unwrap_or_default().to_string();
        let name = cur.text(el)?;
        if name != identity {
            conversation.participant = normalize_participant_name(&name).to_string();
            conversation.participant_avatar_url = avatar;
        }
    }
    Ok(())
}

/// Returns the message together with its raw `participant` attribute.
fn read_message<R: BufRead>(
    cur: &mut XmlCursor<R>,
    el: Element,
    my_id: &str,
) -> Result<(ConversationMessage, String)> {
    let ts = el.attr("ts").unwrap_or_default();
    let timestamp: i64 = ts.trim().parse().map_err(|_| CodecError::number("ts", ts))?;
    let sender = el.attr("participant").unwrap_or_default().to_string();
    // messages without a type attribute are plain text
    let kind: MessageKind = el.attr("type").unwrap_or("TEXT").parse()?;

    let message = if kind == MessageKind::Image {
        let mut url = String::new();
        while let Some(child) = cur.next_element(&el)? {
            if child.name() == "photo-url" {
                url = cur.text(child)?;
            } else {
                cur.skip(child)?;
            }
        }
        url
    } else {
        cur.text(el)?
    };

    let msg = ConversationMessage { conversation_id: None, timestamp, received: sender != my_id, kind, message };
    Ok((msg, sender))
}

/// The archive owner as inferred from a whole export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainParticipant {
    pub name: String,
    pub avatar_url: String,
    pub participant_id: Option<String>,
}

/// Per-value tally across conversations: first-seen rank, conversation count, avatar.
type Tally = AHashMap<String, (usize, usize, String)>;

/// Find the owner of an export without being told: the participant name that shows
/// up in more than one conversation, and the message sender id that does likewise.
/// `None` when no name repeats (for instance a single-conversation export).
pub fn detect_main_participant<R: BufRead>(inner: R) -> Result<Option<MainParticipant>> {
    let mut cur = XmlCursor::new(inner);
    let mut names: Tally = AHashMap::new();
    let mut senders: Tally = AHashMap::new();

    while let Some(convo_el) = cur.seek("conversation")? {
        let mut seen = Identities::default();
        collect_identities(&mut cur, &convo_el, &mut seen)?;
        for (name, avatar) in seen.names {
            tally(&mut names, name, avatar);
        }
        for sender in seen.senders {
            tally(&mut senders, sender, String::new());
        }
    }

    let best_sender = most_repeated(senders).map(|(s, _)| s);
    Ok(most_repeated(names).map(|(name, avatar_url)| MainParticipant {
        name,
        avatar_url,
        participant_id: best_sender,
    }))
}

fn tally(counts: &mut Tally, key: String, extra: String) {
    let rank = counts.len();
    counts.entry(key).or_insert((rank, 0, extra)).1 += 1;
}

/// Highest count above one; ties go to whichever was seen first.
fn most_repeated(counts: Tally) -> Option<(String, String)> {
    counts
        .into_iter()
        .filter(|(_, (_, n, _))| *n > 1)
        .min_by_key(|(_, (rank, n, _))| (Reverse(*n), *rank))
        .map(|(key, (_, _, extra))| (key, extra))
}

/// Distinct names (with avatar, first occurrence) and senders of one conversation,
/// each list in document order.
#[derive(Default)]
struct Identities {
    names: Vec<(String, String)>,
    senders: Vec<String>,
    seen_names: AHashSet<String>,
    seen_senders: AHashSet<String>,
}

/// Walk `parent` at any depth, recording participants and message senders.
fn collect_identities<R: BufRead>(cur: &mut XmlCursor<R>, parent: &Element, seen: &mut Identities) -> Result<()> {
    while let Some(el) = cur.next_element(parent)? {
        match el.name() {
            "participant" => {
                let avatar = el.attr("avatar_url").unwrap_or_default().to_string();
                let name = cur.text(el)?;
                if seen.seen_names.insert(name.clone()) {
                    seen.names.push((name, avatar));
                }
            }
            "message" => {
                if let Some(sender) = el.attr("participant") {
                    if seen.seen_senders.insert(sender.to_string()) {
                        seen.senders.push(sender.to_string());
                    }
                }
                cur.skip(el)?;
            }
            _ => collect_identities(cur, &el, seen)?,
        }
    }
    Ok(())
}
