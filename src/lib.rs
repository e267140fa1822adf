mod config;
mod error;
mod model;
mod registry;

mod cursor;
mod post_reader;
mod post_writer;
mod convo_reader;

mod sink;
mod ndjson;
mod progress;
mod streaming;
mod util;
mod pipeline;

pub use crate::config::CodecOptions;
pub use crate::error::{CodecError, Result};
pub use crate::model::{
    normalize_participant_name, Answer, Conversation, ConversationMessage, Hashtag, Link, MessageKind, Payload,
    Photo, PhotoSize, Post, PostType, Regular, Video,
};
pub use crate::registry::TypeRegistry;
pub use crate::pipeline::TevCodec;

// Low-level cursor for callers that read other elements of the same exports.
pub use crate::cursor::{Element, Node, XmlCursor};

// Readers and writer usable without the file-level facade.
pub use crate::post_reader::{read_posts, ParsedPost, PostReader};
pub use crate::post_writer::{render_posts, write_posts};
pub use crate::convo_reader::{
    detect_main_participant, read_conversations, ConversationReader, MainParticipant, ParsedConversation,
};

// Collaborator traits and bundled implementations.
pub use crate::sink::{ConversationSink, ImportStats, MemoryStore, PostSink, PostSource};
pub use crate::ndjson::{NdjsonSink, NdjsonWriter};

// Expose progress helpers.
pub use crate::progress::{file_size, make_progress_bar_labeled};

// Input/output plumbing and robust file ops, so binaries can import from crate root.
pub use crate::streaming::{create_output, open_input, OutputFile};
pub use crate::util::{init_tracing_once, open_with_backoff, create_with_backoff, remove_with_backoff, replace_file_atomic_backoff};
