use crate::model::{Conversation, ConversationMessage, Hashtag, Payload, Post};
use crate::sink::{ConversationSink, PostSink};
use crate::util::{create_with_backoff, replace_file_atomic_backoff};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Minimal NDJSON writer with buffering and robust file creation.
/// `write_line` appends the `\n` terminator.
pub struct NdjsonWriter {
    path: PathBuf,
    w: Option<BufWriter<File>>,
}

impl NdjsonWriter {
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        let f = create_with_backoff(path, 16, 50)?;
        Ok(Self { path: path.to_path_buf(), w: Some(BufWriter::with_capacity(buf_bytes.max(8 * 1024), f)) })
    }

    #[inline]
    pub fn write_line(&mut self, s: &str) -> io::Result<()> {
        if let Some(w) = &mut self.w {
            w.write_all(s.as_bytes())?;
            w.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush()?;
        }
        Ok(())
    }

    /// Flushes and atomically promotes the temp file to `final_path`.
    /// Use when the writer was created on a temp location.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        if let Some(mut w) = self.w.take() {
            w.flush().with_context(|| format!("flush {}", self.path.display()))?;
        }
        replace_file_atomic_backoff(&self.path, final_path)
    }
}

fn apply_human_timestamp_in_place(map: &mut Map<String, Value>, key: &str) {
    if let Some(v) = map.get_mut(key) {
        if let Some(n) = v.as_i64() {
            if let Ok(dt) = OffsetDateTime::from_unix_timestamp(n) {
                if let Ok(s) = dt.format(&Rfc3339) {
                    *v = Value::String(s);
                }
            }
        }
    }
}

/// Record sink that writes every saved record as one JSON line:
/// `{"record":"post",...}`, `{"record":"payload","post_id":..,...}`,
/// `{"record":"hashtag",...}`, `{"record":"conversation","id":..,...}`, `{"record":"message",...}`.
///
/// Conversation ids are assigned sequentially from 1.
pub struct NdjsonSink {
    writer: NdjsonWriter,
    human_timestamps: bool,
    next_conversation_id: u64,
    lines: u64,
}

impl NdjsonSink {
    pub fn new(writer: NdjsonWriter) -> Self {
        Self { writer, human_timestamps: false, next_conversation_id: 1, lines: 0 }
    }

    /// Render `unix_timestamp` / `timestamp` fields as RFC3339 strings.
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_timestamps = yes;
        self
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_writer(self) -> NdjsonWriter {
        self.writer
    }

    fn emit<T: Serialize>(&mut self, record: &str, value: &T, extra: &[(&str, Value)]) -> Result<()> {
        let mut val = serde_json::to_value(value)?;
        let obj = match val.as_object_mut() {
            Some(obj) => obj,
            None => anyhow::bail!("{record} did not serialize to a JSON object"),
        };
        if self.human_timestamps {
            apply_human_timestamp_in_place(obj, "unix_timestamp");
            apply_human_timestamp_in_place(obj, "timestamp");
        }
        let mut line = Map::with_capacity(obj.len() + extra.len() + 1);
        line.insert("record".to_string(), Value::String(record.to_string()));
        for (k, v) in extra {
            line.insert((*k).to_string(), v.clone());
        }
        line.extend(std::mem::take(obj));
        let s = serde_json::to_string(&Value::Object(line))?;
        self.writer.write_line(&s).with_context(|| format!("write {record} record"))?;
        self.lines += 1;
        Ok(())
    }
}

impl PostSink for NdjsonSink {
    fn save_post(&mut self, post: &Post) -> Result<()> {
        self.emit("post", post, &[])
    }

    fn save_payload(&mut self, post_id: &str, payload: &Payload) -> Result<()> {
        self.emit("payload", payload, &[("post_id", json!(post_id))])
    }

    fn save_hashtag(&mut self, tag: &Hashtag) -> Result<()> {
        self.emit("hashtag", tag, &[])
    }
}

impl ConversationSink for NdjsonSink {
    fn save_conversation(&mut self, convo: &Conversation) -> Result<u64> {
        let id = self.next_conversation_id;
        self.emit("conversation", convo, &[("id", json!(id))])?;
        self.next_conversation_id += 1;
        Ok(id)
    }

    fn save_message(&mut self, msg: &ConversationMessage) -> Result<()> {
        self.emit("message", msg, &[])
    }
}
