use crate::config::CodecOptions;
use crate::convo_reader::{detect_main_participant, read_conversations, ConversationReader, MainParticipant};
use crate::ndjson::{NdjsonSink, NdjsonWriter};
use crate::post_reader::read_posts;
use crate::post_writer::{render_posts, write_posts};
use crate::progress::{file_size, make_progress_bar_labeled};
use crate::registry::TypeRegistry;
use crate::sink::{ConversationSink, ImportStats, PostSink, PostSource};
use crate::streaming::{create_output, open_input};
use crate::util::{init_tracing_once, remove_with_backoff, replace_file_atomic_backoff};
use anyhow::{anyhow, Context, Result};
use indicatif::ProgressBar;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// File-level entry point: configure with the builder methods, then import or export.
#[derive(Clone, Default)]
pub struct TevCodec {
    pub(crate) opts: CodecOptions,
}

impl TevCodec {
    pub fn new() -> Self {
        Self { opts: CodecOptions::default() }
    }

    pub fn with_options(opts: CodecOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn blog(mut self, blog: impl AsRef<str>) -> Self { self.opts = self.opts.with_blog(blog); self }
    pub fn identity(mut self, name: impl AsRef<str>) -> Self { self.opts = self.opts.with_identity(name); self }
    pub fn participant_id(mut self, id: impl AsRef<str>) -> Self { self.opts = self.opts.with_participant_id(id); self }
    pub fn registry(mut self, registry: TypeRegistry) -> Self { self.opts = self.opts.with_registry(registry); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn io_write_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_write_buffer(bytes); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }
    pub fn timestamps_human_readable(mut self, yes: bool) -> Self { self.opts = self.opts.with_human_timestamps(yes); self }

    // -------- Operations --------

    /// Import a posts export (`.xml` or `.xml.zst`) into `sink`.
    pub fn import_posts<S: PostSink + ?Sized>(&self, path: &Path, sink: &mut S) -> Result<ImportStats> {
        init_tracing_once();
        let started = Instant::now();
        let pb = self.progress_bar(path);
        let input = open_input(path, self.opts.read_buffer_bytes, pb.clone())?;

        let stats = read_posts(input, &self.opts.registry, self.opts.blog.as_deref(), sink)
            .with_context(|| format!("importing posts from {}", path.display()))?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!(
            posts = stats.posts,
            photos = stats.photos,
            hashtags = stats.hashtags,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "imported posts from {}",
            path.display()
        );
        Ok(stats)
    }

    /// Import a messaging export into `sink`. The owner identity comes from
    /// [`identity`](Self::identity) or, failing that, is detected from the file.
    pub fn import_conversations<S: ConversationSink + ?Sized>(&self, path: &Path, sink: &mut S) -> Result<ImportStats> {
        init_tracing_once();
        let (identity, participant_id) = match &self.opts.identity {
            Some(name) => (name.clone(), self.opts.participant_id.clone()),
            None => {
                let main = self
                    .detect_identity(path)?
                    .ok_or_else(|| anyhow!("no identity configured and none could be detected in {}", path.display()))?;
                tracing::info!("detected archive owner `{}`", main.name);
                let pid = self.opts.participant_id.clone().or(main.participant_id);
                (main.name, pid)
            }
        };

        let started = Instant::now();
        let pb = self.progress_bar(path);
        let input = open_input(path, self.opts.read_buffer_bytes, pb.clone())?;
        let mut reader = ConversationReader::new(input, identity);
        if let Some(pid) = participant_id {
            reader = reader.with_participant_id(pid);
        }
        if let Some(blog) = &self.opts.blog {
            reader = reader.with_blog(blog.clone());
        }

        let stats = read_conversations(reader, sink)
            .with_context(|| format!("importing conversations from {}", path.display()))?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        tracing::info!(
            conversations = stats.conversations,
            messages = stats.messages,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "imported conversations from {}",
            path.display()
        );
        Ok(stats)
    }

    /// Scan a messaging export for the participant present in more than one conversation.
    pub fn detect_identity(&self, path: &Path) -> Result<Option<MainParticipant>> {
        init_tracing_once();
        let input: Box<dyn BufRead> = open_input(path, self.opts.read_buffer_bytes, None)?;
        let found = detect_main_participant(input).with_context(|| format!("scanning {}", path.display()))?;
        if found.is_none() {
            tracing::warn!("no participant repeats across conversations in {}", path.display());
        }
        Ok(found)
    }

    /// Write posts `ids` of the configured blog to `out` (zstd when it ends in `.zst`).
    /// Output goes to a temp file first and replaces `out` only once complete.
    pub fn export_posts<S, I>(&self, out: &Path, ids: &[I], source: &S) -> Result<()>
    where
        S: PostSource + ?Sized,
        I: AsRef<str>,
    {
        init_tracing_once();
        let blog = self.require_blog()?;
        let tmp = tmp_path_for(out);
        let file = create_output(&tmp, self.opts.write_buffer_bytes)?;
        let file = write_posts(file, ids, source, blog).with_context(|| format!("rendering posts of {blog}"))?;
        file.finish().with_context(|| format!("flush {}", tmp.display()))?;
        replace_file_atomic_backoff(&tmp, out)?;
        tracing::info!(posts = ids.len(), "exported posts of {} to {}", blog, out.display());
        Ok(())
    }

    /// Render posts `ids` of the configured blog to a string.
    pub fn export_posts_to_string<S, I>(&self, ids: &[I], source: &S) -> Result<String>
    where
        S: PostSource + ?Sized,
        I: AsRef<str>,
    {
        let blog = self.require_blog()?;
        Ok(render_posts(ids, source, blog)?)
    }

    /// NDJSON record sink at `path`, honouring the buffer and timestamp options.
    pub fn ndjson_sink(&self, path: &Path) -> Result<NdjsonSink> {
        let writer = NdjsonWriter::create(path, self.opts.write_buffer_bytes)
            .with_context(|| format!("create {}", path.display()))?;
        Ok(NdjsonSink::new(writer).with_human_timestamps(self.opts.human_readable_timestamps))
    }

    /// Import a posts export straight to an NDJSON file, promoted once complete.
    pub fn posts_to_ndjson(&self, input: &Path, out: &Path) -> Result<ImportStats> {
        self.to_ndjson(out, |sink| self.import_posts(input, sink))
    }

    /// Import a messaging export straight to an NDJSON file, promoted once complete.
    pub fn conversations_to_ndjson(&self, input: &Path, out: &Path) -> Result<ImportStats> {
        self.to_ndjson(out, |sink| self.import_conversations(input, sink))
    }

    fn to_ndjson<F>(&self, out: &Path, import: F) -> Result<ImportStats>
    where
        F: FnOnce(&mut NdjsonSink) -> Result<ImportStats>,
    {
        let tmp = tmp_path_for(out);
        let mut sink = self.ndjson_sink(&tmp)?;
        match import(&mut sink) {
            Ok(stats) => {
                sink.into_writer().finish_atomic(out)?;
                Ok(stats)
            }
            Err(e) => {
                drop(sink);
                remove_with_backoff(&tmp, 16, 50)?;
                Err(e)
            }
        }
    }

    fn require_blog(&self) -> Result<&str> {
        self.opts.blog.as_deref().ok_or_else(|| anyhow!("blog is required for export"))
    }

    fn progress_bar(&self, path: &Path) -> Option<ProgressBar> {
        if !self.opts.progress {
            return None;
        }
        let label = self.opts.progress_label.clone().unwrap_or_else(|| path.display().to_string());
        Some(make_progress_bar_labeled(file_size(path), Some(&label)))
    }
}

/// Sibling temp name that keeps the extension, so `.zst` detection still applies.
fn tmp_path_for(out: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".tmp-");
    name.push(out.file_name().unwrap_or_default());
    out.with_file_name(name)
}
