use crate::registry::TypeRegistry;

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CodecOptions {
    pub blog: Option<String>,           // owning blog for posts without a tumblelog attribute
    pub identity: Option<String>,       // archive owner's display name (conversations)
    pub participant_id: Option<String>, // owner's platform id, if it differs from the name
    pub registry: TypeRegistry,
    pub progress: bool,                 // show progress bar
    pub progress_label: Option<String>, // optional label for progress bar

    // IO tuning
    pub read_buffer_bytes: usize,  // BufReader capacity
    pub write_buffer_bytes: usize, // BufWriter capacity

    // output formatting
    pub human_readable_timestamps: bool, // convert unix timestamps to RFC3339 strings in NDJSON
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            blog: None,
            identity: None,
            participant_id: None,
            registry: TypeRegistry::standard(),
            progress: false,
            progress_label: None,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
            human_readable_timestamps: false,
        }
    }
}

impl CodecOptions {
    pub fn with_blog(mut self, blog: impl AsRef<str>) -> Self {
        self.blog = Some(blog.as_ref().trim().to_string());
        self
    }
    pub fn with_identity(mut self, name: impl AsRef<str>) -> Self {
        self.identity = Some(name.as_ref().trim().to_string());
        self
    }
    pub fn with_participant_id(mut self, id: impl AsRef<str>) -> Self {
        self.participant_id = Some(id.as_ref().trim().to_string());
        self
    }
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }

    // IO buffers tuning
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }

    // Output: human-readable timestamps
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_readable_timestamps = yes;
        self
    }
}
