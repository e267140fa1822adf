use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tev_codec::{MemoryStore, TevCodec};

#[derive(Parser)]
#[command(name = "tev-codec")]
#[command(about = "Read and write blog post and conversation XML exports")]
#[command(version)]
struct Cli {
    /// Hide the progress bar
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a posts export (.xml or .xml.zst) into NDJSON records
    Posts {
        input: PathBuf,
        output: PathBuf,

        /// Owning blog for posts without a tumblelog attribute
        #[arg(long)]
        blog: Option<String>,

        /// Write unix timestamps as RFC3339 strings
        #[arg(long)]
        human_timestamps: bool,
    },

    /// Import a messaging export into NDJSON records
    Conversations {
        input: PathBuf,
        output: PathBuf,

        /// Archive owner's display name; detected from the file when omitted
        #[arg(long)]
        identity: Option<String>,

        /// Owner's platform id, when messages use one distinct from the name
        #[arg(long)]
        participant_id: Option<String>,

        /// Blog the conversations belong to
        #[arg(long)]
        blog: Option<String>,

        #[arg(long)]
        human_timestamps: bool,
    },

    /// Re-emit a blog's posts from an export as a fresh export document
    Export {
        input: PathBuf,
        output: PathBuf,

        #[arg(long)]
        blog: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let codec = TevCodec::new().progress(!cli.quiet);

    match cli.command {
        Commands::Posts { input, output, blog, human_timestamps } => {
            let mut codec = codec.timestamps_human_readable(human_timestamps);
            if let Some(blog) = blog {
                codec = codec.blog(blog);
            }
            let stats = codec.posts_to_ndjson(&input, &output)?;
            println!("{} posts, {} photos, {} tags", stats.posts, stats.photos, stats.hashtags);
        }
        Commands::Conversations { input, output, identity, participant_id, blog, human_timestamps } => {
            let mut codec = codec.timestamps_human_readable(human_timestamps);
            if let Some(identity) = identity {
                codec = codec.identity(identity);
            }
            if let Some(pid) = participant_id {
                codec = codec.participant_id(pid);
            }
            if let Some(blog) = blog {
                codec = codec.blog(blog);
            }
            let stats = codec.conversations_to_ndjson(&input, &output)?;
            println!("{} conversations, {} messages", stats.conversations, stats.messages);
        }
        Commands::Export { input, output, blog } => {
            let codec = codec.blog(&blog);
            let mut store = MemoryStore::new();
            codec.import_posts(&input, &mut store)?;
            let ids = store.post_ids(&blog);
            codec.export_posts(&output, &ids, &store)?;
            println!("exported {} posts to {}", ids.len(), output.display());
        }
    }
    Ok(())
}
