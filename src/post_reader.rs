//! Streaming reader for the `<posts>` export document.
//!
//! Each `<post>` becomes one [`Post`] plus exactly one [`Payload`]. Posts are handed
//! out one at a time as their closing tag is reached; nothing is buffered beyond the
//! post currently being read.

use crate::cursor::{Element, XmlCursor};
use crate::error::{CodecError, Result};
use crate::model::{Answer, Hashtag, Link, Payload, Photo, PhotoSize, Post, PostType, Regular, Video};
use crate::registry::TypeRegistry;
use crate::sink::{ImportStats, PostSink};
use std::io::BufRead;

/// One fully read `<post>` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedPost {
    pub post: Post,
    pub payload: Payload,
}

pub struct PostReader<'a, R: BufRead> {
    cursor: XmlCursor<R>,
    registry: &'a TypeRegistry,
    blog: Option<String>,
    done: bool,
}

impl<'a, R: BufRead> PostReader<'a, R> {
    pub fn new(inner: R, registry: &'a TypeRegistry) -> Self {
        Self { cursor: XmlCursor::new(inner), registry, blog: None, done: false }
    }

    /// Owning blog for posts that carry no `tumblelog` attribute.
    pub fn with_blog(mut self, blog: impl Into<String>) -> Self {
        self.blog = Some(blog.into());
        self
    }

    /// Read the next post, or `None` at end of document.
    pub fn next_post(&mut self) -> Result<Option<ParsedPost>> {
        let el = match self.cursor.seek("post")? {
            Some(el) => el,
            None => return Ok(None),
        };
        let mut post = read_post_attributes(&el, self.registry)?;
        if post.tumblelog.is_empty() {
            if let Some(blog) = &self.blog {
                post.tumblelog = blog.clone();
            }
        }
        let payload = match post.post_type {
            PostType::Regular => Payload::Regular(read_regular(&mut self.cursor, el, &mut post)?),
            PostType::Answer => Payload::Answer(read_answer(&mut self.cursor, el, &mut post)?),
            PostType::Link => Payload::Link(read_link(&mut self.cursor, el, &mut post)?),
            PostType::Photo => Payload::Photos { photos: read_photos(&mut self.cursor, el, &mut post)? },
            PostType::Video => Payload::Video(read_video(&mut self.cursor, el, &mut post)?),
        };
        Ok(Some(ParsedPost { post, payload }))
    }
}

impl<R: BufRead> Iterator for PostReader<'_, R> {
    type Item = Result<ParsedPost>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_post() {
            Ok(Some(p)) => Some(Ok(p)),
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

/// Parse a whole document into `sink`: per post, `save_post`, `save_payload`, then
/// one `save_hashtag` per tag. The first error aborts the import.
pub fn read_posts<R: BufRead, S: PostSink + ?Sized>(
    inner: R,
    registry: &TypeRegistry,
    blog: Option<&str>,
    sink: &mut S,
) -> Result<ImportStats> {
    let mut reader = PostReader::new(inner, registry);
    if let Some(b) = blog {
        reader = reader.with_blog(b);
    }
    let mut stats = ImportStats::default();
    while let Some(ParsedPost { post, payload }) = reader.next_post()? {
        sink.save_post(&post)?;
        if let Payload::Photos { photos } = &payload {
            stats.photos += photos.len() as u64;
        }
        sink.save_payload(&post.id, &payload)?;
        for tag in post.tag_list() {
            sink.save_hashtag(&Hashtag { tag: tag.to_string(), blog: post.tumblelog.clone() })?;
            stats.hashtags += 1;
        }
        stats.posts += 1;
    }
    Ok(stats)
}

fn parse_int<T: std::str::FromStr>(field: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| CodecError::number(field, value))
}

/// Empty means absent; anything else must be an integer.
fn parse_opt_int(field: &str, value: &str) -> Result<Option<u32>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_int(field, value).map(Some)
    }
}

fn read_post_attributes(el: &Element, registry: &TypeRegistry) -> Result<Post> {
    let type_name = el.attr("type").unwrap_or_default();
    let mut post = Post::new(String::new(), registry.post_type(type_name)?);
    let (mut has_id, mut has_timestamp) = (false, false);

    for (key, value) in el.attrs() {
        match key {
            "id" => {
                parse_int::<u64>("id", value)?;
                post.id = value.trim().to_string();
                has_id = true;
            }
            "url" => post.url = value.to_string(),
            "url-with-slug" => post.url_with_slug = value.to_string(),
            "date-gmt" => post.date_gmt = value.to_string(),
            "date" => post.date = value.to_string(),
            "unix-timestamp" => {
                post.unix_timestamp = parse_int("unix-timestamp", value)?;
                has_timestamp = true;
            }
            "reblog-key" => post.reblog_key = value.to_string(),
            "slug" => post.slug = value.to_string(),
            "state" => post.state = value.to_string(),
            "is_reblog" => post.is_reblog = value.trim().eq_ignore_ascii_case("true"),
            "tumblelog" => post.tumblelog = value.to_string(),
            "width" => post.width = parse_opt_int("width", value)?,
            "height" => post.height = parse_opt_int("height", value)?,
            // "type" was resolved above; "format" and anything else is ignored
            _ => {}
        }
    }
    if !has_id {
        return Err(CodecError::missing("post", "id"));
    }
    if !has_timestamp {
        return Err(CodecError::missing("post", "unix-timestamp"));
    }
    Ok(post)
}

fn read_regular<R: BufRead>(cur: &mut XmlCursor<R>, post_el: Element, post: &mut Post) -> Result<Regular> {
    let mut regular = Regular::default();
    while let Some(child) = cur.next_element(&post_el)? {
        match child.name() {
            "regular-title" => regular.title = Some(cur.text(child)?).filter(|t| !t.is_empty()),
            "regular-body" => regular.body = cur.text(child)?,
            "tag" => post.push_tag(&cur.text(child)?),
            _ => cur.skip(child)?,
        }
    }
    Ok(regular)
}

fn read_answer<R: BufRead>(cur: &mut XmlCursor<R>, post_el: Element, post: &mut Post) -> Result<Answer> {
    let mut answer = Answer::default();
    while let Some(child) = cur.next_element(&post_el)? {
        match child.name() {
            "question" => answer.question = cur.text(child)?,
            "answer" => answer.answer = cur.text(child)?,
            "tag" => post.push_tag(&cur.text(child)?),
            _ => cur.skip(child)?,
        }
    }
    Ok(answer)
}

fn read_link<R: BufRead>(cur: &mut XmlCursor<R>, post_el: Element, post: &mut Post) -> Result<Link> {
    let mut link = Link::default();
    while let Some(child) = cur.next_element(&post_el)? {
        match child.name() {
            "link-text" => link.text = Some(cur.text(child)?),
            "link-url" => link.url = cur.text(child)?,
            "link-description" => link.description = Some(cur.text(child)?),
            "tag" => post.push_tag(&cur.text(child)?),
            _ => cur.skip(child)?,
        }
    }
    Ok(link)
}

fn read_photo_url<R: BufRead>(cur: &mut XmlCursor<R>, el: Element, photo: &mut Photo) -> Result<()> {
    match el.attr("max-width").and_then(PhotoSize::from_max_width) {
        Some(size) => photo.set_url(size, cur.text(el)?),
        None => cur.skip(el)?,
    }
    Ok(())
}

/// Photo posts repeat the first photo's URLs directly under `<post>`. A `<photoset>`
/// is present only for multi-photo posts; when it is, the root-level copy is dropped.
fn read_photos<R: BufRead>(cur: &mut XmlCursor<R>, post_el: Element, post: &mut Post) -> Result<Vec<Photo>> {
    let mut root = Photo::default();
    let mut caption = String::new();
    let mut link_url = None;
    let mut photos = Vec::new();

    while let Some(child) = cur.next_element(&post_el)? {
        match child.name() {
            "photo-caption" => caption = cur.text(child)?,
            "photo-link-url" => link_url = Some(cur.text(child)?),
            "photo-url" => read_photo_url(cur, child, &mut root)?,
            "photoset" => read_photoset(cur, child, &mut photos)?,
            "tag" => post.push_tag(&cur.text(child)?),
            _ => cur.skip(child)?,
        }
    }

    if photos.is_empty() {
        root.width = post.width;
        root.height = post.height;
        photos.push(root);
    }
    for photo in &mut photos {
        photo.post_id = post.id.clone();
        photo.caption = caption.clone();
        photo.link_url = link_url.clone();
    }
    Ok(photos)
}

fn read_photoset<R: BufRead>(cur: &mut XmlCursor<R>, set_el: Element, photos: &mut Vec<Photo>) -> Result<()> {
    while let Some(child) = cur.next_element(&set_el)? {
        if child.name() != "photo" {
            cur.skip(child)?;
            continue;
        }
        let mut photo = Photo {
            offset: child.attr("offset").unwrap_or_default().to_string(),
            width: parse_opt_int("width", child.attr("width").unwrap_or_default())?,
            height: parse_opt_int("height", child.attr("height").unwrap_or_default())?,
            ..Photo::default()
        };
        while let Some(url_el) = cur.next_element(&child)? {
            if url_el.name() == "photo-url" {
                read_photo_url(cur, url_el, &mut photo)?;
            } else {
                cur.skip(url_el)?;
            }
        }
        photos.push(photo);
    }
    Ok(())
}

fn read_video<R: BufRead>(cur: &mut XmlCursor<R>, post_el: Element, post: &mut Post) -> Result<Video> {
    let mut video = Video::default();
    while let Some(child) = cur.next_element(&post_el)? {
        match child.name() {
            "video-source" => read_video_source(cur, child, &mut video)?,
            "video-caption" => video.caption = cur.text(child)?,
            "tag" => post.push_tag(&cur.text(child)?),
            // video-player embed markup is not kept
            _ => cur.skip(child)?,
        }
    }
    Ok(video)
}

fn read_video_source<R: BufRead>(cur: &mut XmlCursor<R>, source_el: Element, video: &mut Video) -> Result<()> {
    while let Some(child) = cur.next_element(&source_el)? {
        match child.name() {
            "content-type" => video.content_type = cur.text(child)?,
            "extension" => video.extension = cur.text(child)?,
            "width" => video.width = parse_opt_int("width", &cur.text(child)?)?,
            "height" => video.height = parse_opt_int("height", &cur.text(child)?)?,
            "duration" => video.duration = parse_opt_int("duration", &cur.text(child)?)?,
            "revision" => video.revision = cur.text(child)?,
            _ => cur.skip(child)?,
        }
    }
    Ok(())
}
