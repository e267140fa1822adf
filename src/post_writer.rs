//! Re-emits stored posts as a `<tumblr><posts>` document in the export schema.
//!
//! Element and attribute names, their order and nesting must match what the
//! platform's importer expects; indentation is only for readability.

use crate::error::{CodecError, Result};
use crate::model::{Answer, Link, Payload, Photo, PhotoSize, Post, PostType, Regular, Video};
use crate::sink::PostSource;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

const INDENT: usize = 2;

struct XmlOut<W: Write> {
    w: Writer<W>,
}

impl<W: Write> XmlOut<W> {
    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut el = BytesStart::new(name);
        for &(k, v) in attrs {
            el.push_attribute((k, v));
        }
        self.w.write_event(Event::Start(el))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.w.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<()> {
        self.start(name, attrs)?;
        self.w.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }
}

fn opt_num(v: Option<u32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}

/// Render the posts `ids` of `blog`, in the given order, to a UTF-8 string.
pub fn render_posts<S, I>(ids: &[I], source: &S, blog: &str) -> Result<String>
where
    S: PostSource + ?Sized,
    I: AsRef<str>,
{
    let bytes = write_posts(Vec::new(), ids, source, blog)?;
    String::from_utf8(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
}

/// Same as [`render_posts`] but streams into `out`, which is handed back when done.
pub fn write_posts<W, S, I>(out: W, ids: &[I], source: &S, blog: &str) -> Result<W>
where
    W: Write,
    S: PostSource + ?Sized,
    I: AsRef<str>,
{
    let mut x = XmlOut { w: Writer::new_with_indent(out, b' ', INDENT) };
    x.w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    x.start("tumblr", &[("version", "1.0")])?;
    x.start("posts", &[])?;

    for id in ids {
        let post = source.get_post(blog, id.as_ref())?;
        let payload = source.get_payload(blog, id.as_ref(), post.post_type)?;
        write_post(&mut x, &post, &payload)?;
    }

    x.end("posts")?;
    x.end("tumblr")?;
    let mut out = x.w.into_inner();
    out.write_all(b"\n")?;
    Ok(out)
}

fn mismatch(post: &Post, found: &str) -> CodecError {
    CodecError::PayloadMismatch {
        id: post.id.clone(),
        expected: post.post_type.to_string(),
        found: found.to_string(),
    }
}

fn write_post<W: Write>(x: &mut XmlOut<W>, post: &Post, payload: &Payload) -> Result<()> {
    let timestamp = post.unix_timestamp.to_string();
    let is_reblog = post.is_reblog.to_string();
    let mut attrs: Vec<(&str, &str)> = vec![
        ("id", post.id.as_str()),
        ("url", post.url.as_str()),
        ("url-with-slug", post.url_with_slug.as_str()),
        ("type", post.post_type.as_str()),
        ("date-gmt", post.date_gmt.as_str()),
        ("date", post.date.as_str()),
        ("unix-timestamp", timestamp.as_str()),
        ("format", "html"),
        ("reblog-key", post.reblog_key.as_str()),
        ("slug", post.slug.as_str()),
        ("state", post.state.as_str()),
        ("is_reblog", is_reblog.as_str()),
        ("tumblelog", post.tumblelog.as_str()),
    ];
    // a lone photo has no element of its own, so its size rides on the post
    let (mut w, mut h) = (post.width, post.height);
    if let Payload::Photos { photos } = payload {
        if let [only] = photos.as_slice() {
            w = w.or(only.width);
            h = h.or(only.height);
        }
    }
    let (width, height) = (opt_num(w), opt_num(h));
    if post.post_type == PostType::Photo {
        attrs.push(("width", width.as_str()));
        attrs.push(("height", height.as_str()));
    }
    x.start("post", &attrs)?;

    match (post.post_type, payload) {
        (PostType::Regular, Payload::Regular(r)) => write_regular(x, r)?,
        (PostType::Answer, Payload::Answer(a)) => write_answer(x, a)?,
        (PostType::Link, Payload::Link(l)) => write_link(x, l)?,
        (PostType::Photo, Payload::Photos { photos }) if !photos.is_empty() => write_photos(x, photos)?,
        (PostType::Photo, Payload::Photos { .. }) => return Err(mismatch(post, "empty photo list")),
        (PostType::Video, Payload::Video(v)) => write_video(x, v)?,
        (_, other) => return Err(mismatch(post, other.kind().as_str())),
    }

    for tag in post.tag_list() {
        x.text_element("tag", &[], tag)?;
    }
    x.end("post")
}

fn write_regular<W: Write>(x: &mut XmlOut<W>, regular: &Regular) -> Result<()> {
    if let Some(title) = regular.title.as_deref().filter(|t| !t.is_empty()) {
        x.text_element("regular-title", &[], title)?;
    }
    x.text_element("regular-body", &[], &regular.body)
}

fn write_answer<W: Write>(x: &mut XmlOut<W>, answer: &Answer) -> Result<()> {
    x.text_element("question", &[], &answer.question)?;
    x.text_element("answer", &[], &answer.answer)
}

fn write_link<W: Write>(x: &mut XmlOut<W>, link: &Link) -> Result<()> {
    if let Some(text) = &link.text {
        x.text_element("link-text", &[], text)?;
    }
    x.text_element("link-url", &[], &link.url)?;
    if let Some(desc) = &link.description {
        x.text_element("link-description", &[], desc)?;
    }
    Ok(())
}

fn write_photo_urls<W: Write>(x: &mut XmlOut<W>, photo: &Photo) -> Result<()> {
    for size in PhotoSize::ALL {
        x.text_element("photo-url", &[("max-width", size.max_width())], photo.url(size))?;
    }
    Ok(())
}

/// The first photo always goes directly under `<post>`; a `<photoset>` repeating
/// every photo (the first included) follows only when there is more than one.
fn write_photos<W: Write>(x: &mut XmlOut<W>, photos: &[Photo]) -> Result<()> {
    let first = &photos[0];
    x.text_element("photo-caption", &[], &first.caption)?;
    if let Some(link_url) = &first.link_url {
        x.text_element("photo-link-url", &[], link_url)?;
    }
    write_photo_urls(x, first)?;

    if photos.len() > 1 {
        x.start("photoset", &[])?;
        for photo in photos {
            let (width, height) = (opt_num(photo.width), opt_num(photo.height));
            x.start(
                "photo",
                &[("offset", photo.offset.as_str()), ("caption", ""), ("width", width.as_str()), ("height", height.as_str())],
            )?;
            write_photo_urls(x, photo)?;
            x.end("photo")?;
        }
        x.end("photoset")?;
    }
    Ok(())
}

fn write_video<W: Write>(x: &mut XmlOut<W>, video: &Video) -> Result<()> {
    x.start("video-source", &[])?;
    x.text_element("content-type", &[], &video.content_type)?;
    x.text_element("extension", &[], &video.extension)?;
    x.text_element("width", &[], &opt_num(video.width))?;
    x.text_element("height", &[], &opt_num(video.height))?;
    x.text_element("duration", &[], &opt_num(video.duration))?;
    x.text_element("revision", &[], &video.revision)?;
    x.end("video-source")?;
    x.text_element("video-caption", &[], &video.caption)
}
