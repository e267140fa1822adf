#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tev_codec::{MemoryStore, PostSink, TypeRegistry};

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Write a compressed `.zst` file containing `contents`.
pub fn write_zst(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.write_all(contents.as_bytes()).unwrap();
    enc.finish().unwrap();
}

/// Decompress a `.zst` file into a string.
pub fn read_zst(path: &Path) -> String {
    let f = File::open(path).unwrap();
    let bytes = zstd::stream::decode_all(f).unwrap();
    String::from_utf8(bytes).unwrap()
}

/// Read an NDJSON file into a vector of `serde_json::Value` (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<serde_json::Value> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines()
        .map(|l| l.unwrap())
        .filter(|s| !s.is_empty())
        .map(|s| serde_json::from_str(&s).unwrap())
        .collect()
}

/// Fresh temp directory that outlives the test (cleaned up by the OS).
pub fn temp_dir() -> PathBuf {
    tempfile::tempdir().unwrap().into_path()
}

/// Import `xml` with the standard registry into a fresh store.
pub fn import_str(xml: &str) -> MemoryStore {
    let mut store = MemoryStore::new();
    tev_codec::read_posts(xml.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap();
    store
}

/// Save a post and its payload directly, as an earlier import would have.
pub fn seed(store: &mut MemoryStore, post: &tev_codec::Post, payload: &tev_codec::Payload) {
    store.save_post(post).unwrap();
    store.save_payload(&post.id, payload).unwrap();
}

pub const BLOG: &str = "someblog";

/// Wrap `<post>` elements in the export document envelope.
pub fn posts_doc(posts: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<tumblr version=\"1.0\">\n<posts>\n{posts}\n</posts>\n</tumblr>\n")
}

/// One post of every type, in the shapes the platform exports them:
/// - regular 101 with title, body (escaped markup) and tags "a", "b", "c"
/// - answer 102
/// - link 103 without link-text
/// - photo 104 with a single photo (no photoset)
/// - photo 105 with a two-photo photoset
/// - video 106 with a video-player element that must be ignored
pub fn fixture_all_types() -> String {
    posts_doc(
        r#"<post id="101" url="https://someblog.example/post/101" url-with-slug="https://someblog.example/post/101/hello" type="regular" date-gmt="2020-01-02 03:04:05 GMT" date="Thu, 02 Jan 2020 03:04:05" unix-timestamp="1577934245" format="html" reblog-key="rk101" slug="hello" state="published" is_reblog="false" tumblelog="someblog">
  <regular-title>Hello</regular-title>
  <regular-body>&lt;p&gt;Body &amp; more&lt;/p&gt;</regular-body>
  <tag>a</tag>
  <tag>b</tag>
  <tag>c</tag>
</post>
<post id="102" url="u102" url-with-slug="u102s" type="answer" date-gmt="g" date="d" unix-timestamp="1577934246" format="html" reblog-key="rk102" slug="q" state="published" is_reblog="true" tumblelog="someblog">
  <question>Why?</question>
  <answer>Because.</answer>
</post>
<post id="103" url="u103" url-with-slug="u103s" type="link" date-gmt="g" date="d" unix-timestamp="1577934247" format="html" reblog-key="rk103" slug="l" state="published" is_reblog="false" tumblelog="someblog">
  <link-url>https://example.org/</link-url>
  <link-description>An example</link-description>
  <tag>links</tag>
</post>
<post id="104" url="u104" url-with-slug="u104s" type="photo" date-gmt="g" date="d" unix-timestamp="1577934248" format="html" reblog-key="rk104" slug="p" state="published" is_reblog="false" tumblelog="someblog" width="640" height="480">
  <photo-caption>One photo</photo-caption>
  <photo-url max-width="1280">p104_1280.jpg</photo-url>
  <photo-url max-width="500">p104_500.jpg</photo-url>
  <photo-url max-width="400">p104_400.jpg</photo-url>
  <photo-url max-width="250">p104_250.jpg</photo-url>
  <photo-url max-width="100">p104_100.jpg</photo-url>
  <photo-url max-width="75">p104_75.jpg</photo-url>
</post>
<post id="105" url="u105" url-with-slug="u105s" type="photo" date-gmt="g" date="d" unix-timestamp="1577934249" format="html" reblog-key="rk105" slug="ps" state="published" is_reblog="false" tumblelog="someblog" width="800" height="600">
  <photo-caption>Two photos</photo-caption>
  <photo-link-url>https://example.org/set</photo-link-url>
  <photo-url max-width="1280">o1_1280.jpg</photo-url>
  <photo-url max-width="500">o1_500.jpg</photo-url>
  <photo-url max-width="400">o1_400.jpg</photo-url>
  <photo-url max-width="250">o1_250.jpg</photo-url>
  <photo-url max-width="100">o1_100.jpg</photo-url>
  <photo-url max-width="75">o1_75.jpg</photo-url>
  <photoset>
    <photo offset="o1" caption="" width="800" height="600">
      <photo-url max-width="1280">o1_1280.jpg</photo-url>
      <photo-url max-width="500">o1_500.jpg</photo-url>
      <photo-url max-width="400">o1_400.jpg</photo-url>
      <photo-url max-width="250">o1_250.jpg</photo-url>
      <photo-url max-width="100">o1_100.jpg</photo-url>
      <photo-url max-width="75">o1_75.jpg</photo-url>
    </photo>
    <photo offset="o2" caption="" width="300" height="200">
      <photo-url max-width="1280">o2_1280.jpg</photo-url>
      <photo-url max-width="500">o2_500.jpg</photo-url>
      <photo-url max-width="400">o2_400.jpg</photo-url>
      <photo-url max-width="250">o2_250.jpg</photo-url>
      <photo-url max-width="100">o2_100.jpg</photo-url>
      <photo-url max-width="75">o2_75.jpg</photo-url>
    </photo>
  </photoset>
  <tag>cats</tag>
</post>
<post id="106" url="u106" url-with-slug="u106s" type="video" date-gmt="g" date="d" unix-timestamp="1577934250" format="html" reblog-key="rk106" slug="v" state="published" is_reblog="false" tumblelog="someblog">
  <video-source>
    <content-type>video/mp4</content-type>
    <extension>mp4</extension>
    <width>1920</width>
    <height>1080</height>
    <duration>42</duration>
    <revision>r1</revision>
  </video-source>
  <video-player>&lt;video src="x"&gt;&lt;/video&gt;</video-player>
  <video-caption>A clip</video-caption>
</post>"#,
    )
}

/// Messaging export owned by "me" (platform id "me_id") with:
/// - a conversation with "alice-deactivated20200101": one sent, one received TEXT
/// - a conversation with "bob": a received IMAGE and a sent message without a type
pub fn fixture_conversations() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<conversations>
  <conversation>
    <participants>
      <participant avatar_url="https://avatars.example/me.png">me</participant>
      <participant avatar_url="https://avatars.example/alice.png">alice-deactivated20200101</participant>
    </participants>
    <messages>
      <message ts="1600000000" participant="me_id" type="TEXT">hi alice</message>
      <message ts="1600000060" participant="alice_id" type="TEXT">hey &amp; hello</message>
    </messages>
  </conversation>
  <conversation>
    <participants>
      <participant avatar_url="https://avatars.example/bob.png">bob</participant>
      <participant avatar_url="https://avatars.example/me.png">me</participant>
    </participants>
    <messages>
      <message ts="1600000100" participant="bob_id" type="IMAGE">ignored sibling text<photo-url max-width="500">https://img.example/b.jpg</photo-url></message>
      <message ts="1600000200" participant="me_id">nice</message>
    </messages>
  </conversation>
</conversations>
"#
    .to_string()
}
