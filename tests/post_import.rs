#[path = "common/mod.rs"]
mod common;

use common::*;
use tev_codec::{CodecError, Payload, PostReader, PostType, TypeRegistry};

/// Every post type in the fixture is imported with its common record and exactly one
/// payload of the matching kind, and hashtags are counted per (tag, blog).
#[test]
fn imports_every_post_type() {
    let xml = fixture_all_types();
    let mut store = tev_codec::MemoryStore::new();
    let stats = tev_codec::read_posts(xml.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap();

    assert_eq!(stats.posts, 6);
    assert_eq!(stats.photos, 3, "one single photo plus a two-photo set");
    assert_eq!(stats.hashtags, 5);
    assert_eq!(store.post_ids(BLOG), vec!["101", "102", "103", "104", "105", "106"]);

    let regular = store.post(BLOG, "101").unwrap();
    assert_eq!(regular.post_type, PostType::Regular);
    assert_eq!(regular.unix_timestamp, 1577934245);
    assert_eq!(regular.url_with_slug, "https://someblog.example/post/101/hello");
    assert_eq!(regular.reblog_key, "rk101");
    assert!(!regular.is_reblog);
    match store.payload(BLOG, "101").unwrap() {
        Payload::Regular(r) => {
            assert_eq!(r.title.as_deref(), Some("Hello"));
            assert_eq!(r.body, "<p>Body & more</p>");
        }
        other => panic!("unexpected payload {other:?}"),
    }

    assert!(store.post(BLOG, "102").unwrap().is_reblog);
    match store.payload(BLOG, "102").unwrap() {
        Payload::Answer(a) => {
            assert_eq!(a.question, "Why?");
            assert_eq!(a.answer, "Because.");
        }
        other => panic!("unexpected payload {other:?}"),
    }

    match store.payload(BLOG, "103").unwrap() {
        Payload::Link(l) => {
            assert_eq!(l.text, None, "absent link-text stays absent");
            assert_eq!(l.url, "https://example.org/");
            assert_eq!(l.description.as_deref(), Some("An example"));
        }
        other => panic!("unexpected payload {other:?}"),
    }

    match store.payload(BLOG, "106").unwrap() {
        Payload::Video(v) => {
            assert_eq!(v.content_type, "video/mp4");
            assert_eq!(v.extension, "mp4");
            assert_eq!((v.width, v.height, v.duration), (Some(1920), Some(1080), Some(42)));
            assert_eq!(v.revision, "r1");
            assert_eq!(v.caption, "A clip");
        }
        other => panic!("unexpected payload {other:?}"),
    }

    assert_eq!(store.hashtag_count(BLOG, "a"), 1);
    assert_eq!(store.hashtag_count(BLOG, "cats"), 1);
    assert_eq!(store.hashtag_count(BLOG, "missing"), 0);
}

/// Tags accumulate in document order joined by ", "; a single tag has no separator.
#[test]
fn tags_accumulate_in_document_order() {
    let store = import_str(&fixture_all_types());
    assert_eq!(store.post(BLOG, "101").unwrap().tags, "a, b, c");
    assert_eq!(store.post(BLOG, "103").unwrap().tags, "links");
    assert_eq!(store.post(BLOG, "102").unwrap().tags, "");
}

/// A single-photo post yields one Photo carrying the root URLs and the post's
/// dimensions; a photoset yields one Photo per `<photo>` with its own offset and size.
#[test]
fn photo_posts_single_and_photoset() {
    let store = import_str(&fixture_all_types());

    let Payload::Photos { photos } = store.payload(BLOG, "104").unwrap() else { panic!("not photos") };
    assert_eq!(photos.len(), 1);
    let p = &photos[0];
    assert_eq!(p.post_id, "104");
    assert_eq!(p.offset, "");
    assert_eq!(p.caption, "One photo");
    assert_eq!(p.link_url, None);
    assert_eq!((p.width, p.height), (Some(640), Some(480)));
    assert_eq!(p.url_1280, "p104_1280.jpg");
    assert_eq!(p.url_75, "p104_75.jpg");

    let Payload::Photos { photos } = store.payload(BLOG, "105").unwrap() else { panic!("not photos") };
    assert_eq!(photos.len(), 2, "root-level photo-urls are not an extra photo");
    assert_eq!(photos[0].offset, "o1");
    assert_eq!(photos[1].offset, "o2");
    assert_eq!((photos[1].width, photos[1].height), (Some(300), Some(200)));
    assert_eq!(photos[1].url_500, "o2_500.jpg");
    for p in photos {
        assert_eq!(p.post_id, "105");
        assert_eq!(p.caption, "Two photos");
        assert_eq!(p.link_url.as_deref(), Some("https://example.org/set"));
    }
}

/// A type missing from the registry aborts the import instead of skipping the post.
#[test]
fn unknown_type_is_fatal() {
    let xml = posts_doc(r#"<post id="1" type="bogus" unix-timestamp="1"><tag>x</tag></post>"#);
    let mut store = tev_codec::MemoryStore::new();
    let err = tev_codec::read_posts(xml.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap_err();
    assert!(matches!(err, CodecError::UnknownType(ref t) if t == "bogus"), "got {err:?}");
    assert_eq!(store.post_count(), 0);
}

/// The registry decides which names are known: a custom table without "video"
/// rejects video posts, and a registry loaded from JSON works like the standard one.
#[test]
fn registry_controls_known_types() {
    let xml = posts_doc(r#"<post id="7" type="video" unix-timestamp="1"></post>"#);
    let no_video = TypeRegistry::from_pairs([(1, "regular")]);
    let err = PostReader::new(xml.as_bytes(), &no_video).next_post().unwrap_err();
    assert!(matches!(err, CodecError::UnknownType(_)));

    let reg = TypeRegistry::from_json_str(r#"[{"id": 9, "type": "video"}, {"id": 4, "type": "regular"}]"#).unwrap();
    assert_eq!(reg.len(), 2);
    assert_eq!(reg.resolve("video"), Some(9));
    assert_eq!(reg.name_of(4), Some("regular"));
    let parsed = PostReader::new(xml.as_bytes(), &reg).next_post().unwrap().unwrap();
    assert_eq!(parsed.post.post_type, PostType::Video);
    assert_eq!(parsed.payload.kind(), PostType::Video);
}

/// Truncating right after a `<post>` start tag is a malformed-stream error.
#[test]
fn premature_eof_is_malformed() {
    let xml = r#"<?xml version="1.0"?><tumblr version="1.0"><posts><post id="1" type="regular" unix-timestamp="5">"#;
    let mut store = tev_codec::MemoryStore::new();
    let err = tev_codec::read_posts(xml.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap_err();
    assert!(err.is_malformed(), "got {err:?}");
    assert_eq!(store.post_count(), 0, "no partial record is saved");
}

/// Non-numeric ids and timestamps are rejected.
#[test]
fn malformed_numbers_are_rejected() {
    let bad_ts = posts_doc(r#"<post id="1" type="regular" unix-timestamp="yesterday"></post>"#);
    let err = PostReader::new(bad_ts.as_bytes(), &TypeRegistry::standard()).next_post().unwrap_err();
    assert!(matches!(err, CodecError::MalformedNumber { ref field, .. } if field == "unix-timestamp"), "got {err:?}");

    let bad_id = posts_doc(r#"<post id="abc" type="regular" unix-timestamp="1"></post>"#);
    let err = PostReader::new(bad_id.as_bytes(), &TypeRegistry::standard()).next_post().unwrap_err();
    assert!(matches!(err, CodecError::MalformedNumber { ref field, .. } if field == "id"), "got {err:?}");
}

/// Ids beyond 2^53 survive as exact strings.
#[test]
fn large_ids_are_kept_exactly() {
    let xml = posts_doc(r#"<post id="18446744073709551615" type="answer" unix-timestamp="1" tumblelog="b"><question>q</question><answer>a</answer></post>"#);
    let parsed = PostReader::new(xml.as_bytes(), &TypeRegistry::standard()).next_post().unwrap().unwrap();
    assert_eq!(parsed.post.id, "18446744073709551615");
}

/// `with_blog` fills the owning blog only where the tumblelog attribute is missing;
/// the reader yields posts lazily as an iterator.
#[test]
fn reader_iterates_and_fills_missing_blog() {
    let xml = posts_doc(
        r#"<post id="1" type="regular" unix-timestamp="1"><regular-body>x</regular-body></post>
<post id="2" type="regular" unix-timestamp="2" tumblelog="other"><regular-body><![CDATA[<b>raw</b>]]></regular-body></post>"#,
    );
    let registry = TypeRegistry::standard();
    let posts: Vec<_> = PostReader::new(xml.as_bytes(), &registry)
        .with_blog("fallback")
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].post.tumblelog, "fallback");
    assert_eq!(posts[1].post.tumblelog, "other");
    match &posts[1].payload {
        Payload::Regular(r) => {
            assert_eq!(r.title, None);
            assert_eq!(r.body, "<b>raw</b>");
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

/// Sink failures abort the import and surface unchanged.
#[test]
fn sink_errors_propagate() {
    struct Failing;
    impl tev_codec::PostSink for Failing {
        fn save_post(&mut self, _post: &tev_codec::Post) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        fn save_payload(&mut self, _id: &str, _payload: &Payload) -> anyhow::Result<()> {
            Ok(())
        }
    }
    let err = tev_codec::read_posts(fixture_all_types().as_bytes(), &TypeRegistry::standard(), None, &mut Failing)
        .unwrap_err();
    assert!(matches!(err, CodecError::Collaborator(_)));
    assert_eq!(err.to_string(), "disk full");
}

/// A post without an id or a unix timestamp is rejected and nothing reaches the sink.
#[test]
fn missing_required_attributes_are_rejected() {
    let no_id = posts_doc(r#"<post type="answer" tumblelog="b" unix-timestamp="1"><question>q</question><answer>a</answer></post>"#);
    let mut store = tev_codec::MemoryStore::new();
    let err = tev_codec::read_posts(no_id.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap_err();
    assert!(
        matches!(err, CodecError::MissingAttribute { ref element, ref attribute } if element == "post" && attribute == "id"),
        "got {err:?}"
    );
    assert_eq!(store.post_count(), 0);

    let no_ts = posts_doc(r#"<post id="7" type="answer" tumblelog="b"><question>q</question><answer>a</answer></post>"#);
    let err = tev_codec::read_posts(no_ts.as_bytes(), &TypeRegistry::standard(), None, &mut store).unwrap_err();
    assert!(
        matches!(err, CodecError::MissingAttribute { ref attribute, .. } if attribute == "unix-timestamp"),
        "got {err:?}"
    );
    assert!(err.to_string().contains("unix-timestamp"));
    assert_eq!(store.post_count(), 0);
}

/// An empty `<regular-title>` reads as no title.
#[test]
fn empty_regular_title_is_absent() {
    let xml = posts_doc(
        r#"<post id="1" type="regular" unix-timestamp="1" tumblelog="b"><regular-title></regular-title><regular-body>x</regular-body></post>"#,
    );
    let parsed = PostReader::new(xml.as_bytes(), &TypeRegistry::standard()).next_post().unwrap().unwrap();
    assert_eq!(parsed.payload, Payload::Regular(tev_codec::Regular { title: None, body: "x".into() }));
}
