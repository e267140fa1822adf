//! Forward-only XML cursor with an explicit element stack.
//!
//! Parse functions take an [`Element`] by value and return once its end tag has been
//! consumed, so "positioned just after this element" holds by construction. An
//! element handle that is dropped before its end tag is skipped over by the next
//! `next_child` call on its parent.

use crate::error::{CodecError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::io::BufRead;

/// An opened element: its local name, decoded attributes and nesting depth.
#[derive(Debug)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    depth: usize,
    empty: bool,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Self-closing (`<x/>`): no children, no end tag.
    pub fn is_empty(&self) -> bool {
        self.empty
    }
}

/// A direct child of the element being read.
#[derive(Debug)]
pub enum Node {
    Element(Element),
    Text(String),
}

enum Raw {
    Open(Element),
    Close,
    Text(String),
    Eof,
    Other,
}

pub struct XmlCursor<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<String>,
}

impl<R: BufRead> XmlCursor<R> {
    pub fn new(inner: R) -> Self {
        Self { reader: Reader::from_reader(inner), buf: Vec::with_capacity(8 * 1024), stack: Vec::new() }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn element(start: &BytesStart<'_>, depth: usize, empty: bool) -> Result<Element> {
        let name = std::str::from_utf8(start.local_name().as_ref())?.to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Element { name, attrs, depth, empty })
    }

    fn read_raw(&mut self) -> Result<Raw> {
        self.buf.clear();
        match self.reader.read_event_into(&mut self.buf)? {
            Event::Start(e) => {
                let el = Self::element(&e, self.stack.len() + 1, false)?;
                self.stack.push(el.name.clone());
                Ok(Raw::Open(el))
            }
            Event::Empty(e) => Ok(Raw::Open(Self::element(&e, self.stack.len() + 1, true)?)),
            Event::End(e) => {
                let name = std::str::from_utf8(e.local_name().as_ref())?.to_string();
                match self.stack.pop() {
                    Some(open) if open == name => Ok(Raw::Close),
                    Some(open) => Err(CodecError::Malformed(format!("expected </{open}>, found </{name}>"))),
                    None => Err(CodecError::Malformed(format!("unexpected </{name}>"))),
                }
            }
            Event::Text(t) => Ok(Raw::Text(t.unescape()?.into_owned())),
            Event::CData(c) => Ok(Raw::Text(std::str::from_utf8(&c)?.to_string())),
            Event::Eof => match self.stack.last() {
                Some(open) => Err(CodecError::UnexpectedEof { element: open.clone() }),
                None => Ok(Raw::Eof),
            },
            _ => Ok(Raw::Other),
        }
    }

    /// Advance to the next start of `name` at any depth. `None` once the document ends.
    pub fn seek(&mut self, name: &str) -> Result<Option<Element>> {
        loop {
            match self.read_raw()? {
                Raw::Open(el) if el.name == name => return Ok(Some(el)),
                Raw::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Next direct child of `parent`; `None` after `parent`'s end tag has been consumed.
    pub fn next_child(&mut self, parent: &Element) -> Result<Option<Node>> {
        if parent.empty {
            return Ok(None);
        }
        loop {
            if self.stack.len() < parent.depth {
                return Ok(None);
            }
            match self.read_raw()? {
                Raw::Open(el) if el.depth == parent.depth + 1 => return Ok(Some(Node::Element(el))),
                Raw::Text(t) if self.stack.len() == parent.depth => return Ok(Some(Node::Text(t))),
                Raw::Close if self.stack.len() < parent.depth => return Ok(None),
                Raw::Eof => return Err(CodecError::UnexpectedEof { element: parent.name.clone() }),
                _ => {}
            }
        }
    }

    /// Next direct child element of `parent`, ignoring interleaved text.
    pub fn next_element(&mut self, parent: &Element) -> Result<Option<Element>> {
        while let Some(node) = self.next_child(parent)? {
            if let Node::Element(el) = node {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    /// All text and CDATA inside `el`, concatenated in order, consuming its end tag.
    pub fn text(&mut self, el: Element) -> Result<String> {
        let mut out = String::new();
        if el.empty {
            return Ok(out);
        }
        loop {
            match self.read_raw()? {
                Raw::Text(t) => out.push_str(&t),
                Raw::Close if self.stack.len() < el.depth => return Ok(out),
                Raw::Eof => return Err(CodecError::UnexpectedEof { element: el.name }),
                _ => {}
            }
        }
    }

    /// Consume `el` and everything inside it.
    pub fn skip(&mut self, el: Element) -> Result<()> {
        while self.next_child(&el)?.is_some() {}
        Ok(())
    }
}
