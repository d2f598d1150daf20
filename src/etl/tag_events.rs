use std::fmt;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::osm::Attributes;
use crate::errors::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEventKind {
    Start,
    End,
}

/// One start or end tag. End events carry no attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct TagEvent {
    pub kind: TagEventKind,
    pub name: String,
    pub attributes: Attributes,
}

impl TagEvent {
    pub fn start(name: &str, attributes: &[(&str, &str)]) -> Self {
        TagEvent {
            kind: TagEventKind::Start,
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn end(name: &str) -> Self {
        TagEvent {
            kind: TagEventKind::End,
            name: name.to_string(),
            attributes: Attributes::new(),
        }
    }

    pub fn is_start(&self) -> bool {
        self.kind == TagEventKind::Start
    }

    pub fn is_end_of(&self, name: &str) -> bool {
        self.kind == TagEventKind::End && self.name == name
    }

    fn from_start(el: &BytesStart) -> Result<Self> {
        let mut attributes = Attributes::new();
        for attribute_res in el.attributes() {
            let attribute = attribute_res?;
            let key = str::from_utf8(attribute.key.as_ref())?;
            attributes.insert(key.to_string(), attribute.unescape_value()?.into_owned());
        }

        Ok(TagEvent {
            kind: TagEventKind::Start,
            name: str::from_utf8(el.name().as_ref())?.to_string(),
            attributes,
        })
    }

    fn from_end(el: &BytesEnd) -> Result<Self> {
        Ok(TagEvent::end(str::from_utf8(el.name().as_ref())?))
    }
}

impl fmt::Display for TagEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TagEventKind::End => write!(f, "</{}>", self.name),
            TagEventKind::Start => {
                write!(f, "<{}", self.name)?;
                let mut keys: Vec<&String> = self.attributes.keys().collect();
                keys.sort();
                for key in keys {
                    write!(f, " {}={:?}", key, self.attributes[key])?;
                }
                write!(f, ">")
            },
        }
    }
}

/// Lazily yields the start and end tags of an XML document. Self-closing
/// elements produce a start immediately followed by its end. Everything that
/// is not a tag is skipped.
pub struct TagEventSource<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending_end: Option<TagEvent>,
    finished: bool,
}

impl<R: BufRead> TagEventSource<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);

        TagEventSource {
            reader,
            buf: Vec::new(),
            pending_end: None,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for TagEventSource<R> {
    type Item = Result<TagEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(end) = self.pending_end.take() {
            return Some(Ok(end));
        }

        while !self.finished {
            // if we don't keep a borrow elsewhere, we can clear the buffer to keep memory usage low
            self.buf.clear();
            let parsed = match self.reader.read_event_into(&mut self.buf) {
                Err(e) => Err(e.into()),
                Ok(Event::Eof) => {
                    self.finished = true;
                    return None;
                },
                Ok(Event::Start(e)) => TagEvent::from_start(&e),
                Ok(Event::Empty(e)) => TagEvent::from_start(&e).map(|start| {
                    self.pending_end = Some(TagEvent::end(&start.name));
                    start
                }),
                Ok(Event::End(e)) => TagEvent::from_end(&e),
                // Declarations, text, comments and the like carry no map data.
                Ok(_) => continue,
            };

            if parsed.is_err() {
                self.finished = true;
            }
            return Some(parsed);
        }
        None
    }
}

pub type OsmReader = BufReader<Box<dyn std::io::Read>>;

/// Opens an .osm file, decompressing it on the fly when it ends in `.xz`.
pub fn open_osm_file(path: &Path) -> Result<TagEventSource<OsmReader>> {
    let file = fs::File::open(path)?;
    let is_xz = path.extension().is_some_and(|ext| ext == "xz");
    let inner: Box<dyn std::io::Read> = if is_xz {
        Box::new(XzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };
    Ok(TagEventSource::new(BufReader::new(inner)))
}
