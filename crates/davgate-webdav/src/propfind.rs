//! PROPFIND multistatus parsing.
//!
//! WebDAV servers disagree wildly on namespace prefixes (`d:`, `D:`, `lp1:`,
//! none at all), so the parser matches on local element names only. A 404
//! propstat lists its properties as empty elements, which contribute no text
//! and are naturally ignored.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::DavError;
use crate::types::DavResource;

/// Parse a `207 Multi-Status` body into resources, in document order.
///
/// # Errors
///
/// Returns [`DavError::Parse`] when the document is not well-formed XML.
pub fn parse_multistatus(xml: &str) -> Result<Vec<DavResource>, DavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resources = Vec::new();
    let mut current: Option<PartialResource> = None;
    // Name of the element whose text we are currently collecting.
    let mut capture: Option<Capture> = None;
    let mut in_resourcetype = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DavError::Parse(e.to_string()))?;
        match event {
            Event::Start(start) => match local_name(start.name().as_ref()).as_str() {
                "response" => current = Some(PartialResource::default()),
                "resourcetype" if current.is_some() => in_resourcetype = true,
                "collection" if in_resourcetype => {
                    if let Some(res) = current.as_mut() {
                        res.is_dir = true;
                    }
                }
                other => capture = Capture::for_tag(other),
            },
            Event::Empty(empty) => {
                if in_resourcetype && local_name(empty.name().as_ref()) == "collection" {
                    if let Some(res) = current.as_mut() {
                        res.is_dir = true;
                    }
                }
            }
            Event::Text(text) => {
                if let (Some(res), Some(capture)) = (current.as_mut(), capture) {
                    let value = text
                        .unescape()
                        .map_err(|e| DavError::Parse(e.to_string()))?
                        .into_owned();
                    res.set(capture, value);
                }
            }
            Event::End(end) => match local_name(end.name().as_ref()).as_str() {
                "response" => {
                    if let Some(partial) = current.take() {
                        if let Some(resource) = partial.finish() {
                            resources.push(resource);
                        }
                    }
                }
                "resourcetype" => in_resourcetype = false,
                _ => capture = None,
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(resources)
}

/// Which property of the current response a text event belongs to.
#[derive(Debug, Clone, Copy)]
enum Capture {
    Href,
    ContentLength,
    LastModified,
    ContentType,
    Checksum,
}

impl Capture {
    fn for_tag(tag: &str) -> Option<Self> {
        match tag {
            "href" => Some(Self::Href),
            "getcontentlength" => Some(Self::ContentLength),
            "getlastmodified" => Some(Self::LastModified),
            "getcontenttype" => Some(Self::ContentType),
            "checksum" => Some(Self::Checksum),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PartialResource {
    href: Option<String>,
    is_dir: bool,
    size: Option<u64>,
    modified: Option<DateTime<Utc>>,
    content_type: Option<String>,
    checksums: Option<String>,
}

impl PartialResource {
    fn set(&mut self, capture: Capture, value: String) {
        match capture {
            Capture::Href => {
                let decoded = percent_decode_str(&value)
                    .decode_utf8()
                    .map(|s| s.into_owned())
                    .unwrap_or(value);
                self.href = Some(decoded);
            }
            Capture::ContentLength => self.size = value.parse().ok(),
            Capture::LastModified => {
                self.modified = DateTime::parse_from_rfc2822(&value)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
            Capture::ContentType => self.content_type = Some(value),
            Capture::Checksum => self.checksums = Some(value),
        }
    }

    fn finish(self) -> Option<DavResource> {
        let href = self.href?;
        let trimmed = href.trim_end_matches('/');
        let name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_owned();
        Some(DavResource {
            // A trailing slash on the href also marks a collection.
            is_dir: self.is_dir || href.ends_with('/'),
            href,
            name,
            size: self.size.unwrap_or(0),
            modified: self.modified,
            content_type: self.content_type,
            checksums: self.checksums,
        })
    }
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_owned(),
        None => name.into_owned(),
    }
}
