//! Parsing of the `<Delete>` request body of a multi-object delete.

use quick_xml::events::Event;
use quick_xml::Reader;

use davgate_s3_model::types::{Delete, ObjectIdentifier};

use crate::error::XmlError;

/// Parse a `DeleteObjects` request body.
///
/// Expected shape:
///
/// ```xml
/// <Delete>
///   <Quiet>true</Quiet>
///   <Object><Key>a.txt</Key></Object>
///   <Object><Key>dir/b.txt</Key></Object>
/// </Delete>
/// ```
///
/// Unknown elements are skipped. Namespace prefixes are ignored; clients
/// disagree on whether the document carries the S3 namespace.
///
/// # Errors
///
/// Returns `XmlError` if the XML is not well-formed or an `<Object>` lacks a
/// `<Key>`.
pub fn parse_delete_request(xml: &[u8]) -> Result<Delete, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut delete = Delete::default();
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = local_name(start.name().as_ref());
                match name.as_str() {
                    "Delete" => saw_root = true,
                    "Object" if saw_root => {
                        let key = parse_object_entry(&mut reader)?;
                        delete.objects.push(ObjectIdentifier { key });
                    }
                    "Quiet" if saw_root => {
                        let text = read_text_content(&mut reader)?;
                        delete.quiet = text == "true";
                    }
                    _ => skip_element(&mut reader)?,
                }
            }
            Event::End(_) => {}
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(XmlError::MissingElement("Delete".to_owned()));
    }
    Ok(delete)
}

/// Parse one `<Object>` element; the reader sits just past its start tag.
fn parse_object_entry(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut key = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = local_name(start.name().as_ref());
                if name == "Key" {
                    key = Some(read_text_content(reader)?);
                } else {
                    // VersionId and friends are ignored; versioning is not served.
                    skip_element(reader)?;
                }
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(XmlError::Malformed("unterminated Object element".to_owned()));
            }
            _ => {}
        }
    }
    key.ok_or_else(|| XmlError::MissingElement("Object/Key".to_owned()))
}

/// Read the text content of the current element and consume its end tag.
fn read_text_content(reader: &mut Reader<&[u8]>) -> Result<String, XmlError> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(e) => {
                let unescaped = e
                    .unescape()
                    .map_err(|err| XmlError::Malformed(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Event::End(_) => return Ok(text),
            Event::Eof => {
                return Err(XmlError::Malformed(
                    "unexpected EOF while reading text content".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Skip over an element and all its children.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), XmlError> {
    let mut depth: u32 = 1;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
            Event::Eof => {
                return Err(XmlError::Malformed(
                    "unexpected EOF while skipping element".to_owned(),
                ));
            }
            _ => {}
        }
    }
}

/// Strip any namespace prefix from a raw element name.
fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_owned(),
        None => name.into_owned(),
    }
}
