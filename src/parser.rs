//! Launch XML parser
//!
//! Builds a [`Tag`] tree from launch XML, recording the 1-based line and
//! column of every element and checking each element against its schema.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use crate::error::{LaunchError, LaunchResult};
use crate::tree::{Tag, TagKind};

/// An element whose end tag has not been seen yet
struct OpenTag {
    tag: Tag,
    text: String,
}

/// Parse launch XML read from `file`
pub fn parse_launch_file(file: &Path) -> LaunchResult<Tag> {
    let content = fs::read_to_string(file)?;
    parse_launch_str(&content, file)
}

/// Parse launch XML; `file` is only used for error reporting
pub fn parse_launch_str(content: &str, file: &Path) -> LaunchResult<Tag> {
    let mut xml_reader = Reader::from_str(content);
    xml_reader.trim_text(false);

    let mut stack: Vec<OpenTag> = Vec::new();
    let mut root: Option<Tag> = None;

    loop {
        let offset = xml_reader.buffer_position();
        let event = xml_reader
            .read_event()
            .map_err(|e| xml_error(file, format!("{} (byte {})", e, xml_reader.buffer_position())))?;
        match event {
            XmlEvent::Start(ref e) | XmlEvent::Empty(ref e) => {
                if root.is_some() {
                    return Err(xml_error(file, "junk after document element"));
                }
                let (line, column) = position(content, offset);
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let kind = match TagKind::from_name(&name) {
                    Some(TagKind::Launch) if stack.is_empty() => TagKind::Launch,
                    _ if stack.is_empty() => {
                        return Err(LaunchError::InvalidRoot {
                            file: file.to_path_buf(),
                            tag: name,
                        })
                    }
                    Some(kind) => kind,
                    None => {
                        return Err(LaunchError::UnknownTag {
                            file: file.to_path_buf(),
                            tag: name,
                            line,
                            column,
                        })
                    }
                };
                let open = OpenTag {
                    tag: Tag {
                        kind,
                        text: String::new(),
                        line,
                        column,
                        attributes: parse_attrs(e, file)?,
                        children: Vec::new(),
                    },
                    text: String::new(),
                };
                if matches!(event, XmlEvent::Empty(_)) {
                    let tag = finish(open, file)?;
                    attach(&mut stack, &mut root, tag, file)?;
                } else {
                    stack.push(open);
                }
            }
            XmlEvent::End(_) => {
                let Some(open) = stack.pop() else {
                    return Err(xml_error(file, "unexpected end tag"));
                };
                let tag = finish(open, file)?;
                attach(&mut stack, &mut root, tag, file)?;
            }
            XmlEvent::Text(ref e) => {
                if let Some(open) = stack.last_mut() {
                    if open.tag.children.is_empty() {
                        let text = e.unescape().map_err(|err| xml_error(file, err.to_string()))?;
                        open.text.push_str(&text);
                    }
                } else if !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(xml_error(file, "text outside of the document element"));
                }
            }
            XmlEvent::CData(e) => {
                if let Some(open) = stack.last_mut() {
                    if open.tag.children.is_empty() {
                        open.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error(file, "unexpected end of file"));
    }
    root.ok_or_else(|| xml_error(file, "no element found"))
}

fn finish(open: OpenTag, file: &Path) -> LaunchResult<Tag> {
    let OpenTag { mut tag, text } = open;
    tag.text = match tag.kind {
        TagKind::Rosparam => text,
        _ => text.trim().to_string(),
    };
    tag.check_schema().map_err(|source| LaunchError::Schema {
        file: file.to_path_buf(),
        tag: tag.kind.as_str(),
        line: tag.line,
        column: tag.column,
        source,
    })?;
    Ok(tag)
}

fn attach(
    stack: &mut [OpenTag],
    root: &mut Option<Tag>,
    tag: Tag,
    file: &Path,
) -> LaunchResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            let (line, column) = (tag.line, tag.column);
            let kind = tag.kind.as_str();
            parent.tag.append(tag).map_err(|source| LaunchError::Schema {
                file: file.to_path_buf(),
                tag: kind,
                line,
                column,
                source,
            })
        }
        None => {
            *root = Some(tag);
            Ok(())
        }
    }
}

fn parse_attrs(e: &BytesStart<'_>, file: &Path) -> LaunchResult<BTreeMap<String, String>> {
    let mut attrs = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(file, err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(file, err.to_string()))?
            .to_string();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// 1-based line and column of the element starting near `offset`.
///
/// The reader may already have consumed the opening `<` while reading the
/// preceding text.
fn position(content: &str, offset: usize) -> (usize, usize) {
    let bytes = content.as_bytes();
    let start = if offset > 0 && bytes.get(offset - 1) == Some(&b'<') {
        offset - 1
    } else {
        content
            .get(offset..)
            .and_then(|rest| rest.find('<'))
            .map_or(offset, |i| offset + i)
            .min(content.len())
    };
    let before = content.get(..start).unwrap_or(content);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |nl| nl + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn xml_error(file: &Path, message: impl Into<String>) -> LaunchError {
    LaunchError::Xml {
        file: file.to_path_buf(),
        message: message.into(),
    }
}
