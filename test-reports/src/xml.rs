// Copyright (c) The testlink-sync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event-driven reading shared by the XML formats.

use crate::errors::XmlParseError;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::{io::BufRead, str::FromStr, time::Duration};

/// Receives the events of one document.
///
/// Empty elements are delivered as a `Start` immediately followed by an `End`, so visitors only
/// ever see `Start`, `End`, `Text` and `CData` events.
pub(crate) trait XmlVisitor {
    fn start(&mut self, element: &BytesStart<'_>) -> Result<(), XmlParseError>;

    fn end(&mut self, name: &[u8]) -> Result<(), XmlParseError>;

    fn text(&mut self, text: &str);
}

/// Drives `visitor` over the document in `input`.
///
/// Returns the name of the root element, or `None` if the document had no elements.
pub(crate) fn read_document(
    input: impl BufRead,
    visitor: &mut impl XmlVisitor,
) -> Result<Option<String>, XmlParseError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| XmlParseError::Syntax {
                position: reader.error_position(),
                err,
            })?;

        match event {
            Event::Start(e) => {
                if root.is_none() {
                    root = Some(element_name(&e));
                }
                open.push(e.name().as_ref().to_vec());
                visitor.start(&e)?;
            }
            Event::Empty(e) => {
                if root.is_none() {
                    root = Some(element_name(&e));
                }
                visitor.start(&e)?;
                visitor.end(e.name().as_ref())?;
            }
            Event::End(e) => {
                open.pop();
                visitor.end(e.name().as_ref())?;
            }
            Event::Text(e) => {
                let element = open
                    .last()
                    .map(|name| String::from_utf8_lossy(name).into_owned())
                    .unwrap_or_default();
                let text = e
                    .unescape()
                    .map_err(|err| XmlParseError::Content { element, err })?;
                visitor.text(&text);
            }
            Event::CData(e) => {
                visitor.text(&String::from_utf8_lossy(&e));
            }
            Event::Eof => {
                if let Some(name) = open.pop() {
                    return Err(XmlParseError::UnclosedElement {
                        element: String::from_utf8_lossy(&name).into_owned(),
                    });
                }
                return Ok(root);
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }

        buf.clear();
    }
}

pub(crate) fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

/// Returns the unescaped value of the attribute `name`, if present.
pub(crate) fn attr(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, XmlParseError> {
    let content_err = |err: quick_xml::Error| XmlParseError::Content {
        element: element_name(element),
        err,
    };

    let attribute = element
        .try_get_attribute(name)
        .map_err(|err| content_err(err.into()))?;
    match attribute {
        Some(attribute) => {
            let value = attribute.unescape_value().map_err(content_err)?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// Returns the attribute `name` parsed as a number, or `None` if it is absent or unparseable.
///
/// Report writers disagree on the exact shape of counters, so these are read leniently.
pub(crate) fn attr_number<T: FromStr>(
    element: &BytesStart<'_>,
    name: &str,
) -> Result<Option<T>, XmlParseError> {
    Ok(attr(element, name)?.and_then(|value| value.trim().parse().ok()))
}

/// Parses a duration in (possibly fractional) seconds, as JUnit writes it.
pub(crate) fn parse_seconds(value: &str) -> Option<Duration> {
    // Some writers format times with thousands separators.
    let value: String = value.trim().chars().filter(|c| *c != ',').collect();
    let secs: f64 = value.parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
