//! Quota document codec
//!
//! Parses the XML quota document into a [`QuotaDocument`] and writes it
//! back in canonical form: XML declaration, two-space indentation, no blank
//! lines, childless elements self-closed, and a fixed attribute order
//! (the key attribute first, then `defaultVersion` for browsers or
//! `port, count, username, password, scheme, vnc` for hosts) followed by any
//! unknown attributes in their original order.

use crate::model::{
    Browser, ExtraAttributes, Host, QuotaDocument, Region, RootElement, Version,
};
use gridquota_common::{Error, NodeKind, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use std::borrow::Cow;

/// Parse a quota document from raw bytes
pub fn parse_bytes(bytes: &[u8]) -> Result<QuotaDocument> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::malformed(format!("document is not valid UTF-8: {e}")))?;
    parse(text)
}

/// Parse a quota document.
///
/// Fails with `MalformedDocument` when the markup is not well-formed and
/// with `SchemaViolation` when required attributes are missing, keys are
/// duplicated, or the document contains elements outside the schema.
pub fn parse(text: &str) -> Result<QuotaDocument> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder::default();
    loop {
        let event = reader.read_event().map_err(|e| {
            Error::malformed(format!("{e} at byte {}", reader.buffer_position()))
        })?;
        match event {
            Event::Start(start) => builder.open(&start, true)?,
            Event::Empty(start) => builder.open(&start, false)?,
            Event::End(_) => builder.close()?,
            Event::Text(text) => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    if builder.stack.is_empty() {
                        return Err(Error::malformed("text outside the root element"));
                    }
                    return Err(Error::schema(
                        builder.current_element(),
                        "unexpected text content",
                    ));
                }
            }
            Event::CData(_) => {
                return Err(Error::schema(
                    builder.current_element(),
                    "unexpected CDATA section",
                ));
            }
            Event::Eof => break,
            // Declarations, comments and processing instructions carry no quota data
            _ => {}
        }
    }
    builder.finish()
}

/// Serialize a quota document in canonical form
pub fn serialize(doc: &QuotaDocument) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;

    let root = doc.root();
    let mut start = BytesStart::new(root.name.as_str());
    push_extra(&mut start, &root.attributes);
    write_element(&mut writer, start, doc.browsers(), write_browser)?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Serialization(format!("serialized document is not UTF-8: {e}")))
}

fn write_browser(writer: &mut Writer<Vec<u8>>, browser: &Browser) -> Result<()> {
    let mut start = BytesStart::new(NodeKind::Browser.element_name());
    let key = NodeKind::Browser.key_attribute();
    start.push_attribute(attribute(key, browser.name()));
    if let Some(default_version) = &browser.default_version {
        start.push_attribute(attribute("defaultVersion", default_version));
    }
    push_extra(&mut start, &browser.extra_attributes);
    write_element(writer, start, browser.versions(), write_version)
}

fn write_version(writer: &mut Writer<Vec<u8>>, version: &Version) -> Result<()> {
    let mut start = BytesStart::new(NodeKind::Version.element_name());
    let key = NodeKind::Version.key_attribute();
    start.push_attribute(attribute(key, version.number()));
    push_extra(&mut start, &version.extra_attributes);
    write_element(writer, start, version.regions(), write_region)
}

fn write_region(writer: &mut Writer<Vec<u8>>, region: &Region) -> Result<()> {
    let mut start = BytesStart::new(NodeKind::Region.element_name());
    start.push_attribute(attribute(NodeKind::Region.key_attribute(), region.name()));
    push_extra(&mut start, &region.extra_attributes);
    write_element(writer, start, region.hosts(), write_host)
}

fn write_host(writer: &mut Writer<Vec<u8>>, host: &Host) -> Result<()> {
    let mut start = BytesStart::new(NodeKind::Host.element_name());
    start.push_attribute(attribute(NodeKind::Host.key_attribute(), &host.name));
    start.push_attribute(attribute("port", &host.port));
    start.push_attribute(attribute("count", &host.count));
    let optional = [
        ("username", &host.username),
        ("password", &host.password),
        ("scheme", &host.scheme),
        ("vnc", &host.vnc),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            start.push_attribute(attribute(key, value));
        }
    }
    push_extra(&mut start, &host.extra_attributes);
    emit(writer, Event::Empty(start))
}

/// Write `start` self-closed when there are no children, otherwise as an
/// open/close pair around the children.
fn write_element<T>(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart<'_>,
    children: &[T],
    write_child: fn(&mut Writer<Vec<u8>>, &T) -> Result<()>,
) -> Result<()> {
    if children.is_empty() {
        return emit(writer, Event::Empty(start));
    }
    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    emit(writer, Event::Start(start))?;
    for child in children {
        write_child(writer, child)?;
    }
    emit(writer, Event::End(end))
}

fn push_extra(start: &mut BytesStart<'_>, attrs: &ExtraAttributes) {
    for (key, value) in attrs.iter() {
        start.push_attribute(attribute(key, value));
    }
}

/// Build an attribute with its value escaped for output.
///
/// Newlines, carriage returns and tabs are written as character references
/// so that conforming parsers do not normalize them to spaces.
fn attribute<'a>(key: &'a str, value: &str) -> Attribute<'a> {
    let mut escaped = String::with_capacity(value.len());
    for c in escape(value).chars() {
        match c {
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            other => escaped.push(other),
        }
    }
    Attribute {
        key: QName(key.as_bytes()),
        value: Cow::Owned(escaped.into_bytes()),
    }
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Position of an open element while parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Browser,
    Version,
    Region,
    Host,
}

/// Attributes of one element, consumed as they are mapped onto the model
struct AttributeSet {
    element: &'static str,
    attrs: Vec<(String, String)>,
}

impl AttributeSet {
    fn read(element: &'static str, start: &BytesStart<'_>) -> Result<Self> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::malformed(format!("<{element}>: {e}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::malformed(format!("<{element}>: {e}")))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::malformed(format!("<{element}> attribute '{key}': {e}")))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self { element, attrs })
    }

    fn take(&mut self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .position(|(k, _)| k == key)
            .map(|idx| self.attrs.remove(idx).1)
    }

    fn require(&mut self, key: &str) -> Result<String> {
        self.take(key).ok_or_else(|| {
            Error::schema(self.element, format!("missing required attribute '{key}'"))
        })
    }

    fn into_extra(self) -> ExtraAttributes {
        self.attrs.into_iter().collect()
    }
}

#[derive(Default)]
struct TreeBuilder {
    doc: Option<QuotaDocument>,
    stack: Vec<Level>,
}

impl TreeBuilder {
    fn current_element(&self) -> &'static str {
        match self.stack.last() {
            None | Some(Level::Root) => "root",
            Some(Level::Browser) => "browser",
            Some(Level::Version) => "version",
            Some(Level::Region) => "region",
            Some(Level::Host) => "host",
        }
    }

    fn open(&mut self, start: &BytesStart<'_>, has_body: bool) -> Result<()> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let level = match self.stack.last().copied() {
            None => {
                if self.doc.is_some() {
                    return Err(Error::malformed(format!(
                        "unexpected second root element <{name}>"
                    )));
                }
                let attributes = AttributeSet::read("root", start)?.into_extra();
                self.doc = Some(QuotaDocument::with_root(RootElement { name, attributes }));
                Level::Root
            }
            Some(Level::Root) => {
                expect_child(self.current_element(), &name, NodeKind::Browser)?;
                let mut attrs = AttributeSet::read("browser", start)?;
                let key = attrs.require(NodeKind::Browser.key_attribute())?;
                let mut browser = Browser::new(key);
                browser.default_version = attrs.take("defaultVersion");
                browser.extra_attributes = attrs.into_extra();
                self.document()?
                    .append_browser(browser)
                    .map_err(duplicate_key)?;
                Level::Browser
            }
            Some(Level::Browser) => {
                expect_child(self.current_element(), &name, NodeKind::Version)?;
                let mut attrs = AttributeSet::read("version", start)?;
                let key = attrs.require(NodeKind::Version.key_attribute())?;
                let mut version = Version::new(key);
                version.extra_attributes = attrs.into_extra();
                self.document()?
                    .last_browser_mut()
                    .ok_or_else(|| Error::malformed("version outside of a browser"))?
                    .append_version(version)
                    .map_err(duplicate_key)?;
                Level::Version
            }
            Some(Level::Version) => {
                expect_child(self.current_element(), &name, NodeKind::Region)?;
                let mut attrs = AttributeSet::read("region", start)?;
                let key = attrs.require(NodeKind::Region.key_attribute())?;
                let mut region = Region::new(key);
                region.extra_attributes = attrs.into_extra();
                self.document()?
                    .last_browser_mut()
                    .and_then(|b| b.last_version_mut())
                    .ok_or_else(|| Error::malformed("region outside of a version"))?
                    .append_region(region)
                    .map_err(duplicate_key)?;
                Level::Region
            }
            Some(Level::Region) => {
                expect_child(self.current_element(), &name, NodeKind::Host)?;
                let mut attrs = AttributeSet::read("host", start)?;
                let mut host = Host::new(
                    attrs.require(NodeKind::Host.key_attribute())?,
                    attrs.require("port")?,
                    attrs.require("count")?,
                );
                host.username = attrs.take("username");
                host.password = attrs.take("password");
                host.scheme = attrs.take("scheme");
                host.vnc = attrs.take("vnc");
                host.extra_attributes = attrs.into_extra();
                self.document()?
                    .last_browser_mut()
                    .and_then(|b| b.last_version_mut())
                    .and_then(|v| v.last_region_mut())
                    .ok_or_else(|| Error::malformed("host outside of a region"))?
                    .append_host(host);
                Level::Host
            }
            Some(Level::Host) => {
                return Err(Error::schema(
                    "host",
                    format!("unexpected child element <{name}>"),
                ));
            }
        };
        if has_body {
            self.stack.push(level);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::malformed("closing tag without matching opening tag"))
    }

    fn document(&mut self) -> Result<&mut QuotaDocument> {
        self.doc
            .as_mut()
            .ok_or_else(|| Error::malformed("element outside of the root element"))
    }

    fn finish(self) -> Result<QuotaDocument> {
        if !self.stack.is_empty() {
            return Err(Error::malformed("unexpected end of document: unclosed elements"));
        }
        self.doc
            .ok_or_else(|| Error::malformed("document has no root element"))
    }
}

fn expect_child(parent: &str, name: &str, expected: NodeKind) -> Result<()> {
    if name == expected.element_name() {
        Ok(())
    } else {
        Err(Error::schema(
            parent,
            format!(
                "unexpected child element <{name}>, expected <{}>",
                expected.element_name()
            ),
        ))
    }
}

fn duplicate_key(err: Error) -> Error {
    match err {
        Error::AlreadyExists { kind, key } => Error::schema(
            kind.element_name(),
            format!("duplicate {kind} '{key}'"),
        ),
        other => other,
    }
}
