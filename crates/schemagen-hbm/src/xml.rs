//! A minimal owned XML tree over `quick-xml`.
//!
//! Fragments are small, so they are read fully into memory, merged as trees
//! and written back out. Comments and processing instructions are dropped;
//! the DOCTYPE is kept.

use std::io::Cursor;

use quick_xml::{
  Reader, Writer,
  events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
  Element(Element),
  Text(String),
  CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  pub name:       String,
  pub attributes: Vec<(String, String)>,
  pub children:   Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
  /// Body of the `<!DOCTYPE ...>` declaration, without the keyword.
  pub doctype: Option<String>,
  pub root:    Element,
}

impl Element {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name:       name.into(),
      attributes: Vec::new(),
      children:   Vec::new(),
    }
  }

  pub fn attr(&self, key: &str) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  /// Replace the value of `key`, or append it.
  pub fn set_attr(&mut self, key: &str, value: &str) {
    match self.attributes.iter_mut().find(|(k, _)| k == key) {
      Some((_, v)) => *v = value.to_string(),
      None => self.attributes.push((key.to_string(), value.to_string())),
    }
  }

  pub fn remove_attr(&mut self, key: &str) -> Option<String> {
    let idx = self.attributes.iter().position(|(k, _)| k == key)?;
    Some(self.attributes.remove(idx).1)
  }

  pub fn elements(&self) -> impl Iterator<Item = &Element> {
    self.children.iter().filter_map(|n| match n {
      Node::Element(e) => Some(e),
      _ => None,
    })
  }

  pub fn elements_named<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Iterator<Item = &'a Element> + 'a {
    self.elements().filter(move |e| e.name == name)
  }

  pub fn child(&self, name: &str) -> Option<&Element> {
    self.elements().find(|e| e.name == name)
  }

  /// Concatenated text and CDATA content, trimmed.
  pub fn text(&self) -> String {
    let mut text = String::new();
    for node in &self.children {
      if let Node::Text(t) | Node::CData(t) = node {
        text.push_str(t);
      }
    }
    text.trim().to_string()
  }

  pub fn has_text(&self) -> bool {
    self.children.iter().any(|n| match n {
      Node::Text(t) | Node::CData(t) => !t.trim().is_empty(),
      Node::Element(_) => false,
    })
  }
}

// ─── Reading ─────────────────────────────────────────────────────────────────

/// Parse a complete document. The error is a human-readable message; callers
/// attach the file path.
pub fn parse(xml: &[u8]) -> Result<Document, String> {
  let mut reader = Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut doctype: Option<String> = None;
  let mut root: Option<Element> = None;
  let mut stack: Vec<Element> = Vec::new();
  let mut buf = Vec::new();

  loop {
    let event = match reader.read_event_into(&mut buf) {
      Ok(event) => event,
      Err(e) => {
        return Err(format!("at byte {}: {e}", reader.buffer_position()));
      }
    };
    match event {
      Event::Start(ref e) => stack.push(element_from(e)?),
      Event::Empty(ref e) => {
        let element = element_from(e)?;
        attach(&mut stack, &mut root, element)?;
      }
      Event::End(_) => {
        let element = stack.pop().ok_or("unbalanced end tag")?;
        attach(&mut stack, &mut root, element)?;
      }
      Event::Text(ref e) => {
        let text = e.unescape().map_err(|e| e.to_string())?;
        if let Some(parent) = stack.last_mut()
          && !text.is_empty()
        {
          parent.children.push(Node::Text(text.into_owned()));
        }
      }
      Event::CData(e) => {
        if let Some(parent) = stack.last_mut() {
          let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
          parent.children.push(Node::CData(text));
        }
      }
      Event::DocType(ref e) => {
        if doctype.is_none() {
          doctype = Some(String::from_utf8_lossy(e).trim().to_string());
        }
      }
      Event::Eof => break,
      _ => {}
    }
    buf.clear();
  }

  if let Some(open) = stack.last() {
    return Err(format!("unclosed element <{}>", open.name));
  }
  let root = root.ok_or("document has no root element")?;
  Ok(Document { doctype, root })
}

fn element_from(start: &BytesStart<'_>) -> Result<Element, String> {
  let mut element =
    Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
  for attr in start.attributes() {
    let attr = attr.map_err(|e| e.to_string())?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    let value = attr.unescape_value().map_err(|e| e.to_string())?;
    element.attributes.push((key, value.into_owned()));
  }
  Ok(element)
}

fn attach(
  stack: &mut [Element],
  root: &mut Option<Element>,
  element: Element,
) -> Result<(), String> {
  match stack.last_mut() {
    Some(parent) => parent.children.push(Node::Element(element)),
    None if root.is_none() => *root = Some(element),
    None => return Err(format!("second root element <{}>", element.name)),
  }
  Ok(())
}

// ─── Writing ─────────────────────────────────────────────────────────────────

/// Serialise with an XML declaration and four-space indentation.
pub fn write(doc: &Document) -> Result<Vec<u8>, String> {
  let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
  emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  if let Some(doctype) = &doc.doctype {
    emit(&mut writer, Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
  }
  write_element(&mut writer, &doc.root)?;
  let mut bytes = writer.into_inner().into_inner();
  bytes.push(b'\n');
  Ok(bytes)
}

fn write_element(
  w: &mut Writer<Cursor<Vec<u8>>>,
  element: &Element,
) -> Result<(), String> {
  let mut start = BytesStart::new(element.name.as_str());
  for (key, value) in &element.attributes {
    start.push_attribute((key.as_str(), value.as_str()));
  }
  if element.children.is_empty() {
    return emit(w, Event::Empty(start));
  }
  emit(w, Event::Start(start))?;
  for child in &element.children {
    match child {
      Node::Element(e) => write_element(w, e)?,
      Node::Text(t) => emit(w, Event::Text(BytesText::new(t)))?,
      Node::CData(t) => emit(w, Event::CData(BytesCData::new(t.as_str())))?,
    }
  }
  emit(w, Event::End(BytesEnd::new(element.name.as_str())))
}

fn emit(w: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), String> {
  w.write_event(event).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  const MAPPING: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE hibernate-mapping PUBLIC "-//Hibernate/Hibernate Mapping DTD 3.0//EN" "http://www.hibernate.org/dtd/hibernate-mapping-3.0.dtd">
<hibernate-mapping package="org.example">
  <!-- the dataset table -->
  <class name="DatasetEntity" table="dataset">
    <comment>Storage of the datasets &amp; series</comment>
    <id name="id" type="long" column="dataset_id"/>
  </class>
</hibernate-mapping>"#;

  #[test]
  fn parses_tree_attributes_and_text() {
    let doc = parse(MAPPING).unwrap();
    assert_eq!(doc.root.name, "hibernate-mapping");
    assert_eq!(doc.root.attr("package"), Some("org.example"));
    let class = doc.root.child("class").unwrap();
    assert_eq!(class.attr("table"), Some("dataset"));
    assert_eq!(
      class.child("comment").unwrap().text(),
      "Storage of the datasets & series"
    );
    assert_eq!(class.elements_named("id").count(), 1);
  }

  #[test]
  fn keeps_doctype() {
    let doc = parse(MAPPING).unwrap();
    assert!(doc.doctype.as_deref().unwrap().starts_with("hibernate-mapping PUBLIC"));
    let written = String::from_utf8(write(&doc).unwrap()).unwrap();
    assert!(written.contains("<!DOCTYPE hibernate-mapping PUBLIC"));
  }

  #[test]
  fn written_document_reads_back_identically() {
    let doc = parse(MAPPING).unwrap();
    let again = parse(&write(&doc).unwrap()).unwrap();
    assert_eq!(doc, again);
  }

  #[test]
  fn mismatched_tags_are_rejected() {
    assert!(parse(b"<a><b></a>").is_err());
  }

  #[test]
  fn unclosed_document_is_rejected() {
    assert!(parse(b"<a><b/>").is_err());
  }

  #[test]
  fn empty_document_is_rejected() {
    assert!(parse(b"").is_err());
  }

  #[test]
  fn set_and_remove_attributes() {
    let mut e = Element::new("property");
    e.set_attr("name", "a");
    e.set_attr("name", "b");
    assert_eq!(e.attributes.len(), 1);
    assert_eq!(e.remove_attr("name").as_deref(), Some("b"));
    assert!(e.attr("name").is_none());
  }
}
