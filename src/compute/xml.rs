// src/compute/xml.rs
//! Xml2Csv: turn repeating XML records held in `rawData` into rows.

use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::table::{line_to_list, table_to_csv, SourceTable, TABLE_SEP};

/// Minimal owned element tree; enough for path lookups.
#[derive(Debug, Default)]
struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn element_from(start: &BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.with_context(|| format!("bad attribute on <{}>", name))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..Default::default()
    })
}

fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    let mut attach = |stack: &mut Vec<XmlElement>, element: XmlElement| {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(element);
        } else if root.is_none() {
            root = Some(element);
        }
    };

    loop {
        match reader.read_event().context("parsing XML rawData")? {
            Event::Start(e) => stack.push(element_from(&e)?),
            Event::Empty(e) => {
                let element = element_from(&e)?;
                attach(&mut stack, element);
            }
            Event::End(_) => {
                let element = stack.pop().context("unbalanced closing tag")?;
                attach(&mut stack, element);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        bail!("unclosed element <{}>", stack[stack.len() - 1].name);
    }
    root.context("XML document has no root element")
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').map(str::trim).filter(|s| !s.is_empty()).collect()
}

/// Every chain of elements reached by following `segments` below `from`.
/// The last element of each chain is the match.
fn chains<'e>(from: &'e XmlElement, segments: &[&str]) -> Vec<Vec<&'e XmlElement>> {
    let mut out: Vec<Vec<&XmlElement>> = vec![Vec::new()];
    for segment in segments {
        out = out
            .into_iter()
            .flat_map(|chain| {
                let parent = chain.last().copied().unwrap_or(from);
                parent
                    .children
                    .iter()
                    .filter(|child| child.name == *segment)
                    .map(|child| {
                        let mut next = chain.clone();
                        next.push(child);
                        next
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
    }
    out
}

fn records<'e>(root: &'e XmlElement, record_tag: &str) -> Vec<&'e XmlElement> {
    let segments = path_segments(record_tag);
    // Absolute from the document root, or relative to it
    let relative: &[&str] = match segments.split_first() {
        Some((first, rest)) if *first == root.name => rest,
        _ => &segments,
    };
    if relative.is_empty() {
        return vec![root];
    }
    chains(root, relative)
        .into_iter()
        .filter_map(|chain| chain.last().copied())
        .collect()
}

/// `path>attribute` or `path` (element text), relative to the record.
struct Property<'p> {
    segments: Vec<&'p str>,
    attribute: Option<&'p str>,
}

impl<'p> Property<'p> {
    fn parse(text: &'p str) -> Self {
        let (path, attribute) = match text.split_once('>') {
            Some((path, attr)) => (path, Some(attr.trim())),
            None => (text, None),
        };
        Self {
            segments: path_segments(path),
            attribute,
        }
    }

    fn value_of(&self, element: &XmlElement) -> String {
        match self.attribute {
            Some(attr) => element.attribute(attr).unwrap_or_default().to_string(),
            None => element.text.trim().to_string(),
        }
    }

    fn is_prefix_of(&self, other: &Property) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }
}

fn record_rows(record: &XmlElement, properties: &[Property]) -> Vec<Vec<String>> {
    // The deepest property path that repeats drives the row count
    let driver = properties
        .iter()
        .filter(|p| !p.segments.is_empty())
        .map(|p| (p, chains(record, &p.segments)))
        .filter(|(_, found)| found.len() > 1)
        .max_by_key(|(p, _)| p.segments.len());

    match driver {
        Some((driver, found)) => found
            .iter()
            .map(|chain| {
                properties
                    .iter()
                    .map(|p| resolve(record, p, Some((chain.as_slice(), driver))))
                    .collect()
            })
            .collect(),
        None => vec![properties
            .iter()
            .map(|p| resolve(record, p, None))
            .collect()],
    }
}

/// Value of `property` for one row. Properties on the driving path read the
/// element of the current match; the others read their first match.
fn resolve(
    record: &XmlElement,
    property: &Property,
    current: Option<(&[&XmlElement], &Property)>,
) -> String {
    if property.segments.is_empty() {
        return property.value_of(record);
    }
    if let Some((chain, driver)) = current {
        if property.is_prefix_of(driver) {
            return property.value_of(chain[property.segments.len() - 1]);
        }
    }
    chains(record, &property.segments)
        .first()
        .and_then(|chain| chain.last())
        .map(|element| property.value_of(element))
        .unwrap_or_default()
}

pub fn xml_to_csv(
    table: &mut SourceTable,
    record_tag: Option<&str>,
    properties: Option<&str>,
) -> Result<()> {
    let record_tag = record_tag
        .filter(|t| !t.trim().is_empty())
        .context("no record tag")?;
    let properties = line_to_list(properties.context("no properties")?, TABLE_SEP);
    if properties.is_empty() {
        bail!("no properties");
    }
    let raw = match table.raw_data.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => bail!("no XML to flatten"),
    };

    let root = parse_document(raw)?;
    let properties: Vec<Property> = properties.iter().map(|p| Property::parse(p)).collect();

    let rows: Vec<Vec<String>> = records(&root, record_tag)
        .into_iter()
        .flat_map(|record| record_rows(record, &properties))
        .collect();
    if rows.is_empty() {
        bail!("no <{}> record found", record_tag);
    }

    debug!("xml_to_csv: {} row(s) from {:?}", rows.len(), record_tag);
    table.raw_data = Some(table_to_csv(&rows, TABLE_SEP));
    table.table = rows;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::rows;

    const FANS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<configResolveClass cookie="abc" classId="equipmentFan">
  <outConfigs>
    <equipmentFan dn="sys/chassis-1/fan-1" id="1" operState="operable"><speed>4200</speed></equipmentFan>
    <equipmentFan dn="sys/chassis-1/fan-2" id="2" operState="inoperable"><speed>0</speed></equipmentFan>
  </outConfigs>
</configResolveClass>"#;

    #[test]
    fn one_row_per_record() -> Result<()> {
        let mut t = SourceTable::from_raw(FANS);
        xml_to_csv(
            &mut t,
            Some("/configResolveClass/outConfigs/equipmentFan"),
            Some(">id;>operState;speed"),
        )?;
        assert_eq!(
            t.table,
            rows(&[&["1", "operable", "4200"], &["2", "inoperable", "0"]])
        );
        assert_eq!(
            t.raw_data.as_deref(),
            Some("1;operable;4200;\n2;inoperable;0;")
        );
        Ok(())
    }

    #[test]
    fn repeating_descendants_fan_out() -> Result<()> {
        let mut t = SourceTable::from_raw(FANS);
        xml_to_csv(
            &mut t,
            Some("configResolveClass"),
            Some(">classId;outConfigs/equipmentFan>dn;outConfigs/equipmentFan/speed"),
        )?;
        assert_eq!(
            t.table,
            rows(&[
                &["equipmentFan", "sys/chassis-1/fan-1", "4200"],
                &["equipmentFan", "sys/chassis-1/fan-2", "0"],
            ])
        );
        Ok(())
    }

    #[test]
    fn missing_records_leave_state_unchanged() {
        let mut t = SourceTable::from_raw(FANS);
        assert!(xml_to_csv(&mut t, Some("/configResolveClass/nothing"), Some(">id")).is_err());
        assert!(xml_to_csv(&mut t, None, Some(">id")).is_err());
        assert_eq!(t, SourceTable::from_raw(FANS));

        let mut t = SourceTable::from_raw("<a><b></a>");
        assert!(xml_to_csv(&mut t, Some("a"), Some("b")).is_err());
    }
}
