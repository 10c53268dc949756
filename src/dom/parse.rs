//! HTML → arena document adapter used by the CLI.
//!
//! `<template shadowrootmode="open|closed">` children become a shadow root of
//! the template's parent, so declaratively-built shadow DOM is collected too.

use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::document::{Document, NodeId};
use crate::error::{AutofillError, Result};

pub fn parse_html(html: &str, url: &str) -> Result<Document> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|source| AutofillError::HtmlParse {
            context: url.to_string(),
            source,
        })?;

    let mut doc = Document::empty(url);
    let root = doc.root();
    for child in dom.document.children.borrow().iter() {
        copy_node(&mut doc, root, child);
    }

    if let Some(title) = find_title(&doc) {
        doc.set_title(&title);
    }
    Ok(doc)
}

fn copy_node(doc: &mut Document, parent: NodeId, handle: &Handle) {
    match &handle.data {
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let tag = name.local.as_ref();
            let attrs: Vec<(String, String)> = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect();

            if tag == "template" && attrs.iter().any(|(name, _)| name == "shadowrootmode") {
                if let (Some(shadow), Some(contents)) =
                    (doc.attach_shadow(parent), template_contents.borrow().as_ref())
                {
                    for child in contents.children.borrow().iter() {
                        copy_node(doc, shadow, child);
                    }
                }
                return;
            }

            let attr_refs: Vec<(&str, &str)> = attrs
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            let element = doc.append_element(parent, tag, &attr_refs);

            let children = match template_contents.borrow().as_ref() {
                Some(contents) => contents.children.borrow().clone(),
                None => handle.children.borrow().clone(),
            };
            for child in children.iter() {
                copy_node(doc, element, child);
            }
        }
        NodeData::Text { contents } => {
            doc.append_text(parent, &contents.borrow());
        }
        NodeData::Comment { contents } => {
            let comment = doc.create_comment(contents);
            doc.append_child(parent, comment);
        }
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                copy_node(doc, parent, child);
            }
        }
        _ => {}
    }
}

fn find_title(doc: &Document) -> Option<String> {
    doc.descendants(doc.root())
        .into_iter()
        .find(|&node| doc.has_tag(node, "title"))
        .map(|title| doc.text_content(title).trim().to_string())
}
