//! Test-side tree builder.
//!
//! Parses small XML snippets into [`Tree`] values so scenarios can be
//! written as literals. An element containing only text becomes a node with
//! that text as its value; mixed content produces unlabeled text leaves at
//! their document positions. Whitespace-only chunks between elements are
//! dropped.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use semdiff::{NodeData, NodeId, Tree};

struct Frame {
    id: NodeId,
    had_element_child: bool,
    pending: String,
}

/// Parses an XML snippet into a tree rooted at the document element.
pub fn parse(xml: &str) -> Tree {
    let mut reader = Reader::from_reader(xml.as_bytes());
    let mut buf = Vec::new();

    let mut tree: Option<Tree> = None;
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let data = element_data(e);
                match tree {
                    None => {
                        let t = Tree::new(data);
                        stack.push(Frame {
                            id: t.root(),
                            had_element_child: false,
                            pending: String::new(),
                        });
                        tree = Some(t);
                    }
                    Some(ref mut t) => {
                        let parent = stack.last_mut().expect("element outside root");
                        flush_text(t, parent);
                        parent.had_element_child = true;
                        let parent_id = parent.id;
                        let id = t.add_child(parent_id, data);
                        stack.push(Frame {
                            id,
                            had_element_child: false,
                            pending: String::new(),
                        });
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                let data = element_data(e);
                match tree {
                    None => {
                        tree = Some(Tree::new(data));
                    }
                    Some(ref mut t) => {
                        let parent = stack.last_mut().expect("element outside root");
                        flush_text(t, parent);
                        parent.had_element_child = true;
                        let parent_id = parent.id;
                        t.add_child(parent_id, data);
                    }
                }
            }
            Ok(Event::End(_)) => {
                let mut frame = stack.pop().expect("unbalanced end tag");
                let t = tree.as_mut().expect("end tag before root");
                if frame.had_element_child {
                    flush_text(t, &mut frame);
                } else {
                    let text = frame.pending.trim();
                    if !text.is_empty() {
                        t.set_value(frame.id, Some(text.to_string()));
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref()).expect("non-utf8 text");
                let text = unescape(raw).expect("bad entity");
                if let Some(frame) = stack.last_mut() {
                    frame.pending.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => panic!("XML parse error: {}", e),
        }
        buf.clear();
    }

    tree.expect("no root element")
}

/// Flushes accumulated mixed-content text as an unlabeled leaf.
fn flush_text(tree: &mut Tree, frame: &mut Frame) {
    let text = frame.pending.trim();
    if !text.is_empty() {
        tree.add_child(frame.id, NodeData::text(text.to_string()));
    }
    frame.pending.clear();
}

fn element_data(e: &BytesStart) -> NodeData {
    let label = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut data = NodeData::element(label);
    for attr in e.attributes() {
        let attr = attr.expect("bad attribute");
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().expect("bad attribute value").to_string();
        data = data.with_attribute(key, value);
    }
    data
}
