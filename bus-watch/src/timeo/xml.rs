//! XML decoding for the realtime endpoints.
//!
//! The realtime API answers `<xmldata>` documents. Decoding is tolerant
//! where the feed is sloppy: an empty body is an empty document, and a
//! listing entry missing its line code is dropped rather than failing the
//! whole payload. Only structurally broken XML is an error.

use roxmltree::{Document, Node};

use super::error::TimeoError;
use super::types::{
    ApiStatus, DescriptionData, LineData, ListingDoc, ListingEntry, MessageData, PassingData,
    ScheduleData, ScheduleDoc, StopData,
};

/// Decode a line/stop listing body (`xml=1` endpoints).
pub fn decode_listing(body: &str) -> Result<ListingDoc, TimeoError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(ListingDoc::default());
    }

    let doc = Document::parse(body).map_err(|e| TimeoError::Parse(e.to_string()))?;
    let root = root_element(&doc)?;

    let mut entries = Vec::new();
    if let Some(list) = child(root, "alss") {
        for als in list.children().filter(|n| n.has_tag_name("als")) {
            let Some(ligne) = child(als, "ligne") else {
                continue;
            };
            let Some(code) = child_text(ligne, "code") else {
                continue;
            };

            let line = LineData {
                code,
                name: child_text(ligne, "nom").unwrap_or_default(),
                direction_id: child_text(ligne, "sens").unwrap_or_default(),
                direction_name: child_text(ligne, "vers"),
                color: child_text(ligne, "couleur"),
            };

            let stop = child(als, "arret")
                .map(|arret| StopData {
                    code: child_text(arret, "code"),
                    name: child_text(arret, "nom"),
                })
                .unwrap_or_default();

            entries.push(ListingEntry {
                line,
                stop,
                reference: child_text(als, "refs"),
            });
        }
    }

    Ok(ListingDoc {
        status: decode_status(root),
        message: child(root, "message").map(decode_message),
        entries,
    })
}

/// Decode a schedule body (`xml=3` endpoint).
pub fn decode_schedules(body: &str) -> Result<ScheduleDoc, TimeoError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(ScheduleDoc::default());
    }

    let doc = Document::parse(body).map_err(|e| TimeoError::Parse(e.to_string()))?;
    let root = root_element(&doc)?;

    let mut schedules = Vec::new();
    if let Some(list) = child(root, "horaires") {
        for horaire in list.children().filter(|n| n.has_tag_name("horaire")) {
            let description = child(horaire, "description").map(|d| DescriptionData {
                stop_code: child_text(d, "code"),
                stop_name: child_text(d, "arret"),
                line_id: child_text(d, "ligne"),
                line_name: child_text(d, "ligne_nom"),
                direction_id: child_text(d, "sens"),
                direction_name: child_text(d, "vers"),
                color: child_text(d, "couleur"),
            });

            let passings = child(horaire, "passages")
                .map(|list| {
                    list.children()
                        .filter(|n| n.has_tag_name("passage"))
                        .map(|p| PassingData {
                            time: child_text(p, "duree"),
                            destination: child_text(p, "destination"),
                        })
                        .collect()
                })
                .unwrap_or_default();

            let messages = child(horaire, "messages")
                .map(|list| {
                    list.children()
                        .filter(|n| n.has_tag_name("message"))
                        .map(decode_message)
                        .collect()
                })
                .unwrap_or_default();

            schedules.push(ScheduleData {
                description,
                passings,
                messages,
            });
        }
    }

    Ok(ScheduleDoc {
        status: decode_status(root),
        message: child(root, "message").map(decode_message),
        schedules,
    })
}

fn root_element<'a, 'i>(doc: &'a Document<'i>) -> Result<Node<'a, 'i>, TimeoError> {
    let root = doc.root_element();
    if !root.has_tag_name("xmldata") {
        return Err(TimeoError::Parse(format!(
            "unexpected root element <{}>",
            root.tag_name().name()
        )));
    }
    Ok(root)
}

fn decode_status(root: Node<'_, '_>) -> Option<ApiStatus> {
    child(root, "erreur").map(|e| ApiStatus {
        code: child_text(e, "code").unwrap_or_default(),
        message: child_text(e, "message").unwrap_or_default(),
    })
}

fn decode_message(node: Node<'_, '_>) -> MessageData {
    MessageData {
        title: child_text(node, "titre"),
        body: child_text(node, "texte"),
        blocking: child_text(node, "bloquant")
            .is_some_and(|s| s.eq_ignore_ascii_case("true") || s == "1"),
    }
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Trimmed text content of a named child; empty text counts as absent.
fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
