//! Content derivation for raw message payloads.
//!
//! Inbound payload shapes vary per channel and per message kind; this module
//! reduces them to a fixed set of content kinds plus display text and an
//! optional attachment. The classification policy is held as data (ordered
//! rule tables), and the function never fails: an unrecognized shape degrades
//! to plain text with whatever could be extracted.

use serde_json::Value;

use crate::domain::message::{Attachment, ContentKind};

/// Candidate URL fields, checked in priority order.
const URL_FIELDS: &[&str] = &[
    "attachment_url",
    "url",
    "image_url",
    "video_url",
    "audio_url",
    "document_url",
    "file_url",
];

struct ExtensionRule {
    kind: ContentKind,
    extensions: &'static [&'static str],
}

/// Extension tables reproduced from observed channel behavior.
const EXTENSION_RULES: &[ExtensionRule] = &[
    ExtensionRule {
        kind: ContentKind::Image,
        extensions: &["jpg", "jpeg", "png", "webp", "bmp", "tiff"],
    },
    ExtensionRule {
        kind: ContentKind::Gif,
        extensions: &["gif"],
    },
    ExtensionRule {
        kind: ContentKind::Video,
        extensions: &["mp4", "webm", "m4v", "mov", "3gp", "mkv"],
    },
    ExtensionRule {
        kind: ContentKind::Audio,
        extensions: &["mp3", "wav", "ogg", "m4a", "aac"],
    },
    ExtensionRule {
        kind: ContentKind::File,
        extensions: &[
            "pdf", "doc", "docx", "ppt", "pptx", "xls", "xlsx", "csv", "txt",
        ],
    },
];

/// Explicit type hints some channels attach when the URL carries no extension.
const TYPE_HINTS: &[(&str, ContentKind)] = &[
    ("text", ContentKind::Text),
    ("image", ContentKind::Image),
    ("photo", ContentKind::Image),
    ("video", ContentKind::Video),
    ("audio", ContentKind::Audio),
    ("file", ContentKind::File),
    ("document", ContentKind::File),
    ("gif", ContentKind::Gif),
    ("carousel", ContentKind::Carousel),
    ("interactive", ContentKind::Interactive),
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DerivedContent {
    pub text: String,
    pub kind: ContentKind,
    pub attachment: Option<Attachment>,
    /// Carousel elements, passed through unmodified for downstream rendering.
    pub elements: Option<Value>,
}

/// Derives display text, content kind, and attachment from a raw message.
pub fn derive(raw: &Value) -> DerivedContent {
    let body = unwrap_body(raw);
    let mut text = extract_text(&body, raw);

    // A classifiable media URL outranks an elements array; elements riding
    // along with a real attachment describe it, they are not a carousel.
    if let Some(url) = extract_url(&body) {
        if let Some(kind) = classify_url(&url).or_else(|| type_hint(&body)) {
            if kind != ContentKind::Text {
                let attachment = build_attachment(&body, url, &text);
                return DerivedContent {
                    text,
                    kind,
                    attachment: Some(attachment),
                    elements: None,
                };
            }
        }
        // A URL we cannot classify is left to render as plain text.
    }

    if let Some(elements) = body.get("elements").filter(|value| value.is_array()) {
        return DerivedContent {
            text,
            kind: ContentKind::Carousel,
            attachment: None,
            elements: Some(elements.clone()),
        };
    }

    if let Some(hint) = type_hint(&body).filter(|kind| *kind != ContentKind::Text) {
        return DerivedContent {
            text,
            kind: hint,
            attachment: None,
            elements: None,
        };
    }

    if let Some(embedded) = find_embedded_image_url(&text) {
        text = strip_token(&text, &embedded);
        let attachment = build_attachment(&body, embedded, &text);
        return DerivedContent {
            text,
            kind: ContentKind::Image,
            attachment: Some(attachment),
            elements: None,
        };
    }

    DerivedContent {
        text,
        kind: ContentKind::Text,
        attachment: None,
        elements: None,
    }
}

/// Some channels double-encode the body as a JSON string.
fn unwrap_body(raw: &Value) -> Value {
    match raw.get("body") {
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) if parsed.is_object() || parsed.is_array() => parsed,
            _ => Value::String(text.clone()),
        },
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

fn extract_text(body: &Value, raw: &Value) -> String {
    if let Value::String(text) = body {
        return text.clone();
    }

    for field in ["text", "caption"] {
        if let Some(text) = body.get(field).and_then(Value::as_str) {
            return text.to_owned();
        }
    }

    raw.get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn extract_url(body: &Value) -> Option<String> {
    URL_FIELDS.iter().find_map(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_owned)
    })
}

fn classify_url(url: &str) -> Option<ContentKind> {
    let extension = url_extension(url)?;
    EXTENSION_RULES
        .iter()
        .find(|rule| rule.extensions.contains(&extension.as_str()))
        .map(|rule| rule.kind)
}

/// Extracts the lowercase file extension, with query and fragment stripped.
fn url_extension(url: &str) -> Option<String> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (_, extension) = segment.rsplit_once('.')?;

    if extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn type_hint(body: &Value) -> Option<ContentKind> {
    let hint = body.get("type").and_then(Value::as_str)?;
    let normalized = hint.trim().to_ascii_lowercase();
    TYPE_HINTS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, kind)| *kind)
}

fn build_attachment(body: &Value, url: String, text: &str) -> Attachment {
    let caption = body
        .get("caption")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| (!text.is_empty()).then(|| text.to_owned()));
    let filename = body
        .get("filename")
        .or_else(|| body.get("file_name"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or_else(|| url_filename(&url));
    let filesize = body
        .get("filesize")
        .or_else(|| body.get("file_size"))
        .and_then(Value::as_u64);

    Attachment {
        url,
        caption,
        filename,
        filesize,
    }
}

fn url_filename(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    (segment.contains('.') && !segment.is_empty()).then(|| segment.to_owned())
}

/// Scans plain text for a bare image URL embedded by upstream formatters.
fn find_embedded_image_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|token| {
            (token.starts_with("http://") || token.starts_with("https://"))
                && classify_url(token) == Some(ContentKind::Image)
        })
        .map(str::to_owned)
}

fn strip_token(text: &str, token: &str) -> String {
    text.split_whitespace()
        .filter(|candidate| *candidate != token)
        .collect::<Vec<_>>()
        .join(" ")
}
