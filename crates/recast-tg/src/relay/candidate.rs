use super::{link_filter, sanitize};

/// A single raw message pulled from a source channel, before any filtering.
/// This is the shape the [`super::Source`] collaborator hands over.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawPost {
    pub(crate) text: Option<String>,
    pub(crate) caption: Option<String>,
    pub(crate) photo_id: Option<String>,
    pub(crate) video_id: Option<String>,
    pub(crate) document_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub(crate) enum CandidateKind {
    Text,
    Photo,
    Video,
    Document,
}

/// A message eligible for relaying: it carries retrievable content, its text
/// passed the link filter, and it was sanitized.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub(crate) kind: CandidateKind,
    pub(crate) text: Option<String>,
    pub(crate) caption: Option<String>,
    pub(crate) file_id: Option<String>,
    pub(crate) source_channel: String,
}

impl Candidate {
    /// Builds a candidate from a raw post, or returns [`None`] if the post
    /// carries a link that disqualifies it, or has no retrievable content.
    ///
    /// The link filter runs on the raw text, before sanitization strips the
    /// very URLs the filter is looking for.
    pub(crate) fn from_raw(raw: RawPost, source_channel: &str) -> Option<Self> {
        let raw_text = raw.text.as_deref().or(raw.caption.as_deref());

        if let Some(raw_text) = raw_text {
            if link_filter::contains_unwanted_links(raw_text, source_channel) {
                return None;
            }
        }

        let text = raw
            .text
            .as_deref()
            .map(|text| sanitize::sanitize_text(text, source_channel));
        let caption = raw
            .caption
            .as_deref()
            .map(|caption| sanitize::sanitize_text(caption, source_channel));

        let (kind, file_id) = if raw.photo_id.is_some() {
            (CandidateKind::Photo, raw.photo_id)
        } else if raw.video_id.is_some() {
            (CandidateKind::Video, raw.video_id)
        } else if raw.document_id.is_some() {
            (CandidateKind::Document, raw.document_id)
        } else if text.as_deref().is_some_and(|text| !text.is_empty()) {
            (CandidateKind::Text, None)
        } else {
            // Unsupported content (e.g. a sticker), or text that sanitized
            // down to nothing
            return None;
        };

        Some(Self {
            kind,
            text,
            caption,
            file_id,
            source_channel: source_channel.to_owned(),
        })
    }

    /// The value recorded in the published set to suppress duplicates.
    /// Priority: text, else caption, else the media file id.
    pub(crate) fn identity(&self) -> &str {
        self.text
            .as_deref()
            .filter(|text| !text.is_empty())
            .or(self.caption.as_deref().filter(|caption| !caption.is_empty()))
            .or(self.file_id.as_deref())
            .unwrap_or_default()
    }
}
