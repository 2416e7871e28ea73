//! archive.org JSON response types
//!
//! Only the fields the player reads are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

/// `advancedsearch.php` response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub response: SearchDocs,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchDocs {
    #[serde(rename = "numFound", default)]
    pub num_found: u64,
    #[serde(default)]
    pub docs: Vec<SearchDoc>,
}

/// One search hit; only the identifier field is requested
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchDoc {
    pub identifier: String,
}

impl SearchResponse {
    /// Show identifiers in response order
    pub fn identifiers(self) -> Vec<String> {
        self.response.docs.into_iter().map(|d| d.identifier).collect()
    }
}

/// `/metadata/{identifier}` response
///
/// The archive answers `{}` for unknown identifiers, so both keys default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShowMetadata {
    #[serde(default)]
    pub files: Vec<AudioFileEntry>,
    #[serde(default)]
    pub metadata: ShowDetails,
}

/// One file of a show
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AudioFileEntry {
    /// Path of the file within the show (may contain `/`)
    pub name: String,
    /// Format tag, e.g. "VBR MP3", "Flac", "Checksums"
    #[serde(default)]
    pub format: String,
}

/// Descriptive metadata of a show
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShowDetails {
    #[serde(default)]
    date: Option<FieldValue>,
    #[serde(default)]
    title: Option<FieldValue>,
    #[serde(default)]
    creator: Option<FieldValue>,
}

/// Metadata values are a string or a list of strings depending on the item
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
enum FieldValue {
    One(String),
    Many(Vec<String>),
    Other(serde_json::Value),
}

impl FieldValue {
    fn first(&self) -> Option<&str> {
        match self {
            FieldValue::One(s) => Some(s.as_str()),
            FieldValue::Many(v) => v.first().map(String::as_str),
            FieldValue::Other(_) => None,
        }
    }
}

impl ShowDetails {
    pub fn new(date: Option<&str>, title: Option<&str>, creator: Option<&str>) -> Self {
        let wrap = |v: Option<&str>| v.map(|s| FieldValue::One(s.to_string()));
        Self {
            date: wrap(date),
            title: wrap(title),
            creator: wrap(creator),
        }
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_ref().and_then(FieldValue::first)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_ref().and_then(FieldValue::first)
    }

    pub fn creator(&self) -> Option<&str> {
        self.creator.as_ref().and_then(FieldValue::first)
    }
}
