// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Documents supplied by the corpus loader.
//!
//! Records come from a large heterogeneous corpus, so every field except the
//! id is optional on the wire and the accessors fall back to something
//! sensible instead of failing.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Content type assumed when a record does not carry one
pub const DEFAULT_CONTENT_TYPE: &str = "doc";

/// A pre-parsed documentation page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Stable identifier (usually the path without extension)
    #[serde(default)]
    pub id: String,
    /// Path relative to the docs root
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Body text
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    /// Terms extracted from the body
    #[serde(default)]
    pub terms: Vec<String>,
    /// Ids or paths of documents this one links to
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Document {
    /// Create a document with an id and path
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Identifier used for graph nodes: the id, or the path when the id is blank
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.path
        } else {
            &self.id
        }
    }

    /// Title, falling back to the file stem of the path, then the key
    pub fn display_title(&self) -> String {
        if let Some(title) = self.title.as_deref().filter(|t| !t.trim().is_empty()) {
            return title.to_string();
        }
        Path::new(&self.path)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.key())
            .to_string()
    }

    /// Directory, falling back to the parent of the path (`.` at the root)
    pub fn directory_name(&self) -> String {
        if let Some(dir) = self.directory.as_deref().filter(|d| !d.is_empty()) {
            return dir.to_string();
        }
        Path::new(&self.path)
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".")
            .to_string()
    }

    pub fn content_type_name(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn word_count(&self) -> usize {
        self.word_count
            .unwrap_or_else(|| self.content.split_whitespace().count())
    }

    /// Metadata-only projection; never carries the body
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.key().to_string(),
            path: self.path.clone(),
            title: self.display_title(),
            description: self.description.clone(),
            directory: self.directory_name(),
            content_type: self.content_type_name().to_string(),
            word_count: self.word_count(),
            term_count: self.terms.len(),
            link_count: self.links.len(),
            tags: self.tags.clone(),
        }
    }

    /// Path and title only
    pub fn listing(&self) -> DocumentListing {
        DocumentListing {
            path: self.path.clone(),
            title: self.display_title(),
        }
    }
}

/// Metadata view of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub path: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub directory: String,
    pub content_type: String,
    pub word_count: usize,
    pub term_count: usize,
    pub link_count: usize,
    pub tags: Vec<String>,
}

/// Path + title entry for compact listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentListing {
    pub path: String,
    pub title: String,
}
