// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! JSON-backed structured documents with typed attribute access.
//!
//! A [`Document`] is a tree of named [`Element`]s, each carrying
//! string-valued attributes and child elements. Documents are either bound to
//! a file (loaded on construction, written back by [`Document::save`]) or
//! purely in-memory (saving is a no-op). Attribute reads are typed and fail
//! with a [`DocumentError`] naming the attribute when it is absent or not
//! convertible to the requested type.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the document store.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("document io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document content: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("attribute not found: {name}")]
    AttributeMissing { name: String },

    #[error("attribute {name} is not a valid {expected}: {value:?}")]
    AttributeInvalid {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("child element not found: {name}")]
    ChildMissing { name: String },
}

/// A named node holding string attributes and nested child elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
}

impl Element {
    /// Creates an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw attribute lookup. Absence is an error, matching the typed
    /// accessors below.
    pub fn attr(&self, name: &str) -> Result<&str, DocumentError> {
        self.attributes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DocumentError::AttributeMissing { name: name.to_string() })
    }

    /// Parses an attribute into any [`FromStr`] type.
    pub fn attr_parsed<T: FromStr>(&self, name: &str) -> Result<T, DocumentError> {
        let value = self.attr(name)?;
        value.parse().map_err(|_| DocumentError::AttributeInvalid {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
            value: value.to_string(),
        })
    }

    pub fn attr_i64(&self, name: &str) -> Result<i64, DocumentError> {
        self.attr_parsed(name)
    }

    pub fn attr_f64(&self, name: &str) -> Result<f64, DocumentError> {
        self.attr_parsed(name)
    }

    pub fn attr_bool(&self, name: &str) -> Result<bool, DocumentError> {
        self.attr_parsed(name)
    }

    /// Parses an attribute as an RFC 3339 timestamp.
    pub fn attr_datetime(&self, name: &str) -> Result<DateTime<FixedOffset>, DocumentError> {
        let value = self.attr(name)?;
        DateTime::parse_from_rfc3339(value).map_err(|_| DocumentError::AttributeInvalid {
            name: name.to_string(),
            expected: "RFC 3339 timestamp",
            value: value.to_string(),
        })
    }

    /// Creates or overwrites an attribute.
    pub fn insert_attr(&mut self, name: impl Into<String>, value: impl ToString) {
        self.attributes.insert(name.into(), value.to_string());
    }

    /// Updates an existing attribute; a missing attribute is an error, this
    /// never invents one.
    pub fn set_attr(&mut self, name: &str, value: impl ToString) -> Result<(), DocumentError> {
        match self.attributes.get_mut(name) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(DocumentError::AttributeMissing { name: name.to_string() }),
        }
    }

    /// Iterates attributes in name order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First child with the given name, if any.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Like [`child`](Self::child), but absence is an error.
    pub fn require_child(&self, name: &str) -> Result<&Element, DocumentError> {
        self.child(name)
            .ok_or_else(|| DocumentError::ChildMissing { name: name.to_string() })
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

/// Name given to the root element of a freshly created document.
const ROOT_NAME: &str = "root";

/// A structured document persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct Document {
    root: Element,
    path: Option<PathBuf>,
}

impl Document {
    /// Loads the document stored at `path`. When the file does not exist, a
    /// fresh document with an empty root element is created and immediately
    /// persisted there.
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self, DocumentError> {
        let path = path.into();
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let root = serde_json::from_slice(&bytes)?;
                Ok(Self { root, path: Some(path) })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "document missing, creating fresh");
                let doc = Self {
                    root: Element::new(ROOT_NAME),
                    path: Some(path),
                };
                doc.save().await?;
                Ok(doc)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Builds a document that never touches disk, parsing `content` when one
    /// is given and non-empty.
    pub fn in_memory(content: Option<&str>) -> Result<Self, DocumentError> {
        let root = match content {
            Some(content) if !content.is_empty() => serde_json::from_str(content)?,
            _ => Element::new(ROOT_NAME),
        };
        Ok(Self { root, path: None })
    }

    /// Writes the document back to its file. No-op for in-memory documents.
    pub async fn save(&self) -> Result<(), DocumentError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(&self.root)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Backing file, when the document is file-bound.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}
