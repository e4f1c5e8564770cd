//! Source identity and document metadata

use crate::domain::ids::{normalize_path, SourceId, UNKNOWN};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata a document provider returns when a source is opened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub title: Option<String>,
    pub group_id: Option<String>,
    pub subgroup_id: Option<String>,
}

/// How the group and subgroup of a source were determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceReason {
    /// Both ids came from the document provider
    DocumentMetadata,
    /// At least one id came from the configured path pattern
    PathPattern,
    /// Nothing matched; ids fell back to the `Unknown` sentinel
    Unresolved,
}

impl fmt::Display for InferenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DocumentMetadata => "document_metadata",
            Self::PathPattern => "path_pattern",
            Self::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

/// Identity of one opened source
///
/// `group_id` and `subgroup_id` are never empty; they default to
/// [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIdentity {
    pub source_id: SourceId,
    pub path: String,
    pub title: String,
    pub group_id: String,
    pub subgroup_id: String,
    pub inference_reason: InferenceReason,
}

impl SourceIdentity {
    /// Builds the identity of a source from provider metadata, falling back to
    /// the optional path pattern and finally to the `Unknown` sentinel.
    ///
    /// The pattern uses named captures `group` and `subgroup`.
    pub fn infer(path: &str, meta: &DocumentMeta, group_pattern: Option<&Regex>) -> Self {
        let normalized = normalize_path(path);
        let title = non_empty(meta.title.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| crate::domain::ids::file_stem(&normalized).to_string());

        let mut group = non_empty(meta.group_id.as_deref()).map(str::to_string);
        let mut subgroup = non_empty(meta.subgroup_id.as_deref()).map(str::to_string);
        let mut reason = if group.is_some() && subgroup.is_some() {
            InferenceReason::DocumentMetadata
        } else {
            InferenceReason::Unresolved
        };

        if reason != InferenceReason::DocumentMetadata {
            if let Some(caps) = group_pattern.and_then(|re| re.captures(&normalized)) {
                let captured = |name: &str| {
                    caps.name(name)
                        .map(|m| m.as_str().trim().to_string())
                        .filter(|s| !s.is_empty())
                };
                if group.is_none() {
                    if let Some(g) = captured("group") {
                        group = Some(g);
                        reason = InferenceReason::PathPattern;
                    }
                }
                if subgroup.is_none() {
                    if let Some(s) = captured("subgroup") {
                        subgroup = Some(s);
                        reason = InferenceReason::PathPattern;
                    }
                }
            }
        }

        Self {
            source_id: SourceId::from_path(&normalized),
            path: normalized,
            title,
            group_id: group.unwrap_or_else(|| UNKNOWN.to_string()),
            subgroup_id: subgroup.unwrap_or_else(|| UNKNOWN.to_string()),
            inference_reason: reason,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
