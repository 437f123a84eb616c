//! Per-family descriptors driving the generic upsert path.
//!
//! A resource family is described entirely by data: which label its entities carry,
//! how their stable identifier is synthesized, which record paths become which
//! attributes, and which relationships they imply. Adding a family means adding a
//! descriptor, not new control flow.

use crate::cleanup::CleanupJob;
use crate::errors::{Result, StorageError};
use crate::models::{Attributes, EntityType};
use crate::utils::id;
use serde_json::Value;

/// Relation from the owning account to every primary entity.
pub const OWNERSHIP_RELATION: &str = "RESOURCE";

/// Region and account an entity was enumerated under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanScope {
    pub region: String,
    pub account_id: String,
}

impl ScanScope {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    /// Dotted path into the record. Numeric segments index into lists.
    pub source: &'static str,
    pub attribute: &'static str,
}

pub const fn field(source: &'static str, attribute: &'static str) -> FieldMapping {
    FieldMapping { source, attribute }
}

#[derive(Debug)]
pub enum IdTemplate {
    /// `arn:aws:<service>:<region>:<account>:<resource>`, where each `{}` in `resource`
    /// is filled from the matching path in `parts`.
    Arn {
        service: &'static str,
        resource: &'static str,
        parts: &'static [&'static str],
    },
    /// The record's own identifier field, or `fallback` when the provider left it out.
    NativeOr {
        field: &'static str,
        fallback: &'static IdTemplate,
    },
    /// UUID-v5 key over (family, region, account, parts).
    Composite { parts: &'static [&'static str] },
}

impl IdTemplate {
    pub fn render(&self, entity_type: &EntityType, body: &Value, scope: &ScanScope) -> Result<String> {
        match self {
            IdTemplate::Arn {
                service,
                resource,
                parts,
            } => {
                let values = required_parts(entity_type, body, parts)?;
                let mut rendered = String::with_capacity(resource.len());
                let mut values = values.iter();
                for (idx, piece) in resource.split("{}").enumerate() {
                    if idx > 0 {
                        let value = values.next().ok_or_else(|| StorageError::Normalization {
                            entity_type: entity_type.label,
                            reason: format!("template '{resource}' has more slots than parts"),
                        })?;
                        rendered.push_str(value);
                    }
                    rendered.push_str(piece);
                }
                Ok(id::arn(service, &scope.region, &scope.account_id, &rendered))
            }
            IdTemplate::NativeOr { field, fallback } => match lookup_str(body, field) {
                Some(native) if !native.is_empty() => Ok(native.to_string()),
                _ => fallback.render(entity_type, body, scope),
            },
            IdTemplate::Composite { parts } => {
                let values = required_parts(entity_type, body, parts)?;
                let refs: Vec<&str> = values.iter().map(String::as_str).collect();
                Ok(id::composite_key(
                    entity_type.family,
                    &scope.region,
                    &scope.account_id,
                    &refs,
                ))
            }
        }
    }
}

fn required_parts(
    entity_type: &EntityType,
    body: &Value,
    parts: &[&str],
) -> Result<Vec<String>> {
    parts
        .iter()
        .map(|path| {
            lookup_str(body, path)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| StorageError::Normalization {
                    entity_type: entity_type.label,
                    reason: format!("missing identifier part '{path}'"),
                })
        })
        .collect()
}

/// Relationships implied by a record, resolved after the entity itself is upserted.
#[derive(Debug)]
pub enum LinkRule {
    /// `entity -relation-> role`. The field holds a role ARN or a bare role name.
    Role {
        field: &'static str,
        relation: &'static str,
        target: &'static str,
    },
    /// `entity -relation-> bucket`, bucket taken from a `scheme://bucket/path` URI.
    Bucket {
        field: &'static str,
        relation: &'static str,
        target: &'static str,
    },
    /// `parent -relation-> entity`.
    ContainedBy {
        parent: EntityType,
        relation: &'static str,
        parent_id: IdTemplate,
    },
    /// `entity -relation-> target`.
    References {
        target: EntityType,
        relation: &'static str,
        target_id: IdTemplate,
    },
}

impl LinkRule {
    pub fn relation(&self) -> &'static str {
        match self {
            LinkRule::Role { relation, .. }
            | LinkRule::Bucket { relation, .. }
            | LinkRule::ContainedBy { relation, .. }
            | LinkRule::References { relation, .. } => relation,
        }
    }
}

#[derive(Debug)]
pub struct EntityDescriptor {
    pub entity_type: EntityType,
    pub identifier: IdTemplate,
    pub fields: &'static [FieldMapping],
    pub links: &'static [LinkRule],
    /// Whether the entity hangs directly off the owning account.
    pub owned: bool,
}

impl EntityDescriptor {
    pub fn identifier(&self, body: &Value, scope: &ScanScope) -> Result<String> {
        self.identifier.render(&self.entity_type, body, scope)
    }

    /// Flattens the record through the field map. Every mapped attribute is present in
    /// the result; paths that resolve to nothing become explicit nulls.
    pub fn attributes(&self, body: &Value, scope: &ScanScope) -> Attributes {
        let mut attributes = Attributes::new();
        for mapping in self.fields {
            let value = lookup(body, mapping.source)
                .map(to_attribute_value)
                .unwrap_or(Value::Null);
            attributes.insert(mapping.attribute.to_string(), value);
        }
        attributes.insert("region".to_string(), Value::String(scope.region.clone()));
        attributes
    }
}

#[derive(Debug)]
pub struct FamilyDescriptor {
    pub name: &'static str,
    pub entities: &'static [&'static EntityDescriptor],
    pub cleanup: CleanupJob,
}

impl FamilyDescriptor {
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entities.iter().map(|e| e.entity_type.label)
    }
}

pub fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    match current {
        Value::Null => None,
        other => Some(other),
    }
}

pub fn lookup_str<'a>(body: &'a Value, path: &str) -> Option<&'a str> {
    lookup(body, path).and_then(Value::as_str)
}

fn to_attribute_value(value: &Value) -> Value {
    match value {
        Value::Array(items) if items.iter().all(is_scalar) => value.clone(),
        Value::Array(_) | Value::Object(_) => Value::String(value.to_string()),
        scalar => scalar.clone(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
