//! Common types used across paperlens

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownEntityType;

/// One of the six roles in the human–GenAI interaction model
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "H")]
    Human,
    #[serde(rename = "T")]
    TextPrompt,
    #[serde(rename = "I")]
    Interaction,
    #[serde(rename = "Aug")]
    AugmentedInstruction,
    #[serde(rename = "A")]
    Artifact,
    #[serde(rename = "G")]
    GenAi,
}

impl EntityType {
    /// All entity types, in registry order
    pub const ALL: [EntityType; 6] = [
        EntityType::Human,
        EntityType::TextPrompt,
        EntityType::Interaction,
        EntityType::AugmentedInstruction,
        EntityType::Artifact,
        EntityType::GenAi,
    ];

    /// Short tag used in diagrams and serialized data
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Human => "H",
            EntityType::TextPrompt => "T",
            EntityType::Interaction => "I",
            EntityType::AugmentedInstruction => "Aug",
            EntityType::Artifact => "A",
            EntityType::GenAi => "G",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = UnknownEntityType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownEntityType(s.to_string()))
    }
}

/// A directed relation from one entity type to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkedEntity {
    pub from: EntityType,
    pub to: EntityType,
    pub purpose: &'static str,
}

/// Static definition of an entity type
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: &'static str,
    pub description: &'static str,
    pub linked_entities: &'static [LinkedEntity],
}

/// A positioned node in the interaction diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub x: u32,
    pub y: u32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub row: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub col: Option<u32>,
}

/// A directed, identified relation drawn on an annotation diagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub from: EntityType,
    pub to: EntityType,
    pub purpose: String,
    /// Step indices at which this edge fires in a multi-step flow
    #[serde(default)]
    pub sequence: Vec<u32>,
    #[serde(default)]
    pub is_active: bool,
}

impl GraphEdge {
    /// Create an inactive edge with id `"{from}-{to}"`, using the registry's
    /// purpose text when the relation is defined
    pub fn new(from: EntityType, to: EntityType) -> Self {
        let purpose = crate::graph::relation(from, to)
            .map(|link| link.purpose.to_string())
            .unwrap_or_default();
        Self {
            id: format!("{from}-{to}"),
            from,
            to,
            purpose,
            sequence: Vec::new(),
            is_active: false,
        }
    }

    /// Whether `from -> to` is one of the registry's relations
    pub fn is_defined_relation(&self) -> bool {
        crate::graph::relation(self.from, self.to).is_some()
    }
}

/// Title used when a record has none
pub const UNTITLED: &str = "Untitled";

/// A cleaned bibliography entry
///
/// Serializes as one flat JSON object: the fixed attributes merged with every
/// generic field. `fields` holds all fields of the source record under their
/// lowercased names, including the promoted ones; its `title` is the
/// effective title and it never carries an `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct BibEntry {
    pub id: String,
    pub entry_type: Option<String>,
    pub title: String,
    pub author: Option<String>,
    pub year: Option<String>,
    pub journal: Option<String>,
    pub booktitle: Option<String>,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub fields: BTreeMap<String, JsonValue>,
}

impl BibEntry {
    /// Look up any field by its lowercased name
    pub fn field(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }

    /// Look up a string-valued field by its lowercased name
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(JsonValue::as_str)
    }

    fn promoted(&self) -> [(&'static str, Option<&String>); 6] {
        [
            ("author", self.author.as_ref()),
            ("year", self.year.as_ref()),
            ("journal", self.journal.as_ref()),
            ("booktitle", self.booktitle.as_ref()),
            ("url", self.url.as_ref()),
            ("doi", self.doi.as_ref()),
        ]
    }

    /// Flat JSON form. `id` and `title` always reflect the typed values.
    pub fn to_json_map(&self) -> Map<String, JsonValue> {
        let mut map: Map<String, JsonValue> = self
            .fields
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        for (key, value) in self.promoted() {
            if let Some(value) = value {
                map.insert(key.to_string(), JsonValue::String(value.clone()));
            }
        }
        if let Some(entry_type) = &self.entry_type {
            map.insert("entryType".to_string(), JsonValue::String(entry_type.clone()));
        }
        map.insert("title".to_string(), JsonValue::String(self.title.clone()));
        map.insert("id".to_string(), JsonValue::String(self.id.clone()));
        map
    }

    /// Rebuild an entry from its flat JSON form
    pub fn from_json_map(mut map: Map<String, JsonValue>) -> Self {
        let id = map
            .remove("id")
            .and_then(|value| value.as_str().map(str::to_string))
            .filter(|id| !id.is_empty())
            .unwrap_or_else(crate::bibtex::generate_id);
        let entry_type = map
            .remove("entryType")
            .and_then(|value| value.as_str().map(str::to_string));

        let text = |key: &str| map.get(key).and_then(JsonValue::as_str).map(str::to_string);
        let title = text("title")
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        Self {
            id,
            entry_type,
            title,
            author: text("author"),
            year: text("year"),
            journal: text("journal"),
            booktitle: text("booktitle"),
            url: text("url"),
            doi: text("doi"),
            fields: map.into_iter().collect(),
        }
    }
}

impl Serialize for BibEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BibEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, JsonValue>::deserialize(deserializer)?;
        Ok(Self::from_json_map(map))
    }
}

/// A saved set of diagram edges describing one interaction pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTemplate {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub edges: Vec<GraphEdge>,
    pub created_at: String,
    pub updated_at: String,
}

impl AnnotationTemplate {
    /// New template stamped with the current time
    pub fn new(id: impl Into<String>, name: Option<String>, edges: Vec<GraphEdge>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            name,
            edges,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Edges that are currently highlighted
    pub fn active_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(|edge| edge.is_active)
    }

    /// Edges whose endpoints are not a relation of the entity registry
    pub fn undefined_edges(&self) -> Vec<&GraphEdge> {
        self.edges
            .iter()
            .filter(|edge| !edge.is_defined_relation())
            .collect()
    }
}

/// Annotation attached to a paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperAnnotation {
    #[serde(default)]
    pub templates: Vec<AnnotationTemplate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub annotator: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl PaperAnnotation {
    pub fn template(&self, id: &str) -> Option<&AnnotationTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }
}

/// A bibliography entry as shown in the viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    #[serde(flatten)]
    pub entry: BibEntry,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub teaser_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub annotation: Option<PaperAnnotation>,
}

impl Paper {
    pub fn id(&self) -> &str {
        &self.entry.id
    }
}
