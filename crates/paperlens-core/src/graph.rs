//! The human–GenAI entity registry and its diagram layout

use std::fmt::Write as FmtWrite;

use serde::Serialize;

pub use crate::types::{Entity, EntityType, GraphEdge, GraphNode, LinkedEntity};

use crate::types::EntityType::{
    Artifact as A, AugmentedInstruction as Aug, GenAi as G, Human as H, Interaction as I,
    TextPrompt as T,
};

/// Entity definitions, indexed by `EntityType` declaration order
pub static ENTITIES: [Entity; 6] = [
    Entity {
        entity_type: H,
        name: "Human",
        description: "The end user who holds the intent and provides inputs to the GenAI system. The human composes text prompts and performs interactions to communicate with the AI. Humans cannot directly manipulate the GenAI except via these inputs.",
        linked_entities: &[
            LinkedEntity {
                from: H,
                to: T,
                purpose: "The user writes and refines a text prompt, which is the primary natural-language instruction conveying intent.",
            },
            LinkedEntity {
                from: H,
                to: I,
                purpose: "The user performs interactive actions (e.g., clicking, highlighting, dragging) on the interface or artifacts to supplement or refine the prompt.",
            },
        ],
    },
    Entity {
        entity_type: T,
        name: "Text Prompts",
        description: "The natural-language instruction(s) authored by the user to convey intent. Text prompts are intuitive but can be ambiguous or underspecified. They do not directly modify artifacts without the GenAI system.",
        linked_entities: &[
            LinkedEntity {
                from: T,
                to: Aug,
                purpose: "The text prompt is incorporated into the Augmented Instruction (combined with interaction-derived information).",
            },
            LinkedEntity {
                from: T,
                to: G,
                purpose: "The text prompt alone is sent to the GenAI as input for generating or operating on artifacts.",
            },
        ],
    },
    Entity {
        entity_type: I,
        name: "Interaction",
        description: "Supplementary user inputs (e.g. clicking, selecting, sketching, or annotating) that accompany text prompts. Interactions provide precise constraints or context (e.g., choosing a region of an image or adding an inline note) but by themselves do not generate output.",
        linked_entities: &[
            LinkedEntity {
                from: I,
                to: Aug,
                purpose: "Interaction inputs are integrated into the augmented instruction, adding detail or constraints to the original prompt.",
            },
            LinkedEntity {
                from: I,
                to: T,
                purpose: "An interaction may modify the text prompt itself.",
            },
            LinkedEntity {
                from: I,
                to: A,
                purpose: "The user's interactions act directly on domain artifacts (e.g. clicking/highlighting parts of an image or document) to specify or restrict the scope of the GenAI task.",
            },
        ],
    },
    Entity {
        entity_type: Aug,
        name: "Augmented Instruction",
        description: "The combined instruction delivered to GenAI, formed by merging the text prompt with information derived from interactions. It encapsulates the user's intent in a form the AI can execute. It is transient and exists only as the input to GenAI.",
        linked_entities: &[LinkedEntity {
            from: Aug,
            to: G,
            purpose: "The augmented instruction is passed to the GenAI for execution. GenAI uses this enriched instruction to generate content or perform actions.",
        }],
    },
    Entity {
        entity_type: A,
        name: "Artifacts",
        description: "The domain objects (e.g. text passages, images, code, datasets, or other outputs) that GenAI reads or operates on. They are the targets of GenAI's operations and the substrate of user interactions. Artifacts are not instructions themselves.",
        linked_entities: &[
            LinkedEntity {
                from: A,
                to: Aug,
                purpose: "User interactions on an artifact (e.g., highlighting a paragraph) are incorporated into Augmented Instruction.",
            },
            LinkedEntity {
                from: A,
                to: G,
                purpose: "Artifacts used as contextual input to GenAI.",
            },
        ],
    },
    Entity {
        entity_type: G,
        name: "GenAI",
        description: "The AI system (e.g. an LLM or text-to-image model) that processes instructions and performs generation or manipulation of artifacts. GenAI interprets the augmented instruction and takes action accordingly. It does not initiate actions on its own without input.",
        linked_entities: &[
            LinkedEntity {
                from: G,
                to: A,
                purpose: "Upon receiving the augmented instruction, GenAI operates on artifacts by generating new content or triggering operations on domain objects (e.g. creating an image, editing a document).",
            },
            LinkedEntity {
                from: G,
                to: I,
                purpose: "Can initiate interaction prompts (e.g., suggesting follow-up options or UI elements for user action).",
            },
        ],
    },
];

impl EntityType {
    /// The static definition of this entity type
    pub fn entity(self) -> &'static Entity {
        &ENTITIES[self as usize]
    }

    /// Icon name shown on the diagram node
    pub fn icon(self) -> &'static str {
        match self {
            H => "User",
            T => "FileText",
            I => "MousePointer",
            Aug => "FileCheck",
            A => "Database",
            G => "Cpu",
        }
    }
}

/// Every relation in the registry, grouped by source entity
pub fn relations() -> impl Iterator<Item = &'static LinkedEntity> {
    ENTITIES.iter().flat_map(|entity| entity.linked_entities.iter())
}

/// The defined relation `from -> to`, if any
pub fn relation(from: EntityType, to: EntityType) -> Option<&'static LinkedEntity> {
    from.entity()
        .linked_entities
        .iter()
        .find(|link| link.to == to)
}

/// One inactive edge per registry relation
pub fn default_edges() -> Vec<GraphEdge> {
    relations()
        .map(|link| GraphEdge::new(link.from, link.to))
        .collect()
}

/// Grid cell assigned to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutSlot {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub row: u32,
    pub col: u32,
}

/// Two rows of three columns plus shared sizing
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayout {
    pub nodes: &'static [LayoutSlot],
    pub node_size: u32,
    pub horizontal_spacing: u32,
    pub vertical_spacing: u32,
    pub padding: u32,
}

pub const GRAPH_LAYOUT: GraphLayout = GraphLayout {
    nodes: &[
        LayoutSlot { entity_type: H, row: 0, col: 0 },
        LayoutSlot { entity_type: I, row: 0, col: 1 },
        LayoutSlot { entity_type: A, row: 0, col: 2 },
        LayoutSlot { entity_type: T, row: 1, col: 0 },
        LayoutSlot { entity_type: Aug, row: 1, col: 1 },
        LayoutSlot { entity_type: G, row: 1, col: 2 },
    ],
    node_size: 100,
    horizontal_spacing: 200,
    vertical_spacing: 150,
    padding: 50,
};

impl GraphLayout {
    pub fn slot(&self, entity_type: EntityType) -> Option<&LayoutSlot> {
        self.nodes.iter().find(|slot| slot.entity_type == entity_type)
    }

    /// Place every slot on the pixel grid
    pub fn nodes(&self) -> Vec<GraphNode> {
        self.nodes
            .iter()
            .map(|slot| GraphNode {
                entity_type: slot.entity_type,
                x: self.padding + slot.col * self.horizontal_spacing,
                y: self.padding + slot.row * self.vertical_spacing,
                label: slot.entity_type.entity().name.to_string(),
                icon: Some(slot.entity_type.icon().to_string()),
                row: Some(slot.row),
                col: Some(slot.col),
            })
            .collect()
    }
}

/// Render the six entities and the given edges as a Mermaid flowchart
///
/// Edges are labelled with their step sequence; active edges are drawn thick.
pub fn to_mermaid(edges: &[GraphEdge]) -> String {
    let mut out = String::from("graph LR\n");

    for slot in GRAPH_LAYOUT.nodes {
        let _ = writeln!(
            out,
            "  {id}[\"{label}\"]",
            id = slot.entity_type,
            label = escape_mermaid_label(slot.entity_type.entity().name)
        );
    }

    for edge in edges {
        let arrow = if edge.is_active { "==>" } else { "-->" };
        if edge.sequence.is_empty() {
            let _ = writeln!(out, "  {} {arrow} {}", edge.from, edge.to);
        } else {
            let steps = edge
                .sequence
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "  {} {arrow}|{steps}| {}", edge.from, edge.to);
        }
    }

    out.truncate(out.trim_end().len());
    out
}

fn escape_mermaid_label(label: &str) -> String {
    label.replace('"', "#quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_entities_follow_declaration_order() {
        for ty in EntityType::ALL {
            assert_eq!(ty.entity().entity_type, ty);
        }
    }

    #[test]
    fn test_relation_pairs_are_stable() {
        let pairs: Vec<(&str, &str)> = relations()
            .map(|link| (link.from.as_str(), link.to.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("H", "T"),
                ("H", "I"),
                ("T", "Aug"),
                ("T", "G"),
                ("I", "Aug"),
                ("I", "T"),
                ("I", "A"),
                ("Aug", "G"),
                ("A", "Aug"),
                ("A", "G"),
                ("G", "A"),
                ("G", "I"),
            ]
        );
    }

    #[test]
    fn test_linked_entities_start_at_owner() {
        for entity in &ENTITIES {
            for link in entity.linked_entities {
                assert_eq!(link.from, entity.entity_type);
            }
        }
    }

    #[test]
    fn test_relation_lookup() {
        let link = relation(EntityType::AugmentedInstruction, EntityType::GenAi).unwrap();
        assert!(link.purpose.starts_with("The augmented instruction"));

        // The human never talks to the model directly
        assert!(relation(EntityType::Human, EntityType::GenAi).is_none());
        assert!(relation(EntityType::Human, EntityType::Artifact).is_none());
    }

    #[test]
    fn test_default_edges() {
        let edges = default_edges();
        assert_eq!(edges.len(), 12);
        assert!(edges.iter().all(|edge| !edge.is_active && edge.sequence.is_empty()));
        assert_eq!(edges[0].id, "H-T");
        assert_eq!(edges[2].id, "T-Aug");

        let ids: HashSet<&str> = edges.iter().map(|edge| edge.id.as_str()).collect();
        assert_eq!(ids.len(), edges.len());
    }

    #[test]
    fn test_layout_is_two_rows_of_three() {
        assert_eq!(GRAPH_LAYOUT.nodes.len(), 6);
        for row in 0..2 {
            let mut cols: Vec<u32> = GRAPH_LAYOUT
                .nodes
                .iter()
                .filter(|slot| slot.row == row)
                .map(|slot| slot.col)
                .collect();
            cols.sort();
            assert_eq!(cols, vec![0, 1, 2]);
        }

        let aug = GRAPH_LAYOUT.slot(EntityType::AugmentedInstruction).unwrap();
        assert_eq!((aug.row, aug.col), (1, 1));
        let artifact = GRAPH_LAYOUT.slot(EntityType::Artifact).unwrap();
        assert_eq!((artifact.row, artifact.col), (0, 2));
    }

    #[test]
    fn test_layout_nodes_positions() {
        let nodes = GRAPH_LAYOUT.nodes();
        let genai = nodes
            .iter()
            .find(|node| node.entity_type == EntityType::GenAi)
            .unwrap();

        assert_eq!(genai.x, 50 + 2 * 200);
        assert_eq!(genai.y, 50 + 150);
        assert_eq!(genai.label, "GenAI");
        assert_eq!(genai.icon.as_deref(), Some("Cpu"));
        assert_eq!((genai.row, genai.col), (Some(1), Some(2)));
    }

    #[test]
    fn test_mermaid_rendering() {
        let mut edges = vec![
            GraphEdge::new(EntityType::Human, EntityType::TextPrompt),
            GraphEdge::new(EntityType::TextPrompt, EntityType::AugmentedInstruction),
        ];
        edges[0].sequence = vec![1, 3];
        edges[1].is_active = true;

        let mermaid = to_mermaid(&edges);
        assert!(mermaid.starts_with("graph LR\n"));
        assert!(mermaid.contains("  Aug[\"Augmented Instruction\"]"));
        assert!(mermaid.contains("  H -->|1, 3| T"));
        assert!(mermaid.contains("  T ==> Aug"));
        assert!(!mermaid.ends_with('\n'));
    }

    #[test]
    fn test_entity_type_tags_round_trip() {
        for ty in EntityType::ALL {
            assert_eq!(ty.as_str().parse::<EntityType>().unwrap(), ty);
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
        assert!("aug".parse::<EntityType>().is_err());
    }
}
