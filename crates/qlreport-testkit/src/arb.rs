//! Proptest strategies for generating valid test inputs.
//!
//! Strategies are constructive: generated alert tuples always follow the
//! `[location, message, (entity, label)*]` shape, and raw result sets always
//! have tuples as wide as their column list.
//!
//! # Bounds
//!
//! - Max columns per result set: 5
//! - Max tuples per result set: 20
//! - Max placeholders per message: 4
//! - Max (entity, label) pairs per tuple: 4

use proptest::prelude::*;
use qlreport_types::{
    Cell, Column, CompatibleQueryKinds, Entity, EntityUrl, FailureIndexItem, KIND_TAG_DIAGNOSTIC,
    KIND_TAG_PATH_PROBLEM, KIND_TAG_PROBLEM, KIND_TAG_TABLE, ResultIndexItem, ResultSet,
};

// =============================================================================
// Constants for bounding generated data
// =============================================================================

pub const MAX_COLUMNS: usize = 5;
pub const MAX_TUPLES: usize = 20;
pub const MAX_PLACEHOLDERS: usize = 4;
pub const MAX_PAIRS: usize = 4;

/// Source root that generated in-tree entities live under.
pub const SOURCE_ROOT: &str = "/home/runner/work/repo/repo";

// =============================================================================
// Identity strategies
// =============================================================================

/// `owner/repo` names.
pub fn arb_nwo() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{0,12}", "[a-z][a-z0-9_.-]{0,16}").prop_map(|(o, r)| format!("{o}/{r}"))
}

pub fn arb_sha() -> impl Strategy<Value = String> {
    "[0-9a-f]{40}"
}

fn arb_relative_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,8}", 1..4)
        .prop_map(|parts| format!("{}.go", parts.join("/")))
}

// =============================================================================
// Cells
// =============================================================================

/// Location under [`SOURCE_ROOT`] (or, sometimes, outside of it).
pub fn arb_entity_url() -> impl Strategy<Value = EntityUrl> {
    (
        prop_oneof![3 => Just(SOURCE_ROOT), 1 => Just("/opt/elsewhere")],
        arb_relative_path(),
        1u32..5000,
        1u32..120,
    )
        .prop_map(|(root, path, line, column)| EntityUrl {
            uri: format!("file:{root}/{path}"),
            start_line: line,
            start_column: column,
            end_line: line,
            end_column: column + 1,
        })
}

/// An entity that always carries a location.
pub fn arb_entity() -> impl Strategy<Value = Entity> {
    (0i64..100_000, "[A-Za-z_][A-Za-z0-9_()]{0,15}", arb_entity_url()).prop_map(
        |(id, label, url)| Entity {
            id,
            label,
            url: Some(url),
        },
    )
}

/// A non-entity cell. Strings may contain table metacharacters.
pub fn arb_scalar_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        "[ -~]{0,24}".prop_map(Cell::String),
        "[a-z|\n ]{0,12}".prop_map(Cell::String),
        any::<i64>().prop_map(Cell::Integer),
        (-1.0e6f64..1.0e6).prop_map(Cell::Float),
        any::<bool>().prop_map(Cell::Boolean),
    ]
}

pub fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        1 => arb_entity().prop_map(Cell::Entity),
        3 => arb_scalar_cell(),
    ]
}

// =============================================================================
// Result sets
// =============================================================================

/// A raw table: every tuple is exactly as wide as the column list.
pub fn arb_raw_result_set() -> impl Strategy<Value = ResultSet> {
    (1usize..=MAX_COLUMNS)
        .prop_flat_map(|width| {
            (
                prop::collection::vec(
                    (prop::option::of("[a-z_]{1,10}"), Just("String".to_string()))
                        .prop_map(|(name, kind)| Column { name, kind }),
                    width,
                ),
                prop::collection::vec(prop::collection::vec(arb_cell(), width), 0..=MAX_TUPLES),
            )
        })
        .prop_map(|(columns, tuples)| ResultSet {
            name: "#select".to_string(),
            columns,
            tuples,
        })
}

/// An alert tuple together with the pieces it was built from.
#[derive(Debug, Clone)]
pub struct AlertCase {
    pub tuple: Vec<Cell>,
    /// Message text between placeholders; `pieces.len() - 1` placeholders.
    pub pieces: Vec<String>,
    /// The (entity, label) pairs after the message, in order.
    pub pairs: Vec<(Entity, String)>,
}

impl AlertCase {
    pub fn placeholder_count(&self) -> usize {
        self.pieces.len() - 1
    }
}

/// Alert tuples. Labels may themselves contain `$@`.
pub fn arb_alert_tuple() -> impl Strategy<Value = AlertCase> {
    (
        arb_entity(),
        prop::collection::vec("[a-z ,.:]{0,10}", 1..=MAX_PLACEHOLDERS + 1),
        prop::collection::vec((arb_entity(), "[a-z $@]{0,10}"), 0..=MAX_PAIRS),
    )
        .prop_map(|(location, pieces, pairs)| {
            let mut tuple = vec![Cell::Entity(location), Cell::String(pieces.join("$@"))];
            for (entity, label) in &pairs {
                tuple.push(Cell::Entity(entity.clone()));
                tuple.push(Cell::String(label.clone()));
            }
            AlertCase {
                tuple,
                pieces,
                pairs,
            }
        })
}

pub fn arb_compatible_kinds() -> impl Strategy<Value = CompatibleQueryKinds> {
    prop::sample::subsequence(
        vec![
            KIND_TAG_PROBLEM,
            KIND_TAG_PATH_PROBLEM,
            KIND_TAG_TABLE,
            KIND_TAG_DIAGNOSTIC,
        ],
        0..=4,
    )
    .prop_map(|tags| tags.into_iter().collect())
}

// =============================================================================
// Index items
// =============================================================================

pub fn arb_index_item() -> impl Strategy<Value = ResultIndexItem> {
    (
        arb_nwo(),
        prop::option::of(arb_sha()),
        // Narrow range so ties are common.
        0u64..6,
        1u64..1_000_000,
        prop::option::of(1u64..1_000_000),
    )
        .prop_map(
            |(nwo, sha, results_count, artifact_size_bytes, sarif_size_bytes)| ResultIndexItem {
                id: nwo.replace('/', "#"),
                nwo,
                sha,
                results_count,
                artifact_size_bytes,
                sarif_size_bytes,
            },
        )
}

pub fn arb_failure_item() -> impl Strategy<Value = FailureIndexItem> {
    (arb_nwo(), "[ -~]{1,60}").prop_map(|(nwo, error)| FailureIndexItem {
        id: nwo.replace('/', "#"),
        nwo,
        error,
    })
}
