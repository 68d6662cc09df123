//! Fuzz target for alert message composition.
//!
//! Builds `[location, message, (entity, label)*]` tuples from structured input
//! and checks that placeholder substitution never panics and never rescans
//! inserted link text.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use qlreport_core::{LinkContext, PLACEHOLDER, compose_message};
use qlreport_types::{Cell, Entity, EntityUrl};

#[derive(Arbitrary, Debug)]
struct FuzzEntity {
    label: String,
    uri: Option<String>,
    start_line: u32,
}

impl From<FuzzEntity> for Cell {
    fn from(e: FuzzEntity) -> Self {
        Cell::Entity(Entity {
            id: 0,
            label: e.label,
            url: e.uri.map(|uri| EntityUrl {
                uri,
                start_line: e.start_line,
                start_column: 0,
                end_line: e.start_line,
                end_column: 0,
            }),
        })
    }
}

#[derive(Arbitrary, Debug)]
struct ComposeInput {
    nwo: String,
    source_prefix: String,
    git_ref: Option<String>,
    message: String,
    pairs: Vec<(FuzzEntity, String)>,
}

fuzz_target!(|input: ComposeInput| {
    let ctx = LinkContext::new(&input.nwo, &input.source_prefix, input.git_ref.as_deref());

    let placeholders = input.message.matches(PLACEHOLDER).count();
    let pair_count = input.pairs.len().min(16);

    let mut tuple = vec![Cell::String(String::new()), Cell::String(input.message.clone())];
    for (entity, label) in input.pairs.into_iter().take(16) {
        tuple.push(entity.into());
        tuple.push(Cell::String(label));
    }

    let composed = compose_message(&tuple, &ctx);

    // Without pairs the template comes back untouched.
    if pair_count == 0 || placeholders == 0 {
        assert_eq!(composed, input.message);
    }
});
