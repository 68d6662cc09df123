//! Fuzz target for decoder output parsing and bounded rendering.
//!
//! Arbitrary bytes are parsed as decoded result sets; anything that parses is
//! rendered under a small budget in both alert and table mode.

#![no_main]

use libfuzzer_sys::fuzz_target;

use qlreport_core::{LinkContext, TABLE_TOO_LARGE_NOTICE, render_document};
use qlreport_types::{CompatibleQueryKinds, DecodedResults};

const BUDGET: usize = 512;

fuzz_target!(|data: &[u8]| {
    let Ok(decoded) = serde_json::from_slice::<DecodedResults>(data) else {
        return;
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime builds");
    let ctx = LinkContext::new("o/r", "/src", None);

    for kinds in [["Problem"], ["Table"]] {
        let compatible: CompatibleQueryKinds = kinds.into_iter().collect();
        for rs in decoded.0.values() {
            let doc = runtime
                .block_on(render_document(rs, &compatible, &ctx, BUDGET))
                .expect("rendering into memory cannot fail");
            if doc.text() == TABLE_TOO_LARGE_NOTICE {
                continue;
            }
            // Header, separator and one line per tuple when everything fit.
            if !doc.truncated {
                assert_eq!(doc.lines.len(), rs.tuples.len() + 2);
            }
        }
    }
});
