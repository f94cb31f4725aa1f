/*!
 * Arena Report - Main Entry Point
 *
 * Initializes the global arena registry, runs a short allocation workload
 * against every arena, and prints the usage report.
 *
 * Environment variables:
 * - ARENA_*: registry configuration (see `RegistryConfig::from_env`)
 * - ARENA_REPORT_JSON: print the report as JSON
 */

use hetero_arena::{init_tracing, ArenaKind, ArenaRegistry};
use miette::IntoDiagnostic;
use tracing::info;

fn main() -> miette::Result<()> {
    init_tracing();

    let registry = ArenaRegistry::global();
    registry.initialize()?;
    info!(config = ?registry.config(), "Arena registry ready");

    for kind in ArenaKind::INIT_ORDER {
        let arena = registry.arena(kind)?;
        let blocks = (1..=8)
            .map(|i| arena.alloc(i * 1000))
            .collect::<Result<Vec<_>, _>>()?;

        // Keep half of the blocks live so the report shows outstanding bytes
        for block in blocks.iter().step_by(2) {
            arena.free(block.as_ptr())?;
        }
        info!(arena = %kind, live = blocks.len() / 2, "Workload done");
    }

    let report = registry.print_usage()?;
    let json = std::env::var("ARENA_REPORT_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);
    if json {
        println!("{}", report.to_json().into_diagnostic()?);
    } else {
        println!("{report}");
    }

    registry.finalize();
    Ok(())
}
