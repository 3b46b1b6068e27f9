//! Read-only status rendering
//!
//! Text views over a [`RegistryReader`] and the fleet's entries, printed by
//! the binary. Nothing here can write to the registry.

use chess_engine::evaluate_material;
use std::fmt::Write;

use crate::fleet::FleetEntry;
use crate::registry::RegistryReader;

/// One line per game: fleet state, synced version, result and poll health
pub fn render_table(reader: &RegistryReader, fleet: &[FleetEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<12} {:>5} {:>5} {:<28} {:>6} {}",
        "GAME", "NODE", "VER", "PLY", "RESULT", "EVAL", "SYNC"
    );

    let mut ids: Vec<String> = fleet.iter().map(|e| e.game_id.clone()).collect();
    ids.extend(reader.list().into_iter().map(|(id, _)| id));
    ids.sort();
    ids.dedup();

    for id in ids {
        let node = fleet
            .iter()
            .find(|e| e.game_id == id)
            .map(|e| e.state.to_string())
            .unwrap_or_else(|| "-".to_string());
        match reader.get(&id) {
            Some(snap) => {
                let sync = if let Some(reason) = &snap.failed {
                    format!("failed: {reason}")
                } else if snap.reachable {
                    "ok".to_string()
                } else {
                    format!("unreachable x{}", snap.consecutive_poll_failures)
                };
                let _ = writeln!(
                    out,
                    "{:<12} {:<12} {:>5} {:>5} {:<28} {:>+6} {}",
                    id,
                    node,
                    snap.version(),
                    snap.record.moves.len(),
                    snap.result().to_string(),
                    evaluate_material(&snap.board),
                    sync
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "{:<12} {:<12} {:>5} {:>5} {:<28} {:>6} {}",
                    id, node, "-", "-", "-", "-", "waiting"
                );
            }
        }
    }
    out
}

/// Board diagram of every synced game
pub fn render_boards(reader: &RegistryReader) -> String {
    let mut out = String::new();
    for (id, snap) in reader.list() {
        let _ = writeln!(
            out,
            "{} (v{}, {} to move, {})",
            id,
            snap.version(),
            snap.board.side_to_move(),
            snap.result()
        );
        let _ = writeln!(out, "{}", snap.board);
    }
    out
}
