// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily digest assembly.

use hearth_leaderboard::ViewEntry;

/// Render the daily digest message from the current view state.
///
/// Top movers come pre-sorted from the view; `online_count` is the live
/// presence figure at send time.
pub fn render_digest(top: &[ViewEntry], online_count: usize, total: usize) -> String {
    let mut lines = vec!["Daily grind report".to_string(), String::new()];

    if top.is_empty() {
        lines.push("No activity recorded yet. The leaderboard awaits!".to_string());
    } else {
        for entry in top {
            let medal = match entry.rank {
                1 => "🥇",
                2 => "🥈",
                3 => "🥉",
                _ => "•",
            };
            let today = entry
                .today
                .as_ref()
                .map(|t| format!(" (+{} today)", t.xp_gained))
                .unwrap_or_default();
            lines.push(format!(
                "{medal} #{rank} {name} — {xp} XP{today}",
                rank = entry.rank,
                name = entry.display_name,
                xp = entry.xp,
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!("{online_count} of {total} students online right now."));
    lines.join("\n")
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
