//! Pure ranking functions.
//!
//! None of these touch a store; they take the entries as stored and return
//! fresh vectors, so calling any of them twice on the same input gives the
//! same answer.

use std::cmp::Ordering;
use std::collections::HashMap;

use qiba_protocol::{DisplayTotal, RankedEntry, ScoreEntry, UserId};

/// The leaderboard's total order.
///
/// Higher score first. On equal scores the later timestamp wins, so a tie
/// is broken in favour of whoever reached the score most recently.
pub fn compare(a: &ScoreEntry, b: &ScoreEntry) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.timestamp.cmp(&a.timestamp))
}

/// Returns every entry in ranked order.
///
/// The sort is stable, so entries identical in both score and timestamp
/// keep their append order.
pub fn rank(entries: &[ScoreEntry]) -> Vec<ScoreEntry> {
    let mut ranked = entries.to_vec();
    ranked.sort_by(compare);
    ranked
}

/// The first `n` entries of [`rank`].
pub fn top_n(entries: &[ScoreEntry], n: usize) -> Vec<ScoreEntry> {
    let mut ranked = rank(entries);
    ranked.truncate(n);
    ranked
}

/// Finds `user`'s best-ranked entry and its 1-based rank.
///
/// Scans the whole ranking, so a player below any display cut line is
/// still found. Returns `None` if the player has no entry at all.
pub fn find_user_entry(entries: &[ScoreEntry], user: UserId) -> Option<RankedEntry> {
    rank(entries)
        .into_iter()
        .enumerate()
        .find(|(_, e)| e.user.id == user)
        .map(|(position, entry)| RankedEntry {
            rank: position + 1,
            entry,
        })
}

/// Sums scores per resolved display name.
///
/// Entries are grouped by [`Profile::display_name`], not by user id: two
/// players who share a name share a total. The result is sorted by total
/// descending, then by name so equal totals come out in a stable order.
///
/// [`Profile::display_name`]: qiba_protocol::Profile::display_name
pub fn aggregate_totals(entries: &[ScoreEntry]) -> Vec<DisplayTotal> {
    let mut sums: HashMap<String, i64> = HashMap::new();
    for entry in entries {
        let total = sums.entry(entry.user.display_name()).or_insert(0);
        *total = total.saturating_add(entry.score);
    }

    let mut totals: Vec<DisplayTotal> = sums
        .into_iter()
        .map(|(name, total)| DisplayTotal { name, total })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    totals
}
