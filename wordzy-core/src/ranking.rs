use std::cmp::Ordering;

use wordzy_types::{LeaderboardEntry, PlayerStatusView};

use crate::{PlayerSession, PlayerStatus};

/// `m:ss`, truncating sub-second precision.
pub fn format_time(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

// Solved < Failed < Active, then the per-status tie breakers, then join order.
fn compare(a: &PlayerSession, b: &PlayerSession) -> Ordering {
    use PlayerStatus::*;

    let by_status = match (a.status(), b.status()) {
        (
            Solved {
                attempts: a_attempts,
                time_ms: a_time,
            },
            Solved {
                attempts: b_attempts,
                time_ms: b_time,
            },
        ) => a_attempts.cmp(b_attempts).then(a_time.cmp(b_time)),
        (Failed { order: a_order, .. }, Failed { order: b_order, .. }) => a_order.cmp(b_order),
        (Active, Active) => Ordering::Equal,
        (a_status, b_status) => bucket(a_status).cmp(&bucket(b_status)),
    };

    by_status.then(a.join_index().cmp(&b.join_index()))
}

fn bucket(status: &PlayerStatus) -> u8 {
    match status {
        PlayerStatus::Solved { .. } => 0,
        PlayerStatus::Failed { .. } => 1,
        PlayerStatus::Active => 2,
    }
}

fn shares_rank(previous: &PlayerStatus, current: &PlayerStatus) -> bool {
    matches!(
        (previous, current),
        (
            PlayerStatus::Solved { attempts: pa, time_ms: pt },
            PlayerStatus::Solved { attempts: ca, time_ms: ct },
        ) if pa == ca && pt == ct
    )
}

fn time_formatted(status: &PlayerStatus) -> Option<String> {
    match status {
        PlayerStatus::Solved { time_ms, .. } => Some(format_time(*time_ms)),
        PlayerStatus::Failed { elapsed_ms, .. } => Some(format_time(*elapsed_ms)),
        PlayerStatus::Active => None,
    }
}

/// Order players for the leaderboard. Only identical solves share a rank.
pub fn rank_players(players: &[PlayerSession]) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&PlayerSession> = players.iter().collect();
    sorted.sort_by(|a, b| compare(a, b));

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(sorted.len());
    let mut previous: Option<&PlayerSession> = None;

    for (index, player) in sorted.into_iter().enumerate() {
        let rank = match (previous, entries.last()) {
            (Some(prev), Some(last)) if shares_rank(prev.status(), player.status()) => last.rank,
            _ => index as u32 + 1,
        };

        let (solve_attempts, solve_time_ms) = match player.status() {
            PlayerStatus::Solved { attempts, time_ms } => (Some(*attempts), Some(*time_ms)),
            _ => (None, None),
        };

        entries.push(LeaderboardEntry {
            rank,
            player_id: player.player_id().clone(),
            username: player.username().to_string(),
            status: player.status_kind(),
            is_solved: solve_attempts.is_some(),
            solve_attempts,
            solve_time_ms,
            time_formatted: time_formatted(player.status()),
        });
        previous = Some(player);
    }

    entries
}

/// Per-player progress in join order, as shown next to the boards.
pub fn player_statuses(players: &[PlayerSession]) -> Vec<PlayerStatusView> {
    let mut ordered: Vec<&PlayerSession> = players.iter().collect();
    ordered.sort_by_key(|p| p.join_index());

    ordered
        .into_iter()
        .map(|player| {
            let solve_attempts = match player.status() {
                PlayerStatus::Solved { attempts, .. } => Some(*attempts),
                _ => None,
            };
            PlayerStatusView {
                player_id: player.player_id().clone(),
                username: player.username().to_string(),
                status: player.status_kind(),
                guesses: player.attempts(),
                is_solved: solve_attempts.is_some(),
                solve_attempts,
                time_formatted: time_formatted(player.status()),
            }
        })
        .collect()
}
