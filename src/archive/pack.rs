// Greedy sequential bin-packing of archive members

use serde::Serialize;

/// A file headed for a container: its path relative to the base directory and its size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub path: String,
    pub size: u64,
}

/// Split `members` into consecutive groups whose summed size stays within `cap`.
///
/// Single pass, no reordering. A group is closed before adding a member that
/// would push it over the cap; a member larger than the cap on its own still
/// gets a group of its own. Per-member container overhead is not counted.
pub fn pack(members: Vec<Member>, cap: u64) -> Vec<Vec<Member>> {
    let mut bins = Vec::new();
    let mut current: Vec<Member> = Vec::new();
    let mut running: u64 = 0;

    for member in members {
        if !current.is_empty() && running.saturating_add(member.size) > cap {
            log::debug!("Closing container at {} bytes ({} files)", running, current.len());
            bins.push(std::mem::take(&mut current));
            running = 0;
        }
        running = running.saturating_add(member.size);
        current.push(member);
    }

    if !current.is_empty() {
        bins.push(current);
    }
    bins
}

/// Container stems for one run: the bare prefix when there is a single
/// container, `<prefix>-0 .. <prefix>-(n-1)` otherwise.
pub fn container_names(prefix: &str, count: usize) -> Vec<String> {
    match count {
        0 => Vec::new(),
        1 => vec![prefix.to_string()],
        n => (0..n).map(|i| format!("{}-{}", prefix, i)).collect(),
    }
}
