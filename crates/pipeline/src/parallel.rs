//! Parallel sessionization across visitors.
//!
//! Visitors share no state, so their groups are dealt round-robin to a fixed
//! number of blocking tasks and the results merged back into one map.

use session_core::{group_by_visitor, Error, Event, Result, Sessionizer, SessionsByVisitor};
use tokio::task::JoinSet;
use tracing::debug;

/// Computes sessions on up to `workers` blocking tasks.
///
/// Produces exactly the same result as [`Sessionizer::compute`].
pub async fn compute_parallel(
    sessionizer: Sessionizer,
    events: Vec<Event>,
    workers: usize,
) -> Result<SessionsByVisitor> {
    let groups = group_by_visitor(events);
    let workers = workers.clamp(1, groups.len().max(1));

    let mut shards: Vec<Vec<(String, Vec<Event>)>> = (0..workers).map(|_| Vec::new()).collect();
    for (i, group) in groups.into_iter().enumerate() {
        shards[i % workers].push(group);
    }

    let mut tasks = JoinSet::new();
    for shard in shards.into_iter().filter(|s| !s.is_empty()) {
        tasks.spawn_blocking(move || {
            shard
                .into_iter()
                .map(|(visitor_id, group)| (visitor_id, sessionizer.sessionize_visitor(group)))
                .collect::<Vec<_>>()
        });
    }

    debug!(workers = tasks.len(), "Sessionizing in parallel");

    let mut result = SessionsByVisitor::new();
    while let Some(joined) = tasks.join_next().await {
        let shard = joined.map_err(|e| Error::internal(format!("sessionizer task failed: {}", e)))?;
        result.extend(shard);
    }

    Ok(result)
}
