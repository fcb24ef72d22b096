//! Best-common-ancestor search (§4.8 supplemental), grounded in the teacher's
//! `merge.rs` `MergeBaseCtxt`: a priority-queue walk over commit parents, ordered by
//! committer time, flagging each node `PARENT1`/`PARENT2`/`STALE`/`RESULT` exactly as
//! `MergeBaseCtxt::build_candidates` does, producing every minimal common ancestor
//! (plural when the history is criss-crossed).

use crate::error::MergeResult;
use crate::hash::Oid;
use crate::traits::CommitGraph;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

bitflags::bitflags! {
    struct NodeFlags: u8 {
        const PARENT1 = 1 << 0;
        const PARENT2 = 1 << 1;
        const STALE   = 1 << 2;
        const RESULT  = 1 << 3;
    }
}

struct QueueEntry {
    time: i64,
    oid: Oid,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time
    }
}

impl Eq for QueueEntry {
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time)
    }
}

/// every minimal common ancestor of `a` and `b`, in no particular order. Empty if the
/// graph has no common history at all.
pub fn find_merge_bases(graph: &dyn CommitGraph, a: Oid, b: Oid) -> MergeResult<Vec<Oid>> {
    if a == b {
        return Ok(vec![a]);
    }

    let mut node_flags: FxHashMap<Oid, NodeFlags> = FxHashMap::default();
    let mut heap: BinaryHeap<QueueEntry> = BinaryHeap::new();

    enqueue(graph, &mut heap, &mut node_flags, a, NodeFlags::PARENT1)?;
    enqueue(graph, &mut heap, &mut node_flags, b, NodeFlags::PARENT2)?;

    let mut results = Vec::new();

    loop {
        if heap.iter().all(|e| node_flags[&e.oid].contains(NodeFlags::STALE)) {
            break;
        }
        let Some(QueueEntry { oid, .. }) = heap.pop() else { break };
        let flags = node_flags[&oid];
        let is_common = flags.contains(NodeFlags::PARENT1) && flags.contains(NodeFlags::PARENT2);

        if is_common && !flags.contains(NodeFlags::STALE) {
            node_flags.get_mut(&oid).unwrap().insert(NodeFlags::RESULT);
            results.push(oid);
        }

        for parent in graph.parents(oid)? {
            let mut new_flags = flags & (NodeFlags::PARENT1 | NodeFlags::PARENT2);
            if is_common {
                new_flags.insert(NodeFlags::STALE);
            }
            enqueue(graph, &mut heap, &mut node_flags, parent, new_flags)?;
        }
    }

    // a result discovered early can turn out to be an ancestor of a later result;
    // the STALE flag propagated to it after the fact disqualifies it.
    results.retain(|oid| !node_flags[oid].contains(NodeFlags::STALE));
    Ok(results)
}

fn enqueue(
    graph: &dyn CommitGraph,
    heap: &mut BinaryHeap<QueueEntry>,
    node_flags: &mut FxHashMap<Oid, NodeFlags>,
    oid: Oid,
    add_flags: NodeFlags,
) -> MergeResult<()> {
    let entry = node_flags.entry(oid).or_insert_with(NodeFlags::empty);
    if entry.contains(add_flags) {
        return Ok(());
    }
    entry.insert(add_flags);
    let time = graph.committer_time(oid)?;
    heap.push(QueueEntry { time, oid });
    Ok(())
}
