// ============================================================================
// Thread Placement
// Pinning the engine and reader threads to cores
// ============================================================================
//
// Real pinning needs the `numa` feature (core_affinity). Without it every
// call is a no-op that reports failure, so callers can log and carry on.

/// Pin the calling thread to `core_id`. Returns `false` when the core does
/// not exist, pinning failed, or the `numa` feature is off.
#[cfg(feature = "numa")]
pub fn pin_current_thread_to_core(core_id: usize) -> bool {
    let pinned = core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .find(|id| id.id == core_id)
        .map(core_affinity::set_for_current)
        .unwrap_or(false);
    if pinned {
        tracing::debug!(core_id, thread = ?std::thread::current().name(), "thread pinned");
    }
    pinned
}

#[cfg(not(feature = "numa"))]
pub fn pin_current_thread_to_core(_core_id: usize) -> bool {
    false
}

/// Core ids the process may run on.
#[cfg(feature = "numa")]
pub fn available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|id| id.id)
        .collect()
}

#[cfg(not(feature = "numa"))]
pub fn available_cores() -> Vec<usize> {
    let count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (0..count).collect()
}

/// Placement for one engine and `readers` reader threads.
///
/// The engine gets a core of its own; readers share what is left round-robin.
/// With a single core nobody is pinned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorePlan {
    pub engine: Option<usize>,
    pub readers: Vec<Option<usize>>,
}

impl CorePlan {
    pub fn new(cores: &[usize], readers: usize) -> Self {
        match cores.split_first() {
            Some((&engine, rest)) if !rest.is_empty() => Self {
                engine: Some(engine),
                readers: (0..readers).map(|i| Some(rest[i % rest.len()])).collect(),
            },
            _ => Self {
                engine: None,
                readers: vec![None; readers],
            },
        }
    }

    pub fn detect(readers: usize) -> Self {
        Self::new(&available_cores(), readers)
    }
}
