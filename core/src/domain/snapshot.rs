//! Immutable, atomically published view of all monitored sockets.

use std::collections::HashMap;

use super::{filter_processes, FilterState, Process, ReadOptions, SearchQuery};

/// One consistent refresh result.
///
/// The record sequence and the pid index are built together by
/// [`Snapshot::new`] and never mutated afterwards, so a reader holding a
/// snapshot always sees them agree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    processes: Vec<Process>,
    index: HashMap<u32, usize>,
    generation: u64,
}

impl Snapshot {
    /// Build a snapshot from an ordered record list.
    ///
    /// When a pid owns several sockets the index points at its first record.
    pub fn new(processes: Vec<Process>, generation: u64) -> Self {
        let mut index = HashMap::with_capacity(processes.len());
        for (position, process) in processes.iter().enumerate() {
            index.entry(process.pid).or_insert(position);
        }

        Self {
            processes,
            index,
            generation,
        }
    }

    /// The empty snapshot an engine starts with.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// All records in snapshot order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Refresh counter that produced this snapshot. Zero means "never refreshed".
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// First record owned by `pid`.
    pub fn get(&self, pid: u32) -> Option<&Process> {
        self.index
            .get(&pid)
            .and_then(|&position| self.processes.get(position))
    }

    /// Every pid present in the index.
    pub fn pids(&self) -> impl Iterator<Item = u32> + '_ {
        self.index.keys().copied()
    }

    /// Check that the index and sequence agree in both directions.
    pub fn is_consistent(&self) -> bool {
        let indexed_ok = self.index.iter().all(|(pid, &position)| {
            self.processes
                .get(position)
                .is_some_and(|p| p.pid == *pid)
        });
        let listed_ok = self.processes.iter().all(|p| self.index.contains_key(&p.pid));
        indexed_ok && listed_ok
    }

    /// Copy of the records that pass the scope options.
    pub fn select(&self, options: &ReadOptions) -> Vec<Process> {
        if !options.is_active() {
            return self.processes.clone();
        }
        self.processes
            .iter()
            .filter(|p| options.matches(p))
            .cloned()
            .collect()
    }

    /// Copy of the records inside `scope` that pass the structural filter
    /// and the search query, in snapshot order.
    pub fn view(&self, scope: &ReadOptions, filter: &FilterState, query: &SearchQuery) -> Vec<Process> {
        if !scope.is_active() {
            return filter_processes(&self.processes, filter, query);
        }
        let scoped: Vec<Process> = self
            .processes
            .iter()
            .filter(|p| scope.matches(p))
            .cloned()
            .collect();
        filter_processes(&scoped, filter, query)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionStatus, Protocol};

    fn process(pid: u32, port: u16) -> Process {
        Process {
            pid,
            name: format!("proc-{}", pid),
            port,
            protocol: Protocol::Tcp,
            status: ConnectionStatus::Listen,
            local_addr: format!("0.0.0.0:{}", port),
            remote_addr: "*:*".to_string(),
        }
    }

    #[test]
    fn test_index_points_at_first_socket() {
        let snapshot = Snapshot::new(vec![process(7, 80), process(8, 81), process(7, 443)], 1);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get(7).map(|p| p.port), Some(80));
        assert_eq!(snapshot.get(8).map(|p| p.port), Some(81));
        assert!(snapshot.get(9).is_none());
        assert!(snapshot.is_consistent());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.generation(), 0);
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.pids().count(), 0);
    }

    #[test]
    fn test_select_copies_matching_records() {
        let snapshot = Snapshot::new(vec![process(1, 22), process(2, 80)], 3);
        let selected = snapshot.select(&ReadOptions::new().with_port(Some(80)));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].pid, 2);
        assert_eq!(snapshot.len(), 2);

        assert_eq!(snapshot.select(&ReadOptions::new()).len(), 2);
    }

    #[test]
    fn test_view_layers_scope_filter_and_search() {
        let mut udp = process(3, 5353);
        udp.protocol = Protocol::Udp;
        udp.status = ConnectionStatus::Active;
        let snapshot = Snapshot::new(vec![process(1, 22), udp, process(2, 80)], 1);

        let everything = snapshot.view(&ReadOptions::new(), &FilterState::new(), &SearchQuery::default());
        assert_eq!(everything.iter().map(|p| p.pid).collect::<Vec<_>>(), vec![1, 3, 2]);

        let mut tcp = FilterState::new();
        tcp.toggle_tcp();
        let view = snapshot.view(&ReadOptions::new(), &tcp, &SearchQuery::default());
        assert_eq!(view.iter().map(|p| p.pid).collect::<Vec<_>>(), vec![1, 2]);

        let scope = ReadOptions::new().with_port(Some(80));
        assert!(snapshot.view(&scope, &tcp, &SearchQuery::parse("proc-1")).is_empty());
        assert_eq!(snapshot.view(&scope, &tcp, &SearchQuery::parse("proc")).len(), 1);
    }
}
