//! Mapping listeners: one that logs, one that records.

use std::sync::Mutex;

use tracing::{debug, info};

use graft_core::application::ports::{MappingEvent, MappingListener};

/// Logs every object mapping through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl MappingListener for TracingListener {
    fn before_mapping(&self, event: &MappingEvent) {
        debug!(
            call_id = %event.call_id,
            pair = %event.pair,
            source = %event.source,
            "mapping started"
        );
    }

    fn after_mapping(&self, event: &MappingEvent) {
        info!(
            call_id = %event.call_id,
            pair = %event.pair,
            destination = %event.destination,
            "mapping finished"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub phase: Phase,
    pub event: MappingEvent,
}

/// Keeps every event it sees, in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, phase: Phase, event: &MappingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(RecordedEvent {
                phase,
                event: event.clone(),
            });
        }
    }
}

impl MappingListener for RecordingListener {
    fn before_mapping(&self, event: &MappingEvent) {
        self.record(Phase::Before, event);
    }

    fn after_mapping(&self, event: &MappingEvent) {
        self.record(Phase::After, event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use graft_core::{
        application::Mapper,
        domain::{ClassRule, ObjectArena, RuleSet, TypeCatalog, TypeDescriptor},
    };

    fn mapper(listener: Arc<RecordingListener>) -> Mapper {
        let catalog = TypeCatalog::builder()
            .register(TypeDescriptor::bean("A").with_single("x", "int"))
            .register(TypeDescriptor::bean("B").with_single("x", "int"))
            .build()
            .unwrap();
        Mapper::builder(catalog)
            .rules(RuleSet::new().with_rule(ClassRule::new("A", "B")))
            .listener(listener)
            .listener(Arc::new(TracingListener))
            .build()
    }

    #[test]
    fn records_before_and_after_in_order() {
        let listener = Arc::new(RecordingListener::new());
        let mapper = mapper(Arc::clone(&listener));

        let mut arena = ObjectArena::new();
        let a = arena.instantiate(mapper.catalog(), "A").unwrap();
        let b = mapper.map(&mut arena, Some(a), "B").unwrap().unwrap();

        let events = listener.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].phase, Phase::Before);
        assert_eq!(events[1].phase, Phase::After);
        assert_eq!(events[1].event.destination, b);
        assert_eq!(events[0].event.call_id, events[1].event.call_id);
    }

    #[test]
    fn null_source_fires_nothing() {
        let listener = Arc::new(RecordingListener::new());
        let mapper = mapper(Arc::clone(&listener));

        let mut arena = ObjectArena::new();
        assert!(mapper.map(&mut arena, None, "B").unwrap().is_none());
        assert!(listener.is_empty());
    }
}
