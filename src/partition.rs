//! Multi-instance registry.
//!
//! One [`Engine`] per execution context (partition).  Callers running in a
//! partition look up their own instance; a context with no instance is a
//! usage error and the call does nothing.

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use log::{info, warn};

use crate::engine::Engine;
use crate::error::{ConfigError, DevError, Result};
use crate::ports::{BswPorts, DevErrorSink, ServiceId};

/// Execution-context id of a partition.
pub type ContextId = u8;

pub struct PartitionRegistry<M: RawMutex = CriticalSectionRawMutex> {
    /// Instance id reported with `WrongContext`.
    application_id: u8,
    dev_error_detect: bool,
    /// Sorted by context id.
    partitions: Vec<(ContextId, Engine<M>)>,
}

impl<M: RawMutex> PartitionRegistry<M> {
    /// Registry with developer-error detection enabled.
    pub fn new(application_id: u8) -> Self {
        Self {
            application_id,
            dev_error_detect: true,
            partitions: Vec::new(),
        }
    }

    /// Gate `WrongContext` reports, as `EngineConfig::dev_error_detect`
    /// gates the reports of each instance.
    #[must_use]
    pub fn with_dev_error_detect(mut self, enabled: bool) -> Self {
        self.dev_error_detect = enabled;
        self
    }

    pub fn application_id(&self) -> u8 {
        self.application_id
    }

    /// Bind `engine` to `context`.  Each context owns at most one instance.
    pub fn insert(&mut self, context: ContextId, engine: Engine<M>) -> Result<()> {
        match self.partitions.binary_search_by_key(&context, |(c, _)| *c) {
            Ok(_) => Err(ConfigError::Invalid("partition context already bound").into()),
            Err(pos) => {
                info!(
                    "partition {context} bound to bswm[{}]",
                    engine.config().instance_id
                );
                self.partitions.insert(pos, (context, engine));
                Ok(())
            }
        }
    }

    pub fn get(&self, context: ContextId) -> Option<&Engine<M>> {
        self.partitions
            .binary_search_by_key(&context, |(c, _)| *c)
            .ok()
            .map(|pos| &self.partitions[pos].1)
    }

    /// Look up the instance of `context`, reporting `WrongContext` for
    /// `service` when there is none and detection is enabled.
    pub fn resolve<B>(&self, bsw: &B, context: ContextId, service: ServiceId) -> Option<&Engine<M>>
    where
        B: DevErrorSink + ?Sized,
    {
        let engine = self.get(context);
        if engine.is_none() {
            warn!("{service} called from unbound context {context}");
            if self.dev_error_detect {
                bsw.report_dev_error(self.application_id, service, DevError::WrongContext);
            }
        }
        engine
    }

    /// Run `f` on the instance of `context`.
    pub fn with_engine<B, R>(
        &self,
        bsw: &B,
        context: ContextId,
        service: ServiceId,
        f: impl FnOnce(&Engine<M>) -> R,
    ) -> Option<R>
    where
        B: DevErrorSink + ?Sized,
    {
        self.resolve(bsw, context, service).map(f)
    }

    pub fn contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.partitions.iter().map(|(c, _)| *c)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn init_all(&self) {
        for (_, engine) in &self.partitions {
            engine.init();
        }
    }

    pub fn deinit_all(&self) {
        for (_, engine) in &self.partitions {
            engine.deinit();
        }
    }

    /// Run the main function of the instance bound to `context`.
    pub fn main_function<B>(&self, bsw: &B, context: ContextId)
    where
        B: BswPorts + ?Sized,
    {
        self.with_engine(bsw, context, ServiceId::MainFunction, |engine| {
            engine.main_function(bsw);
        });
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;
    use crate::config::EngineConfig;
    use crate::topology::Topology;

    #[derive(Default)]
    struct DevErrors(RefCell<Vec<(u8, ServiceId, DevError)>>);

    impl DevErrorSink for DevErrors {
        fn report_dev_error(&self, instance: u8, service: ServiceId, error: DevError) {
            self.0.borrow_mut().push((instance, service, error));
        }
    }

    fn engine(instance_id: u8) -> Engine {
        let config = EngineConfig {
            instance_id,
            ..EngineConfig::default()
        };
        Engine::new(&Topology::default(), config).unwrap()
    }

    #[test]
    fn lookup_by_context() {
        let mut reg = PartitionRegistry::new(9);
        reg.insert(2, engine(20)).unwrap();
        reg.insert(1, engine(10)).unwrap();

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.contexts().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(reg.get(1).unwrap().config().instance_id, 10);
        assert_eq!(reg.get(2).unwrap().config().instance_id, 20);
        assert!(reg.get(3).is_none());
    }

    #[test]
    fn duplicate_context_rejected() {
        let mut reg = PartitionRegistry::new(0);
        reg.insert(1, engine(0)).unwrap();
        assert!(reg.insert(1, engine(1)).is_err());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_context_reports_wrong_context() {
        let mut reg = PartitionRegistry::new(7);
        reg.insert(1, engine(0)).unwrap();
        let sink = DevErrors::default();

        let ran = reg.with_engine(&sink, 4, ServiceId::RequestMode, |_| ());
        assert!(ran.is_none());
        assert_eq!(
            sink.0.borrow().as_slice(),
            &[(7, ServiceId::RequestMode, DevError::WrongContext)]
        );
    }

    #[test]
    fn wrong_context_is_silent_without_detection() {
        let mut reg = PartitionRegistry::new(7).with_dev_error_detect(false);
        reg.insert(1, engine(0)).unwrap();
        let sink = DevErrors::default();

        assert!(reg.resolve(&sink, 4, ServiceId::MainFunction).is_none());
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn known_context_reports_nothing() {
        let mut reg = PartitionRegistry::new(7);
        reg.insert(1, engine(0)).unwrap();
        let sink = DevErrors::default();

        let initialized = reg.with_engine(&sink, 1, ServiceId::Init, |e| {
            e.init();
            e.is_initialized()
        });
        assert_eq!(initialized, Some(true));
        assert!(sink.0.borrow().is_empty());
    }

    #[test]
    fn init_and_deinit_all() {
        let mut reg = PartitionRegistry::new(0);
        reg.insert(1, engine(1)).unwrap();
        reg.insert(2, engine(2)).unwrap();

        reg.init_all();
        assert!(reg.contexts().all(|c| reg.get(c).unwrap().is_initialized()));
        reg.deinit_all();
        assert!(reg.contexts().all(|c| !reg.get(c).unwrap().is_initialized()));
    }
}
