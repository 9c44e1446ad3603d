//! Peripheral registry and top-level `System` type.
//!
//! This module builds the peripheral clusters from configuration and routes everything that
//! happens between them. It performs:
//! 1. **Registry:** One ECB, CCM and AAR per configured instance, addressed by index.
//! 2. **Task dispatch:** `trigger` performs a task, then publishes the events it signaled one at
//!    a time. Each published event runs its subscribers, and everything they chain, before the
//!    next event is published, so chained tasks run within the same step.
//! 3. **Core arbitration:** Starting one unit aborts whichever other unit of the same cluster
//!    holds the shared AES core.
//! 4. **Timing:** Pending wake times are mirrored into the scheduler after every step.

use std::collections::HashMap;
use std::fmt;

use crate::common::{SimError, SimTime};
use crate::config::Config;
use crate::crypto::{self, CryptoBackend};
use crate::sim::scheduler::Scheduler;
use crate::soc::devices::{
    Aar, Ccm, CipherTiming, DeviceContext, Ecb, EventKind, EventPort, Signal, TaskKind, Unit,
};
use crate::soc::fabric::SignalFabric;
use crate::soc::interconnect::Bus;

/// A zero-argument task that can be triggered directly or subscribed to a fabric channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// A peripheral task (START or STOP).
    Peripheral {
        /// Target peripheral type.
        unit: Unit,
        /// Target instance.
        instance: usize,
        /// Which task.
        kind: TaskKind,
    },
    /// Enables every channel of a channel group.
    EnableGroup(usize),
    /// Disables every channel of a channel group.
    DisableGroup(usize),
}

impl Task {
    /// START task of `unit[instance]`.
    pub const fn start(unit: Unit, instance: usize) -> Self {
        Self::Peripheral {
            unit,
            instance,
            kind: TaskKind::Start,
        }
    }

    /// STOP task of `unit[instance]`.
    pub const fn stop(unit: Unit, instance: usize) -> Self {
        Self::Peripheral {
            unit,
            instance,
            kind: TaskKind::Stop,
        }
    }
}

/// Dispatch work pending within one step.
#[derive(Debug, Clone, Copy)]
enum Work {
    /// Publish an event on the channel it is routed to.
    Publish(Signal),
    /// Perform a task.
    Run(Task),
}

/// Top-level system instance: firmware memory, the peripheral clusters and their wiring.
pub struct System {
    /// Firmware memory the peripherals' job lists live in.
    pub bus: Bus,
    crypto: Box<dyn CryptoBackend>,
    ecb: Vec<Ecb>,
    ccm: Vec<Ccm>,
    aar: Vec<Aar>,
    fabric: SignalFabric<Task>,
    /// Channel each event publishes on, if any.
    publish: HashMap<(Unit, usize, EventKind), usize>,
    /// Slots `0..n` are ECB instances, `n..2n` AAR instances.
    scheduler: Scheduler,
    timing: CipherTiming,
    now: SimTime,
    max_chained_tasks: usize,
}

impl System {
    /// Builds a system with the crypto provider selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: &Config) -> Result<Self, SimError> {
        Self::with_crypto(config, crypto::from_config(&config.crypto))
    }

    /// Builds a system around an explicitly supplied crypto provider.
    ///
    /// The memory bus starts empty; map RAM with `bus.add_region` before triggering tasks.
    ///
    /// # Arguments
    ///
    /// * `config` - Cluster count, fabric dimensions, timing and ECB busy policy.
    /// * `crypto` - Provider every peripheral calls into.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] if the configuration fails validation.
    pub fn with_crypto(config: &Config, crypto: Box<dyn CryptoBackend>) -> Result<Self, SimError> {
        config.validate()?;
        let n = config.system.instances;
        let fabric = SignalFabric::new(config.system.channels, config.system.channel_groups)?;
        tracing::info!(
            instances = n,
            channels = config.system.channels,
            groups = config.system.channel_groups,
            crypto = crypto.name(),
            "building peripheral system"
        );
        Ok(Self {
            bus: Bus::new(),
            crypto,
            ecb: (0..n).map(|i| Ecb::new(i, config.ecb_busy_policy)).collect(),
            ccm: (0..n).map(Ccm::new).collect(),
            aar: (0..n)
                .map(|i| Aar::new(i, config.timing.aar_clock_mhz))
                .collect(),
            fabric,
            publish: HashMap::new(),
            scheduler: Scheduler::new(2 * n),
            timing: CipherTiming::new(config.timing.ecb_block_latency_us),
            now: 0,
            max_chained_tasks: config.system.max_chained_tasks,
        })
    }

    /// Number of peripheral clusters.
    pub fn instances(&self) -> usize {
        self.ecb.len()
    }

    /// Current simulated time in microseconds.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// Earliest pending peripheral completion.
    pub const fn next_wake(&self) -> Option<SimTime> {
        self.scheduler.next_wake()
    }

    /// Active crypto provider.
    pub fn crypto(&self) -> &dyn CryptoBackend {
        self.crypto.as_ref()
    }

    /// ECB instance `i`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn ecb(&self, i: usize) -> Result<&Ecb, SimError> {
        self.ecb.get(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Ecb,
            instance: i,
        })
    }

    /// Mutable ECB instance `i`, for register writes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn ecb_mut(&mut self, i: usize) -> Result<&mut Ecb, SimError> {
        self.ecb.get_mut(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Ecb,
            instance: i,
        })
    }

    /// CCM instance `i`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn ccm(&self, i: usize) -> Result<&Ccm, SimError> {
        self.ccm.get(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Ccm,
            instance: i,
        })
    }

    /// Mutable CCM instance `i`, for register writes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn ccm_mut(&mut self, i: usize) -> Result<&mut Ccm, SimError> {
        self.ccm.get_mut(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Ccm,
            instance: i,
        })
    }

    /// AAR instance `i`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn aar(&self, i: usize) -> Result<&Aar, SimError> {
        self.aar.get(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Aar,
            instance: i,
        })
    }

    /// Mutable AAR instance `i`, for register writes.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn aar_mut(&mut self, i: usize) -> Result<&mut Aar, SimError> {
        self.aar.get_mut(i).ok_or(SimError::NoSuchInstance {
            unit: Unit::Aar,
            instance: i,
        })
    }

    /// Event port of `unit[instance]`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn events(&self, unit: Unit, instance: usize) -> Result<&EventPort, SimError> {
        Ok(match unit {
            Unit::Ecb => &self.ecb(instance)?.events,
            Unit::Ccm => &self.ccm(instance)?.events,
            Unit::Aar => &self.aar(instance)?.events,
        })
    }

    /// Mutable event port of `unit[instance]`, for clearing flags and writing interrupt enables.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn events_mut(&mut self, unit: Unit, instance: usize) -> Result<&mut EventPort, SimError> {
        Ok(match unit {
            Unit::Ecb => &mut self.ecb_mut(instance)?.events,
            Unit::Ccm => &mut self.ccm_mut(instance)?.events,
            Unit::Aar => &mut self.aar_mut(instance)?.events,
        })
    }

    /// Interrupt line level of `unit[instance]`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] for an unknown index.
    pub fn irq_pending(&self, unit: Unit, instance: usize) -> Result<bool, SimError> {
        Ok(self.events(unit, instance)?.regs.irq_pending())
    }

    /// Signaling fabric, for inspecting channel and group state.
    pub const fn fabric(&self) -> &SignalFabric<Task> {
        &self.fabric
    }

    /// Mutable signaling fabric, for channel enables and group membership.
    pub fn fabric_mut(&mut self) -> &mut SignalFabric<Task> {
        &mut self.fabric
    }

    /// Subscribes `task` to `channel`.
    ///
    /// # Returns
    ///
    /// `true` if the task was newly added to the channel.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidChannel`], [`SimError::InvalidGroup`] or
    /// [`SimError::NoSuchInstance`] if the channel or the task target does not exist.
    pub fn subscribe(&mut self, channel: usize, task: Task) -> Result<bool, SimError> {
        self.check_task(task)?;
        self.fabric.subscribe(channel, task)
    }

    /// Removes `task` from every channel.
    ///
    /// # Returns
    ///
    /// The number of channels it was removed from.
    pub fn unsubscribe(&mut self, task: Task) -> usize {
        self.fabric.unsubscribe(task)
    }

    /// Configures the channel `event` of `unit[instance]` publishes on; `None` disconnects it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoSuchInstance`] or [`SimError::InvalidChannel`] for unknown
    /// targets.
    pub fn publish_event(
        &mut self,
        unit: Unit,
        instance: usize,
        event: EventKind,
        channel: Option<usize>,
    ) -> Result<(), SimError> {
        let _ = self.events(unit, instance)?;
        match channel {
            Some(ch) if ch >= self.fabric.channel_count() => Err(SimError::InvalidChannel(ch)),
            Some(ch) => {
                let _ = self.publish.insert((unit, instance, event), ch);
                Ok(())
            }
            None => {
                let _ = self.publish.remove(&(unit, instance, event));
                Ok(())
            }
        }
    }

    /// Pins ECB and AAR timing to `latency` microseconds per block (testing aid).
    pub fn set_block_latency_override(&mut self, latency: SimTime) {
        tracing::debug!(latency, "cipher latency override set");
        self.timing.set_override(latency);
    }

    /// Returns ECB and AAR to their configured timing.
    pub fn reset_block_latency(&mut self) {
        self.timing.reset_override();
    }

    /// Effective cipher timing.
    pub const fn timing(&self) -> &CipherTiming {
        &self.timing
    }

    /// Performs `task` now, then every task chained from the events it signals.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SimError`] of the first task that fails, or
    /// [`SimError::RunawayDispatch`] when chaining exceeds the per-step budget.
    pub fn trigger(&mut self, task: Task) -> Result<(), SimError> {
        let result = self.run_chain(vec![Work::Run(task)]);
        self.sync_scheduler();
        result
    }

    /// Completes every peripheral whose wake time is at or before `now`, in slot order.
    ///
    /// Simulated time never moves backwards; `now` earlier than the current time completes
    /// nothing new.
    pub(crate) fn dispatch_due(&mut self, now: SimTime) -> Result<usize, SimError> {
        self.now = self.now.max(now);
        let now = self.now;
        let n = self.instances();
        let mut completed = 0;
        for slot in self.scheduler.due(now) {
            let mut signals = Vec::new();
            if slot < n {
                let ecb = &mut self.ecb[slot];
                if ecb.wake().is_some_and(|t| t <= now) {
                    ecb.on_timer(&mut signals);
                }
            } else {
                let aar = &mut self.aar[slot - n];
                if aar.wake().is_some_and(|t| t <= now) {
                    aar.on_timer(&mut signals);
                }
            }
            if signals.is_empty() {
                continue;
            }
            completed += 1;
            let stack = signals.into_iter().rev().map(Work::Publish).collect();
            if let Err(err) = self.run_chain(stack) {
                self.sync_scheduler();
                return Err(err);
            }
        }
        self.sync_scheduler();
        Ok(completed)
    }

    /// Moves simulated time forward to `now` without completing anything.
    pub(crate) fn advance_to(&mut self, now: SimTime) {
        self.now = self.now.max(now);
    }

    /// Drains `stack` depth-first: the top item is always the next thing to happen.
    fn run_chain(&mut self, mut stack: Vec<Work>) -> Result<(), SimError> {
        let mut dispatched = 0usize;
        while let Some(work) = stack.pop() {
            match work {
                Work::Run(task) => {
                    dispatched += 1;
                    if dispatched > self.max_chained_tasks {
                        tracing::error!(
                            budget = self.max_chained_tasks,
                            ?task,
                            "task chain exceeded its budget"
                        );
                        return Err(SimError::RunawayDispatch(self.max_chained_tasks));
                    }
                    let mut signals = Vec::new();
                    self.perform(task, &mut signals)?;
                    stack.extend(signals.into_iter().rev().map(Work::Publish));
                }
                Work::Publish(signal) => {
                    let mut tasks = Vec::new();
                    self.route(signal, &mut tasks)?;
                    stack.extend(tasks.into_iter().rev().map(Work::Run));
                }
            }
        }
        Ok(())
    }

    /// Collects the subscribers `signal` reaches, as the fabric stands right now.
    fn route(&self, signal: Signal, tasks: &mut Vec<Task>) -> Result<(), SimError> {
        let Some(&channel) = self
            .publish
            .get(&(signal.unit, signal.instance, signal.event))
        else {
            return Ok(());
        };
        let fanout = self.fabric.publish(channel, |task| tasks.push(task))?;
        tracing::trace!(
            unit = %signal.unit,
            instance = signal.instance,
            event = %signal.event,
            channel,
            fanout,
            "event published"
        );
        Ok(())
    }

    fn perform(&mut self, task: Task, signals: &mut Vec<Signal>) -> Result<(), SimError> {
        tracing::trace!(?task, now = self.now, "task");
        let (unit, instance, kind) = match task {
            Task::EnableGroup(group) => return self.fabric.enable_group(group),
            Task::DisableGroup(group) => return self.fabric.disable_group(group),
            Task::Peripheral {
                unit,
                instance,
                kind,
            } => (unit, instance, kind),
        };
        let _ = self.events(unit, instance)?;

        match kind {
            TaskKind::Stop => {
                match unit {
                    Unit::Ecb => self.ecb[instance].stop(signals),
                    Unit::Ccm => self.ccm[instance].stop(signals),
                    Unit::Aar => self.aar[instance].stop(signals),
                }
                Ok(())
            }
            TaskKind::Start => {
                // A start that will fail on a null job list must not disturb the cluster.
                let claims_core = match unit {
                    Unit::Ecb => {
                        let ecb = &self.ecb[instance];
                        ecb.is_enabled() && !ecb.is_running() && ecb.has_job_lists()
                    }
                    Unit::Ccm => {
                        let ccm = &self.ccm[instance];
                        ccm.is_enabled() && ccm.has_job_lists()
                    }
                    Unit::Aar => {
                        let aar = &self.aar[instance];
                        aar.is_enabled() && !aar.is_running() && aar.has_job_lists()
                    }
                };
                if claims_core {
                    self.preempt(instance, unit, signals);
                }
                let mut ctx = DeviceContext {
                    bus: &mut self.bus,
                    crypto: self.crypto.as_ref(),
                    now: self.now,
                    timing: &self.timing,
                    signals,
                };
                match unit {
                    Unit::Ecb => self.ecb[instance].start(&mut ctx),
                    Unit::Ccm => self.ccm[instance].start(&mut ctx),
                    Unit::Aar => self.aar[instance].start(&mut ctx),
                }
            }
        }
    }

    /// Aborts every unit of cluster `instance` other than `starting` that holds the core.
    fn preempt(&mut self, instance: usize, starting: Unit, signals: &mut Vec<Signal>) {
        if starting != Unit::Ecb && self.ecb[instance].is_running() {
            tracing::warn!(instance, by = %starting, "ECB preempted");
            self.ecb[instance].abort(signals);
        }
        if starting != Unit::Aar && self.aar[instance].is_running() {
            tracing::warn!(instance, by = %starting, "AAR preempted");
            self.aar[instance].abort(signals);
        }
    }

    fn check_task(&self, task: Task) -> Result<(), SimError> {
        match task {
            Task::Peripheral { unit, instance, .. } => self.events(unit, instance).map(|_| ()),
            Task::EnableGroup(group) | Task::DisableGroup(group) => {
                self.fabric.group_mask(group).map(|_| ())
            }
        }
    }

    fn sync_scheduler(&mut self) {
        let n = self.instances();
        for (i, ecb) in self.ecb.iter().enumerate() {
            self.scheduler.set(i, ecb.wake());
        }
        for (i, aar) in self.aar.iter().enumerate() {
            self.scheduler.set(n + i, aar.wake());
        }
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("bus", &self.bus)
            .field("crypto", &self.crypto.name())
            .field("ecb", &self.ecb)
            .field("ccm", &self.ccm)
            .field("aar", &self.aar)
            .field("fabric", &self.fabric)
            .field("now", &self.now)
            .field("next_wake", &self.scheduler.next_wake())
            .finish_non_exhaustive()
    }
}
