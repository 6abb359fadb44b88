//! In-memory stand-ins for the hardware collaborators.
//!
//! Every type here is a cheap handle onto shared state: keep one clone to
//! inspect or steer the fake while the node owns the other. The bench binary
//! runs on these, and so do the tests.

use anyhow::{bail, Error};
use common::{Decoder, FrameEncoding, Packet};
use log::{debug, info};
use std::{
    collections::VecDeque,
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::{
    clock::Clock,
    config::{BenchConfig, BenchNetwork},
    lights::DigitalOutput,
    services::{NetworkAssociation, StreamingService},
    uart::SerialPort,
    update::{UpdateEvent, UpdateHooks, UpdateService},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock that only moves when told to, or when something sleeps on it.
#[derive(Debug, Default)]
pub struct SimClock {
    now_ms: AtomicU64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance(ms);
    }
}

/// An access point the simulated radio can join
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimNetwork {
    pub name: String,
    pub passphrase: String,
    pub address: Ipv4Addr,
    pub associate_after_ms: u64,
}

impl From<&BenchNetwork> for SimNetwork {
    fn from(network: &BenchNetwork) -> Self {
        Self {
            name: network.name.clone(),
            passphrase: network.passphrase.clone(),
            address: network.address,
            associate_after_ms: network.associate_after_ms,
        }
    }
}

#[derive(Debug, Default)]
struct RadioState {
    networks: Vec<SimNetwork>,
    hostname: Option<String>,
    begin_calls: usize,
    fail_begin: bool,
    /// Network being joined and when the join started
    joining: Option<(SimNetwork, u64)>,
}

/// Radio that associates with any known network whose passphrase matches,
/// after that network's configured delay.
#[derive(Clone)]
pub struct SimRadio {
    state: Arc<Mutex<RadioState>>,
    clock: Arc<dyn Clock>,
}

impl SimRadio {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::default(),
            clock,
        }
    }

    pub fn from_config(config: &BenchConfig, clock: Arc<dyn Clock>) -> Self {
        let radio = Self::new(clock);
        for network in &config.networks {
            radio.add_network(network.into());
        }
        radio
    }

    pub fn add_network(&self, network: SimNetwork) {
        lock(&self.state).networks.push(network);
    }

    /// Make the next `begin` calls fail
    pub fn fail_begin(&self, fail: bool) {
        lock(&self.state).fail_begin = fail;
    }

    /// Access point went away
    pub fn drop_association(&self) {
        lock(&self.state).joining = None;
    }

    pub fn begin_calls(&self) -> usize {
        lock(&self.state).begin_calls
    }

    pub fn hostname(&self) -> Option<String> {
        lock(&self.state).hostname.clone()
    }

    fn joined(&self) -> Option<SimNetwork> {
        let state = lock(&self.state);
        let (network, started_at) = state.joining.as_ref()?;
        (self.clock.now_ms() >= started_at + network.associate_after_ms).then(|| network.clone())
    }
}

impl NetworkAssociation for SimRadio {
    fn set_hostname(&mut self, hostname: &str) -> Result<(), Error> {
        lock(&self.state).hostname = Some(hostname.to_string());
        Ok(())
    }

    fn begin(&mut self, network_name: &str, passphrase: &str) -> Result<(), Error> {
        let mut state = lock(&self.state);
        state.begin_calls += 1;
        if state.fail_begin {
            bail!("radio not ready");
        }

        let found = state
            .networks
            .iter()
            .find(|n| n.name == network_name && n.passphrase == passphrase)
            .cloned();
        debug!("sim radio: joining '{}', known: {}", network_name, found.is_some());
        state.joining = found.map(|network| (network, self.clock.now_ms()));
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        self.joined().is_some()
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        self.joined().map(|network| network.address)
    }
}

#[derive(Debug, Default)]
struct PortState {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    fail_reads: bool,
    fail_writes: bool,
}

/// Serial port backed by two byte buffers
#[derive(Clone, Debug, Default)]
pub struct MemoryPort {
    state: Arc<Mutex<PortState>>,
}

impl MemoryPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes the controller sends to the node
    pub fn feed(&self, bytes: &[u8]) {
        lock(&self.state).inbound.extend(bytes);
    }

    /// Everything the node has written so far, clearing the record
    pub fn take_outbound(&self) -> Vec<u8> {
        std::mem::take(&mut lock(&self.state).outbound)
    }

    /// Decode what the node has written so far, without clearing it
    pub fn sent_packets(&self, encoding: FrameEncoding) -> Vec<Packet> {
        let mut decoder = Decoder::new(encoding);
        lock(&self.state)
            .outbound
            .iter()
            .filter_map(|&byte| decoder.push(byte))
            .collect()
    }

    pub fn fail_reads(&self, fail: bool) {
        lock(&self.state).fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl SerialPort for MemoryPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut state = lock(&self.state);
        if state.fail_reads {
            bail!("read fault");
        }
        let n = buf.len().min(state.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            bail!("write fault");
        }
        state.outbound.extend_from_slice(bytes);
        Ok(())
    }
}

/// Streaming server that counts how often it was started
#[derive(Clone, Debug, Default)]
pub struct RecordingStreaming {
    starts: Arc<AtomicUsize>,
}

impl RecordingStreaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl StreamingService for RecordingStreaming {
    fn start_streaming(&mut self) {
        info!("sim camera: streaming started");
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct UpdateState {
    arms: usize,
    pending: VecDeque<UpdateEvent>,
}

/// Update service that replays queued events on the next `handle`
#[derive(Clone, Debug, Default)]
pub struct RecordingUpdates {
    state: Arc<Mutex<UpdateState>>,
}

impl RecordingUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arms(&self) -> usize {
        lock(&self.state).arms
    }

    pub fn push_event(&self, event: UpdateEvent) {
        lock(&self.state).pending.push_back(event);
    }
}

impl UpdateService for RecordingUpdates {
    fn arm(&mut self) {
        lock(&self.state).arms += 1;
    }

    fn handle(&mut self, hooks: &mut dyn UpdateHooks) {
        let events: Vec<_> = lock(&self.state).pending.drain(..).collect();
        for event in events {
            event.deliver(hooks);
        }
    }
}

#[derive(Debug, Default)]
struct IndicatorState {
    history: Vec<bool>,
    fail: bool,
}

/// Indicator that remembers every level it was driven to
#[derive(Clone, Debug, Default)]
pub struct RecordingIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        lock(&self.state).history.clone()
    }

    pub fn fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }
}

impl DigitalOutput for RecordingIndicator {
    fn set_active(&mut self, active: bool) -> Result<(), Error> {
        let mut state = lock(&self.state);
        if state.fail {
            bail!("pin fault");
        }
        state.history.push(active);
        Ok(())
    }
}
