//! Sliding-window value storage for nets and unconnected pins.
//!
//! Every net owns one [`Window`] of [`WINDOW`] slots indexed by
//! `cycle % WINDOW`, plus the last cycle it was written. All pins on a net
//! resolve to the net's window, so a driver's write is immediately visible
//! to every fanout reader. Pins without a net get a private window.
//!
//! Slots are atomics: a stage's nodes write disjoint nets, so they can be
//! evaluated on several threads without locking.

use std::sync::atomic::{AtomicI64, AtomicI8, Ordering};

use kestrel_common::Logic;
use kestrel_netlist::{ArenaId, Netlist, NodeId, PinId};

/// Number of cycles of history kept per signal.
pub const WINDOW: usize = 16;

/// Cycles simulated per wave. One slot stays reserved for the cycle
/// preceding the wave so sequential nodes can read it while the wave's
/// inputs are filled in.
pub const WAVE_LENGTH: usize = WINDOW - 1;

/// Last-written marker of a signal that has never been written.
pub const NEVER_WRITTEN: i64 = -1;

/// The value history of one signal.
pub struct Window {
    values: [AtomicI8; WINDOW],
    last_cycle: AtomicI64,
    initial: Logic,
}

impl Window {
    /// Creates a window whose unwritten reads return `initial`.
    pub fn new(initial: Logic) -> Self {
        Self {
            values: std::array::from_fn(|_| AtomicI8::new(initial.code())),
            last_cycle: AtomicI64::new(NEVER_WRITTEN),
            initial,
        }
    }

    /// Reads the value at `cycle`.
    ///
    /// Negative cycles and never-written signals read as the initial value.
    pub fn read(&self, cycle: i64) -> Logic {
        if cycle < 0 || self.last_cycle() == NEVER_WRITTEN {
            return self.initial;
        }
        Logic::from_code(self.values[slot(cycle)].load(Ordering::Acquire))
    }

    /// Writes `value` at `cycle` and marks the signal as current up to `cycle`.
    pub fn write(&self, cycle: i64, value: Logic) {
        self.values[slot(cycle)].store(value.code(), Ordering::Release);
        self.last_cycle.store(cycle, Ordering::Release);
    }

    /// The last cycle written, or [`NEVER_WRITTEN`].
    pub fn last_cycle(&self) -> i64 {
        self.last_cycle.load(Ordering::Acquire)
    }

    /// The value returned before the first write.
    pub fn initial(&self) -> Logic {
        self.initial
    }
}

fn slot(cycle: i64) -> usize {
    cycle.rem_euclid(WINDOW as i64) as usize
}

/// Windows for every net and net-less pin of a netlist.
pub struct SignalStore {
    windows: Vec<Window>,
    pin_window: Vec<u32>,
}

impl SignalStore {
    /// Allocates one window per net and one per pin without a net.
    ///
    /// A net's initial value is its driver node's declared initial value,
    /// or its first reader's when it has no driver, falling back to `default`.
    pub fn new(netlist: &Netlist, default: Logic) -> Self {
        let initial_of =
            |node: NodeId| netlist.node(node).initial_value.unwrap_or(default);

        let mut windows = Vec::with_capacity(netlist.nets.len());
        for net in netlist.nets.values() {
            let owner = net.driver.or_else(|| net.fanout.first().copied());
            let initial = owner.map_or(default, |pin| initial_of(netlist.pin(pin).node));
            windows.push(Window::new(initial));
        }

        let mut pin_window = Vec::with_capacity(netlist.pins.len());
        for pin in netlist.pins.values() {
            let index = match pin.net {
                Some(net) => net.as_raw(),
                None => {
                    windows.push(Window::new(initial_of(pin.node)));
                    (windows.len() - 1) as u32
                }
            };
            pin_window.push(index);
        }

        Self { windows, pin_window }
    }

    fn window(&self, pin: PinId) -> &Window {
        &self.windows[self.pin_window[pin.index()] as usize]
    }

    /// Reads `pin` at `cycle`.
    pub fn read(&self, pin: PinId, cycle: i64) -> Logic {
        self.window(pin).read(cycle)
    }

    /// Writes `pin` at `cycle`.
    pub fn write(&self, pin: PinId, cycle: i64, value: Logic) {
        self.window(pin).write(cycle, value);
    }

    /// The last cycle `pin` was written.
    pub fn last_cycle(&self, pin: PinId) -> i64 {
        self.window(pin).last_cycle()
    }

    /// The value `pin` reads before its first write.
    pub fn initial(&self, pin: PinId) -> Logic {
        self.window(pin).initial()
    }

    /// Returns `true` if both pins read the same storage.
    pub fn shares_window(&self, a: PinId, b: PinId) -> bool {
        self.pin_window[a.index()] == self.pin_window[b.index()]
    }

    /// Number of windows allocated.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }
}
