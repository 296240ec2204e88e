//! Address decode and peripheral arbitration.

use crate::ram::Ram;
use crate::rom::Rom;

/// Interface every bus-attached device implements. Addresses are decoded
/// in insertion order by `SystemBus`, so a peripheral claiming an
/// overlapping range shadows whatever is behind it.
pub trait Peripheral {
    fn handles_address(&self, addr: u16) -> bool;
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);

    /// Advances the peripheral by one bus tick. Called once per CPU
    /// `step()` that completes a cycle, in insertion order, strictly
    /// after the CPU has finished mutating its own state for that cycle.
    fn tick(&mut self) {}

    /// Current level of this peripheral's IRQ output line.
    fn has_interrupt_request(&self) -> bool {
        false
    }

    fn reset(&mut self) {}
}

/// Address decode, peripheral arbitration, and per-cycle ticking.
///
/// Peripherals are tried in insertion order; the first one whose
/// `handles_address` returns true wins a read or write. An address no
/// peripheral claims falls through to the ROM window, then to RAM.
///
/// The CPU owns a `SystemBus` by value, and `SystemBus` owns its
/// peripherals by `Box`; there is no back-reference from the bus to the
/// CPU. A peripheral's IRQ line is collected and aggregated by `tick`,
/// which returns whether any line rose this cycle — the caller (the
/// CPU's `step`) turns that into its own `request_irq()` call.
pub struct SystemBus {
    ram: Ram,
    rom: Rom,
    peripherals: Vec<Box<dyn Peripheral>>,
    irq_line_state: Vec<bool>,
}

impl SystemBus {
    pub fn new(ram: Ram, rom: Rom) -> Self {
        SystemBus {
            ram,
            rom,
            peripherals: Vec::new(),
            irq_line_state: Vec::new(),
        }
    }

    pub fn add_peripheral(&mut self, peripheral: Box<dyn Peripheral>) {
        self.peripherals.push(peripheral);
        self.irq_line_state.push(false);
    }

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ram_mut(&mut self) -> &mut Ram {
        &mut self.ram
    }

    pub fn rom(&self) -> &Rom {
        &self.rom
    }

    pub fn rom_mut(&mut self) -> &mut Rom {
        &mut self.rom
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        for peripheral in &mut self.peripherals {
            if peripheral.handles_address(addr) {
                return peripheral.read(addr);
            }
        }
        if self.rom.handles_address(addr) {
            return self.rom.read(addr);
        }
        self.ram.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        for peripheral in &mut self.peripherals {
            if peripheral.handles_address(addr) {
                peripheral.write(addr, value);
                return;
            }
        }
        if self.rom.handles_address(addr) {
            // Not an error: the write is silently dropped.
            return;
        }
        self.ram.write(addr, value);
    }

    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Ticks every peripheral in insertion order and edge-detects each
    /// one's IRQ line against its state on the previous tick. Returns
    /// true only on a low-to-high transition of at least one line, never
    /// while a line is merely held high across ticks.
    pub fn tick(&mut self) -> bool {
        let mut raised = false;
        for (index, peripheral) in self.peripherals.iter_mut().enumerate() {
            peripheral.tick();
            let line = peripheral.has_interrupt_request();
            if !self.irq_line_state[index] && line {
                raised = true;
            }
            self.irq_line_state[index] = line;
        }
        raised
    }

    pub fn reset_peripherals(&mut self) {
        for peripheral in &mut self.peripherals {
            peripheral.reset();
        }
        for state in &mut self.irq_line_state {
            *state = false;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::memory_range;

    struct StubPeripheral {
        base: u16,
        value: u8,
        irq: bool,
    }

    impl Peripheral for StubPeripheral {
        fn handles_address(&self, addr: u16) -> bool {
            addr == self.base
        }
        fn read(&mut self, _addr: u16) -> u8 {
            self.value
        }
        fn write(&mut self, _addr: u16, value: u8) {
            self.value = value;
        }
        fn has_interrupt_request(&self) -> bool {
            self.irq
        }
    }

    fn bus() -> SystemBus {
        SystemBus::new(
            Ram::new(),
            Rom::new(memory_range::ROM_START, memory_range::ROM_END),
        )
    }

    #[test]
    fn peripheral_shadows_ram_at_its_address() {
        let mut bus = bus();
        bus.add_peripheral(Box::new(StubPeripheral {
            base: 0x4000,
            value: 0xAB,
            irq: false,
        }));
        assert_eq!(bus.read(0x4000), 0xAB);
        bus.write(0x4000, 0x11);
        assert_eq!(bus.read(0x4000), 0x11);
        // Untouched addresses still fall through to RAM.
        assert_eq!(bus.read(0x4001), 0x00);
    }

    #[test]
    fn rom_writes_are_silently_dropped() {
        let mut bus = bus();
        bus.rom_mut().load_bytes(memory_range::ROM_START, &[0x42]);
        bus.write(memory_range::ROM_START, 0xFF);
        assert_eq!(bus.read(memory_range::ROM_START), 0x42);
    }

    #[test]
    fn irq_is_edge_triggered_across_ticks() {
        let mut bus = bus();
        bus.add_peripheral(Box::new(StubPeripheral {
            base: 0x4000,
            value: 0,
            irq: true,
        }));
        assert!(bus.tick());
        // Line stays high on the next tick: no new edge, no new IRQ.
        assert!(!bus.tick());
    }
}
