//! A 65C51-style asynchronous communications interface adapter: a
//! four-register, memory-mapped serial port bridging the bus to a host
//! byte stream through the small [`HostIo`] seam.

use std::collections::VecDeque;

use crate::bus::Peripheral;

/// Host-side transport the ACIA drives. The composer supplies a
/// concrete implementation (raw-mode stdio, a loopback pair, a network
/// socket); this core only ships the trait and the in-memory test
/// double below, never a terminal front-end.
pub trait HostIo {
    /// Non-blocking poll for one byte of host input. `Ok(None)` means no
    /// byte is currently available, not an error.
    fn try_read_byte(&mut self) -> std::io::Result<Option<u8>>;

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()>;
}

/// An in-memory loopback-style [`HostIo`] for tests: bytes pushed onto
/// `input` are what the ACIA receives, bytes the ACIA transmits land in
/// `output`.
#[derive(Debug, Default)]
pub struct InMemoryHostIo {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl InMemoryHostIo {
    pub fn new() -> Self {
        InMemoryHostIo::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes.iter().copied());
    }
}

impl HostIo for InMemoryHostIo {
    fn try_read_byte(&mut self) -> std::io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

/// Standard 65C51 SBR (bits 0-3 of the control register) baud table.
/// `0` is the "use external receiver clock" selector rather than a rate.
#[rustfmt::skip]
const BAUD_TABLE: [u32; 16] = [
    0, 50, 75, 110, 135, 150, 300, 600,
    1200, 1800, 2400, 3600, 4800, 7200, 9600, 19200,
];

const STATUS_IRQ: u8 = 0b1000_0000;
const STATUS_DSR: u8 = 0b0100_0000;
const STATUS_DCD: u8 = 0b0010_0000;
const STATUS_TDRE: u8 = 0b0001_0000;
const STATUS_RDRF: u8 = 0b0000_1000;

/// Command register's receiver-interrupt-disable bit: 1 disables the
/// receiver IRQ, 0 enables it.
const COMMAND_IRD: u8 = 0b0000_0010;

/// Register-mapped serial device over a generic host transport `H`.
/// TDRE and RDRF are never stored as separate flags: they are always
/// derived from whether the transmit/receive queues are empty, so they
/// can't drift out of sync with the queues they describe.
pub struct Acia<H: HostIo> {
    base: u16,
    host: H,

    tx_queue: VecDeque<u8>,
    rx_queue: VecDeque<u8>,

    /// Clear-to-send-bar pin. High disables the transmitter.
    ctsb: bool,
    irq_pending: bool,

    command: u8,
    receiver_irq_enabled: bool,

    control: u8,
    baud_selector: u8,
    receiver_clock_source_external: bool,
    word_length: u8,
    stop_bits: StopBits,
}

impl<H: HostIo> Acia<H> {
    pub fn new(base: u16, host: H) -> Self {
        let mut acia = Acia {
            base,
            host,
            tx_queue: VecDeque::new(),
            rx_queue: VecDeque::new(),
            ctsb: false,
            irq_pending: false,
            command: 0,
            receiver_irq_enabled: true,
            control: 0,
            baud_selector: 0,
            receiver_clock_source_external: false,
            word_length: 8,
            stop_bits: StopBits::One,
        };
        acia.reset();
        acia
    }

    pub fn baud_rate(&self) -> Option<u32> {
        match BAUD_TABLE[self.baud_selector as usize] {
            0 => None,
            rate => Some(rate),
        }
    }

    pub fn word_length(&self) -> u8 {
        self.word_length
    }

    pub fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    pub fn receiver_clock_source_external(&self) -> bool {
        self.receiver_clock_source_external
    }

    pub fn set_ctsb(&mut self, high: bool) {
        self.ctsb = high;
    }

    fn read_data(&mut self) -> u8 {
        self.rx_queue.pop_front().unwrap_or(0)
    }

    /// Stores the byte; if the transmitter is disabled (CTSB high) the
    /// byte is dropped and TDRE reads true because nothing was ever
    /// queued. Otherwise it's queued and flushed synchronously to the
    /// host, one byte at a time, stopping (and leaving whatever is left
    /// queued, so TDRE still reads false) on the first write failure.
    fn write_data(&mut self, byte: u8) {
        if self.ctsb {
            return;
        }
        self.tx_queue.push_back(byte);
        while let Some(next) = self.tx_queue.front().copied() {
            match self.host.write_byte(next) {
                Ok(()) => {
                    self.tx_queue.pop_front();
                }
                Err(source) => {
                    log::warn!("ACIA host write failed, leaving byte queued: {source}");
                    break;
                }
            }
        }
    }

    fn read_status(&mut self) -> u8 {
        let mut byte = 0u8;
        if self.irq_pending {
            byte |= STATUS_IRQ;
        }
        if self.tx_queue.is_empty() {
            byte |= STATUS_TDRE;
        }
        if !self.rx_queue.is_empty() {
            byte |= STATUS_RDRF;
        }
        // No modem lines are modelled; DCD/DSR both read as asserted
        // (terminal attached), the common assumption absent real wiring.
        let _ = (STATUS_DSR, STATUS_DCD);

        // Reading status is the acknowledgment for a pending IRQ: the
        // byte reflects whatever was pending at the moment of the read,
        // then the latch clears so the next read (absent a fresh
        // receive) reports no IRQ.
        self.irq_pending = false;
        byte
    }

    fn write_command(&mut self, value: u8) {
        self.command = value;
        self.receiver_irq_enabled = value & COMMAND_IRD == 0;
    }

    fn write_control(&mut self, value: u8) {
        self.control = value;
        self.baud_selector = value & 0b0000_1111;
        self.receiver_clock_source_external = value & 0b0001_0000 != 0;
        self.word_length = match (value >> 5) & 0b11 {
            0b00 => 8,
            0b01 => 7,
            0b10 => 6,
            _ => 5,
        };
        let sbn = value & 0b1000_0000 != 0;
        self.stop_bits = if !sbn {
            StopBits::One
        } else if self.word_length == 5 {
            StopBits::OnePointFive
        } else {
            StopBits::Two
        };
    }
}

impl<H: HostIo> Peripheral for Acia<H> {
    fn handles_address(&self, addr: u16) -> bool {
        addr >= self.base && addr < self.base.wrapping_add(4)
    }

    fn read(&mut self, addr: u16) -> u8 {
        match addr.wrapping_sub(self.base) {
            0 => self.read_data(),
            1 => self.read_status(),
            _ => 0, // command/control are write-only
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr.wrapping_sub(self.base) {
            0 => self.write_data(value),
            2 => self.write_command(value),
            3 => self.write_control(value),
            _ => {}
        }
    }

    /// Non-blocking poll of host input; any byte read is appended to the
    /// receive queue. Recomputes `irq_pending` from the receiver-IRQ
    /// enable and whether the queue is (now) non-empty, per the spec's
    /// RDRF-driven-only IRQ contract (DCD/DSR transitions are not
    /// modelled).
    fn tick(&mut self) {
        loop {
            match self.host.try_read_byte() {
                Ok(Some(byte)) => self.rx_queue.push_back(byte),
                Ok(None) => break,
                Err(source) => {
                    log::warn!("ACIA host read failed: {source}");
                    break;
                }
            }
        }
        self.irq_pending = self.receiver_irq_enabled && !self.rx_queue.is_empty();
    }

    fn has_interrupt_request(&self) -> bool {
        self.irq_pending
    }

    fn reset(&mut self) {
        self.tx_queue.clear();
        self.rx_queue.clear();
        self.ctsb = false;
        self.irq_pending = false;
        self.write_command(0);
        self.write_control(0);
    }
}
