//! An optional dual-timer peripheral loosely modelled after the 6522
//! VIA's timer/interrupt registers: two down-counters, a latch per
//! timer, and the IFR/IER interrupt plumbing shared across both.

use crate::bus::Peripheral;

const IFR_TIMER1: u8 = 0b0100_0000;
const IFR_TIMER2: u8 = 0b0010_0000;
const IFR_VALID_MASK: u8 = 0b0111_1111;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer1Mode {
    OneShot,
    Continuous,
}

/// Two 16-bit down-counting timers with latches, an interrupt flag
/// register, and an interrupt enable register. Register window (8
/// bytes): `T1C-L, T1C-H, T1L-L, T1L-H, T2C-L, T2C-H, IFR, IER`.
pub struct Via {
    base: u16,

    timer1_counter: u16,
    timer1_latch: u16,
    timer1_mode: Timer1Mode,
    timer1_running: bool,

    timer2_counter: u16,
    timer2_latch_low: u8,
    timer2_running: bool,

    ifr: u8,
    ier: u8,
}

impl Via {
    pub fn new(base: u16) -> Self {
        Via {
            base,
            timer1_counter: 0,
            timer1_latch: 0,
            timer1_mode: Timer1Mode::OneShot,
            timer1_running: false,
            timer2_counter: 0,
            timer2_latch_low: 0,
            timer2_running: false,
            ifr: 0,
            ier: 0,
        }
    }

    /// Enables timer 1's free-running mode instead of its default
    /// one-shot behaviour; a composer wires this from a control
    /// register elsewhere in its own memory map if it needs one, since
    /// this core's 8-byte window has no ACR of its own.
    pub fn set_timer1_continuous(&mut self, continuous: bool) {
        self.timer1_mode = if continuous {
            Timer1Mode::Continuous
        } else {
            Timer1Mode::OneShot
        };
    }

    fn tick_timer1(&mut self) {
        if !self.timer1_running {
            return;
        }
        if self.timer1_counter == 0 {
            self.ifr |= IFR_TIMER1;
            match self.timer1_mode {
                Timer1Mode::Continuous => self.timer1_counter = self.timer1_latch,
                Timer1Mode::OneShot => self.timer1_running = false,
            }
        } else {
            self.timer1_counter -= 1;
        }
    }

    fn tick_timer2(&mut self) {
        if !self.timer2_running {
            return;
        }
        if self.timer2_counter == 0 {
            self.ifr |= IFR_TIMER2;
            self.timer2_running = false;
        } else {
            self.timer2_counter -= 1;
        }
    }

    fn read_register(&mut self, offset: u16) -> u8 {
        match offset {
            0 => {
                let byte = self.timer1_counter.to_le_bytes()[0];
                self.ifr &= !IFR_TIMER1;
                byte
            }
            1 => self.timer1_counter.to_le_bytes()[1],
            2 => self.timer1_latch.to_le_bytes()[0],
            3 => self.timer1_latch.to_le_bytes()[1],
            4 => {
                let byte = self.timer2_counter.to_le_bytes()[0];
                self.ifr &= !IFR_TIMER2;
                byte
            }
            5 => self.timer2_counter.to_le_bytes()[1],
            6 => self.ifr,
            7 => self.ier,
            _ => 0,
        }
    }

    fn write_register(&mut self, offset: u16, value: u8) {
        match offset {
            0 => {
                let [_, hi] = self.timer1_latch.to_le_bytes();
                self.timer1_latch = u16::from_le_bytes([value, hi]);
            }
            1 => {
                let [lo, _] = self.timer1_latch.to_le_bytes();
                self.timer1_latch = u16::from_le_bytes([lo, value]);
                // Writing T1C-H reloads and starts timer 1 from the latch.
                self.timer1_counter = self.timer1_latch;
                self.timer1_running = true;
                self.ifr &= !IFR_TIMER1;
            }
            2 => {
                let [_, hi] = self.timer1_latch.to_le_bytes();
                self.timer1_latch = u16::from_le_bytes([value, hi]);
            }
            3 => {
                let [lo, _] = self.timer1_latch.to_le_bytes();
                self.timer1_latch = u16::from_le_bytes([lo, value]);
            }
            4 => self.timer2_latch_low = value,
            5 => {
                self.timer2_counter = u16::from_le_bytes([self.timer2_latch_low, value]);
                self.timer2_running = true;
                self.ifr &= !IFR_TIMER2;
            }
            6 => {
                // Writing IFR clears whichever flag bits are set in `value`.
                self.ifr &= !(value & IFR_VALID_MASK);
            }
            7 => {
                if value & 0x80 != 0 {
                    self.ier |= value & IFR_VALID_MASK;
                } else {
                    self.ier &= !(value & IFR_VALID_MASK);
                }
            }
            _ => {}
        }
    }
}

impl Peripheral for Via {
    fn handles_address(&self, addr: u16) -> bool {
        addr >= self.base && addr < self.base.wrapping_add(8)
    }

    fn read(&mut self, addr: u16) -> u8 {
        self.read_register(addr.wrapping_sub(self.base))
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.write_register(addr.wrapping_sub(self.base), value);
    }

    fn tick(&mut self) {
        self.tick_timer1();
        self.tick_timer2();
    }

    fn has_interrupt_request(&self) -> bool {
        self.ifr & self.ier & IFR_VALID_MASK != 0
    }

    fn reset(&mut self) {
        self.timer1_counter = 0;
        self.timer1_latch = 0;
        self.timer1_mode = Timer1Mode::OneShot;
        self.timer1_running = false;
        self.timer2_counter = 0;
        self.timer2_latch_low = 0;
        self.timer2_running = false;
        self.ifr = 0;
        self.ier = 0;
    }
}
