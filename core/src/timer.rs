//! The four 16-bit up-counting timers.
//!
//! Each timer divides the CPU clock by a prescaler of 1/64/256/1024, or
//! (timers 1-3) ticks in cascade on the previous timer's overflow. On
//! overflow the counter reloads, optionally raises its IRQ, and notifies the
//! APU so an attached FIFO can pop its next sample.

use crate::apu::Apu;
use crate::irq::{IRQ_TIMER0, IRQ_TIMER1, IRQ_TIMER2, IRQ_TIMER3, InterruptController};

const PRESCALER_VALUES: [u32; 4] = [1, 64, 256, 1024];
const TIMER_IRQ_BITS: [u16; 4] = [IRQ_TIMER0, IRQ_TIMER1, IRQ_TIMER2, IRQ_TIMER3];

#[derive(Clone, Copy, Default)]
pub struct Timer {
    pub counter: u16,
    pub reload: u16,
    pub control: u16,
    prescaler: u32,
    prescaler_counter: u32,
    cascade: bool,
    irq_enable: bool,
    pub enabled: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            prescaler: 1,
            ..Default::default()
        }
    }

    pub fn write_reload(&mut self, val: u16) {
        self.reload = val;
    }

    /// TMxCNT_H write. The counter reloads on the rising edge of the enable
    /// bit; a running timer keeps its count across control rewrites.
    pub fn write_control(&mut self, val: u16) {
        let was_enabled = self.enabled;

        self.control = val;
        self.prescaler = PRESCALER_VALUES[(val & 3) as usize];
        self.cascade = val & (1 << 2) != 0;
        self.irq_enable = val & (1 << 6) != 0;
        self.enabled = val & (1 << 7) != 0;

        if !was_enabled && self.enabled {
            self.counter = self.reload;
            self.prescaler_counter = 0;
        }
    }

    pub fn read_counter(&self) -> u16 {
        self.counter
    }
}

/// Advance all four timers by a cycle budget.
///
/// A cascade timer ignores its prescaler entirely: it only steps when its
/// predecessor overflows, and the chain keeps propagating in the same tick
/// until a cascade timer fails to wrap.
pub fn tick(
    timers: &mut [Timer; 4],
    cycles: u32,
    irq: &mut InterruptController,
    apu: &mut Apu,
) {
    for i in 0..4 {
        if !timers[i].enabled || timers[i].cascade {
            continue;
        }

        timers[i].prescaler_counter += cycles;

        while timers[i].prescaler_counter >= timers[i].prescaler {
            timers[i].prescaler_counter -= timers[i].prescaler;
            timers[i].counter = timers[i].counter.wrapping_add(1);

            if timers[i].counter == 0 {
                overflow(timers, i, irq, apu);
            }
        }
    }
}

/// Reload, raise the IRQ, notify the APU, then walk the cascade chain.
fn overflow(timers: &mut [Timer; 4], idx: usize, irq: &mut InterruptController, apu: &mut Apu) {
    timers[idx].counter = timers[idx].reload;

    if timers[idx].irq_enable {
        irq.request(TIMER_IRQ_BITS[idx]);
    }
    apu.on_timer_overflow(idx);

    let mut next = idx + 1;
    while next < 4 && timers[next].enabled && timers[next].cascade {
        timers[next].counter = timers[next].counter.wrapping_add(1);
        if timers[next].counter != 0 {
            break;
        }
        timers[next].counter = timers[next].reload;
        if timers[next].irq_enable {
            irq.request(TIMER_IRQ_BITS[next]);
        }
        apu.on_timer_overflow(next);
        next += 1;
    }
}
