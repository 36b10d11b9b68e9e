// =============================================================================
// Pulse - ARM Generic Interrupt Controller (GICv2)
// =============================================================================
// Driver for GICv2-compatible controllers: the GICv2 on QEMU's virt machine
// and the GIC-400 on the Raspberry Pi 4.
//
// The GIC consists of:
// - Distributor: Prioritizes and routes interrupts to CPUs.
// - CPU Interface: Handles interrupt masking and acknowledgement for a specific CPU.
//
// Every IAR read that returns an ID must be matched by exactly one EOIR write
// of the same value, or the controller keeps that interrupt active and never
// signals it again.
// =============================================================================

use crate::irq::{Claim, InterruptController, InterruptLine};
use crate::mmio::RegisterBlock;

// Distributor Registers
const GICD_CTLR: usize = 0x000;       // Control Register
const GICD_ISENABLER: usize = 0x100;  // Interrupt Set-Enable Registers (write 1 to set)
const GICD_IPRIORITYR: usize = 0x400; // Interrupt Priority Registers (byte per ID)
const GICD_ITARGETSR: usize = 0x800;  // Interrupt Processor Targets (byte per ID)

// CPU Interface Registers
const GICC_CTLR: usize = 0x0000;      // Control Register
const GICC_PMR: usize = 0x0004;       // Priority Mask Register
const GICC_IAR: usize = 0x000C;       // Interrupt Acknowledge Register (read: pending -> active)
const GICC_EOIR: usize = 0x0010;      // End of Interrupt Register (write: active -> inactive)

/// Lower 10 bits of IAR are the interrupt ID
pub const IAR_ID_MASK: u32 = 0x3FF;

/// ID read from IAR when nothing is pending
pub const SPURIOUS_ID: u32 = 1023;

/// First ID reserved by the architecture
pub const MAX_ID: u32 = 1020;

/// Priority mask letting every priority through
const PRIORITY_MASK_ALL: u32 = 0xFF;

/// ITARGETSR value for CPU interface 0
const TARGET_CPU0: u8 = 1;

pub struct GicV2 {
    dist: RegisterBlock,
    cpu: RegisterBlock,
}

impl GicV2 {
    /// # Safety
    /// `dist_base` and `cpu_base` must point at the distributor and CPU
    /// interface of the same GICv2.
    pub const unsafe fn new(dist_base: usize, cpu_base: usize) -> Self {
        Self {
            dist: RegisterBlock::new(dist_base),
            cpu: RegisterBlock::new(cpu_base),
        }
    }

    /// Set the priority byte of `id` (0 = highest).
    pub fn set_priority(&self, id: u32, priority: u8) {
        self.write_byte_field(GICD_IPRIORITYR, id, priority);
    }

    /// Route `id` to the CPU interfaces in `cpu_mask`. Read-only for SGIs and
    /// PPIs, where the write is ignored.
    pub fn set_target(&self, id: u32, cpu_mask: u8) {
        self.write_byte_field(GICD_ITARGETSR, id, cpu_mask);
    }

    /// Enable forwarding of `id`.
    pub fn enable(&self, id: u32) {
        let offset = GICD_ISENABLER + (id / 32) as usize * 4;
        // Set-enable: zero bits are ignored, so no read-modify-write
        self.dist.reg(offset).write(1 << (id % 32));
    }

    /// Acknowledge the highest priority pending interrupt.
    /// Returns the raw IAR value.
    pub fn acknowledge(&self) -> u32 {
        self.cpu.reg(GICC_IAR).read()
    }

    /// Signal End Of Interrupt (EOI) for a raw IAR value.
    pub fn end_interrupt(&self, iar: u32) {
        self.cpu.reg(GICC_EOIR).write(iar)
    }

    fn write_byte_field(&self, base: usize, id: u32, value: u8) {
        let offset = base + (id / 4) as usize * 4;
        let shift = (id % 4) * 8;
        self.dist
            .reg(offset)
            .modify(|v| (v & !(0xFF << shift)) | ((value as u32) << shift));
    }
}

impl InterruptController for GicV2 {
    fn init(&self) {
        // Enable the distributor
        self.dist.reg(GICD_CTLR).write(1);

        // Set Priority Mask to 0xFF (allow all interrupts)
        self.cpu.reg(GICC_PMR).write(PRIORITY_MASK_ALL);

        // Enable the CPU interface
        self.cpu.reg(GICC_CTLR).write(1);
    }

    fn enable_line(&self, line: InterruptLine, priority: u8) {
        if let InterruptLine::Id(id) = line {
            self.set_priority(id, priority);
            self.set_target(id, TARGET_CPU0);
            self.enable(id);
        }
    }

    fn claim(&self) -> Claim {
        Claim::Acknowledged(self.acknowledge())
    }

    fn complete(&self, claim: Claim) {
        if let Claim::Acknowledged(iar) = claim {
            self.end_interrupt(iar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmio::fake::FakeRegisters;

    fn gic() -> (FakeRegisters, FakeRegisters, GicV2) {
        let dist = FakeRegisters::new(0x1000);
        let cpu = FakeRegisters::new(0x1000);
        let gic = unsafe { GicV2::new(dist.base(), cpu.base()) };
        (dist, cpu, gic)
    }

    #[test]
    fn init_enables_both_stages() {
        let (dist, cpu, gic) = gic();
        gic.init();
        assert_eq!(dist.get(GICD_CTLR), 1);
        assert_eq!(cpu.get(GICC_PMR), 0xFF);
        assert_eq!(cpu.get(GICC_CTLR), 1);
    }

    #[test]
    fn enable_line_sets_priority_target_and_enable_bit() {
        let (dist, _cpu, gic) = gic();
        dist.set(GICD_IPRIORITYR + 24, 0x1122_3344);
        gic.enable_line(InterruptLine::Id(27), 0xA0);

        // ID 27 is byte 3 of IPRIORITYR6
        assert_eq!(dist.get(GICD_IPRIORITYR + 24), 0xA022_3344);
        assert_eq!(dist.get(GICD_ITARGETSR + 24), 0x0100_0000);
        assert_eq!(dist.get(GICD_ISENABLER), 1 << 27);
    }

    #[test]
    fn enable_picks_the_right_set_enable_word() {
        let (dist, _cpu, gic) = gic();
        gic.enable(33);
        assert_eq!(dist.get(GICD_ISENABLER), 0);
        assert_eq!(dist.get(GICD_ISENABLER + 4), 1 << 1);
    }

    #[test]
    fn complete_writes_back_the_acknowledged_value() {
        let (_dist, cpu, gic) = gic();
        // CPU ID bits above the interrupt ID must survive the round trip
        cpu.set(GICC_IAR, (2 << 10) | 30);
        let claim = gic.claim();
        assert_eq!(claim.id(), Some(30));
        gic.complete(claim);
        assert_eq!(cpu.get(GICC_EOIR), (2 << 10) | 30);
    }

    #[test]
    fn claim_matches_only_its_id() {
        let (_dist, cpu, gic) = gic();
        cpu.set(GICC_IAR, 27);
        let claim = gic.claim();
        assert!(claim.matches(InterruptLine::Id(27)));
        assert!(!claim.matches(InterruptLine::Id(30)));

        cpu.set(GICC_IAR, SPURIOUS_ID);
        assert!(!gic.claim().matches(InterruptLine::Id(27)));
    }
}
