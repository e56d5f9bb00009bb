//! TI-NSPIRE classic ("zevio") interrupt controller
//!
//! Physical base 0xDC000000. Two identical register banks, IRQ at +0x000 and
//! FIQ at +0x100, each with 32 lines:
//!
//! | Offset | Register                                          |
//! |--------|---------------------------------------------------|
//! | 0x00   | Status (pending and enabled)                      |
//! | 0x04   | Raw status (pending, before the enable mask)      |
//! | 0x08   | Enable (write 1 to enable a line)                 |
//! | 0x0C   | Disable (write 1 to disable a line)               |
//! | 0x20   | Current interrupt number                          |
//! | 0x24   | Priority reset                                    |
//! | 0x28   | Acknowledge (read pops the priority stack)        |
//! | 0x2C   | Maximum accepted priority                         |
//!
//! Controller-wide registers follow at 0x200 (invert select), 0x204 (sticky
//! select) and 0x300 (one priority word per line).
//!
//! Servicing a bank means reading the current interrupt number, running the
//! handler, then reading the acknowledge register and writing the value back
//! to priority reset. The controller will not present the next interrupt on
//! that bank until this sequence runs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};

use super::desc::{FlowHandler, IrqDescs, IrqFlags};
use super::domain::IrqDomain;
use super::{Bank, IrqChip, IrqDispatch, MAX_INTRS, NR_HWIRQS};
use crate::error::{Error, Result};
use crate::mmio::RegisterWindow;

/// Register offsets within a bank
mod regs {
    pub const IO_STATUS: usize = 0x000;
    pub const IO_RAW_STATUS: usize = 0x004;
    pub const IO_ENABLE: usize = 0x008;
    pub const IO_DISABLE: usize = 0x00C;
    pub const IO_CURRENT: usize = 0x020;
    pub const IO_PRIORITY_RESET: usize = 0x024;
    pub const IO_ACK: usize = 0x028;
    pub const IO_MAX_PRIORITY: usize = 0x02C;
}

/// Controller-wide register offsets
mod global {
    pub const IO_INVERT_SEL: usize = 0x200;
    pub const IO_STICKY_SEL: usize = 0x204;
    pub const IO_PRIORITY_SEL: usize = 0x300;
}

pub(crate) use regs::*;
pub(crate) use global::*;

/// Lowest priority the threshold register accepts
const ACCEPT_ALL_PRIORITIES: u32 = 0xF;

/// Controller options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZevioConfig {
    /// Order in which banks are checked on each pass of the exception loop
    pub poll_order: [Bank; 2],
}

impl Default for ZevioConfig {
    fn default() -> Self {
        Self {
            poll_order: [Bank::Irq, Bank::Fiq],
        }
    }
}

/// Classic interrupt controller driver, shared between the exception entry
/// and the descriptors it creates (as their [`IrqChip`]).
pub struct ZevioIntc<W> {
    regs: W,
    config: ZevioConfig,
    domain: IrqDomain,
    /// Enable state last written per bank
    enabled: [AtomicU32; 2],
    initialized: AtomicBool,
}

impl<W: RegisterWindow + Send + Sync + 'static> ZevioIntc<W> {
    /// Wrap the controller's register window. No register is touched until
    /// [`init`](Self::init).
    pub fn new(regs: W, config: ZevioConfig) -> Self {
        Self {
            regs,
            config,
            domain: IrqDomain::linear(NR_HWIRQS),
            enabled: [AtomicU32::new(0), AtomicU32::new(0)],
            initialized: AtomicBool::new(false),
        }
    }

    /// Create and initialise a controller, ready for mapping
    pub fn probe(regs: W, config: ZevioConfig) -> Result<Arc<Self>> {
        let intc = Arc::new(Self::new(regs, config));
        intc.init()?;
        Ok(intc)
    }

    /// Bring the controller to a known state: every line disabled, every
    /// priority accepted, no latched acknowledgement left over from the
    /// bootloader. Must run once, before any line is unmasked.
    pub fn init(&self) -> Result<()> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            warn!("zevio: init called twice");
            return Err(Error::AlreadyInitialized);
        }

        // Do not invert interrupt status bits
        self.regs.write32(IO_INVERT_SEL, !0);
        // No sticky lines
        self.regs.write32(IO_STICKY_SEL, 0);
        // Priorities are unused: every line at the highest one
        for line in 0..MAX_INTRS as usize {
            self.regs.write32(IO_PRIORITY_SEL + line * 4, 0);
        }

        for bank in Bank::ALL {
            self.init_bank(bank);
        }

        info!("TI-NSPIRE classic IRQ controller");
        Ok(())
    }

    fn init_bank(&self, bank: Bank) {
        let base = bank.offset();
        self.regs.write32(base + IO_DISABLE, !0);
        self.enabled[bank.index()].store(0, Ordering::Release);
        self.regs.write32(base + IO_MAX_PRIORITY, ACCEPT_ALL_PRIORITIES);
        // Reset existing interrupts
        self.regs.read32(base + IO_ACK);
    }

    /// Options the controller was created with
    pub fn config(&self) -> &ZevioConfig {
        &self.config
    }

    /// Hardware line to logical irq map
    pub fn domain(&self) -> &IrqDomain {
        &self.domain
    }

    /// Let `line` raise the bank's status
    pub fn enable_line(&self, bank: Bank, line: u32) {
        debug_assert!(line < MAX_INTRS, "line {} out of range", line);
        self.regs.write32(bank.offset() + IO_ENABLE, 1 << line);
        self.enabled[bank.index()].fetch_or(1 << line, Ordering::AcqRel);
        debug!("zevio: enable {:?} line {}", bank, line);
    }

    /// Stop `line` from raising the bank's status
    pub fn disable_line(&self, bank: Bank, line: u32) {
        debug_assert!(line < MAX_INTRS, "line {} out of range", line);
        self.regs.write32(bank.offset() + IO_DISABLE, 1 << line);
        self.enabled[bank.index()].fetch_and(!(1 << line), Ordering::AcqRel);
        debug!("zevio: disable {:?} line {}", bank, line);
    }

    pub fn is_enabled(&self, bank: Bank, line: u32) -> bool {
        line < MAX_INTRS && self.enabled[bank.index()].load(Ordering::Acquire) & (1 << line) != 0
    }

    /// Pending lines in a bank before the enable mask
    pub fn raw_status(&self, bank: Bank) -> u32 {
        self.regs.read32(bank.offset() + IO_RAW_STATUS)
    }

    /// Map a hardware line to a logical irq, creating the descriptor if the
    /// line has none yet. The descriptor starts masked, with level flow.
    pub fn map(self: &Arc<Self>, descs: &mut IrqDescs, hwirq: u32) -> Result<u32> {
        if hwirq >= NR_HWIRQS {
            return Err(Error::InvalidHwIrq(hwirq));
        }
        if let Some(virq) = self.domain.find_mapping(hwirq) {
            return Ok(virq);
        }

        let chip: Arc<dyn IrqChip> = self.clone();
        let virq = descs.alloc(
            hwirq,
            chip,
            FlowHandler::Level,
            IrqFlags::VALID.union(IrqFlags::PROBE),
        )?;
        let virq = self.associate_or_release(descs, hwirq, virq)?;
        debug!("zevio: hwirq {} mapped to irq {}", hwirq, virq);
        Ok(virq)
    }

    /// Bind a freshly allocated descriptor to `hwirq`. If the line got a
    /// mapping in the meantime, the new descriptor is released and the
    /// existing logical irq returned.
    fn associate_or_release(&self, descs: &mut IrqDescs, hwirq: u32, virq: u32) -> Result<u32> {
        match self.domain.associate(hwirq, virq) {
            Ok(mapped) if mapped == virq => Ok(virq),
            Ok(existing) => {
                descs.release(virq);
                Ok(existing)
            }
            Err(err) => {
                descs.release(virq);
                Err(err)
            }
        }
    }

    /// Map every line of both banks
    pub fn map_all(self: &Arc<Self>, descs: &mut IrqDescs) -> Result<()> {
        for hwirq in 0..NR_HWIRQS {
            self.map(descs, hwirq)?;
        }
        Ok(())
    }

    pub fn find_mapping(&self, hwirq: u32) -> Option<u32> {
        self.domain.find_mapping(hwirq)
    }

    /// Translate a one-cell interrupt specifier into a hardware line
    pub fn xlate(&self, intspec: &[u32]) -> Result<u32> {
        self.domain.xlate_onecell(intspec)
    }

    /// Exception entry. Services every pending line on both banks and
    /// returns how many were serviced.
    pub fn handle_exception<D: IrqDispatch + ?Sized>(&self, dispatcher: &D) -> usize {
        let mut total = 0;
        loop {
            let mut serviced = 0;
            for bank in self.config.poll_order {
                if self.process_bank(bank, dispatcher) {
                    serviced += 1;
                }
            }
            if serviced == 0 {
                break;
            }
            total += serviced;
        }
        total
    }

    /// Service the bank's current interrupt, if it has one. A current number
    /// outside the bank is acked but does not count as serviced.
    fn process_bank<D: IrqDispatch + ?Sized>(&self, bank: Bank, dispatcher: &D) -> bool {
        let base = bank.offset();
        if self.regs.read32(base + IO_STATUS) == 0 {
            return false;
        }

        let line = self.regs.read32(base + IO_CURRENT);
        if line >= MAX_INTRS {
            // Nothing to dispatch; the pop still has to run
            error!("zevio: {:?} current number {} out of range", bank, line);
            self.ack_bank(bank);
            return false;
        }
        let hwirq = bank.hwirq(line);
        match self.domain.find_mapping(hwirq) {
            Some(virq) => {
                trace!("zevio: {:?} line {} -> irq {}", bank, line, virq);
                dispatcher.dispatch(virq);
            }
            None => {
                error!(
                    "zevio: {:?} line {} (hwirq {}) has no mapping, masking it",
                    bank, line, hwirq
                );
                self.disable_line(bank, line);
            }
        }

        self.ack_bank(bank);
        true
    }

    /// Acknowledge and restore the bank's previous priority
    fn ack_bank(&self, bank: Bank) {
        let base = bank.offset();
        let prev_priority = self.regs.read32(base + IO_ACK);
        self.regs.write32(base + IO_PRIORITY_RESET, prev_priority);
    }

    /// Chip-level acknowledge for one line, outside the exception loop
    pub fn ack_line_chip_level(&self, hwirq: u32) {
        match Bank::from_hwirq(hwirq) {
            Some((bank, _)) => self.ack_bank(bank),
            None => warn!("zevio: ack of invalid hwirq {}", hwirq),
        }
    }
}

impl<W: RegisterWindow + Send + Sync + 'static> IrqChip for ZevioIntc<W> {
    fn name(&self) -> &'static str {
        "zevio_irq"
    }

    fn ack(&self, hwirq: u32) {
        self.ack_line_chip_level(hwirq);
    }

    fn mask(&self, hwirq: u32) {
        if let Some((bank, line)) = Bank::from_hwirq(hwirq) {
            self.disable_line(bank, line);
        }
    }

    fn unmask(&self, hwirq: u32) {
        if let Some((bank, line)) = Bank::from_hwirq(hwirq) {
            self.enable_line(bank, line);
        }
    }
}
