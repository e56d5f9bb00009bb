//! Logical irq descriptors
//!
//! One descriptor per logical irq: which hardware line and chip it sits on,
//! how the line is driven around the handler (flow), and at most one bound
//! handler. Descriptors are created by domain mapping and live until the
//! table is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};

use super::{IrqChip, IrqDispatch, IrqReturn};
use crate::error::{Error, Result};

/// Handler bound to a logical irq. Receives the logical irq number.
pub type Handler = Box<dyn Fn(u32) -> IrqReturn + Send + Sync>;

/// Descriptor flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrqFlags(u8);

impl IrqFlags {
    /// Descriptor may be requested
    pub const VALID: IrqFlags = IrqFlags(1 << 0);
    /// Line may be autoprobed
    pub const PROBE: IrqFlags = IrqFlags(1 << 1);

    pub const fn empty() -> Self {
        IrqFlags(0)
    }

    pub const fn union(self, other: IrqFlags) -> Self {
        IrqFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: IrqFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// How the chip is driven around a handler invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowHandler {
    /// Mask while the handler runs, unmask afterwards
    Level,
    /// Call the handler with no chip interaction
    Simple,
}

/// Per-descriptor interrupt counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IrqStats {
    pub handled: u64,
    pub unhandled: u64,
}

struct IrqAction {
    name: &'static str,
    handler: Handler,
}

pub struct IrqDesc {
    hwirq: u32,
    chip: Arc<dyn IrqChip>,
    flow: FlowHandler,
    flags: IrqFlags,
    action: Option<IrqAction>,
    handled: AtomicU64,
    unhandled: AtomicU64,
}

impl IrqDesc {
    pub fn hwirq(&self) -> u32 {
        self.hwirq
    }

    pub fn chip_name(&self) -> &'static str {
        self.chip.name()
    }

    pub fn flow(&self) -> FlowHandler {
        self.flow
    }

    pub fn flags(&self) -> IrqFlags {
        self.flags
    }

    /// Name of the bound handler, if any
    pub fn action_name(&self) -> Option<&'static str> {
        self.action.as_ref().map(|a| a.name)
    }

    pub fn stats(&self) -> IrqStats {
        IrqStats {
            handled: self.handled.load(Ordering::Relaxed),
            unhandled: self.unhandled.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for IrqDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IrqDesc")
            .field("hwirq", &self.hwirq)
            .field("chip", &self.chip.name())
            .field("flow", &self.flow)
            .field("flags", &self.flags)
            .field("action", &self.action_name())
            .finish()
    }
}

/// Table of logical irq descriptors, indexed by logical irq number.
#[derive(Debug)]
pub struct IrqDescs {
    descs: Vec<Option<IrqDesc>>,
}

impl IrqDescs {
    /// Table with room for logical irqs `1..nr_irqs`
    pub fn new(nr_irqs: usize) -> Self {
        let mut descs = Vec::with_capacity(nr_irqs);
        descs.resize_with(nr_irqs, || None);
        Self { descs }
    }

    /// Allocate the lowest free logical irq for a hardware line
    pub fn alloc(
        &mut self,
        hwirq: u32,
        chip: Arc<dyn IrqChip>,
        flow: FlowHandler,
        flags: IrqFlags,
    ) -> Result<u32> {
        let virq = self
            .descs
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .map(|(virq, _)| virq)
            .ok_or(Error::DomainFull)?;

        self.descs[virq] = Some(IrqDesc {
            hwirq,
            chip,
            flow,
            flags,
            action: None,
            handled: AtomicU64::new(0),
            unhandled: AtomicU64::new(0),
        });
        Ok(virq as u32)
    }

    /// Drop the descriptor at `virq`, making the slot free for `alloc`
    pub(crate) fn release(&mut self, virq: u32) {
        if let Some(slot) = self.descs.get_mut(virq as usize) {
            *slot = None;
        }
    }

    pub fn desc(&self, virq: u32) -> Option<&IrqDesc> {
        self.descs.get(virq as usize)?.as_ref()
    }

    fn desc_mut(&mut self, virq: u32) -> Result<&mut IrqDesc> {
        self.descs
            .get_mut(virq as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::NotMapped(virq))
    }

    /// Bind `handler` to `virq` and unmask its line.
    pub fn request_irq<F>(&mut self, virq: u32, name: &'static str, handler: F) -> Result<()>
    where
        F: Fn(u32) -> IrqReturn + Send + Sync + 'static,
    {
        let desc = self.desc_mut(virq)?;
        if !desc.flags.contains(IrqFlags::VALID) {
            return Err(Error::NotMapped(virq));
        }
        if desc.action.is_some() {
            return Err(Error::AlreadyRequested(virq));
        }

        desc.action = Some(IrqAction {
            name,
            handler: Box::new(handler),
        });
        desc.chip.unmask(desc.hwirq);
        debug!("irq {} (hwirq {}) requested by {}", virq, desc.hwirq, name);
        Ok(())
    }

    /// Mask the line and drop its handler
    pub fn free_irq(&mut self, virq: u32) -> Result<()> {
        let desc = self.desc_mut(virq)?;
        let action = desc.action.take().ok_or(Error::NotRequested(virq))?;
        desc.chip.mask(desc.hwirq);
        debug!("irq {} (hwirq {}) freed by {}", virq, desc.hwirq, action.name);
        Ok(())
    }

    pub fn stats(&self, virq: u32) -> Option<IrqStats> {
        self.desc(virq).map(IrqDesc::stats)
    }
}

impl IrqDispatch for IrqDescs {
    fn dispatch(&self, virq: u32) -> IrqReturn {
        let desc = match self.desc(virq) {
            Some(desc) => desc,
            None => {
                warn!("dispatch of unknown irq {}", virq);
                return IrqReturn::None;
            }
        };

        let action = match &desc.action {
            Some(action) => action,
            None => {
                // Nobody to clear the source, keep the line quiet.
                warn!("irq {} (hwirq {}) fired with no handler", virq, desc.hwirq);
                desc.chip.mask(desc.hwirq);
                desc.unhandled.fetch_add(1, Ordering::Relaxed);
                return IrqReturn::None;
            }
        };

        trace!("irq {} -> {}", virq, action.name);
        let ret = match desc.flow {
            FlowHandler::Level => {
                desc.chip.mask(desc.hwirq);
                let ret = (action.handler)(virq);
                desc.chip.unmask(desc.hwirq);
                ret
            }
            FlowHandler::Simple => (action.handler)(virq),
        };

        match ret {
            IrqReturn::Handled => desc.handled.fetch_add(1, Ordering::Relaxed),
            IrqReturn::None => desc.unhandled.fetch_add(1, Ordering::Relaxed),
        };
        ret
    }
}
