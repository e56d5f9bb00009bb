//! Linear irq domain
//!
//! Reverse map from hardware line number to logical irq number. Entries are
//! atomics so the exception loop can look up mappings through a shared
//! reference while setup code is still adding lines.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// Marker for "no logical irq"
const UNMAPPED: u32 = 0;

#[derive(Debug)]
pub struct IrqDomain {
    revmap: Vec<AtomicU32>,
}

impl IrqDomain {
    /// Domain covering hardware lines `0..size`
    pub fn linear(size: u32) -> Self {
        Self {
            revmap: (0..size).map(|_| AtomicU32::new(UNMAPPED)).collect(),
        }
    }

    pub fn size(&self) -> u32 {
        self.revmap.len() as u32
    }

    /// Logical irq bound to `hwirq`, if any
    pub fn find_mapping(&self, hwirq: u32) -> Option<u32> {
        let virq = self.revmap.get(hwirq as usize)?.load(Ordering::Acquire);
        (virq != UNMAPPED).then_some(virq)
    }

    /// Bind `hwirq` to `virq`. A line is mapped at most once; mapping an
    /// already-mapped line returns the existing logical irq unchanged.
    pub fn associate(&self, hwirq: u32, virq: u32) -> Result<u32> {
        let slot = self
            .revmap
            .get(hwirq as usize)
            .ok_or(Error::InvalidHwIrq(hwirq))?;
        if virq == UNMAPPED {
            return Err(Error::NotMapped(virq));
        }
        match slot.compare_exchange(UNMAPPED, virq, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => Ok(virq),
            Err(existing) => Ok(existing),
        }
    }

    /// One-cell interrupt specifier: the cell is the hardware line number
    pub fn xlate_onecell(&self, intspec: &[u32]) -> Result<u32> {
        match intspec {
            [hwirq] if *hwirq < self.size() => Ok(*hwirq),
            [hwirq] => Err(Error::InvalidHwIrq(*hwirq)),
            _ => Err(Error::BadSpecifier(intspec.len())),
        }
    }

    /// Iterate over `(hwirq, virq)` for every mapped line
    pub fn mappings(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.revmap.iter().enumerate().filter_map(|(hwirq, slot)| {
            let virq = slot.load(Ordering::Acquire);
            (virq != UNMAPPED).then_some((hwirq as u32, virq))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_is_empty() {
        let domain = IrqDomain::linear(64);
        assert_eq!(domain.size(), 64);
        assert_eq!(domain.find_mapping(0), None);
        assert_eq!(domain.mappings().count(), 0);
    }

    #[test]
    fn test_associate_and_find() {
        let domain = IrqDomain::linear(64);
        assert_eq!(domain.associate(16, 3), Ok(3));
        assert_eq!(domain.find_mapping(16), Some(3));
        assert_eq!(domain.find_mapping(17), None);
    }

    #[test]
    fn test_associate_twice_keeps_first() {
        let domain = IrqDomain::linear(64);
        domain.associate(5, 1).unwrap();
        assert_eq!(domain.associate(5, 9), Ok(1));
        assert_eq!(domain.find_mapping(5), Some(1));
    }

    #[test]
    fn test_associate_out_of_range() {
        let domain = IrqDomain::linear(32);
        assert_eq!(domain.associate(32, 1), Err(Error::InvalidHwIrq(32)));
        assert_eq!(domain.find_mapping(40), None);
    }

    #[test]
    fn test_xlate_onecell() {
        let domain = IrqDomain::linear(64);
        assert_eq!(domain.xlate_onecell(&[16]), Ok(16));
        assert_eq!(domain.xlate_onecell(&[64]), Err(Error::InvalidHwIrq(64)));
        assert_eq!(domain.xlate_onecell(&[1, 2]), Err(Error::BadSpecifier(2)));
        assert_eq!(domain.xlate_onecell(&[]), Err(Error::BadSpecifier(0)));
    }

    #[test]
    fn test_mappings_iter() {
        let domain = IrqDomain::linear(64);
        domain.associate(1, 1).unwrap();
        domain.associate(40, 2).unwrap();
        let all: Vec<_> = domain.mappings().collect();
        assert_eq!(all, vec![(1, 1), (40, 2)]);
    }
}
