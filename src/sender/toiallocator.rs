use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use rand::Rng;

use super::ToiMaxLength;
use crate::common::lct;
use crate::tools::uint128::Uint128;

#[derive(Debug)]
struct ToiAllocatorInternal {
    toi_reserved: HashSet<Uint128>,
    toi: Uint128,
    toi_max_length: ToiMaxLength,
}

/// Allocates unique, length-bounded TOIs, reserving 0 for the FDT.
#[derive(Debug)]
pub struct ToiAllocator {
    internal: Mutex<ToiAllocatorInternal>,
}

/// Handle on a reserved TOI.
///
/// The reservation is released when the handle is dropped, or transferred to
/// the FDT when the object carrying it is added.
#[derive(Debug)]
pub struct Toi {
    allocator: Arc<ToiAllocator>,
    value: Uint128,
}

impl Drop for Toi {
    fn drop(&mut self) {
        self.allocator.release(self.value);
    }
}

impl Toi {
    /// Value of the reserved TOI
    pub fn get(&self) -> Uint128 {
        self.value
    }
}

impl ToiAllocatorInternal {
    fn new(toi_max_length: ToiMaxLength, toi_initial_value: Option<Uint128>) -> Self {
        let mut toi = match toi_initial_value {
            Some(value) if value.is_zero() => Uint128::from(1),
            Some(value) => value,
            None => {
                let mut rng = rand::thread_rng();
                Uint128::new(rng.gen(), rng.gen())
            }
        };

        toi = toi.mask(toi_max_length.bits());
        if toi == lct::TOI_FDT {
            toi = toi.wrapping_add(1);
        }

        Self {
            toi_reserved: HashSet::new(),
            toi,
            toi_max_length,
        }
    }

    fn allocate(&mut self) -> Uint128 {
        let ret = self.toi;
        assert!(!self.toi_reserved.contains(&ret));
        self.toi_reserved.insert(ret);

        loop {
            self.toi = self.toi.wrapping_add(1).mask(self.toi_max_length.bits());
            if self.toi == lct::TOI_FDT {
                self.toi = Uint128::from(1);
            }

            if !self.toi_reserved.contains(&self.toi) {
                break;
            }

            log::warn!("TOI {} is already used by a file or reserved", self.toi)
        }
        ret
    }

    fn release(&mut self, toi: Uint128) {
        let success = self.toi_reserved.remove(&toi);
        debug_assert!(success);
    }
}

impl ToiAllocator {
    pub fn new(toi_max_length: ToiMaxLength, toi_initial_value: Option<Uint128>) -> Arc<Self> {
        Arc::new(Self {
            internal: Mutex::new(ToiAllocatorInternal::new(toi_max_length, toi_initial_value)),
        })
    }

    pub fn allocate(allocator: &Arc<Self>) -> Box<Toi> {
        let mut db = allocator.internal.lock().unwrap();
        let toi = db.allocate();
        Box::new(Toi {
            allocator: allocator.clone(),
            value: toi,
        })
    }

    pub fn allocate_toi_fdt(allocator: &Arc<Self>) -> Box<Toi> {
        Box::new(Toi {
            allocator: allocator.clone(),
            value: lct::TOI_FDT,
        })
    }

    pub fn release(&self, toi: Uint128) {
        if toi == lct::TOI_FDT {
            return;
        }
        let mut db = self.internal.lock().unwrap();
        db.release(toi);
    }

    #[cfg(test)]
    pub fn contains(&self, toi: &Uint128) -> bool {
        let db = self.internal.lock().unwrap();
        db.toi_reserved.contains(toi)
    }
}
