//! Blocking-wait strategies
//!
//! A blocking read polls the receive buffer and calls [`Relax::relax`]
//! between polls. Interrupts stay enabled throughout, so the receive handler
//! keeps filling the buffer while the foreground waits.

/// One iteration of a blocking wait
pub trait Relax {
    fn relax();
}

/// Busy-wait with a spin-loop hint
#[derive(Debug, Clone, Copy, Default)]
pub struct Spin;

impl Relax for Spin {
    #[inline]
    fn relax() {
        core::hint::spin_loop();
    }
}

/// Sleep until the next interrupt (Cortex-M `WFI`)
///
/// A byte that lands between the buffer check and the sleep is picked up
/// when the next interrupt of any source wakes the core, so this suits
/// boards with a periodic tick.
#[cfg(feature = "cortex-m")]
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitForInterrupt;

#[cfg(feature = "cortex-m")]
impl Relax for WaitForInterrupt {
    #[inline]
    fn relax() {
        cortex_m::asm::wfi();
    }
}
