//! Interrupt dispatch by hardware unit
//!
//! Each board wires its UART interrupt vectors to an [`InterruptTable`]:
//!
//! ```ignore
//! static PORT0: SerialPort<Usart, 128, 128> = SerialPort::new(USART0);
//! static IRQS: InterruptTable<4> = InterruptTable::new();
//!
//! fn init() {
//!     PORT0.setup(&SerialConfig::default())?;
//!     IRQS.register(0, &PORT0)?;
//! }
//!
//! // USART0_RX vector
//! fn usart0_rx() {
//!     IRQS.dispatch(0, InterruptSource::Receive);
//! }
//! ```
//!
//! Ports are bound at runtime by the composition root, so the driver needs
//! no global instances of its own.

use core::cell::Cell;

use critical_section::Mutex;
use tether_hal::{Relax, UartPeripheral};

use crate::serial::SerialPort;

/// The two interrupt handlers of a serial port
pub trait SerialInterrupts: Sync {
    /// A byte was received
    fn on_receive(&self);
    /// The transmitter is ready for the next byte
    fn on_transmit(&self);
}

impl<P, const RX: usize, const TX: usize, W> SerialInterrupts for SerialPort<P, RX, TX, W>
where
    P: UartPeripheral + Sync,
    W: Relax,
{
    fn on_receive(&self) {
        SerialPort::on_receive(self);
    }

    fn on_transmit(&self) {
        SerialPort::on_transmit(self);
    }
}

/// Which interrupt fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptSource {
    Receive,
    Transmit,
}

/// Errors registering a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Unit number is not below the table size
    UnitOutOfRange,
    /// Another port is registered for the unit
    AlreadyRegistered,
}

type Slot = Cell<Option<&'static dyn SerialInterrupts>>;

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: Slot = Cell::new(None);

/// Serial ports indexed by hardware unit number
pub struct InterruptTable<const UNITS: usize> {
    slots: Mutex<[Slot; UNITS]>,
}

impl<const UNITS: usize> Default for InterruptTable<UNITS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const UNITS: usize> InterruptTable<UNITS> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new([EMPTY_SLOT; UNITS]),
        }
    }

    /// Bind `port` to `unit`
    pub fn register(
        &self,
        unit: usize,
        port: &'static dyn SerialInterrupts,
    ) -> Result<(), RegisterError> {
        critical_section::with(|cs| {
            let slot = self
                .slots
                .borrow(cs)
                .get(unit)
                .ok_or(RegisterError::UnitOutOfRange)?;
            if slot.get().is_some() {
                return Err(RegisterError::AlreadyRegistered);
            }
            slot.set(Some(port));
            Ok(())
        })?;
        debug!("interrupt table: unit {} registered", unit);
        Ok(())
    }

    /// Unbind `unit`, returning the port that was registered
    pub fn unregister(&self, unit: usize) -> Option<&'static dyn SerialInterrupts> {
        critical_section::with(|cs| self.slots.borrow(cs).get(unit).and_then(Slot::take))
    }

    pub fn is_registered(&self, unit: usize) -> bool {
        self.lookup(unit).is_some()
    }

    fn lookup(&self, unit: usize) -> Option<&'static dyn SerialInterrupts> {
        critical_section::with(|cs| self.slots.borrow(cs).get(unit).and_then(Slot::get))
    }

    /// Run the handler for `source` of the port bound to `unit`
    ///
    /// Returns `false` if no port is bound.
    pub fn dispatch(&self, unit: usize, source: InterruptSource) -> bool {
        let Some(port) = self.lookup(unit) else {
            return false;
        };
        match source {
            InterruptSource::Receive => port.on_receive(),
            InterruptSource::Transmit => port.on_transmit(),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::SerialConfig;
    use tether_hal::sim::SimUart;

    type Port = SerialPort<SimUart, 8, 8>;

    fn setup(port: &Port) {
        port.setup(&SerialConfig::new(9600).with_buffers(8, 8))
            .unwrap();
    }

    #[test]
    fn test_dispatch_routes_by_unit() {
        static PORT0: Port = Port::new(SimUart::new());
        static PORT1: Port = Port::new(SimUart::new());
        static TABLE: InterruptTable<2> = InterruptTable::new();
        setup(&PORT0);
        setup(&PORT1);
        TABLE.register(0, &PORT0).unwrap();
        TABLE.register(1, &PORT1).unwrap();

        PORT1.peripheral().inject(0x42);
        assert!(TABLE.dispatch(1, InterruptSource::Receive));
        assert_eq!(PORT1.try_get_byte(), Some(0x42));
        assert!(PORT0.receive_buffer_empty());

        PORT0.send_bytes(&[1, 2]);
        assert!(TABLE.dispatch(0, InterruptSource::Transmit));
        assert_eq!(PORT0.peripheral().wire().as_slice(), &[1, 2]);
        assert!(TABLE.dispatch(0, InterruptSource::Transmit));
        assert!(!PORT0.is_transmitting());
        assert!(PORT1.peripheral().wire().is_empty());
    }

    #[test]
    fn test_register_errors() {
        static PORT: Port = Port::new(SimUart::new());
        static OTHER: Port = Port::new(SimUart::new());
        let table = InterruptTable::<2>::new();

        assert_eq!(table.register(2, &PORT), Err(RegisterError::UnitOutOfRange));
        assert_eq!(table.register(0, &PORT), Ok(()));
        assert_eq!(
            table.register(0, &OTHER),
            Err(RegisterError::AlreadyRegistered)
        );
        assert!(table.is_registered(0));
        assert!(!table.is_registered(1));
    }

    #[test]
    fn test_dispatch_to_empty_slot() {
        let table = InterruptTable::<4>::new();
        assert!(!table.dispatch(0, InterruptSource::Receive));
        assert!(!table.dispatch(9, InterruptSource::Transmit));
    }

    #[test]
    fn test_unregister() {
        static PORT: Port = Port::new(SimUart::new());
        setup(&PORT);
        let table = InterruptTable::<1>::new();
        table.register(0, &PORT).unwrap();

        assert!(table.unregister(0).is_some());
        assert!(table.unregister(0).is_none());
        assert!(table.unregister(5).is_none());

        PORT.peripheral().inject(1);
        assert!(!table.dispatch(0, InterruptSource::Receive));
        assert!(PORT.receive_buffer_empty());

        assert_eq!(table.register(0, &PORT), Ok(()));
    }
}
