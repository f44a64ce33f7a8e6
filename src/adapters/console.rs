//! Console adapters.
//!
//! The stream lines go out on UART0, the same port the bootloader and the
//! logger print to.  Host tests supply their own `ConsolePort`.

#[cfg(feature = "espidf")]
pub use self::uart::UartConsole;

#[cfg(feature = "espidf")]
mod uart {
    use esp_idf_hal::uart::UartDriver;

    use crate::app::ports::ConsolePort;
    use crate::error::{Error, Result};

    /// Blocking writer over the ESP-IDF UART driver.
    pub struct UartConsole<'d> {
        uart: UartDriver<'d>,
    }

    impl<'d> UartConsole<'d> {
        pub fn new(uart: UartDriver<'d>) -> Self {
            Self { uart }
        }
    }

    impl ConsolePort for UartConsole<'_> {
        fn write_str(&mut self, text: &str) -> Result<()> {
            let mut bytes = text.as_bytes();
            while !bytes.is_empty() {
                let n = self.uart.write(bytes).map_err(|_| Error::Console)?;
                bytes = &bytes[n..];
            }
            Ok(())
        }
    }
}
