//! Single WS2812 status pixel.
//!
//! [`SmartPixel`] puts any `smart-leds` writer behind [`PixelPort`]. On
//! ESP-IDF the writer is `ws2812-esp32-rmt-driver` on one RMT channel,
//! which owns the GRB wire timing. Host tests plug in their own writer.

use core::fmt::Debug;

use log::debug;
use smart_leds::{RGB8, SmartLedsWrite};

use crate::app::ports::{PixelError, PixelPort};

/// `ESP_FAIL`. The writers report their own error types; the port carries
/// a code.
const WRITE_FAILED: i32 = -1;

/// One staged colour, shown on [`PixelPort::refresh`].
pub struct SmartPixel<W> {
    writer: W,
    staged: RGB8,
}

impl<W> SmartPixel<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            staged: RGB8::default(),
        }
    }

    pub fn staged(&self) -> RGB8 {
        self.staged
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

impl<W> PixelPort for SmartPixel<W>
where
    W: SmartLedsWrite<Color = RGB8>,
    W::Error: Debug,
{
    fn set_pixel(&mut self, r: u8, g: u8, b: u8) -> Result<(), PixelError> {
        self.staged = RGB8::new(r, g, b);
        Ok(())
    }

    fn refresh(&mut self) -> Result<(), PixelError> {
        self.writer
            .write(core::iter::once(self.staged))
            .map_err(|e| {
                debug!("pixel write failed: {:?}", e);
                PixelError(WRITE_FAILED)
            })
    }
}

#[cfg(target_os = "espidf")]
pub use esp_impl::{Ws2812, open_ws2812};

#[cfg(target_os = "espidf")]
mod esp_impl {
    use esp_idf_hal::gpio::OutputPin;
    use esp_idf_hal::peripheral::Peripheral;
    use esp_idf_hal::rmt::RmtChannel;
    use log::{error, info};
    use ws2812_esp32_rmt_driver::Ws2812Esp32Rmt;

    use super::{SmartPixel, WRITE_FAILED};
    use crate::error::PeripheralError;

    /// The board's status pixel.
    pub type Ws2812 = SmartPixel<Ws2812Esp32Rmt<'static>>;

    /// Claim `channel` and drive the pixel on `pin`.
    pub fn open_ws2812<C: RmtChannel>(
        channel: impl Peripheral<P = C> + 'static,
        pin: impl Peripheral<P = impl OutputPin> + 'static,
    ) -> Result<Ws2812, PeripheralError> {
        match Ws2812Esp32Rmt::new(channel, pin) {
            Ok(writer) => {
                info!("led_strip: WS2812 on RMT ready");
                Ok(SmartPixel::new(writer))
            }
            Err(e) => {
                error!("led_strip: RMT driver refused: {:?}", e);
                Err(PeripheralError::Rmt(WRITE_FAILED))
            }
        }
    }
}
