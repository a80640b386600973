//! Sine tone over S/PDIF, the simplest possible output example.
//!
//! Generates a 440 Hz tone on both channels and sends it out of a single
//! GPIO as a consumer S/PDIF stream. Feed the pin through a 330 Ω / 100 Ω
//! divider into a coax input, or drive a TOSLINK transmitter directly.
//!
//! Hardware: Raspberry Pi Pico (RP2040)
//!
//! Data path:
//! ```text
//!   ToneSource ──poll (core 0)──► PCM A/B ──Worker (core 1)──► wire A/B
//!       ──DMA 6 ⇄ DMA 7──► SPI1 TX ──► GP11
//! ```
//!
//! Pins:
//!   GP11: SPI1_TX (S/PDIF out)    GP10: SPI1_SCK (unused, left unconnected)

#![no_std]
#![no_main]
#![allow(static_mut_refs)] // core 1 stack handed over once in init

use defmt_rtt as _;
use panic_probe as _;

use core::convert::Infallible;
use core::sync::atomic::{AtomicU32, Ordering};

use rp_pico::hal::pac;
use spdif_audio::constants::SAMPLE_RATE;
use spdif_audio::io::{PcmSource, Spdif, TransferChannel};

// ── DMA channel on raw registers ─────────────────────────────────────

/// DREQ number for SPI1 transmit.
const TREQ_SPI1_TX: u32 = 18;

const CTRL_EN: u32 = 1 << 0;
const CTRL_DATA_SIZE_HALFWORD: u32 = 1 << 2;
const CTRL_INCR_READ: u32 = 1 << 4;
const CTRL_CHAIN_TO_SHIFT: u32 = 11;
const CTRL_TREQ_SEL_SHIFT: u32 = 15;

/// One RP2040 DMA channel, chained to a fixed partner, raising DMA_IRQ_0.
pub struct RpChannel {
    ch: u8,
    partner: u8,
    base: AtomicU32,
}

impl RpChannel {
    pub const fn new(ch: u8, partner: u8) -> Self {
        RpChannel {
            ch,
            partner,
            base: AtomicU32::new(0),
        }
    }

    fn mask(&self) -> u32 {
        1 << self.ch
    }

    fn dma() -> &'static pac::dma::RegisterBlock {
        // SAFETY: Only this driver touches channels 6 and 7 and the IRQ 0
        // bits for them; every access below is a single register write.
        unsafe { &*pac::DMA::ptr() }
    }
}

impl TransferChannel for RpChannel {
    fn configure(&self, words: *const u16, len: usize) {
        let dma = Self::dma();
        let ch = dma.ch(self.ch as usize);
        // SAFETY: SPI1 is a fixed peripheral address.
        let txdr = unsafe { (*pac::SPI1::ptr()).sspdr().as_ptr() } as u32;

        self.base.store(words as u32, Ordering::Relaxed);
        let ctrl = CTRL_EN
            | CTRL_DATA_SIZE_HALFWORD
            | CTRL_INCR_READ
            | (u32::from(self.partner) << CTRL_CHAIN_TO_SHIFT)
            | (TREQ_SPI1_TX << CTRL_TREQ_SEL_SHIFT);

        // SAFETY: Raw register values for a channel nothing else uses.
        unsafe {
            ch.ch_read_addr().write(|w| w.bits(words as u32));
            ch.ch_write_addr().write(|w| w.bits(txdr));
            ch.ch_trans_count().write(|w| w.bits(len as u32));
            // Non-triggering alias: armed, waiting for the chain or a trigger.
            ch.ch_al1_ctrl().write(|w| w.bits(ctrl));
            dma.inte0().modify(|r, w| w.bits(r.bits() | self.mask()));
        }
    }

    fn rearm(&self) {
        let ch = Self::dma().ch(self.ch as usize);
        // Transfer count reloads by itself on the next trigger.
        // SAFETY: Plain address write to our own channel.
        unsafe {
            ch.ch_read_addr()
                .write(|w| w.bits(self.base.load(Ordering::Relaxed)));
        }
    }

    fn trigger(&self) {
        // SAFETY: Write-one-to-trigger register.
        unsafe {
            Self::dma()
                .multi_chan_trigger()
                .write(|w| w.bits(self.mask()));
        }
    }

    fn abort(&self) {
        let dma = Self::dma();
        // SAFETY: Write-one-to-abort register.
        unsafe { dma.chan_abort().write(|w| w.bits(self.mask())) };
        while dma.chan_abort().read().bits() & self.mask() != 0 {}
    }

    fn take_completion(&self) -> bool {
        let dma = Self::dma();
        if dma.ints0().read().bits() & self.mask() == 0 {
            return false;
        }
        // SAFETY: Write-one-to-clear register.
        unsafe { dma.ints0().write(|w| w.bits(self.mask())) };
        true
    }
}

static SPDIF: Spdif<RpChannel> = Spdif::new(RpChannel::new(6, 7), RpChannel::new(7, 6));

// ── Tone generator ───────────────────────────────────────────────────

const TONE_HZ: f32 = 440.0;
const AMPLITUDE: f32 = 0.5;
/// One second of stereo: 440 Hz fits a whole number of cycles, so it loops
/// without a click.
const TONE_BYTES: u64 = SAMPLE_RATE as u64 * 4;

/// Synthesises interleaved little-endian stereo on demand.
struct ToneSource;

impl PcmSource for ToneSource {
    type Error = Infallible;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Infallible> {
        for (i, pair) in buf.chunks_exact_mut(2).enumerate() {
            let frame = ((offset / 2 + i as u64) / 2) % u64::from(SAMPLE_RATE);
            let phase = 2.0 * core::f32::consts::PI * TONE_HZ * frame as f32 / SAMPLE_RATE as f32;
            let sample = (libm::sinf(phase) * AMPLITUDE * i16::MAX as f32) as i16;
            pair.copy_from_slice(&sample.to_le_bytes());
        }
        Ok(buf.len() & !1)
    }
}

#[rtic::app(device = rp_pico::hal::pac, peripherals = true, dispatchers = [TIMER_IRQ_1])]
mod app {
    use super::{ToneSource, RpChannel, SPDIF, TONE_BYTES};

    use rp_pico::hal::{
        self,
        clocks::init_clocks_and_plls,
        fugit::RateExtU32,
        gpio,
        multicore::{Multicore, Stack},
        pac,
        sio::Sio,
        watchdog::Watchdog,
        Clock,
    };

    use spdif_audio::constants::SERIAL_CLOCK_HZ;
    use spdif_audio::io::{Playback, SpdifOutput};

    type Output = SpdifOutput<'static, ToneSource, RpChannel>;

    // ── RTIC resources ───────────────────────────────────────────────

    #[local]
    struct Local {
        output: Output,
    }

    #[shared]
    struct Shared {}

    static mut CORE1_STACK: Stack<4096> = Stack::new();

    // ── Init ─────────────────────────────────────────────────────────

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let mut pac = cx.device;
        let mut watchdog = Watchdog::new(pac.WATCHDOG);
        let clocks = init_clocks_and_plls(
            rp_pico::XOSC_CRYSTAL_FREQ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok()
        .expect("clock init");

        let mut sio = Sio::new(pac.SIO);
        let pins = rp_pico::Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        // ── SPI1 as a 16-bit shifter at twice the biphase cell rate ─
        let tx = pins.gpio11.into_function::<gpio::FunctionSpi>();
        let sck = pins.gpio10.into_function::<gpio::FunctionSpi>();
        let spi = hal::Spi::<_, _, _, 16>::new(pac.SPI1, (tx, sck)).init(
            &mut pac.RESETS,
            clocks.peripheral_clock.freq(),
            SERIAL_CLOCK_HZ.Hz(),
            embedded_hal::spi::MODE_0,
        );
        // Keep the pins and the block configured for the life of the program.
        core::mem::forget(spi);

        // TI synchronous frames: no idle gap between words, and DMA paces TX.
        unsafe {
            let spi1 = &*pac::SPI1::ptr();
            spi1.sspcr1().modify(|_, w| w.sse().clear_bit());
            spi1.sspcr0().modify(|_, w| w.frf().bits(0b01));
            spi1.sspdmacr().modify(|_, w| w.txdmae().set_bit());
            spi1.sspcr1().modify(|_, w| w.sse().set_bit());
        }

        // ── DMA ─────────────────────────────────────────────────────
        pac.RESETS.reset().modify(|_, w| w.dma().clear_bit());
        while pac.RESETS.reset_done().read().dma().bit_is_clear() {}

        let mut output = Output::new(&SPDIF);
        output.setup();

        // ── Core 1: the encoder worker ──────────────────────────────
        let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
        let cores = mc.cores();
        cores[1]
            .spawn(unsafe { &mut CORE1_STACK.mem }, || {
                // SAFETY: The only worker for SPDIF, created once.
                let worker = unsafe { SPDIF.worker() };
                worker.run()
            })
            .expect("core 1 spawn");

        output
            .start(ToneSource, Playback::new(0, TONE_BYTES).repeating())
            .expect("tone range");
        defmt::info!("S/PDIF tone: {=f32} Hz", super::TONE_HZ);

        (Shared {}, Local { output })
    }

    // ── Fill loop ────────────────────────────────────────────────────

    #[idle(local = [output])]
    fn idle(cx: idle::Context) -> ! {
        let output = cx.local.output;
        let mut reported = 0;
        loop {
            output.poll();

            let underruns = output.underruns();
            if underruns != reported {
                defmt::warn!("underruns: {=u32}", underruns);
                reported = underruns;
            }
        }
    }

    // ── DMA completion: rearm and hand the refill to core 1 ──────────

    #[task(binds = DMA_IRQ_0, priority = 2)]
    fn dma_irq(_: dma_irq::Context) {
        SPDIF.on_dma_interrupt();
    }
}
