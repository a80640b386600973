//! Integration tests exercising the whole output path in software.
//!
//! The DMA engine is replaced by a mock channel and a loop that plays its
//! part: "transmit" a wire buffer by copying it out, raise the completion,
//! run the interrupt handler, then let the worker service the job.
//!
//! ```text
//! PcmSource → SpdifOutput::poll → PipelineContext → Worker → WireBuffers
//!     → [sent] → decode_stream
//! ```

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use crate::constants::{SAMPLE_CHUNK_SIZE, SUBFRAMES_PER_BLOCK};
    use crate::dispatch::Worker;
    use crate::encoder::decode::{decode_stream, Preamble, Subframe};
    use crate::error::PlaybackError;
    use crate::io::dma::mock::MockChannel;
    use crate::io::source::{PcmSource, Playback, SampleOrder};
    use crate::io::{Spdif, SpdifOutput};
    use crate::pipeline::Channel;

    /// Two chunks per buffer.
    const SMALL: usize = SAMPLE_CHUNK_SIZE * 2;
    /// Subframes of silence sent before the first PCM chunk.
    const PRIMING: usize = 2 * SAMPLE_CHUNK_SIZE / 2;

    type Rig = Spdif<MockChannel, SMALL>;
    type Output<'a, S> = SpdifOutput<'a, S, MockChannel, SMALL>;

    fn rig() -> Rig {
        Spdif::new(MockChannel::default(), MockChannel::default())
    }

    /// Little-endian samples 1, 2, 3, ... so silence is easy to tell apart.
    fn ramp(samples: usize) -> Vec<u8> {
        (1..=samples as u16).flat_map(u16::to_le_bytes).collect()
    }

    /// Play the DMA engine for up to `cycles` A+B rounds, polling the fill
    /// side `polls` times before each round. Returns every word sent.
    fn run<S: PcmSource>(
        rig: &Rig,
        out: &mut Output<'_, S>,
        worker: &Worker<'_, SMALL>,
        cycles: usize,
        polls: usize,
    ) -> Vec<u16> {
        let mut sent = Vec::new();
        for _ in 0..cycles {
            for _ in 0..polls {
                out.poll();
            }
            if !out.is_transmitting() {
                if !out.is_active() {
                    break;
                }
                continue;
            }
            for ch in Channel::ALL {
                sent.extend_from_slice(unsafe { rig.wire().get(ch) });
                rig.transmitter().channel(ch).complete();
                assert!(rig.on_dma_interrupt());
                worker.run_pending();
            }
        }
        sent
    }

    fn decode(sent: &[u16]) -> Vec<Subframe> {
        decode_stream(sent, false).collect()
    }

    fn samples(subframes: &[Subframe]) -> Vec<u16> {
        subframes.iter().map(Subframe::sample).collect()
    }

    fn assert_well_formed(subframes: &[Subframe]) {
        for (k, sf) in subframes.iter().enumerate() {
            let expected = if k % SUBFRAMES_PER_BLOCK as usize == 0 {
                Preamble::Z
            } else if k % 2 == 0 {
                Preamble::X
            } else {
                Preamble::Y
            };
            assert_eq!(sf.preamble, expected, "subframe {k}");
            assert!(sf.parity_even(), "subframe {k}");
        }
    }

    // ---------------------------------------------------------------
    // Full playback: silence priming, every sample once, clean drain
    // ---------------------------------------------------------------
    #[test]
    fn plays_a_range_end_to_end() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(3 * SMALL / 2);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();

        let sent = run(&rig, &mut out, &worker, 64, 1);
        assert!(!out.is_active(), "playback should finish on its own");
        assert!(!out.is_transmitting());
        assert_eq!(out.underruns(), 0);

        let subframes = decode(&sent);
        assert_well_formed(&subframes);
        assert_eq!(&sent[..4], &[0xE8CC, 0xCCCC, 0xCCCC, 0xCCCC]);

        let pcm = samples(&subframes);
        let n = data.len() / 2;
        assert!(pcm[..PRIMING].iter().all(|&s| s == 0));
        let expected: Vec<u16> = (1..=n as u16).collect();
        assert_eq!(&pcm[PRIMING..PRIMING + n], &expected[..]);
        assert!(pcm[PRIMING + n..].iter().all(|&s| s == 0));
    }

    #[test]
    fn offsets_select_the_range() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(4 * SMALL);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        // Samples 101..=612.
        out.start(&data[..], Playback::new(200, 1224)).unwrap();

        let pcm = samples(&decode(&run(&rig, &mut out, &worker, 64, 1)));
        assert!(!out.is_active());
        let audio: Vec<u16> = pcm.into_iter().filter(|&s| s != 0).collect();
        let expected: Vec<u16> = (101..=612).collect();
        assert_eq!(audio, expected);
    }

    #[test]
    fn big_endian_source_is_swapped() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data: Vec<u8> = (1..=SMALL as u16).flat_map(u16::to_be_bytes).collect();
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        let playback =
            Playback::new(0, data.len() as u64).with_order(SampleOrder::BigEndian);
        out.start(&data[..], playback).unwrap();

        let pcm = samples(&decode(&run(&rig, &mut out, &worker, 64, 1)));
        let expected: Vec<u16> = (1..=SMALL as u16).collect();
        assert_eq!(&pcm[PRIMING..PRIMING + SMALL], &expected[..]);
    }

    #[test]
    fn short_source_is_padded_and_finishes() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(100);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();

        let subframes = decode(&run(&rig, &mut out, &worker, 64, 1));
        assert!(!out.is_active());
        assert_well_formed(&subframes);
        let pcm = samples(&subframes);
        let expected: Vec<u16> = (1..=100).collect();
        assert_eq!(&pcm[PRIMING..PRIMING + 100], &expected[..]);
        assert!(pcm[PRIMING + 100..].iter().all(|&s| s == 0));
    }

    #[test]
    fn repeating_range_loops_until_stopped() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(300);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, 600).repeating()).unwrap();

        let sent = run(&rig, &mut out, &worker, 12, 1);
        assert!(out.is_active());
        assert_eq!(out.underruns(), 0);

        let pcm = samples(&decode(&sent));
        for (i, &s) in pcm[PRIMING..].iter().enumerate() {
            assert_eq!(s, (i % 300) as u16 + 1, "sample {i}");
        }

        assert!(out.stop().is_some());
        assert!(!out.is_active());
        assert!(!out.is_transmitting());
        assert!(rig.pipeline().all_stale());
    }

    // ---------------------------------------------------------------
    // Restart: stop-then-start behaves exactly like a cold start
    // ---------------------------------------------------------------
    #[test]
    fn restart_matches_cold_start() {
        let data = ramp(2 * SMALL);
        let playback = Playback::new(0, data.len() as u64);

        let cold = {
            let rig = rig();
            let worker = unsafe { rig.worker() };
            let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
            out.setup();
            out.start(&data[..], playback).unwrap();
            run(&rig, &mut out, &worker, 64, 1)
        };

        let rig = rig();
        let worker = unsafe { rig.worker() };
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], playback.repeating()).unwrap();
        run(&rig, &mut out, &worker, 3, 1);
        out.pause();
        run(&rig, &mut out, &worker, 1, 1);
        assert!(out.is_transmitting());

        // Restart mid-stream, paused, with the encoder somewhere in a block.
        out.start(&data[..], playback).unwrap();
        assert!(!out.is_paused());
        assert!(!out.is_transmitting());
        let warm = run(&rig, &mut out, &worker, 64, 1);

        assert_eq!(warm, cold);
    }

    #[test]
    fn stop_returns_the_source() {
        let rig = rig();
        let data = ramp(16);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        assert!(out.stop().is_none());
        out.start(&data[..], Playback::new(0, 32)).unwrap();
        let source = out.stop().unwrap();
        assert_eq!(source.len(), 32);
        assert_eq!(out.position(), None);
    }

    #[test]
    fn invalid_range_is_rejected_without_side_effects() {
        let rig = rig();
        let data = ramp(16);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.start(&data[..], Playback::new(0, 32)).unwrap();
        assert_eq!(
            out.start(&data[..], Playback::new(3, 9)),
            Err(PlaybackError::Misaligned)
        );
        assert_eq!(out.position(), Some(0));
    }

    // ---------------------------------------------------------------
    // Pause keeps the wire alive without consuming audio
    // ---------------------------------------------------------------
    #[test]
    fn pause_inserts_silence_and_resume_continues() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(4 * SMALL);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();

        let mut sent = run(&rig, &mut out, &worker, 3, 1);
        out.pause();
        assert!(out.is_paused());
        sent.extend(run(&rig, &mut out, &worker, 2, 1));
        out.resume();
        sent.extend(run(&rig, &mut out, &worker, 64, 1));
        assert!(!out.is_active());
        assert_eq!(out.underruns(), 0);

        let subframes = decode(&sent);
        assert_well_formed(&subframes);
        let pcm = samples(&subframes);
        let audio: Vec<u16> = pcm.iter().copied().filter(|&s| s != 0).collect();
        let expected: Vec<u16> = (1..=(data.len() / 2) as u16).collect();
        assert_eq!(audio, expected);

        let first = pcm.iter().position(|&s| s != 0).unwrap();
        let last = pcm.iter().rposition(|&s| s != 0).unwrap();
        let gap = pcm[first..=last].iter().filter(|&&s| s == 0).count();
        assert_eq!(gap, 4 * SAMPLE_CHUNK_SIZE / 2);
    }

    // ---------------------------------------------------------------
    // Missed deadline: the chain comes back to a channel before the
    // worker has re-encoded it, and the old words go out again
    // ---------------------------------------------------------------
    #[test]
    fn late_encode_job_replays_stale_wire() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(4 * SMALL);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();
        run(&rig, &mut out, &worker, 4, 1);
        assert!(out.is_transmitting());

        // A finishes; its job is queued but the worker does not get to it
        // before B and then A go out again.
        let first: Vec<u16> = unsafe { rig.wire().get(Channel::A) }.to_vec();
        rig.transmitter().channel(Channel::A).complete();
        assert!(rig.on_dma_interrupt());
        assert_eq!(rig.dispatcher().in_flight(), 1);

        let _b: Vec<u16> = unsafe { rig.wire().get(Channel::B) }.to_vec();
        let replay: Vec<u16> = unsafe { rig.wire().get(Channel::A) }.to_vec();
        assert_eq!(replay, first);

        // Nothing reports it: no error, no underrun, the chain stays armed.
        assert_eq!(out.underruns(), 0);
        assert!(out.is_transmitting());
        assert!(out.is_active());

        // The late job lands and the stream carries on to the end.
        assert_eq!(worker.run_pending(), 1);
        assert_ne!(unsafe { rig.wire().get(Channel::A) }.as_slice(), &first[..]);
        run(&rig, &mut out, &worker, 64, 1);
        assert!(!out.is_active());
        assert_eq!(out.underruns(), 0);
    }

    // ---------------------------------------------------------------
    // Starved fill side: the encoder finds no Ready buffer, leaves the
    // wire buffer as it was and counts an underrun
    // ---------------------------------------------------------------
    #[test]
    fn starved_fill_side_replays_stale_wire() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let data = ramp(8 * SMALL);
        let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
        out.setup();
        out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();
        run(&rig, &mut out, &worker, 3, 1);
        assert!(out.is_transmitting());

        // Stop polling: both buffers drain, then every job underruns.
        run(&rig, &mut out, &worker, 2, 0);
        assert!(rig.pipeline().all_stale());
        let before: Vec<u16> = unsafe { rig.wire().get(Channel::A) }.to_vec();
        rig.transmitter().channel(Channel::A).complete();
        rig.on_dma_interrupt();
        worker.run_pending();
        assert_eq!(unsafe { rig.wire().get(Channel::A) }.as_slice(), &before[..]);
        assert!(out.underruns() > 0);

        // Polling again picks the stream up where it left off.
        let before = out.position().unwrap();
        run(&rig, &mut out, &worker, 2, 1);
        assert!(out.position().unwrap() > before);
        assert!(out.is_transmitting());
        out.stop();
    }

    // ---------------------------------------------------------------
    // Read errors leave buffers Stale and are retried
    // ---------------------------------------------------------------
    struct Broken;

    impl PcmSource for Broken {
        type Error = ();

        fn read_at(&mut self, _offset: u64, _buf: &mut [u8]) -> Result<usize, ()> {
            Err(())
        }
    }

    #[test]
    fn failing_source_never_starts_transmission() {
        let rig = rig();
        let worker = unsafe { rig.worker() };
        let mut out: Output<'_, Broken> = SpdifOutput::new(&rig);
        out.setup();
        out.start(Broken, Playback::new(0, 4096)).unwrap();

        let sent = run(&rig, &mut out, &worker, 8, 2);
        assert!(sent.is_empty());
        assert!(out.is_active());
        assert!(!out.is_transmitting());
        assert!(rig.pipeline().all_stale());
        assert_eq!(out.position(), Some(0));
    }

    // ---------------------------------------------------------------
    // Real threads: worker on its own "core"
    // ---------------------------------------------------------------
    #[test]
    fn threaded_worker_plays_everything() {
        use core::sync::atomic::{AtomicBool, Ordering};

        let rig = rig();
        let data = ramp(3 * SMALL);
        let done = AtomicBool::new(false);

        let sent = std::thread::scope(|s| {
            s.spawn(|| {
                let worker = unsafe { rig.worker() };
                worker.run_while(|| !done.load(Ordering::Acquire));
            });

            let mut out: Output<'_, &[u8]> = SpdifOutput::new(&rig);
            out.setup();
            out.start(&data[..], Playback::new(0, data.len() as u64)).unwrap();

            let mut sent = Vec::new();
            while out.is_active() {
                out.poll();
                if !out.is_transmitting() {
                    continue;
                }
                for ch in Channel::ALL {
                    // Transmission of this buffer can only begin once its
                    // previous job is done.
                    rig.dispatcher().wait_idle();
                    sent.extend_from_slice(unsafe { rig.wire().get(ch) });
                    rig.transmitter().channel(ch).complete();
                    rig.on_dma_interrupt();
                    // Give the worker time to catch up before the next poll.
                    rig.dispatcher().wait_idle();
                    out.poll();
                }
            }
            done.store(true, Ordering::Release);
            sent
        });

        let pcm = samples(&decode(&sent));
        let expected: Vec<u16> = (1..=(data.len() / 2) as u16).collect();
        assert_eq!(&pcm[PRIMING..PRIMING + expected.len()], &expected[..]);
    }
}
