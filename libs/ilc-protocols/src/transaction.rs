//! Bus transaction management.
//!
//! `BusTransactionManager` drives one full bus list through a
//! [`FifoTransport`]: register the expected responses, write the command
//! image, then collect and decode each touched subnet's response buffer
//! under a bounded wait. A missing or late subnet never blocks the cycle;
//! its channels surface through timeout accounting instead.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::buslist::BusList;
use crate::decoder::ResponseDecoder;
use crate::error::Result;
use crate::safety::SafetyReporter;
use crate::settings::IlcTimings;
use crate::telemetry::EventSink;
use crate::timestamp;

/// Command and response FIFO access, one implementation per backing
/// hardware or simulation.
pub trait FifoTransport {
    /// Writes a complete command image to the command FIFO.
    fn write_command(&mut self, words: &[u16]) -> Result<()>;

    /// Blocks until the subnet's receive interrupt fires or the timeout
    /// elapses.
    fn wait_for_subnet(&mut self, subnet: u8, timeout: Duration) -> Result<()>;

    /// Drains the subnet's response FIFO.
    fn read_response(&mut self, subnet: u8, timeout: Duration) -> Result<Vec<u16>>;
}

/// Runs bus lists against a transport and feeds responses to the decoder.
pub struct BusTransactionManager<T: FifoTransport> {
    transport: T,
    decoder: ResponseDecoder,
    timings: IlcTimings,
    broadcast_counter: u8,
    // held for the duration of each cycle; other threads hold it between
    // cycles to pause the bus
    cycle_barrier: Arc<Mutex<()>>,
}

impl<T: FifoTransport> BusTransactionManager<T> {
    pub fn new(transport: T, decoder: ResponseDecoder, timings: IlcTimings) -> Self {
        BusTransactionManager {
            transport,
            decoder,
            timings,
            broadcast_counter: 0,
            cycle_barrier: Arc::new(Mutex::new(())),
        }
    }

    /// Handle to the cycle barrier. Holding its lock keeps `run_cycle`
    /// from starting a transaction until released.
    pub fn cycle_barrier(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.cycle_barrier)
    }

    pub fn decoder(&self) -> &ResponseDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut ResponseDecoder {
        &mut self.decoder
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn broadcast_counter(&self) -> u8 {
        self.broadcast_counter
    }

    /// Advances the 4-bit broadcast counter and hands the new value to the
    /// decoder for echo checking. Call before building a list that carries
    /// broadcast frames.
    pub fn increment_broadcast_counter(&mut self) -> u8 {
        self.broadcast_counter = (self.broadcast_counter + 1) & 0x0F;
        self.decoder.set_broadcast_counter(self.broadcast_counter);
        self.broadcast_counter
    }

    /// Runs one bus list to completion: write, collect, decode, account.
    pub fn run_cycle(
        &mut self,
        list: &BusList,
        sink: &mut dyn EventSink,
        safety: &mut dyn SafetyReporter,
    ) -> Result<()> {
        let barrier = Arc::clone(&self.cycle_barrier);
        let _cycle = barrier.lock();

        self.decoder.expect_responses(list.expected_responses());
        self.transport.write_command(list.words())?;

        let wait = Duration::from_millis(self.timings.subnet_wait_ms);
        let fifo_timeout = Duration::from_millis(self.timings.fifo_timeout_ms);
        for &subnet in list.subnets() {
            match self.transport.wait_for_subnet(subnet, wait) {
                Ok(()) => {}
                Err(err) if err.is_timeout() => {
                    warn!(subnet, "subnet did not raise its receive interrupt");
                    continue;
                }
                Err(err) => return Err(err),
            }
            let words = match self.transport.read_response(subnet, fifo_timeout) {
                Ok(words) => words,
                Err(err) if err.is_timeout() => {
                    warn!(subnet, "response FIFO read timed out");
                    continue;
                }
                Err(err) => return Err(err),
            };
            debug!(subnet, words = words.len(), "decoding subnet response");
            let mut buffer = crate::wire::WireBuffer::from_words(&words)?;
            self.decoder.parse(&mut buffer, subnet, sink, safety);
        }

        self.decoder
            .verify_responses(timestamp::now_seconds(), sink, safety);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buslist;
    use crate::error::IlcError;
    use crate::requests::RequestEncoder;
    use crate::settings::{ForceActuatorSettings, ForceActuatorTableRow, ForceLimitRange,
        HardpointSettings, IlcTableRow};
    use crate::subnet::{DeviceType, Orientation, SubnetAddressMap};
    use crate::telemetry::NullEventSink;
    use crate::safety::NullSafetyReporter;

    /// Transport that answers no subnet at all.
    struct DeafTransport {
        commands: Vec<Vec<u16>>,
    }

    impl FifoTransport for DeafTransport {
        fn write_command(&mut self, words: &[u16]) -> Result<()> {
            self.commands.push(words.to_vec());
            Ok(())
        }
        fn wait_for_subnet(&mut self, subnet: u8, _timeout: Duration) -> Result<()> {
            Err(IlcError::timeout(format!("subnet {subnet}")))
        }
        fn read_response(&mut self, _subnet: u8, _timeout: Duration) -> Result<Vec<u16>> {
            unreachable!("wait never succeeds")
        }
    }

    fn test_decoder() -> ResponseDecoder {
        let map = SubnetAddressMap::new(
            &[ForceActuatorTableRow {
                actuator_id: 101,
                subnet: 1,
                address: 1,
                orientation: Orientation::None,
            }],
            &[IlcTableRow {
                actuator_id: 1,
                subnet: 5,
                address: 1,
            }],
            &[],
        )
        .unwrap();
        let settings = ForceActuatorSettings::uniform(
            1,
            0,
            ForceLimitRange {
                low: -1000.0,
                high: 1000.0,
            },
            100.0,
        );
        ResponseDecoder::new(map, settings, HardpointSettings::default()).unwrap()
    }

    #[test]
    fn test_unanswered_cycle_times_out_every_channel() {
        let decoder = test_decoder();
        let list = buslist::report_server_status_list(
            decoder.map(),
            RequestEncoder::new(IlcTimings::default()),
        )
        .unwrap();

        let transport = DeafTransport {
            commands: Vec::new(),
        };
        let mut manager =
            BusTransactionManager::new(transport, decoder, IlcTimings::default());
        manager
            .run_cycle(&list, &mut NullEventSink, &mut NullSafetyReporter)
            .unwrap();

        // command image went out once
        assert_eq!(manager.transport_mut().commands.len(), 1);
        // timeout accounting zeroed the roster
        let expected = manager.decoder().expected_responses();
        assert_eq!(expected.outstanding(DeviceType::ForceActuator, 0), 0);
        assert_eq!(expected.outstanding(DeviceType::HardpointActuator, 0), 0);
    }

    #[test]
    fn test_cycle_barrier_pauses_cycles() {
        let decoder = test_decoder();
        let list = buslist::report_server_status_list(
            decoder.map(),
            RequestEncoder::new(IlcTimings::default()),
        )
        .unwrap();
        let mut manager = BusTransactionManager::new(
            DeafTransport {
                commands: Vec::new(),
            },
            decoder,
            IlcTimings::default(),
        );

        let barrier = manager.cycle_barrier();
        let guard = barrier.lock();

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::scope(|scope| {
            let manager = &mut manager;
            let list = &list;
            scope.spawn(move || {
                manager
                    .run_cycle(list, &mut NullEventSink, &mut NullSafetyReporter)
                    .unwrap();
                done_tx.send(()).unwrap();
            });

            // cycle stays blocked while the barrier is held
            assert!(done_rx
                .recv_timeout(Duration::from_millis(50))
                .is_err());
            drop(guard);
            done_rx
                .recv_timeout(Duration::from_secs(5))
                .expect("cycle never ran after barrier release");
        });

        assert_eq!(manager.transport_mut().commands.len(), 1);
    }

    #[test]
    fn test_broadcast_counter_wraps() {
        let decoder = test_decoder();
        let transport = DeafTransport {
            commands: Vec::new(),
        };
        let mut manager =
            BusTransactionManager::new(transport, decoder, IlcTimings::default());
        for _ in 0..15 {
            manager.increment_broadcast_counter();
        }
        assert_eq!(manager.broadcast_counter(), 15);
        assert_eq!(manager.increment_broadcast_counter(), 0);
    }
}
