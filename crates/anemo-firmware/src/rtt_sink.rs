//! Report output over RTT
//!
//! The text line goes to the print channel next to the log output; the
//! COBS-framed postcard record goes to a dedicated up channel for host tools.

use anemo_core::report::{MAX_FRAME_LEN, ReportRecord, ReportSink};
use log::warn;
use rtt_target::{UpChannel, rprintln};

pub struct RttReportSink {
    frames: UpChannel,
}

impl RttReportSink {
    pub fn new(frames: UpChannel) -> Self {
        Self { frames }
    }
}

impl ReportSink for RttReportSink {
    fn emit(&mut self, record: &ReportRecord) {
        rprintln!("{}", record);

        let mut buf = [0u8; MAX_FRAME_LEN];
        match record.encode_frame(&mut buf) {
            Ok(frame) => {
                let written = self.frames.write(frame);
                if written < frame.len() {
                    warn!("Report frame truncated: {}/{} bytes", written, frame.len());
                }
            }
            Err(e) => warn!("Failed to encode report frame: {:?}", e),
        }
    }
}
