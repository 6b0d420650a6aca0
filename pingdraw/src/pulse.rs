use std::{
    io::{self, ErrorKind},
    net::Ipv6Addr,
    sync::atomic::{AtomicU16, Ordering},
};

use pingdraw_common::{
    ICMP6_CODE_OFFSET, ICMP6_ECHO_SEQUENCE, ICMP6_IDENTIFIER_OFFSET, ICMP6_SEQUENCE_OFFSET,
    ICMP6_TYPE_ECHO_REQUEST, ICMP6_TYPE_OFFSET, PULSE_LEN,
};

use crate::transport::Transport;

/// Echo request with the given identifier. The checksum stays zero, the
/// transport computes it.
pub fn build_pulse(identifier: u16) -> [u8; PULSE_LEN] {
    let mut packet = [0u8; PULSE_LEN];
    packet[ICMP6_TYPE_OFFSET] = ICMP6_TYPE_ECHO_REQUEST;
    packet[ICMP6_CODE_OFFSET] = 0;
    packet[ICMP6_IDENTIFIER_OFFSET..ICMP6_IDENTIFIER_OFFSET + 2]
        .copy_from_slice(&identifier.to_be_bytes());
    packet[ICMP6_SEQUENCE_OFFSET..ICMP6_SEQUENCE_OFFSET + 2]
        .copy_from_slice(&ICMP6_ECHO_SEQUENCE.to_be_bytes());
    packet
}

/// Fires echo requests at canvas addresses. Every pulse gets the next
/// identifier so the same pixel can be told apart across passes.
#[derive(Debug, Default)]
pub struct PulseSender {
    identifier: AtomicU16,
}

impl PulseSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send<T: Transport + ?Sized>(&self, transport: &T, dst: Ipv6Addr) -> io::Result<usize> {
        // fetch_add wraps on overflow
        let identifier = self.identifier.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let packet = build_pulse(identifier);

        loop {
            match transport.send_to(&packet, dst) {
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                result => return result,
            }
        }
    }
}
