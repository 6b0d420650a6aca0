use std::{
    io,
    net::{Ipv6Addr, SocketAddrV6},
    os::fd::AsRawFd,
};

use anyhow::{Context, Result};
use log::debug;
use pingdraw_common::ICMP6_CHECKSUM_OFFSET;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

/// Something that can put a raw ICMPv6 message on the wire.
pub trait Transport {
    fn send_to(&self, packet: &[u8], dst: Ipv6Addr) -> io::Result<usize>;
}

/// Raw `IPPROTO_ICMPV6` socket. The kernel fills in the ICMPv6 checksum.
pub struct RawIcmpv6Socket {
    socket: Socket,
}

impl RawIcmpv6Socket {
    pub fn open() -> Result<Self> {
        let socket = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))
            .context("Failed to create raw ICMPv6 socket - are you running as root or with CAP_NET_RAW?")?;

        // Linux refuses IPV6_CHECKSUM on the IPPROTO_IPV6 level for ICMPv6 sockets, SOL_RAW is accepted.
        let offset = ICMP6_CHECKSUM_OFFSET as libc::c_int;
        let ret = unsafe {
            libc::setsockopt(
                socket.as_raw_fd(),
                libc::SOL_RAW,
                libc::IPV6_CHECKSUM,
                &offset as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret != 0 {
            return Err(io::Error::last_os_error())
                .context("Failed to enable checksum offload on ICMPv6 socket");
        }
        debug!("Opened raw ICMPv6 socket with checksum at offset {offset}");

        Ok(Self { socket })
    }
}

impl Transport for RawIcmpv6Socket {
    fn send_to(&self, packet: &[u8], dst: Ipv6Addr) -> io::Result<usize> {
        let dst = SockAddr::from(SocketAddrV6::new(dst, 0, 0, 0));
        self.socket.send_to(packet, &dst)
    }
}

#[cfg(test)]
pub mod testing {
    use std::{
        collections::VecDeque,
        io,
        net::Ipv6Addr,
        sync::Mutex,
    };

    use super::Transport;

    /// Records every packet and can be told to fail the next sends.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(Ipv6Addr, Vec<u8>)>>,
        pub failures: Mutex<VecDeque<io::ErrorKind>>,
        pub attempts: Mutex<usize>,
    }

    impl RecordingTransport {
        pub fn fail_next(&self, kinds: impl IntoIterator<Item = io::ErrorKind>) {
            self.failures.lock().unwrap().extend(kinds);
        }

        pub fn sent(&self) -> Vec<(Ipv6Addr, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    impl Transport for RecordingTransport {
        fn send_to(&self, packet: &[u8], dst: Ipv6Addr) -> io::Result<usize> {
            *self.attempts.lock().unwrap() += 1;
            if let Some(kind) = self.failures.lock().unwrap().pop_front() {
                return Err(io::Error::from(kind));
            }
            self.sent.lock().unwrap().push((dst, packet.to_vec()));
            Ok(packet.len())
        }
    }
}
