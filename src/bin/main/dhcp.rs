//! Minimal DHCP responder for clients joining the access point.
//!
//! The stack serves a fixed /24 with the appliance at .1, so this only has
//! to hand out a handful of pool addresses and answer renewals. Runs as a
//! sibling future and never touches application state.

use embassy_net::{
    IpAddress, Ipv4Address, Stack,
    udp::{PacketMetadata, UdpSocket},
};
use embassy_time::{Duration, Instant, Timer};
use heapless::Vec;
use log::{debug, info, warn};

const SERVER_PORT: u16 = 67;
const CLIENT_PORT: u16 = 68;
const MAGIC_COOKIE: [u8; 4] = [99, 130, 83, 99];

const LEASE_SECONDS: u32 = 7_200;
const POOL_SIZE: u8 = 8;
const MAX_LEASES: usize = 8;
const FRAME_BYTES: usize = 768;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MessageKind {
    Discover,
    Request,
    Decline,
    Release,
    Other(u8),
}

/// The parts of a BOOTREQUEST this responder acts on.
struct RequestView {
    kind: MessageKind,
    transaction_id: u32,
    flags: u16,
    hardware: [u8; 2],
    client_mac: [u8; 6],
    client_ip: Option<Ipv4Address>,
    requested_ip: Option<Ipv4Address>,
    server_id: Option<Ipv4Address>,
}

fn read_ipv4(data: &[u8]) -> Ipv4Address {
    Ipv4Address::new(data[0], data[1], data[2], data[3])
}

fn parse_request(frame: &[u8]) -> Option<RequestView> {
    // Fixed BOOTP header plus the magic cookie.
    if frame.len() < 240 || frame[0] != 1 {
        return None;
    }
    let hardware = [frame[1], frame[2]];
    if hardware != [1, 6] {
        // Ethernet with 6-byte MACs only.
        return None;
    }
    if frame[236..240] != MAGIC_COOKIE {
        return None;
    }

    let transaction_id = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
    let flags = u16::from_be_bytes([frame[10], frame[11]]);
    let ciaddr = read_ipv4(&frame[12..16]);
    let mut client_mac = [0u8; 6];
    client_mac.copy_from_slice(&frame[28..34]);

    let mut kind = None;
    let mut requested_ip = None;
    let mut server_id = None;
    let mut idx = 240;
    while idx < frame.len() {
        let code = frame[idx];
        idx += 1;
        match code {
            0 => continue,
            255 => break,
            _ => {
                let len = *frame.get(idx)? as usize;
                idx += 1;
                let data = frame.get(idx..idx + len)?;
                match code {
                    50 if len == 4 => requested_ip = Some(read_ipv4(data)),
                    53 if len == 1 => {
                        kind = Some(match data[0] {
                            1 => MessageKind::Discover,
                            3 => MessageKind::Request,
                            4 => MessageKind::Decline,
                            7 => MessageKind::Release,
                            other => MessageKind::Other(other),
                        });
                    }
                    54 if len == 4 => server_id = Some(read_ipv4(data)),
                    _ => {}
                }
                idx += len;
            }
        }
    }

    Some(RequestView {
        kind: kind?,
        transaction_id,
        flags,
        hardware,
        client_mac,
        client_ip: (ciaddr != Ipv4Address::UNSPECIFIED).then_some(ciaddr),
        requested_ip,
        server_id,
    })
}

struct Lease {
    mac: [u8; 6],
    ip: Ipv4Address,
    expires_at: Instant,
}

/// Pool of addresses directly above the server address.
struct LeaseTable {
    pool_start: Ipv4Address,
    leases: Vec<Lease, MAX_LEASES>,
}

impl LeaseTable {
    fn new(server_ip: Ipv4Address) -> Self {
        Self {
            pool_start: offset_ipv4(server_ip, 1),
            leases: Vec::new(),
        }
    }

    fn in_pool(&self, ip: Ipv4Address) -> bool {
        let start = u32::from_be_bytes(self.pool_start.octets());
        let value = u32::from_be_bytes(ip.octets());
        value >= start && value < start + POOL_SIZE as u32
    }

    /// Existing lease for the MAC, the address the client asked for, or the
    /// first free pool slot, in that order.
    fn assign(&mut self, mac: [u8; 6], wanted: Option<Ipv4Address>) -> Option<Ipv4Address> {
        let now = Instant::now();
        self.leases.retain(|lease| lease.expires_at > now);
        let expires_at = now + Duration::from_secs(LEASE_SECONDS as u64);

        let wanted = wanted
            .filter(|ip| self.in_pool(*ip))
            .filter(|ip| self.leases.iter().all(|l| l.mac == mac || l.ip != *ip));

        if let Some(existing) = self.leases.iter_mut().find(|l| l.mac == mac) {
            if let Some(ip) = wanted {
                existing.ip = ip;
            }
            existing.expires_at = expires_at;
            return Some(existing.ip);
        }

        let ip = {
            let taken = &self.leases;
            wanted
                .into_iter()
                .chain(
                    (0..POOL_SIZE)
                        .map(|i| offset_ipv4(self.pool_start, i))
                        .filter(|ip| taken.iter().all(|l| l.ip != *ip)),
                )
                .next()?
        };
        self.leases
            .push(Lease {
                mac,
                ip,
                expires_at,
            })
            .ok()?;
        Some(ip)
    }

    fn forget(&mut self, mac: [u8; 6]) {
        self.leases.retain(|lease| lease.mac != mac);
    }
}

fn offset_ipv4(base: Ipv4Address, offset: u8) -> Ipv4Address {
    let raw = u32::from_be_bytes(base.octets()).saturating_add(offset as u32);
    let octets = raw.to_be_bytes();
    Ipv4Address::new(octets[0], octets[1], octets[2], octets[3])
}

fn put_option(dest: &mut [u8], code: u8, payload: &[u8]) -> Option<usize> {
    let needed = payload.len() + 2;
    if dest.len() < needed {
        return None;
    }
    dest[0] = code;
    dest[1] = payload.len() as u8;
    dest[2..needed].copy_from_slice(payload);
    Some(needed)
}

fn build_reply(
    scratch: &mut [u8],
    request: &RequestView,
    offered_ip: Ipv4Address,
    server_ip: Ipv4Address,
    netmask: Ipv4Address,
    kind_code: u8,
) -> Option<usize> {
    if scratch.len() < 300 {
        return None;
    }
    scratch.fill(0);
    scratch[0] = 2; // BOOTREPLY
    scratch[1] = request.hardware[0];
    scratch[2] = request.hardware[1];
    scratch[4..8].copy_from_slice(&request.transaction_id.to_be_bytes());
    scratch[10..12].copy_from_slice(&request.flags.to_be_bytes());
    scratch[16..20].copy_from_slice(&offered_ip.octets());
    scratch[20..24].copy_from_slice(&server_ip.octets());
    scratch[28..34].copy_from_slice(&request.client_mac);
    scratch[236..240].copy_from_slice(&MAGIC_COOKIE);

    let server = server_ip.octets();
    let broadcast = {
        let raw = u32::from_be_bytes(server) | !u32::from_be_bytes(netmask.octets());
        raw.to_be_bytes()
    };

    let mut idx = 240;
    idx += put_option(&mut scratch[idx..], 53, &[kind_code])?;
    idx += put_option(&mut scratch[idx..], 54, &server)?;
    idx += put_option(&mut scratch[idx..], 51, &LEASE_SECONDS.to_be_bytes())?;
    idx += put_option(&mut scratch[idx..], 58, &(LEASE_SECONDS / 2).to_be_bytes())?;
    idx += put_option(&mut scratch[idx..], 59, &(LEASE_SECONDS / 8 * 7).to_be_bytes())?;
    idx += put_option(&mut scratch[idx..], 1, &netmask.octets())?;
    idx += put_option(&mut scratch[idx..], 3, &server)?;
    idx += put_option(&mut scratch[idx..], 6, &server)?;
    idx += put_option(&mut scratch[idx..], 28, &broadcast)?;
    scratch[idx] = 255;
    Some(idx + 1)
}

/// Answers DISCOVER/REQUEST on port 67 until the device powers off.
pub async fn serve(stack: Stack<'_>) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; FRAME_BYTES];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; FRAME_BYTES];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    let (server_ip, netmask) = match stack.config_v4() {
        Some(config) => (config.address.address(), config.address.netmask()),
        None => {
            // Static configuration is installed before this future runs.
            warn!("dhcp: no ipv4 config on the ap interface");
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    if let Err(err) = socket.bind(SERVER_PORT) {
        warn!("dhcp: bind failed: {:?}", err);
        loop {
            Timer::after_secs(1).await;
        }
    }
    info!("dhcp: {} pool addresses above {}", POOL_SIZE, server_ip);

    let mut table = LeaseTable::new(server_ip);
    let mut frame = [0u8; FRAME_BYTES];
    let mut reply = [0u8; FRAME_BYTES];

    loop {
        let (len, remote) = match socket.recv_from(&mut frame).await {
            Ok(received) => received,
            Err(err) => {
                warn!("dhcp: recv failed: {:?}", err);
                continue;
            }
        };
        let Some(request) = parse_request(&frame[..len]) else {
            debug!("dhcp: ignoring malformed frame from {:?}", remote);
            continue;
        };

        // A REQUEST committed to another server is none of our business.
        if request.kind == MessageKind::Request
            && request.server_id.is_some_and(|id| id != server_ip)
        {
            continue;
        }

        let (offer, kind_code) = match request.kind {
            MessageKind::Discover => (
                table.assign(request.client_mac, request.requested_ip),
                2, // OFFER
            ),
            MessageKind::Request => (
                table.assign(
                    request.client_mac,
                    request.requested_ip.or(request.client_ip),
                ),
                5, // ACK
            ),
            MessageKind::Decline | MessageKind::Release => {
                table.forget(request.client_mac);
                continue;
            }
            MessageKind::Other(_) => continue,
        };
        let Some(offer_ip) = offer else {
            warn!("dhcp: pool exhausted");
            continue;
        };

        let Some(reply_len) = build_reply(
            &mut reply,
            &request,
            offer_ip,
            server_ip,
            netmask,
            kind_code,
        ) else {
            continue;
        };

        // Clients without an address yet only hear broadcasts.
        match socket
            .send_to(
                &reply[..reply_len],
                (IpAddress::Ipv4(Ipv4Address::BROADCAST), CLIENT_PORT),
            )
            .await
        {
            Ok(()) => debug!("dhcp: leased {} to {:02x?}", offer_ip, request.client_mac),
            Err(err) => warn!("dhcp: send failed: {:?}", err),
        }
    }
}
