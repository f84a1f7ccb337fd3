//! OSC input (spec.md §6.4): a background UDP listener decoding Open Sound Control messages and
//! feeding parameter updates into the frame scheduler via a lock-free queue.

use std::net::UdpSocket;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::JoinHandle;

/// Two addressing schemes are accepted (spec.md §6.4): `/u/<name>` resolved against the
/// parameter names the preprocessor discovered, or `/u/<n>` writing directly to slot `n`.
#[derive(Debug, Clone, PartialEq)]
pub enum OscTarget {
    Name(String),
    Slot(usize),
}

/// One decoded OSC update. Anything outside the `/u/` namespace, or with a non-numeric first
/// argument, is silently dropped (spec.md §6.4).
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub target: OscTarget,
    pub value: f32,
}

/// Owns the background listener thread and the channel it feeds. Dropping this stops the
/// listener on the next socket timeout tick.
pub struct OscListener {
    rx: Receiver<OscMessage>,
    _handle: JoinHandle<()>,
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl OscListener {
    /// Binds a UDP socket on `port` and starts listening in the background. Binding failure is
    /// non-fatal to the rest of the program (spec.md §6.4: OSC is best-effort input) — the caller
    /// decides whether to log and continue or abort.
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_read_timeout(Some(std::time::Duration::from_millis(100)))?;
        let (tx, rx): (Sender<OscMessage>, Receiver<OscMessage>) = std::sync::mpsc::channel();
        let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let stop_thread = stop.clone();
        let handle = std::thread::spawn(move || listen_loop(socket, tx, stop_thread));
        Ok(Self { rx, _handle: handle, stop })
    }

    /// Drains every message received since the last call (spec.md §4.7 step 2: OSC is drained
    /// once at the start of each frame, before the host block is uploaded).
    pub fn drain(&self) -> Vec<OscMessage> {
        self.rx.try_iter().collect()
    }
}

impl Drop for OscListener {
    fn drop(&mut self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

fn listen_loop(socket: UdpSocket, tx: Sender<OscMessage>, stop: std::sync::Arc<std::sync::atomic::AtomicBool>) {
    let mut buf = [0u8; 4096];
    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
        match socket.recv(&mut buf) {
            Ok(n) => {
                if let Some(msg) = decode_packet(&buf[..n]) {
                    if tx.send(msg).is_err() {
                        return;
                    }
                }
            }
            Err(e) if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                log::warn!("OSC socket error: {e}");
                return;
            }
        }
    }
}

/// Decodes a single OSC packet into an [`OscMessage`], accepting only `/u/<name>` addresses with
/// a single float32 argument; everything else (bundles, other addresses, wrong arg types) is
/// silently dropped (spec.md §6.4).
fn decode_packet(bytes: &[u8]) -> Option<OscMessage> {
    let packet = rosc::decoder::decode_udp(bytes).ok()?.1;
    match packet {
        rosc::OscPacket::Message(msg) => message_to_update(msg),
        rosc::OscPacket::Bundle(bundle) => {
            bundle.content.into_iter().find_map(|p| match p {
                rosc::OscPacket::Message(msg) => message_to_update(msg),
                _ => None,
            })
        }
    }
}

fn message_to_update(msg: rosc::OscMessage) -> Option<OscMessage> {
    let suffix = msg.addr.strip_prefix("/u/")?;
    if suffix.is_empty() {
        return None;
    }
    let target = match suffix.parse::<usize>() {
        Ok(n) if n < crate::manifest::MAX_OSC_PARAMS => OscTarget::Slot(n),
        Ok(_) => return None,
        Err(_) => OscTarget::Name(suffix.to_string()),
    };
    let value = msg.args.first().and_then(|arg| match arg {
        rosc::OscType::Float(f) => Some(*f),
        rosc::OscType::Double(d) => Some(*d as f32),
        rosc::OscType::Int(i) => Some(*i as f32),
        _ => None,
    })?;
    Some(OscMessage { target, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_valid_float_message() {
        let msg = rosc::OscMessage {
            addr: "/u/bass".to_string(),
            args: vec![rosc::OscType::Float(0.75)],
        };
        let packet = rosc::OscPacket::Message(msg);
        let bytes = rosc::encoder::encode(&packet).unwrap();
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, OscMessage { target: OscTarget::Name("bass".to_string()), value: 0.75 });
    }

    #[test]
    fn numeric_address_resolves_directly_to_a_slot() {
        let msg = rosc::OscMessage {
            addr: "/u/5".to_string(),
            args: vec![rosc::OscType::Float(0.25)],
        };
        let packet = rosc::OscPacket::Message(msg);
        let bytes = rosc::encoder::encode(&packet).unwrap();
        let decoded = decode_packet(&bytes).unwrap();
        assert_eq!(decoded, OscMessage { target: OscTarget::Slot(5), value: 0.25 });
    }

    #[test]
    fn numeric_address_past_the_slot_range_is_dropped() {
        let msg = rosc::OscMessage {
            addr: "/u/64".to_string(),
            args: vec![rosc::OscType::Float(0.25)],
        };
        let packet = rosc::OscPacket::Message(msg);
        let bytes = rosc::encoder::encode(&packet).unwrap();
        assert!(decode_packet(&bytes).is_none());
    }

    #[test]
    fn ignores_addresses_outside_the_u_namespace() {
        let msg = rosc::OscMessage {
            addr: "/other/thing".to_string(),
            args: vec![rosc::OscType::Float(1.0)],
        };
        let packet = rosc::OscPacket::Message(msg);
        let bytes = rosc::encoder::encode(&packet).unwrap();
        assert!(decode_packet(&bytes).is_none());
    }

    #[test]
    fn ignores_non_numeric_arguments() {
        let msg = rosc::OscMessage {
            addr: "/u/label".to_string(),
            args: vec![rosc::OscType::String("hi".to_string())],
        };
        let packet = rosc::OscPacket::Message(msg);
        let bytes = rosc::encoder::encode(&packet).unwrap();
        assert!(decode_packet(&bytes).is_none());
    }
}
