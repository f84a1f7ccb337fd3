//! OSC scenarios (spec.md §6.4, §8): exercises the real UDP listener end to end, both addressing
//! schemes, against a scratch port per test to avoid collisions.

use rosc::{encoder, OscMessage as WireMessage, OscPacket, OscType};
use std::net::UdpSocket;
use std::time::Duration;
use wgsl_arcade::osc::{OscListener, OscTarget};

fn send(port: u16, addr: &str, value: f32) {
    let packet = OscPacket::Message(WireMessage { addr: addr.to_string(), args: vec![OscType::Float(value)] });
    let bytes = encoder::encode(&packet).unwrap();
    let sender = UdpSocket::bind("0.0.0.0:0").unwrap();
    sender.send_to(&bytes, ("127.0.0.1", port)).unwrap();
}

fn free_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

#[test]
fn name_addressed_update_is_delivered_by_name() {
    let port = free_port();
    let listener = OscListener::bind(port).unwrap();
    send(port, "/u/intensity", 0.5);

    let mut received = Vec::new();
    for _ in 0..20 {
        received.extend(listener.drain());
        if !received.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(received, vec![wgsl_arcade::osc::OscMessage { target: OscTarget::Name("intensity".into()), value: 0.5 }]);
}

#[test]
fn slot_addressed_update_is_delivered_by_index() {
    let port = free_port();
    let listener = OscListener::bind(port).unwrap();
    send(port, "/u/3", 0.25);

    let mut received = Vec::new();
    for _ in 0..20 {
        received.extend(listener.drain());
        if !received.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(received, vec![wgsl_arcade::osc::OscMessage { target: OscTarget::Slot(3), value: 0.25 }]);
}

#[test]
fn drain_is_empty_when_nothing_was_sent() {
    let port = free_port();
    let listener = OscListener::bind(port).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    assert!(listener.drain().is_empty());
}
