use std::{io, net::Ipv4Addr, time::Duration};

use pnet::datalink::{self, Channel, DataLinkReceiver, MacAddr, NetworkInterface};
use pnet::packet::arp::{ArpHardwareTypes, ArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::Packet;

use crate::error::{Error, OpenError, Result};

/// Sender fields of one ARP frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpFrame {
    pub sender_hw_addr: MacAddr,
    pub sender_proto_addr: Ipv4Addr,
}

/// Source of ARP frames for one interface.
pub trait Capture: Send {
    /// Blocks for the next frame.
    ///
    /// `Ok(None)` means the read timed out or the frame was not Ethernet/IPv4
    /// ARP; callers use it as a chance to check for shutdown. An error means
    /// the handle is unusable.
    fn receive(&mut self) -> Result<Option<ArpFrame>>;
}

/// An opened capture together with the interface it listens on.
pub struct CaptureHandle {
    pub interface: String,
    pub capture: Box<dyn Capture>,
}

pub struct PnetCapture {
    interface: String,
    rx: Box<dyn DataLinkReceiver>,
}

impl Capture for PnetCapture {
    fn receive(&mut self) -> Result<Option<ArpFrame>> {
        match self.rx.next() {
            Ok(packet) => Ok(parse_arp_frame(packet)),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => Ok(None),
            Err(e) => Err(Error::Capture { interface: self.interface.clone(), reason: e.to_string() }),
        }
    }
}

/// Extracts the sender of an Ethernet frame carrying an Ethernet/IPv4 ARP packet.
pub fn parse_arp_frame(packet: &[u8]) -> Option<ArpFrame> {
    let ethernet = EthernetPacket::new(packet)?;
    if ethernet.get_ethertype() != EtherTypes::Arp {
        return None;
    }
    let arp = ArpPacket::new(ethernet.payload())?;
    if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
        || arp.get_protocol_type() != EtherTypes::Ipv4
        || arp.get_hw_addr_len() != 6
        || arp.get_proto_addr_len() != 4
    {
        return None;
    }
    Some(ArpFrame { sender_hw_addr: arp.get_sender_hw_addr(), sender_proto_addr: arp.get_sender_proto_addr() })
}

/// Opens one capture per interface name.
///
/// Returns every handle that opened; the error, if any, lists each interface
/// that did not.
pub fn open_captures(names: &[String], read_timeout: Duration) -> (Vec<CaptureHandle>, Option<OpenError>) {
    let interfaces = datalink::interfaces();
    let mut handles = Vec::new();
    let mut failures = Vec::new();

    for name in names {
        match open_capture(&interfaces, name, read_timeout) {
            Ok(capture) => {
                log::debug!("opened capture on {}", name);
                handles.push(CaptureHandle { interface: name.clone(), capture: Box::new(capture) });
            }
            Err(e) => failures.push(e),
        }
    }

    let error = if failures.is_empty() { None } else { Some(OpenError { failures }) };
    (handles, error)
}

fn open_capture(interfaces: &[NetworkInterface], name: &str, read_timeout: Duration) -> Result<PnetCapture> {
    let interface = interfaces.iter().find(|iface| iface.name == name).ok_or_else(|| Error::Interface(name.to_string()))?;

    let config = datalink::Config { read_timeout: Some(read_timeout), ..Default::default() };
    match datalink::channel(interface, config) {
        Ok(Channel::Ethernet(_, rx)) => Ok(PnetCapture { interface: name.to_string(), rx }),
        Ok(_) => Err(Error::Capture { interface: name.to_string(), reason: "unhandled channel type".to_string() }),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied || e.raw_os_error() == Some(nix::libc::EPERM) => {
            Err(Error::Capability { interface: name.to_string(), binary: binary_name(), source: e })
        }
        Err(e) => Err(Error::Capture { interface: name.to_string(), reason: format!("unable to create channel: {}", e) }),
    }
}

fn binary_name() -> String {
    std::env::args().next().unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}
