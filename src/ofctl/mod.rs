/*!
Version adapters between typed requests and OpenFlow messages

Each supported protocol version has one stateless adapter implementing
`Ofctl`. An adapter states what it can do as a `Capabilities` set, which
callers check before dispatching, and it translates requests into wire
messages and accumulated replies into JSON. Adapters never do I/O.
*/

mod oxm;
pub mod v1_0;
pub mod v1_2;
pub mod v1_3;

use crate::openflow::messages::serialize::OfpPacket;
use crate::openflow::messages::*;
use crate::request::{EntryCommand, Experimenter, FlowCommand, FlowEntry, GroupEntry};
use crate::request::{MeterEntry, PortConfig, StatsFilter};

use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use serde_json::Value;

use std::error;
use std::fmt;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::result;

bitflags! {
    /// The operations an adapter supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const DESC_STATS = 1 << 0;
        const FLOW_STATS = 1 << 1;
        const AGGREGATE_FLOW_STATS = 1 << 2;
        const PORT_STATS = 1 << 3;
        const QUEUE_STATS = 1 << 4;
        const METER_FEATURES = 1 << 5;
        const METER_CONFIG = 1 << 6;
        const METER_STATS = 1 << 7;
        const GROUP_FEATURES = 1 << 8;
        const GROUP_DESC = 1 << 9;
        const GROUP_STATS = 1 << 10;
        const PORT_DESC = 1 << 11;
        const MOD_FLOW_ENTRY = 1 << 12;
        const MOD_METER_ENTRY = 1 << 13;
        const MOD_GROUP_ENTRY = 1 << 14;
        const MOD_PORT_BEHAVIOR = 1 << 15;
        const SEND_EXPERIMENTER = 1 << 16;
    }
}

/// The statistics that can be queried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    Desc,
    Flow,
    AggregateFlow,
    Port,
    Queue,
    MeterFeatures,
    MeterConfig,
    Meter,
    GroupFeatures,
    GroupDesc,
    Group,
    PortDesc,
}

impl StatsKind {
    const ALL: [StatsKind; 12] = [
        StatsKind::Desc,
        StatsKind::Flow,
        StatsKind::AggregateFlow,
        StatsKind::Port,
        StatsKind::Queue,
        StatsKind::MeterFeatures,
        StatsKind::MeterConfig,
        StatsKind::Meter,
        StatsKind::GroupFeatures,
        StatsKind::GroupDesc,
        StatsKind::Group,
        StatsKind::PortDesc,
    ];

    /// The path segment under `/stats/`
    pub fn path(self) -> &'static str {
        match self {
            StatsKind::Desc => "desc",
            StatsKind::Flow => "flow",
            StatsKind::AggregateFlow => "aggregateflow",
            StatsKind::Port => "port",
            StatsKind::Queue => "queue",
            StatsKind::MeterFeatures => "meterfeatures",
            StatsKind::MeterConfig => "meterconfig",
            StatsKind::Meter => "meter",
            StatsKind::GroupFeatures => "groupfeatures",
            StatsKind::GroupDesc => "groupdesc",
            StatsKind::Group => "group",
            StatsKind::PortDesc => "portdesc",
        }
    }

    /// Looks up a kind by its path segment
    pub fn from_path(path: &str) -> Option<StatsKind> {
        Self::ALL.iter().cloned().find(|k| k.path() == path)
    }

    /// The capability needed to query this kind
    pub fn capability(self) -> Capabilities {
        match self {
            StatsKind::Desc => Capabilities::DESC_STATS,
            StatsKind::Flow => Capabilities::FLOW_STATS,
            StatsKind::AggregateFlow => Capabilities::AGGREGATE_FLOW_STATS,
            StatsKind::Port => Capabilities::PORT_STATS,
            StatsKind::Queue => Capabilities::QUEUE_STATS,
            StatsKind::MeterFeatures => Capabilities::METER_FEATURES,
            StatsKind::MeterConfig => Capabilities::METER_CONFIG,
            StatsKind::Meter => Capabilities::METER_STATS,
            StatsKind::GroupFeatures => Capabilities::GROUP_FEATURES,
            StatsKind::GroupDesc => Capabilities::GROUP_DESC,
            StatsKind::Group => Capabilities::GROUP_STATS,
            StatsKind::PortDesc => Capabilities::PORT_DESC,
        }
    }
}

/// A reply message that completes or continues a pending request
#[derive(Debug)]
pub enum Reply {
    Stats(OfpStatsReply),
    Features(OfpSwitchFeatures),
}

#[derive(Debug)]
pub enum Error {
    /// The request cannot be expressed in this protocol version
    Malformed(String),
    /// The adapter lacks the capability
    NotSupported(Capabilities),
    /// No adapter is registered for the version
    UnsupportedVersion(u8),
    /// A reply ended prematurely or has inconsistent lengths
    BadReply(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Malformed(ref s) => write!(f, "Malformed request: {}", s),
            Error::NotSupported(cap) => write!(f, "Operation {:?} is not supported", cap),
            Error::UnsupportedVersion(v) => write!(f, "OpenFlow version {:#x} is not supported", v),
            Error::BadReply(ref e) => write!(f, "Malformed reply: {}", e),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "Version adapter error"
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::BadReply(e)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// A version adapter
pub trait Ofctl: Send + Sync {
    /// The wire version this adapter speaks
    fn version(&self) -> u8;

    /// The supported operations
    fn capabilities(&self) -> Capabilities;

    /// Whether all operations in `cap` are supported
    fn supports(&self, cap: Capabilities) -> bool {
        self.capabilities().contains(cap)
    }

    /// The reply flag bit that announces further fragments
    fn reply_more_flag(&self) -> u16;

    /// Builds the request message for a stats query
    fn stats_request(&self, kind: StatsKind, filter: &StatsFilter, xid: u32) -> Result<Vec<u8>>;

    /// Renders all replies of a completed stats query
    fn render(&self, kind: StatsKind, replies: &[Reply]) -> Result<Value>;

    /// Builds a flow mod
    fn flow_mod(&self, cmd: FlowCommand, entry: &FlowEntry, xid: u32) -> Result<Vec<u8>>;

    /// Builds a port mod. `port` is the switch's current description of the port.
    fn port_mod(&self, config: &PortConfig, port: &OfpPort, xid: u32) -> Result<Vec<u8>>;

    /// Builds a meter mod
    fn meter_mod(&self, _cmd: EntryCommand, _entry: &MeterEntry, _xid: u32) -> Result<Vec<u8>> {
        Err(Error::NotSupported(Capabilities::MOD_METER_ENTRY))
    }

    /// Builds a group mod
    fn group_mod(&self, _cmd: EntryCommand, _entry: &GroupEntry, _xid: u32) -> Result<Vec<u8>> {
        Err(Error::NotSupported(Capabilities::MOD_GROUP_ENTRY))
    }

    /// Builds an experimenter message
    fn experimenter(&self, _exp: &Experimenter, _xid: u32) -> Result<Vec<u8>> {
        Err(Error::NotSupported(Capabilities::SEND_EXPERIMENTER))
    }
}

/// The immutable mapping from protocol version to adapter
pub struct Registry {
    adapters: Vec<Box<dyn Ofctl>>,
}

impl Registry {
    /// A registry with adapters for OpenFlow 1.0, 1.2 and 1.3
    pub fn new() -> Registry {
        Registry {
            adapters: vec![
                Box::new(v1_0::Ofctl10),
                Box::new(v1_2::Ofctl12),
                Box::new(v1_3::Ofctl13),
            ],
        }
    }

    /// Finds the adapter of a version
    pub fn resolve(&self, version: u8) -> Result<&dyn Ofctl> {
        self.adapters
            .iter()
            .find(|a| a.version() == version)
            .map(|a| a.as_ref())
            .ok_or(Error::UnsupportedVersion(version))
    }
}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let versions: Vec<u8> = self.adapters.iter().map(|a| a.version()).collect();
        write!(f, "Registry {{ versions: {:?} }}", versions)
    }
}

/* Helpers shared by the adapters */

fn encode<P: OfpPacket>(packet: &P, version: u8, xid: u32) -> Result<Vec<u8>> {
    trace!("Encoding {:?} with xid {}", P::typ(), xid);
    packet
        .to_bytes(version, xid)
        .map_err(|e| Error::Malformed(e.to_string()))
}

fn stats_request(version: u8, typ: OfpStatsType, body: Vec<u8>, xid: u32) -> Result<Vec<u8>> {
    encode(&OfpStatsRequest::new(typ, body), version, xid)
}

fn truncated(what: &str) -> Error {
    Error::BadReply(io::Error::new(io::ErrorKind::UnexpectedEof, format!("truncated {}", what)))
}

/// The concatenated bodies of all stats replies of the given type
fn bodies<'a>(replies: &'a [Reply], typ: OfpStatsType) -> impl Iterator<Item = &'a [u8]> {
    replies.iter().filter_map(move |r| match *r {
        Reply::Stats(ref s) if s.stats_type() == typ as u16 => Some(s.body()),
        _ => None,
    })
}

/// Splits a body into records of a fixed size
fn fixed_records<'a>(body: &'a [u8], size: usize, what: &str) -> Result<std::slice::Chunks<'a, u8>> {
    if body.len() % size != 0 {
        return Err(truncated(what));
    }
    Ok(body.chunks(size))
}

/// Splits a body into records that carry their own 16 bit length at `offset`
fn sized_records<'a>(body: &'a [u8], offset: usize, min: usize, what: &str) -> Result<Vec<&'a [u8]>> {
    let mut records = vec![];
    let mut rest = body;
    while !rest.is_empty() {
        if rest.len() < min {
            return Err(truncated(what));
        }
        let len = NetworkEndian::read_u16(&rest[offset..offset + 2]) as usize;
        if len < min || len > rest.len() {
            return Err(truncated(what));
        }
        records.push(&rest[..len]);
        rest = &rest[len..];
    }
    Ok(records)
}

fn desc_json(replies: &[Reply]) -> Result<Value> {
    use crate::openflow::messages::deserialize::read_fixed_str;
    let body = bodies(replies, OfpStatsType::Desc)
        .next()
        .ok_or_else(|| truncated("description"))?;
    let mut stream = io::Cursor::new(body);
    Ok(json!({
        "mfr_desc": read_fixed_str(&mut stream, 256)?,
        "hw_desc": read_fixed_str(&mut stream, 256)?,
        "sw_desc": read_fixed_str(&mut stream, 256)?,
        "serial_num": read_fixed_str(&mut stream, 32)?,
        "dp_desc": read_fixed_str(&mut stream, 256)?,
    }))
}

fn aggregate_json(replies: &[Reply]) -> Result<Value> {
    let mut stats = vec![];
    for body in bodies(replies, OfpStatsType::Aggregate) {
        for rec in fixed_records(body, 24, "aggregate stats")? {
            stats.push(json!({
                "packet_count": NetworkEndian::read_u64(&rec[0..8]),
                "byte_count": NetworkEndian::read_u64(&rec[8..16]),
                "flow_count": NetworkEndian::read_u32(&rec[16..20]),
            }));
        }
    }
    Ok(Value::Array(stats))
}

fn port_json(port: &OfpPort, version: u8) -> Value {
    let mut value = json!({
        "port_no": port_no_json(port.port_no),
        "hw_addr": mac_str(&port.hw_addr),
        "name": port.name,
        "config": port.config,
        "state": port.state,
        "curr": port.curr,
        "advertised": port.advertised,
        "supported": port.supported,
        "peer": port.peer,
    });
    if version != OFP_VERSION_1_0 {
        value["curr_speed"] = json!(port.curr_speed);
        value["max_speed"] = json!(port.max_speed);
    }
    value
}

fn features_ports_json(replies: &[Reply], version: u8) -> Value {
    let ports = replies
        .iter()
        .filter_map(|r| match *r {
            Reply::Features(ref f) => Some(&f.ports),
            _ => None,
        })
        .flat_map(|ports| ports.iter().map(|p| port_json(p, version)))
        .collect();
    Value::Array(ports)
}

/// The names of the bits set in `bitmap`
fn bit_names(bitmap: u32, names: &[(u8, &str)]) -> Value {
    let list = names
        .iter()
        .filter(|&&(bit, _)| bitmap & (1 << bit) != 0)
        .map(|&(_, name)| json!(name))
        .collect();
    Value::Array(list)
}

/// A port number, reserved ports by name
fn port_no_json(port: u32) -> Value {
    match crate::request::port_name(port) {
        Some(name) => json!(name),
        None => json!(port),
    }
}

/// A port number as it appears inside action strings
fn port_str(port: u32) -> String {
    match crate::request::port_name(port) {
        Some(name) => name.to_owned(),
        None => port.to_string(),
    }
}

fn mac_str(addr: &[u8]) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

fn ipv4_str(addr: &[u8]) -> String {
    Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3]).to_string()
}

fn ipv6_str(addr: &[u8]) -> String {
    let mut octets = [0; 16];
    octets.copy_from_slice(&addr[..16]);
    Ipv6Addr::from(octets).to_string()
}

fn uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// A stats reply as the connection layer decodes it
#[cfg(test)]
fn stats_reply(version: u8, typ: OfpStatsType, flags: u16, body: &[u8]) -> Reply {
    use crate::openflow::messages::deserialize::Deserialize;
    let mut bytes = vec![0, typ as u8, (flags >> 8) as u8, flags as u8];
    if version != OFP_VERSION_1_0 {
        bytes.extend_from_slice(&[0; 4]);
    }
    bytes.extend_from_slice(body);
    Reply::Stats(OfpStatsReply::deserialize(version, bytes).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_known_versions() {
        let registry = Registry::new();
        assert_eq!(OFP_VERSION_1_0, registry.resolve(OFP_VERSION_1_0).unwrap().version());
        assert_eq!(OFP_VERSION_1_2, registry.resolve(OFP_VERSION_1_2).unwrap().version());
        assert_eq!(OFP_VERSION_1_3, registry.resolve(OFP_VERSION_1_3).unwrap().version());
        for version in &[0u8, 2, 5, 6, 0xff] {
            match registry.resolve(*version) {
                Err(Error::UnsupportedVersion(v)) => assert_eq!(*version, v),
                other => panic!("unexpected {:?}", other.map(|a| a.version())),
            }
        }
    }

    #[test]
    fn capability_matrix() {
        let registry = Registry::new();
        let v10 = registry.resolve(OFP_VERSION_1_0).unwrap();
        let v12 = registry.resolve(OFP_VERSION_1_2).unwrap();
        let v13 = registry.resolve(OFP_VERSION_1_3).unwrap();

        assert!(v10.supports(Capabilities::PORT_DESC | Capabilities::MOD_PORT_BEHAVIOR));
        assert!(!v10.supports(Capabilities::GROUP_DESC));
        assert!(!v10.supports(Capabilities::SEND_EXPERIMENTER));
        assert!(v12.supports(Capabilities::GROUP_STATS | Capabilities::MOD_GROUP_ENTRY));
        assert!(!v12.supports(Capabilities::METER_FEATURES));
        assert!(!v12.supports(Capabilities::MOD_METER_ENTRY));
        assert_eq!(Capabilities::all(), v13.capabilities());
    }

    #[test]
    fn more_flags() {
        let registry = Registry::new();
        assert_eq!(OFPSF_REPLY_MORE, registry.resolve(OFP_VERSION_1_0).unwrap().reply_more_flag());
        assert_eq!(OFPSF_REPLY_MORE, registry.resolve(OFP_VERSION_1_2).unwrap().reply_more_flag());
        assert_eq!(OFPMPF_REPLY_MORE, registry.resolve(OFP_VERSION_1_3).unwrap().reply_more_flag());
    }

    #[test]
    fn stats_kind_paths() {
        for kind in StatsKind::ALL.iter() {
            assert_eq!(Some(*kind), StatsKind::from_path(kind.path()));
        }
        assert_eq!(None, StatsKind::from_path("switches"));
    }

    #[test]
    fn sized_records_split() {
        let body = [0, 4, 1, 2, 0, 6, 1, 2, 3, 4];
        let records = sized_records(&body, 0, 4, "test").unwrap();
        assert_eq!(vec![&body[0..4], &body[4..10]], records);
        assert!(sized_records(&body[..8], 0, 4, "test").is_err());
        assert!(sized_records(&[0, 2, 0, 0], 0, 4, "test").is_err());
    }

    #[test]
    fn formatting() {
        assert_eq!("00:11:22:aa:bb:cc", mac_str(&[0, 0x11, 0x22, 0xaa, 0xbb, 0xcc]));
        assert_eq!("10.0.0.1", ipv4_str(&[10, 0, 0, 1]));
        assert_eq!(0x0102_0304, uint(&[1, 2, 3, 4]));
        assert_eq!(json!("CONTROLLER"), port_no_json(0xffff_fffd));
        assert_eq!(json!(3), port_no_json(3));
    }
}
