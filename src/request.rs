/*!
Typed request bodies of the administrative surface

Bodies are JSON objects. They are parsed once, before any switch is
contacted, so that unknown match fields, unknown action types and values
that do not fit their field end up as a `BadRequest` instead of failing
deep inside a version adapter.

Integers may be given as JSON numbers or as strings, either decimal or
hexadecimal with a `0x` prefix. Port numbers additionally accept the
reserved port names (`CONTROLLER`, `FLOOD`, ...).
*/

use base64::Engine;
use ipnetwork::{Ipv4Network, Ipv6Network};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::openflow::messages::OxmOfbMatchFields;

use std::convert::TryFrom;
use std::error;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug)]
pub enum Error {
    Json(serde_json::Error),
    InvalidDpid(String),
    InvalidData(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Json(ref e) => write!(f, "Invalid request body: {}", e),
            Error::InvalidDpid(ref s) => write!(f, "Invalid datapath id '{}'", s),
            Error::InvalidData(ref s) => write!(f, "Invalid experimenter data: {}", s),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "Request body error"
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Parses a JSON request body
pub fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(body)?)
}

/// Parses a JSON request body, an empty body yields the default value
pub fn parse_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(T::default())
    }
    else {
        parse(body)
    }
}

/// Parses a datapath id given as a path segment. Only ASCII digits are accepted.
pub fn parse_dpid(s: &str) -> Result<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidDpid(s.to_owned()));
    }
    s.parse().map_err(|_| Error::InvalidDpid(s.to_owned()))
}

fn parse_int_str(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        u64::from_str_radix(&s[2..], 16).ok()
    }
    else {
        s.parse().ok()
    }
}

fn int_from_value(value: &Value) -> Option<u64> {
    match *value {
        Value::Number(ref n) => n.as_u64(),
        Value::String(ref s) => parse_int_str(s),
        _ => None,
    }
}

/// An integer of any width that accepts JSON numbers and numeric strings
fn int<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Value::deserialize(deserializer)?;
    int_from_value(&value)
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| de::Error::custom(format!("invalid integer {}", value)))
}

fn opt_int<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    int(deserializer).map(Some)
}

/// Reserved port names and their 32 bit numbers
const PORT_NAMES: [(&str, u32); 8] = [
    ("IN_PORT", 0xffff_fff8),
    ("TABLE", 0xffff_fff9),
    ("NORMAL", 0xffff_fffa),
    ("FLOOD", 0xffff_fffb),
    ("ALL", 0xffff_fffc),
    ("CONTROLLER", 0xffff_fffd),
    ("LOCAL", 0xffff_fffe),
    ("ANY", 0xffff_ffff),
];

/// The name of a reserved port number
pub fn port_name(port: u32) -> Option<&'static str> {
    PORT_NAMES.iter().find(|&&(_, no)| no == port).map(|&(name, _)| name)
}

fn port_from_value(value: &Value) -> Option<u32> {
    if let Value::String(ref s) = *value {
        if let Some(&(_, no)) = PORT_NAMES.iter().find(|&&(name, _)| name == s.trim()) {
            return Some(no);
        }
    }
    int_from_value(value).and_then(|n| u32::try_from(n).ok())
}

fn port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    port_from_value(&value).ok_or_else(|| de::Error::custom(format!("invalid port {}", value)))
}

fn opt_port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<u32>, D::Error> {
    port(deserializer).map(Some)
}

/// A datapath id given as JSON number or digit string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Dpid(pub u64);

impl TryFrom<Value> for Dpid {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let dpid = match value {
            Value::Number(ref n) => n.as_u64(),
            Value::String(ref s) => parse_dpid(s).ok(),
            _ => None,
        };
        dpid.map(Dpid).ok_or_else(|| format!("invalid dpid {}", value))
    }
}

/// An Ethernet address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct MacAddr(pub [u8; 6]);

impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut addr = [0; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for byte in addr.iter_mut() {
            let part = parts.next().ok_or_else(|| format!("invalid MAC address '{}'", s))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| format!("invalid MAC address '{}'", s))?;
        }
        if parts.next().is_some() {
            return Err(format!("invalid MAC address '{}'", s));
        }
        Ok(MacAddr(addr))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let a = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

/// The value type of a match field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    /// An unsigned integer of the given bit width
    Int(u8),
    Mac,
    Ipv4,
    Ipv6,
}

impl Kind {
    /// Number of bytes on the wire
    pub fn width(self) -> usize {
        match self {
            Kind::Int(bits) => (bits as usize + 7) / 8,
            Kind::Mac => 6,
            Kind::Ipv4 => 4,
            Kind::Ipv6 => 16,
        }
    }
}

/// A match field as named in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// A field of the OpenFlow basic class
    Oxm(OxmOfbMatchFields),
    /// The 1.0 IP ToS byte, the DSCP shifted left by two
    NwTos,
    /// The 1.0 transport source port, TCP, UDP or SCTP depending on `ip_proto`
    TpSrc,
    /// The 1.0 transport destination port
    TpDst,
}

const FIELD_NAMES: [(&str, Field); 51] = {
    use self::Field::*;
    use crate::openflow::messages::OxmOfbMatchFields as F;
    [
        ("in_port", Oxm(F::InPort)),
        ("in_phy_port", Oxm(F::InPhyPort)),
        ("metadata", Oxm(F::Metadata)),
        ("eth_dst", Oxm(F::EthDst)),
        ("eth_src", Oxm(F::EthSrc)),
        ("eth_type", Oxm(F::EthType)),
        ("vlan_vid", Oxm(F::VlanVid)),
        ("vlan_pcp", Oxm(F::VlanPcp)),
        ("ip_dscp", Oxm(F::IpDscp)),
        ("ip_ecn", Oxm(F::IpEcn)),
        ("ip_proto", Oxm(F::IpProto)),
        ("ipv4_src", Oxm(F::Ipv4Src)),
        ("ipv4_dst", Oxm(F::Ipv4Dst)),
        ("tcp_src", Oxm(F::TcpSrc)),
        ("tcp_dst", Oxm(F::TcpDst)),
        ("udp_src", Oxm(F::UdpSrc)),
        ("udp_dst", Oxm(F::UdpDst)),
        ("sctp_src", Oxm(F::SctpSrc)),
        ("sctp_dst", Oxm(F::SctpDst)),
        ("icmpv4_type", Oxm(F::Icmpv4Type)),
        ("icmpv4_code", Oxm(F::Icmpv4Code)),
        ("arp_op", Oxm(F::ArpOp)),
        ("arp_spa", Oxm(F::ArpSpa)),
        ("arp_tpa", Oxm(F::ArpTpa)),
        ("arp_sha", Oxm(F::ArpSha)),
        ("arp_tha", Oxm(F::ArpTha)),
        ("ipv6_src", Oxm(F::Ipv6Src)),
        ("ipv6_dst", Oxm(F::Ipv6Dst)),
        ("ipv6_flabel", Oxm(F::Ipv6Flabel)),
        ("icmpv6_type", Oxm(F::Icmpv6Type)),
        ("icmpv6_code", Oxm(F::Icmpv6Code)),
        ("ipv6_nd_target", Oxm(F::Ipv6NdTarget)),
        ("ipv6_nd_sll", Oxm(F::Ipv6NdSll)),
        ("ipv6_nd_tll", Oxm(F::Ipv6NdTll)),
        ("mpls_label", Oxm(F::MplsLabel)),
        ("mpls_tc", Oxm(F::MplsTc)),
        ("mpls_bos", Oxm(F::MplsBos)),
        ("pbb_isid", Oxm(F::PbbIsid)),
        ("tunnel_id", Oxm(F::TunnelId)),
        ("ipv6_exthdr", Oxm(F::Ipv6Exthdr)),
        // OpenFlow 1.0 names
        ("dl_src", Oxm(F::EthSrc)),
        ("dl_dst", Oxm(F::EthDst)),
        ("dl_type", Oxm(F::EthType)),
        ("dl_vlan", Oxm(F::VlanVid)),
        ("dl_vlan_pcp", Oxm(F::VlanPcp)),
        ("nw_src", Oxm(F::Ipv4Src)),
        ("nw_dst", Oxm(F::Ipv4Dst)),
        ("nw_proto", Oxm(F::IpProto)),
        ("nw_tos", NwTos),
        ("tp_src", TpSrc),
        ("tp_dst", TpDst),
    ]
};

impl Field {
    /// Looks up a field by one of its names
    pub fn from_name(name: &str) -> Option<Field> {
        FIELD_NAMES.iter().find(|&&(n, _)| n == name).map(|&(_, f)| f)
    }

    /// The field's canonical name
    pub fn name(self) -> &'static str {
        FIELD_NAMES
            .iter()
            .find(|&&(_, f)| f == self)
            .map(|&(n, _)| n)
            .unwrap_or("unknown")
    }

    /// The field's value type
    pub fn kind(self) -> Kind {
        use crate::openflow::messages::OxmOfbMatchFields as F;
        match self {
            Field::NwTos => Kind::Int(8),
            Field::TpSrc | Field::TpDst => Kind::Int(16),
            Field::Oxm(f) => match f {
                F::InPort | F::InPhyPort => Kind::Int(32),
                F::Metadata | F::TunnelId => Kind::Int(64),
                F::EthDst | F::EthSrc | F::ArpSha | F::ArpTha | F::Ipv6NdSll | F::Ipv6NdTll => {
                    Kind::Mac
                }
                F::EthType | F::TcpSrc | F::TcpDst | F::UdpSrc | F::UdpDst => Kind::Int(16),
                F::SctpSrc | F::SctpDst | F::ArpOp => Kind::Int(16),
                F::VlanVid => Kind::Int(13),
                F::VlanPcp | F::MplsTc => Kind::Int(3),
                F::IpDscp => Kind::Int(6),
                F::IpEcn => Kind::Int(2),
                F::IpProto | F::Icmpv4Type | F::Icmpv4Code => Kind::Int(8),
                F::Icmpv6Type | F::Icmpv6Code => Kind::Int(8),
                F::Ipv4Src | F::Ipv4Dst | F::ArpSpa | F::ArpTpa => Kind::Ipv4,
                F::Ipv6Src | F::Ipv6Dst | F::Ipv6NdTarget => Kind::Ipv6,
                F::Ipv6Flabel | F::MplsLabel => Kind::Int(20),
                F::MplsBos => Kind::Int(1),
                F::PbbIsid => Kind::Int(24),
                F::Ipv6Exthdr => Kind::Int(9),
            },
        }
    }
}

/// A parsed match or set-field value, optionally masked
#[derive(Debug, Clone, PartialEq)]
pub enum MatchValue {
    Int(u64, Option<u64>),
    Mac(MacAddr, Option<MacAddr>),
    Ipv4(Ipv4Addr, Option<Ipv4Addr>),
    Ipv6(Ipv6Addr, Option<Ipv6Addr>),
}

fn split_mask(s: &str) -> (&str, Option<&str>) {
    let mut parts = s.splitn(2, '/');
    let value = parts.next().unwrap_or("");
    (value.trim(), parts.next().map(str::trim))
}

fn ipv4_mask(mask: &str) -> std::result::Result<Ipv4Addr, String> {
    if let Ok(prefix) = mask.parse::<u8>() {
        Ipv4Network::new(Ipv4Addr::UNSPECIFIED, prefix)
            .map(|net| net.mask())
            .map_err(|e| format!("{:?}", e))
    }
    else {
        mask.parse().map_err(|_| format!("invalid netmask '{}'", mask))
    }
}

fn ipv6_mask(mask: &str) -> std::result::Result<Ipv6Addr, String> {
    if let Ok(prefix) = mask.parse::<u8>() {
        Ipv6Network::new(Ipv6Addr::UNSPECIFIED, prefix)
            .map(|net| net.mask())
            .map_err(|e| format!("{:?}", e))
    }
    else {
        mask.parse().map_err(|_| format!("invalid netmask '{}'", mask))
    }
}

impl MatchValue {
    /// Parses the JSON value of a field of the given kind
    pub fn parse(kind: Kind, value: &Value) -> std::result::Result<MatchValue, String> {
        let invalid = || format!("invalid value {}", value);
        if let (Kind::Int(bits), &Value::Number(_)) = (kind, value) {
            let n = int_from_value(value).ok_or_else(invalid)?;
            return MatchValue::check_width(bits, n, None);
        }
        let s = value.as_str().ok_or_else(invalid)?;
        let (v, m) = split_mask(s);
        match kind {
            Kind::Int(bits) => {
                let n = parse_int_str(v).ok_or_else(invalid)?;
                let mask = match m {
                    Some(m) => Some(parse_int_str(m).ok_or_else(invalid)?),
                    None => None,
                };
                MatchValue::check_width(bits, n, mask)
            }
            Kind::Mac => {
                let mask = match m {
                    Some(m) => Some(m.parse()?),
                    None => None,
                };
                Ok(MatchValue::Mac(v.parse()?, mask))
            }
            Kind::Ipv4 => {
                let addr = v.parse().map_err(|_| invalid())?;
                let mask = match m {
                    Some(m) => Some(ipv4_mask(m)?),
                    None => None,
                };
                Ok(MatchValue::Ipv4(addr, mask))
            }
            Kind::Ipv6 => {
                let addr = v.parse().map_err(|_| invalid())?;
                let mask = match m {
                    Some(m) => Some(ipv6_mask(m)?),
                    None => None,
                };
                Ok(MatchValue::Ipv6(addr, mask))
            }
        }
    }

    fn check_width(bits: u8, n: u64, mask: Option<u64>) -> std::result::Result<MatchValue, String> {
        let fits = |v: u64| bits >= 64 || v >> bits == 0;
        if !fits(n) || !mask.map_or(true, fits) {
            return Err(format!("value {:#x} exceeds {} bits", n, bits));
        }
        Ok(MatchValue::Int(n, mask))
    }

    /// Wire representation of value and mask with the given byte width
    pub fn to_bytes(&self, width: usize) -> (Vec<u8>, Option<Vec<u8>>) {
        fn int_bytes(n: u64, width: usize) -> Vec<u8> {
            n.to_be_bytes()[8 - width..].to_vec()
        }
        match *self {
            MatchValue::Int(n, m) => (int_bytes(n, width), m.map(|m| int_bytes(m, width))),
            MatchValue::Mac(a, m) => (a.0.to_vec(), m.map(|m| m.0.to_vec())),
            MatchValue::Ipv4(a, m) => (a.octets().to_vec(), m.map(|m| m.octets().to_vec())),
            MatchValue::Ipv6(a, m) => (a.octets().to_vec(), m.map(|m| m.octets().to_vec())),
        }
    }

    /// The integer value, if this is an integer
    pub fn as_int(&self) -> Option<u64> {
        match *self {
            MatchValue::Int(n, _) => Some(n),
            _ => None,
        }
    }
}

/// Match criteria: field names mapped to values
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Match {
    /// The fields in name order
    pub fields: Vec<(Field, MatchValue)>,
}

impl Match {
    /// Gets the value of a field, if present
    pub fn get(&self, field: Field) -> Option<&MatchValue> {
        self.fields.iter().find(|&&(f, _)| f == field).map(|&(_, ref v)| v)
    }
}

impl TryFrom<Value> for Match {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Ok(Match::default()),
            other => return Err(format!("match must be an object, got {}", other)),
        };
        let mut fields = vec![];
        for (name, value) in &object {
            let field = Field::from_name(name).ok_or_else(|| format!("unknown match field '{}'", name))?;
            if fields.iter().any(|&(f, _)| f == field) {
                return Err(format!("match field '{}' given twice", name));
            }
            let value = MatchValue::parse(field.kind(), value).map_err(|e| format!("{}: {}", name, e))?;
            fields.push((field, value));
        }
        Ok(Match { fields })
    }
}

/// The field and value of a `SET_FIELD` action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSetField")]
pub struct SetField {
    pub field: Field,
    pub value: MatchValue,
}

#[derive(Deserialize)]
struct RawSetField {
    field: String,
    value: Value,
}

impl TryFrom<RawSetField> for SetField {
    type Error = String;

    fn try_from(raw: RawSetField) -> std::result::Result<Self, Self::Error> {
        let field = Field::from_name(&raw.field).ok_or_else(|| format!("unknown field '{}'", raw.field))?;
        let value = MatchValue::parse(field.kind(), &raw.value)?;
        if let MatchValue::Int(_, Some(_)) = value {
            return Err(format!("SET_FIELD {} does not take a mask", raw.field));
        }
        Ok(SetField { field, value })
    }
}

/// An action or instruction of a flow entry or group bucket, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Output {
        #[serde(deserialize_with = "port")]
        port: u32,
        #[serde(default, deserialize_with = "opt_int")]
        max_len: Option<u16>,
    },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl {
        #[serde(deserialize_with = "int")]
        mpls_ttl: u8,
    },
    DecMplsTtl,
    PushVlan {
        #[serde(deserialize_with = "int")]
        ethertype: u16,
    },
    PopVlan,
    PushMpls {
        #[serde(deserialize_with = "int")]
        ethertype: u16,
    },
    PopMpls {
        #[serde(deserialize_with = "int")]
        ethertype: u16,
    },
    SetQueue {
        #[serde(deserialize_with = "int")]
        queue_id: u32,
    },
    Group {
        #[serde(deserialize_with = "int")]
        group_id: u32,
    },
    SetNwTtl {
        #[serde(deserialize_with = "int")]
        nw_ttl: u8,
    },
    DecNwTtl,
    SetField(SetField),
    PushPbb {
        #[serde(deserialize_with = "int")]
        ethertype: u16,
    },
    PopPbb,
    GotoTable {
        #[serde(deserialize_with = "int")]
        table_id: u8,
    },
    WriteMetadata {
        #[serde(deserialize_with = "int")]
        metadata: u64,
        #[serde(default, deserialize_with = "opt_int")]
        metadata_mask: Option<u64>,
    },
    Meter {
        #[serde(deserialize_with = "int")]
        meter_id: u32,
    },
    WriteActions {
        actions: Vec<Action>,
    },
    ClearActions,
    SetVlanVid {
        #[serde(deserialize_with = "int")]
        vlan_vid: u16,
    },
    SetVlanPcp {
        #[serde(deserialize_with = "int")]
        vlan_pcp: u8,
    },
    StripVlan,
    SetDlSrc {
        dl_src: MacAddr,
    },
    SetDlDst {
        dl_dst: MacAddr,
    },
    SetNwSrc {
        nw_src: Ipv4Addr,
    },
    SetNwDst {
        nw_dst: Ipv4Addr,
    },
    SetNwTos {
        #[serde(deserialize_with = "int")]
        nw_tos: u8,
    },
    SetTpSrc {
        #[serde(deserialize_with = "int")]
        tp_src: u16,
    },
    SetTpDst {
        #[serde(deserialize_with = "int")]
        tp_dst: u16,
    },
    Enqueue {
        #[serde(deserialize_with = "port")]
        port: u32,
        #[serde(deserialize_with = "int")]
        queue_id: u32,
    },
}

impl Action {
    /// The `type` tag of the action
    pub fn name(&self) -> &'static str {
        match *self {
            Action::Output { .. } => "OUTPUT",
            Action::CopyTtlOut => "COPY_TTL_OUT",
            Action::CopyTtlIn => "COPY_TTL_IN",
            Action::SetMplsTtl { .. } => "SET_MPLS_TTL",
            Action::DecMplsTtl => "DEC_MPLS_TTL",
            Action::PushVlan { .. } => "PUSH_VLAN",
            Action::PopVlan => "POP_VLAN",
            Action::PushMpls { .. } => "PUSH_MPLS",
            Action::PopMpls { .. } => "POP_MPLS",
            Action::SetQueue { .. } => "SET_QUEUE",
            Action::Group { .. } => "GROUP",
            Action::SetNwTtl { .. } => "SET_NW_TTL",
            Action::DecNwTtl => "DEC_NW_TTL",
            Action::SetField(_) => "SET_FIELD",
            Action::PushPbb { .. } => "PUSH_PBB",
            Action::PopPbb => "POP_PBB",
            Action::GotoTable { .. } => "GOTO_TABLE",
            Action::WriteMetadata { .. } => "WRITE_METADATA",
            Action::Meter { .. } => "METER",
            Action::WriteActions { .. } => "WRITE_ACTIONS",
            Action::ClearActions => "CLEAR_ACTIONS",
            Action::SetVlanVid { .. } => "SET_VLAN_VID",
            Action::SetVlanPcp { .. } => "SET_VLAN_PCP",
            Action::StripVlan => "STRIP_VLAN",
            Action::SetDlSrc { .. } => "SET_DL_SRC",
            Action::SetDlDst { .. } => "SET_DL_DST",
            Action::SetNwSrc { .. } => "SET_NW_SRC",
            Action::SetNwDst { .. } => "SET_NW_DST",
            Action::SetNwTos { .. } => "SET_NW_TOS",
            Action::SetTpSrc { .. } => "SET_TP_SRC",
            Action::SetTpDst { .. } => "SET_TP_DST",
            Action::Enqueue { .. } => "ENQUEUE",
        }
    }
}

fn default_priority() -> u16 {
    crate::openflow::messages::OFP_DEFAULT_PRIORITY
}

/// A flow entry to add, modify or delete
#[derive(Debug, Clone, Deserialize)]
pub struct FlowEntry {
    pub dpid: Dpid,
    #[serde(default, deserialize_with = "int")]
    pub cookie: u64,
    #[serde(default, deserialize_with = "int")]
    pub cookie_mask: u64,
    #[serde(default, deserialize_with = "int")]
    pub table_id: u8,
    #[serde(default, deserialize_with = "int")]
    pub idle_timeout: u16,
    #[serde(default, deserialize_with = "int")]
    pub hard_timeout: u16,
    #[serde(default = "default_priority", deserialize_with = "int")]
    pub priority: u16,
    #[serde(default, deserialize_with = "opt_int")]
    pub buffer_id: Option<u32>,
    #[serde(default, deserialize_with = "int")]
    pub flags: u16,
    #[serde(default, deserialize_with = "opt_port")]
    pub out_port: Option<u32>,
    #[serde(default, deserialize_with = "opt_int")]
    pub out_group: Option<u32>,
    #[serde(default, rename = "match")]
    pub match_fields: Match,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl FlowEntry {
    /// An entry matching every flow of every table
    pub fn all(dpid: u64) -> FlowEntry {
        FlowEntry {
            dpid: Dpid(dpid),
            cookie: 0,
            cookie_mask: 0,
            table_id: crate::openflow::messages::OFPTT_ALL,
            idle_timeout: 0,
            hard_timeout: 0,
            priority: default_priority(),
            buffer_id: None,
            flags: 0,
            out_port: None,
            out_group: None,
            match_fields: Match::default(),
            actions: vec![],
        }
    }
}

/// The filter of a flow or aggregate stats query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsFilter {
    #[serde(default, deserialize_with = "opt_int")]
    pub table_id: Option<u8>,
    #[serde(default, deserialize_with = "opt_port")]
    pub out_port: Option<u32>,
    #[serde(default, deserialize_with = "opt_int")]
    pub out_group: Option<u32>,
    #[serde(default, deserialize_with = "int")]
    pub cookie: u64,
    #[serde(default, deserialize_with = "int")]
    pub cookie_mask: u64,
    #[serde(default, rename = "match")]
    pub match_fields: Match,
}

/// Meter configuration flags
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeterFlag {
    Kbps,
    Pktps,
    Burst,
    Stats,
}

fn meter_flags<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<MeterFlag>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(MeterFlag),
        Many(Vec<MeterFlag>),
    }
    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(flag) => Ok(vec![flag]),
        OneOrMany::Many(flags) => Ok(flags),
    }
}

/// A meter band, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    Drop {
        #[serde(default, deserialize_with = "int")]
        rate: u32,
        #[serde(default, deserialize_with = "int")]
        burst_size: u32,
    },
    DscpRemark {
        #[serde(default, deserialize_with = "int")]
        rate: u32,
        #[serde(default, deserialize_with = "int")]
        burst_size: u32,
        #[serde(default, deserialize_with = "int")]
        prec_level: u8,
    },
    Experimenter {
        #[serde(default, deserialize_with = "int")]
        rate: u32,
        #[serde(default, deserialize_with = "int")]
        burst_size: u32,
        #[serde(default, deserialize_with = "int")]
        experimenter: u32,
    },
}

/// A meter to add, modify or delete
#[derive(Debug, Clone, Deserialize)]
pub struct MeterEntry {
    pub dpid: Dpid,
    #[serde(default, deserialize_with = "int")]
    pub meter_id: u32,
    #[serde(default, deserialize_with = "meter_flags")]
    pub flags: Vec<MeterFlag>,
    #[serde(default)]
    pub bands: Vec<Band>,
}

/// Group types
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum GroupType {
    #[serde(rename = "ALL")]
    All,
    #[serde(rename = "SELECT")]
    Select,
    #[serde(rename = "INDIRECT")]
    Indirect,
    #[serde(rename = "FF")]
    FastFailover,
}

impl Default for GroupType {
    fn default() -> GroupType {
        GroupType::All
    }
}

/// A bucket of a group
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bucket {
    #[serde(default, deserialize_with = "int")]
    pub weight: u16,
    #[serde(default, deserialize_with = "opt_port")]
    pub watch_port: Option<u32>,
    #[serde(default, deserialize_with = "opt_int")]
    pub watch_group: Option<u32>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A group to add, modify or delete
#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    pub dpid: Dpid,
    #[serde(default, rename = "type")]
    pub typ: GroupType,
    #[serde(default, deserialize_with = "int")]
    pub group_id: u32,
    #[serde(default)]
    pub buckets: Vec<Bucket>,
}

/// A port behavior change
#[derive(Debug, Clone, Deserialize)]
pub struct PortConfig {
    pub dpid: Dpid,
    #[serde(deserialize_with = "port")]
    pub port_no: u32,
    #[serde(default, deserialize_with = "int")]
    pub config: u32,
    #[serde(default, deserialize_with = "int")]
    pub mask: u32,
    #[serde(default, deserialize_with = "opt_int")]
    pub advertise: Option<u32>,
    #[serde(default)]
    pub hw_addr: Option<MacAddr>,
}

/// How the experimenter `data` string is encoded
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Ascii,
    Base64,
}

impl Default for DataType {
    fn default() -> DataType {
        DataType::Ascii
    }
}

/// An experimenter message to send
#[derive(Debug, Clone, Deserialize)]
pub struct Experimenter {
    #[serde(default, deserialize_with = "int")]
    pub experimenter: u32,
    #[serde(default, deserialize_with = "int")]
    pub exp_type: u32,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub data: String,
}

impl Experimenter {
    /// The decoded payload
    pub fn payload(&self) -> Result<Vec<u8>> {
        match self.data_type {
            DataType::Ascii => Ok(self.data.as_bytes().to_vec()),
            DataType::Base64 => base64::engine::general_purpose::STANDARD
                .decode(&self.data)
                .map_err(|e| Error::InvalidData(e.to_string())),
        }
    }
}

/// Commands of `/stats/flowentry/{cmd}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowCommand {
    Add,
    Modify,
    ModifyStrict,
    Delete,
    DeleteStrict,
}

impl FlowCommand {
    /// Looks up a command path segment
    pub fn from_path(cmd: &str) -> Option<FlowCommand> {
        match cmd {
            "add" => Some(FlowCommand::Add),
            "modify" => Some(FlowCommand::Modify),
            "modify_strict" => Some(FlowCommand::ModifyStrict),
            "delete" => Some(FlowCommand::Delete),
            "delete_strict" => Some(FlowCommand::DeleteStrict),
            _ => None,
        }
    }
}

/// Commands of `/stats/meterentry/{cmd}` and `/stats/groupentry/{cmd}`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryCommand {
    Add,
    Modify,
    Delete,
}

impl EntryCommand {
    /// Looks up a command path segment
    pub fn from_path(cmd: &str) -> Option<EntryCommand> {
        match cmd {
            "add" => Some(EntryCommand::Add),
            "modify" => Some(EntryCommand::Modify),
            "delete" => Some(EntryCommand::Delete),
            _ => None,
        }
    }
}
