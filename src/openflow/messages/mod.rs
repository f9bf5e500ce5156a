/*!
The OpenFlow message primitives needed to query statistics and mutate the
flow, meter and group tables of a switch

This is based on the openflow.h from OpenFlow Switch Specification 1.3.5
and its 1.2 predecessor, which share the extensible match (OXM) and
instruction model. The fixed-layout OpenFlow 1.0 structures live in `v1_0`.
The type names are changed to align with the Rust conventions.
*/

pub mod deserialize;
pub mod serialize;
pub mod v1_0;

use std::fmt;

impl OfpErrorMsg {
    fn first_64_bytes(header: &[u8], body: &[u8]) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(header);
        let target_length = 64 - header.len();
        let shrunk_body = if body.len() < target_length {
            body
        }
        else {
            &body[0..target_length]
        };
        buf.extend_from_slice(shrunk_body);
        buf
    }

    /// Constructs a Hello Failed error
    pub fn new_hello_failed() -> OfpErrorMsg {
        OfpErrorMsg {
            typ: OfpErrorType::HelloFailed as u16,
            code: OfpHelloFailedCode::Incompatible as u16,
            data: vec![],
        }
    }

    /// Constructs a Bad Request error
    pub fn new_bad_request(code: OfpBadRequestCode, header: &[u8], body: &[u8]) -> OfpErrorMsg {
        OfpErrorMsg {
            typ: OfpErrorType::BadRequest as u16,
            code: code as u16,
            data: Self::first_64_bytes(header, body),
        }
    }
}

impl fmt::Display for OfpErrorMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let typ = match self.typ {
            0 => "HelloFailed",
            1 => "BadRequest",
            2 => "BadAction",
            3 => "BadInstruction",
            4 => "BadMatch",
            5 => "FlowModFailed",
            6 => "GroupModFailed",
            7 => "PortModFailed",
            12 => "MeterModFailed",
            0xffff => "Experimenter",
            _ => return write!(f, "OpenFlow Error: type({}), code({})", self.typ, self.code),
        };
        write!(f, "OpenFlow Error: {}, code({})", typ, self.code)
    }
}

/* Some getters */

impl OfpHeader {
    /// Gets the packet's OpenFlow version
    pub fn version(&self) -> u8 {
        self.version
    }
    /// Gets this packet's numerical type, which has to be
    /// interpreted in the context of `version()`.
    pub fn typ(&self) -> u8 {
        self.typ
    }
    /// Gets the packet's transaction id
    pub fn xid(&self) -> u32 {
        self.xid
    }
}
impl OfpEchoRequest {
    /// Gets the message's content
    pub fn arbitrary(self) -> Vec<u8> {
        self.arbitrary
    }
}
impl OfpStatsReply {
    /// Gets the reply's `OfpStatsType` numerical representation
    pub fn stats_type(&self) -> u16 {
        self.stats_type
    }
    /// Gets the reply flags, carrying the "more fragments follow" bit
    pub fn flags(&self) -> u16 {
        self.flags
    }
    /// Gets the type specific reply body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// An OpenFlow Echo Request
#[derive(Debug)]
pub struct OfpEchoRequest {
    arbitrary: Vec<u8>,
}

/// An OpenFlow Echo Reply
#[derive(Debug)]
pub struct OfpEchoReply {
    arbitrary: Vec<u8>,
}

/// An OpenFlow TLV (Type, Length, Value) for
/// the OpenFlow Extensible Match format
#[derive(Debug, Clone, PartialEq)]
pub struct OfpOxmTlv {
    /// Header class
    class: u16,
    /// Header field
    field: u8,
    /// Header hasmask
    hasmask: bool,
    /// Body: the value, followed by an equally sized mask if `hasmask`
    body: Vec<u8>,
}

/* Copyright (c) 2008 The Board of Trustees of The Leland Stanford Junior University
 * Copyright (c) 2011, 2012 Open Networking Foundation
 *
 * We are making the OpenFlow specification and associated documentation
 * (Software) available for public use and benefit with the expectation
 * that others will use, modify and enhance the Software and contribute
 * those enhancements back to the community. However, since we would
 * like to make the Software available for broadest use, with as few
 * restrictions as possible permission is hereby granted, free of
 * charge, to any person obtaining a copy of this Software to deal in
 * the Software under the copyrights without restriction, including
 * without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to
 * permit persons to whom the Software is furnished to do so, subject to
 * the following conditions:
 *
 * The above copyright notice and this permission notice shall be
 * included in all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
 * EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
 * MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT.  IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
 * BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
 * ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 *
 * The name and trademarks of copyright holder(s) may NOT be used in
 * advertising or publicity pertaining to the Software or any
 * derivatives without specific, written prior permission.
 */

/// Version numbers:
/// OpenFlow versions released: 0x01 = 1.0 ; 0x02 = 1.1 ; 0x03 = 1.2; 0x04 = 1.3.
///
/// The most significant bit in the version field is reserved and must be set to zero.
pub const OFP_VERSION_1_0: u8 = 0x01;
/// OpenFlow 1.1, accepted on the wire but without an adapter
pub const OFP_VERSION_1_1: u8 = 0x02;
/// OpenFlow 1.2
pub const OFP_VERSION_1_2: u8 = 0x03;
/// OpenFlow 1.3
pub const OFP_VERSION_1_3: u8 = 0x04;
/// The highest version this controller offers in its Hello.
pub const OFP_VERSION: u8 = OFP_VERSION_1_3;

/// The IANA assigned OpenFlow TCP port.
pub const OFP_TCP_PORT: u16 = 6653;

/// Maximum number of physical and logical switch ports. Ports are numbered starting from 1.
pub const OFPP_MAX: u32 = 0xffff_ff00;
/// Special value used in some requests when no port is specified (i.e. wildcarded).
pub const OFPP_ANY: u32 = 0xffff_ffff;
/// Wildcard group used only for flow stats requests.
pub const OFPG_ANY: u32 = 0xffff_ffff;
/// Represents all groups for group delete commands and group stats requests.
pub const OFPG_ALL: u32 = 0xffff_fffc;
/// All queues.
pub const OFPQ_ALL: u32 = 0xffff_ffff;
/// Represents all meters for stats requests.
pub const OFPM_ALL: u32 = 0xffff_ffff;
/// Wildcard table used for table config, flow stats and flow deletes.
pub const OFPTT_ALL: u8 = 0xff;
/// Maximum max_len value which can be used to request a specific byte length.
pub const OFPCML_MAX: u16 = 0xffe5;

/// "More fragments follow" bit of a 1.0 and 1.2 stats reply.
pub const OFPSF_REPLY_MORE: u16 = 1 << 0;
/// "More fragments follow" bit of a 1.3 multipart reply.
pub const OFPMPF_REPLY_MORE: u16 = 1 << 0;

/// A message's type, the most fundamental to
/// distinguish information between messages.
///
/// The discriminants are the 1.2/1.3 codes. Some
/// codes moved between 1.0 and 1.2, see `code()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfpType {
    /* Immutable messages. */
    /// Symmetric message
    Hello = 0,
    /// Symmetric message
    Error = 1,
    /// Symmetric message
    EchoRequest = 2,
    /// Symmetric message
    EchoReply = 3,
    /// Symmetric message (Vendor in 1.0)
    Experimenter = 4,

    /* Switch configuration messages. */
    /// Controller/switch message
    FeaturesRequest = 5,
    /// Controller/switch message
    FeaturesReply = 6,

    /* Asynchronous messages. */
    /// Async message
    PacketIn = 10,
    /// Async message
    FlowRemoved = 11,
    /// Async message
    PortStatus = 12,

    /* Controller command messages. */
    /// Controller/switch message
    FlowMod = 14,
    /// Controller/switch message
    GroupMod = 15,
    /// Controller/switch message
    PortMod = 16,

    /* Statistics messages (multipart in 1.3). */
    /// Controller/switch message
    StatsRequest = 18,
    /// Controller/switch message
    StatsReply = 19,

    /* Barrier messages. */
    /// Controller/switch message
    BarrierRequest = 20,
    /// Controller/switch message
    BarrierReply = 21,

    /* Meters and rate limiters configuration messages. */
    /// Controller/switch message
    MeterMod = 29,
}

impl OfpType {
    const ALL: [OfpType; 18] = [
        OfpType::Hello,
        OfpType::Error,
        OfpType::EchoRequest,
        OfpType::EchoReply,
        OfpType::Experimenter,
        OfpType::FeaturesRequest,
        OfpType::FeaturesReply,
        OfpType::PacketIn,
        OfpType::FlowRemoved,
        OfpType::PortStatus,
        OfpType::FlowMod,
        OfpType::GroupMod,
        OfpType::PortMod,
        OfpType::StatsRequest,
        OfpType::StatsReply,
        OfpType::BarrierRequest,
        OfpType::BarrierReply,
        OfpType::MeterMod,
    ];

    /// The type's wire code for the given protocol version
    pub fn code(self, version: u8) -> u8 {
        if version == OFP_VERSION_1_0 {
            match self {
                OfpType::PortMod => return 15,
                OfpType::StatsRequest => return 16,
                OfpType::StatsReply => return 17,
                OfpType::BarrierRequest => return 18,
                OfpType::BarrierReply => return 19,
                _ => {}
            }
        }
        self as u8
    }

    /// Looks up the type of a received wire code
    pub fn from_code(version: u8, code: u8) -> Option<OfpType> {
        Self::ALL
            .iter()
            .cloned()
            .filter(|t| t.exists_in(version))
            .find(|t| t.code(version) == code)
    }

    fn exists_in(self, version: u8) -> bool {
        match self {
            OfpType::GroupMod => version >= OFP_VERSION_1_1,
            OfpType::MeterMod => version >= OFP_VERSION_1_3,
            _ => true,
        }
    }
}

/// Header on all OpenFlow packets.
#[derive(Debug, PartialEq)]
pub struct OfpHeader {
    /// One of the OFP_VERSION_* constants.
    version: u8,
    /// This packet's OfpType code.
    typ: u8,
    /// This packet's length including this OfpHeader.
    length: u16,
    /// Transaction id associated with this packet.
    /// Replies use the same id as was in the request
    /// to facilitate pairing.
    xid: u32,
}

/// Description of a port
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfpPort {
    /// Port number; 16 bit wide in 1.0.
    pub port_no: u32,
    /// Hardware address.
    pub hw_addr: [u8; 6],
    /// Null-terminated interface name.
    pub name: String,
    /// Bitmap of OFPPC_* flags.
    pub config: u32,
    /// Bitmap of OFPPS_* flags.
    pub state: u32,
    /* Bitmaps of OFPPF_* that describe features. All bits zeroed if
     * unsupported or unavailable. */
    /// Current features.
    pub curr: u32,
    /// Features being advertised by the port.
    pub advertised: u32,
    /// Features supported by the port.
    pub supported: u32,
    /// Features advertised by peer.
    pub peer: u32,
    /// Current port bitrate in kbps. Not in 1.0.
    pub curr_speed: u32,
    /// Max port bitrate in kbps. Not in 1.0.
    pub max_speed: u32,
}

/// What changed about a physical port
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpPortReason {
    /// The port was added.
    Add = 0,
    /// The port was removed.
    Delete = 1,
    /// Some attribute of the port has changed.
    Modify = 2,
}

/// A physical port has changed in the datapath
#[derive(Debug, PartialEq)]
pub struct OfpPortStatus {
    /// One of OfpPortReason.
    pub reason: u8,
    /// The changed port.
    pub desc: OfpPort,
}

/// Switch features.
#[derive(Debug, PartialEq)]
pub struct OfpSwitchFeatures {
    /// Datapath unique ID. The lower 48-bits are for
    /// a MAC address, while the upper 16-bits are
    /// implementer-defined.
    pub datapath_id: u64,
    /// Max packets buffered at once.
    pub n_buffers: u32,
    /// Number of tables supported by datapath.
    pub n_tables: u8,
    /// Identify auxiliary connections (1.3 only)
    pub auxiliary_id: u8,
    /// Bitmap of support OfpCapabilities.
    pub capabilities: u32,
    /// Port definitions. Only sent in 1.0 and 1.2;
    /// 1.3 switches describe their ports via `OfpStatsType::PortDesc`.
    pub ports: Vec<OfpPort>,
}

/* ## -------------------------- ## */
/* ## OpenFlow Extensible Match. ## */
/* ## -------------------------- ## */

/// The match type indicates the match structure (set of fields that compose the match) in use.
///
/// The match type is placed in the type field at the beginning
/// of all match structures. The "OpenFlow Extensible Match" type corresponds
/// to OXM TLV format described below and must be supported by all OpenFlow
/// switches. Extensions that define other match types may be published on the
/// ONF wiki. Support for extensions is optional.
pub enum OfpMatchType {
    /// OpenFlow Extensible Match
    Oxm = 1,
}

/// Fields to match against flows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfpMatch {
    /// One of OfpMatchType
    typ: u16,
    // length(): Length of OfpMatch (excluding padding)
    /* Followed by:
     *   - Exactly (length - 4) (possibly 0) bytes containing OXM TLVs, then
     *   - Exactly ((length + 7)/8*8 - length) (between 0 and 7) bytes of
     *     all-zero bytes
     * In summary, OfpMatch is padded as needed, to make its overall size
     * a multiple of 8, to preserve alignment in structures using it.
     */
    /// 0 or more OXM match fields
    oxm_fields: Vec<OfpOxmTlv>,
    // Zero bytes - see above for sizing
}

impl OfpMatch {
    /// Gets the match fields in wire order
    pub fn fields(&self) -> &[OfpOxmTlv] {
        &self.oxm_fields
    }
}

/// Construction of an OXM TLV.
impl OfpOxmTlv {
    /// An OXM TLV of the OpenFlow basic class.
    /// A mask must be as long as the value.
    pub fn new(field: OxmOfbMatchFields, value: &[u8], mask: Option<&[u8]>) -> OfpOxmTlv {
        let mut body = value.to_vec();
        if let Some(mask) = mask {
            body.extend_from_slice(mask);
        }
        OfpOxmTlv {
            class: OfpOxmClass::OpenflowBasic as u16,
            field: field as u8,
            hasmask: mask.is_some(),
            body,
        }
    }

    /// The field, if this TLV belongs to the OpenFlow basic class
    pub fn basic_field(&self) -> Option<OxmOfbMatchFields> {
        if self.class == OfpOxmClass::OpenflowBasic as u16 {
            OxmOfbMatchFields::from_u8(self.field)
        }
        else {
            None
        }
    }

    /// The matched value
    pub fn value(&self) -> &[u8] {
        if self.hasmask {
            &self.body[..self.body.len() / 2]
        }
        else {
            &self.body
        }
    }

    /// The value's mask if this TLV is masked
    pub fn mask(&self) -> Option<&[u8]> {
        if self.hasmask {
            Some(&self.body[self.body.len() / 2..])
        }
        else {
            None
        }
    }
}

/// OXM Class IDs.
/// The high order bit differentiate reserved classes from member classes.
/// Classes 0x0000 to 0x7FFF are member classes, allocated by ONF.
/// Classes 0x8000 to 0xFFFE are reserved classes, reserved for standardisation.
#[derive(Debug, Clone, Copy)]
enum OfpOxmClass {
    /// Basic class for OpenFlow
    OpenflowBasic = 0x8000,
}

/// OXM Flow match field types for OpenFlow basic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxmOfbMatchFields {
    /// Switch input port.
    InPort = 0,
    /// Switch physical input port.
    InPhyPort = 1,
    /// Metadata passed between tables.
    Metadata = 2,
    /// Ethernet destination address.
    EthDst = 3,
    /// Ethernet source address.
    EthSrc = 4,
    /// Ethernet frame type.
    EthType = 5,
    /// VLAN id.
    VlanVid = 6,
    /// VLAN priority.
    VlanPcp = 7,
    /// IP DSCP (6 bits in ToS field).
    IpDscp = 8,
    /// IP ECN (2 bits in ToS field).
    IpEcn = 9,
    /// IP protocol.
    IpProto = 10,
    /// IPv4 source address.
    Ipv4Src = 11,
    /// IPv4 destination address.
    Ipv4Dst = 12,
    /// TCP source port.
    TcpSrc = 13,
    /// TCP destination port.
    TcpDst = 14,
    /// UDP source port.
    UdpSrc = 15,
    /// UDP destination port.
    UdpDst = 16,
    /// SCTP source port.
    SctpSrc = 17,
    /// SCTP destination port.
    SctpDst = 18,
    /// ICMP type.
    Icmpv4Type = 19,
    /// ICMP code.
    Icmpv4Code = 20,
    /// ARP opcode.
    ArpOp = 21,
    /// ARP source IPv4 address.
    ArpSpa = 22,
    /// ARP target IPv4 address.
    ArpTpa = 23,
    /// ARP source hardware address.
    ArpSha = 24,
    /// ARP target hardware address.
    ArpTha = 25,
    /// IPv6 source address.
    Ipv6Src = 26,
    /// IPv6 destination address.
    Ipv6Dst = 27,
    /// IPv6 Flow Label
    Ipv6Flabel = 28,
    /// ICMPv6 type.
    Icmpv6Type = 29,
    /// ICMPv6 code.
    Icmpv6Code = 30,
    /// Target address for ND.
    Ipv6NdTarget = 31,
    /// Source link-layer for ND.
    Ipv6NdSll = 32,
    /// Target link-layer for ND.
    Ipv6NdTll = 33,
    /// MPLS label.
    MplsLabel = 34,
    /// MPLS TC.
    MplsTc = 35,
    /// MPLS BoS bit. 1.3 only.
    MplsBos = 36,
    /// PBB I-SID. 1.3 only.
    PbbIsid = 37,
    /// Logical Port Metadata. 1.3 only.
    TunnelId = 38,
    /// IPv6 Extension Header pseudo-field. 1.3 only.
    Ipv6Exthdr = 39,
}

impl OxmOfbMatchFields {
    const ALL: [OxmOfbMatchFields; 40] = [
        OxmOfbMatchFields::InPort,
        OxmOfbMatchFields::InPhyPort,
        OxmOfbMatchFields::Metadata,
        OxmOfbMatchFields::EthDst,
        OxmOfbMatchFields::EthSrc,
        OxmOfbMatchFields::EthType,
        OxmOfbMatchFields::VlanVid,
        OxmOfbMatchFields::VlanPcp,
        OxmOfbMatchFields::IpDscp,
        OxmOfbMatchFields::IpEcn,
        OxmOfbMatchFields::IpProto,
        OxmOfbMatchFields::Ipv4Src,
        OxmOfbMatchFields::Ipv4Dst,
        OxmOfbMatchFields::TcpSrc,
        OxmOfbMatchFields::TcpDst,
        OxmOfbMatchFields::UdpSrc,
        OxmOfbMatchFields::UdpDst,
        OxmOfbMatchFields::SctpSrc,
        OxmOfbMatchFields::SctpDst,
        OxmOfbMatchFields::Icmpv4Type,
        OxmOfbMatchFields::Icmpv4Code,
        OxmOfbMatchFields::ArpOp,
        OxmOfbMatchFields::ArpSpa,
        OxmOfbMatchFields::ArpTpa,
        OxmOfbMatchFields::ArpSha,
        OxmOfbMatchFields::ArpTha,
        OxmOfbMatchFields::Ipv6Src,
        OxmOfbMatchFields::Ipv6Dst,
        OxmOfbMatchFields::Ipv6Flabel,
        OxmOfbMatchFields::Icmpv6Type,
        OxmOfbMatchFields::Icmpv6Code,
        OxmOfbMatchFields::Ipv6NdTarget,
        OxmOfbMatchFields::Ipv6NdSll,
        OxmOfbMatchFields::Ipv6NdTll,
        OxmOfbMatchFields::MplsLabel,
        OxmOfbMatchFields::MplsTc,
        OxmOfbMatchFields::MplsBos,
        OxmOfbMatchFields::PbbIsid,
        OxmOfbMatchFields::TunnelId,
        OxmOfbMatchFields::Ipv6Exthdr,
    ];

    /// Looks up a field by its OXM field number
    pub fn from_u8(field: u8) -> Option<OxmOfbMatchFields> {
        Self::ALL.get(field as usize).cloned()
    }

    /// Whether the field was introduced with OpenFlow 1.3
    pub fn since_1_3(self) -> bool {
        self as u8 >= OxmOfbMatchFields::MplsBos as u8
    }
}

/// Values for 'type' in `OfpErrorMsg`. These values are immutable: they will
/// not change in future versions of the protocol (although new values may be added).
#[derive(Debug)]
pub enum OfpErrorType {
    /// Hello protocol failed.
    HelloFailed = 0,
    /// Request was not understood.
    BadRequest = 1,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::HelloFailed`.
///
/// 'data' contains an ASCII text string that may give failure details.
pub enum OfpHelloFailedCode {
    /// No compatible version.
    Incompatible = 0,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::BadRequest`.
///
/// 'data' contains at least the first 64 bytes of the failed request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpBadRequestCode {
    /// ofp_header.version not supported.
    BadVersion = 0,
    /// ofp_header.type not supported.
    BadType = 1,
    /// Wrong request length for type.
    BadLen = 6,
}

/* ## -------------------------- ## */
/* ## OpenFlow Statistics.       ## */
/* ## -------------------------- ## */

/// The kind of a stats (multipart) request or reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpStatsType {
    /// Description of this OpenFlow switch.
    Desc = 0,
    /// Individual flow statistics.
    Flow = 1,
    /// Aggregate flow statistics.
    Aggregate = 2,
    /// Flow table statistics.
    Table = 3,
    /// Port statistics.
    Port = 4,
    /// Queue statistics for a port.
    Queue = 5,
    /// Group counter statistics. Since 1.2.
    Group = 6,
    /// Group description. Since 1.2.
    GroupDesc = 7,
    /// Group features. Since 1.2.
    GroupFeatures = 8,
    /// Meter statistics. Since 1.3.
    Meter = 9,
    /// Meter configuration. Since 1.3.
    MeterConfig = 10,
    /// Meter features. Since 1.3.
    MeterFeatures = 11,
    /// Port description. Since 1.3.
    PortDesc = 13,
}

/// A stats request (a multipart request in 1.3) that wraps a
/// type specific body
#[derive(Debug)]
pub struct OfpStatsRequest {
    /// One of OfpStatsType.
    stats_type: u16,
    /// No request flags are defined.
    flags: u16,
    /// Type specific body
    body: Vec<u8>,
}

/// A stats reply (a multipart reply in 1.3) that wraps a
/// type specific body
#[derive(Debug, Clone, PartialEq)]
pub struct OfpStatsReply {
    /// One of OfpStatsType.
    stats_type: u16,
    /// OFPSF_REPLY_* / OFPMPF_REPLY_* flags.
    flags: u16,
    /// Type specific body
    body: Vec<u8>,
}

/// Body for `OfpStatsType::Flow` and `OfpStatsType::Aggregate` requests
#[derive(Debug)]
pub struct OfpFlowStatsRequest {
    /// ID of table to read (from ofp_table_stats),
    /// OFPTT_ALL for all tables.
    pub table_id: u8,
    /// Require matching entries to include this as an output port.
    /// A value of OFPP_ANY indicates no restriction.
    pub out_port: u32,
    /// Require matching entries to include this as an output group.
    /// A value of OFPG_ANY indicates no restriction.
    pub out_group: u32,
    /// Require matching entries to contain this cookie value
    pub cookie: u64,
    /// Mask used to restrict the cookie bits that must match.
    /// A value of 0 indicates no restriction.
    pub cookie_mask: u64,
    /// Fields to match. Variable size.
    pub match_field: OfpMatch,
}

/* ## ----------------- ## */
/* ## OpenFlow Actions. ## */
/* ## ----------------- ## */

/// The type of an OpenFlow Action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpActionType {
    /// Output to switch port.
    Output = 0,
    /// Copy TTL "outwards" -- from next-to-outermost to outermost
    CopyTtlOut = 11,
    /// Copy TTL "inwards" -- from outermost to next-to-outermost
    CopyTtlIn = 12,
    /// MPLS TTL
    SetMplsTtl = 15,
    /// Decrement MPLS TTL
    DecMplsTtl = 16,
    /// Push a new VLAN tag
    PushVlan = 17,
    /// Pop the outer VLAN tag
    PopVlan = 18,
    /// Push a new MPLS tag
    PushMpls = 19,
    /// Pop the outer MPLS tag
    PopMpls = 20,
    /// Set queue id when outputting to a port
    SetQueue = 21,
    /// Apply group.
    Group = 22,
    /// IP TTL.
    SetNwTtl = 23,
    /// Decrement IP TTL.
    DecNwTtl = 24,
    /// Set a header field using OXM TLV format.
    SetField = 25,
    /// Push a new PBB service tag (I-TAG). 1.3 only.
    PushPbb = 26,
    /// Pop the outer PBB service tag (I-TAG). 1.3 only.
    PopPbb = 27,
}

/// An action of an action list or action set
#[derive(Debug, Clone, PartialEq)]
pub enum OfpAction {
    /// Sends packets out 'port'. When the 'port' is the
    /// OFPP_CONTROLLER, 'max_len' indicates the max number
    /// of bytes to send.
    Output {
        /// Output port.
        port: u32,
        /// Max length to send to controller.
        max_len: u16,
    },
    /// See `OfpActionType::CopyTtlOut`
    CopyTtlOut,
    /// See `OfpActionType::CopyTtlIn`
    CopyTtlIn,
    /// See `OfpActionType::SetMplsTtl`
    SetMplsTtl(u8),
    /// See `OfpActionType::DecMplsTtl`
    DecMplsTtl,
    /// Push a VLAN tag with the given ethertype
    PushVlan(u16),
    /// See `OfpActionType::PopVlan`
    PopVlan,
    /// Push an MPLS tag with the given ethertype
    PushMpls(u16),
    /// Pop an MPLS tag, the payload gets the given ethertype
    PopMpls(u16),
    /// See `OfpActionType::SetQueue`
    SetQueue(u32),
    /// See `OfpActionType::Group`
    Group(u32),
    /// See `OfpActionType::SetNwTtl`
    SetNwTtl(u8),
    /// See `OfpActionType::DecNwTtl`
    DecNwTtl,
    /// Rewrites the header field carried by the (unmasked) TLV
    SetField(OfpOxmTlv),
    /// Push a PBB tag with the given ethertype
    PushPbb(u16),
    /// See `OfpActionType::PopPbb`
    PopPbb,
    /// An action this controller does not interpret, e.g. an experimenter action
    Unknown {
        /// The raw action type
        typ: u16,
        /// The raw action body after type and length
        body: Vec<u8>,
    },
}

/* ## ---------------------- ## */
/* ## OpenFlow Instructions. ## */
/* ## ---------------------- ## */

/// The type of an OpenFlow Instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpInstructionType {
    /// Setup the next table in the lookup pipeline
    GotoTable = 1,
    /// Setup the metadata field for use later in pipeline
    WriteMetadata = 2,
    /// Write the action(s) onto the datapath action set
    WriteActions = 3,
    /// Applies the action(s) immediately
    ApplyActions = 4,
    /// Clears all actions from the datapath action set
    ClearActions = 5,
    /// Apply meter (rate limiter). 1.3 only.
    Meter = 6,
}

/// An instruction of a flow entry
#[derive(Debug, Clone, PartialEq)]
pub enum OfpInstruction {
    /// Continue the pipeline at the given table
    GotoTable(u8),
    /// Write the masked metadata
    WriteMetadata {
        /// Metadata value to write
        metadata: u64,
        /// Metadata write bitmask
        metadata_mask: u64,
    },
    /// See `OfpInstructionType::WriteActions`
    WriteActions(Vec<OfpAction>),
    /// See `OfpInstructionType::ApplyActions`
    ApplyActions(Vec<OfpAction>),
    /// See `OfpInstructionType::ClearActions`
    ClearActions,
    /// Apply the given meter
    Meter(u32),
    /// An instruction this controller does not interpret
    Unknown {
        /// The raw instruction type
        typ: u16,
        /// The raw instruction body after type and length
        body: Vec<u8>,
    },
}

/* ## --------------------------- ## */
/* ## OpenFlow Flow Modification. ## */
/* ## --------------------------- ## */

/// The command that is embedded in a flow mod message.
/// The values are the same for all protocol versions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpFlowModCommand {
    /// New flow.
    Add = 0,
    /// Modify all matching flows.
    Modify = 1,
    /// Modify entry strictly matching wildcards and priority.
    ModifyStrict = 2,
    /// Delete all matching flows.
    Delete = 3,
    /// Delete entry strictly matching wildcards and priority.
    DeleteStrict = 4,
}

/// Value used in `idle_timeout` and `hard_timeout` to indicate that the entry is permanent.
pub const OFP_FLOW_PERMANENT: u16 = 0;

/// By default, choose a priority in the middle.
pub const OFP_DEFAULT_PRIORITY: u16 = 0x8000;

/// Flow setup and teardown (controller -> datapath).
#[derive(Debug)]
pub struct OfpFlowMod {
    /// Opaque controller-issued identifier.
    pub cookie: u64,
    /// Mask used to restrict the cookie bits
    /// that must match when the command is
    /// OfpFlowModCommand::Modify* or OfpFlowModCommand::Delete*.
    /// A value of 0 indicates no restriction.
    pub cookie_mask: u64,
    /// ID of the table to put the flow in.
    /// For OfpFlowModCommand::Delete* commands,
    /// OFPTT_ALL can also be used to delete
    /// matching flows from all tables.
    pub table_id: u8,
    /// One of OfpFlowModCommand.
    pub command: u8,
    /// Idle time before discarding (seconds).
    pub idle_timeout: u16,
    /// Max time before discarding (seconds).
    pub hard_timeout: u16,
    /// Priority level of flow entry.
    pub priority: u16,
    /// Buffered packet to apply to, or
    /// OFP_NO_BUFFER.
    /// Not meaningful for OfpFlowModCommand::Delete*.
    pub buffer_id: u32,
    /// For OfpFlowModCommand::Delete* commands, require
    /// matching entries to include this as an
    /// output port.  A value of OFPP_ANY
    /// indicates no restriction.
    pub out_port: u32,
    /// For OfpFlowModCommand::Delete* commands, require
    /// matching entries to include this as an
    /// output group.  A value of OFPG_ANY
    /// indicates no restriction.
    pub out_group: u32,
    /// Bitmap of OfpFlowModFlags.
    pub flags: u16,
    /// Fields to match. Variable size.
    pub match_field: OfpMatch,

    /* The variable size and padded match is always followed by instructions. */
    /// Instruction set - 0 or more.
    /// The length of the instruction
    /// set is inferred from the
    /// length field in the header.
    pub instructions: Vec<OfpInstruction>,
}

/// A reserved buffer ID to express that no buffer is assigned
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/* ## ----------------------------- ## */
/* ## OpenFlow Group Modification.  ## */
/* ## ----------------------------- ## */

/// Group commands. The same for 1.2 and 1.3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpGroupModCommand {
    /// New group.
    Add = 0,
    /// Modify all matching groups.
    Modify = 1,
    /// Delete all matching groups.
    Delete = 2,
}

/// Group types. Values in the range [128, 255] are reserved for experimental use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpGroupType {
    /// All (multicast/broadcast) group.
    All = 0,
    /// Select group.
    Select = 1,
    /// Indirect group.
    Indirect = 2,
    /// Fast failover group.
    FastFailover = 3,
}

/// Bucket for use in groups.
#[derive(Debug, Clone, PartialEq)]
pub struct OfpBucket {
    /// Relative weight of bucket. Only defined for select groups.
    pub weight: u16,
    /// Port whose state affects whether this bucket is live.
    /// Only required for fast failover groups.
    pub watch_port: u32,
    /// Group whose state affects whether this bucket is live.
    /// Only required for fast failover groups.
    pub watch_group: u32,
    /// The action length is inferred from the length field in the header.
    pub actions: Vec<OfpAction>,
}

/// Group setup and teardown (controller -> datapath).
#[derive(Debug)]
pub struct OfpGroupMod {
    /// One of OfpGroupModCommand.
    pub command: u16,
    /// One of OfpGroupType.
    pub typ: u8,
    /// Group identifier.
    pub group_id: u32,
    /// The length of the bucket array is inferred from the length field in the header.
    pub buckets: Vec<OfpBucket>,
}

/* ## ----------------------------- ## */
/* ## OpenFlow Meter Modification.  ## */
/* ## ----------------------------- ## */

/// Meter commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpMeterModCommand {
    /// New meter.
    Add = 0,
    /// Modify specified meter.
    Modify = 1,
    /// Delete specified meter.
    Delete = 2,
}

/// Meter configuration flags
pub enum OfpMeterFlags {
    /// Rate value in kb/s (kilo-bit per second).
    Kbps = 1 << 0,
    /// Rate value in packet/sec.
    Pktps = 1 << 1,
    /// Do burst size.
    Burst = 1 << 2,
    /// Collect statistics.
    Stats = 1 << 3,
}

/// Meter band types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpMeterBandType {
    /// Drop packet.
    Drop = 1,
    /// Remark DSCP in the IP header.
    DscpRemark = 2,
    /// Experimenter meter band.
    Experimenter = 0xffff,
}

/// A meter band with its type specific arguments
#[derive(Debug, Clone, PartialEq)]
pub enum OfpMeterBand {
    /// Drop packets above `rate`
    Drop {
        /// Rate for this band.
        rate: u32,
        /// Size of bursts.
        burst_size: u32,
    },
    /// Remark the DSCP of packets above `rate`
    DscpRemark {
        /// Rate for this band.
        rate: u32,
        /// Size of bursts.
        burst_size: u32,
        /// Number of drop precedence level to add.
        prec_level: u8,
    },
    /// A band defined by an experimenter
    Experimenter {
        /// Rate for this band.
        rate: u32,
        /// Size of bursts.
        burst_size: u32,
        /// Experimenter ID which takes the same form as in `OfpExperimenter`.
        experimenter: u32,
    },
}

/// Meter configuration (controller -> datapath).
#[derive(Debug)]
pub struct OfpMeterMod {
    /// One of OfpMeterModCommand.
    pub command: u16,
    /// Bitmap of OfpMeterFlags.
    pub flags: u16,
    /// Meter instance.
    pub meter_id: u32,
    /// The band list length is inferred from the length field in the header.
    pub bands: Vec<OfpMeterBand>,
}

/* ## ---------------------------- ## */
/* ## OpenFlow Port Modification.  ## */
/* ## ---------------------------- ## */

/// Modify behavior of the physical port
#[derive(Debug)]
pub struct OfpPortMod {
    /// Port number; must fit into 16 bits in 1.0.
    pub port_no: u32,
    /// The hardware address is not configurable. This is used to
    /// sanity-check the request, so it must be the same as returned
    /// in an `OfpPort` struct.
    pub hw_addr: [u8; 6],
    /// Bitmap of OFPPC_* flags.
    pub config: u32,
    /// Bitmap of OFPPC_* flags to be changed.
    pub mask: u32,
    /// Bitmap of OFPPF_*. Zero all bits to prevent any action taking place.
    pub advertise: u32,
}

/// Experimenter extension (controller -> datapath).
#[derive(Debug)]
pub struct OfpExperimenter {
    /// Experimenter ID.
    pub experimenter: u32,
    /// Experimenter defined.
    pub exp_type: u32,
    /// Experimenter-defined arbitrary additional data.
    pub data: Vec<u8>,
}

/// Error message (datapath -> controller).
#[derive(Debug)]
pub struct OfpErrorMsg {
    typ: u16,
    code: u16,
    /// Variable-length data. Interpreted based on the type and code. No padding.
    data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_moved_after_1_0() {
        assert_eq!(16, OfpType::StatsRequest.code(OFP_VERSION_1_0));
        assert_eq!(18, OfpType::StatsRequest.code(OFP_VERSION_1_3));
        assert_eq!(15, OfpType::PortMod.code(OFP_VERSION_1_0));
        assert_eq!(16, OfpType::PortMod.code(OFP_VERSION_1_2));
        assert_eq!(14, OfpType::FlowMod.code(OFP_VERSION_1_0));
    }

    #[test]
    fn type_lookup_respects_version() {
        assert_eq!(Some(OfpType::StatsReply), OfpType::from_code(OFP_VERSION_1_0, 17));
        assert_eq!(Some(OfpType::StatsReply), OfpType::from_code(OFP_VERSION_1_3, 19));
        assert_eq!(Some(OfpType::BarrierRequest), OfpType::from_code(OFP_VERSION_1_0, 18));
        assert_eq!(Some(OfpType::PortMod), OfpType::from_code(OFP_VERSION_1_2, 16));
        assert_eq!(None, OfpType::from_code(OFP_VERSION_1_0, 29));
        assert_eq!(Some(OfpType::MeterMod), OfpType::from_code(OFP_VERSION_1_3, 29));
    }

    #[test]
    fn masked_oxm_tlv() {
        let tlv = OfpOxmTlv::new(
            OxmOfbMatchFields::Ipv4Src,
            &[10, 0, 0, 0],
            Some(&[255, 255, 255, 0]),
        );
        assert_eq!(Some(OxmOfbMatchFields::Ipv4Src), tlv.basic_field());
        assert_eq!(&[10, 0, 0, 0], tlv.value());
        assert_eq!(Some(&[255u8, 255, 255, 0][..]), tlv.mask());
    }

    #[test]
    fn field_numbers() {
        assert_eq!(Some(OxmOfbMatchFields::ArpOp), OxmOfbMatchFields::from_u8(21));
        assert_eq!(Some(OxmOfbMatchFields::Ipv6Exthdr), OxmOfbMatchFields::from_u8(39));
        assert_eq!(None, OxmOfbMatchFields::from_u8(40));
        assert!(OxmOfbMatchFields::TunnelId.since_1_3());
        assert!(!OxmOfbMatchFields::MplsTc.since_1_3());
    }
}
