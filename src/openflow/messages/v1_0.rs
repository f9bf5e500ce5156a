/*!
The fixed-layout OpenFlow 1.0 structures

OpenFlow 1.0 predates the extensible match and the instruction model.
Its match is a 40 byte structure with a wildcard bitmap, its flow mod
carries a plain action list, and ports are 16 bit wide.
*/

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use crate::openflow::messages::deserialize::skip;
use crate::openflow::messages::serialize::{pad, OfpPacket};
use crate::openflow::messages::OfpType;
use std::io;
use std::io::{Cursor, Read, Write};

/// Not associated with a physical port.
pub const OFPP_NONE: u16 = 0xffff;
/// Highest physical port number.
pub const OFPP_MAX: u16 = 0xff00;

/* Flow wildcards. */
/// Switch input port.
pub const OFPFW_IN_PORT: u32 = 1 << 0;
/// VLAN id.
pub const OFPFW_DL_VLAN: u32 = 1 << 1;
/// Ethernet source address.
pub const OFPFW_DL_SRC: u32 = 1 << 2;
/// Ethernet destination address.
pub const OFPFW_DL_DST: u32 = 1 << 3;
/// Ethernet frame type.
pub const OFPFW_DL_TYPE: u32 = 1 << 4;
/// IP protocol.
pub const OFPFW_NW_PROTO: u32 = 1 << 5;
/// TCP/UDP source port.
pub const OFPFW_TP_SRC: u32 = 1 << 6;
/// TCP/UDP destination port.
pub const OFPFW_TP_DST: u32 = 1 << 7;
/// IP source address wildcard bit count shift.
pub const OFPFW_NW_SRC_SHIFT: u32 = 8;
/// IP source address wildcard bit count mask.
pub const OFPFW_NW_SRC_MASK: u32 = 0x3f << OFPFW_NW_SRC_SHIFT;
/// IP destination address wildcard bit count shift.
pub const OFPFW_NW_DST_SHIFT: u32 = 14;
/// IP destination address wildcard bit count mask.
pub const OFPFW_NW_DST_MASK: u32 = 0x3f << OFPFW_NW_DST_SHIFT;
/// VLAN priority.
pub const OFPFW_DL_VLAN_PCP: u32 = 1 << 20;
/// IP ToS (DSCP field, 6 bits).
pub const OFPFW_NW_TOS: u32 = 1 << 21;
/// Wildcard all fields.
pub const OFPFW_ALL: u32 = (1 << 22) - 1;

/// Widens a 16 bit port number, mapping the reserved range to its 32 bit counterpart
pub fn port_from_u16(port: u16) -> u32 {
    if port > OFPP_MAX {
        0xffff_0000 | u32::from(port)
    }
    else {
        u32::from(port)
    }
}

/// Narrows a 32 bit port number if it can be expressed in 1.0
pub fn port_to_u16(port: u32) -> Option<u16> {
    if port <= u32::from(OFPP_MAX) || port > 0xffff_ff00 {
        Some(port as u16)
    }
    else {
        None
    }
}

/// Fields to match against flows
#[derive(Debug, Clone, PartialEq)]
pub struct Ofp10Match {
    /// Wildcard fields.
    pub wildcards: u32,
    /// Input switch port.
    pub in_port: u16,
    /// Ethernet source address.
    pub dl_src: [u8; 6],
    /// Ethernet destination address.
    pub dl_dst: [u8; 6],
    /// Input VLAN id.
    pub dl_vlan: u16,
    /// Input VLAN priority.
    pub dl_vlan_pcp: u8,
    /// Ethernet frame type.
    pub dl_type: u16,
    /// IP ToS (actually DSCP field, 6 bits).
    pub nw_tos: u8,
    /// IP protocol or lower 8 bits of ARP opcode.
    pub nw_proto: u8,
    /// IP source address.
    pub nw_src: u32,
    /// IP destination address.
    pub nw_dst: u32,
    /// TCP/UDP source port.
    pub tp_src: u16,
    /// TCP/UDP destination port.
    pub tp_dst: u16,
}

impl Default for Ofp10Match {
    fn default() -> Ofp10Match {
        Ofp10Match {
            wildcards: OFPFW_ALL,
            in_port: 0,
            dl_src: [0; 6],
            dl_dst: [0; 6],
            dl_vlan: 0,
            dl_vlan_pcp: 0,
            dl_type: 0,
            nw_tos: 0,
            nw_proto: 0,
            nw_src: 0,
            nw_dst: 0,
            tp_src: 0,
            tp_dst: 0,
        }
    }
}

impl Ofp10Match {
    /// Wire size of the match
    pub const LENGTH: usize = 40;

    /// Clears the wildcard bit(s) of a field that is matched exactly
    pub fn unwildcard(&mut self, bits: u32) {
        self.wildcards &= !bits;
    }

    /// Sets the IP source prefix length
    pub fn set_nw_src_prefix(&mut self, prefix: u8) {
        self.wildcards = Self::with_prefix(self.wildcards, OFPFW_NW_SRC_SHIFT, prefix);
    }

    /// Sets the IP destination prefix length
    pub fn set_nw_dst_prefix(&mut self, prefix: u8) {
        self.wildcards = Self::with_prefix(self.wildcards, OFPFW_NW_DST_SHIFT, prefix);
    }

    /// The IP source prefix length, 0 if fully wildcarded
    pub fn nw_src_prefix(&self) -> u8 {
        Self::prefix(self.wildcards, OFPFW_NW_SRC_SHIFT)
    }

    /// The IP destination prefix length, 0 if fully wildcarded
    pub fn nw_dst_prefix(&self) -> u8 {
        Self::prefix(self.wildcards, OFPFW_NW_DST_SHIFT)
    }

    fn with_prefix(wildcards: u32, shift: u32, prefix: u8) -> u32 {
        let wild_bits = 32 - u32::from(prefix.min(32));
        (wildcards & !(0x3f << shift)) | (wild_bits << shift)
    }

    fn prefix(wildcards: u32, shift: u32) -> u8 {
        let wild_bits = (wildcards >> shift) & 0x3f;
        if wild_bits >= 32 {
            0
        }
        else {
            (32 - wild_bits) as u8
        }
    }

    /// Serializes the 40 byte match
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u32::<NetworkEndian>(self.wildcards)?;
        stream.write_u16::<NetworkEndian>(self.in_port)?;
        stream.write_all(&self.dl_src)?;
        stream.write_all(&self.dl_dst)?;
        stream.write_u16::<NetworkEndian>(self.dl_vlan)?;
        stream.write_u8(self.dl_vlan_pcp)?;
        pad(stream, 1)?;
        stream.write_u16::<NetworkEndian>(self.dl_type)?;
        stream.write_u8(self.nw_tos)?;
        stream.write_u8(self.nw_proto)?;
        pad(stream, 2)?;
        stream.write_u32::<NetworkEndian>(self.nw_src)?;
        stream.write_u32::<NetworkEndian>(self.nw_dst)?;
        stream.write_u16::<NetworkEndian>(self.tp_src)?;
        stream.write_u16::<NetworkEndian>(self.tp_dst)
    }

    /// Reads the 40 byte match
    pub fn read<R: Read>(stream: &mut R) -> io::Result<Ofp10Match> {
        let wildcards = stream.read_u32::<NetworkEndian>()?;
        let in_port = stream.read_u16::<NetworkEndian>()?;
        let mut dl_src = [0; 6];
        stream.read_exact(&mut dl_src)?;
        let mut dl_dst = [0; 6];
        stream.read_exact(&mut dl_dst)?;
        let dl_vlan = stream.read_u16::<NetworkEndian>()?;
        let dl_vlan_pcp = stream.read_u8()?;
        skip(stream, 1)?;
        let dl_type = stream.read_u16::<NetworkEndian>()?;
        let nw_tos = stream.read_u8()?;
        let nw_proto = stream.read_u8()?;
        skip(stream, 2)?;
        Ok(Ofp10Match {
            wildcards,
            in_port,
            dl_src,
            dl_dst,
            dl_vlan,
            dl_vlan_pcp,
            dl_type,
            nw_tos,
            nw_proto,
            nw_src: stream.read_u32::<NetworkEndian>()?,
            nw_dst: stream.read_u32::<NetworkEndian>()?,
            tp_src: stream.read_u16::<NetworkEndian>()?,
            tp_dst: stream.read_u16::<NetworkEndian>()?,
        })
    }
}

/// An OpenFlow 1.0 action
#[derive(Debug, Clone, PartialEq)]
pub enum Ofp10Action {
    /// Output to switch port.
    Output {
        /// Output port.
        port: u16,
        /// Max length to send to controller.
        max_len: u16,
    },
    /// Set the 802.1q VLAN id.
    SetVlanVid(u16),
    /// Set the 802.1q priority.
    SetVlanPcp(u8),
    /// Strip the 802.1q header.
    StripVlan,
    /// Ethernet source address.
    SetDlSrc([u8; 6]),
    /// Ethernet destination address.
    SetDlDst([u8; 6]),
    /// IP source address.
    SetNwSrc(u32),
    /// IP destination address.
    SetNwDst(u32),
    /// IP ToS (DSCP field, 6 bits).
    SetNwTos(u8),
    /// TCP/UDP source port.
    SetTpSrc(u16),
    /// TCP/UDP destination port.
    SetTpDst(u16),
    /// Output to queue.
    Enqueue {
        /// Port that queue belongs.
        port: u16,
        /// Where to enqueue the packets.
        queue_id: u32,
    },
    /// A vendor action or an unassigned type
    Unknown {
        /// The raw action type
        typ: u16,
        /// The raw action body after type and length
        body: Vec<u8>,
    },
}

impl Ofp10Action {
    fn typ(&self) -> u16 {
        match *self {
            Ofp10Action::Output { .. } => 0,
            Ofp10Action::SetVlanVid(_) => 1,
            Ofp10Action::SetVlanPcp(_) => 2,
            Ofp10Action::StripVlan => 3,
            Ofp10Action::SetDlSrc(_) => 4,
            Ofp10Action::SetDlDst(_) => 5,
            Ofp10Action::SetNwSrc(_) => 6,
            Ofp10Action::SetNwDst(_) => 7,
            Ofp10Action::SetNwTos(_) => 8,
            Ofp10Action::SetTpSrc(_) => 9,
            Ofp10Action::SetTpDst(_) => 10,
            Ofp10Action::Enqueue { .. } => 11,
            Ofp10Action::Unknown { typ, .. } => typ,
        }
    }

    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let mut body = vec![];
        match *self {
            Ofp10Action::Output { port, max_len } => {
                body.write_u16::<NetworkEndian>(port)?;
                body.write_u16::<NetworkEndian>(max_len)?;
            }
            Ofp10Action::SetVlanVid(vid) => {
                body.write_u16::<NetworkEndian>(vid)?;
                pad(&mut body, 2)?;
            }
            Ofp10Action::SetVlanPcp(v) | Ofp10Action::SetNwTos(v) => {
                body.write_u8(v)?;
                pad(&mut body, 3)?;
            }
            Ofp10Action::StripVlan => pad(&mut body, 4)?,
            Ofp10Action::SetDlSrc(addr) | Ofp10Action::SetDlDst(addr) => {
                body.write_all(&addr)?;
                pad(&mut body, 6)?;
            }
            Ofp10Action::SetNwSrc(addr) | Ofp10Action::SetNwDst(addr) => {
                body.write_u32::<NetworkEndian>(addr)?;
            }
            Ofp10Action::SetTpSrc(tp) | Ofp10Action::SetTpDst(tp) => {
                body.write_u16::<NetworkEndian>(tp)?;
                pad(&mut body, 2)?;
            }
            Ofp10Action::Enqueue { port, queue_id } => {
                body.write_u16::<NetworkEndian>(port)?;
                pad(&mut body, 6)?;
                body.write_u32::<NetworkEndian>(queue_id)?;
            }
            Ofp10Action::Unknown { ref body, .. } => {
                stream.write_u16::<NetworkEndian>(self.typ())?;
                stream.write_u16::<NetworkEndian>(4 + body.len() as u16)?;
                return stream.write_all(body);
            }
        }
        stream.write_u16::<NetworkEndian>(self.typ())?;
        stream.write_u16::<NetworkEndian>(4 + body.len() as u16)?;
        stream.write_all(&body)
    }

    /// Serializes a list of actions
    pub fn serialize_all<S: Write>(actions: &[Ofp10Action], stream: &mut S) -> io::Result<()> {
        for action in actions {
            action.serialize(stream)?;
        }
        Ok(())
    }

    /// Reads a list of actions that fills the whole buffer
    pub fn read_all(bytes: &[u8]) -> io::Result<Vec<Ofp10Action>> {
        let mut actions = vec![];
        let mut stream = Cursor::new(bytes);
        while (stream.position() as usize) < bytes.len() {
            let typ = stream.read_u16::<NetworkEndian>()?;
            let len = stream.read_u16::<NetworkEndian>()? as usize;
            if len < 8 {
                return Err(io::Error::new(io::ErrorKind::InvalidData, "action length too small"));
            }
            let mut body = vec![0; len - 4];
            stream.read_exact(&mut body)?;
            actions.push(Self::from_body(typ, body)?);
        }
        Ok(actions)
    }

    fn from_body(typ: u16, body: Vec<u8>) -> io::Result<Ofp10Action> {
        let mut stream = Cursor::new(&body[..]);
        let action = match typ {
            0 => Ofp10Action::Output {
                port: stream.read_u16::<NetworkEndian>()?,
                max_len: stream.read_u16::<NetworkEndian>()?,
            },
            1 => Ofp10Action::SetVlanVid(stream.read_u16::<NetworkEndian>()?),
            2 => Ofp10Action::SetVlanPcp(stream.read_u8()?),
            3 => Ofp10Action::StripVlan,
            4 | 5 => {
                let mut addr = [0; 6];
                stream.read_exact(&mut addr)?;
                if typ == 4 {
                    Ofp10Action::SetDlSrc(addr)
                }
                else {
                    Ofp10Action::SetDlDst(addr)
                }
            }
            6 => Ofp10Action::SetNwSrc(stream.read_u32::<NetworkEndian>()?),
            7 => Ofp10Action::SetNwDst(stream.read_u32::<NetworkEndian>()?),
            8 => Ofp10Action::SetNwTos(stream.read_u8()?),
            9 => Ofp10Action::SetTpSrc(stream.read_u16::<NetworkEndian>()?),
            10 => Ofp10Action::SetTpDst(stream.read_u16::<NetworkEndian>()?),
            11 => {
                let port = stream.read_u16::<NetworkEndian>()?;
                skip(&mut stream, 6)?;
                Ofp10Action::Enqueue {
                    port,
                    queue_id: stream.read_u32::<NetworkEndian>()?,
                }
            }
            _ => return Ok(Ofp10Action::Unknown { typ, body }),
        };
        Ok(action)
    }
}

/// Flow setup and teardown (controller -> datapath).
#[derive(Debug)]
pub struct Ofp10FlowMod {
    /// Fields to match.
    pub match_field: Ofp10Match,
    /// Opaque controller-issued identifier.
    pub cookie: u64,
    /// One of OfpFlowModCommand.
    pub command: u16,
    /// Idle time before discarding (seconds).
    pub idle_timeout: u16,
    /// Max time before discarding (seconds).
    pub hard_timeout: u16,
    /// Priority level of flow entry.
    pub priority: u16,
    /// Buffered packet to apply to (or -1).
    pub buffer_id: u32,
    /// For delete commands, require matching entries
    /// to include this as an output port.
    pub out_port: u16,
    /// One of OFPFF_*.
    pub flags: u16,
    /// The action length is inferred from the length field in the header.
    pub actions: Vec<Ofp10Action>,
}

impl OfpPacket for Ofp10FlowMod {
    fn typ() -> OfpType {
        OfpType::FlowMod
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        self.match_field.serialize(stream)?;
        stream.write_u64::<NetworkEndian>(self.cookie)?;
        stream.write_u16::<NetworkEndian>(self.command)?;
        stream.write_u16::<NetworkEndian>(self.idle_timeout)?;
        stream.write_u16::<NetworkEndian>(self.hard_timeout)?;
        stream.write_u16::<NetworkEndian>(self.priority)?;
        stream.write_u32::<NetworkEndian>(self.buffer_id)?;
        stream.write_u16::<NetworkEndian>(self.out_port)?;
        stream.write_u16::<NetworkEndian>(self.flags)?;
        Ofp10Action::serialize_all(&self.actions, stream)
    }
}

/// Body for flow and aggregate stats requests
#[derive(Debug)]
pub struct Ofp10FlowStatsRequest {
    /// Fields to match.
    pub match_field: Ofp10Match,
    /// ID of table to read, 0xff for all tables.
    pub table_id: u8,
    /// Require matching entries to include this
    /// as an output port. OFPP_NONE indicates no restriction.
    pub out_port: u16,
}

impl Ofp10FlowStatsRequest {
    /// Serializes the 44 byte request body
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        self.match_field.serialize(stream)?;
        stream.write_u8(self.table_id)?;
        pad(stream, 1)?;
        stream.write_u16::<NetworkEndian>(self.out_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow::messages::OFP_VERSION_1_0;

    #[test]
    fn port_widening() {
        assert_eq!(1, port_from_u16(1));
        assert_eq!(0xffff_fffd, port_from_u16(0xfffd));
        assert_eq!(Some(0xfffd), port_to_u16(0xffff_fffd));
        assert_eq!(Some(OFPP_NONE), port_to_u16(0xffff_ffff));
        assert_eq!(None, port_to_u16(0x1_0000));
    }

    #[test]
    fn match_layout() {
        let mut testee = Ofp10Match::default();
        testee.in_port = 3;
        testee.unwildcard(OFPFW_IN_PORT);
        testee.nw_src = 0x0a00_0000;
        testee.set_nw_src_prefix(8);
        let mut ser = vec![];
        testee.serialize(&mut ser).unwrap();
        assert_eq!(Ofp10Match::LENGTH, ser.len());
        assert_eq!(vec![0, 0x3f, 0xd8, 0xfe], ser[0..4].to_vec());
        assert_eq!(vec![0, 3], ser[4..6].to_vec());
        assert_eq!(8, testee.nw_src_prefix());
        assert_eq!(0, testee.nw_dst_prefix());
        assert_eq!(testee, Ofp10Match::read(&mut Cursor::new(&ser[..])).unwrap());
    }

    #[test]
    fn actions_read_back() {
        let actions = vec![
            Ofp10Action::SetDlDst([0, 1, 2, 3, 4, 5]),
            Ofp10Action::Enqueue { port: 1, queue_id: 7 },
            Ofp10Action::Output { port: 2, max_len: 0 },
        ];
        let mut ser = vec![];
        Ofp10Action::serialize_all(&actions, &mut ser).unwrap();
        assert_eq!(16 + 16 + 8, ser.len());
        assert_eq!(actions, Ofp10Action::read_all(&ser).unwrap());
    }

    #[test]
    fn flow_mod_length() {
        let flow_mod = Ofp10FlowMod {
            match_field: Ofp10Match::default(),
            cookie: 0,
            command: 0,
            idle_timeout: 0,
            hard_timeout: 0,
            priority: 0x8000,
            buffer_id: 0xffff_ffff,
            out_port: OFPP_NONE,
            flags: 0,
            actions: vec![Ofp10Action::Output { port: 2, max_len: 0 }],
        };
        let ser = flow_mod.to_bytes(OFP_VERSION_1_0, 1).unwrap();
        assert_eq!(8 + 64 + 8, ser.len());
        assert_eq!(14, ser[1]);
    }

    #[test]
    fn flow_stats_request_length() {
        let req = Ofp10FlowStatsRequest {
            match_field: Ofp10Match::default(),
            table_id: 0xff,
            out_port: OFPP_NONE,
        };
        let mut ser = vec![];
        req.serialize(&mut ser).unwrap();
        assert_eq!(44, ser.len());
    }
}
