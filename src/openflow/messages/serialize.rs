/*!
All serialization and construction routines for the OpenFlow message primitives

Use the trait `OfpPacket` for serialization implementations of messages
that are sent. Other primitives that are part of a message should
implement a serialize funtion that operates on a given byte stream.
The protocol version is passed along because some layouts and type codes
differ between versions.
*/

use byteorder::{NetworkEndian, WriteBytesExt};
use crate::openflow::messages::*;
use std::io;
use std::io::Write;
use std::mem::size_of;

/// Writes `len` zero bytes
pub fn pad<S: Write>(stream: &mut S, len: usize) -> io::Result<()> {
    stream.write_all(&vec![0; len])
}

/// Rounds `len` up to the next multiple of 8
pub fn align8(len: usize) -> usize {
    (len + 7) / 8 * 8
}

impl OfpHeader {
    /// Constructs an `OfpHeader` of a message without body
    pub fn new(version: u8, typ: OfpType, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ: typ.code(version),
            length: OfpHeader::header_length() as u16,
            xid,
        }
    }

    /// Returns the fixed header length of 8 (in byte)
    pub fn header_length() -> usize {
        size_of::<OfpHeader>()
    }

    /// Serializes this header on the given stream
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_all(&[self.version, self.typ])?;
        stream.write_u16::<NetworkEndian>(self.length)?;
        stream.write_u32::<NetworkEndian>(self.xid)
    }

    /// Serializes this header into a new buffer
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = vec![];
        self.serialize(&mut buf)?;
        Ok(buf)
    }
}

impl OfpMatch {
    /// Constructs an empty match.
    pub fn new() -> OfpMatch {
        OfpMatch {
            typ: OfpMatchType::Oxm as u16,
            oxm_fields: vec![],
        }
    }

    /// Adds a single match field to the match.
    pub fn add_tlv(&mut self, oxm_tlv: OfpOxmTlv) -> &mut OfpMatch {
        self.oxm_fields.push(oxm_tlv);
        self
    }

    /// Length of OfpMatch (excluding padding)
    fn length(&self) -> usize {
        let mut length = 4;
        for oxm in &self.oxm_fields {
            length += oxm.length();
        }
        length
    }

    /// Padding of OfpMatch
    fn pad_len(&self) -> usize {
        let len = self.length();
        align8(len) - len
    }

    /// Serializes the match including its trailing padding
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.typ)?;
        stream.write_u16::<NetworkEndian>(self.length() as u16)?;
        for oxm in &self.oxm_fields {
            oxm.serialize(stream)?;
        }
        // make its overall size a multiple of 8; fill with zeros
        pad(stream, self.pad_len())
    }
}

impl OfpOxmTlv {
    fn length(&self) -> usize {
        4 + self.body.len()
    }

    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let class = u32::from(self.class);
        let hasmask_u32 = if self.hasmask { 1 } else { 0 };
        let header = (class << 16) | (u32::from(self.field) << 9) | (hasmask_u32 << 8)
            | self.body.len() as u32;
        stream.write_u32::<NetworkEndian>(header)?;
        stream.write_all(&self.body)
    }
}

impl OfpAction {
    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        match *self {
            OfpAction::Output { port, max_len } => {
                stream.write_u16::<NetworkEndian>(OfpActionType::Output as u16)?;
                stream.write_u16::<NetworkEndian>(16)?;
                stream.write_u32::<NetworkEndian>(port)?;
                stream.write_u16::<NetworkEndian>(max_len)?;
                pad(stream, 6)
            }
            OfpAction::CopyTtlOut => Self::serialize_empty(stream, OfpActionType::CopyTtlOut),
            OfpAction::CopyTtlIn => Self::serialize_empty(stream, OfpActionType::CopyTtlIn),
            OfpAction::DecMplsTtl => Self::serialize_empty(stream, OfpActionType::DecMplsTtl),
            OfpAction::PopVlan => Self::serialize_empty(stream, OfpActionType::PopVlan),
            OfpAction::DecNwTtl => Self::serialize_empty(stream, OfpActionType::DecNwTtl),
            OfpAction::PopPbb => Self::serialize_empty(stream, OfpActionType::PopPbb),
            OfpAction::SetMplsTtl(ttl) => Self::serialize_ttl(stream, OfpActionType::SetMplsTtl, ttl),
            OfpAction::SetNwTtl(ttl) => Self::serialize_ttl(stream, OfpActionType::SetNwTtl, ttl),
            OfpAction::PushVlan(eth) => Self::serialize_ethertype(stream, OfpActionType::PushVlan, eth),
            OfpAction::PushMpls(eth) => Self::serialize_ethertype(stream, OfpActionType::PushMpls, eth),
            OfpAction::PopMpls(eth) => Self::serialize_ethertype(stream, OfpActionType::PopMpls, eth),
            OfpAction::PushPbb(eth) => Self::serialize_ethertype(stream, OfpActionType::PushPbb, eth),
            OfpAction::SetQueue(id) => Self::serialize_id(stream, OfpActionType::SetQueue, id),
            OfpAction::Group(id) => Self::serialize_id(stream, OfpActionType::Group, id),
            OfpAction::SetField(ref tlv) => {
                let len = align8(4 + tlv.length());
                stream.write_u16::<NetworkEndian>(OfpActionType::SetField as u16)?;
                stream.write_u16::<NetworkEndian>(len as u16)?;
                tlv.serialize(stream)?;
                pad(stream, len - 4 - tlv.length())
            }
            OfpAction::Unknown { typ, ref body } => {
                stream.write_u16::<NetworkEndian>(typ)?;
                stream.write_u16::<NetworkEndian>(4 + body.len() as u16)?;
                stream.write_all(body)
            }
        }
    }

    fn serialize_empty<S: Write>(stream: &mut S, typ: OfpActionType) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(8)?;
        pad(stream, 4)
    }

    fn serialize_ttl<S: Write>(stream: &mut S, typ: OfpActionType, ttl: u8) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(8)?;
        stream.write_u8(ttl)?;
        pad(stream, 3)
    }

    fn serialize_ethertype<S: Write>(stream: &mut S, typ: OfpActionType, eth: u16) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(8)?;
        stream.write_u16::<NetworkEndian>(eth)?;
        pad(stream, 2)
    }

    fn serialize_id<S: Write>(stream: &mut S, typ: OfpActionType, id: u32) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(8)?;
        stream.write_u32::<NetworkEndian>(id)
    }

    /// Serializes a list of actions
    pub fn serialize_all<S: Write>(actions: &[OfpAction], stream: &mut S) -> io::Result<()> {
        for action in actions {
            action.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpInstruction {
    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        match *self {
            OfpInstruction::GotoTable(table_id) => {
                stream.write_u16::<NetworkEndian>(OfpInstructionType::GotoTable as u16)?;
                stream.write_u16::<NetworkEndian>(8)?;
                stream.write_u8(table_id)?;
                pad(stream, 3)
            }
            OfpInstruction::WriteMetadata { metadata, metadata_mask } => {
                stream.write_u16::<NetworkEndian>(OfpInstructionType::WriteMetadata as u16)?;
                stream.write_u16::<NetworkEndian>(24)?;
                pad(stream, 4)?;
                stream.write_u64::<NetworkEndian>(metadata)?;
                stream.write_u64::<NetworkEndian>(metadata_mask)
            }
            OfpInstruction::WriteActions(ref actions) => {
                Self::serialize_actions(stream, OfpInstructionType::WriteActions, actions)
            }
            OfpInstruction::ApplyActions(ref actions) => {
                Self::serialize_actions(stream, OfpInstructionType::ApplyActions, actions)
            }
            OfpInstruction::ClearActions => {
                stream.write_u16::<NetworkEndian>(OfpInstructionType::ClearActions as u16)?;
                stream.write_u16::<NetworkEndian>(8)?;
                pad(stream, 4)
            }
            OfpInstruction::Meter(meter_id) => {
                stream.write_u16::<NetworkEndian>(OfpInstructionType::Meter as u16)?;
                stream.write_u16::<NetworkEndian>(8)?;
                stream.write_u32::<NetworkEndian>(meter_id)
            }
            OfpInstruction::Unknown { typ, ref body } => {
                stream.write_u16::<NetworkEndian>(typ)?;
                stream.write_u16::<NetworkEndian>(4 + body.len() as u16)?;
                stream.write_all(body)
            }
        }
    }

    fn serialize_actions<S: Write>(
        stream: &mut S,
        typ: OfpInstructionType,
        actions: &[OfpAction],
    ) -> io::Result<()> {
        let buf = &mut vec![];
        OfpAction::serialize_all(actions, buf)?;
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(8 + buf.len() as u16)?;
        pad(stream, 4)?;
        stream.write_all(buf)
    }
}

impl OfpFlowMod {
    /// Constructs an `OfpFlowMod` with the given fields.
    /// The other fields are set to their protocol defaults
    /// and can be overwritten afterwards.
    pub fn new(
        command: OfpFlowModCommand,
        table_id: u8,
        priority: u16,
        match_field: OfpMatch,
        instructions: Vec<OfpInstruction>,
    ) -> OfpFlowMod {
        OfpFlowMod {
            cookie: 0,
            cookie_mask: 0,
            table_id,
            command: command as u8,
            idle_timeout: OFP_FLOW_PERMANENT,
            hard_timeout: OFP_FLOW_PERMANENT,
            priority,
            buffer_id: OFP_NO_BUFFER,
            out_port: OFPP_ANY,
            out_group: OFPG_ANY,
            flags: 0,
            match_field,
            instructions,
        }
    }
}

impl OfpStatsRequest {
    /// Constructs a stats request of the given kind with a type specific body
    pub fn new(stats_type: OfpStatsType, body: Vec<u8>) -> OfpStatsRequest {
        OfpStatsRequest {
            stats_type: stats_type as u16,
            flags: 0,
            body,
        }
    }
}

impl OfpFlowStatsRequest {
    /// A request matching all flows of all tables
    pub fn all() -> OfpFlowStatsRequest {
        OfpFlowStatsRequest {
            table_id: OFPTT_ALL,
            out_port: OFPP_ANY,
            out_group: OFPG_ANY,
            cookie: 0,
            cookie_mask: 0,
            match_field: OfpMatch::new(),
        }
    }

    /// Serializes the request body
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u8(self.table_id)?;
        pad(stream, 3)?;
        stream.write_u32::<NetworkEndian>(self.out_port)?;
        stream.write_u32::<NetworkEndian>(self.out_group)?;
        pad(stream, 4)?;
        stream.write_u64::<NetworkEndian>(self.cookie)?;
        stream.write_u64::<NetworkEndian>(self.cookie_mask)?;
        self.match_field.serialize(stream)
    }
}

impl OfpBucket {
    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let actions = &mut vec![];
        OfpAction::serialize_all(&self.actions, actions)?;
        stream.write_u16::<NetworkEndian>(16 + actions.len() as u16)?;
        stream.write_u16::<NetworkEndian>(self.weight)?;
        stream.write_u32::<NetworkEndian>(self.watch_port)?;
        stream.write_u32::<NetworkEndian>(self.watch_group)?;
        pad(stream, 4)?;
        stream.write_all(actions)
    }
}

impl OfpMeterBand {
    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let (typ, rate, burst_size) = match *self {
            OfpMeterBand::Drop { rate, burst_size } => (OfpMeterBandType::Drop, rate, burst_size),
            OfpMeterBand::DscpRemark { rate, burst_size, .. } => {
                (OfpMeterBandType::DscpRemark, rate, burst_size)
            }
            OfpMeterBand::Experimenter { rate, burst_size, .. } => {
                (OfpMeterBandType::Experimenter, rate, burst_size)
            }
        };
        stream.write_u16::<NetworkEndian>(typ as u16)?;
        stream.write_u16::<NetworkEndian>(16)?;
        stream.write_u32::<NetworkEndian>(rate)?;
        stream.write_u32::<NetworkEndian>(burst_size)?;
        match *self {
            OfpMeterBand::Drop { .. } => pad(stream, 4),
            OfpMeterBand::DscpRemark { prec_level, .. } => {
                stream.write_u8(prec_level)?;
                pad(stream, 3)
            }
            OfpMeterBand::Experimenter { experimenter, .. } => {
                stream.write_u32::<NetworkEndian>(experimenter)
            }
        }
    }
}

/// An OpenFlow packet. Must be implemented for all OpenFlow messsages that are sent.
pub trait OfpPacket {
    /// Constructs an OfpHeader with the given body length and transaction ID
    fn header(&self, version: u8, body_length: usize, xid: u32) -> OfpHeader {
        OfpHeader {
            version,
            typ: Self::typ().code(version),
            length: (OfpHeader::header_length() + body_length) as u16,
            xid,
        }
    }

    /// Returns the packet's type
    fn typ() -> OfpType;

    /// Serializes this packet with network byte order.
    /// The xid is used as its header's transaction id.
    fn serialize<S: Write>(&self, stream: &mut S, version: u8, xid: u32) -> io::Result<()> {
        let mut body = vec![];
        self.serialize_body(&mut body, version)?;
        if OfpHeader::header_length() + body.len() > 0xffff {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "OpenFlow message exceeds 65535 bytes",
            ));
        }
        let header = self.header(version, body.len(), xid);
        debug!("Outgoing message: {:?}", header);
        header.serialize(stream)?;
        stream.write_all(&body)
    }

    /// Serializes this packet into a new buffer
    fn to_bytes(&self, version: u8, xid: u32) -> io::Result<Vec<u8>> {
        let mut buf = vec![];
        self.serialize(&mut buf, version, xid)?;
        Ok(buf)
    }

    /// Serializes this packet's body.
    /// Implementers have to output network byte order on the given stream.
    fn serialize_body<S: Write>(&self, stream: &mut S, version: u8) -> io::Result<()>;
}

impl OfpEchoReply {
    /// Constructs a new `OfpEchoReply` with `arbitrary` content.
    /// This should be the same as in the `OfpEchoRequest` that issued this reply.
    pub fn new(arbitrary: Vec<u8>) -> OfpEchoReply {
        OfpEchoReply { arbitrary }
    }
}
impl OfpPacket for OfpEchoReply {
    fn typ() -> OfpType {
        OfpType::EchoReply
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_all(&self.arbitrary)
    }
}

impl OfpPacket for OfpErrorMsg {
    fn typ() -> OfpType {
        OfpType::Error
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.typ)?;
        stream.write_u16::<NetworkEndian>(self.code)?;
        stream.write_all(&self.data)
    }
}

impl OfpPacket for OfpFlowMod {
    fn typ() -> OfpType {
        OfpType::FlowMod
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_u64::<NetworkEndian>(self.cookie)?;
        stream.write_u64::<NetworkEndian>(self.cookie_mask)?;
        stream.write_all(&[self.table_id, self.command])?;
        stream.write_u16::<NetworkEndian>(self.idle_timeout)?;
        stream.write_u16::<NetworkEndian>(self.hard_timeout)?;
        stream.write_u16::<NetworkEndian>(self.priority)?;
        stream.write_u32::<NetworkEndian>(self.buffer_id)?;
        stream.write_u32::<NetworkEndian>(self.out_port)?;
        stream.write_u32::<NetworkEndian>(self.out_group)?;
        stream.write_u16::<NetworkEndian>(self.flags)?;
        pad(stream, 2)?;
        self.match_field.serialize(stream)?;
        for instr in &self.instructions {
            instr.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpPacket for OfpStatsRequest {
    fn typ() -> OfpType {
        OfpType::StatsRequest
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, version: u8) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.stats_type)?;
        stream.write_u16::<NetworkEndian>(self.flags)?;
        if version != OFP_VERSION_1_0 {
            pad(stream, 4)?;
        }
        stream.write_all(&self.body)
    }
}

impl OfpPacket for OfpGroupMod {
    fn typ() -> OfpType {
        OfpType::GroupMod
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.command)?;
        stream.write_u8(self.typ)?;
        pad(stream, 1)?;
        stream.write_u32::<NetworkEndian>(self.group_id)?;
        for bucket in &self.buckets {
            bucket.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpPacket for OfpMeterMod {
    fn typ() -> OfpType {
        OfpType::MeterMod
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.command)?;
        stream.write_u16::<NetworkEndian>(self.flags)?;
        stream.write_u32::<NetworkEndian>(self.meter_id)?;
        for band in &self.bands {
            band.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpPacket for OfpPortMod {
    fn typ() -> OfpType {
        OfpType::PortMod
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, version: u8) -> io::Result<()> {
        if version == OFP_VERSION_1_0 {
            stream.write_u16::<NetworkEndian>(self.port_no as u16)?;
            stream.write_all(&self.hw_addr)?;
        }
        else {
            stream.write_u32::<NetworkEndian>(self.port_no)?;
            pad(stream, 4)?;
            stream.write_all(&self.hw_addr)?;
            pad(stream, 2)?;
        }
        stream.write_u32::<NetworkEndian>(self.config)?;
        stream.write_u32::<NetworkEndian>(self.mask)?;
        stream.write_u32::<NetworkEndian>(self.advertise)?;
        pad(stream, 4)
    }
}

impl OfpPacket for OfpExperimenter {
    fn typ() -> OfpType {
        OfpType::Experimenter
    }

    fn serialize_body<S: Write>(&self, stream: &mut S, _version: u8) -> io::Result<()> {
        stream.write_u32::<NetworkEndian>(self.experimenter)?;
        stream.write_u32::<NetworkEndian>(self.exp_type)?;
        stream.write_all(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_reply_header() {
        let xid = 42;
        let expected = OfpHeader {
            version: 4,
            typ: 3,
            length: 8,
            xid,
        };
        let testee = OfpEchoReply { arbitrary: vec![] };
        assert_eq!(expected, testee.header(OFP_VERSION_1_3, 0, xid));
    }

    #[test]
    fn echo_reply_body_serialization() {
        let testee = OfpEchoReply {
            arbitrary: vec![1, 2, 3, 4],
        };
        let mut ser = vec![];
        testee.serialize_body(&mut ser, OFP_VERSION_1_3).unwrap();
        assert_eq!(vec![1, 2, 3, 4], ser);
        assert_eq!(12, testee.header(OFP_VERSION_1_3, ser.len(), 1).length);
    }

    #[test]
    fn oxm_tlv_serialization() {
        let testee = OfpOxmTlv::new(OxmOfbMatchFields::InPort, &[0x11, 0x22, 0x33, 0x44], None);
        assert_eq!(8, testee.length());
        let mut ser = vec![];
        testee.serialize(&mut ser).unwrap();
        assert_eq!(vec![0x80, 0x00, 0x00, 0x04, 0x11, 0x22, 0x33, 0x44], ser);
    }

    #[test]
    fn masked_oxm_tlv_serialization() {
        let testee = OfpOxmTlv::new(
            OxmOfbMatchFields::Ipv4Dst,
            &[192, 0, 2, 0],
            Some(&[255, 255, 255, 0]),
        );
        let mut ser = vec![];
        testee.serialize(&mut ser).unwrap();
        // field 12 << 1 | hasmask
        assert_eq!(vec![0x80, 0x00, 0x19, 0x08], ser[..4].to_vec());
        assert_eq!(12, ser.len());
    }

    #[test]
    fn match_serialization() {
        let tlv = OfpOxmTlv::new(OxmOfbMatchFields::InPort, &[0, 0, 0, 1], None);
        let mut testee = OfpMatch::new();
        testee.add_tlv(tlv);
        assert_eq!(12, testee.length());
        assert_eq!(4, testee.pad_len());
        let mut ser = vec![];
        testee.serialize(&mut ser).unwrap();
        assert_eq!(16, ser.len());
    }

    #[test]
    fn empty_match_is_padded() {
        let mut ser = vec![];
        OfpMatch::new().serialize(&mut ser).unwrap();
        assert_eq!(vec![0, 1, 0, 4, 0, 0, 0, 0], ser);
    }

    #[test]
    fn action_output_serialization() {
        let testee = OfpAction::Output {
            port: 0x11223344,
            max_len: 0,
        };
        let mut ser = vec![];
        testee.serialize(&mut ser).unwrap();
        assert_eq!(
            vec![0, 0, 0, 16, 0x11, 0x22, 0x33, 0x44, 0, 0, 0, 0, 0, 0, 0, 0],
            ser
        );
    }

    #[test]
    fn set_field_action_is_aligned() {
        let tlv = OfpOxmTlv::new(OxmOfbMatchFields::EthDst, &[0, 1, 2, 3, 4, 5], None);
        let mut ser = vec![];
        OfpAction::SetField(tlv).serialize(&mut ser).unwrap();
        assert_eq!(16, ser.len());
        assert_eq!(vec![0, 25, 0, 16], ser[..4].to_vec());
    }

    #[test]
    fn stats_request_padding_depends_on_version() {
        let req = OfpStatsRequest::new(OfpStatsType::Desc, vec![]);
        let v10 = req.to_bytes(OFP_VERSION_1_0, 7).unwrap();
        let v13 = req.to_bytes(OFP_VERSION_1_3, 7).unwrap();
        assert_eq!(12, v10.len());
        assert_eq!(16, v13.len());
        assert_eq!(16, v10[1]);
        assert_eq!(18, v13[1]);
        assert_eq!(vec![0, 0, 0, 7], v13[4..8].to_vec());
    }

    #[test]
    fn flow_stats_request_length() {
        let mut ser = vec![];
        OfpFlowStatsRequest::all().serialize(&mut ser).unwrap();
        assert_eq!(40, ser.len());
        assert_eq!(OFPTT_ALL, ser[0]);
    }

    #[test]
    fn flow_mod_length() {
        let output = OfpAction::Output { port: 2, max_len: OFPCML_MAX };
        let flow_mod = OfpFlowMod::new(
            OfpFlowModCommand::Add,
            0,
            OFP_DEFAULT_PRIORITY,
            OfpMatch::new(),
            vec![OfpInstruction::ApplyActions(vec![output])],
        );
        let ser = flow_mod.to_bytes(OFP_VERSION_1_3, 1).unwrap();
        // header, fixed part, empty match, instruction header, output action
        assert_eq!(8 + 40 + 8 + 8 + 16, ser.len());
        assert_eq!(14, ser[1]);
    }

    #[test]
    fn group_mod_bucket_length() {
        let group_mod = OfpGroupMod {
            command: OfpGroupModCommand::Add as u16,
            typ: OfpGroupType::All as u8,
            group_id: 1,
            buckets: vec![OfpBucket {
                weight: 0,
                watch_port: OFPP_ANY,
                watch_group: OFPG_ANY,
                actions: vec![OfpAction::Output { port: 1, max_len: 0 }],
            }],
        };
        let mut ser = vec![];
        group_mod.serialize_body(&mut ser, OFP_VERSION_1_3).unwrap();
        assert_eq!(8 + 16 + 16, ser.len());
        assert_eq!(vec![0, 32], ser[8..10].to_vec());
    }

    #[test]
    fn port_mod_layouts() {
        let port_mod = OfpPortMod {
            port_no: 1,
            hw_addr: [0, 1, 2, 3, 4, 5],
            config: 1,
            mask: 1,
            advertise: 0,
        };
        let mut v10 = vec![];
        port_mod.serialize_body(&mut v10, OFP_VERSION_1_0).unwrap();
        let mut v13 = vec![];
        port_mod.serialize_body(&mut v13, OFP_VERSION_1_3).unwrap();
        assert_eq!(24, v10.len());
        assert_eq!(32, v13.len());
        assert_eq!(vec![0, 1, 0, 1], v10[..4].to_vec());
        assert_eq!(vec![0, 1, 2, 3, 4, 5], v13[8..14].to_vec());
    }

    #[test]
    fn meter_mod_serialization() {
        let meter_mod = OfpMeterMod {
            command: OfpMeterModCommand::Add as u16,
            flags: OfpMeterFlags::Kbps as u16,
            meter_id: 1,
            bands: vec![OfpMeterBand::DscpRemark {
                rate: 1000,
                burst_size: 10,
                prec_level: 1,
            }],
        };
        let ser = meter_mod.to_bytes(OFP_VERSION_1_3, 1).unwrap();
        assert_eq!(8 + 8 + 16, ser.len());
        assert_eq!(29, ser[1]);
        assert_eq!(vec![0, 2, 0, 16], ser[16..20].to_vec());
        assert_eq!(1, ser[28]);
    }
}
