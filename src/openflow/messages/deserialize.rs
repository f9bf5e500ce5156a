/*!
All deserialization routines for the OpenFlow message primitives

The header uses a special deserialization because its size is known.
Use the trait `Deserialize` for complete message bodies. The variable sized
parts that are embedded in stats replies (ports, matches, actions,
instructions, buckets and bands) are read from a byte stream.
*/

use byteorder::{ByteOrder, NetworkEndian, ReadBytesExt};
use crate::openflow::error::{Error, Result};
use crate::openflow::messages::serialize::align8;
use crate::openflow::messages::*;

use std::io;
use std::io::{Cursor, Read};
use std::mem::size_of;

impl OfpHeader {
    /// Deserializes an OpenFlow header
    pub fn deserialize(bytes: &[u8; 8]) -> OfpHeader {
        OfpHeader {
            version: bytes[0],
            typ: bytes[1],
            length: NetworkEndian::read_u16(&bytes[2..4]),
            xid: NetworkEndian::read_u32(&bytes[4..]),
        }
    }

    /// Returns the body length in byte.
    /// A length field smaller than the header itself yields 0.
    pub fn body_length(&self) -> usize {
        (self.length as usize).saturating_sub(OfpHeader::header_length())
    }
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Reads a fixed size, null padded string
pub fn read_fixed_str<R: Read>(stream: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0; len];
    stream.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Skips `len` bytes of padding
pub fn skip<R: Read>(stream: &mut R, len: usize) -> io::Result<()> {
    let mut buf = vec![0; len];
    stream.read_exact(&mut buf)
}

/// To be implemented by all OpenFlow messages that are received.
pub trait Deserialize {
    /// The type to deserialize
    type R;

    /// Deserialize the bytes buffer of a message with the given version
    /// Fails on providing a too small or too large buffer
    fn deserialize(version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        if Self::min_length(version) > bytes.len() || Self::max_length(version) < bytes.len() {
            return Err(Error::BadRequest(OfpBadRequestCode::BadLen, bytes));
        }
        Self::deserialize_len_ok(version, bytes)
    }

    /// Deserializes the byte buffer (network byte order)
    /// Implementers can rely on the bytes buffer's size to be greater or equal Self::min_length()
    fn deserialize_len_ok(version: u8, bytes: Vec<u8>) -> Result<Self::R>;

    /// The minimum length of the message body in bytes
    /// If Self::R contains dynamically sized fields,
    /// you probably have to override this implementation.
    fn min_length(_version: u8) -> usize {
        size_of::<Self::R>()
    }

    /// The maximum length of the message body in bytes
    /// May not return a value greater than 0xFFF7
    /// If Self::R is fixed size, you probably have to
    /// override this implementation.
    fn max_length(_version: u8) -> usize {
        0xffff - OfpHeader::header_length()
    }
}

impl Deserialize for OfpEchoRequest {
    type R = OfpEchoRequest;

    fn deserialize_len_ok(_version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        Ok(OfpEchoRequest { arbitrary: bytes })
    }

    fn min_length(_version: u8) -> usize {
        0
    }
}

impl Deserialize for OfpSwitchFeatures {
    type R = OfpSwitchFeatures;

    fn deserialize_len_ok(version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        let port_len = OfpPort::length(version);
        if (version == OFP_VERSION_1_3 && bytes.len() != 24) || (bytes.len() - 24) % port_len != 0 {
            return Err(Error::BadRequest(OfpBadRequestCode::BadLen, bytes));
        }
        let auxiliary_id = if version == OFP_VERSION_1_3 {
            bytes[13]
        }
        else {
            0
        };
        let mut ports = vec![];
        let mut stream = Cursor::new(&bytes[24..]);
        while (stream.position() as usize) < bytes.len() - 24 {
            ports.push(OfpPort::read(version, &mut stream)?);
        }
        Ok(OfpSwitchFeatures {
            datapath_id: NetworkEndian::read_u64(&bytes[0..8]),
            n_buffers: NetworkEndian::read_u32(&bytes[8..12]),
            n_tables: bytes[12],
            auxiliary_id,
            capabilities: NetworkEndian::read_u32(&bytes[16..20]),
            ports,
        })
    }

    fn min_length(_version: u8) -> usize {
        24
    }
}

impl Deserialize for OfpErrorMsg {
    type R = OfpErrorMsg;

    fn deserialize_len_ok(_version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        let typ = NetworkEndian::read_u16(&bytes[0..2]);
        let code = NetworkEndian::read_u16(&bytes[2..4]);
        Ok(OfpErrorMsg {
            typ,
            code,
            data: bytes[4..].to_vec(),
        })
    }

    fn min_length(_version: u8) -> usize {
        4
    }
}

impl Deserialize for OfpStatsReply {
    type R = OfpStatsReply;

    fn deserialize_len_ok(version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        let body_start = Self::min_length(version);
        Ok(OfpStatsReply {
            stats_type: NetworkEndian::read_u16(&bytes[0..2]),
            flags: NetworkEndian::read_u16(&bytes[2..4]),
            body: bytes[body_start..].to_vec(),
        })
    }

    fn min_length(version: u8) -> usize {
        if version == OFP_VERSION_1_0 {
            4
        }
        else {
            8
        }
    }
}

impl Deserialize for OfpPortStatus {
    type R = OfpPortStatus;

    fn deserialize_len_ok(version: u8, bytes: Vec<u8>) -> Result<Self::R> {
        let mut stream = Cursor::new(&bytes[8..]);
        Ok(OfpPortStatus {
            reason: bytes[0],
            desc: OfpPort::read(version, &mut stream)?,
        })
    }

    fn min_length(version: u8) -> usize {
        8 + OfpPort::length(version)
    }

    fn max_length(version: u8) -> usize {
        Self::min_length(version)
    }
}

impl OfpPort {
    /// Size of a port description: 48 bytes in 1.0, else 64
    pub fn length(version: u8) -> usize {
        if version == OFP_VERSION_1_0 {
            48
        }
        else {
            64
        }
    }

    /// Reads a port description of the given protocol version
    pub fn read<R: Read>(version: u8, stream: &mut R) -> io::Result<OfpPort> {
        let v10 = version == OFP_VERSION_1_0;
        let port_no = if v10 {
            v1_0::port_from_u16(stream.read_u16::<NetworkEndian>()?)
        }
        else {
            let port_no = stream.read_u32::<NetworkEndian>()?;
            skip(stream, 4)?;
            port_no
        };
        let mut hw_addr = [0; 6];
        stream.read_exact(&mut hw_addr)?;
        if !v10 {
            skip(stream, 2)?;
        }
        let name = read_fixed_str(stream, 16)?;
        let mut words = [0u32; 6];
        stream.read_u32_into::<NetworkEndian>(&mut words)?;
        let (curr_speed, max_speed) = if v10 {
            (0, 0)
        }
        else {
            (stream.read_u32::<NetworkEndian>()?, stream.read_u32::<NetworkEndian>()?)
        };
        Ok(OfpPort {
            port_no,
            hw_addr,
            name,
            config: words[0],
            state: words[1],
            curr: words[2],
            advertised: words[3],
            supported: words[4],
            peer: words[5],
            curr_speed,
            max_speed,
        })
    }
}

impl OfpMatch {
    /// Reads an OXM match including its trailing padding
    pub fn read<R: Read>(stream: &mut R) -> io::Result<OfpMatch> {
        let typ = stream.read_u16::<NetworkEndian>()?;
        let length = stream.read_u16::<NetworkEndian>()? as usize;
        if typ != OfpMatchType::Oxm as u16 || length < 4 {
            return Err(invalid("unsupported match type or length"));
        }
        let mut fields = vec![0; length - 4];
        stream.read_exact(&mut fields)?;
        skip(stream, align8(length) - length)?;

        let mut oxm_fields = vec![];
        let mut cursor = Cursor::new(&fields[..]);
        while (cursor.position() as usize) < fields.len() {
            oxm_fields.push(OfpOxmTlv::read(&mut cursor)?);
        }
        Ok(OfpMatch { typ, oxm_fields })
    }
}

impl OfpOxmTlv {
    /// Reads a single OXM TLV
    pub fn read<R: Read>(stream: &mut R) -> io::Result<OfpOxmTlv> {
        let header = stream.read_u32::<NetworkEndian>()?;
        let mut body = vec![0; (header & 0xff) as usize];
        stream.read_exact(&mut body)?;
        Ok(OfpOxmTlv {
            class: (header >> 16) as u16,
            field: ((header >> 9) & 0x7f) as u8,
            hasmask: (header >> 8) & 1 == 1,
            body,
        })
    }
}

/// Splits a list of TLV style structures, each starting with
/// a 16 bit type and a 16 bit length that includes these 4 bytes.
fn split_tlvs(bytes: &[u8], min_len: usize) -> io::Result<Vec<(u16, &[u8])>> {
    let mut parts = vec![];
    let mut rest = bytes;
    while !rest.is_empty() {
        if rest.len() < 4 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated TLV header"));
        }
        let typ = NetworkEndian::read_u16(&rest[0..2]);
        let len = NetworkEndian::read_u16(&rest[2..4]) as usize;
        if len < min_len {
            return Err(invalid("TLV length too small"));
        }
        if len > rest.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated TLV body"));
        }
        parts.push((typ, &rest[4..len]));
        rest = &rest[len..];
    }
    Ok(parts)
}

impl OfpActionType {
    fn from_u16(typ: u16) -> Option<OfpActionType> {
        use self::OfpActionType::*;
        [
            Output, CopyTtlOut, CopyTtlIn, SetMplsTtl, DecMplsTtl, PushVlan, PopVlan, PushMpls,
            PopMpls, SetQueue, Group, SetNwTtl, DecNwTtl, SetField, PushPbb, PopPbb,
        ]
        .iter()
        .cloned()
        .find(|t| *t as u16 == typ)
    }
}

impl OfpAction {
    /// Reads a list of 1.2/1.3 actions that fills the whole buffer
    pub fn read_all(bytes: &[u8]) -> io::Result<Vec<OfpAction>> {
        let mut actions = vec![];
        for (typ, body) in split_tlvs(bytes, 8)? {
            actions.push(Self::from_body(typ, body)?);
        }
        Ok(actions)
    }

    fn from_body(typ: u16, body: &[u8]) -> io::Result<OfpAction> {
        let mut stream = Cursor::new(body);
        let action = match OfpActionType::from_u16(typ) {
            Some(OfpActionType::Output) => OfpAction::Output {
                port: stream.read_u32::<NetworkEndian>()?,
                max_len: stream.read_u16::<NetworkEndian>()?,
            },
            Some(OfpActionType::CopyTtlOut) => OfpAction::CopyTtlOut,
            Some(OfpActionType::CopyTtlIn) => OfpAction::CopyTtlIn,
            Some(OfpActionType::SetMplsTtl) => OfpAction::SetMplsTtl(stream.read_u8()?),
            Some(OfpActionType::DecMplsTtl) => OfpAction::DecMplsTtl,
            Some(OfpActionType::PushVlan) => OfpAction::PushVlan(stream.read_u16::<NetworkEndian>()?),
            Some(OfpActionType::PopVlan) => OfpAction::PopVlan,
            Some(OfpActionType::PushMpls) => OfpAction::PushMpls(stream.read_u16::<NetworkEndian>()?),
            Some(OfpActionType::PopMpls) => OfpAction::PopMpls(stream.read_u16::<NetworkEndian>()?),
            Some(OfpActionType::SetQueue) => OfpAction::SetQueue(stream.read_u32::<NetworkEndian>()?),
            Some(OfpActionType::Group) => OfpAction::Group(stream.read_u32::<NetworkEndian>()?),
            Some(OfpActionType::SetNwTtl) => OfpAction::SetNwTtl(stream.read_u8()?),
            Some(OfpActionType::DecNwTtl) => OfpAction::DecNwTtl,
            Some(OfpActionType::SetField) => OfpAction::SetField(OfpOxmTlv::read(&mut stream)?),
            Some(OfpActionType::PushPbb) => OfpAction::PushPbb(stream.read_u16::<NetworkEndian>()?),
            Some(OfpActionType::PopPbb) => OfpAction::PopPbb,
            None => OfpAction::Unknown {
                typ,
                body: body.to_vec(),
            },
        };
        Ok(action)
    }
}

impl OfpInstruction {
    /// Reads a list of instructions that fills the whole buffer
    pub fn read_all(bytes: &[u8]) -> io::Result<Vec<OfpInstruction>> {
        let mut instructions = vec![];
        for (typ, body) in split_tlvs(bytes, 8)? {
            let mut stream = Cursor::new(body);
            let instr = match typ {
                t if t == OfpInstructionType::GotoTable as u16 => {
                    OfpInstruction::GotoTable(stream.read_u8()?)
                }
                t if t == OfpInstructionType::WriteMetadata as u16 => {
                    skip(&mut stream, 4)?;
                    OfpInstruction::WriteMetadata {
                        metadata: stream.read_u64::<NetworkEndian>()?,
                        metadata_mask: stream.read_u64::<NetworkEndian>()?,
                    }
                }
                t if t == OfpInstructionType::WriteActions as u16 => {
                    OfpInstruction::WriteActions(OfpAction::read_all(&body[4..])?)
                }
                t if t == OfpInstructionType::ApplyActions as u16 => {
                    OfpInstruction::ApplyActions(OfpAction::read_all(&body[4..])?)
                }
                t if t == OfpInstructionType::ClearActions as u16 => OfpInstruction::ClearActions,
                t if t == OfpInstructionType::Meter as u16 => {
                    OfpInstruction::Meter(stream.read_u32::<NetworkEndian>()?)
                }
                _ => OfpInstruction::Unknown {
                    typ,
                    body: body.to_vec(),
                },
            };
            instructions.push(instr);
        }
        Ok(instructions)
    }
}

impl OfpBucket {
    /// Reads a list of group buckets that fills the whole buffer
    pub fn read_all(bytes: &[u8]) -> io::Result<Vec<OfpBucket>> {
        let mut buckets = vec![];
        let mut rest = bytes;
        while !rest.is_empty() {
            if rest.len() < 16 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated bucket"));
            }
            let len = NetworkEndian::read_u16(&rest[0..2]) as usize;
            if len < 16 || len > rest.len() {
                return Err(invalid("bad bucket length"));
            }
            buckets.push(OfpBucket {
                weight: NetworkEndian::read_u16(&rest[2..4]),
                watch_port: NetworkEndian::read_u32(&rest[4..8]),
                watch_group: NetworkEndian::read_u32(&rest[8..12]),
                actions: OfpAction::read_all(&rest[16..len])?,
            });
            rest = &rest[len..];
        }
        Ok(buckets)
    }
}

impl OfpMeterBand {
    /// Reads a list of meter bands that fills the whole buffer
    pub fn read_all(bytes: &[u8]) -> io::Result<Vec<OfpMeterBand>> {
        let mut bands = vec![];
        for (typ, body) in split_tlvs(bytes, 16)? {
            let mut stream = Cursor::new(body);
            let rate = stream.read_u32::<NetworkEndian>()?;
            let burst_size = stream.read_u32::<NetworkEndian>()?;
            let band = match typ {
                t if t == OfpMeterBandType::Drop as u16 => OfpMeterBand::Drop { rate, burst_size },
                t if t == OfpMeterBandType::DscpRemark as u16 => OfpMeterBand::DscpRemark {
                    rate,
                    burst_size,
                    prec_level: stream.read_u8()?,
                },
                t if t == OfpMeterBandType::Experimenter as u16 => OfpMeterBand::Experimenter {
                    rate,
                    burst_size,
                    experimenter: stream.read_u32::<NetworkEndian>()?,
                },
                _ => return Err(invalid("unknown meter band type")),
            };
            bands.push(band);
        }
        Ok(bands)
    }
}
