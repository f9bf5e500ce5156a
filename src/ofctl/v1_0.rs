//! The OpenFlow 1.0 adapter

use super::*;
use crate::openflow::messages::v1_0::*;
use crate::openflow::messages::OxmOfbMatchFields as F;
use crate::request::{Action, Field, Match, MatchValue};

use ipnetwork::ipv4_mask_to_prefix;

const ALL_PORTS: u16 = 0xfffc;

/// Adapter for OpenFlow 1.0 switches
#[derive(Debug)]
pub struct Ofctl10;

fn malformed(what: String) -> Error {
    Error::Malformed(format!("{} is not available in OpenFlow 1.0", what))
}

fn narrow_port(port: u32) -> Result<u16> {
    port_to_u16(port).ok_or_else(|| Error::Malformed(format!("port {} exceeds 16 bits", port)))
}

fn mask_prefix(mask: Option<Ipv4Addr>) -> Result<u8> {
    match mask {
        None => Ok(32),
        Some(mask) => ipv4_mask_to_prefix(mask)
            .map_err(|_| Error::Malformed(format!("netmask {} is not a prefix", mask))),
    }
}

fn to_match(m: &Match) -> Result<Ofp10Match> {
    let mut of10 = Ofp10Match::default();
    for &(field, ref value) in &m.fields {
        let unmasked_int = || match *value {
            MatchValue::Int(n, None) => Ok(n),
            _ => Err(malformed(format!("masked {}", field.name()))),
        };
        let bits = match field {
            Field::Oxm(F::InPort) => {
                of10.in_port = narrow_port(unmasked_int()? as u32)?;
                OFPFW_IN_PORT
            }
            Field::Oxm(F::EthSrc) | Field::Oxm(F::EthDst) => {
                let addr = match *value {
                    MatchValue::Mac(addr, None) => addr.0,
                    _ => return Err(malformed(format!("masked {}", field.name()))),
                };
                if field == Field::Oxm(F::EthSrc) {
                    of10.dl_src = addr;
                    OFPFW_DL_SRC
                }
                else {
                    of10.dl_dst = addr;
                    OFPFW_DL_DST
                }
            }
            Field::Oxm(F::EthType) => {
                of10.dl_type = unmasked_int()? as u16;
                OFPFW_DL_TYPE
            }
            Field::Oxm(F::VlanVid) => {
                of10.dl_vlan = unmasked_int()? as u16;
                OFPFW_DL_VLAN
            }
            Field::Oxm(F::VlanPcp) => {
                of10.dl_vlan_pcp = unmasked_int()? as u8;
                OFPFW_DL_VLAN_PCP
            }
            Field::Oxm(F::IpProto) | Field::Oxm(F::ArpOp) => {
                of10.nw_proto = unmasked_int()? as u8;
                OFPFW_NW_PROTO
            }
            Field::NwTos => {
                of10.nw_tos = unmasked_int()? as u8;
                OFPFW_NW_TOS
            }
            Field::Oxm(F::IpDscp) => {
                of10.nw_tos = (unmasked_int()? as u8) << 2;
                OFPFW_NW_TOS
            }
            Field::Oxm(F::Ipv4Src) | Field::Oxm(F::ArpSpa) | Field::Oxm(F::Ipv4Dst) | Field::Oxm(F::ArpTpa) => {
                let (addr, mask) = match *value {
                    MatchValue::Ipv4(addr, mask) => (addr, mask),
                    _ => return Err(Error::Malformed(format!("invalid value for {}", field.name()))),
                };
                let prefix = mask_prefix(mask)?;
                if field == Field::Oxm(F::Ipv4Src) || field == Field::Oxm(F::ArpSpa) {
                    of10.nw_src = u32::from(addr);
                    of10.set_nw_src_prefix(prefix);
                }
                else {
                    of10.nw_dst = u32::from(addr);
                    of10.set_nw_dst_prefix(prefix);
                }
                0
            }
            Field::TpSrc | Field::Oxm(F::TcpSrc) | Field::Oxm(F::UdpSrc) | Field::Oxm(F::Icmpv4Type) => {
                of10.tp_src = unmasked_int()? as u16;
                OFPFW_TP_SRC
            }
            Field::TpDst | Field::Oxm(F::TcpDst) | Field::Oxm(F::UdpDst) | Field::Oxm(F::Icmpv4Code) => {
                of10.tp_dst = unmasked_int()? as u16;
                OFPFW_TP_DST
            }
            other => return Err(malformed(format!("match field {}", other.name()))),
        };
        of10.unwildcard(bits);
    }
    Ok(of10)
}

fn to_action(action: &Action) -> Result<Ofp10Action> {
    let a = match *action {
        Action::Output { port, max_len } => Ofp10Action::Output {
            port: narrow_port(port)?,
            max_len: max_len.unwrap_or(OFPCML_MAX),
        },
        Action::SetVlanVid { vlan_vid } => Ofp10Action::SetVlanVid(vlan_vid),
        Action::SetVlanPcp { vlan_pcp } => Ofp10Action::SetVlanPcp(vlan_pcp),
        Action::StripVlan => Ofp10Action::StripVlan,
        Action::SetDlSrc { dl_src } => Ofp10Action::SetDlSrc(dl_src.0),
        Action::SetDlDst { dl_dst } => Ofp10Action::SetDlDst(dl_dst.0),
        Action::SetNwSrc { nw_src } => Ofp10Action::SetNwSrc(u32::from(nw_src)),
        Action::SetNwDst { nw_dst } => Ofp10Action::SetNwDst(u32::from(nw_dst)),
        Action::SetNwTos { nw_tos } => Ofp10Action::SetNwTos(nw_tos),
        Action::SetTpSrc { tp_src } => Ofp10Action::SetTpSrc(tp_src),
        Action::SetTpDst { tp_dst } => Ofp10Action::SetTpDst(tp_dst),
        Action::Enqueue { port, queue_id } => Ofp10Action::Enqueue {
            port: narrow_port(port)?,
            queue_id,
        },
        ref other => return Err(malformed(format!("action {}", other.name()))),
    };
    Ok(a)
}

fn flow_stats_body(filter: &StatsFilter) -> Result<Vec<u8>> {
    let req = Ofp10FlowStatsRequest {
        match_field: to_match(&filter.match_fields)?,
        table_id: filter.table_id.unwrap_or(OFPTT_ALL),
        out_port: match filter.out_port {
            Some(port) => narrow_port(port)?,
            None => OFPP_NONE,
        },
    };
    let mut body = vec![];
    req.serialize(&mut body).map_err(|e| Error::Malformed(e.to_string()))?;
    Ok(body)
}

/* Rendering */

fn match_json(m: &Ofp10Match) -> Value {
    let mut object = serde_json::Map::new();
    let mut put = |bit: u32, name: &str, value: Value| {
        if m.wildcards & bit == 0 {
            object.insert(name.to_owned(), value);
        }
    };
    put(OFPFW_IN_PORT, "in_port", port_no_json(port_from_u16(m.in_port)));
    put(OFPFW_DL_SRC, "dl_src", json!(mac_str(&m.dl_src)));
    put(OFPFW_DL_DST, "dl_dst", json!(mac_str(&m.dl_dst)));
    put(OFPFW_DL_VLAN, "dl_vlan", json!(m.dl_vlan));
    put(OFPFW_DL_VLAN_PCP, "dl_vlan_pcp", json!(m.dl_vlan_pcp));
    put(OFPFW_DL_TYPE, "dl_type", json!(m.dl_type));
    put(OFPFW_NW_TOS, "nw_tos", json!(m.nw_tos));
    put(OFPFW_NW_PROTO, "nw_proto", json!(m.nw_proto));
    put(OFPFW_TP_SRC, "tp_src", json!(m.tp_src));
    put(OFPFW_TP_DST, "tp_dst", json!(m.tp_dst));

    for &(name, addr, prefix) in &[
        ("nw_src", m.nw_src, m.nw_src_prefix()),
        ("nw_dst", m.nw_dst, m.nw_dst_prefix()),
    ] {
        let addr = Ipv4Addr::from(addr);
        match prefix {
            0 => (),
            32 => {
                object.insert(name.to_owned(), json!(addr.to_string()));
            }
            _ => {
                object.insert(name.to_owned(), json!(format!("{}/{}", addr, prefix)));
            }
        }
    }
    Value::Object(object)
}

fn action_str(action: &Ofp10Action) -> String {
    match *action {
        Ofp10Action::Output { port, .. } => format!("OUTPUT:{}", port_str(port_from_u16(port))),
        Ofp10Action::SetVlanVid(vid) => format!("SET_VLAN_VID:{}", vid),
        Ofp10Action::SetVlanPcp(pcp) => format!("SET_VLAN_PCP:{}", pcp),
        Ofp10Action::StripVlan => "STRIP_VLAN".to_owned(),
        Ofp10Action::SetDlSrc(ref addr) => format!("SET_DL_SRC:{}", mac_str(addr)),
        Ofp10Action::SetDlDst(ref addr) => format!("SET_DL_DST:{}", mac_str(addr)),
        Ofp10Action::SetNwSrc(addr) => format!("SET_NW_SRC:{}", Ipv4Addr::from(addr)),
        Ofp10Action::SetNwDst(addr) => format!("SET_NW_DST:{}", Ipv4Addr::from(addr)),
        Ofp10Action::SetNwTos(tos) => format!("SET_NW_TOS:{}", tos),
        Ofp10Action::SetTpSrc(port) => format!("SET_TP_SRC:{}", port),
        Ofp10Action::SetTpDst(port) => format!("SET_TP_DST:{}", port),
        Ofp10Action::Enqueue { port, queue_id } => {
            format!("ENQUEUE:{}:{}", port_str(port_from_u16(port)), queue_id)
        }
        Ofp10Action::Unknown { typ, .. } => format!("UNKNOWN:{}", typ),
    }
}

fn flow_stats_json(replies: &[Reply]) -> Result<Value> {
    let mut flows = vec![];
    for body in bodies(replies, OfpStatsType::Flow) {
        for rec in sized_records(body, 0, 88, "flow stats")? {
            let match_field = Ofp10Match::read(&mut io::Cursor::new(&rec[4..44]))?;
            let actions: Vec<Value> = Ofp10Action::read_all(&rec[88..])?
                .iter()
                .map(|a| json!(action_str(a)))
                .collect();
            flows.push(json!({
                "length": rec.len(),
                "table_id": rec[2],
                "match": match_json(&match_field),
                "duration_sec": NetworkEndian::read_u32(&rec[44..48]),
                "duration_nsec": NetworkEndian::read_u32(&rec[48..52]),
                "priority": NetworkEndian::read_u16(&rec[52..54]),
                "idle_timeout": NetworkEndian::read_u16(&rec[54..56]),
                "hard_timeout": NetworkEndian::read_u16(&rec[56..58]),
                "cookie": NetworkEndian::read_u64(&rec[64..72]),
                "packet_count": NetworkEndian::read_u64(&rec[72..80]),
                "byte_count": NetworkEndian::read_u64(&rec[80..88]),
                "actions": actions,
            }));
        }
    }
    Ok(Value::Array(flows))
}

fn port_stats_json(replies: &[Reply]) -> Result<Value> {
    let mut ports = vec![];
    for body in bodies(replies, OfpStatsType::Port) {
        for rec in fixed_records(body, 104, "port stats")? {
            let counter = |i: usize| NetworkEndian::read_u64(&rec[8 + i * 8..16 + i * 8]);
            ports.push(json!({
                "port_no": port_no_json(port_from_u16(NetworkEndian::read_u16(&rec[0..2]))),
                "rx_packets": counter(0),
                "tx_packets": counter(1),
                "rx_bytes": counter(2),
                "tx_bytes": counter(3),
                "rx_dropped": counter(4),
                "tx_dropped": counter(5),
                "rx_errors": counter(6),
                "tx_errors": counter(7),
                "rx_frame_err": counter(8),
                "rx_over_err": counter(9),
                "rx_crc_err": counter(10),
                "collisions": counter(11),
            }));
        }
    }
    Ok(Value::Array(ports))
}

fn queue_stats_json(replies: &[Reply]) -> Result<Value> {
    let mut queues = vec![];
    for body in bodies(replies, OfpStatsType::Queue) {
        for rec in fixed_records(body, 32, "queue stats")? {
            queues.push(json!({
                "port_no": port_no_json(port_from_u16(NetworkEndian::read_u16(&rec[0..2]))),
                "queue_id": NetworkEndian::read_u32(&rec[4..8]),
                "tx_bytes": NetworkEndian::read_u64(&rec[8..16]),
                "tx_packets": NetworkEndian::read_u64(&rec[16..24]),
                "tx_errors": NetworkEndian::read_u64(&rec[24..32]),
            }));
        }
    }
    Ok(Value::Array(queues))
}

impl Ofctl for Ofctl10 {
    fn version(&self) -> u8 {
        OFP_VERSION_1_0
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::DESC_STATS
            | Capabilities::FLOW_STATS
            | Capabilities::AGGREGATE_FLOW_STATS
            | Capabilities::PORT_STATS
            | Capabilities::QUEUE_STATS
            | Capabilities::PORT_DESC
            | Capabilities::MOD_FLOW_ENTRY
            | Capabilities::MOD_PORT_BEHAVIOR
    }

    fn reply_more_flag(&self) -> u16 {
        OFPSF_REPLY_MORE
    }

    fn stats_request(&self, kind: StatsKind, filter: &StatsFilter, xid: u32) -> Result<Vec<u8>> {
        let (typ, body) = match kind {
            StatsKind::Desc => (OfpStatsType::Desc, vec![]),
            StatsKind::Flow => (OfpStatsType::Flow, flow_stats_body(filter)?),
            StatsKind::AggregateFlow => (OfpStatsType::Aggregate, flow_stats_body(filter)?),
            StatsKind::Port => {
                let mut body = vec![0; 8];
                NetworkEndian::write_u16(&mut body[0..2], OFPP_NONE);
                (OfpStatsType::Port, body)
            }
            StatsKind::Queue => {
                let mut body = vec![0; 8];
                NetworkEndian::write_u16(&mut body[0..2], ALL_PORTS);
                NetworkEndian::write_u32(&mut body[4..8], OFPQ_ALL);
                (OfpStatsType::Queue, body)
            }
            StatsKind::PortDesc => {
                return OfpHeader::new(OFP_VERSION_1_0, OfpType::FeaturesRequest, xid)
                    .to_bytes()
                    .map_err(Error::from)
            }
            _ => return Err(Error::NotSupported(kind.capability())),
        };
        super::stats_request(OFP_VERSION_1_0, typ, body, xid)
    }

    fn render(&self, kind: StatsKind, replies: &[Reply]) -> Result<Value> {
        match kind {
            StatsKind::Desc => desc_json(replies),
            StatsKind::Flow => flow_stats_json(replies),
            StatsKind::AggregateFlow => aggregate_json(replies),
            StatsKind::Port => port_stats_json(replies),
            StatsKind::Queue => queue_stats_json(replies),
            StatsKind::PortDesc => Ok(features_ports_json(replies, OFP_VERSION_1_0)),
            _ => Err(Error::NotSupported(kind.capability())),
        }
    }

    fn flow_mod(&self, cmd: FlowCommand, entry: &FlowEntry, xid: u32) -> Result<Vec<u8>> {
        let command = match cmd {
            FlowCommand::Add => OfpFlowModCommand::Add,
            FlowCommand::Modify => OfpFlowModCommand::Modify,
            FlowCommand::ModifyStrict => OfpFlowModCommand::ModifyStrict,
            FlowCommand::Delete => OfpFlowModCommand::Delete,
            FlowCommand::DeleteStrict => OfpFlowModCommand::DeleteStrict,
        };
        let flow_mod = Ofp10FlowMod {
            match_field: to_match(&entry.match_fields)?,
            cookie: entry.cookie,
            command: command as u16,
            idle_timeout: entry.idle_timeout,
            hard_timeout: entry.hard_timeout,
            priority: entry.priority,
            buffer_id: entry.buffer_id.unwrap_or(OFP_NO_BUFFER),
            out_port: match entry.out_port {
                Some(port) => narrow_port(port)?,
                None => OFPP_NONE,
            },
            flags: entry.flags,
            actions: entry.actions.iter().map(to_action).collect::<Result<_>>()?,
        };
        encode(&flow_mod, OFP_VERSION_1_0, xid)
    }

    fn port_mod(&self, config: &PortConfig, port: &OfpPort, xid: u32) -> Result<Vec<u8>> {
        narrow_port(config.port_no)?;
        let port_mod = OfpPortMod {
            port_no: config.port_no,
            hw_addr: config.hw_addr.map(|a| a.0).unwrap_or(port.hw_addr),
            config: config.config,
            mask: config.mask,
            advertise: config.advertise.unwrap_or(port.advertised),
        };
        encode(&port_mod, OFP_VERSION_1_0, xid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request;

    fn flow_entry(value: Value) -> FlowEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn flow_mod_layout() {
        let entry = flow_entry(json!({
            "dpid": 1,
            "priority": 10,
            "match": { "in_port": 1, "dl_type": 2048, "nw_dst": "10.0.0.0/24" },
            "actions": [{ "type": "OUTPUT", "port": 2 }],
        }));
        let msg = Ofctl10.flow_mod(FlowCommand::Add, &entry, 5).unwrap();
        assert_eq!(OFP_VERSION_1_0, msg[0]);
        assert_eq!(14, msg[1]);
        assert_eq!(72 + 8, msg.len());

        let m = Ofp10Match::read(&mut io::Cursor::new(&msg[8..48])).unwrap();
        assert_eq!(1, m.in_port);
        assert_eq!(0x0800, m.dl_type);
        assert_eq!(24, m.nw_dst_prefix());
        assert_eq!(0, m.nw_src_prefix());
        assert_eq!(0, m.wildcards & (OFPFW_IN_PORT | OFPFW_DL_TYPE));
        // priority, buffer_id and out_port
        assert_eq!(&[0, 10], &msg[62..64]);
        assert_eq!(&[0xff; 4], &msg[64..68]);
        assert_eq!(&[0xff, 0xff], &msg[68..70]);
        assert_eq!(
            vec![Ofp10Action::Output { port: 2, max_len: 0xffe5 }],
            Ofp10Action::read_all(&msg[72..]).unwrap()
        );
    }

    #[test]
    fn rejects_oxm_only_content() {
        let entry = flow_entry(json!({ "dpid": 1, "match": { "ipv6_src": "::1" } }));
        assert!(Ofctl10.flow_mod(FlowCommand::Add, &entry, 1).is_err());

        let entry = flow_entry(json!({ "dpid": 1, "actions": [{ "type": "GOTO_TABLE", "table_id": 1 }] }));
        match Ofctl10.flow_mod(FlowCommand::Add, &entry, 1) {
            Err(Error::Malformed(msg)) => assert!(msg.contains("GOTO_TABLE")),
            other => panic!("unexpected {:?}", other),
        }

        let entry = flow_entry(json!({ "dpid": 1, "actions": [{ "type": "OUTPUT", "port": 70000 }] }));
        assert!(Ofctl10.flow_mod(FlowCommand::Add, &entry, 1).is_err());
    }

    #[test]
    fn stats_requests() {
        let filter = StatsFilter::default();
        let port = Ofctl10.stats_request(StatsKind::Port, &filter, 3).unwrap();
        assert_eq!(16, port[1]);
        assert_eq!(&[0, 4, 0, 0, 0xff, 0xff, 0, 0, 0, 0, 0, 0], &port[8..]);

        let queue = Ofctl10.stats_request(StatsKind::Queue, &filter, 3).unwrap();
        assert_eq!(&[0, 5, 0, 0, 0xff, 0xfc, 0, 0, 0xff, 0xff, 0xff, 0xff], &queue[8..]);

        let flow = Ofctl10.stats_request(StatsKind::Flow, &filter, 3).unwrap();
        assert_eq!(8 + 4 + 44, flow.len());
        assert_eq!(&[0xff, 0, 0xff, 0xff], &flow[52..]);

        let desc = Ofctl10.stats_request(StatsKind::PortDesc, &filter, 3).unwrap();
        assert_eq!(vec![OFP_VERSION_1_0, 5, 0, 8, 0, 0, 0, 3], desc);

        match Ofctl10.stats_request(StatsKind::Group, &filter, 3) {
            Err(Error::NotSupported(cap)) => assert_eq!(Capabilities::GROUP_STATS, cap),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn renders_flow_stats() {
        let mut m = Ofp10Match::default();
        m.in_port = 0xfffe;
        m.unwildcard(OFPFW_IN_PORT);
        m.nw_src = u32::from(Ipv4Addr::new(10, 0, 0, 0));
        m.set_nw_src_prefix(8);

        let mut rec = vec![0, 0, 1, 0];
        m.serialize(&mut rec).unwrap();
        rec.extend_from_slice(&[0; 44]);
        rec[53] = 9;
        rec[79] = 4;
        Ofp10Action::serialize_all(&[Ofp10Action::StripVlan, Ofp10Action::SetNwTos(4)], &mut rec).unwrap();
        let len = rec.len() as u16;
        rec[0..2].copy_from_slice(&len.to_be_bytes());

        let replies = vec![stats_reply(OFP_VERSION_1_0, OfpStatsType::Flow, 0, &rec)];
        let flows = Ofctl10.render(StatsKind::Flow, &replies).unwrap();
        assert_eq!(
            json!([{
                "length": 104,
                "table_id": 1,
                "match": { "in_port": "LOCAL", "nw_src": "10.0.0.0/8" },
                "duration_sec": 0,
                "duration_nsec": 0,
                "priority": 9,
                "idle_timeout": 0,
                "hard_timeout": 0,
                "cookie": 0,
                "packet_count": 4,
                "byte_count": 0,
                "actions": ["STRIP_VLAN", "SET_NW_TOS:4"],
            }]),
            flows
        );
    }

    #[test]
    fn renders_port_stats_of_two_fragments() {
        let mut rec = vec![0; 104];
        rec[1] = 2;
        rec[15] = 11;
        let replies = vec![
            stats_reply(OFP_VERSION_1_0, OfpStatsType::Port, OFPSF_REPLY_MORE, &rec),
            stats_reply(OFP_VERSION_1_0, OfpStatsType::Port, 0, &rec),
        ];
        let ports = Ofctl10.render(StatsKind::Port, &replies).unwrap();
        assert_eq!(2, ports.as_array().unwrap().len());
        assert_eq!(json!(2), ports[1]["port_no"]);
        assert_eq!(json!(11), ports[1]["rx_packets"]);
    }

    #[test]
    fn port_mod_keeps_current_address() {
        let config: request::PortConfig =
            serde_json::from_value(json!({ "dpid": 1, "port_no": 3, "config": 1, "mask": 1 })).unwrap();
        let port = OfpPort {
            port_no: 3,
            hw_addr: [1, 2, 3, 4, 5, 6],
            advertised: 0x20,
            ..OfpPort::default()
        };
        let msg = Ofctl10.port_mod(&config, &port, 1).unwrap();
        assert_eq!(15, msg[1]);
        assert_eq!(32, msg.len());
        assert_eq!(&[0, 3, 1, 2, 3, 4, 5, 6], &msg[8..16]);
        assert_eq!(&[0, 0, 0, 0x20], &msg[24..28]);
    }
}
