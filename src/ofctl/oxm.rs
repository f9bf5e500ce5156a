//! Translation shared by the OpenFlow 1.2 and 1.3 adapters, which both use
//! the extensible match and the instruction model.

use super::*;
use crate::openflow::messages::OxmOfbMatchFields as F;
use crate::request::{Action, Bucket, Field, GroupType, Match, MatchValue};

use std::io::Cursor;

fn malformed(version: u8, what: String) -> Error {
    let name = if version == OFP_VERSION_1_2 { "1.2" } else { "1.3" };
    Error::Malformed(format!("{} is not available in OpenFlow {}", what, name))
}

fn oxm_tlv(version: u8, field: F, value: &MatchValue) -> Result<OfpOxmTlv> {
    if version == OFP_VERSION_1_2 && field.since_1_3() {
        return Err(malformed(version, format!("field {}", Field::Oxm(field).name())));
    }
    let (value, mask) = value.to_bytes(Field::Oxm(field).kind().width());
    Ok(OfpOxmTlv::new(field, &value, mask.as_ref().map(|m| &m[..])))
}

fn transport_field(m: &Match, src: bool) -> Result<F> {
    let proto = m
        .get(Field::Oxm(F::IpProto))
        .and_then(MatchValue::as_int)
        .ok_or_else(|| Error::Malformed("tp_src and tp_dst require ip_proto".to_owned()))?;
    let field = match (proto, src) {
        (6, true) => F::TcpSrc,
        (6, false) => F::TcpDst,
        (17, true) => F::UdpSrc,
        (17, false) => F::UdpDst,
        (132, true) => F::SctpSrc,
        (132, false) => F::SctpDst,
        _ => {
            return Err(Error::Malformed(format!(
                "tp_src and tp_dst need TCP, UDP or SCTP, not ip_proto {}",
                proto
            )))
        }
    };
    Ok(field)
}

/// Builds an OXM match. The fields are ordered by their OXM field number.
pub fn to_match(version: u8, m: &Match) -> Result<OfpMatch> {
    let mut tlvs: Vec<(F, OfpOxmTlv)> = vec![];
    for &(field, ref value) in &m.fields {
        let (field, value) = match (field, value) {
            (Field::Oxm(F::VlanVid), &MatchValue::Int(vid, None)) => {
                // OFPVID_PRESENT
                (F::VlanVid, MatchValue::Int(vid | 0x1000, None))
            }
            (Field::Oxm(f), v) => (f, v.clone()),
            (Field::NwTos, &MatchValue::Int(tos, mask)) => {
                (F::IpDscp, MatchValue::Int(tos >> 2, mask.map(|m| m >> 2)))
            }
            (Field::TpSrc, v) => (transport_field(m, true)?, v.clone()),
            (Field::TpDst, v) => (transport_field(m, false)?, v.clone()),
            (f, _) => return Err(Error::Malformed(format!("invalid value for {}", f.name()))),
        };
        if tlvs.iter().any(|&(f, _)| f == field) {
            return Err(Error::Malformed(format!(
                "match field {} given twice",
                Field::Oxm(field).name()
            )));
        }
        tlvs.push((field, oxm_tlv(version, field, &value)?));
    }
    tlvs.sort_by_key(|&(f, _)| f as u8);

    let mut match_field = OfpMatch::new();
    for (_, tlv) in tlvs {
        match_field.add_tlv(tlv);
    }
    Ok(match_field)
}

/// Translates an action of an action list
pub fn to_action(version: u8, action: &Action) -> Result<OfpAction> {
    let v13 = version == OFP_VERSION_1_3;
    let a = match *action {
        Action::Output { port, max_len } => OfpAction::Output {
            port,
            max_len: max_len.unwrap_or(OFPCML_MAX),
        },
        Action::CopyTtlOut => OfpAction::CopyTtlOut,
        Action::CopyTtlIn => OfpAction::CopyTtlIn,
        Action::SetMplsTtl { mpls_ttl } => OfpAction::SetMplsTtl(mpls_ttl),
        Action::DecMplsTtl => OfpAction::DecMplsTtl,
        Action::PushVlan { ethertype } => OfpAction::PushVlan(ethertype),
        Action::PopVlan => OfpAction::PopVlan,
        Action::PushMpls { ethertype } => OfpAction::PushMpls(ethertype),
        Action::PopMpls { ethertype } => OfpAction::PopMpls(ethertype),
        Action::SetQueue { queue_id } => OfpAction::SetQueue(queue_id),
        Action::Group { group_id } => OfpAction::Group(group_id),
        Action::SetNwTtl { nw_ttl } => OfpAction::SetNwTtl(nw_ttl),
        Action::DecNwTtl => OfpAction::DecNwTtl,
        Action::SetField(ref set) => match set.field {
            Field::Oxm(f) => OfpAction::SetField(oxm_tlv(version, f, &set.value)?),
            other => return Err(malformed(version, format!("SET_FIELD of {}", other.name()))),
        },
        Action::PushPbb { ethertype } if v13 => OfpAction::PushPbb(ethertype),
        Action::PopPbb if v13 => OfpAction::PopPbb,
        ref other => return Err(malformed(version, format!("action {}", other.name()))),
    };
    Ok(a)
}

/// Translates a plain action list
pub fn to_actions(version: u8, actions: &[Action]) -> Result<Vec<OfpAction>> {
    actions.iter().map(|a| to_action(version, a)).collect()
}

/// Translates actions into instructions. Plain actions are collected
/// into one apply-actions instruction.
pub fn to_instructions(version: u8, actions: &[Action]) -> Result<Vec<OfpInstruction>> {
    let mut apply = vec![];
    let mut instructions = vec![];
    for action in actions {
        match *action {
            Action::GotoTable { table_id } => instructions.push(OfpInstruction::GotoTable(table_id)),
            Action::WriteMetadata { metadata, metadata_mask } => {
                instructions.push(OfpInstruction::WriteMetadata {
                    metadata,
                    metadata_mask: metadata_mask.unwrap_or(u64::max_value()),
                })
            }
            Action::Meter { meter_id } if version == OFP_VERSION_1_3 => {
                instructions.push(OfpInstruction::Meter(meter_id))
            }
            Action::WriteActions { ref actions } => {
                instructions.push(OfpInstruction::WriteActions(to_actions(version, actions)?))
            }
            Action::ClearActions => instructions.push(OfpInstruction::ClearActions),
            ref a => apply.push(to_action(version, a)?),
        }
    }
    if !apply.is_empty() {
        instructions.insert(0, OfpInstruction::ApplyActions(apply));
    }
    Ok(instructions)
}

pub fn flow_mod(version: u8, cmd: FlowCommand, entry: &FlowEntry, xid: u32) -> Result<Vec<u8>> {
    let command = match cmd {
        FlowCommand::Add => OfpFlowModCommand::Add,
        FlowCommand::Modify => OfpFlowModCommand::Modify,
        FlowCommand::ModifyStrict => OfpFlowModCommand::ModifyStrict,
        FlowCommand::Delete => OfpFlowModCommand::Delete,
        FlowCommand::DeleteStrict => OfpFlowModCommand::DeleteStrict,
    };
    let mut flow_mod = OfpFlowMod::new(
        command,
        entry.table_id,
        entry.priority,
        to_match(version, &entry.match_fields)?,
        to_instructions(version, &entry.actions)?,
    );
    flow_mod.cookie = entry.cookie;
    flow_mod.cookie_mask = entry.cookie_mask;
    flow_mod.idle_timeout = entry.idle_timeout;
    flow_mod.hard_timeout = entry.hard_timeout;
    flow_mod.buffer_id = entry.buffer_id.unwrap_or(OFP_NO_BUFFER);
    flow_mod.out_port = entry.out_port.unwrap_or(OFPP_ANY);
    flow_mod.out_group = entry.out_group.unwrap_or(OFPG_ANY);
    flow_mod.flags = entry.flags;
    encode(&flow_mod, version, xid)
}

fn flow_stats_body(version: u8, filter: &StatsFilter) -> Result<Vec<u8>> {
    let req = OfpFlowStatsRequest {
        table_id: filter.table_id.unwrap_or(OFPTT_ALL),
        out_port: filter.out_port.unwrap_or(OFPP_ANY),
        out_group: filter.out_group.unwrap_or(OFPG_ANY),
        cookie: filter.cookie,
        cookie_mask: filter.cookie_mask,
        match_field: to_match(version, &filter.match_fields)?,
    };
    let mut body = vec![];
    req.serialize(&mut body).map_err(|e| Error::Malformed(e.to_string()))?;
    Ok(body)
}

/// Builds the stats requests both 1.2 and 1.3 know
pub fn stats_request(version: u8, kind: StatsKind, filter: &StatsFilter, xid: u32) -> Result<Vec<u8>> {
    let (typ, body) = match kind {
        StatsKind::Desc => (OfpStatsType::Desc, vec![]),
        StatsKind::Flow => (OfpStatsType::Flow, flow_stats_body(version, filter)?),
        StatsKind::AggregateFlow => (OfpStatsType::Aggregate, flow_stats_body(version, filter)?),
        StatsKind::Port => (OfpStatsType::Port, [OFPP_ANY.to_be_bytes(), [0; 4]].concat()),
        StatsKind::Queue => (
            OfpStatsType::Queue,
            [OFPP_ANY.to_be_bytes(), OFPQ_ALL.to_be_bytes()].concat(),
        ),
        StatsKind::GroupFeatures => (OfpStatsType::GroupFeatures, vec![]),
        StatsKind::GroupDesc => (OfpStatsType::GroupDesc, vec![]),
        StatsKind::Group => (OfpStatsType::Group, [OFPG_ALL.to_be_bytes(), [0; 4]].concat()),
        _ => return Err(Error::NotSupported(kind.capability())),
    };
    super::stats_request(version, typ, body, xid)
}

pub fn port_mod(version: u8, config: &PortConfig, port: &OfpPort, xid: u32) -> Result<Vec<u8>> {
    let port_mod = OfpPortMod {
        port_no: config.port_no,
        hw_addr: config.hw_addr.map(|a| a.0).unwrap_or(port.hw_addr),
        config: config.config,
        mask: config.mask,
        advertise: config.advertise.unwrap_or(port.advertised),
    };
    encode(&port_mod, version, xid)
}

fn to_bucket(version: u8, bucket: &Bucket) -> Result<OfpBucket> {
    Ok(OfpBucket {
        weight: bucket.weight,
        watch_port: bucket.watch_port.unwrap_or(OFPP_ANY),
        watch_group: bucket.watch_group.unwrap_or(OFPG_ANY),
        actions: to_actions(version, &bucket.actions)?,
    })
}

pub fn group_mod(version: u8, cmd: EntryCommand, entry: &GroupEntry, xid: u32) -> Result<Vec<u8>> {
    let command = match cmd {
        EntryCommand::Add => OfpGroupModCommand::Add,
        EntryCommand::Modify => OfpGroupModCommand::Modify,
        EntryCommand::Delete => OfpGroupModCommand::Delete,
    };
    let typ = match entry.typ {
        GroupType::All => OfpGroupType::All,
        GroupType::Select => OfpGroupType::Select,
        GroupType::Indirect => OfpGroupType::Indirect,
        GroupType::FastFailover => OfpGroupType::FastFailover,
    };
    let buckets = entry
        .buckets
        .iter()
        .map(|b| to_bucket(version, b))
        .collect::<Result<Vec<_>>>()?;
    let group_mod = OfpGroupMod {
        command: command as u16,
        typ: typ as u8,
        group_id: entry.group_id,
        buckets,
    };
    encode(&group_mod, version, xid)
}

pub fn experimenter(version: u8, exp: &Experimenter, xid: u32) -> Result<Vec<u8>> {
    let msg = OfpExperimenter {
        experimenter: exp.experimenter,
        exp_type: exp.exp_type,
        data: exp.payload().map_err(|e| Error::Malformed(e.to_string()))?,
    };
    encode(&msg, version, xid)
}

/* Rendering */

/// Renders the value of an OXM TLV
fn oxm_value_json(field: F, tlv: &OfpOxmTlv, strip_vid_present: bool) -> Value {
    use crate::request::Kind;
    let value = tlv.value();
    match (Field::Oxm(field).kind(), tlv.mask()) {
        (Kind::Int(_), None) if field == F::VlanVid && strip_vid_present => json!(uint(value) & 0x0fff),
        (Kind::Int(_), None) => json!(uint(value)),
        (Kind::Int(_), Some(mask)) => json!(format!("{:#x}/{:#x}", uint(value), uint(mask))),
        (Kind::Mac, None) => json!(mac_str(value)),
        (Kind::Mac, Some(mask)) => json!(format!("{}/{}", mac_str(value), mac_str(mask))),
        (Kind::Ipv4, None) if value.len() == 4 => json!(ipv4_str(value)),
        (Kind::Ipv4, Some(mask)) if value.len() == 4 => {
            json!(format!("{}/{}", ipv4_str(value), ipv4_str(mask)))
        }
        (Kind::Ipv6, None) if value.len() == 16 => json!(ipv6_str(value)),
        (Kind::Ipv6, Some(mask)) if value.len() == 16 => {
            json!(format!("{}/{}", ipv6_str(value), ipv6_str(mask)))
        }
        _ => json!(mac_str(value)),
    }
}

/// Renders a match as an object of field names
pub fn match_json(m: &OfpMatch) -> Value {
    let mut object = serde_json::Map::new();
    for tlv in m.fields() {
        match tlv.basic_field() {
            Some(field) => {
                object.insert(
                    Field::Oxm(field).name().to_owned(),
                    oxm_value_json(field, tlv, true),
                );
            }
            None => trace!("Not rendering non-basic OXM field {:?}", tlv),
        }
    }
    Value::Object(object)
}

fn action_str(action: &OfpAction) -> String {
    match *action {
        OfpAction::Output { port, .. } => format!("OUTPUT:{}", port_str(port)),
        OfpAction::CopyTtlOut => "COPY_TTL_OUT".to_owned(),
        OfpAction::CopyTtlIn => "COPY_TTL_IN".to_owned(),
        OfpAction::SetMplsTtl(ttl) => format!("SET_MPLS_TTL:{}", ttl),
        OfpAction::DecMplsTtl => "DEC_MPLS_TTL".to_owned(),
        OfpAction::PushVlan(eth) => format!("PUSH_VLAN:{}", eth),
        OfpAction::PopVlan => "POP_VLAN".to_owned(),
        OfpAction::PushMpls(eth) => format!("PUSH_MPLS:{}", eth),
        OfpAction::PopMpls(eth) => format!("POP_MPLS:{}", eth),
        OfpAction::SetQueue(id) => format!("SET_QUEUE:{}", id),
        OfpAction::Group(id) => format!("GROUP:{}", id),
        OfpAction::SetNwTtl(ttl) => format!("SET_NW_TTL:{}", ttl),
        OfpAction::DecNwTtl => "DEC_NW_TTL".to_owned(),
        OfpAction::SetField(ref tlv) => match tlv.basic_field() {
            Some(field) => {
                let value = oxm_value_json(field, tlv, false);
                let value = value.as_str().map(str::to_owned).unwrap_or_else(|| value.to_string());
                format!("SET_FIELD: {{{}:{}}}", Field::Oxm(field).name(), value)
            }
            None => "SET_FIELD: {unknown}".to_owned(),
        },
        OfpAction::PushPbb(eth) => format!("PUSH_PBB:{}", eth),
        OfpAction::PopPbb => "POP_PBB".to_owned(),
        OfpAction::Unknown { typ, .. } => format!("UNKNOWN:{}", typ),
    }
}

fn actions_json(actions: &[OfpAction]) -> Vec<Value> {
    actions.iter().map(|a| json!(action_str(a))).collect()
}

/// Renders instructions as a flat list, apply-actions are inlined
pub fn instructions_json(instructions: &[OfpInstruction]) -> Value {
    let mut list = vec![];
    for instr in instructions {
        match *instr {
            OfpInstruction::ApplyActions(ref actions) => list.extend(actions_json(actions)),
            OfpInstruction::WriteActions(ref actions) => {
                list.push(json!({ "WRITE_ACTIONS": actions_json(actions) }))
            }
            OfpInstruction::ClearActions => list.push(json!("CLEAR_ACTIONS")),
            OfpInstruction::GotoTable(table_id) => list.push(json!(format!("GOTO_TABLE:{}", table_id))),
            OfpInstruction::WriteMetadata { metadata, metadata_mask } => list.push(json!(format!(
                "WRITE_METADATA:{:#x}/{:#x}",
                metadata, metadata_mask
            ))),
            OfpInstruction::Meter(meter_id) => list.push(json!(format!("METER:{}", meter_id))),
            OfpInstruction::Unknown { typ, .. } => list.push(json!(format!("UNKNOWN:{}", typ))),
        }
    }
    Value::Array(list)
}

fn flow_stats_json(version: u8, replies: &[Reply]) -> Result<Value> {
    let mut flows = vec![];
    for body in bodies(replies, OfpStatsType::Flow) {
        for rec in sized_records(body, 0, 56, "flow stats")? {
            let mut stream = Cursor::new(&rec[48..]);
            let match_field = OfpMatch::read(&mut stream)?;
            let instructions = OfpInstruction::read_all(&rec[48 + stream.position() as usize..])?;
            let mut flow = json!({
                "length": rec.len(),
                "table_id": rec[2],
                "duration_sec": NetworkEndian::read_u32(&rec[4..8]),
                "duration_nsec": NetworkEndian::read_u32(&rec[8..12]),
                "priority": NetworkEndian::read_u16(&rec[12..14]),
                "idle_timeout": NetworkEndian::read_u16(&rec[14..16]),
                "hard_timeout": NetworkEndian::read_u16(&rec[16..18]),
                "cookie": NetworkEndian::read_u64(&rec[24..32]),
                "packet_count": NetworkEndian::read_u64(&rec[32..40]),
                "byte_count": NetworkEndian::read_u64(&rec[40..48]),
                "match": match_json(&match_field),
                "actions": instructions_json(&instructions),
            });
            if version == OFP_VERSION_1_3 {
                flow["flags"] = json!(NetworkEndian::read_u16(&rec[18..20]));
            }
            flows.push(flow);
        }
    }
    Ok(Value::Array(flows))
}

fn port_stats_json(version: u8, replies: &[Reply]) -> Result<Value> {
    const COUNTERS: [&str; 12] = [
        "rx_packets",
        "tx_packets",
        "rx_bytes",
        "tx_bytes",
        "rx_dropped",
        "tx_dropped",
        "rx_errors",
        "tx_errors",
        "rx_frame_err",
        "rx_over_err",
        "rx_crc_err",
        "collisions",
    ];
    let size = if version == OFP_VERSION_1_3 { 112 } else { 104 };
    let mut ports = vec![];
    for body in bodies(replies, OfpStatsType::Port) {
        for rec in fixed_records(body, size, "port stats")? {
            let mut port = json!({ "port_no": port_no_json(NetworkEndian::read_u32(&rec[0..4])) });
            for (i, name) in COUNTERS.iter().enumerate() {
                let off = 8 + i * 8;
                port[*name] = json!(NetworkEndian::read_u64(&rec[off..off + 8]));
            }
            if version == OFP_VERSION_1_3 {
                port["duration_sec"] = json!(NetworkEndian::read_u32(&rec[104..108]));
                port["duration_nsec"] = json!(NetworkEndian::read_u32(&rec[108..112]));
            }
            ports.push(port);
        }
    }
    Ok(Value::Array(ports))
}

fn queue_stats_json(version: u8, replies: &[Reply]) -> Result<Value> {
    let size = if version == OFP_VERSION_1_3 { 40 } else { 32 };
    let mut queues = vec![];
    for body in bodies(replies, OfpStatsType::Queue) {
        for rec in fixed_records(body, size, "queue stats")? {
            let mut queue = json!({
                "port_no": port_no_json(NetworkEndian::read_u32(&rec[0..4])),
                "queue_id": NetworkEndian::read_u32(&rec[4..8]),
                "tx_bytes": NetworkEndian::read_u64(&rec[8..16]),
                "tx_packets": NetworkEndian::read_u64(&rec[16..24]),
                "tx_errors": NetworkEndian::read_u64(&rec[24..32]),
            });
            if version == OFP_VERSION_1_3 {
                queue["duration_sec"] = json!(NetworkEndian::read_u32(&rec[32..36]));
                queue["duration_nsec"] = json!(NetworkEndian::read_u32(&rec[36..40]));
            }
            queues.push(queue);
        }
    }
    Ok(Value::Array(queues))
}

const GROUP_TYPES: [&str; 4] = ["ALL", "SELECT", "INDIRECT", "FF"];

fn group_type_json(typ: u8) -> Value {
    match GROUP_TYPES.get(typ as usize) {
        Some(name) => json!(name),
        None => json!(typ),
    }
}

fn group_stats_json(version: u8, replies: &[Reply]) -> Result<Value> {
    let header = if version == OFP_VERSION_1_3 { 40 } else { 32 };
    let mut groups = vec![];
    for body in bodies(replies, OfpStatsType::Group) {
        for rec in sized_records(body, 0, header, "group stats")? {
            let buckets = fixed_records(&rec[header..], 16, "bucket stats")?
                .map(|b| {
                    json!({
                        "packet_count": NetworkEndian::read_u64(&b[0..8]),
                        "byte_count": NetworkEndian::read_u64(&b[8..16]),
                    })
                })
                .collect::<Vec<_>>();
            let mut group = json!({
                "length": rec.len(),
                "group_id": NetworkEndian::read_u32(&rec[4..8]),
                "ref_count": NetworkEndian::read_u32(&rec[8..12]),
                "packet_count": NetworkEndian::read_u64(&rec[16..24]),
                "byte_count": NetworkEndian::read_u64(&rec[24..32]),
                "bucket_stats": buckets,
            });
            if version == OFP_VERSION_1_3 {
                group["duration_sec"] = json!(NetworkEndian::read_u32(&rec[32..36]));
                group["duration_nsec"] = json!(NetworkEndian::read_u32(&rec[36..40]));
            }
            groups.push(group);
        }
    }
    Ok(Value::Array(groups))
}

fn group_desc_json(replies: &[Reply]) -> Result<Value> {
    let mut groups = vec![];
    for body in bodies(replies, OfpStatsType::GroupDesc) {
        for rec in sized_records(body, 0, 8, "group description")? {
            let buckets = OfpBucket::read_all(&rec[8..])?
                .iter()
                .map(|b| {
                    json!({
                        "weight": b.weight,
                        "watch_port": port_no_json(b.watch_port),
                        "watch_group": b.watch_group,
                        "actions": actions_json(&b.actions),
                    })
                })
                .collect::<Vec<_>>();
            groups.push(json!({
                "type": group_type_json(rec[2]),
                "group_id": NetworkEndian::read_u32(&rec[4..8]),
                "buckets": buckets,
            }));
        }
    }
    Ok(Value::Array(groups))
}

const ACTION_NAMES: [(u8, &str); 16] = [
    (0, "OUTPUT"),
    (11, "COPY_TTL_OUT"),
    (12, "COPY_TTL_IN"),
    (15, "SET_MPLS_TTL"),
    (16, "DEC_MPLS_TTL"),
    (17, "PUSH_VLAN"),
    (18, "POP_VLAN"),
    (19, "PUSH_MPLS"),
    (20, "POP_MPLS"),
    (21, "SET_QUEUE"),
    (22, "GROUP"),
    (23, "SET_NW_TTL"),
    (24, "DEC_NW_TTL"),
    (25, "SET_FIELD"),
    (26, "PUSH_PBB"),
    (27, "POP_PBB"),
];

fn group_features_json(replies: &[Reply]) -> Result<Value> {
    const CAPABILITIES: [(u8, &str); 4] = [
        (0, "SELECT_WEIGHT"),
        (1, "SELECT_LIVENESS"),
        (2, "CHAINING"),
        (3, "CHAINING_CHECKS"),
    ];
    let types: Vec<(u8, &str)> = GROUP_TYPES.iter().enumerate().map(|(i, n)| (i as u8, *n)).collect();
    let mut features = vec![];
    for body in bodies(replies, OfpStatsType::GroupFeatures) {
        for rec in fixed_records(body, 40, "group features")? {
            let mut max_groups = serde_json::Map::new();
            let mut actions = serde_json::Map::new();
            for (i, name) in GROUP_TYPES.iter().enumerate() {
                let max = NetworkEndian::read_u32(&rec[8 + i * 4..12 + i * 4]);
                let bitmap = NetworkEndian::read_u32(&rec[24 + i * 4..28 + i * 4]);
                max_groups.insert((*name).to_owned(), json!(max));
                actions.insert((*name).to_owned(), bit_names(bitmap, &ACTION_NAMES));
            }
            features.push(json!({
                "types": bit_names(NetworkEndian::read_u32(&rec[0..4]), &types),
                "capabilities": bit_names(NetworkEndian::read_u32(&rec[4..8]), &CAPABILITIES),
                "max_groups": max_groups,
                "actions": actions,
            }));
        }
    }
    Ok(Value::Array(features))
}

/// Renders the stats both 1.2 and 1.3 know
pub fn render(version: u8, kind: StatsKind, replies: &[Reply]) -> Result<Value> {
    match kind {
        StatsKind::Desc => desc_json(replies),
        StatsKind::Flow => flow_stats_json(version, replies),
        StatsKind::AggregateFlow => aggregate_json(replies),
        StatsKind::Port => port_stats_json(version, replies),
        StatsKind::Queue => queue_stats_json(version, replies),
        StatsKind::GroupFeatures => group_features_json(replies),
        StatsKind::GroupDesc => group_desc_json(replies),
        StatsKind::Group => group_stats_json(version, replies),
        _ => Err(Error::NotSupported(kind.capability())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request;

    fn parse_match(value: Value) -> Match {
        serde_json::from_value(value).unwrap()
    }

    fn parse_actions(value: Value) -> Vec<Action> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn match_is_ordered_and_translated() {
        let m = parse_match(json!({
            "tp_dst": 80,
            "ip_proto": 6,
            "dl_vlan": 5,
            "nw_tos": 32,
            "in_port": 1,
        }));
        let oxm = to_match(OFP_VERSION_1_3, &m).unwrap();
        let fields: Vec<_> = oxm.fields().iter().map(|t| t.basic_field().unwrap()).collect();
        assert_eq!(vec![F::InPort, F::VlanVid, F::IpDscp, F::IpProto, F::TcpDst], fields);
        assert_eq!(&[0x10, 0x05], oxm.fields()[1].value());
        assert_eq!(&[8], oxm.fields()[2].value());
        assert_eq!(&[0, 80], oxm.fields()[4].value());
    }

    #[test]
    fn masked_vlan_keeps_value() {
        let m = parse_match(json!({ "vlan_vid": "0x1000/0x1000" }));
        let oxm = to_match(OFP_VERSION_1_3, &m).unwrap();
        assert_eq!(&[0x10, 0x00], oxm.fields()[0].value());
        assert_eq!(Some(&[0x10u8, 0x00][..]), oxm.fields()[0].mask());
    }

    #[test]
    fn transport_ports_need_protocol() {
        let m = parse_match(json!({ "tp_src": 22 }));
        match to_match(OFP_VERSION_1_3, &m) {
            Err(Error::Malformed(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        let m = parse_match(json!({ "tp_src": 22, "ip_proto": 17 }));
        let oxm = to_match(OFP_VERSION_1_3, &m).unwrap();
        assert_eq!(Some(F::UdpSrc), oxm.fields()[1].basic_field());
    }

    #[test]
    fn duplicate_after_aliasing_is_rejected() {
        let m = parse_match(json!({ "tcp_src": 22, "tp_src": 22, "ip_proto": 6 }));
        assert!(to_match(OFP_VERSION_1_3, &m).is_err());
    }

    #[test]
    fn newer_fields_rejected_by_1_2() {
        let m = parse_match(json!({ "tunnel_id": 7 }));
        assert!(to_match(OFP_VERSION_1_2, &m).is_err());
        assert!(to_match(OFP_VERSION_1_3, &m).is_ok());
    }

    #[test]
    fn instructions_apply_actions_first() {
        let actions = parse_actions(json!([
            { "type": "GOTO_TABLE", "table_id": 1 },
            { "type": "OUTPUT", "port": 2 },
            { "type": "WRITE_METADATA", "metadata": 5 },
            { "type": "METER", "meter_id": 3 },
        ]));
        let instructions = to_instructions(OFP_VERSION_1_3, &actions).unwrap();
        assert_eq!(
            vec![
                OfpInstruction::ApplyActions(vec![OfpAction::Output { port: 2, max_len: OFPCML_MAX }]),
                OfpInstruction::GotoTable(1),
                OfpInstruction::WriteMetadata { metadata: 5, metadata_mask: u64::max_value() },
                OfpInstruction::Meter(3),
            ],
            instructions
        );
        assert!(to_instructions(OFP_VERSION_1_2, &actions).is_err());
    }

    #[test]
    fn version_specific_actions_are_rejected() {
        let pbb = parse_actions(json!([{ "type": "PUSH_PBB", "ethertype": 0x88e7 }]));
        assert!(to_actions(OFP_VERSION_1_2, &pbb).is_err());
        assert_eq!(vec![OfpAction::PushPbb(0x88e7)], to_actions(OFP_VERSION_1_3, &pbb).unwrap());

        let old = parse_actions(json!([{ "type": "SET_VLAN_VID", "vlan_vid": 3 }]));
        assert!(to_actions(OFP_VERSION_1_3, &old).is_err());
    }

    #[test]
    fn renders_instructions() {
        let instructions = vec![
            OfpInstruction::ApplyActions(vec![
                OfpAction::Output { port: 0xffff_fffd, max_len: OFPCML_MAX },
                OfpAction::SetField(OfpOxmTlv::new(F::VlanVid, &[0x10, 0x03], None)),
            ]),
            OfpInstruction::WriteActions(vec![OfpAction::Group(4)]),
            OfpInstruction::GotoTable(2),
        ];
        assert_eq!(
            json!([
                "OUTPUT:CONTROLLER",
                "SET_FIELD: {vlan_vid:4099}",
                { "WRITE_ACTIONS": ["GROUP:4"] },
                "GOTO_TABLE:2",
            ]),
            instructions_json(&instructions)
        );
    }

    #[test]
    fn renders_match() {
        let m = parse_match(json!({
            "eth_dst": "00:00:00:00:00:01",
            "ipv4_src": "10.0.0.0/8",
            "eth_type": 2048,
            "vlan_vid": 3,
            "metadata": "0x10/0xff",
        }));
        let oxm = to_match(OFP_VERSION_1_3, &m).unwrap();
        assert_eq!(
            json!({
                "eth_dst": "00:00:00:00:00:01",
                "ipv4_src": "10.0.0.0/255.0.0.0",
                "eth_type": 2048,
                "vlan_vid": 3,
                "metadata": "0x10/0xff",
            }),
            match_json(&oxm)
        );
    }

    #[test]
    fn renders_flow_stats_over_fragments() {
        let mut match_bytes = vec![];
        let mut oxm = OfpMatch::new();
        oxm.add_tlv(OfpOxmTlv::new(F::InPort, &[0, 0, 0, 1], None));
        oxm.serialize(&mut match_bytes).unwrap();
        let apply_output = [0, 4, 0, 24, 0, 0, 0, 0, 0, 0, 0, 16, 0, 0, 0, 2, 0xff, 0xe5, 0, 0, 0, 0, 0, 0];

        let mut rec = vec![0; 48];
        let len = 48 + match_bytes.len() + apply_output.len();
        rec[1] = len as u8;
        rec[2] = 3;
        rec[13] = 100;
        rec[19] = 1;
        rec[39] = 7;
        rec.extend_from_slice(&match_bytes);
        rec.extend_from_slice(&apply_output);

        let replies = vec![
            stats_reply(OFP_VERSION_1_3, OfpStatsType::Flow, OFPMPF_REPLY_MORE, &rec),
            stats_reply(OFP_VERSION_1_3, OfpStatsType::Flow, 0, &rec),
        ];
        let flows = render(OFP_VERSION_1_3, StatsKind::Flow, &replies).unwrap();
        assert_eq!(2, flows.as_array().unwrap().len());
        let flow = &flows[0];
        assert_eq!(json!(3), flow["table_id"]);
        assert_eq!(json!(100), flow["priority"]);
        assert_eq!(json!(1), flow["flags"]);
        assert_eq!(json!(7), flow["packet_count"]);
        assert_eq!(json!({ "in_port": 1 }), flow["match"]);
        assert_eq!(json!(["OUTPUT:2"]), flow["actions"]);
    }

    #[test]
    fn truncated_flow_stats_fail() {
        let replies = vec![stats_reply(OFP_VERSION_1_3, OfpStatsType::Flow, 0, &[0, 80, 0, 0])];
        match render(OFP_VERSION_1_3, StatsKind::Flow, &replies) {
            Err(Error::BadReply(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn renders_group_desc() {
        let body = [
            0, 24, 1, 0, 0, 0, 0, 9, // select group 9
            0, 16, 0, 5, 0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, // bucket without actions
        ];
        let replies = vec![stats_reply(OFP_VERSION_1_2, OfpStatsType::GroupDesc, 0, &body)];
        let groups = render(OFP_VERSION_1_2, StatsKind::GroupDesc, &replies).unwrap();
        assert_eq!(
            json!([{
                "type": "SELECT",
                "group_id": 9,
                "buckets": [{ "weight": 5, "watch_port": 1, "watch_group": 0xffff_ffffu32, "actions": [] }],
            }]),
            groups
        );
    }

    #[test]
    fn group_mod_defaults() {
        let entry: request::GroupEntry = serde_json::from_value(json!({
            "dpid": 1,
            "group_id": 2,
            "buckets": [{ "actions": [{ "type": "OUTPUT", "port": 1 }] }],
        }))
        .unwrap();
        let msg = group_mod(OFP_VERSION_1_3, EntryCommand::Add, &entry, 9).unwrap();
        assert_eq!(OFP_VERSION_1_3, msg[0]);
        assert_eq!(15, msg[1]);
        // watch_port and watch_group of the bucket
        assert_eq!(&[0xff; 8], &msg[20..28]);
    }
}
