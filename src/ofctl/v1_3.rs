//! The OpenFlow 1.3 adapter, the only one with meters and a port
//! description multipart

use super::oxm;
use super::*;
use crate::request::{Band, MeterFlag};

/// Adapter for OpenFlow 1.3 switches
#[derive(Debug)]
pub struct Ofctl13;

const METER_FLAGS: [(u8, &str); 4] = [(0, "KBPS"), (1, "PKTPS"), (2, "BURST"), (3, "STATS")];

const BAND_TYPES: [(u8, &str); 2] = [(1, "DROP"), (2, "DSCP_REMARK")];

fn meter_flags(flags: &[MeterFlag]) -> u16 {
    flags.iter().fold(0, |acc, flag| {
        acc | match *flag {
            MeterFlag::Kbps => OfpMeterFlags::Kbps as u16,
            MeterFlag::Pktps => OfpMeterFlags::Pktps as u16,
            MeterFlag::Burst => OfpMeterFlags::Burst as u16,
            MeterFlag::Stats => OfpMeterFlags::Stats as u16,
        }
    })
}

fn to_band(band: &Band) -> OfpMeterBand {
    match *band {
        Band::Drop { rate, burst_size } => OfpMeterBand::Drop { rate, burst_size },
        Band::DscpRemark { rate, burst_size, prec_level } => OfpMeterBand::DscpRemark {
            rate,
            burst_size,
            prec_level,
        },
        Band::Experimenter { rate, burst_size, experimenter } => OfpMeterBand::Experimenter {
            rate,
            burst_size,
            experimenter,
        },
    }
}

fn band_json(band: &OfpMeterBand) -> Value {
    match *band {
        OfpMeterBand::Drop { rate, burst_size } => json!({
            "type": "DROP",
            "rate": rate,
            "burst_size": burst_size,
        }),
        OfpMeterBand::DscpRemark { rate, burst_size, prec_level } => json!({
            "type": "DSCP_REMARK",
            "rate": rate,
            "burst_size": burst_size,
            "prec_level": prec_level,
        }),
        OfpMeterBand::Experimenter { rate, burst_size, experimenter } => json!({
            "type": "EXPERIMENTER",
            "rate": rate,
            "burst_size": burst_size,
            "experimenter": experimenter,
        }),
    }
}

fn meter_stats_json(replies: &[Reply]) -> Result<Value> {
    let mut meters = vec![];
    for body in bodies(replies, OfpStatsType::Meter) {
        for rec in sized_records(body, 4, 40, "meter stats")? {
            let bands = fixed_records(&rec[40..], 16, "band stats")?
                .map(|b| {
                    json!({
                        "packet_band_count": NetworkEndian::read_u64(&b[0..8]),
                        "byte_band_count": NetworkEndian::read_u64(&b[8..16]),
                    })
                })
                .collect::<Vec<_>>();
            meters.push(json!({
                "meter_id": NetworkEndian::read_u32(&rec[0..4]),
                "len": rec.len(),
                "flow_count": NetworkEndian::read_u32(&rec[12..16]),
                "packet_in_count": NetworkEndian::read_u64(&rec[16..24]),
                "byte_in_count": NetworkEndian::read_u64(&rec[24..32]),
                "duration_sec": NetworkEndian::read_u32(&rec[32..36]),
                "duration_nsec": NetworkEndian::read_u32(&rec[36..40]),
                "band_stats": bands,
            }));
        }
    }
    Ok(Value::Array(meters))
}

fn meter_config_json(replies: &[Reply]) -> Result<Value> {
    let mut meters = vec![];
    for body in bodies(replies, OfpStatsType::MeterConfig) {
        for rec in sized_records(body, 0, 8, "meter config")? {
            let bands: Vec<Value> = OfpMeterBand::read_all(&rec[8..])?.iter().map(band_json).collect();
            meters.push(json!({
                "flags": bit_names(u32::from(NetworkEndian::read_u16(&rec[2..4])), &METER_FLAGS),
                "meter_id": NetworkEndian::read_u32(&rec[4..8]),
                "bands": bands,
            }));
        }
    }
    Ok(Value::Array(meters))
}

fn meter_features_json(replies: &[Reply]) -> Result<Value> {
    let mut features = vec![];
    for body in bodies(replies, OfpStatsType::MeterFeatures) {
        for rec in fixed_records(body, 16, "meter features")? {
            features.push(json!({
                "max_meter": NetworkEndian::read_u32(&rec[0..4]),
                "band_types": bit_names(NetworkEndian::read_u32(&rec[4..8]), &BAND_TYPES),
                "capabilities": bit_names(NetworkEndian::read_u32(&rec[8..12]), &METER_FLAGS),
                "max_bands": rec[12],
                "max_color": rec[13],
            }));
        }
    }
    Ok(Value::Array(features))
}

fn port_desc_json(replies: &[Reply]) -> Result<Value> {
    let mut ports = vec![];
    for body in bodies(replies, OfpStatsType::PortDesc) {
        for rec in fixed_records(body, OfpPort::length(OFP_VERSION_1_3), "port description")? {
            let port = OfpPort::read(OFP_VERSION_1_3, &mut io::Cursor::new(rec))?;
            ports.push(port_json(&port, OFP_VERSION_1_3));
        }
    }
    Ok(Value::Array(ports))
}

impl Ofctl for Ofctl13 {
    fn version(&self) -> u8 {
        OFP_VERSION_1_3
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn reply_more_flag(&self) -> u16 {
        OFPMPF_REPLY_MORE
    }

    fn stats_request(&self, kind: StatsKind, filter: &StatsFilter, xid: u32) -> Result<Vec<u8>> {
        let all_meters = || [OFPM_ALL.to_be_bytes(), [0; 4]].concat();
        let (typ, body) = match kind {
            StatsKind::MeterFeatures => (OfpStatsType::MeterFeatures, vec![]),
            StatsKind::MeterConfig => (OfpStatsType::MeterConfig, all_meters()),
            StatsKind::Meter => (OfpStatsType::Meter, all_meters()),
            StatsKind::PortDesc => (OfpStatsType::PortDesc, vec![]),
            _ => return oxm::stats_request(OFP_VERSION_1_3, kind, filter, xid),
        };
        super::stats_request(OFP_VERSION_1_3, typ, body, xid)
    }

    fn render(&self, kind: StatsKind, replies: &[Reply]) -> Result<Value> {
        match kind {
            StatsKind::MeterFeatures => meter_features_json(replies),
            StatsKind::MeterConfig => meter_config_json(replies),
            StatsKind::Meter => meter_stats_json(replies),
            StatsKind::PortDesc => port_desc_json(replies),
            _ => oxm::render(OFP_VERSION_1_3, kind, replies),
        }
    }

    fn flow_mod(&self, cmd: FlowCommand, entry: &FlowEntry, xid: u32) -> Result<Vec<u8>> {
        oxm::flow_mod(OFP_VERSION_1_3, cmd, entry, xid)
    }

    fn port_mod(&self, config: &PortConfig, port: &OfpPort, xid: u32) -> Result<Vec<u8>> {
        oxm::port_mod(OFP_VERSION_1_3, config, port, xid)
    }

    fn meter_mod(&self, cmd: EntryCommand, entry: &MeterEntry, xid: u32) -> Result<Vec<u8>> {
        let command = match cmd {
            EntryCommand::Add => OfpMeterModCommand::Add,
            EntryCommand::Modify => OfpMeterModCommand::Modify,
            EntryCommand::Delete => OfpMeterModCommand::Delete,
        };
        let meter_mod = OfpMeterMod {
            command: command as u16,
            flags: meter_flags(&entry.flags),
            meter_id: entry.meter_id,
            bands: entry.bands.iter().map(to_band).collect(),
        };
        encode(&meter_mod, OFP_VERSION_1_3, xid)
    }

    fn group_mod(&self, cmd: EntryCommand, entry: &GroupEntry, xid: u32) -> Result<Vec<u8>> {
        oxm::group_mod(OFP_VERSION_1_3, cmd, entry, xid)
    }

    fn experimenter(&self, exp: &Experimenter, xid: u32) -> Result<Vec<u8>> {
        oxm::experimenter(OFP_VERSION_1_3, exp, xid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_mod_layout() {
        let entry: MeterEntry = serde_json::from_value(json!({
            "dpid": 1,
            "meter_id": 1,
            "flags": "KBPS",
            "bands": [{ "type": "DROP", "rate": 1000 }],
        }))
        .unwrap();
        let msg = Ofctl13.meter_mod(EntryCommand::Add, &entry, 3).unwrap();
        assert_eq!(
            vec![
                OFP_VERSION_1_3, 29, 0, 32, 0, 0, 0, 3, // header
                0, 0, 0, 1, 0, 0, 0, 1, // command, flags and meter id
                0, 1, 0, 16, 0, 0, 0x03, 0xe8, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
            msg
        );
    }

    #[test]
    fn meter_stats_requests() {
        let filter = StatsFilter::default();
        let msg = Ofctl13.stats_request(StatsKind::Meter, &filter, 1).unwrap();
        assert_eq!(&[0, 9, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0], &msg[8..]);
        let msg = Ofctl13.stats_request(StatsKind::PortDesc, &filter, 1).unwrap();
        assert_eq!(&[OFP_VERSION_1_3, 18, 0, 16], &msg[0..4]);
        assert_eq!(&[0, 13], &msg[8..10]);
    }

    #[test]
    fn renders_meter_config() {
        let body = [
            0, 24, 0, 0x09, 0, 0, 0, 5, // KBPS | STATS, meter 5
            0, 2, 0, 16, 0, 0, 0, 10, 0, 0, 0, 1, 3, 0, 0, 0, // DSCP remark
        ];
        let replies = vec![stats_reply(OFP_VERSION_1_3, OfpStatsType::MeterConfig, 0, &body)];
        assert_eq!(
            json!([{
                "flags": ["KBPS", "STATS"],
                "meter_id": 5,
                "bands": [{ "type": "DSCP_REMARK", "rate": 10, "burst_size": 1, "prec_level": 3 }],
            }]),
            Ofctl13.render(StatsKind::MeterConfig, &replies).unwrap()
        );
    }

    #[test]
    fn renders_meter_stats_across_fragments() {
        let mut rec = vec![0; 56];
        rec[3] = 1;
        rec[5] = 56;
        rec[15] = 2;
        rec[47] = 9;
        let replies = vec![
            stats_reply(OFP_VERSION_1_3, OfpStatsType::Meter, OFPMPF_REPLY_MORE, &rec),
            stats_reply(OFP_VERSION_1_3, OfpStatsType::Meter, 0, &rec),
        ];
        let meters = Ofctl13.render(StatsKind::Meter, &replies).unwrap();
        assert_eq!(2, meters.as_array().unwrap().len());
        assert_eq!(json!(1), meters[0]["meter_id"]);
        assert_eq!(json!(2), meters[0]["flow_count"]);
        assert_eq!(json!([{ "packet_band_count": 9, "byte_band_count": 0 }]), meters[1]["band_stats"]);
    }

    #[test]
    fn renders_meter_features() {
        let body = [0, 0, 1, 0, 0, 0, 0, 0x06, 0, 0, 0, 0x0f, 2, 8, 0, 0];
        let replies = vec![stats_reply(OFP_VERSION_1_3, OfpStatsType::MeterFeatures, 0, &body)];
        assert_eq!(
            json!([{
                "max_meter": 256,
                "band_types": ["DROP", "DSCP_REMARK"],
                "capabilities": ["KBPS", "PKTPS", "BURST", "STATS"],
                "max_bands": 2,
                "max_color": 8,
            }]),
            Ofctl13.render(StatsKind::MeterFeatures, &replies).unwrap()
        );
    }

    #[test]
    fn renders_port_stats_with_duration() {
        let mut rec = vec![0; 112];
        rec[3] = 4;
        rec[107] = 30;
        let replies = vec![stats_reply(OFP_VERSION_1_3, OfpStatsType::Port, 0, &rec)];
        let ports = Ofctl13.render(StatsKind::Port, &replies).unwrap();
        assert_eq!(json!(4), ports[0]["port_no"]);
        assert_eq!(json!(30), ports[0]["duration_sec"]);

        let short = vec![stats_reply(OFP_VERSION_1_3, OfpStatsType::Port, 0, &rec[..104])];
        assert!(Ofctl13.render(StatsKind::Port, &short).is_err());
    }
}
