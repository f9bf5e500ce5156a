//! The OpenFlow 1.2 adapter

use super::oxm;
use super::*;

/// Adapter for OpenFlow 1.2 switches
#[derive(Debug)]
pub struct Ofctl12;

impl Ofctl for Ofctl12 {
    fn version(&self) -> u8 {
        OFP_VERSION_1_2
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
            - Capabilities::METER_FEATURES
            - Capabilities::METER_CONFIG
            - Capabilities::METER_STATS
            - Capabilities::MOD_METER_ENTRY
    }

    fn reply_more_flag(&self) -> u16 {
        OFPSF_REPLY_MORE
    }

    fn stats_request(&self, kind: StatsKind, filter: &StatsFilter, xid: u32) -> Result<Vec<u8>> {
        match kind {
            // 1.2 has no port description multipart, the ports come with the features
            StatsKind::PortDesc => OfpHeader::new(OFP_VERSION_1_2, OfpType::FeaturesRequest, xid)
                .to_bytes()
                .map_err(Error::from),
            _ => oxm::stats_request(OFP_VERSION_1_2, kind, filter, xid),
        }
    }

    fn render(&self, kind: StatsKind, replies: &[Reply]) -> Result<Value> {
        match kind {
            StatsKind::PortDesc => Ok(features_ports_json(replies, OFP_VERSION_1_2)),
            _ => oxm::render(OFP_VERSION_1_2, kind, replies),
        }
    }

    fn flow_mod(&self, cmd: FlowCommand, entry: &FlowEntry, xid: u32) -> Result<Vec<u8>> {
        oxm::flow_mod(OFP_VERSION_1_2, cmd, entry, xid)
    }

    fn port_mod(&self, config: &PortConfig, port: &OfpPort, xid: u32) -> Result<Vec<u8>> {
        oxm::port_mod(OFP_VERSION_1_2, config, port, xid)
    }

    fn group_mod(&self, cmd: EntryCommand, entry: &GroupEntry, xid: u32) -> Result<Vec<u8>> {
        oxm::group_mod(OFP_VERSION_1_2, cmd, entry, xid)
    }

    fn experimenter(&self, exp: &Experimenter, xid: u32) -> Result<Vec<u8>> {
        oxm::experimenter(OFP_VERSION_1_2, exp, xid)
    }
}
