//! Routes stats and features replies of the switches to the waiting requests

use crate::ofctl::{Registry, Reply};
use crate::openflow::messages::{OfpStatsReply, OfpSwitchFeatures};
use crate::waiters::{Error, Waiters};

use std::sync::Arc;

/// Appends replies to their pending requests and completes them
/// on the terminal fragment
#[derive(Clone)]
pub struct ReplyCorrelator {
    waiters: Arc<Waiters<Reply>>,
    registry: Arc<Registry>,
}

impl ReplyCorrelator {
    pub fn new(waiters: Arc<Waiters<Reply>>, registry: Arc<Registry>) -> ReplyCorrelator {
        ReplyCorrelator { waiters, registry }
    }

    /// Handles a stats reply. The adapter of `version` tells which flag
    /// announces further fragments.
    pub fn stats_reply(&self, dpid: u64, version: u8, xid: u32, reply: OfpStatsReply) {
        let more_flag = match self.registry.resolve(version) {
            Ok(ofctl) => ofctl.reply_more_flag(),
            Err(e) => {
                debug!("Dropping stats reply {} of datapath {}: {}", xid, dpid, e);
                return;
            }
        };
        let more = reply.flags() & more_flag != 0;
        trace!(
            "Stats reply {} of datapath {} with type {}, more: {}",
            xid,
            dpid,
            reply.stats_type(),
            more
        );
        self.deliver(dpid, xid, Reply::Stats(reply), more);
    }

    /// Handles a features reply, which is never fragmented
    pub fn features_reply(&self, dpid: u64, xid: u32, features: OfpSwitchFeatures) {
        self.deliver(dpid, xid, Reply::Features(features), false);
    }

    /// Lets requests wait on a datapath that joined
    pub fn connected(&self, dpid: u64) {
        self.waiters.open(dpid);
    }

    /// Releases all requests that wait on a disconnected datapath
    pub fn disconnected(&self, dpid: u64) {
        self.waiters.forget(dpid);
    }

    fn deliver(&self, dpid: u64, xid: u32, reply: Reply, more: bool) {
        match self.waiters.deliver(dpid, xid, reply, more) {
            Ok(()) => (),
            Err(Error::NotFound(..)) => debug!("Nobody waits for reply {} of datapath {}", xid, dpid),
            Err(e) => warn!("Cannot deliver reply: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openflow::messages::deserialize::Deserialize;
    use crate::openflow::messages::*;
    use std::time::Duration;

    fn reply(version: u8, flags: u16) -> OfpStatsReply {
        let mut bytes = vec![0, OfpStatsType::Desc as u8, (flags >> 8) as u8, flags as u8];
        if version != OFP_VERSION_1_0 {
            bytes.extend_from_slice(&[0; 4]);
        }
        OfpStatsReply::deserialize(version, bytes).unwrap()
    }

    fn correlator() -> (Arc<Waiters<Reply>>, ReplyCorrelator) {
        let waiters = Arc::new(Waiters::new());
        let correlator = ReplyCorrelator::new(waiters.clone(), Arc::new(Registry::new()));
        correlator.connected(1);
        correlator.connected(4);
        (waiters, correlator)
    }

    #[test]
    fn completes_on_last_fragment() {
        let (waiters, correlator) = correlator();
        let handle = waiters.register(1, 9).unwrap();
        correlator.stats_reply(1, OFP_VERSION_1_3, 9, reply(OFP_VERSION_1_3, OFPMPF_REPLY_MORE));
        correlator.stats_reply(1, OFP_VERSION_1_3, 9, reply(OFP_VERSION_1_3, OFPMPF_REPLY_MORE));
        assert!(waiters.is_pending(1, 9));
        correlator.stats_reply(1, OFP_VERSION_1_3, 9, reply(OFP_VERSION_1_3, 0));
        assert!(!waiters.is_pending(1, 9));

        let replies = waiters.wait(handle, Duration::from_millis(10)).unwrap();
        let flags: Vec<u16> = replies
            .iter()
            .map(|r| match *r {
                Reply::Stats(ref s) => s.flags(),
                Reply::Features(_) => panic!("unexpected features"),
            })
            .collect();
        assert_eq!(vec![1, 1, 0], flags);
    }

    #[test]
    fn flag_bits_other_than_more_do_not_continue() {
        let (waiters, correlator) = correlator();
        let handle = waiters.register(1, 9).unwrap();
        correlator.stats_reply(1, OFP_VERSION_1_0, 9, reply(OFP_VERSION_1_0, 0x8000));
        assert_eq!(1, waiters.wait(handle, Duration::from_millis(10)).unwrap().len());
    }

    #[test]
    fn features_reply_is_terminal() {
        let (waiters, correlator) = correlator();
        let handle = waiters.register(4, 2).unwrap();
        let features = OfpSwitchFeatures {
            datapath_id: 4,
            n_buffers: 0,
            n_tables: 1,
            auxiliary_id: 0,
            capabilities: 0,
            ports: vec![],
        };
        correlator.features_reply(4, 2, features);
        assert_eq!(1, waiters.wait(handle, Duration::from_millis(10)).unwrap().len());
    }

    #[test]
    fn stray_replies_are_dropped() {
        let (waiters, correlator) = correlator();
        let handle = waiters.register(1, 9).unwrap();
        correlator.stats_reply(1, OFP_VERSION_1_3, 10, reply(OFP_VERSION_1_3, 0));
        correlator.stats_reply(2, OFP_VERSION_1_3, 9, reply(OFP_VERSION_1_3, 0));
        // no adapter for OpenFlow 1.1
        correlator.stats_reply(1, 0x02, 9, reply(0x02, 0));
        assert!(waiters.is_pending(1, 9));
        correlator.stats_reply(1, OFP_VERSION_1_3, 9, reply(OFP_VERSION_1_3, 0));
        assert_eq!(1, waiters.wait(handle, Duration::from_millis(10)).unwrap().len());
    }

    #[test]
    fn disconnect_abandons() {
        let (waiters, correlator) = correlator();
        let handle = waiters.register(1, 9).unwrap();
        correlator.disconnected(1);
        match waiters.wait(handle, Duration::from_millis(10)) {
            Err(Error::Abandoned(1, 9)) => (),
            other => panic!("unexpected {:?}", other.map(|r| r.len())),
        }
    }
}
