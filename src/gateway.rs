/*!
The facade between the administrative surface and the connected switches

Every operation looks up the target switch, resolves the version adapter of
its negotiated protocol version and checks the adapter's capabilities
before anything is sent. Stats queries register a waiter before their
request goes out and block until the correlator completes it, the switch
disconnects or the configured timeout elapses. Mutations are fire and
forget.
*/

use crate::ofctl::{self, Capabilities, Ofctl, Registry, Reply, StatsKind};
use crate::openflow::messages::OfpPort;
use crate::request::{self, EntryCommand, Experimenter, FlowCommand, FlowEntry, GroupEntry};
use crate::request::{MeterEntry, PortConfig, StatsFilter};
use crate::waiters::{self, Waiters};

use serde_json::{Map, Value};

use std::error;
use std::fmt;
use std::io;
use std::result;
use std::sync::Arc;
use std::time::Duration;

/// A connected switch
pub trait Datapath: Send + Sync {
    /// The datapath id
    fn id(&self) -> u64;

    /// The negotiated protocol version
    fn version(&self) -> u8;

    /// Writes a complete message to the switch
    fn send(&self, msg: &[u8]) -> io::Result<()>;

    /// The current description of a port
    fn port(&self, port_no: u32) -> Option<OfpPort>;
}

/// All connected switches
pub trait DatapathSet: Send + Sync {
    /// The ids of the connected switches
    fn dpids(&self) -> Vec<u64>;

    /// Looks up a connected switch
    fn get(&self, dpid: u64) -> Option<Arc<dyn Datapath>>;
}

#[derive(Debug)]
pub enum Error {
    BadRequest(String),
    NotFound(String),
    NotSupported(String),
    Timeout(u64, u32),
    DuplicateRequest(u64, u32),
    Io(io::Error),
    Decode(ofctl::Error),
}

impl Error {
    /// The HTTP status code to report the error with
    pub fn status(&self) -> u16 {
        match *self {
            Error::BadRequest(_) => 400,
            Error::NotFound(_) => 404,
            Error::NotSupported(_) => 501,
            Error::Timeout(..) => 504,
            Error::DuplicateRequest(..) | Error::Io(_) | Error::Decode(_) => 500,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BadRequest(ref s) | Error::NotFound(ref s) | Error::NotSupported(ref s) => {
                write!(f, "{}", s)
            }
            Error::Timeout(dpid, xid) => {
                write!(f, "Datapath {} did not answer request {} in time", dpid, xid)
            }
            Error::DuplicateRequest(dpid, xid) => {
                write!(f, "Request {} on datapath {} is already pending", xid, dpid)
            }
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Decode(ref e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "Gateway error"
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<request::Error> for Error {
    fn from(e: request::Error) -> Self {
        Error::BadRequest(e.to_string())
    }
}

impl From<ofctl::Error> for Error {
    fn from(e: ofctl::Error) -> Self {
        match e {
            ofctl::Error::Malformed(_) => Error::BadRequest(e.to_string()),
            ofctl::Error::NotSupported(_) | ofctl::Error::UnsupportedVersion(_) => {
                Error::NotSupported(e.to_string())
            }
            ofctl::Error::BadReply(_) => Error::Decode(e),
        }
    }
}

impl From<waiters::Error> for Error {
    fn from(e: waiters::Error) -> Self {
        match e {
            waiters::Error::DuplicateRequest(dpid, xid) => Error::DuplicateRequest(dpid, xid),
            waiters::Error::TimedOut(dpid, xid) => Error::Timeout(dpid, xid),
            waiters::Error::NotFound(..) | waiters::Error::Abandoned(..) => {
                Error::NotFound(e.to_string())
            }
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

fn gen_xid() -> u32 {
    let xid = rand::random();
    trace!("Using xid {} for the outgoing message", xid);
    xid
}

pub struct StatsGateway {
    datapaths: Arc<dyn DatapathSet>,
    waiters: Arc<Waiters<Reply>>,
    registry: Arc<Registry>,
    timeout: Duration,
}

impl StatsGateway {
    pub fn new(
        datapaths: Arc<dyn DatapathSet>,
        waiters: Arc<Waiters<Reply>>,
        registry: Arc<Registry>,
        timeout: Duration,
    ) -> StatsGateway {
        StatsGateway {
            datapaths,
            waiters,
            registry,
            timeout,
        }
    }

    fn datapath(&self, dpid: u64) -> Result<Arc<dyn Datapath>> {
        self.datapaths
            .get(dpid)
            .ok_or_else(|| Error::NotFound(format!("Datapath {} is not connected", dpid)))
    }

    fn adapter(&self, dp: &dyn Datapath, cap: Capabilities) -> Result<&dyn Ofctl> {
        let ofctl = self.registry.resolve(dp.version())?;
        if !ofctl.supports(cap) {
            return Err(ofctl::Error::NotSupported(cap).into());
        }
        Ok(ofctl)
    }

    /// The ids of all connected switches in ascending order
    pub fn switches(&self) -> Vec<u64> {
        let mut dpids = self.datapaths.dpids();
        dpids.sort();
        dpids
    }

    fn query(&self, dpid: u64, kind: StatsKind, filter: &StatsFilter) -> Result<(Vec<Reply>, &dyn Ofctl)> {
        let dp = self.datapath(dpid)?;
        let ofctl = self.adapter(&*dp, kind.capability())?;
        let xid = gen_xid();
        let msg = ofctl.stats_request(kind, filter, xid)?;

        let handle = self.waiters.register(dpid, xid)?;
        if let Err(e) = dp.send(&msg) {
            self.waiters.cancel(dpid, xid);
            return Err(e.into());
        }
        debug!("Waiting for {} stats of datapath {}", kind.path(), dpid);
        let replies = self.waiters.wait(handle, self.timeout)?;
        Ok((replies, ofctl))
    }

    /// Queries a switch and returns all reply fragments in arrival order
    pub fn stats(&self, dpid: u64, kind: StatsKind, filter: &StatsFilter) -> Result<Vec<Reply>> {
        self.query(dpid, kind, filter).map(|(replies, _)| replies)
    }

    /// Queries a switch and renders the result as `{"<dpid>": ...}`
    pub fn stats_json(&self, dpid: u64, kind: StatsKind, filter: &StatsFilter) -> Result<Value> {
        let (replies, ofctl) = self.query(dpid, kind, filter)?;
        let mut result = Map::new();
        result.insert(dpid.to_string(), ofctl.render(kind, &replies)?);
        Ok(Value::Object(result))
    }

    fn send<F>(&self, dpid: u64, cap: Capabilities, build: F) -> Result<()>
    where
        F: FnOnce(&dyn Ofctl, &dyn Datapath, u32) -> Result<Vec<u8>>,
    {
        let dp = self.datapath(dpid)?;
        let ofctl = self.adapter(&*dp, cap)?;
        let msg = build(ofctl, &*dp, gen_xid())?;
        dp.send(&msg)?;
        Ok(())
    }

    pub fn mod_flow_entry(&self, cmd: FlowCommand, entry: &FlowEntry) -> Result<()> {
        self.send(entry.dpid.0, Capabilities::MOD_FLOW_ENTRY, |ofctl, _, xid| {
            Ok(ofctl.flow_mod(cmd, entry, xid)?)
        })
    }

    /// Deletes every flow entry of a switch
    pub fn delete_flow_entry(&self, dpid: u64) -> Result<()> {
        self.mod_flow_entry(FlowCommand::Delete, &FlowEntry::all(dpid))
    }

    pub fn mod_meter_entry(&self, cmd: EntryCommand, entry: &MeterEntry) -> Result<()> {
        self.send(entry.dpid.0, Capabilities::MOD_METER_ENTRY, |ofctl, _, xid| {
            Ok(ofctl.meter_mod(cmd, entry, xid)?)
        })
    }

    pub fn mod_group_entry(&self, cmd: EntryCommand, entry: &GroupEntry) -> Result<()> {
        self.send(entry.dpid.0, Capabilities::MOD_GROUP_ENTRY, |ofctl, _, xid| {
            Ok(ofctl.group_mod(cmd, entry, xid)?)
        })
    }

    /// Changes the behavior of a port the switch announced
    pub fn mod_port_behavior(&self, config: &PortConfig) -> Result<()> {
        self.send(config.dpid.0, Capabilities::MOD_PORT_BEHAVIOR, |ofctl, dp, xid| {
            let port = dp.port(config.port_no).ok_or_else(|| {
                Error::NotFound(format!("Port {} of datapath {} is unknown", config.port_no, dp.id()))
            })?;
            Ok(ofctl.port_mod(config, &port, xid)?)
        })
    }

    pub fn send_experimenter(&self, dpid: u64, exp: &Experimenter) -> Result<()> {
        self.send(dpid, Capabilities::SEND_EXPERIMENTER, |ofctl, _, xid| {
            Ok(ofctl.experimenter(exp, xid)?)
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::correlator::ReplyCorrelator;
    use crate::openflow::messages::deserialize::Deserialize;
    use crate::openflow::messages::*;
    use byteorder::{ByteOrder, NetworkEndian};
    use std::collections::BTreeMap;
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::sync::Mutex;
    use std::thread;

    /// A switch that hands every sent message to a channel
    pub struct FakeSwitch {
        pub id: u64,
        pub version: u8,
        pub ports: Vec<OfpPort>,
        pub tx: Mutex<Sender<Vec<u8>>>,
    }

    impl Datapath for FakeSwitch {
        fn id(&self) -> u64 {
            self.id
        }

        fn version(&self) -> u8 {
            self.version
        }

        fn send(&self, msg: &[u8]) -> io::Result<()> {
            self.tx
                .lock()
                .unwrap()
                .send(msg.to_vec())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "switch is gone"))
        }

        fn port(&self, port_no: u32) -> Option<OfpPort> {
            self.ports.iter().find(|p| p.port_no == port_no).cloned()
        }
    }

    pub struct FakeSet {
        pub switches: Mutex<BTreeMap<u64, Arc<FakeSwitch>>>,
        pub correlator: ReplyCorrelator,
    }

    impl FakeSet {
        /// Adds a switch and returns the receiving end of its messages
        pub fn connect(&self, id: u64, version: u8, ports: Vec<OfpPort>) -> Receiver<Vec<u8>> {
            let (tx, rx) = channel();
            let switch = FakeSwitch {
                id,
                version,
                ports,
                tx: Mutex::new(tx),
            };
            self.switches.lock().unwrap().insert(id, Arc::new(switch));
            self.correlator.connected(id);
            rx
        }
    }

    impl DatapathSet for FakeSet {
        fn dpids(&self) -> Vec<u64> {
            self.switches.lock().unwrap().keys().rev().cloned().collect()
        }

        fn get(&self, dpid: u64) -> Option<Arc<dyn Datapath>> {
            self.switches
                .lock()
                .unwrap()
                .get(&dpid)
                .map(|s| s.clone() as Arc<dyn Datapath>)
        }
    }

    pub fn setup(timeout: Duration) -> (Arc<FakeSet>, StatsGateway, ReplyCorrelator) {
        let waiters = Arc::new(Waiters::new());
        let registry = Arc::new(Registry::new());
        let correlator = ReplyCorrelator::new(waiters.clone(), registry.clone());
        let set = Arc::new(FakeSet {
            switches: Mutex::new(BTreeMap::new()),
            correlator: correlator.clone(),
        });
        let gateway = StatsGateway::new(set.clone(), waiters, registry, timeout);
        (set, gateway, correlator)
    }

    pub fn xid(msg: &[u8]) -> u32 {
        NetworkEndian::read_u32(&msg[4..8])
    }

    /// A stats reply to the request `msg` with the given flags and body
    pub fn reply_to(msg: &[u8], flags: u16, body: &[u8]) -> OfpStatsReply {
        let version = msg[0];
        let mut bytes = msg[8..12].to_vec();
        NetworkEndian::write_u16(&mut bytes[2..4], flags);
        if version != OFP_VERSION_1_0 {
            bytes.extend_from_slice(&[0; 4]);
        }
        bytes.extend_from_slice(body);
        OfpStatsReply::deserialize(version, bytes).unwrap()
    }

    fn aggregate_body(packets: u64, bytes: u64, flows: u32) -> Vec<u8> {
        let mut body = vec![0; 24];
        NetworkEndian::write_u64(&mut body[0..8], packets);
        NetworkEndian::write_u64(&mut body[8..16], bytes);
        NetworkEndian::write_u32(&mut body[16..20], flows);
        body
    }

    const LONG: Duration = Duration::from_secs(5);

    #[test]
    fn switches_are_sorted() {
        let (set, gateway, _) = setup(LONG);
        let _a = set.connect(3, OFP_VERSION_1_3, vec![]);
        let _b = set.connect(1, OFP_VERSION_1_0, vec![]);
        assert_eq!(vec![1, 3], gateway.switches());
    }

    #[test]
    fn unknown_switch() {
        let (_, gateway, _) = setup(LONG);
        let err = gateway.stats(9, StatsKind::Desc, &StatsFilter::default()).err().unwrap();
        assert_eq!(404, err.status());
        let err = gateway.delete_flow_entry(9).err().unwrap();
        assert_eq!(404, err.status());
    }

    #[test]
    fn unsupported_operation_sends_nothing() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_0, vec![]);
        let err = gateway.stats(1, StatsKind::Group, &StatsFilter::default()).err().unwrap();
        assert_eq!(501, err.status());
        let exp: Experimenter = request::parse(br#"{"experimenter":1}"#).unwrap();
        assert_eq!(501, gateway.send_experimenter(1, &exp).err().unwrap().status());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn fragments_are_aggregated() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let switch = thread::spawn(move || {
            let msg = rx.recv().unwrap();
            let xid = xid(&msg);
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, 1, &aggregate_body(1, 10, 1)));
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, 0, &aggregate_body(2, 20, 2)));
        });
        let value = gateway
            .stats_json(1, StatsKind::AggregateFlow, &StatsFilter::default())
            .unwrap();
        switch.join().unwrap();
        assert_eq!(
            json!({"1": [
                {"packet_count": 1, "byte_count": 10, "flow_count": 1},
                {"packet_count": 2, "byte_count": 20, "flow_count": 2},
            ]}),
            value
        );
    }

    #[test]
    fn silent_switch_times_out() {
        let (set, gateway, _) = setup(Duration::from_millis(50));
        let _rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let err = gateway.stats(1, StatsKind::Desc, &StatsFilter::default()).err().unwrap();
        assert_eq!(504, err.status());
    }

    #[test]
    fn disconnect_releases_request() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let switch = thread::spawn(move || {
            rx.recv().unwrap();
            correlator.disconnected(1);
        });
        let err = gateway.stats(1, StatsKind::Desc, &StatsFilter::default()).err().unwrap();
        switch.join().unwrap();
        assert_eq!(404, err.status());
    }

    #[test]
    fn query_after_disconnect_is_not_found() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        // the switch is still listed while its connection winds down
        correlator.disconnected(1);
        let err = gateway.stats(1, StatsKind::Desc, &StatsFilter::default()).err().unwrap();
        assert_eq!(404, err.status());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn send_failure_cancels() {
        let (set, gateway, _) = setup(LONG);
        drop(set.connect(1, OFP_VERSION_1_3, vec![]));
        let err = gateway.stats(1, StatsKind::Desc, &StatsFilter::default()).err().unwrap();
        assert_eq!(500, err.status());
    }

    #[test]
    fn flow_entry_is_sent() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let entry: FlowEntry = request::parse(br#"{"dpid":1,"actions":[{"type":"OUTPUT","port":2}]}"#).unwrap();
        gateway.mod_flow_entry(FlowCommand::Add, &entry).unwrap();
        let msg = rx.try_recv().unwrap();
        assert_eq!(OFP_VERSION_1_3, msg[0]);
        assert_eq!(14, msg[1]);
    }

    #[test]
    fn clear_deletes_all_tables() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        gateway.delete_flow_entry(1).unwrap();
        let msg = rx.try_recv().unwrap();
        // table_id and command of the flow mod
        assert_eq!(OFPTT_ALL, msg[24]);
        assert_eq!(OfpFlowModCommand::Delete as u8, msg[25]);
    }

    #[test]
    fn malformed_entry_is_bad_request() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_0, vec![]);
        let entry: FlowEntry = request::parse(br#"{"dpid":1,"match":{"tunnel_id":1}}"#).unwrap();
        let err = gateway.mod_flow_entry(FlowCommand::Add, &entry).err().unwrap();
        assert_eq!(400, err.status());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn port_behavior_needs_known_port() {
        let (set, gateway, _) = setup(LONG);
        let port = OfpPort {
            port_no: 1,
            hw_addr: [0, 1, 2, 3, 4, 5],
            ..OfpPort::default()
        };
        let rx = set.connect(1, OFP_VERSION_1_3, vec![port]);
        let config: PortConfig = request::parse(br#"{"dpid":1,"port_no":2,"config":1,"mask":1}"#).unwrap();
        assert_eq!(404, gateway.mod_port_behavior(&config).err().unwrap().status());

        let config: PortConfig = request::parse(br#"{"dpid":1,"port_no":1,"config":1,"mask":1}"#).unwrap();
        gateway.mod_port_behavior(&config).unwrap();
        let msg = rx.try_recv().unwrap();
        assert_eq!(16, msg[1]);
        assert_eq!(&[0, 1, 2, 3, 4, 5], &msg[16..22]);
    }
}
