/*!
Implements the switch side of the gateway: an OpenFlow controller that
accepts switch connections and keeps track of the connected datapaths.

Every connection is served by its own thread. The controller agrees on a
protocol version, identifies the datapath, answers echo requests and keeps
the datapath's port descriptions current. Stats and features replies are
handed to the `ReplyCorrelator`, which completes the pending requests.
*/

pub mod error;
pub mod messages;

use crate::correlator::ReplyCorrelator;
use crate::gateway::{Datapath, DatapathSet};

use crate::openflow::error::{Error, Result};
use crate::openflow::messages::deserialize::Deserialize;
use crate::openflow::messages::serialize::OfpPacket;
use crate::openflow::messages::*;

use std::collections::BTreeMap;
use std::io;
use std::io::{Cursor, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

/// The versions a connection can agree on.
/// 1.1 datapaths are registered, but no operation supports them.
const VERSIONS: [u8; 4] = [OFP_VERSION_1_3, OFP_VERSION_1_2, OFP_VERSION_1_1, OFP_VERSION_1_0];

fn gen_xid() -> u32 {
    let xid = rand::random();
    trace!("Using xid {} for the outgoing message", xid);
    xid
}

/// Simple version discovery: the smaller of both Hello versions is agreed upon
fn negotiate(peer: u8) -> Option<u8> {
    let common = peer.min(OFP_VERSION);
    VERSIONS.iter().cloned().find(|&v| v == common)
}

fn lock(writer: &Mutex<TcpStream>) -> MutexGuard<TcpStream> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A switch that completed the handshake
#[derive(Debug)]
pub struct Switch {
    id: u64,
    version: u8,
    writer: Arc<Mutex<TcpStream>>,
    ports: RwLock<BTreeMap<u32, OfpPort>>,
}

impl Switch {
    fn update_ports<I: IntoIterator<Item = OfpPort>>(&self, ports: I) {
        let mut known = self.ports.write().unwrap_or_else(PoisonError::into_inner);
        for port in ports {
            trace!("Datapath {} has port {} ({})", self.id, port.port_no, port.name);
            known.insert(port.port_no, port);
        }
    }

    fn remove_port(&self, port_no: u32) {
        let mut known = self.ports.write().unwrap_or_else(PoisonError::into_inner);
        known.remove(&port_no);
    }
}

impl Datapath for Switch {
    fn id(&self) -> u64 {
        self.id
    }

    fn version(&self) -> u8 {
        self.version
    }

    fn send(&self, msg: &[u8]) -> io::Result<()> {
        lock(&self.writer).write_all(msg)
    }

    fn port(&self, port_no: u32) -> Option<OfpPort> {
        let known = self.ports.read().unwrap_or_else(PoisonError::into_inner);
        known.get(&port_no).cloned()
    }
}

/// The registry of connected switches
#[derive(Debug, Default)]
pub struct Datapaths {
    switches: RwLock<BTreeMap<u64, Arc<Switch>>>,
}

impl Datapaths {
    pub fn new() -> Datapaths {
        Datapaths::default()
    }

    /// Registers a switch and returns the one it replaces
    fn insert(&self, switch: Arc<Switch>) -> Option<Arc<Switch>> {
        let mut switches = self.switches.write().unwrap_or_else(PoisonError::into_inner);
        switches.insert(switch.id, switch)
    }

    /// Unregisters a switch unless a newer connection took over its id
    fn remove(&self, switch: &Arc<Switch>) -> bool {
        let mut switches = self.switches.write().unwrap_or_else(PoisonError::into_inner);
        match switches.get(&switch.id) {
            Some(registered) if Arc::ptr_eq(registered, switch) => {
                switches.remove(&switch.id);
                true
            }
            _ => false,
        }
    }
}

impl DatapathSet for Datapaths {
    fn dpids(&self) -> Vec<u64> {
        let switches = self.switches.read().unwrap_or_else(PoisonError::into_inner);
        switches.keys().cloned().collect()
    }

    fn get(&self, dpid: u64) -> Option<Arc<dyn Datapath>> {
        let switches = self.switches.read().unwrap_or_else(PoisonError::into_inner);
        switches.get(&dpid).map(|s| s.clone() as Arc<dyn Datapath>)
    }
}

/// Serves a single switch connection.
/// Use the run function to create running instances.
pub struct OfController<'a> {
    reader: TcpStream,
    writer: Arc<Mutex<TcpStream>>,
    version: Option<u8>,
    switch: Option<Arc<Switch>>,
    /// Transaction of the port description requested on joining
    port_desc_xid: Option<u32>,
    datapaths: &'a Datapaths,
    correlator: &'a ReplyCorrelator,
}

impl<'a> OfController<'a> {
    fn version(&self) -> u8 {
        self.version.unwrap_or(OFP_VERSION)
    }

    fn send<P: OfpPacket>(&self, packet: &P, xid: u32) -> io::Result<()> {
        packet.serialize(&mut *lock(&self.writer), self.version(), xid)
    }

    fn send_header(&self, typ: OfpType, xid: u32) -> io::Result<()> {
        let header = OfpHeader::new(self.version(), typ, xid);
        debug!("Outgoing message: {:?}", header);
        header.serialize(&mut *lock(&self.writer))
    }

    fn handle_ofp_message(&mut self, header: &OfpHeader) -> Result<()> {
        debug!("Incoming message: {:?}", header);

        // Read the body
        let mut buf = vec![0; header.body_length()];
        self.reader.read_exact(&mut buf)?;

        if header.typ() == OfpType::Hello as u8 {
            let version = negotiate(header.version()).ok_or_else(|| Error::HelloFailed(header.version()))?;
            debug!("Agreed on OpenFlow version {:#x}", version);
            self.version = Some(version);
            self.send_header(OfpType::FeaturesRequest, gen_xid())?;
            return Ok(());
        }
        let version = match self.version {
            Some(v) if v == header.version() => v,
            _ => return Err(Error::BadRequest(OfpBadRequestCode::BadVersion, buf)),
        };

        match OfpType::from_code(version, header.typ()) {
            Some(OfpType::EchoRequest) => {
                // The EchoReply takes the same body byte stream as the EchoRequest
                let req = OfpEchoRequest::deserialize(version, buf)?;
                self.send(&OfpEchoReply::new(req.arbitrary()), header.xid())?;
            }
            Some(OfpType::FeaturesReply) => {
                let features = OfpSwitchFeatures::deserialize(version, buf)?;
                self.handle_features(header.xid(), features)?;
            }
            Some(OfpType::StatsReply) => {
                let reply = OfpStatsReply::deserialize(version, buf)?;
                self.handle_stats_reply(header.xid(), reply)?;
            }
            Some(OfpType::PortStatus) => {
                let status = OfpPortStatus::deserialize(version, buf)?;
                self.handle_port_status(status);
            }
            Some(OfpType::Error) => {
                let error = OfpErrorMsg::deserialize(version, buf)?;
                error!("Datapath {}: unexpected {}", self.dpid(), error);
                debug!("Full error message: {:?}", error);
            }
            Some(OfpType::EchoReply)
            | Some(OfpType::BarrierReply)
            | Some(OfpType::PacketIn)
            | Some(OfpType::FlowRemoved) => {
                trace!("Ignoring message of type {}", header.typ());
            }
            _ => {
                debug!(
                    "Cannot interpret message of type {}. Full message body: {:?}",
                    header.typ(),
                    buf
                );
                return Err(Error::BadRequest(OfpBadRequestCode::BadType, buf));
            }
        }
        Ok(())
    }

    fn dpid(&self) -> String {
        match self.switch {
            Some(ref switch) => switch.id.to_string(),
            None => "(unidentified)".to_owned(),
        }
    }

    fn handle_features(&mut self, xid: u32, features: OfpSwitchFeatures) -> io::Result<()> {
        match self.switch {
            Some(ref switch) => {
                switch.update_ports(features.ports.iter().cloned());
                self.correlator.features_reply(switch.id, xid, features);
                Ok(())
            }
            None => self.join(features),
        }
    }

    /// Registers the switch on its first features reply
    fn join(&mut self, features: OfpSwitchFeatures) -> io::Result<()> {
        let version = self.version();
        info!(
            "The connected switch identified itself with datapath id {}",
            features.datapath_id
        );
        let switch = Arc::new(Switch {
            id: features.datapath_id,
            version,
            writer: self.writer.clone(),
            ports: RwLock::new(BTreeMap::new()),
        });
        switch.update_ports(features.ports);

        if let Some(previous) = self.datapaths.insert(switch.clone()) {
            warn!("Datapath {} reconnected, dropping its previous connection", previous.id);
            self.correlator.disconnected(previous.id);
            if let Err(e) = lock(&previous.writer).shutdown(Shutdown::Both) {
                debug!("Cannot shut the previous connection down: {}", e);
            }
        }
        self.correlator.connected(switch.id);
        self.switch = Some(switch);

        // 1.3 features replies do not carry the ports
        if version == OFP_VERSION_1_3 {
            let xid = gen_xid();
            self.port_desc_xid = Some(xid);
            self.send(&OfpStatsRequest::new(OfpStatsType::PortDesc, vec![]), xid)?;
        }
        Ok(())
    }

    fn handle_stats_reply(&mut self, xid: u32, reply: OfpStatsReply) -> Result<()> {
        let switch = match self.switch {
            Some(ref switch) => switch.clone(),
            None => {
                debug!("Ignoring stats reply {} before the handshake", xid);
                return Ok(());
            }
        };
        if self.port_desc_xid != Some(xid) {
            self.correlator.stats_reply(switch.id, switch.version, xid, reply);
            return Ok(());
        }

        let body = reply.body();
        let mut stream = Cursor::new(body);
        let mut ports = vec![];
        while (stream.position() as usize) < body.len() {
            let port = OfpPort::read(switch.version, &mut stream)
                .map_err(|_| Error::BadRequest(OfpBadRequestCode::BadLen, body.to_vec()))?;
            ports.push(port);
        }
        switch.update_ports(ports);
        if reply.flags() & OFPMPF_REPLY_MORE == 0 {
            self.port_desc_xid = None;
        }
        Ok(())
    }

    fn handle_port_status(&self, status: OfpPortStatus) {
        let switch = match self.switch {
            Some(ref switch) => switch,
            None => return trace!("Ignoring Port Status Message before the handshake"),
        };
        if status.reason == OfpPortReason::Delete as u8 {
            debug!("Datapath {} lost port {}", switch.id, status.desc.port_no);
            switch.remove_port(status.desc.port_no);
        }
        else {
            switch.update_ports(Some(status.desc));
        }
    }

    fn handle_of_errors(&mut self, error: Error, header: &OfpHeader, header_buf: &[u8]) -> io::Result<()> {
        let err_msg = match error {
            Error::Io(e) => return Err(e),
            Error::HelloFailed(version) => {
                let msg = format!(
                    "The connected switch supports only OpenFlow protocol version {:#x}",
                    version
                );
                self.send(&OfpErrorMsg::new_hello_failed(), header.xid())?;
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, msg));
            }
            Error::BadRequest(code, buf) => OfpErrorMsg::new_bad_request(code, header_buf, &buf),
        };
        debug!("Outgoing error message: {:?}", err_msg);
        self.send(&err_msg, header.xid())
    }

    fn serve(&mut self) -> io::Result<()> {
        // Send a Hello with the highest version, the switch answers with its own
        self.send_header(OfpType::Hello, gen_xid())?;

        loop {
            // Read the header
            let mut hbuf = [0; 8];
            self.reader.read_exact(&mut hbuf)?;
            let header = OfpHeader::deserialize(&hbuf);
            if let Err(e) = self.handle_ofp_message(&header) {
                self.handle_of_errors(e, &header, &hbuf)?;
            }
        }
    }

    /// Manages the lifetime of a switch connection: sends a Hello,
    /// handles incoming messages until the connection breaks and
    /// finally unregisters the switch.
    pub fn run(stream: TcpStream, datapaths: &Datapaths, correlator: &ReplyCorrelator) -> io::Result<()> {
        let writer = Arc::new(Mutex::new(stream.try_clone()?));
        let mut ctrl = OfController {
            reader: stream,
            writer,
            version: None,
            switch: None,
            port_desc_xid: None,
            datapaths,
            correlator,
        };
        let result = ctrl.serve();
        if let Some(switch) = ctrl.switch.take() {
            if datapaths.remove(&switch) {
                info!("Datapath {} disconnected", switch.id);
                correlator.disconnected(switch.id);
            }
        }
        result
    }
}

/// Accepts switch connections and serves each on its own thread
pub fn listen(listener: TcpListener, datapaths: Arc<Datapaths>, correlator: ReplyCorrelator) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                error!("Cannot accept a switch connection: {}", e);
                continue;
            }
        };
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown peer".to_owned());
        info!("connection from {}", peer);

        let datapaths = datapaths.clone();
        let correlator = correlator.clone();
        thread::spawn(move || match OfController::run(stream, &datapaths, &correlator) {
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("{} closed the connection", peer)
            }
            Err(e) => warn!("Dropped the connection to {}: {}", peer, e),
            Ok(()) => (),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ofctl::Registry;
    use crate::waiters::Waiters;
    use byteorder::{ByteOrder, NetworkEndian};
    use std::time::Duration;

    fn msg(version: u8, typ: u8, xid: u32, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![version, typ, 0, 0, 0, 0, 0, 0];
        NetworkEndian::write_u16(&mut buf[2..4], (8 + body.len()) as u16);
        NetworkEndian::write_u32(&mut buf[4..8], xid);
        buf.extend_from_slice(body);
        buf
    }

    fn read_msg(stream: &mut TcpStream) -> (OfpHeader, Vec<u8>) {
        let mut hbuf = [0; 8];
        stream.read_exact(&mut hbuf).unwrap();
        let header = OfpHeader::deserialize(&hbuf);
        let mut body = vec![0; header.body_length()];
        stream.read_exact(&mut body).unwrap();
        (header, body)
    }

    fn port_1_3(port_no: u32, name: &str) -> Vec<u8> {
        let mut rec = vec![0; 64];
        NetworkEndian::write_u32(&mut rec[0..4], port_no);
        rec[8..14].copy_from_slice(&[0, 0, 0, 0, 0, port_no as u8]);
        rec[16..16 + name.len()].copy_from_slice(name.as_bytes());
        NetworkEndian::write_u32(&mut rec[56..60], 10_000);
        rec
    }

    fn eventually<F: Fn() -> bool>(cond: F) -> bool {
        for _ in 0..200 {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn controller() -> (Arc<Datapaths>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let datapaths = Arc::new(Datapaths::new());
        let correlator = ReplyCorrelator::new(Arc::new(Waiters::new()), Arc::new(Registry::new()));
        let serving = datapaths.clone();
        thread::spawn(move || listen(listener, serving, correlator));
        let stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        (datapaths, stream)
    }

    #[test]
    fn version_negotiation() {
        assert_eq!(Some(OFP_VERSION_1_3), negotiate(OFP_VERSION_1_3));
        assert_eq!(Some(OFP_VERSION_1_3), negotiate(0x06));
        assert_eq!(Some(OFP_VERSION_1_2), negotiate(OFP_VERSION_1_2));
        assert_eq!(Some(OFP_VERSION_1_0), negotiate(OFP_VERSION_1_0));
        assert_eq!(Some(OFP_VERSION_1_1), negotiate(OFP_VERSION_1_1));
        assert_eq!(None, negotiate(0));
    }

    #[test]
    fn handshake_registers_switch() {
        let (datapaths, mut switch) = controller();

        let (hello, _) = read_msg(&mut switch);
        assert_eq!(OfpType::Hello as u8, hello.typ());
        assert_eq!(OFP_VERSION, hello.version());
        switch.write_all(&msg(OFP_VERSION_1_3, 0, 1, &[])).unwrap();

        let (req, _) = read_msg(&mut switch);
        assert_eq!(OfpType::FeaturesRequest as u8, req.typ());
        let mut features = vec![0; 24];
        NetworkEndian::write_u64(&mut features[0..8], 42);
        switch.write_all(&msg(OFP_VERSION_1_3, 6, req.xid(), &features)).unwrap();

        let (req, body) = read_msg(&mut switch);
        assert_eq!(18, req.typ());
        assert_eq!(&[0, 13], &body[0..2]);
        let mut reply = vec![0, 13, 0, 0, 0, 0, 0, 0];
        reply.extend(port_1_3(1, "eth1"));
        reply.extend(port_1_3(2, "eth2"));
        switch.write_all(&msg(OFP_VERSION_1_3, 19, req.xid(), &reply)).unwrap();

        assert!(eventually(|| datapaths.get(42).and_then(|dp| dp.port(2)).is_some()));
        let dp = datapaths.get(42).unwrap();
        assert_eq!(OFP_VERSION_1_3, dp.version());
        let port = dp.port(1).unwrap();
        assert_eq!("eth1", port.name);
        assert_eq!([0, 0, 0, 0, 0, 1], port.hw_addr);
        assert_eq!(10_000, port.curr_speed);

        switch.write_all(&msg(OFP_VERSION_1_3, 2, 77, &[1, 2])).unwrap();
        let (echo, body) = read_msg(&mut switch);
        assert_eq!(OfpType::EchoReply as u8, echo.typ());
        assert_eq!(77, echo.xid());
        assert_eq!(vec![1, 2], body);

        drop(switch);
        assert!(eventually(|| datapaths.dpids().is_empty()));
    }

    #[test]
    fn ports_follow_port_status() {
        let (datapaths, mut switch) = controller();
        read_msg(&mut switch);
        switch.write_all(&msg(OFP_VERSION_1_0, 0, 1, &[])).unwrap();
        let (req, _) = read_msg(&mut switch);
        assert_eq!(OFP_VERSION_1_0, req.version());

        let mut features = vec![0; 24 + 48];
        NetworkEndian::write_u64(&mut features[0..8], 7);
        NetworkEndian::write_u16(&mut features[24..26], 3);
        switch.write_all(&msg(OFP_VERSION_1_0, 6, req.xid(), &features)).unwrap();
        assert!(eventually(|| datapaths.get(7).and_then(|dp| dp.port(3)).is_some()));

        let mut status = vec![0; 8 + 48];
        status[0] = OfpPortReason::Delete as u8;
        NetworkEndian::write_u16(&mut status[8..10], 3);
        switch.write_all(&msg(OFP_VERSION_1_0, 12, 0, &status)).unwrap();
        assert!(eventually(|| datapaths.get(7).map_or(false, |dp| dp.port(3).is_none())));
    }

    #[test]
    fn of11_switch_is_registered() {
        let (datapaths, mut switch) = controller();
        read_msg(&mut switch);
        switch.write_all(&msg(OFP_VERSION_1_1, 0, 1, &[])).unwrap();
        let (req, _) = read_msg(&mut switch);
        assert_eq!(OFP_VERSION_1_1, req.version());
        assert_eq!(OfpType::FeaturesRequest as u8, req.typ());

        let mut features = vec![0; 24];
        NetworkEndian::write_u64(&mut features[0..8], 11);
        features.extend(port_1_3(4, "eth4"));
        switch.write_all(&msg(OFP_VERSION_1_1, 6, req.xid(), &features)).unwrap();
        assert!(eventually(|| datapaths.get(11).and_then(|dp| dp.port(4)).is_some()));
        assert_eq!(OFP_VERSION_1_1, datapaths.get(11).unwrap().version());
    }

    #[test]
    fn unsupported_version_fails_hello() {
        let (datapaths, mut switch) = controller();
        read_msg(&mut switch);
        switch.write_all(&msg(0x00, 0, 1, &[])).unwrap();
        let (err, body) = read_msg(&mut switch);
        assert_eq!(OfpType::Error as u8, err.typ());
        assert_eq!(&[0, 0, 0, 0], &body[0..4]);
        let mut rest = vec![];
        assert_eq!(0, switch.read_to_end(&mut rest).unwrap());
        assert!(datapaths.dpids().is_empty());
    }

    #[test]
    fn unknown_type_is_bad_request() {
        let (_, mut switch) = controller();
        read_msg(&mut switch);
        switch.write_all(&msg(OFP_VERSION_1_3, 0, 1, &[])).unwrap();
        read_msg(&mut switch);
        switch.write_all(&msg(OFP_VERSION_1_3, 25, 9, &[])).unwrap();
        let (err, body) = read_msg(&mut switch);
        assert_eq!(OfpType::Error as u8, err.typ());
        assert_eq!(9, err.xid());
        assert_eq!(&[0, 1, 0, 1], &body[0..4]);
    }
}
