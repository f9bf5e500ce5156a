/*!
The administrative REST surface

`handle` maps a method, path and body to a status code and an optional JSON
body. It knows nothing about HTTP framing, which `server` takes care of.

| Method   | Path                               | Body                 |
|----------|------------------------------------|----------------------|
| GET      | /stats/switches                    |                      |
| GET      | /stats/{kind}/{dpid}               |                      |
| GET/POST | /stats/{flow,aggregateflow}/{dpid} | optional filter      |
| POST     | /stats/flowentry/{cmd}             | flow entry           |
| DELETE   | /stats/flowentry/clear/{dpid}      |                      |
| POST     | /stats/{meterentry,groupentry}/{cmd} | meter or group entry |
| POST     | /stats/portdesc/modify             | port config          |
| POST     | /stats/experimenter/{dpid}         | experimenter message |
*/

pub mod server;

use crate::gateway::{Error, Result, StatsGateway};
use crate::ofctl::StatsKind;
use crate::request::{self, EntryCommand, Experimenter, FlowCommand, FlowEntry, GroupEntry};
use crate::request::{MeterEntry, PortConfig, StatsFilter};

use serde_json::Value;

/// The outcome of a request
#[derive(Debug, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Option<Value>,
}

fn unknown_command(cmd: &str) -> Error {
    Error::NotFound(format!("Unknown command '{}'", cmd))
}

fn entry_command(cmd: &str) -> Result<EntryCommand> {
    EntryCommand::from_path(cmd).ok_or_else(|| unknown_command(cmd))
}

fn stats(gateway: &StatsGateway, method: &str, kind: &str, id: &str, body: &[u8]) -> Result<Option<Value>> {
    let kind = match StatsKind::from_path(kind) {
        Some(kind) => kind,
        None => return Err(Error::NotFound(format!("Unknown stats '{}'", kind))),
    };
    let filtered = kind == StatsKind::Flow || kind == StatsKind::AggregateFlow;
    if method == "POST" && !filtered {
        return Err(Error::NotFound(format!("{} stats take no filter", kind.path())));
    }
    let dpid = request::parse_dpid(id)?;
    let filter: StatsFilter = if filtered {
        request::parse_or_default(body)?
    }
    else {
        StatsFilter::default()
    };
    Ok(Some(gateway.stats_json(dpid, kind, &filter)?))
}

fn route(gateway: &StatsGateway, method: &str, path: &str, body: &[u8]) -> Result<Option<Value>> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        ("GET", ["stats", "switches"]) => Ok(Some(json!(gateway.switches()))),
        ("DELETE", ["stats", "flowentry", "clear", id]) => {
            gateway.delete_flow_entry(request::parse_dpid(id)?)?;
            Ok(None)
        }
        ("POST", ["stats", "flowentry", cmd]) => {
            let cmd = FlowCommand::from_path(cmd).ok_or_else(|| unknown_command(cmd))?;
            let entry: FlowEntry = request::parse(body)?;
            gateway.mod_flow_entry(cmd, &entry)?;
            Ok(None)
        }
        ("POST", ["stats", "meterentry", cmd]) => {
            let cmd = entry_command(cmd)?;
            let entry: MeterEntry = request::parse(body)?;
            gateway.mod_meter_entry(cmd, &entry)?;
            Ok(None)
        }
        ("POST", ["stats", "groupentry", cmd]) => {
            let cmd = entry_command(cmd)?;
            let entry: GroupEntry = request::parse(body)?;
            gateway.mod_group_entry(cmd, &entry)?;
            Ok(None)
        }
        ("POST", ["stats", "portdesc", cmd]) => {
            if *cmd != "modify" {
                return Err(unknown_command(cmd));
            }
            let config: PortConfig = request::parse(body)?;
            gateway.mod_port_behavior(&config)?;
            Ok(None)
        }
        ("POST", ["stats", "experimenter", id]) => {
            let dpid = request::parse_dpid(id)?;
            let exp: Experimenter = request::parse(body)?;
            gateway.send_experimenter(dpid, &exp)?;
            Ok(None)
        }
        ("GET", ["stats", kind, id]) | ("POST", ["stats", kind, id]) => {
            stats(gateway, method, kind, id, body)
        }
        _ => Err(Error::NotFound(format!("No route for {} {}", method, path))),
    }
}

/// Handles one request of the administrative surface
pub fn handle(gateway: &StatsGateway, method: &str, path: &str, body: &[u8]) -> Response {
    match route(gateway, method, path, body) {
        Ok(body) => Response { status: 200, body },
        Err(e) => {
            let status = e.status();
            if status >= 500 {
                warn!("{} {} failed: {}", method, path, e);
            }
            else {
                debug!("{} {} rejected: {}", method, path, e);
            }
            Response { status, body: None }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::tests::{reply_to, setup, xid};
    use crate::openflow::messages::*;
    use std::thread;
    use std::time::Duration;

    const LONG: Duration = Duration::from_secs(5);

    #[test]
    fn lists_switches() {
        let (set, gateway, _) = setup(LONG);
        let _a = set.connect(3, OFP_VERSION_1_3, vec![]);
        let _b = set.connect(1, OFP_VERSION_1_0, vec![]);
        let response = handle(&gateway, "GET", "/stats/switches", b"");
        assert_eq!(Response { status: 200, body: Some(json!([1, 3])) }, response);
    }

    #[test]
    fn bad_identifiers() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        assert_eq!(400, handle(&gateway, "GET", "/stats/desc/abc", b"").status);
        assert_eq!(400, handle(&gateway, "GET", "/stats/flow/-1", b"").status);
        assert_eq!(400, handle(&gateway, "DELETE", "/stats/flowentry/clear/0x1", b"").status);
        assert_eq!(404, handle(&gateway, "GET", "/stats/desc/2", b"").status);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_routes_and_commands() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let body = br#"{"dpid":1}"#;
        assert_eq!(404, handle(&gateway, "GET", "/", b"").status);
        assert_eq!(404, handle(&gateway, "GET", "/stats/tables/1", b"").status);
        assert_eq!(404, handle(&gateway, "POST", "/stats/flowentry/replace", body).status);
        assert_eq!(404, handle(&gateway, "POST", "/stats/meterentry/delete_strict", body).status);
        assert_eq!(404, handle(&gateway, "POST", "/stats/portdesc/delete", body).status);
        assert_eq!(404, handle(&gateway, "POST", "/stats/desc/1", b"").status);
        assert_eq!(404, handle(&gateway, "PUT", "/stats/switches", b"").status);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsupported_capability() {
        let (set, gateway, _) = setup(LONG);
        let _rx = set.connect(1, OFP_VERSION_1_2, vec![]);
        let _rx1 = set.connect(2, 0x02, vec![]);
        assert_eq!(501, handle(&gateway, "GET", "/stats/meterfeatures/1", b"").status);
        let body = br#"{"dpid":1,"meter_id":1}"#;
        assert_eq!(501, handle(&gateway, "POST", "/stats/meterentry/add", body).status);
        assert_eq!(501, handle(&gateway, "GET", "/stats/desc/2", b"").status);
    }

    #[test]
    fn flow_entry_mutation() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let body = br#"{"dpid":"1","match":{"in_port":1},"actions":[{"type":"OUTPUT","port":2}]}"#;
        let response = handle(&gateway, "POST", "/stats/flowentry/add", body);
        assert_eq!(Response { status: 200, body: None }, response);
        let msg = rx.try_recv().unwrap();
        assert_eq!(14, msg[1]);
        assert_eq!(OfpFlowModCommand::Add as u8, msg[25]);

        assert_eq!(400, handle(&gateway, "POST", "/stats/flowentry/add", b"{dpid: 1}").status);
        let body = br#"{"dpid":1,"actions":[{"type":"JUMP"}]}"#;
        assert_eq!(400, handle(&gateway, "POST", "/stats/flowentry/add", body).status);

        assert_eq!(200, handle(&gateway, "DELETE", "/stats/flowentry/clear/1", b"").status);
        let msg = rx.try_recv().unwrap();
        assert_eq!(OfpFlowModCommand::Delete as u8, msg[25]);
    }

    #[test]
    fn filtered_flow_stats() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let switch = thread::spawn(move || {
            let msg = rx.recv().unwrap();
            let xid = xid(&msg);
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, OFPMPF_REPLY_MORE, &[]));
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, 0, &[]));
            msg
        });
        let response = handle(&gateway, "POST", "/stats/flow/1", br#"{"table_id":3}"#);
        let request = switch.join().unwrap();
        assert_eq!(Response { status: 200, body: Some(json!({"1": []})) }, response);
        assert_eq!(OfpStatsType::Flow as u8, request[9]);
        assert_eq!(3, request[16]);
    }

    fn flow_record(table_id: u8, priority: u16) -> Vec<u8> {
        let mut rec = vec![0; 48];
        rec[1] = 56;
        rec[2] = table_id;
        rec[12..14].copy_from_slice(&priority.to_be_bytes());
        // empty OXM match, padded
        rec.extend_from_slice(&[0, 1, 0, 4, 0, 0, 0, 0]);
        rec
    }

    #[test]
    fn flow_stats_across_fragments() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let switch = thread::spawn(move || {
            let msg = rx.recv().unwrap();
            let xid = xid(&msg);
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, OFPMPF_REPLY_MORE, &flow_record(0, 10)));
            correlator.stats_reply(1, OFP_VERSION_1_3, xid, reply_to(&msg, 0, &flow_record(2, 20)));
        });
        let response = handle(&gateway, "POST", "/stats/flow/1", b"{}");
        switch.join().unwrap();
        assert_eq!(200, response.status);
        let body = response.body.unwrap();
        let flows = body["1"].as_array().unwrap();
        assert_eq!(2, flows.len());
        assert_eq!(json!(0), flows[0]["table_id"]);
        assert_eq!(json!(10), flows[0]["priority"]);
        assert_eq!(json!(2), flows[1]["table_id"]);
        assert_eq!(json!(20), flows[1]["priority"]);
        assert_eq!(json!({}), flows[1]["match"]);
        assert_eq!(json!([]), flows[1]["actions"]);
    }

    #[test]
    fn port_desc_route() {
        let (set, gateway, correlator) = setup(LONG);
        let rx = set.connect(5, OFP_VERSION_1_3, vec![]);
        let switch = thread::spawn(move || {
            let msg = rx.recv().unwrap();
            correlator.stats_reply(5, OFP_VERSION_1_3, xid(&msg), reply_to(&msg, 0, &[]));
            msg
        });
        let response = handle(&gateway, "GET", "/stats/portdesc/5", b"");
        let request = switch.join().unwrap();
        assert_eq!(Response { status: 200, body: Some(json!({"5": []})) }, response);
        assert_eq!(OfpStatsType::PortDesc as u8, request[9]);
    }

    #[test]
    fn experimenter_route() {
        let (set, gateway, _) = setup(LONG);
        let rx = set.connect(1, OFP_VERSION_1_3, vec![]);
        let body = br#"{"experimenter":8992,"exp_type":1,"data":"hi"}"#;
        assert_eq!(200, handle(&gateway, "POST", "/stats/experimenter/1", body).status);
        let msg = rx.try_recv().unwrap();
        assert_eq!(OfpType::Experimenter as u8, msg[1]);
        assert_eq!(b"hi", &msg[16..]);
    }
}
