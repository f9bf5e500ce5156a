/*!
A parser for an INI file with the following structure:

```ini
[Controller]
; where the switches connect to
uri=tcp:0.0.0.0:6653

[Rest]
listen=127.0.0.1:8080

[Stats]
; seconds to wait for the last reply of a switch
timeout=10
```

Every section is optional and falls back to the values shown above,
except that the controller listens on 127.0.0.1 by default.
*/

use crate::openflow::messages::OFP_TCP_PORT;

use ini::ini;
use ini::Ini;

use std::error;
use std::fmt;
use std::io;
use std::net::*;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

const CONTROLLER_SECTION: &str = "Controller";
const URI_KEY: &str = "uri";

const REST_SECTION: &str = "Rest";
const LISTEN_KEY: &str = "listen";
const REST_PORT: u16 = 8080;

const STATS_SECTION: &str = "Stats";
const TIMEOUT_KEY: &str = "timeout";
const TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Ini(ini::Error),
    InvalidUri(String),
    InvalidListen(String),
    ParseTimeout(ParseIntError),
    ZeroTimeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Ini(ref e) => write!(f, "{}", e),
            Error::InvalidUri(ref s) => {
                write!(f, "The OpenFlow controller URI '{}' from INI file is invalid", s)
            }
            Error::InvalidListen(ref s) => write!(f, "The REST listen address '{}' is invalid", s),
            Error::ParseTimeout(ref e) => {
                write!(f, "Error on trying to parse the stats timeout: {}", e)
            }
            Error::ZeroTimeout => write!(f, "The stats timeout must be at least one second"),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(ioe) => ioe,
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "INI configuration parser error"
    }
}

trait Section {
    type S;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error>;
}

/// Where switches connect to
#[derive(Debug, PartialEq)]
pub struct OfConnection {
    pub socket: SocketAddr,
}

impl Section for OfConnection {
    type S = OfConnection;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", CONTROLLER_SECTION);

        let conn = match conf
            .section(Some(CONTROLLER_SECTION.to_owned()))
            .and_then(|s| s.get(URI_KEY))
        {
            Some(uri) => OfConnection::from_str(uri)?,
            None => OfConnection::default(),
        };
        debug!("Got {:?}", conn);
        Ok(conn)
    }
}

impl FromStr for OfConnection {
    type Err = Error;

    /// Parses `tcp:<host>[:<port>]`, the port defaults to 6653
    fn from_str(uri: &str) -> Result<OfConnection, Self::Err> {
        let invalid = || Error::InvalidUri(uri.to_owned());
        let mut split = uri.trim().splitn(2, ':');
        if split.next() != Some("tcp") {
            return Err(invalid());
        }
        let addr = split.next().ok_or_else(invalid)?;
        if let Ok(socket) = SocketAddr::from_str(addr) {
            return Ok(OfConnection { socket });
        }
        let ip = IpAddr::from_str(addr).map_err(|_| invalid())?;
        Ok(OfConnection {
            socket: SocketAddr::new(ip, OFP_TCP_PORT),
        })
    }
}

impl Default for OfConnection {
    fn default() -> Self {
        OfConnection {
            socket: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), OFP_TCP_PORT),
        }
    }
}

/// Where the administrative REST surface listens
#[derive(Debug, PartialEq)]
pub struct RestConf {
    pub listen: SocketAddr,
}

impl Section for RestConf {
    type S = RestConf;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", REST_SECTION);

        let rest = match conf
            .section(Some(REST_SECTION.to_owned()))
            .and_then(|s| s.get(LISTEN_KEY))
        {
            Some(listen) => RestConf {
                listen: SocketAddr::from_str(listen.trim())
                    .map_err(|_| Error::InvalidListen(listen.to_owned()))?,
            },
            None => RestConf::default(),
        };
        debug!("Got {:?}", rest);
        Ok(rest)
    }
}

impl Default for RestConf {
    fn default() -> Self {
        RestConf {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), REST_PORT),
        }
    }
}

/// How long a stats query waits for the switch
#[derive(Debug, PartialEq)]
pub struct StatsConf {
    pub timeout: Duration,
}

impl Section for StatsConf {
    type S = StatsConf;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", STATS_SECTION);

        let stats = match conf
            .section(Some(STATS_SECTION.to_owned()))
            .and_then(|s| s.get(TIMEOUT_KEY))
        {
            Some(secs) => {
                let secs: u64 = secs.trim().parse().map_err(Error::ParseTimeout)?;
                if secs == 0 {
                    return Err(Error::ZeroTimeout);
                }
                StatsConf {
                    timeout: Duration::from_secs(secs),
                }
            }
            None => StatsConf::default(),
        };
        debug!("Got {:?}", stats);
        Ok(stats)
    }
}

impl Default for StatsConf {
    fn default() -> Self {
        StatsConf {
            timeout: Duration::from_secs(TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Config {
    pub connection: OfConnection,
    pub rest: RestConf,
    pub stats: StatsConf,
}

impl Section for Config {
    type S = Config;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        Ok(Config {
            connection: OfConnection::from_ini(conf)?,
            rest: RestConf::from_ini(conf)?,
            stats: StatsConf::from_ini(conf)?,
        })
    }
}

pub fn parse_file(path: &str) -> Result<Config, Error> {
    info!("Reading INI file {}", path);

    let conf = match Ini::load_from_file(path) {
        Ok(i) => i,
        Err(e) => {
            return Err(Error::Ini(e));
        }
    };
    Config::from_ini(&conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = Config::from_ini(&Ini::new()).unwrap();
        assert_eq!(Config::default(), conf);
        assert_eq!("127.0.0.1:6653", conf.connection.socket.to_string());
        assert_eq!("127.0.0.1:8080", conf.rest.listen.to_string());
        assert_eq!(Duration::from_secs(10), conf.stats.timeout);
    }

    #[test]
    fn all_sections() {
        let mut ini = Ini::new();
        ini.with_section(Some(CONTROLLER_SECTION)).set(URI_KEY, "tcp:0.0.0.0:6633");
        ini.with_section(Some(REST_SECTION)).set(LISTEN_KEY, "[::1]:8081");
        ini.with_section(Some(STATS_SECTION)).set(TIMEOUT_KEY, "3");
        let conf = Config::from_ini(&ini).unwrap();
        assert_eq!("0.0.0.0:6633", conf.connection.socket.to_string());
        assert_eq!("[::1]:8081", conf.rest.listen.to_string());
        assert_eq!(Duration::from_secs(3), conf.stats.timeout);
    }

    #[test]
    fn controller_uris() {
        assert_eq!(
            "192.0.2.1:6653",
            OfConnection::from_str("tcp:192.0.2.1").unwrap().socket.to_string()
        );
        assert_eq!(
            "[2001:db8::1]:6653",
            OfConnection::from_str("tcp:2001:db8::1").unwrap().socket.to_string()
        );
        assert!(OfConnection::from_str("tls:192.0.2.1:6653").is_err());
        assert!(OfConnection::from_str("tcp:").is_err());
        assert!(OfConnection::from_str("192.0.2.1:6653").is_err());
    }

    #[test]
    fn bad_values() {
        let mut ini = Ini::new();
        ini.with_section(Some(STATS_SECTION)).set(TIMEOUT_KEY, "0");
        match Config::from_ini(&ini) {
            Err(Error::ZeroTimeout) => (),
            other => panic!("unexpected {:?}", other),
        }
        ini.with_section(Some(STATS_SECTION)).set(TIMEOUT_KEY, "ten");
        assert!(Config::from_ini(&ini).is_err());

        let mut ini = Ini::new();
        ini.with_section(Some(REST_SECTION)).set(LISTEN_KEY, "localhost");
        assert!(Config::from_ini(&ini).is_err());
    }
}
